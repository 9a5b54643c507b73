use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT UNIQUE,
            password    TEXT,
            role        TEXT NOT NULL DEFAULT 'Donor',
            location    TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS organizations (
            id                  TEXT PRIMARY KEY,
            contact_person      TEXT NOT NULL,
            organization_name   TEXT NOT NULL,
            contact_number      TEXT NOT NULL,
            email               TEXT NOT NULL,
            year_founded        INTEGER NOT NULL,
            certification_url   TEXT NOT NULL,
            created_at          TEXT NOT NULL
        );

        -- Single-row settings document; id is pinned to 1.
        CREATE TABLE IF NOT EXISTS organization_settings (
            id                   INTEGER PRIMARY KEY CHECK (id = 1),
            account_name         TEXT NOT NULL,
            account_email        TEXT NOT NULL,
            email_notifications  INTEGER NOT NULL,
            sms_notifications    INTEGER NOT NULL,
            app_notifications    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id               TEXT PRIMARY KEY,
            farmer           TEXT NOT NULL,
            buyer_donor      TEXT NOT NULL,
            crop             TEXT NOT NULL,
            quantity         TEXT NOT NULL,
            amount_centavos  INTEGER NOT NULL,
            kind             TEXT NOT NULL,
            status           TEXT NOT NULL,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            title       TEXT,
            message     TEXT NOT NULL,
            image_url   TEXT,
            read        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            updated_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);

        CREATE TABLE IF NOT EXISTS audit_logs (
            id          TEXT PRIMARY KEY,
            action      TEXT NOT NULL,
            details     TEXT NOT NULL DEFAULT '',
            actor       TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_threads (
            donor_id           TEXT PRIMARY KEY,
            donor_name         TEXT NOT NULL,
            last_message       TEXT NOT NULL DEFAULT '',
            last_message_from  TEXT NOT NULL DEFAULT 'donor',
            last_message_at    TEXT,
            read_by_admin      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS chat_messages (
            id           TEXT PRIMARY KEY,
            thread_id    TEXT NOT NULL REFERENCES chat_threads(donor_id),
            text         TEXT,
            image_url    TEXT,
            sender       TEXT NOT NULL,
            sender_name  TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_thread
            ON chat_messages(thread_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
