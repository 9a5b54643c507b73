use rusqlite::Connection;

use farmaid_types::models::{ChatMessage, Notification, Sender, Transaction, TransactionStatus};

use crate::models::{
    MessageRow, NotificationRow, SettingsRow, ThreadRow, TransactionRow, UserRow,
};
use crate::{Database, Result, StoreError};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, name, email, password_hash, role, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Resolve a donor record by display name, used when a transaction only
    /// carries the buyer/donor name. Names are not unique; the most recent
    /// match wins.
    pub fn find_user_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, password, role, location, created_at
                 FROM users WHERE name = ?1
                 ORDER BY created_at DESC LIMIT 1",
            )?;
            let row = stmt.query_row([name], map_user_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_users(&self, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, password, role, location, created_at
                 FROM users ORDER BY created_at DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Chat threads --

    pub fn list_threads(&self) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT donor_id, donor_name, last_message, last_message_from,
                        last_message_at, read_by_admin
                 FROM chat_threads
                 ORDER BY last_message_at DESC",
            )?;
            let rows = stmt
                .query_map([], map_thread_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_thread(&self, donor_id: &str) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| query_thread(conn, donor_id))
    }

    /// Mark-as-read: acknowledge the latest donor message. No-op if the
    /// thread does not exist.
    pub fn set_thread_read(&self, donor_id: &str) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE chat_threads SET read_by_admin = 1 WHERE donor_id = ?1",
                [donor_id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_thread(conn, donor_id)
        })
    }

    // -- Chat messages --

    /// Append a message and refresh the parent thread's denormalized summary
    /// in a single transaction. The read flag follows the sender: an admin
    /// send acknowledges the thread, a donor send marks it unread.
    pub fn append_message(&self, msg: &ChatMessage, donor_name: &str) -> Result<ThreadRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            // Thread first: chat_messages carries an FK to chat_threads.
            upsert_thread_summary(&tx, msg, donor_name)?;
            insert_message(&tx, msg)?;
            tx.commit()?;
            query_thread(conn, &msg.thread_id)?
                .ok_or_else(|| StoreError::NotFound(format!("thread '{}'", msg.thread_id)))
        })
    }

    pub fn messages_for_thread(&self, donor_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thread_id, text, image_url, sender, sender_name, created_at
                 FROM chat_messages
                 WHERE thread_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([donor_id], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Transactions --

    pub fn insert_transaction(&self, t: &Transaction) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO transactions
                 (id, farmer, buyer_donor, crop, quantity, amount_centavos, kind, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    t.id,
                    t.farmer,
                    t.buyer_donor,
                    t.crop,
                    t.quantity,
                    t.amount_centavos,
                    t.kind.as_str(),
                    t.status.as_str(),
                    t.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_transaction(&self, id: &str) -> Result<Option<TransactionRow>> {
        self.with_conn(|conn| query_transaction(conn, id))
    }

    pub fn list_transactions(
        &self,
        search: Option<&str>,
        kind: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<TransactionRow>> {
        self.with_conn(|conn| {
            let mut sql = String::from(
                "SELECT id, farmer, buyer_donor, crop, quantity, amount_centavos,
                        kind, status, created_at
                 FROM transactions WHERE 1=1",
            );
            let mut params: Vec<String> = Vec::new();

            if let Some(needle) = search {
                sql.push_str(
                    " AND (LOWER(id) LIKE ? OR LOWER(farmer) LIKE ?
                       OR LOWER(buyer_donor) LIKE ? OR LOWER(crop) LIKE ?)",
                );
                let pattern = format!("%{}%", needle.to_lowercase());
                params.extend(std::iter::repeat_n(pattern, 4));
            }
            if let Some(kind) = kind {
                sql.push_str(" AND kind = ?");
                params.push(kind.to_string());
            }
            if let Some(status) = status {
                sql.push_str(" AND status = ?");
                params.push(status.to_string());
            }
            sql.push_str(" ORDER BY created_at DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), map_transaction_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Move a transaction to a new status, rejecting transitions the
    /// lifecycle does not allow.
    pub fn update_transaction_status(
        &self,
        id: &str,
        to: TransactionStatus,
    ) -> Result<TransactionRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            transition_status(&tx, id, to)?;
            tx.commit()?;
            query_transaction(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("transaction '{}'", id)))
        })
    }

    /// Donation confirmation: status -> Completed, thread summary upsert,
    /// chat message append and donor notification, all in one transaction.
    /// The original dashboard issued these as separate writes and could
    /// leave the summary inconsistent with the message log on a crash.
    pub fn confirm_donation(
        &self,
        transaction_id: &str,
        message: &ChatMessage,
        donor_name: &str,
        notification: &Notification,
    ) -> Result<TransactionRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            transition_status(&tx, transaction_id, TransactionStatus::Completed)?;
            upsert_thread_summary(&tx, message, donor_name)?;
            insert_message(&tx, message)?;
            insert_notification(&tx, notification)?;
            tx.commit()?;
            query_transaction(conn, transaction_id)?
                .ok_or_else(|| StoreError::NotFound(format!("transaction '{}'", transaction_id)))
        })
    }

    // -- Notifications --

    pub fn insert_notification(&self, n: &Notification) -> Result<()> {
        self.with_conn(|conn| insert_notification(conn, n))
    }

    pub fn notifications_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, message, image_url, read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_notification_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn mark_notification_read(&self, id: &str, updated_at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET read = 1, updated_at = ?2 WHERE id = ?1",
                rusqlite::params![id, updated_at],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn delete_notification(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Organizations --

    pub fn insert_organization(
        &self,
        id: &str,
        contact_person: &str,
        organization_name: &str,
        contact_number: &str,
        email: &str,
        year_founded: i32,
        certification_url: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO organizations
                 (id, contact_person, organization_name, contact_number, email,
                  year_founded, certification_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    contact_person,
                    organization_name,
                    contact_number,
                    email,
                    year_founded,
                    certification_url,
                    created_at,
                ],
            )?;
            Ok(())
        })
    }

    // -- Settings --

    pub fn get_settings(&self) -> Result<Option<SettingsRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT account_name, account_email, email_notifications,
                        sms_notifications, app_notifications
                 FROM organization_settings WHERE id = 1",
            )?;
            let row = stmt
                .query_row([], |row| {
                    Ok(SettingsRow {
                        account_name: row.get(0)?,
                        account_email: row.get(1)?,
                        email_notifications: row.get(2)?,
                        sms_notifications: row.get(3)?,
                        app_notifications: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn upsert_settings(&self, s: &SettingsRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO organization_settings
                 (id, account_name, account_email, email_notifications,
                  sms_notifications, app_notifications)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    account_name = excluded.account_name,
                    account_email = excluded.account_email,
                    email_notifications = excluded.email_notifications,
                    sms_notifications = excluded.sms_notifications,
                    app_notifications = excluded.app_notifications",
                rusqlite::params![
                    s.account_name,
                    s.account_email,
                    s.email_notifications,
                    s.sms_notifications,
                    s.app_notifications,
                ],
            )?;
            Ok(())
        })
    }

    // -- Audit logs --

    pub fn insert_audit_log(
        &self,
        id: &str,
        action: &str,
        details: &str,
        actor: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO audit_logs (id, action, details, actor, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, action, details, actor, created_at],
            )?;
            Ok(())
        })
    }

    // -- Analytics --

    /// Donation totals per "YYYY-MM" bucket, oldest first. Cancelled
    /// donations are excluded.
    pub fn monthly_donation_totals(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT substr(created_at, 1, 7) AS month, SUM(amount_centavos)
                 FROM transactions
                 WHERE kind = 'Donation' AND status != 'Cancelled'
                 GROUP BY month
                 ORDER BY month ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Transaction counts per crop category, busiest first.
    pub fn volume_by_crop(&self) -> Result<Vec<(String, u32)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT crop, COUNT(*) AS n
                 FROM transactions
                 GROUP BY crop
                 ORDER BY n DESC, crop ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// (distinct donors, total donated, donation count), Cancelled excluded.
    pub fn donation_stats(&self) -> Result<(u32, i64, i64)> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT COUNT(DISTINCT buyer_donor),
                        COALESCE(SUM(amount_centavos), 0),
                        COUNT(*)
                 FROM transactions
                 WHERE kind = 'Donation' AND status != 'Cancelled'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok(stats)
        })
    }
}

// -- Free helpers shared between single writes and transactions --

fn insert_message(conn: &Connection, msg: &ChatMessage) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_messages (id, thread_id, text, image_url, sender, sender_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            msg.id.to_string(),
            msg.thread_id,
            msg.text,
            msg.image_url,
            msg.sender.as_str(),
            msg.sender_name,
            msg.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn upsert_thread_summary(conn: &Connection, msg: &ChatMessage, donor_name: &str) -> Result<()> {
    let summary = msg.text.clone().unwrap_or_else(|| "[photo]".into());
    let read_by_admin = msg.sender == Sender::Admin;
    conn.execute(
        "INSERT INTO chat_threads
         (donor_id, donor_name, last_message, last_message_from, last_message_at, read_by_admin)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(donor_id) DO UPDATE SET
            donor_name = excluded.donor_name,
            last_message = excluded.last_message,
            last_message_from = excluded.last_message_from,
            last_message_at = excluded.last_message_at,
            read_by_admin = excluded.read_by_admin",
        rusqlite::params![
            msg.thread_id,
            donor_name,
            summary,
            msg.sender.as_str(),
            msg.created_at.to_rfc3339(),
            read_by_admin,
        ],
    )?;
    Ok(())
}

fn insert_notification(conn: &Connection, n: &Notification) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, title, message, image_url, read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            n.id.to_string(),
            n.user_id,
            n.title,
            n.message,
            n.image_url,
            n.read,
            n.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn transition_status(conn: &Connection, id: &str, to: TransactionStatus) -> Result<()> {
    let row = query_transaction(conn, id)?
        .ok_or_else(|| StoreError::NotFound(format!("transaction '{}'", id)))?;
    let from = TransactionStatus::parse(&row.status)
        .ok_or_else(|| StoreError::NotFound(format!("transaction '{}' status", id)))?;

    if !from.can_transition(to) {
        return Err(StoreError::InvalidTransition { from, to });
    }

    conn.execute(
        "UPDATE transactions SET status = ?2 WHERE id = ?1",
        rusqlite::params![id, to.as_str()],
    )?;
    Ok(())
}

fn query_thread(conn: &Connection, donor_id: &str) -> Result<Option<ThreadRow>> {
    let mut stmt = conn.prepare(
        "SELECT donor_id, donor_name, last_message, last_message_from,
                last_message_at, read_by_admin
         FROM chat_threads WHERE donor_id = ?1",
    )?;
    let row = stmt.query_row([donor_id], map_thread_row).optional()?;
    Ok(row)
}

fn query_transaction(conn: &Connection, id: &str) -> Result<Option<TransactionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, farmer, buyer_donor, crop, quantity, amount_centavos,
                kind, status, created_at
         FROM transactions WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], map_transaction_row).optional()?;
    Ok(row)
}

fn query_user(conn: &Connection, filter: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, name, email, password, role, location, created_at FROM users WHERE {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        location: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_thread_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        donor_id: row.get(0)?,
        donor_name: row.get(1)?,
        last_message: row.get(2)?,
        last_message_from: row.get(3)?,
        last_message_at: row.get(4)?,
        read_by_admin: row.get(5)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        text: row.get(2)?,
        image_url: row.get(3)?,
        sender: row.get(4)?,
        sender_name: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        farmer: row.get(1)?,
        buyer_donor: row.get(2)?,
        crop: row.get(3)?,
        quantity: row.get(4)?,
        amount_centavos: row.get(5)?,
        kind: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        image_url: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use farmaid_types::models::TransactionKind;

    use super::*;

    fn admin_message(thread_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            thread_id: thread_id.into(),
            text: Some(text.into()),
            image_url: None,
            sender: Sender::Admin,
            sender_name: "Admin".into(),
            created_at: Utc::now(),
        }
    }

    fn donor_message(thread_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            sender: Sender::Donor,
            sender_name: "Maria Santos".into(),
            ..admin_message(thread_id, text)
        }
    }

    fn pending_donation(id: &str, donor: &str) -> Transaction {
        Transaction {
            id: id.into(),
            farmer: "Juan Dela Cruz".into(),
            buyer_donor: donor.into(),
            crop: "Rice".into(),
            quantity: "100kg".into(),
            amount_centavos: 500_000,
            kind: TransactionKind::Donation,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_send_updates_summary_and_acknowledges_thread() {
        let db = Database::open_in_memory().unwrap();
        db.append_message(&donor_message("donor-42", "Did you get the rice?"), "Maria Santos")
            .unwrap();

        let thread = db.get_thread("donor-42").unwrap().unwrap().into_thread();
        assert!(thread.is_unread());

        let updated = db
            .append_message(&admin_message("donor-42", "Received, thank you"), "Maria Santos")
            .unwrap()
            .into_thread();
        assert_eq!(updated.last_message, "Received, thank you");
        assert_eq!(updated.last_message_from, Sender::Admin);
        assert!(updated.read_by_admin);
        assert!(!updated.is_unread());
    }

    #[test]
    fn messages_come_back_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let mut first = donor_message("donor-1", "first");
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = admin_message("donor-1", "second");

        db.append_message(&second, "Maria").unwrap();
        db.append_message(&first, "Maria").unwrap();

        let texts: Vec<_> = db
            .messages_for_thread("donor-1")
            .unwrap()
            .into_iter()
            .map(|m| m.text.unwrap())
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn mark_as_read_flips_the_flag() {
        let db = Database::open_in_memory().unwrap();
        db.append_message(&donor_message("donor-42", "hello"), "Maria Santos")
            .unwrap();

        let thread = db.set_thread_read("donor-42").unwrap().unwrap().into_thread();
        assert!(thread.read_by_admin);
        assert!(!thread.is_unread());

        assert!(db.set_thread_read("donor-missing").unwrap().is_none());
    }

    #[test]
    fn confirm_donation_is_atomic_and_completes_the_record() {
        let db = Database::open_in_memory().unwrap();
        db.insert_transaction(&pending_donation("TRX-007", "Maria Santos"))
            .unwrap();

        let message = admin_message("donor-42", "Received, thank you");
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: "donor-42".into(),
            title: Some("Donation confirmed".into()),
            message: "Received, thank you".into(),
            image_url: None,
            read: false,
            created_at: Utc::now(),
        };

        let row = db
            .confirm_donation("TRX-007", &message, "Maria Santos", &notification)
            .unwrap();
        assert_eq!(row.status, "Completed");

        let messages = db.messages_for_thread("donor-42").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text.as_deref(), Some("Received, thank you"));
        assert!(messages[0].image_url.is_none());

        assert_eq!(db.unread_notification_count("donor-42").unwrap(), 1);
    }

    #[test]
    fn confirm_donation_rejects_terminal_records_and_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let mut t = pending_donation("TRX-008", "Maria Santos");
        t.status = TransactionStatus::Cancelled;
        db.insert_transaction(&t).unwrap();

        let message = admin_message("donor-9", "thanks");
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: "donor-9".into(),
            title: None,
            message: "thanks".into(),
            image_url: None,
            read: false,
            created_at: Utc::now(),
        };

        let err = db
            .confirm_donation("TRX-008", &message, "Maria Santos", &notification)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        // The transaction rolled back: no message, no thread, no notification.
        assert!(db.messages_for_thread("donor-9").unwrap().is_empty());
        assert!(db.get_thread("donor-9").unwrap().is_none());
        assert_eq!(db.unread_notification_count("donor-9").unwrap(), 0);
    }

    #[test]
    fn status_updates_follow_the_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        db.insert_transaction(&pending_donation("TRX-010", "Metro Food Bank"))
            .unwrap();

        let row = db
            .update_transaction_status("TRX-010", TransactionStatus::Processing)
            .unwrap();
        assert_eq!(row.status, "Processing");

        let err = db
            .update_transaction_status("TRX-010", TransactionStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let err = db
            .update_transaction_status("TRX-404", TransactionStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn transaction_filters_compose() {
        let db = Database::open_in_memory().unwrap();
        db.insert_transaction(&pending_donation("TRX-001", "Metro Food Bank"))
            .unwrap();
        let mut sale = pending_donation("TRX-002", "John Doe");
        sale.kind = TransactionKind::Sale;
        sale.crop = "Vegetables".into();
        db.insert_transaction(&sale).unwrap();

        let all = db.list_transactions(None, None, None).unwrap();
        assert_eq!(all.len(), 2);

        let donations = db.list_transactions(None, Some("Donation"), None).unwrap();
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].id, "TRX-001");

        let metro = db.list_transactions(Some("metro"), None, None).unwrap();
        assert_eq!(metro.len(), 1);

        let none = db
            .list_transactions(Some("metro"), Some("Sale"), None)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn notifications_order_count_and_acknowledge() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..3 {
            let n = Notification {
                id: Uuid::new_v4(),
                user_id: "admin-1".into(),
                title: None,
                message: format!("notification {}", i),
                image_url: None,
                read: false,
                created_at: Utc::now() + chrono::Duration::seconds(i),
            };
            db.insert_notification(&n).unwrap();
        }

        let rows = db.notifications_for_user("admin-1", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].message, "notification 2");

        assert_eq!(db.unread_notification_count("admin-1").unwrap(), 3);
        assert!(db
            .mark_notification_read(&rows[0].id, &Utc::now().to_rfc3339())
            .unwrap());
        assert_eq!(db.unread_notification_count("admin-1").unwrap(), 2);

        assert!(db.delete_notification(&rows[1].id).unwrap());
        assert!(!db.delete_notification(&rows[1].id).unwrap());
    }

    #[test]
    fn settings_document_upserts_in_place() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_settings().unwrap().is_none());

        let s = SettingsRow {
            account_name: "Admin User".into(),
            account_email: "admin@farmaid.org".into(),
            email_notifications: true,
            sms_notifications: false,
            app_notifications: true,
        };
        db.upsert_settings(&s).unwrap();

        let mut s2 = db.get_settings().unwrap().unwrap();
        assert_eq!(s2.account_email, "admin@farmaid.org");

        s2.sms_notifications = true;
        db.upsert_settings(&s2).unwrap();
        assert!(db.get_settings().unwrap().unwrap().sms_notifications);
    }

    #[test]
    fn monthly_totals_bucket_by_month_and_skip_cancelled() {
        let db = Database::open_in_memory().unwrap();
        let mut april = pending_donation("TRX-A", "Metro Food Bank");
        april.created_at = "2025-04-22T10:00:00Z".parse().unwrap();
        let mut may = pending_donation("TRX-B", "Community Helpers");
        may.created_at = "2025-05-02T10:00:00Z".parse().unwrap();
        may.amount_centavos = 250_000;
        let mut cancelled = pending_donation("TRX-C", "Tech For Farms");
        cancelled.created_at = "2025-05-03T10:00:00Z".parse().unwrap();
        cancelled.status = TransactionStatus::Cancelled;

        db.insert_transaction(&april).unwrap();
        db.insert_transaction(&may).unwrap();
        db.insert_transaction(&cancelled).unwrap();

        let totals = db.monthly_donation_totals().unwrap();
        assert_eq!(
            totals,
            vec![("2025-04".into(), 500_000), ("2025-05".into(), 250_000)]
        );

        let (donors, total, count) = db.donation_stats().unwrap();
        assert_eq!(donors, 2);
        assert_eq!(total, 750_000);
        assert_eq!(count, 2);
    }
}
