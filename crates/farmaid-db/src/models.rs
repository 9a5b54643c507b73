//! Database row types — these map directly to SQLite rows.
//! Conversions into the farmaid-types API models live here so that
//! timestamp/enum parsing happens once, at the store boundary.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use farmaid_types::models::{
    ChatMessage, ChatThread, Notification, Sender, Transaction, TransactionKind,
    TransactionStatus, User,
};

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: String,
    pub location: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ThreadRow {
    pub donor_id: String,
    pub donor_name: String,
    pub last_message: String,
    pub last_message_from: String,
    pub last_message_at: Option<String>,
    pub read_by_admin: bool,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub sender: String,
    pub sender_name: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct TransactionRow {
    pub id: String,
    pub farmer: String,
    pub buyer_donor: String,
    pub crop: String,
    pub quantity: String,
    pub amount_centavos: i64,
    pub kind: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub message: String,
    pub image_url: Option<String>,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug)]
pub struct SettingsRow {
    pub account_name: String,
    pub account_email: String,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub app_notifications: bool,
}

/// Parse a stored timestamp. Rows written by this service carry RFC 3339;
/// the naive fallback covers rows imported from older backups.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

impl ThreadRow {
    pub fn into_thread(self) -> ChatThread {
        let last_message_from = Sender::parse(&self.last_message_from).unwrap_or_else(|| {
            warn!(
                "Corrupt sender '{}' on thread '{}'",
                self.last_message_from, self.donor_id
            );
            Sender::Donor
        });
        ChatThread {
            last_message_at: self
                .last_message_at
                .as_deref()
                .map(|ts| parse_timestamp(ts, &format!("thread '{}'", self.donor_id))),
            donor_id: self.donor_id,
            donor_name: self.donor_name,
            last_message: self.last_message,
            last_message_from,
            read_by_admin: self.read_by_admin,
        }
    }
}

impl MessageRow {
    pub fn into_message(self) -> ChatMessage {
        let sender = Sender::parse(&self.sender).unwrap_or_else(|| {
            warn!("Corrupt sender '{}' on message '{}'", self.sender, self.id);
            Sender::Donor
        });
        ChatMessage {
            created_at: parse_timestamp(&self.created_at, &format!("message '{}'", self.id)),
            id: self.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt message id '{}': {}", self.id, e);
                Uuid::default()
            }),
            thread_id: self.thread_id,
            text: self.text,
            image_url: self.image_url,
            sender,
            sender_name: self.sender_name,
        }
    }
}

impl TransactionRow {
    pub fn into_transaction(self) -> Transaction {
        let kind = TransactionKind::parse(&self.kind).unwrap_or_else(|| {
            warn!("Corrupt kind '{}' on transaction '{}'", self.kind, self.id);
            TransactionKind::Donation
        });
        let status = TransactionStatus::parse(&self.status).unwrap_or_else(|| {
            warn!(
                "Corrupt status '{}' on transaction '{}'",
                self.status, self.id
            );
            TransactionStatus::Pending
        });
        Transaction {
            created_at: parse_timestamp(&self.created_at, &format!("transaction '{}'", self.id)),
            id: self.id,
            farmer: self.farmer,
            buyer_donor: self.buyer_donor,
            crop: self.crop,
            quantity: self.quantity,
            amount_centavos: self.amount_centavos,
            kind,
            status,
        }
    }
}

impl NotificationRow {
    pub fn into_notification(self) -> Notification {
        Notification {
            created_at: parse_timestamp(&self.created_at, &format!("notification '{}'", self.id)),
            id: self.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt notification id '{}': {}", self.id, e);
                Uuid::default()
            }),
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            image_url: self.image_url,
            read: self.read,
        }
    }
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            joined_at: Some(parse_timestamp(
                &self.created_at,
                &format!("user '{}'", self.id),
            )),
            id: self.id,
            name: self.name,
            role: self.role,
            location: self.location,
            email: self.email,
        }
    }
}
