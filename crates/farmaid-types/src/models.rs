use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared across farmaid-api (REST middleware) and farmaid-gateway
/// (WebSocket authentication). Canonical definition lives here in
/// farmaid-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    /// True for the hardcoded demo admin — no user row backs this token.
    #[serde(default)]
    pub demo: bool,
    pub exp: usize,
}

// -- Chat --

/// Who authored a chat message. Stored as "admin" / "donor" text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Admin,
    Donor,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Admin => "admin",
            Sender::Donor => "donor",
        }
    }

    pub fn parse(s: &str) -> Option<Sender> {
        match s {
            "admin" => Some(Sender::Admin),
            "donor" => Some(Sender::Donor),
            _ => None,
        }
    }
}

/// A donor-organization conversation, keyed by the donor's user id, carrying
/// the denormalized last-message summary shown in the sidebar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    pub donor_id: String,
    pub donor_name: String,
    pub last_message: String,
    pub last_message_from: Sender,
    pub last_message_at: Option<DateTime<Utc>>,
    pub read_by_admin: bool,
}

impl ChatThread {
    /// A thread is unread when the donor spoke last and the admin has not
    /// acknowledged it.
    pub fn is_unread(&self) -> bool {
        self.last_message_from != Sender::Admin && !self.read_by_admin
    }
}

/// A single message within a thread. Immutable once created; at least one of
/// `text` / `image_url` is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub thread_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub sender: Sender,
    pub sender_name: String,
    pub created_at: DateTime<Utc>,
}

// -- Transactions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Sale,
    Donation,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "Sale",
            TransactionKind::Donation => "Donation",
        }
    }

    pub fn parse(s: &str) -> Option<TransactionKind> {
        match s {
            "Sale" => Some(TransactionKind::Sale),
            "Donation" => Some(TransactionKind::Donation),
            _ => None,
        }
    }
}

/// Lifecycle of a donation/transaction record. Transitions are triggered by
/// explicit admin actions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Processing,
    Delivered,
    Confirmed,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Processing => "Processing",
            TransactionStatus::Delivered => "Delivered",
            TransactionStatus::Confirmed => "Confirmed",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<TransactionStatus> {
        match s {
            "Pending" => Some(TransactionStatus::Pending),
            "Processing" => Some(TransactionStatus::Processing),
            "Delivered" => Some(TransactionStatus::Delivered),
            "Confirmed" => Some(TransactionStatus::Confirmed),
            "Completed" => Some(TransactionStatus::Completed),
            "Cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    /// Pending → Processing → {Delivered → Confirmed} | Completed | Cancelled.
    /// Confirmed, Completed and Cancelled are terminal, except that a
    /// Delivered donation may still be closed out as Completed by the
    /// confirmation flow.
    pub fn can_transition(self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Processing, Delivered)
                | (Processing, Completed)
                | (Processing, Cancelled)
                | (Delivered, Confirmed)
                | (Delivered, Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub farmer: String,
    pub buyer_donor: String,
    pub crop: String,
    pub quantity: String,
    pub amount_centavos: i64,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub title: Option<String>,
    pub message: String,
    pub image_url: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Organizations --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub contact_person: String,
    pub organization_name: String,
    pub contact_number: String,
    pub email: String,
    pub year_founded: i32,
    pub certification_url: String,
    pub created_at: DateTime<Utc>,
}

/// The single per-organization settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgSettings {
    pub account_name: String,
    pub account_email: String,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub app_notifications: bool,
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            account_name: "Admin User".into(),
            account_email: "admin@farmaid.org".into(),
            email_notifications: true,
            sms_notifications: false,
            app_notifications: true,
        }
    }
}

// -- Users --

/// Public user shape — the password hash never leaves farmaid-db.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: String,
    pub location: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unread_requires_donor_sender_and_unacknowledged_flag() {
        let mut thread = ChatThread {
            donor_id: "donor-42".into(),
            donor_name: "Maria Santos".into(),
            last_message: "Is the delivery confirmed?".into(),
            last_message_from: Sender::Donor,
            last_message_at: Some(Utc::now()),
            read_by_admin: false,
        };
        assert!(thread.is_unread());

        thread.read_by_admin = true;
        assert!(!thread.is_unread());

        thread.read_by_admin = false;
        thread.last_message_from = Sender::Admin;
        assert!(!thread.is_unread());
    }

    #[test]
    fn status_machine_allows_observed_paths() {
        use TransactionStatus::*;
        assert!(Pending.can_transition(Processing));
        assert!(Processing.can_transition(Delivered));
        assert!(Delivered.can_transition(Confirmed));
        assert!(Pending.can_transition(Completed));
        assert!(Processing.can_transition(Cancelled));
    }

    #[test]
    fn status_machine_rejects_backwards_and_terminal_moves() {
        use TransactionStatus::*;
        assert!(!Completed.can_transition(Pending));
        assert!(!Cancelled.can_transition(Processing));
        assert!(!Confirmed.can_transition(Completed));
        assert!(!Delivered.can_transition(Pending));
        assert!(!Pending.can_transition(Confirmed));
    }

    #[test]
    fn sender_round_trips_through_storage_text() {
        assert_eq!(Sender::parse(Sender::Admin.as_str()), Some(Sender::Admin));
        assert_eq!(Sender::parse(Sender::Donor.as_str()), Some(Sender::Donor));
        assert_eq!(Sender::parse("farmer"), None);
    }
}
