use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, ChatThread, Notification, TransactionStatus};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: String, name: String },

    /// A thread's denormalized summary changed (new message, read flag)
    ThreadUpdate { thread: ChatThread },

    /// A new message was appended to a thread
    MessageCreate { message: ChatMessage },

    /// A donation/transaction moved to a new status
    TransactionUpdate {
        transaction_id: String,
        status: TransactionStatus,
    },

    /// A notification was created for a specific user
    NotificationCreate { notification: Notification },
}

impl GatewayEvent {
    /// Returns the thread id if this event is scoped to a specific thread.
    /// Events that return `None` are delivered regardless of subscriptions.
    /// ThreadUpdate is deliberately unscoped: every admin session keeps its
    /// sidebar current without subscribing to each thread.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::MessageCreate { message } => Some(&message.thread_id),
            _ => None,
        }
    }

    /// Returns the user id if this event targets a single user.
    pub fn target_user(&self) -> Option<&str> {
        match self {
            Self::NotificationCreate { notification } => Some(&notification.user_id),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to events for specific chat threads.
    /// The server only forwards thread-scoped events for subscribed threads.
    Subscribe { thread_ids: Vec<String> },
}
