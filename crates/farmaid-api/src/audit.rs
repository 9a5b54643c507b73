//! Audit trail for admin actions. Logging is best-effort: a failed audit
//! write never fails the action it describes.

use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use crate::auth::AppState;

pub fn log_admin_action(state: &AppState, action: &str, details: &str, actor: &str) {
    let id = Uuid::new_v4().to_string();
    if let Err(e) = state
        .db
        .insert_audit_log(&id, action, details, actor, &Utc::now().to_rfc3339())
    {
        error!("Audit write failed for '{}': {}", action, e);
    }
}
