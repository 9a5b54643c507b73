pub mod analytics;
pub mod audit;
pub mod auth;
pub mod chat;
pub mod donations;
pub mod export;
pub mod middleware;
pub mod notifications;
pub mod settings;
pub mod transactions;
pub mod uploads;
pub mod users;

use axum::http::StatusCode;
use tracing::error;

use farmaid_blob::BlobError;
use farmaid_db::StoreError;

/// Map store failures onto HTTP statuses. Anything unexpected is logged
/// here so handlers can stay terse.
pub(crate) fn store_error(e: StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(what) => {
            error!("Store lookup failed: {}", what);
            StatusCode::NOT_FOUND
        }
        StoreError::InvalidTransition { from, to } => {
            error!("Rejected status transition {:?} -> {:?}", from, to);
            StatusCode::CONFLICT
        }
        e => {
            error!("Store error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn blob_error(e: BlobError) -> StatusCode {
    match e {
        BlobError::InvalidType(t) => {
            error!("Rejected upload with content type '{}'", t);
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        BlobError::TooLarge { size, max } => {
            error!("Rejected upload of {} bytes (max {})", size, max);
            StatusCode::PAYLOAD_TOO_LARGE
        }
        BlobError::Empty => StatusCode::BAD_REQUEST,
        BlobError::Io(e) => {
            error!("Blob I/O error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
