//! Raw-body uploads. The client sends the file bytes with its real
//! Content-Type and the original filename in the query string; the response
//! carries the durable blob URL to reference in a follow-up request.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;

use farmaid_blob::BlobKind;
use farmaid_types::api::UploadResponse;

use crate::auth::AppState;

/// HTTP body cap for upload routes. The blob store accepts files up to 5 MB,
/// so the axum default body limit is too small; this leaves headroom above
/// the blob cap so oversize files reach `BlobStore::validate` and get the
/// 413 with the real size in the log.
pub const BODY_LIMIT_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// POST /uploads/donations/{org_id}
pub async fn upload_donation_image(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    store_blob(&state, BlobKind::Donation { org_id: &org_id }, &query, &headers, &body).await
}

/// POST /uploads/donation-confirmations
pub async fn upload_confirmation_image(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    store_blob(&state, BlobKind::DonationConfirmation, &query, &headers, &body).await
}

/// POST /uploads/certifications — public, used by the registration form
/// before any account exists.
pub async fn upload_certification(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    store_blob(&state, BlobKind::Certification, &query, &headers, &body).await
}

/// POST /uploads/receipts/{donation_id}
pub async fn upload_receipt(
    State(state): State<AppState>,
    Path(donation_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    store_blob(
        &state,
        BlobKind::Receipt {
            donation_id: &donation_id,
        },
        &query,
        &headers,
        &body,
    )
    .await
}

/// POST /uploads/chat-images/{thread_id}
pub async fn upload_chat_image(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    store_blob(
        &state,
        BlobKind::ChatImage {
            thread_id: &thread_id,
        },
        &query,
        &headers,
        &body,
    )
    .await
}

async fn store_blob(
    state: &AppState,
    kind: BlobKind<'_>,
    query: &UploadQuery,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNSUPPORTED_MEDIA_TYPE)?;

    let filename = query.filename.clone();
    let blob = state
        .blobs
        .store(kind, &query.filename, content_type, body, |pct| {
            debug!("Upload '{}' at {}%", filename, pct);
        })
        .await
        .map_err(crate::blob_error)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: blob.url,
            sha256: blob.sha256,
            size: blob.size,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, body::Body, extract::DefaultBodyLimit, http::Request, routing::post};
    use tower::ServiceExt;

    use farmaid_blob::BlobStore;
    use farmaid_db::Database;
    use farmaid_gateway::dispatcher::Dispatcher;
    use farmaid_gateway::thread_index::ThreadIndex;

    use crate::auth::AppStateInner;

    use super::*;

    async fn upload_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(BlobStore::new(dir.path().to_path_buf()).await.unwrap());
        let state: AppState = Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            blobs,
            dispatcher: Dispatcher::new(),
            threads: ThreadIndex::new(),
            jwt_secret: "test-secret".into(),
        });
        let app = Router::new()
            .route(
                "/uploads/donation-confirmations",
                post(upload_confirmation_image),
            )
            .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
            .with_state(state);
        (dir, app)
    }

    fn jpeg_upload(size: usize) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/uploads/donation-confirmations?filename=receipt.jpg")
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(Body::from(vec![0u8; size]))
            .unwrap()
    }

    #[tokio::test]
    async fn bodies_up_to_the_blob_cap_are_accepted() {
        let (_dir, app) = upload_app().await;
        let response = app.oneshot(jpeg_upload(3 * 1024 * 1024)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn oversize_files_are_rejected_by_blob_validation() {
        let (_dir, app) = upload_app().await;
        // Over the 5 MB blob cap but under the HTTP body cap, so the
        // rejection comes from validation, not the transport layer.
        let response = app.oneshot(jpeg_upload(6 * 1024 * 1024)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
