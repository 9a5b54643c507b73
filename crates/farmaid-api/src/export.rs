//! Backup download: every collection in one JSON document.

use axum::{
    Json,
    extract::{Extension, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;

use farmaid_types::api::BackupDocument;
use farmaid_types::models::Claims;

use crate::audit;
use crate::auth::AppState;

/// GET /export — served as an attachment so the browser downloads it.
pub async fn export_backup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let collections = tokio::task::spawn_blocking(move || db.export_collections())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    let exported_at = Utc::now();
    let filename = format!(
        "farmaid-backup-{}.json",
        exported_at.format("%Y-%m-%dT%H-%M-%S")
    );

    audit::log_admin_action(&state, "backup.export", &filename, &claims.sub);

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )],
        Json(BackupDocument {
            exported_at,
            collections,
        }),
    ))
}
