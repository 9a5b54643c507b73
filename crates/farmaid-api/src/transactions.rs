//! Transactions panel: filtered listing and explicit status moves.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use farmaid_types::api::{TransactionQuery, UpdateStatusRequest};
use farmaid_types::events::GatewayEvent;
use farmaid_types::models::{Claims, Transaction};

use crate::audit;
use crate::auth::AppState;

/// GET /transactions — newest first, with optional search/kind/status
/// filters that compose.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.list_transactions(
            query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            query.kind.as_deref(),
            query.status.as_deref(),
        )
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(crate::store_error)?;

    let transactions: Vec<Transaction> =
        rows.into_iter().map(|r| r.into_transaction()).collect();
    Ok(Json(transactions))
}

/// GET /transactions/{id}
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let lookup = id.clone();
    let row = tokio::task::spawn_blocking(move || db.get_transaction(&lookup))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(row.into_transaction()))
}

/// PUT /transactions/{id}/status — lifecycle-checked status move. A rejected
/// transition comes back as 409.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let target = id.clone();
    let row = tokio::task::spawn_blocking(move || db.update_transaction_status(&target, req.status))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    let transaction = row.into_transaction();
    state
        .dispatcher
        .publish(GatewayEvent::TransactionUpdate {
            transaction_id: transaction.id.clone(),
            status: transaction.status,
        })
        .await;

    info!(
        "{} moved transaction {} to {:?}",
        claims.name, id, transaction.status
    );
    audit::log_admin_action(
        &state,
        "transaction.status",
        &format!("{} -> {}", id, transaction.status.as_str()),
        &claims.sub,
    );

    Ok(Json(transaction))
}
