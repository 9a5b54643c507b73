//! Donation confirmation: one admin action that completes the transaction,
//! thanks the donor in chat and leaves them a notification, atomically.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use farmaid_types::api::{ConfirmDonationRequest, ConfirmDonationResponse};
use farmaid_types::events::GatewayEvent;
use farmaid_types::models::{ChatMessage, Claims, Notification, Sender, TransactionKind};

use crate::audit;
use crate::auth::AppState;

async fn discard_receipt(state: &AppState, receipt_url: Option<&str>) {
    if let Some(url) = receipt_url {
        if let Err(e) = state.blobs.delete(url).await {
            warn!("Failed to discard orphaned receipt '{}': {}", url, e);
        }
    }
}

/// POST /donations/{id}/confirm
pub async fn confirm_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmDonationRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let note = req.note.trim().to_string();
    if note.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let receipt_url = req
        .receipt_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from);

    // Resolve the donor behind the transaction's buyer/donor name; the chat
    // thread and the notification are both keyed by their user id.
    let db = state.db.clone();
    let lookup = id.clone();
    let (transaction, donor) = tokio::task::spawn_blocking(move || {
        let transaction = db.get_transaction(&lookup)?;
        let donor = match &transaction {
            Some(t) => db.find_user_by_name(&t.buyer_donor)?,
            None => None,
        };
        Ok::<_, farmaid_db::StoreError>((transaction, donor))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(crate::store_error)?;

    let transaction = transaction.ok_or(StatusCode::NOT_FOUND)?;
    if transaction.kind != TransactionKind::Donation.as_str() {
        return Err(StatusCode::CONFLICT);
    }
    let Some(donor) = donor else {
        warn!(
            "Cannot confirm {}: no donor record named '{}'",
            id, transaction.buyer_donor
        );
        discard_receipt(&state, receipt_url.as_deref()).await;
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let message = ChatMessage {
        id: Uuid::new_v4(),
        thread_id: donor.id.clone(),
        text: Some(note.clone()),
        image_url: receipt_url.clone(),
        sender: Sender::Admin,
        sender_name: claims.name.clone(),
        created_at: Utc::now(),
    };
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: donor.id.clone(),
        title: Some("Donation confirmation".into()),
        message: note,
        image_url: receipt_url.clone(),
        read: false,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let target = id.clone();
    let stored_message = message.clone();
    let stored_notification = notification.clone();
    let donor_name = donor.name.clone();
    let result = tokio::task::spawn_blocking(move || {
        let row = db.confirm_donation(
            &target,
            &stored_message,
            &donor_name,
            &stored_notification,
        )?;
        let thread = db.get_thread(&stored_message.thread_id)?;
        Ok::<_, farmaid_db::StoreError>((row, thread))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let (row, thread_row) = match result {
        Ok(ok) => ok,
        Err(e) => {
            // The receipt was uploaded before this call; on a rolled-back
            // confirmation nothing references it anymore.
            discard_receipt(&state, receipt_url.as_deref()).await;
            return Err(crate::store_error(e));
        }
    };

    let transaction = row.into_transaction();
    state
        .dispatcher
        .publish(GatewayEvent::TransactionUpdate {
            transaction_id: transaction.id.clone(),
            status: transaction.status,
        })
        .await;
    state
        .dispatcher
        .publish(GatewayEvent::MessageCreate {
            message: message.clone(),
        })
        .await;
    if let Some(thread_row) = thread_row {
        let thread = thread_row.into_thread();
        state.threads.apply(thread.clone()).await;
        state
            .dispatcher
            .publish(GatewayEvent::ThreadUpdate { thread })
            .await;
    }
    state
        .dispatcher
        .publish(GatewayEvent::NotificationCreate { notification })
        .await;

    info!("{} confirmed donation {}", claims.name, id);
    audit::log_admin_action(
        &state,
        "donation.confirm",
        &format!("transaction '{}' for donor '{}'", id, donor.name),
        &claims.sub,
    );

    Ok(Json(ConfirmDonationResponse {
        transaction_id: transaction.id,
        status: transaction.status,
        message,
    }))
}
