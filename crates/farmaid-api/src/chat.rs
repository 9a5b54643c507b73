//! Donor-organization chat: thread sidebar, message history and sends.
//!
//! Opening a thread acknowledges it. The read flag flips in the store and
//! the in-memory index in the same request, and a `ThreadUpdate` goes out so
//! every other admin session drops the unread badge too.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use farmaid_types::api::{SendMessageRequest, ThreadListResponse};
use farmaid_types::events::GatewayEvent;
use farmaid_types::models::{ChatMessage, Claims, Sender};

use crate::audit;
use crate::auth::AppState;

/// GET /chats — sidebar snapshot from the thread index.
pub async fn list_threads(State(state): State<AppState>) -> impl IntoResponse {
    let (threads, unread) = state.threads.snapshot().await;
    Json(ThreadListResponse { threads, unread })
}

/// GET /chats/{donor_id}/messages — full history, oldest first. Reading a
/// thread marks it as read.
pub async fn thread_messages(
    State(state): State<AppState>,
    Path(donor_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let id = donor_id.clone();
    let (messages, acknowledged) = tokio::task::spawn_blocking(move || {
        let messages = db.messages_for_thread(&id)?;
        let acknowledged = db.set_thread_read(&id)?;
        Ok::<_, farmaid_db::StoreError>((messages, acknowledged))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(crate::store_error)?;

    if let Some(row) = acknowledged {
        state.threads.mark_read(&donor_id).await;
        state
            .dispatcher
            .publish(GatewayEvent::ThreadUpdate {
                thread: row.into_thread(),
            })
            .await;
    }

    let messages: Vec<ChatMessage> = messages.into_iter().map(|m| m.into_message()).collect();
    Ok(Json(messages))
}

/// POST /chats/{donor_id}/messages — admin send.
pub async fn send_message(
    State(state): State<AppState>,
    Path(donor_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let text = req.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let image_url = req
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    if text.is_none() && image_url.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let message = ChatMessage {
        id: Uuid::new_v4(),
        thread_id: donor_id.clone(),
        text: text.map(String::from),
        image_url: image_url.map(String::from),
        sender: Sender::Admin,
        sender_name: claims.name.clone(),
        created_at: Utc::now(),
    };

    let donor_name = resolve_donor_name(&state, &donor_id).await?;

    let db = state.db.clone();
    let stored = message.clone();
    let thread_row = tokio::task::spawn_blocking(move || db.append_message(&stored, &donor_name))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    let thread = thread_row.into_thread();
    state.threads.apply(thread.clone()).await;
    state
        .dispatcher
        .publish(GatewayEvent::MessageCreate {
            message: message.clone(),
        })
        .await;
    state
        .dispatcher
        .publish(GatewayEvent::ThreadUpdate { thread })
        .await;

    info!("{} sent a message to thread {}", claims.name, donor_id);
    audit::log_admin_action(
        &state,
        "chat.send",
        &format!("thread '{}'", donor_id),
        &claims.sub,
    );

    Ok((StatusCode::CREATED, Json(message)))
}

/// The thread's display name: existing thread summary first, then the donor's
/// user record. "Donor" covers threads opened before the record exists.
async fn resolve_donor_name(state: &AppState, donor_id: &str) -> Result<String, StatusCode> {
    let db = state.db.clone();
    let id = donor_id.to_string();
    let name = tokio::task::spawn_blocking(move || {
        if let Some(thread) = db.get_thread(&id)? {
            return Ok(Some(thread.donor_name));
        }
        Ok::<_, farmaid_db::StoreError>(db.get_user_by_id(&id)?.map(|u| u.name))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(crate::store_error)?;

    Ok(name.unwrap_or_else(|| "Donor".into()))
}
