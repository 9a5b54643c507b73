//! Notification panel. Demo sessions with an empty store get seeded sample
//! rows so the panel never renders blank, mirroring the dashboard's
//! offline fallback.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use farmaid_types::api::{CreateNotificationRequest, NotificationQuery, UnreadCountResponse};
use farmaid_types::events::GatewayEvent;
use farmaid_types::models::{Claims, Notification};

use crate::auth::AppState;

const DEMO_UNREAD_COUNT: u32 = 3;

/// GET /notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub.clone();
    let rows = tokio::task::spawn_blocking(move || db.notifications_for_user(&user_id, query.limit))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    let mut notifications: Vec<Notification> =
        rows.into_iter().map(|r| r.into_notification()).collect();

    if notifications.is_empty() && claims.demo {
        notifications = sample_notifications(&claims.sub);
        notifications.truncate(query.limit as usize);
    }

    Ok(Json(notifications))
}

/// GET /notifications/unread-count — powers the bell badge.
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.demo {
        return Ok(Json(UnreadCountResponse {
            count: DEMO_UNREAD_COUNT,
        }));
    }

    let db = state.db.clone();
    let user_id = claims.sub.clone();
    let count = tokio::task::spawn_blocking(move || db.unread_notification_count(&user_id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    Ok(Json(UnreadCountResponse { count }))
}

/// POST /notifications — create one for the calling admin and push it over
/// the gateway.
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: claims.sub.clone(),
        title: req.title,
        message: req.message.trim().to_string(),
        image_url: None,
        read: false,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let stored = notification.clone();
    tokio::task::spawn_blocking(move || db.insert_notification(&stored))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    state
        .dispatcher
        .publish(GatewayEvent::NotificationCreate {
            notification: notification.clone(),
        })
        .await;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// PUT /notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let db = state.db.clone();
    let updated = tokio::task::spawn_blocking(move || {
        db.mark_notification_read(&id, &Utc::now().to_rfc3339())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(crate::store_error)?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// DELETE /notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let db = state.db.clone();
    let deleted = tokio::task::spawn_blocking(move || db.delete_notification(&id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn sample_notifications(user_id: &str) -> Vec<Notification> {
    let now = Utc::now();
    let sample = |message: &str, age: Duration, read: bool| Notification {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        title: None,
        message: message.to_string(),
        image_url: None,
        read,
        created_at: now - age,
    };
    vec![
        sample(
            "New donation received from Metro Food Bank",
            Duration::minutes(5),
            false,
        ),
        sample(
            "Donation DON-2023-001 has been delivered",
            Duration::hours(1),
            false,
        ),
        sample(
            "New organization registration pending approval",
            Duration::hours(3),
            false,
        ),
        sample(
            "Monthly donation report is ready",
            Duration::days(1),
            true,
        ),
        sample(
            "System maintenance scheduled for this weekend",
            Duration::days(2),
            true,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_feed_matches_the_demo_badge_count() {
        let samples = sample_notifications("demo-admin");
        let unread = samples.iter().filter(|n| !n.read).count();
        assert_eq!(unread as u32, DEMO_UNREAD_COUNT);
    }

    #[test]
    fn sample_feed_is_newest_first() {
        let samples = sample_notifications("demo-admin");
        assert!(samples.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}
