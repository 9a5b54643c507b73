//! The single organization settings document. Reads before the first save
//! serve the defaults the dashboard shipped with.

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};

use farmaid_db::models::SettingsRow;
use farmaid_types::api::UpdateSettingsRequest;
use farmaid_types::models::{Claims, OrgSettings};

use crate::audit;
use crate::auth::AppState;

/// GET /settings
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.get_settings())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    let settings = match row {
        Some(row) => OrgSettings {
            account_name: row.account_name,
            account_email: row.account_email,
            email_notifications: row.email_notifications,
            sms_notifications: row.sms_notifications,
            app_notifications: row.app_notifications,
        },
        None => OrgSettings::default(),
    };
    Ok(Json(settings))
}

/// PUT /settings — whole-document save, matching the panel's single form.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.account_name.trim().is_empty() || req.account_email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let settings = OrgSettings {
        account_name: req.account_name.trim().to_string(),
        account_email: req.account_email.trim().to_string(),
        email_notifications: req.email_notifications,
        sms_notifications: req.sms_notifications,
        app_notifications: req.app_notifications,
    };

    let db = state.db.clone();
    let row = SettingsRow {
        account_name: settings.account_name.clone(),
        account_email: settings.account_email.clone(),
        email_notifications: settings.email_notifications,
        sms_notifications: settings.sms_notifications,
        app_notifications: settings.app_notifications,
    };
    tokio::task::spawn_blocking(move || db.upsert_settings(&row))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    audit::log_admin_action(&state, "settings.update", "organization settings", &claims.sub);

    Ok(Json(settings))
}
