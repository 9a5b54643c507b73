//! Recent-users panel. Same demo fallback shape as the notification feed:
//! an empty store on a demo session serves sample rows.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use farmaid_types::api::UserQuery;
use farmaid_types::models::{Claims, User};

use crate::auth::AppState;

/// GET /users — newest accounts first.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_users(query.limit))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?;

    let mut users: Vec<User> = rows.into_iter().map(|r| r.into_user()).collect();

    if users.is_empty() && claims.demo {
        users = sample_users();
        users.truncate(query.limit as usize);
    }

    Ok(Json(users))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.get_user_by_id(&id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(crate::store_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(row.into_user()))
}

fn sample_users() -> Vec<User> {
    let now = Utc::now();
    let sample = |id: &str, name: &str, role: &str, location: &str, age: Duration| User {
        id: id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        location: Some(location.to_string()),
        joined_at: Some(now - age),
        email: None,
    };
    vec![
        sample("sample-1", "Juan Dela Cruz", "Farmer", "Nueva Ecija", Duration::days(1)),
        sample("sample-2", "Maria Santos", "Donor", "Quezon City", Duration::days(2)),
        sample("sample-3", "Pedro Reyes", "Farmer", "Ilocos Norte", Duration::days(4)),
        sample("sample-4", "Metro Food Bank", "Organization", "Manila", Duration::days(7)),
        sample("sample-5", "Ana Villanueva", "Donor", "Cebu City", Duration::days(9)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_roster_is_newest_first() {
        let users = sample_users();
        assert!(users.windows(2).all(|w| w[0].joined_at >= w[1].joined_at));
        assert!(users.iter().all(|u| u.location.is_some()));
    }
}
