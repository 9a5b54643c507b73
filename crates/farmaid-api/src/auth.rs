use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Datelike, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use farmaid_blob::BlobStore;
use farmaid_db::Database;
use farmaid_gateway::dispatcher::Dispatcher;
use farmaid_gateway::thread_index::ThreadIndex;
use farmaid_types::api::{
    LoginRequest, LoginResponse, RegisterOrganizationRequest, RegisterOrganizationResponse,
};
use farmaid_types::models::Claims;

use crate::audit;

/// Demo bypass, kept from the original dashboard: this email signs in with
/// any password and is never backed by a user row.
pub const DEMO_EMAIL: &str = "admin@farmaid.gov";
pub const DEMO_USER_ID: &str = "demo-admin";
pub const DEMO_NAME: &str = "Demo Admin";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub blobs: Arc<BlobStore>,
    pub dispatcher: Dispatcher,
    pub threads: ThreadIndex,
    pub jwt_secret: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.email == DEMO_EMAIL {
        info!("Demo admin signed in");
        let token = create_token(&state.jwt_secret, DEMO_USER_ID, DEMO_NAME, true)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        return Ok(Json(LoginResponse {
            user_id: DEMO_USER_ID.into(),
            name: DEMO_NAME.into(),
            token,
            demo: true,
        }));
    }

    let user = state
        .db
        .get_user_by_email(&req.email)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Users imported from donor records carry no password and cannot log in.
    let stored = user.password.as_deref().ok_or(StatusCode::UNAUTHORIZED)?;
    let parsed_hash = PasswordHash::new(stored).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = create_token(&state.jwt_secret, &user.id, &user.name, false)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        name: user.name,
        token,
        demo: false,
    }))
}

/// Public endpoint: organizations apply for an account before they can log
/// in. The certification has already been uploaded via the public
/// certification upload route.
pub async fn register_organization(
    State(state): State<AppState>,
    Json(req): Json<RegisterOrganizationRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    validate_registration(&req).map_err(|reason| {
        info!("Rejected organization registration: {}", reason);
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    let id = Uuid::new_v4();
    state
        .db
        .insert_organization(
            &id.to_string(),
            req.contact_person.trim(),
            req.organization_name.trim(),
            req.contact_number.trim(),
            req.email.trim(),
            req.year_founded,
            &req.certification_url,
            &Utc::now().to_rfc3339(),
        )
        .map_err(crate::store_error)?;

    audit::log_admin_action(
        &state,
        "organization.register",
        &format!("organization '{}'", req.organization_name.trim()),
        "system",
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterOrganizationResponse { organization_id: id }),
    ))
}

fn validate_registration(req: &RegisterOrganizationRequest) -> Result<(), &'static str> {
    if req.contact_person.trim().is_empty() {
        return Err("contact person is required");
    }
    if req.organization_name.trim().is_empty() {
        return Err("organization name is required");
    }
    if req.contact_number.trim().is_empty() {
        return Err("contact number is required");
    }
    if !is_valid_email(req.email.trim()) {
        return Err("invalid email address");
    }
    let current_year = Utc::now().year();
    if req.year_founded < 1900 || req.year_founded > current_year {
        return Err("invalid year founded");
    }
    if req.certification_url.trim().is_empty() {
        return Err("certification is required");
    }
    Ok(())
}

/// Same shape the dashboard enforced: something@something.tld, no spaces.
fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn create_token(secret: &str, user_id: &str, name: &str, demo: bool) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        demo,
        exp: (Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash failed: {}", e))?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterOrganizationRequest {
        RegisterOrganizationRequest {
            contact_person: "Ana Reyes".into(),
            organization_name: "Metro Food Bank".into(),
            contact_number: "+63-2-555-0199".into(),
            email: "contact@metrofoodbank.ph".into(),
            year_founded: 2010,
            certification_url: "/blobs/certifications/1_cert.pdf".into(),
        }
    }

    #[test]
    fn registration_requires_every_field() {
        assert!(validate_registration(&request()).is_ok());

        let mut r = request();
        r.contact_person = "  ".into();
        assert!(validate_registration(&r).is_err());

        let mut r = request();
        r.certification_url = "".into();
        assert!(validate_registration(&r).is_err());

        let mut r = request();
        r.year_founded = 1850;
        assert!(validate_registration(&r).is_err());

        let mut r = request();
        r.year_founded = Utc::now().year() + 1;
        assert!(validate_registration(&r).is_err());
    }

    #[test]
    fn email_shape_matches_the_dashboard_rule() {
        assert!(is_valid_email("maria@donors.ph"));
        assert!(is_valid_email("a.b@c.d.e"));

        assert!(!is_valid_email("no-at-sign.ph"));
        assert!(!is_valid_email("spaces in@mail.ph"));
        assert!(!is_valid_email("@missing-local.ph"));
        assert!(!is_valid_email("no-tld@domain"));
        assert!(!is_valid_email("trailing-dot@domain."));
    }

    #[test]
    fn password_hashes_verify_and_are_salted() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"correct horse", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong horse", &parsed)
                .is_err()
        );
        assert_ne!(hash, hash_password("correct horse").unwrap());
    }
}
