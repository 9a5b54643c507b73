use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use farmaid_api::auth::{self, AppState, AppStateInner};
use farmaid_api::middleware::require_auth;
use farmaid_api::{
    analytics, chat, donations, export, notifications, settings, transactions, uploads, users,
};
use farmaid_blob::BlobStore;
use farmaid_gateway::connection;
use farmaid_gateway::dispatcher::Dispatcher;
use farmaid_gateway::thread_index::ThreadIndex;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmaid=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("FARMAID_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: FARMAID_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }
    let db_path = std::env::var("FARMAID_DB_PATH").unwrap_or_else(|_| "farmaid.db".into());
    let blob_dir = std::env::var("FARMAID_BLOB_DIR").unwrap_or_else(|_| "blobs".into());
    let host = std::env::var("FARMAID_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FARMAID_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Stores
    let db = Arc::new(farmaid_db::Database::open(&PathBuf::from(&db_path))?);
    let blobs = Arc::new(BlobStore::new(PathBuf::from(&blob_dir)).await?);

    bootstrap_admin(&db)?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let threads = ThreadIndex::new();
    tokio::spawn(threads.clone().run(db.clone(), dispatcher.clone()));

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        blobs,
        dispatcher: dispatcher.clone(),
        threads,
        jwt_secret: jwt_secret.clone(),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register-organization", post(auth::register_organization))
        .route(
            "/uploads/certifications",
            post(uploads::upload_certification)
                .layer(DefaultBodyLimit::max(uploads::BODY_LIMIT_BYTES)),
        )
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/chats", get(chat::list_threads))
        .route("/chats/{donor_id}/messages", get(chat::thread_messages))
        .route("/chats/{donor_id}/messages", post(chat::send_message))
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/{id}", get(transactions::get_transaction))
        .route("/transactions/{id}/status", put(transactions::update_status))
        .route("/donations/{id}/confirm", post(donations::confirm_donation))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications", post(notifications::create_notification))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .route("/notifications/{id}", delete(notifications::delete_notification))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/analytics", get(analytics::get_analytics))
        .route("/settings", get(settings::get_settings))
        .route("/settings", put(settings::update_settings))
        .route("/export", get(export::export_backup))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state.clone());

    // Upload bodies may carry a full-size blob; raise the default body cap.
    let upload_routes = Router::new()
        .route("/uploads/donations/{org_id}", post(uploads::upload_donation_image))
        .route("/uploads/donation-confirmations", post(uploads::upload_confirmation_image))
        .route("/uploads/receipts/{donation_id}", post(uploads::upload_receipt))
        .route("/uploads/chat-images/{thread_id}", post(uploads::upload_chat_image))
        .layer(middleware::from_fn(require_auth))
        .layer(DefaultBodyLimit::max(uploads::BODY_LIMIT_BYTES))
        .with_state(app_state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(app_state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(upload_routes)
        .merge(ws_route)
        .nest_service("/blobs", ServeDir::new(app_state.blobs.root()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("FarmAid server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}

/// Create the first admin account from the environment when the user table
/// is empty. Without it only the demo bypass can sign in.
fn bootstrap_admin(db: &farmaid_db::Database) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("FARMAID_ADMIN_EMAIL"),
        std::env::var("FARMAID_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    if db.get_user_by_email(&email)?.is_some() {
        return Ok(());
    }
    if password.len() < 8 {
        warn!("FARMAID_ADMIN_PASSWORD too short, skipping admin bootstrap");
        return Ok(());
    }

    let hash = farmaid_api::auth::hash_password(&password)?;
    db.create_user(
        &uuid::Uuid::new_v4().to_string(),
        "Admin User",
        &email,
        &hash,
        "Admin",
        &chrono::Utc::now().to_rfc3339(),
    )?;
    info!("Bootstrapped admin account {}", email);
    Ok(())
}
