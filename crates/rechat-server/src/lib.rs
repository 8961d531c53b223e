//! Re-Chat API Server Library
//!
//! Credential issuance and session management behind the Re-Chat front
//! end: invite-gated registration, login with JWT-backed sessions, user
//! administration, invite code lifecycle, PGP verification, and the
//! PIN-gated admin login.

pub mod activity;
pub mod admin;
pub mod auth;
pub mod config;
pub mod ctx;
pub mod db;
pub mod error;
pub mod invites;
pub mod models;
pub mod pgp;
pub mod stats;
pub mod users;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use auth::handlers as auth_handlers;
use auth::middleware::{mw_require_admin, mw_require_auth};
use config::{AppState, ServerConfig};

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Re-Chat Server ===");
    info!("Features: Auth | Invite Codes | Sessions | PGP Verification | Admin");

    rechat_common::init_structure()?;

    let config = ServerConfig::default();
    info!("Database: {:?}", config.database_path);

    // Open the shared pool and bring the schema up
    let pool = db::connect(&config.database_path).await?;
    db::init_schema(&pool).await?;
    db::ensure_admin_user(&pool).await?;
    info!("Database initialized");

    let state = AppState::new(config.clone(), pool);
    info!("Managers initialized");

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("");
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║  Re-Chat API Server Running                                ║");
    info!("║  Address: http://localhost:{}                            ║", config.port);
    info!("╚════════════════════════════════════════════════════════════╝");
    info!("");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the full API router
pub fn router(state: AppState) -> Router {
    // Admin panel routes: valid session + business plan
    let admin_routes = Router::new()
        .route("/api/users", get(users::handlers::list_users))
        .route("/api/users/{id}", get(users::handlers::get_user))
        .route("/api/users/{id}/details", get(users::handlers::get_user_details))
        .route("/api/users/{id}/activity", get(users::handlers::get_user_activity))
        .route("/api/users/{id}/plan", put(users::handlers::update_user_plan))
        .route("/api/users/{id}/role", put(users::handlers::update_user_role))
        .route("/api/users/{id}/status", put(users::handlers::update_user_status))
        .route(
            "/api/users/{id}/reset-password",
            post(users::handlers::create_reset_link),
        )
        .route(
            "/api/invite-codes",
            get(invites::handlers::list_invite_codes).post(invites::handlers::create_invite_codes),
        )
        .route(
            "/api/invite-codes/{id}",
            delete(invites::handlers::delete_invite_code),
        )
        .route(
            "/api/stats/users-by-country",
            get(stats::users_by_country_handler),
        )
        .route_layer(middleware::from_fn(mw_require_admin));

    // Routes for any authenticated user
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(auth_handlers::logout))
        .route("/api/auth/profile", get(auth_handlers::profile))
        .route("/api/pgp/challenge", post(pgp::handlers::begin_challenge))
        .route("/api/pgp/verify", post(pgp::handlers::verify_challenge))
        .route(
            "/api/admin/pin",
            get(admin::handlers::pin_status).post(admin::handlers::register_pin),
        )
        .route("/api/admin/pin/verify", post(admin::handlers::verify_pin))
        .route("/api/admin/pgp/challenge", post(admin::handlers::pgp_challenge))
        .route("/api/admin/pgp/verify", post(admin::handlers::pgp_verify))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), mw_require_auth));

    Router::new()
        // Public endpoints
        .route("/api/auth/register", post(auth_handlers::register))
        .route("/api/auth/login", post(auth_handlers::login))
        .route(
            "/api/auth/reset-password/{token}",
            post(auth_handlers::reset_password),
        )
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK - Re-Chat API Server"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
