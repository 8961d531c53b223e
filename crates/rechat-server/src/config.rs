//! Re-Chat server configuration

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::activity::ActivityLog;
use crate::admin::AdminAccessManager;
use crate::auth::AuthManager;
use crate::invites::InviteManager;
use crate::pgp::PgpManager;
use crate::users::UserDirectory;

/// Configuration for the Re-Chat API server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Port the HTTP listener binds to
    pub port: u16,
    /// Secret used to sign JWTs
    pub jwt_secret: String,
    /// Session and token lifetime in hours
    pub session_ttl_hours: i64,
    /// Base URL password-reset links point at
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: rechat_common::db_path(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            session_ttl_hours: 24,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        }
    }
}

impl ServerConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.database_path = base_dir.into().join("rechat.sqlite");
        config
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub pool: SqlitePool,
    pub auth: Arc<AuthManager>,
    pub invites: Arc<InviteManager>,
    pub users: Arc<UserDirectory>,
    pub pgp: Arc<PgpManager>,
    pub admin: Arc<AdminAccessManager>,
    pub activity: Arc<ActivityLog>,
}

impl AppState {
    /// Wire all managers onto a shared pool
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let activity = Arc::new(ActivityLog::new(pool.clone()));
        Self {
            auth: Arc::new(AuthManager::new(
                pool.clone(),
                config.jwt_secret.as_bytes(),
                config.session_ttl_hours,
                activity.clone(),
            )),
            invites: Arc::new(InviteManager::new(pool.clone())),
            users: Arc::new(UserDirectory::new(pool.clone())),
            pgp: Arc::new(PgpManager::new(pool.clone(), activity.clone())),
            admin: Arc::new(AdminAccessManager::new(pool.clone(), activity.clone())),
            activity,
            config,
            pool,
        }
    }
}
