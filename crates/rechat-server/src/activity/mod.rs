//! Activity Log Module
//!
//! Every state-changing operation leaves a row in `activity_logs` so the
//! admin panel can show who did what, and failed logins are traceable.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

/// Action tag recorded with each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Register,
    Login,
    LoginFailed,
    Logout,
    UpdateUserPlan,
    UpdateUserRole,
    UpdateUserStatus,
    GenerateInviteCode,
    DeleteInviteCode,
    ResetPassword,
    PgpVerified,
    AdminPinSet,
    AdminPinVerified,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Register => "REGISTER",
            ActivityAction::Login => "LOGIN",
            ActivityAction::LoginFailed => "LOGIN_FAILED",
            ActivityAction::Logout => "LOGOUT",
            ActivityAction::UpdateUserPlan => "UPDATE_USER_PLAN",
            ActivityAction::UpdateUserRole => "UPDATE_USER_ROLE",
            ActivityAction::UpdateUserStatus => "UPDATE_USER_STATUS",
            ActivityAction::GenerateInviteCode => "GENERATE_INVITE_CODE",
            ActivityAction::DeleteInviteCode => "DELETE_INVITE_CODE",
            ActivityAction::ResetPassword => "RESET_PASSWORD",
            ActivityAction::PgpVerified => "PGP_VERIFIED",
            ActivityAction::AdminPinSet => "ADMIN_PIN_SET",
            ActivityAction::AdminPinVerified => "ADMIN_PIN_VERIFIED",
        }
    }
}

/// A recorded activity entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only log over the shared pool
pub struct ActivityLog {
    pool: SqlitePool,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an entry. Logging must never fail a request, so errors are
    /// reported and swallowed.
    pub async fn log(
        &self,
        user_id: i64,
        action: ActivityAction,
        details: impl Into<String>,
        ip_address: Option<&str>,
    ) {
        if let Err(e) = self.insert(user_id, action, details.into(), ip_address).await {
            warn!("[Activity] Failed to record {}: {}", action.as_str(), e);
        }
    }

    async fn insert(
        &self,
        user_id: i64,
        action: ActivityAction,
        details: String,
        ip_address: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO activity_logs (user_id, action, details, ip_address, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(details)
        .bind(ip_address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent entries for a user, newest first
    pub async fn recent(&self, user_id: i64, limit: i64) -> Result<Vec<ActivityEntry>> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            "SELECT id, user_id, action, details, ip_address, created_at \
             FROM activity_logs WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use tempfile::TempDir;

    async fn seed_user(pool: &SqlitePool) -> i64 {
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, join_date) VALUES (?, ?, ?, ?)",
        )
        .bind("alice")
        .bind("alice@example.com")
        .bind("hash")
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_log_and_recent() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let user_id = seed_user(&pool).await;
        let log = ActivityLog::new(pool);

        log.log(user_id, ActivityAction::Login, "Successful login", Some("127.0.0.1"))
            .await;
        log.log(user_id, ActivityAction::Logout, "User logged out", None)
            .await;

        let entries = log.recent(user_id, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].action, "LOGOUT");
        assert_eq!(entries[1].action, "LOGIN");
        assert_eq!(entries[1].ip_address.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let user_id = seed_user(&pool).await;
        let log = ActivityLog::new(pool);

        for i in 0..5 {
            log.log(user_id, ActivityAction::LoginFailed, format!("attempt {}", i), None)
                .await;
        }

        let entries = log.recent(user_id, 3).await.unwrap();
        assert_eq!(entries.len(), 3);
    }
}
