//! Admin Access Module
//!
//! The admin panel sits behind a second login: a 6-digit PIN plus a PGP
//! challenge. PINs are stored bcrypt-hashed; an account that never set one
//! falls back to the well-known demo PIN so the first-time-setup wizard
//! can complete.

pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityLog};

/// Fallback accepted when no PIN row exists yet
pub const DEFAULT_ADMIN_PIN: &str = "123456";

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("PIN must be exactly 6 digits")]
    InvalidPin,
    #[error("Incorrect PIN")]
    PinMismatch,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn validate_pin(pin: &str) -> Result<(), AdminError> {
    if pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AdminError::InvalidPin)
    }
}

/// Admin access manager owns the admin_pins table
pub struct AdminAccessManager {
    pool: SqlitePool,
    activity: Arc<ActivityLog>,
}

impl AdminAccessManager {
    pub fn new(pool: SqlitePool, activity: Arc<ActivityLog>) -> Self {
        Self { pool, activity }
    }

    /// Whether the user has completed first-time PIN setup
    pub async fn has_pin(&self, user_id: i64) -> Result<bool, AdminError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM admin_pins WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Register or replace the user's PIN
    pub async fn register_pin(&self, user_id: i64, pin: &str) -> Result<(), AdminError> {
        validate_pin(pin)?;

        let pin_hash = hash(pin, DEFAULT_COST).context("Failed to hash PIN")?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO admin_pins (user_id, pin_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET pin_hash = excluded.pin_hash, \
             updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(&pin_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.activity
            .log(user_id, ActivityAction::AdminPinSet, "Admin PIN registered", None)
            .await;

        info!("[Admin] PIN registered for user {}", user_id);

        Ok(())
    }

    /// Verify the PIN and stamp the verification time. Without a stored
    /// PIN the demo fallback applies.
    pub async fn verify_pin(&self, user_id: i64, pin: &str) -> Result<DateTime<Utc>, AdminError> {
        validate_pin(pin)?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT pin_hash FROM admin_pins WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let ok = match &row {
            Some((pin_hash,)) => verify(pin, pin_hash).context("Failed to verify PIN")?,
            None => pin == DEFAULT_ADMIN_PIN,
        };

        if !ok {
            warn!("[Admin] Failed PIN attempt for user {}", user_id);
            return Err(AdminError::PinMismatch);
        }

        let now = Utc::now();
        if row.is_some() {
            sqlx::query("UPDATE admin_pins SET last_verified_at = ? WHERE user_id = ?")
                .bind(now)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        }

        self.activity
            .log(user_id, ActivityAction::AdminPinVerified, "Admin PIN verified", None)
            .await;

        Ok(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use tempfile::TempDir;

    async fn setup(dir: &TempDir) -> (AdminAccessManager, i64) {
        let pool = test_pool(dir).await;
        let activity = Arc::new(ActivityLog::new(pool.clone()));
        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, join_date) VALUES (?, ?, ?, ?)",
        )
        .bind("admin")
        .bind("admin@rechat.to")
        .bind("hash")
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();
        (AdminAccessManager::new(pool, activity), user_id)
    }

    #[tokio::test]
    async fn test_pin_validation() {
        let dir = TempDir::new().unwrap();
        let (admin, user_id) = setup(&dir).await;

        for bad in ["12345", "1234567", "12345a", ""] {
            assert!(matches!(
                admin.register_pin(user_id, bad).await.unwrap_err(),
                AdminError::InvalidPin
            ));
        }
    }

    #[tokio::test]
    async fn test_register_and_verify_pin() {
        let dir = TempDir::new().unwrap();
        let (admin, user_id) = setup(&dir).await;

        assert!(!admin.has_pin(user_id).await.unwrap());
        admin.register_pin(user_id, "493817").await.unwrap();
        assert!(admin.has_pin(user_id).await.unwrap());

        admin.verify_pin(user_id, "493817").await.unwrap();
        assert!(matches!(
            admin.verify_pin(user_id, "000000").await.unwrap_err(),
            AdminError::PinMismatch
        ));

        // Once a real PIN exists the demo fallback stops working
        assert!(matches!(
            admin.verify_pin(user_id, DEFAULT_ADMIN_PIN).await.unwrap_err(),
            AdminError::PinMismatch
        ));
    }

    #[tokio::test]
    async fn test_demo_fallback_without_registered_pin() {
        let dir = TempDir::new().unwrap();
        let (admin, user_id) = setup(&dir).await;

        admin.verify_pin(user_id, DEFAULT_ADMIN_PIN).await.unwrap();
        assert!(matches!(
            admin.verify_pin(user_id, "999999").await.unwrap_err(),
            AdminError::PinMismatch
        ));
    }

    #[tokio::test]
    async fn test_pin_replacement() {
        let dir = TempDir::new().unwrap();
        let (admin, user_id) = setup(&dir).await;

        admin.register_pin(user_id, "111111").await.unwrap();
        admin.register_pin(user_id, "222222").await.unwrap();

        assert!(admin.verify_pin(user_id, "222222").await.is_ok());
        assert!(matches!(
            admin.verify_pin(user_id, "111111").await.unwrap_err(),
            AdminError::PinMismatch
        ));
    }
}
