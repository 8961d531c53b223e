//! Invite Code Module
//!
//! Registration is invite-gated: a code is single-use, carries the plan the
//! new account will receive, and expires. Lifecycle is unused -> used, with
//! redemption running inside the caller's transaction so a code can never
//! be spent twice.

pub mod handlers;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::models::Plan;

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("Invalid invite code")]
    Invalid,
    #[error("This invite code has expired")]
    Expired,
    #[error("This invite code has already been used")]
    AlreadyUsed,
    #[error("Invite code not found")]
    NotFound,
    #[error("Cannot delete a used invite code")]
    DeleteUsed,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// How long a batch of codes stays redeemable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationUnit {
    Hours,
    Days,
    Weeks,
    Years,
}

impl ExpirationUnit {
    pub fn duration(&self, value: i64) -> Duration {
        match self {
            ExpirationUnit::Hours => Duration::hours(value),
            ExpirationUnit::Days => Duration::days(value),
            ExpirationUnit::Weeks => Duration::weeks(value),
            ExpirationUnit::Years => Duration::days(value * 365),
        }
    }
}

impl FromStr for ExpirationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hours" => Ok(ExpirationUnit::Hours),
            "days" => Ok(ExpirationUnit::Days),
            "weeks" => Ok(ExpirationUnit::Weeks),
            "years" => Ok(ExpirationUnit::Years),
            other => Err(format!("Invalid expiration unit: {}", other)),
        }
    }
}

/// Invite code record as the admin panel sees it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InviteCode {
    pub id: i64,
    pub code: String,
    pub plan: Plan,
    pub used: bool,
    pub used_by_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Invite manager handles code generation and lifecycle
pub struct InviteManager {
    pool: SqlitePool,
}

impl InviteManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a batch of codes, all sharing one expiry
    pub async fn generate(
        &self,
        plan: Plan,
        quantity: u32,
        expiration_value: i64,
        expiration_unit: ExpirationUnit,
    ) -> Result<Vec<InviteCode>> {
        let now = Utc::now();
        let expires_at = now + expiration_unit.duration(expiration_value);

        let mut codes = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let code = generate_invite_code(plan);

            let result = sqlx::query(
                "INSERT INTO invite_codes (code, plan, created_at, expires_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&code)
            .bind(plan)
            .bind(now)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

            codes.push(InviteCode {
                id: result.last_insert_rowid(),
                code,
                plan,
                used: false,
                used_by_username: None,
                created_at: now,
                expires_at: Some(expires_at),
            });
        }

        info!("[Invites] Generated {} {} code(s)", codes.len(), plan);

        Ok(codes)
    }

    /// All codes, newest first, with the redeemer's username joined in
    pub async fn list(&self) -> Result<Vec<InviteCode>> {
        let codes = sqlx::query_as::<_, InviteCode>(
            r#"
            SELECT ic.id, ic.code, ic.plan, ic.used,
                   u.username AS used_by_username,
                   ic.created_at, ic.expires_at
            FROM invite_codes ic
            LEFT JOIN users u ON ic.used_by = u.id
            ORDER BY ic.created_at DESC, ic.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    /// Delete an unused code
    pub async fn delete(&self, id: i64) -> Result<(), InviteError> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT used FROM invite_codes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Err(InviteError::NotFound),
            Some((true,)) => Err(InviteError::DeleteUsed),
            Some((false,)) => {
                sqlx::query("DELETE FROM invite_codes WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                info!("[Invites] Deleted code {}", id);
                Ok(())
            }
        }
    }

    /// Classify a code for redemption inside the caller's transaction.
    /// Distinguishes expired and already-used codes from unknown ones.
    pub async fn lookup_for_redemption(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> Result<(i64, Plan), InviteError> {
        let row: Option<(i64, Plan, bool, Option<DateTime<Utc>>)> =
            sqlx::query_as("SELECT id, plan, used, expires_at FROM invite_codes WHERE code = ?")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?;

        match row {
            None => Err(InviteError::Invalid),
            Some((_, _, true, _)) => Err(InviteError::AlreadyUsed),
            Some((_, _, false, Some(expires_at))) if expires_at <= Utc::now() => {
                Err(InviteError::Expired)
            }
            Some((id, plan, false, _)) => Ok((id, plan)),
        }
    }

    /// Flip a code to used. The WHERE guard keeps the transition one-shot
    /// even if two transactions raced past the lookup.
    pub async fn mark_used(
        conn: &mut SqliteConnection,
        code_id: i64,
        user_id: i64,
        username: &str,
    ) -> Result<(), InviteError> {
        let result = sqlx::query(
            "UPDATE invite_codes SET used = 1, used_by = ?, used_by_username = ? \
             WHERE id = ? AND used = 0",
        )
        .bind(user_id)
        .bind(username)
        .bind(code_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InviteError::AlreadyUsed);
        }
        Ok(())
    }
}

/// Plan-prefixed code like `PREMIUM-4F7K-9QZ2`
fn generate_invite_code(plan: Plan) -> String {
    format!(
        "{}-{}-{}",
        plan.as_str().to_uppercase(),
        random_segment(4),
        random_segment(4)
    )
}

fn random_segment(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = OsRng;
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_code_format_and_batch() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let invites = InviteManager::new(pool);

        let codes = invites
            .generate(Plan::Premium, 3, 30, ExpirationUnit::Days)
            .await
            .unwrap();

        assert_eq!(codes.len(), 3);
        for code in &codes {
            assert!(code.code.starts_with("PREMIUM-"));
            let parts: Vec<&str> = code.code.split('-').collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[1].len(), 4);
            assert_eq!(parts[2].len(), 4);
            assert!(!code.used);
        }
    }

    #[tokio::test]
    async fn test_expiration_units() {
        assert_eq!(ExpirationUnit::Hours.duration(2), Duration::hours(2));
        assert_eq!(ExpirationUnit::Weeks.duration(1), Duration::days(7));
        assert_eq!(ExpirationUnit::Years.duration(1), Duration::days(365));
        assert!("months".parse::<ExpirationUnit>().is_err());
    }

    #[tokio::test]
    async fn test_redemption_transitions() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let invites = InviteManager::new(pool.clone());

        let code = invites
            .generate(Plan::Business, 1, 1, ExpirationUnit::Days)
            .await
            .unwrap()
            .remove(0);

        let mut tx = pool.begin().await.unwrap();
        let (id, plan) = InviteManager::lookup_for_redemption(&mut tx, &code.code)
            .await
            .unwrap();
        assert_eq!(plan, Plan::Business);
        InviteManager::mark_used(&mut tx, id, 42, "alice").await.unwrap();
        tx.commit().await.unwrap();

        // Second redemption fails as already used
        let mut tx = pool.begin().await.unwrap();
        let err = InviteManager::lookup_for_redemption(&mut tx, &code.code)
            .await
            .unwrap_err();
        assert!(matches!(err, InviteError::AlreadyUsed));
    }

    #[tokio::test]
    async fn test_unknown_and_expired_codes() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let invites = InviteManager::new(pool.clone());

        let mut tx = pool.begin().await.unwrap();
        let err = InviteManager::lookup_for_redemption(&mut tx, "PREMIUM-NOPE-NOPE")
            .await
            .unwrap_err();
        assert!(matches!(err, InviteError::Invalid));
        drop(tx);

        // Expired: generate with a negative offset
        let code = invites
            .generate(Plan::Premium, 1, -1, ExpirationUnit::Hours)
            .await
            .unwrap()
            .remove(0);
        let mut tx = pool.begin().await.unwrap();
        let err = InviteManager::lookup_for_redemption(&mut tx, &code.code)
            .await
            .unwrap_err();
        assert!(matches!(err, InviteError::Expired));
    }

    #[tokio::test]
    async fn test_delete_refuses_used_code() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let invites = InviteManager::new(pool.clone());

        let code = invites
            .generate(Plan::Premium, 1, 1, ExpirationUnit::Days)
            .await
            .unwrap()
            .remove(0);

        let mut tx = pool.begin().await.unwrap();
        InviteManager::mark_used(&mut tx, code.id, 7, "bob").await.unwrap();
        tx.commit().await.unwrap();

        let err = invites.delete(code.id).await.unwrap_err();
        assert!(matches!(err, InviteError::DeleteUsed));

        assert!(matches!(
            invites.delete(9999).await.unwrap_err(),
            InviteError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_redeemer() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let invites = InviteManager::new(pool.clone());

        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, join_date) VALUES (?, ?, ?, ?)",
        )
        .bind("carol")
        .bind("carol@example.com")
        .bind("hash")
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let code = invites
            .generate(Plan::Premium, 2, 1, ExpirationUnit::Days)
            .await
            .unwrap()
            .remove(0);

        let mut tx = pool.begin().await.unwrap();
        InviteManager::mark_used(&mut tx, code.id, user_id, "carol")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let listed = invites.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        let redeemed = listed.iter().find(|c| c.id == code.id).unwrap();
        assert!(redeemed.used);
        assert_eq!(redeemed.used_by_username.as_deref(), Some("carol"));
    }
}
