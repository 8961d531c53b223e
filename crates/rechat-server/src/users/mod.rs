//! User Administration Module
//!
//! Admin-panel operations over accounts: listing, detail lookup, and the
//! plan/role/status transitions. Status changes drive the suspend/ban
//! feature; a ban is reversible by setting the account active again.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::models::{Plan, Role, UserStatus};

#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error("User not found")]
    NotFound,
    #[error("You cannot suspend your own account")]
    SelfSuspension,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Row shape for GET /api/users
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub plan: Plan,
    pub status: UserStatus,
    pub role: Role,
    pub join_date: DateTime<Utc>,
    pub last_online: Option<DateTime<Utc>>,
}

/// Row shape for GET /api/users/{id}
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserOverview {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub plan: Plan,
    pub status: UserStatus,
    pub role: Role,
    pub join_date: DateTime<Utc>,
    pub last_online: Option<DateTime<Utc>>,
}

/// User row merged with its `user_details` companion row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserDetails {
    pub id: i64,
    pub username: String,
    pub plan: Plan,
    pub status: UserStatus,
    pub join_date: DateTime<Utc>,
    pub last_online: Option<DateTime<Utc>>,
    pub last_password_reset: Option<DateTime<Utc>>,
    pub operating_system: Option<String>,
    pub country: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub last_login_date: Option<DateTime<Utc>>,
}

/// Admin-side directory over the users table
pub struct UserDirectory {
    pool: SqlitePool,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<UserSummary>, UserAdminError> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, plan, status, role, join_date, last_online FROM users",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn get(&self, id: i64) -> Result<UserOverview, UserAdminError> {
        sqlx::query_as::<_, UserOverview>(
            "SELECT id, username, email, plan, status, role, join_date, last_online \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserAdminError::NotFound)
    }

    pub async fn details(&self, id: i64) -> Result<UserDetails, UserAdminError> {
        sqlx::query_as::<_, UserDetails>(
            r#"
            SELECT u.id, u.username, u.plan, u.status, u.join_date, u.last_online,
                   u.last_password_reset,
                   ud.operating_system, ud.country, ud.ip_address, ud.user_agent,
                   ud.last_login_date
            FROM users u
            LEFT JOIN user_details ud ON u.id = ud.user_id
            WHERE u.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserAdminError::NotFound)
    }

    pub async fn set_plan(&self, id: i64, plan: Plan) -> Result<(), UserAdminError> {
        let result = sqlx::query("UPDATE users SET plan = ? WHERE id = ?")
            .bind(plan)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserAdminError::NotFound);
        }
        info!("[Users] User {} plan -> {}", id, plan);
        Ok(())
    }

    pub async fn set_role(&self, id: i64, role: Role) -> Result<(), UserAdminError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserAdminError::NotFound);
        }
        info!("[Users] User {} role -> {}", id, role);
        Ok(())
    }

    /// Change an account's status. Admins cannot suspend themselves.
    pub async fn set_status(
        &self,
        actor_id: i64,
        id: i64,
        status: UserStatus,
    ) -> Result<(), UserAdminError> {
        if actor_id == id && status == UserStatus::Suspended {
            return Err(UserAdminError::SelfSuspension);
        }

        let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserAdminError::NotFound);
        }
        info!("[Users] User {} status -> {}", id, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use tempfile::TempDir;

    async fn seed_user(pool: &SqlitePool, username: &str, email: &str) -> i64 {
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, join_date) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind("hash")
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let users = UserDirectory::new(pool.clone());

        let id = seed_user(&pool, "alice", "alice@example.com").await;
        seed_user(&pool, "bob", "bob@example.com").await;

        assert_eq!(users.list().await.unwrap().len(), 2);

        let alice = users.get(id).await.unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.plan, Plan::Free);
        assert_eq!(alice.role, Role::User);

        assert!(matches!(
            users.get(999).await.unwrap_err(),
            UserAdminError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_details_merges_companion_row() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let users = UserDirectory::new(pool.clone());
        let id = seed_user(&pool, "alice", "alice@example.com").await;

        // Without a companion row the optional fields stay empty
        let details = users.details(id).await.unwrap();
        assert!(details.country.is_none());

        sqlx::query(
            "INSERT INTO user_details (user_id, operating_system, country, ip_address) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind("Linux")
        .bind("Germany")
        .bind("203.0.113.7")
        .execute(&pool)
        .await
        .unwrap();

        let details = users.details(id).await.unwrap();
        assert_eq!(details.country.as_deref(), Some("Germany"));
        assert_eq!(details.operating_system.as_deref(), Some("Linux"));
    }

    #[tokio::test]
    async fn test_plan_role_status_transitions() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let users = UserDirectory::new(pool.clone());
        let id = seed_user(&pool, "alice", "alice@example.com").await;

        users.set_plan(id, Plan::Business).await.unwrap();
        users.set_role(id, Role::Staff).await.unwrap();
        users.set_status(999, id, UserStatus::Banned).await.unwrap();

        let alice = users.get(id).await.unwrap();
        assert_eq!(alice.plan, Plan::Business);
        assert_eq!(alice.role, Role::Staff);
        assert_eq!(alice.status, UserStatus::Banned);

        // Ban is reversible
        users.set_status(999, id, UserStatus::Active).await.unwrap();
        assert_eq!(users.get(id).await.unwrap().status, UserStatus::Active);

        assert!(matches!(
            users.set_plan(999, Plan::Free).await.unwrap_err(),
            UserAdminError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_self_suspension_blocked() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let users = UserDirectory::new(pool.clone());
        let id = seed_user(&pool, "admin", "admin@example.com").await;

        assert!(matches!(
            users.set_status(id, id, UserStatus::Suspended).await.unwrap_err(),
            UserAdminError::SelfSuspension
        ));

        // Banning or reactivating yourself is not blocked, matching the
        // suspend-only guard in the original route.
        users.set_status(id, id, UserStatus::Active).await.unwrap();
    }
}
