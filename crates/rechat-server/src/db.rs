//! Database pool setup and schema initialization.
//!
//! All tables live in a single SQLite file under the Re-Chat data
//! directory. Schema creation is idempotent; later columns arrive as
//! additive ALTER TABLE statements whose errors are ignored.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Open (and create if missing) the server database
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!(
        "sqlite://{}",
        path.to_string_lossy().replace('\\', "/")
    ))?
    .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("Failed to open server database")?;

    Ok(pool)
}

/// Create all tables
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            plan TEXT NOT NULL DEFAULT 'free',
            status TEXT NOT NULL DEFAULT 'active',
            role TEXT NOT NULL DEFAULT 'user',
            pgp_verified INTEGER NOT NULL DEFAULT 0,
            join_date TEXT NOT NULL,
            last_online TEXT,
            last_password_reset TEXT,
            profile_picture TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Migration: role and pgp_verified arrived after the first schema
    let _ = sqlx::query("ALTER TABLE users ADD COLUMN role TEXT NOT NULL DEFAULT 'user'")
        .execute(pool)
        .await;
    let _ = sqlx::query("ALTER TABLE users ADD COLUMN pgp_verified INTEGER NOT NULL DEFAULT 0")
        .execute(pool)
        .await;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_details (
            user_id INTEGER PRIMARY KEY,
            operating_system TEXT,
            country TEXT,
            ip_address TEXT,
            user_agent TEXT,
            last_login_date TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_settings (
            user_id INTEGER PRIMARY KEY,
            theme TEXT NOT NULL DEFAULT 'dark',
            notifications_enabled INTEGER NOT NULL DEFAULT 1,
            two_factor_enabled INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            token TEXT NOT NULL,
            ip_address TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invite_codes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT UNIQUE NOT NULL,
            plan TEXT NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            used_by INTEGER,
            used_by_username TEXT,
            created_at TEXT NOT NULL,
            expires_at TEXT,
            FOREIGN KEY (used_by) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            token TEXT UNIQUE NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            details TEXT,
            ip_address TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_pins (
            user_id INTEGER PRIMARY KEY,
            pin_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_verified_at TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pgp_challenges (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            public_key TEXT,
            code TEXT NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the default admin account when absent
pub async fn ensure_admin_user(pool: &SqlitePool) -> Result<()> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind("admin@rechat.to")
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash("admin123", DEFAULT_COST).context("Failed to hash admin password")?;

    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, plan, status, role, join_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind("admin")
    .bind("admin@rechat.to")
    .bind(&password_hash)
    .bind("business")
    .bind("active")
    .bind("owner")
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let admin_id = result.last_insert_rowid();

    sqlx::query("INSERT INTO user_settings (user_id, theme) VALUES (?, ?)")
        .bind(admin_id)
        .bind("dark")
        .execute(pool)
        .await?;

    info!("[Db] Default admin account created (admin@rechat.to)");

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Fresh file-backed database for a single test
    pub async fn test_pool(dir: &TempDir) -> SqlitePool {
        let pool = connect(&dir.path().join("test.sqlite")).await.unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let pool = connect(&dir.path().join("test.sqlite")).await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_seed_runs_once() {
        let dir = TempDir::new().unwrap();
        let pool = test_support::test_pool(&dir).await;

        ensure_admin_user(&pool).await.unwrap();
        ensure_admin_user(&pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind("admin@rechat.to")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
