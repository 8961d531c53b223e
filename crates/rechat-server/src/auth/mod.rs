//! Authentication Module
//!
//! Handles invite-gated registration, login with JWT issuance, session
//! rows, logout-by-expiry, and the password reset token lifecycle.
//! All state lives in the shared SQLite database.

pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::activity::{ActivityAction, ActivityLog};
use crate::ctx::Ctx;
use crate::invites::{InviteError, InviteManager};
use crate::models::{Claims, User, UserSettings, UserStatus};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Email already exists")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Your account has been suspended. Please contact support.")]
    Suspended,
    #[error("Your account has been banned.")]
    Banned,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error("Invalid or expired session")]
    InvalidSession,
    #[error("User not found")]
    UserNotFound,
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Profile payload for GET /api/auth/profile
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub plan: crate::models::Plan,
    pub status: UserStatus,
    pub role: crate::models::Role,
    pub pgp_verified: bool,
    pub join_date: DateTime<Utc>,
    pub last_online: Option<DateTime<Utc>>,
    pub profile_picture: Option<String>,
    pub settings: Option<UserSettings>,
}

/// Auth manager handles all authentication
pub struct AuthManager {
    pool: SqlitePool,
    jwt_secret: Vec<u8>,
    session_ttl: Duration,
    activity: Arc<ActivityLog>,
}

impl AuthManager {
    pub fn new(
        pool: SqlitePool,
        jwt_secret: &[u8],
        session_ttl_hours: i64,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            pool,
            jwt_secret: jwt_secret.to_vec(),
            session_ttl: Duration::hours(session_ttl_hours),
            activity,
        }
    }

    /// Register a new user against an invite code. The lookup, the user
    /// insert, and the code flip share one transaction.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        invite_code: &str,
    ) -> Result<i64, AuthError> {
        if username.is_empty() || email.is_empty() || password.is_empty() || invite_code.is_empty()
        {
            return Err(AuthError::MissingFields);
        }

        let mut tx = self.pool.begin().await?;

        let (code_id, plan) = InviteManager::lookup_for_redemption(&mut tx, invite_code).await?;

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, plan, join_date) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(plan)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let user_id = result.last_insert_rowid();

        InviteManager::mark_used(&mut tx, code_id, user_id, username).await?;

        sqlx::query("INSERT INTO user_settings (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.activity
            .log(
                user_id,
                ActivityAction::Register,
                "User registered with invite code",
                None,
            )
            .await;

        info!("[Auth] User registered: {} ({})", username, email);

        Ok(user_id)
    }

    /// Login and create a session row. Returns the user and the signed JWT.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(User, String), AuthError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        match user.status {
            UserStatus::Suspended => return Err(AuthError::Suspended),
            UserStatus::Banned => return Err(AuthError::Banned),
            UserStatus::Active => {}
        }

        let valid = verify(password, &user.password_hash).context("Failed to verify password")?;
        if !valid {
            warn!("[Auth] Failed login attempt for {}", username);
            self.activity
                .log(
                    user.id,
                    ActivityAction::LoginFailed,
                    "Failed login attempt",
                    ip_address,
                )
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_online = ? WHERE id = ?")
            .bind(now)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        let token = self.issue_token(&user)?;

        sqlx::query(
            "INSERT INTO sessions (user_id, token, ip_address, user_agent, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&token)
        .bind(ip_address)
        .bind(user_agent)
        .bind(now)
        .bind(now + self.session_ttl)
        .execute(&self.pool)
        .await?;

        self.activity
            .log(user.id, ActivityAction::Login, "Successful login", ip_address)
            .await;

        info!("[Auth] User logged in: {}", user.username);

        Ok((user, token))
    }

    /// Sign a JWT for a user
    fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let expiration = (Utc::now() + self.session_ttl).timestamp();

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            plan: user.plan,
            exp: expiration as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.jwt_secret),
        )
        .map_err(|e| AuthError::Other(anyhow::anyhow!("Token error: {}", e)))
    }

    /// Validate a bearer token: signature and expiry first, then the
    /// session row must still be live so logout genuinely revokes access.
    pub async fn validate_session(&self, token: &str) -> Result<Ctx, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.jwt_secret),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AuthError::InvalidSession)?;

        let row: Option<(i64, DateTime<Utc>, crate::models::Plan, crate::models::Role, UserStatus)> =
            sqlx::query_as(
                "SELECT u.id, s.expires_at, u.plan, u.role, u.status \
                 FROM users u JOIN sessions s ON u.id = s.user_id \
                 WHERE s.token = ? ORDER BY s.expires_at DESC",
            )
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let (user_id, expires_at, plan, role, status) = row.ok_or(AuthError::InvalidSession)?;

        if expires_at <= Utc::now() {
            return Err(AuthError::InvalidSession);
        }

        match status {
            UserStatus::Suspended => return Err(AuthError::Suspended),
            UserStatus::Banned => return Err(AuthError::Banned),
            UserStatus::Active => {}
        }

        Ok(Ctx::new(user_id, plan, role))
    }

    /// Invalidate a session by expiring it now
    pub async fn logout(&self, user_id: i64, token: &str, ip_address: Option<&str>) -> Result<(), AuthError> {
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE user_id = ? AND token = ?")
            .bind(Utc::now())
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        self.activity
            .log(user_id, ActivityAction::Logout, "User logged out", ip_address)
            .await;

        info!("[Auth] Session invalidated for user {}", user_id);

        Ok(())
    }

    /// Full profile with settings
    pub async fn profile(&self, user_id: i64) -> Result<Profile, AuthError> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let settings = sqlx::query_as::<_, UserSettings>(
            "SELECT theme, notifications_enabled, two_factor_enabled \
             FROM user_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Profile {
            id: user.id,
            username: user.username,
            email: user.email,
            plan: user.plan,
            status: user.status,
            role: user.role,
            pgp_verified: user.pgp_verified,
            join_date: user.join_date,
            last_online: user.last_online,
            profile_picture: user.profile_picture,
            settings,
        })
    }

    /// Mint a password reset token valid 24 hours. Existing unused tokens
    /// for the user are cleared first, so only the newest link works.
    pub async fn create_reset_token(
        &self,
        user_id: i64,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        if self.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = ? AND used = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::hours(24);

        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token, created_at, expires_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        info!("[Auth] Reset token minted for user {}", user_id);

        Ok((token, expires_at))
    }

    /// Consume a reset token and set the new password
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), AuthError> {
        if password.len() < 6 {
            return Err(AuthError::PasswordTooShort);
        }

        let row: Option<(i64, bool, DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, used, expires_at FROM password_reset_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let user_id = match row {
            Some((user_id, false, expires_at)) if expires_at > Utc::now() => user_id,
            _ => return Err(AuthError::InvalidResetToken),
        };

        if self.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        sqlx::query("UPDATE users SET password_hash = ?, last_password_reset = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        self.activity
            .log(user_id, ActivityAction::ResetPassword, "Password reset via token", None)
            .await;

        info!("[Auth] Password reset for user {}", user_id);

        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, plan, status, role, pgp_verified, \
             join_date, last_online, last_password_reset, profile_picture \
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, plan, status, role, pgp_verified, \
             join_date, last_online, last_password_reset, profile_picture \
             FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
