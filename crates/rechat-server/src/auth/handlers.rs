//! Auth handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AuthError, Profile};
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::models::UserInfo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserInfo,
    pub token: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Best-effort client address; the server usually sits behind a proxy
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<MessageResponse>)> {
    info!("POST /api/auth/register - {}", req.email);

    match state
        .auth
        .register(&req.username, &req.email, &req.password, &req.invite_code)
        .await
    {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(MessageResponse::new("User registered successfully")),
        )),
        Err(e) => {
            warn!("Registration failed for {}: {}", req.email, e);
            let status = match e {
                AuthError::Db(_) | AuthError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            Err((status, Json(MessageResponse::new(e.to_string()))))
        }
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<MessageResponse>)> {
    info!("POST /api/auth/login - {}", req.username);

    if req.username.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::new("Username and password are required")),
        ));
    }

    let ip = client_ip(&headers);
    let agent = user_agent(&headers);

    match state
        .auth
        .login(&req.username, &req.password, ip.as_deref(), agent.as_deref())
        .await
    {
        Ok((user, token)) => Ok(Json(LoginResponse {
            message: "Login successful".to_string(),
            user: user.into(),
            token,
        })),
        Err(e) => {
            warn!("Login failed for {}: {}", req.username, e);
            let status = match e {
                AuthError::Suspended | AuthError::Banned => StatusCode::FORBIDDEN,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(MessageResponse::new(e.to_string()))))
        }
    }
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    ctx: Ctx,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, crate::error::Error> {
    let token = bearer_token(&headers).ok_or(crate::error::Error::AuthFailNoToken)?;
    let ip = client_ip(&headers);

    state
        .auth
        .logout(ctx.user_id(), &token, ip.as_deref())
        .await
        .map_err(|e| crate::error::Error::Internal(e.to_string()))?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<Profile>, crate::error::Error> {
    match state.auth.profile(ctx.user_id()).await {
        Ok(profile) => Ok(Json(profile)),
        Err(AuthError::UserNotFound) => {
            Err(crate::error::Error::NotFound("User not found".to_string()))
        }
        Err(e) => Err(crate::error::Error::Internal(e.to_string())),
    }
}

/// POST /api/auth/reset-password/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<MessageResponse>)> {
    match state.auth.reset_password(&token, &req.password).await {
        Ok(()) => Ok(Json(MessageResponse::new("Password reset successful"))),
        Err(e) => {
            let status = match e {
                AuthError::PasswordTooShort | AuthError::InvalidResetToken => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(MessageResponse::new(e.to_string()))))
        }
    }
}
