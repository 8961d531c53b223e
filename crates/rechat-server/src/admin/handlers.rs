//! Admin login handlers (PIN + PGP second factor)

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AdminError;
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::pgp::handlers::map_pgp_err;
use crate::pgp::AdminChallenge;

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPgpVerifyRequest {
    pub challenge_id: String,
    pub private_key: String,
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub decrypted_message: String,
}

#[derive(Debug, Serialize)]
pub struct PinStatusResponse {
    pub registered: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminAuthResponse {
    pub authenticated: bool,
    pub authenticated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn require_admin_role(ctx: &Ctx) -> Result<()> {
    if !ctx.role().admin_eligible() {
        return Err(Error::Forbidden(
            "You do not have admin privileges.".to_string(),
        ));
    }
    Ok(())
}

fn map_admin_err(e: AdminError) -> Error {
    match e {
        AdminError::InvalidPin => Error::BadRequest(e.to_string()),
        AdminError::PinMismatch => Error::Forbidden(e.to_string()),
        AdminError::Db(e) => Error::Internal(e.to_string()),
        AdminError::Other(e) => Error::Internal(e.to_string()),
    }
}

/// GET /api/admin/pin
pub async fn pin_status(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<PinStatusResponse>> {
    require_admin_role(&ctx)?;

    let registered = state
        .admin
        .has_pin(ctx.user_id())
        .await
        .map_err(map_admin_err)?;

    Ok(Json(PinStatusResponse { registered }))
}

/// POST /api/admin/pin
pub async fn register_pin(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<PinRequest>,
) -> Result<Json<MessageResponse>> {
    require_admin_role(&ctx)?;

    // PGP verification comes first in the setup wizard
    let pgp_verified = state
        .pgp
        .is_verified(ctx.user_id())
        .await
        .map_err(map_pgp_err)?;
    if !pgp_verified {
        return Err(Error::Forbidden(
            "PGP verification is required for admin access.".to_string(),
        ));
    }

    state
        .admin
        .register_pin(ctx.user_id(), &req.pin)
        .await
        .map_err(map_admin_err)?;

    Ok(Json(MessageResponse {
        message: "Admin PIN registered successfully".to_string(),
    }))
}

/// POST /api/admin/pin/verify
pub async fn verify_pin(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<PinRequest>,
) -> Result<Json<AdminAuthResponse>> {
    require_admin_role(&ctx)?;

    let authenticated_at = state
        .admin
        .verify_pin(ctx.user_id(), &req.pin)
        .await
        .map_err(map_admin_err)?;

    Ok(Json(AdminAuthResponse {
        authenticated: true,
        authenticated_at,
    }))
}

/// POST /api/admin/pgp/challenge
pub async fn pgp_challenge(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<AdminChallenge>> {
    require_admin_role(&ctx)?;
    info!("POST /api/admin/pgp/challenge - user {}", ctx.user_id());

    let challenge = state
        .pgp
        .begin_admin_challenge(ctx.user_id())
        .await
        .map_err(map_pgp_err)?;

    Ok(Json(challenge))
}

/// POST /api/admin/pgp/verify
pub async fn pgp_verify(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<AdminPgpVerifyRequest>,
) -> Result<Json<AdminAuthResponse>> {
    require_admin_role(&ctx)?;

    state
        .pgp
        .verify_admin_challenge(
            ctx.user_id(),
            &req.challenge_id,
            &req.private_key,
            &req.passphrase,
            &req.decrypted_message,
        )
        .await
        .map_err(map_pgp_err)?;

    Ok(Json(AdminAuthResponse {
        authenticated: true,
        authenticated_at: Utc::now(),
    }))
}
