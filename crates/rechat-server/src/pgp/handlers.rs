//! PGP verification handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{IssuedChallenge, PgpError};
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginChallengeRequest {
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChallengeRequest {
    pub challenge_id: String,
    pub decrypted_message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: String,
    pub verified: bool,
}

pub(crate) fn map_pgp_err(e: PgpError) -> Error {
    match e {
        PgpError::ChallengeNotFound => Error::NotFound(e.to_string()),
        PgpError::Db(e) => Error::Internal(e.to_string()),
        other => Error::BadRequest(other.to_string()),
    }
}

/// POST /api/pgp/challenge
pub async fn begin_challenge(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<BeginChallengeRequest>,
) -> Result<Json<IssuedChallenge>> {
    info!("POST /api/pgp/challenge - user {}", ctx.user_id());

    let challenge = state
        .pgp
        .begin_challenge(ctx.user_id(), &req.public_key)
        .await
        .map_err(map_pgp_err)?;

    Ok(Json(challenge))
}

/// POST /api/pgp/verify
pub async fn verify_challenge(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<VerifyChallengeRequest>,
) -> Result<Json<VerifyResponse>> {
    state
        .pgp
        .verify_challenge(ctx.user_id(), &req.challenge_id, &req.decrypted_message)
        .await
        .map_err(map_pgp_err)?;

    Ok(Json(VerifyResponse {
        message: "Your PGP key has been verified and securely stored.".to_string(),
        verified: true,
    }))
}
