//! Invite code admin handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{ExpirationUnit, InviteCode, InviteError};
use crate::activity::ActivityAction;
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::models::Plan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub plan: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_expiration_value")]
    pub expiration_value: i64,
    #[serde(default = "default_expiration_unit")]
    pub expiration_unit: String,
}

fn default_quantity() -> u32 {
    1
}

fn default_expiration_value() -> i64 {
    30
}

fn default_expiration_unit() -> String {
    "days".to_string()
}

/// POST /api/invite-codes
pub async fn create_invite_codes(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<Vec<InviteCode>>)> {
    info!("POST /api/invite-codes - {} x{}", req.plan, req.quantity);

    let plan: Plan = req
        .plan
        .parse()
        .map_err(|_| Error::BadRequest("Invalid plan".to_string()))?;
    if !plan.invitable() {
        return Err(Error::BadRequest("Invalid plan".to_string()));
    }

    if req.expiration_value <= 0 {
        return Err(Error::BadRequest("Invalid expiration value".to_string()));
    }

    let unit: ExpirationUnit = req
        .expiration_unit
        .parse()
        .map_err(|_| Error::BadRequest("Invalid expiration unit".to_string()))?;

    let codes = state
        .invites
        .generate(plan, req.quantity, req.expiration_value, unit)
        .await?;

    for code in &codes {
        state
            .activity
            .log(
                ctx.user_id(),
                ActivityAction::GenerateInviteCode,
                format!("Generated {} invite code", code.plan),
                None,
            )
            .await;
    }

    Ok((StatusCode::CREATED, Json(codes)))
}

/// GET /api/invite-codes
pub async fn list_invite_codes(State(state): State<AppState>) -> Result<Json<Vec<InviteCode>>> {
    let codes = state.invites.list().await?;
    Ok(Json(codes))
}

/// DELETE /api/invite-codes/{id}
pub async fn delete_invite_code(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    match state.invites.delete(id).await {
        Ok(()) => {
            state
                .activity
                .log(
                    ctx.user_id(),
                    ActivityAction::DeleteInviteCode,
                    format!("Deleted invite code ID: {}", id),
                    None,
                )
                .await;
            Ok(Json(
                serde_json::json!({ "message": "Invite code deleted successfully" }),
            ))
        }
        Err(InviteError::NotFound) => Err(Error::NotFound("Invite code not found".to_string())),
        Err(InviteError::DeleteUsed) => {
            Err(Error::BadRequest("Cannot delete a used invite code".to_string()))
        }
        Err(e) => Err(Error::Internal(e.to_string())),
    }
}
