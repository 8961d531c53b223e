//! User administration handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{UserAdminError, UserDetails, UserOverview, UserSummary};
use crate::activity::{ActivityAction, ActivityEntry};
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::models::{Plan, Role, UserStatus};

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub plan: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ResetLinkResponse {
    pub message: String,
    #[serde(rename = "resetLink")]
    pub reset_link: String,
}

fn map_admin_err(e: UserAdminError) -> Error {
    match e {
        UserAdminError::NotFound => Error::NotFound("User not found".to_string()),
        UserAdminError::SelfSuspension => {
            Error::BadRequest("You cannot suspend your own account".to_string())
        }
        UserAdminError::Db(e) => Error::Internal(e.to_string()),
    }
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>> {
    let users = state.users.list().await.map_err(map_admin_err)?;
    Ok(Json(users))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserOverview>> {
    let user = state.users.get(id).await.map_err(map_admin_err)?;
    Ok(Json(user))
}

/// GET /api/users/{id}/details
pub async fn get_user_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserDetails>> {
    let details = state.users.details(id).await.map_err(map_admin_err)?;
    Ok(Json(details))
}

/// GET /api/users/{id}/activity
pub async fn get_user_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ActivityEntry>>> {
    // 404 for unknown users rather than an empty log
    state.users.get(id).await.map_err(map_admin_err)?;

    let entries = state
        .activity
        .recent(id, 50)
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(Json(entries))
}

/// PUT /api/users/{id}/plan
pub async fn update_user_plan(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<Json<serde_json::Value>> {
    let plan: Plan = req
        .plan
        .parse()
        .map_err(|_| Error::BadRequest("Invalid plan".to_string()))?;

    state.users.set_plan(id, plan).await.map_err(map_admin_err)?;

    state
        .activity
        .log(
            ctx.user_id(),
            ActivityAction::UpdateUserPlan,
            format!("Updated user ID: {} plan to {}", id, plan),
            None,
        )
        .await;

    Ok(Json(
        serde_json::json!({ "message": "User plan updated successfully" }),
    ))
}

/// PUT /api/users/{id}/role
pub async fn update_user_role(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<serde_json::Value>> {
    let role: Role = req
        .role
        .parse()
        .map_err(|_| Error::BadRequest("Invalid role".to_string()))?;

    state.users.set_role(id, role).await.map_err(map_admin_err)?;

    state
        .activity
        .log(
            ctx.user_id(),
            ActivityAction::UpdateUserRole,
            format!("Updated user ID: {} role to {}", id, role),
            None,
        )
        .await;

    Ok(Json(
        serde_json::json!({ "message": "User role updated successfully" }),
    ))
}

/// PUT /api/users/{id}/status
pub async fn update_user_status(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status: UserStatus = req
        .status
        .parse()
        .map_err(|_| Error::BadRequest("Invalid status".to_string()))?;

    state
        .users
        .set_status(ctx.user_id(), id, status)
        .await
        .map_err(map_admin_err)?;

    state
        .activity
        .log(
            ctx.user_id(),
            ActivityAction::UpdateUserStatus,
            format!("Updated user ID: {} status to {}", id, status),
            None,
        )
        .await;

    Ok(Json(
        serde_json::json!({ "message": "User status updated successfully" }),
    ))
}

/// POST /api/users/{id}/reset-password
pub async fn create_reset_link(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Json<ResetLinkResponse>> {
    info!("POST /api/users/{}/reset-password", id);

    let (token, _expires_at) = state.auth.create_reset_token(id).await.map_err(|e| match e {
        crate::auth::AuthError::UserNotFound => Error::NotFound("User not found".to_string()),
        other => Error::Internal(other.to_string()),
    })?;

    state
        .activity
        .log(
            ctx.user_id(),
            ActivityAction::ResetPassword,
            format!("Generated password reset link for user ID: {}", id),
            None,
        )
        .await;

    let reset_link = format!("{}/password-reset/{}", state.config.frontend_url, token);

    Ok(Json(ResetLinkResponse {
        message: "Password reset link generated successfully".to_string(),
        reset_link,
    }))
}
