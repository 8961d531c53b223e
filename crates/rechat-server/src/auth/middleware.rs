use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::models::Plan;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let auth_header = req.headers().get(header::AUTHORIZATION);
    let auth_header = match auth_header {
        Some(h) => h.to_str().map_err(|_| Error::AuthFailTokenWrongFormat)?,
        None => return Err(Error::AuthFailNoToken),
    };

    // Format: "Bearer <token>"
    if !auth_header.starts_with("Bearer ") {
        return Err(Error::AuthFailTokenWrongFormat);
    }

    let token = &auth_header[7..];

    let ctx = state
        .auth
        .validate_session(token)
        .await
        .map_err(|e| match e {
            super::AuthError::Suspended => Error::AccountSuspended,
            super::AuthError::Banned => Error::AccountBanned,
            _ => Error::LoginFail,
        })?;

    // Store Ctx in request extensions
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

/// Admin gate: valid session plus a business plan. The Express source
/// shipped these checks commented out ("temporarily unprotected"); here
/// they are enforced.
pub async fn mw_require_admin(req: Request, next: Next) -> Result<Response> {
    debug!("MIDDLEWARE: require_admin");

    let ctx = req
        .extensions()
        .get::<Ctx>()
        .cloned()
        .ok_or(Error::AuthFailCtxNotInRequestExt)?;

    if ctx.plan() != Plan::Business {
        return Err(Error::Forbidden(
            "Insufficient privileges. Only business plan users can perform this action."
                .to_string(),
        ));
    }

    Ok(next.run(req).await)
}
