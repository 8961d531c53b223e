use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum Error {
    // Auth Errors
    LoginFail,
    AccountSuspended,
    AccountBanned,
    AuthFailNoToken,
    AuthFailTokenWrongFormat,
    AuthFailCtxNotInRequestExt,
    Forbidden(String),

    // Generic
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::LoginFail => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            Error::AccountSuspended => (
                StatusCode::FORBIDDEN,
                "Your account has been suspended. Please contact support.".to_string(),
            ),
            Error::AccountBanned => (
                StatusCode::FORBIDDEN,
                "Your account has been banned.".to_string(),
            ),
            Error::AuthFailNoToken => (
                StatusCode::UNAUTHORIZED,
                "Access denied. No token provided.".to_string(),
            ),
            Error::AuthFailTokenWrongFormat => {
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
            }
            Error::AuthFailCtxNotInRequestExt => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auth context missing".to_string(),
            ),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "message": message }));

        (status, body).into_response()
    }
}

// Allow conversion from other errors (e.g., anyhow, sqlx) easiest via string
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
