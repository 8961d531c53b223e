use crate::error::{Error, Result};
use crate::models::{Plan, Role};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Authenticated request context, inserted by `mw_require_auth`
#[derive(Clone, Debug)]
pub struct Ctx {
    user_id: i64,
    plan: Plan,
    role: Role,
}

impl Ctx {
    pub fn new(user_id: i64, plan: Plan, role: Role) -> Self {
        Self {
            user_id,
            plan,
            role,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::AuthFailCtxNotInRequestExt)
    }
}
