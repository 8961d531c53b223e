//! Shared domain types for the Re-Chat API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription plan attached to a user or an invite code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
    Business,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
            Plan::Business => "business",
        }
    }

    /// Plans an invite code may carry (free accounts are not invite-gated)
    pub fn invitable(&self) -> bool {
        matches!(self, Plan::Premium | Plan::Business)
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "premium" => Ok(Plan::Premium),
            "business" => Ok(Plan::Business),
            other => Err(format!("Invalid plan: {}", other)),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Banned => "banned",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "suspended" => Ok(UserStatus::Suspended),
            "banned" => Ok(UserStatus::Banned),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff role on an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Dev,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Dev => "dev",
            Role::Owner => "owner",
        }
    }

    /// Roles allowed through the PIN-gated admin login
    pub fn admin_eligible(&self) -> bool {
        matches!(self, Role::Dev | Role::Owner)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "dev" => Ok(Role::Dev),
            "owner" => Ok(Role::Owner),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record stored in database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub plan: Plan,
    pub status: UserStatus,
    pub role: Role,
    pub pgp_verified: bool,
    pub join_date: DateTime<Utc>,
    pub last_online: Option<DateTime<Utc>>,
    pub last_password_reset: Option<DateTime<Utc>>,
    pub profile_picture: Option<String>,
}

/// Public user info (no sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub plan: Plan,
    pub status: UserStatus,
    pub role: Role,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            plan: user.plan,
            status: user.status,
            role: user.role,
        }
    }
}

/// Per-user preferences created at registration
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSettings {
    pub theme: String,
    pub notifications_enabled: bool,
    pub two_factor_enabled: bool,
}

/// JWT payload issued at login
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub plan: Plan,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_round_trip() {
        for plan in [Plan::Free, Plan::Premium, Plan::Business] {
            assert_eq!(plan.as_str().parse::<Plan>().unwrap(), plan);
        }
        assert!("gold".parse::<Plan>().is_err());
    }

    #[test]
    fn test_invitable_plans() {
        assert!(!Plan::Free.invitable());
        assert!(Plan::Premium.invitable());
        assert!(Plan::Business.invitable());
    }

    #[test]
    fn test_admin_eligible_roles() {
        assert!(!Role::User.admin_eligible());
        assert!(!Role::Staff.admin_eligible());
        assert!(Role::Dev.admin_eligible());
        assert!(Role::Owner.admin_eligible());
    }

    #[test]
    fn test_user_serializes_without_password_hash() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$2b$12$secret".into(),
            plan: Plan::Premium,
            status: UserStatus::Active,
            role: Role::User,
            pgp_verified: false,
            join_date: Utc::now(),
            last_online: None,
            last_password_reset: None,
            profile_picture: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"plan\":\"premium\""));
    }
}
