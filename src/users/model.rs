use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marketplace roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Rep,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Rep => "rep",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "rep" => Ok(Role::Rep),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

// Rep action audit record (append only)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerActionLog {
    pub id: i64,
    pub rep_id: i64,
    pub action_type: String,
    pub action_time: DateTime<Utc>,
    pub target_user_id: Option<i64>,
    pub details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewActionLog {
    pub rep_id: i64,
    pub action_type: &'static str,
    pub action_time: DateTime<Utc>,
    pub target_user_id: i64,
    pub details: Option<String>,
}

pub const ACTION_RESET_PASSWORD: &str = "reset_password";
pub const ACTION_CHANGE_ROLE: &str = "change_role";
