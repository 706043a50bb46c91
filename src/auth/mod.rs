//! Authentication and authorization module
//!
//! Provides JWT-based authentication, role checks and the ownership gate that
//! every update and delete passes through.

mod jwt;
mod middleware;
mod ownership;
mod password;

pub use jwt::JwtKeys;
pub use middleware::{protect, require_role, TOKEN_COOKIE};
pub use ownership::ensure_owner;
pub use password::{generate_reset_token, hash_password, hash_reset_token, verify_password};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can write reviews
    #[default]
    User,
    /// Can publish bootcamps and courses
    Publisher,
    /// Can do anything, including managing users
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Publisher => write!(f, "publisher"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Authenticated caller attached to the request by [`protect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
