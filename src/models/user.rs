//! User accounts
//!
//! The stored document carries the bcrypt hash and reset-token digest; neither
//! ever leaves the API, see [`UserResponse`].

use super::{now, timestamp, Resource};
use crate::auth::Role;
use crate::db::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Resource for User {
    const COLLECTION: Collection = Collection::Users;
    const LABEL: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl User {
    pub fn new(name: String, email: String, role: Role, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: email.to_lowercase(),
            role,
            password: password_hash,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: now(),
        }
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

fn validate_public_role(role: &Role) -> Result<(), validator::ValidationError> {
    if *role == Role::Admin {
        let mut err = validator::ValidationError::new("role");
        err.message = Some("Role must be user or publisher".into());
        return Err(err);
    }
    Ok(())
}

/// Self-service sign-up; admins are only created by other admins
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "Please add a name"),
        length(min = 1, message = "Please add a name")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Please add an email"),
        email(message = "Please add a valid email")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,

    #[validate(custom(function = "validate_public_role"))]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required(message = "Please provide an email and password"))]
    pub email: Option<String>,
    #[validate(required(message = "Please provide an email and password"))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    #[validate(length(min = 1, message = "Please add a name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[validate(required(message = "Please provide the current password"))]
    pub current_password: Option<String>,
    #[validate(
        required(message = "Please provide a new password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(
        required(message = "Please add an email"),
        email(message = "Please add a valid email")
    )]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

/// Admin user creation; any role allowed
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        required(message = "Please add a name"),
        length(min = 1, message = "Please add a name")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Please add an email"),
        email(message = "Please add a valid email")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Admin user update; a new password is re-hashed by the handler
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Please add a name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
}
