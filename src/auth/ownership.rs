//! Ownership gate
//!
//! Decides whether a caller may mutate a resource. Handlers fetch the
//! resource first (a missing one is `NotFound`), then ask the gate, and only
//! mutate on `Allow`.

use super::{CurrentUser, Role};
use crate::error::AppError;
use crate::models::Ownable;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// `Allow` iff the caller owns the resource or is an admin
pub fn decide(owner: Uuid, caller: Uuid, role: Role) -> Decision {
    if owner == caller || role == Role::Admin {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Gate `action` (e.g. "update", "delete") on `resource`
pub fn ensure_owner<R: Ownable>(resource: &R, caller: &CurrentUser, action: &str) -> Result<(), AppError> {
    match decide(resource.owner_id(), caller.id, caller.role) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AppError::Unauthorized(format!(
            "User {} is not authorized to {} this {}",
            caller.id,
            action,
            R::LABEL.to_lowercase()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateReviewRequest, Review};

    #[test]
    fn test_decision_table() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let cases = [
            (owner, Role::Admin, Decision::Allow),
            (owner, Role::Publisher, Decision::Allow),
            (stranger, Role::Admin, Decision::Allow),
            (stranger, Role::Publisher, Decision::Deny),
            (stranger, Role::User, Decision::Deny),
        ];
        for (caller, role, expected) in cases {
            assert_eq!(decide(owner, caller, role), expected, "{:?} as {}", caller, role);
        }
    }

    fn review_by(owner: Uuid) -> Review {
        CreateReviewRequest {
            title: Some("Nice".into()),
            text: Some("Good".into()),
            rating: Some(8),
        }
        .into_review(Uuid::new_v4(), owner)
    }

    #[test]
    fn test_ensure_owner_message() {
        let review = review_by(Uuid::new_v4());
        let caller = CurrentUser { id: Uuid::new_v4(), role: Role::User };

        let err = ensure_owner(&review, &caller, "delete").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            err.public_message(),
            format!("User {} is not authorized to delete this review", caller.id)
        );

        let owner = CurrentUser { id: review.user, role: Role::User };
        assert!(ensure_owner(&review, &owner, "delete").is_ok());
    }
}
