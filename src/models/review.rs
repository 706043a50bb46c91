//! Review schema and request payloads
//!
//! A user may review a given bootcamp once; the store enforces this with a
//! unique `(bootcamp, user)` key.

use super::{now, timestamp, Ownable, Resource};
use crate::db::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: u8,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub bootcamp: Uuid,
    pub user: Uuid,
}

impl Resource for Review {
    const COLLECTION: Collection = Collection::Reviews;
    const LABEL: &'static str = "Review";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Ownable for Review {
    fn owner_id(&self) -> Uuid {
        self.user
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(
        required(message = "Please enter a title for your review"),
        length(min = 1, max = 50, message = "Review titles can not be more than 50 characters")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "Please add some text"),
        length(min = 1, message = "Please add some text")
    )]
    pub text: Option<String>,

    #[validate(
        required(message = "Please add a rating between 1 and 10"),
        range(min = 1, max = 10, message = "Please add a rating between 1 and 10")
    )]
    pub rating: Option<u8>,
}

impl CreateReviewRequest {
    pub fn into_review(self, bootcamp: Uuid, owner: Uuid) -> Review {
        Review {
            id: Uuid::new_v4(),
            title: self.title.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            rating: self.rating.unwrap_or(1),
            created_at: now(),
            bootcamp,
            user: owner,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, max = 50, message = "Review titles can not be more than 50 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Please add some text"))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Please add a rating between 1 and 10"))]
    pub rating: Option<u8>,
}

impl UpdateReviewRequest {
    pub fn apply(self, review: &mut Review) {
        if let Some(title) = self.title {
            review.title = title;
        }
        if let Some(text) = self.text {
            review.text = text;
        }
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
    }
}
