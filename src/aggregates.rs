//! Derived bootcamp statistics
//!
//! `averageCost` and `averageRating` are recomputed from the bootcamp's
//! courses and reviews after every write that touches them.

use crate::db::{repository, DocumentStore};
use crate::error::ApiResult;
use crate::models::{Bootcamp, Course, Review};
use crate::query::Filter;
use tracing::debug;
use uuid::Uuid;

/// Mean tuition rounded up to the next multiple of ten
pub fn average_cost(tuitions: &[f64]) -> Option<f64> {
    mean(tuitions.iter().copied()).map(|avg| (avg / 10.0).ceil() * 10.0)
}

pub fn average_rating(ratings: &[u8]) -> Option<f64> {
    mean(ratings.iter().map(|r| f64::from(*r)))
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    Some(values.sum::<f64>() / len as f64)
}

fn children_of(bootcamp_id: Uuid) -> Filter {
    Filter::eq("bootcamp", bootcamp_id.to_string())
}

pub async fn refresh_average_cost(store: &dyn DocumentStore, bootcamp_id: Uuid) -> ApiResult<()> {
    let Some(mut bootcamp) = repository::find_by_id::<Bootcamp>(store, bootcamp_id).await? else {
        return Ok(());
    };
    let courses: Vec<Course> = repository::find_all(store, children_of(bootcamp_id)).await?;
    let tuitions: Vec<f64> = courses.iter().map(|c| c.tuition).collect();

    bootcamp.average_cost = average_cost(&tuitions);
    debug!("Bootcamp {} averageCost -> {:?}", bootcamp_id, bootcamp.average_cost);
    repository::save(store, &bootcamp).await?;
    Ok(())
}

pub async fn refresh_average_rating(store: &dyn DocumentStore, bootcamp_id: Uuid) -> ApiResult<()> {
    let Some(mut bootcamp) = repository::find_by_id::<Bootcamp>(store, bootcamp_id).await? else {
        return Ok(());
    };
    let reviews: Vec<Review> = repository::find_all(store, children_of(bootcamp_id)).await?;
    let ratings: Vec<u8> = reviews.iter().map(|r| r.rating).collect();

    bootcamp.average_rating = average_rating(&ratings);
    debug!("Bootcamp {} averageRating -> {:?}", bootcamp_id, bootcamp.average_rating);
    repository::save(store, &bootcamp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_cost_rounds_up_to_tens() {
        assert_eq!(average_cost(&[]), None);
        assert_eq!(average_cost(&[8000.0]), Some(8000.0));
        assert_eq!(average_cost(&[8000.0, 10001.0]), Some(9010.0));
        assert_eq!(average_cost(&[12345.0]), Some(12350.0));
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[8, 9]), Some(8.5));
        assert_eq!(average_rating(&[10]), Some(10.0));
    }
}
