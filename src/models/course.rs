//! Course schema and request payloads

use super::{now, timestamp, whole_number, Ownable, Resource};
use crate::db::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: u32,
    pub tuition: f64,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub bootcamp: Uuid,
    pub user: Uuid,
}

impl Resource for Course {
    const COLLECTION: Collection = Collection::Courses;
    const LABEL: &'static str = "Course";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Ownable for Course {
    fn owner_id(&self) -> Uuid {
        self.user
    }
}

/// Request to add a course to a bootcamp
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(
        required(message = "Please add a course title"),
        length(min = 1, message = "Please add a course title")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "Please add a description"),
        length(min = 1, message = "Please add a description")
    )]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "whole_number::deserialize")]
    #[validate(
        required(message = "Please add number of weeks"),
        range(min = 1, message = "Number of weeks must be at least 1")
    )]
    pub weeks: Option<u32>,

    #[validate(
        required(message = "Please add a tuition cost"),
        range(min = 0.0, message = "Tuition can not be negative")
    )]
    pub tuition: Option<f64>,

    #[validate(required(message = "Please add a minimum skill"))]
    pub minimum_skill: Option<MinimumSkill>,

    #[serde(default)]
    pub scholarship_available: bool,
}

impl CreateCourseRequest {
    pub fn into_course(self, bootcamp: Uuid, owner: Uuid) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            weeks: self.weeks.unwrap_or_default(),
            tuition: self.tuition.unwrap_or_default(),
            minimum_skill: self.minimum_skill.unwrap_or(MinimumSkill::Beginner),
            scholarship_available: self.scholarship_available,
            created_at: now(),
            bootcamp,
            user: owner,
        }
    }
}

/// Request to update a course; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, message = "Please add a course title"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Please add a description"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "whole_number::deserialize")]
    #[validate(range(min = 1, message = "Number of weeks must be at least 1"))]
    pub weeks: Option<u32>,
    #[validate(range(min = 0.0, message = "Tuition can not be negative"))]
    pub tuition: Option<f64>,
    pub minimum_skill: Option<MinimumSkill>,
    pub scholarship_available: Option<bool>,
}

impl UpdateCourseRequest {
    pub fn apply(self, course: &mut Course) {
        if let Some(title) = self.title {
            course.title = title;
        }
        if let Some(description) = self.description {
            course.description = description;
        }
        if let Some(weeks) = self.weeks {
            course.weeks = weeks;
        }
        if let Some(tuition) = self.tuition {
            course.tuition = tuition;
        }
        if let Some(skill) = self.minimum_skill {
            course.minimum_skill = skill;
        }
        if let Some(scholarship) = self.scholarship_available {
            course.scholarship_available = scholarship;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_course() {
        let req: CreateCourseRequest = serde_json::from_value(json!({
            "title": "Front End Web Development",
            "description": "HTML, CSS and JavaScript",
            "weeks": "8",
            "tuition": 8000,
            "minimumSkill": "beginner",
            "scholarshipAvailable": true
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let bootcamp = Uuid::new_v4();
        let course = req.into_course(bootcamp, Uuid::new_v4());
        assert_eq!(course.bootcamp, bootcamp);
        assert_eq!(course.tuition, 8000.0);

        let doc = serde_json::to_value(&course).unwrap();
        assert_eq!(doc["weeks"], 8);
        assert_eq!(doc["minimumSkill"], "beginner");
        assert_eq!(doc["scholarshipAvailable"], true);
    }

    #[test]
    fn test_missing_tuition() {
        let req: CreateCourseRequest = serde_json::from_value(json!({
            "title": "t",
            "description": "d",
            "weeks": "4",
            "minimumSkill": "advanced"
        }))
        .unwrap();
        let err = crate::error::AppError::from(req.validate().unwrap_err());
        assert_eq!(err.public_message(), "Please add a tuition cost");
    }

    #[test]
    fn test_weeks_must_be_a_positive_whole_number() {
        let base = json!({
            "title": "t",
            "description": "d",
            "tuition": 1000,
            "minimumSkill": "beginner"
        });
        let with_weeks = |weeks: serde_json::Value| {
            let mut body = base.clone();
            body["weeks"] = weeks;
            serde_json::from_value::<CreateCourseRequest>(body)
        };

        assert_eq!(with_weeks(json!(12)).unwrap().weeks, Some(12));
        assert_eq!(with_weeks(json!(" 6 ")).unwrap().weeks, Some(6));

        let zero = with_weeks(json!("0")).unwrap();
        let err = crate::error::AppError::from(zero.validate().unwrap_err());
        assert_eq!(err.public_message(), "Number of weeks must be at least 1");

        assert!(with_weeks(json!("abc")).is_err());
        assert!(with_weeks(json!(-3)).is_err());
        assert!(with_weeks(json!(2.5)).is_err());

        let update: UpdateCourseRequest = serde_json::from_value(json!({ "title": "New" })).unwrap();
        assert_eq!(update.weeks, None);
        let update: UpdateCourseRequest = serde_json::from_value(json!({ "weeks": 0 })).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let mut course: Course = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "title": "Old",
            "description": "d",
            "weeks": 4,
            "tuition": 1000.0,
            "minimumSkill": "intermediate",
            "scholarshipAvailable": false,
            "createdAt": "2024-01-01T00:00:00.000000Z",
            "bootcamp": Uuid::new_v4(),
            "user": Uuid::new_v4()
        }))
        .unwrap();

        UpdateCourseRequest {
            tuition: Some(1500.0),
            ..Default::default()
        }
        .apply(&mut course);

        assert_eq!(course.title, "Old");
        assert_eq!(course.tuition, 1500.0);
    }
}
