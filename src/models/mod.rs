//! Resource schemas and response envelopes
//!
//! Each resource is a typed struct stored as a JSON document. Bootcamps,
//! courses and reviews belong to a user and implement [`Ownable`].

pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::*;
pub use course::*;
pub use review::*;
pub use user::*;

use crate::db::Collection;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// A typed document stored in one collection
pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    /// Human name used in messages ("Bootcamp not found with id of ...")
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
}

/// Resources with an owning user, consumed by the ownership gate
pub trait Ownable: Resource {
    fn owner_id(&self) -> Uuid;
}

/// `{success: true, data}` envelope for single resources and mutations
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Empty `{}` payload returned by deletions
#[derive(Serialize, Default)]
pub struct Empty {}

/// Unpaginated list envelope
#[derive(Serialize)]
pub struct ListResponse<T: Serialize> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// `createdAt` with fixed microsecond precision so string order equals time order
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Whole counts sent as JSON numbers or numeric text (`8` or `"8"`)
pub mod whole_number {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(n)) => Ok(Some(n)),
            Some(Raw::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("'{}' is not a whole number", text))),
        }
    }
}

/// Current time at the precision `createdAt` is stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// URL-friendly slug: lowercase alphanumerics separated by single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Serialize, serde::Deserialize)]
    struct Stamped {
        #[serde(with = "timestamp")]
        at: chrono::DateTime<Utc>,
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech -- Bootcamp!! "), "moderntech-bootcamp");
        assert_eq!(slugify("UI/UX 101"), "ui-ux-101");
    }

    #[test]
    fn test_timestamps_have_fixed_width() {
        let whole = Stamped { at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() };
        let json = serde_json::to_value(&whole).unwrap();
        assert_eq!(json["at"], "2024-01-01T00:00:00.000000Z");

        let back: Stamped = serde_json::from_value(json).unwrap();
        assert_eq!(back.at, whole.at);
    }

    #[test]
    fn test_success_response_shape() {
        let body = serde_json::to_value(SuccessResponse::with_data(Empty::default())).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true, "data": {} }));
    }
}
