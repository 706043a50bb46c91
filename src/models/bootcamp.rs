//! Bootcamp schema and request payloads

use super::{now, slugify, timestamp, Ownable, Resource};
use crate::db::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

/// GeoJSON point plus the formatted address parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type", default = "point")]
    pub kind: String,
    /// `[longitude, latitude]`
    #[validate(custom(function = "validate_coordinates"))]
    pub coordinates: [f64; 2],
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

fn point() -> String {
    "Point".to_string()
}

fn validate_coordinates(coordinates: &[f64; 2]) -> Result<(), validator::ValidationError> {
    let [lng, lat] = *coordinates;
    if (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat) {
        return Ok(());
    }
    let mut err = validator::ValidationError::new("coordinates");
    err.message = Some("Coordinates must be [longitude, latitude] within range".into());
    Err(err)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub location: Option<Location>,
    pub careers: Vec<Career>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub user: Uuid,
}

impl Resource for Bootcamp {
    const COLLECTION: Collection = Collection::Bootcamps;
    const LABEL: &'static str = "Bootcamp";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Ownable for Bootcamp {
    fn owner_id(&self) -> Uuid {
        self.user
    }
}

fn validate_careers(careers: &[Career]) -> Result<(), validator::ValidationError> {
    if careers.is_empty() {
        let mut err = validator::ValidationError::new("careers");
        err.message = Some("Please add at least one career".into());
        return Err(err);
    }
    Ok(())
}

/// Request to create a bootcamp
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcampRequest {
    #[validate(
        required(message = "Please add a name"),
        length(min = 1, max = 50, message = "Name can not be more than 50 characters")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Please add a description"),
        length(min = 1, max = 500, message = "Description can not be more than 500 characters")
    )]
    pub description: Option<String>,

    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,

    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,

    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,

    #[validate(
        required(message = "Please add an address"),
        length(min = 1, message = "Please add an address")
    )]
    pub address: Option<String>,

    #[validate(nested)]
    pub location: Option<Location>,

    #[validate(
        required(message = "Please add at least one career"),
        custom(function = "validate_careers")
    )]
    pub careers: Option<Vec<Career>>,

    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

impl CreateBootcampRequest {
    /// Build the stored document once validation has passed
    pub fn into_bootcamp(self, owner: Uuid) -> Bootcamp {
        let name = self.name.unwrap_or_default();
        Bootcamp {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description: self.description.unwrap_or_default(),
            website: self.website,
            phone: self.phone,
            email: self.email,
            address: self.address.unwrap_or_default(),
            location: self.location,
            careers: self.careers.unwrap_or_default(),
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: self.housing,
            job_assistance: self.job_assistance,
            job_guarantee: self.job_guarantee,
            accept_gi: self.accept_gi,
            created_at: now(),
            user: owner,
        }
    }
}

/// Request to update a bootcamp; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcampRequest {
    #[validate(length(min = 1, max = 50, message = "Name can not be more than 50 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Description can not be more than 500 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Please add an address"))]
    pub address: Option<String>,
    #[validate(nested)]
    pub location: Option<Location>,
    #[validate(custom(function = "validate_careers"))]
    pub careers: Option<Vec<Career>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl UpdateBootcampRequest {
    pub fn apply(self, bootcamp: &mut Bootcamp) {
        if let Some(name) = self.name {
            bootcamp.slug = slugify(&name);
            bootcamp.name = name;
        }
        if let Some(description) = self.description {
            bootcamp.description = description;
        }
        if self.website.is_some() {
            bootcamp.website = self.website;
        }
        if self.phone.is_some() {
            bootcamp.phone = self.phone;
        }
        if self.email.is_some() {
            bootcamp.email = self.email;
        }
        if let Some(address) = self.address {
            bootcamp.address = address;
        }
        if self.location.is_some() {
            bootcamp.location = self.location;
        }
        if let Some(careers) = self.careers {
            bootcamp.careers = careers;
        }
        if let Some(housing) = self.housing {
            bootcamp.housing = housing;
        }
        if let Some(job_assistance) = self.job_assistance {
            bootcamp.job_assistance = job_assistance;
        }
        if let Some(job_guarantee) = self.job_guarantee {
            bootcamp.job_guarantee = job_guarantee;
        }
        if let Some(accept_gi) = self.accept_gi {
            bootcamp.accept_gi = accept_gi;
        }
    }
}
