//! Fixture import and wipe
//!
//! Fixture files are JSON arrays named after their collection. Ids are fixed
//! in the fixtures so references between files resolve; passwords are given
//! in plain text and hashed on import.

use crate::aggregates::{refresh_average_cost, refresh_average_rating};
use crate::auth::{hash_password, Role};
use crate::db::{repository, Collection, DocumentStore};
use crate::models::{CreateBootcampRequest, CreateCourseRequest, CreateReviewRequest, User};
use crate::query::Filter;
use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Default fixture directory
pub const DEFAULT_DIR: &str = "./_data";

#[derive(Debug, Deserialize)]
struct UserFixture {
    id: Uuid,
    name: String,
    email: String,
    #[serde(default)]
    role: Role,
    password: String,
}

/// A request body plus the ids the API would otherwise assign
#[derive(Debug, Deserialize)]
struct Fixture<T> {
    id: Uuid,
    user: Uuid,
    #[serde(default)]
    bootcamp: Option<Uuid>,
    #[serde(flatten)]
    body: T,
}

impl<T: Validate> Fixture<T> {
    fn checked(self, file: &str) -> anyhow::Result<Self> {
        self.body
            .validate()
            .map_err(|e| anyhow!("{}: fixture {} is invalid: {}", file, self.id, e))?;
        Ok(self)
    }

    fn parent(&self, file: &str) -> anyhow::Result<Uuid> {
        self.bootcamp
            .ok_or_else(|| anyhow!("{}: fixture {} has no bootcamp", file, self.id))
    }
}

/// Counts of imported documents
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

/// Parsed fixture file, or `None` when the file does not exist
async fn read_fixtures<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<Option<Vec<T>>> {
    let path = dir.join(file);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        warn!("No {} in {}, skipping", file, dir.display());
        return Ok(None);
    }
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items = serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(items))
}

/// Import every fixture file found in `dir`, then recompute bootcamp averages
pub async fn import(store: &dyn DocumentStore, dir: &Path) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for fixture in read_fixtures::<UserFixture>(dir, "users.json").await?.unwrap_or_default() {
        let mut user = User::new(
            fixture.name,
            fixture.email,
            fixture.role,
            hash_password(&fixture.password)?,
        );
        user.id = fixture.id;
        repository::insert(store, &user).await?;
        summary.users += 1;
    }

    let mut bootcamp_ids = Vec::new();
    for fixture in read_fixtures::<Fixture<CreateBootcampRequest>>(dir, "bootcamps.json")
        .await?
        .unwrap_or_default()
    {
        let fixture = fixture.checked("bootcamps.json")?;
        let mut bootcamp = fixture.body.into_bootcamp(fixture.user);
        bootcamp.id = fixture.id;
        repository::insert(store, &bootcamp).await?;
        bootcamp_ids.push(bootcamp.id);
        summary.bootcamps += 1;
    }

    for fixture in read_fixtures::<Fixture<CreateCourseRequest>>(dir, "courses.json")
        .await?
        .unwrap_or_default()
    {
        let fixture = fixture.checked("courses.json")?;
        let parent = fixture.parent("courses.json")?;
        let mut course = fixture.body.into_course(parent, fixture.user);
        course.id = fixture.id;
        repository::insert(store, &course).await?;
        summary.courses += 1;
    }

    for fixture in read_fixtures::<Fixture<CreateReviewRequest>>(dir, "reviews.json")
        .await?
        .unwrap_or_default()
    {
        let fixture = fixture.checked("reviews.json")?;
        let parent = fixture.parent("reviews.json")?;
        let mut review = fixture.body.into_review(parent, fixture.user);
        review.id = fixture.id;
        repository::insert(store, &review).await?;
        summary.reviews += 1;
    }

    for id in bootcamp_ids {
        refresh_average_cost(store, id).await?;
        refresh_average_rating(store, id).await?;
    }

    info!(
        "Data imported: {} users, {} bootcamps, {} courses, {} reviews",
        summary.users, summary.bootcamps, summary.courses, summary.reviews
    );
    Ok(summary)
}

/// Remove every document from every collection
pub async fn delete_all(store: &dyn DocumentStore) -> anyhow::Result<u64> {
    let mut removed = 0;
    for collection in Collection::ALL {
        removed += store.delete_many(collection, &Filter::new()).await?;
    }
    info!("Data deleted: {} documents", removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::db::MemoryStore;
    use crate::models::{Bootcamp, Course};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const MALFORMED_ID: &str = "5d7a514b5d2c12c7449be045";

    fn write(dir: &Path, file: &str, value: serde_json::Value) {
        std::fs::write(dir.join(file), value.to_string()).unwrap();
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Uuid::from_u128(1);
        let camp = Uuid::from_u128(10);
        write(
            dir.path(),
            "users.json",
            json!([{
                "id": publisher,
                "name": "Publisher",
                "email": "publisher@example.com",
                "role": "publisher",
                "password": "123456"
            }]),
        );
        write(
            dir.path(),
            "bootcamps.json",
            json!([{
                "id": camp,
                "user": publisher,
                "name": "Fixture Camp",
                "description": "Seeded",
                "address": "Boston MA",
                "careers": ["Web Development"]
            }]),
        );
        write(
            dir.path(),
            "courses.json",
            json!([
                { "id": Uuid::from_u128(20), "user": publisher, "bootcamp": camp, "title": "A",
                  "description": "a", "weeks": "4", "tuition": 1000, "minimumSkill": "beginner" },
                { "id": Uuid::from_u128(21), "user": publisher, "bootcamp": camp, "title": "B",
                  "description": "b", "weeks": "6", "tuition": 2000, "minimumSkill": "advanced" }
            ]),
        );
        dir
    }

    #[tokio::test]
    async fn test_import_and_delete() {
        let dir = fixture_dir();
        let store = MemoryStore::new();

        let summary = import(&store, dir.path()).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary { users: 1, bootcamps: 1, courses: 2, reviews: 0 }
        );

        let user: User = repository::get(&store, Uuid::from_u128(1)).await.unwrap();
        assert!(verify_password("123456", &user.password).unwrap());

        let camp: Bootcamp = repository::get(&store, Uuid::from_u128(10)).await.unwrap();
        assert_eq!(camp.slug, "fixture-camp");
        assert_eq!(camp.average_cost, Some(1500.0));
        assert_eq!(camp.average_rating, None);

        let course: Course = repository::get(&store, Uuid::from_u128(21)).await.unwrap();
        assert_eq!(course.bootcamp, camp.id);

        assert_eq!(delete_all(&store).await.unwrap(), 4);
        assert_eq!(store.count(Collection::Bootcamps, &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_fixture_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bootcamps.json",
            json!([{ "id": Uuid::from_u128(1), "user": Uuid::from_u128(2), "name": "No Description" }]),
        );
        let err = import(&MemoryStore::new(), dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("bootcamps.json"));

        write(dir.path(), "bootcamps.json", json!([{ "id": MALFORMED_ID }]));
        assert!(import(&MemoryStore::new(), dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_bundled_fixtures_import() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("_data");
        let store = MemoryStore::new();
        let summary = import(&store, &dir).await.unwrap();
        assert!(summary.bootcamps > 0);
        assert!(summary.reviews > 0);
        let stored = store.count(Collection::Bootcamps, &Filter::new()).await.unwrap();
        assert_eq!(stored as usize, summary.bootcamps);
    }
}
