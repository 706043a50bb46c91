//! Document storage
//!
//! Every resource is stored as a JSON document in a named collection. The
//! [`DocumentStore`] trait is the full contract the rest of the crate relies on;
//! backends are PostgreSQL (JSONB) and an in-process map.

pub mod document;
pub mod memory;
pub mod postgres;
pub mod queries;
pub mod repository;

use crate::query::{Filter, SortKey};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Named document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Bootcamps,
        Collection::Courses,
        Collection::Reviews,
        Collection::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
        }
    }

    /// Field combinations that must be unique within the collection
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Bootcamps => &[&["name"]],
            Collection::Courses => &[],
            Collection::Reviews => &[&["bootcamp", "user"]],
            Collection::Users => &[&["email"]],
        }
    }

    /// Fields that are stored but never leave the API
    pub fn private_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["password", "resetPasswordToken", "resetPasswordExpire"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Modifiers of a find operation
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub projection: Option<Vec<String>>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn projection(mut self, fields: Option<Vec<String>>) -> Self {
        self.projection = fields;
        self
    }

    pub fn window(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Storage-layer contract. Documents carry their identifier in an `id` field.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Matching documents, sorted (ties broken by `id`), windowed and projected
    async fn find(&self, collection: Collection, options: &FindOptions) -> StoreResult<Vec<Value>>;

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<Option<Value>>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> StoreResult<Option<Value>>;

    async fn insert(&self, collection: Collection, doc: Value) -> StoreResult<Value>;

    /// Replace the document with the same `id`; `None` when it no longer exists
    async fn replace(&self, collection: Collection, doc: Value) -> StoreResult<Option<Value>>;

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<bool>;

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;
}
