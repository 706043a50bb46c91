//! Typed access to the document store
//!
//! Thin helpers that convert between resource structs and stored documents so
//! handlers never touch raw JSON.

use super::{DocumentStore, FindOptions};
use crate::error::{not_found_error, ApiResult};
use crate::models::Resource;
use crate::query::Filter;
use serde_json::Value;
use uuid::Uuid;

pub fn to_document<R: Resource>(resource: &R) -> ApiResult<Value> {
    Ok(serde_json::to_value(resource).map_err(super::StoreError::from)?)
}

fn from_document<R: Resource>(doc: Value) -> ApiResult<R> {
    Ok(serde_json::from_value(doc).map_err(super::StoreError::from)?)
}

/// `NotFound` message used for every missing resource
pub fn missing<R: Resource>(id: impl std::fmt::Display) -> crate::error::AppError {
    not_found_error(format!("{} not found with id of {}", R::LABEL, id))
}

pub async fn find_by_id<R: Resource>(store: &dyn DocumentStore, id: Uuid) -> ApiResult<Option<R>> {
    store
        .find_by_id(R::COLLECTION, id)
        .await?
        .map(from_document)
        .transpose()
}

/// Fetch or fail with `NotFound`
pub async fn get<R: Resource>(store: &dyn DocumentStore, id: Uuid) -> ApiResult<R> {
    find_by_id(store, id).await?.ok_or_else(|| missing::<R>(id))
}

pub async fn find_one<R: Resource>(store: &dyn DocumentStore, filter: &Filter) -> ApiResult<Option<R>> {
    store
        .find_one(R::COLLECTION, filter)
        .await?
        .map(from_document)
        .transpose()
}

/// Every matching resource, ordered by id
pub async fn find_all<R: Resource>(store: &dyn DocumentStore, filter: Filter) -> ApiResult<Vec<R>> {
    store
        .find(R::COLLECTION, &FindOptions::new(filter))
        .await?
        .into_iter()
        .map(from_document)
        .collect()
}

pub async fn insert<R: Resource>(store: &dyn DocumentStore, resource: &R) -> ApiResult<R> {
    let doc = store.insert(R::COLLECTION, to_document(resource)?).await?;
    from_document(doc)
}

/// Persist an already-fetched resource; `NotFound` if it vanished meanwhile
pub async fn save<R: Resource>(store: &dyn DocumentStore, resource: &R) -> ApiResult<R> {
    match store.replace(R::COLLECTION, to_document(resource)?).await? {
        Some(doc) => from_document(doc),
        None => Err(missing::<R>(resource.id())),
    }
}

pub async fn delete<R: Resource>(store: &dyn DocumentStore, resource: &R) -> ApiResult<()> {
    if store.delete_by_id(R::COLLECTION, resource.id()).await? {
        Ok(())
    } else {
        Err(missing::<R>(resource.id()))
    }
}
