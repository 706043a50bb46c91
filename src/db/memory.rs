//! In-memory document store
//!
//! Backs the test suite and database-less development runs. Collections keep
//! insertion order; every operation holds the lock for its whole duration, which
//! gives the same per-operation atomicity the SQL backend provides.

use super::document::{self, compare_documents, document_id, matches, project, unique_values};
use super::{Collection, DocumentStore, FindOptions, StoreError, StoreResult};
use crate::query::Filter;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<Collection, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reject `doc` if another document already holds one of its unique keys
fn check_unique(collection: Collection, docs: &[Value], doc: &Value) -> StoreResult<()> {
    let id = document_id(doc);

    for keys in collection.unique_keys() {
        let Some(values) = unique_values(doc, keys) else {
            continue;
        };
        let taken = docs
            .iter()
            .filter(|other| document_id(other) != id)
            .any(|other| unique_values(other, keys).as_ref() == Some(&values));
        if taken {
            return Err(StoreError::Duplicate(format!("{}.{}", collection, keys.join("+"))));
        }
    }
    Ok(())
}

fn require_id(doc: &Value) -> StoreResult<Uuid> {
    document_id(doc).ok_or_else(|| StoreError::Backend("document is missing a valid id".to_string()))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, options: &FindOptions) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<&Value> = docs.iter().filter(|d| matches(d, &options.filter)).collect();
        found.sort_by(|a, b| compare_documents(a, b, &options.sort));

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match &options.projection {
                Some(fields) => project(d, fields),
                None => d.clone(),
            })
            .collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)))
            .cloned())
    }

    async fn insert(&self, collection: Collection, doc: Value) -> StoreResult<Value> {
        let id = require_id(&doc)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if docs.iter().any(|d| document_id(d) == Some(id)) {
            return Err(StoreError::Duplicate(format!("{}.{}", collection, document::ID_FIELD)));
        }
        check_unique(collection, docs, &doc)?;

        docs.push(doc.clone());
        Ok(doc)
    }

    async fn replace(&self, collection: Collection, doc: Value) -> StoreResult<Option<Value>> {
        let id = require_id(&doc)?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };

        check_unique(collection, docs, &doc)?;

        match docs.iter_mut().find(|d| document_id(d) == Some(id)) {
            Some(slot) => {
                *slot = doc.clone();
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));
        Ok(docs.len() != before)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches(d, filter));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortKey;
    use serde_json::json;

    fn doc(name: &str, cost: u64) -> Value {
        json!({ "id": Uuid::new_v4().to_string(), "name": name, "averageCost": cost })
    }

    #[tokio::test]
    async fn test_find_sorts_windows_and_projects() {
        let store = MemoryStore::new();
        for (name, cost) in [("A", 1), ("B", 2), ("C", 3), ("D", 4)] {
            store.insert(Collection::Bootcamps, doc(name, cost)).await.unwrap();
        }

        let options = FindOptions::new(Filter::new())
            .sort(vec![SortKey::desc("averageCost")])
            .projection(Some(vec!["name".to_string()]))
            .window(1, 2);
        let found = store.find(Collection::Bootcamps, &options).await.unwrap();

        let names: Vec<_> = found.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["C", "B"]);
        assert!(found[0].get("averageCost").is_none());
        assert!(found[0].get("id").is_some());
    }

    #[tokio::test]
    async fn test_unique_keys() {
        let store = MemoryStore::new();
        store.insert(Collection::Bootcamps, doc("A", 1)).await.unwrap();

        let err = store.insert(Collection::Bootcamps, doc("A", 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let other = store.insert(Collection::Bootcamps, doc("B", 2)).await.unwrap();
        let mut renamed = other.clone();
        renamed["name"] = json!("A");
        let err = store.replace(Collection::Bootcamps, renamed).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // Replacing a document with its own unique value is fine
        assert!(store.replace(Collection::Bootcamps, other).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_count_and_delete() {
        let store = MemoryStore::new();
        let kept = store.insert(Collection::Courses, doc("A", 1)).await.unwrap();
        store.insert(Collection::Courses, doc("B", 5)).await.unwrap();
        store.insert(Collection::Courses, doc("C", 5)).await.unwrap();

        let expensive = Filter::eq("averageCost", 5);
        assert_eq!(store.count(Collection::Courses, &expensive).await.unwrap(), 2);
        assert_eq!(store.delete_many(Collection::Courses, &expensive).await.unwrap(), 2);

        let id = document_id(&kept).unwrap();
        assert!(store.delete_by_id(Collection::Courses, id).await.unwrap());
        assert!(!store.delete_by_id(Collection::Courses, id).await.unwrap());
        assert_eq!(store.count(Collection::Courses, &Filter::new()).await.unwrap(), 0);
    }
}
