//! Advanced results: the shared list pipeline
//!
//! filter → count → project → sort → window → populate → strip private fields

use super::pager::Pagination;
use super::populate::{populate, PopulateSpec};
use super::{Filter, QueryRequest};
use crate::db::document::strip_fields;
use crate::db::{Collection, DocumentStore, FindOptions};
use crate::error::ApiResult;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// `{success, count, pagination, data}` list body; `count` is `data.len()`
#[derive(Debug, Serialize)]
pub struct AdvancedResults {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

/// Run one list request against `collection`.
///
/// `scope` is ANDed with the caller's filter (nested routes pass the parent
/// here). Any store failure aborts the whole request.
pub async fn advanced_results(
    store: &dyn DocumentStore,
    collection: Collection,
    request: &QueryRequest,
    scope: Option<Filter>,
    relation: Option<&PopulateSpec>,
) -> ApiResult<AdvancedResults> {
    let filter = scope.unwrap_or_default().merge(request.filter.clone());
    debug!(
        "{} query: filter={} page={} limit={}",
        collection,
        filter.to_document(),
        request.page.page,
        request.page.limit
    );

    let total = store.count(collection, &filter).await?;

    let options = FindOptions::new(filter)
        .sort(request.sort.clone())
        .projection(request.select.clone())
        .window(request.page.skip(), request.page.limit);
    let mut data = store.find(collection, &options).await?;

    if let Some(spec) = relation {
        populate(store, &mut data, spec).await?;
    }

    let private = collection.private_fields();
    if !private.is_empty() {
        for doc in &mut data {
            strip_fields(doc, private);
        }
    }

    Ok(AdvancedResults {
        success: true,
        count: data.len(),
        pagination: request.page.describe(total),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::query::{PageRef, BOOTCAMP_SUMMARY};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn query(raw: &[(&str, &str)]) -> QueryRequest {
        let pairs: Vec<(String, String)> =
            raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        QueryRequest::from_pairs(&pairs).unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let camps = [
            ("Alpha", 6000),
            ("Bravo", 5000),
            ("Charlie", 7000),
            ("Delta", 5500),
            ("Echo", 8000),
            ("Foxtrot", 1000),
        ];
        for (i, (name, cost)) in camps.into_iter().enumerate() {
            store
                .insert(
                    Collection::Bootcamps,
                    json!({
                        "id": Uuid::new_v4().to_string(),
                        "name": name,
                        "averageCost": cost,
                        "createdAt": format!("2024-01-0{}T00:00:00.000000Z", i + 1)
                    }),
                )
                .await
                .unwrap();
        }
        store
    }

    fn names(results: &AdvancedResults) -> Vec<&str> {
        results.data.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_filtered_sorted_second_page() {
        let store = seeded().await;
        let request = query(&[
            ("averageCost[gte]", "5000"),
            ("sort", "-name"),
            ("page", "2"),
            ("limit", "2"),
        ]);

        let results = advanced_results(&store, Collection::Bootcamps, &request, None, None)
            .await
            .unwrap();

        // Echo, Delta | Charlie, Bravo | Alpha
        assert_eq!(names(&results), vec!["Charlie", "Bravo"]);
        assert_eq!(results.count, 2);
        assert_eq!(results.pagination.prev, Some(PageRef { page: 1, limit: 2 }));
        assert_eq!(results.pagination.next, Some(PageRef { page: 3, limit: 2 }));
    }

    #[tokio::test]
    async fn test_beyond_last_page() {
        let store = seeded().await;
        let request = query(&[("page", "9"), ("limit", "2")]);

        let results = advanced_results(&store, Collection::Bootcamps, &request, None, None)
            .await
            .unwrap();

        assert!(results.data.is_empty());
        assert_eq!(results.count, 0);
        assert_eq!(results.pagination.next, None);
        assert_eq!(results.pagination.prev, Some(PageRef { page: 8, limit: 2 }));
    }

    #[tokio::test]
    async fn test_default_order_and_select() {
        let store = seeded().await;
        let request = query(&[("select", "name")]);

        let results = advanced_results(&store, Collection::Bootcamps, &request, None, None)
            .await
            .unwrap();

        assert_eq!(names(&results)[0], "Foxtrot");
        assert_eq!(results.count, 6);
        assert!(results.data[0].get("averageCost").is_none());
        assert!(results.data[0].get("id").is_some());

        let body = serde_json::to_value(&results).unwrap();
        assert_eq!(body["pagination"], json!({}));
    }

    #[tokio::test]
    async fn test_scope_populate_and_private_fields() {
        let store = seeded().await;
        let camp = store
            .find_one(Collection::Bootcamps, &Filter::eq("name", "Alpha"))
            .await
            .unwrap()
            .unwrap();
        for title in ["One", "Two"] {
            store
                .insert(
                    Collection::Courses,
                    json!({ "id": Uuid::new_v4().to_string(), "title": title, "bootcamp": camp["id"] }),
                )
                .await
                .unwrap();
        }
        store
            .insert(
                Collection::Courses,
                json!({ "id": Uuid::new_v4().to_string(), "title": "Elsewhere", "bootcamp": Uuid::new_v4().to_string() }),
            )
            .await
            .unwrap();

        let scope = Filter::eq("bootcamp", camp["id"].clone());
        let results = advanced_results(
            &store,
            Collection::Courses,
            &QueryRequest::default(),
            Some(scope),
            Some(&BOOTCAMP_SUMMARY),
        )
        .await
        .unwrap();
        assert_eq!(results.count, 2);
        assert_eq!(results.data[0]["bootcamp"]["name"], "Alpha");

        store
            .insert(
                Collection::Users,
                json!({ "id": Uuid::new_v4().to_string(), "name": "Jane", "password": "hash", "resetPasswordToken": "x" }),
            )
            .await
            .unwrap();
        let users = advanced_results(&store, Collection::Users, &QueryRequest::default(), None, None)
            .await
            .unwrap();
        assert!(users.data[0].get("password").is_none());
        assert!(users.data[0].get("resetPasswordToken").is_none());
    }

    #[tokio::test]
    async fn test_unknown_operator_rejected() {
        let pairs = vec![("averageCost[ne]".to_string(), "5".to_string())];
        let err = QueryRequest::from_pairs(&pairs).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_numeric_text_matches_string_fields() {
        let store = MemoryStore::new();
        for (name, zipcode) in [("Alpha", "02215"), ("Bravo", "2215"), ("Charlie", "10001")] {
            store
                .insert(
                    Collection::Bootcamps,
                    json!({
                        "id": Uuid::new_v4().to_string(),
                        "name": name,
                        "phone": "5551234",
                        "location": { "zipcode": zipcode }
                    }),
                )
                .await
                .unwrap();
        }

        let results = advanced_results(
            &store,
            Collection::Bootcamps,
            &query(&[("location.zipcode", "02215")]),
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(names(&results), vec!["Alpha"]);

        let results = advanced_results(
            &store,
            Collection::Bootcamps,
            &query(&[("location.zipcode[in]", "10001,02215"), ("sort", "name")]),
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(names(&results), vec!["Alpha", "Charlie"]);

        let results = advanced_results(
            &store,
            Collection::Bootcamps,
            &query(&[("phone", "5551234")]),
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(results.count, 3);
    }
}
