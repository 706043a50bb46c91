//! Relation population
//!
//! Replaces a foreign-key field with selected fields of the referenced record.
//! Population targets are fixed by the route, never by the query string.

use crate::db::document::{document_id, ID_FIELD};
use crate::db::{Collection, DocumentStore, FindOptions, StoreResult};
use crate::query::{Filter, Operator, Predicate};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Relation to expand and the fields of the related record to embed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateSpec {
    pub field: &'static str,
    pub collection: Collection,
    pub select: &'static [&'static str],
}

/// Parent bootcamp name and description, used by review listings
pub const BOOTCAMP_SUMMARY: PopulateSpec = PopulateSpec {
    field: "bootcamp",
    collection: Collection::Bootcamps,
    select: &["name", "description"],
};

/// Course listings also show where the bootcamp is
pub const COURSE_BOOTCAMP: PopulateSpec = PopulateSpec {
    field: "bootcamp",
    collection: Collection::Bootcamps,
    select: &["name", "description", "location.city"],
};

fn reference(doc: &Value, field: &str) -> Option<Uuid> {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Expand `spec.field` on every document with a single batched lookup.
///
/// Documents without the field (e.g. projected away) are left alone; a
/// reference that does not resolve becomes `null`.
pub async fn populate(store: &dyn DocumentStore, docs: &mut [Value], spec: &PopulateSpec) -> StoreResult<()> {
    let ids: BTreeSet<Uuid> = docs.iter().filter_map(|d| reference(d, spec.field)).collect();

    let related: HashMap<Uuid, Value> = if ids.is_empty() {
        HashMap::new()
    } else {
        let keys = ids.iter().map(|id| Value::String(id.to_string())).collect();
        let filter = Filter::new().and(Predicate::new(ID_FIELD, Operator::In, Value::Array(keys)));
        let projection = spec.select.iter().map(|f| f.to_string()).collect();
        let options = FindOptions::new(filter).projection(Some(projection));

        store
            .find(spec.collection, &options)
            .await?
            .into_iter()
            .filter_map(|doc| document_id(&doc).map(|id| (id, doc)))
            .collect()
    };

    for doc in docs.iter_mut() {
        let resolved = reference(doc, spec.field).and_then(|id| related.get(&id).cloned());
        if let Some(slot) = doc.get_mut(spec.field) {
            *slot = resolved.unwrap_or(Value::Null);
        }
    }
    Ok(())
}
