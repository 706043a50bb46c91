//! Helpers over JSON documents shared by the store backends and the list
//! pipeline: path lookup, predicate evaluation, ordering and projection.

use crate::query::{Filter, GeoWithin, Operator, Predicate, SortDirection, SortKey};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

pub const ID_FIELD: &str = "id";

/// Resolve a dotted path. Numeric segments index into arrays.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn document_id(doc: &Value) -> Option<Uuid> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

pub fn matches(doc: &Value, filter: &Filter) -> bool {
    filter.predicates().iter().all(|p| predicate_matches(doc, p))
        && filter.geo().map_or(true, |geo| geo_matches(doc, geo))
}

fn predicate_matches(doc: &Value, predicate: &Predicate) -> bool {
    let actual = lookup(doc, &predicate.field);

    match predicate.op {
        Operator::Eq | Operator::In => predicate
            .accepted()
            .into_iter()
            .any(|option| equals_or_contains(actual, option)),
        op => actual.map_or(false, |a| range_matches(a, op, &predicate.value)),
    }
}

/// Equality with array fields matching when any element is equal
fn equals_or_contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None | Some(Value::Null) => expected.is_null(),
        Some(value @ Value::Array(items)) => {
            scalar_eq(value, expected) || items.iter().any(|item| scalar_eq(item, expected))
        }
        Some(value) => scalar_eq(value, expected),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Range comparisons only hold between values of the same type
fn range_matches(actual: &Value, op: Operator, expected: &Value) -> bool {
    if let Value::Array(items) = actual {
        return items.iter().any(|item| range_matches(item, op, expected));
    }

    let ordering = match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match (ordering, op) {
        (Some(o), Operator::Gt) => o == Ordering::Greater,
        (Some(o), Operator::Gte) => o != Ordering::Less,
        (Some(o), Operator::Lt) => o == Ordering::Less,
        (Some(o), Operator::Lte) => o != Ordering::Greater,
        _ => false,
    }
}

fn geo_matches(doc: &Value, geo: &GeoWithin) -> bool {
    let point = lookup(doc, &geo.field).and_then(Value::as_array);
    let Some([lng, lat]) = point.map(Vec::as_slice) else {
        return false;
    };
    match (lng.as_f64(), lat.as_f64()) {
        (Some(lng), Some(lat)) => central_angle(geo.lng, geo.lat, lng, lat) <= geo.radius,
        _ => false,
    }
}

/// Great-circle distance between two `(lng, lat)` points, in radians
pub fn central_angle(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Cross-type ordering of PostgreSQL's jsonb btree: a missing field (SQL
/// NULL) first, then the empty array, null, strings, numbers, booleans,
/// arrays and objects
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Array(items)) if items.is_empty() => 1,
        Some(Value::Null) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Number(_)) => 4,
        Some(Value::Bool(_)) => 5,
        Some(Value::Array(_)) => 6,
        Some(Value::Object(_)) => 7,
    }
}

/// Object keys in jsonb storage order: shorter keys first, then bytewise
fn storage_order(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut pairs: Vec<_> = map.iter().collect();
    pairs.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    pairs
}

/// Strings compare bytewise, which matches a `C` collation database
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(a, b)| compare_values(Some(a), Some(b)))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x.len().cmp(&y.len()).then_with(|| {
            storage_order(x)
                .into_iter()
                .zip(storage_order(y))
                .map(|((ka, va), (kb, vb))| {
                    ka.len()
                        .cmp(&kb.len())
                        .then_with(|| ka.cmp(kb))
                        .then_with(|| compare_values(Some(va), Some(vb)))
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        _ => Ordering::Equal,
    }
}

/// Order by the sort keys, then by `id` so equal keys keep a stable order
pub fn compare_documents(a: &Value, b: &Value, sort: &[SortKey]) -> Ordering {
    sort.iter()
        .map(|key| {
            let ord = compare_values(lookup(a, &key.field), lookup(b, &key.field));
            match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or_else(|| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)))
}

/// Keep only the listed paths plus `id`
pub fn project(doc: &Value, fields: &[String]) -> Value {
    let mut out = Value::Object(Map::new());

    if let Some(id) = doc.get(ID_FIELD) {
        insert_path(&mut out, ID_FIELD, id.clone());
    }
    for field in fields {
        if let Some(value) = lookup(doc, field) {
            insert_path(&mut out, field, value.clone());
        }
    }
    out
}

fn insert_path(target: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = target;

    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

pub fn strip_fields(doc: &mut Value, fields: &[&str]) {
    if let Value::Object(map) = doc {
        for field in fields {
            map.remove(*field);
        }
    }
}

/// Values of the unique-key fields, or `None` when any of them is unset
pub fn unique_values(doc: &Value, keys: &[&str]) -> Option<Vec<Value>> {
    keys.iter()
        .map(|k| lookup(doc, k).filter(|v| !v.is_null()).cloned())
        .collect()
}
