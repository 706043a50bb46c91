//! Query filter translation
//!
//! Turns flat query-string pairs such as `averageCost[gte]=5000` into a
//! structured [`Filter`] that every store backend knows how to evaluate.

use crate::error::{validation_error, AppError};
use serde_json::{Map, Number, Value};

/// Query-string keys that drive the list pipeline instead of filtering.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Comparison operator of a single predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    /// Parse the bracketed suffix token (`gte` in `averageCost[gte]`)
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    /// Document-database style operator marker
    pub fn marker(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
        }
    }
}

/// A single field/operator/value comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Dotted field path, e.g. `location.city`
    pub field: String,
    pub op: Operator,
    pub value: Value,
    /// Query text of values that were coerced away from strings, so
    /// `location.zipcode=02215` still equals the stored string
    pub literal: Option<Value>,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
            literal: None,
        }
    }

    pub fn with_literal(mut self, literal: Value) -> Self {
        self.literal = Some(literal);
        self
    }

    /// Values an `Eq` or `In` predicate accepts: the typed values, then the
    /// query text of any that were coerced
    pub fn accepted(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        for value in std::iter::once(&self.value).chain(self.literal.as_ref()) {
            match value {
                Value::Array(items) if self.op == Operator::In => out.extend(items),
                other => out.push(other),
            }
        }
        out
    }
}

/// Points whose `[lng, lat]` pair lies within `radius` radians of a centre
#[derive(Debug, Clone, PartialEq)]
pub struct GeoWithin {
    pub field: String,
    pub lng: f64,
    pub lat: f64,
    pub radius: f64,
}

/// Conjunction of predicates, optionally narrowed by a spherical radius
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
    within: Option<GeoWithin>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single equality predicate
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(Predicate::new(field, Operator::Eq, value.into()))
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn within(mut self, geo: GeoWithin) -> Self {
        self.within = Some(geo);
        self
    }

    /// AND two filters together. A radius on `other` replaces ours.
    pub fn merge(mut self, other: Filter) -> Self {
        self.predicates.extend(other.predicates);
        if other.within.is_some() {
            self.within = other.within;
        }
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn geo(&self) -> Option<&GeoWithin> {
        self.within.as_ref()
    }

    /// Render as a `$`-operator document, used for logging
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for p in &self.predicates {
            let entry = doc
                .entry(p.field.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                ops.insert(p.op.marker().to_string(), p.value.clone());
            }
        }
        if let Some(geo) = &self.within {
            doc.insert(
                geo.field.clone(),
                serde_json::json!({
                    "$geoWithin": { "$centerSphere": [[geo.lng, geo.lat], geo.radius] }
                }),
            );
        }
        Value::Object(doc)
    }
}

/// Build a filter from raw query-string pairs, skipping the reserved keys.
pub fn parse_filter<'a, I>(pairs: I) -> Result<Filter, AppError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut filter = Filter::new();

    for (key, raw) in pairs {
        if RESERVED_KEYS.contains(&key) {
            continue;
        }

        let (field, op) = split_key(key)?;
        let predicate = match op {
            Operator::In => {
                let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
                let values: Vec<Value> = parts.iter().copied().map(coerce_value).collect();
                let coerced: Vec<Value> = parts
                    .iter()
                    .zip(&values)
                    .filter(|(_, v)| !v.is_string())
                    .map(|(text, _)| Value::String(text.to_string()))
                    .collect();
                let predicate = Predicate::new(field, op, Value::Array(values));
                if coerced.is_empty() {
                    predicate
                } else {
                    predicate.with_literal(Value::Array(coerced))
                }
            }
            Operator::Eq => {
                let value = coerce_value(raw);
                let typed = !value.is_string();
                let predicate = Predicate::new(field, op, value);
                if typed {
                    predicate.with_literal(Value::String(raw.to_string()))
                } else {
                    predicate
                }
            }
            _ => Predicate::new(field, op, coerce_value(raw)),
        };

        filter = filter.and(predicate);
    }

    Ok(filter)
}

/// Split `field[op]` into its field and operator.
fn split_key(key: &str) -> Result<(&str, Operator), AppError> {
    let Some(open) = key.find('[') else {
        if key.is_empty() || key.contains(']') {
            return Err(validation_error(format!("Invalid filter field '{}'", key)));
        }
        return Ok((key, Operator::Eq));
    };

    let field = &key[..open];
    let token = key[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| validation_error(format!("Malformed filter key '{}'", key)))?;

    if field.is_empty() {
        return Err(validation_error(format!("Invalid filter field '{}'", key)));
    }

    let op = Operator::from_token(token).ok_or_else(|| {
        validation_error(format!(
            "Unsupported filter operator '{}' on field '{}'",
            token, field
        ))
    })?;

    Ok((field, op))
}

/// Structural coercion of a query-string value: numbers and booleans are typed,
/// everything else stays text.
pub fn coerce_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if raw.bytes().any(|b| b.is_ascii_digit()) {
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
