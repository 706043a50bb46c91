//! SQL query constants and builders
//!
//! Documents live in one JSONB table keyed by `(collection, id)`. Filters, sort
//! keys and windows are rendered into parameterised SQL by [`SqlBuilder`]; field
//! paths are always bound as `text[]` parameters, never spliced into the text.

use super::Collection;
use crate::query::{Filter, Operator, Predicate, SortDirection, SortKey};
use tokio_postgres::types::ToSql;

/// Documents table
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection VARCHAR(64) NOT NULL,
        id UUID NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (collection, id)
    )
"#;

/// Unique constraints, mirrored by `Collection::unique_keys`
pub const CREATE_UNIQUE_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_bootcamps_name
        ON documents ((body->>'name')) WHERE collection = 'bootcamps'",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_users_email
        ON documents ((body->>'email')) WHERE collection = 'users'",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_reviews_bootcamp_user
        ON documents ((body->>'bootcamp'), (body->>'user')) WHERE collection = 'reviews'",
];

/// Foreign-key lookups used by nested routes and aggregates
pub const CREATE_LOOKUP_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_documents_bootcamp
        ON documents (collection, (body->>'bootcamp'))",
    "CREATE INDEX IF NOT EXISTS idx_documents_user
        ON documents (collection, (body->>'user'))",
];

pub const FIND_BY_ID: &str = "SELECT body FROM documents WHERE collection = $1 AND id = $2";

pub const INSERT_DOCUMENT: &str =
    "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) RETURNING body";

pub const REPLACE_DOCUMENT: &str =
    "UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2 RETURNING body";

pub const DELETE_BY_ID: &str = "DELETE FROM documents WHERE collection = $1 AND id = $2";

pub type SqlParam = Box<dyn ToSql + Sync + Send>;

/// Accumulates bind parameters while rendering clauses. `$1` is always the
/// collection name.
pub struct SqlBuilder {
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    pub fn new(collection: Collection) -> Self {
        Self {
            params: vec![Box::new(collection.as_str().to_string())],
        }
    }

    fn bind<T: ToSql + Sync + Send + 'static>(&mut self, value: T) -> String {
        self.params.push(Box::new(value));
        format!("${}", self.params.len())
    }

    fn bind_path(&mut self, field: &str) -> String {
        let segments: Vec<String> = field.split('.').map(String::from).collect();
        format!("{}::text[]", self.bind(segments))
    }

    /// `WHERE` body: collection match AND every predicate
    pub fn filter(&mut self, filter: &Filter) -> String {
        let mut clauses = vec!["collection = $1".to_string()];

        for predicate in filter.predicates() {
            clauses.push(self.predicate(predicate));
        }

        if let Some(geo) = filter.geo() {
            let lng_path = self.bind_path(&format!("{}.0", geo.field));
            let lat_path = self.bind_path(&format!("{}.1", geo.field));
            let lng = self.bind(geo.lng);
            let lat = self.bind(geo.lat);
            let radius = self.bind(geo.radius);
            let point_lng = format!("(body #>> {})::float8", lng_path);
            let point_lat = format!("(body #>> {})::float8", lat_path);
            clauses.push(format!(
                "2 * asin(least(1.0, sqrt(\
                    power(sin(radians({plat} - {lat}::float8) / 2), 2) + \
                    cos(radians({lat}::float8)) * cos(radians({plat})) * \
                    power(sin(radians({plng} - {lng}::float8) / 2), 2)))) <= {radius}::float8",
                plat = point_lat,
                plng = point_lng,
                lat = lat,
                lng = lng,
                radius = radius,
            ));
        }

        clauses.join(" AND ")
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        let path = self.bind_path(&predicate.field);
        let field = format!("(body #> {})", path);

        match predicate.op {
            Operator::Eq if predicate.literal.is_none() => {
                let value = format!("{}::jsonb", self.bind(predicate.value.clone()));
                Self::equals_or_contains(&field, &value)
            }
            Operator::Eq | Operator::In => {
                let options: Vec<serde_json::Value> =
                    predicate.accepted().into_iter().cloned().collect();
                let options = format!("{}::jsonb", self.bind(serde_json::Value::Array(options)));
                format!(
                    "({options} @> jsonb_build_array({field}) OR CASE WHEN jsonb_typeof({field}) = 'array' \
                     THEN EXISTS (SELECT 1 FROM jsonb_array_elements({field}) AS e(v) \
                     WHERE {options} @> jsonb_build_array(e.v)) ELSE false END)",
                    options = options,
                    field = field,
                )
            }
            op => {
                let value = format!("{}::jsonb", self.bind(predicate.value.clone()));
                let sql_op = match op {
                    Operator::Gt => ">",
                    Operator::Gte => ">=",
                    Operator::Lt => "<",
                    _ => "<=",
                };
                format!(
                    "(CASE WHEN jsonb_typeof({field}) = 'array' \
                     THEN EXISTS (SELECT 1 FROM jsonb_array_elements({field}) AS e(v) \
                     WHERE jsonb_typeof(e.v) = jsonb_typeof({value}) AND e.v {op} {value}) \
                     ELSE jsonb_typeof({field}) = jsonb_typeof({value}) AND {field} {op} {value} END)",
                    field = field,
                    op = sql_op,
                    value = value,
                )
            }
        }
    }

    fn equals_or_contains(field: &str, value: &str) -> String {
        format!(
            "({field} = {value} OR (jsonb_typeof({field}) = 'array' \
             AND {field} @> jsonb_build_array({value})))",
            field = field,
            value = value,
        )
    }

    /// `ORDER BY` body, always ending with the id tie-breaker
    pub fn order_by(&mut self, sort: &[SortKey]) -> String {
        let mut keys: Vec<String> = sort
            .iter()
            .map(|key| {
                let path = self.bind_path(&key.field);
                let direction = match key.direction {
                    SortDirection::Asc => "ASC NULLS FIRST",
                    SortDirection::Desc => "DESC NULLS LAST",
                };
                format!("body #> {} {}", path, direction)
            })
            .collect();
        keys.push("id ASC".to_string());
        keys.join(", ")
    }

    pub fn window(&mut self, skip: u64, limit: Option<u64>) -> String {
        let offset = self.bind(i64::try_from(skip).unwrap_or(i64::MAX));
        match limit {
            Some(limit) => {
                let limit = self.bind(i64::try_from(limit).unwrap_or(i64::MAX));
                format!("OFFSET {} LIMIT {}", offset, limit)
            }
            None => format!("OFFSET {}", offset),
        }
    }

    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }

    pub fn select(collection: Collection, filter: &Filter, sort: &[SortKey], skip: u64, limit: Option<u64>) -> (String, Self) {
        let mut builder = Self::new(collection);
        let where_clause = builder.filter(filter);
        let order = builder.order_by(sort);
        let window = builder.window(skip, limit);
        (
            format!(
                "SELECT body FROM documents WHERE {} ORDER BY {} {}",
                where_clause, order, window
            ),
            builder,
        )
    }

    pub fn count(collection: Collection, filter: &Filter) -> (String, Self) {
        let mut builder = Self::new(collection);
        let where_clause = builder.filter(filter);
        (
            format!("SELECT COUNT(*) FROM documents WHERE {}", where_clause),
            builder,
        )
    }

    pub fn delete(collection: Collection, filter: &Filter) -> (String, Self) {
        let mut builder = Self::new(collection);
        let where_clause = builder.filter(filter);
        (format!("DELETE FROM documents WHERE {}", where_clause), builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_filter;

    #[test]
    fn test_paths_and_values_are_bound() {
        let filter = parse_filter([("averageCost[gte]", "5000"), ("location.city", "Boston")]).unwrap();
        let (sql, builder) = SqlBuilder::count(Collection::Bootcamps, &filter);

        assert!(sql.starts_with("SELECT COUNT(*) FROM documents WHERE collection = $1 AND "));
        assert!(sql.contains("ELSE jsonb_typeof((body #> $2::text[])) = jsonb_typeof($3::jsonb) \
                              AND (body #> $2::text[]) >= $3::jsonb END"));
        assert!(sql.contains("(body #> $4::text[]) = $5::jsonb"));
        assert!(!sql.contains("Boston"));
        assert_eq!(builder.params().len(), 5);
    }

    #[test]
    fn test_ranges_check_array_elements() {
        let filter = parse_filter([("careers[gt]", "A")]).unwrap();
        let (sql, _) = SqlBuilder::count(Collection::Bootcamps, &filter);
        assert!(sql.contains(
            "CASE WHEN jsonb_typeof((body #> $2::text[])) = 'array' \
             THEN EXISTS (SELECT 1 FROM jsonb_array_elements((body #> $2::text[])) AS e(v) \
             WHERE jsonb_typeof(e.v) = jsonb_typeof($3::jsonb) AND e.v > $3::jsonb)"
        ));
    }

    #[test]
    fn test_numeric_text_binds_both_forms() {
        let filter = parse_filter([("location.zipcode", "02215")]).unwrap();
        let (sql, builder) = SqlBuilder::count(Collection::Bootcamps, &filter);
        assert!(sql.contains("($3::jsonb @> jsonb_build_array((body #> $2::text[]))"));
        assert_eq!(builder.params().len(), 3);

        let options = &filter.predicates()[0];
        assert_eq!(
            options.accepted().into_iter().cloned().collect::<Vec<_>>(),
            vec![serde_json::json!(2215), serde_json::json!("02215")]
        );
    }

    #[test]
    fn test_select_orders_then_windows() {
        let (sql, builder) = SqlBuilder::select(
            Collection::Courses,
            &Filter::new(),
            &[SortKey::desc("createdAt")],
            50,
            Some(25),
        );

        assert_eq!(
            sql,
            "SELECT body FROM documents WHERE collection = $1 \
             ORDER BY body #> $2::text[] DESC NULLS LAST, id ASC OFFSET $3 LIMIT $4"
        );
        assert_eq!(builder.params().len(), 4);
    }

    #[test]
    fn test_unbounded_window() {
        let (sql, _) = SqlBuilder::select(Collection::Users, &Filter::new(), &[], 0, None);
        assert!(sql.ends_with("ORDER BY id ASC OFFSET $2"));
    }
}
