//! Parsed list request: filter, projection, sort order and page window

use super::filter::{parse_filter, Filter};
use super::pager::PageRequest;
use crate::error::AppError;

/// Newest first, the deterministic default order for every list
pub const DEFAULT_SORT: &str = "-createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `-name,averageCost` style lists
    pub fn parse_list(raw: &str) -> Vec<SortKey> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "-")
            .map(|s| match s.strip_prefix('-') {
                Some(field) => SortKey::desc(field),
                None => SortKey::asc(s),
            })
            .collect()
    }
}

/// Everything a list endpoint needs from the query string, parsed once.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub filter: Filter,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: PageRequest,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            filter: Filter::new(),
            select: None,
            sort: SortKey::parse_list(DEFAULT_SORT),
            page: PageRequest::default(),
        }
    }
}

impl QueryRequest {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let last = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let filter = parse_filter(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

        let select = last("select")
            .map(split_fields)
            .filter(|fields| !fields.is_empty());

        let sort = last("sort")
            .map(SortKey::parse_list)
            .filter(|keys| !keys.is_empty())
            .unwrap_or_else(|| SortKey::parse_list(DEFAULT_SORT));

        Ok(Self {
            filter,
            select,
            sort,
            page: PageRequest::parse(last("page"), last("limit")),
        })
    }
}

fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
