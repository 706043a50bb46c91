//! Offset/limit pagination

use serde::Serialize;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;

/// Requested window, already coerced to positive integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Non-numeric or non-positive inputs fall back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            limit: positive(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Neighbouring pages for a result set of `total` matching records
    pub fn describe(&self, total: u64) -> Pagination {
        let next = (self.skip().saturating_add(self.limit) < total).then(|| PageRef {
            page: self.page + 1,
            limit: self.limit,
        });
        let prev = (self.page > 1).then(|| PageRef {
            page: self.page - 1,
            limit: self.limit,
        });
        Pagination { next, prev }
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n >= 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(PageRequest::parse(None, None), PageRequest { page: 1, limit: 25 });
        assert_eq!(
            PageRequest::parse(Some("0"), Some("-4")),
            PageRequest { page: 1, limit: 25 }
        );
        assert_eq!(
            PageRequest::parse(Some("two"), Some("")),
            PageRequest { page: 1, limit: 25 }
        );
    }

    #[test]
    fn test_skip() {
        assert_eq!(PageRequest { page: 1, limit: 25 }.skip(), 0);
        assert_eq!(PageRequest { page: 3, limit: 10 }.skip(), 20);
        assert_eq!(PageRequest { page: u64::MAX, limit: u64::MAX }.skip(), u64::MAX);
    }

    #[test]
    fn test_boundaries() {
        let first = PageRequest { page: 1, limit: 2 }.describe(5);
        assert_eq!(first.prev, None);
        assert_eq!(first.next, Some(PageRef { page: 2, limit: 2 }));

        let last = PageRequest { page: 3, limit: 2 }.describe(5);
        assert_eq!(last.prev, Some(PageRef { page: 2, limit: 2 }));
        assert_eq!(last.next, None);

        let beyond = PageRequest { page: 9, limit: 2 }.describe(5);
        assert_eq!(beyond.next, None);
    }

    #[test]
    fn test_describe_is_deterministic() {
        let req = PageRequest::parse(Some("2"), Some("2"));
        assert_eq!(req.describe(5), req.describe(5));
    }

    #[test]
    fn test_empty_pagination_serializes_as_empty_object() {
        let json = serde_json::to_value(Pagination::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
