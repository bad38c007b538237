//! Paging parameters and the paged list envelope shared by list endpoints.

use serde::{Deserialize, Serialize};

/// `?page=&perPage=` query parameters. Pages are 1-based.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    const MAX_PER_PAGE: i64 = 200;
    const DEFAULT_PER_PAGE: i64 = 50;
    /// Keeps `offset()` well inside `i64` for any client-supplied page.
    const MAX_PAGE: i64 = 1_000_000;

    pub fn limit(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn current_page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.current_page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: &Pagination) -> Self {
        let per_page = pagination.limit();
        Self {
            items,
            total,
            page: pagination.current_page(),
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        }
    }
}

/// Wrap a free-text search term for use with `ILIKE`, escaping wildcards.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = Pagination::default();
        assert_eq!(p.limit(), 50);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.current_page(), 1);
    }

    #[test]
    fn clamps_and_offsets() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(p.limit(), 200);
        assert_eq!(p.current_page(), 1);

        let p = Pagination {
            page: Some(4),
            per_page: Some(25),
        };
        assert_eq!(p.offset(), 75);
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(50),
        };
        assert_eq!(p.current_page(), 1_000_000);
        assert_eq!(p.offset(), 999_999 * 50);

        let p = Pagination {
            page: Some(i64::MIN),
            per_page: Some(i64::MAX),
        };
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 200);
    }

    #[test]
    fn paged_result_rounds_pages_up() {
        let p = Pagination {
            page: Some(2),
            per_page: Some(10),
        };
        let result = PagedResult::new(vec!["a"], 21, &p);
        assert_eq!(result.total_pages, 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["perPage"], 10);
        assert_eq!(json["totalPages"], 3);
    }

    #[test]
    fn query_string_uses_camel_case() {
        let p: Pagination = serde_json::from_str(r#"{"page":3,"perPage":5}"#).unwrap();
        assert_eq!(p.offset(), 10);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" acme "), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
