//! Pagination utilities for service layer
//!
//! `PageQuery` is what arrives on the query string; `Pagination` is the
//! validated form every list operation works with.

use common::types::Paginated;
use sea_orm::{DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, Select};
use serde::Deserialize;

use crate::errors::ServiceError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw `page`, `page_size` and `search_string` query parameters.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
}

/// Validated pagination parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u64,
    /// items per page
    pub page_size: u64,
    /// trimmed search text, at least 2 characters
    pub search: Option<String>,
}

impl Default for Pagination {
    fn default() -> Self { Self { page: DEFAULT_PAGE, page_size: DEFAULT_PAGE_SIZE, search: None } }
}

impl Pagination {
    /// Missing or zero values fall back to defaults; anything else out of range is a 400.
    pub fn from_query(q: &PageQuery) -> Result<Self, ServiceError> {
        let page = match q.page {
            None | Some(0) => DEFAULT_PAGE,
            Some(p) if p < 0 => return Err(ServiceError::bad_request("Page must be a positive number")),
            Some(p) => p as u64,
        };
        let page_size = match q.page_size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(s) if s < 0 || s as u64 > MAX_PAGE_SIZE => {
                return Err(ServiceError::bad_request(format!("Page size must be between 1 and {}", MAX_PAGE_SIZE)))
            }
            Some(s) => s as u64,
        };
        let search = normalize_search(q.search_string.as_deref())?;
        Ok(Self { page, page_size, search })
    }

    /// Run `select` as one page and wrap it with pagination metadata.
    pub async fn fetch<'db, E, M>(
        &self,
        db: &'db DatabaseConnection,
        select: Select<E>,
    ) -> Result<Paginated<M>, ServiceError>
    where
        E: EntityTrait<Model = M> + 'db,
        M: FromQueryResult + Sized + Send + Sync + 'db,
    {
        let paginator = select.paginate(db, self.page_size);
        let total = paginator.num_items().await?;
        let records = match self.offset() {
            Some(offset) if offset < total => paginator.fetch_page(self.page - 1).await?,
            _ => Vec::new(),
        };
        Ok(Paginated::new(records, total, self.page, self.page_size))
    }

    /// Rows to skip, or `None` when the page lies beyond anything Postgres can address.
    pub fn offset(&self) -> Option<u64> {
        (self.page - 1).checked_mul(self.page_size).filter(|o| *o <= i64::MAX as u64)
    }

    /// `%search%` pattern for lowercase LIKE comparisons.
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_deref().map(like_pattern)
    }
}

/// Blank search text counts as absent; one-character searches are rejected.
pub fn normalize_search(raw: Option<&str>) -> Result<Option<String>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.chars().count() < 2 => {
            Err(ServiceError::bad_request("Search string must be at least 2 characters long"))
        }
        Some(s) => Ok(Some(s.to_string())),
    }
}

/// `%search%` with `\`, `%` and `_` escaped so the text matches literally.
pub fn like_pattern(search: &str) -> String {
    format!("%{}%", escape_like(&search.to_lowercase()))
}

/// Escape LIKE metacharacters; pairs with the `ESCAPE '\'` clause of [`crate::validation::ilike`].
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(page: Option<i64>, page_size: Option<i64>, search: Option<&str>) -> PageQuery {
        PageQuery { page, page_size, search_string: search.map(String::from) }
    }

    #[test]
    fn missing_and_zero_fall_back_to_defaults() {
        assert_eq!(Pagination::from_query(&q(None, None, None)).unwrap(), Pagination::default());
        let p = Pagination::from_query(&q(Some(0), Some(0), Some("  "))).unwrap();
        assert_eq!((p.page, p.page_size, p.search), (1, 10, None));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(Pagination::from_query(&q(Some(-1), None, None)), Err(ServiceError::BadRequest(_))));
        assert!(matches!(Pagination::from_query(&q(None, Some(101), None)), Err(ServiceError::BadRequest(_))));
        assert!(Pagination::from_query(&q(Some(3), Some(100), None)).is_ok());
    }

    #[test]
    fn short_search_is_rejected() {
        let err = Pagination::from_query(&q(None, None, Some("a"))).unwrap_err();
        assert_eq!(err.to_string(), "Search string must be at least 2 characters long");
        let ok = Pagination::from_query(&q(None, None, Some(" Ab "))).unwrap();
        assert_eq!(ok.like_pattern().as_deref(), Some("%ab%"));
    }

    #[test]
    fn huge_pages_have_no_offset() {
        let p = Pagination::from_query(&q(Some(i64::MAX), Some(100), None)).unwrap();
        assert_eq!(p.offset(), None);
        let p = Pagination::from_query(&q(Some(i64::MAX), Some(1), None)).unwrap();
        assert_eq!(p.offset(), Some(i64::MAX as u64 - 1));
        let p = Pagination::from_query(&q(Some(3), Some(20), None)).unwrap();
        assert_eq!(p.offset(), Some(40));
    }

    #[test]
    fn like_metacharacters_match_literally() {
        assert_eq!(like_pattern("W0E_A17"), "%w0e\\_a17%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() -> Result<(), anyhow::Error> {
        let Some(db) = crate::test_support::get_db().await else { return Ok(()) };
        let page = Pagination::from_query(&q(Some(i64::MAX), Some(100), None))?;
        let result = page.fetch(&db, models::project::Entity::find()).await?;
        assert!(result.records.is_empty());
        assert_eq!(result.pagination_info.current_page, i64::MAX as u64);
        Ok(())
    }
}
