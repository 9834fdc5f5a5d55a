//! Pagination for read-all operations.
//!
//! Requests carry an optional 1-based `page` and an optional `per_page`.
//! `page = -1` switches pagination off and returns every match at once.

use crate::{Error, Result};

/// Page value that disables pagination.
pub const ALL_PAGES: i64 = -1;

/// Resolved pagination for one read-all call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pagination {
    /// Every match in one response.
    Disabled,
    /// 1-based page of `per_page` items.
    Page { number: i64, per_page: i64 },
}

impl Pagination {
    /// Resolve raw request values against the configured maximum.
    ///
    /// * missing page means page 1
    /// * `per_page` missing or zero means `max_per_page`; larger values are clamped
    /// * negative `per_page` or `page < 1` (other than [`ALL_PAGES`]) is rejected
    /// * pages whose offset does not fit an `i64` are rejected
    pub fn resolve(page: Option<i64>, per_page: Option<i64>, max_per_page: i64) -> Result<Self> {
        let page = page.unwrap_or(1);
        if page == ALL_PAGES {
            return Ok(Pagination::Disabled);
        }
        if page < 1 {
            return Err(Error::InvalidRequest(
                "Page number must be at least 1.".to_string(),
            ));
        }

        let per_page = match per_page.unwrap_or(0) {
            0 => max_per_page,
            n if n < 0 => {
                return Err(Error::InvalidRequest(
                    "Per page amount cannot be negative.".to_string(),
                ));
            }
            n => n.min(max_per_page),
        };
        if (page - 1).checked_mul(per_page).is_none() {
            return Err(Error::InvalidRequest("Page number is too large.".to_string()));
        }

        Ok(Pagination::Page {
            number: page,
            per_page,
        })
    }

    /// SQL `LIMIT` and `OFFSET` values. SQLite treats a negative limit as none.
    pub fn limit_offset(&self) -> (i64, i64) {
        match *self {
            Pagination::Disabled => (-1, 0),
            Pagination::Page { number, per_page } => (per_page, (number - 1) * per_page),
        }
    }

    /// Number of pages for `total` matches when this page held `result_count`.
    pub fn total_pages(&self, total: i64, result_count: usize) -> i64 {
        if result_count == 0 {
            return 0;
        }
        match *self {
            Pagination::Disabled => 1,
            Pagination::Page { per_page, .. } => {
                if total <= 0 {
                    0
                } else {
                    (total + per_page - 1) / per_page
                }
            }
        }
    }
}
