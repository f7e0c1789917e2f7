//! Pagination

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// One-based page request, translated to LIMIT/OFFSET by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PageRequest")]
pub struct Page {
    page: i64,
    page_size: i64,
}

/// Unvalidated wire form of `Page`
#[derive(Deserialize)]
struct PageRequest {
    page: i64,
    page_size: i64,
}

impl TryFrom<PageRequest> for Page {
    type Error = DomainError;

    fn try_from(request: PageRequest) -> Result<Self, Self::Error> {
        Page::new(request.page, request.page_size)
    }
}

impl Page {
    /// # Errors
    /// `DomainError::InvalidPage` if `page < 1`, `page_size` is outside `1..=100`,
    /// or the resulting offset does not fit in an `i64`
    pub fn new(page: i64, page_size: i64) -> Result<Self, DomainError> {
        if page < 1 {
            return Err(DomainError::InvalidPage(format!("page must be >= 1 (got {})", page)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(DomainError::InvalidPage(format!(
                "page_size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, page_size
            )));
        }
        if (page - 1).checked_mul(page_size).is_none() {
            return Err(DomainError::InvalidPage(format!(
                "page {} with page_size {} is past the last addressable row",
                page, page_size
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}
