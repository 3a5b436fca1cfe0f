//! Pagination helpers shared by list endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{book::Book, borrowing::BorrowingRequestDetails, category::Category};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Page selection query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    pub page_index: Option<i64>,
    /// Items per page (default: 10)
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn new(page_index: Option<i64>, page_size: Option<i64>) -> Self {
        Self { page_index, page_size }
    }

    /// Page index, with values below 1 treated as 1
    pub fn index(&self) -> i64 {
        self.page_index.filter(|&p| p >= 1).unwrap_or(1)
    }

    /// Page size, with values below 1 replaced by the default
    pub fn size(&self) -> i64 {
        self.page_size.filter(|&s| s >= 1).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.index() - 1) * self.size()
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = Page<Book>,
    CategoryPage = Page<Category>,
    BorrowingPage = Page<BorrowingRequestDetails>
)]
pub struct Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    pub page_index: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total_items: i64, query: PageQuery) -> Self {
        let page_size = query.size();
        Self {
            items,
            page_index: query.index(),
            page_size,
            total_items,
            total_pages: (total_items + page_size - 1) / page_size,
        }
    }
}
