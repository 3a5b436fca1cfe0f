//! Book model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Book record. `available_quantity` counts the copies that are neither
/// reserved by a waiting request nor on loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub publish_date: NaiveDate,
    pub isbn: Option<String>,
    pub quantity: i32,
    pub available_quantity: i32,
    pub description: Option<String>,
    pub category_id: Uuid,
}

impl Book {
    /// True while at least one copy is reserved or on loan
    pub fn has_copies_out(&self) -> bool {
        self.quantity != self.available_quantity
    }
}

/// Create / update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1-100 characters"))]
    pub author: String,
    pub publish_date: NaiveDate,
    #[validate(length(equal = 13, message = "ISBN must be 13 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "Available quantity cannot be negative"))]
    pub available_quantity: i32,
    #[validate(length(max = 1000, message = "Description is limited to 1000 characters"))]
    pub description: Option<String>,
    pub category_id: Uuid,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Substring match on the title
    pub book_title: Option<String>,
    pub category_id: Option<Uuid>,
    pub page_index: Option<i64>,
    pub page_size: Option<i64>,
}
