//! Data models for the lending server

pub mod book;
pub mod borrowing;
pub mod category;
pub mod pagination;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use borrowing::{BorrowingRequest, BorrowingStatus, Decision};
pub use category::Category;
pub use pagination::{Page, PageQuery};
pub use user::{Role, User, UserClaims};
