//! Library Lending Server
//!
//! REST JSON API for a library catalog (books, categories), reader accounts,
//! and the book-borrowing workflow that keeps per-book availability
//! consistent with outstanding requests.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub mod api;
pub mod borrowing;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub pool: Pool<Postgres>,
}
