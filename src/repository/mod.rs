//! Repository layer for database operations

pub mod books;
pub mod borrowing;
pub mod categories;
pub mod refresh_tokens;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub categories: categories::CategoriesRepository,
    pub books: books::BooksRepository,
    pub borrowing: borrowing::BorrowingRepository,
    pub refresh_tokens: refresh_tokens::RefreshTokensRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            borrowing: borrowing::BorrowingRepository::new(pool.clone()),
            refresh_tokens: refresh_tokens::RefreshTokensRepository::new(pool.clone()),
            pool,
        }
    }

    /// Transactional store used by the borrowing workflow
    pub fn borrowing_store(&self) -> borrowing::PgBorrowingStore {
        borrowing::PgBorrowingStore::new(self.pool.clone())
    }
}
