//! Books repository for database operations

use std::collections::HashMap;

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookRequest},
        pagination::PageQuery,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books by title substring and category, newest publication first
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = PageQuery::new(query.page_index, query.page_size);
        let title = query
            .book_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::TEXT IS NULL OR title ILIKE '%' || $1 || '%')
              AND ($2::UUID IS NULL OR category_id = $2)
            "#,
        )
        .bind(title)
        .bind(query.category_id)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::TEXT IS NULL OR title ILIKE '%' || $1 || '%')
              AND ($2::UUID IS NULL OR category_id = $2)
            ORDER BY publish_date DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(title)
        .bind(query.category_id)
        .bind(page.size())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found", id)))
    }

    /// Titles of the given books; unknown ids are absent from the map
    pub async fn titles(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, title FROM books WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn create(&self, book: &BookRequest) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, author, publish_date, isbn, quantity, available_quantity, description, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.publish_date)
        .bind(&book.isbn)
        .bind(book.quantity)
        .bind(book.available_quantity)
        .bind(&book.description)
        .bind(book.category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn update(&self, id: Uuid, book: &BookRequest) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = $2, author = $3, publish_date = $4, isbn = $5,
                quantity = $6, available_quantity = $7, description = $8, category_id = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.publish_date)
        .bind(&book.isbn)
        .bind(book.quantity)
        .bind(book.available_quantity)
        .bind(&book.description)
        .bind(book.category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found", id)))
    }

    /// Delete a book with every copy on the shelf. The row is locked while
    /// checking so a concurrent borrowing request cannot slip in between.
    pub async fn delete_if_all_available(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found", id)))?;

        if book.has_copies_out() {
            return Err(AppError::BusinessRule(
                "Cannot delete book because some copies are currently borrowed".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
