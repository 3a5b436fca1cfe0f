//! Categories repository for database operations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{Category, CategoryRequest},
        pagination::PageQuery,
    },
};

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List categories ordered by name, with total count
    pub async fn list(&self, page: PageQuery) -> AppResult<(Vec<Category>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY name, id LIMIT $1 OFFSET $2",
        )
        .bind(page.size())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((categories, total))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with ID {} not found", id)))
    }

    pub async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn create(&self, category: &CategoryRequest) -> AppResult<Category> {
        let created = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn update(&self, id: Uuid, category: &CategoryRequest) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, description = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category with ID {} not found", id)))
    }

    /// Delete a category that has no books. Returns a business-rule error
    /// otherwise; the check and the delete run in one transaction.
    pub async fn delete_if_empty(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Category with ID {} not found", id)));
        }

        let has_books: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE category_id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if has_books {
            return Err(AppError::BusinessRule(
                "Cannot delete category because it has associated books".to_string(),
            ));
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
