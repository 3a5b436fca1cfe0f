//! Catalog management service (books and categories)

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookRequest},
        category::{Category, CategoryRequest},
        pagination::{Page, PageQuery},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Page<Book>> {
        let (books, total) = self.repository.books.search(query).await?;
        Ok(Page::new(
            books,
            total,
            PageQuery::new(query.page_index, query.page_size),
        ))
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, book: BookRequest) -> AppResult<Book> {
        check_book(&book, Utc::now().date_naive(), true)?;
        self.ensure_category(book.category_id).await?;

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = %created.id, title = %created.title, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: Uuid, book: BookRequest) -> AppResult<Book> {
        check_book(&book, Utc::now().date_naive(), false)?;
        self.ensure_category(book.category_id).await?;

        let updated = self.repository.books.update(id, &book).await?;
        tracing::info!(book_id = %id, "Book updated");
        Ok(updated)
    }

    /// Delete a book. Refused while any copy is reserved or on loan.
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.delete_if_all_available(id).await?;
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }

    pub async fn list_categories(&self, page: PageQuery) -> AppResult<Page<Category>> {
        let (categories, total) = self.repository.categories.list(page).await?;
        Ok(Page::new(categories, total, page))
    }

    pub async fn get_category(&self, id: Uuid) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(&self, category: CategoryRequest) -> AppResult<Category> {
        let created = self.repository.categories.create(&category).await?;
        tracing::info!(category_id = %created.id, name = %created.name, "Category created");
        Ok(created)
    }

    pub async fn update_category(&self, id: Uuid, category: CategoryRequest) -> AppResult<Category> {
        self.repository.categories.update(id, &category).await
    }

    /// Delete a category. Refused while it still has books.
    pub async fn delete_category(&self, id: Uuid) -> AppResult<()> {
        self.repository.categories.delete_if_empty(id).await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    async fn ensure_category(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.categories.exists(id).await? {
            return Err(AppError::NotFound(format!("Category with ID {} not found", id)));
        }
        Ok(())
    }
}

/// Field rules that the validator derive cannot express
fn check_book(book: &BookRequest, today: NaiveDate, creating: bool) -> AppResult<()> {
    if book.publish_date > today {
        return Err(AppError::Validation(
            "Publish date cannot be in the future".to_string(),
        ));
    }

    if book.available_quantity > book.quantity {
        return Err(AppError::Validation(
            "Available quantity cannot be greater than quantity".to_string(),
        ));
    }

    if creating && book.available_quantity != book.quantity {
        return Err(AppError::Validation(
            "Available quantity must equal quantity for a new book".to_string(),
        ));
    }

    Ok(())
}
