//! In-memory borrowing store.
//!
//! Transactions run one at a time: `begin` takes an owned lock on the whole
//! state and works on a copy, which replaces the state on commit.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{BorrowingStore, BorrowingTransaction, InventoryLedger, RequestStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{BorrowingRequest, BorrowingStatus},
    },
};

#[derive(Debug, Clone, Default)]
struct LibraryState {
    users: HashSet<Uuid>,
    books: HashMap<Uuid, Book>,
    requests: HashMap<Uuid, BorrowingRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBorrowingStore {
    state: Arc<Mutex<LibraryState>>,
}

impl InMemoryBorrowingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user_id: Uuid) {
        self.state.lock().await.users.insert(user_id);
    }

    pub async fn insert_book(&self, book: Book) {
        self.state.lock().await.books.insert(book.id, book);
    }

    pub async fn remove_book(&self, book_id: Uuid) -> Option<Book> {
        self.state.lock().await.books.remove(&book_id)
    }

    pub async fn book(&self, book_id: Uuid) -> Option<Book> {
        self.state.lock().await.books.get(&book_id).cloned()
    }

    pub async fn request(&self, request_id: Uuid) -> Option<BorrowingRequest> {
        self.state.lock().await.requests.get(&request_id).cloned()
    }

    pub async fn requests(&self) -> Vec<BorrowingRequest> {
        self.state.lock().await.requests.values().cloned().collect()
    }
}

#[async_trait]
impl BorrowingStore for InMemoryBorrowingStore {
    async fn begin(&self) -> AppResult<Box<dyn BorrowingTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<LibraryState>,
    staged: LibraryState,
}

impl InMemoryTransaction {
    fn book_mut(&mut self, book_id: Uuid) -> AppResult<&mut Book> {
        self.staged
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found", book_id)))
    }
}

#[async_trait]
impl InventoryLedger for InMemoryTransaction {
    async fn lock_books(&mut self, _book_ids: &[Uuid]) -> AppResult<()> {
        // The whole state is already held
        Ok(())
    }

    async fn get_book(&mut self, book_id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.staged.books.get(&book_id).cloned())
    }

    async fn decrement_available(&mut self, book_id: Uuid) -> AppResult<()> {
        let book = self.book_mut(book_id)?;
        if book.available_quantity <= 0 {
            return Err(AppError::Internal(format!(
                "available quantity of book {} would become negative",
                book_id
            )));
        }
        book.available_quantity -= 1;
        Ok(())
    }

    async fn increment_available(&mut self, book_id: Uuid) -> AppResult<()> {
        self.book_mut(book_id)?.available_quantity += 1;
        Ok(())
    }
}

#[async_trait]
impl RequestStore for InMemoryTransaction {
    async fn user_exists(&mut self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.staged.users.contains(&user_id))
    }

    async fn lock_user(&mut self, user_id: Uuid) -> AppResult<bool> {
        self.user_exists(user_id).await
    }

    async fn count_active_requests_between(
        &mut self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count = self
            .staged
            .requests
            .values()
            .filter(|r| r.requestor_id == user_id)
            .filter(|r| r.status != BorrowingStatus::Rejected)
            .filter(|r| r.request_date >= from && r.request_date < to)
            .count();
        Ok(count as i64)
    }

    async fn get_request_for_update(&mut self, request_id: Uuid) -> AppResult<Option<BorrowingRequest>> {
        Ok(self.staged.requests.get(&request_id).cloned())
    }

    async fn insert_request(&mut self, request: &BorrowingRequest) -> AppResult<()> {
        if self.staged.requests.contains_key(&request.id) {
            return Err(AppError::Conflict(format!(
                "Borrowing request {} already exists",
                request.id
            )));
        }
        self.staged.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn update_decision(&mut self, request: &BorrowingRequest) -> AppResult<()> {
        let stored = self
            .staged
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing request {} not found", request.id)))?;
        stored.status = request.status;
        stored.approver_id = request.approver_id;
        Ok(())
    }
}

#[async_trait]
impl BorrowingTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
