//! Borrowing-request lifecycle and inventory consistency.
//!
//! A request reserves one copy per line as soon as it is created. Approval
//! keeps the reservation as a loan, rejection gives the copies back. Every
//! operation runs inside one [`BorrowingTransaction`]: either all of its book
//! and request changes are committed together, or none are.
//!
//! Stores must serialise concurrent operations touching the same rows. The
//! Postgres store does it with row locks taken through
//! [`RequestStore::lock_user`], [`InventoryLedger::lock_books`] and
//! [`RequestStore::get_request_for_update`]; the in-memory store runs one
//! transaction at a time.

pub mod memory;
pub mod policy;
pub mod workflow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{book::Book, borrowing::BorrowingRequest},
};

pub use memory::InMemoryBorrowingStore;
pub use policy::QuotaPolicy;
pub use workflow::{BorrowingWorkflow, WorkflowSettings};

/// Book availability as seen from inside a transaction
#[async_trait]
pub trait InventoryLedger: Send {
    /// Lock the given books until the transaction ends. Callers pass ids
    /// sorted and deduplicated so that concurrent transactions lock in the
    /// same order.
    async fn lock_books(&mut self, book_ids: &[Uuid]) -> AppResult<()>;

    async fn get_book(&mut self, book_id: Uuid) -> AppResult<Option<Book>>;

    /// Take one copy out of the available pool. The caller has checked
    /// that at least one copy is available.
    async fn decrement_available(&mut self, book_id: Uuid) -> AppResult<()>;

    /// Put one copy back into the available pool
    async fn increment_available(&mut self, book_id: Uuid) -> AppResult<()>;
}

/// Borrowing requests and the accounts they reference
#[async_trait]
pub trait RequestStore: Send {
    async fn user_exists(&mut self, user_id: Uuid) -> AppResult<bool>;

    /// Lock the user's row until the transaction ends. Returns false when
    /// the user does not exist.
    async fn lock_user(&mut self, user_id: Uuid) -> AppResult<bool>;

    /// Count the user's non-rejected requests with `from <= request_date < to`
    async fn count_active_requests_between(
        &mut self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64>;

    /// Load a request with its lines, locked until the transaction ends
    async fn get_request_for_update(&mut self, request_id: Uuid) -> AppResult<Option<BorrowingRequest>>;

    async fn insert_request(&mut self, request: &BorrowingRequest) -> AppResult<()>;

    /// Persist a decision (status and approver)
    async fn update_decision(&mut self, request: &BorrowingRequest) -> AppResult<()>;
}

/// Unit of work over the ledger and the request store. Dropping it without
/// calling [`commit`](BorrowingTransaction::commit) discards every change.
#[async_trait]
pub trait BorrowingTransaction: InventoryLedger + RequestStore {
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait BorrowingStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn BorrowingTransaction>>;
}

/// Source of "now" for request dates and quota windows
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
