//! Create / approve / reject operations over a [`BorrowingStore`]

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use super::{
    policy::{month_bounds, QuotaPolicy},
    BorrowingStore, BorrowingTransaction, Clock,
};
use crate::{
    config::BorrowingConfig,
    error::{AppResult, BorrowingError},
    models::borrowing::{BorrowingRequest, Decision},
};

/// Workflow parameters resolved at startup
#[derive(Debug, Clone, Copy)]
pub struct WorkflowSettings {
    pub policy: QuotaPolicy,
    /// Account recorded as approver on new requests; `None` when no
    /// approver could be resolved
    pub approver_id: Option<Uuid>,
    pub loan_period: Duration,
}

impl WorkflowSettings {
    pub fn from_config(config: &BorrowingConfig, approver_id: Option<Uuid>) -> Self {
        Self {
            policy: QuotaPolicy::from(config),
            approver_id,
            loan_period: Duration::days(config.loan_period_days),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&BorrowingConfig::default(), None)
    }
}

#[derive(Clone)]
pub struct BorrowingWorkflow {
    store: Arc<dyn BorrowingStore>,
    clock: Arc<dyn Clock>,
    settings: WorkflowSettings,
}

impl BorrowingWorkflow {
    pub fn new(store: Arc<dyn BorrowingStore>, clock: Arc<dyn Clock>, settings: WorkflowSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.settings.policy
    }

    /// Create a waiting request and reserve one copy per line.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// unknown user, monthly quota, too many books, no books, then each book
    /// in submission order (unknown, no copy left), then the approver.
    /// Nothing is persisted unless every check passes.
    pub async fn create_request(
        &self,
        requestor_id: Uuid,
        book_ids: &[Uuid],
    ) -> AppResult<BorrowingRequest> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        // Serialises concurrent creations by the same user so the quota
        // count below cannot be raced
        if !tx.lock_user(requestor_id).await? {
            return Err(BorrowingError::UserNotFound(requestor_id).into());
        }

        let (month_start, next_month_start) = month_bounds(now);
        let monthly_count = tx
            .count_active_requests_between(requestor_id, month_start, next_month_start)
            .await?;
        self.settings
            .policy
            .validate_new_request(monthly_count, book_ids)?;

        tx.lock_books(&lock_order(book_ids.iter().copied())).await?;

        // A duplicated id sees the copy taken by its earlier line
        for &book_id in book_ids {
            let book = tx
                .get_book(book_id)
                .await?
                .ok_or(BorrowingError::BookNotFound(book_id))?;

            if book.available_quantity <= 0 {
                return Err(BorrowingError::BookUnavailable(book_id).into());
            }

            tx.decrement_available(book_id).await?;
        }

        let approver_id = self.resolve_approver(tx.as_mut()).await?;

        let request = BorrowingRequest::new_waiting(
            requestor_id,
            approver_id,
            book_ids,
            now,
            self.settings.loan_period,
        );
        tx.insert_request(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            requestor_id = %requestor_id,
            books = request.lines.len(),
            "Borrowing request created"
        );

        Ok(request)
    }

    /// Move a waiting request to approved or rejected. Rejection returns one
    /// copy per line to the available pool; approval leaves availability
    /// unchanged. The acting administrator is recorded as approver.
    pub async fn decide_request(
        &self,
        request_id: Uuid,
        decision: Decision,
        acting_user_id: Uuid,
    ) -> AppResult<BorrowingRequest> {
        let mut tx = self.store.begin().await?;

        let mut request = tx
            .get_request_for_update(request_id)
            .await?
            .ok_or(BorrowingError::RequestNotFound(request_id))?;

        if request.status.is_terminal() {
            return Err(BorrowingError::InvalidTransition(request.status).into());
        }

        if decision == Decision::Reject {
            tx.lock_books(&lock_order(request.lines.iter().map(|l| l.book_id)))
                .await?;

            for line in &request.lines {
                if tx.get_book(line.book_id).await?.is_none() {
                    return Err(BorrowingError::BookNotFound(line.book_id).into());
                }
                tx.increment_available(line.book_id).await?;
            }
        }

        request.status = decision.into();
        request.approver_id = acting_user_id;
        tx.update_decision(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            approver_id = %acting_user_id,
            status = %request.status,
            "Borrowing request decided"
        );

        Ok(request)
    }

    /// Number of the user's non-rejected requests dated in the current
    /// calendar month (UTC)
    pub async fn count_active_requests_this_month(&self, user_id: Uuid) -> AppResult<i64> {
        let mut tx = self.store.begin().await?;

        if !tx.user_exists(user_id).await? {
            return Err(BorrowingError::UserNotFound(user_id).into());
        }

        let (month_start, next_month_start) = month_bounds(self.clock.now());
        tx.count_active_requests_between(user_id, month_start, next_month_start)
            .await
    }

    async fn resolve_approver(&self, tx: &mut dyn BorrowingTransaction) -> AppResult<Uuid> {
        let Some(approver_id) = self.settings.approver_id else {
            return Err(BorrowingError::AdminNotConfigured.into());
        };

        if !tx.user_exists(approver_id).await? {
            return Err(BorrowingError::AdminNotConfigured.into());
        }

        Ok(approver_id)
    }
}

/// Sorted, deduplicated ids so every transaction locks books in the same order
fn lock_order(book_ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = book_ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        borrowing::{memory::InMemoryBorrowingStore, MockClock, SystemClock},
        error::AppError,
        models::{book::Book, borrowing::BorrowingStatus},
    };
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        store: InMemoryBorrowingStore,
        workflow: BorrowingWorkflow,
        admin: Uuid,
        user: Uuid,
    }

    fn book(title: &str, quantity: i32) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author: "Author".to_string(),
            publish_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            isbn: Some("9780000000000".to_string()),
            quantity,
            available_quantity: quantity,
            description: None,
            category_id: Uuid::new_v4(),
        }
    }

    async fn fixture_with_clock(clock: Arc<dyn Clock>) -> Fixture {
        let store = InMemoryBorrowingStore::new();
        let admin = Uuid::new_v4();
        let user = Uuid::new_v4();
        store.insert_user(admin).await;
        store.insert_user(user).await;

        let settings = WorkflowSettings {
            approver_id: Some(admin),
            ..WorkflowSettings::default()
        };
        let workflow = BorrowingWorkflow::new(Arc::new(store.clone()), clock, settings);

        Fixture {
            store,
            workflow,
            admin,
            user,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_clock(Arc::new(SystemClock)).await
    }

    fn fixed_clock(now: DateTime<Utc>) -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);
        Arc::new(clock)
    }

    async fn available(store: &InMemoryBorrowingStore, id: Uuid) -> i32 {
        store.book(id).await.unwrap().available_quantity
    }

    fn borrowing_error(err: AppError) -> BorrowingError {
        match err {
            AppError::Borrowing(e) => e,
            other => panic!("expected a borrowing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_reserves_copies_and_waits_for_approval() {
        let f = fixture().await;
        let a = book("A", 2);
        let b = book("B", 1);
        f.store.insert_book(a.clone()).await;
        f.store.insert_book(b.clone()).await;

        let request = assert_ok!(f.workflow.create_request(f.user, &[a.id, b.id]).await);

        assert_eq!(request.status, BorrowingStatus::Waiting);
        assert_eq!(request.approver_id, f.admin);
        assert_eq!(request.expiration_date - request.request_date, Duration::days(30));
        assert_eq!(available(&f.store, a.id).await, 1);
        assert_eq!(available(&f.store, b.id).await, 0);
        assert_eq!(f.store.request(request.id).await, Some(request));
    }

    #[tokio::test]
    async fn reject_returns_copies_and_approve_keeps_them() {
        let f = fixture().await;
        let a = book("A", 2);
        let b = book("B", 1);
        f.store.insert_book(a.clone()).await;
        f.store.insert_book(b.clone()).await;

        let first = f.workflow.create_request(f.user, &[a.id, b.id]).await.unwrap();
        let rejected = assert_ok!(
            f.workflow
                .decide_request(first.id, Decision::Reject, f.admin)
                .await
        );
        assert_eq!(rejected.status, BorrowingStatus::Rejected);
        assert_eq!(available(&f.store, a.id).await, 2);
        assert_eq!(available(&f.store, b.id).await, 1);

        let second = f.workflow.create_request(f.user, &[b.id]).await.unwrap();
        let approved = assert_ok!(
            f.workflow
                .decide_request(second.id, Decision::Approve, f.admin)
                .await
        );
        assert_eq!(approved.status, BorrowingStatus::Approved);
        assert_eq!(available(&f.store, b.id).await, 0);
    }

    #[tokio::test]
    async fn last_copy_goes_to_one_request_only() {
        let f = fixture().await;
        let other = Uuid::new_v4();
        f.store.insert_user(other).await;
        let b = book("B", 1);
        f.store.insert_book(b.clone()).await;

        assert_ok!(f.workflow.create_request(f.user, &[b.id]).await);
        let err = assert_err!(f.workflow.create_request(other, &[b.id]).await);

        assert_eq!(borrowing_error(err), BorrowingError::BookUnavailable(b.id));
        assert_eq!(available(&f.store, b.id).await, 0);
    }

    #[tokio::test]
    async fn unknown_book_rolls_back_earlier_lines() {
        let f = fixture().await;
        let a = book("A", 3);
        f.store.insert_book(a.clone()).await;
        let missing = Uuid::new_v4();

        let err = assert_err!(f.workflow.create_request(f.user, &[a.id, missing]).await);

        assert_eq!(borrowing_error(err), BorrowingError::BookNotFound(missing));
        assert_eq!(available(&f.store, a.id).await, 3);
        assert!(f.store.requests().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_take_one_copy_each() {
        let f = fixture().await;
        let a = book("A", 2);
        f.store.insert_book(a.clone()).await;

        let request = assert_ok!(f.workflow.create_request(f.user, &[a.id, a.id]).await);
        assert_eq!(request.lines.len(), 2);
        assert_eq!(available(&f.store, a.id).await, 0);

        f.workflow
            .decide_request(request.id, Decision::Reject, f.admin)
            .await
            .unwrap();
        assert_eq!(available(&f.store, a.id).await, 2);
    }

    #[tokio::test]
    async fn duplicate_ids_beyond_stock_are_refused() {
        let f = fixture().await;
        let a = book("A", 1);
        f.store.insert_book(a.clone()).await;

        let err = assert_err!(f.workflow.create_request(f.user, &[a.id, a.id]).await);

        assert_eq!(borrowing_error(err), BorrowingError::BookUnavailable(a.id));
        assert_eq!(available(&f.store, a.id).await, 1);
    }

    #[tokio::test]
    async fn fourth_request_in_a_month_is_refused() {
        let f = fixture().await;
        let a = book("A", 10);
        f.store.insert_book(a.clone()).await;

        for _ in 0..3 {
            assert_ok!(f.workflow.create_request(f.user, &[a.id]).await);
        }
        let err = assert_err!(f.workflow.create_request(f.user, &[a.id]).await);

        assert_eq!(
            borrowing_error(err),
            BorrowingError::QuotaExceeded { limit: 3 }
        );
        assert_eq!(available(&f.store, a.id).await, 7);
        assert_eq!(
            f.workflow.count_active_requests_this_month(f.user).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn rejected_requests_free_quota() {
        let f = fixture().await;
        let a = book("A", 10);
        f.store.insert_book(a.clone()).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(f.workflow.create_request(f.user, &[a.id]).await.unwrap().id);
        }
        f.workflow
            .decide_request(ids[0], Decision::Reject, f.admin)
            .await
            .unwrap();

        assert_eq!(
            f.workflow.count_active_requests_this_month(f.user).await.unwrap(),
            2
        );
        assert_ok!(f.workflow.create_request(f.user, &[a.id]).await);
    }

    #[tokio::test]
    async fn size_checks_come_after_the_quota() {
        let f = fixture().await;
        let books: Vec<Book> = (0..6).map(|i| book(&format!("B{i}"), 1)).collect();
        for b in &books {
            f.store.insert_book(b.clone()).await;
        }
        let ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();

        let err = assert_err!(f.workflow.create_request(f.user, &ids).await);
        assert_eq!(borrowing_error(err), BorrowingError::TooManyBooks { limit: 5 });

        let err = assert_err!(f.workflow.create_request(f.user, &[]).await);
        assert_eq!(borrowing_error(err), BorrowingError::NoBooks);

        assert_ok!(f.workflow.create_request(f.user, &ids[..5]).await);
    }

    #[tokio::test]
    async fn unknown_requestor_is_refused() {
        let f = fixture().await;
        let a = book("A", 1);
        f.store.insert_book(a.clone()).await;
        let stranger = Uuid::new_v4();

        let err = assert_err!(f.workflow.create_request(stranger, &[a.id]).await);
        assert_eq!(borrowing_error(err), BorrowingError::UserNotFound(stranger));

        let err = assert_err!(f.workflow.count_active_requests_this_month(stranger).await);
        assert_eq!(borrowing_error(err), BorrowingError::UserNotFound(stranger));
    }

    #[tokio::test]
    async fn missing_approver_fails_after_book_checks() {
        let store = InMemoryBorrowingStore::new();
        let user = Uuid::new_v4();
        store.insert_user(user).await;
        let a = book("A", 1);
        store.insert_book(a.clone()).await;
        let workflow = BorrowingWorkflow::new(
            Arc::new(store.clone()),
            Arc::new(SystemClock),
            WorkflowSettings::default(),
        );

        let missing = Uuid::new_v4();
        let err = assert_err!(workflow.create_request(user, &[missing]).await);
        assert_eq!(borrowing_error(err), BorrowingError::BookNotFound(missing));

        let err = assert_err!(workflow.create_request(user, &[a.id]).await);
        assert_eq!(borrowing_error(err), BorrowingError::AdminNotConfigured);
        assert_eq!(available(&store, a.id).await, 1);
    }

    #[tokio::test]
    async fn decided_requests_cannot_be_decided_again() {
        let f = fixture().await;
        let a = book("A", 1);
        f.store.insert_book(a.clone()).await;

        let request = f.workflow.create_request(f.user, &[a.id]).await.unwrap();
        f.workflow
            .decide_request(request.id, Decision::Reject, f.admin)
            .await
            .unwrap();

        let err = assert_err!(
            f.workflow
                .decide_request(request.id, Decision::Reject, f.admin)
                .await
        );
        assert_eq!(
            borrowing_error(err),
            BorrowingError::InvalidTransition(BorrowingStatus::Rejected)
        );
        let err = assert_err!(
            f.workflow
                .decide_request(request.id, Decision::Approve, f.admin)
                .await
        );
        assert_eq!(
            borrowing_error(err),
            BorrowingError::InvalidTransition(BorrowingStatus::Rejected)
        );
        // No second refund
        assert_eq!(available(&f.store, a.id).await, 1);
    }

    #[tokio::test]
    async fn approved_requests_stay_approved() {
        let f = fixture().await;
        let a = book("A", 2);
        f.store.insert_book(a.clone()).await;

        let request = f.workflow.create_request(f.user, &[a.id]).await.unwrap();
        f.workflow
            .decide_request(request.id, Decision::Approve, f.admin)
            .await
            .unwrap();
        assert_eq!(available(&f.store, a.id).await, 1);

        let err = assert_err!(
            f.workflow
                .decide_request(request.id, Decision::Reject, f.admin)
                .await
        );
        assert_eq!(
            borrowing_error(err),
            BorrowingError::InvalidTransition(BorrowingStatus::Approved)
        );
        // An approved loan keeps its copy
        assert_eq!(available(&f.store, a.id).await, 1);
        assert_eq!(
            f.store.request(request.id).await.map(|r| r.status),
            Some(BorrowingStatus::Approved)
        );
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let f = fixture().await;
        let id = Uuid::new_v4();
        let err = assert_err!(f.workflow.decide_request(id, Decision::Approve, f.admin).await);
        assert_eq!(borrowing_error(err), BorrowingError::RequestNotFound(id));
    }

    #[tokio::test]
    async fn reject_with_deleted_book_changes_nothing() {
        let f = fixture().await;
        let a = book("A", 1);
        let b = book("B", 1);
        f.store.insert_book(a.clone()).await;
        f.store.insert_book(b.clone()).await;

        let request = f.workflow.create_request(f.user, &[a.id, b.id]).await.unwrap();
        f.store.remove_book(b.id).await;

        let err = assert_err!(
            f.workflow
                .decide_request(request.id, Decision::Reject, f.admin)
                .await
        );
        assert_eq!(borrowing_error(err), BorrowingError::BookNotFound(b.id));
        assert_eq!(available(&f.store, a.id).await, 0);
        assert_eq!(
            f.store.request(request.id).await.unwrap().status,
            BorrowingStatus::Waiting
        );
    }

    #[tokio::test]
    async fn decision_records_the_acting_admin() {
        let f = fixture().await;
        let other_admin = Uuid::new_v4();
        f.store.insert_user(other_admin).await;
        let a = book("A", 1);
        f.store.insert_book(a.clone()).await;

        let request = f.workflow.create_request(f.user, &[a.id]).await.unwrap();
        let approved = f
            .workflow
            .decide_request(request.id, Decision::Approve, other_admin)
            .await
            .unwrap();

        assert_eq!(approved.approver_id, other_admin);
        assert_eq!(f.store.request(request.id).await.unwrap().approver_id, other_admin);
    }

    #[tokio::test]
    async fn quota_window_is_the_calendar_month() {
        let end_of_january = Utc.with_ymd_and_hms(2025, 1, 31, 22, 0, 0).unwrap();
        let f = fixture_with_clock(fixed_clock(end_of_january)).await;
        let a = book("A", 10);
        f.store.insert_book(a.clone()).await;

        for _ in 0..3 {
            assert_ok!(f.workflow.create_request(f.user, &[a.id]).await);
        }
        assert_err!(f.workflow.create_request(f.user, &[a.id]).await);

        // Same store, a clock in February
        let february = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let settings = WorkflowSettings {
            approver_id: Some(f.admin),
            ..WorkflowSettings::default()
        };
        let next_month =
            BorrowingWorkflow::new(Arc::new(f.store.clone()), fixed_clock(february), settings);

        assert_eq!(
            next_month.count_active_requests_this_month(f.user).await.unwrap(),
            0
        );
        assert_ok!(next_month.create_request(f.user, &[a.id]).await);
    }

    #[tokio::test]
    async fn copies_are_conserved_across_a_mixed_history() {
        let f = fixture().await;
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for &u in &users {
            f.store.insert_user(u).await;
        }
        let books: Vec<Book> = (0..3).map(|i| book(&format!("B{i}"), 2)).collect();
        for b in &books {
            f.store.insert_book(b.clone()).await;
        }

        let mut created = Vec::new();
        for (i, &u) in users.iter().enumerate() {
            for j in 0..3 {
                let ids = [books[(i + j) % 3].id, books[(i + 2 * j) % 3].id];
                if let Ok(request) = f.workflow.create_request(u, &ids).await {
                    created.push(request.id);
                }
            }
        }
        for (n, id) in created.iter().enumerate() {
            let decision = if n % 2 == 0 { Decision::Reject } else { Decision::Approve };
            f.workflow.decide_request(*id, decision, f.admin).await.unwrap();
        }

        let requests = f.store.requests().await;
        for b in &books {
            let outstanding = requests
                .iter()
                .filter(|r| r.status != BorrowingStatus::Rejected)
                .flat_map(|r| r.lines.iter())
                .filter(|l| l.book_id == b.id)
                .count() as i32;
            let current = available(&f.store, b.id).await;
            assert!(current >= 0 && current <= b.quantity);
            assert_eq!(current + outstanding, b.quantity);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_never_oversell() {
        let f = fixture().await;
        let b = book("B", 3);
        f.store.insert_book(b.clone()).await;

        let mut users = Vec::new();
        for _ in 0..10 {
            let u = Uuid::new_v4();
            f.store.insert_user(u).await;
            users.push(u);
        }

        let handles: Vec<_> = users
            .into_iter()
            .map(|u| {
                let workflow = f.workflow.clone();
                let book_id = b.id;
                tokio::spawn(async move { workflow.create_request(u, &[book_id]).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        assert_eq!(available(&f.store, b.id).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_by_one_user_respect_the_quota() {
        let f = fixture().await;
        let b = book("B", 20);
        f.store.insert_book(b.clone()).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let workflow = f.workflow.clone();
                let (user, book_id) = (f.user, b.id);
                tokio::spawn(async move { workflow.create_request(user, &[book_id]).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        assert_eq!(available(&f.store, b.id).await, 17);
    }
}
