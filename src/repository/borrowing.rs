//! Borrowing requests: transactional store for the workflow and read-side
//! listings

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    borrowing::{BorrowingStore, BorrowingTransaction, InventoryLedger, RequestStore},
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{
            BorrowingLineDetails, BorrowingRequest, BorrowingRequestDetails, BorrowingStatus,
            RequestLine,
        },
        pagination::PageQuery,
        user::UserSummary,
    },
};

/// Postgres-backed [`BorrowingStore`]: one database transaction per unit of work
#[derive(Clone)]
pub struct PgBorrowingStore {
    pool: Pool<Postgres>,
}

impl PgBorrowingStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowingStore for PgBorrowingStore {
    async fn begin(&self) -> AppResult<Box<dyn BorrowingTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBorrowingTransaction { tx }))
    }
}

/// Rolled back on drop unless committed
pub struct PgBorrowingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[derive(FromRow)]
struct RequestRow {
    id: Uuid,
    request_date: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
    status: BorrowingStatus,
    requestor_id: Uuid,
    approver_id: Uuid,
}

#[async_trait]
impl InventoryLedger for PgBorrowingTransaction {
    async fn lock_books(&mut self, book_ids: &[Uuid]) -> AppResult<()> {
        if book_ids.is_empty() {
            return Ok(());
        }

        sqlx::query("SELECT id FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(book_ids)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn get_book(&mut self, book_id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(book)
    }

    async fn decrement_available(&mut self, book_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE books SET available_quantity = available_quantity - 1 WHERE id = $1",
        )
        .bind(book_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with ID {} not found", book_id)));
        }
        Ok(())
    }

    async fn increment_available(&mut self, book_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE books SET available_quantity = available_quantity + 1 WHERE id = $1",
        )
        .bind(book_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with ID {} not found", book_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestStore for PgBorrowingTransaction {
    async fn user_exists(&mut self, user_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn lock_user(&mut self, user_id: Uuid) -> AppResult<bool> {
        // NO KEY UPDATE leaves foreign key checks from other tables unblocked
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR NO KEY UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(locked.is_some())
    }

    async fn count_active_requests_between(
        &mut self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrowing_requests
            WHERE requestor_id = $1
              AND status <> $2
              AND request_date >= $3
              AND request_date < $4
            "#,
        )
        .bind(user_id)
        .bind(BorrowingStatus::Rejected)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn get_request_for_update(&mut self, request_id: Uuid) -> AppResult<Option<BorrowingRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, request_date, expiration_date, status, requestor_id, approver_id
            FROM borrowing_requests
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT id, book_id FROM borrowing_request_lines WHERE request_id = $1 ORDER BY position",
        )
        .bind(request_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(BorrowingRequest {
            id: row.id,
            request_date: row.request_date,
            expiration_date: row.expiration_date,
            status: row.status,
            requestor_id: row.requestor_id,
            approver_id: row.approver_id,
            lines: lines
                .into_iter()
                .map(|(id, book_id)| RequestLine {
                    id,
                    request_id,
                    book_id,
                })
                .collect(),
        }))
    }

    async fn insert_request(&mut self, request: &BorrowingRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO borrowing_requests (id, request_date, expiration_date, status, requestor_id, approver_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(request.id)
        .bind(request.request_date)
        .bind(request.expiration_date)
        .bind(request.status)
        .bind(request.requestor_id)
        .bind(request.approver_id)
        .execute(&mut *self.tx)
        .await?;

        for (position, line) in request.lines.iter().enumerate() {
            let position = i16::try_from(position).map_err(|_| {
                AppError::Internal(format!("Too many lines in borrowing request {}", request.id))
            })?;
            sqlx::query(
                "INSERT INTO borrowing_request_lines (id, request_id, book_id, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(line.id)
            .bind(request.id)
            .bind(line.book_id)
            .bind(position)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn update_decision(&mut self, request: &BorrowingRequest) -> AppResult<()> {
        sqlx::query("UPDATE borrowing_requests SET status = $2, approver_id = $3 WHERE id = $1")
            .bind(request.id)
            .bind(request.status)
            .bind(request.approver_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl BorrowingTransaction for PgBorrowingTransaction {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Read-side queries over borrowing requests
#[derive(Clone)]
pub struct BorrowingRepository {
    pool: Pool<Postgres>,
}

impl BorrowingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List requests, most recent first, optionally filtered by status and
    /// requestor
    pub async fn list(
        &self,
        status: Option<BorrowingStatus>,
        requestor_id: Option<Uuid>,
        page: PageQuery,
    ) -> AppResult<(Vec<BorrowingRequestDetails>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrowing_requests
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR requestor_id = $2)
            "#,
        )
        .bind(status)
        .bind(requestor_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.request_date, r.expiration_date, r.status, r.requestor_id,
                   u.name AS requestor_name, u.email AS requestor_email,
                   u.phone_number AS requestor_phone_number
            FROM borrowing_requests r
            LEFT JOIN users u ON u.id = r.requestor_id
            WHERE ($1::TEXT IS NULL OR r.status = $1)
              AND ($2::UUID IS NULL OR r.requestor_id = $2)
            ORDER BY r.request_date DESC, r.id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(status)
        .bind(requestor_id)
        .bind(page.size())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let request_ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
        let mut lines = self.lines_for(&request_ids).await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            let requestor_name: Option<String> = row.get("requestor_name");

            result.push(BorrowingRequestDetails {
                id,
                request_date: row.get("request_date"),
                expiration_date: row.get("expiration_date"),
                status: row.get("status"),
                requestor: requestor_name.map(|name| UserSummary {
                    id: row.get("requestor_id"),
                    name,
                    email: row.get("requestor_email"),
                    phone_number: row.get("requestor_phone_number"),
                }),
                books: lines.remove(&id).unwrap_or_default(),
            });
        }

        Ok((result, total))
    }

    /// Lines with book titles, grouped by request and kept in submission order
    async fn lines_for(
        &self,
        request_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<BorrowingLineDetails>>> {
        if request_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT l.id, l.request_id, l.book_id, b.title AS book_title
            FROM borrowing_request_lines l
            LEFT JOIN books b ON b.id = l.book_id
            WHERE l.request_id = ANY($1)
            ORDER BY l.request_id, l.position
            "#,
        )
        .bind(request_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<BorrowingLineDetails>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.get("request_id"))
                .or_default()
                .push(BorrowingLineDetails {
                    id: row.get("id"),
                    book_id: row.get("book_id"),
                    book_title: row.get("book_title"),
                });
        }

        Ok(grouped)
    }
}
