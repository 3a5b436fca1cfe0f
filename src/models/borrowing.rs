//! Borrowing request model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::user::UserSummary;

/// Borrowing request status. `Waiting` is the only initial state; the other
/// two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Waiting,
    Approved,
    Rejected,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Waiting => "waiting",
            BorrowingStatus::Approved => "approved",
            BorrowingStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            BorrowingStatus::Waiting => false,
            BorrowingStatus::Approved | BorrowingStatus::Rejected => true,
        }
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BorrowingStatus::Waiting => "Waiting",
            BorrowingStatus::Approved => "Approved",
            BorrowingStatus::Rejected => "Rejected",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(BorrowingStatus::Waiting),
            "approved" => Ok(BorrowingStatus::Approved),
            "rejected" => Ok(BorrowingStatus::Rejected),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<Postgres> for BorrowingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Outcome an administrator can give to a waiting request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for BorrowingStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => BorrowingStatus::Approved,
            Decision::Reject => BorrowingStatus::Rejected,
        }
    }
}

/// One book reference inside a borrowing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub id: Uuid,
    pub request_id: Uuid,
    pub book_id: Uuid,
}

/// Borrowing request aggregate (request row plus its lines)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowingRequest {
    pub id: Uuid,
    pub request_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub status: BorrowingStatus,
    pub requestor_id: Uuid,
    pub approver_id: Uuid,
    pub lines: Vec<RequestLine>,
}

impl BorrowingRequest {
    /// Build a new waiting request with one line per submitted book id, in
    /// submission order.
    pub fn new_waiting(
        requestor_id: Uuid,
        approver_id: Uuid,
        book_ids: &[Uuid],
        now: DateTime<Utc>,
        loan_period: Duration,
    ) -> Self {
        let id = Uuid::new_v4();
        let lines = book_ids
            .iter()
            .map(|&book_id| RequestLine {
                id: Uuid::new_v4(),
                request_id: id,
                book_id,
            })
            .collect();

        Self {
            id,
            request_date: now,
            expiration_date: now + loan_period,
            status: BorrowingStatus::Waiting,
            requestor_id,
            approver_id,
            lines,
        }
    }
}

/// Create borrowing request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowingRequest {
    /// Books to borrow (1 to 5 ids; duplicates each reserve one copy)
    pub book_ids: Vec<Uuid>,
}

/// Admin listing filter
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    pub status: Option<BorrowingStatus>,
    pub page_index: Option<i64>,
    pub page_size: Option<i64>,
}

/// Book line as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingLineDetails {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: Option<String>,
}

/// Borrowing request with requestor and book titles, for listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingRequestDetails {
    pub id: Uuid,
    pub request_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub status: BorrowingStatus,
    pub requestor: Option<UserSummary>,
    pub books: Vec<BorrowingLineDetails>,
}

/// Response to create / approve / reject
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingResponse {
    pub id: Uuid,
    pub request_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub status: BorrowingStatus,
    pub books: Vec<BorrowingLineDetails>,
}

/// Monthly quota usage for the current user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyCountResponse {
    pub count: i64,
    pub limit: i64,
}
