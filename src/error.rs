//! Error types for the lending server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::borrowing::BorrowingStatus;

/// Application error codes returned in the `code` field of error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoSuchCategory = 6,
    NoSuchRequest = 7,
    BookNotAvailable = 8,
    Duplicate = 9,
    MaxRequestsReached = 10,
    TooManyBooks = 11,
    NoBooks = 12,
    InvalidTransition = 13,
    ApproverNotConfigured = 14,
    BadValue = 15,
}

/// Rejections produced by the borrowing workflow.
///
/// These are ordinary outcomes of a request, reported to the caller; none of
/// them leaves partial changes behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BorrowingError {
    #[error("User with ID {0} not found")]
    UserNotFound(Uuid),

    #[error("You have reached the maximum limit of {limit} borrowing requests per month")]
    QuotaExceeded { limit: i64 },

    #[error("You can borrow a maximum of {limit} books per request")]
    TooManyBooks { limit: usize },

    #[error("You must specify at least one book to borrow")]
    NoBooks,

    #[error("Book with ID {0} not found")]
    BookNotFound(Uuid),

    #[error("Book with ID {0} is not available for borrowing")]
    BookUnavailable(Uuid),

    #[error("Approver account is not configured")]
    AdminNotConfigured,

    #[error("Borrowing request with ID {0} not found")]
    RequestNotFound(Uuid),

    #[error("Cannot update status. The borrowing request is already {0}.")]
    InvalidTransition(BorrowingStatus),
}

impl BorrowingError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            BorrowingError::UserNotFound(_) => (StatusCode::BAD_REQUEST, ErrorCode::NoSuchUser),
            BorrowingError::QuotaExceeded { .. } => {
                (StatusCode::BAD_REQUEST, ErrorCode::MaxRequestsReached)
            }
            BorrowingError::TooManyBooks { .. } => (StatusCode::BAD_REQUEST, ErrorCode::TooManyBooks),
            BorrowingError::NoBooks => (StatusCode::BAD_REQUEST, ErrorCode::NoBooks),
            BorrowingError::BookNotFound(_) => (StatusCode::BAD_REQUEST, ErrorCode::NoSuchBook),
            BorrowingError::BookUnavailable(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BookNotAvailable)
            }
            BorrowingError::AdminNotConfigured => {
                (StatusCode::BAD_REQUEST, ErrorCode::ApproverNotConfigured)
            }
            BorrowingError::RequestNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchRequest),
            BorrowingError::InvalidTransition(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidTransition)
            }
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error(transparent)]
    Borrowing(#[from] BorrowingError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_code_and_message(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::Failure, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::Failure, msg.clone())
            }
            AppError::Borrowing(e) => {
                let (status, code) = e.status_and_code();
                (status, code, e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_code_and_message();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
