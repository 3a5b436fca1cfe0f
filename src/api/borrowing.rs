//! Book borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        borrowing::{
            BorrowingQuery, BorrowingRequestDetails, BorrowingResponse, CreateBorrowingRequest,
            Decision, MonthlyCountResponse,
        },
        pagination::{BorrowingPage, Page, PageQuery},
        user::Role,
    },
};

use super::AuthenticatedUser;

/// List all borrowing requests (admin)
#[utoipa::path(
    get,
    path = "/book-borrowing",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowing requests, most recent first", body = BorrowingPage),
        (status = 403, description = "Admin only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Page<BorrowingRequestDetails>>> {
    claims.require_admin()?;

    let page = state.services.borrowing.list(&query).await?;
    Ok(Json(page))
}

/// List the current user's borrowing requests
#[utoipa::path(
    get,
    path = "/book-borrowing/my-requests",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "The caller's requests", body = BorrowingPage),
        (status = 403, description = "Readers only", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<BorrowingRequestDetails>>> {
    claims.require_role(Role::User)?;

    let requests = state
        .services
        .borrowing
        .list_for_user(claims.user_id, page)
        .await?;
    Ok(Json(requests))
}

/// Request one or more books
#[utoipa::path(
    post,
    path = "/book-borrowing",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowingRequest,
    responses(
        (status = 200, description = "Request created and copies reserved", body = BorrowingResponse),
        (status = 400, description = "Quota reached, invalid book list or book unavailable", body = crate::error::ErrorResponse),
        (status = 403, description = "Readers only", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowingRequest>,
) -> AppResult<Json<BorrowingResponse>> {
    claims.require_role(Role::User)?;

    let created = state
        .services
        .borrowing
        .create(claims.user_id, &request.book_ids)
        .await?;
    Ok(Json(created))
}

/// Approve a waiting request
#[utoipa::path(
    put,
    path = "/book-borrowing/{id}/approve",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    responses(
        (status = 200, description = "Request approved", body = BorrowingResponse),
        (status = 400, description = "Request already decided", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowingResponse>> {
    claims.require_admin()?;

    let decided = state
        .services
        .borrowing
        .decide(id, Decision::Approve, claims.user_id)
        .await?;
    Ok(Json(decided))
}

/// Reject a waiting request and return its copies
#[utoipa::path(
    put,
    path = "/book-borrowing/{id}/reject",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    responses(
        (status = 200, description = "Request rejected", body = BorrowingResponse),
        (status = 400, description = "Request already decided", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowingResponse>> {
    claims.require_admin()?;

    let decided = state
        .services
        .borrowing
        .decide(id, Decision::Reject, claims.user_id)
        .await?;
    Ok(Json(decided))
}

/// Count the current user's requests this month
#[utoipa::path(
    get,
    path = "/book-borrowing/monthly-count",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Non-rejected requests this calendar month", body = MonthlyCountResponse),
        (status = 403, description = "Readers only", body = crate::error::ErrorResponse)
    )
)]
pub async fn monthly_count(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MonthlyCountResponse>> {
    claims.require_role(Role::User)?;

    let count = state.services.borrowing.monthly_count(claims.user_id).await?;
    Ok(Json(count))
}
