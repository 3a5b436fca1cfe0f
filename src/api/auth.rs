//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        token::{LoginRequest, RefreshTokenRequest, TokenResponse},
        user::{RegisterUser, UserProfile},
    },
};

use super::AuthenticatedUser;

/// Register a reader account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Invalid registration data", body = crate::error::ErrorResponse),
        (status = 409, description = "Username or email already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    request.validate()?;

    let profile = state.services.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Authenticate with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    request.validate()?;

    let tokens = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid, expired, revoked or used token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<crate::AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    request.validate()?;

    let tokens = state.services.auth.refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Unknown token", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<StatusCode> {
    request.validate()?;

    state.services.auth.logout(&request.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserProfile>> {
    let profile = state.services.auth.profile(claims.user_id).await?;
    Ok(Json(profile))
}
