//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, services::stats::Statistics};

use super::AuthenticatedUser;

/// Get catalog and membership totals
#[utoipa::path(
    get,
    path = "/statistics",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Totals", body = Statistics),
        (status = 403, description = "Admin only", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_statistics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Statistics>> {
    claims.require_admin()?;

    let stats = state.services.stats.get_statistics().await?;
    Ok(Json(stats))
}
