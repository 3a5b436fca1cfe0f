//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrowing, categories, health, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Lending API",
        version = "1.0.0",
        description = "Library catalog and book borrowing REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::refresh_token,
        auth::logout,
        auth::me,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrowing
        borrowing::list_requests,
        borrowing::my_requests,
        borrowing::create_request,
        borrowing::approve_request,
        borrowing::reject_request,
        borrowing::monthly_count,
        // Stats
        stats::get_statistics,
    ),
    components(
        schemas(
            // Auth
            crate::models::token::LoginRequest,
            crate::models::token::RefreshTokenRequest,
            crate::models::token::TokenResponse,
            crate::models::user::RegisterUser,
            crate::models::user::UserProfile,
            crate::models::user::UserSummary,
            crate::models::user::Role,
            // Catalog
            crate::models::book::Book,
            crate::models::book::BookRequest,
            crate::models::category::Category,
            crate::models::category::CategoryRequest,
            crate::models::pagination::BookPage,
            crate::models::pagination::CategoryPage,
            // Borrowing
            crate::models::borrowing::BorrowingStatus,
            crate::models::borrowing::CreateBorrowingRequest,
            crate::models::borrowing::BorrowingLineDetails,
            crate::models::borrowing::BorrowingRequestDetails,
            crate::models::borrowing::BorrowingResponse,
            crate::models::borrowing::MonthlyCountResponse,
            crate::models::pagination::BorrowingPage,
            // Stats
            crate::services::stats::Statistics,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "categories", description = "Book categories"),
        (name = "books", description = "Book catalog"),
        (name = "borrowing", description = "Book borrowing requests"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
