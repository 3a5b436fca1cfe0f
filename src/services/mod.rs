//! Business logic services

pub mod auth;
pub mod borrowing;
pub mod catalog;
pub mod stats;

use crate::{borrowing::BorrowingWorkflow, config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub borrowing: borrowing::BorrowingService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, workflow: BorrowingWorkflow) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            borrowing: borrowing::BorrowingService::new(repository.clone(), workflow),
            stats: stats::StatsService::new(repository),
        }
    }
}
