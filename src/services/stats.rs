//! Statistics service

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::user::Role, repository::Repository};

/// Catalog and membership totals
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    pub total_books: i64,
    pub total_categories: i64,
    /// Reader accounts only; administrators are not counted
    pub total_users: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_statistics(&self) -> AppResult<Statistics> {
        let (total_books, total_categories, total_users) = tokio::try_join!(
            self.repository.books.count(),
            self.repository.categories.count(),
            self.repository.users.count_by_role(Role::User),
        )?;

        Ok(Statistics {
            total_books,
            total_categories,
            total_users,
        })
    }
}
