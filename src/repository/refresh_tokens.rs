//! Refresh tokens repository

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{error::AppResult, models::token::RefreshToken};

#[derive(Clone)]
pub struct RefreshTokensRepository {
    pool: Pool<Postgres>,
}

impl RefreshTokensRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, token_hash, user_id, expiry_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token_hash)
        .bind(user_id)
        .bind(expiry_date)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn get_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    /// Mark a token as used. Returns false if it was already used or revoked,
    /// so two concurrent refreshes cannot both succeed.
    pub async fn mark_used(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_used = TRUE WHERE id = $1 AND NOT is_used AND NOT is_revoked",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn revoke(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE refresh_tokens SET is_revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Revoke every token of the user that is still usable
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens SET is_revoked = TRUE
            WHERE user_id = $1 AND NOT is_revoked AND NOT is_used AND expiry_date > NOW()
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
