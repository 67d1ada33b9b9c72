use async_trait::async_trait;
use avia_core::TokenBlacklistRepository;
use avia_shared::RepoResult;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::rows::store_err;

pub struct PostgresTokenBlacklist {
    pool: PgPool,
}

impl PostgresTokenBlacklist {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenBlacklistRepository for PostgresTokenBlacklist {
    async fn add(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("INSERT INTO token_blacklist (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str, now: DateTime<Utc>) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM token_blacklist WHERE token = $1 AND expires_at > $2)")
            .bind(token)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn clean_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }
}
