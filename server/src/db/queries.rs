//! User queries over `PostgreSQL`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::models::{OauthProvider, User};
use crate::domain::{RepoError, UserRepo};

/// sqlx-backed implementation of the user persistence contract.
#[derive(Debug, Clone)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn get_by_external_id(
        &self,
        provider: OauthProvider,
        external_id: &str,
    ) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, provider, external_id, email, token, first_name, last_name
             FROM users WHERE provider = $1 AND external_id = $2",
        )
        .bind(provider)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn create(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO users (id, created_at, updated_at, provider, external_id, email, token, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.provider)
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.token)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE users
             SET updated_at = $2, email = $3, token = $4, first_name = $5, last_name = $6
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(Utc::now())
        .bind(&user.email)
        .bind(&user.token)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
