//! Persistence contract for user records.
//!
//! The store is an external collaborator with its own concurrency safety;
//! the core holds a user only for the lifetime of a single request.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::{OauthProvider, User};

/// Persistence failures.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No user matched. Expected during reconciliation; drives the
    /// create-vs-update branch and is never logged as a failure.
    #[error("no such user")]
    NotFound,

    /// Unexpected store failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// CRUD contract over user records, keyed by `(provider, external_id)`.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_external_id(
        &self,
        provider: OauthProvider,
        external_id: &str,
    ) -> Result<User, RepoError>;

    async fn create(&self, user: &User) -> Result<(), RepoError>;

    async fn update(&self, user: &User) -> Result<(), RepoError>;
}
