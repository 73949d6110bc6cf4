//! Error taxonomy for the dispatch pipeline and handlers.
//!
//! Decode and routing failures are settled at the dispatcher boundary and
//! never reach a handler; everything else propagates up as a [`BotError`]
//! return value through the middleware chain.

use thiserror::Error;

use crate::domain::RepoError;

/// Errors surfaced by handlers and outbound calls.
#[derive(Debug, Error)]
pub enum BotError {
    /// Malformed inbound payload. Always answered with 400 and a fixed body.
    #[error("invalid json")]
    InvalidJson(#[source] serde_json::Error),

    /// Malformed callback context (e.g. a missing authorization code).
    #[error("malformed callback context: {0}")]
    Decode(String),

    /// An outbound call failed in transport or returned an unreadable body.
    #[error("outbound request failed: {0}")]
    Transport(#[source] anyhow::Error),

    /// The authorization server answered with an error payload.
    #[error("oauth error: {code}")]
    Oauth { code: String, description: String },

    /// Unexpected persistence failure.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// A recovered panic, converted to a normal error by the panic guard.
    #[error("internal error")]
    Internal,
}

/// Result type for handler and middleware operations.
pub type BotResult<T> = Result<T, BotError>;
