//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// OAuth provider discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "oauth_provider", rename_all = "lowercase")]
pub enum OauthProvider {
    Vk,
}

/// Local record of an authenticated end user.
///
/// `(provider, external_id)` uniquely identifies at most one row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub provider: OauthProvider,
    /// Provider-side user id.
    pub external_id: String,
    pub email: String,
    /// Access token from the most recent exchange.
    pub token: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Build a fresh record for a first-time authentication.
    pub fn new(provider: OauthProvider, external_id: String, email: String, token: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            provider,
            external_id,
            email,
            token,
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}
