//! Response-caching middleware.
//!
//! Caches the exact bytes a handler wrote, keyed by sender id and message
//! text, with lazy TTL expiry enforced by the store. Cache-store failures are
//! never allowed to block or fail a request: a read failure falls through to
//! the handler, a write failure is logged and ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fred::prelude::{Expiration, KeysInterface};
use tracing::warn;

use super::{Middleware, Next};
use crate::config::CacheConfig;
use crate::domain::{Event, ResponseWriter};
use crate::errors::BotResult;

/// TTL cache store contract.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// `Ok(None)` is a miss; expired entries are misses too.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, anyhow::Error>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), anyhow::Error>;
}

/// Redis-backed store.
pub struct RedisCache {
    client: fred::clients::Client,
}

impl RedisCache {
    #[must_use]
    pub const fn new(client: fred::clients::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, anyhow::Error> {
        let value: Option<Vec<u8>> = self.client.get(key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), anyhow::Error> {
        let _: () = self
            .client
            .set(
                key,
                value.to_vec(),
                Some(Expiration::EX(ttl.as_secs() as i64)),
                None,
                false,
            )
            .await?;
        Ok(())
    }
}

/// The caching middleware itself.
pub struct Cache {
    store: Arc<dyn ResponseCache>,
    cfg: CacheConfig,
}

impl Cache {
    pub fn new(store: Arc<dyn ResponseCache>, cfg: CacheConfig) -> Self {
        Self { store, cfg }
    }
}

/// Key derivation ignores the event discriminator; see DESIGN.md.
fn cache_key(event: &Event) -> String {
    event
        .message()
        .map_or_else(|| "0_".to_string(), |m| format!("{}_{}", m.from_id, m.text))
}

#[async_trait]
impl Middleware for Cache {
    async fn handle(
        &self,
        event: &Event,
        out: &mut ResponseWriter,
        next: Next<'_>,
    ) -> BotResult<()> {
        if !self.cfg.enabled {
            return next.run(event, out).await;
        }

        let key = cache_key(event);

        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                out.write(&cached);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, falling through");
            }
        }

        let already_written = out.body().len();
        next.run(event, out).await?;

        let fresh = out.body()[already_written..].to_vec();
        if let Err(e) = self.store.set(&key, &fresh, self.cfg.ttl).await {
            warn!(key = %key, error = %e, "cache write failed");
        }

        Ok(())
    }
}
