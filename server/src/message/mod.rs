//! Handler contract and registry.

mod auth_vk;
mod confirmation;
mod new_message;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use auth_vk::AuthVk;
pub use confirmation::Confirmation;
pub use new_message::NewMessage;

use crate::domain::{Event, ResponseWriter};
use crate::errors::BotResult;

/// A unit of business logic bound to one event discriminator.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Discriminator this handler is registered under.
    fn name(&self) -> &str;

    async fn exec(&self, event: &Event, out: &mut ResponseWriter) -> BotResult<()>;
}

/// Registry from discriminator to handler. Built once at startup and never
/// mutated afterwards, so concurrent lookups need no locking.
pub type HandlerMap = HashMap<String, Arc<dyn Handler>>;

/// Build the read-only registry.
pub fn registry(handlers: Vec<Arc<dyn Handler>>) -> Arc<HandlerMap> {
    Arc::new(
        handlers
            .into_iter()
            .map(|handler| (handler.name().to_string(), handler))
            .collect(),
    )
}
