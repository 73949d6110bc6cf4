//! Composable middleware around handler invocation.
//!
//! A middleware wraps the call into the terminal [`Handler`]; the chain is an
//! ordered list where the first layer is the outermost wrapper. Middlewares
//! must not swallow handler errors; only cache-store errors are swallowed.

mod cache;
mod panic;

use std::sync::Arc;

use async_trait::async_trait;

pub use cache::{Cache, RedisCache, ResponseCache};
pub(crate) use panic::panic_message;
pub use panic::PanicGuard;

use crate::domain::{Event, ResponseWriter};
use crate::errors::BotResult;
use crate::message::Handler;

/// Cross-cutting wrapper around a handler invocation.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        event: &Event,
        out: &mut ResponseWriter,
        next: Next<'_>,
    ) -> BotResult<()>;
}

/// Remaining layers of a chain, ending in the terminal handler call.
pub struct Next<'a> {
    handler: &'a Arc<dyn Handler>,
    layers: &'a [Arc<dyn Middleware>],
}

impl Next<'_> {
    /// Continue into the next layer, or the handler itself once the layers
    /// are exhausted.
    pub async fn run(self, event: &Event, out: &mut ResponseWriter) -> BotResult<()> {
        match self.layers.split_first() {
            Some((layer, rest)) => {
                let next = Next {
                    handler: self.handler,
                    layers: rest,
                };
                layer.handle(event, out, next).await
            }
            None => self.handler.exec(event, out).await,
        }
    }
}

/// Ordered middleware chain. With zero layers it degenerates to a direct
/// handler invocation.
#[derive(Clone)]
pub struct Chain {
    layers: Arc<[Arc<dyn Middleware>]>,
}

impl Chain {
    #[must_use]
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            layers: layers.into(),
        }
    }

    pub async fn execute(
        &self,
        handler: &Arc<dyn Handler>,
        event: &Event,
        out: &mut ResponseWriter,
    ) -> BotResult<()> {
        Next {
            handler,
            layers: &self.layers,
        }
        .run(event, out)
        .await
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
