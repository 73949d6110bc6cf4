//! Panic isolation middleware.
//!
//! Outermost layer of the chain: a panic anywhere below, including inside the
//! cache layer's own bookkeeping, is converted into a normal error return so
//! the dispatcher never sees an unwinding task. Well-behaved handlers signal
//! failures by returning errors; this boundary is last-resort.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;

use super::{Middleware, Next};
use crate::domain::{Event, ResponseWriter};
use crate::errors::{BotError, BotResult};

pub struct PanicGuard;

#[async_trait]
impl Middleware for PanicGuard {
    async fn handle(
        &self,
        event: &Event,
        out: &mut ResponseWriter,
        next: Next<'_>,
    ) -> BotResult<()> {
        match AssertUnwindSafe(next.run(event, out)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                error!(
                    kind = %event.kind,
                    panic = %panic_message(panic.as_ref()),
                    backtrace = %Backtrace::force_capture(),
                    "recovered panic while handling event"
                );
                Err(BotError::Internal)
            }
        }
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
