//! Handler for incoming `message_new` callbacks.

use std::sync::Arc;

use async_trait::async_trait;

use super::Handler;
use crate::api::{self, MessageOptions, VkApi};
use crate::domain::{Event, ResponseWriter};
use crate::errors::{BotError, BotResult};

const GREETING: &str = "Hello world!";

/// Replies to the sender and acknowledges the callback.
pub struct NewMessage {
    api: Arc<VkApi>,
}

impl NewMessage {
    pub fn new(api: Arc<VkApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler for NewMessage {
    fn name(&self) -> &str {
        "message_new"
    }

    async fn exec(&self, event: &Event, out: &mut ResponseWriter) -> BotResult<()> {
        let message = event
            .message()
            .ok_or_else(|| BotError::Decode("message context missing".into()))?;

        self.api
            .send_message(message.from_id, GREETING, MessageOptions::default())
            .await?;

        out.write(api::DEFAULT_RESPONSE);
        Ok(())
    }
}
