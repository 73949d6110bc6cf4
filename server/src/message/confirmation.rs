//! Handler for the platform's confirmation handshake.

use async_trait::async_trait;

use super::Handler;
use crate::domain::{Event, ResponseWriter};
use crate::errors::BotResult;

/// Answers `confirmation` callbacks with the configured confirmation string.
pub struct Confirmation {
    confirmation: String,
}

impl Confirmation {
    #[must_use]
    pub const fn new(confirmation: String) -> Self {
        Self { confirmation }
    }
}

#[async_trait]
impl Handler for Confirmation {
    fn name(&self) -> &str {
        "confirmation"
    }

    async fn exec(&self, _event: &Event, out: &mut ResponseWriter) -> BotResult<()> {
        out.write(self.confirmation.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_the_configured_string() {
        let handler = Confirmation::new("this_is_a_valid_confirmation_output".into());
        let event = Event::from_json(br#"{"type": "confirmation", "group_id": 123}"#).unwrap();
        let mut out = ResponseWriter::new();

        handler.exec(&event, &mut out).await.unwrap();
        assert_eq!(out.body(), b"this_is_a_valid_confirmation_output");
    }
}
