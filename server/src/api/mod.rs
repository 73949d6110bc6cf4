//! Outbound VK API client.
//!
//! All outbound HTTP goes through the object-safe [`HttpClient`] trait so the
//! flows that depend on it are testable with canned responses. A single failed
//! outbound call is logged and surfaced, never retried.

pub mod users;

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use serde::Deserialize;
use tracing::error;

use crate::config::ApiConfig;
use crate::errors::{BotError, BotResult};

/// Fixed acknowledgment body the platform expects for handled callbacks.
pub const DEFAULT_RESPONSE: &[u8] = b"ok";

/// Object-safe HTTP transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Bytes, anyhow::Error>;

    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<Bytes, anyhow::Error>;
}

/// reqwest-backed transport.
#[derive(Debug, Default, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    // Request URLs embed credentials (client secrets, access tokens), and
    // reqwest's error Display prints the full URL. Errors are stripped of
    // their URL here so callers can log them verbatim.
    async fn get(&self, url: &str) -> Result<Bytes, anyhow::Error> {
        Ok(self
            .inner
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)?)
    }

    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<Bytes, anyhow::Error> {
        let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Ok(self
            .inner
            .post(url)
            .form(&pairs)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)?)
    }
}

/// API-level error payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiError {
    pub error_code: i64,
    pub error_msg: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendMessageResponse {
    error: ApiError,
}

/// Optional parameters of an outbound message.
#[derive(Debug, Default, Clone)]
pub struct MessageOptions {
    /// Serialized keyboard markup.
    pub keyboard: Option<String>,
    /// Attachment reference list.
    pub attachment: Option<String>,
}

/// Client for the platform's HTTP API.
pub struct VkApi {
    client: Arc<dyn HttpClient>,
    cfg: ApiConfig,
}

impl VkApi {
    pub fn new(client: Arc<dyn HttpClient>, cfg: ApiConfig) -> Self {
        Self { client, cfg }
    }

    /// Send a message to a peer via `messages.send`.
    pub async fn send_message(
        &self,
        peer_id: i64,
        text: &str,
        opts: MessageOptions,
    ) -> BotResult<()> {
        let url = format!("{}/messages.send", self.cfg.endpoint);
        let random_id: i64 = rand::thread_rng().gen();

        let mut form = vec![
            ("peer_id", peer_id.to_string()),
            ("message", text.to_string()),
            ("random_id", random_id.to_string()),
            ("access_token", self.cfg.token.clone()),
            ("v", self.cfg.version.clone()),
        ];
        if let Some(keyboard) = opts.keyboard {
            form.push(("keyboard", keyboard));
        }
        if let Some(attachment) = opts.attachment {
            form.push(("attachment", attachment));
        }

        let body = self.client.post_form(&url, &form).await.map_err(|e| {
            error!(
                api = "messages.send",
                token = %mask_token(&self.cfg.token),
                error = %e,
                "Send API request error"
            );
            BotError::Transport(e)
        })?;

        let parsed: SendMessageResponse =
            serde_json::from_slice(&body).map_err(|e| BotError::Transport(e.into()))?;

        if parsed.error.error_code > 0 {
            error!(
                api = "messages.send",
                code = parsed.error.error_code,
                message = %parsed.error.error_msg,
                "Response has an error"
            );
            return Err(BotError::Transport(anyhow!(
                "messages.send failed with code {}",
                parsed.error.error_code
            )));
        }

        Ok(())
    }
}

/// Mask a token for safe logging: first 7 + `***` + last 4 characters;
/// anything of length <= 11 is fully masked.
#[must_use]
pub fn mask_token(token: &str) -> String {
    if token.len() <= 11 {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[token.len() - 4..])
}
