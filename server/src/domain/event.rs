//! Inbound callback event model.
//!
//! One [`Event`] is decoded per request and passed by reference through the
//! middleware chain. The context is a tagged variant, so handlers never need
//! a runtime cast to get at the payload they expect.

use serde::Deserialize;

use crate::errors::{BotError, BotResult};

/// Message substructure of a `message_new` callback.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: i64,
    pub date: i64,
    pub from_id: i64,
    pub peer_id: i64,
    pub out: i32,
    pub text: String,
    pub conversation_message_id: i64,
    pub important: bool,
    pub random_id: i64,
    pub attachments: Vec<serde_json::Value>,
    pub is_hidden: bool,
    pub payload: String,
}

/// Capabilities of the sender's client (unused yet).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub button_actions: Vec<String>,
    pub keyboard: bool,
    pub inline_keyboard: bool,
    pub lang_id: i32,
}

/// `object` field of a callback delivery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallbackObject {
    pub message: Message,
    pub client_info: ClientInfo,
}

/// Payload variants, selected by how the request arrived.
#[derive(Debug, Clone)]
pub enum EventContext {
    /// A regular callback delivery with a message substructure.
    Message(CallbackObject),
    /// An OAuth callback; carries the raw query string of the request.
    OauthCallback(String),
}

/// A decoded inbound event. Immutable once built.
#[derive(Debug, Clone)]
pub struct Event {
    /// Discriminator selecting the handler.
    pub kind: String,
    pub group_id: i64,
    /// May repeat on platform-side retries; no dedup is performed.
    pub event_id: String,
    /// Shared secret sent by the platform. Not validated here.
    pub secret: String,
    pub context: EventContext,
}

/// Raw JSON shape of a callback delivery.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCallback {
    #[serde(rename = "type")]
    kind: String,
    object: CallbackObject,
    group_id: i64,
    event_id: String,
    secret: String,
}

impl Event {
    /// Decode a callback delivery from a JSON body.
    pub fn from_json(body: &[u8]) -> BotResult<Self> {
        let raw: RawCallback = serde_json::from_slice(body).map_err(BotError::InvalidJson)?;
        Ok(Self {
            kind: raw.kind,
            group_id: raw.group_id,
            event_id: raw.event_id,
            secret: raw.secret,
            context: EventContext::Message(raw.object),
        })
    }

    /// Synthesize an OAuth callback event for a provider route.
    pub fn oauth(kind: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            group_id: 0,
            event_id: String::new(),
            secret: String::new(),
            context: EventContext::OauthCallback(query.into()),
        }
    }

    /// Message substructure, if this is a regular callback delivery.
    pub fn message(&self) -> Option<&Message> {
        match &self.context {
            EventContext::Message(object) => Some(&object.message),
            EventContext::OauthCallback(_) => None,
        }
    }

    /// Raw query string, if this is an OAuth callback.
    pub fn oauth_query(&self) -> Option<&str> {
        match &self.context {
            EventContext::OauthCallback(query) => Some(query),
            EventContext::Message(_) => None,
        }
    }

}
