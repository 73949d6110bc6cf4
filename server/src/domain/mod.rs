//! Domain model: inbound events, the response sink, and collaborator contracts.

mod event;
mod repo;
mod response;

use std::sync::Arc;

use futures::future::BoxFuture;

pub use event::{CallbackObject, ClientInfo, Event, EventContext, Message};
pub use repo::{RepoError, UserRepo};
pub use response::ResponseWriter;

use crate::db::User;

/// Name of the session cookie issued after a successful OAuth exchange.
pub const COOKIE_NAME: &str = "token";

/// Post-authentication callback, spawned fire-and-forget once the OAuth flow
/// has written its response. Each callback receives the reconciled user and
/// has no way to report failure back to the request.
pub type PostAuthCallback = Arc<dyn Fn(User) -> BoxFuture<'static, ()> + Send + Sync>;
