//! Reusable test helpers for HTTP tests.
//!
//! Builds the real router around a [`SocketServer`] and drives it with
//! `tower::ServiceExt::oneshot`, plus spy/mock implementations of the
//! handler, HTTP-client, user-store, and cache-store contracts.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use vkbot_server::config::Config;
use vkbot_server::db::{OauthProvider, User};
use vkbot_server::domain::{Event, RepoError, ResponseWriter, UserRepo};
use vkbot_server::errors::{BotError, BotResult};
use vkbot_server::message::{Handler, HandlerMap};
use vkbot_server::middleware::{Chain, ResponseCache};
use vkbot_server::server::SocketServer;

/// Build a router around the given registry and chain.
pub fn test_router(cfg: Config, handlers: Arc<HandlerMap>, chain: Chain) -> Router {
    Arc::new(SocketServer::new(cfg, handlers, chain)).router()
}

/// POST a JSON callback body to `/` and collect the response.
pub async fn post_callback(router: &Router, body: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes)
}

/// GET an arbitrary URI (OAuth callback routes) and return the raw response.
pub async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    router.clone().oneshot(request).await.unwrap()
}

/// Counts invocations and writes a fixed body.
#[derive(Default)]
pub struct SpyHandler {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Handler for SpyHandler {
    fn name(&self) -> &str {
        "message_new"
    }

    async fn exec(&self, _event: &Event, out: &mut ResponseWriter) -> BotResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        out.write(b"ok");
        Ok(())
    }
}

/// Always returns an error.
pub struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    fn name(&self) -> &str {
        "mistaken"
    }

    async fn exec(&self, _event: &Event, _out: &mut ResponseWriter) -> BotResult<()> {
        Err(BotError::Decode("there is a persistent error".into()))
    }
}

/// Always panics.
pub struct PanickingHandler;

#[async_trait]
impl Handler for PanickingHandler {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn exec(&self, _event: &Event, _out: &mut ResponseWriter) -> BotResult<()> {
        panic!("handler exploded");
    }
}

/// Canned HTTP client recording every requested URL.
pub struct CannedClient {
    body: Vec<u8>,
    pub urls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl CannedClient {
    pub fn new(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            urls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            body: Vec::new(),
            urls: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl vkbot_server::api::HttpClient for CannedClient {
    async fn get(&self, url: &str) -> Result<Bytes, anyhow::Error> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(anyhow::anyhow!("connection refused"));
        }
        Ok(Bytes::from(self.body.clone()))
    }

    async fn post_form(&self, url: &str, _form: &[(&str, String)]) -> Result<Bytes, anyhow::Error> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(anyhow::anyhow!("connection refused"));
        }
        Ok(Bytes::from(self.body.clone()))
    }
}

/// In-memory user store with call accounting.
#[derive(Default)]
pub struct MemoryRepo {
    pub users: Mutex<HashMap<String, User>>,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
}

#[async_trait]
impl UserRepo for MemoryRepo {
    async fn get_by_external_id(
        &self,
        _provider: OauthProvider,
        external_id: &str,
    ) -> Result<User, RepoError> {
        self.users
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn create(&self, user: &User) -> Result<(), RepoError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .unwrap()
            .insert(user.external_id.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .unwrap()
            .insert(user.external_id.clone(), user.clone());
        Ok(())
    }
}

/// In-memory cache store with lazy expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, anyhow::Error> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| Bytes::from(value.clone())))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }
}
