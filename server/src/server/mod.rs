//! Unix-socket transport and request dispatcher.
//!
//! The front-end web server proxies each webhook delivery to a local Unix
//! socket; every request is decoded into an [`Event`], resolved against the
//! read-only handler registry and run through the middleware chain. One task
//! per request, no queue; the platform requires no ordering across
//! deliveries.

use std::backtrace::Backtrace;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::FutureExt;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::{Event, ResponseWriter};
use crate::message::HandlerMap;
use crate::middleware::{panic_message, Chain};

const INVALID_JSON_BODY: &[u8] = b"invalid json";
const INTERNAL_ERROR_BODY: &[u8] = b"500 server error";

/// Webhook deliveries are small; anything bigger is not ours.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The socket server: listener lifecycle plus per-request dispatch.
pub struct SocketServer {
    cfg: Config,
    handlers: Arc<HandlerMap>,
    chain: Chain,
}

impl SocketServer {
    pub fn new(cfg: Config, handlers: Arc<HandlerMap>, chain: Chain) -> Self {
        Self {
            cfg,
            handlers,
            chain,
        }
    }

    /// Build the router; also the entry point for integration tests.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(self))
    }

    /// Bind the socket and serve until SIGINT/SIGTERM.
    ///
    /// Returns the first fatal error from bind or serve; a clean shutdown
    /// returns `Ok(())`. In-flight requests are left to finish.
    pub async fn listen(self: Arc<Self>) -> anyhow::Result<()> {
        let socket = self.cfg.socket.clone();

        let listener = UnixListener::bind(&socket).map_err(|e| {
            error!(socket = %socket, error = %e, "cannot listen to unix socket");
            e
        })?;
        // The fronting web server connects as another user.
        fs::set_permissions(&socket, fs::Permissions::from_mode(0o775))?;

        info!(socket = %socket, "Server listening");

        let app = self.router();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Err(e) = fs::remove_file(&socket) {
            warn!(socket = %socket, error = %e, "could not remove socket file");
        }

        served.map_err(Into::into)
    }

    /// Match an OAuth callback route under the configured path prefix.
    fn oauth_route(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(self.cfg.path_prefix.as_str())?;
        if rest == self.cfg.vk_oauth.path {
            Some(rest.to_string())
        } else {
            None
        }
    }

    async fn handle_request(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();
        let query = parts.uri.query().unwrap_or("").to_string();

        debug!(method = %parts.method, path = %path, "incoming request");

        let event = if let Some(name) = self.oauth_route(&path) {
            Event::oauth(name, query)
        } else {
            let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "unable to read request body");
                    return (StatusCode::BAD_REQUEST, INVALID_JSON_BODY).into_response();
                }
            };
            match Event::from_json(&bytes) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "malformed callback payload");
                    return (StatusCode::BAD_REQUEST, INVALID_JSON_BODY).into_response();
                }
            }
        };

        // Routing miss is the dispatcher's decision, not a handler error.
        let Some(handler) = self.handlers.get(&event.kind) else {
            return (StatusCode::BAD_REQUEST, Body::empty()).into_response();
        };

        let mut out = ResponseWriter::new();
        if let Err(e) = self.chain.execute(handler, &event, &mut out).await {
            error!(kind = %event.kind, error = %e, "error while handling request");
            // Body already written by the handler is preserved as-is.
            out.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }

        out.into_response()
    }
}

/// Axum entry point. The outermost recovery boundary lives here: a panic in
/// decoding or handling becomes a plain 500 instead of an unwound task.
async fn dispatch(State(server): State<Arc<SocketServer>>, request: Request) -> Response {
    match AssertUnwindSafe(server.handle_request(request))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(panic) => {
            error!(
                panic = %panic_message(panic.as_ref()),
                backtrace = %Backtrace::force_capture(),
                "panic escaped the dispatch pipeline"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
        }
    }
}

async fn shutdown_signal() {
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
    }

    info!("Received shutdown signal, draining in-flight requests");
}
