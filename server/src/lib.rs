//! VK callback-bot webhook server.
//!
//! Accepts Callback API events over a local Unix socket, dispatches them
//! through a middleware chain (panic isolation, response caching) to
//! registered handlers, and calls back into the VK HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod message;
pub mod middleware;
pub mod server;
