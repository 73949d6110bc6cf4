//! Buffering response sink handed to handlers.
//!
//! Handlers write bytes and headers into a [`ResponseWriter`]; the dispatcher
//! converts it into the final HTTP response once the chain returns. Buffering
//! also lets the caching middleware capture the exact bytes a handler wrote.

use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Response under construction for a single request.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Append bytes to the response body.
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Append a session cookie.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        match HeaderValue::from_str(&format!("{name}={value}; Path=/")) {
            Ok(cookie) => {
                self.headers.append(SET_COOKIE, cookie);
            }
            Err(e) => warn!(cookie = %name, error = %e, "dropping malformed cookie value"),
        }
    }

    /// Turn the response into a 302 redirect.
    pub fn redirect(&mut self, location: &str) {
        match HeaderValue::from_str(location) {
            Ok(value) => {
                self.status = StatusCode::FOUND;
                self.headers.insert(LOCATION, value);
            }
            Err(e) => warn!(location = %location, error = %e, "dropping malformed redirect target"),
        }
    }

    pub fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_accumulate() {
        let mut out = ResponseWriter::new();
        out.write(b"foo");
        out.write(b"bar");
        assert_eq!(out.body(), b"foobar");
        assert_eq!(out.status(), StatusCode::OK);
    }

    #[test]
    fn redirect_sets_status_and_location() {
        let mut out = ResponseWriter::new();
        out.redirect("https://host.domain/");
        assert_eq!(out.status(), StatusCode::FOUND);
        assert_eq!(
            out.headers().get(LOCATION).unwrap(),
            "https://host.domain/"
        );
    }

    #[test]
    fn cookie_is_appended() {
        let mut out = ResponseWriter::new();
        out.set_cookie("token", "T");
        assert_eq!(out.headers().get(SET_COOKIE).unwrap(), "token=T; Path=/");
    }
}
