//! # HTTP Response
//!
//! Response returned by handlers, the not-found fallback and the
//! canonical-path redirect.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Body written by the default not-found handler
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
    /// Content type
    pub content_type: String,
    /// Response headers
    pub headers: HashMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            body: Bytes::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl Response {
    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(body.into()),
            ..Self::default()
        }
    }

    /// Create a JSON response from a serializable value
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the value cannot be serialized.
    pub fn json<T: Serialize>(value: &T) -> crate::error::Result<Self> {
        Ok(Self {
            body: Bytes::from(serde_json::to_vec(value)?),
            content_type: "application/json".to_string(),
            ..Self::default()
        })
    }

    /// Default not-found response (404)
    #[must_use]
    pub fn not_found() -> Self {
        Self::text(NOT_FOUND_BODY).with_status(404)
    }

    /// Permanent redirect (301) to `location`
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::default()
            .with_status(301)
            .with_header(LOCATION.as_str(), location)
    }

    /// Set status code
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set header (Content-Type is tracked separately)
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            self.content_type = value.to_string();
        } else {
            self.headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Get a header value (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            return Some(&self.content_type);
        }
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Convert to hyper Response
    ///
    /// Headers that are not valid HTTP are skipped with a warning; an
    /// out-of-range status becomes 500.
    #[must_use]
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = response.headers_mut();
        match HeaderValue::from_str(&self.content_type) {
            Ok(v) => {
                headers.insert(CONTENT_TYPE, v);
            }
            Err(_) => warn!(value = %self.content_type, "dropping invalid content-type"),
        }
        for (k, v) in &self.headers {
            match (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                (Ok(n), Ok(v)) => {
                    headers.insert(n, v);
                }
                _ => warn!(header = %k, value = %v, "dropping invalid response header"),
            }
        }
        response
    }
}
