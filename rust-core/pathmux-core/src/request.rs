//! # HTTP Request
//!
//! Request wrapper consumed by matchers, the router and handlers.
//!
//! The router reads the method, the decoded path, the scheme and the
//! headers while matching; handlers additionally see the per-request
//! context (matched route, path variables, query values) that the router
//! fills in right before the handler runs.

use crate::context::{Queries, RequestContext, Vars};
use crate::error::{Error, Result};
use crate::route::RouteInfo;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Uri};
use std::collections::HashMap;

/// Scheme assumed when the request target carries none
const DEFAULT_SCHEME: &str = "http";

/// HTTP request as seen by the dispatch core
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    /// Percent-decoded path; lower-cased by the router unless case-sensitive
    path: String,
    /// Path exactly as received
    raw_path: String,
    scheme: String,
    query_string: Option<String>,
    headers: HeaderMap,
    body: Option<Bytes>,
    context: RequestContext,
}

impl Request {
    /// Create a request manually (for testing/internal use)
    ///
    /// `target` may be origin-form (`/a/b?x=1`) or absolute-form
    /// (`https://host/a/b?x=1`); the scheme of an absolute target is kept.
    pub fn new(
        method: &str,
        target: impl Into<String>,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let target = target.into();
        let (scheme, raw_path, query_string) = split_target(&target);

        let mut headers = HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(&v),
            ) {
                headers.append(n, v);
            }
        }

        Self {
            method: method.to_string(),
            path: percent_decode(&raw_path, false),
            raw_path,
            scheme,
            query_string,
            headers,
            body,
            context: RequestContext::default(),
        }
    }

    /// Create from hyper request with body size limit
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` when the declared or collected
    /// body exceeds `max_body_size`.
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let method = req.method().as_str().to_string();

        let uri = req.uri();
        let raw_path = uri.path().to_string();
        let query_string = uri.query().map(String::from);
        let scheme = uri
            .scheme_str()
            .unwrap_or(DEFAULT_SCHEME)
            .to_ascii_lowercase();

        let headers = req.headers().clone();
        if let Some(len) = headers.get(hyper::header::CONTENT_LENGTH) {
            if let Ok(len_str) = len.to_str() {
                if let Ok(content_len) = len_str.parse::<usize>() {
                    if content_len > max_body_size {
                        return Err(Error::PayloadTooLarge {
                            limit: max_body_size,
                            actual: content_len,
                        });
                    }
                }
            }
        }

        let body = match BodyExt::collect(req.into_body()).await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                if bytes.len() > max_body_size {
                    return Err(Error::PayloadTooLarge {
                        limit: max_body_size,
                        actual: bytes.len(),
                    });
                }
                Some(bytes)
            }
            Err(_) => None,
        };

        Ok(Self {
            method,
            path: percent_decode(&raw_path, false),
            raw_path,
            scheme,
            query_string,
            headers,
            body,
            context: RequestContext::default(),
        })
    }

    /// Override the request scheme
    #[must_use]
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_ascii_lowercase();
        self
    }

    /// Append a header value, keeping any existing values for the key
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(n, v);
        }
        self
    }

    /// Append an already validated header value, which may be opaque bytes
    #[must_use]
    pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// HTTP method as received
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Decoded request path (without query string)
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path as received, still percent-encoded
    #[must_use]
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Lower-case request scheme
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Get the request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_ref().map(AsRef::as_ref)
    }

    /// Get the request body as string (UTF-8)
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Route that matched this request, once dispatched
    #[must_use]
    pub fn current_route(&self) -> Option<&RouteInfo> {
        self.context.route.as_ref()
    }

    /// Path variables extracted from a variable-template route
    #[must_use]
    pub fn vars(&self) -> Option<&Vars> {
        self.context.vars.as_ref()
    }

    /// Parsed query values, once dispatched
    #[must_use]
    pub fn queries(&self) -> Option<&Queries> {
        self.context.queries.as_ref()
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    pub(crate) fn set_context(&mut self, context: RequestContext) {
        self.context = context;
    }
}

/// Split a request target into (scheme, raw path, query string)
fn split_target(target: &str) -> (String, String, Option<String>) {
    if let Ok(uri) = target.parse::<Uri>() {
        let scheme = uri
            .scheme_str()
            .unwrap_or(DEFAULT_SCHEME)
            .to_ascii_lowercase();
        let path = if uri.path().is_empty() { "/" } else { uri.path() };
        return (scheme, path.to_string(), uri.query().map(String::from));
    }

    match target.split_once('?') {
        Some((p, q)) => (DEFAULT_SCHEME.to_string(), p.to_string(), Some(q.to_string())),
        None => (DEFAULT_SCHEME.to_string(), target.to_string(), None),
    }
}

/// Percent-decode `s`; `plus_as_space` applies form encoding rules
///
/// Input whose decoded bytes are not valid UTF-8 is returned unchanged, so
/// distinct invalid sequences such as `%FF` and `%FE` stay distinct.
pub(crate) fn percent_decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).unwrap_or_else(|_| s.to_string())
}

/// Percent-encode a decoded path for use in a `Location` header
///
/// Unreserved characters, sub-delimiters, `:`, `@` and `/` pass through;
/// every other byte becomes `%XX`.
pub(crate) fn percent_encode_path(path: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b'~'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b':'
            | b'@'
            | b'/' => out.push(char::from(b)),
            _ => {
                out.push('%');
                out.push(char::from(HEX[usize::from(b >> 4)]));
                out.push(char::from(HEX[usize::from(b & 0x0F)]));
            }
        }
    }
    out
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_splits_query() {
        let req = Request::new("GET", "/api/user?page=1", HashMap::new(), None);
        assert_eq!(req.path(), "/api/user");
        assert_eq!(req.query_string(), Some("page=1"));
        assert_eq!(req.scheme(), "http");
    }

    #[test]
    fn test_new_absolute_target_keeps_scheme() {
        let req = Request::new("GET", "https://localhost/echo", HashMap::new(), None);
        assert_eq!(req.scheme(), "https");
        assert_eq!(req.path(), "/echo");
    }

    #[test]
    fn test_path_is_decoded_raw_path_is_not() {
        let req = Request::new("GET", "/files/a%20b", HashMap::new(), None);
        assert_eq!(req.path(), "/files/a b");
        assert_eq!(req.raw_path(), "/files/a%20b");
    }

    #[test]
    fn test_with_header_appends() {
        let req = Request::new("GET", "/", HashMap::new(), None)
            .with_header("Accept", "text/html")
            .with_header("accept", "application/json");
        assert_eq!(req.headers().get_all("accept").iter().count(), 2);
        assert_eq!(req.header("ACCEPT"), Some("text/html"));
    }

    #[test]
    fn test_context_empty_before_dispatch() {
        let req = Request::new("GET", "/", HashMap::new(), None);
        assert!(req.current_route().is_none());
        assert!(req.vars().is_none());
        assert!(req.queries().is_none());
    }

    #[test]
    fn test_body_str() {
        let req = Request::new("POST", "/", HashMap::new(), Some(Bytes::from("hello")));
        assert_eq!(req.body_str(), Some("hello"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("hello+world", true), "hello world");
        assert_eq!(percent_decode("hello+world", false), "hello+world");
        assert_eq!(percent_decode("hello%20world", false), "hello world");
        assert_eq!(percent_decode("100%25", false), "100%");
        assert_eq!(percent_decode("bad%zz", false), "bad%zz");
        assert_eq!(percent_decode("tail%2", false), "tail%2");
    }

    #[test]
    fn test_invalid_utf8_path_stays_encoded() {
        let ff = Request::new("GET", "/%FF", HashMap::new(), None);
        let fe = Request::new("GET", "/%FE", HashMap::new(), None);
        assert_eq!(ff.path(), "/%FF");
        assert_eq!(fe.path(), "/%FE");
        assert_ne!(ff.path(), fe.path());
    }

    #[test]
    fn test_percent_encode_path() {
        assert_eq!(percent_encode_path("/api/echo"), "/api/echo");
        assert_eq!(percent_encode_path("/x\n/"), "/x%0A/");
        assert_eq!(percent_encode_path("/a b/100%"), "/a%20b/100%25");
        assert_eq!(percent_encode_path("/caf\u{e9}"), "/caf%C3%A9");
    }

    #[test]
    fn test_with_header_value_keeps_opaque_bytes() {
        let value = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let req = Request::new("GET", "/", HashMap::new(), None)
            .with_header_value(HeaderName::from_static("x-name"), value);
        assert!(req.headers().contains_key("x-name"));
        assert_eq!(req.header("x-name"), None);
    }
}
