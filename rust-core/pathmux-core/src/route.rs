//! # Route
//!
//! A route is an ordered conjunction of matchers plus metadata and an
//! optional handler.
//!
//! Builder calls follow sticky-error semantics: the first build error is
//! recorded on the route and every later builder call becomes a no-op.
//! A route carrying an error never matches any request.

use crate::context::Vars;
use crate::error::Error;
use crate::matcher::Matcher;
use crate::request::Request;
use crate::response::Response;
use crate::template::{self, VarIndex};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Handler function type (async)
pub type Handler =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// Wrap an async function or closure as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Kind of path matcher a route was built with
///
/// Ordering is significant: `Router::sort_routes` places higher kinds
/// first, so regex routes are tried before variable routes, and both
/// before literal routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RouteKind {
    /// Literal path
    #[default]
    Normal,
    /// Path with `:number` / `:string` placeholders
    Vars,
    /// Path written as a regular expression
    Regex,
}

/// Read-only snapshot of a matched route, handed to request handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Method the route was registered under
    pub method: String,
    /// Raw path template
    pub path: String,
    /// Route name, if any
    pub name: Option<String>,
    /// Path kind
    pub kind: RouteKind,
}

/// Route definition built through chained builder calls
#[derive(Default)]
pub struct Route {
    method: String,
    matchers: Vec<Matcher>,
    kind: RouteKind,
    path: String,
    var_index: VarIndex,
    name: Option<String>,
    error: Option<Error>,
    handler: Option<Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("matchers", &self.matchers)
            .field("error", &self.error)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl Route {
    /// Create an empty route
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path matcher compiled from `template`
    ///
    /// The template selects the route kind; see [`crate::template`].
    /// Calling this on a route that already has a path records
    /// `Error::DuplicatePath`.
    pub fn path(&mut self, template: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        if !self.path.is_empty() {
            self.error = Some(Error::DuplicatePath {
                existing: self.path.clone(),
                attempted: template.to_string(),
            });
            return self;
        }

        self.path = template.to_string();
        match template::compile(template) {
            Ok(compiled) => {
                self.kind = compiled.kind;
                self.var_index = compiled.var_index;
                self.matchers.push(compiled.matcher);
            }
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Add a scheme matcher, e.g. `["http", "https"]`
    pub fn schemes<I, S>(&mut self, schemes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.error.is_some() {
            return self;
        }
        self.add_matcher(Matcher::scheme(schemes))
    }

    /// Add a header matcher comparing values for equality
    ///
    /// An empty value only requires the header to be present.
    pub fn headers<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.error.is_some() {
            return self;
        }
        self.add_built_matcher(Matcher::header(pairs))
    }

    /// Add a header matcher comparing values against regular expressions
    pub fn headers_regex<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.error.is_some() {
            return self;
        }
        self.add_built_matcher(Matcher::header_regex(pairs))
    }

    /// Add a custom predicate matcher
    pub fn matcher_func<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        self.add_matcher(Matcher::custom(f))
    }

    /// Append an already built matcher
    pub fn add_matcher(&mut self, matcher: Matcher) -> &mut Self {
        if self.error.is_none() {
            self.matchers.push(matcher);
        }
        self
    }

    fn add_built_matcher(&mut self, matcher: crate::error::Result<Matcher>) -> &mut Self {
        match matcher {
            Ok(m) => self.add_matcher(m),
            Err(e) => {
                self.error = Some(e);
                self
            }
        }
    }

    /// Set the route name
    ///
    /// Calling this on a route that already has a name records
    /// `Error::DuplicateName`.
    pub fn name(&mut self, name: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        if let Some(existing) = &self.name {
            self.error = Some(Error::DuplicateName {
                existing: existing.clone(),
                attempted: name.to_string(),
            });
            return self;
        }

        self.name = Some(name.to_string());
        self
    }

    /// Set the request handler
    pub fn handler(&mut self, handler: Handler) -> &mut Self {
        if self.error.is_none() {
            self.handler = Some(handler);
        }
        self
    }

    /// Set the request handler from an async function or closure
    pub fn handler_fn<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handler(handler_fn(f))
    }

    /// Check whether every matcher accepts the request
    ///
    /// Always `false` once the route carries a build error.
    #[must_use]
    pub fn matches(&self, req: &Request) -> bool {
        if self.error.is_some() {
            return false;
        }
        self.matchers.iter().all(|m| m.matches(req))
    }

    /// Read path variables from a request this route matched
    ///
    /// Segments are returned verbatim; a `:number` value is still a string.
    #[must_use]
    pub fn extract_vars(&self, req: &Request) -> Vars {
        let segments: Vec<&str> = req.path().split('/').collect();
        self.var_index
            .iter()
            .filter_map(|(key, &idx)| {
                segments
                    .get(idx)
                    .map(|segment| (key.clone(), (*segment).to_string()))
            })
            .collect()
    }

    /// Method assigned at registration; empty before
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw path template; empty until `path` is called
    #[must_use]
    pub fn raw_path(&self) -> &str {
        &self.path
    }

    /// Route name, if any
    #[must_use]
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Path kind
    #[must_use]
    pub const fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Matchers in evaluation order
    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Placeholder positions for variable routes
    #[must_use]
    pub const fn var_index(&self) -> &VarIndex {
        &self.var_index
    }

    /// Check if the route extracts path variables
    #[must_use]
    pub fn has_vars(&self) -> bool {
        !self.var_index.is_empty()
    }

    /// Bound handler, if any
    #[must_use]
    pub const fn get_handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    /// Check if a handler is bound
    #[must_use]
    pub const fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Recorded build error, if any
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Check if a build error is recorded
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Snapshot handed to handlers through the request context
    #[must_use]
    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            method: self.method.clone(),
            path: self.path.clone(),
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    pub(crate) fn set_method(&mut self, method: &str) {
        self.method = method.to_string();
    }

    /// Record `error` unless one is already recorded
    pub(crate) fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Reorder matchers by sort priority; stable, never changes `matches`
    pub(crate) fn sort_matchers(&mut self) {
        self.matchers.sort_by_key(Matcher::sort_priority);
    }
}
