//! # Router
//!
//! Per-method route registry with first-match-wins dispatch.
//!
//! Routes are tried in bucket order, so order is part of the routing
//! contract. [`Router::sort_routes`] is meant to run once, after all
//! registration and before serving, and puts regex routes first, then
//! variable routes, then literal routes.
//!
//! ## Request handling
//!
//! 1. Non-canonical paths get a 301 to their cleaned form
//! 2. The path is lower-cased unless the router is case-sensitive
//! 3. The method bucket is scanned for the first matching route
//! 4. The matched route, its variables and the query values are attached
//!    to the request and its handler runs; the not-found handler covers
//!    both "no match" and "matched a route without a handler"

use crate::config::RouterConfig;
use crate::context::{Queries, RequestContext};
use crate::error::{Error, Result};
use crate::request::{percent_encode_path, Request};
use crate::response::Response;
use crate::route::{handler_fn, Handler, Route, RouteKind};
use crate::validator::{MethodValidator, PathValidator, RouteFailure, Validator};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Constructor used for every route the router creates
pub type RouteFactory = Box<dyn Fn() -> Route + Send + Sync>;

/// Request router
pub struct Router {
    routes: HashMap<String, Vec<Route>>,
    not_found: Option<Handler>,
    config: RouterConfig,
    validators: Vec<Box<dyn Validator>>,
    route_factory: RouteFactory,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let validators: Vec<&str> = self.validators.iter().map(|v| v.name()).collect();
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("config", &self.config)
            .field("validators", &validators)
            .field("has_not_found", &self.not_found.is_some())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create a router with `config`
    ///
    /// `strict_paths` selects the strict path validator.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        let path_validator = if config.strict_paths {
            PathValidator::strict()
        } else {
            PathValidator::new()
        };

        Self {
            routes: HashMap::new(),
            not_found: None,
            config,
            validators: vec![Box::new(MethodValidator::default()), Box::new(path_validator)],
            route_factory: Box::new(Route::new),
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Replace the route constructor
    pub fn use_route<F>(&mut self, factory: F)
    where
        F: Fn() -> Route + Send + Sync + 'static,
    {
        self.route_factory = Box::new(factory);
    }

    /// Replace the registration validators; they run in the given order
    pub fn set_validators(&mut self, validators: Vec<Box<dyn Validator>>) {
        self.validators = validators;
    }

    /// Append a registration validator
    pub fn add_validator<V: Validator + 'static>(&mut self, validator: V) {
        self.validators.push(Box::new(validator));
    }

    /// Set the handler used when no route matches
    pub fn set_not_found_handler(&mut self, handler: Handler) {
        self.not_found = Some(handler);
    }

    /// Create an empty, unregistered route
    #[must_use]
    pub fn new_route(&self) -> Route {
        (self.route_factory)()
    }

    /// Register `route` under `method`
    ///
    /// Validators run in order unless the route already carries an error;
    /// the first failure becomes the route's error. The route is stored
    /// either way so it shows up in [`Router::errors`].
    pub fn register_route(&mut self, method: &str, mut route: Route) -> &mut Route {
        route.set_method(method);

        if !route.has_error() {
            for validator in &self.validators {
                if let Err(e) = validator.validate(&route) {
                    warn!(
                        method,
                        path = route.raw_path(),
                        validator = validator.name(),
                        error = %e,
                        "route failed validation"
                    );
                    route.set_error(e);
                    break;
                }
            }
        }

        debug!(method, path = route.raw_path(), kind = ?route.kind(), "registered route");

        let bucket = self.routes.entry(method.to_string()).or_default();
        bucket.push(route);
        let last = bucket.len() - 1;
        &mut bucket[last]
    }

    /// Register a route for `path` under `method`
    pub fn handle(&mut self, method: &str, path: &str, handler: Handler) -> &mut Route {
        let mut route = self.new_route();
        route.path(path).handler(handler);
        self.register_route(method, route)
    }

    /// Register a route for `path` under `method` from an async function
    pub fn handle_fn<F, Fut>(&mut self, method: &str, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle(method, path, handler_fn(f))
    }

    /// Register a GET route
    pub fn get<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("GET", path, f)
    }

    /// Register a POST route
    pub fn post<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("POST", path, f)
    }

    /// Register a PUT route
    pub fn put<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("PUT", path, f)
    }

    /// Register a PATCH route
    pub fn patch<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("PATCH", path, f)
    }

    /// Register a DELETE route
    pub fn delete<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("DELETE", path, f)
    }

    /// Register a HEAD route
    pub fn head<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("HEAD", path, f)
    }

    /// Register an OPTIONS route
    pub fn options<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("OPTIONS", path, f)
    }

    /// Register a CONNECT route
    pub fn connect<F, Fut>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_fn("CONNECT", path, f)
    }

    /// Routes registered under `method`, in dispatch order
    #[must_use]
    pub fn routes(&self, method: &str) -> &[Route] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Find the first route in the request's method bucket that matches
    #[must_use]
    pub fn trigger_matching(&self, req: &Request) -> Option<&Route> {
        self.routes
            .get(req.method())?
            .iter()
            .find(|route| route.matches(req))
    }

    /// Order every bucket by descending route kind and every route's
    /// matchers by sort priority
    ///
    /// Both sorts are stable, so running this again changes nothing.
    pub fn sort_routes(&mut self) {
        for bucket in self.routes.values_mut() {
            for route in bucket.iter_mut() {
                route.sort_matchers();
            }
            bucket.sort_by(|a, b| b.kind().cmp(&a.kind()));
        }
    }

    /// Every registered route that carries an error, with that error
    #[must_use]
    pub fn errors(&self) -> Vec<(&Route, &Error)> {
        self.routes
            .values()
            .flatten()
            .filter_map(|route| route.error().map(|e| (route, e)))
            .collect()
    }

    /// Serializable reports for every failed route
    #[must_use]
    pub fn failures(&self) -> Vec<RouteFailure> {
        self.routes
            .values()
            .flatten()
            .filter_map(RouteFailure::from_route)
            .collect()
    }

    /// Check if any registered route carries an error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.routes.values().flatten().any(Route::has_error)
    }

    /// Fail if any registered route carries an error
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutes` listing every failed route.
    pub fn ensure_valid(&self) -> Result<()> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidRoutes { failures })
        }
    }

    /// Handle a request end to end
    pub async fn handle_request(&self, mut req: Request) -> Response {
        if self.config.clean_path {
            let path = if self.config.use_encoded_path {
                req.raw_path()
            } else {
                req.path()
            };

            let cleaned = clean_path(path);
            if cleaned != path {
                let location = if self.config.use_encoded_path || req.path() == req.raw_path() {
                    cleaned
                } else {
                    percent_encode_path(&cleaned)
                };
                debug!(from = path, to = %location, "redirecting to canonical path");
                return Response::redirect(&location);
            }
        }

        if !self.config.case_sensitive {
            let lowered = req.path().to_lowercase();
            req.set_path(lowered);
        }

        let Some(route) = self.trigger_matching(&req) else {
            return self.respond_not_found(req).await;
        };

        let vars = (route.kind() == RouteKind::Vars).then(|| route.extract_vars(&req));
        let queries = Queries::parse(req.query_string());
        req.set_context(RequestContext {
            route: Some(route.info()),
            vars,
            queries: Some(queries),
        });

        match route.get_handler() {
            Some(handler) => handler(req).await,
            None => self.respond_not_found(req).await,
        }
    }

    async fn respond_not_found(&self, req: Request) -> Response {
        match &self.not_found {
            Some(handler) => handler(req).await,
            None => Response::not_found(),
        }
    }
}

/// Canonical form of `path`
///
/// Empty and `.` segments are dropped and `..` removes the segment before
/// it; the result is rooted, and a trailing slash survives unless the
/// result is `/`. An empty input becomes `/`.
#[must_use]
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if path.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}
