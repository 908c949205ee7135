//! # Route Validation
//!
//! Checks run on a route when it is registered. The router runs its
//! validators in order and stops at the first failure, which becomes the
//! route's sticky build error. A failed route stays registered so it can
//! be reported, but it never matches a request.

use crate::error::{Error, Result};
use crate::matcher::Rank;
use crate::route::Route;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Methods a route may be registered under by default
pub const STANDARD_METHODS: [&str; 8] = [
    "GET", "POST", "PATCH", "PUT", "DELETE", "HEAD", "OPTIONS", "CONNECT",
];

/// Registration-time route check
pub trait Validator: Send + Sync {
    /// Return the reason `route` is not well-formed, if any
    ///
    /// # Errors
    ///
    /// Returns the error to record on the route.
    fn validate(&self, route: &Route) -> Result<()>;

    /// Validator name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Rejects routes whose method is not in a fixed set
#[derive(Debug, Clone)]
pub struct MethodValidator {
    methods: HashSet<String>,
}

impl Default for MethodValidator {
    fn default() -> Self {
        Self::new(STANDARD_METHODS)
    }
}

impl MethodValidator {
    /// Accept exactly `methods` (compared case-sensitively)
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for MethodValidator {
    fn validate(&self, route: &Route) -> Result<()> {
        if self.methods.contains(route.method()) {
            Ok(())
        } else {
            Err(Error::BadMethod {
                method: route.method().to_string(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "MethodValidator"
    }
}

/// Requires a path matcher, and in strict mode a well-formed raw path
#[derive(Debug, Clone, Copy, Default)]
pub struct PathValidator {
    strict: bool,
}

impl PathValidator {
    /// Only require a path matcher
    #[must_use]
    pub const fn new() -> Self {
        Self { strict: false }
    }

    /// Also require the raw path to be non-empty and start with `/`
    #[must_use]
    pub const fn strict() -> Self {
        Self { strict: true }
    }
}

impl Validator for PathValidator {
    fn validate(&self, route: &Route) -> Result<()> {
        if !route.matchers().iter().any(|m| m.rank() == Rank::Path) {
            return Err(Error::MissingPath);
        }

        let path = route.raw_path();
        if self.strict && !path.starts_with('/') {
            return Err(Error::MalformedPath {
                path: path.to_string(),
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        if self.strict {
            "StrictPathValidator"
        } else {
            "PathValidator"
        }
    }
}

/// A registered route that carries a build error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteFailure {
    /// Method the route was registered under
    pub method: String,
    /// Raw path template
    pub path: String,
    /// Route name, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable error
    pub reason: String,
}

impl RouteFailure {
    /// Build a report for `route` if it carries an error
    #[must_use]
    pub fn from_route(route: &Route) -> Option<Self> {
        route.error().map(|err| Self {
            method: route.method().to_string(),
            path: route.raw_path().to_string(),
            name: route.get_name().map(String::from),
            reason: err.to_string(),
        })
    }
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Route -> Method: {} Path: {} Error: {}",
            self.method, self.path, self.reason
        )
    }
}
