//! # Error Handling
//!
//! Centralized error types for pathmux core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Route build errors are attached to the offending route and never
//! surface in a response; the remaining variants belong to the serving
//! layer.

use crate::validator::RouteFailure;
use thiserror::Error;

/// Result type alias for pathmux operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the pathmux runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Method assigned at registration is not a recognized HTTP method
    #[error("Method not valid ({method})")]
    BadMethod {
        /// The rejected method
        method: String,
    },

    /// Route was registered without a path matcher
    #[error("Path matcher is missing")]
    MissingPath,

    /// Raw path is empty or does not start with `/`
    #[error("Path must be non-empty and start with '/', got {path:?}")]
    MalformedPath {
        /// The offending raw path
        path: String,
    },

    /// `Route::path` was called on a route that already has one
    #[error("route already has path {existing:?}, can't set {attempted:?}")]
    DuplicatePath {
        /// Path set by the first call
        existing: String,
        /// Path passed to the conflicting call
        attempted: String,
    },

    /// `Route::name` was called on a route that already has one
    #[error("route already has name {existing:?}, can't set {attempted:?}")]
    DuplicateName {
        /// Name set by the first call
        existing: String,
        /// Name passed to the conflicting call
        attempted: String,
    },

    /// Regular expression failed to compile
    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern as it was handed to the regex engine
        pattern: String,
        /// Compilation error from the regex engine
        #[source]
        source: regex::Error,
    },

    /// Header key is not a valid HTTP header name
    #[error("Invalid header name: {name:?}")]
    InvalidHeaderName {
        /// The rejected key
        name: String,
    },

    /// One or more registered routes carry a build error
    #[error("{} route(s) failed validation", failures.len())]
    InvalidRoutes {
        /// Every failed route with its recorded error
        failures: Vec<RouteFailure>,
    },

    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}
