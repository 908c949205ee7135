//! # pathmux core
//!
//! Request-dispatch core: given a set of registered routes, pick the
//! first route whose matchers all accept a request and hand it the
//! request, after canonicalizing the request path.
//!
//! ## Architecture
//!
//! Routes are compiled once at registration and never mutated during
//! dispatch. After [`Router::sort_routes`] the registry is read-only and
//! can be shared across connections behind an `Arc`.
//!
//! ## Modules
//!
//! - `matcher` - Request predicates (path, scheme, header, custom)
//! - `template` - Path-template compiler (`:number`, `:string`, `#regex`)
//! - `route` - Route builder with sticky build errors
//! - `validator` - Registration-time route checks
//! - `router` - Route registry, dispatch, precedence sort, path cleaning
//! - `request` - HTTP request wrapper with per-request context
//! - `context` - Matched route, path variables and query values
//! - `response` - HTTP response and conversion into Hyper
//! - `server` - HTTP server built on Hyper
//! - `config` - Router flags
//! - `logging` - Tracing subscriber bootstrap
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod template;
pub mod validator;

pub use config::RouterConfig;
pub use context::{Queries, RequestContext, Vars};
pub use error::{Error, Result};
pub use matcher::{Matcher, Rank};
pub use request::Request;
pub use response::Response;
pub use route::{handler_fn, Handler, Route, RouteInfo, RouteKind};
pub use router::{clean_path, Router};
pub use server::{Server, ServerConfig};
pub use validator::{MethodValidator, PathValidator, RouteFailure, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
