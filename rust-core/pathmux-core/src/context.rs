//! # Per-Request Context
//!
//! Values the router attaches to a request after a successful match:
//! the matched route, the path variables of a variable-template route,
//! and the parsed query values.

use crate::request::percent_decode;
use crate::route::RouteInfo;
use std::collections::HashMap;

/// Path variables keyed by placeholder token (e.g. `:number`, `:number1`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(HashMap<String, String>);

impl Vars {
    /// Get a variable by placeholder token
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// All variables
    #[must_use]
    pub const fn all(&self) -> &HashMap<String, String> {
        &self.0
    }

    /// Number of variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no variables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Vars {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Multi-valued query parameters
///
/// Repeated keys accumulate, and every value is further split on `,`,
/// so `?tag=a,b&tag=c` yields `["a", "b", "c"]` for `tag`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queries(HashMap<String, Vec<String>>);

impl Queries {
    /// Parse a raw query string
    #[must_use]
    pub fn parse(query: Option<&str>) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();

        for pair in query.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = percent_decode(key, true);
            let value = percent_decode(value, true);

            params
                .entry(key)
                .or_default()
                .extend(value.split(',').map(String::from));
        }

        Self(params)
    }

    /// All values for `key`; empty when the key is absent
    #[must_use]
    pub fn get(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// First value for `key`
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }

    /// All query parameters
    #[must_use]
    pub const fn all(&self) -> &HashMap<String, Vec<String>> {
        &self.0
    }
}

/// Per-request store filled in by the router before the handler runs
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Snapshot of the matched route
    pub route: Option<RouteInfo>,
    /// Extracted path variables; only set for variable-template routes
    pub vars: Option<Vars>,
    /// Parsed query values
    pub queries: Option<Queries>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_simple() {
        let q = Queries::parse(Some("page=1&limit=10"));
        assert_eq!(q.first("page"), Some("1"));
        assert_eq!(q.first("limit"), Some("10"));
    }

    #[test]
    fn test_queries_comma_split_and_repeat() {
        let q = Queries::parse(Some("tag=a,b&tag=c"));
        assert_eq!(q.get("tag"), ["a", "b", "c"]);
    }

    #[test]
    fn test_queries_url_encoded() {
        let q = Queries::parse(Some("name=John+Doe&city=New%20York"));
        assert_eq!(q.first("name"), Some("John Doe"));
        assert_eq!(q.first("city"), Some("New York"));
    }

    #[test]
    fn test_queries_missing_key() {
        let q = Queries::parse(None);
        assert!(q.get("anything").is_empty());
        assert!(q.all().is_empty());
    }

    #[test]
    fn test_queries_key_without_value() {
        let q = Queries::parse(Some("flag&&x="));
        assert_eq!(q.get("flag"), [""]);
        assert_eq!(q.get("x"), [""]);
    }

    #[test]
    fn test_vars_lookup() {
        let vars: Vars = [(":number".to_string(), "42".to_string())]
            .into_iter()
            .collect();
        assert_eq!(vars.get(":number"), Some("42"));
        assert_eq!(vars.get(":string"), None);
        assert_eq!(vars.len(), 1);
    }
}
