//! # Router Configuration
//!
//! Flags controlling top-level request handling. Every field has a
//! default, so a JSON document only needs the keys it overrides.

use crate::error::Result;
use serde::Deserialize;

/// Router behaviour flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Redirect requests whose path is not canonical (default: true)
    pub clean_path: bool,
    /// Match paths without lower-casing them first (default: false)
    pub case_sensitive: bool,
    /// Canonicalize the still-encoded path instead of the decoded one
    pub use_encoded_path: bool,
    /// Require registered paths to start with `/`
    pub strict_paths: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            clean_path: true,
            case_sensitive: false,
            use_encoded_path: false,
            strict_paths: false,
        }
    }
}

impl RouterConfig {
    /// Load configuration from a JSON document
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the document is not valid JSON or a field
    /// has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert!(config.clean_path);
        assert!(!config.case_sensitive);
        assert!(!config.use_encoded_path);
        assert!(!config.strict_paths);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RouterConfig::from_json(r#"{"case_sensitive": true}"#).unwrap();
        assert!(config.case_sensitive);
        assert!(config.clean_path);
    }

    #[test]
    fn test_from_json_empty_object() {
        assert_eq!(RouterConfig::from_json("{}").unwrap(), RouterConfig::default());
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(RouterConfig::from_json(r#"{"clean_path": "yes"}"#).is_err());
        assert!(RouterConfig::from_json("not json").is_err());
    }
}
