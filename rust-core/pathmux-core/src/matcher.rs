//! # Matcher Primitives
//!
//! Pure predicates over a [`Request`]. A route accepts a request only when
//! every one of its matchers does.
//!
//! Each matcher carries two pieces of metadata that never influence the
//! match decision itself:
//!
//! - [`Rank`] classifies the matcher (any / path / scheme) and is what the
//!   path-presence validator looks for.
//! - [`Matcher::sort_priority`] is the position the matcher takes when a
//!   route's matcher list is reordered by `Router::sort_routes`.
//!
//! Patterns are compiled once, in the constructors; matching only runs
//! the compiled form.

use crate::error::{Error, Result};
use crate::request::Request;
use crate::template::{PLACEHOLDERS, REGEX_SENTINEL};
use hyper::header::HeaderName;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Boolean function of a request, used by [`Matcher::Custom`]
pub type Predicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Classification of a matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    /// Header and custom predicates
    Any,
    /// Literal, variable and regex path matchers
    Path,
    /// Scheme matcher
    Scheme,
}

/// A compiled path pattern together with the template it came from
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
}

impl PathPattern {
    /// Template as supplied at registration
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Anchored pattern handed to the regex engine
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// How a configured header value is compared with the request's values
#[derive(Debug, Clone)]
pub enum Comparison {
    /// Header must be present; any value is accepted
    Present,
    /// At least one value must equal this string
    Exact(String),
    /// At least one value must match this regular expression
    Pattern(Regex),
}

impl Comparison {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Present => true,
            Self::Exact(expected) => expected == value,
            Self::Pattern(regex) => regex.is_match(value),
        }
    }
}

/// Header rules; every rule must be satisfied
#[derive(Debug, Clone)]
pub struct HeaderRules {
    rules: Vec<(HeaderName, Comparison)>,
}

impl HeaderRules {
    fn matches(&self, req: &Request) -> bool {
        self.rules.iter().all(|(name, comparison)| {
            let mut values = req.headers().get_all(name).into_iter().peekable();
            if values.peek().is_none() {
                return false;
            }
            if matches!(comparison, Comparison::Present) {
                return true;
            }
            values.any(|v| v.to_str().is_ok_and(|v| comparison.accepts(v)))
        })
    }

    /// Configured (canonical key, comparison) pairs
    #[must_use]
    pub fn rules(&self) -> &[(HeaderName, Comparison)] {
        &self.rules
    }
}

/// Wrapper giving custom predicates a `Debug` impl
#[derive(Clone)]
pub struct CustomPredicate(Predicate);

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

/// A single match condition
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact, byte-for-byte path equality
    LiteralPath(String),
    /// Path template with digit/alpha placeholders
    VariablePath(PathPattern),
    /// Path template written as a regular expression
    RegexPath(PathPattern),
    /// Request scheme must be one of these (lower-case)
    Scheme(HashSet<String>),
    /// Request headers must satisfy every rule
    Header(HeaderRules),
    /// Arbitrary predicate
    Custom(CustomPredicate),
}

impl Matcher {
    /// Exact path matcher
    ///
    /// When the router lower-cases incoming paths the pattern must already
    /// be lower-case to ever match.
    pub fn literal_path(path: impl Into<String>) -> Self {
        Self::LiteralPath(path.into())
    }

    /// Variable path matcher
    ///
    /// Every `:number` becomes a digit capture group and every `:string`
    /// an alpha capture group; the remaining text is matched literally
    /// and the pattern is anchored at both ends.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if the generated pattern is rejected.
    pub fn variable_path(template: &str) -> Result<Self> {
        let pattern = variable_pattern(template);
        let regex = compile(pattern)?;
        Ok(Self::VariablePath(PathPattern {
            template: template.to_string(),
            regex,
        }))
    }

    /// Regex path matcher
    ///
    /// Every `#` is stripped from the template and the remainder is
    /// anchored and compiled as a regular expression.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if the expression does not compile.
    pub fn regex_path(template: &str) -> Result<Self> {
        let pattern = format!("^{}$", template.replace(REGEX_SENTINEL, ""));
        let regex = compile(pattern)?;
        Ok(Self::RegexPath(PathPattern {
            template: template.to_string(),
            regex,
        }))
    }

    /// Scheme matcher; schemes are compared case-insensitively
    pub fn scheme<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Scheme(
            schemes
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }

    /// Header matcher comparing values for equality
    ///
    /// An empty value only requires the header to be present.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeaderName` for a key that is not a valid
    /// header name.
    pub fn header<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        header_rules(pairs, |value| Ok(Comparison::Exact(value.to_string())))
    }

    /// Header matcher comparing values against regular expressions
    ///
    /// An empty value only requires the header to be present.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeaderName` for an invalid key and
    /// `Error::InvalidPattern` for an expression that does not compile.
    pub fn header_regex<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        header_rules(pairs, |value| compile(value.to_string()).map(Comparison::Pattern))
    }

    /// Custom predicate matcher
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomPredicate(Arc::new(f)))
    }

    /// Evaluate the matcher against a request
    #[must_use]
    pub fn matches(&self, req: &Request) -> bool {
        match self {
            Self::LiteralPath(path) => path == req.path(),
            Self::VariablePath(pattern) | Self::RegexPath(pattern) => pattern.is_match(req.path()),
            Self::Scheme(schemes) => schemes.contains(&req.scheme().to_ascii_lowercase()),
            Self::Header(rules) => rules.matches(req),
            Self::Custom(CustomPredicate(f)) => f(req),
        }
    }

    /// Classification used by validators and tooling
    #[must_use]
    pub const fn rank(&self) -> Rank {
        match self {
            Self::Header(_) | Self::Custom(_) => Rank::Any,
            Self::LiteralPath(_) | Self::VariablePath(_) | Self::RegexPath(_) => Rank::Path,
            Self::Scheme(_) => Rank::Scheme,
        }
    }

    /// Position within a route's matcher list after sorting; lower first
    #[must_use]
    pub const fn sort_priority(&self) -> u8 {
        match self {
            Self::Header(_) | Self::Custom(_) => 0,
            Self::LiteralPath(_) | Self::VariablePath(_) | Self::RegexPath(_) => 1,
            Self::Scheme(_) => 2,
        }
    }
}

fn compile(pattern: String) -> Result<Regex> {
    Regex::new(&pattern).map_err(|source| Error::InvalidPattern { pattern, source })
}

/// Build the anchored pattern for a variable template
fn variable_pattern(template: &str) -> String {
    let mut pattern = String::with_capacity(template.len() + 16);
    pattern.push('^');

    let mut rest = template;
    while let Some((idx, token, class)) = next_placeholder(rest) {
        pattern.push_str(&regex::escape(&rest[..idx]));
        pattern.push_str(class);
        rest = &rest[idx + token.len()..];
    }
    pattern.push_str(&regex::escape(rest));

    pattern.push('$');
    pattern
}

/// Earliest placeholder in `s` as (byte offset, token, capture group)
fn next_placeholder(s: &str) -> Option<(usize, &'static str, &'static str)> {
    PLACEHOLDERS
        .iter()
        .filter_map(|&(token, class)| s.find(token).map(|idx| (idx, token, class)))
        .min_by_key(|&(idx, _, _)| idx)
}

fn header_rules<I, K, V, F>(pairs: I, build: F) -> Result<Matcher>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
    F: Fn(&str) -> Result<Comparison>,
{
    let mut rules = Vec::new();
    for (key, value) in pairs {
        let key = key.as_ref();
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidHeaderName {
            name: key.to_string(),
        })?;

        let value = value.as_ref();
        let comparison = if value.is_empty() {
            Comparison::Present
        } else {
            build(value)?
        };
        rules.push((name, comparison));
    }
    Ok(Matcher::Header(HeaderRules { rules }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn get(path: &str) -> Request {
        Request::new("GET", path, HashMap::new(), None)
    }

    #[test]
    fn test_path_matchers() {
        let cases = [
            ("/api/echo", "/api/echo", Matcher::literal_path("/api/echo")),
            ("/user/:number", "/user/1", Matcher::variable_path("/user/:number").unwrap()),
            (
                "/user/:number/comment/:number",
                "/user/1/comment/99",
                Matcher::variable_path("/user/:number/comment/:number").unwrap(),
            ),
            ("/article/:string", "/article/golang", Matcher::variable_path("/article/:string").unwrap()),
            (
                "/article/:string/comment/:number/subcomment/:number",
                "/article/golang/comment/4/subcomment/5",
                Matcher::variable_path("/article/:string/comment/:number/subcomment/:number").unwrap(),
            ),
            (
                "/:number/:number/:number/:number/:number",
                "/1/1/1/1/1",
                Matcher::variable_path("/:number/:number/:number/:number/:number").unwrap(),
            ),
            (
                "/#([a-z]){1,}/#([0-9]){1,}/#([a-z]){1,}",
                "/dummy/1/dummy",
                Matcher::regex_path("/#([a-z]){1,}/#([0-9]){1,}/#([a-z]){1,}").unwrap(),
            ),
        ];

        for (template, path, matcher) in cases {
            assert!(matcher.matches(&get(path)), "{template} should match {path}");
            assert_eq!(matcher.rank(), Rank::Path);
        }
    }

    #[test]
    fn test_literal_path_fail() {
        let matcher = Matcher::literal_path("/api/v2");
        assert!(!matcher.matches(&get("/api/v1")));
        assert!(!matcher.matches(&get("/api/v2/")));
    }

    #[test]
    fn test_literal_path_does_not_interpret_placeholders() {
        let matcher = Matcher::literal_path("/api/:number");
        assert!(!matcher.matches(&get("/api/echo")));
    }

    #[test]
    fn test_variable_path_segment_classes() {
        let matcher = Matcher::variable_path("/user/:number/:string").unwrap();
        assert!(matcher.matches(&get("/user/42/alice")));
        assert!(!matcher.matches(&get("/user/abc/alice")));
        assert!(!matcher.matches(&get("/user/42/al1ce")));
        assert!(!matcher.matches(&get("/user/42")));
        assert!(!matcher.matches(&get("/user/42/alice/extra")));
    }

    #[test]
    fn test_variable_path_escapes_literal_text() {
        let matcher = Matcher::variable_path("/v1.0/:number").unwrap();
        assert!(matcher.matches(&get("/v1.0/7")));
        assert!(!matcher.matches(&get("/v1x0/7")));
        if let Matcher::VariablePath(pattern) = &matcher {
            assert_eq!(pattern.as_str(), r"^/v1\.0/([0-9]+)$");
            assert_eq!(pattern.template(), "/v1.0/:number");
        } else {
            panic!("expected a variable path matcher");
        }
    }

    #[test]
    fn test_regex_path_is_anchored() {
        let matcher = Matcher::regex_path("/#[a-z]+").unwrap();
        assert!(matcher.matches(&get("/abc")));
        assert!(!matcher.matches(&get("/abc/def")));
        assert!(!matcher.matches(&get("/x/abc")));
    }

    #[test]
    fn test_regex_path_invalid() {
        let err = Matcher::regex_path("/#([a-z").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_scheme_matcher() {
        let matcher = Matcher::scheme(["HTTPS", "ftp"]);
        assert_eq!(matcher.rank(), Rank::Scheme);
        assert!(matcher.matches(&get("/").with_scheme("https")));
        assert!(matcher.matches(&get("/").with_scheme("FTP")));
        assert!(!matcher.matches(&get("/").with_scheme("http")));
    }

    #[test]
    fn test_header_matcher() {
        let matcher = Matcher::header([("content-type", "application/json")]).unwrap();
        assert_eq!(matcher.rank(), Rank::Any);

        let req = get("/").with_header("Content-Type", "application/json");
        assert!(matcher.matches(&req));

        let req = get("/").with_header("Content-Type", "text/html");
        assert!(!matcher.matches(&req));

        assert!(!matcher.matches(&get("/")));
    }

    #[test]
    fn test_header_matcher_any_of_many_values() {
        let matcher = Matcher::header([("Accept", "application/json")]).unwrap();
        let req = get("/")
            .with_header("Accept", "text/html")
            .with_header("Accept", "application/json");
        assert!(matcher.matches(&req));
    }

    #[test]
    fn test_header_matcher_empty_value_means_present() {
        let matcher = Matcher::header([("X-Requested-With", "")]).unwrap();
        assert!(matcher.matches(&get("/").with_header("x-requested-with", "anything")));
        assert!(!matcher.matches(&get("/")));
    }

    #[test]
    fn test_header_present_accepts_opaque_value() {
        use hyper::header::HeaderValue;

        let matcher = Matcher::header([("X-Name", "")]).unwrap();
        let opaque = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let req = get("/").with_header_value(HeaderName::from_static("x-name"), opaque.clone());
        assert!(matcher.matches(&req));

        let exact = Matcher::header([("X-Name", "cafe")]).unwrap();
        let req = get("/").with_header_value(HeaderName::from_static("x-name"), opaque);
        assert!(!exact.matches(&req));
    }

    #[test]
    fn test_header_matcher_all_pairs_required() {
        let matcher = Matcher::header([
            ("Content-Type", "application/json"),
            ("X-Requested-With", "XMLHttpRequest"),
        ])
        .unwrap();

        let partial = get("/").with_header("Content-Type", "application/json");
        assert!(!matcher.matches(&partial));

        let full = partial.with_header("X-Requested-With", "XMLHttpRequest");
        assert!(matcher.matches(&full));
    }

    #[test]
    fn test_header_regex_matcher() {
        let matcher = Matcher::header_regex([("content-type", "application/(json|html)")]).unwrap();
        assert!(matcher.matches(&get("/").with_header("Content-Type", "application/json")));
        assert!(!matcher.matches(&get("/").with_header("Content-Type", "text/plain")));
    }

    #[test]
    fn test_header_regex_invalid_pattern() {
        let err = Matcher::header_regex([("content-type", "application/(json")]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_header_invalid_name() {
        let err = Matcher::header([("bad header", "x")]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderName { .. }));
    }

    #[test]
    fn test_custom_matcher() {
        let matcher = Matcher::custom(|req| req.path().starts_with("/admin"));
        assert_eq!(matcher.rank(), Rank::Any);
        assert!(matcher.matches(&get("/admin/users")));
        assert!(!matcher.matches(&get("/users")));
    }

    #[test]
    fn test_sort_priority_follows_rank_scale() {
        let any = Matcher::custom(|_| true);
        let path = Matcher::literal_path("/");
        let scheme = Matcher::scheme(["https"]);
        assert!(any.sort_priority() < path.sort_priority());
        assert!(path.sort_priority() < scheme.sort_priority());
    }
}
