//! # Path Templates
//!
//! Compiles a path template into a path [`Matcher`], the [`RouteKind`]
//! that drives cross-route ordering, and (for variable templates) the
//! index of placeholder segments.
//!
//! Classification is a lexical scan, in priority order:
//!
//! 1. a `#` anywhere makes the template a regular expression,
//! 2. a `:` anywhere makes it a variable template,
//! 3. anything else is a literal path.
//!
//! Compilation happens once, when the route is built. Variable
//! extraction later only re-splits the concrete request path and reads
//! segments at the recorded positions.

use crate::error::Result;
use crate::matcher::Matcher;
use crate::route::RouteKind;
use std::collections::{BTreeMap, HashMap};

/// Marks a template as a regular expression; stripped before compiling
pub const REGEX_SENTINEL: char = '#';

/// Prefix shared by all placeholder segments
pub const VAR_PREFIX: char = ':';

/// Placeholder accepting one or more ASCII digits
pub const DIGIT_PLACEHOLDER: &str = ":number";

/// Placeholder accepting one or more ASCII letters
pub const ALPHA_PLACEHOLDER: &str = ":string";

/// Placeholder token and the capture group it expands to
pub(crate) const PLACEHOLDERS: [(&str, &str); 2] = [
    (DIGIT_PLACEHOLDER, "([0-9]+)"),
    (ALPHA_PLACEHOLDER, "([a-zA-Z]+)"),
];

/// Placeholder key to zero-based path segment index
pub type VarIndex = BTreeMap<String, usize>;

/// Result of compiling a path template
#[derive(Debug, Clone)]
pub struct CompiledPath {
    /// Path matcher for the template
    pub matcher: Matcher,
    /// Kind selected by the compiler branch that fired
    pub kind: RouteKind,
    /// Placeholder positions; empty unless `kind` is `RouteKind::Vars`
    pub var_index: VarIndex,
}

/// Compile a path template
///
/// # Errors
///
/// Returns `Error::InvalidPattern` when a regex template does not compile.
pub fn compile(template: &str) -> Result<CompiledPath> {
    if template.contains(REGEX_SENTINEL) {
        return Ok(CompiledPath {
            matcher: Matcher::regex_path(template)?,
            kind: RouteKind::Regex,
            var_index: VarIndex::new(),
        });
    }

    if template.contains(VAR_PREFIX) {
        return Ok(CompiledPath {
            matcher: Matcher::variable_path(template)?,
            kind: RouteKind::Vars,
            var_index: var_index(template),
        });
    }

    Ok(CompiledPath {
        matcher: Matcher::literal_path(template),
        kind: RouteKind::Normal,
        var_index: VarIndex::new(),
    })
}

/// Record the position of every placeholder segment
///
/// A placeholder seen again gets a numeric suffix counting its repeats:
/// `/:number/:number` yields `:number -> 1` and `:number1 -> 2`.
pub fn var_index(template: &str) -> VarIndex {
    let mut index = VarIndex::new();
    let mut repeats: HashMap<&str, usize> = HashMap::new();

    for (position, segment) in template.split('/').enumerate() {
        if !segment.starts_with(VAR_PREFIX) {
            continue;
        }

        if !index.contains_key(segment) {
            index.insert(segment.to_string(), position);
            continue;
        }

        let count = repeats.entry(segment).or_insert(0);
        loop {
            *count += 1;
            let key = format!("{segment}{count}");
            if !index.contains_key(&key) {
                index.insert(key, position);
                break;
            }
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_literal() {
        let compiled = compile("/api/echo").unwrap();
        assert_eq!(compiled.kind, RouteKind::Normal);
        assert!(compiled.var_index.is_empty());
        assert!(matches!(compiled.matcher, Matcher::LiteralPath(ref p) if p == "/api/echo"));
    }

    #[test]
    fn test_compile_vars() {
        let compiled = compile("/api/user/:number").unwrap();
        assert_eq!(compiled.kind, RouteKind::Vars);
        assert!(matches!(compiled.matcher, Matcher::VariablePath(_)));
        assert_eq!(compiled.var_index.get(":number"), Some(&3));
    }

    #[test]
    fn test_compile_regex_wins_over_vars() {
        let compiled = compile("/#[a-z]+/:number").unwrap();
        assert_eq!(compiled.kind, RouteKind::Regex);
        assert!(matches!(compiled.matcher, Matcher::RegexPath(_)));
        assert!(compiled.var_index.is_empty());
    }

    #[test]
    fn test_compile_invalid_regex() {
        assert!(compile("/#(unclosed").is_err());
    }

    #[test]
    fn test_var_index_duplicates_get_suffix() {
        let index = var_index("/:number/:number");
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(":number"), Some(&1));
        assert_eq!(index.get(":number1"), Some(&2));
    }

    #[test]
    fn test_var_index_suffix_counts_per_placeholder() {
        let index = var_index("/:string/:number/:string/:number/:number");
        assert_eq!(index.get(":string"), Some(&1));
        assert_eq!(index.get(":number"), Some(&2));
        assert_eq!(index.get(":string1"), Some(&3));
        assert_eq!(index.get(":number1"), Some(&4));
        assert_eq!(index.get(":number2"), Some(&5));
    }

    #[test]
    fn test_var_index_suffix_skips_taken_keys() {
        let index = var_index("/:number1/:number/:number");
        assert_eq!(index.get(":number1"), Some(&1));
        assert_eq!(index.get(":number"), Some(&2));
        assert_eq!(index.get(":number2"), Some(&3));
    }

    #[test]
    fn test_var_index_ignores_embedded_prefix() {
        let index = var_index("/files/a:number/:string");
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(":string"), Some(&3));
    }
}
