//! Route pattern compilation and matching.
//!
//! A pattern is a `/`-separated list of segments. A segment of the form
//! `:name` binds exactly one path segment to `name`, a final `*` segment
//! matches one or more trailing characters, and every other segment matches
//! only itself.

use indexmap::IndexMap;
use regex::Regex;

use crate::router::error::Error;

/// Path parameters bound by a match, in the order they appear in the pattern.
pub type Params = IndexMap<String, String>;

/// How specific a pattern is; lower sorts first during resolution.
///
/// A `*` wildcard does not bind a parameter, so `/files/*` ranks with the
/// literal patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    /// No `:name` segments.
    Literal,
    /// At least one `:name` segment.
    Parameterized,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    param_names: Vec<String>,
    specificity: Specificity,
}

impl Pattern {
    /// Compile a pattern string.
    ///
    /// Fails when a parameter has no name, a parameter name repeats, or a
    /// `*` segment is followed by further segments.
    pub fn compile(pattern: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = pattern.split('/').collect();
        let last = segments.len() - 1;

        let mut expr = String::from("^");
        let mut param_names: Vec<String> = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            if index > 0 {
                expr.push('/');
            }

            if *segment == "*" {
                if index != last {
                    return Err(invalid("`*` is only allowed as the last segment"));
                }
                expr.push_str("(.+)");
            } else if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("parameter segment has no name"));
                }
                if param_names.iter().any(|existing| existing == name) {
                    return Err(invalid(&format!("parameter `{name}` appears more than once")));
                }
                param_names.push(name.to_string());
                expr.push_str("([^/]+)");
            } else {
                expr.push_str(&regex::escape(segment));
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| invalid(&e.to_string()))?;

        let specificity = if param_names.is_empty() {
            Specificity::Literal
        } else {
            Specificity::Parameterized
        };

        Ok(Self {
            source: pattern.to_string(),
            regex,
            param_names,
            specificity,
        })
    }

    /// The pattern exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names, left to right.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Whether `path` matches. Unless `strict`, `/a` and `/a/` are the same path.
    pub fn matches(&self, path: &str, strict: bool) -> bool {
        candidates(path, strict)
            .iter()
            .any(|candidate| self.regex.is_match(candidate))
    }

    /// Bind this pattern's parameters against `path`.
    ///
    /// Returns `None` when the path does not match or when the pattern has
    /// no named parameters.
    pub fn extract(&self, path: &str, strict: bool) -> Option<Params> {
        if self.param_names.is_empty() {
            return None;
        }

        candidates(path, strict).iter().find_map(|candidate| {
            let captures = self.regex.captures(candidate)?;
            Some(
                self.param_names
                    .iter()
                    .enumerate()
                    .filter_map(|(index, name)| {
                        captures
                            .get(index + 1)
                            .map(|value| (name.clone(), value.as_str().to_string()))
                    })
                    .collect(),
            )
        })
    }
}

/// The spellings of `path` a pattern is tried against.
fn candidates(path: &str, strict: bool) -> Vec<String> {
    if strict {
        vec![path.to_string()]
    } else {
        let stripped = strip_trailing_slash(path);
        vec![stripped.to_string(), format!("{stripped}/")]
    }
}

/// Remove one trailing `/`, leaving the root path alone.
pub fn strip_trailing_slash(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// Match `path` against an uncompiled pattern with trailing-slash leniency.
///
/// A pattern that does not compile matches nothing.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    Pattern::compile(pattern)
        .map(|compiled| compiled.matches(path, false))
        .unwrap_or(false)
}

/// Bind the named parameters of an uncompiled pattern against `path`.
pub fn extract_params(path: &str, pattern: &str) -> Option<Params> {
    Pattern::compile(pattern).ok()?.extract(path, false)
}
