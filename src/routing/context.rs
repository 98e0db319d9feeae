//! Context matching: should this request be proxied at all?
//!
//! # Responsibilities
//! - Literal path prefixes, segment-boundary safe (`/api` never matches `/apixyz`)
//! - Glob patterns compiled once, with `!pattern` exclusions
//! - User predicates over (path, request)
//!
//! # Design Decisions
//! - Literal prefixes are tested against path + query, globs against the path only
//! - A prefix that ends in `/` matches everything below it, so `/` matches all
//! - A failing predicate is a configuration error, never a silent "no match"

use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use glob::{MatchOptions, Pattern};

use crate::error::{BoxError, ProxyError, Result};

/// User-supplied context predicate.
pub trait ContextPredicate: Send + Sync {
    fn test(&self, path: &str, req: &Parts) -> std::result::Result<bool, BoxError>;
}

impl<F> ContextPredicate for F
where
    F: Fn(&str, &Parts) -> std::result::Result<bool, BoxError> + Send + Sync,
{
    fn test(&self, path: &str, req: &Parts) -> std::result::Result<bool, BoxError> {
        self(path, req)
    }
}

/// Configured proxy scope, before compilation.
#[derive(Clone)]
pub enum ContextPattern {
    /// Single literal path prefix.
    Prefix(String),
    /// Any of several literal prefixes.
    Prefixes(Vec<String>),
    /// Single glob pattern.
    Glob(String),
    /// Glob list; entries starting with `!` exclude, plain entries may be literal prefixes.
    Globs(Vec<String>),
    /// Arbitrary predicate.
    Predicate(Arc<dyn ContextPredicate>),
}

impl ContextPattern {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &Parts) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }
}

impl Default for ContextPattern {
    fn default() -> Self {
        Self::Prefix("/".to_string())
    }
}

impl fmt::Debug for ContextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            Self::Prefixes(p) => f.debug_tuple("Prefixes").field(p).finish(),
            Self::Glob(p) => f.debug_tuple("Glob").field(p).finish(),
            Self::Globs(p) => f.debug_tuple("Globs").field(p).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for ContextPattern {
    fn from(value: &str) -> Self {
        if is_glob(value) {
            Self::Glob(value.to_string())
        } else {
            Self::Prefix(value.to_string())
        }
    }
}

impl From<String> for ContextPattern {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<String>> for ContextPattern {
    fn from(values: Vec<String>) -> Self {
        if values.iter().any(|v| is_glob(v)) {
            Self::Globs(values)
        } else {
            Self::Prefixes(values)
        }
    }
}

/// Whether a context string should be compiled as a glob.
pub fn is_glob(value: &str) -> bool {
    value.starts_with('!') || value.contains('*') || value.contains('[')
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

enum Compiled {
    Patterns {
        prefixes: Vec<String>,
        include: Vec<Pattern>,
        exclude: Vec<Pattern>,
    },
    Predicate(Arc<dyn ContextPredicate>),
}

/// Compiled, immutable context matcher.
pub struct ContextMatcher {
    description: String,
    compiled: Compiled,
}

impl ContextMatcher {
    pub fn compile(pattern: ContextPattern) -> Result<Self> {
        let description = format!("{:?}", pattern);
        let compiled = match pattern {
            ContextPattern::Prefix(p) => Compiled::Patterns {
                prefixes: vec![p],
                include: Vec::new(),
                exclude: Vec::new(),
            },
            ContextPattern::Prefixes(list) => {
                if list.is_empty() {
                    return Err(ProxyError::configuration("context prefix list is empty"));
                }
                Compiled::Patterns {
                    prefixes: list,
                    include: Vec::new(),
                    exclude: Vec::new(),
                }
            }
            ContextPattern::Glob(g) => compile_globs(vec![g])?,
            ContextPattern::Globs(list) => {
                if list.is_empty() {
                    return Err(ProxyError::configuration("context glob list is empty"));
                }
                compile_globs(list)?
            }
            ContextPattern::Predicate(p) => Compiled::Predicate(p),
        };
        Ok(Self { description, compiled })
    }

    /// Decide whether `path` (path + optional query) is in scope.
    pub fn matches(&self, path: &str, req: &Parts) -> Result<bool> {
        match &self.compiled {
            Compiled::Patterns { prefixes, include, exclude } => {
                let pathname = path.split('?').next().unwrap_or(path);
                if exclude.iter().any(|p| p.matches_with(pathname, GLOB_OPTIONS)) {
                    return Ok(false);
                }
                if prefixes.is_empty() && include.is_empty() {
                    return Ok(true);
                }
                Ok(prefixes.iter().any(|p| prefix_matches(p, path))
                    || include.iter().any(|p| p.matches_with(pathname, GLOB_OPTIONS)))
            }
            Compiled::Predicate(predicate) => predicate.test(path, req).map_err(|e| {
                ProxyError::configuration(format!("context predicate failed: {}", e))
            }),
        }
    }
}

impl fmt::Debug for ContextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Display for ContextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

fn compile_globs(list: Vec<String>) -> Result<Compiled> {
    let mut prefixes = Vec::new();
    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for entry in list {
        if let Some(negated) = entry.strip_prefix('!') {
            exclude.push(compile_glob(negated)?);
        } else if is_glob(&entry) {
            include.push(compile_glob(&entry)?);
        } else {
            prefixes.push(entry);
        }
    }

    Ok(Compiled::Patterns { prefixes, include, exclude })
}

fn compile_glob(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| {
        ProxyError::configuration(format!("invalid context glob {:?}: {}", pattern, e))
    })
}

/// `path` starts with `prefix` and the match ends on a segment boundary.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => {
            prefix.ends_with('/')
                || rest.is_empty()
                || rest.starts_with('/')
                || rest.starts_with('?')
        }
        None => false,
    }
}
