//! Path rewriting.
//!
//! Built once from configuration, then shared by every request. Rule
//! tables are evaluated in declaration order and stop at the first rule
//! that matches; only the first occurrence of the match inside the path is
//! replaced.

use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use regex::Regex;

use crate::error::{ProxyError, Result};

/// User-supplied rewrite function. `None` leaves the path untouched.
pub trait RewriteFn: Send + Sync {
    fn rewrite(&self, path: &str, req: &Parts) -> Option<String>;
}

impl<F> RewriteFn for F
where
    F: Fn(&str, &Parts) -> Option<String> + Send + Sync,
{
    fn rewrite(&self, path: &str, req: &Parts) -> Option<String> {
        self(path, req)
    }
}

/// How a single rule recognises the part of the path it replaces.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    Literal(String),
    Pattern(Regex),
}

/// One `(matcher, replacement)` pair.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    matcher: RuleMatcher,
    replacement: String,
}

impl RewriteRule {
    /// Regex rule. Captures are referenced as `$1` or `${name}` in the replacement.
    pub fn pattern(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        if pattern.is_empty() {
            return Err(ProxyError::configuration("path rewrite pattern is empty"));
        }
        let regex = Regex::new(pattern).map_err(|e| {
            ProxyError::configuration(format!("invalid path rewrite pattern {:?}: {}", pattern, e))
        })?;
        Ok(Self {
            matcher: RuleMatcher::Pattern(regex),
            replacement: replacement.into(),
        })
    }

    /// Literal substring rule.
    pub fn literal(needle: impl Into<String>, replacement: impl Into<String>) -> Result<Self> {
        let needle = needle.into();
        if needle.is_empty() {
            return Err(ProxyError::configuration("path rewrite literal is empty"));
        }
        Ok(Self {
            matcher: RuleMatcher::Literal(needle),
            replacement: replacement.into(),
        })
    }

    /// Apply the rule, or `None` if it does not match `path`.
    fn apply(&self, path: &str) -> Option<String> {
        match &self.matcher {
            RuleMatcher::Literal(needle) => path
                .contains(needle.as_str())
                .then(|| path.replacen(needle.as_str(), &self.replacement, 1)),
            RuleMatcher::Pattern(regex) => regex
                .is_match(path)
                .then(|| regex.replace(path, self.replacement.as_str()).into_owned()),
        }
    }
}

/// Outcome of a rewrite attempt; only used to pick the log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// The path to forward (possibly identical to the input).
    Path(String),
    /// A custom function declined to rewrite.
    Declined,
}

/// Reusable rewriter closed over compiled rules.
#[derive(Clone)]
pub enum PathRewriter {
    Rules(Vec<RewriteRule>),
    Custom(Arc<dyn RewriteFn>),
}

impl PathRewriter {
    /// Build a rule table from `(pattern, replacement)` regex pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(k, v)| RewriteRule::pattern(k.as_ref(), v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Rules(rules))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &Parts) -> Option<String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn rewrite(&self, path: &str, req: &Parts) -> Rewrite {
        match self {
            PathRewriter::Rules(rules) => {
                let rewritten = rules
                    .iter()
                    .find_map(|rule| rule.apply(path))
                    .unwrap_or_else(|| path.to_string());
                Rewrite::Path(rewritten)
            }
            PathRewriter::Custom(f) => match f.rewrite(path, req) {
                Some(p) => Rewrite::Path(p),
                None => Rewrite::Declined,
            },
        }
    }
}

impl fmt::Debug for PathRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRewriter::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            PathRewriter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
