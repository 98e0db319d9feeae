//! Dynamic upstream target resolution.
//!
//! # Responsibilities
//! - Resolve a per-request target from a static table or a user function
//! - Validate whatever the router returns before it is used
//!
//! # Design Decisions
//! - Table entries are tried in declaration order, first hit wins
//! - Keys without `/` compare exactly against the `Host` header
//! - Keys with `/` match when `host + path` starts with the key
//! - Keys starting with `/` match on the path alone
//! - The router never touches the shared configuration; callers apply the result to a clone

use std::fmt;
use std::sync::Arc;

use axum::http::{header, request::Parts};
use url::Url;

use crate::error::{BoxError, ProxyError, Result};

/// User-supplied routing function. `Ok(None)` keeps the configured target.
pub trait RouteFn: Send + Sync {
    fn route(&self, req: &Parts) -> std::result::Result<Option<String>, BoxError>;
}

impl<F> RouteFn for F
where
    F: Fn(&Parts) -> std::result::Result<Option<String>, BoxError> + Send + Sync,
{
    fn route(&self, req: &Parts) -> std::result::Result<Option<String>, BoxError> {
        self(req)
    }
}

#[derive(Clone)]
pub enum TargetRouter {
    Table(Vec<(String, Url)>),
    Custom(Arc<dyn RouteFn>),
}

impl TargetRouter {
    /// Build a routing table, parsing every target up front.
    pub fn table<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let table = entries
            .into_iter()
            .map(|(key, target)| {
                let url = parse_target(target.as_ref()).map_err(|e| {
                    ProxyError::configuration(format!("router entry {:?}: {}", target.as_ref(), e))
                })?;
                Ok((key.into(), url))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Table(table))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Parts) -> std::result::Result<Option<String>, BoxError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Resolve the target for `req`, or `None` to keep the configured one.
    ///
    /// `path` is the request's original path; rewriting has not happened yet.
    pub fn resolve(&self, req: &Parts, path: &str) -> Result<Option<Url>> {
        match self {
            TargetRouter::Table(table) => {
                let host = req
                    .headers
                    .get(header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .or_else(|| req.uri.authority().map(|a| a.as_str()))
                    .unwrap_or_default();
                let host_path = format!("{}{}", host, path);

                let hit = table.iter().find(|(key, _)| {
                    if key.starts_with('/') {
                        path.starts_with(key.as_str())
                    } else if key.contains('/') {
                        host_path.starts_with(key.as_str())
                    } else {
                        key.as_str() == host
                    }
                });
                Ok(hit.map(|(_, url)| url.clone()))
            }
            TargetRouter::Custom(f) => {
                let resolved = f
                    .route(req)
                    .map_err(|e| ProxyError::resolution(format!("router failed: {}", e)))?;
                match resolved {
                    Some(target) => parse_target(&target)
                        .map(Some)
                        .map_err(|e| ProxyError::resolution(format!("router target {:?}: {}", target, e))),
                    None => Ok(None),
                }
            }
        }
    }
}

impl fmt::Debug for TargetRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRouter::Table(table) => {
                let keys: Vec<_> = table.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                f.debug_tuple("Table").field(&keys).finish()
            }
            TargetRouter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Parse an upstream base URI. Only plain `http` upstreams can be reached.
pub fn parse_target(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}
