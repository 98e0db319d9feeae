//! Request preparation.
//!
//! # Responsibilities
//! - Clone per-request options from the shared config
//! - Apply the router, then the path rewriter (fixed order)
//! - Describe the outbound request as an [`OutboundRequestSpec`]
//!
//! # Design Decisions
//! - Routing sees the ORIGINAL path; rewriting happens afterwards
//! - The request's own URI is rewritten in place, the inbound URI stays in `OriginalUri`
//! - Only `Content-Type` is propagated upstream, defaulting to `text/html`

use std::fmt;

use axum::body::{Body, Bytes};
use axum::extract::OriginalUri;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Uri};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::routing::rewrite::Rewrite;

/// Per-request copy of the tunable options. Never shared between requests.
#[derive(Debug, Clone, Default)]
pub struct ProxyOptions {
    pub target: Option<Url>,
}

/// Request extension carrying a body that an earlier layer already buffered.
///
/// When present it is sent instead of piping the inbound stream.
#[derive(Debug, Clone)]
pub struct PostData(pub Bytes);

/// Outbound body: already in memory, or piped from the inbound request.
pub enum OutboundBody {
    Buffered(Bytes),
    Streamed(Body),
}

impl OutboundBody {
    pub fn into_body(self) -> Body {
        match self {
            OutboundBody::Buffered(bytes) => Body::from(bytes),
            OutboundBody::Streamed(body) => body,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, OutboundBody::Buffered(_))
    }
}

impl fmt::Debug for OutboundBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            OutboundBody::Streamed(_) => f.write_str("Streamed"),
        }
    }
}

/// Everything needed to issue the outbound request.
///
/// `host`, `port` and `path` decide where the request goes; `target` is
/// only the routing result they were derived from, kept for logging.
/// A hook that wants to send elsewhere changes `host` / `port`.
#[derive(Debug)]
pub struct OutboundRequestSpec {
    /// Resolved upstream base URI (after routing). Informational.
    pub target: Url,
    pub host: String,
    pub port: u16,
    pub method: Method,
    /// Target base path joined with the (possibly rewritten) request path.
    pub path: String,
    pub headers: HeaderMap,
    pub body: OutboundBody,
}

impl OutboundRequestSpec {
    /// Derive the outbound request from prepared options and the inbound request.
    pub fn build(options: ProxyOptions, parts: &mut Parts, inbound: Body) -> Result<Self> {
        let target = options
            .target
            .ok_or_else(|| ProxyError::resolution("no target configured and router returned none"))?;
        let host = target
            .host_str()
            .ok_or_else(|| ProxyError::resolution(format!("target {} has no host", target)))?
            .to_string();
        let port = target.port_or_known_default().unwrap_or(80);

        let request_path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let path = join_path(target.path(), request_path);

        let mut headers = HeaderMap::new();
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("text/html"));
        headers.insert(header::CONTENT_TYPE, content_type);

        let body = match parts.extensions.remove::<PostData>() {
            Some(PostData(bytes)) => OutboundBody::Buffered(bytes),
            None => OutboundBody::Streamed(inbound),
        };

        Ok(Self {
            target,
            host,
            port,
            method: parts.method.clone(),
            path,
            headers,
            body,
        })
    }

    /// Absolute URI for the HTTP client.
    pub fn uri(&self) -> Result<Uri> {
        format!("http://{}:{}{}", self.host, self.port, self.path)
            .parse()
            .map_err(|e| ProxyError::resolution(format!("invalid outbound uri: {}", e)))
    }
}

/// Join a target base path and a request path without doubling `/`.
pub fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let joined = if path.starts_with('/') {
        format!("{}{}", base, path)
    } else if path.starts_with('?') {
        format!("{}/{}", base, path)
    } else if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    };
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

/// Apply router then rewriter to one request.
///
/// Returns the per-request options; `parts.uri` now holds the path to forward.
pub fn prepare_request(config: &ProxyConfig, parts: &mut Parts) -> Result<ProxyOptions> {
    let original = match parts.extensions.get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.clone(),
        None => {
            let uri = parts.uri.clone();
            parts.extensions.insert(OriginalUri(uri.clone()));
            uri
        }
    };
    let original_path = original
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    parts.uri = parse_path(&original_path)?;

    let mut options = config.options();

    if let Some(router) = config.router() {
        if let Some(target) = router.resolve(parts, &original_path)? {
            tracing::debug!(
                from = ?options.target.as_ref().map(Url::as_str),
                to = %target,
                "Router new target"
            );
            options.target = Some(target);
        }
    }

    if let Some(rewriter) = config.path_rewrite() {
        match rewriter.rewrite(&original_path, parts) {
            Rewrite::Path(path) => parts.uri = parse_path(&path)?,
            Rewrite::Declined => {
                tracing::info!(path = %original_path, "pathRewrite: no rewritten path found")
            }
        }
    }

    if config.log_level().is_debug() {
        tracing::debug!(
            method = %parts.method,
            original_path = %original_path,
            path = %parts.uri,
            upstream = ?options.target.as_ref().map(Url::as_str),
            "Prepared proxy request"
        );
    }

    Ok(options)
}

fn parse_path(path: &str) -> Result<Uri> {
    let normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    normalized
        .parse()
        .map_err(|e| ProxyError::resolution(format!("invalid request path {:?}: {}", path, e)))
}
