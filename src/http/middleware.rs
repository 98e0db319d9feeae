//! Proxy middleware.
//!
//! Gate on the context, prepare, forward. Requests outside the context are
//! handed back untouched so the host pipeline's next handler runs exactly
//! once; requests inside it always end in a response from this layer.
//!
//! ```rust,no_run
//! use axum::{middleware::from_fn_with_state, Router};
//! use path_proxy::{HttpProxy, ProxyConfig, proxy_middleware};
//!
//! # fn build() -> Result<Router, path_proxy::ProxyError> {
//! let config = ProxyConfig::builder("/api")
//!     .target("http://127.0.0.1:9000")
//!     .rewrite_rule("^/api", "/v1")
//!     .build()?;
//! let proxy = HttpProxy::new(config);
//! let app = Router::new()
//!     .fallback(|| async { "local" })
//!     .layer(from_fn_with_state(proxy, proxy_middleware));
//! # Ok(app)
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::http::forwarder::Forwarder;
use crate::http::prepare::{prepare_request, OutboundRequestSpec};
use crate::http::response::error_response;
use crate::observability::metrics;

/// What the proxy did with a request.
pub enum Dispatch {
    /// In scope: this is the response for the caller.
    Forwarded(Response),
    /// Out of scope: hand the request to the next handler.
    Skipped(Request<Body>),
}

/// A configured proxy instance. Cheap to clone; all clones share one config.
#[derive(Clone)]
pub struct HttpProxy {
    config: Arc<ProxyConfig>,
    forwarder: Forwarder,
}

impl HttpProxy {
    pub fn new(config: ProxyConfig) -> Self {
        tracing::info!(
            context = %config.context(),
            upstream = ?config.target().map(|t| t.as_str()),
            "Proxy created"
        );
        Self {
            config: Arc::new(config),
            forwarder: Forwarder::new(),
        }
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Dispatch {
        let path = request
            .extensions()
            .get::<OriginalUri>()
            .map(|o| &o.0)
            .unwrap_or_else(|| request.uri())
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let (mut parts, body) = request.into_parts();
        let start = Instant::now();

        match self.config.context().matches(&path, &parts) {
            Ok(true) => {}
            Ok(false) => {
                metrics::record_skipped();
                return Dispatch::Skipped(Request::from_parts(parts, body));
            }
            Err(err) => return Dispatch::Forwarded(self.fail(err, &parts, start)),
        }

        let method = parts.method.to_string();
        match self.proxy(&mut parts, body).await {
            Ok(response) => {
                metrics::record_request(&method, response.status().as_u16(), "forwarded", start);
                Dispatch::Forwarded(response)
            }
            Err(err) => Dispatch::Forwarded(self.fail(err, &parts, start)),
        }
    }

    async fn proxy(&self, parts: &mut Parts, body: Body) -> Result<Response> {
        let options = prepare_request(&self.config, parts)?;
        let outbound = OutboundRequestSpec::build(options, parts, body)?;
        self.forwarder
            .forward(outbound, parts, self.config.hooks())
            .await
    }

    fn fail(&self, err: ProxyError, parts: &Parts, start: Instant) -> Response {
        let url = parts
            .extensions
            .get::<OriginalUri>()
            .map(|o| o.0.to_string())
            .unwrap_or_else(|| parts.uri.to_string());
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("-");

        match &err {
            ProxyError::Transport { target, code, message } => tracing::error!(
                url = %url,
                host = %host,
                upstream = %target,
                code = %code,
                error = %message,
                "Error occurred while trying to proxy request"
            ),
            other => tracing::error!(url = %url, host = %host, error = %other, "Proxy request failed"),
        }

        metrics::record_request(parts.method.as_str(), err.status_code().as_u16(), err.kind(), start);
        error_response(&err)
    }
}

/// Axum middleware entry point; use with `axum::middleware::from_fn_with_state`.
pub async fn proxy_middleware(
    State(proxy): State<HttpProxy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match proxy.dispatch(request).await {
        Dispatch::Forwarded(response) => response,
        Dispatch::Skipped(request) => next.run(request).await,
    }
}
