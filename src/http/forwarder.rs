//! Outbound request execution and response relay.
//!
//! One attempt per request: no retries, no timeout. The inbound body is
//! piped unbuffered unless an earlier layer supplied [`PostData`]; the
//! upstream body is buffered in full so it can be validated as JSON.
//!
//! [`PostData`]: crate::http::prepare::PostData

use axum::body::{Body, Bytes};
use axum::http::{request, response, Request};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::de::IgnoredAny;

use crate::error::{transport_code, ProxyError, Result};
use crate::http::hooks::Hooks;
use crate::http::prepare::OutboundRequestSpec;
use crate::http::response::{invalid_body_response, json_response};

/// HTTP client wrapper issuing the outbound request.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    /// Client without an idle pool: every request opens its own upstream
    /// connection, so a canceled send is never replayed on another one.
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .retry_canceled_requests(false)
            .build(HttpConnector::new());
        Self { client }
    }

    /// Send `outbound` and relay the upstream answer.
    ///
    /// `Err` means nothing usable came back (hook or transport failure);
    /// an upstream body that is not JSON still yields `Ok` with a 500.
    pub async fn forward(
        &self,
        mut outbound: OutboundRequestSpec,
        req: &request::Parts,
        hooks: &Hooks,
    ) -> Result<Response> {
        hooks
            .on_proxy_req
            .on_proxy_req(&mut outbound, req)
            .map_err(ProxyError::Hook)?;

        let uri = outbound.uri()?;
        let target = outbound.target.to_string();

        let mut builder = Request::builder().method(outbound.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(outbound.headers);
        }
        let buffered = outbound.body.is_buffered();
        let request = builder
            .body(outbound.body.into_body())
            .map_err(|e| ProxyError::resolution(format!("invalid outbound request: {}", e)))?;

        tracing::debug!(upstream = %target, path = %outbound.path, buffered, "Forwarding request");

        let upstream = self
            .client
            .request(request)
            .await
            .map_err(|e| ProxyError::Transport {
                target: target.clone(),
                code: transport_code(&e),
                message: e.to_string(),
            })?;

        let (upstream_parts, incoming) = upstream.into_parts();
        tracing::debug!(status = %upstream_parts.status, "Upstream responded");

        let content = axum::body::to_bytes(Body::new(incoming), usize::MAX)
            .await
            .map_err(|e| ProxyError::Transport {
                target,
                code: transport_code(&e),
                message: e.to_string(),
            })?;

        Ok(relay(&upstream_parts, content, req, hooks))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

/// Choose the downstream response from the buffered upstream body.
pub fn relay(
    upstream: &response::Parts,
    content: Bytes,
    req: &request::Parts,
    hooks: &Hooks,
) -> Response {
    // serde_json skips UTF-8 checks inside strings it ignores.
    if let Err(e) = std::str::from_utf8(&content) {
        tracing::error!(
            error = %e,
            upstream_status = %upstream.status,
            "Problem with upstream response"
        );
        return invalid_body_response(content);
    }
    if let Err(e) = serde_json::from_slice::<IgnoredAny>(&content) {
        let err = ProxyError::ResponseFormat(e);
        tracing::error!(
            error = %err,
            upstream_status = %upstream.status,
            "Problem with upstream response"
        );
        return invalid_body_response(content);
    }

    let (mut downstream, ()) = Response::new(()).into_parts();
    if let Err(e) = hooks.on_proxy_res.on_proxy_res(upstream, req, &mut downstream) {
        tracing::error!(error = %ProxyError::Hook(e), "Problem with upstream response");
        return invalid_body_response(content);
    }

    json_response(downstream, content)
}
