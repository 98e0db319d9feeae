//! Collaborator hooks around the outbound exchange.
//!
//! Absent hooks are represented by [`NoopHook`], so the forwarder always
//! calls through the same interface.

use std::sync::Arc;

use axum::http::{request, response};

use crate::error::BoxError;
use crate::http::prepare::OutboundRequestSpec;

/// Last chance to adjust the outbound request before it is sent.
///
/// Returning an error fails the request with a 500.
pub trait OnProxyReq: Send + Sync {
    fn on_proxy_req(
        &self,
        outbound: &mut OutboundRequestSpec,
        req: &request::Parts,
    ) -> Result<(), BoxError>;
}

/// Observe the upstream response and adjust the downstream one.
///
/// Only invoked when the upstream body is valid JSON. Status and
/// `Content-Type` are overwritten after the hook runs; other headers stick.
pub trait OnProxyRes: Send + Sync {
    fn on_proxy_res(
        &self,
        upstream: &response::Parts,
        req: &request::Parts,
        downstream: &mut response::Parts,
    ) -> Result<(), BoxError>;
}

impl<F> OnProxyReq for F
where
    F: Fn(&mut OutboundRequestSpec, &request::Parts) -> Result<(), BoxError> + Send + Sync,
{
    fn on_proxy_req(
        &self,
        outbound: &mut OutboundRequestSpec,
        req: &request::Parts,
    ) -> Result<(), BoxError> {
        self(outbound, req)
    }
}

impl<F> OnProxyRes for F
where
    F: Fn(&response::Parts, &request::Parts, &mut response::Parts) -> Result<(), BoxError>
        + Send
        + Sync,
{
    fn on_proxy_res(
        &self,
        upstream: &response::Parts,
        req: &request::Parts,
        downstream: &mut response::Parts,
    ) -> Result<(), BoxError> {
        self(upstream, req, downstream)
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl OnProxyReq for NoopHook {
    fn on_proxy_req(&self, _: &mut OutboundRequestSpec, _: &request::Parts) -> Result<(), BoxError> {
        Ok(())
    }
}

impl OnProxyRes for NoopHook {
    fn on_proxy_res(
        &self,
        _: &response::Parts,
        _: &request::Parts,
        _: &mut response::Parts,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Hooks {
    pub on_proxy_req: Arc<dyn OnProxyReq>,
    pub on_proxy_res: Arc<dyn OnProxyRes>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            on_proxy_req: Arc::new(NoopHook),
            on_proxy_res: Arc::new(NoopHook),
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Hooks")
    }
}
