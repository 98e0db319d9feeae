//! HTTP forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → middleware.rs (context gate; out of scope → next handler)
//!     → prepare.rs    (router, then path rewrite → OutboundRequestSpec)
//!     → forwarder.rs  (on_proxy_req, single outbound attempt, buffer response)
//!     → response.rs   (200 JSON relay / 500 raw relay / 500 empty)
//!     → caller
//! ```

pub mod forwarder;
pub mod hooks;
pub mod middleware;
pub mod prepare;
pub mod response;
pub mod server;

pub use forwarder::Forwarder;
pub use hooks::{Hooks, NoopHook, OnProxyReq, OnProxyRes};
pub use middleware::{proxy_middleware, Dispatch, HttpProxy};
pub use prepare::{OutboundBody, OutboundRequestSpec, PostData, ProxyOptions};
pub use server::HttpServer;
