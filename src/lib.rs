//! Path-scoped HTTP forwarding middleware.
//!
//! Requests whose path falls inside a configured context are rewritten,
//! routed to an upstream, and relayed back; everything else passes to the
//! next handler untouched.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::{LogLevel, ProxyConfig, ProxyConfigBuilder, ProxySettings};
pub use error::{BoxError, ProxyError};
pub use http::{proxy_middleware, Dispatch, HttpProxy, HttpServer, PostData};
pub use lifecycle::Shutdown;
pub use routing::{ContextPattern, PathRewriter, TargetRouter};
