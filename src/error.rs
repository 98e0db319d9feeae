//! Error taxonomy for the forwarding pipeline.
//!
//! Only `Configuration` errors raised while compiling a [`ProxyConfig`]
//! prevent a proxy from being built. Every other variant is scoped to the
//! single request that produced it and is turned into a 500 response.
//!
//! [`ProxyConfig`]: crate::config::ProxyConfig

use axum::http::StatusCode;
use thiserror::Error;

/// Boxed error returned by user-supplied predicates, routers and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// Malformed pattern, target or a context predicate that failed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The router failed or produced a target that cannot be used.
    #[error("Upstream resolution failed: {0}")]
    UpstreamResolution(String),

    /// The outbound request failed at the network layer.
    #[error("Transport error to {target} ({code}): {message}")]
    Transport {
        target: String,
        code: String,
        message: String,
    },

    /// Upstream body was not valid JSON.
    #[error("Upstream response is not valid JSON: {0}")]
    ResponseFormat(#[from] serde_json::Error),

    /// An `on_proxy_req` / `on_proxy_res` hook returned an error.
    #[error("Proxy hook failed: {0}")]
    Hook(#[source] BoxError),
}

impl ProxyError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::UpstreamResolution(msg.into())
    }

    /// Status written to the caller when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "configuration",
            ProxyError::UpstreamResolution(_) => "resolution",
            ProxyError::Transport { .. } => "transport",
            ProxyError::ResponseFormat(_) => "response_format",
            ProxyError::Hook(_) => "hook",
        }
    }
}

/// Best-effort error code for a transport failure.
///
/// Walks the source chain looking for an `io::Error` and reports its kind
/// (`ConnectionRefused`, `TimedOut`, ...). Without one, a protocol-level
/// hyper error is classified; anything else is `"UNKNOWN"`.
pub fn transport_code(err: &(dyn std::error::Error + 'static)) -> String {
    let mut hyper_code = None;
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return format!("{:?}", io.kind());
        }
        if let Some(h) = e.downcast_ref::<hyper::Error>() {
            hyper_code = hyper_code.or(if h.is_incomplete_message() {
                Some("IncompleteMessage")
            } else if h.is_parse() {
                Some("InvalidResponse")
            } else if h.is_timeout() {
                Some("TimedOut")
            } else {
                None
            });
        }
        current = e.source();
    }
    hyper_code.unwrap_or("UNKNOWN").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapper(std::io::Error);

    impl std::fmt::Display for Wrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "wrapped")
        }
    }

    impl std::error::Error for Wrapper {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_transport_code_walks_sources() {
        let err = Wrapper(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert_eq!(transport_code(&err), "ConnectionRefused");
    }

    #[test]
    fn test_transport_code_unknown() {
        let err = ProxyError::configuration("nope");
        assert_eq!(transport_code(&err), "UNKNOWN");
    }

    #[test]
    fn test_every_request_error_is_500() {
        let errors = [
            ProxyError::resolution("router failed"),
            ProxyError::Transport {
                target: "http://127.0.0.1:1".into(),
                code: "ConnectionRefused".into(),
                message: "refused".into(),
            },
            ProxyError::Hook("boom".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
