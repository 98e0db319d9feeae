//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the embedder. The binary calls [`init_logging`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogLevel;

/// Install a fmt subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: LogLevel) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "path_proxy={level},tower_http={level}",
            level = level.as_filter()
        ))
    })
}
