//! Configuration schema definitions.
//!
//! This is the file-level shape produced by the loader. It is compiled
//! into a [`ProxyConfig`](crate::config::ProxyConfig) before any request
//! is served.

use serde::{Deserialize, Serialize};

/// Root configuration for a proxy instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Which requests are proxied: a prefix, a glob, or a list of either.
    pub context: ContextSetting,

    /// Base upstream URI (scheme, host, port, base path).
    pub target: Option<String>,

    /// Ordered rewrite rules; the first match wins.
    pub path_rewrite: Vec<RewriteRuleConfig>,

    /// Ordered routing table overriding `target` per request.
    pub router: Vec<RouterEntryConfig>,

    /// Log verbosity.
    pub log_level: LogLevel,

    /// Listener for the standalone binary.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            context: ContextSetting::default(),
            target: None,
            path_rewrite: Vec::new(),
            router: Vec::new(),
            log_level: LogLevel::Info,
            listener: ListenerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// `context = "/api"` or `context = ["/api", "/rest/**"]`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ContextSetting {
    One(String),
    Many(Vec<String>),
}

impl Default for ContextSetting {
    fn default() -> Self {
        ContextSetting::One("/".to_string())
    }
}

impl ContextSetting {
    pub fn entries(&self) -> Vec<&str> {
        match self {
            ContextSetting::One(s) => vec![s.as_str()],
            ContextSetting::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

/// A single `[[path_rewrite]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RewriteRuleConfig {
    /// Regex (or literal substring when `literal = true`).
    pub pattern: String,

    /// Replacement; regex captures are available as `$1` / `${name}`.
    #[serde(default)]
    pub replacement: String,

    #[serde(default)]
    pub literal: bool,
}

/// A single `[[router]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouterEntryConfig {
    /// `host[:port]`, `host[:port]/path` or `/path`.
    pub key: String,

    /// Upstream base URI used when the key matches.
    pub target: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "off",
        }
    }

    /// Whether per-request routing details should be logged.
    pub fn is_debug(&self) -> bool {
        *self <= LogLevel::Debug
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
