//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxySettings (validated)
//!     → proxy.rs (compile patterns, targets, hooks)
//!     → ProxyConfig (immutable)
//!     → shared via Arc by every request
//! ```
//!
//! Embedders can skip the file entirely and use `ProxyConfig::builder`.
//!
//! # Design Decisions
//! - Config is immutable once built; per-request overrides work on a clone
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod proxy;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use proxy::{ProxyConfig, ProxyConfigBuilder};
pub use schema::{LogLevel, ProxySettings};
