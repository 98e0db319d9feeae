//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing / prepare / forwarder produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (request counters, latency histogram)
//!
//! Consumers:
//!     → stdout via tracing-subscriber (when the embedder installs one)
//!     → Prometheus scrape endpoint (binary only, optional)
//! ```
//!
//! # Design Decisions
//! - Nothing here feeds back into forwarding decisions
//! - No subscriber installed means silence, not different behavior

pub mod logging;
pub mod metrics;
