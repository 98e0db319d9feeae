//! Per-request routing decisions.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, headers)
//!     → context.rs (in scope? otherwise hand off to the next handler)
//!     → router.rs  (optional per-request target override, on the ORIGINAL path)
//!     → rewrite.rs (path sent upstream)
//!
//! Compilation (at startup):
//!     context strings / globs, rewrite regexes, router targets
//!     → compiled once into immutable matchers
//!     → shared read-only by every request
//! ```
//!
//! # Design Decisions
//! - Everything here is pure: no I/O, no shared mutable state
//! - Pattern compilation errors surface before the proxy exists
//! - First match wins, both for rewrite rules and router tables

pub mod context;
pub mod rewrite;
pub mod router;

pub use context::{ContextMatcher, ContextPattern};
pub use rewrite::{PathRewriter, Rewrite, RewriteRule};
pub use router::TargetRouter;
