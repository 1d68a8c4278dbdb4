//! URL dispatch.
//!
//! # Data Flow
//! ```text
//! Request path (query stripped)
//!     → router.rs (try each route in registration order)
//!     → first anchored regex that matches the whole path wins
//!     → handler(exchange, path tokens)
//!     → no match: caller falls back to static files
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Flat ordered list, priority is registration order
//! - Patterns are anchored at both ends, partial matches never count

pub mod router;

pub use router::{Handler, RouteError, Router, split_path};
