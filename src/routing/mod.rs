//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (startup, or dynamic later):
//!     controller / action identifiers
//!     → naming.rs (TestEndpoint.exposedPrivate → /test-endpoint/exposed-private)
//!     → pattern.rs (compile literal + {capture} segments)
//!     → router.rs (append, publish new snapshot)
//!
//! Incoming Request (path)
//!     → router.rs (scan in registration order)
//!     → pattern.rs (align path, collect captures)
//!     → Return: matched Route + params, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at registration, immutable afterwards
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod naming;
pub mod pattern;
pub mod router;

pub use naming::to_path_segment;
pub use pattern::{PathParams, RoutePattern};
pub use router::{Route, RouteTable};
