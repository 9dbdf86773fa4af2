//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registration, dispatch, socket sessions
//!     → logging.rs (tracing events with structured fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every request log line
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
