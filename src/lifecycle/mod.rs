//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Register controllers → start_app → drop registry? → bind → serve
//!
//! Shutdown (shutdown.rs):
//!     AppHandle::stop → stop accepting → drain in-flight requests → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → caller stops the app
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then the listener
//! - Graceful shutdown through a broadcast channel

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start_app, AppHandle, StartupError};
