//! Controller dispatch layer.
//!
//! Maps HTTP paths and socket events onto controller actions.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                    API DISPATCH                       │
//!                    │                                                       │
//!  Registration      │  ┌────────────┐   ┌───────────┐   ┌──────────────┐    │
//!  ──────────────────┼─▶│ controller │──▶│  routing  │──▶│ route table  │    │
//!  Controller::new() │  │ reflector  │   │  naming + │   │ (arc-swap)   │    │
//!                    │  │ + registry │   │  pattern  │   └──────┬───────┘    │
//!                    │  └────────────┘   └───────────┘          │            │
//!                    │                                          ▼            │
//!  Request           │  ┌────────────┐   ┌───────────┐   ┌──────────────┐    │
//!  ──────────────────┼─▶│    http    │──▶│  context  │──▶│   action     │    │
//!  ◀─────────────────┼──│  (axum)    │◀──│ + facade  │◀──│ (&mut ctx)   │    │
//!                    │  └────────────┘   └───────────┘   └──────────────┘    │
//!                    │                                                       │
//!                    │  config · lifecycle · observability · query           │
//!                    └──────────────────────────────────────────────────────┘
//! ```

// Core
pub mod app;
pub mod context;
pub mod controller;
pub mod error;
pub mod query;
pub mod routing;

// Engine
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub mod demo;

pub use app::{App, Handler};
pub use config::AppConfig;
pub use context::{ExecutionContext, HttpContext, SocketContext};
pub use controller::{ActionResult, Controller, HttpController, SocketController};
pub use error::{DispatchError, PatternError};
pub use http::HttpServer;
pub use lifecycle::{start_app, AppHandle, Shutdown};
