//! Controller subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Controller::new("TestEndpoint").action(..).value(..)
//!     → definition.rs (instantiate singleton, run initializer)
//!     → reflector.rs (routable actions / socket events + default paths)
//!     → registry.rs (name → instance, for `Controller.action` references)
//!
//! Per request:
//!     matched route owner
//!     → facade.rs (patch_context, lazy facade over every member)
//! ```

pub mod definition;
pub mod facade;
pub mod reflector;
pub mod registry;

pub use definition::{Action, ActionResult, Controller, ControllerInstance, Fields, Member};
pub use facade::{patch_context, ControllerFacade, FacadeError, FacadeSlot};
pub use reflector::{harvest_http_routes, harvest_socket_events, SocketEndpoint};
pub use registry::ControllerRegistry;

use crate::context::{HttpContext, SocketContext};

/// Controller serving HTTP actions.
pub type HttpController = Controller<HttpContext>;

/// Controller serving socket events.
pub type SocketController = Controller<SocketContext>;
