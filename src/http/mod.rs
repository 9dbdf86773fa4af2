//! HTTP engine adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch fallback)
//!     → request.rs (metadata, body decoding)
//!     → [route table picks the action]
//!     → response.rs (reply → response, 404/500 bodies)
//!     → Send to client
//!
//! Upgrade request
//!     → websocket.rs (socket endpoint, event frames)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use response::NOT_FOUND_MESSAGE;
pub use server::{AppState, HttpServer};
