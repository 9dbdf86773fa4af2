//! Registration-time error definitions.
//!
//! Ordinary request mismatches are never errors: an unmatched path is a
//! `None` from the route table and becomes a 404 at the engine boundary.

use thiserror::Error;

/// Errors raised while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The same placeholder name appears twice in one pattern.
    #[error("duplicate capture name \"{name}\" in pattern \"{pattern}\"")]
    DuplicateCapture { pattern: String, name: String },

    /// A `{}` placeholder without a name.
    #[error("empty capture name in pattern \"{0}\"")]
    EmptyCapture(String),

    /// A `{` without its closing `}`.
    #[error("unterminated capture in pattern \"{0}\"")]
    UnterminatedCapture(String),

    /// Two placeholders with no literal text between them cannot be split.
    #[error("captures \"{first}\" and \"{second}\" are not separated by literal text")]
    AdjacentCaptures { first: String, second: String },
}

/// Errors raised by route and controller registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] PatternError),

    /// Dynamic reference to a controller name that was never registered.
    #[error("Controller \"{0}\" is not registered")]
    ControllerNotRegistered(String),

    /// Dynamic reference to a member the controller does not declare.
    #[error("Controller \"{controller}\" does not contain \"{action}\" action")]
    ActionNotFound { controller: String, action: String },

    /// Dynamic registration after the controller registry was dropped.
    #[error("Dynamic registration of routes is disabled. Set \"allow_dynamic_routes\" to \"true\" in config to enable.")]
    DynamicRoutingDisabled,
}

/// Convenience alias for registration results.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Error type returned by action bodies.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;
