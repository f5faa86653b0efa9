//! Error types for vmport.

use thiserror::Error;

use crate::port::PortHandle;

/// Main error type for all port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// A handler panicked and the panic was recovered at the port boundary.
    ///
    /// Only the rendered panic message is kept, never a backtrace.
    #[error("panic: {0}")]
    Panic(String),

    /// A handler failed through its normal return path.
    #[error("{0}")]
    Handler(String),

    /// No handler is registered under the given handle.
    #[error("Port not found: {0}")]
    PortNotFound(PortHandle),

    /// No port is bound to the given name.
    #[error("Unknown port name: {0}")]
    UnknownName(String),

    /// A strict registration found the name already bound.
    #[error("Port name already registered: {0}")]
    DuplicateName(String),

    /// A finite gas meter ran past its limit.
    #[error("Out of gas in {descriptor}: limit {limit}, consumed {consumed}")]
    OutOfGas {
        descriptor: String,
        limit: u64,
        consumed: u64,
    },

    /// JSON serialization/deserialization error (typed handlers only).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PortError {
    /// Build an ordinary handler failure.
    pub fn handler(message: impl Into<String>) -> Self {
        PortError::Handler(message.into())
    }

    /// True if this error came from a recovered panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, PortError::Panic(_))
    }
}

/// Result type alias using PortError.
pub type Result<T> = std::result::Result<T, PortError>;
