//! Error handling for hybridflow
//!
//! Two kinds of failure are kept apart:
//!
//! - [`ContractViolation`] - a composition bug, such as reading the payload of
//!   an ended [`Endable`](crate::types::Endable). Returned by the `try_*`
//!   accessors; the panicking accessors panic with its message.
//! - [`FlowError`] - runtime failures of the ambient layer (configuration
//!   files, I/O). Domain failures inside the graph are never errors of either
//!   kind; they travel as [`Fallible`](crate::types::Fallible) values.

use thiserror::Error;

/// A programming error in how a value or cell was accessed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// The success value of a `Fallible::Failure` was requested
    #[error("contract violation: accessed the value of a failed Fallible")]
    ValueOfFailure,

    /// The error value of a `Fallible::Success` was requested
    #[error("contract violation: accessed the error of a successful Fallible")]
    ErrorOfSuccess,

    /// The payload of `Endable::Ended` was requested
    #[error("contract violation: accessed the payload of an ended sequence")]
    EndedPayload,

    /// A `ReactiveCell` was read before any value was set
    #[error("contract violation: read an unset reactive cell")]
    UnsetCell,
}

/// Main error type for hybridflow's ambient operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for hybridflow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
