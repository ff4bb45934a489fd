//! Error types for ejbx operations

use ejbx_domain::{DomainError, Fault, Value};
use serde::{Deserialize, Serialize};

use crate::ql::QlError;

/// Result type alias for configuration-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result of dispatching an invocation
pub type InvocationResult<T = Value> = std::result::Result<T, InvocationError>;

/// Top-level error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invocation failure
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// Query compilation failure
    #[error(transparent)]
    Query(#[from] QlError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Failure of a call travelling through an interceptor chain.
///
/// The first three variants carry a failure raised by the call target and are
/// part of the business contract. Every other variant is a framework failure
/// caused by configuration or deployment mismatch and is never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum InvocationError {
    /// Exception raised by the target, propagated unchanged
    #[error("Application exception: {0}")]
    Application(Fault),

    /// Non-exception failure raised by the target
    #[error("Throwable raised by target: {0}")]
    Throwable(Fault),

    /// Non-exception failure wrapped after a by-value round trip
    #[error("Undeclared throwable: {0}")]
    Undeclared(Fault),

    /// No method known for the received hash (interface skew between peers)
    #[error("Failed to find method for hash: {hash}")]
    MethodNotFound {
        /// The unresolved method hash
        hash: i64,
    },

    /// Encoding or decoding failed
    #[error("Marshalling failed: {0}")]
    Marshalling(String),

    /// No invoker available to dispatch to
    #[error("No invoker available: {0}")]
    NoInvoker(String),

    /// Chain ended without a terminal interceptor
    #[error("Interceptor chain exhausted without reaching an invoker")]
    ChainExhausted,

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invocation is missing data required for dispatch
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),
}

impl InvocationError {
    /// Create a marshalling error
    pub fn marshalling(message: impl Into<String>) -> Self {
        Self::Marshalling(message.into())
    }

    /// Create a no-invoker error
    pub fn no_invoker(message: impl Into<String>) -> Self {
        Self::NoInvoker(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an invalid invocation error
    pub fn invalid_invocation(message: impl Into<String>) -> Self {
        Self::InvalidInvocation(message.into())
    }

    /// True for failures the caller is expected to handle (declared or
    /// runtime exceptions from the target)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    /// Fault raised by the target, if this error carries one
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Application(fault) | Self::Throwable(fault) | Self::Undeclared(fault) => {
                Some(fault)
            }
            _ => None,
        }
    }

    /// Re-classify a target failure so only exceptions escape as such:
    /// exceptions become [`InvocationError::Application`], anything else is
    /// wrapped as [`InvocationError::Undeclared`]. Framework failures pass
    /// through.
    #[must_use]
    pub fn into_checked(self) -> Self {
        match self {
            Self::Application(fault) | Self::Throwable(fault) | Self::Undeclared(fault) => {
                if fault.is_exception() {
                    Self::Application(fault)
                } else {
                    Self::Undeclared(fault)
                }
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for InvocationError {
    fn from(err: serde_json::Error) -> Self {
        InvocationError::Marshalling(err.to_string())
    }
}

impl From<DomainError> for InvocationError {
    fn from(err: DomainError) -> Self {
        InvocationError::Marshalling(err.to_string())
    }
}
