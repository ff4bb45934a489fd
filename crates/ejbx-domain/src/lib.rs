//! ejbx Domain Layer - Pure Value Types
//!
//! This crate contains the value types shared by every layer of the ejbx
//! invocation framework. It has no knowledge of interceptors, invokers or
//! wire formats; it only describes what travels through them.
//!
//! ## Contents
//!
//! - **Identifiers**: process ids used for locality detection, call ids for tracing
//! - **Invocation kinds and keys**: the closed enumerations naming call kinds and payload slots
//! - **Values**: the dynamic value model carried by an invocation
//! - **Faults**: the serializable description of a failure raised by a call target

#![warn(missing_docs)]

pub mod value_objects;

pub use value_objects::{
    CallId, Fault, FaultKind, Id, IdMarker, InvocationKey, InvocationType, LocalRef, PayloadKey,
    Value, VmId,
};

/// Domain Result type
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-specific errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DomainError {
    /// Unknown invocation type code on the wire
    #[error("Invalid invocation type code: {0}")]
    InvalidInvocationType(u8),

    /// Value does not have the shape the caller asked for
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Value holds a process-local reference and cannot leave the process
    #[error("Value is not serializable: {0}")]
    NotSerializable(String),

    /// Unknown invocation key name
    #[error("Invalid invocation key: {0}")]
    InvalidKey(String),
}

impl DomainError {
    /// Create an invalid value error
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Create a not-serializable error
    pub fn not_serializable(message: impl Into<String>) -> Self {
        Self::NotSerializable(message.into())
    }
}
