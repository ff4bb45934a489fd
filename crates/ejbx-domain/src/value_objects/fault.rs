//! Failures raised by a call target

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Value;

/// Classification of a target failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// Declared application exception; the caller is expected to handle it
    Checked,
    /// Undeclared runtime exception
    Runtime,
    /// Failure that is not an exception at all (resource exhaustion, linkage)
    Error,
}

/// Serializable description of a failure thrown by an invocation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    /// Failure classification
    pub kind: FaultKind,
    /// Binary class name of the failure
    pub class_name: String,
    /// Human readable message
    pub message: String,
    /// Optional structured detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl Fault {
    /// Create a fault of the given kind
    pub fn new(kind: FaultKind, class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            class_name: class_name.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Declared application exception
    pub fn checked(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Checked, class_name, message)
    }

    /// Runtime exception
    pub fn runtime(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Runtime, class_name, message)
    }

    /// Non-exception failure
    pub fn error(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Error, class_name, message)
    }

    /// Attach structured detail
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// True for checked and runtime exceptions
    #[must_use]
    pub fn is_exception(&self) -> bool {
        !matches!(self.kind, FaultKind::Error)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class_name, self.message)
    }
}
