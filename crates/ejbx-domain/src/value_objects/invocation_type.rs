//! Call kind of an invocation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DomainError, DomainResult};

/// Interface through which a call entered the container.
///
/// Closed enumeration; the numeric codes are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvocationType {
    /// Remote component interface
    #[default]
    Remote,
    /// Local component interface
    Local,
    /// Remote home interface
    Home,
    /// Local home interface
    LocalHome,
}

impl InvocationType {
    /// All call kinds in wire-code order
    pub const ALL: [InvocationType; 4] = [
        InvocationType::Remote,
        InvocationType::Local,
        InvocationType::Home,
        InvocationType::LocalHome,
    ];

    /// Wire code of this call kind
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Remote => 0,
            Self::Local => 1,
            Self::Home => 2,
            Self::LocalHome => 3,
        }
    }

    /// Decode a call kind from its wire code
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInvocationType`] for unknown codes.
    pub fn from_code(code: u8) -> DomainResult<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(DomainError::InvalidInvocationType(code))
    }

    /// Call came through a local (client-tier, same-process) interface
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local | Self::LocalHome)
    }

    /// Call targets a home interface
    #[must_use]
    pub const fn is_home(self) -> bool {
        matches!(self, Self::Home | Self::LocalHome)
    }

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "REMOTE",
            Self::Local => "LOCAL",
            Self::Home => "HOME",
            Self::LocalHome => "LOCALHOME",
        }
    }
}

impl fmt::Display for InvocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
