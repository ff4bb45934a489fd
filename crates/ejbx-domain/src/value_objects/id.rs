//! Process and call identifiers
//!
//! Both are random UUIDs. A phantom marker keeps a process id from being
//! passed where a call id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

use crate::DomainError;

mod private {
    pub trait Sealed {}
}

/// Kind of an [`Id`]. Implemented only by the markers of this module.
pub trait IdMarker: private::Sealed + Send + Sync + 'static {
    /// Label used by `Debug`
    const LABEL: &'static str;
}

/// Marks a [`VmId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmMarker;

/// Marks a [`CallId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallMarker;

impl private::Sealed for VmMarker {}
impl private::Sealed for CallMarker {}

impl IdMarker for VmMarker {
    const LABEL: &'static str = "VmId";
}

impl IdMarker for CallMarker {
    const LABEL: &'static str = "CallId";
}

/// UUID tagged with what it identifies.
///
/// A `VmId` is embedded into a terminal interceptor when its chain is
/// assembled and compared against the id of the container's local invoker
/// binding. Equal ids mean the target lives in this process.
///
/// ```compile_fail
/// # use ejbx_domain::value_objects::{CallId, VmId};
/// let call: CallId = VmId::new();
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    uuid: Uuid,
    #[serde(skip)]
    kind: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Fresh random id
    #[must_use]
    pub fn new() -> Self {
        Uuid::new_v4().into()
    }

    /// The raw UUID
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T: IdMarker> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IdMarker> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self {
            uuid,
            kind: PhantomData,
        }
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self::from)
            .map_err(|e| DomainError::invalid_value(format!("{} '{s}': {e}", T::LABEL)))
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::LABEL, self.uuid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uuid, f)
    }
}

/// Identifier of one server process
pub type VmId = Id<VmMarker>;

/// Identifier of one call in flight, used to correlate log lines
pub type CallId = Id<CallMarker>;
