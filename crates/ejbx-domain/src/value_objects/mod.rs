//! Domain Value Objects
//!
//! Immutable objects describing what an invocation carries, with no
//! conceptual identity beyond their attributes.

mod fault;
mod id;
mod invocation_key;
mod invocation_type;
mod value;

pub use fault::{Fault, FaultKind};
pub use id::{CallId, CallMarker, Id, IdMarker, VmId, VmMarker};
pub use invocation_key::{InvocationKey, PayloadKey};
pub use invocation_type::InvocationType;
pub use value::{LocalRef, Value};
