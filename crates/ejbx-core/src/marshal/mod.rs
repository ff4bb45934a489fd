//! Transport encoding of invocations and their outcomes

mod hash;
mod invocation;
mod response;
mod value;

pub use hash::{MethodHashCache, MethodMap, method_hash};
pub use invocation::MarshalledInvocation;
pub use response::InvocationResponse;
pub use value::MarshalledValue;
