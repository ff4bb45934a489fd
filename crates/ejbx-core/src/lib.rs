//! # ejbx
//!
//! Interceptor-chained invocation framework and EJB-QL compiler.
//!
//! The invocation side wraps a call into an [`Invocation`], pushes it through
//! an [`InterceptorChain`] and terminates at an [`Invoker`] that either calls
//! into the local container or ships a [`MarshalledInvocation`] over a
//! [`Transport`]. The query side parses EJB-QL into a tagged-union AST,
//! resolves identifiers against a [`ql::Catalog`] and renders EJB-QL or SQL.

#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod interceptor;
pub mod invocation;
pub mod invoker;
pub mod marshal;
pub mod ql;
pub mod stats;

pub use config::{EjbxConfig, InvocationConfig, QueryConfig};
pub use error::{Error, InvocationError, InvocationResult, Result};
pub use interceptor::{
    ByValueInvokerInterceptor, ChainFactory, Interceptor, InterceptorChain,
    InvokerInterceptor, MarshallingInvokerInterceptor, Next, StatisticsInterceptor,
};
pub use invocation::{
    InterfaceDescriptor, InterfaceId, Invocation, InvocationContext, MethodDescriptor,
    PayloadTier, TypeDescriptor,
};
pub use invoker::{
    ContainerInvoker, InvocationDispatcher, Invoker, LocalInvokerBinding, LoopbackTransport,
    RemoteInvoker, Transport,
};
pub use marshal::{
    InvocationResponse, MarshalledInvocation, MarshalledValue, MethodHashCache, MethodMap,
    method_hash,
};
pub use stats::{InvocationStatistics, StatisticsSnapshot, TimeStatistic};

pub use ejbx_domain::{
    CallId, Fault, FaultKind, InvocationKey, InvocationType, LocalRef, PayloadKey, Value, VmId,
};
