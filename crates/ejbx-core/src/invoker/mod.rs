//! Terminal call targets of an interceptor chain
//!
//! An [`Invoker`] either calls into a container in this process
//! ([`ContainerInvoker`]) or ships the invocation to a peer
//! ([`RemoteInvoker`]). Which one a chain uses is decided per call by the
//! terminal interceptor, using the [`LocalInvokerBinding`] injected when the
//! chain was assembled.

mod remote;

pub use remote::{InvocationDispatcher, LoopbackTransport, RemoteInvoker, Transport};

use ejbx_domain::VmId;
use std::fmt;
use std::sync::Arc;

use crate::error::InvocationResult;
use crate::invocation::Invocation;
use crate::marshal::MethodMap;

/// Something that can execute an invocation.
pub trait Invoker: Send + Sync {
    /// Execute `invocation` and return the target's result
    fn invoke(&self, invocation: &mut Invocation) -> InvocationResult;

    /// Host name of the server this invoker reaches
    fn server_host_name(&self) -> String;
}

/// Dispatch function of an in-process container
pub type DispatchFn = dyn Fn(&mut Invocation) -> InvocationResult + Send + Sync;

/// In-process invoker delegating to a container's dispatch function.
#[derive(Clone)]
pub struct ContainerInvoker {
    host: String,
    handler: Arc<DispatchFn>,
}

impl ContainerInvoker {
    /// Wrap `handler`
    pub fn new<F>(host: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Invocation) -> InvocationResult + Send + Sync + 'static,
    {
        Self {
            host: host.into(),
            handler: Arc::new(handler),
        }
    }
}

impl Invoker for ContainerInvoker {
    fn invoke(&self, invocation: &mut Invocation) -> InvocationResult {
        (self.handler)(invocation)
    }

    fn server_host_name(&self) -> String {
        self.host.clone()
    }
}

impl fmt::Debug for ContainerInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerInvoker")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// The in-process invoker of one container, with the process id it runs in.
///
/// A terminal interceptor whose embedded process id equals `vm_id` takes
/// the local path and calls `invoker` directly.
#[derive(Clone)]
pub struct LocalInvokerBinding {
    vm_id: VmId,
    invoker: Arc<dyn Invoker>,
    method_map: Option<Arc<MethodMap>>,
}

impl LocalInvokerBinding {
    /// Bind `invoker` as the local invoker of process `vm_id`
    pub fn new(vm_id: VmId, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            vm_id,
            invoker,
            method_map: None,
        }
    }

    /// Attach the container's method table, used to resolve methods after a
    /// by-value round trip
    #[must_use]
    pub fn with_method_map(mut self, map: Arc<MethodMap>) -> Self {
        self.method_map = Some(map);
        self
    }

    /// Process id of the bound container
    #[must_use]
    pub fn vm_id(&self) -> VmId {
        self.vm_id
    }

    /// Bound invoker
    #[must_use]
    pub fn invoker(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    /// Container method table
    #[must_use]
    pub fn method_map(&self) -> Option<&Arc<MethodMap>> {
        self.method_map.as_ref()
    }
}

impl fmt::Debug for LocalInvokerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalInvokerBinding")
            .field("vm_id", &self.vm_id)
            .field("host", &self.invoker.server_host_name())
            .field("method_map", &self.method_map.as_ref().map(|m| m.len()))
            .finish()
    }
}
