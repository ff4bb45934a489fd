//! Terminal interceptors choosing between the in-process and remote path

use ejbx_domain::VmId;
use std::sync::Arc;

use super::{Interceptor, Next};
use crate::error::{InvocationError, InvocationResult};
use crate::invocation::Invocation;
use crate::invoker::LocalInvokerBinding;
use crate::marshal::{InvocationResponse, MarshalledInvocation, MethodHashCache, MethodMap};

fn local_binding(invoker_id: VmId, local: Option<&LocalInvokerBinding>) -> Option<&LocalInvokerBinding> {
    local.filter(|binding| binding.vm_id() == invoker_id)
}

fn invoke_remote(invocation: &mut Invocation) -> InvocationResult {
    let invoker = invocation.context().invoker().cloned().ok_or_else(|| {
        InvocationError::no_invoker(format!(
            "no transport invoker in context of call {}",
            invocation.call_id()
        ))
    })?;
    tracing::trace!(call = %invocation.call_id(), host = %invoker.server_host_name(), "Remote path");
    invoker.invoke(invocation)
}

/// Calls the local invoker when the target lives in this process and the
/// context's transport invoker otherwise.
#[derive(Debug, Clone)]
pub struct InvokerInterceptor {
    invoker_id: VmId,
    local: Option<LocalInvokerBinding>,
}

impl InvokerInterceptor {
    /// `invoker_id` is the process the proxy was exported from; `local` is
    /// this process's binding for the target container
    pub fn new(invoker_id: VmId, local: Option<LocalInvokerBinding>) -> Self {
        Self { invoker_id, local }
    }

    /// True when calls take the in-process path
    #[must_use]
    pub fn is_local(&self) -> bool {
        local_binding(self.invoker_id, self.local.as_ref()).is_some()
    }
}

impl Interceptor for InvokerInterceptor {
    fn invoke(&self, invocation: &mut Invocation, _next: Next<'_>) -> InvocationResult {
        match local_binding(self.invoker_id, self.local.as_ref()) {
            Some(binding) => {
                tracing::trace!(call = %invocation.call_id(), "Local path");
                binding.invoker().invoke(invocation)
            }
            None => invoke_remote(invocation),
        }
    }
}

/// Like [`InvokerInterceptor`], but only calls through local interfaces take
/// the in-process path. Remote-interface calls always go through the
/// transport so they keep by-value semantics.
#[derive(Debug, Clone)]
pub struct ByValueInvokerInterceptor {
    invoker_id: VmId,
    local: Option<LocalInvokerBinding>,
}

impl ByValueInvokerInterceptor {
    /// See [`InvokerInterceptor::new`]
    pub fn new(invoker_id: VmId, local: Option<LocalInvokerBinding>) -> Self {
        Self { invoker_id, local }
    }

    /// True when `invocation` takes the in-process path
    #[must_use]
    pub fn is_local(&self, invocation: &Invocation) -> bool {
        invocation.invocation_type().is_local()
            && local_binding(self.invoker_id, self.local.as_ref()).is_some()
    }
}

impl Interceptor for ByValueInvokerInterceptor {
    fn invoke(&self, invocation: &mut Invocation, _next: Next<'_>) -> InvocationResult {
        let binding = local_binding(self.invoker_id, self.local.as_ref())
            .filter(|_| invocation.invocation_type().is_local());
        match binding {
            Some(binding) => {
                tracing::trace!(call = %invocation.call_id(), kind = %invocation.invocation_type(), "Local path");
                binding.invoker().invoke(invocation)
            }
            None => invoke_remote(invocation),
        }
    }
}

/// In-process calls pay the full marshalling cost.
///
/// On the local path the invocation is written to its wire form and read
/// back into a fresh copy, the copy is invoked, and the outcome crosses the
/// response codec. Callers thus observe exactly the isolation of a remote
/// call. A non-exception failure of the target surfaces as
/// [`InvocationError::Undeclared`].
#[derive(Debug, Clone)]
pub struct MarshallingInvokerInterceptor {
    invoker_id: VmId,
    local: Option<LocalInvokerBinding>,
    hashes: Arc<MethodHashCache>,
}

impl MarshallingInvokerInterceptor {
    /// See [`InvokerInterceptor::new`]; `hashes` is the process hash cache
    pub fn new(
        invoker_id: VmId,
        local: Option<LocalInvokerBinding>,
        hashes: Arc<MethodHashCache>,
    ) -> Self {
        Self {
            invoker_id,
            local,
            hashes,
        }
    }

    /// True when calls take the in-process path
    #[must_use]
    pub fn is_local(&self) -> bool {
        local_binding(self.invoker_id, self.local.as_ref()).is_some()
    }

    fn invoke_local(
        &self,
        binding: &LocalInvokerBinding,
        invocation: &Invocation,
    ) -> InvocationResult {
        let marshalled = MarshalledInvocation::from_invocation(invocation, &self.hashes)?;
        let bytes = marshalled.write_external()?;
        let mut received = MarshalledInvocation::read_external(bytes)?;

        let map = match binding.method_map() {
            Some(map) => Arc::clone(map),
            None => {
                let mut map = MethodMap::new();
                map.insert(marshalled.method_hash(), marshalled.method()?);
                Arc::new(map)
            }
        };
        received.set_method_map(map);

        let mut copy = received
            .into_invocation()?
            .with_context(invocation.context().clone());
        if let Some(transaction) = invocation.transaction() {
            copy.set_transaction(transaction.clone());
        }

        tracing::trace!(call = %invocation.call_id(), copy = %copy.call_id(), "Local path by value");
        let result = binding.invoker().invoke(&mut copy);
        InvocationResponse::round_trip(result).map_err(InvocationError::into_checked)
    }
}

impl Interceptor for MarshallingInvokerInterceptor {
    fn invoke(&self, invocation: &mut Invocation, _next: Next<'_>) -> InvocationResult {
        match local_binding(self.invoker_id, self.local.as_ref()) {
            Some(binding) => self.invoke_local(binding, invocation),
            None => invoke_remote(invocation),
        }
    }
}
