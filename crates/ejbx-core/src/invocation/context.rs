//! Process-local side channel of an invocation

use ejbx_domain::{Value, VmId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::invoker::Invoker;

/// Transient data attached to one [`Invocation`](super::Invocation).
///
/// Holds the transport invoker resolved for the call, the target container
/// identity and the name of the proxy binding the call came through. None of
/// it is ever serialized.
#[derive(Clone, Default)]
pub struct InvocationContext {
    invoker: Option<Arc<dyn Invoker>>,
    object_name: Option<Value>,
    invoker_proxy_binding: Option<String>,
    invoker_id: Option<VmId>,
    values: HashMap<String, Value>,
}

impl InvocationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport invoker for the remote path
    #[must_use]
    pub fn invoker(&self) -> Option<&Arc<dyn Invoker>> {
        self.invoker.as_ref()
    }

    /// Set the transport invoker
    pub fn set_invoker(&mut self, invoker: Arc<dyn Invoker>) {
        self.invoker = Some(invoker);
    }

    /// Builder form of [`set_invoker`](Self::set_invoker)
    #[must_use]
    pub fn with_invoker(mut self, invoker: Arc<dyn Invoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Target container identity
    #[must_use]
    pub fn object_name(&self) -> Option<&Value> {
        self.object_name.as_ref()
    }

    /// Set the target container identity
    pub fn set_object_name(&mut self, object_name: Value) {
        self.object_name = Some(object_name);
    }

    /// Name of the invoker proxy binding (JNDI binding of the proxy)
    #[must_use]
    pub fn invoker_proxy_binding(&self) -> Option<&str> {
        self.invoker_proxy_binding.as_deref()
    }

    /// Set the invoker proxy binding name
    pub fn set_invoker_proxy_binding(&mut self, binding: impl Into<String>) {
        self.invoker_proxy_binding = Some(binding.into());
    }

    /// Process id of the server the proxy was exported from
    #[must_use]
    pub fn invoker_id(&self) -> Option<VmId> {
        self.invoker_id
    }

    /// Record the exporting server's process id
    pub fn set_invoker_id(&mut self, id: VmId) {
        self.invoker_id = Some(id);
    }

    /// Extra named value
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Store an extra named value
    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field(
                "invoker",
                &self.invoker.as_ref().map(|i| i.server_host_name()),
            )
            .field("object_name", &self.object_name)
            .field("invoker_proxy_binding", &self.invoker_proxy_binding)
            .field("invoker_id", &self.invoker_id)
            .field("values", &self.values)
            .finish()
    }
}
