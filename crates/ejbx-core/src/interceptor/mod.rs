//! Interceptor chains
//!
//! A chain is an ordered list of [`Interceptor`]s built once and shared by
//! every call through it. Each interceptor receives the invocation and a
//! [`Next`] handle to the rest of the chain; the last one is a terminal
//! interceptor that hands the call to an invoker.

mod invoker;
mod statistics;

pub use invoker::{ByValueInvokerInterceptor, InvokerInterceptor, MarshallingInvokerInterceptor};
pub use statistics::StatisticsInterceptor;

use ejbx_domain::VmId;
use std::fmt;
use std::sync::Arc;

use crate::config::InvocationConfig;
use crate::error::{InvocationError, InvocationResult};
use crate::invocation::Invocation;
use crate::invoker::LocalInvokerBinding;
use crate::marshal::MethodHashCache;
use crate::stats::InvocationStatistics;

/// One stage of a chain.
///
/// Implementations hold no per-call mutable state; the same instance serves
/// concurrent calls.
pub trait Interceptor: Send + Sync {
    /// Process `invocation`, usually by calling `next.invoke(invocation)`
    fn invoke(&self, invocation: &mut Invocation, next: Next<'_>) -> InvocationResult;

    /// Short name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Interceptor")
    }
}

/// The remainder of a chain after the current interceptor
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    fn new(rest: &'a [Arc<dyn Interceptor>]) -> Self {
        Self { rest }
    }

    /// Pass `invocation` to the next interceptor. Running past the end of
    /// the chain means it has no terminal stage.
    pub fn invoke(self, invocation: &mut Invocation) -> InvocationResult {
        match self.rest.split_first() {
            Some((head, tail)) => head.invoke(invocation, Next::new(tail)),
            None => Err(InvocationError::ChainExhausted),
        }
    }

    /// Number of interceptors left
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// An ordered, immutable list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl InterceptorChain {
    /// Build a chain
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    /// Run `invocation` through the chain
    pub fn invoke(&self, invocation: &mut Invocation) -> InvocationResult {
        let span = tracing::trace_span!("invocation", call = %invocation.call_id());
        let _enter = span.enter();
        Next::new(&self.interceptors).invoke(invocation)
    }

    /// Number of interceptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// True when the chain has no interceptors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names in chain order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Assembles chains for the containers of one process.
///
/// The factory owns the process id embedded in every terminal interceptor it
/// builds, the method hash cache shared by marshalling stages, and the
/// statistics fed by statistics stages.
#[derive(Debug, Clone)]
pub struct ChainFactory {
    vm_id: VmId,
    hashes: Arc<MethodHashCache>,
    statistics: Arc<InvocationStatistics>,
}

impl ChainFactory {
    /// Factory for chains exported by process `vm_id`
    pub fn new(vm_id: VmId) -> Self {
        Self {
            vm_id,
            hashes: Arc::new(MethodHashCache::new()),
            statistics: Arc::new(InvocationStatistics::new()),
        }
    }

    /// Share an existing hash cache
    #[must_use]
    pub fn with_hash_cache(mut self, hashes: Arc<MethodHashCache>) -> Self {
        self.hashes = hashes;
        self
    }

    /// Share existing statistics
    #[must_use]
    pub fn with_statistics(mut self, statistics: Arc<InvocationStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Process id embedded in built chains
    #[must_use]
    pub fn vm_id(&self) -> VmId {
        self.vm_id
    }

    /// Statistics fed by built chains
    #[must_use]
    pub fn statistics(&self) -> &Arc<InvocationStatistics> {
        &self.statistics
    }

    /// Method hash cache used by built chains
    #[must_use]
    pub fn hash_cache(&self) -> &Arc<MethodHashCache> {
        &self.hashes
    }

    /// Build `[statistics] extras.. terminal`.
    ///
    /// The terminal stage is a [`MarshallingInvokerInterceptor`] when
    /// `strict_marshalling` is set, a [`ByValueInvokerInterceptor`] when
    /// `call_by_value` is set, and an [`InvokerInterceptor`] otherwise.
    /// `local` is the container's in-process binding, if it has one.
    pub fn build(
        &self,
        config: &InvocationConfig,
        local: Option<LocalInvokerBinding>,
        extras: Vec<Arc<dyn Interceptor>>,
    ) -> InterceptorChain {
        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(extras.len() + 2);
        if config.collect_statistics {
            interceptors.push(Arc::new(StatisticsInterceptor::new(Arc::clone(
                &self.statistics,
            ))));
        }
        interceptors.extend(extras);

        let terminal: Arc<dyn Interceptor> = if config.strict_marshalling {
            Arc::new(MarshallingInvokerInterceptor::new(
                self.vm_id,
                local,
                Arc::clone(&self.hashes),
            ))
        } else if config.call_by_value {
            Arc::new(ByValueInvokerInterceptor::new(self.vm_id, local))
        } else {
            Arc::new(InvokerInterceptor::new(self.vm_id, local))
        };
        interceptors.push(terminal);

        let chain = InterceptorChain::new(interceptors);
        tracing::debug!(vm = %self.vm_id, chain = ?chain, "Assembled interceptor chain");
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ContainerInvoker;
    use ejbx_domain::Value;
    use parking_lot::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Interceptor for Recorder {
        fn invoke(&self, invocation: &mut Invocation, next: Next<'_>) -> InvocationResult {
            self.log.lock().push(self.label);
            next.invoke(invocation)
        }
    }

    fn local_binding(vm: VmId) -> LocalInvokerBinding {
        LocalInvokerBinding::new(
            vm,
            Arc::new(ContainerInvoker::new("local", |_: &mut Invocation| {
                Ok(Value::from("local"))
            })),
        )
    }

    #[test]
    fn test_chain_without_terminal_is_exhausted() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![Arc::new(Recorder {
            label: "a",
            log: Arc::clone(&log),
        })]);
        assert_eq!(
            chain.invoke(&mut Invocation::empty()),
            Err(InvocationError::ChainExhausted)
        );
        assert_eq!(*log.lock(), vec!["a"]);
        assert_eq!(
            InterceptorChain::default().invoke(&mut Invocation::empty()),
            Err(InvocationError::ChainExhausted)
        );
    }

    #[test]
    fn test_factory_orders_stages() {
        let vm = VmId::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let extras: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(Recorder { label: "first", log: Arc::clone(&log) }),
            Arc::new(Recorder { label: "second", log: Arc::clone(&log) }),
        ];
        let factory = ChainFactory::new(vm);
        let chain = factory.build(&InvocationConfig::default(), Some(local_binding(vm)), extras);

        assert_eq!(
            chain.names(),
            vec!["StatisticsInterceptor", "Recorder", "Recorder", "InvokerInterceptor"]
        );
        assert_eq!(chain.invoke(&mut Invocation::empty()), Ok(Value::from("local")));
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_factory_selects_terminal_from_config() {
        let vm = VmId::new();
        let factory = ChainFactory::new(vm);

        let config = InvocationConfig {
            call_by_value: true,
            collect_statistics: false,
            ..InvocationConfig::default()
        };
        let chain = factory.build(&config, None, Vec::new());
        assert_eq!(chain.names(), vec!["ByValueInvokerInterceptor"]);

        let config = InvocationConfig {
            call_by_value: true,
            strict_marshalling: true,
            collect_statistics: false,
            ..InvocationConfig::default()
        };
        let chain = factory.build(&config, None, Vec::new());
        assert_eq!(chain.names(), vec!["MarshallingInvokerInterceptor"]);
    }
}
