//! Timing stage feeding per-method invocation statistics

use std::sync::Arc;
use std::time::Instant;

use super::{Interceptor, Next};
use crate::error::InvocationResult;
use crate::invocation::Invocation;
use crate::stats::InvocationStatistics;

/// Times every call passing through and records it per method name.
#[derive(Debug, Clone)]
pub struct StatisticsInterceptor {
    stats: Arc<InvocationStatistics>,
}

impl StatisticsInterceptor {
    /// Record into `stats`
    pub fn new(stats: Arc<InvocationStatistics>) -> Self {
        Self { stats }
    }

    /// Statistics being recorded into
    #[must_use]
    pub fn statistics(&self) -> &Arc<InvocationStatistics> {
        &self.stats
    }
}

impl Interceptor for StatisticsInterceptor {
    fn invoke(&self, invocation: &mut Invocation, next: Next<'_>) -> InvocationResult {
        let _call = self.stats.enter();
        let start = Instant::now();
        let result = next.invoke(invocation);
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match invocation.method() {
            Some(method) => self.stats.update_stats(&method.name, elapsed_ms),
            None => self.stats.update_stats("<unknown>", elapsed_ms),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationError;
    use crate::interceptor::InterceptorChain;
    use crate::invocation::{InterfaceId, MethodDescriptor, TypeDescriptor};
    use ejbx_domain::Value;

    struct Terminal;

    impl Interceptor for Terminal {
        fn invoke(&self, invocation: &mut Invocation, _next: Next<'_>) -> InvocationResult {
            match invocation.arguments().first() {
                Some(Value::Bool(true)) => Err(InvocationError::transport("down")),
                _ => Ok(Value::Null),
            }
        }
    }

    #[test]
    fn test_records_successes_and_failures() {
        let stats = Arc::new(InvocationStatistics::new());
        let chain = InterceptorChain::new(vec![
            Arc::new(StatisticsInterceptor::new(Arc::clone(&stats))),
            Arc::new(Terminal),
        ]);
        let method = Arc::new(MethodDescriptor::new(
            InterfaceId::new("com.acme.Ping", 1),
            "ping",
            vec![TypeDescriptor::Boolean],
            TypeDescriptor::Void,
        ));

        chain
            .invoke(&mut Invocation::new(Arc::clone(&method), vec![Value::Bool(false)]))
            .unwrap();
        chain
            .invoke(&mut Invocation::new(method, vec![Value::Bool(true)]))
            .unwrap_err();

        assert_eq!(stats.method_stats("ping").unwrap().count, 2);
        assert_eq!(stats.concurrent_calls(), 0);
        assert_eq!(stats.max_concurrent_calls(), 1);
    }
}
