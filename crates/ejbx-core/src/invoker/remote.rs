//! Marshalled invocation over a byte transport

use bytes::Bytes;
use std::sync::Arc;

use super::Invoker;
use crate::error::InvocationResult;
use crate::invocation::Invocation;
use crate::marshal::{InvocationResponse, MarshalledInvocation, MethodHashCache, MethodMap};

/// Request/response byte channel to a peer server.
pub trait Transport: Send + Sync {
    /// Send an encoded invocation and wait for the encoded response
    fn send(&self, request: Bytes) -> InvocationResult<Bytes>;

    /// Host name of the peer
    fn host_name(&self) -> String;
}

/// Invoker that marshals each call and sends it through a [`Transport`].
pub struct RemoteInvoker<T: Transport> {
    transport: T,
    hashes: Arc<MethodHashCache>,
}

impl<T: Transport> RemoteInvoker<T> {
    /// Create an invoker sharing `hashes` with other invokers of the process
    pub fn new(transport: T, hashes: Arc<MethodHashCache>) -> Self {
        Self { transport, hashes }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Invoker for RemoteInvoker<T> {
    fn invoke(&self, invocation: &mut Invocation) -> InvocationResult {
        let request = MarshalledInvocation::from_invocation(invocation, &self.hashes)?.write_external()?;
        tracing::trace!(
            call = %invocation.call_id(),
            host = %self.transport.host_name(),
            bytes = request.len(),
            "Sending invocation"
        );
        let response = self.transport.send(request)?;
        InvocationResponse::read(response)?.into_result()
    }

    fn server_host_name(&self) -> String {
        self.transport.host_name()
    }
}

/// Receiving half of a transport: decodes a request, invokes the container
/// and encodes the outcome.
pub struct InvocationDispatcher {
    method_map: Arc<MethodMap>,
    target: Arc<dyn Invoker>,
}

impl InvocationDispatcher {
    /// Dispatch requests to `target`, resolving methods through `method_map`
    pub fn new(method_map: Arc<MethodMap>, target: Arc<dyn Invoker>) -> Self {
        Self { method_map, target }
    }

    /// Handle one request. Every failure, including a malformed request, is
    /// reported inside the encoded response.
    pub fn dispatch(&self, request: Bytes) -> InvocationResult<Bytes> {
        let result = self.decode_and_invoke(request);
        match InvocationResponse::from_result(result).write() {
            Ok(bytes) => Ok(bytes),
            Err(err) => InvocationResponse::Failure(err).write(),
        }
    }

    fn decode_and_invoke(&self, request: Bytes) -> InvocationResult {
        let mut marshalled = MarshalledInvocation::read_external(request)?;
        marshalled.set_method_map(Arc::clone(&self.method_map));
        let mut invocation = marshalled.into_invocation()?;
        tracing::trace!(call = %invocation.call_id(), "Dispatching received invocation");
        self.target.invoke(&mut invocation)
    }
}

/// In-process transport feeding an [`InvocationDispatcher`] directly.
#[derive(Clone)]
pub struct LoopbackTransport {
    host: String,
    dispatcher: Arc<InvocationDispatcher>,
}

impl LoopbackTransport {
    /// Connect to `dispatcher`
    pub fn new(host: impl Into<String>, dispatcher: Arc<InvocationDispatcher>) -> Self {
        Self {
            host: host.into(),
            dispatcher,
        }
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, request: Bytes) -> InvocationResult<Bytes> {
        self.dispatcher.dispatch(request)
    }

    fn host_name(&self) -> String {
        self.host.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationError;
    use crate::invocation::{InterfaceDescriptor, InterfaceId, TypeDescriptor};
    use crate::invoker::ContainerInvoker;
    use ejbx_domain::{Fault, Value};

    fn greeter() -> InterfaceDescriptor {
        let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Greeter", 1));
        iface.declare(
            "greet",
            vec![TypeDescriptor::class("java.lang.String")],
            TypeDescriptor::class("java.lang.String"),
        );
        iface.declare("fail", vec![], TypeDescriptor::Void);
        iface
    }

    fn remote(iface: &InterfaceDescriptor) -> RemoteInvoker<LoopbackTransport> {
        let container = ContainerInvoker::new("server", |inv: &mut Invocation| {
            let method = inv.method().map(|m| m.name.clone()).unwrap_or_default();
            match method.as_str() {
                "greet" => {
                    let name = inv.arguments()[0].as_str().unwrap_or("?").to_string();
                    Ok(Value::from(format!("hello {name}")))
                }
                _ => Err(InvocationError::Application(Fault::checked(
                    "com.acme.GreetingRefused",
                    "no",
                ))),
            }
        });
        let dispatcher = InvocationDispatcher::new(
            Arc::new(MethodMap::for_interface(iface).unwrap()),
            Arc::new(container),
        );
        RemoteInvoker::new(
            LoopbackTransport::new("server", Arc::new(dispatcher)),
            Arc::new(MethodHashCache::new()),
        )
    }

    #[test]
    fn test_loopback_call_returns_value() {
        let iface = greeter();
        let invoker = remote(&iface);
        let mut invocation =
            Invocation::new(Arc::clone(&iface.methods()[0]), vec![Value::from("bob")]);
        assert_eq!(invoker.invoke(&mut invocation), Ok(Value::from("hello bob")));
        assert_eq!(invoker.server_host_name(), "server");
    }

    #[test]
    fn test_loopback_call_propagates_fault() {
        let iface = greeter();
        let invoker = remote(&iface);
        let mut invocation = Invocation::new(Arc::clone(&iface.methods()[1]), vec![]);
        let err = invoker.invoke(&mut invocation).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.fault().map(|f| f.class_name.as_str()), Some("com.acme.GreetingRefused"));
    }

    #[test]
    fn test_malformed_request_is_reported_in_response() {
        let iface = greeter();
        let dispatcher = InvocationDispatcher::new(
            Arc::new(MethodMap::for_interface(&iface).unwrap()),
            Arc::new(ContainerInvoker::new("server", |_: &mut Invocation| Ok(Value::Null))),
        );
        let bytes = dispatcher.dispatch(Bytes::from_static(b"garbage")).unwrap();
        assert!(matches!(
            InvocationResponse::read(bytes).unwrap(),
            InvocationResponse::Failure(InvocationError::Marshalling(_))
        ));
    }
}
