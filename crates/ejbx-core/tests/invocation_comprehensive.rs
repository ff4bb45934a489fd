//! Comprehensive tests for the invocation side
//!
//! Covers:
//! - Tiered payload lookup
//! - Method hash uniqueness and cache eviction
//! - Wire round trips of invocations
//! - Local versus remote routing of every terminal interceptor
//! - Statistics under concurrent calls

use ejbx::{
    ChainFactory, ContainerInvoker, Fault, InterfaceDescriptor, InterfaceId, Invocation,
    InvocationConfig, InvocationContext, InvocationDispatcher, InvocationError,
    InvocationKey, InvocationStatistics, InvocationType, Invoker, LocalInvokerBinding,
    LoopbackTransport, MarshalledInvocation, MethodHashCache, MethodMap, PayloadKey,
    PayloadTier, RemoteInvoker, TypeDescriptor, Value, VmId, method_hash,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn cart() -> InterfaceDescriptor {
    let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Cart", 3));
    iface.declare(
        "add",
        vec![TypeDescriptor::class("java.lang.String"), TypeDescriptor::Int],
        TypeDescriptor::Boolean,
    );
    iface.declare("clear", Vec::new(), TypeDescriptor::Void);
    iface
}

fn tagged(tag: &'static str) -> Arc<ContainerInvoker> {
    Arc::new(ContainerInvoker::new(tag, move |_: &mut Invocation| {
        Ok(Value::from(tag))
    }))
}

/// Remote invoker whose far side answers with `tag`
fn loopback(iface: &InterfaceDescriptor, tag: &'static str) -> Arc<dyn Invoker> {
    let hashes = Arc::new(MethodHashCache::new());
    let map = Arc::new(hashes.register_interface(iface).unwrap());
    let dispatcher = Arc::new(InvocationDispatcher::new(map, tagged(tag)));
    Arc::new(RemoteInvoker::new(
        LoopbackTransport::new("far-host", dispatcher),
        hashes,
    ))
}

fn add_call(iface: &InterfaceDescriptor, kind: InvocationType) -> Invocation {
    let method = Arc::clone(iface.method("add").unwrap());
    Invocation::new(method, vec![Value::from("apple"), Value::Int(2)])
        .with_type(kind)
        .with_context(InvocationContext::new().with_invoker(loopback(iface, "remote")))
}

// === Payload tiers ===

#[test]
fn test_tier_is_invisible_to_lookup() {
    let mut invocation = Invocation::empty();
    invocation.set_payload_value("a", Value::Int(1));
    invocation.set_as_is_value("b", Value::Int(2));
    invocation.set_transient_value("c", Value::Int(3));

    for (key, expected) in [("a", 1), ("b", 2), ("c", 3)] {
        assert_eq!(
            invocation.get_value(&PayloadKey::from(key)),
            Some(&Value::Int(expected))
        );
    }
    assert_eq!(invocation.get_value(&PayloadKey::from("d")), None);
}

#[test]
fn test_payload_tier_shadows_the_others() {
    let key = PayloadKey::from(InvocationKey::Principal);
    let mut invocation = Invocation::empty();
    invocation.set_value(key.clone(), Value::from("transient"), PayloadTier::Transient);
    invocation.set_value(key.clone(), Value::from("as-is"), PayloadTier::AsIs);
    assert_eq!(invocation.get_value(&key), Some(&Value::from("as-is")));
    assert_eq!(invocation.tier_of(&key), Some(PayloadTier::AsIs));

    invocation.set_value(key.clone(), Value::from("payload"), PayloadTier::Payload);
    assert_eq!(invocation.get_value(&key), Some(&Value::from("payload")));
    assert_eq!(invocation.tier_of(&key), Some(PayloadTier::Payload));

    assert_eq!(invocation.remove_value(&key), Some(Value::from("payload")));
    assert_eq!(invocation.get_value(&key), None);
}

// === Method hashes ===

#[test]
fn test_overloads_hash_uniquely() {
    let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Overloaded", 1));
    let mut component = TypeDescriptor::Long;
    for i in 0..24 {
        iface.declare("process", vec![component.clone()], TypeDescriptor::Void);
        iface.declare(
            "process",
            vec![TypeDescriptor::class(format!("com.acme.Type{i}"))],
            TypeDescriptor::Void,
        );
        component = TypeDescriptor::array(component);
    }

    let hashes: HashSet<i64> = iface.methods().iter().map(|m| method_hash(m).unwrap()).collect();
    assert_eq!(hashes.len(), 48);

    let map = MethodHashCache::new().register_interface(&iface).unwrap();
    assert_eq!(map.len(), 48);
    for method in iface.methods() {
        assert_eq!(map.resolve(method_hash(method).unwrap()).unwrap().descriptor(), method.descriptor());
    }
}

#[test]
fn test_hash_cache_agrees_and_evicts() {
    let iface = cart();
    let cache = MethodHashCache::new();
    let add = iface.method("add").unwrap();

    assert!(cache.is_empty());
    assert_eq!(cache.hash_of(add).unwrap(), method_hash(add).unwrap());
    assert!(cache.contains(iface.id()));

    let other = MethodHashCache::new();
    other.register_interface(&iface).unwrap();
    assert_eq!(other.hash_of(add).unwrap(), cache.hash_of(add).unwrap());

    assert!(cache.remove_hashes(iface.id()));
    assert!(!cache.remove_hashes(iface.id()));
    assert!(!cache.contains(iface.id()));
    assert_eq!(cache.hash_of(add).unwrap(), method_hash(add).unwrap());
}

#[test]
fn test_unknown_hash_reports_method_not_found() {
    let iface = cart();
    let dispatcher = Arc::new(InvocationDispatcher::new(
        Arc::new(MethodMap::new()),
        tagged("unreachable"),
    ));
    let invoker = RemoteInvoker::new(
        LoopbackTransport::new("far-host", dispatcher),
        Arc::new(MethodHashCache::new()),
    );
    let mut invocation = add_call(&iface, InvocationType::Remote);
    let expected = method_hash(iface.method("add").unwrap()).unwrap();
    assert_eq!(
        invoker.invoke(&mut invocation),
        Err(InvocationError::MethodNotFound { hash: expected })
    );
}

// === Marshalling ===

#[test]
fn test_marshalled_round_trip() {
    let iface = cart();
    let mut invocation = add_call(&iface, InvocationType::LocalHome).with_object_name("cart-7");
    invocation.set_transaction_propagation_context(Value::Long(99));
    invocation.set_payload_value(InvocationKey::Principal, Value::from("alice"));
    invocation.set_as_is_value("trace", Value::from(vec![Value::Int(1), Value::Int(2)]));
    invocation.set_transient_value("scratch", Value::Bool(true));

    let hashes = MethodHashCache::new();
    let marshalled = MarshalledInvocation::from_invocation(&invocation, &hashes).unwrap();
    let first = marshalled.write_external().unwrap();
    let second = marshalled.write_external().unwrap();
    assert_eq!(first, second);

    let mut received = MarshalledInvocation::read_external(first).unwrap();
    assert_eq!(received.method_hash(), marshalled.method_hash());
    received.set_method_map(Arc::new(hashes.register_interface(&iface).unwrap()));

    let rebuilt = received.into_invocation().unwrap();
    assert_eq!(rebuilt.method().unwrap().name, "add");
    assert_eq!(rebuilt.arguments(), invocation.arguments());
    assert_eq!(rebuilt.object_name(), &Value::from("cart-7"));
    assert_eq!(rebuilt.invocation_type(), InvocationType::LocalHome);
    assert_eq!(rebuilt.transaction_propagation_context(), Some(&Value::Long(99)));
    assert_eq!(
        rebuilt.get_value(&InvocationKey::Principal.into()),
        Some(&Value::from("alice"))
    );
    assert_eq!(
        rebuilt.tier_of(&PayloadKey::from("trace")),
        Some(PayloadTier::AsIs)
    );
    assert_eq!(rebuilt.get_value(&PayloadKey::from("scratch")), None);
}

#[test]
fn test_non_finite_doubles_cross_the_wire() {
    let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Meter", 1));
    let record = iface.declare(
        "record",
        vec![TypeDescriptor::Double, TypeDescriptor::Double, TypeDescriptor::Double],
        TypeDescriptor::Double,
    );
    let arguments = vec![
        Value::Double(f64::INFINITY),
        Value::Double(f64::NEG_INFINITY),
        Value::Double(-0.0),
    ];
    let mut invocation = Invocation::new(record, arguments.clone());
    invocation.set_payload_value("reading", Value::Double(f64::NAN));

    let hashes = MethodHashCache::new();
    let bytes = MarshalledInvocation::from_invocation(&invocation, &hashes)
        .unwrap()
        .write_external()
        .unwrap();
    let mut received = MarshalledInvocation::read_external(bytes).unwrap();
    received.set_method_map(Arc::new(hashes.register_interface(&iface).unwrap()));
    let rebuilt = received.into_invocation().unwrap();

    assert_eq!(rebuilt.arguments(), arguments.as_slice());
    assert_eq!(rebuilt.arguments()[2].as_f64().map(f64::is_sign_negative), Some(true));
    assert!(rebuilt
        .get_value(&PayloadKey::from("reading"))
        .and_then(Value::as_f64)
        .is_some_and(f64::is_nan));
}

#[test]
fn test_strict_marshalling_carries_non_finite_doubles() {
    let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Meter", 1));
    let scale = iface.declare("scale", vec![TypeDescriptor::Double], TypeDescriptor::Double);
    let vm = VmId::new();
    let doubling: Arc<dyn Invoker> = Arc::new(ContainerInvoker::new("local", |inv: &mut Invocation| {
        let x = inv.arguments().first().and_then(Value::as_f64).unwrap_or_default();
        Ok(Value::Double(x * 2.0))
    }));
    let strict = InvocationConfig {
        strict_marshalling: true,
        ..InvocationConfig::default()
    };
    let chain = ChainFactory::new(vm).build(
        &strict,
        Some(LocalInvokerBinding::new(vm, doubling)),
        Vec::new(),
    );

    let mut invocation = Invocation::new(Arc::clone(&scale), vec![Value::Double(f64::NEG_INFINITY)]);
    assert_eq!(chain.invoke(&mut invocation), Ok(Value::Double(f64::NEG_INFINITY)));

    let mut invocation = Invocation::new(scale, vec![Value::Double(f64::NAN)]);
    let result = chain.invoke(&mut invocation).unwrap();
    assert!(result.as_f64().is_some_and(f64::is_nan));
}

#[test]
fn test_process_local_values_cannot_be_marshalled() {
    let iface = cart();
    let mut invocation = add_call(&iface, InvocationType::Remote);
    invocation.set_payload_value("handle", Value::local(7u32));
    assert!(matches!(
        MarshalledInvocation::from_invocation(&invocation, &MethodHashCache::new()),
        Err(InvocationError::Marshalling(_))
    ));

    let mut invocation = add_call(&iface, InvocationType::Remote);
    invocation.set_transient_value("handle", Value::local(7u32));
    assert!(MarshalledInvocation::from_invocation(&invocation, &MethodHashCache::new()).is_ok());
}

// === Routing ===

#[test]
fn test_plain_chain_routes_by_process() {
    let iface = cart();
    let vm = VmId::new();
    let config = InvocationConfig::default();

    let factory = ChainFactory::new(vm);
    let local = LocalInvokerBinding::new(vm, tagged("local"));
    let chain = factory.build(&config, Some(local), Vec::new());
    for kind in [InvocationType::Remote, InvocationType::Local] {
        assert_eq!(
            chain.invoke(&mut add_call(&iface, kind)),
            Ok(Value::from("local"))
        );
    }

    let elsewhere = LocalInvokerBinding::new(VmId::new(), tagged("local"));
    let chain = factory.build(&config, Some(elsewhere), Vec::new());
    assert_eq!(
        chain.invoke(&mut add_call(&iface, InvocationType::Local)),
        Ok(Value::from("remote"))
    );
}

#[test]
fn test_by_value_chain_routes_by_interface_kind() {
    let iface = cart();
    let vm = VmId::new();
    let config = InvocationConfig {
        call_by_value: true,
        ..InvocationConfig::default()
    };
    let chain = ChainFactory::new(vm).build(
        &config,
        Some(LocalInvokerBinding::new(vm, tagged("local"))),
        Vec::new(),
    );

    let expectations = [
        (InvocationType::Local, "local"),
        (InvocationType::LocalHome, "local"),
        (InvocationType::Remote, "remote"),
        (InvocationType::Home, "remote"),
    ];
    for (kind, expected) in expectations {
        assert_eq!(
            chain.invoke(&mut add_call(&iface, kind)),
            Ok(Value::from(expected)),
            "{kind}"
        );
    }
}

#[test]
fn test_strict_marshalling_isolates_the_caller() {
    let iface = cart();
    let vm = VmId::new();
    let mutating: Arc<dyn Invoker> = Arc::new(ContainerInvoker::new("local", |inv: &mut Invocation| {
        let count = inv.arguments().len();
        inv.set_arguments(Vec::new());
        Ok(Value::Long(i64::try_from(count).unwrap_or(-1)))
    }));

    let by_reference = ChainFactory::new(vm).build(
        &InvocationConfig::default(),
        Some(LocalInvokerBinding::new(vm, Arc::clone(&mutating))),
        Vec::new(),
    );
    let mut invocation = add_call(&iface, InvocationType::Local);
    assert_eq!(by_reference.invoke(&mut invocation), Ok(Value::Long(2)));
    assert!(invocation.arguments().is_empty());

    let strict = InvocationConfig {
        strict_marshalling: true,
        ..InvocationConfig::default()
    };
    let by_value = ChainFactory::new(vm).build(
        &strict,
        Some(LocalInvokerBinding::new(vm, mutating)),
        Vec::new(),
    );
    let mut invocation = add_call(&iface, InvocationType::Local);
    assert_eq!(by_value.invoke(&mut invocation), Ok(Value::Long(2)));
    assert_eq!(invocation.arguments().len(), 2);
}

#[test]
fn test_strict_marshalling_checks_failures() {
    let iface = cart();
    let vm = VmId::new();
    let failing: Arc<dyn Invoker> = Arc::new(ContainerInvoker::new("local", |_: &mut Invocation| {
        Err(InvocationError::Throwable(Fault::error(
            "java.lang.OutOfMemoryError",
            "heap",
        )))
    }));
    let binding = LocalInvokerBinding::new(vm, failing);

    let plain = ChainFactory::new(vm).build(
        &InvocationConfig::default(),
        Some(binding.clone()),
        Vec::new(),
    );
    assert!(matches!(
        plain.invoke(&mut add_call(&iface, InvocationType::Local)),
        Err(InvocationError::Throwable(_))
    ));

    let strict = InvocationConfig {
        strict_marshalling: true,
        ..InvocationConfig::default()
    };
    let chain = ChainFactory::new(vm).build(&strict, Some(binding), Vec::new());
    let err = chain
        .invoke(&mut add_call(&iface, InvocationType::Local))
        .unwrap_err();
    assert!(matches!(err, InvocationError::Undeclared(_)));
    assert_eq!(err.fault().unwrap().class_name, "java.lang.OutOfMemoryError");
}

// === Statistics ===

#[test]
fn test_concurrent_update_stats() {
    let stats = Arc::new(InvocationStatistics::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                for i in 0..250u64 {
                    stats.update_stats("shared", i % 10);
                    stats.update_stats(&format!("own-{t}"), t);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let shared = stats.method_stats("shared").unwrap();
    assert_eq!(shared.count, 2000);
    assert_eq!(shared.min_time, 0);
    assert_eq!(shared.max_time, 9);
    assert_eq!(shared.total_time, 8 * 25 * 45);
    for t in 0..8u64 {
        let own = stats.method_stats(&format!("own-{t}")).unwrap();
        assert_eq!(own.count, 250);
        assert_eq!(own.total_time, 250 * t);
    }
    assert_eq!(stats.snapshot().methods.len(), 9);
}

#[test]
fn test_chain_feeds_statistics_from_many_threads() {
    let iface = Arc::new(cart());
    let vm = VmId::new();
    let factory = ChainFactory::new(vm);
    let chain = Arc::new(factory.build(
        &InvocationConfig::default(),
        Some(LocalInvokerBinding::new(vm, tagged("local"))),
        Vec::new(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let chain = Arc::clone(&chain);
            let iface = Arc::clone(&iface);
            thread::spawn(move || {
                for _ in 0..50 {
                    chain
                        .invoke(&mut add_call(&iface, InvocationType::Local))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = factory.statistics();
    assert_eq!(stats.method_stats("add").unwrap().count, 200);
    assert_eq!(stats.concurrent_calls(), 0);
    assert!(stats.max_concurrent_calls() >= 1);
    assert!(stats.to_xml().contains("<method name='add' count='200'"));
}
