//! Property-based tests for the wire hash, literal decoding and query
//! rendering

use ejbx::ql::{BasicVisitor, decode_exact, parse};
use ejbx::{
    InterfaceDescriptor, InterfaceId, MarshalledValue, MethodHashCache, TypeDescriptor, Value,
    method_hash,
};
use proptest::prelude::*;

fn type_descriptor() -> impl Strategy<Value = TypeDescriptor> {
    let leaf = prop_oneof![
        Just(TypeDescriptor::Boolean),
        Just(TypeDescriptor::Int),
        Just(TypeDescriptor::Long),
        Just(TypeDescriptor::Double),
        "[a-z]{1,6}(\\.[A-Z][a-z]{0,6}){1,2}".prop_map(TypeDescriptor::class),
    ];
    leaf.prop_recursive(3, 8, 1, |inner| inner.prop_map(TypeDescriptor::array))
}

proptest! {
    /// Independent caches agree with the free function
    #[test]
    fn method_hash_is_deterministic(
        name in "[a-z][a-zA-Z0-9]{0,12}",
        params in proptest::collection::vec(type_descriptor(), 0..5),
        ret in type_descriptor(),
    ) {
        let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Any", 1));
        let method = iface.declare(name, params, ret);
        let expected = method_hash(&method).unwrap();

        prop_assert_eq!(MethodHashCache::new().hash_of(&method).unwrap(), expected);
        let map = MethodHashCache::new().register_interface(&iface).unwrap();
        prop_assert_eq!(map.resolve(expected).unwrap().descriptor(), method.descriptor());
    }

    /// Argument lists of arbitrary doubles survive an envelope bit for bit
    #[test]
    fn double_arguments_survive_marshalling(doubles in proptest::collection::vec(
        prop_oneof![
            any::<f64>(),
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ],
        0..8,
    )) {
        let arguments = Value::List(doubles.iter().copied().map(Value::Double).collect());
        let envelope = MarshalledValue::new(&arguments).unwrap();
        let copy = MarshalledValue::from_bytes(envelope.as_bytes().clone());
        let decoded = copy.get().unwrap();
        let items = decoded.as_list().unwrap();
        prop_assert_eq!(items.len(), doubles.len());
        for (item, d) in items.iter().zip(&doubles) {
            let back = item.as_f64().unwrap();
            prop_assert!(back.to_bits() == d.to_bits() || (back.is_nan() && d.is_nan()));
        }
    }

    /// Every i64 survives decimal, hex and octal spelling
    #[test]
    fn exact_literals_decode_every_i64(value in any::<i64>()) {
        prop_assert_eq!(decode_exact(&value.to_string()).unwrap(), value);
        prop_assert_eq!(decode_exact(&format!("{value}L")).unwrap(), value);
        prop_assert_eq!(decode_exact(&format!("0x{value:x}")).unwrap(), value);
        prop_assert_eq!(decode_exact(&format!("0{value:o}")).unwrap(), value);
    }

    /// Positive decimals beyond i64 are rejected rather than wrapped
    #[test]
    fn oversized_decimals_are_rejected(excess in 1u64..u64::MAX / 2) {
        let literal = (u128::from(i64::MAX.unsigned_abs()) + u128::from(excess)).to_string();
        prop_assert!(decode_exact(&literal).is_err());
    }

    /// Canonical text renders to itself
    #[test]
    fn canonical_text_is_stable(
        field in "x[a-z]{0,7}",
        value in 0i64..1_000_000,
        param in 1u32..20,
    ) {
        let query = format!(
            "SELECT OBJECT(o) FROM Order AS o WHERE o.{field} > {value} OR o.{field} = ?{param}"
        );
        let first = BasicVisitor::render(&parse(&query).unwrap()).unwrap();
        let second = BasicVisitor::render(&parse(&first).unwrap()).unwrap();
        prop_assert_eq!(&first, &second);
    }
}

#[test]
fn exact_literal_boundaries() {
    assert_eq!(decode_exact("9223372036854775807").unwrap(), i64::MAX);
    assert_eq!(decode_exact("-9223372036854775808").unwrap(), i64::MIN);
    assert!(decode_exact("9223372036854775808").is_err());
    assert_eq!(decode_exact("0x7fffffffffffffff").unwrap(), i64::MAX);
    assert_eq!(decode_exact("0x8000000000000000").unwrap(), i64::MIN);
    assert_eq!(decode_exact("0xffffffffffffffff").unwrap(), -1);
    assert_eq!(decode_exact("01000000000000000000000").unwrap(), i64::MIN);
    assert_eq!(decode_exact("0777777777777777777777").unwrap(), i64::MAX);
    assert!(decode_exact("02000000000000000000000").is_err());
    assert!(decode_exact("0x10000000000000000").is_err());
}
