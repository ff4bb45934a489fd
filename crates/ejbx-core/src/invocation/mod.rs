//! The payload container carried through an interceptor chain
//!
//! An [`Invocation`] stores its values in three tiers that differ only in how
//! they cross a process boundary:
//!
//! - **payload**: marshalled entry by entry, each decodable on its own
//! - **as-is**: written raw, without a per-entry envelope
//! - **transient**: never leaves the process
//!
//! Inside one process the tier is invisible: [`Invocation::get_value`] checks
//! payload, then as-is, then transient, and returns the first hit.

mod context;
mod method;

pub use context::InvocationContext;
pub use method::{InterfaceDescriptor, InterfaceId, MethodDescriptor, TypeDescriptor};

use ejbx_domain::{CallId, InvocationKey, InvocationType, PayloadKey, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage tier of a payload entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadTier {
    /// Marshalled per entry when crossing a boundary
    Payload,
    /// Written raw when crossing a boundary
    AsIs,
    /// Never crosses a boundary
    Transient,
}

/// One call in flight.
///
/// Owned by exactly one call path; interceptors receive `&mut` access one
/// after another, so no locking is involved.
#[derive(Debug, Clone)]
pub struct Invocation {
    call_id: CallId,
    payload: HashMap<PayloadKey, Value>,
    as_is_payload: HashMap<PayloadKey, Value>,
    transient_payload: HashMap<PayloadKey, Value>,
    method: Option<Arc<MethodDescriptor>>,
    arguments: Vec<Value>,
    object_name: Value,
    invocation_type: InvocationType,
    propagation_context: Option<Value>,
    context: InvocationContext,
}

impl Invocation {
    /// Create an invocation of `method` with `arguments`
    pub fn new(method: Arc<MethodDescriptor>, arguments: Vec<Value>) -> Self {
        Self {
            method: Some(method),
            arguments,
            ..Self::empty()
        }
    }

    /// Create an invocation with no method or arguments yet
    pub fn empty() -> Self {
        Self {
            call_id: CallId::new(),
            payload: HashMap::new(),
            as_is_payload: HashMap::new(),
            transient_payload: HashMap::new(),
            method: None,
            arguments: Vec::new(),
            object_name: Value::Null,
            invocation_type: InvocationType::default(),
            propagation_context: None,
            context: InvocationContext::new(),
        }
    }

    /// Builder: set the target identity
    #[must_use]
    pub fn with_object_name(mut self, object_name: impl Into<Value>) -> Self {
        self.object_name = object_name.into();
        self
    }

    /// Builder: set the call kind
    #[must_use]
    pub fn with_type(mut self, invocation_type: InvocationType) -> Self {
        self.invocation_type = invocation_type;
        self
    }

    /// Builder: set the side-channel context
    #[must_use]
    pub fn with_context(mut self, context: InvocationContext) -> Self {
        self.context = context;
        self
    }

    /// Correlation id of this call
    #[must_use]
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    // === Generic tiered access ===

    /// Store `value` under `key` in `tier`
    pub fn set_value(&mut self, key: impl Into<PayloadKey>, value: Value, tier: PayloadTier) {
        self.tier_mut(tier).insert(key.into(), value);
    }

    /// Look `key` up in payload, then as-is, then transient tier
    #[must_use]
    pub fn get_value(&self, key: &PayloadKey) -> Option<&Value> {
        self.payload
            .get(key)
            .or_else(|| self.as_is_payload.get(key))
            .or_else(|| self.transient_payload.get(key))
    }

    /// Tier currently holding `key`, using the same precedence as
    /// [`get_value`](Self::get_value)
    #[must_use]
    pub fn tier_of(&self, key: &PayloadKey) -> Option<PayloadTier> {
        if self.payload.contains_key(key) {
            Some(PayloadTier::Payload)
        } else if self.as_is_payload.contains_key(key) {
            Some(PayloadTier::AsIs)
        } else if self.transient_payload.contains_key(key) {
            Some(PayloadTier::Transient)
        } else {
            None
        }
    }

    /// Remove `key` from every tier, returning the value that
    /// [`get_value`](Self::get_value) would have returned
    pub fn remove_value(&mut self, key: &PayloadKey) -> Option<Value> {
        let payload = self.payload.remove(key);
        let as_is = self.as_is_payload.remove(key);
        let transient = self.transient_payload.remove(key);
        payload.or(as_is).or(transient)
    }

    /// Shorthand for the payload tier
    pub fn set_payload_value(&mut self, key: impl Into<PayloadKey>, value: Value) {
        self.set_value(key, value, PayloadTier::Payload);
    }

    /// Shorthand for the as-is tier
    pub fn set_as_is_value(&mut self, key: impl Into<PayloadKey>, value: Value) {
        self.set_value(key, value, PayloadTier::AsIs);
    }

    /// Shorthand for the transient tier
    pub fn set_transient_value(&mut self, key: impl Into<PayloadKey>, value: Value) {
        self.set_value(key, value, PayloadTier::Transient);
    }

    /// Payload tier entries
    #[must_use]
    pub fn payload(&self) -> &HashMap<PayloadKey, Value> {
        &self.payload
    }

    /// As-is tier entries
    #[must_use]
    pub fn as_is_payload(&self) -> &HashMap<PayloadKey, Value> {
        &self.as_is_payload
    }

    /// Transient tier entries
    #[must_use]
    pub fn transient_payload(&self) -> &HashMap<PayloadKey, Value> {
        &self.transient_payload
    }

    fn tier_mut(&mut self, tier: PayloadTier) -> &mut HashMap<PayloadKey, Value> {
        match tier {
            PayloadTier::Payload => &mut self.payload,
            PayloadTier::AsIs => &mut self.as_is_payload,
            PayloadTier::Transient => &mut self.transient_payload,
        }
    }

    fn well_known(&self, key: InvocationKey) -> Option<&Value> {
        self.get_value(&PayloadKey::Key(key))
    }

    // === Typed accessors ===

    /// Associate a transaction handle with the call.
    ///
    /// A serializable handle goes to the as-is tier; a live handle goes to
    /// the transient tier so that in-process calls never try to encode it.
    pub fn set_transaction(&mut self, transaction: Value) {
        let tier = if transaction.is_serializable() {
            PayloadTier::AsIs
        } else {
            PayloadTier::Transient
        };
        self.set_value(InvocationKey::Transaction, transaction, tier);
    }

    /// Transaction handle, from whichever tier holds it
    #[must_use]
    pub fn transaction(&self) -> Option<&Value> {
        self.well_known(InvocationKey::Transaction)
    }

    /// Caller principal (payload tier)
    pub fn set_principal(&mut self, principal: Value) {
        self.set_payload_value(InvocationKey::Principal, principal);
    }

    /// Caller principal
    #[must_use]
    pub fn principal(&self) -> Option<&Value> {
        self.well_known(InvocationKey::Principal)
    }

    /// Caller credential (payload tier)
    pub fn set_credential(&mut self, credential: Value) {
        self.set_payload_value(InvocationKey::Credential, credential);
    }

    /// Caller credential
    #[must_use]
    pub fn credential(&self) -> Option<&Value> {
        self.well_known(InvocationKey::Credential)
    }

    /// Live enterprise context of the target instance (transient tier)
    pub fn set_enterprise_context(&mut self, context: Value) {
        self.set_transient_value(InvocationKey::EnterpriseContext, context);
    }

    /// Live enterprise context
    #[must_use]
    pub fn enterprise_context(&self) -> Option<&Value> {
        self.well_known(InvocationKey::EnterpriseContext)
    }

    /// Identity of the target instance (payload tier)
    pub fn set_id(&mut self, id: Value) {
        self.set_payload_value(InvocationKey::CacheId, id);
    }

    /// Identity of the target instance
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.well_known(InvocationKey::CacheId)
    }

    /// Opaque transaction propagation context shipped instead of the live
    /// transaction handle
    pub fn set_transaction_propagation_context(&mut self, tpc: Value) {
        self.propagation_context = Some(tpc);
    }

    /// Transaction propagation context
    #[must_use]
    pub fn transaction_propagation_context(&self) -> Option<&Value> {
        self.propagation_context.as_ref()
    }

    /// Invoked method
    #[must_use]
    pub fn method(&self) -> Option<&Arc<MethodDescriptor>> {
        self.method.as_ref()
    }

    /// Set the invoked method
    pub fn set_method(&mut self, method: Arc<MethodDescriptor>) {
        self.method = Some(method);
    }

    /// Call arguments
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Replace the call arguments
    pub fn set_arguments(&mut self, arguments: Vec<Value>) {
        self.arguments = arguments;
    }

    /// Target identity
    #[must_use]
    pub fn object_name(&self) -> &Value {
        &self.object_name
    }

    /// Set the target identity
    pub fn set_object_name(&mut self, object_name: Value) {
        self.object_name = object_name;
    }

    /// Call kind
    #[must_use]
    pub fn invocation_type(&self) -> InvocationType {
        self.invocation_type
    }

    /// Set the call kind
    pub fn set_invocation_type(&mut self, invocation_type: InvocationType) {
        self.invocation_type = invocation_type;
    }

    /// Side-channel context
    #[must_use]
    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    /// Mutable side-channel context
    pub fn context_mut(&mut self) -> &mut InvocationContext {
        &mut self.context
    }
}

impl Default for Invocation {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct LiveTx;

    fn method() -> Arc<MethodDescriptor> {
        Arc::new(MethodDescriptor::new(
            InterfaceId::new("com.acme.Order", 1),
            "getTotal",
            vec![],
            TypeDescriptor::Double,
        ))
    }

    #[test]
    fn test_tier_is_invisible_to_generic_getter() {
        for tier in [PayloadTier::Payload, PayloadTier::AsIs, PayloadTier::Transient] {
            let mut invocation = Invocation::new(method(), vec![]);
            invocation.set_value("tenant", Value::from("acme"), tier);
            assert_eq!(
                invocation.get_value(&PayloadKey::name("tenant")),
                Some(&Value::from("acme"))
            );
            assert_eq!(invocation.tier_of(&PayloadKey::name("tenant")), Some(tier));
        }
    }

    #[test]
    fn test_payload_tier_takes_precedence() {
        let mut invocation = Invocation::empty();
        invocation.set_transient_value("k", Value::Int(3));
        invocation.set_as_is_value("k", Value::Int(2));
        invocation.set_payload_value("k", Value::Int(1));
        assert_eq!(invocation.get_value(&PayloadKey::name("k")), Some(&Value::Int(1)));

        invocation.payload.remove(&PayloadKey::name("k"));
        assert_eq!(invocation.get_value(&PayloadKey::name("k")), Some(&Value::Int(2)));

        assert_eq!(invocation.remove_value(&PayloadKey::name("k")), Some(Value::Int(2)));
        assert_eq!(invocation.get_value(&PayloadKey::name("k")), None);
    }

    #[test]
    fn test_transaction_tier_follows_serializability() {
        let mut invocation = Invocation::empty();
        invocation.set_transaction(Value::from("tx-17"));
        assert_eq!(
            invocation.tier_of(&InvocationKey::Transaction.into()),
            Some(PayloadTier::AsIs)
        );

        let live = Value::local(LiveTx);
        invocation.remove_value(&InvocationKey::Transaction.into());
        invocation.set_transaction(live.clone());
        assert_eq!(
            invocation.tier_of(&InvocationKey::Transaction.into()),
            Some(PayloadTier::Transient)
        );
        assert_eq!(invocation.transaction(), Some(&live));
    }

    #[test]
    fn test_typed_accessors() {
        let mut invocation = Invocation::new(method(), vec![Value::Int(1)])
            .with_object_name(Value::Int(42))
            .with_type(InvocationType::LocalHome);
        invocation.set_principal(Value::from("alice"));
        invocation.set_credential(Value::from("secret"));
        invocation.set_id(Value::Long(7));
        invocation.set_enterprise_context(Value::local(LiveTx));
        invocation.set_transaction_propagation_context(Value::from("tpc"));

        assert_eq!(invocation.principal(), Some(&Value::from("alice")));
        assert_eq!(invocation.credential(), Some(&Value::from("secret")));
        assert_eq!(invocation.id(), Some(&Value::Long(7)));
        assert!(invocation.enterprise_context().is_some());
        assert_eq!(
            invocation.transaction_propagation_context(),
            Some(&Value::from("tpc"))
        );
        assert_eq!(invocation.object_name(), &Value::Int(42));
        assert_eq!(invocation.invocation_type(), InvocationType::LocalHome);
        assert_eq!(invocation.arguments(), &[Value::Int(1)]);
        assert_eq!(
            invocation.tier_of(&InvocationKey::EnterpriseContext.into()),
            Some(PayloadTier::Transient)
        );
    }

    #[test]
    fn test_call_ids_are_unique() {
        assert_ne!(Invocation::empty().call_id(), Invocation::empty().call_id());
    }
}
