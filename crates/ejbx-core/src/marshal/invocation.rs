//! Wire form of an [`Invocation`]
//!
//! Layout, all integers big-endian, every frame a u32 length plus JSON bytes:
//!
//! ```text
//! "EJBI" version:u8
//! tpc-flag:u8 [tpc frame]
//! method-hash:i64
//! object-name frame
//! invocation-type:u8
//! arguments envelope
//! payload-count:u32 (key frame, envelope)*
//! as-is-count:u32 (key frame, value frame)*
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use ejbx_domain::{InvocationType, PayloadKey, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::hash::{MethodHashCache, MethodMap};
use super::value::{
    MarshalledValue, put_frame, put_json, take_frame, take_i64, take_json, take_magic, take_u8,
    take_u32,
};
use crate::error::{InvocationError, InvocationResult};
use crate::invocation::{Invocation, MethodDescriptor};

const MAGIC: &[u8; 4] = b"EJBI";
const WIRE_VERSION: u8 = 1;

/// An invocation in transport form.
///
/// Built from an [`Invocation`] on the sending side or read from bytes on the
/// receiving side. Payload-tier entries stay encoded until asked for, so a
/// corrupt entry only affects its own key.
#[derive(Debug, Clone)]
pub struct MarshalledInvocation {
    method_hash: i64,
    method: Option<Arc<MethodDescriptor>>,
    method_map: Option<Arc<MethodMap>>,
    arguments: MarshalledValue,
    object_name: Value,
    invocation_type: InvocationType,
    propagation_context: Option<Value>,
    payload: BTreeMap<PayloadKey, MarshalledValue>,
    as_is_payload: BTreeMap<PayloadKey, Value>,
    corrupt: BTreeMap<PayloadKey, String>,
    transient_payload: HashMap<PayloadKey, Value>,
}

impl MarshalledInvocation {
    /// Encode `invocation`, hashing its method through `cache`.
    ///
    /// Transient entries are kept for in-process use but never written.
    pub fn from_invocation(
        invocation: &Invocation,
        cache: &MethodHashCache,
    ) -> InvocationResult<Self> {
        let method = invocation
            .method()
            .cloned()
            .ok_or_else(|| InvocationError::invalid_invocation("invocation has no method"))?;
        let method_hash = cache.hash_of(&method)?;

        let arguments = MarshalledValue::new(&Value::List(invocation.arguments().to_vec()))
            .map_err(|e| InvocationError::marshalling(format!("arguments of {method}: {e}")))?;

        ensure_serializable(invocation.object_name(), "object name")?;
        if let Some(tpc) = invocation.transaction_propagation_context() {
            ensure_serializable(tpc, "transaction propagation context")?;
        }

        let mut payload = BTreeMap::new();
        for (key, value) in invocation.payload() {
            let envelope = MarshalledValue::new(value)
                .map_err(|e| InvocationError::marshalling(format!("payload entry {key}: {e}")))?;
            payload.insert(key.clone(), envelope);
        }

        let mut as_is_payload = BTreeMap::new();
        for (key, value) in invocation.as_is_payload() {
            ensure_serializable(value, &format!("as-is entry {key}"))?;
            as_is_payload.insert(key.clone(), value.clone());
        }

        Ok(Self {
            method_hash,
            method: Some(method),
            method_map: None,
            arguments,
            object_name: invocation.object_name().clone(),
            invocation_type: invocation.invocation_type(),
            propagation_context: invocation.transaction_propagation_context().cloned(),
            payload,
            as_is_payload,
            corrupt: BTreeMap::new(),
            transient_payload: invocation.transient_payload().clone(),
        })
    }

    /// Write the wire form.
    ///
    /// Does not modify `self`; repeated writes produce identical bytes.
    pub fn write_external(&self) -> InvocationResult<Bytes> {
        let mut buf = BytesMut::with_capacity(256 + self.arguments.len());
        buf.put_slice(MAGIC);
        buf.put_u8(WIRE_VERSION);

        match &self.propagation_context {
            Some(tpc) => {
                buf.put_u8(1);
                put_json(&mut buf, tpc)?;
            }
            None => buf.put_u8(0),
        }

        buf.put_i64(self.method_hash);
        put_json(&mut buf, &self.object_name)?;
        buf.put_u8(self.invocation_type.code());
        put_frame(&mut buf, self.arguments.as_bytes())?;

        buf.put_u32(count(self.payload.len())?);
        for (key, envelope) in &self.payload {
            put_json(&mut buf, key)?;
            put_frame(&mut buf, envelope.as_bytes())?;
        }

        buf.put_u32(count(self.as_is_payload.len())?);
        for (key, value) in &self.as_is_payload {
            put_json(&mut buf, key)?;
            put_json(&mut buf, value)?;
        }

        Ok(buf.freeze())
    }

    /// Read the wire form.
    ///
    /// Structural damage (bad header, truncation, undecodable keys) fails the
    /// whole read. An as-is entry whose value does not decode is recorded as
    /// corrupt and reported when its key is read.
    pub fn read_external(mut bytes: Bytes) -> InvocationResult<Self> {
        take_magic(&mut bytes, MAGIC, WIRE_VERSION)?;

        let propagation_context = match take_u8(&mut bytes, "tpc flag")? {
            0 => None,
            1 => Some(take_json(&mut bytes, "transaction propagation context")?),
            flag => {
                return Err(InvocationError::marshalling(format!(
                    "invalid tpc flag {flag}"
                )));
            }
        };

        let method_hash = take_i64(&mut bytes, "method hash")?;
        let object_name = take_json(&mut bytes, "object name")?;
        let invocation_type = InvocationType::from_code(take_u8(&mut bytes, "invocation type")?)?;
        let arguments = MarshalledValue::from_bytes(take_frame(&mut bytes, "arguments")?);

        let mut payload = BTreeMap::new();
        for _ in 0..take_u32(&mut bytes, "payload count")? {
            let key: PayloadKey = take_json(&mut bytes, "payload key")?;
            let envelope = MarshalledValue::from_bytes(take_frame(&mut bytes, "payload entry")?);
            payload.insert(key, envelope);
        }

        let mut as_is_payload = BTreeMap::new();
        let mut corrupt = BTreeMap::new();
        for _ in 0..take_u32(&mut bytes, "as-is count")? {
            let key: PayloadKey = take_json(&mut bytes, "as-is key")?;
            let frame = take_frame(&mut bytes, "as-is entry")?;
            match serde_json::from_slice::<Value>(&frame) {
                Ok(value) => {
                    as_is_payload.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Undecodable as-is payload entry");
                    corrupt.insert(key, e.to_string());
                }
            }
        }

        if !bytes.is_empty() {
            return Err(InvocationError::marshalling(format!(
                "{} trailing bytes after invocation",
                bytes.len()
            )));
        }

        Ok(Self {
            method_hash,
            method: None,
            method_map: None,
            arguments,
            object_name,
            invocation_type,
            propagation_context,
            payload,
            as_is_payload,
            corrupt,
            transient_payload: HashMap::new(),
        })
    }

    /// Install the receiving container's hash table
    pub fn set_method_map(&mut self, map: Arc<MethodMap>) {
        self.method_map = Some(map);
    }

    /// Hash of the invoked method
    #[must_use]
    pub fn method_hash(&self) -> i64 {
        self.method_hash
    }

    /// Invoked method: the original one on the sending side, otherwise
    /// resolved through the installed method map
    pub fn method(&self) -> InvocationResult<Arc<MethodDescriptor>> {
        if let Some(method) = &self.method {
            return Ok(Arc::clone(method));
        }
        match &self.method_map {
            Some(map) => map.resolve(self.method_hash),
            None => Err(InvocationError::invalid_invocation(format!(
                "no method map installed to resolve hash {}",
                self.method_hash
            ))),
        }
    }

    /// Decoded call arguments
    pub fn arguments(&self) -> InvocationResult<Vec<Value>> {
        match self.arguments.get()? {
            Value::List(items) => Ok(items),
            other => Err(InvocationError::marshalling(format!(
                "arguments decoded to {}, expected list",
                other.type_name()
            ))),
        }
    }

    /// Target identity
    #[must_use]
    pub fn object_name(&self) -> &Value {
        &self.object_name
    }

    /// Call kind
    #[must_use]
    pub fn invocation_type(&self) -> InvocationType {
        self.invocation_type
    }

    /// Transaction propagation context
    #[must_use]
    pub fn transaction_propagation_context(&self) -> Option<&Value> {
        self.propagation_context.as_ref()
    }

    /// Replace the transaction propagation context
    pub fn set_transaction_propagation_context(&mut self, tpc: Option<Value>) {
        self.propagation_context = tpc;
    }

    /// Look `key` up with the same tier precedence as
    /// [`Invocation::get_value`]. A corrupt entry is logged and reads as
    /// absent.
    #[must_use]
    pub fn get_value(&self, key: &PayloadKey) -> Option<Value> {
        match self.try_get_value(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping undecodable payload entry");
                None
            }
        }
    }

    /// Like [`get_value`](Self::get_value) but reports a corrupt entry
    pub fn try_get_value(&self, key: &PayloadKey) -> InvocationResult<Option<Value>> {
        if let Some(envelope) = self.payload.get(key) {
            return envelope
                .get()
                .map(Some)
                .map_err(|e| InvocationError::marshalling(format!("payload entry {key}: {e}")));
        }
        if let Some(value) = self.as_is_payload.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(reason) = self.corrupt.get(key) {
            return Err(InvocationError::marshalling(format!(
                "as-is entry {key}: {reason}"
            )));
        }
        Ok(self.transient_payload.get(key).cloned())
    }

    /// Keys of the payload tier, in wire order
    pub fn payload_keys(&self) -> impl Iterator<Item = &PayloadKey> {
        self.payload.keys()
    }

    /// Keys of the as-is tier, in wire order
    pub fn as_is_keys(&self) -> impl Iterator<Item = &PayloadKey> {
        self.as_is_payload.keys().chain(self.corrupt.keys())
    }

    /// Rebuild an [`Invocation`].
    ///
    /// The method and arguments must resolve; undecodable payload entries are
    /// logged and left out.
    pub fn into_invocation(self) -> InvocationResult<Invocation> {
        let method = self.method()?;
        let arguments = self.arguments()?;

        let mut invocation = Invocation::new(method, arguments)
            .with_object_name(self.object_name)
            .with_type(self.invocation_type);
        if let Some(tpc) = self.propagation_context {
            invocation.set_transaction_propagation_context(tpc);
        }

        for (key, envelope) in self.payload {
            match envelope.get() {
                Ok(value) => invocation.set_payload_value(key, value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Dropping undecodable payload entry");
                }
            }
        }
        for (key, value) in self.as_is_payload {
            invocation.set_as_is_value(key, value);
        }
        for (key, value) in self.transient_payload {
            invocation.set_transient_value(key, value);
        }
        Ok(invocation)
    }

    #[cfg(test)]
    pub(crate) fn replace_payload_envelope(&mut self, key: PayloadKey, bytes: Bytes) {
        self.payload.insert(key, MarshalledValue::from_bytes(bytes));
    }
}

fn ensure_serializable(value: &Value, what: &str) -> InvocationResult<()> {
    if value.is_serializable() {
        Ok(())
    } else {
        Err(InvocationError::marshalling(format!(
            "{what} holds a process-local reference"
        )))
    }
}

fn count(len: usize) -> InvocationResult<u32> {
    u32::try_from(len).map_err(|_| InvocationError::marshalling("too many payload entries"))
}
