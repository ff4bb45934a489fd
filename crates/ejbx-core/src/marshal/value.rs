//! Value envelopes and wire framing helpers

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ejbx_domain::Value;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::{InvocationError, InvocationResult};

/// An independently encoded value.
///
/// The value is encoded when the envelope is built and decoded on first
/// access, so a corrupt envelope only fails the caller that reads it.
#[derive(Clone)]
pub struct MarshalledValue {
    bytes: Bytes,
    decoded: OnceCell<InvocationResult<Value>>,
}

impl MarshalledValue {
    /// Encode `value`; fails for values holding process-local references
    pub fn new(value: &Value) -> InvocationResult<Self> {
        if !value.is_serializable() {
            return Err(InvocationError::marshalling(format!(
                "{} value holds a process-local reference",
                value.type_name()
            )));
        }
        let bytes = serde_json::to_vec(value)?;
        Ok(Self {
            bytes: Bytes::from(bytes),
            decoded: OnceCell::new(),
        })
    }

    /// Wrap already encoded bytes
    pub fn from_bytes(bytes: Bytes) -> Self {
        Self {
            bytes,
            decoded: OnceCell::new(),
        }
    }

    /// Decode the value
    pub fn get(&self) -> InvocationResult<Value> {
        self.decoded
            .get_or_init(|| serde_json::from_slice(&self.bytes).map_err(InvocationError::from))
            .clone()
    }

    /// Encoded form
    #[must_use]
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Encoded size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the encoded form is empty (never a valid value)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for MarshalledValue {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl fmt::Debug for MarshalledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalledValue")
            .field("len", &self.bytes.len())
            .field("decoded", &self.decoded.get().is_some())
            .finish()
    }
}

// === Framing ===
//
// A frame is a u32 big-endian length followed by that many bytes.

pub(crate) fn put_frame(buf: &mut BytesMut, bytes: &[u8]) -> InvocationResult<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| InvocationError::marshalling("frame exceeds u32 length"))?;
    buf.put_u32(len);
    buf.put_slice(bytes);
    Ok(())
}

pub(crate) fn put_json<T: Serialize + ?Sized>(buf: &mut BytesMut, value: &T) -> InvocationResult<()> {
    let bytes = serde_json::to_vec(value)?;
    put_frame(buf, &bytes)
}

pub(crate) fn take_frame(buf: &mut Bytes, what: &str) -> InvocationResult<Bytes> {
    let len = take_u32(buf, what)? as usize;
    if buf.remaining() < len {
        return Err(InvocationError::marshalling(format!(
            "truncated {what}: need {len} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(buf.split_to(len))
}

pub(crate) fn take_json<T: DeserializeOwned>(buf: &mut Bytes, what: &str) -> InvocationResult<T> {
    let frame = take_frame(buf, what)?;
    serde_json::from_slice(&frame)
        .map_err(|e| InvocationError::marshalling(format!("invalid {what}: {e}")))
}

pub(crate) fn take_u8(buf: &mut Bytes, what: &str) -> InvocationResult<u8> {
    ensure(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub(crate) fn take_u32(buf: &mut Bytes, what: &str) -> InvocationResult<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32())
}

pub(crate) fn take_i64(buf: &mut Bytes, what: &str) -> InvocationResult<i64> {
    ensure(buf, 8, what)?;
    Ok(buf.get_i64())
}

pub(crate) fn take_magic(buf: &mut Bytes, magic: &[u8; 4], version: u8) -> InvocationResult<()> {
    ensure(buf, 5, "header")?;
    let found = buf.split_to(4);
    if found.as_ref() != magic {
        return Err(InvocationError::marshalling(format!(
            "bad magic {:?}, expected {:?}",
            String::from_utf8_lossy(&found),
            String::from_utf8_lossy(magic)
        )));
    }
    let found_version = buf.get_u8();
    if found_version != version {
        return Err(InvocationError::marshalling(format!(
            "unsupported wire version {found_version}, expected {version}"
        )));
    }
    Ok(())
}

fn ensure(buf: &Bytes, needed: usize, what: &str) -> InvocationResult<()> {
    if buf.remaining() < needed {
        return Err(InvocationError::marshalling(format!(
            "truncated {what}: need {needed} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Handle;

    #[test]
    fn test_envelope_decodes_lazily() {
        let value = Value::List(vec![Value::Int(1), Value::from("two")]);
        let envelope = MarshalledValue::new(&value).unwrap();
        assert!(!envelope.is_empty());
        assert_eq!(envelope.get().unwrap(), value);

        let copy = MarshalledValue::from_bytes(envelope.as_bytes().clone());
        assert_eq!(copy, envelope);
        assert_eq!(copy.get().unwrap(), value);
    }

    #[test]
    fn test_local_reference_is_rejected() {
        let err = MarshalledValue::new(&Value::local(Handle)).unwrap_err();
        assert!(matches!(err, InvocationError::Marshalling(_)));
    }

    #[test]
    fn test_corrupt_envelope_fails_on_read_only() {
        let envelope = MarshalledValue::from_bytes(Bytes::from_static(b"{broken"));
        assert!(matches!(envelope.get(), Err(InvocationError::Marshalling(_))));
        // The failure is remembered, not recomputed differently
        assert!(envelope.get().is_err());
    }

    #[test]
    fn test_frame_roundtrip_and_truncation() {
        let mut buf = BytesMut::new();
        put_frame(&mut buf, b"abc").unwrap();
        put_json(&mut buf, &Value::Long(9)).unwrap();
        let mut bytes = buf.freeze();

        assert_eq!(take_frame(&mut bytes, "a").unwrap().as_ref(), b"abc");
        assert_eq!(take_json::<Value>(&mut bytes, "b").unwrap(), Value::Long(9));
        assert!(take_frame(&mut bytes, "c").is_err());

        let mut short = Bytes::from_static(&[0, 0, 0, 9, 1, 2]);
        let err = take_frame(&mut short, "payload").unwrap_err();
        assert!(err.to_string().contains("truncated payload"));
    }
}
