//! Wire form of an invocation outcome

use bytes::{BufMut, Bytes, BytesMut};
use ejbx_domain::Value;
use serde::{Deserialize, Serialize};

use super::value::{put_json, take_json, take_magic, take_u8};
use crate::error::{InvocationError, InvocationResult};

const MAGIC: &[u8; 4] = b"EJBR";
const WIRE_VERSION: u8 = 1;

const TAG_RETURN: u8 = 0;
const TAG_FAILURE: u8 = 1;

/// Return value or failure of a dispatched invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvocationResponse {
    /// Normal completion
    Return(Value),
    /// Failure raised by the target or by the receiving framework
    Failure(InvocationError),
}

impl InvocationResponse {
    /// Capture an outcome
    pub fn from_result(result: InvocationResult) -> Self {
        match result {
            Ok(value) => Self::Return(value),
            Err(err) => Self::Failure(err),
        }
    }

    /// Back to an outcome
    pub fn into_result(self) -> InvocationResult {
        match self {
            Self::Return(value) => Ok(value),
            Self::Failure(err) => Err(err),
        }
    }

    /// Encode as `"EJBR" version:u8 tag:u8 frame`
    pub fn write(&self) -> InvocationResult<Bytes> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_slice(MAGIC);
        buf.put_u8(WIRE_VERSION);
        match self {
            Self::Return(value) => {
                if !value.is_serializable() {
                    return Err(InvocationError::marshalling(format!(
                        "return value of type {} holds a process-local reference",
                        value.type_name()
                    )));
                }
                buf.put_u8(TAG_RETURN);
                put_json(&mut buf, value)?;
            }
            Self::Failure(err) => {
                buf.put_u8(TAG_FAILURE);
                put_json(&mut buf, err)?;
            }
        }
        Ok(buf.freeze())
    }

    /// Decode bytes written by [`write`](Self::write)
    pub fn read(mut bytes: Bytes) -> InvocationResult<Self> {
        take_magic(&mut bytes, MAGIC, WIRE_VERSION)?;
        let response = match take_u8(&mut bytes, "response tag")? {
            TAG_RETURN => Self::Return(take_json(&mut bytes, "return value")?),
            TAG_FAILURE => Self::Failure(take_json(&mut bytes, "failure")?),
            tag => {
                return Err(InvocationError::marshalling(format!(
                    "invalid response tag {tag}"
                )));
            }
        };
        if !bytes.is_empty() {
            return Err(InvocationError::marshalling("trailing bytes after response"));
        }
        Ok(response)
    }

    /// Encode then decode `result`, as a by-value boundary would
    pub fn round_trip(result: InvocationResult) -> InvocationResult {
        let bytes = Self::from_result(result).write()?;
        Self::read(bytes)?.into_result()
    }
}
