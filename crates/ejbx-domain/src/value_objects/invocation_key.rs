//! Payload slot names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Well-known payload slots of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvocationKey {
    /// Transaction handle associated with the call
    Transaction,
    /// Caller principal
    Principal,
    /// Caller credential
    Credential,
    /// Identity of the target container
    ObjectName,
    /// Invoked method
    Method,
    /// Call arguments
    Arguments,
    /// Name of the invoker proxy binding the call came through
    InvokerProxyBinding,
    /// Live enterprise context of the target instance
    EnterpriseContext,
    /// Invoker resolved for the call
    Invoker,
    /// Call kind
    Type,
    /// Security callback handler
    CallbackHandler,
    /// Identity of the target instance (entity primary key or session id)
    CacheId,
    /// JNDI name the proxy was bound under
    JndiName,
}

impl InvocationKey {
    /// All well-known keys
    pub const ALL: [InvocationKey; 13] = [
        InvocationKey::Transaction,
        InvocationKey::Principal,
        InvocationKey::Credential,
        InvocationKey::ObjectName,
        InvocationKey::Method,
        InvocationKey::Arguments,
        InvocationKey::InvokerProxyBinding,
        InvocationKey::EnterpriseContext,
        InvocationKey::Invoker,
        InvocationKey::Type,
        InvocationKey::CallbackHandler,
        InvocationKey::CacheId,
        InvocationKey::JndiName,
    ];

    /// Canonical name of the key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "TRANSACTION",
            Self::Principal => "PRINCIPAL",
            Self::Credential => "CREDENTIAL",
            Self::ObjectName => "OBJECT_NAME",
            Self::Method => "METHOD",
            Self::Arguments => "ARGUMENTS",
            Self::InvokerProxyBinding => "INVOKER_PROXY_BINDING",
            Self::EnterpriseContext => "ENTERPRISE_CONTEXT",
            Self::Invoker => "INVOKER",
            Self::Type => "TYPE",
            Self::CallbackHandler => "CALLBACK_HANDLER",
            Self::CacheId => "CACHE_ID",
            Self::JndiName => "JNDI_NAME",
        }
    }
}

impl fmt::Display for InvocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvocationKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| DomainError::InvalidKey(s.to_string()))
    }
}

/// Key of a payload entry: either a well-known slot or an application name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PayloadKey {
    /// Well-known slot
    Key(InvocationKey),
    /// Application-defined name
    Name(String),
}

impl PayloadKey {
    /// Create an application-defined key
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

impl From<InvocationKey> for PayloadKey {
    fn from(key: InvocationKey) -> Self {
        Self::Key(key)
    }
}

impl From<&str> for PayloadKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PayloadKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_roundtrip() {
        for key in InvocationKey::ALL {
            assert_eq!(key.as_str().parse::<InvocationKey>().unwrap(), key);
        }
        assert!("NOPE".parse::<InvocationKey>().is_err());
    }

    #[test]
    fn test_payload_key_conversions() {
        assert_eq!(
            PayloadKey::from(InvocationKey::Principal),
            PayloadKey::Key(InvocationKey::Principal)
        );
        assert_eq!(PayloadKey::from("tenant"), PayloadKey::name("tenant"));
        assert_ne!(
            PayloadKey::from("PRINCIPAL"),
            PayloadKey::from(InvocationKey::Principal)
        );
    }

    #[test]
    fn test_payload_key_serde() {
        let key = PayloadKey::from(InvocationKey::CacheId);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"Key":"CACHE_ID"}"#);
        assert_eq!(serde_json::from_str::<PayloadKey>(&json).unwrap(), key);
    }
}
