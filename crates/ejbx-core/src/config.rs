//! Configuration for invocation chains and query compilation

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::ql::DEFAULT_MAX_NESTING_DEPTH;

/// Default upper bound on the length of an EJB-QL query, in bytes
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 64 * 1024;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EjbxConfig {
    /// Interceptor chain assembly
    pub invocation: InvocationConfig,
    /// EJB-QL compilation
    pub query: QueryConfig,
}

impl EjbxConfig {
    /// Parse configuration from JSON text; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.query.max_query_length == 0 {
            return Err(Error::config("query.max_query_length must be positive"));
        }
        if self.query.max_nesting_depth == 0 {
            return Err(Error::config("query.max_nesting_depth must be positive"));
        }
        if self.query.alias_prefix.is_empty()
            || !self
                .query
                .alias_prefix
                .chars()
                .all(|c| c.is_ascii_alphabetic() || c == '_')
        {
            return Err(Error::config(format!(
                "query.alias_prefix '{}' must be a non-empty SQL identifier prefix",
                self.query.alias_prefix
            )));
        }
        if self.invocation.server_host_name.trim().is_empty() {
            return Err(Error::config("invocation.server_host_name must not be blank"));
        }
        Ok(())
    }
}

/// Selection of the terminal interceptor and of the optional stages in front
/// of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationConfig {
    /// Route only local-interface calls to the in-process invoker; remote
    /// interface calls always go through the transport invoker
    pub call_by_value: bool,
    /// Force a full marshal round trip on the in-process path
    pub strict_marshalling: bool,
    /// Put a statistics stage at the head of the chain
    pub collect_statistics: bool,
    /// Host name reported by in-process invokers
    pub server_host_name: String,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            call_by_value: false,
            strict_marshalling: false,
            collect_statistics: true,
            server_host_name: "localhost".to_string(),
        }
    }
}

/// EJB-QL compiler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Fail at declaration time when a FROM clause names an unknown abstract
    /// schema, instead of when the identifier is first used
    pub eager_identifier_validation: bool,
    /// Queries longer than this are rejected before lexing
    pub max_query_length: usize,
    /// Prefix of generated table aliases
    pub alias_prefix: String,
    /// Deepest nesting of parentheses, sub-expressions and unary signs the
    /// parser accepts
    pub max_nesting_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            eager_identifier_validation: false,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            alias_prefix: "t".to_string(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}
