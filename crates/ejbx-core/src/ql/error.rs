//! Errors raised while compiling EJB-QL

/// Result alias for the query pipeline
pub type QlResult<T> = Result<T, QlError>;

/// Query compilation failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QlError {
    /// Unrecognized character sequence
    #[error("Lexical error at {position}: {message}")]
    Lex {
        /// Byte offset in the query
        position: usize,
        /// What went wrong
        message: String,
    },

    /// Token sequence does not match the grammar
    #[error("Parse error at {position}: {message}")]
    Parse {
        /// Byte offset in the query
        position: usize,
        /// What went wrong
        message: String,
    },

    /// Query text over the configured limit
    #[error("Query is {length} bytes long, limit is {max}")]
    QueryTooLong {
        /// Actual length
        length: usize,
        /// Configured limit
        max: usize,
    },

    /// Identification variable ranges over an abstract schema not in the
    /// catalog
    #[error("Unknown abstract schema '{schema}' for identification variable '{identifier}'")]
    UnknownSchema {
        /// Identification variable
        identifier: String,
        /// Abstract schema name as written
        schema: String,
    },

    /// Identification variable used but never declared
    #[error("Unknown identification variable '{0}'")]
    UnknownIdentifier(String),

    /// Identification variable declared twice
    #[error("Identification variable '{0}' is already declared")]
    DuplicateIdentifier(String),

    /// Path does not navigate the catalog
    #[error("Invalid path '{path}': {message}")]
    InvalidPath {
        /// Path as written
        path: String,
        /// What went wrong
        message: String,
    },

    /// Collection operation applied to a single-valued path
    #[error("Path '{0}' is not collection valued")]
    NotCollectionValued(String),

    /// Path list and field list of a resolved path differ in length
    #[error("Path list has {paths} entries but field list has {fields}")]
    PathListMismatch {
        /// Path list length
        paths: usize,
        /// Field list length
        fields: usize,
    },

    /// Numeric literal out of range or malformed
    #[error("Invalid literal '{literal}': {message}")]
    Literal {
        /// Literal text
        literal: String,
        /// What went wrong
        message: String,
    },

    /// Operand type not allowed in its position
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// Construct the compiler does not handle
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Catalog could not be built
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl QlError {
    /// Create a parse error
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a literal error
    pub fn literal(literal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Literal {
            literal: literal.into(),
            message: message.into(),
        }
    }

    /// Create an invalid operand error
    pub fn invalid_operand(message: impl Into<String>) -> Self {
        Self::InvalidOperand(message.into())
    }

    /// Byte offset of the failure in the query text, for syntax errors
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Lex { position, .. } | Self::Parse { position, .. } => Some(*position),
            _ => None,
        }
    }
}
