//! Reflective descriptions of invocable methods

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Parameter or return type of a method, in JVM terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `void`
    Void,
    /// Reference type by binary name, e.g. `java.lang.String`
    Class(String),
    /// Array of the component type
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Reference type
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// Array of `component`
    pub fn array(component: TypeDescriptor) -> Self {
        Self::Array(Box::new(component))
    }

    /// JVM descriptor code: single letters for primitives, `L<name>;` with
    /// `/` separators for references, `[` prefix per array dimension
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Boolean => "Z".to_string(),
            Self::Byte => "B".to_string(),
            Self::Char => "C".to_string(),
            Self::Short => "S".to_string(),
            Self::Int => "I".to_string(),
            Self::Long => "J".to_string(),
            Self::Float => "F".to_string(),
            Self::Double => "D".to_string(),
            Self::Void => "V".to_string(),
            Self::Class(name) => format!("L{};", name.replace('.', "/")),
            Self::Array(component) => format!("[{}", component.code()),
        }
    }

    /// Source-level name, e.g. `int[]` or `java.lang.String`
    #[must_use]
    pub fn source_name(&self) -> String {
        match self {
            Self::Boolean => "boolean".to_string(),
            Self::Byte => "byte".to_string(),
            Self::Char => "char".to_string(),
            Self::Short => "short".to_string(),
            Self::Int => "int".to_string(),
            Self::Long => "long".to_string(),
            Self::Float => "float".to_string(),
            Self::Double => "double".to_string(),
            Self::Void => "void".to_string(),
            Self::Class(name) => name.clone(),
            Self::Array(component) => format!("{}[]", component.source_name()),
        }
    }
}

/// Identity of an interface version.
///
/// The `version` token distinguishes redeployments of an interface with the
/// same name so that stale method tables can be evicted independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceId {
    /// Binary name of the interface
    pub name: String,
    /// Deployment version token
    pub version: u64,
}

impl InterfaceId {
    /// Create an interface identity
    pub fn new(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.version)
    }
}

/// A method declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Declaring interface
    pub declaring: InterfaceId,
    /// Method name
    pub name: String,
    /// Parameter types in declaration order
    pub parameter_types: Vec<TypeDescriptor>,
    /// Return type
    pub return_type: TypeDescriptor,
}

impl MethodDescriptor {
    /// Create a method descriptor
    pub fn new(
        declaring: InterfaceId,
        name: impl Into<String>,
        parameter_types: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
    ) -> Self {
        Self {
            declaring,
            name: name.into(),
            parameter_types,
            return_type,
        }
    }

    /// Canonical descriptor string `name(paramCodes)returnCode`, the input of
    /// the method hash
    #[must_use]
    pub fn descriptor(&self) -> String {
        let params: String = self.parameter_types.iter().map(TypeDescriptor::code).collect();
        format!("{}({}){}", self.name, params, self.return_type.code())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .parameter_types
            .iter()
            .map(TypeDescriptor::source_name)
            .collect();
        write!(
            f,
            "{} {}.{}({})",
            self.return_type.source_name(),
            self.declaring.name,
            self.name,
            params.join(",")
        )
    }
}

/// An interface and the methods it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    id: InterfaceId,
    methods: Vec<Arc<MethodDescriptor>>,
}

impl InterfaceDescriptor {
    /// Create an empty interface
    pub fn new(id: InterfaceId) -> Self {
        Self {
            id,
            methods: Vec::new(),
        }
    }

    /// Declare a method; returns the shared descriptor
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        parameter_types: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
    ) -> Arc<MethodDescriptor> {
        let method = Arc::new(MethodDescriptor::new(
            self.id.clone(),
            name,
            parameter_types,
            return_type,
        ));
        self.methods.push(Arc::clone(&method));
        method
    }

    /// Interface identity
    #[must_use]
    pub fn id(&self) -> &InterfaceId {
        &self.id
    }

    /// Declared methods in declaration order
    #[must_use]
    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    /// First method with the given name
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.iter().find(|m| m.name == name)
    }
}
