//! Persistence metadata of entity beans
//!
//! Bridges describe how an entity's abstract persistence schema maps onto
//! tables and columns. They are read from JSON deployment descriptors.

use serde::{Deserialize, Serialize};

/// EJB-QL type of a persistent field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QlType {
    /// Character data
    String,
    /// `boolean` and `java.lang.Boolean`
    Boolean,
    /// Dates, times and timestamps
    Datetime,
    /// Primitive numbers, their wrappers and big numbers
    Numeric,
    /// Any other serializable class
    ValueClass,
}

impl QlType {
    /// Classify a Java type name
    #[must_use]
    pub fn from_java_type(java_type: &str) -> Self {
        match java_type {
            "java.lang.String" | "char" | "java.lang.Character" => Self::String,
            "boolean" | "java.lang.Boolean" => Self::Boolean,
            "java.util.Date" | "java.util.Calendar" | "java.sql.Date" | "java.sql.Time"
            | "java.sql.Timestamp" => Self::Datetime,
            "byte" | "short" | "int" | "long" | "float" | "double" | "java.lang.Byte"
            | "java.lang.Short" | "java.lang.Integer" | "java.lang.Long" | "java.lang.Float"
            | "java.lang.Double" | "java.math.BigDecimal" | "java.math.BigInteger" => {
                Self::Numeric
            }
            _ => Self::ValueClass,
        }
    }
}

/// A container-managed persistent field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmpFieldBridge {
    /// Field name in the abstract schema
    pub field_name: String,
    /// Column the field is stored in
    pub column_name: String,
    /// Java type of the field
    pub java_type: String,
    /// Part of the primary key
    #[serde(default)]
    pub primary_key: bool,
}

impl CmpFieldBridge {
    /// Create a field
    pub fn new(
        field_name: impl Into<String>,
        column_name: impl Into<String>,
        java_type: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            column_name: column_name.into(),
            java_type: java_type.into(),
            primary_key: false,
        }
    }

    /// Mark as primary key field
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// EJB-QL type of the field
    #[must_use]
    pub fn ql_type(&self) -> QlType {
        QlType::from_java_type(&self.java_type)
    }
}

/// Join condition `owner.local_column = related.related_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    /// Column of the owning entity's table
    pub local_column: String,
    /// Column of the related entity's table
    pub related_column: String,
}

impl ColumnPair {
    /// Create a pair
    pub fn new(local_column: impl Into<String>, related_column: impl Into<String>) -> Self {
        Self {
            local_column: local_column.into(),
            related_column: related_column.into(),
        }
    }
}

/// A container-managed relationship field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmrFieldBridge {
    /// Field name in the abstract schema
    pub field_name: String,
    /// EJB name of the related entity
    pub related_entity: String,
    /// Field holds a collection of related entities
    #[serde(default)]
    pub collection_valued: bool,
    /// Columns joining the two tables
    pub key_mapping: Vec<ColumnPair>,
}

impl CmrFieldBridge {
    /// Create a relationship field
    pub fn new(
        field_name: impl Into<String>,
        related_entity: impl Into<String>,
        collection_valued: bool,
        key_mapping: Vec<ColumnPair>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            related_entity: related_entity.into(),
            collection_valued,
            key_mapping,
        }
    }
}

/// Persistence description of one entity bean
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBridge {
    /// Deployment name of the bean
    pub ejb_name: String,
    /// Name used in EJB-QL FROM clauses
    pub abstract_schema_name: String,
    /// Table the bean is stored in
    pub table_name: String,
    /// Remote component interface
    #[serde(default)]
    pub remote_interface: Option<String>,
    /// Local component interface
    #[serde(default)]
    pub local_interface: Option<String>,
    /// Persistent fields
    #[serde(default)]
    pub cmp_fields: Vec<CmpFieldBridge>,
    /// Relationship fields
    #[serde(default)]
    pub cmr_fields: Vec<CmrFieldBridge>,
}

impl EntityBridge {
    /// Create an entity with no fields
    pub fn new(
        ejb_name: impl Into<String>,
        abstract_schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            ejb_name: ejb_name.into(),
            abstract_schema_name: abstract_schema_name.into(),
            table_name: table_name.into(),
            remote_interface: None,
            local_interface: None,
            cmp_fields: Vec::new(),
            cmr_fields: Vec::new(),
        }
    }

    /// Builder: remote interface
    #[must_use]
    pub fn with_remote_interface(mut self, name: impl Into<String>) -> Self {
        self.remote_interface = Some(name.into());
        self
    }

    /// Builder: local interface
    #[must_use]
    pub fn with_local_interface(mut self, name: impl Into<String>) -> Self {
        self.local_interface = Some(name.into());
        self
    }

    /// Builder: add a persistent field
    #[must_use]
    pub fn with_cmp_field(mut self, field: CmpFieldBridge) -> Self {
        self.cmp_fields.push(field);
        self
    }

    /// Builder: add a relationship field
    #[must_use]
    pub fn with_cmr_field(mut self, field: CmrFieldBridge) -> Self {
        self.cmr_fields.push(field);
        self
    }

    /// Persistent field by name
    #[must_use]
    pub fn cmp_field(&self, name: &str) -> Option<&CmpFieldBridge> {
        self.cmp_fields.iter().find(|f| f.field_name == name)
    }

    /// Relationship field by name
    #[must_use]
    pub fn cmr_field(&self, name: &str) -> Option<&CmrFieldBridge> {
        self.cmr_fields.iter().find(|f| f.field_name == name)
    }

    /// Primary key columns; every column when no field is flagged
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        let keys: Vec<&str> = self
            .cmp_fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.column_name.as_str())
            .collect();
        if keys.is_empty() {
            self.cmp_fields.iter().map(|f| f.column_name.as_str()).collect()
        } else {
            keys
        }
    }
}
