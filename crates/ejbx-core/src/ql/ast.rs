//! EJB-QL syntax tree
//!
//! Every node carries a [`NodeKind`] tag with its node-specific fields, an
//! ordered child list and the byte offset it was parsed from. The tag of a
//! node never changes; semantic resolution only fills in the decoration
//! fields of paths and comparisons.

use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use super::bridge::{CmpFieldBridge, CmrFieldBridge, EntityBridge, QlType};

/// Operator of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl ComparisonOp {
    /// Operator text
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// True for `=` and `<>`
    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operand type of a comparison, decided during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ComparisonKind {
    /// Not resolved yet, or both operands are parameters
    #[default]
    Unresolved,
    /// String operands
    String,
    /// Boolean operands
    Boolean,
    /// Date/time operands
    Datetime,
    /// Numeric operands
    Arithmetic,
    /// Entity operands, compared by primary key
    Entity,
    /// Dependent value class operands
    ValueClass,
}

impl From<QlType> for ComparisonKind {
    fn from(ty: QlType) -> Self {
        match ty {
            QlType::String => Self::String,
            QlType::Boolean => Self::Boolean,
            QlType::Datetime => Self::Datetime,
            QlType::Numeric => Self::Arithmetic,
            QlType::ValueClass => Self::ValueClass,
        }
    }
}

/// Operator in an additive or multiplicative chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArithmeticOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Times,
    /// `/`
    Divide,
}

impl ArithmeticOp {
    /// Operator text
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Times => "*",
            Self::Divide => "/",
        }
    }
}

/// Operators between the operands of an arithmetic chain
pub type ArithmeticOps = SmallVec<[ArithmeticOp; 4]>;

/// Aggregate select function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggregateFunction {
    /// `AVG`
    Avg,
    /// `MAX`
    Max,
    /// `MIN`
    Min,
    /// `SUM`
    Sum,
    /// `COUNT`
    Count,
}

impl AggregateFunction {
    /// Function name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
        }
    }
}

/// What a resolved path denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PathType {
    /// Not resolved yet
    #[default]
    Unresolved,
    /// An entity: an identification variable or single-valued relationship
    Entity,
    /// A collection-valued relationship
    Collection,
    /// A persistent field of the given type
    CmpField(QlType),
}

/// One step of a resolved path
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    /// The identification variable the path starts from
    Entity(Arc<EntityBridge>),
    /// Navigation through a relationship field
    Cmr {
        /// Entity declaring the field
        owner: Arc<EntityBridge>,
        /// The field
        field: CmrFieldBridge,
        /// Entity on the other side
        related: Arc<EntityBridge>,
    },
    /// A persistent field; always the last step
    Cmp {
        /// Entity declaring the field
        owner: Arc<EntityBridge>,
        /// The field
        field: CmpFieldBridge,
    },
}

impl PathElement {
    /// Entity reached after this step, if it is an entity
    #[must_use]
    pub fn entity(&self) -> Option<&Arc<EntityBridge>> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Cmr { related, .. } => Some(related),
            Self::Cmp { .. } => None,
        }
    }
}

/// Decoration of a path node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathData {
    /// Path text as written, e.g. `o.customer.name`
    pub path: String,
    /// Every prefix of the path, e.g. `o`, `o.customer`, `o.customer.name`
    pub path_list: Vec<String>,
    /// One element per entry of `path_list`
    pub field_list: Vec<PathElement>,
    /// What the whole path denotes
    pub path_type: PathType,
}

impl PathData {
    /// Unresolved path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Identification variable the path starts from
    #[must_use]
    pub fn root(&self) -> &str {
        self.path.split('.').next().unwrap_or(&self.path)
    }

    /// Number of `.`-separated segments
    #[must_use]
    pub fn segments(&self) -> usize {
        self.path.split('.').count()
    }

    /// True once resolution filled in the field list
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.field_list.is_empty()
    }

    /// Last step of the resolved path
    #[must_use]
    pub fn last_element(&self) -> Option<&PathElement> {
        self.field_list.last()
    }
}

/// Tag and node-specific fields of a [`Node`]
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Whole query: select, from, optional where, order by, limit/offset
    EjbQl,
    /// `SELECT [DISTINCT] expr`
    Select {
        /// `DISTINCT` present
        distinct: bool,
    },
    /// `FROM decl, ...`
    From,
    /// `Schema AS var`: children are the schema and the identifier
    RangeVariableDeclaration,
    /// `IN(path) AS var`: children are the path and the identifier
    CollectionMemberDeclaration,
    /// `WHERE cond`
    Where,
    /// Disjunction of two or more conditions
    Or,
    /// Conjunction of two or more conditions
    And,
    /// `NOT cond`
    Not,
    /// `( cond )`
    ConditionalParenthetical,
    /// `expr [NOT] BETWEEN low AND high`
    Between {
        /// Negated
        not: bool,
    },
    /// `expr [NOT] IN (items)`
    In {
        /// Negated
        not: bool,
    },
    /// `expr [NOT] LIKE pattern [ESCAPE char]`
    Like {
        /// Negated
        not: bool,
    },
    /// `operand IS [NOT] NULL`
    NullComparison {
        /// Negated
        not: bool,
    },
    /// `path IS [NOT] EMPTY`
    IsEmpty {
        /// Negated
        not: bool,
    },
    /// `entity [NOT] MEMBER OF path`
    MemberOf {
        /// Negated
        not: bool,
    },
    /// `lhs op rhs`
    Comparison {
        /// Operand type
        kind: ComparisonKind,
        /// Operator
        opp: ComparisonOp,
    },
    /// `a + b - c`
    PlusMinus {
        /// One operator per gap between children
        ops: ArithmeticOps,
    },
    /// `a * b / c`
    MultDiv {
        /// One operator per gap between children
        ops: ArithmeticOps,
    },
    /// Unary minus
    Negation,
    /// `( expr )`
    ArithmeticParenthetical,
    /// `CONCAT(a, b)`
    Concat,
    /// `SUBSTRING(s, start, length)`
    Substring,
    /// `LENGTH(s)`
    Length,
    /// `LOCATE(needle, haystack [, start])`
    Locate,
    /// `ABS(x)`
    Abs,
    /// `SQRT(x)`
    Sqrt,
    /// `MOD(a, b)`
    Mod,
    /// `UCASE(s)`
    UCase,
    /// `LCASE(s)`
    LCase,
    /// `FUNC([DISTINCT] path)`
    Aggregate {
        /// Function
        function: AggregateFunction,
        /// `DISTINCT` present
        distinct: bool,
    },
    /// Navigation path or bare identification variable in an expression
    Path(PathData),
    /// Identification variable being declared or selected
    Identifier {
        /// Name as written
        name: String,
    },
    /// Abstract schema name in a range declaration
    AbstractSchema {
        /// Name as written
        name: String,
    },
    /// `?n`
    Parameter {
        /// One-based parameter number
        number: u32,
    },
    /// Integer literal
    ExactNumericLiteral {
        /// Literal text as written
        literal: String,
        /// Decoded value
        value: i64,
    },
    /// Floating point literal
    ApproximateNumericLiteral {
        /// Literal text as written
        literal: String,
        /// Decoded value
        value: f64,
    },
    /// `'text'`
    StringLiteral {
        /// Unescaped value
        value: String,
    },
    /// `TRUE` or `FALSE`
    BooleanLiteral {
        /// Value
        value: bool,
    },
    /// `ORDER BY path, ...`
    OrderBy,
    /// `path [ASC|DESC]`
    OrderByPath {
        /// Ascending order
        ascending: bool,
    },
    /// `[OFFSET n] [LIMIT m]`; children in that order
    LimitOffset {
        /// Offset child present
        has_offset: bool,
        /// Limit child present
        has_limit: bool,
    },
}

impl NodeKind {
    /// Short name of the kind
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::EjbQl => "EJBQL",
            Self::Select { .. } => "Select",
            Self::From => "From",
            Self::RangeVariableDeclaration => "RangeVariableDeclaration",
            Self::CollectionMemberDeclaration => "CollectionMemberDeclaration",
            Self::Where => "Where",
            Self::Or => "Or",
            Self::And => "And",
            Self::Not => "Not",
            Self::ConditionalParenthetical => "ConditionalParenthetical",
            Self::Between { .. } => "Between",
            Self::In { .. } => "In",
            Self::Like { .. } => "Like",
            Self::NullComparison { .. } => "NullComparison",
            Self::IsEmpty { .. } => "IsEmpty",
            Self::MemberOf { .. } => "MemberOf",
            Self::Comparison { .. } => "Comparison",
            Self::PlusMinus { .. } => "PlusMinus",
            Self::MultDiv { .. } => "MultDiv",
            Self::Negation => "Negation",
            Self::ArithmeticParenthetical => "ArithmeticParenthetical",
            Self::Concat => "Concat",
            Self::Substring => "Substring",
            Self::Length => "Length",
            Self::Locate => "Locate",
            Self::Abs => "Abs",
            Self::Sqrt => "Sqrt",
            Self::Mod => "Mod",
            Self::UCase => "UCase",
            Self::LCase => "LCase",
            Self::Aggregate { .. } => "Aggregate",
            Self::Path(_) => "Path",
            Self::Identifier { .. } => "Identifier",
            Self::AbstractSchema { .. } => "AbstractSchema",
            Self::Parameter { .. } => "Parameter",
            Self::ExactNumericLiteral { .. } => "ExactNumericLiteral",
            Self::ApproximateNumericLiteral { .. } => "ApproximateNumericLiteral",
            Self::StringLiteral { .. } => "StringLiteral",
            Self::BooleanLiteral { .. } => "BooleanLiteral",
            Self::OrderBy => "OrderBy",
            Self::OrderByPath { .. } => "OrderByPath",
            Self::LimitOffset { .. } => "LimitOffset",
        }
    }
}

/// A node of the syntax tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    /// Ordered children
    pub children: Vec<Node>,
    /// Byte offset in the query text
    pub position: usize,
}

impl Node {
    /// Leaf node
    pub fn new(kind: NodeKind, position: usize) -> Self {
        Self {
            kind,
            children: Vec::new(),
            position,
        }
    }

    /// Node with children
    pub fn with_children(kind: NodeKind, position: usize, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            position,
        }
    }

    /// Node kind
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Child at `index`
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// First child whose kind matches `predicate`
    #[must_use]
    pub fn find_child(&self, predicate: impl Fn(&NodeKind) -> bool) -> Option<&Node> {
        self.children.iter().find(|c| predicate(&c.kind))
    }

    /// Path decoration, for path nodes
    #[must_use]
    pub fn path(&self) -> Option<&PathData> {
        match &self.kind {
            NodeKind::Path(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable path decoration, for path nodes
    pub fn path_mut(&mut self) -> Option<&mut PathData> {
        match &mut self.kind {
            NodeKind::Path(data) => Some(data),
            _ => None,
        }
    }

    /// Record the operand type of a comparison node; returns false for other
    /// kinds
    pub fn set_comparison_kind(&mut self, resolved: ComparisonKind) -> bool {
        match &mut self.kind {
            NodeKind::Comparison { kind, .. } => {
                *kind = resolved;
                true
            }
            _ => false,
        }
    }

    /// Name of an identifier or abstract schema node
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name } | NodeKind::AbstractSchema { name } => Some(name),
            _ => None,
        }
    }

    /// Depth-first pre-order iteration over this node and its descendants
    pub fn walk(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}
