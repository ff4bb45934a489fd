//! EJB-QL compiler
//!
//! Pipeline: [`tokenize`] and [`parse`] build a tagged-union syntax tree,
//! [`resolve`] decorates it against a [`Catalog`], [`BasicVisitor`] renders
//! it back into canonical EJB-QL and [`SqlCompiler`] into SQL.
//! [`QueryCompiler`] runs all of it under one [`QueryConfig`].

mod ast;
mod basic_visitor;
mod block_buffer;
mod bridge;
mod catalog;
mod error;
mod identifiers;
mod lexer;
mod literal;
mod parser;
mod resolver;
mod sql;
mod visitor;

pub use ast::{
    AggregateFunction, ArithmeticOp, ArithmeticOps, ComparisonKind, ComparisonOp, Node, NodeKind,
    PathData, PathElement, PathType,
};
pub use basic_visitor::BasicVisitor;
pub use block_buffer::BlockStringBuffer;
pub use bridge::{CmpFieldBridge, CmrFieldBridge, ColumnPair, EntityBridge, QlType};
pub use catalog::Catalog;
pub use error::{QlError, QlResult};
pub use identifiers::IdentifierManager;
pub use lexer::{Keyword, Token, TokenKind, tokenize};
pub use literal::{decode_approximate, decode_exact, strip_type_suffix};
pub use parser::{DEFAULT_MAX_NESTING_DEPTH, parse, parse_with_max_depth};
pub use resolver::resolve;
pub use sql::{SqlCompiler, SqlQuery};
pub use visitor::Visitor;

use serde::Serialize;
use std::sync::Arc;

use crate::config::QueryConfig;

/// What a compiled query returns per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectInfo {
    /// Entities, identified by their primary key columns
    Entity {
        /// EJB name of the selected entity
        ejb_name: String,
        /// Key columns in select-list order
        columns: Vec<String>,
    },
    /// One persistent field
    Field {
        /// Column of the field
        column: String,
        /// Field type
        ql_type: QlType,
    },
    /// Aggregate over a field or entity
    Aggregate {
        /// Function name
        function: String,
        /// Type of the aggregated field; `None` when counting entities
        ql_type: Option<QlType>,
    },
}

/// Result of compiling one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// Canonical EJB-QL text
    pub ejbql: String,
    /// Generated SQL with `?` placeholders
    pub sql: String,
    /// EJB-QL parameter number of each SQL placeholder
    pub parameters: Vec<u32>,
    /// Shape of the result rows
    pub select: SelectInfo,
    /// `SELECT DISTINCT`
    pub distinct: bool,
}

/// Compiles EJB-QL against a fixed catalog
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    catalog: Arc<Catalog>,
    config: QueryConfig,
}

impl QueryCompiler {
    /// Compiler over `catalog`
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: QueryConfig) -> Self {
        Self { catalog, config }
    }

    /// Catalog queries are resolved against
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Syntax check only
    pub fn parse(&self, query: &str) -> QlResult<Node> {
        if query.len() > self.config.max_query_length {
            return Err(QlError::QueryTooLong {
                length: query.len(),
                max: self.config.max_query_length,
            });
        }
        parse_with_max_depth(query, self.config.max_nesting_depth)
    }

    /// Parse, resolve and translate `query`
    pub fn compile(&self, query: &str) -> QlResult<CompiledQuery> {
        let mut root = self.parse(query)?;
        let mut manager =
            IdentifierManager::new(&self.catalog, self.config.eager_identifier_validation);
        resolve(&mut root, &mut manager)?;
        manager.check_declarations()?;

        let ejbql = BasicVisitor::render(&root)?;
        let select = select_info(&root, &manager)?;
        let distinct = root
            .find_child(|k| matches!(k, NodeKind::Select { distinct: true }))
            .is_some();
        let SqlQuery { sql, parameters } =
            SqlCompiler::new(&manager, self.config.alias_prefix.as_str()).compile(&root)?;

        tracing::debug!(%ejbql, %sql, ?parameters, "Compiled query");
        Ok(CompiledQuery {
            ejbql,
            sql,
            parameters,
            select,
            distinct,
        })
    }
}

fn select_info(root: &Node, manager: &IdentifierManager<'_>) -> QlResult<SelectInfo> {
    let expression = root
        .find_child(|k| matches!(k, NodeKind::Select { .. }))
        .and_then(|select| select.child(0))
        .ok_or_else(|| QlError::Unsupported("query without SELECT clause".into()))?;

    if let Some(name) = expression.name() {
        let entity = manager.entity(name)?;
        return Ok(entity_info(&entity));
    }
    match expression.kind() {
        NodeKind::Path(data) => match data.last_element() {
            Some(PathElement::Cmp { field, .. }) => Ok(SelectInfo::Field {
                column: field.column_name.clone(),
                ql_type: field.ql_type(),
            }),
            Some(element) => element
                .entity()
                .map(|entity| entity_info(entity))
                .ok_or_else(|| QlError::invalid_operand(format!("cannot select '{}'", data.path))),
            None => Err(QlError::invalid_path(&data.path, "path is not resolved")),
        },
        NodeKind::Aggregate { function, .. } => {
            let ql_type = match expression.child(0).and_then(Node::path).map(|p| p.path_type) {
                Some(PathType::CmpField(ty)) => Some(ty),
                _ => None,
            };
            Ok(SelectInfo::Aggregate {
                function: function.as_str().to_string(),
                ql_type,
            })
        }
        other => Err(QlError::Unsupported(format!("{} in SELECT clause", other.name()))),
    }
}

fn entity_info(entity: &EntityBridge) -> SelectInfo {
    SelectInfo::Entity {
        ejb_name: entity.ejb_name.clone(),
        columns: entity
            .primary_key_columns()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::catalog::fixtures::order_catalog;

    fn compiler(config: QueryConfig) -> QueryCompiler {
        QueryCompiler::new(Arc::new(order_catalog()), config)
    }

    #[test]
    fn test_compile_end_to_end() {
        let compiled = compiler(QueryConfig::default())
            .compile("select distinct object(o) from Order o where o.amount > ?1")
            .unwrap();
        assert_eq!(
            compiled.ejbql,
            "SELECT DISTINCT OBJECT(o) FROM Order AS o WHERE o.amount > ?1"
        );
        assert_eq!(
            compiled.sql,
            "SELECT DISTINCT t0_o.order_id FROM orders t0_o WHERE t0_o.amount > ?"
        );
        assert_eq!(compiled.parameters, vec![1]);
        assert!(compiled.distinct);
        assert_eq!(
            compiled.select,
            SelectInfo::Entity {
                ejb_name: "OrderEJB".into(),
                columns: vec!["order_id".into()]
            }
        );
    }

    #[test]
    fn test_select_info_variants() {
        let compiler = compiler(QueryConfig::default());
        assert_eq!(
            compiler.compile("SELECT o.customer.name FROM Order o").unwrap().select,
            SelectInfo::Field {
                column: "name".into(),
                ql_type: QlType::String
            }
        );
        assert_eq!(
            compiler.compile("SELECT COUNT(o) FROM Order o").unwrap().select,
            SelectInfo::Aggregate {
                function: "COUNT".into(),
                ql_type: None
            }
        );
        assert!(matches!(
            compiler.compile("SELECT o.customer FROM Order o").unwrap().select,
            SelectInfo::Entity { ejb_name, .. } if ejb_name == "CustomerEJB"
        ));
    }

    #[test]
    fn test_nesting_bound_comes_from_config() {
        let query = "SELECT OBJECT(o) FROM Order o WHERE ((((o.amount > 1))))";
        assert!(compiler(QueryConfig::default()).compile(query).is_ok());

        let shallow = QueryConfig {
            max_nesting_depth: 4,
            ..QueryConfig::default()
        };
        assert!(matches!(
            compiler(shallow).compile(query),
            Err(QlError::Parse { .. })
        ));
    }

    #[test]
    fn test_config_is_honoured() {
        let config = QueryConfig {
            max_query_length: 20,
            ..QueryConfig::default()
        };
        assert!(matches!(
            compiler(config).compile("SELECT OBJECT(o) FROM Order o"),
            Err(QlError::QueryTooLong { length: 29, max: 20 })
        ));

        let config = QueryConfig {
            alias_prefix: "q".into(),
            ..QueryConfig::default()
        };
        assert_eq!(
            compiler(config).compile("SELECT OBJECT(o) FROM Order o").unwrap().sql,
            "SELECT q0_o.order_id FROM orders q0_o"
        );
    }

    #[test]
    fn test_eager_and_deferred_schema_errors_agree() {
        let expected = QlError::UnknownSchema {
            identifier: "w".into(),
            schema: "Widget".into(),
        };
        let query = "SELECT OBJECT(o) FROM Order o, Widget w";
        assert_eq!(
            compiler(QueryConfig::default()).compile(query).unwrap_err(),
            expected
        );
        let eager = QueryConfig {
            eager_identifier_validation: true,
            ..QueryConfig::default()
        };
        assert_eq!(compiler(eager).compile(query).unwrap_err(), expected);
    }
}
