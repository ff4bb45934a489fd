//! SQL generation from a resolved syntax tree
//!
//! Every identification variable and every single-valued relationship
//! navigated by a path gets its own table alias. Navigation adds an inner
//! join on the relationship's key mapping; collection tests become
//! correlated `EXISTS` subqueries.

use std::collections::HashMap;
use std::sync::Arc;

use super::ast::{ComparisonKind, ComparisonOp, Node, NodeKind, PathData, PathElement, PathType};
use super::basic_visitor::quote;
use super::block_buffer::{BlockStringBuffer, negation_prefix};
use super::bridge::EntityBridge;
use super::error::{QlError, QlResult};
use super::identifiers::{IdentifierManager, path_key};
use super::literal::strip_type_suffix;
use super::visitor::Visitor;

/// Generated statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    /// Statement text with `?` placeholders
    pub sql: String,
    /// EJB-QL parameter number of each placeholder, in statement order
    pub parameters: Vec<u32>,
}

#[derive(Debug, Clone)]
struct Alias {
    name: String,
    entity: Arc<EntityBridge>,
}

/// Translates one resolved query into SQL
#[derive(Debug)]
pub struct SqlCompiler<'a, 'c> {
    manager: &'a IdentifierManager<'c>,
    alias_prefix: String,
    aliases: HashMap<String, Alias>,
    tables: Vec<(String, String)>,
    joins: Vec<String>,
    parameters: Vec<u32>,
    counter: usize,
}

impl<'a, 'c> SqlCompiler<'a, 'c> {
    /// Compiler over the declarations of `manager`
    pub fn new(manager: &'a IdentifierManager<'c>, alias_prefix: impl Into<String>) -> Self {
        Self {
            manager,
            alias_prefix: alias_prefix.into(),
            aliases: HashMap::new(),
            tables: Vec::new(),
            joins: Vec::new(),
            parameters: Vec::new(),
            counter: 0,
        }
    }

    /// Translate `root`, a resolved [`NodeKind::EjbQl`] tree
    pub fn compile(mut self, root: &Node) -> QlResult<SqlQuery> {
        let from = root
            .find_child(|k| matches!(k, NodeKind::From))
            .ok_or_else(|| QlError::Unsupported("query without FROM clause".into()))?;
        self.declare_from(from)?;

        let select = root
            .find_child(|k| matches!(k, NodeKind::Select { .. }))
            .ok_or_else(|| QlError::Unsupported("query without SELECT clause".into()))?;
        let distinct = matches!(select.kind(), NodeKind::Select { distinct: true });
        let select_list = self.render(select)?;

        let condition = match root.find_child(|k| matches!(k, NodeKind::Where)) {
            Some(clause) => Some(self.render(clause)?),
            None => None,
        };
        let order_by = match root.find_child(|k| matches!(k, NodeKind::OrderBy)) {
            Some(clause) => Some(self.render(clause)?),
            None => None,
        };
        let limit = match root.find_child(|k| matches!(k, NodeKind::LimitOffset { .. })) {
            Some(clause) => Some(self.render(clause)?),
            None => None,
        };

        let mut sql = BlockStringBuffer::new();
        sql.append(if distinct { "SELECT DISTINCT " } else { "SELECT " })
            .append_block(select_list)
            .append(" FROM ");
        let tables: Vec<String> = self
            .tables
            .iter()
            .map(|(table, alias)| format!("{table} {alias}"))
            .collect();
        sql.append(tables.join(", "));

        match (self.joins.is_empty(), condition) {
            (true, Some(mut condition)) => {
                condition.prepend(" WHERE ");
                sql.append_block(condition);
            }
            (false, condition) => {
                sql.append(" WHERE ").append(self.joins.join(" AND "));
                if let Some(mut condition) = condition {
                    condition.prepend(" AND (").append(")");
                    sql.append_block(condition);
                }
            }
            (true, None) => {}
        }
        if let Some(mut order_by) = order_by {
            order_by.prepend(" ORDER BY ");
            sql.append_block(order_by);
        }
        if let Some(limit) = limit {
            sql.append(" ").append_block(limit);
        }

        Ok(SqlQuery {
            sql: sql.to_string(),
            parameters: self.parameters,
        })
    }

    fn render(&mut self, node: &Node) -> QlResult<BlockStringBuffer> {
        let mut buffer = BlockStringBuffer::new();
        node.accept(self, &mut buffer)?;
        Ok(buffer)
    }

    fn render_child(&mut self, node: &Node, index: usize) -> QlResult<BlockStringBuffer> {
        let child = node.child(index).ok_or_else(|| {
            QlError::Unsupported(format!("{} node is missing operand {index}", node.kind().name()))
        })?;
        self.render(child)
    }

    fn new_alias(&mut self, name: &str) -> String {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let alias = format!("{}{}_{sanitized}", self.alias_prefix, self.counter);
        self.counter += 1;
        alias
    }

    fn add_table(&mut self, key: String, name: &str, entity: Arc<EntityBridge>) -> String {
        let alias = self.new_alias(name);
        self.tables
            .push((entity.table_name.clone(), alias.clone()));
        self.aliases.insert(
            key,
            Alias {
                name: alias.clone(),
                entity,
            },
        );
        alias
    }

    fn declare_from(&mut self, from: &Node) -> QlResult<()> {
        for declaration in &from.children {
            let identifier = declaration
                .child(1)
                .and_then(Node::name)
                .ok_or_else(|| QlError::Unsupported("declaration without identifier".into()))?;
            let entity = self.manager.entity(identifier)?;

            match declaration.kind() {
                NodeKind::RangeVariableDeclaration => {
                    self.add_table(path_key(identifier), identifier, entity);
                }
                NodeKind::CollectionMemberDeclaration => {
                    let data = declaration
                        .child(0)
                        .and_then(Node::path)
                        .ok_or_else(|| QlError::Unsupported("collection member without path".into()))?;
                    let Some(PathElement::Cmr { field, .. }) = data.last_element() else {
                        return Err(QlError::NotCollectionValued(data.path.clone()));
                    };
                    let owner = self.entity_alias(data, data.field_list.len().saturating_sub(2))?;
                    let alias = self.add_table(path_key(identifier), identifier, entity);
                    for pair in &field.key_mapping {
                        self.joins.push(format!(
                            "{owner}.{} = {alias}.{}",
                            pair.local_column, pair.related_column
                        ));
                    }
                }
                other => {
                    return Err(QlError::Unsupported(format!("{} in FROM clause", other.name())));
                }
            }
        }
        Ok(())
    }

    /// Alias of the entity reached at `index` of a resolved path, joining
    /// single-valued relationships on first use
    fn entity_alias(&mut self, data: &PathData, index: usize) -> QlResult<String> {
        let prefix = data.path_list.get(index).ok_or_else(|| {
            QlError::invalid_path(&data.path, "path is not resolved")
        })?;
        let key = path_key(prefix);
        if let Some(alias) = self.aliases.get(&key) {
            return Ok(alias.name.clone());
        }

        match data.field_list.get(index) {
            Some(PathElement::Cmr { field, related, .. }) if !field.collection_valued && index > 0 => {
                let owner = self.entity_alias(data, index - 1)?;
                let alias = self.add_table(key, prefix, Arc::clone(related));
                for pair in &field.key_mapping {
                    self.joins.push(format!(
                        "{owner}.{} = {alias}.{}",
                        pair.local_column, pair.related_column
                    ));
                }
                Ok(alias)
            }
            _ => Err(QlError::Unsupported(format!("no table alias for '{prefix}'"))),
        }
    }

    /// Qualified primary key columns of the entity a path denotes
    fn entity_columns(&mut self, data: &PathData) -> QlResult<Vec<String>> {
        let index = data.field_list.len().saturating_sub(1);
        let entity = data
            .last_element()
            .and_then(PathElement::entity)
            .cloned()
            .ok_or_else(|| QlError::invalid_operand(format!("'{}' is not an entity", data.path)))?;
        let alias = self.entity_alias(data, index)?;
        Ok(qualified(&alias, &entity.primary_key_columns()))
    }

    fn column(&mut self, data: &PathData) -> QlResult<String> {
        let Some(PathElement::Cmp { field, .. }) = data.last_element() else {
            return Err(QlError::invalid_operand(format!(
                "'{}' is not a persistent field",
                data.path
            )));
        };
        let owner = self.entity_alias(data, data.field_list.len().saturating_sub(2))?;
        Ok(format!("{owner}.{}", field.column_name))
    }

    fn parameter(&mut self, number: u32) -> String {
        self.parameters.push(number);
        "?".to_string()
    }

    /// Columns standing for an entity operand: its key columns, or one
    /// placeholder for an input parameter
    fn entity_operand(&mut self, node: &Node) -> QlResult<Vec<String>> {
        match node.kind() {
            NodeKind::Path(data) => self.entity_columns(data),
            NodeKind::Parameter { number } => Ok(vec![self.parameter(*number)]),
            other => Err(QlError::invalid_operand(format!(
                "{} is not an entity expression",
                other.name()
            ))),
        }
    }

    /// `[NOT] EXISTS (SELECT 1 FROM related WHERE join [AND key = member])`
    fn collection_exists(
        &mut self,
        collection: &Node,
        member: Option<&Node>,
        exists: bool,
    ) -> QlResult<BlockStringBuffer> {
        let data = collection
            .path()
            .filter(|p| p.path_type == PathType::Collection)
            .ok_or_else(|| QlError::NotCollectionValued(collection.kind().name().to_string()))?;
        let Some(PathElement::Cmr { field, related, .. }) = data.last_element() else {
            return Err(QlError::NotCollectionValued(data.path.clone()));
        };
        let owner = self.entity_alias(data, data.field_list.len().saturating_sub(2))?;
        let sub = self.new_alias(&data.path);

        let mut conditions: Vec<String> = field
            .key_mapping
            .iter()
            .map(|pair| format!("{owner}.{} = {sub}.{}", pair.local_column, pair.related_column))
            .collect();
        if let Some(member) = member {
            let keys = qualified(&sub, &related.primary_key_columns());
            let values = self.entity_operand(member)?;
            if keys.len() != values.len() {
                return Err(QlError::Unsupported(format!(
                    "MEMBER OF with a {}-column key",
                    keys.len()
                )));
            }
            conditions.extend(keys.iter().zip(&values).map(|(k, v)| format!("{k} = {v}")));
        }

        let mut buffer = BlockStringBuffer::new();
        buffer
            .append(format!(
                "SELECT 1 FROM {} {sub} WHERE {}",
                related.table_name,
                conditions.join(" AND ")
            ))
            .prepend("EXISTS (")
            .append(")");
        if !exists {
            buffer.prepend("NOT ");
        }
        Ok(buffer)
    }

    fn function(&mut self, name: &str, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append(name).append("(");
        self.join(node, ", ", buf)?;
        buf.append(")");
        Ok(())
    }

    fn join(&mut self, node: &Node, separator: &str, buf: &mut BlockStringBuffer) -> QlResult<()> {
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                buf.append(separator);
            }
            child.accept(self, buf)?;
        }
        Ok(())
    }
}

fn qualified(alias: &str, columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| format!("{alias}.{c}")).collect()
}

fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

impl Visitor for SqlCompiler<'_, '_> {
    type Data = BlockStringBuffer;

    fn visit_select(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let expression = node
            .child(0)
            .ok_or_else(|| QlError::Unsupported("empty select clause".into()))?;
        if let Some(name) = expression.name() {
            let alias = self
                .aliases
                .get(&path_key(name))
                .cloned()
                .ok_or_else(|| QlError::UnknownIdentifier(name.to_string()))?;
            let columns = qualified(&alias.name, &alias.entity.primary_key_columns());
            buf.append(columns.join(", "));
            return Ok(());
        }
        expression.accept(self, buf)
    }

    fn visit_or(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.join(node, " OR ", buf)
    }

    fn visit_and(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.join(node, " AND ", buf)
    }

    fn visit_not(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let operand = self.render_child(node, 0)?;
        buf.append("NOT (").append_block(operand).append(")");
        Ok(())
    }

    fn visit_conditional_parenthetical(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let inner = self.render_child(node, 0)?;
        buf.append("(").append_block(inner).append(")");
        Ok(())
    }

    fn visit_between(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::Between { not: true });
        let operand = self.render_child(node, 0)?;
        let low = self.render_child(node, 1)?;
        let high = self.render_child(node, 2)?;
        buf.append_block(operand)
            .append(format!(" {}BETWEEN ", not(negated)))
            .append_block(low)
            .append(" AND ")
            .append_block(high);
        Ok(())
    }

    fn visit_in(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::In { not: true });
        let operand = self.render_child(node, 0)?;
        buf.append_block(operand).append(format!(" {}IN (", not(negated)));
        for (i, item) in node.children.iter().enumerate().skip(1) {
            if i > 1 {
                buf.append(", ");
            }
            item.accept(self, buf)?;
        }
        buf.append(")");
        Ok(())
    }

    fn visit_like(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::Like { not: true });
        let operand = self.render_child(node, 0)?;
        let pattern = self.render_child(node, 1)?;
        buf.append_block(operand)
            .append(format!(" {}LIKE ", not(negated)))
            .append_block(pattern);
        if node.child(2).is_some() {
            let escape = self.render_child(node, 2)?;
            buf.append(" ESCAPE ").append_block(escape);
        }
        Ok(())
    }

    fn visit_null_comparison(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::NullComparison { not: true });
        let test = format!(" IS {}NULL", not(negated));
        let operand = node
            .child(0)
            .ok_or_else(|| QlError::Unsupported("IS NULL without operand".into()))?;

        let columns = match operand.path() {
            // A null relationship has null foreign key columns; joining it
            // would drop the row instead
            Some(data) if data.path_type == PathType::Entity && data.field_list.len() > 1 => {
                let Some(PathElement::Cmr { field, .. }) = data.last_element() else {
                    return Err(QlError::invalid_path(&data.path, "not a relationship"));
                };
                let owner = self.entity_alias(data, data.field_list.len() - 2)?;
                field
                    .key_mapping
                    .iter()
                    .map(|pair| format!("{owner}.{}", pair.local_column))
                    .collect()
            }
            Some(data) if data.path_type == PathType::Entity => self.entity_columns(data)?,
            _ => vec![self.render(operand)?.to_string()],
        };

        let tests: Vec<String> = columns.iter().map(|c| format!("{c}{test}")).collect();
        if tests.len() > 1 {
            let combined = if negated { " OR " } else { " AND " };
            buf.append(format!("({})", tests.join(combined)));
        } else {
            buf.append(tests.join(""));
        }
        Ok(())
    }

    fn visit_is_empty(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::IsEmpty { not: true });
        let collection = node
            .child(0)
            .ok_or_else(|| QlError::Unsupported("IS EMPTY without operand".into()))?;
        // IS EMPTY holds when no related row exists
        let exists = self.collection_exists(collection, None, negated)?;
        buf.append_block(exists);
        Ok(())
    }

    fn visit_member_of(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::MemberOf { not: true });
        let (Some(member), Some(collection)) = (node.child(0), node.child(1)) else {
            return Err(QlError::Unsupported("MEMBER OF without operands".into()));
        };
        let exists = self.collection_exists(collection, Some(member), !negated)?;
        buf.append_block(exists);
        Ok(())
    }

    fn visit_comparison(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let NodeKind::Comparison { kind, opp } = *node.kind() else {
            return Ok(());
        };
        let (Some(lhs), Some(rhs)) = (node.child(0), node.child(1)) else {
            return Err(QlError::Unsupported("comparison without operands".into()));
        };

        if kind == ComparisonKind::Entity {
            let left = self.entity_operand(lhs)?;
            let right = self.entity_operand(rhs)?;
            if left.len() != right.len() {
                return Err(QlError::Unsupported(format!(
                    "comparing a {}-column key with {} value(s)",
                    left.len(),
                    right.len()
                )));
            }
            let pairs: Vec<String> = left
                .iter()
                .zip(&right)
                .map(|(l, r)| format!("{l} = {r}"))
                .collect();
            let equal = if pairs.len() == 1 {
                pairs.join("")
            } else {
                format!("({})", pairs.join(" AND "))
            };
            buf.append(if opp == ComparisonOp::Eq {
                equal
            } else {
                format!("NOT {equal}")
            });
            return Ok(());
        }

        let left = self.render(lhs)?;
        let right = self.render(rhs)?;
        buf.append_block(left)
            .append(format!(" {opp} "))
            .append_block(right);
        Ok(())
    }

    fn visit_plus_minus(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let (NodeKind::PlusMinus { ops } | NodeKind::MultDiv { ops }) = node.kind() else {
            return Ok(());
        };
        for (i, child) in node.children.iter().enumerate() {
            if let Some(op) = i.checked_sub(1).and_then(|j| ops.get(j)) {
                buf.append(format!(" {} ", op.as_str()));
            }
            child.accept(self, buf)?;
        }
        Ok(())
    }

    fn visit_mult_div(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.visit_plus_minus(node, buf)
    }

    fn visit_negation(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let operand = self.render_child(node, 0)?;
        buf.append(negation_prefix(&operand)).append_block(operand);
        Ok(())
    }

    fn visit_arithmetic_parenthetical(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.visit_conditional_parenthetical(node, buf)
    }

    fn visit_concat(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append("(");
        self.join(node, " || ", buf)?;
        buf.append(")");
        Ok(())
    }

    fn visit_substring(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("SUBSTRING", node, buf)
    }

    fn visit_length(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("LENGTH", node, buf)
    }

    fn visit_locate(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("LOCATE", node, buf)
    }

    fn visit_abs(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("ABS", node, buf)
    }

    fn visit_sqrt(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("SQRT", node, buf)
    }

    fn visit_mod(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("MOD", node, buf)
    }

    fn visit_ucase(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("UPPER", node, buf)
    }

    fn visit_lcase(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("LOWER", node, buf)
    }

    fn visit_aggregate(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let NodeKind::Aggregate { function, distinct } = *node.kind() else {
            return Ok(());
        };
        let data = node
            .child(0)
            .and_then(Node::path)
            .ok_or_else(|| QlError::Unsupported("aggregate without path".into()))?;
        let argument = match data.path_type {
            PathType::CmpField(_) => self.column(data)?,
            PathType::Entity => {
                let columns = self.entity_columns(data)?;
                match columns.as_slice() {
                    [column] => column.clone(),
                    _ if !distinct => "*".to_string(),
                    _ => {
                        return Err(QlError::Unsupported(format!(
                            "{}(DISTINCT) over a composite key",
                            function.as_str()
                        )));
                    }
                }
            }
            _ => {
                return Err(QlError::invalid_operand(format!(
                    "{} cannot be applied to '{}'",
                    function.as_str(),
                    data.path
                )));
            }
        };
        buf.append(format!(
            "{}({}{argument})",
            function.as_str(),
            if distinct { "DISTINCT " } else { "" }
        ));
        Ok(())
    }

    fn visit_path(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let Some(data) = node.path() else {
            return Ok(());
        };
        match data.path_type {
            PathType::CmpField(_) => {
                let column = self.column(data)?;
                buf.append(column);
            }
            PathType::Entity => {
                let columns = self.entity_columns(data)?;
                match columns.as_slice() {
                    [column] => {
                        buf.append(column.as_str());
                    }
                    _ => {
                        buf.append(columns.join(", "));
                    }
                }
            }
            PathType::Collection | PathType::Unresolved => {
                return Err(QlError::invalid_operand(format!(
                    "'{}' cannot be used as a value",
                    data.path
                )));
            }
        }
        Ok(())
    }

    fn visit_parameter(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::Parameter { number } = *node.kind() {
            let placeholder = self.parameter(number);
            buf.append(placeholder);
        }
        Ok(())
    }

    fn visit_exact_numeric_literal(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::ExactNumericLiteral { value, .. } = node.kind() {
            buf.append(value.to_string());
        }
        Ok(())
    }

    fn visit_approximate_numeric_literal(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::ApproximateNumericLiteral { literal, .. } = node.kind() {
            buf.append(strip_type_suffix(literal));
        }
        Ok(())
    }

    fn visit_string_literal(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::StringLiteral { value } = node.kind() {
            buf.append(quote(value));
        }
        Ok(())
    }

    fn visit_boolean_literal(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::BooleanLiteral { value } = node.kind() {
            buf.append(if *value { "TRUE" } else { "FALSE" });
        }
        Ok(())
    }

    fn visit_order_by(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.join(node, ", ", buf)
    }

    fn visit_order_by_path(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.visit_children(node, buf)?;
        if matches!(node.kind(), NodeKind::OrderByPath { ascending: false }) {
            buf.append(" DESC");
        }
        Ok(())
    }

    fn visit_limit_offset(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let NodeKind::LimitOffset { has_offset, has_limit } = *node.kind() else {
            return Ok(());
        };
        let offset = if has_offset { node.child(0) } else { None };
        let limit = if has_limit {
            node.child(usize::from(has_offset))
        } else {
            None
        };
        // SQL puts LIMIT before OFFSET
        if let Some(limit) = limit {
            buf.append("LIMIT ");
            limit.accept(self, buf)?;
        }
        if let Some(offset) = offset {
            if limit.is_some() {
                buf.append(" ");
            }
            buf.append("OFFSET ");
            offset.accept(self, buf)?;
        }
        Ok(())
    }
}
