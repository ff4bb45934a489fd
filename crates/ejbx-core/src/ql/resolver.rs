//! Semantic resolution of a parsed query
//!
//! Declares the FROM clause, resolves every path against the catalog and
//! types comparisons. Paths and comparisons are decorated in place.

use std::sync::Arc;

use super::ast::{
    AggregateFunction, ComparisonKind, Node, NodeKind, PathData, PathElement, PathType,
};
use super::error::{QlError, QlResult};
use super::identifiers::IdentifierManager;

/// Resolve `root`, an [`NodeKind::EjbQl`] node, declaring its variables in
/// `manager`
pub fn resolve(root: &mut Node, manager: &mut IdentifierManager<'_>) -> QlResult<()> {
    let mut resolver = Resolver { manager };

    // FROM first: every other clause refers to its variables
    for clause in &mut root.children {
        if matches!(clause.kind(), NodeKind::From) {
            for declaration in &mut clause.children {
                resolver.declare(declaration)?;
            }
        }
    }
    for clause in &mut root.children {
        if !matches!(clause.kind(), NodeKind::From) {
            resolver.resolve_node(clause)?;
        }
    }
    Ok(())
}

struct Resolver<'a, 'c> {
    manager: &'a mut IdentifierManager<'c>,
}

fn missing(node: &Node, what: &str) -> QlError {
    QlError::Unsupported(format!("{} node without {what}", node.kind().name()))
}

fn path_type_of(element: &PathElement) -> PathType {
    match element {
        PathElement::Entity(_) => PathType::Entity,
        PathElement::Cmr { field, .. } if field.collection_valued => PathType::Collection,
        PathElement::Cmr { .. } => PathType::Entity,
        PathElement::Cmp { field, .. } => PathType::CmpField(field.ql_type()),
    }
}

impl Resolver<'_, '_> {
    fn declare(&mut self, declaration: &mut Node) -> QlResult<()> {
        let identifier = declaration
            .child(1)
            .and_then(Node::name)
            .ok_or_else(|| missing(declaration, "identifier"))?
            .to_string();

        match declaration.kind().clone() {
            NodeKind::RangeVariableDeclaration => {
                let schema = declaration
                    .child(0)
                    .and_then(Node::name)
                    .ok_or_else(|| missing(declaration, "abstract schema"))?
                    .to_string();
                self.manager.declare_range_variable(&identifier, &schema)
            }
            NodeKind::CollectionMemberDeclaration => {
                let data = declaration
                    .children
                    .first_mut()
                    .and_then(Node::path_mut)
                    .ok_or_else(|| QlError::Unsupported("collection member without path".into()))?;
                self.resolve_path(data)?;
                let path = data.path.clone();
                self.manager.declare_collection_member(&identifier, &path)
            }
            other => Err(QlError::Unsupported(format!(
                "{} in FROM clause",
                other.name()
            ))),
        }
    }

    fn resolve_node(&mut self, node: &mut Node) -> QlResult<()> {
        if let Some(data) = node.path_mut() {
            return self.resolve_path(data);
        }
        for child in &mut node.children {
            self.resolve_node(child)?;
        }
        self.check(node)
    }

    fn resolve_path(&mut self, data: &mut PathData) -> QlResult<()> {
        if let (Some(paths), Some(fields)) = (
            self.manager.path_list(&data.path),
            self.manager.field_list(&data.path),
        ) {
            data.path_list = paths.to_vec();
            data.field_list = fields.to_vec();
            data.path_type = fields.last().map(path_type_of).unwrap_or_default();
            return Ok(());
        }

        let mut segments = data.path.split('.');
        let root = segments.next().unwrap_or_default();
        let mut prefix = root.to_string();
        let mut path_list = vec![prefix.clone()];
        let mut field_list = vec![PathElement::Entity(self.manager.entity(root)?)];

        for segment in segments {
            let owner = match field_list.last() {
                Some(PathElement::Entity(entity)) => Arc::clone(entity),
                Some(PathElement::Cmr { field, related, .. }) if !field.collection_valued => {
                    Arc::clone(related)
                }
                Some(PathElement::Cmr { .. }) => {
                    return Err(QlError::invalid_path(
                        &data.path,
                        format!("'{prefix}' is collection valued and cannot be navigated"),
                    ));
                }
                Some(PathElement::Cmp { .. }) | None => {
                    return Err(QlError::invalid_path(
                        &data.path,
                        format!("'{prefix}' is a persistent field and cannot be navigated"),
                    ));
                }
            };

            let element = if let Some(field) = owner.cmp_field(segment) {
                PathElement::Cmp {
                    owner: Arc::clone(&owner),
                    field: field.clone(),
                }
            } else if let Some(field) = owner.cmr_field(segment) {
                let related = self
                    .manager
                    .catalog()
                    .entity_by_ejb_name(&field.related_entity)
                    .cloned()
                    .ok_or_else(|| {
                        QlError::invalid_path(
                            &data.path,
                            format!("related entity '{}' is not deployed", field.related_entity),
                        )
                    })?;
                PathElement::Cmr {
                    owner: Arc::clone(&owner),
                    field: field.clone(),
                    related,
                }
            } else {
                return Err(QlError::invalid_path(
                    &data.path,
                    format!(
                        "{} has no field '{segment}'",
                        owner.abstract_schema_name
                    ),
                ));
            };

            prefix.push('.');
            prefix.push_str(segment);
            path_list.push(prefix.clone());
            field_list.push(element);
        }

        data.path_type = field_list.last().map(path_type_of).unwrap_or_default();
        self.manager
            .register_path(&data.path, path_list.clone(), field_list.clone())?;
        data.path_list = path_list;
        data.field_list = field_list;
        Ok(())
    }

    fn check(&mut self, node: &mut Node) -> QlResult<()> {
        match node.kind().clone() {
            NodeKind::Select { .. } => {
                let expression = node.child(0).ok_or_else(|| missing(node, "expression"))?;
                if let Some(name) = expression.name() {
                    if !self.manager.is_declared(name) {
                        return Err(QlError::UnknownIdentifier(name.to_string()));
                    }
                } else if let Some(path) = expression.path()
                    && path.path_type == PathType::Collection
                {
                    return Err(QlError::invalid_operand(format!(
                        "collection-valued path '{}' cannot be selected",
                        path.path
                    )));
                }
            }
            NodeKind::Comparison { opp, .. } => {
                let lhs = operand_kind(node.child(0).ok_or_else(|| missing(node, "operands"))?)?;
                let rhs = operand_kind(node.child(1).ok_or_else(|| missing(node, "operands"))?)?;
                let kind = match (lhs, rhs) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(QlError::invalid_operand(format!(
                            "cannot compare {a:?} with {b:?}"
                        )));
                    }
                    (Some(kind), _) | (None, Some(kind)) => kind,
                    (None, None) => ComparisonKind::Unresolved,
                };
                if matches!(kind, ComparisonKind::Boolean | ComparisonKind::Entity)
                    && !opp.is_equality()
                {
                    return Err(QlError::invalid_operand(format!(
                        "{kind:?} operands only support = and <>, found {opp}"
                    )));
                }
                node.set_comparison_kind(kind);
            }
            NodeKind::IsEmpty { .. } => {
                collection_path(node.child(0).ok_or_else(|| missing(node, "path"))?)?;
            }
            NodeKind::MemberOf { .. } => {
                collection_path(node.child(1).ok_or_else(|| missing(node, "collection"))?)?;
                let member = node.child(0).ok_or_else(|| missing(node, "member"))?;
                if let Some(path) = member.path()
                    && path.path_type != PathType::Entity
                {
                    return Err(QlError::invalid_operand(format!(
                        "MEMBER OF requires an entity, '{}' is not one",
                        path.path
                    )));
                }
            }
            NodeKind::NullComparison { .. } => {
                if let Some(path) = node.child(0).and_then(Node::path)
                    && path.path_type == PathType::Collection
                {
                    return Err(QlError::invalid_operand(format!(
                        "use IS EMPTY to test collection-valued path '{}'",
                        path.path
                    )));
                }
            }
            NodeKind::Like { .. } => {
                let operand = operand_kind(node.child(0).ok_or_else(|| missing(node, "operand"))?)?;
                if operand.is_some_and(|k| k != ComparisonKind::String) {
                    return Err(QlError::invalid_operand("LIKE requires a string expression"));
                }
            }
            NodeKind::OrderByPath { .. } => {
                let path = node.child(0).and_then(Node::path).ok_or_else(|| missing(node, "path"))?;
                if !matches!(path.path_type, PathType::CmpField(_)) {
                    return Err(QlError::invalid_operand(format!(
                        "ORDER BY requires a persistent field, '{}' is not one",
                        path.path
                    )));
                }
            }
            NodeKind::Aggregate { function, .. } => {
                let path = node.child(0).and_then(Node::path).ok_or_else(|| missing(node, "path"))?;
                let allowed = match path.path_type {
                    PathType::CmpField(_) => true,
                    PathType::Entity => function == AggregateFunction::Count,
                    _ => false,
                };
                if !allowed {
                    return Err(QlError::invalid_operand(format!(
                        "{} cannot be applied to '{}'",
                        function.as_str(),
                        path.path
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn collection_path(node: &Node) -> QlResult<&PathData> {
    match node.path() {
        Some(path) if path.path_type == PathType::Collection => Ok(path),
        Some(path) => Err(QlError::NotCollectionValued(path.path.clone())),
        None => Err(QlError::NotCollectionValued(node.kind().name().to_string())),
    }
}

/// Operand type of an expression; `None` for input parameters
fn operand_kind(node: &Node) -> QlResult<Option<ComparisonKind>> {
    Ok(match node.kind() {
        NodeKind::Path(data) => match data.path_type {
            PathType::Entity => Some(ComparisonKind::Entity),
            PathType::CmpField(ty) => Some(ty.into()),
            PathType::Collection => {
                return Err(QlError::invalid_operand(format!(
                    "collection-valued path '{}' cannot be compared",
                    data.path
                )));
            }
            PathType::Unresolved => None,
        },
        NodeKind::StringLiteral { .. }
        | NodeKind::Concat
        | NodeKind::Substring
        | NodeKind::UCase
        | NodeKind::LCase => Some(ComparisonKind::String),
        NodeKind::ExactNumericLiteral { .. }
        | NodeKind::ApproximateNumericLiteral { .. }
        | NodeKind::PlusMinus { .. }
        | NodeKind::MultDiv { .. }
        | NodeKind::Negation
        | NodeKind::Length
        | NodeKind::Locate
        | NodeKind::Abs
        | NodeKind::Sqrt
        | NodeKind::Mod => Some(ComparisonKind::Arithmetic),
        NodeKind::BooleanLiteral { .. } => Some(ComparisonKind::Boolean),
        NodeKind::ArithmeticParenthetical => match node.child(0) {
            Some(inner) => operand_kind(inner)?,
            None => None,
        },
        _ => None,
    })
}
