//! Double dispatch over the syntax tree
//!
//! [`Node::accept`] matches on the node's tag once and calls the
//! corresponding `visit_*` method. Every method defaults to visiting the
//! children in order, so implementors only override what they render.

use super::ast::{Node, NodeKind};
use super::error::QlResult;

/// Operation over the syntax tree carrying per-traversal data
#[allow(missing_docs)]
pub trait Visitor {
    /// Data threaded through the traversal, e.g. an output buffer
    type Data;

    /// Visit every child of `node` in order
    fn visit_children(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        for child in &node.children {
            child.accept(self, data)?;
        }
        Ok(())
    }

    fn visit_ejb_ql(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_select(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_from(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_range_variable_declaration(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_collection_member_declaration(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_where(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_or(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_and(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_not(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_conditional_parenthetical(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_between(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_in(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_like(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_null_comparison(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_is_empty(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_member_of(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_comparison(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_plus_minus(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_mult_div(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_negation(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_arithmetic_parenthetical(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_concat(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_substring(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_length(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_locate(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_abs(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_sqrt(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_mod(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_ucase(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_lcase(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_aggregate(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_path(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_identifier(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_abstract_schema(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_parameter(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_exact_numeric_literal(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_approximate_numeric_literal(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_string_literal(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_boolean_literal(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_order_by(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_order_by_path(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
    fn visit_limit_offset(&mut self, node: &Node, data: &mut Self::Data) -> QlResult<()> {
        self.visit_children(node, data)
    }
}

impl Node {
    /// Dispatch to the `visit_*` method of `visitor` matching this node's kind
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V, data: &mut V::Data) -> QlResult<()> {
        match self.kind() {
            NodeKind::EjbQl => visitor.visit_ejb_ql(self, data),
            NodeKind::Select { .. } => visitor.visit_select(self, data),
            NodeKind::From => visitor.visit_from(self, data),
            NodeKind::RangeVariableDeclaration => visitor.visit_range_variable_declaration(self, data),
            NodeKind::CollectionMemberDeclaration => {
                visitor.visit_collection_member_declaration(self, data)
            }
            NodeKind::Where => visitor.visit_where(self, data),
            NodeKind::Or => visitor.visit_or(self, data),
            NodeKind::And => visitor.visit_and(self, data),
            NodeKind::Not => visitor.visit_not(self, data),
            NodeKind::ConditionalParenthetical => visitor.visit_conditional_parenthetical(self, data),
            NodeKind::Between { .. } => visitor.visit_between(self, data),
            NodeKind::In { .. } => visitor.visit_in(self, data),
            NodeKind::Like { .. } => visitor.visit_like(self, data),
            NodeKind::NullComparison { .. } => visitor.visit_null_comparison(self, data),
            NodeKind::IsEmpty { .. } => visitor.visit_is_empty(self, data),
            NodeKind::MemberOf { .. } => visitor.visit_member_of(self, data),
            NodeKind::Comparison { .. } => visitor.visit_comparison(self, data),
            NodeKind::PlusMinus { .. } => visitor.visit_plus_minus(self, data),
            NodeKind::MultDiv { .. } => visitor.visit_mult_div(self, data),
            NodeKind::Negation => visitor.visit_negation(self, data),
            NodeKind::ArithmeticParenthetical => visitor.visit_arithmetic_parenthetical(self, data),
            NodeKind::Concat => visitor.visit_concat(self, data),
            NodeKind::Substring => visitor.visit_substring(self, data),
            NodeKind::Length => visitor.visit_length(self, data),
            NodeKind::Locate => visitor.visit_locate(self, data),
            NodeKind::Abs => visitor.visit_abs(self, data),
            NodeKind::Sqrt => visitor.visit_sqrt(self, data),
            NodeKind::Mod => visitor.visit_mod(self, data),
            NodeKind::UCase => visitor.visit_ucase(self, data),
            NodeKind::LCase => visitor.visit_lcase(self, data),
            NodeKind::Aggregate { .. } => visitor.visit_aggregate(self, data),
            NodeKind::Path(_) => visitor.visit_path(self, data),
            NodeKind::Identifier { .. } => visitor.visit_identifier(self, data),
            NodeKind::AbstractSchema { .. } => visitor.visit_abstract_schema(self, data),
            NodeKind::Parameter { .. } => visitor.visit_parameter(self, data),
            NodeKind::ExactNumericLiteral { .. } => visitor.visit_exact_numeric_literal(self, data),
            NodeKind::ApproximateNumericLiteral { .. } => {
                visitor.visit_approximate_numeric_literal(self, data)
            }
            NodeKind::StringLiteral { .. } => visitor.visit_string_literal(self, data),
            NodeKind::BooleanLiteral { .. } => visitor.visit_boolean_literal(self, data),
            NodeKind::OrderBy => visitor.visit_order_by(self, data),
            NodeKind::OrderByPath { .. } => visitor.visit_order_by_path(self, data),
            NodeKind::LimitOffset { .. } => visitor.visit_limit_offset(self, data),
        }
    }
}
