//! Renders a syntax tree back into canonical EJB-QL text

use super::ast::{Node, NodeKind};
use super::block_buffer::{BlockStringBuffer, negation_prefix};
use super::error::{QlError, QlResult};
use super::visitor::Visitor;

/// EJB-QL pretty printer.
///
/// Keywords come out upper-case, range declarations use `AS`, and string
/// literals are re-quoted. Parsing the output yields an equivalent tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicVisitor;

impl BasicVisitor {
    /// Render `node` and everything below it
    pub fn render(node: &Node) -> QlResult<String> {
        let mut buffer = BlockStringBuffer::new();
        node.accept(&mut BasicVisitor, &mut buffer)?;
        Ok(buffer.to_string())
    }

    fn join(&mut self, nodes: &[Node], separator: &str, buf: &mut BlockStringBuffer) -> QlResult<()> {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                buf.append(separator);
            }
            node.accept(self, buf)?;
        }
        Ok(())
    }

    fn function(&mut self, name: &str, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append(name).append("(");
        self.join(&node.children, ", ", buf)?;
        buf.append(")");
        Ok(())
    }

    fn operand<'n>(&self, node: &'n Node, index: usize) -> QlResult<&'n Node> {
        node.child(index).ok_or_else(|| {
            QlError::Unsupported(format!("{} node is missing operand {index}", node.kind().name()))
        })
    }
}

fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

/// Quote `value` as an EJB-QL string literal
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Visitor for BasicVisitor {
    type Data = BlockStringBuffer;

    fn visit_ejb_ql(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.join(&node.children, " ", buf)
    }

    fn visit_select(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let distinct = matches!(node.kind(), NodeKind::Select { distinct: true });
        buf.append("SELECT ");
        if distinct {
            buf.append("DISTINCT ");
        }
        let expression = self.operand(node, 0)?;
        match expression.name() {
            Some(name) => {
                buf.append(format!("OBJECT({name})"));
                Ok(())
            }
            None => expression.accept(self, buf),
        }
    }

    fn visit_from(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append("FROM ");
        self.join(&node.children, ", ", buf)
    }

    fn visit_range_variable_declaration(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(" AS ");
        self.operand(node, 1)?.accept(self, buf)
    }

    fn visit_collection_member_declaration(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append("IN(");
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(") AS ");
        self.operand(node, 1)?.accept(self, buf)
    }

    fn visit_where(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append("WHERE ");
        self.visit_children(node, buf)
    }

    fn visit_or(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.join(&node.children, " OR ", buf)
    }

    fn visit_and(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.join(&node.children, " AND ", buf)
    }

    fn visit_not(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append("NOT ");
        self.visit_children(node, buf)
    }

    fn visit_conditional_parenthetical(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append("(");
        self.visit_children(node, buf)?;
        buf.append(")");
        Ok(())
    }

    fn visit_between(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::Between { not: true });
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" {}BETWEEN ", not(negated)));
        self.operand(node, 1)?.accept(self, buf)?;
        buf.append(" AND ");
        self.operand(node, 2)?.accept(self, buf)
    }

    fn visit_in(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::In { not: true });
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" {}IN(", not(negated)));
        self.join(node.children.get(1..).unwrap_or_default(), ", ", buf)?;
        buf.append(")");
        Ok(())
    }

    fn visit_like(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::Like { not: true });
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" {}LIKE ", not(negated)));
        self.operand(node, 1)?.accept(self, buf)?;
        if let Some(escape) = node.child(2) {
            buf.append(" ESCAPE ");
            escape.accept(self, buf)?;
        }
        Ok(())
    }

    fn visit_null_comparison(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::NullComparison { not: true });
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" IS {}NULL", not(negated)));
        Ok(())
    }

    fn visit_is_empty(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::IsEmpty { not: true });
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" IS {}EMPTY", not(negated)));
        Ok(())
    }

    fn visit_member_of(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let negated = matches!(node.kind(), NodeKind::MemberOf { not: true });
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" {}MEMBER OF ", not(negated)));
        self.operand(node, 1)?.accept(self, buf)
    }

    fn visit_comparison(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let NodeKind::Comparison { opp, .. } = node.kind() else {
            return Ok(());
        };
        self.operand(node, 0)?.accept(self, buf)?;
        buf.append(format!(" {opp} "));
        self.operand(node, 1)?.accept(self, buf)
    }

    fn visit_plus_minus(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let (NodeKind::PlusMinus { ops } | NodeKind::MultDiv { ops }) = node.kind() else {
            return Ok(());
        };
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                let op = ops.get(i - 1).ok_or_else(|| {
                    QlError::Unsupported("arithmetic chain is missing an operator".into())
                })?;
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
        let mut operand = BlockStringBuffer::new();
        self.operand(node, 0)?.accept(self, &mut operand)?;
        buf.append(negation_prefix(&operand)).append_block(operand);
        Ok(())
    }

    fn visit_arithmetic_parenthetical(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.visit_conditional_parenthetical(node, buf)
    }

    fn visit_concat(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("CONCAT", node, buf)
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
        self.function("UCASE", node, buf)
    }

    fn visit_lcase(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.function("LCASE", node, buf)
    }

    fn visit_aggregate(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        let NodeKind::Aggregate { function, distinct } = node.kind() else {
            return Ok(());
        };
        buf.append(function.as_str()).append("(");
        if *distinct {
            buf.append("DISTINCT ");
        }
        self.visit_children(node, buf)?;
        buf.append(")");
        Ok(())
    }

    fn visit_path(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let Some(path) = node.path() {
            buf.append(path.path.as_str());
        }
        Ok(())
    }

    fn visit_identifier(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        buf.append(node.name().unwrap_or_default());
        Ok(())
    }

    fn visit_abstract_schema(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        self.visit_identifier(node, buf)
    }

    fn visit_parameter(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::Parameter { number } = node.kind() {
            buf.append(format!("?{number}"));
        }
        Ok(())
    }

    fn visit_exact_numeric_literal(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::ExactNumericLiteral { literal, .. } = node.kind() {
            buf.append(literal.as_str());
        }
        Ok(())
    }

    fn visit_approximate_numeric_literal(&mut self, node: &Node, buf: &mut BlockStringBuffer) -> QlResult<()> {
        if let NodeKind::ApproximateNumericLiteral { literal, .. } = node.kind() {
            buf.append(literal.as_str());
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
        buf.append("ORDER BY ");
        self.join(&node.children, ", ", buf)
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
        let mut values = node.children.iter();
        let mut clauses = Vec::new();
        if has_offset {
            clauses.push("OFFSET ");
        }
        if has_limit {
            clauses.push("LIMIT ");
        }
        for (i, clause) in clauses.into_iter().enumerate() {
            if i > 0 {
                buf.append(" ");
            }
            buf.append(clause);
            values
                .next()
                .ok_or_else(|| QlError::Unsupported(format!("{clause}value missing")))?
                .accept(self, buf)?;
        }
        Ok(())
    }
}
