//! Recursive-descent EJB-QL parser
//!
//! Grammar: EJB-QL 2.1 plus `ORDER BY`, `OFFSET`/`LIMIT`, `UCASE`/`LCASE`
//! and aggregate select functions.

use smallvec::SmallVec;

use super::ast::{
    AggregateFunction, ArithmeticOp, ComparisonKind, ComparisonOp, Node, NodeKind, PathData,
};
use super::error::{QlError, QlResult};
use super::lexer::{Keyword, Token, TokenKind, tokenize};
use super::literal::{decode_approximate, decode_exact};

/// Default bound on nested conditions, expressions and unary signs
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Parse `query` into a tree rooted at [`NodeKind::EjbQl`]
pub fn parse(query: &str) -> QlResult<Node> {
    parse_with_max_depth(query, DEFAULT_MAX_NESTING_DEPTH)
}

/// Like [`parse`], failing with [`QlError::Parse`] once expressions nest
/// deeper than `max_depth`
pub fn parse_with_max_depth(query: &str, max_depth: usize) -> QlResult<Node> {
    let tokens = tokenize(query)?;
    let mut parser = Parser {
        tokens,
        index: 0,
        depth: 0,
        max_depth,
        too_deep: false,
    };
    let root = parser.ejb_ql()?;
    parser.expect(&TokenKind::Eof, "end of query")?;
    Ok(root)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
    max_depth: usize,
    too_deep: bool,
}

impl Parser {
    // === Token cursor ===

    fn peek(&self) -> &Token {
        // The token list always ends with Eof and the cursor never moves past it
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let index = (self.index + n).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn position(&self) -> usize {
        self.peek().position
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> QlResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> QlResult<Token> {
        if self.at_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{keyword:?}").to_uppercase()))
        }
    }

    fn unexpected(&self, expected: &str) -> QlError {
        QlError::parse(
            self.position(),
            format!("expected {expected}, found {}", self.peek()),
        )
    }

    /// Run `rule` one nesting level deeper
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> QlResult<T>) -> QlResult<T> {
        if self.depth >= self.max_depth {
            self.too_deep = true;
            return Err(QlError::parse(
                self.position(),
                format!("expression nesting exceeds {} levels", self.max_depth),
            ));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn identifier(&mut self) -> QlResult<Token> {
        self.expect(&TokenKind::Ident, "identifier")
    }

    // === Clauses ===

    fn ejb_ql(&mut self) -> QlResult<Node> {
        let position = self.position();
        let mut children = vec![self.select_clause()?, self.from_clause()?];
        if self.at_keyword(Keyword::Where) {
            children.push(self.where_clause()?);
        }
        if self.at_keyword(Keyword::Order) {
            children.push(self.order_by_clause()?);
        }
        if self.at_keyword(Keyword::Offset) || self.at_keyword(Keyword::Limit) {
            children.push(self.limit_offset_clause()?);
        }
        Ok(Node::with_children(NodeKind::EjbQl, position, children))
    }

    fn select_clause(&mut self) -> QlResult<Node> {
        let position = self.expect_keyword(Keyword::Select)?.position;
        let distinct = self.eat_keyword(Keyword::Distinct);

        let expression = if self.at_keyword(Keyword::Object) {
            self.advance();
            self.expect(&TokenKind::LParen, "'('")?;
            let ident = self.identifier()?;
            self.expect(&TokenKind::RParen, "')'")?;
            identifier_node(ident)
        } else if let Some(function) = self.aggregate_function() {
            self.aggregate(function)?
        } else {
            let path = self.path()?;
            match path.path() {
                Some(data) if data.segments() == 1 => Node::new(
                    NodeKind::Identifier {
                        name: data.path.clone(),
                    },
                    path.position,
                ),
                _ => path,
            }
        };
        Ok(Node::with_children(
            NodeKind::Select { distinct },
            position,
            vec![expression],
        ))
    }

    fn aggregate_function(&self) -> Option<AggregateFunction> {
        let function = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Avg) => AggregateFunction::Avg,
            TokenKind::Keyword(Keyword::Max) => AggregateFunction::Max,
            TokenKind::Keyword(Keyword::Min) => AggregateFunction::Min,
            TokenKind::Keyword(Keyword::Sum) => AggregateFunction::Sum,
            TokenKind::Keyword(Keyword::Count) => AggregateFunction::Count,
            _ => return None,
        };
        (self.peek_nth(1) == &TokenKind::LParen).then_some(function)
    }

    fn aggregate(&mut self, function: AggregateFunction) -> QlResult<Node> {
        let position = self.advance().position;
        self.expect(&TokenKind::LParen, "'('")?;
        let distinct = self.eat_keyword(Keyword::Distinct);
        let argument = self.path()?;
        if function != AggregateFunction::Count && argument.path().is_some_and(|p| p.segments() == 1)
        {
            return Err(QlError::parse(
                argument.position,
                format!("{} requires a persistent field path", function.as_str()),
            ));
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Node::with_children(
            NodeKind::Aggregate { function, distinct },
            position,
            vec![argument],
        ))
    }

    fn from_clause(&mut self) -> QlResult<Node> {
        let position = self.expect_keyword(Keyword::From)?.position;
        let mut declarations = vec![self.declaration()?];
        while self.eat(&TokenKind::Comma) {
            declarations.push(self.declaration()?);
        }
        Ok(Node::with_children(NodeKind::From, position, declarations))
    }

    fn declaration(&mut self) -> QlResult<Node> {
        let position = self.position();
        if self.at_keyword(Keyword::In) && self.peek_nth(1) == &TokenKind::LParen {
            self.advance();
            self.advance();
            let path = self.path()?;
            if path.path().is_some_and(|p| p.segments() < 2) {
                return Err(QlError::parse(
                    path.position,
                    "collection member declaration requires a relationship path",
                ));
            }
            self.expect(&TokenKind::RParen, "')'")?;
            self.eat_keyword(Keyword::As);
            let ident = self.identifier()?;
            return Ok(Node::with_children(
                NodeKind::CollectionMemberDeclaration,
                position,
                vec![path, identifier_node(ident)],
            ));
        }

        // Schema names may collide with reserved words (`Order`)
        let schema = match self.peek_kind() {
            TokenKind::Ident | TokenKind::Keyword(_) => self.advance(),
            _ => return Err(self.unexpected("abstract schema name")),
        };
        self.eat_keyword(Keyword::As);
        let ident = self.identifier()?;
        Ok(Node::with_children(
            NodeKind::RangeVariableDeclaration,
            position,
            vec![
                Node::new(
                    NodeKind::AbstractSchema { name: schema.text },
                    schema.position,
                ),
                identifier_node(ident),
            ],
        ))
    }

    fn where_clause(&mut self) -> QlResult<Node> {
        let position = self.expect_keyword(Keyword::Where)?.position;
        let condition = self.conditional_expression()?;
        Ok(Node::with_children(NodeKind::Where, position, vec![condition]))
    }

    fn order_by_clause(&mut self) -> QlResult<Node> {
        let position = self.expect_keyword(Keyword::Order)?.position;
        self.expect_keyword(Keyword::By)?;
        let mut items = vec![self.order_by_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.order_by_item()?);
        }
        Ok(Node::with_children(NodeKind::OrderBy, position, items))
    }

    fn order_by_item(&mut self) -> QlResult<Node> {
        let path = self.path()?;
        let position = path.position;
        let ascending = if self.eat_keyword(Keyword::Desc) {
            false
        } else {
            self.eat_keyword(Keyword::Asc);
            true
        };
        Ok(Node::with_children(
            NodeKind::OrderByPath { ascending },
            position,
            vec![path],
        ))
    }

    fn limit_offset_clause(&mut self) -> QlResult<Node> {
        let position = self.position();
        let mut children = Vec::new();
        let has_offset = self.eat_keyword(Keyword::Offset);
        if has_offset {
            children.push(self.limit_value()?);
        }
        let has_limit = self.eat_keyword(Keyword::Limit);
        if has_limit {
            children.push(self.limit_value()?);
        }
        Ok(Node::with_children(
            NodeKind::LimitOffset {
                has_offset,
                has_limit,
            },
            position,
            children,
        ))
    }

    fn limit_value(&mut self) -> QlResult<Node> {
        match self.peek_kind() {
            TokenKind::Parameter(_) | TokenKind::ExactNumeric => self.primary(),
            _ => Err(self.unexpected("input parameter or integer literal")),
        }
    }

    // === Conditions ===

    fn conditional_expression(&mut self) -> QlResult<Node> {
        self.nested(|p| {
            let position = p.position();
            let mut terms = vec![p.conditional_term()?];
            while p.eat_keyword(Keyword::Or) {
                terms.push(p.conditional_term()?);
            }
            Ok(collapse(NodeKind::Or, position, terms))
        })
    }

    fn conditional_term(&mut self) -> QlResult<Node> {
        let position = self.position();
        let mut factors = vec![self.conditional_factor()?];
        while self.eat_keyword(Keyword::And) {
            factors.push(self.conditional_factor()?);
        }
        Ok(collapse(NodeKind::And, position, factors))
    }

    fn conditional_factor(&mut self) -> QlResult<Node> {
        let position = self.position();
        if self.eat_keyword(Keyword::Not) {
            let operand = self.conditional_primary()?;
            return Ok(Node::with_children(NodeKind::Not, position, vec![operand]));
        }
        self.conditional_primary()
    }

    fn conditional_primary(&mut self) -> QlResult<Node> {
        if self.at(&TokenKind::LParen) {
            // `(` opens either a nested condition or an arithmetic operand
            let checkpoint = self.index;
            let position = self.position();
            self.advance();
            match self.conditional_expression() {
                Ok(inner) if self.eat(&TokenKind::RParen) && !self.continues_operand() => {
                    return Ok(Node::with_children(
                        NodeKind::ConditionalParenthetical,
                        position,
                        vec![inner],
                    ));
                }
                // Retrying as an operand cannot get any shallower
                Err(err) if self.too_deep => return Err(err),
                _ => {}
            }
            self.index = checkpoint;
        }
        self.simple_condition()
    }

    /// True when the next token extends an operand into a larger expression
    fn continues_operand(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Eq
            | TokenKind::Ne
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash => true,
            TokenKind::Keyword(
                Keyword::Between | Keyword::Like | Keyword::In | Keyword::Is | Keyword::Member,
            ) => true,
            TokenKind::Keyword(Keyword::Not) => matches!(
                self.peek_nth(1),
                TokenKind::Keyword(Keyword::Between | Keyword::Like | Keyword::In | Keyword::Member)
            ),
            _ => false,
        }
    }

    fn simple_condition(&mut self) -> QlResult<Node> {
        let position = self.position();
        let lhs = self.arithmetic_expression()?;

        if let Some(opp) = self.comparison_operator() {
            self.advance();
            let rhs = self.arithmetic_expression()?;
            return Ok(Node::with_children(
                NodeKind::Comparison {
                    kind: ComparisonKind::Unresolved,
                    opp,
                },
                position,
                vec![lhs, rhs],
            ));
        }

        if self.eat_keyword(Keyword::Is) {
            let not = self.eat_keyword(Keyword::Not);
            if self.eat_keyword(Keyword::Null) {
                return Ok(Node::with_children(
                    NodeKind::NullComparison { not },
                    position,
                    vec![lhs],
                ));
            }
            if self.eat_keyword(Keyword::Empty) {
                return Ok(Node::with_children(
                    NodeKind::IsEmpty { not },
                    position,
                    vec![lhs],
                ));
            }
            return Err(self.unexpected("NULL or EMPTY"));
        }

        let not = self.eat_keyword(Keyword::Not);
        if self.eat_keyword(Keyword::Between) {
            let low = self.arithmetic_expression()?;
            self.expect_keyword(Keyword::And)?;
            let high = self.arithmetic_expression()?;
            return Ok(Node::with_children(
                NodeKind::Between { not },
                position,
                vec![lhs, low, high],
            ));
        }
        if self.eat_keyword(Keyword::In) {
            self.expect(&TokenKind::LParen, "'('")?;
            let mut children = vec![lhs, self.arithmetic_expression()?];
            while self.eat(&TokenKind::Comma) {
                children.push(self.arithmetic_expression()?);
            }
            self.expect(&TokenKind::RParen, "')'")?;
            return Ok(Node::with_children(NodeKind::In { not }, position, children));
        }
        if self.eat_keyword(Keyword::Like) {
            let mut children = vec![lhs, self.pattern_value("LIKE pattern")?];
            if self.eat_keyword(Keyword::Escape) {
                children.push(self.pattern_value("escape character")?);
            }
            return Ok(Node::with_children(NodeKind::Like { not }, position, children));
        }
        if self.eat_keyword(Keyword::Member) {
            self.eat_keyword(Keyword::Of);
            let collection = self.path()?;
            return Ok(Node::with_children(
                NodeKind::MemberOf { not },
                position,
                vec![lhs, collection],
            ));
        }

        Err(self.unexpected("comparison, BETWEEN, IN, LIKE, IS or MEMBER OF"))
    }

    fn comparison_operator(&self) -> Option<ComparisonOp> {
        Some(match self.peek_kind() {
            TokenKind::Eq => ComparisonOp::Eq,
            TokenKind::Ne => ComparisonOp::Ne,
            TokenKind::Lt => ComparisonOp::Lt,
            TokenKind::Le => ComparisonOp::Le,
            TokenKind::Gt => ComparisonOp::Gt,
            TokenKind::Ge => ComparisonOp::Ge,
            _ => return None,
        })
    }

    fn pattern_value(&mut self, what: &str) -> QlResult<Node> {
        match self.peek_kind() {
            TokenKind::String(_) | TokenKind::Parameter(_) => self.primary(),
            _ => Err(self.unexpected(&format!("string literal or input parameter as {what}"))),
        }
    }

    // === Expressions ===

    fn arithmetic_expression(&mut self) -> QlResult<Node> {
        self.nested(|p| {
            let position = p.position();
            let mut operands = vec![p.arithmetic_term()?];
            let mut ops: SmallVec<[ArithmeticOp; 4]> = SmallVec::new();
            loop {
                let op = match p.peek_kind() {
                    TokenKind::Plus => ArithmeticOp::Plus,
                    TokenKind::Minus => ArithmeticOp::Minus,
                    _ => break,
                };
                p.advance();
                ops.push(op);
                operands.push(p.arithmetic_term()?);
            }
            Ok(if ops.is_empty() {
                operands.remove(0)
            } else {
                Node::with_children(NodeKind::PlusMinus { ops }, position, operands)
            })
        })
    }

    fn arithmetic_term(&mut self) -> QlResult<Node> {
        let position = self.position();
        let mut operands = vec![self.arithmetic_factor()?];
        let mut ops: SmallVec<[ArithmeticOp; 4]> = SmallVec::new();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => ArithmeticOp::Times,
                TokenKind::Slash => ArithmeticOp::Divide,
                _ => break,
            };
            self.advance();
            ops.push(op);
            operands.push(self.arithmetic_factor()?);
        }
        Ok(if ops.is_empty() {
            operands.remove(0)
        } else {
            Node::with_children(NodeKind::MultDiv { ops }, position, operands)
        })
    }

    fn arithmetic_factor(&mut self) -> QlResult<Node> {
        let position = self.position();
        if self.eat(&TokenKind::Plus) {
            return self.nested(Self::arithmetic_factor);
        }
        if self.eat(&TokenKind::Minus) {
            // Fold the sign into an integer literal so i64::MIN is reachable
            if self.at(&TokenKind::ExactNumeric) {
                let token = self.advance();
                let literal = format!("-{}", token.text);
                let value = decode_exact(&literal)?;
                return Ok(Node::new(
                    NodeKind::ExactNumericLiteral { literal, value },
                    position,
                ));
            }
            let operand = self.nested(Self::arithmetic_factor)?;
            return Ok(Node::with_children(NodeKind::Negation, position, vec![operand]));
        }
        self.primary()
    }

    fn primary(&mut self) -> QlResult<Node> {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.arithmetic_expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Node::with_children(
                    NodeKind::ArithmeticParenthetical,
                    position,
                    vec![inner],
                ))
            }
            TokenKind::Ident => self.path(),
            TokenKind::Parameter(number) => {
                self.advance();
                Ok(Node::new(NodeKind::Parameter { number }, position))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Node::new(NodeKind::StringLiteral { value }, position))
            }
            TokenKind::ExactNumeric => {
                let literal = self.advance().text;
                let value = decode_exact(&literal)?;
                Ok(Node::new(
                    NodeKind::ExactNumericLiteral { literal, value },
                    position,
                ))
            }
            TokenKind::ApproximateNumeric => {
                let literal = self.advance().text;
                let value = decode_approximate(&literal)?;
                Ok(Node::new(
                    NodeKind::ApproximateNumericLiteral { literal, value },
                    position,
                ))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Node::new(NodeKind::BooleanLiteral { value: true }, position))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Node::new(NodeKind::BooleanLiteral { value: false }, position))
            }
            TokenKind::Keyword(keyword) => self.function(keyword),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn function(&mut self, keyword: Keyword) -> QlResult<Node> {
        let (kind, min_args, max_args) = match keyword {
            Keyword::Concat => (NodeKind::Concat, 2, 2),
            Keyword::Substring => (NodeKind::Substring, 3, 3),
            Keyword::Length => (NodeKind::Length, 1, 1),
            Keyword::Locate => (NodeKind::Locate, 2, 3),
            Keyword::Abs => (NodeKind::Abs, 1, 1),
            Keyword::Sqrt => (NodeKind::Sqrt, 1, 1),
            Keyword::Mod => (NodeKind::Mod, 2, 2),
            Keyword::Ucase => (NodeKind::UCase, 1, 1),
            Keyword::Lcase => (NodeKind::LCase, 1, 1),
            _ => return Err(self.unexpected("expression")),
        };
        let name = self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let mut arguments = vec![self.arithmetic_expression()?];
        while self.eat(&TokenKind::Comma) {
            arguments.push(self.arithmetic_expression()?);
        }
        self.expect(&TokenKind::RParen, "')'")?;
        if arguments.len() < min_args || arguments.len() > max_args {
            return Err(QlError::parse(
                name.position,
                format!(
                    "{} takes {} argument(s), found {}",
                    name.text.to_uppercase(),
                    if min_args == max_args {
                        min_args.to_string()
                    } else {
                        format!("{min_args} to {max_args}")
                    },
                    arguments.len()
                ),
            ));
        }
        Ok(Node::with_children(kind, name.position, arguments))
    }

    /// `ident ('.' name)*`. Reserved words are accepted after a dot.
    fn path(&mut self) -> QlResult<Node> {
        let first = self.identifier()?;
        let mut text = first.text;
        while self.at(&TokenKind::Dot) {
            self.advance();
            match self.peek_kind() {
                TokenKind::Ident | TokenKind::Keyword(_) => {
                    text.push('.');
                    text.push_str(&self.advance().text);
                }
                _ => return Err(self.unexpected("field name")),
            }
        }
        Ok(Node::new(NodeKind::Path(PathData::new(text)), first.position))
    }
}

fn identifier_node(token: Token) -> Node {
    Node::new(NodeKind::Identifier { name: token.text }, token.position)
}

fn collapse(kind: NodeKind, position: usize, mut operands: Vec<Node>) -> Node {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        Node::with_children(kind, position, operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_condition(query: &str) -> Node {
        let root = parse(query).unwrap();
        root.find_child(|k| matches!(k, NodeKind::Where))
            .and_then(|w| w.child(0))
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_basic_query_shape() {
        let root = parse("SELECT OBJECT(o) FROM Order AS o WHERE o.amount > 100").unwrap();
        assert_eq!(root.kind(), &NodeKind::EjbQl);
        assert_eq!(root.children.len(), 3);

        let select = &root.children[0];
        assert_eq!(select.kind(), &NodeKind::Select { distinct: false });
        assert_eq!(select.children[0].name(), Some("o"));

        let declaration = &root.children[1].children[0];
        assert_eq!(declaration.kind(), &NodeKind::RangeVariableDeclaration);
        assert_eq!(declaration.children[0].name(), Some("Order"));

        let comparison = &root.children[2].children[0];
        assert!(matches!(
            comparison.kind(),
            NodeKind::Comparison { opp: ComparisonOp::Gt, kind: ComparisonKind::Unresolved }
        ));
        assert_eq!(comparison.children[0].path().unwrap().path, "o.amount");
        assert!(matches!(
            comparison.children[1].kind(),
            NodeKind::ExactNumericLiteral { value: 100, .. }
        ));
    }

    #[test]
    fn test_precedence() {
        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.a = 1 OR o.b = 2 AND NOT o.c = 3");
        assert_eq!(cond.kind(), &NodeKind::Or);
        assert_eq!(cond.children[1].kind(), &NodeKind::And);
        assert_eq!(cond.children[1].children[1].kind(), &NodeKind::Not);

        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.a + o.b * 2 > 3");
        let lhs = &cond.children[0];
        assert!(matches!(lhs.kind(), NodeKind::PlusMinus { ops } if ops.as_slice() == [ArithmeticOp::Plus]));
        assert!(matches!(lhs.children[1].kind(), NodeKind::MultDiv { .. }));
    }

    #[test]
    fn test_parenthesis_disambiguation() {
        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE (o.a + 1) * 2 > 3");
        assert!(matches!(cond.kind(), NodeKind::Comparison { .. }));
        assert!(matches!(cond.children[0].kind(), NodeKind::MultDiv { .. }));

        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE (o.a > 1 OR o.b < 2) AND o.c = 3");
        assert_eq!(cond.kind(), &NodeKind::And);
        assert_eq!(cond.children[0].kind(), &NodeKind::ConditionalParenthetical);
    }

    #[test]
    fn test_negatable_predicates() {
        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.a NOT BETWEEN 1 AND 5");
        assert_eq!(cond.kind(), &NodeKind::Between { not: true });
        assert_eq!(cond.children.len(), 3);

        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.s NOT IN ('a', 'b')");
        assert_eq!(cond.kind(), &NodeKind::In { not: true });

        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.s LIKE 'x%' ESCAPE '\\'");
        assert_eq!(cond.kind(), &NodeKind::Like { not: false });
        assert_eq!(cond.children.len(), 3);

        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.c IS NOT NULL");
        assert_eq!(cond.kind(), &NodeKind::NullComparison { not: true });

        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.lines IS EMPTY");
        assert_eq!(cond.kind(), &NodeKind::IsEmpty { not: false });

        let cond = where_condition("SELECT OBJECT(o) FROM Order o, LineItem l WHERE l NOT MEMBER OF o.lines");
        assert_eq!(cond.kind(), &NodeKind::MemberOf { not: true });
        assert_eq!(cond.children[0].path().unwrap().path, "l");
    }

    #[test]
    fn test_keywords_after_dot_and_as_schema() {
        let root = parse("SELECT o.order FROM Order o WHERE o.select.from = 1").unwrap();
        assert_eq!(root.children[0].children[0].path().unwrap().path, "o.order");
    }

    #[test]
    fn test_collection_member_and_extensions() {
        let root = parse(
            "SELECT DISTINCT OBJECT(l) FROM Order o, IN(o.lineItems) AS l \
             ORDER BY l.price DESC, l.sku OFFSET ?1 LIMIT 10",
        )
        .unwrap();
        assert_eq!(root.children[0].kind(), &NodeKind::Select { distinct: true });
        assert_eq!(
            root.children[1].children[1].kind(),
            &NodeKind::CollectionMemberDeclaration
        );
        let order_by = &root.children[2];
        assert_eq!(order_by.children[0].kind(), &NodeKind::OrderByPath { ascending: false });
        assert_eq!(order_by.children[1].kind(), &NodeKind::OrderByPath { ascending: true });
        let limit = &root.children[3];
        assert_eq!(
            limit.kind(),
            &NodeKind::LimitOffset { has_offset: true, has_limit: true }
        );
        assert_eq!(limit.children[0].kind(), &NodeKind::Parameter { number: 1 });
    }

    #[test]
    fn test_aggregates_and_functions() {
        let root = parse("SELECT COUNT(DISTINCT o) FROM Order o").unwrap();
        assert!(matches!(
            root.children[0].children[0].kind(),
            NodeKind::Aggregate { function: AggregateFunction::Count, distinct: true }
        ));
        assert!(parse("SELECT SUM(o) FROM Order o").is_err());

        let cond = where_condition(
            "SELECT OBJECT(o) FROM Order o WHERE LOCATE('x', UCASE(o.name)) > 0 AND LENGTH(o.name) < 5",
        );
        assert_eq!(cond.children[0].children[0].kind(), &NodeKind::Locate);
        assert!(parse("SELECT OBJECT(o) FROM Order o WHERE LENGTH(o.a, o.b) > 1").is_err());
    }

    #[test]
    fn test_negative_literal_folding() {
        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.a > -9223372036854775808");
        assert!(matches!(
            cond.children[1].kind(),
            NodeKind::ExactNumericLiteral { value: i64::MIN, .. }
        ));
        let cond = where_condition("SELECT OBJECT(o) FROM Order o WHERE o.a > -o.b");
        assert_eq!(cond.children[1].kind(), &NodeKind::Negation);
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let nested = |depth: usize| {
            format!(
                "SELECT OBJECT(o) FROM Order o WHERE {}o.a = 1{}",
                "(".repeat(depth),
                ")".repeat(depth)
            )
        };
        assert!(parse(&nested(20)).is_ok());

        let err = parse(&nested(20_000)).unwrap_err();
        assert!(matches!(err, QlError::Parse { ref message, .. } if message.contains("nesting")));

        let err = parse_with_max_depth(&nested(5), 3).unwrap_err();
        assert!(matches!(err, QlError::Parse { .. }));
        assert!(parse_with_max_depth(&nested(5), 16).is_ok());

        let signs = format!("SELECT OBJECT(o) FROM Order o WHERE o.a = {}1", "- ".repeat(50_000));
        assert!(matches!(parse(&signs), Err(QlError::Parse { .. })));
    }

    #[test]
    fn test_errors_carry_position() {
        let err = parse("SELECT OBJECT(o) FROM Order o WHERE").unwrap_err();
        assert_eq!(err.position(), Some(35));
        let err = parse("SELECT OBJECT(o) FROM Order o extra").unwrap_err();
        assert!(matches!(err, QlError::Parse { position: 30, .. }));
        assert!(parse("SELECT OBJECT(o) FROM Order o WHERE o.a").is_err());
    }
}
