//! EJB-QL tokenizer

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

use super::error::{QlError, QlResult};

/// Reserved words. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Keyword {
    Select,
    Distinct,
    Object,
    From,
    As,
    In,
    Where,
    And,
    Or,
    Not,
    Between,
    Like,
    Escape,
    Is,
    Null,
    Empty,
    Member,
    Of,
    True,
    False,
    Concat,
    Substring,
    Length,
    Locate,
    Abs,
    Sqrt,
    Mod,
    Ucase,
    Lcase,
    Avg,
    Max,
    Min,
    Sum,
    Count,
    Order,
    By,
    Asc,
    Desc,
    Offset,
    Limit,
}

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    use Keyword::*;
    [
        ("SELECT", Select),
        ("DISTINCT", Distinct),
        ("OBJECT", Object),
        ("FROM", From),
        ("AS", As),
        ("IN", In),
        ("WHERE", Where),
        ("AND", And),
        ("OR", Or),
        ("NOT", Not),
        ("BETWEEN", Between),
        ("LIKE", Like),
        ("ESCAPE", Escape),
        ("IS", Is),
        ("NULL", Null),
        ("EMPTY", Empty),
        ("MEMBER", Member),
        ("OF", Of),
        ("TRUE", True),
        ("FALSE", False),
        ("CONCAT", Concat),
        ("SUBSTRING", Substring),
        ("LENGTH", Length),
        ("LOCATE", Locate),
        ("ABS", Abs),
        ("SQRT", Sqrt),
        ("MOD", Mod),
        ("UCASE", Ucase),
        ("LCASE", Lcase),
        ("AVG", Avg),
        ("MAX", Max),
        ("MIN", Min),
        ("SUM", Sum),
        ("COUNT", Count),
        ("ORDER", Order),
        ("BY", By),
        ("ASC", Asc),
        ("DESC", Desc),
        ("OFFSET", Offset),
        ("LIMIT", Limit),
    ]
    .into_iter()
    .collect()
});

impl Keyword {
    /// Look a word up, ignoring case
    #[must_use]
    pub fn lookup(word: &str) -> Option<Self> {
        KEYWORDS.get(word.to_ascii_uppercase().as_str()).copied()
    }
}

/// Token category
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier
    Ident,
    /// Reserved word
    Keyword(Keyword),
    /// `?n`
    Parameter(u32),
    /// Quoted string, unescaped
    String(String),
    /// Integer literal (text in [`Token::text`])
    ExactNumeric,
    /// Floating point literal (text in [`Token::text`])
    ApproximateNumeric,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
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
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// End of input
    Eof,
}

/// A token with its source text and byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Category
    pub kind: TokenKind,
    /// Source text
    pub text: String,
    /// Byte offset of the first character
    pub position: usize,
}

impl Token {
    /// True for the given keyword
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of query"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

/// Split `input` into tokens, ending with [`TokenKind::Eof`]
pub fn tokenize(input: &str) -> QlResult<Vec<Token>> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: self.input[start..self.pos].to_string(),
            position: start,
        });
    }

    fn error(&self, position: usize, message: impl Into<String>) -> QlError {
        QlError::Lex {
            position,
            message: message.into(),
        }
    }

    fn run(mut self) -> QlResult<Vec<Token>> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if is_ident_start(c) {
                self.lex_word(start);
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.lex_number(start)?;
            } else if c == '\'' {
                self.lex_string(start)?;
            } else if c == '?' {
                self.lex_parameter(start)?;
            } else {
                self.lex_symbol(c, start)?;
            }
        }
        let end = self.pos;
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            position: end,
        });
        Ok(self.tokens)
    }

    fn lex_word(&mut self, start: usize) {
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        let kind = match Keyword::lookup(&self.input[start..self.pos]) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident,
        };
        self.push(kind, start);
    }

    fn lex_number(&mut self, start: usize) -> QlResult<()> {
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.bump();
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            if self.pos - start == 2 {
                return Err(self.error(start, "hexadecimal literal without digits"));
            }
            if matches!(self.peek(), Some('l' | 'L')) {
                self.bump();
            }
            self.push(TokenKind::ExactNumeric, start);
            return Ok(());
        }

        let mut approximate = false;
        self.eat_digits();
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || !is_ident_start(c)) {
            approximate = true;
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_digit = match self.peek_at(1) {
                Some('+' | '-') => self.peek_at(2),
                other => other,
            };
            if exponent_digit.is_some_and(|c| c.is_ascii_digit()) {
                approximate = true;
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                self.eat_digits();
            }
        }
        match self.peek() {
            Some('d' | 'D' | 'f' | 'F') => {
                self.bump();
                approximate = true;
            }
            Some('l' | 'L') if !approximate => {
                self.bump();
            }
            _ => {}
        }
        if self.peek().is_some_and(is_ident_part) {
            return Err(self.error(self.pos, "malformed numeric literal"));
        }

        let kind = if approximate {
            TokenKind::ApproximateNumeric
        } else {
            TokenKind::ExactNumeric
        };
        self.push(kind, start);
        Ok(())
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn lex_string(&mut self, start: usize) -> QlResult<()> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.bump();
                    value.push('\'');
                }
                Some('\'') => break,
                Some(c) => value.push(c),
                None => return Err(self.error(start, "unterminated string literal")),
            }
        }
        self.push(TokenKind::String(value), start);
        Ok(())
    }

    fn lex_parameter(&mut self, start: usize) -> QlResult<()> {
        self.bump();
        self.eat_digits();
        let digits = &self.input[start + 1..self.pos];
        let number = digits
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| self.error(start, "input parameter must be ?<positive number>"))?;
        self.push(TokenKind::Parameter(number), start);
        Ok(())
    }

    fn lex_symbol(&mut self, c: char, start: usize) -> QlResult<()> {
        self.bump();
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Eq,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => match self.peek() {
                Some('>') => {
                    self.bump();
                    TokenKind::Ne
                }
                Some('=') => {
                    self.bump();
                    TokenKind::Le
                }
                _ => TokenKind::Lt,
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            other => return Err(self.error(start, format!("unexpected character '{other}'"))),
        };
        self.push(kind, start);
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let tokens = tokenize("select Distinct oBjEcT").unwrap();
        assert!(tokens[0].is_keyword(Keyword::Select));
        assert!(tokens[1].is_keyword(Keyword::Distinct));
        assert!(tokens[2].is_keyword(Keyword::Object));
        assert_eq!(tokens[2].text, "oBjEcT");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("100 1.5 .5 2e10 7L 0x1fL 3d"),
            vec![
                TokenKind::ExactNumeric,
                TokenKind::ApproximateNumeric,
                TokenKind::ApproximateNumeric,
                TokenKind::ApproximateNumeric,
                TokenKind::ExactNumeric,
                TokenKind::ExactNumeric,
                TokenKind::ApproximateNumeric,
                TokenKind::Eof,
            ]
        );
        assert!(tokenize("12abc").is_err());
    }

    #[test]
    fn test_path_dots_are_not_numbers() {
        assert_eq!(
            kinds("o.amount"),
            vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_strings_and_parameters() {
        let tokens = tokenize("'it''s' ?12").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("it's".to_string()));
        assert_eq!(tokens[1].kind, TokenKind::Parameter(12));
        assert!(tokenize("'open").is_err());
        assert!(tokenize("?0").is_err());
        assert!(tokenize("?x").is_err());
    }

    #[test]
    fn test_operators_and_positions() {
        let tokens = tokenize("a <> b <= c >= d").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Ne);
        assert_eq!(tokens[3].kind, TokenKind::Le);
        assert_eq!(tokens[5].kind, TokenKind::Ge);
        assert_eq!(tokens[2].position, 5);
        assert!(matches!(tokenize("a # b"), Err(QlError::Lex { position: 2, .. })));
    }
}
