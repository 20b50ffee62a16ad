/// Recursive-descent parser for the filter pattern language.
///
/// Grammar, lowest precedence first:
///
/// ```text
/// expr    := and ('|' and)*
/// and     := unary ('&' unary)*
/// unary   := '!' unary | primary
/// primary := IDENT | '(' expr ')'
/// ```
///
/// `!` binds tightest, then `&`, then `|`; both binary operators are
/// left-associative.
use std::fmt;

use crate::filter::Filter;
use crate::lexer::{LexError, Lexer, SpannedToken, Token};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParseError {
    pub col: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col {}: {}", self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            col: e.col,
            message: e.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    /// Parse a complete pattern into a [`Filter`] tree.
    ///
    /// The whole input must be consumed; trailing tokens (e.g. `"a b"`)
    /// are an error.
    pub fn parse(input: &str) -> Result<Filter, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self { tokens, pos: 0 };

        if parser.at(&Token::Eof) {
            return Err(ParseError {
                col: 1,
                message: "empty pattern".to_string(),
            });
        }

        let filter = parser.parse_expr()?;

        if !parser.at(&Token::Eof) {
            let (col, tok) = parser.current();
            return Err(ParseError {
                col,
                message: format!("unexpected '{tok}' after expression"),
            });
        }

        Ok(filter)
    }

    // -- Helpers --

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn current(&self) -> (usize, &Token) {
        let t = &self.tokens[self.pos];
        (t.col, &t.token)
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos].token;
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            let (col, tok) = self.current();
            Err(ParseError {
                col,
                message: format!("expected '{expected}', got '{tok}'"),
            })
        }
    }

    // -- Grammar --

    fn parse_expr(&mut self) -> Result<Filter, ParseError> {
        let first = self.parse_and()?;
        if !self.at(&Token::Pipe) {
            return Ok(first);
        }
        let mut terms = vec![first];
        while self.eat(&Token::Pipe) {
            terms.push(self.parse_and()?);
        }
        Ok(Filter::Any(terms))
    }

    fn parse_and(&mut self) -> Result<Filter, ParseError> {
        let first = self.parse_unary()?;
        if !self.at(&Token::Amp) {
            return Ok(first);
        }
        let mut terms = vec![first];
        while self.eat(&Token::Amp) {
            terms.push(self.parse_unary()?);
        }
        Ok(Filter::All(terms))
    }

    fn parse_unary(&mut self) -> Result<Filter, ParseError> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Filter::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Filter, ParseError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(Filter::Component(name))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => {
                let (col, _) = self.current();
                Err(ParseError {
                    col,
                    message: format!("expected component name or '(', got '{other}'"),
                })
            }
        }
    }
}
