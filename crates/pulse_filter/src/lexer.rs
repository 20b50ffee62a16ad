/// Lexer for the filter pattern language.
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A component name: a maximal run of `[A-Za-z0-9_]`.
    Ident(String),

    // Operators
    Amp,
    Pipe,
    Bang,
    LParen,
    RParen,

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Bang => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "end of pattern"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    /// 1-based column in the pattern string.
    pub col: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        self.skip_whitespace();

        let col = self.pos + 1;

        let Some(b) = self.peek_byte() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                col,
            });
        };

        let punct = match b {
            b'&' => Some(Token::Amp),
            b'|' => Some(Token::Pipe),
            b'!' => Some(Token::Bang),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            _ => None,
        };

        if let Some(token) = punct {
            self.advance();
            return Ok(SpannedToken { token, col });
        }

        if b.is_ascii_alphanumeric() || b == b'_' {
            let start = self.pos;
            while let Some(c) = self.peek_byte() {
                if c.is_ascii_alphanumeric() || c == b'_' {
                    self.advance();
                } else {
                    break;
                }
            }
            // The run is ASCII by construction.
            let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
            return Ok(SpannedToken {
                token: Token::Ident(word),
                col,
            });
        }

        Err(LexError {
            col,
            message: format!("unexpected character: '{}'", b as char),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub col: usize,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col {}: {}", self.col, self.message)
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let mut lexer = Lexer::new("a&!b");
        let tokens = lexer.tokenize().unwrap();
        assert!(matches!(tokens[0].token, Token::Ident(ref s) if s == "a"));
        assert_eq!(tokens[1].token, Token::Amp);
        assert_eq!(tokens[2].token, Token::Bang);
        assert!(matches!(tokens[3].token, Token::Ident(ref s) if s == "b"));
        assert_eq!(tokens[4].token, Token::Eof);
    }

    #[test]
    fn test_whitespace_skipped() {
        let mut lexer = Lexer::new("  a \t| ( b )\n");
        let tokens = lexer.tokenize().unwrap();
        assert!(matches!(tokens[0].token, Token::Ident(ref s) if s == "a"));
        assert_eq!(tokens[1].token, Token::Pipe);
        assert_eq!(tokens[2].token, Token::LParen);
        assert!(matches!(tokens[3].token, Token::Ident(ref s) if s == "b"));
        assert_eq!(tokens[4].token, Token::RParen);
    }

    #[test]
    fn test_underscore_and_digits() {
        let mut lexer = Lexer::new("player_2&has_hp");
        let tokens = lexer.tokenize().unwrap();
        assert!(matches!(tokens[0].token, Token::Ident(ref s) if s == "player_2"));
        assert!(matches!(tokens[2].token, Token::Ident(ref s) if s == "has_hp"));
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("a & b-c");
        let err = lexer.tokenize().unwrap_err();
        assert_eq!(err.col, 6);
    }

    #[test]
    fn test_column_positions() {
        let mut lexer = Lexer::new(" ab |c");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].col, 2);
        assert_eq!(tokens[1].col, 5);
        assert_eq!(tokens[2].col, 6);
    }
}
