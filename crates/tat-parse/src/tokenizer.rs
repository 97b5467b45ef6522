use std::fmt::{self, Display};

/// A lexical error, tagged with the byte offset it occurred at.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tokenizer error at {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for TokenizerError {}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Float(f64),
    String(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

/// Tokenizes the small expression grammar. Whitespace is insignificant;
/// unrecognised characters are a `TokenizerError`.
pub struct Tokenizer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizerError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<Token, TokenizerError> {
        let start = self.pos;
        let c = self.bytes[self.pos];
        match c {
            b'(' => self.single(TokenKind::LParen, start),
            b')' => self.single(TokenKind::RParen, start),
            b'[' => self.single(TokenKind::LBracket, start),
            b']' => self.single(TokenKind::RBracket, start),
            b',' => self.single(TokenKind::Comma, start),
            b'+' => self.single(TokenKind::Plus, start),
            b'-' => self.single(TokenKind::Minus, start),
            b'*' => self.single(TokenKind::Star, start),
            b'/' => self.single(TokenKind::Slash, start),
            b'=' => self.compare_op(b'=', TokenKind::Eq, start),
            b'!' => self.compare_op(b'=', TokenKind::Ne, start),
            b'<' => self.lt_or_le(start),
            b'>' => self.gt_or_ge(start),
            b'\'' | b'"' => self.string(c, start),
            b'0'..=b'9' => self.number(start),
            c if c == b'_' || c.is_ascii_alphabetic() => self.ident(start),
            other => Err(TokenizerError {
                message: format!("unexpected character '{}'", other as char),
                pos: start,
            }),
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Result<Token, TokenizerError> {
        self.pos += 1;
        Ok(Token { kind, pos: start })
    }

    fn compare_op(
        &mut self,
        expect_next: u8,
        kind: TokenKind,
        start: usize,
    ) -> Result<Token, TokenizerError> {
        self.pos += 1;
        if self.peek() == Some(expect_next) {
            self.pos += 1;
            Ok(Token { kind, pos: start })
        } else {
            Err(TokenizerError {
                message: "expected '=' to complete operator".to_string(),
                pos: start,
            })
        }
    }

    fn lt_or_le(&mut self, start: usize) -> Result<Token, TokenizerError> {
        self.pos += 1;
        if self.peek() == Some(b'=') {
            self.pos += 1;
            Ok(Token {
                kind: TokenKind::Le,
                pos: start,
            })
        } else {
            Ok(Token {
                kind: TokenKind::Lt,
                pos: start,
            })
        }
    }

    fn gt_or_ge(&mut self, start: usize) -> Result<Token, TokenizerError> {
        self.pos += 1;
        if self.peek() == Some(b'=') {
            self.pos += 1;
            Ok(Token {
                kind: TokenKind::Ge,
                pos: start,
            })
        } else {
            Ok(Token {
                kind: TokenKind::Gt,
                pos: start,
            })
        }
    }

    fn string(&mut self, quote: u8, start: usize) -> Result<Token, TokenizerError> {
        self.pos += 1;
        let body_start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != quote {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(TokenizerError {
                message: "unterminated string literal".to_string(),
                pos: start,
            });
        }
        let value = self.src[body_start..self.pos].to_string();
        self.pos += 1;
        Ok(Token {
            kind: TokenKind::String(value),
            pos: start,
        })
    }

    fn number(&mut self, start: usize) -> Result<Token, TokenizerError> {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        let text = &self.src[start..self.pos];
        if is_float {
            let v: f64 = text.parse().map_err(|_| TokenizerError {
                message: format!("invalid number literal '{text}'"),
                pos: start,
            })?;
            Ok(Token {
                kind: TokenKind::Float(v),
                pos: start,
            })
        } else {
            let v: i64 = text.parse().map_err(|_| TokenizerError {
                message: format!("invalid number literal '{text}'"),
                pos: start,
            })?;
            Ok(Token {
                kind: TokenKind::Integer(v),
                pos: start,
            })
        }
    }

    fn ident(&mut self, start: usize) -> Result<Token, TokenizerError> {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c == b'_' || c.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(Token {
            kind: TokenKind::Ident(self.src[start..self.pos].to_string()),
            pos: start,
        })
    }
}
