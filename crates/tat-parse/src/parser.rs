use std::fmt::{self, Display};

use crate::ast::{BinOpKind, CompareKind, Expr};
use crate::tokenizer::{Token, TokenKind, Tokenizer, TokenizerError};
use tat_common::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub message: String,
    pub pos: Option<usize>,
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "parser error at {pos}: {}", self.message),
            None => write!(f, "parser error: {}", self.message),
        }
    }
}

impl std::error::Error for ParserError {}

impl From<TokenizerError> for ParserError {
    fn from(e: TokenizerError) -> Self {
        ParserError {
            message: e.message,
            pos: Some(e.pos),
        }
    }
}

/// Parses one expression string into an [`Expr`].
///
/// Precedence, tightest first: primary (literal / name / list / call /
/// parenthesised) → `*` `/` → `+` `-` → comparison. A comparison does
/// not chain: `a == b == c` is a parse error, not a double comparison.
pub fn parse(src: &str) -> Result<Expr, ParserError> {
    let tokens = Tokenizer::new(src).tokenize()?;
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.parse_compare()?;
    if p.pos != p.tokens.len() {
        return Err(ParserError {
            message: format!("unexpected trailing token {:?}", p.tokens[p.pos].kind),
            pos: Some(p.tokens[p.pos].pos),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_pos(&self) -> Option<usize> {
        self.tokens.get(self.pos).map(|t| t.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParserError> {
        match self.advance() {
            Some(t) if &t.kind == kind => Ok(()),
            Some(t) => Err(ParserError {
                message: format!("expected {kind:?}, found {:?}", t.kind),
                pos: Some(t.pos),
            }),
            None => Err(ParserError {
                message: format!("expected {kind:?}, found end of input"),
                pos: None,
            }),
        }
    }

    fn parse_compare(&mut self) -> Result<Expr, ParserError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(TokenKind::Eq) => CompareKind::Eq,
            Some(TokenKind::Ne) => CompareKind::Ne,
            Some(TokenKind::Lt) => CompareKind::Lt,
            Some(TokenKind::Le) => CompareKind::Le,
            Some(TokenKind::Gt) => CompareKind::Gt,
            Some(TokenKind::Ge) => CompareKind::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinOpKind::Add,
                Some(TokenKind::Minus) => BinOpKind::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinOpKind::Mul,
                Some(TokenKind::Slash) => BinOpKind::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_primary()?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        let pos = self.peek_pos();
        match self.advance().map(|t| t.kind) {
            Some(TokenKind::Integer(n)) => Ok(Expr::Literal(Scalar::Number(n as f64))),
            Some(TokenKind::Float(n)) => Ok(Expr::Literal(Scalar::Number(n))),
            Some(TokenKind::String(s)) => Ok(Expr::Literal(Scalar::Text(s))),
            Some(TokenKind::Minus) => {
                // unary minus on a numeric literal, e.g. `-1`
                let inner = self.parse_primary()?;
                Ok(Expr::BinOp {
                    op: BinOpKind::Sub,
                    lhs: Box::new(Expr::Literal(Scalar::Number(0.0))),
                    rhs: Box::new(inner),
                })
            }
            Some(TokenKind::LBracket) => self.parse_list(),
            Some(TokenKind::LParen) => {
                let inner = self.parse_compare()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            Some(TokenKind::Ident(name)) => {
                if self.peek() == Some(&TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(other) => Err(ParserError {
                message: format!("unexpected token {other:?}"),
                pos,
            }),
            None => Err(ParserError {
                message: "unexpected end of input".to_string(),
                pos,
            }),
        }
    }

    fn parse_list(&mut self) -> Result<Expr, ParserError> {
        let mut items = Vec::new();
        if self.peek() != Some(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_compare()?);
                if self.peek() == Some(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::List(items))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParserError> {
        let mut args = Vec::new();
        if self.peek() != Some(&TokenKind::RParen) {
            loop {
                args.push(self.parse_compare()?);
                if self.peek() == Some(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_field_name() {
        assert_eq!(parse("pi_invoice_approval_date").unwrap(), Expr::Name("pi_invoice_approval_date".into()));
    }

    #[test]
    fn parses_conditional_predecessor() {
        let expr = parse("iff(pi_applicable==1,[5],[2])").unwrap();
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "iff");
                assert_eq!(args.len(), 3);
                assert!(matches!(args[0], Expr::Compare { op: CompareKind::Eq, .. }));
                assert_eq!(args[1], Expr::List(vec![Expr::Literal(Scalar::Number(5.0))]));
                assert_eq!(args[2], Expr::List(vec![Expr::Literal(Scalar::Number(2.0))]));
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let expr = parse("po_created_date + 1 * 2").unwrap();
        assert_eq!(
            expr,
            Expr::BinOp {
                op: BinOpKind::Add,
                lhs: Box::new(Expr::Name("po_created_date".into())),
                rhs: Box::new(Expr::BinOp {
                    op: BinOpKind::Mul,
                    lhs: Box::new(Expr::Literal(Scalar::Number(1.0))),
                    rhs: Box::new(Expr::Literal(Scalar::Number(2.0))),
                }),
            }
        );
    }

    #[test]
    fn parses_parenthesised_grouping() {
        let expr = parse("(a + b) * 2").unwrap();
        assert!(matches!(expr, Expr::BinOp { op: BinOpKind::Mul, .. }));
    }

    #[test]
    fn rejects_chained_comparisons() {
        assert!(parse("a == b == c").is_err());
    }

    #[test]
    fn parses_empty_list() {
        assert_eq!(parse("[]").unwrap(), Expr::List(vec![]));
    }
}
