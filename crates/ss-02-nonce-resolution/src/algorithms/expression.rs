//! Nonce formulas.
//!
//! A deliberately small arithmetic language:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | BINDING | '(' expr ')'
//! BINDING := a | auto | n | nonce | pn | pendingNonce
//! ```
//!
//! Evaluation is checked signed 128-bit arithmetic. The final value must fit
//! a `u64`.

use std::fmt;

use crate::config::NonceConfig;
use crate::domain::errors::ExpressionError;

/// The read-only values a formula may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Auto,
    Nonce,
    PendingNonce,
}

impl Binding {
    fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "a" | "auto" => Some(Binding::Auto),
            "n" | "nonce" => Some(Binding::Nonce),
            "pn" | "pendingNonce" => Some(Binding::PendingNonce),
            _ => None,
        }
    }
}

/// Values for the bindings at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub auto: u64,
    pub nonce: u64,
    pub pending_nonce: u64,
}

impl Bindings {
    fn get(&self, binding: Binding) -> i128 {
        i128::from(match binding {
            Binding::Auto => self.auto,
            Binding::Nonce => self.nonce,
            Binding::PendingNonce => self.pending_nonce,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i128),
    Binding(Binding),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse a formula.
    pub fn parse(source: &str, config: &NonceConfig) -> Result<Self, ExpressionError> {
        if source.len() > config.max_expression_length {
            return Err(ExpressionError::TooLong {
                len: source.len(),
                max: config.max_expression_length,
            });
        }
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            max_depth: config.max_expression_depth,
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(t) => Err(ExpressionError::UnexpectedToken {
                offset: t.offset,
                found: t.kind.to_string(),
            }),
        }
    }

    /// Whether the formula reads the `auto` cursor.
    pub fn references_auto(&self) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Binding(b) => *b == Binding::Auto,
            Expr::Neg(inner) => inner.references_auto(),
            Expr::Binary(_, lhs, rhs) => lhs.references_auto() || rhs.references_auto(),
        }
    }

    fn eval(&self, bindings: &Bindings) -> Result<i128, ExpressionError> {
        match self {
            Expr::Literal(v) => Ok(*v),
            Expr::Binding(b) => Ok(bindings.get(*b)),
            Expr::Neg(inner) => inner
                .eval(bindings)?
                .checked_neg()
                .ok_or(ExpressionError::Overflow),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(bindings)?;
                let r = rhs.eval(bindings)?;
                let value = match op {
                    BinaryOp::Add => l.checked_add(r),
                    BinaryOp::Sub => l.checked_sub(r),
                    BinaryOp::Mul => l.checked_mul(r),
                    BinaryOp::Div | BinaryOp::Rem if r == 0 => {
                        return Err(ExpressionError::DivisionByZero)
                    }
                    BinaryOp::Div => l.checked_div(r),
                    BinaryOp::Rem => l.checked_rem(r),
                };
                value.ok_or(ExpressionError::Overflow)
            }
        }
    }

    /// Evaluate to a nonce.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<u64, ExpressionError> {
        let value = self.eval(bindings)?;
        if value < 0 {
            return Err(ExpressionError::Negative(value));
        }
        u64::try_from(value).map_err(|_| ExpressionError::Overflow)
    }
}

// =============================================================================
// LEXER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Number(i128),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Ident(s) => f.write_str(s),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' => {
                let mut value: i128 = 0;
                while let Some(&(_, d)) = chars.peek() {
                    let Some(digit) = d.to_digit(10) else { break };
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(i128::from(digit)))
                        .ok_or(ExpressionError::Overflow)?;
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !(d.is_ascii_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(ident),
                    offset,
                });
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            other => {
                return Err(ExpressionError::UnexpectedChar {
                    offset,
                    found: other,
                })
            }
        };
        chars.next();
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExpressionError::TooDeep {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Minus)) {
            self.next();
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.next().ok_or(ExpressionError::UnexpectedEnd)?;
        match &token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(*n)),
            TokenKind::Ident(name) => Binding::from_ident(name)
                .map(Expr::Binding)
                .ok_or_else(|| ExpressionError::UnknownBinding(name.clone())),
            TokenKind::LParen => {
                self.descend()?;
                let inner = self.expr()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => {
                        self.depth -= 1;
                        Ok(inner)
                    }
                    Some(t) => Err(ExpressionError::UnexpectedToken {
                        offset: t.offset,
                        found: t.kind.to_string(),
                    }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            other => Err(ExpressionError::UnexpectedToken {
                offset: token.offset,
                found: other.to_string(),
            }),
        }
    }
}
