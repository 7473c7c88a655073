//! The `#if` controlling-expression evaluator.
//!
//! A recursive-descent parser over an already-expanded token list,
//! building a small expression tree that is then evaluated in 64-bit
//! signed arithmetic with wrapping semantics. Precedence, highest
//! binding last: comma, ternary, logical-or, logical-and, bitwise-or,
//! xor, and, equality, relational, shift, additive, multiplicative,
//! unary, primary.
//!
//! Identifiers surviving macro expansion (and the `defined` rewrite)
//! evaluate to zero. Floating literals and strings have no place in a
//! controlling expression and are errors.

use cpre_lexer::{PpToken, PpTokenKind, Punct};
use cpre_lit::{convert_number, NumLit};
use cpre_source::LocId;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct ExprError {
    pub message: String,
    pub loc: Option<LocId>,
}

fn err<T>(message: impl Into<String>, loc: Option<LocId>) -> Result<T, ExprError> {
    Err(ExprError {
        message: message.into(),
        loc,
    })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum UnOp {
    Plus,
    Minus,
    Not,
    LogicalNot,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Comma,
}

enum Expr {
    Num(i64),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

struct Parser<'a> {
    toks: &'a [PpToken],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a PpToken> {
        self.toks.get(self.pos)
    }

    fn loc(&self) -> Option<LocId> {
        self.current().and_then(|t| t.loc).or_else(|| self.toks.last().and_then(|t| t.loc))
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.current().is_some_and(|t| t.is_punct(punct)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_punct_byte(&mut self, byte: u8) -> bool {
        self.eat_punct(Punct::Char(byte))
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        if self.eat_punct_byte(b'(') {
            let node = self.expr()?;
            if !self.eat_punct_byte(b')') {
                return err("expected ')' in controlling expression", self.loc());
            }
            return Ok(node);
        }
        let Some(tok) = self.current() else {
            return err("controlling expression ended unexpectedly", self.loc());
        };
        match &tok.kind {
            PpTokenKind::Number(text) => {
                let value = match convert_number(text) {
                    Some(NumLit::Int(lit)) => lit.value as i64,
                    Some(NumLit::Float(_)) => {
                        return err("floating constant in controlling expression", tok.loc)
                    }
                    None => return err(format!("invalid number '{text}'"), tok.loc),
                };
                self.pos += 1;
                Ok(Expr::Num(value))
            }
            PpTokenKind::Str { kind, body } if kind.is_char() => {
                let value = cpre_lit::pack_char_constant(*kind, body) as i64;
                self.pos += 1;
                Ok(Expr::Num(value))
            }
            PpTokenKind::Ident(_) => {
                // Not a live macro, or it would have been expanded.
                self.pos += 1;
                Ok(Expr::Num(0))
            }
            _ => err("unexpected token in controlling expression", tok.loc),
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = if self.eat_punct_byte(b'+') {
            UnOp::Plus
        } else if self.eat_punct_byte(b'-') {
            UnOp::Minus
        } else if self.eat_punct_byte(b'!') {
            UnOp::LogicalNot
        } else if self.eat_punct_byte(b'~') {
            UnOp::Not
        } else {
            return self.primary();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn binary_level(
        &mut self,
        ops: &[(Punct, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut node = next(self)?;
        'outer: loop {
            for &(punct, op) in ops {
                if self.eat_punct(punct) {
                    node = Expr::Binary(op, Box::new(node), Box::new(next(self)?));
                    continue 'outer;
                }
            }
            return Ok(node);
        }
    }

    fn mul(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                (Punct::Char(b'*'), BinOp::Mul),
                (Punct::Char(b'/'), BinOp::Div),
                (Punct::Char(b'%'), BinOp::Mod),
            ],
            Self::unary,
        )
    }

    fn add(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                (Punct::Char(b'+'), BinOp::Add),
                (Punct::Char(b'-'), BinOp::Sub),
            ],
            Self::mul,
        )
    }

    fn shift(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[(Punct::Shl, BinOp::Shl), (Punct::Shr, BinOp::Shr)],
            Self::add,
        )
    }

    fn rel(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                (Punct::Le, BinOp::Le),
                (Punct::Ge, BinOp::Ge),
                (Punct::Char(b'<'), BinOp::Lt),
                (Punct::Char(b'>'), BinOp::Gt),
            ],
            Self::shift,
        )
    }

    fn eq(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[(Punct::Eq, BinOp::Eq), (Punct::Ne, BinOp::Ne)],
            Self::rel,
        )
    }

    fn bit_and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[(Punct::Char(b'&'), BinOp::BitAnd)], Self::eq)
    }

    fn bit_xor(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[(Punct::Char(b'^'), BinOp::BitXor)], Self::bit_and)
    }

    fn bit_or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[(Punct::Char(b'|'), BinOp::BitOr)], Self::bit_xor)
    }

    fn logical_and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[(Punct::LogicalAnd, BinOp::LogicalAnd)], Self::bit_or)
    }

    fn logical_or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[(Punct::LogicalOr, BinOp::LogicalOr)], Self::logical_and)
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.logical_or()?;
        if !self.eat_punct_byte(b'?') {
            return Ok(cond);
        }
        let when_true = self.expr()?;
        if !self.eat_punct_byte(b':') {
            return err("expected ':' in conditional", self.loc());
        }
        let when_false = self.ternary()?;
        Ok(Expr::Ternary(
            Box::new(cond),
            Box::new(when_true),
            Box::new(when_false),
        ))
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[(Punct::Char(b','), BinOp::Comma)], Self::ternary)
    }
}

fn eval(node: &Expr, loc: Option<LocId>) -> Result<i64, ExprError> {
    Ok(match node {
        Expr::Num(value) => *value,
        Expr::Unary(op, expr) => {
            let value = eval(expr, loc)?;
            match op {
                UnOp::Plus => value,
                UnOp::Minus => value.wrapping_neg(),
                UnOp::Not => !value,
                UnOp::LogicalNot => i64::from(value == 0),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = eval(lhs, loc)?;
            // Logical operators short-circuit; everything else is strict.
            match op {
                BinOp::LogicalAnd => {
                    return Ok(i64::from(left != 0 && eval(rhs, loc)? != 0));
                }
                BinOp::LogicalOr => {
                    return Ok(i64::from(left != 0 || eval(rhs, loc)? != 0));
                }
                _ => {}
            }
            let right = eval(rhs, loc)?;
            match op {
                BinOp::Add => left.wrapping_add(right),
                BinOp::Sub => left.wrapping_sub(right),
                BinOp::Mul => left.wrapping_mul(right),
                BinOp::Div => {
                    if right == 0 {
                        return err("division by zero in controlling expression", loc);
                    }
                    left.wrapping_div(right)
                }
                BinOp::Mod => {
                    if right == 0 {
                        return err("remainder by zero in controlling expression", loc);
                    }
                    left.wrapping_rem(right)
                }
                // Shift counts reduce modulo the width.
                BinOp::Shl => left.wrapping_shl(right as u32),
                BinOp::Shr => left.wrapping_shr(right as u32),
                BinOp::Lt => i64::from(left < right),
                BinOp::Gt => i64::from(left > right),
                BinOp::Le => i64::from(left <= right),
                BinOp::Ge => i64::from(left >= right),
                BinOp::Eq => i64::from(left == right),
                BinOp::Ne => i64::from(left != right),
                BinOp::BitAnd => left & right,
                BinOp::BitOr => left | right,
                BinOp::BitXor => left ^ right,
                BinOp::Comma => right,
                BinOp::LogicalAnd | BinOp::LogicalOr => unreachable!(),
            }
        }
        Expr::Ternary(cond, when_true, when_false) => {
            if eval(cond, loc)? != 0 {
                eval(when_true, loc)?
            } else {
                eval(when_false, loc)?
            }
        }
    })
}

/// Parse and evaluate a controlling expression. The token list must be
/// fully macro-expanded and must have `defined` operators rewritten to
/// `1`/`0` already.
pub fn eval_controlling_expr(toks: &[PpToken]) -> Result<i64, ExprError> {
    let loc = toks.first().and_then(|t| t.loc);
    if toks.is_empty() {
        return err("empty controlling expression", None);
    }
    let mut parser = Parser { toks, pos: 0 };
    let tree = parser.expr()?;
    if parser.pos != toks.len() {
        return err(
            "trailing tokens in controlling expression",
            parser.loc(),
        );
    }
    eval(&tree, loc)
}
