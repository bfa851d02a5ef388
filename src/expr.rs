//! Operators, postfix expression items, and the iterative shunting-yard
//! compiler that turns a run of infix tokens into postfix form.
//!
//! `ExprItem` is generic over the reference type used for variable/enzyme
//! lookups: `ExprItem<String>` is what the parser produces (unresolved
//! names), `ExprItem<crate::model::CellRef>` is what the linker produces
//! once every name has been tied to a live cell.

use std::f64::consts::PI;

use crate::error::PepError;
use crate::lexer::{Tok, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LeftParen,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Negate,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Sin,
    Sind,
    Asin,
    Asind,
    Cos,
    Cosd,
    Acos,
    Acosd,
    Tan,
    Tand,
    Atan,
    Atand,
    Atan2,
    Atan2d,
    Cot,
    Cotd,
    Acot,
    Acotd,
    Sqrt,
    Abs,
    Log,
    Log10,
    Log2,
    Min,
    Max,
}

impl Operator {
    pub fn arity(self) -> usize {
        use Operator::*;
        match self {
            LeftParen => 0,
            Negate | Sin | Sind | Asin | Asind | Cos | Cosd | Acos | Acosd | Tan | Tand | Atan
            | Atand | Cot | Cotd | Acot | Acotd | Sqrt | Abs | Log | Log10 | Log2 => 1,
            Add | Sub | Mul | Div | Pow | Eq | Neq | Lt | Gt | Lte | Gte | Atan2 | Atan2d
            | Min | Max => 2,
        }
    }

    fn precedence(self) -> u8 {
        use Operator::*;
        match self {
            LeftParen => 0,
            Eq | Neq | Lt | Gt | Lte | Gte => 1,
            Add | Sub => 2,
            Mul | Div => 3,
            Pow => 4,
            Negate => 5,
            Sin | Sind | Asin | Asind | Cos | Cosd | Acos | Acosd | Tan | Tand | Atan | Atand
            | Atan2 | Atan2d | Cot | Cotd | Acot | Acotd | Sqrt | Abs | Log | Log10 | Log2
            | Min | Max => 6,
        }
    }

    /// Right-associative operators (`^`, unary `~`, and the function-call
    /// operators, which are always immediately followed by a `(` and so
    /// never need to pop a like-precedence sibling off the stack) only
    /// yield to an *already-pending* same-precedence operator, never
    /// pop one preemptively before their own operand has been read.
    fn is_right_assoc(self) -> bool {
        use Operator::*;
        !matches!(self, Add | Sub | Mul | Div | Eq | Neq | Lt | Gt | Lte | Gte)
    }

    fn from_tok(kind: &Tok) -> Option<Operator> {
        Some(match kind {
            Tok::Plus => Operator::Add,
            Tok::Minus => Operator::Sub,
            Tok::Star => Operator::Mul,
            Tok::Slash => Operator::Div,
            Tok::Caret => Operator::Pow,
            Tok::Tilde => Operator::Negate,
            Tok::EqEq => Operator::Eq,
            Tok::NotEq => Operator::Neq,
            Tok::Lt => Operator::Lt,
            Tok::Gt => Operator::Gt,
            Tok::Le => Operator::Lte,
            Tok::Ge => Operator::Gte,
            _ => return None,
        })
    }

    pub fn eval1(self, a: f64) -> f64 {
        use Operator::*;
        match self {
            Negate => -a,
            Sin => a.sin(),
            Sind => (a * PI / 180.0).sin(),
            Asin => a.asin(),
            Asind => a.asin() * 180.0 / PI,
            Cos => a.cos(),
            Cosd => (a * PI / 180.0).cos(),
            Acos => a.acos(),
            Acosd => a.acos() * 180.0 / PI,
            Tan => a.tan(),
            Tand => (a * PI / 180.0).tan(),
            Atan => a.atan(),
            Atand => a.atan() * 180.0 / PI,
            Cot => 1.0 / a.tan(),
            Cotd => 1.0 / (a * PI / 180.0).tan(),
            Acot => (1.0 / a).atan(),
            Acotd => (1.0 / a).atan() * 180.0 / PI,
            Sqrt => a.sqrt(),
            Abs => a.abs(),
            Log => a.ln(),
            Log10 => a.log10(),
            Log2 => a.log2(),
            other => unreachable!("{other:?} is not arity 1"),
        }
    }

    pub fn eval2(self, a: f64, b: f64) -> f64 {
        use Operator::*;
        match self {
            Add => a + b,
            Sub => a - b,
            Mul => a * b,
            Div => a / b,
            Pow => a.powf(b),
            Eq => bool_to_f64(a == b),
            Neq => bool_to_f64(a != b),
            Lt => bool_to_f64(a < b),
            Gt => bool_to_f64(a > b),
            Lte => bool_to_f64(a <= b),
            Gte => bool_to_f64(a >= b),
            Atan2 => a.atan2(b),
            Atan2d => a.atan2(b) * 180.0 / PI,
            Min => a.min(b),
            Max => a.max(b),
            other => unreachable!("{other:?} is not arity 2"),
        }
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub enum ExprItem<R> {
    Integer(i64),
    Real(f64),
    VarRef(R),
    Op(Operator),
}

/// Turns a run of infix tokens into postfix `ExprItem`s plus the
/// space-joined source text for pretty-printing, using the standard
/// iterative shunting-yard algorithm (no recursion, per the operator
/// stack being plain `Vec<Operator>`).
pub fn shunting_yard(tokens: &[Token]) -> Result<(Vec<ExprItem<String>>, String), PepError> {
    let mut items: Vec<ExprItem<String>> = Vec::new();
    let mut ops: Vec<Operator> = Vec::new();
    let mut lexemes: Vec<String> = Vec::with_capacity(tokens.len());

    for tok in tokens {
        lexemes.push(tok.lexeme.clone());
        match &tok.kind {
            Tok::IntLit(n) => items.push(ExprItem::Integer(*n)),
            Tok::FloatLit(f) => items.push(ExprItem::Real(*f)),
            Tok::Ident(name) => items.push(ExprItem::VarRef(name.clone())),
            Tok::Func(op) => ops.push(*op),
            Tok::LParen => ops.push(Operator::LeftParen),
            Tok::RParen => loop {
                match ops.pop() {
                    Some(Operator::LeftParen) => break,
                    Some(op) => items.push(ExprItem::Op(op)),
                    None => {
                        return Err(PepError::Parse {
                            line: tok.line,
                            column: tok.column,
                            expected: "matching '('".into(),
                            got: ")".into(),
                        })
                    }
                }
            },
            Tok::Comma => {
                while let Some(&top) = ops.last() {
                    if top == Operator::LeftParen {
                        break;
                    }
                    items.push(ExprItem::Op(ops.pop().unwrap()));
                }
            }
            other => {
                let op = Operator::from_tok(other).ok_or_else(|| PepError::Parse {
                    line: tok.line,
                    column: tok.column,
                    expected: "operator or operand".into(),
                    got: tok.lexeme.clone(),
                })?;
                while let Some(&top) = ops.last() {
                    if top == Operator::LeftParen {
                        break;
                    }
                    let should_pop = if op.is_right_assoc() {
                        top.precedence() > op.precedence()
                    } else {
                        top.precedence() >= op.precedence()
                    };
                    if !should_pop {
                        break;
                    }
                    items.push(ExprItem::Op(ops.pop().unwrap()));
                }
                ops.push(op);
            }
        }
    }

    while let Some(op) = ops.pop() {
        if op == Operator::LeftParen {
            return Err(PepError::Parse {
                line: tokens.last().map(|t| t.line).unwrap_or(0),
                column: tokens.last().map(|t| t.column).unwrap_or(0),
                expected: "')'".into(),
                got: "end of expression".into(),
            });
        }
        items.push(ExprItem::Op(op));
    }

    Ok((items, lexemes.join(" ")))
}
