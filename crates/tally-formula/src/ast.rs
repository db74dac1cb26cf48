//! Expression Abstract Syntax Tree types

use std::fmt;
use tally_core::Position;

/// Expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Single cell reference
    Ref(Position),
    /// Unary operation
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
}

impl UnaryOp {
    fn symbol(&self) -> char {
        match self {
            UnaryOp::Negate => '-',
            UnaryOp::Plus => '+',
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Subtract => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
        }
    }
}

impl Expr {
    /// Binding strength, higher binds tighter
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Ref(_) => 4,
            Expr::UnaryOp { .. } => 3,
            Expr::BinaryOp { op, .. } => match op {
                BinaryOp::Multiply | BinaryOp::Divide => 2,
                BinaryOp::Add | BinaryOp::Subtract => 1,
            },
        }
    }

    fn fmt_child(child: &Expr, parenthesize: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if parenthesize {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

/// Canonical re-serialization with minimal parentheses.
///
/// Parentheses are emitted only where a child binds weaker than its parent,
/// or binds equally on the right-hand side of a binary operator (so the
/// printed text re-parses to the same tree).
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ref(pos) => write!(f, "{}", pos),
            Expr::UnaryOp { op, operand } => {
                write!(f, "{}", op.symbol())?;
                Self::fmt_child(operand, operand.precedence() < self.precedence(), f)
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = self.precedence();
                Self::fmt_child(left, left.precedence() < prec, f)?;
                write!(f, "{}", op.symbol())?;
                Self::fmt_child(right, right.precedence() <= prec, f)
            }
        }
    }
}
