//! Expression evaluator
//!
//! Evaluates expression ASTs against a cell-reference resolver. Errors are
//! data, not exceptions: evaluation returns `Result<f64, CellError>` and an
//! errored operand short-circuits the whole expression to the first error
//! encountered in evaluation order.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use tally_core::{CellError, Position};

/// The terminal form of a formula evaluation: a number or an error value
pub type EvalResult = std::result::Result<f64, CellError>;

/// Resolves a referenced position to a numeric operand.
///
/// Supplied by the engine; implementations are expected to:
/// - return `Err(CellError::Ref)` for invalid positions,
/// - yield `0.0` for positions that resolve to no cell,
/// - coerce text values to numbers (`Err(CellError::Value)` when that
///   fails),
/// - re-raise a referenced cell's own error value unchanged.
pub trait ReferenceResolver {
    fn resolve(&self, pos: Position) -> EvalResult;
}

pub(crate) fn eval_expr(expr: &Expr, resolver: &dyn ReferenceResolver) -> EvalResult {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::Ref(pos) => resolver.resolve(*pos),

        Expr::UnaryOp { op, operand } => {
            let value = eval_expr(operand, resolver)?;
            Ok(match op {
                UnaryOp::Negate => -value,
                UnaryOp::Plus => value,
            })
        }

        Expr::BinaryOp { op, left, right } => {
            let lhs = eval_expr(left, resolver)?;
            let rhs = eval_expr(right, resolver)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Subtract => Ok(lhs - rhs),
                BinaryOp::Multiply => Ok(lhs * rhs),
                BinaryOp::Divide => {
                    if rhs == 0.0 {
                        Err(CellError::Div0)
                    } else {
                        Ok(lhs / rhs)
                    }
                }
            }
        }
    }
}
