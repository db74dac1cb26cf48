//! Parsed formula wrapper

use crate::ast::Expr;
use crate::evaluator::{eval_expr, EvalResult, ReferenceResolver};
use crate::parser::parse_expression;
use tally_core::{Position, Result};

/// A parsed, evaluable formula expression.
///
/// Wraps the AST and exposes the contract the engine consumes: evaluation
/// against a resolver, canonical re-serialization, and the deduplicated set
/// of referenced positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    /// Parse bare expression text (no formula marker) into a formula
    ///
    /// Fails with [`tally_core::Error::FormulaParse`] when the text is not a
    /// syntactically valid expression.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            expr: parse_expression(text)?,
        })
    }

    /// Evaluate against a resolver; the result is a number or an error value
    pub fn evaluate(&self, resolver: &dyn ReferenceResolver) -> EvalResult {
        eval_expr(&self.expr, resolver)
    }

    /// Canonical expression text (no formula marker)
    ///
    /// Not necessarily byte-identical to the original input, but re-parses
    /// to an equivalent expression.
    pub fn expression_text(&self) -> String {
        self.expr.to_string()
    }

    /// The deduplicated, sorted set of valid positions this formula reads
    ///
    /// Syntactically well-formed but out-of-bounds references are excluded;
    /// they surface only through evaluation, as `#REF!`.
    pub fn referenced_positions(&self) -> Vec<Position> {
        let mut refs = Vec::new();
        collect_refs(&self.expr, &mut refs);
        refs.retain(Position::is_valid);
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    /// The underlying expression tree
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

fn collect_refs(expr: &Expr, refs: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Ref(pos) => refs.push(*pos),
        Expr::UnaryOp { operand, .. } => collect_refs(operand, refs),
        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, refs);
            collect_refs(right, refs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_referenced_positions_dedup_and_order() {
        let formula = Formula::parse("B2+A1*B2+A1").unwrap();
        assert_eq!(
            formula.referenced_positions(),
            vec![Position::new(0, 0), Position::new(1, 1)]
        );
    }

    #[test]
    fn test_referenced_positions_filters_invalid() {
        let formula = Formula::parse("A1+XFE1").unwrap();
        assert_eq!(formula.referenced_positions(), vec![Position::new(0, 0)]);
    }

    #[test]
    fn test_no_references() {
        let formula = Formula::parse("1+2*3").unwrap();
        assert!(formula.referenced_positions().is_empty());
    }

    #[test]
    fn test_canonical_text_reparses_to_same_tree() {
        for text in [
            "1+2*3",
            "(1+2)*3",
            "1-(2-3)",
            "-(A1+B2)/2",
            "1/2/3",
            "2*(3*4)",
            "--1",
            " 1 +  2 ",
        ] {
            let formula = Formula::parse(text).unwrap();
            let canonical = formula.expression_text();
            let reparsed = Formula::parse(&canonical).unwrap();
            assert_eq!(reparsed, formula, "canonical text: {}", canonical);
        }
    }

    #[test]
    fn test_canonical_text_normalizes() {
        let formula = Formula::parse(" 1 + ( 2 * 3 ) ").unwrap();
        assert_eq!(formula.expression_text(), "1+2*3");

        // References print in canonical upper-case A1 form
        let formula = Formula::parse("a1+b2").unwrap();
        assert_eq!(formula.expression_text(), "A1+B2");
    }

    #[test]
    fn test_parse_failure() {
        assert!(Formula::parse("1+").is_err());
        assert!(Formula::parse("").is_err());
    }
}
