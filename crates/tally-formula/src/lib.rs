//! # tally-formula
//!
//! Formula parser and evaluator for tally.
//!
//! This crate provides:
//! - Expression parsing (text → AST)
//! - Expression evaluation against a cell-reference resolver
//! - Canonical re-serialization of parsed expressions
//! - Extraction of the deduplicated set of referenced positions
//!
//! The grammar covers numeric literals, cell references, unary sign, the
//! four arithmetic operators and parentheses. The formula marker (`=`) is
//! *not* part of the grammar; callers hand in the bare expression text.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_formula::Formula;
//!
//! let formula = Formula::parse("A1+1")?;
//! let result = formula.evaluate(&resolver);
//! ```

pub mod ast;
pub mod evaluator;
pub mod formula;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use evaluator::{EvalResult, ReferenceResolver};
pub use formula::Formula;
pub use parser::parse_expression;
