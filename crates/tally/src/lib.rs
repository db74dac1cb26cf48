//! # tally
//!
//! A minimal spreadsheet engine: addressable cells holding literal text or
//! arithmetic formulas, automatic recomputation through a dependency graph,
//! cycle rejection, and cached evaluation.
//!
//! ## Example
//!
//! ```rust
//! use tally::{Position, Sheet, Value};
//!
//! let mut sheet = Sheet::new();
//! let a1 = Position::parse("A1").unwrap();
//! let b1 = Position::parse("B1").unwrap();
//!
//! sheet.set_cell(a1, "2").unwrap();
//! sheet.set_cell(b1, "=A1*3").unwrap();
//! assert_eq!(sheet.cell_value(b1).unwrap(), Value::Number(6.0));
//!
//! // Editing A1 invalidates B1's cached result
//! sheet.set_cell(a1, "10").unwrap();
//! assert_eq!(sheet.cell_value(b1).unwrap(), Value::Number(30.0));
//!
//! // A cycle is rejected and the sheet is left untouched
//! assert!(sheet.set_cell(a1, "=B1").is_err());
//! assert_eq!(sheet.cell_value(b1).unwrap(), Value::Number(30.0));
//! ```

pub mod cell;
pub mod sheet;

pub use cell::{Cell, Content, ESCAPE_MARKER, FORMULA_MARKER};
pub use sheet::{Sheet, Size};

// Re-export the core types the engine API speaks in
pub use tally_core::{CellError, Error, Position, Result, Value, MAX_COLS, MAX_ROWS};

// Re-export the formula contract for custom resolvers and AST inspection
pub use tally_formula::{EvalResult, Formula, ReferenceResolver};
