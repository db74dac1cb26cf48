//! # tally-core
//!
//! Core data types for the tally spreadsheet engine:
//! - [`Position`] - zero-based (row, column) cell addresses with A1 notation
//! - [`Value`] - computed cell values (numbers, text, errors)
//! - [`CellError`] - value-level evaluation errors (`#REF!`, `#VALUE!`, `#DIV/0!`)
//! - [`Error`] - structural errors that abort an operation without side effects

pub mod error;
pub mod position;
pub mod value;

pub use error::{Error, Result};
pub use position::Position;
pub use value::{CellError, Value};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 16_384;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u32 = 16_384;
