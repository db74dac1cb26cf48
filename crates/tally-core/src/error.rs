//! Structural error types
//!
//! Structural errors abort an edit or parse operation before any state
//! change; the operation that raises one must leave the sheet exactly as it
//! was. They are distinct from [`crate::CellError`], which travels through
//! evaluation as data.

use crate::position::Position;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an operation without side effects
#[derive(Debug, Error)]
pub enum Error {
    /// Position outside the fixed sheet bounds
    #[error("Invalid position: {0}")]
    InvalidPosition(Position),

    /// The edit would create a reference cycle
    #[error("Circular dependency introduced at {0}")]
    CircularDependency(Position),

    /// Formula text failed to parse
    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    /// Malformed A1-style address text
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),
}
