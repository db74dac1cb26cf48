//! Cell content, cached evaluation, and dependent bookkeeping

use ahash::AHashSet;
use tally_core::{Position, Result, Value};
use tally_formula::{EvalResult, Formula, ReferenceResolver};

/// Leading character marking formula content.
///
/// Text consisting of exactly one marker character is *not* a formula; it
/// stays literal text.
pub const FORMULA_MARKER: char = '=';

/// Leading character forcing literal text.
///
/// `text()` keeps the marker; `value()` strips exactly one.
pub const ESCAPE_MARKER: char = '\'';

/// What a cell currently holds
#[derive(Debug, Clone, Default)]
pub enum Content {
    /// Never set, or explicitly cleared
    #[default]
    Empty,
    /// Literal text, stored raw (escape marker included)
    Text(String),
    /// A parsed formula
    Formula(Formula),
}

impl Content {
    /// Classify raw input text into a content variant.
    ///
    /// Empty input is `Empty`; input longer than one character starting with
    /// the formula marker parses as a formula (a parse failure surfaces as
    /// a structural error and nothing else happens); everything else,
    /// including a lone `"="`, is literal text.
    pub fn classify(text: &str) -> Result<Self> {
        if text.is_empty() {
            Ok(Content::Empty)
        } else if text.len() > 1 && text.starts_with(FORMULA_MARKER) {
            let formula = Formula::parse(&text[FORMULA_MARKER.len_utf8()..])?;
            Ok(Content::Formula(formula))
        } else {
            Ok(Content::Text(text.to_string()))
        }
    }

    /// The positions this content reads from; empty for non-formulas
    pub fn referenced_positions(&self) -> Vec<Position> {
        match self {
            Content::Formula(formula) => formula.referenced_positions(),
            Content::Empty | Content::Text(_) => Vec::new(),
        }
    }
}

/// One grid slot: content, a memoized formula result, and the set of cells
/// whose formulas directly reference this one.
///
/// Dependents are stored as positions - stable handles into the owning
/// sheet, never pointers. The memo slot uses single-threaded interior
/// mutability so that `value()` stays logically read-only.
#[derive(Debug, Default)]
pub struct Cell {
    content: Content,
    cache: std::cell::Cell<Option<EvalResult>>,
    pub(crate) dependents: AHashSet<Position>,
}

impl Cell {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::default()
    }

    /// The current content variant
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Replace content; the memoized result of the old content dies with it
    pub(crate) fn set_content(&mut self, content: Content) {
        self.content = content;
        self.cache.set(None);
    }

    /// Drop the memoized result; a no-op for non-formula content
    pub(crate) fn invalidate_cache(&self) {
        self.cache.set(None);
    }

    /// The raw text representation of this cell
    ///
    /// Empty cells render as `""`, text cells as the stored string
    /// unchanged (escape marker included), formula cells as the marker
    /// followed by the canonical expression text.
    pub fn text(&self) -> String {
        match &self.content {
            Content::Empty => String::new(),
            Content::Text(raw) => raw.clone(),
            Content::Formula(formula) => {
                format!("{}{}", FORMULA_MARKER, formula.expression_text())
            }
        }
    }

    /// The computed value of this cell
    ///
    /// Formula results are memoized: an invalidated cell re-evaluates on the
    /// next read, an untouched one returns the cached result.
    pub fn value(&self, resolver: &dyn ReferenceResolver) -> Value {
        match &self.content {
            Content::Empty => Value::text(""),
            Content::Text(raw) => {
                let shown = raw.strip_prefix(ESCAPE_MARKER).unwrap_or(raw);
                Value::text(shown)
            }
            Content::Formula(formula) => {
                let result = match self.cache.get() {
                    Some(result) => result,
                    None => {
                        let result = formula.evaluate(resolver);
                        self.cache.set(Some(result));
                        result
                    }
                };
                match result {
                    Ok(number) => Value::Number(number),
                    Err(error) => Value::Error(error),
                }
            }
        }
    }

    /// The positions this cell's formula reads; empty for non-formulas
    pub fn referenced_positions(&self) -> Vec<Position> {
        self.content.referenced_positions()
    }

    /// Whether any other cell's formula directly references this one
    pub fn is_referenced(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// Whether a formula result is currently memoized
    #[cfg(test)]
    pub(crate) fn has_cached_result(&self) -> bool {
        self.cache.get().is_some()
    }
}
