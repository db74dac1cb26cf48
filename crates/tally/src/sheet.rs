//! The sheet: cell ownership, transactional edits, and rendering

use crate::cell::{Cell, Content};
use ahash::AHashSet;
use std::io;
use tally_core::{CellError, Error, Position, Result, Value};
use tally_formula::{EvalResult, ReferenceResolver};

/// The printable bounding box of a sheet, in rows and columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub rows: u32,
    pub cols: u32,
}

/// A grid of cells with automatic recomputation.
///
/// The sheet is the sole owner of all cells. Cross-cell links (formula
/// references and dependent back-edges) are positions, so cell identity is
/// stable no matter how the grid grows; each slot is additionally boxed so
/// a cell's address never moves either.
///
/// Every mutation is transactional: it fully commits (content, dependency
/// edges, cache invalidation) or fully rejects with the sheet untouched.
#[derive(Debug, Default)]
pub struct Sheet {
    /// Row-major grid; grows monotonically on first write past its bounds
    rows: Vec<Vec<Option<Box<Cell>>>>,
}

impl Sheet {
    /// Create an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text of the cell at `pos`, creating it if needed.
    ///
    /// The candidate content is built in full before anything is touched:
    /// a parse failure or a detected reference cycle rejects the edit with
    /// content, edges and caches exactly as before the call. On success the
    /// old content's back-edges are dropped, the new content is installed,
    /// this cell registers as a dependent of everything it now references
    /// (auto-creating missing targets), and every transitive dependent's
    /// cached value is invalidated before returning.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        if !pos.is_valid() {
            return Err(Error::InvalidPosition(pos));
        }

        let candidate = Content::classify(text)?;
        let new_refs = candidate.referenced_positions();
        self.ensure_no_cycle(pos, &new_refs)?;

        // Commit point: nothing below can fail.
        let old_refs = self
            .slot(pos)
            .map(Cell::referenced_positions)
            .unwrap_or_default();
        for old in old_refs {
            if let Some(cell) = self.slot_mut(old) {
                cell.dependents.remove(&pos);
            }
        }

        self.ensure_cell(pos).set_content(candidate);

        for target in &new_refs {
            self.ensure_cell(*target).dependents.insert(pos);
        }

        self.invalidate_from(pos);
        log::debug!("set {pos}: {} reference(s)", new_refs.len());
        Ok(())
    }

    /// Reset the cell at `pos` to empty content.
    ///
    /// A no-op if the slot was never created. The cell object and its own
    /// dependents bookkeeping survive; other formulas may still reference
    /// it and now read the empty default. Back-edges of the dropped content
    /// are removed and dependents are invalidated, like any other edit.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        if !pos.is_valid() {
            return Err(Error::InvalidPosition(pos));
        }
        if self.slot(pos).is_none() {
            return Ok(());
        }

        let old_refs = self
            .slot(pos)
            .map(Cell::referenced_positions)
            .unwrap_or_default();
        for old in old_refs {
            if let Some(cell) = self.slot_mut(old) {
                cell.dependents.remove(&pos);
            }
        }

        if let Some(cell) = self.slot_mut(pos) {
            cell.set_content(Content::Empty);
        }

        self.invalidate_from(pos);
        log::debug!("clear {pos}");
        Ok(())
    }

    /// Public view of the cell at `pos`.
    ///
    /// Reports absent when no slot exists *or* the cell's text is empty: a
    /// never-set cell and an explicitly cleared one are indistinguishable
    /// here, even though the cleared one may still be wired into the
    /// dependency graph (see [`Sheet::get_concrete_cell`]).
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        if !pos.is_valid() {
            return Err(Error::InvalidPosition(pos));
        }
        Ok(self.slot(pos).filter(|cell| !cell.text().is_empty()))
    }

    /// Internal view: the slot's cell regardless of emptiness.
    ///
    /// This is the accessor used for reference resolution and dependency
    /// bookkeeping, where empty cells are real.
    pub fn get_concrete_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        if !pos.is_valid() {
            return Err(Error::InvalidPosition(pos));
        }
        Ok(self.slot(pos))
    }

    /// Computed value at `pos` through the public view (absent reads empty)
    pub fn cell_value(&self, pos: Position) -> Result<Value> {
        Ok(match self.get_cell(pos)? {
            Some(cell) => cell.value(self),
            None => Value::text(""),
        })
    }

    /// Raw text at `pos` through the public view (absent reads `""`)
    pub fn cell_text(&self, pos: Position) -> Result<String> {
        Ok(self
            .get_cell(pos)?
            .map(|cell| cell.text())
            .unwrap_or_default())
    }

    /// The smallest bounding box covering every cell with non-empty text.
    ///
    /// Scans each existing row from its last column backward until the
    /// first occupied cell.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (row_idx, cells) in self.rows.iter().enumerate() {
            for (col_idx, slot) in cells.iter().enumerate().rev() {
                if let Some(cell) = slot {
                    if !cell.text().is_empty() {
                        size.rows = size.rows.max(row_idx as u32 + 1);
                        size.cols = size.cols.max(col_idx as u32 + 1);
                        break;
                    }
                }
            }
        }
        size
    }

    /// Render computed values, row-major and tab-separated, bounded by
    /// [`Sheet::printable_size`]
    pub fn print_values<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.value(self).to_string())
    }

    /// Render raw cell texts, row-major and tab-separated, bounded by
    /// [`Sheet::printable_size`]
    pub fn print_texts<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.text())
    }

    fn print_with<W: io::Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.slot(Position::new(row, col)) {
                    write!(out, "{}", render(cell))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    // === Internals ===

    fn slot(&self, pos: Position) -> Option<&Cell> {
        self.rows
            .get(pos.row as usize)?
            .get(pos.col as usize)?
            .as_deref()
    }

    fn slot_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.rows
            .get_mut(pos.row as usize)?
            .get_mut(pos.col as usize)?
            .as_deref_mut()
    }

    /// Get or create the cell at `pos`, growing the grid as needed.
    /// Growth is monotonic; the grid never shrinks.
    fn ensure_cell(&mut self, pos: Position) -> &mut Cell {
        let row = pos.row as usize;
        let col = pos.col as usize;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, || None);
        }
        cells[col].get_or_insert_with(|| Box::new(Cell::new()))
    }

    /// Reject the candidate edit at `start` if any cell it would reference
    /// already depends, directly or transitively, on `start`.
    ///
    /// Walks the dependents graph from `start` (including `start` itself,
    /// so self-references are cycles too) with an explicit stack and a
    /// visited set; stops at the first member of the candidate's reference
    /// set.
    fn ensure_no_cycle(&self, start: Position, refs: &[Position]) -> Result<()> {
        if refs.is_empty() {
            return Ok(());
        }

        let targets: AHashSet<Position> = refs.iter().copied().collect();
        let mut stack = vec![start];
        let mut visited = AHashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if targets.contains(&current) {
                log::debug!("rejected edit at {start}: cycle through {current}");
                return Err(Error::CircularDependency(start));
            }
            if let Some(cell) = self.slot(current) {
                stack.extend(cell.dependents.iter().copied());
            }
        }

        Ok(())
    }

    /// Clear the memoized value of `start` and every transitive dependent.
    /// Each pass visits a cell at most once; termination needs no cycle
    /// guard because committed graphs are acyclic.
    fn invalidate_from(&self, start: Position) {
        let mut stack = vec![start];
        let mut visited = AHashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(cell) = self.slot(current) {
                cell.invalidate_cache();
                stack.extend(cell.dependents.iter().copied());
            }
        }
    }
}

impl ReferenceResolver for Sheet {
    /// Resolve a formula reference to a numeric operand.
    ///
    /// Invalid positions raise `#REF!`; missing cells read as zero; text is
    /// coerced (empty text is zero, non-numeric text raises `#VALUE!`); a
    /// referenced cell's own error value is re-raised unchanged.
    fn resolve(&self, pos: Position) -> EvalResult {
        if !pos.is_valid() {
            return Err(CellError::Ref);
        }
        let cell = match self.slot(pos) {
            Some(cell) => cell,
            None => return Ok(0.0),
        };
        match cell.value(self) {
            Value::Number(n) => Ok(n),
            Value::Text(s) if s.is_empty() => Ok(0.0),
            Value::Text(s) => s.parse().map_err(|_| CellError::Value),
            Value::Error(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos(addr: &str) -> Position {
        Position::parse(addr).unwrap()
    }

    fn sheet_with(cells: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new();
        for (addr, text) in cells {
            sheet.set_cell(pos(addr), text).unwrap();
        }
        sheet
    }

    #[test]
    fn test_unwritten_cell_is_absent() {
        let sheet = Sheet::new();
        assert!(sheet.get_cell(pos("A1")).unwrap().is_none());
        assert!(sheet.get_cell(pos("XFD16384")).unwrap().is_none());
        assert_eq!(sheet.cell_text(pos("A1")).unwrap(), "");
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::text(""));
    }

    #[test]
    fn test_invalid_position_is_structural() {
        let mut sheet = Sheet::new();
        let out = Position::new(0, 20_000);
        assert!(matches!(
            sheet.set_cell(out, "1"),
            Err(Error::InvalidPosition(_))
        ));
        assert!(matches!(sheet.get_cell(out), Err(Error::InvalidPosition(_))));
        assert!(matches!(
            sheet.clear_cell(out),
            Err(Error::InvalidPosition(_))
        ));
        assert_eq!(sheet.printable_size(), Size::default());
    }

    #[test]
    fn test_literal_roundtrip() {
        let sheet = sheet_with(&[("A1", "hello"), ("B2", "'=1+2"), ("C3", "42")]);
        assert_eq!(sheet.cell_text(pos("A1")).unwrap(), "hello");
        assert_eq!(sheet.cell_text(pos("B2")).unwrap(), "'=1+2");
        assert_eq!(sheet.cell_text(pos("C3")).unwrap(), "42");
    }

    #[test]
    fn test_lone_marker_is_text() {
        let sheet = sheet_with(&[("A1", "=")]);
        assert_eq!(sheet.cell_text(pos("A1")).unwrap(), "=");
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::text("="));
    }

    #[test]
    fn test_formula_syntax_error_leaves_cell_unmodified() {
        let mut sheet = sheet_with(&[("A1", "keep me")]);
        assert!(matches!(
            sheet.set_cell(pos("A1"), "=1+"),
            Err(Error::FormulaParse(_))
        ));
        assert_eq!(sheet.cell_text(pos("A1")).unwrap(), "keep me");
    }

    #[test]
    fn test_auto_vivification() {
        let sheet = sheet_with(&[("A1", "=B5+C7")]);

        // Referenced cells exist concretely but are publicly absent
        assert!(sheet.get_concrete_cell(pos("B5")).unwrap().is_some());
        assert!(sheet.get_concrete_cell(pos("C7")).unwrap().is_some());
        assert!(sheet.get_cell(pos("B5")).unwrap().is_none());

        // And they know who depends on them
        let b5 = sheet.get_concrete_cell(pos("B5")).unwrap().unwrap();
        assert!(b5.is_referenced());

        // Unset references read as zero
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_stale_edges_removed_on_edit() {
        let mut sheet = sheet_with(&[("A1", "=B1"), ("B1", "7")]);
        let b1 = sheet.get_concrete_cell(pos("B1")).unwrap().unwrap();
        assert!(b1.is_referenced());

        // Repoint A1 away from B1; the old back-edge must go
        sheet.set_cell(pos("A1"), "=C1").unwrap();
        let b1 = sheet.get_concrete_cell(pos("B1")).unwrap().unwrap();
        assert!(!b1.is_referenced());
        let c1 = sheet.get_concrete_cell(pos("C1")).unwrap().unwrap();
        assert!(c1.is_referenced());

        // B1 is now free to reference A1
        sheet.set_cell(pos("B1"), "=A1").unwrap();
        assert_eq!(sheet.cell_value(pos("B1")).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_clear_removes_stale_edges() {
        let mut sheet = sheet_with(&[("A1", "=B1")]);
        sheet.clear_cell(pos("A1")).unwrap();

        let b1 = sheet.get_concrete_cell(pos("B1")).unwrap().unwrap();
        assert!(!b1.is_referenced());

        // With A1 cleared, B1 -> A1 no longer cycles
        sheet.set_cell(pos("B1"), "=A1").unwrap();
        assert_eq!(sheet.cell_value(pos("B1")).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_clear_preserves_dependents_bookkeeping() {
        let mut sheet = sheet_with(&[("B1", "3"), ("A1", "=B1*2")]);
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::Number(6.0));

        sheet.clear_cell(pos("B1")).unwrap();

        // B1 is publicly absent but still referenced by A1
        assert!(sheet.get_cell(pos("B1")).unwrap().is_none());
        let b1 = sheet.get_concrete_cell(pos("B1")).unwrap().unwrap();
        assert!(b1.is_referenced());

        // A1 now reads the empty default
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::Number(0.0));

        // And a later write to B1 still reaches A1
        sheet.set_cell(pos("B1"), "10").unwrap();
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::Number(20.0));
    }

    #[test]
    fn test_clear_never_created_slot_is_noop() {
        let mut sheet = Sheet::new();
        sheet.clear_cell(pos("Z99")).unwrap();
        assert!(sheet.get_concrete_cell(pos("Z99")).unwrap().is_none());
        assert_eq!(sheet.printable_size(), Size::default());
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut sheet = Sheet::new();
        assert!(matches!(
            sheet.set_cell(pos("A1"), "=A1"),
            Err(Error::CircularDependency(_))
        ));
        assert!(sheet.get_concrete_cell(pos("A1")).unwrap().is_none());
    }

    #[test]
    fn test_cycle_rejection_preserves_state() {
        let mut sheet = sheet_with(&[("A1", "=B1"), ("B1", "5")]);
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::Number(5.0));

        // B1 -> A1 would close the loop
        assert!(matches!(
            sheet.set_cell(pos("B1"), "=A1"),
            Err(Error::CircularDependency(_))
        ));

        // B1 is byte-for-byte as before, edges included
        assert_eq!(sheet.cell_text(pos("B1")).unwrap(), "5");
        let b1 = sheet.get_concrete_cell(pos("B1")).unwrap().unwrap();
        assert!(b1.is_referenced());
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let mut sheet = sheet_with(&[("A1", "=B1"), ("B1", "=C1")]);
        assert!(matches!(
            sheet.set_cell(pos("C1"), "=A1"),
            Err(Error::CircularDependency(_))
        ));
        // C1 was auto-vivified by B1 but never set; it stays empty
        assert_eq!(sheet.cell_text(pos("C1")).unwrap(), "");
    }

    #[test]
    fn test_cache_invalidation_propagates() {
        let mut sheet = sheet_with(&[("A1", "1"), ("B1", "=A1+1"), ("C1", "=B1*10")]);
        assert_eq!(sheet.cell_value(pos("C1")).unwrap(), Value::Number(20.0));

        sheet.set_cell(pos("A1"), "5").unwrap();
        assert_eq!(sheet.cell_value(pos("B1")).unwrap(), Value::Number(6.0));
        assert_eq!(sheet.cell_value(pos("C1")).unwrap(), Value::Number(60.0));
    }

    #[test]
    fn test_repeated_reads_are_stable() {
        let sheet = sheet_with(&[("A1", "2"), ("B1", "=A1*A1")]);
        let first = sheet.cell_value(pos("B1")).unwrap();
        let second = sheet.cell_value(pos("B1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Value::Number(4.0));
    }

    #[test]
    fn test_resolver_coercions() {
        let sheet = sheet_with(&[
            ("A1", "12"),        // numeric text
            ("A2", "twelve"),    // non-numeric text
            ("A3", "=1/0"),      // error value
            ("B1", "=A1+1"),
            ("B2", "=A2+1"),
            ("B3", "=A3+1"),
            ("B4", "=Z99+1"),    // unset cell
        ]);
        assert_eq!(sheet.cell_value(pos("B1")).unwrap(), Value::Number(13.0));
        assert_eq!(
            sheet.cell_value(pos("B2")).unwrap(),
            Value::Error(CellError::Value)
        );
        assert_eq!(
            sheet.cell_value(pos("B3")).unwrap(),
            Value::Error(CellError::Div0)
        );
        assert_eq!(sheet.cell_value(pos("B4")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_printable_size() {
        let mut sheet = Sheet::new();
        assert_eq!(sheet.printable_size(), Size::default());

        sheet.set_cell(pos("B2"), "x").unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });

        sheet.set_cell(pos("D1"), "y").unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 4 });

        // Auto-vivified empty cells do not extend the box
        sheet.set_cell(pos("A1"), "=Z99").unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 4 });

        // Clearing shrinks it back
        sheet.clear_cell(pos("D1")).unwrap();
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });
        sheet.clear_cell(pos("B2")).unwrap();
        sheet.clear_cell(pos("A1")).unwrap();
        assert_eq!(sheet.printable_size(), Size::default());
    }

    #[test]
    fn test_print_values_and_texts() {
        let sheet = sheet_with(&[
            ("A1", "1"),
            ("B1", "=A1+1"),
            ("C1", "'escaped"),
            ("A2", "=1/0"),
        ]);

        let mut out = Vec::new();
        sheet.print_values(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1\t2\tescaped\n#DIV/0!\t\t\n"
        );

        let mut out = Vec::new();
        sheet.print_texts(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1\t=A1+1\t'escaped\n=1/0\t\t\n"
        );
    }
}
