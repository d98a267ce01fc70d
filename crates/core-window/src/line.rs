//! Sparse storage for one window row.
//!
//! A `Line` stores only the painted span of a row: `start` leading empty
//! columns, then a run of cells whose widths sum to `width`. All painting
//! funnels into [`Line::put_cell`], which handles the five insertion shapes:
//! attach-combining, empty row, append, prepend, and the general overlap
//! replace. Overlap is the delicate one: writing into the middle of wide
//! characters must keep their uncovered columns visible as spaces carrying
//! the old character's attributes.
//!
//! Invariants (hold after every operation):
//! - `start >= 0`, `width == Σ cell.width`, cells are never zero-width.
//! - A caller-supplied column is always `>= 0`; the painter clamps its
//!   cursor before reaching this layer.

use core_cell::{Attrs, Cell};

/// Initial cell capacity for a freshly created row.
pub(crate) const INITIAL_ALLOC: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct Line {
    start: i32,
    width: i32,
    cells: Vec<Cell>,
}

impl Line {
    pub fn with_capacity(columns: i32) -> Self {
        Self {
            start: 0,
            width: 0,
            cells: Vec::with_capacity(INITIAL_ALLOC.min(columns.max(0) as usize)),
        }
    }

    /// First occupied column.
    pub fn start(&self) -> i32 {
        self.start
    }

    /// Total columns covered by the stored cells.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// One past the last occupied column.
    pub fn end(&self) -> i32 {
        self.start + self.width
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.width = 0;
        self.cells.clear();
    }

    /// Index of the first cell whose span reaches past `col`, with the
    /// column at which that cell starts. `col` must lie within the stored
    /// span.
    fn locate(&self, col: i32) -> (usize, i32) {
        let mut pos = self.start;
        let mut i = 0;
        while i < self.cells.len() && pos + self.cells[i].width() <= col {
            pos += self.cells[i].width();
            i += 1;
        }
        (i, pos)
    }

    /// Attach combining marks to the character covering column `col - 1`
    /// (or ending exactly at `col`). Marks that have no character to attach
    /// to, or that would land in the middle of a wide character, are
    /// dropped silently.
    pub fn attach_marks(&mut self, col: i32, marks: &str) {
        if self.cells.is_empty() || col <= self.start || col > self.end() + 1 {
            return;
        }

        let mut pos = self.start;
        let mut i = 0;
        while i < self.cells.len() {
            pos += self.cells[i].width();
            if pos >= col {
                break;
            }
            i += 1;
        }

        // Asked to combine into the middle of a double-width character.
        if pos > col {
            return;
        }

        let idx = i.min(self.cells.len() - 1);
        for mark in marks.chars() {
            self.cells[idx].push_mark(mark);
        }
    }

    /// Insert `cell` so that it occupies columns `[col, col + cell.width)`,
    /// replacing whatever was stored there. Gaps opened between the new
    /// cell and existing content are padded with spaces carrying
    /// `gap_attrs`; partially overwritten old cells leave spaces carrying
    /// their own attributes.
    pub fn put_cell(&mut self, col: i32, cell: Cell, gap_attrs: Attrs) {
        let w = cell.width();
        debug_assert!(w >= 1);
        debug_assert!(col >= 0);

        if self.cells.is_empty() {
            self.start = col;
            self.width = w;
            self.cells.push(cell);
        } else if col >= self.end() {
            // Append after the stored span.
            let gap = col - self.end();
            self.cells.reserve(gap as usize + 1);
            for _ in 0..gap {
                self.cells.push(Cell::space(gap_attrs));
            }
            self.cells.push(cell);
            self.width += w + gap;
        } else if col + w <= self.start {
            // Prepend before the stored span.
            let gap = self.start - (col + w);
            let mut prefix = Vec::with_capacity(gap as usize + 1);
            prefix.push(cell);
            for _ in 0..gap {
                prefix.push(Cell::space(gap_attrs));
            }
            self.cells.splice(0..0, prefix);
            self.width += w + gap;
            self.start = col;
        } else {
            self.put_cell_overlapping(col, cell);
        }
    }

    /// The general case: the new cell overlaps stored content.
    fn put_cell_overlapping(&mut self, col: i32, cell: Cell) {
        let w = cell.width();

        // First stored cell whose columns overlap [col, col + w).
        let (start_replace, first_col) = self.locate(col);
        debug_assert!(start_replace < self.cells.len());

        // If that cell only partially overlaps, its leading columns stay
        // visible as spaces with its attributes.
        let start_space_attrs = self.cells[start_replace].attrs;
        let start_spaces = if col >= self.start { col - first_col } else { 0 };

        // Walk to the last overlapped cell. When the new cell ends inside a
        // wide character, its trailing columns become spaces with that
        // character's attributes; when the new cell lies entirely within
        // one wide character, the leading cell's attributes cover both
        // sides.
        let mut pos = first_col + self.cells[start_replace].width();
        let mut i = start_replace + 1;
        let end_space_attrs = if pos >= col + w {
            start_space_attrs
        } else {
            while i < self.cells.len() && pos < col + w {
                pos += self.cells[i].width();
                i += 1;
            }
            self.cells[i - 1].attrs
        };
        let end_replace = i;
        let end_spaces = (pos - (col + w)).max(0);

        let mut replacement =
            Vec::with_capacity((start_spaces + end_spaces) as usize + 1);
        for _ in 0..start_spaces {
            replacement.push(Cell::space(start_space_attrs));
        }
        replacement.push(cell);
        for _ in 0..end_spaces {
            replacement.push(Cell::space(end_space_attrs));
        }
        self.cells.splice(start_replace..end_replace, replacement);

        if self.end() < col + w {
            self.width = col + w - self.start;
        }
        if self.start > col {
            self.width += self.start - col;
            self.start = col;
        }
    }

    /// Truncate the row at `col`. A cut through the middle of a wide
    /// character pads the remaining columns with spaces carrying
    /// `pad_attrs`.
    pub fn clear_from(&mut self, col: i32, pad_attrs: Attrs) {
        if col <= self.start {
            self.clear();
        } else if col < self.end() {
            let (i, pos) = self.locate(col);
            self.cells.truncate(i);
            for _ in 0..(col - pos) {
                self.cells.push(Cell::space(pad_attrs));
            }
            self.width = col - self.start;
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self, window_width: i32) {
        assert!(self.start >= 0, "start {} < 0", self.start);
        assert!(self.width >= 0);
        assert!(
            self.start + self.width <= window_width,
            "span {}..{} exceeds window width {}",
            self.start,
            self.end(),
            window_width
        );
        let sum: i32 = self.cells.iter().map(|c| c.width()).sum();
        assert_eq!(sum, self.width, "cached width out of sync");
        for cell in &self.cells {
            assert!(cell.width() >= 1);
            assert!(!cell.cluster.is_empty());
        }
        if self.cells.is_empty() {
            assert_eq!(self.start, 0);
            assert_eq!(self.width, 0);
        }
    }
}
