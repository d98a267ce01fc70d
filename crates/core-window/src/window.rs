//! A single window: geometry, paint cursor, and the drawing operations.
//!
//! All drawing is window-local and touches no terminal state. Characters
//! are classified one scalar at a time: printable scalars become cells,
//! combining marks attach to the character painted before them, and
//! non-printables are skipped (reported as `Nonprint` once the rest of the
//! input has been drawn). A character that would cross the window's right
//! edge is dropped and the remaining columns are blanked instead, so a
//! clipped wide character leaves a visible gap rather than spilling over.

use core_cell::{AcsTables, AttrFlags, Attrs, Cell, char_width};

use crate::PaintError;
use crate::line::Line;
use crate::tree::{Relation, WindowId};

pub struct Window {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) paint_x: i32,
    pub(crate) paint_y: i32,
    pub(crate) depth: i32,
    pub(crate) shown: bool,
    pub(crate) default_attrs: Attrs,
    pub(crate) parent: Option<WindowId>,
    pub(crate) anchor: Option<WindowId>,
    pub(crate) relation: Relation,
    pub(crate) children: Vec<WindowId>,
    /// `None` for positioning-only windows without a backing store.
    pub(crate) backing: Option<Vec<Line>>,
}

impl Window {
    pub(crate) fn new(height: i32, width: i32, y: i32, x: i32, depth: i32, backed: bool) -> Self {
        debug_assert!(height > 0 && width > 0);
        let backing = backed.then(|| (0..height).map(|_| Line::with_capacity(width)).collect());
        Self {
            x,
            y,
            width,
            height,
            paint_x: 0,
            paint_y: 0,
            depth,
            shown: false,
            default_attrs: Attrs::NONE,
            parent: None,
            anchor: None,
            relation: Relation::default(),
            children: Vec::new(),
            backing,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_backed(&self) -> bool {
        self.backing.is_some()
    }

    pub fn default_attrs(&self) -> Attrs {
        self.default_attrs
    }

    pub fn relation(&self) -> (Option<WindowId>, Relation) {
        (self.anchor, self.relation)
    }

    pub fn line(&self, y: i32) -> Option<&Line> {
        if y < 0 || y >= self.height {
            return None;
        }
        self.backing.as_ref()?.get(y as usize)
    }

    /// Move the paint cursor. Negative coordinates clamp to zero.
    pub fn set_paint(&mut self, y: i32, x: i32) {
        self.paint_y = y.max(0);
        self.paint_x = x.max(0);
    }

    /// Draw a string at the paint cursor. `attrs` is combined with the
    /// window's default attributes, the latter yielding on conflicts.
    pub fn addstr(
        &mut self,
        s: &str,
        attrs: Attrs,
        acs: &AcsTables,
    ) -> Result<(), PaintError> {
        if self.backing.is_none() {
            return Err(PaintError::Unbacked);
        }
        let attrs = attrs.combine(self.default_attrs);
        let mut worst = Ok(());
        for ch in s.chars() {
            match char_width(ch) {
                None => worst = Err(PaintError::Nonprint),
                Some(0) => self.attach_mark(ch),
                Some(w) => {
                    let cell = self.make_cell(ch, w, attrs, acs);
                    self.add_cell(cell);
                }
            }
        }
        worst
    }

    /// Draw at most `n` bytes of `s`, never splitting a character.
    pub fn addnstr(
        &mut self,
        s: &str,
        n: usize,
        attrs: Attrs,
        acs: &AcsTables,
    ) -> Result<(), PaintError> {
        let mut end = n.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        self.addstr(&s[..end], attrs, acs)
    }

    /// Draw a single character.
    pub fn addch(&mut self, c: char, attrs: Attrs, acs: &AcsTables) -> Result<(), PaintError> {
        let mut buf = [0u8; 4];
        self.addstr(c.encode_utf8(&mut buf), attrs, acs)
    }

    pub fn addstrrep(
        &mut self,
        s: &str,
        attrs: Attrs,
        acs: &AcsTables,
        rep: i32,
    ) -> Result<(), PaintError> {
        for _ in 0..rep.max(0) {
            self.addstr(s, attrs, acs)?;
        }
        Ok(())
    }

    pub fn addnstrrep(
        &mut self,
        s: &str,
        n: usize,
        attrs: Attrs,
        acs: &AcsTables,
        rep: i32,
    ) -> Result<(), PaintError> {
        for _ in 0..rep.max(0) {
            self.addnstr(s, n, attrs, acs)?;
        }
        Ok(())
    }

    pub fn addchrep(
        &mut self,
        c: char,
        attrs: Attrs,
        acs: &AcsTables,
        rep: i32,
    ) -> Result<(), PaintError> {
        for _ in 0..rep.max(0) {
            self.addch(c, attrs, acs)?;
        }
        Ok(())
    }

    /// Build the cell for one printable scalar, resolving the alternate
    /// character set: multi-byte characters never keep the ACS flag, and an
    /// index the terminal cannot draw is replaced by its ASCII fall-back.
    fn make_cell(&self, ch: char, w: u8, attrs: Attrs, acs: &AcsTables) -> Cell {
        let mut cell = Cell::new(ch, w, attrs);
        if attrs.flags.contains(AttrFlags::ACS) {
            if !ch.is_ascii() {
                cell.attrs.flags.remove(AttrFlags::ACS);
            } else if !acs.is_available(ch as u8) {
                cell = Cell::new(AcsTables::fallback(ch as u8) as char, w, attrs);
                cell.attrs.flags.remove(AttrFlags::ACS);
            }
        }
        cell
    }

    /// Place one cell at the paint cursor and advance it. Cells past the
    /// bottom or right edge are dropped; a cell that starts inside the
    /// window but does not fit blanks the remaining columns instead.
    pub(crate) fn add_cell(&mut self, cell: Cell) {
        if self.backing.is_none() || self.paint_y >= self.height || self.paint_x >= self.width {
            return;
        }
        let w = cell.width();
        if self.paint_x + w > self.width {
            let extra = self.width - self.paint_x;
            let blank = Cell::space(self.default_attrs);
            for _ in 0..extra {
                self.add_cell(blank.clone());
            }
            return;
        }
        let (col, gap_attrs, row) = (self.paint_x, self.default_attrs, self.paint_y as usize);
        if let Some(lines) = self.backing.as_mut() {
            lines[row].put_cell(col, cell, gap_attrs);
            self.paint_x += w;
        }
    }

    fn attach_mark(&mut self, mark: char) {
        if self.paint_y >= self.height || self.paint_x >= self.width {
            return;
        }
        let (col, row) = (self.paint_x, self.paint_y as usize);
        if let Some(lines) = self.backing.as_mut() {
            let mut buf = [0u8; 4];
            lines[row].attach_marks(col, mark.encode_utf8(&mut buf));
        }
    }

    /// Truncate the current row at the paint cursor.
    pub fn clrtoeol(&mut self) {
        if self.paint_y >= self.height {
            return;
        }
        let (col, attrs, row) = (self.paint_x, self.default_attrs, self.paint_y as usize);
        if let Some(lines) = self.backing.as_mut() {
            lines[row].clear_from(col, attrs);
        }
    }

    /// Truncate the current row at the paint cursor and empty every row
    /// below it.
    pub fn clrtobot(&mut self) {
        self.clrtoeol();
        let from = (self.paint_y + 1).max(0) as usize;
        if let Some(lines) = self.backing.as_mut() {
            for line in lines.iter_mut().skip(from) {
                line.clear();
            }
        }
    }

    /// Draw a box with the alternate character set.
    pub fn box_(
        &mut self,
        y: i32,
        x: i32,
        height: i32,
        width: i32,
        attrs: Attrs,
        acs: &AcsTables,
    ) -> Result<(), PaintError> {
        use core_cell::acs::{HLINE, LLCORNER, LRCORNER, ULCORNER, URCORNER, VLINE};

        if self.backing.is_none()
            || y < 0
            || x < 0
            || y >= self.height
            || y + height > self.height
            || x >= self.width
            || x + width > self.width
        {
            return Err(PaintError::OutOfBounds);
        }

        let mut attrs = attrs.combine(self.default_attrs);
        attrs.flags.insert(AttrFlags::ACS);

        self.set_paint(y, x);
        self.addch(ULCORNER, attrs, acs)?;
        self.addchrep(HLINE, attrs, acs, width - 2)?;
        self.addch(URCORNER, attrs, acs)?;
        for i in 1..height - 1 {
            self.set_paint(y + i, x);
            self.addch(VLINE, attrs, acs)?;
            self.set_paint(y + i, x + width - 1);
            self.addch(VLINE, attrs, acs)?;
        }
        self.set_paint(y + height - 1, x);
        self.addch(LLCORNER, attrs, acs)?;
        self.addchrep(HLINE, attrs, acs, width - 2)?;
        self.addch(LRCORNER, attrs, acs)?;
        Ok(())
    }

    pub(crate) fn resize(&mut self, height: i32, width: i32) -> Result<(), PaintError> {
        if height <= 0 || width <= 0 {
            return Err(PaintError::BadArg);
        }
        let pad_attrs = self.default_attrs;
        if let Some(lines) = self.backing.as_mut() {
            if (height as usize) < lines.len() {
                lines.truncate(height as usize);
            } else {
                lines.resize_with(height as usize, || Line::with_capacity(width));
            }
            if width < self.width {
                for line in lines.iter_mut() {
                    line.clear_from(width, pad_attrs);
                }
            }
        }
        self.height = height;
        self.width = width;
        Ok(())
    }

    pub(crate) fn move_to(&mut self, y: i32, x: i32) {
        self.y = y;
        self.x = x;
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        if let Some(lines) = self.backing.as_ref() {
            assert_eq!(lines.len(), self.height as usize);
            for line in lines {
                line.assert_invariants(self.width);
            }
        }
    }
}
