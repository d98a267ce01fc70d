//! The row diff & update engine.
//!
//! For every terminal row the engine swaps the previously composited line
//! aside, recomposites, and emits the smallest span of cells that changed:
//! scan from the right for the longest common suffix (only meaningful when
//! both rows cover the same columns), then from the left for the common
//! prefix, position the cursor once, and re-emit the cells in between with
//! minimal attribute transitions. A row whose `(len, hash)` snapshot
//! matches the previous frame skips the scans entirely; the length rides
//! along to keep collisions irrelevant in practice.
//!
//! When the new row is narrower than the old one the remainder is cleared
//! with `el`, or painted over with spaces when the terminal has none.
//! Back-color-erase terminals get an attribute reset first so the cleared
//! region is not tinted.

use std::hash::{Hash, Hasher};

use ahash::AHasher;
use core_cell::{AttrFlags, Attrs, Cell, Color};
use core_window::{Line, Screen};

use crate::emit::Emitter;

/// Draw callback for cells carrying the user attribute flag: receives the
/// cell and the output buffer and is expected to emit its own bytes.
pub type UserCallback = Box<dyn FnMut(&Cell, &mut Vec<u8>)>;

pub struct UpdateEngine {
    row_hashes: Vec<Option<(usize, u64)>>,
    user_callback: Option<UserCallback>,
}

impl UpdateEngine {
    pub fn new(rows: usize) -> Self {
        Self {
            row_hashes: vec![None; rows],
            user_callback: None,
        }
    }

    pub fn set_rows(&mut self, rows: usize) {
        self.row_hashes.clear();
        self.row_hashes.resize(rows, None);
    }

    /// Forget the previous frame; every row is rescanned on the next
    /// update.
    pub fn invalidate(&mut self) {
        for slot in &mut self.row_hashes {
            *slot = None;
        }
    }

    pub fn set_user_callback(&mut self, callback: Option<UserCallback>) {
        self.user_callback = callback;
    }

    fn line_hash(line: &Line) -> (usize, u64) {
        let mut hasher = AHasher::default();
        line.start().hash(&mut hasher);
        for cell in line.cells() {
            cell.hash(&mut hasher);
        }
        (line.len(), hasher.finish())
    }

    /// Recomposite row `row` and emit the difference against the previous
    /// frame. Returns true when anything was emitted.
    pub fn update_row(&mut self, screen: &mut Screen, emitter: &mut Emitter, row: i32) -> bool {
        let old = screen.take_term_line(row);
        screen.compose_row(row);
        let Some(new) = screen.term_line(row) else {
            return false;
        };

        let hash = Self::line_hash(new);
        if self.row_hashes.get(row as usize).copied().flatten() == Some(hash) {
            return false;
        }

        let columns = screen.columns();
        let acs = screen.acs();
        let new_cells = new.cells();
        let old_cells = old.cells();

        // Longest common suffix, only meaningful when the rows cover the
        // same columns.
        let mut new_idx = new_cells.len();
        let mut old_idx = old_cells.len();
        if old.width() == new.width() {
            while new_idx > 0 && old_idx > 0 && new_cells[new_idx - 1] == old_cells[old_idx - 1] {
                new_idx -= 1;
                old_idx -= 1;
            }
            if new_idx == 0 {
                self.store_hash(row, hash);
                return false;
            }
        }

        // Longest common prefix, tracking the display column.
        let mut j = 0usize;
        let mut width = 0i32;
        while j < new_idx && j < old_idx && new_cells[j] == old_cells[j] {
            width += new_cells[j].width();
            j += 1;
        }

        emitter.cup(row, width);

        let mut truncated = false;
        while j < new_idx {
            let cell = &new_cells[j];
            if width + cell.width() > columns {
                truncated = true;
                break;
            }
            width += cell.width();
            if cell.attrs.flags.contains(AttrFlags::USER) {
                if let Some(callback) = self.user_callback.as_mut() {
                    callback(cell, emitter.buffer_mut());
                    j += 1;
                    continue;
                }
            }
            if cell.attrs != emitter.current_attrs() {
                emitter.set_attrs(cell.attrs);
            }
            if cell.attrs.flags.contains(AttrFlags::ACS) {
                match cell.acs_byte() {
                    Some(index) => emitter.put_byte(acs.terminal_glyph(index)),
                    None => emitter.put_bytes(cell.cluster.as_bytes()),
                }
            } else {
                emitter.put_bytes(cell.cluster.as_bytes());
            }
            j += 1;
        }

        // Clear what the old, wider row left behind.
        if (new.width() < old.width() || truncated) && width < columns {
            let current = emitter.current_attrs();
            if emitter.strings().bce
                && (current.bg != Color::Unset || !current.flags.is_empty())
            {
                emitter.set_attrs(Attrs::NONE);
            }
            if !emitter.clear_to_eol() {
                let max = old.width().min(columns);
                while width < max {
                    emitter.put_byte(b' ');
                    width += 1;
                }
            }
        }

        self.store_hash(row, hash);
        true
    }

    fn store_hash(&mut self, row: i32, hash: (usize, u64)) {
        if let Some(slot) = self.row_hashes.get_mut(row as usize) {
            *slot = Some(hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::TermStrings;

    fn fixture() -> (Screen, Emitter, UpdateEngine) {
        let caps = TermStrings::ansi_fallback();
        let screen = Screen::new(2, 10, caps.acs_tables());
        let emitter = Emitter::new(caps);
        let engine = UpdateEngine::new(2);
        (screen, emitter, engine)
    }

    fn paint(screen: &mut Screen, text: &str) -> core_window::WindowId {
        let win = screen.new_window(None, 1, 10, 0, 0, 0).unwrap();
        screen.show(win).unwrap();
        screen.addstr(win, text, Attrs::NONE).unwrap();
        win
    }

    #[test]
    fn first_update_emits_full_row() {
        let (mut screen, mut emitter, mut engine) = fixture();
        paint(&mut screen, "hi");
        assert!(engine.update_row(&mut screen, &mut emitter, 0));
        assert_eq!(emitter.take(), b"\x1b[1;1Hhi");
        assert!(!engine.update_row(&mut screen, &mut emitter, 1));
        assert!(emitter.take().is_empty());
    }

    #[test]
    fn second_update_is_empty() {
        let (mut screen, mut emitter, mut engine) = fixture();
        paint(&mut screen, "hi");
        engine.update_row(&mut screen, &mut emitter, 0);
        let _ = emitter.take();
        assert!(!engine.update_row(&mut screen, &mut emitter, 0));
        assert!(emitter.take().is_empty());
    }

    #[test]
    fn changed_tail_repaints_from_first_difference() {
        let (mut screen, mut emitter, mut engine) = fixture();
        let win = paint(&mut screen, "hello");
        engine.update_row(&mut screen, &mut emitter, 0);
        let _ = emitter.take();
        screen.set_paint(win, 0, 3).unwrap();
        screen.addstr(win, "p!", Attrs::NONE).unwrap();
        assert!(engine.update_row(&mut screen, &mut emitter, 0));
        assert_eq!(emitter.take(), b"\x1b[1;4Hp!");
    }

    #[test]
    fn shortened_row_clears_to_eol() {
        let (mut screen, mut emitter, mut engine) = fixture();
        let win = paint(&mut screen, "hello");
        engine.update_row(&mut screen, &mut emitter, 0);
        let _ = emitter.take();
        screen.set_paint(win, 0, 2).unwrap();
        screen.clrtoeol(win).unwrap();
        assert!(engine.update_row(&mut screen, &mut emitter, 0));
        assert_eq!(emitter.take(), b"\x1b[1;3H\x1b[K");
    }

    #[test]
    fn missing_el_pads_with_spaces() {
        let mut caps = TermStrings::ansi_fallback();
        caps.el = None;
        caps.finish();
        let mut screen = Screen::new(1, 10, caps.acs_tables());
        let mut emitter = Emitter::new(caps);
        let mut engine = UpdateEngine::new(1);
        let win = paint(&mut screen, "hello");
        engine.update_row(&mut screen, &mut emitter, 0);
        let _ = emitter.take();
        screen.set_paint(win, 0, 2).unwrap();
        screen.clrtoeol(win).unwrap();
        engine.update_row(&mut screen, &mut emitter, 0);
        assert_eq!(emitter.take(), b"\x1b[1;3H   ");
    }

    #[test]
    fn attribute_run_switches_once() {
        let (mut screen, mut emitter, mut engine) = fixture();
        let win = screen.new_window(None, 1, 10, 0, 0, 0).unwrap();
        screen.show(win).unwrap();
        let red = Attrs::new(Color::Ansi(1), Color::Unset, AttrFlags::empty());
        screen.addstr(win, "ab", red).unwrap();
        engine.update_row(&mut screen, &mut emitter, 0);
        assert_eq!(emitter.take(), b"\x1b[1;1H\x1b[31mab");
    }

    #[test]
    fn acs_cells_emit_terminal_glyphs() {
        let (mut screen, mut emitter, mut engine) = fixture();
        let win = screen.new_window(None, 1, 10, 0, 0, 0).unwrap();
        screen.show(win).unwrap();
        let acs_attrs = Attrs::with_flags(AttrFlags::ACS);
        screen.addch(win, 'q', acs_attrs).unwrap();
        engine.update_row(&mut screen, &mut emitter, 0);
        // Entering ACS mode, then the mapped glyph byte.
        assert_eq!(emitter.take(), b"\x1b[1;1H\x1b[11mq");
    }

    #[test]
    fn user_flagged_cells_go_to_the_callback() {
        let (mut screen, mut emitter, mut engine) = fixture();
        let win = screen.new_window(None, 1, 10, 0, 0, 0).unwrap();
        screen.show(win).unwrap();
        screen
            .addstr(win, "x", Attrs::with_flags(AttrFlags::USER))
            .unwrap();
        engine.set_user_callback(Some(Box::new(|cell, out| {
            out.extend_from_slice(b"<");
            out.extend_from_slice(cell.cluster.as_bytes());
            out.extend_from_slice(b">");
        })));
        engine.update_row(&mut screen, &mut emitter, 0);
        assert_eq!(emitter.take(), b"\x1b[1;1H<x>");
    }

    #[test]
    fn invalidate_forces_reemission_check() {
        let (mut screen, mut emitter, mut engine) = fixture();
        paint(&mut screen, "hi");
        engine.update_row(&mut screen, &mut emitter, 0);
        let _ = emitter.take();
        engine.invalidate();
        // Content identical: the suffix scan still proves no difference.
        assert!(!engine.update_row(&mut screen, &mut emitter, 0));
        assert!(emitter.take().is_empty());
    }

    #[test]
    fn wide_character_diff_repaints_whole_cell() {
        let (mut screen, mut emitter, mut engine) = fixture();
        let win = screen.new_window(None, 1, 10, 0, 0, 0).unwrap();
        screen.show(win).unwrap();
        screen.addstr(win, "世x", Attrs::NONE).unwrap();
        engine.update_row(&mut screen, &mut emitter, 0);
        let _ = emitter.take();
        // Overwrite the right half of the wide character.
        screen.set_paint(win, 0, 1).unwrap();
        screen.addch(win, 'y', Attrs::NONE).unwrap();
        engine.update_row(&mut screen, &mut emitter, 0);
        // Cells: [space, y, x]; first difference is cell 0 at column 0.
        assert_eq!(emitter.take(), b"\x1b[1;1H y");
    }
}
