//! Flatten all visible windows into one row of the scratch terminal window.
//!
//! Windows are painted bottom-to-top (deepest first) so that later paints
//! overwrite earlier ones; a window only covers the columns its sparse row
//! actually stores, unless its default attributes are set, in which case the
//! whole window rectangle is filled. Clipping ancestors bound each window's
//! visible rectangle; a wide character cut by a clip boundary degrades to a
//! space carrying its attributes so that attribute runs stay correct for
//! the diff.
//!
//! The composited row is forced to start at column zero (a plain space is
//! painted there when needed) so the update engine can treat stored cell
//! indices and screen columns as congruent.

use core_cell::{Attrs, Cell};

use crate::tree::WindowArena;
use crate::window::Window;

fn paint_spaces(term: &mut Window, attrs: Attrs, count: i32) {
    for _ in 0..count.max(0) {
        term.add_cell(Cell::space(attrs));
    }
}

/// Recomposite row `row` of the scratch terminal window from every
/// effectively visible backed window.
pub fn compose_row(arena: &WindowArena, term: &mut Window, row: i32) {
    if row < 0 || row >= term.height() {
        return;
    }
    term.set_paint(row, 0);
    if let Some(lines) = term.backing.as_mut() {
        lines[row as usize].clear();
    }

    for id in arena.draw_order() {
        let Some(win) = arena.get(id) else { continue };
        if !win.is_backed() || !arena.effectively_visible(id) {
            continue;
        }

        // Visible rectangle: intersection of all clipping ancestors, never
        // left of the terminal origin.
        let mut clip_x0 = 0i32;
        let mut clip_x1 = i32::MAX;
        let mut clip_y0 = 0i32;
        let mut clip_y1 = i32::MAX;
        let mut p = win.parent;
        while let Some(pid) = p {
            let Some(pw) = arena.get(pid) else { break };
            let ax = arena.abs_x(pid);
            let ay = arena.abs_y(pid);
            clip_x0 = clip_x0.max(ax);
            clip_x1 = clip_x1.min(ax + pw.width());
            clip_y0 = clip_y0.max(ay);
            clip_y1 = clip_y1.min(ay + pw.height());
            p = pw.parent;
        }

        let y = arena.abs_y(id);
        if y > row || y + win.height() <= row || row < clip_y0 || row >= clip_y1 {
            continue;
        }
        let Some(line) = win.line(row - y) else {
            continue;
        };
        let x = arena.abs_x(id);
        if x >= clip_x1 || x + line.start() + line.width() < clip_x0 {
            continue;
        }

        let default_attrs = win.default_attrs();
        let line_start = line.start();
        let line_width = line.width();
        let win_width = win.width();
        let cells = line.cells();
        let mut data_start = 0usize;

        if x + line_start >= clip_x0 {
            // The leading gap is visible: either skip over it or, when the
            // window has default attributes, fill it.
            let lead = if x + line_start > clip_x1 {
                clip_x1 - x
            } else {
                line_start
            };
            if default_attrs.is_plain() {
                term.set_paint(row, x + lead);
            } else if x >= clip_x0 {
                term.set_paint(row, x);
                paint_spaces(term, default_attrs, lead);
            } else {
                term.set_paint(row, clip_x0);
                paint_spaces(term, default_attrs, lead - (clip_x0 - x));
            }
        } else {
            // The left clip boundary cuts into stored cells.
            term.set_paint(row, clip_x0);
            let mut col = x + line_start;
            while data_start < cells.len() && col + cells[data_start].width() <= clip_x0 {
                col += cells[data_start].width();
                data_start += 1;
            }
            if data_start < cells.len() && col < clip_x0 {
                // A wide character straddles the boundary.
                term.add_cell(Cell::space(cells[data_start].attrs));
                data_start += 1;
            }
        }

        // Copy cells while they fit inside the right clip boundary.
        let mut col = term.paint_x;
        let mut end = data_start;
        while end < cells.len() && col + cells[end].width() <= clip_x1 {
            col += cells[end].width();
            end += 1;
        }
        for cell in &cells[data_start..end] {
            term.add_cell(cell.clone());
        }
        if end < cells.len() && col == clip_x1 - 1 {
            // A wide character is cut by the right boundary.
            term.add_cell(Cell::space(cells[end].attrs));
        }

        // Background-fill to the window's right edge.
        if !default_attrs.is_plain()
            && line_start + line_width < win_width
            && x + line_start + line_width < clip_x1
        {
            let rep = if x + win_width <= clip_x1 {
                win_width - line_start - line_width
            } else {
                clip_x1 - x - line_start - line_width
            };
            paint_spaces(term, default_attrs, rep);
        }
    }

    // Anchor the composited row at column zero for the diff.
    let start = term.line(row).map(|l| l.start()).unwrap_or(0);
    if start != 0 {
        term.set_paint(row, 0);
        term.add_cell(Cell::space(Attrs::NONE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_cell::{AcsTables, AttrFlags, Color};

    fn acs() -> AcsTables {
        AcsTables::empty()
    }

    fn term(width: i32) -> Window {
        let mut t = Window::new(1, width, 0, 0, 0, true);
        t.shown = true;
        t
    }

    fn add_root(arena: &mut WindowArena, width: i32, x: i32, depth: i32) -> crate::WindowId {
        let mut w = Window::new(1, width, 0, x, depth, true);
        w.shown = true;
        arena.insert(w)
    }

    fn row_text(t: &Window) -> String {
        t.line(0)
            .map(|l| l.cells().iter().map(|c| c.cluster.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn deeper_window_is_overwritten() {
        let mut arena = WindowArena::new();
        let below = add_root(&mut arena, 5, 0, 10);
        let above = add_root(&mut arena, 5, 0, 0);
        arena
            .get_mut(below)
            .unwrap()
            .addstr("AAAAA", Attrs::NONE, &acs())
            .unwrap();
        let w = arena.get_mut(above).unwrap();
        w.set_paint(0, 1);
        w.addstr("bb", Attrs::NONE, &acs()).unwrap();

        let mut t = term(5);
        compose_row(&arena, &mut t, 0);
        assert_eq!(row_text(&t), "AbbAA");
    }

    #[test]
    fn hidden_window_is_skipped() {
        let mut arena = WindowArena::new();
        let below = add_root(&mut arena, 5, 0, 10);
        let above = add_root(&mut arena, 5, 0, 0);
        arena
            .get_mut(below)
            .unwrap()
            .addstr("AAAAA", Attrs::NONE, &acs())
            .unwrap();
        arena
            .get_mut(above)
            .unwrap()
            .addstr("bb", Attrs::NONE, &acs())
            .unwrap();
        arena.get_mut(above).unwrap().shown = false;

        let mut t = term(5);
        compose_row(&arena, &mut t, 0);
        assert_eq!(row_text(&t), "AAAAA");
    }

    #[test]
    fn child_clipped_by_parent() {
        let mut arena = WindowArena::new();
        let parent = add_root(&mut arena, 5, 0, 0);
        let mut child = Window::new(1, 4, 0, 3, 0, true);
        child.shown = true;
        child.parent = Some(parent);
        let child = arena.insert(child);
        arena
            .get_mut(child)
            .unwrap()
            .addstr("WXYZ", Attrs::NONE, &acs())
            .unwrap();

        let mut t = term(10);
        compose_row(&arena, &mut t, 0);
        // Only W and X fall inside the parent; the row is re-anchored at
        // column zero with filler spaces.
        assert_eq!(row_text(&t), "   WX");
        assert_eq!(t.line(0).unwrap().start(), 0);
    }

    #[test]
    fn left_clip_inside_wide_char_leaves_attributed_space() {
        let mut arena = WindowArena::new();
        let parent = add_root(&mut arena, 4, 2, 0);
        let mut child = Window::new(1, 6, 0, -1, 0, true);
        child.shown = true;
        child.parent = Some(parent);
        let child = arena.insert(child);
        let red = Attrs::new(Color::Ansi(1), Color::Unset, AttrFlags::empty());
        arena
            .get_mut(child)
            .unwrap()
            .addstr("世ab", red, &acs())
            .unwrap();

        let mut t = term(10);
        compose_row(&arena, &mut t, 0);
        // Child starts at absolute column 1; the parent clips at column 2,
        // splitting the wide character: its right column becomes a space
        // with the character's attributes.
        let line = t.line(0).unwrap();
        assert_eq!(row_text(&t), "   ab");
        assert_eq!(line.cells()[2].attrs, red);
    }

    #[test]
    fn default_attrs_fill_whole_window() {
        let mut arena = WindowArena::new();
        let id = add_root(&mut arena, 4, 1, 0);
        let blue_bg = Attrs::new(Color::Unset, Color::Ansi(4), AttrFlags::empty());
        arena.get_mut(id).unwrap().default_attrs = blue_bg;
        let w = arena.get_mut(id).unwrap();
        w.set_paint(0, 1);
        w.addstr("x", Attrs::NONE, &acs()).unwrap();

        let mut t = term(10);
        compose_row(&arena, &mut t, 0);
        let line = t.line(0).unwrap();
        // Columns 1..5 belong to the window: lead fill, 'x', tail fill.
        assert_eq!(row_text(&t), "  x  ");
        assert_eq!(line.cells()[1].attrs, blue_bg);
        assert_eq!(line.cells()[4].attrs, blue_bg);
        // The alignment space at column 0 is plain.
        assert_eq!(line.cells()[0].attrs, Attrs::NONE);
    }

    #[test]
    fn window_off_screen_left_is_clipped_at_origin() {
        let mut arena = WindowArena::new();
        let id = add_root(&mut arena, 6, -2, 0);
        arena
            .get_mut(id)
            .unwrap()
            .addstr("abcdef", Attrs::NONE, &acs())
            .unwrap();

        let mut t = term(10);
        compose_row(&arena, &mut t, 0);
        let line = t.line(0).unwrap();
        assert_eq!(row_text(&t), "cdef");
        assert_eq!(line.start(), 0);
    }

    #[test]
    fn unbacked_window_never_paints() {
        let mut arena = WindowArena::new();
        let mut w = Window::new(1, 5, 0, 0, 0, false);
        w.shown = true;
        arena.insert(w);
        let mut t = term(5);
        compose_row(&arena, &mut t, 0);
        assert!(t.line(0).unwrap().is_empty());
    }
}
