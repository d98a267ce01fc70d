//! The screen: one window arena, the scratch terminal window the compositor
//! paints into, and the ACS tables painting consults.
//!
//! This is the application-facing surface of the window layer. The terminal
//! crate owns a `Screen`, drives `compose_row` during updates, and diffs the
//! scratch rows against the previously emitted frame.

use core_cell::{AcsTables, Attrs};

use crate::line::Line;
use crate::tree::{Relation, WindowArena, WindowId};
use crate::window::Window;
use crate::{PaintError, compose};

pub struct Screen {
    arena: WindowArena,
    term: Window,
    acs: AcsTables,
}

impl Screen {
    pub fn new(lines: i32, columns: i32, acs: AcsTables) -> Self {
        Self {
            arena: WindowArena::new(),
            term: Window::new(lines.max(1), columns.max(1), 0, 0, 0, true),
            acs,
        }
    }

    pub fn acs(&self) -> &AcsTables {
        &self.acs
    }

    pub fn lines(&self) -> i32 {
        self.term.height()
    }

    pub fn columns(&self) -> i32 {
        self.term.width()
    }

    /// Create a window with a backing store. `parent`, when given, both
    /// clips the new window and serves as its initial anchor.
    pub fn new_window(
        &mut self,
        parent: Option<WindowId>,
        height: i32,
        width: i32,
        y: i32,
        x: i32,
        depth: i32,
    ) -> Result<WindowId, PaintError> {
        self.create_window(parent, height, width, y, x, depth, true)
    }

    /// Create a window without a backing store; it cannot be drawn on and
    /// exists only to position other windows.
    pub fn new_unbacked(
        &mut self,
        parent: Option<WindowId>,
        height: i32,
        width: i32,
        y: i32,
        x: i32,
        depth: i32,
    ) -> Result<WindowId, PaintError> {
        self.create_window(parent, height, width, y, x, depth, false)
    }

    fn create_window(
        &mut self,
        parent: Option<WindowId>,
        height: i32,
        width: i32,
        y: i32,
        x: i32,
        depth: i32,
        backed: bool,
    ) -> Result<WindowId, PaintError> {
        if height <= 0 || width <= 0 {
            return Err(PaintError::BadArg);
        }
        if let Some(pid) = parent {
            self.arena.try_get(pid)?;
        }
        let mut win = Window::new(height, width, y, x, depth, backed);
        win.parent = parent;
        Ok(self.arena.insert(win))
    }

    /// Destroy a window. Its children are not destroyed with it; they stay
    /// hidden until deleted by the application.
    pub fn del_window(&mut self, id: WindowId) {
        self.arena.remove(id);
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.arena.get(id)
    }

    pub fn resize_window(&mut self, id: WindowId, height: i32, width: i32) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.resize(height, width)
    }

    pub fn move_window(&mut self, id: WindowId, y: i32, x: i32) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.move_to(y, x);
        Ok(())
    }

    pub fn set_depth(&mut self, id: WindowId, depth: i32) -> Result<(), PaintError> {
        self.arena.set_depth(id, depth)
    }

    pub fn set_anchor(
        &mut self,
        id: WindowId,
        anchor: Option<WindowId>,
        relation: Relation,
    ) -> Result<(), PaintError> {
        self.arena.set_anchor(id, anchor, relation)
    }

    pub fn set_default_attrs(&mut self, id: WindowId, attrs: Attrs) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.default_attrs = attrs;
        Ok(())
    }

    pub fn show(&mut self, id: WindowId) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.shown = true;
        Ok(())
    }

    pub fn hide(&mut self, id: WindowId) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.shown = false;
        Ok(())
    }

    pub fn set_paint(&mut self, id: WindowId, y: i32, x: i32) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.set_paint(y, x);
        Ok(())
    }

    pub fn abs_x(&self, id: WindowId) -> Result<i32, PaintError> {
        self.arena.try_get(id)?;
        Ok(self.arena.abs_x(id))
    }

    pub fn abs_y(&self, id: WindowId) -> Result<i32, PaintError> {
        self.arena.try_get(id)?;
        Ok(self.arena.abs_y(id))
    }

    pub fn relation(&self, id: WindowId) -> Result<(Option<WindowId>, Relation), PaintError> {
        Ok(self.arena.try_get(id)?.relation())
    }

    pub fn effectively_visible(&self, id: WindowId) -> bool {
        self.arena.effectively_visible(id)
    }

    pub fn addstr(&mut self, id: WindowId, s: &str, attrs: Attrs) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.addstr(s, attrs, acs)
    }

    pub fn addnstr(
        &mut self,
        id: WindowId,
        s: &str,
        n: usize,
        attrs: Attrs,
    ) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.addnstr(s, n, attrs, acs)
    }

    pub fn addch(&mut self, id: WindowId, c: char, attrs: Attrs) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.addch(c, attrs, acs)
    }

    pub fn addstrrep(
        &mut self,
        id: WindowId,
        s: &str,
        attrs: Attrs,
        rep: i32,
    ) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.addstrrep(s, attrs, acs, rep)
    }

    pub fn addnstrrep(
        &mut self,
        id: WindowId,
        s: &str,
        n: usize,
        attrs: Attrs,
        rep: i32,
    ) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.addnstrrep(s, n, attrs, acs, rep)
    }

    pub fn addchrep(
        &mut self,
        id: WindowId,
        c: char,
        attrs: Attrs,
        rep: i32,
    ) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.addchrep(c, attrs, acs, rep)
    }

    pub fn clrtoeol(&mut self, id: WindowId) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.clrtoeol();
        Ok(())
    }

    pub fn clrtobot(&mut self, id: WindowId) -> Result<(), PaintError> {
        self.arena.try_get_mut(id)?.clrtobot();
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn box_(
        &mut self,
        id: WindowId,
        y: i32,
        x: i32,
        height: i32,
        width: i32,
        attrs: Attrs,
    ) -> Result<(), PaintError> {
        let acs = &self.acs;
        self.arena.try_get_mut(id)?.box_(y, x, height, width, attrs, acs)
    }

    /// Recomposite one scratch terminal row from all visible windows.
    pub fn compose_row(&mut self, row: i32) {
        compose::compose_row(&self.arena, &mut self.term, row);
    }

    /// The scratch terminal window holding the last composited frame.
    pub fn term(&self) -> &Window {
        &self.term
    }

    pub fn term_line(&self, row: i32) -> Option<&Line> {
        self.term.line(row)
    }

    /// Move a scratch row out, leaving it empty; the update engine swaps
    /// the previous frame's row aside before recompositing.
    pub fn take_term_line(&mut self, row: i32) -> Line {
        if row < 0 {
            return Line::default();
        }
        self.term
            .backing
            .as_mut()
            .and_then(|lines| lines.get_mut(row as usize))
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Blank the whole scratch frame so the next update repaints fully.
    pub fn clear_term(&mut self) {
        self.term.set_paint(0, 0);
        self.term.clrtobot();
    }

    pub fn resize_term(&mut self, lines: i32, columns: i32) -> Result<(), PaintError> {
        self.term.resize(lines, columns)
    }
}
