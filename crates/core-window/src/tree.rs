//! The window tree: arena storage, depth-ordered sibling lists, anchor
//! resolution and visibility.
//!
//! Windows are stored in an arena and addressed by copyable [`WindowId`]
//! handles; sibling order within a parent (and among the roots) is kept
//! sorted by depth, with a new window placed after existing siblings of
//! equal depth. Draw order visits deepest windows first so that the
//! compositor's later paints win: the deepest descendant of the deepest
//! root is painted first, then its preceding siblings, then each ancestor
//! after its children.
//!
//! Deleting a window leaves its children in place with a dangling parent
//! handle; such windows are treated as hidden until the application deletes
//! them too.

use crate::PaintError;
use crate::window::Window;

/// Opaque handle to a window stored in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub(crate) usize);

/// A corner of a window rectangle, as used by anchor relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Corner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }

    fn is_bottom(self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::BottomRight)
    }
}

/// How a window is positioned against its anchor: `x`/`y` offsets are
/// measured from the anchor's corner to the window's own corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Relation {
    pub anchor_corner: Corner,
    pub own_corner: Corner,
}

impl Relation {
    pub fn new(anchor_corner: Corner, own_corner: Corner) -> Self {
        Self {
            anchor_corner,
            own_corner,
        }
    }
}

#[derive(Default)]
pub struct WindowArena {
    slots: Vec<Option<Window>>,
    free: Vec<usize>,
    roots: Vec<WindowId>,
}

impl WindowArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    pub(crate) fn try_get(&self, id: WindowId) -> Result<&Window, PaintError> {
        self.get(id).ok_or(PaintError::BadHandle)
    }

    pub(crate) fn try_get_mut(&mut self, id: WindowId) -> Result<&mut Window, PaintError> {
        self.get_mut(id).ok_or(PaintError::BadHandle)
    }

    /// Store a window and link it into its sibling list.
    pub fn insert(&mut self, mut win: Window) -> WindowId {
        let parent = win.parent;
        // A window is anchored to its parent until told otherwise.
        win.anchor = parent;
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(win);
                WindowId(slot)
            }
            None => {
                self.slots.push(Some(win));
                WindowId(self.slots.len() - 1)
            }
        };
        self.link(id, parent);
        id
    }

    /// Unlink a window and drop it. Children stay behind with a dangling
    /// parent handle.
    pub fn remove(&mut self, id: WindowId) {
        if self.get(id).is_none() {
            return;
        }
        self.unlink(id);
        self.slots[id.0] = None;
        self.free.push(id.0);
    }

    pub fn set_depth(&mut self, id: WindowId, depth: i32) -> Result<(), PaintError> {
        let parent = {
            let win = self.try_get_mut(id)?;
            win.depth = depth;
            win.parent
        };
        self.unlink(id);
        self.link(id, parent);
        Ok(())
    }

    fn sibling_list(&mut self, parent: Option<WindowId>) -> Option<&mut Vec<WindowId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(pid) => self.get_mut(pid).map(|p| &mut p.children),
        }
    }

    fn link(&mut self, id: WindowId, parent: Option<WindowId>) {
        let depth = match self.get(id) {
            Some(win) => win.depth,
            None => return,
        };
        let depth_of = |slots: &[Option<Window>], wid: WindowId| {
            slots
                .get(wid.0)
                .and_then(|s| s.as_ref())
                .map(|w| w.depth)
                .unwrap_or(i32::MAX)
        };
        // Collect the insertion point first; `slots` and the sibling list
        // cannot be borrowed at once.
        let pos = {
            let list = match parent {
                None => &self.roots,
                Some(pid) => match self.get(pid) {
                    Some(p) => &p.children,
                    None => return,
                },
            };
            list.partition_point(|wid| depth_of(&self.slots, *wid) <= depth)
        };
        if let Some(list) = self.sibling_list(parent) {
            list.insert(pos, id);
        }
    }

    fn unlink(&mut self, id: WindowId) {
        let parent = match self.get(id) {
            Some(win) => win.parent,
            None => return,
        };
        if let Some(list) = self.sibling_list(parent) {
            list.retain(|wid| *wid != id);
        }
    }

    /// Re-anchor a window. Anchoring to nothing requires the top-left /
    /// top-left relation; anchor chains must stay acyclic.
    pub fn set_anchor(
        &mut self,
        id: WindowId,
        anchor: Option<WindowId>,
        relation: Relation,
    ) -> Result<(), PaintError> {
        self.try_get(id)?;
        match anchor {
            None => {
                if relation != Relation::default() {
                    return Err(PaintError::BadArg);
                }
            }
            Some(aid) => {
                self.try_get(aid)?;
                // Walk the anchor chain from the proposed anchor; finding
                // ourselves there would close a cycle.
                let mut cursor = Some(aid);
                while let Some(cid) = cursor {
                    if cid == id {
                        return Err(PaintError::BadArg);
                    }
                    cursor = self.get(cid).and_then(|w| w.anchor);
                }
            }
        }
        let win = self.try_get_mut(id)?;
        win.anchor = anchor;
        win.relation = relation;
        Ok(())
    }

    /// Absolute column of the window's left edge.
    pub fn abs_x(&self, id: WindowId) -> i32 {
        let Some(win) = self.get(id) else { return 0 };
        let anchor = win.anchor.filter(|aid| self.get(*aid).is_some());
        let base = match (win.relation.anchor_corner.is_right(), anchor) {
            (false, Some(aid)) => win.x + self.abs_x(aid),
            (false, None) => win.x,
            (true, Some(aid)) => {
                self.abs_x(aid) + self.get(aid).map(|a| a.width).unwrap_or(0) + win.x
            }
            // A right-corner relation without an anchor cannot be set.
            (true, None) => win.x,
        };
        if win.relation.own_corner.is_right() {
            base - win.width
        } else {
            base
        }
    }

    /// Absolute row of the window's top edge.
    pub fn abs_y(&self, id: WindowId) -> i32 {
        let Some(win) = self.get(id) else { return 0 };
        let anchor = win.anchor.filter(|aid| self.get(*aid).is_some());
        let base = match (win.relation.anchor_corner.is_bottom(), anchor) {
            (false, Some(aid)) => win.y + self.abs_y(aid),
            (false, None) => win.y,
            (true, Some(aid)) => {
                self.abs_y(aid) + self.get(aid).map(|a| a.height).unwrap_or(0) + win.y
            }
            (true, None) => win.y,
        };
        if win.relation.own_corner.is_bottom() {
            base - win.height
        } else {
            base
        }
    }

    /// A window is visible only when it and every clipping ancestor are
    /// shown; a dangling parent handle hides the subtree.
    pub fn effectively_visible(&self, id: WindowId) -> bool {
        let mut cursor = Some(id);
        while let Some(cid) = cursor {
            match self.get(cid) {
                Some(win) if win.shown => cursor = win.parent,
                _ => return false,
            }
        }
        true
    }

    /// Window ids in painting order: deepest (bottom-most) first, so a
    /// later paint overwrites an earlier one.
    pub fn draw_order(&self) -> Vec<WindowId> {
        let mut order = Vec::new();
        self.visit_back_to_front(&self.roots, &mut order);
        order
    }

    fn visit_back_to_front(&self, list: &[WindowId], out: &mut Vec<WindowId>) {
        for id in list.iter().rev() {
            if let Some(win) = self.get(*id) {
                self.visit_back_to_front(&win.children, out);
                out.push(*id);
            }
        }
    }
}
