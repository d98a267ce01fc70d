//! Cell-level primitives shared by the painter, the compositor and the
//! terminal update engine.
//!
//! A `Cell` stores one *character*: a base scalar plus any combining marks
//! attached to it, its column width (1 or 2), and its display attributes.
//! Standalone zero-width cells are never stored; a combining mark always
//! lives inside the cluster of the cell it modifies. This keeps the sparse
//! line store free of continuation slots: a line's cell count is its
//! character count and its column width is the plain sum of cell widths.
//!
//! Invariants:
//! - `width` is 1 or 2; a cluster is non-empty and starts with its base
//!   scalar.
//! - Attribute equality is plain value equality; the update engine relies on
//!   `Cell: PartialEq + Hash` for its row diff and row-skip hashing.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

pub mod acs;

pub use acs::AcsTables;

bitflags! {
    /// Display attribute flags carried by every cell.
    ///
    /// `ACS` marks a cell whose base byte indexes the terminal's alternate
    /// character set. `USER` marks cells handed to the application's draw
    /// callback instead of being emitted by the update engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u16 {
        const UNDERLINE = 1 << 0;
        const BOLD      = 1 << 1;
        const REVERSE   = 1 << 2;
        const BLINK     = 1 << 3;
        const DIM       = 1 << 4;
        const ACS       = 1 << 5;
        const USER      = 1 << 6;
    }
}

impl AttrFlags {
    /// The mode-setting attributes a terminal toggles independently of color.
    pub const BASIC: AttrFlags = AttrFlags::UNDERLINE
        .union(AttrFlags::BOLD)
        .union(AttrFlags::REVERSE)
        .union(AttrFlags::BLINK)
        .union(AttrFlags::DIM)
        .union(AttrFlags::ACS);
}

/// One color slot. `Unset` means "no color requested" and combines
/// transparently; `Default` is an explicit request for the terminal's
/// default color (distinct from `Unset` only until emission).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Unset,
    /// ANSI color 0..=7.
    Ansi(u8),
    Default,
}

impl Color {
    /// Parameter for `setaf`/`setab` (and the ANSI fast path, where the
    /// digit lands after '3' or '4'). The default slot maps to 9, which
    /// yields the `39`/`49` "default color" codes.
    pub fn ansi_index(self) -> i32 {
        match self {
            Color::Ansi(n) => i32::from(n & 7),
            Color::Unset | Color::Default => 9,
        }
    }

    /// Parameter for the legacy `setf`/`setb` strings, which use a
    /// different ordering (blue and red swapped).
    pub fn alt_index(self) -> i32 {
        const ALT: [i32; 8] = [0, 4, 2, 6, 1, 5, 3, 7];
        match self {
            Color::Ansi(n) => ALT[usize::from(n & 7)],
            Color::Unset | Color::Default => 0,
        }
    }

    pub fn is_set(self) -> bool {
        self != Color::Unset
    }
}

/// Display attributes: foreground and background color plus mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attrs {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl Attrs {
    pub const NONE: Attrs = Attrs {
        fg: Color::Unset,
        bg: Color::Unset,
        flags: AttrFlags::empty(),
    };

    pub fn new(fg: Color, bg: Color, flags: AttrFlags) -> Self {
        Self { fg, bg, flags }
    }

    pub fn with_flags(flags: AttrFlags) -> Self {
        Self {
            flags,
            ..Self::NONE
        }
    }

    /// Combine with `base`, `self` taking priority: flags are unioned and a
    /// color slot of `base` shows through only where `self` leaves it unset.
    pub fn combine(self, base: Attrs) -> Attrs {
        Attrs {
            fg: if self.fg.is_set() { self.fg } else { base.fg },
            bg: if self.bg.is_set() { self.bg } else { base.bg },
            flags: self.flags | base.flags,
        }
    }

    pub fn is_plain(self) -> bool {
        self == Self::NONE
    }
}

/// One stored character: base scalar plus trailing combining marks, column
/// width, display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Base scalar followed by any combining marks attached to it.
    pub cluster: String,
    /// Column width, 1 or 2.
    pub width: u8,
    pub attrs: Attrs,
}

impl Cell {
    pub fn new(base: char, width: u8, attrs: Attrs) -> Self {
        debug_assert!(width >= 1 && width <= 2);
        Self {
            cluster: base.to_string(),
            width,
            attrs,
        }
    }

    /// A single-column space cell, as used for gap filling and for the
    /// remnants of partially overwritten wide characters.
    pub fn space(attrs: Attrs) -> Self {
        Self::new(' ', 1, attrs)
    }

    pub fn width(&self) -> i32 {
        i32::from(self.width)
    }

    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Attach a combining mark to this cell.
    pub fn push_mark(&mut self, mark: char) {
        self.cluster.push(mark);
    }

    /// The base scalar of the cluster.
    pub fn base(&self) -> char {
        self.cluster.chars().next().unwrap_or(' ')
    }

    /// The ACS index byte, when the cluster is a single ASCII scalar.
    pub fn acs_byte(&self) -> Option<u8> {
        let mut chars = self.cluster.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Some(c as u8),
            _ => None,
        }
    }
}

/// Column width of one scalar: `Some(0)` for combining marks, `Some(1)` /
/// `Some(2)` for spacing characters, `None` for non-printables.
pub fn char_width(c: char) -> Option<u8> {
    c.width().map(|w| w.min(2) as u8)
}

/// Column width of a string on the terminal, skipping non-printable
/// scalars the way the painter does.
pub fn str_width(s: &str) -> i32 {
    s.chars()
        .filter_map(char_width)
        .map(i32::from)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_prefers_priority_colors() {
        let a = Attrs::new(Color::Ansi(1), Color::Unset, AttrFlags::BOLD);
        let b = Attrs::new(Color::Ansi(2), Color::Ansi(4), AttrFlags::UNDERLINE);
        let c = a.combine(b);
        assert_eq!(c.fg, Color::Ansi(1));
        assert_eq!(c.bg, Color::Ansi(4));
        assert_eq!(c.flags, AttrFlags::BOLD | AttrFlags::UNDERLINE);
    }

    #[test]
    fn default_color_is_distinct_from_unset_until_emission() {
        let explicit = Attrs::new(Color::Default, Color::Unset, AttrFlags::empty());
        let implicit = Attrs::NONE;
        assert_ne!(explicit, implicit);
        assert_eq!(explicit.fg.ansi_index(), implicit.fg.ansi_index());
    }

    #[test]
    fn width_classification() {
        assert_eq!(char_width('a'), Some(1));
        assert_eq!(char_width('世'), Some(2));
        assert_eq!(char_width('\u{0301}'), Some(0));
        assert_eq!(char_width('\x01'), None);
        assert_eq!(str_width("a世b"), 4);
        assert_eq!(str_width("a\x01b"), 2);
    }

    #[test]
    fn cluster_marks_accumulate() {
        let mut cell = Cell::new('e', 1, Attrs::NONE);
        cell.push_mark('\u{0301}');
        assert_eq!(cell.cluster, "e\u{0301}");
        assert_eq!(cell.base(), 'e');
        assert_eq!(cell.width(), 1);
        assert_eq!(cell.acs_byte(), None);
    }
}
