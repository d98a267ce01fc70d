//! Attribute and cursor emission into an in-memory byte buffer.
//!
//! The emitter owns the capability snapshot, the buffer, and the one piece
//! of mutable terminal state that matters for correctness: the attribute
//! set the terminal currently displays. Every transition goes through
//! [`Emitter::set_attrs`], which picks the cheapest correct path:
//! - a single composed `\x1b[..m` sequence for ANSI-covered changes,
//! - individual terminfo strings otherwise,
//! - a full reset first when an attribute is being turned off that the
//!   terminal can only clear by resetting everything, re-applying what
//!   should remain.
//!
//! Terminfo `$<..>` delay padding is stripped on output.

use core_cell::{AttrFlags, Attrs, Color};
use terminfo::expand;

use crate::caps::TermStrings;

pub struct Emitter {
    strings: TermStrings,
    attrs: Attrs,
    out: Vec<u8>,
}

impl Emitter {
    pub fn new(strings: TermStrings) -> Self {
        Self {
            strings,
            attrs: Attrs::NONE,
            out: Vec::with_capacity(4096),
        }
    }

    pub fn strings(&self) -> &TermStrings {
        &self.strings
    }

    /// The attribute set currently displayed by the terminal.
    pub fn current_attrs(&self) -> Attrs {
        self.attrs
    }

    pub fn buffer(&self) -> &[u8] {
        &self.out
    }

    /// Direct buffer access for application draw callbacks.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.out
    }

    /// Drain the buffer for writing to the terminal.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    fn putp_into(out: &mut Vec<u8>, s: &[u8]) {
        let mut i = 0;
        while i < s.len() {
            if s[i] == b'$' && i + 1 < s.len() && s[i + 1] == b'<' {
                if let Some(close) = s[i..].iter().position(|&b| b == b'>') {
                    i += close + 1;
                    continue;
                }
            }
            out.push(s[i]);
            i += 1;
        }
    }

    /// Emit a terminfo string, stripping delay padding.
    pub fn putp(&mut self, s: &[u8]) {
        Self::putp_into(&mut self.out, s);
    }

    fn putp_cap(&mut self, cap: fn(&TermStrings) -> &Option<Vec<u8>>) {
        if let Some(s) = cap(&self.strings) {
            Self::putp_into(&mut self.out, s);
        }
    }

    /// Raw character bytes, no padding interpretation.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    pub fn put_byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    /// Move the cursor, falling back from `cup` to `vpa`/`hpa` to `home`
    /// plus stepping.
    pub fn cup(&mut self, line: i32, col: i32) {
        if let Some(cup) = &self.strings.cup {
            if let Ok(bytes) = expand!(&cup[..]; line, col) {
                Self::putp_into(&mut self.out, &bytes);
            }
            return;
        }
        if let (Some(vpa), Some(hpa)) = (&self.strings.vpa, &self.strings.hpa) {
            if let Ok(bytes) = expand!(&vpa[..]; line) {
                Self::putp_into(&mut self.out, &bytes);
            }
            if let Ok(bytes) = expand!(&hpa[..]; col) {
                Self::putp_into(&mut self.out, &bytes);
            }
            return;
        }
        if let Some(home) = &self.strings.home {
            Self::putp_into(&mut self.out, home);
            if line > 0 {
                if let Some(cud) = &self.strings.cud {
                    if let Ok(bytes) = expand!(&cud[..]; line) {
                        Self::putp_into(&mut self.out, &bytes);
                    }
                } else if let Some(cud1) = &self.strings.cud1 {
                    for _ in 0..line {
                        Self::putp_into(&mut self.out, cud1);
                    }
                }
            }
            if col > 0 {
                if let Some(cuf) = &self.strings.cuf {
                    if let Ok(bytes) = expand!(&cuf[..]; col) {
                        Self::putp_into(&mut self.out, &bytes);
                    }
                } else if let Some(cuf1) = &self.strings.cuf1 {
                    for _ in 0..col {
                        Self::putp_into(&mut self.out, cuf1);
                    }
                }
            }
        }
    }

    /// Enter cursor-positioning (alternate screen) mode; `clear` stands in
    /// when the terminal has no `smcup`.
    pub fn enter_ca_mode(&mut self) {
        if self.strings.smcup.is_some() {
            self.putp_cap(|s| &s.smcup);
        } else {
            self.putp_cap(|s| &s.clear);
        }
    }

    /// Leave cursor-positioning mode; without `rmcup`, clear and park the
    /// cursor on the bottom line.
    pub fn exit_ca_mode(&mut self, lines: i32) {
        if self.strings.rmcup.is_some() {
            self.putp_cap(|s| &s.rmcup);
        } else if self.strings.clear.is_some() {
            self.putp_cap(|s| &s.clear);
            self.cup(lines - 1, 0);
        }
    }

    pub fn clear_screen(&mut self) {
        self.putp_cap(|s| &s.clear);
    }

    /// Clear to end of line. Returns false when the terminal has no `el`.
    pub fn clear_to_eol(&mut self) -> bool {
        if self.strings.el.is_some() {
            self.putp_cap(|s| &s.el);
            true
        } else {
            false
        }
    }

    pub fn save_cursor(&mut self) {
        self.putp_cap(|s| &s.sc);
    }

    /// Returns false when the terminal cannot restore a saved cursor and
    /// the caller must reposition explicitly.
    pub fn restore_cursor(&mut self) -> bool {
        if self.strings.rc.is_some() {
            self.putp_cap(|s| &s.rc);
            true
        } else {
            false
        }
    }

    pub fn hide_cursor_seq(&mut self) {
        self.putp_cap(|s| &s.civis);
    }

    pub fn show_cursor_seq(&mut self) {
        self.putp_cap(|s| &s.cnorm);
    }

    pub fn enable_acs(&mut self) {
        self.putp_cap(|s| &s.enacs);
    }

    /// Switch the terminal to `new` attributes, emitting the minimal
    /// transition from the current set.
    pub fn set_attrs(&mut self, new: Attrs) {
        if new == Attrs::NONE && (self.strings.sgr0.is_some() || self.strings.sgr.is_some()) {
            // Prefer sgr over sgr0; historically the better-tested string.
            if let Some(sgr) = &self.strings.sgr {
                if let Ok(bytes) = expand!(&sgr[..]; 0, 0, 0, 0, 0, 0, 0, 0, 0) {
                    Self::putp_into(&mut self.out, &bytes);
                }
            } else if let Some(sgr0) = &self.strings.sgr0 {
                Self::putp_into(&mut self.out, sgr0);
            }
            self.attrs = Attrs::NONE;
            return;
        }

        let ansi = self.strings.ansi;
        let changed_non_ansi = (new.flags ^ self.attrs.flags) & !ansi.flags;
        let colors_changed = new.fg != self.attrs.fg || new.bg != self.attrs.bg;
        if !changed_non_ansi.is_empty() || (!ansi.colors && colors_changed) {
            self.set_attrs_non_ansi(new);
        }

        let changed = (new.flags ^ self.attrs.flags) & ansi.flags;
        let fg_changed = ansi.colors && new.fg != self.attrs.fg;
        let bg_changed = ansi.colors && new.bg != self.attrs.bg;
        if changed.is_empty() && !fg_changed && !bg_changed {
            self.attrs = new;
            return;
        }

        // Compose one SGR sequence for every ANSI-covered change.
        let mut seq = String::from("\x1b[");
        let mut first = true;
        let mut push = |seq: &mut String, code: &str| {
            if !first {
                seq.push(';');
            }
            first = false;
            seq.push_str(code);
        };
        if changed.contains(AttrFlags::UNDERLINE) {
            push(&mut seq, if new.flags.contains(AttrFlags::UNDERLINE) { "4" } else { "24" });
        }
        if changed.intersects(AttrFlags::BOLD | AttrFlags::DIM) {
            push(
                &mut seq,
                if new.flags.contains(AttrFlags::BOLD) {
                    "1"
                } else if new.flags.contains(AttrFlags::DIM) {
                    "2"
                } else {
                    "22"
                },
            );
        }
        if changed.contains(AttrFlags::REVERSE) {
            push(&mut seq, if new.flags.contains(AttrFlags::REVERSE) { "7" } else { "27" });
        }
        if changed.contains(AttrFlags::BLINK) {
            push(&mut seq, if new.flags.contains(AttrFlags::BLINK) { "5" } else { "25" });
        }
        if changed.contains(AttrFlags::ACS) {
            push(&mut seq, if new.flags.contains(AttrFlags::ACS) { "11" } else { "10" });
        }
        if fg_changed {
            push(&mut seq, &format!("3{}", new.fg.ansi_index()));
        }
        if bg_changed {
            push(&mut seq, &format!("4{}", new.bg.ansi_index()));
        }
        seq.push('m');
        self.out.extend_from_slice(seq.as_bytes());
        self.attrs = new;
    }

    /// Transitions that need individual terminfo strings.
    fn set_attrs_non_ansi(&mut self, new: Attrs) {
        let ansi = self.strings.ansi;
        let basic_non_ansi = AttrFlags::BASIC & !ansi.flags;
        let mut cur_basic = self.attrs.flags & basic_non_ansi;
        let new_basic = new.flags & basic_non_ansi;

        if cur_basic != new_basic {
            // Turning off an attribute that has no independent exit string
            // forces a full reset; re-apply the survivors afterwards.
            if !(cur_basic & !new.flags & self.strings.reset_required).is_empty() {
                if let Some(sgr) = self.strings.sgr.clone() {
                    let f = |flag: AttrFlags| i32::from(new.flags.contains(flag));
                    if let Ok(bytes) = expand!(
                        &sgr[..];
                        0,
                        f(AttrFlags::UNDERLINE),
                        f(AttrFlags::REVERSE),
                        f(AttrFlags::BLINK),
                        f(AttrFlags::DIM),
                        f(AttrFlags::BOLD),
                        0,
                        0,
                        f(AttrFlags::ACS)
                    ) {
                        Self::putp_into(&mut self.out, &bytes);
                    }
                    self.attrs = Attrs {
                        fg: Color::Unset,
                        bg: Color::Unset,
                        flags: new.flags,
                    };
                    cur_basic = self.attrs.flags & basic_non_ansi;
                } else {
                    // finish() guarantees sgr0 exists whenever
                    // reset_required is non-empty and sgr is absent.
                    self.putp_cap(|s| &s.sgr0);
                    self.attrs = Attrs::NONE;
                    cur_basic = AttrFlags::empty();
                }
            }

            let changed = cur_basic ^ new_basic;
            if changed.contains(AttrFlags::UNDERLINE) {
                if new.flags.contains(AttrFlags::UNDERLINE) {
                    self.putp_cap(|s| &s.smul);
                } else {
                    self.putp_cap(|s| &s.rmul);
                }
            }
            if changed.contains(AttrFlags::REVERSE) {
                self.putp_cap(|s| &s.rev);
            }
            if changed.contains(AttrFlags::BLINK) {
                self.putp_cap(|s| &s.blink);
            }
            if changed.contains(AttrFlags::DIM) {
                self.putp_cap(|s| &s.dim);
            }
            if changed.contains(AttrFlags::BOLD) {
                self.putp_cap(|s| &s.bold);
            }
            if changed.contains(AttrFlags::ACS) {
                if new.flags.contains(AttrFlags::ACS) {
                    self.putp_cap(|s| &s.smacs);
                } else {
                    self.putp_cap(|s| &s.rmacs);
                }
            }
        }

        if ansi.colors {
            return;
        }

        // An explicit default color behaves like no color from here on.
        let mut new = new;
        if new.fg == Color::Default {
            new.fg = Color::Unset;
        }
        if new.bg == Color::Default {
            new.bg = Color::Unset;
        }

        // Transitions back to the default slot go through op.
        if (self.attrs.fg != new.fg && new.fg == Color::Unset)
            || (self.attrs.bg != new.bg && new.bg == Color::Unset)
        {
            if self.strings.op.is_some() {
                self.putp_cap(|s| &s.op);
                self.attrs = Attrs {
                    fg: Color::Unset,
                    bg: Color::Unset,
                    flags: new.flags,
                };
            }
        }

        if self.attrs.fg != new.fg {
            if let Some(setaf) = &self.strings.setaf {
                if let Ok(bytes) = expand!(&setaf[..]; new.fg.ansi_index()) {
                    Self::putp_into(&mut self.out, &bytes);
                }
            } else if let Some(setf) = &self.strings.setf {
                if let Ok(bytes) = expand!(&setf[..]; new.fg.alt_index()) {
                    Self::putp_into(&mut self.out, &bytes);
                }
            }
        }
        if self.attrs.bg != new.bg {
            if let Some(setab) = &self.strings.setab {
                if let Ok(bytes) = expand!(&setab[..]; new.bg.ansi_index()) {
                    Self::putp_into(&mut self.out, &bytes);
                }
            } else if let Some(setb) = &self.strings.setb {
                if let Ok(bytes) = expand!(&setb[..]; new.bg.alt_index()) {
                    Self::putp_into(&mut self.out, &bytes);
                }
            }
        }
    }
}
