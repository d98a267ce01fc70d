//! Capability snapshot: every terminfo string, number and flag the library
//! consumes, probed once at startup into plain data.
//!
//! Keeping the snapshot dumb has two payoffs: the emitter and update engine
//! never see the terminfo database, and tests can construct synthetic
//! capability sets (see [`TermStrings::ansi_fallback`]) and assert exact
//! wire bytes.
//!
//! ANSI detection compares capability strings against the literal SGR
//! sequences an ANSI terminal would use. When colors and the underline/ACS
//! pairs all match, attribute transitions can be folded into a single
//! `\x1b[..m` sequence instead of one terminfo string per toggle.

use core_cell::{AcsTables, AttrFlags};
use terminfo::{Database, Value};

use crate::Error;

/// Which attribute transitions may be emitted as literal ANSI SGR codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnsiCaps {
    pub flags: AttrFlags,
    pub colors: bool,
}

/// The capability strings, numbers and flags consumed by the emitter and
/// the update engine.
#[derive(Debug, Clone, Default)]
pub struct TermStrings {
    pub smcup: Option<Vec<u8>>,
    pub rmcup: Option<Vec<u8>>,
    pub cup: Option<Vec<u8>>,
    pub vpa: Option<Vec<u8>>,
    pub hpa: Option<Vec<u8>>,
    pub home: Option<Vec<u8>>,
    pub cud: Option<Vec<u8>>,
    pub cud1: Option<Vec<u8>>,
    pub cuf: Option<Vec<u8>>,
    pub cuf1: Option<Vec<u8>>,
    pub sc: Option<Vec<u8>>,
    pub rc: Option<Vec<u8>>,
    pub clear: Option<Vec<u8>>,
    pub el: Option<Vec<u8>>,
    pub civis: Option<Vec<u8>>,
    pub cnorm: Option<Vec<u8>>,
    pub sgr: Option<Vec<u8>>,
    pub sgr0: Option<Vec<u8>>,
    pub smul: Option<Vec<u8>>,
    pub rmul: Option<Vec<u8>>,
    pub rev: Option<Vec<u8>>,
    pub bold: Option<Vec<u8>>,
    pub blink: Option<Vec<u8>>,
    pub dim: Option<Vec<u8>>,
    pub smacs: Option<Vec<u8>>,
    pub rmacs: Option<Vec<u8>>,
    pub setaf: Option<Vec<u8>>,
    pub setab: Option<Vec<u8>>,
    pub setf: Option<Vec<u8>>,
    pub setb: Option<Vec<u8>>,
    pub op: Option<Vec<u8>>,
    pub enacs: Option<Vec<u8>>,
    pub acsc: Option<Vec<u8>>,
    pub bce: bool,
    /// Attributes the terminal cannot combine with color.
    pub ncv: AttrFlags,
    /// Attributes that can only be cleared through a full reset.
    pub reset_required: AttrFlags,
    pub ansi: AnsiCaps,
    /// Fallback size from the terminfo entry.
    pub lines: Option<i32>,
    pub columns: Option<i32>,
}

fn ti_str(db: &Database, name: &str) -> Option<Vec<u8>> {
    match db.raw(name) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn ti_num(db: &Database, name: &str) -> Option<i32> {
    match db.raw(name) {
        Some(Value::Number(n)) => Some(*n),
        _ => None,
    }
}

fn ti_flag(db: &Database, name: &str) -> bool {
    matches!(db.raw(name), Some(Value::True))
}

fn is(cap: &Option<Vec<u8>>, literal: &[u8]) -> bool {
    cap.as_deref() == Some(literal)
}

impl TermStrings {
    /// Probe the capability snapshot from a terminfo database entry.
    ///
    /// Requires `clear` and `cup`; everything else degrades.
    pub fn from_database(db: &Database) -> Result<Self, Error> {
        if ti_flag(db, "hc") {
            return Err(Error::HardcopyTerminal);
        }

        let mut caps = TermStrings {
            smcup: ti_str(db, "smcup"),
            rmcup: ti_str(db, "rmcup"),
            cup: ti_str(db, "cup"),
            vpa: ti_str(db, "vpa"),
            hpa: ti_str(db, "hpa"),
            home: ti_str(db, "home"),
            cud: ti_str(db, "cud"),
            cud1: ti_str(db, "cud1"),
            cuf: ti_str(db, "cuf"),
            cuf1: ti_str(db, "cuf1"),
            sc: ti_str(db, "sc"),
            rc: ti_str(db, "rc"),
            clear: ti_str(db, "clear"),
            el: ti_str(db, "el"),
            civis: ti_str(db, "civis"),
            cnorm: ti_str(db, "cnorm"),
            sgr: ti_str(db, "sgr"),
            sgr0: ti_str(db, "sgr0"),
            smul: ti_str(db, "smul"),
            rmul: ti_str(db, "rmul"),
            rev: ti_str(db, "rev"),
            bold: ti_str(db, "bold"),
            blink: ti_str(db, "blink"),
            dim: ti_str(db, "dim"),
            smacs: ti_str(db, "smacs"),
            rmacs: ti_str(db, "rmacs"),
            setaf: ti_str(db, "setaf"),
            setab: ti_str(db, "setab"),
            setf: ti_str(db, "setf"),
            setb: ti_str(db, "setb"),
            op: ti_str(db, "op"),
            enacs: ti_str(db, "enacs"),
            acsc: ti_str(db, "acsc"),
            bce: ti_flag(db, "bce"),
            ncv: AttrFlags::empty(),
            reset_required: AttrFlags::empty(),
            ansi: AnsiCaps::default(),
            lines: ti_num(db, "lines"),
            columns: ti_num(db, "columns"),
        };

        if caps.clear.is_none() || caps.cup.is_none() {
            return Err(Error::TerminalTooLimited);
        }

        // vpa is only useful together with hpa; setf/setb are fallbacks.
        if caps.hpa.is_none() {
            caps.vpa = None;
        }
        if caps.setaf.is_some() {
            caps.setf = None;
        }
        if caps.setab.is_some() {
            caps.setb = None;
        }

        caps.finish();
        caps.set_ncv(ti_num(db, "ncv").unwrap_or(0));
        Ok(caps)
    }

    /// Derived state shared by [`Self::from_database`] and synthetic
    /// capability sets.
    pub fn finish(&mut self) {
        // Alternate screen needs both halves of the pair; same for cursor
        // save/restore.
        if self.smcup.is_none() || self.rmcup.is_none() {
            self.smcup = None;
            self.rmcup = None;
        }
        if self.rc.is_none() {
            self.sc = None;
        }

        // Attributes whose exit string is missing (or is a bare reset) can
        // only be turned off by resetting everything.
        self.reset_required =
            AttrFlags::BOLD | AttrFlags::REVERSE | AttrFlags::BLINK | AttrFlags::DIM;
        if self.smul.is_some() && (self.rmul.is_none() || is(&self.rmul, b"\x1b[m")) {
            self.reset_required |= AttrFlags::UNDERLINE;
        }
        if self.smacs.is_some() && (self.rmacs.is_none() || is(&self.rmacs, b"\x1b[m")) {
            self.reset_required |= AttrFlags::ACS;
        }

        self.detect_ansi();

        // Without any reset string, never enter a mode that cannot be left
        // again.
        if self.sgr.is_none() && self.sgr0.is_none() {
            self.reset_required = AttrFlags::empty();
            self.rev = None;
            self.bold = None;
            self.blink = None;
            self.dim = None;
            if self.rmul.is_none() {
                self.smul = None;
            }
            if self.rmacs.is_none() {
                self.smacs = None;
            }
        }

        // Without el, trailing clears are emitted as spaces under the
        // current background, so behave as if the terminal erased with it.
        if self.el.is_none() {
            self.bce = true;
        }

        tracing::debug!(
            target: "term.init",
            ansi_flags = ?self.ansi.flags,
            ansi_colors = self.ansi.colors,
            reset_required = ?self.reset_required,
            bce = self.bce,
            "capability snapshot ready"
        );
    }

    /// Which attributes this terminal toggles with literal ANSI sequences.
    fn detect_ansi(&mut self) {
        let mut ansi = AnsiCaps::default();
        let mut missing = AttrFlags::empty();

        if (is(&self.op, b"\x1b[39;49m") || is(&self.op, b"\x1b[49;39m"))
            && is(&self.setaf, b"\x1b[3%p1%dm")
            && is(&self.setab, b"\x1b[4%p1%dm")
        {
            ansi.colors = true;
        }
        if is(&self.smul, b"\x1b[4m") && is(&self.rmul, b"\x1b[24m") {
            ansi.flags |= AttrFlags::UNDERLINE;
        }
        if is(&self.smacs, b"\x1b[11m") && is(&self.rmacs, b"\x1b[10m") {
            ansi.flags |= AttrFlags::ACS;
        }

        // For bold, dim, reverse and blink there is no exit string to
        // verify, so accept them only on a terminal already proven ANSI by
        // its colors and underline/ACS, and only when every one of them
        // that exists matches.
        if !ansi.colors
            || (ansi.flags & (AttrFlags::UNDERLINE | AttrFlags::ACS)).is_empty()
        {
            self.ansi = ansi;
            return;
        }

        match &self.rev {
            Some(s) if s.as_slice() == b"\x1b[7m" => ansi.flags |= AttrFlags::REVERSE,
            Some(_) => {}
            None => missing |= AttrFlags::REVERSE,
        }
        match &self.bold {
            Some(s) if s.as_slice() == b"\x1b[1m" => ansi.flags |= AttrFlags::BOLD,
            Some(_) => {}
            None => missing |= AttrFlags::BOLD,
        }
        match &self.dim {
            Some(s) if s.as_slice() == b"\x1b[2m" => ansi.flags |= AttrFlags::DIM,
            Some(_) => {}
            None => missing |= AttrFlags::DIM,
        }
        match &self.blink {
            Some(s) if s.as_slice() == b"\x1b[5m" => ansi.flags |= AttrFlags::BLINK,
            Some(_) => {}
            None => missing |= AttrFlags::BLINK,
        }

        let checked =
            AttrFlags::REVERSE | AttrFlags::BOLD | AttrFlags::DIM | AttrFlags::BLINK;
        if (missing | ansi.flags) & checked != checked {
            ansi.flags &= !checked;
        }

        self.ansi = ansi;
    }

    /// Decode the `ncv` number into attribute flags.
    pub fn set_ncv(&mut self, ncv: i32) {
        let mut flags = AttrFlags::empty();
        if ncv & (1 << 1) != 0 {
            flags |= AttrFlags::UNDERLINE;
        }
        if ncv & (1 << 2) != 0 {
            flags |= AttrFlags::REVERSE;
        }
        if ncv & (1 << 3) != 0 {
            flags |= AttrFlags::BLINK;
        }
        if ncv & (1 << 4) != 0 {
            flags |= AttrFlags::DIM;
        }
        if ncv & (1 << 5) != 0 {
            flags |= AttrFlags::BOLD;
        }
        if ncv & (1 << 8) != 0 {
            flags |= AttrFlags::ACS;
        }
        self.ncv = flags;
    }

    /// Build the ACS translation table. Glyphs are only usable when the
    /// terminal can actually switch character sets.
    pub fn acs_tables(&self) -> AcsTables {
        match (&self.acsc, self.sgr.is_some() || self.smacs.is_some()) {
            (Some(acsc), true) => AcsTables::from_acsc(acsc),
            _ => AcsTables::empty(),
        }
    }

    /// A synthetic, fully ANSI capability set.
    ///
    /// Used by tests to assert exact wire bytes, and usable as a stand-in
    /// for terminals that are known ANSI but have no terminfo entry.
    pub fn ansi_fallback() -> Self {
        let s = |b: &[u8]| Some(b.to_vec());
        let mut caps = TermStrings {
            smcup: s(b"\x1b[?1049h"),
            rmcup: s(b"\x1b[?1049l"),
            cup: s(b"\x1b[%i%p1%d;%p2%dH"),
            vpa: s(b"\x1b[%i%p1%dd"),
            hpa: s(b"\x1b[%i%p1%dG"),
            home: s(b"\x1b[H"),
            cud: s(b"\x1b[%p1%dB"),
            cud1: s(b"\n"),
            cuf: s(b"\x1b[%p1%dC"),
            cuf1: s(b"\x1b[C"),
            sc: s(b"\x1b7"),
            rc: s(b"\x1b8"),
            clear: s(b"\x1b[H\x1b[2J"),
            el: s(b"\x1b[K"),
            civis: s(b"\x1b[?25l"),
            cnorm: s(b"\x1b[?25h"),
            sgr: None,
            sgr0: s(b"\x1b[0m"),
            smul: s(b"\x1b[4m"),
            rmul: s(b"\x1b[24m"),
            rev: s(b"\x1b[7m"),
            bold: s(b"\x1b[1m"),
            blink: s(b"\x1b[5m"),
            dim: s(b"\x1b[2m"),
            smacs: s(b"\x1b[11m"),
            rmacs: s(b"\x1b[10m"),
            setaf: s(b"\x1b[3%p1%dm"),
            setab: s(b"\x1b[4%p1%dm"),
            setf: None,
            setb: None,
            op: s(b"\x1b[39;49m"),
            enacs: None,
            acsc: s(b"``aaffggiijjkkllmmnnooppqqrrssttuuvvwwxxyyzz{{||}}~~"),
            bce: false,
            ncv: AttrFlags::empty(),
            reset_required: AttrFlags::empty(),
            ansi: AnsiCaps::default(),
            lines: Some(24),
            columns: Some(80),
        };
        caps.finish();
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_fallback_detects_everything() {
        let caps = TermStrings::ansi_fallback();
        assert!(caps.ansi.colors);
        let expected = AttrFlags::UNDERLINE
            | AttrFlags::ACS
            | AttrFlags::REVERSE
            | AttrFlags::BOLD
            | AttrFlags::DIM
            | AttrFlags::BLINK;
        assert_eq!(caps.ansi.flags, expected);
    }

    #[test]
    fn non_ansi_exit_strings_disable_fast_path() {
        let mut caps = TermStrings::ansi_fallback();
        caps.rmul = Some(b"\x1bXu".to_vec());
        caps.finish();
        assert!(!caps.ansi.flags.contains(AttrFlags::UNDERLINE));
        // Without a verified underline/ACS exit the unverifiable modes are
        // not trusted either.
        assert!(caps.ansi.flags.contains(AttrFlags::ACS));
        assert!(caps.ansi.flags.contains(AttrFlags::BOLD));
    }

    #[test]
    fn mismatched_bold_disables_the_unverifiable_group() {
        let mut caps = TermStrings::ansi_fallback();
        caps.bold = Some(b"\x1b[99m".to_vec());
        caps.finish();
        assert!(!caps.ansi.flags.contains(AttrFlags::BOLD));
        assert!(!caps.ansi.flags.contains(AttrFlags::REVERSE));
        assert!(caps.ansi.flags.contains(AttrFlags::UNDERLINE));
    }

    #[test]
    fn bare_reset_exit_marks_reset_required() {
        let mut caps = TermStrings::ansi_fallback();
        caps.rmacs = Some(b"\x1b[m".to_vec());
        caps.finish();
        assert!(caps.reset_required.contains(AttrFlags::ACS));
        assert!(!caps.reset_required.contains(AttrFlags::UNDERLINE));
    }

    #[test]
    fn missing_el_forces_bce() {
        let mut caps = TermStrings::ansi_fallback();
        caps.el = None;
        caps.finish();
        assert!(caps.bce);
    }

    #[test]
    fn ncv_decoding() {
        let mut caps = TermStrings::ansi_fallback();
        caps.set_ncv((1 << 1) | (1 << 5));
        assert_eq!(caps.ncv, AttrFlags::UNDERLINE | AttrFlags::BOLD);
    }

    #[test]
    fn acs_tables_need_a_charset_switch() {
        let mut caps = TermStrings::ansi_fallback();
        assert!(caps.acs_tables().is_available(b'q'));
        caps.sgr = None;
        caps.smacs = None;
        assert!(!caps.acs_tables().is_available(b'q'));
    }
}
