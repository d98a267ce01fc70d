//! Terminal lifecycle: the initialization handshake, frame updates, cursor
//! control, size handling, and restoration.
//!
//! `Terminal::new` requires stdout to be a TTY, switches it to raw mode,
//! probes terminfo, determines the screen size (ioctl, then environment,
//! then terminfo), and enters the alternate screen. Dropping the terminal
//! restores everything; `restore` does the same explicitly and is
//! idempotent.
//!
//! Between `new` and `restore` the terminal object is the sole owner of the
//! tty. The only signal-safe re-entry is a `SIGWINCH` handler that sets a
//! flag (see [`sigwinch_flag`]); `resize` itself must be called from the
//! main flow.

use std::env;
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use core_cell::{AttrFlags, Attrs, str_width};
use core_window::{Screen, WindowId};
use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};
use terminfo::Database;

use crate::Error;
use crate::caps::TermStrings;
use crate::emit::Emitter;
use crate::input::KeyReader;
use crate::update::{UpdateEngine, UserCallback};

pub struct Terminal {
    screen: Screen,
    emitter: Emitter,
    engine: UpdateEngine,
    keys: KeyReader,
    lines: i32,
    columns: i32,
    cursor_y: i32,
    cursor_x: i32,
    cursor_visible: bool,
    saved: Termios,
    active: bool,
}

fn ioctl_winsize() -> Option<(i32, i32)> {
    let mut wsz: libc::winsize = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCGWINSZ, &mut wsz) };
    if ret == 0 && wsz.ws_row > 0 && wsz.ws_col > 0 {
        Some((i32::from(wsz.ws_row), i32::from(wsz.ws_col)))
    } else {
        None
    }
}

fn probe_size(strings: &TermStrings) -> Result<(i32, i32), Error> {
    if let Some(size) = ioctl_winsize() {
        return Ok(size);
    }
    let env_size = env::var("LINES")
        .ok()
        .and_then(|l| l.parse::<i32>().ok())
        .zip(env::var("COLUMNS").ok().and_then(|c| c.parse::<i32>().ok()))
        .filter(|(l, c)| *l > 0 && *c > 0);
    if let Some(size) = env_size {
        return Ok(size);
    }
    match (strings.lines, strings.columns) {
        (Some(l), Some(c)) if l > 0 && c > 0 => Ok((l, c)),
        _ => Err(Error::NoSizeInfo),
    }
}

impl Terminal {
    /// Take over the terminal: raw mode, terminfo, size, alternate screen.
    ///
    /// The terminal is assumed to speak UTF-8; the caller is responsible
    /// for having set up the locale accordingly.
    pub fn new() -> Result<Self, Error> {
        let stdout = io::stdout();
        if unsafe { libc::isatty(libc::STDOUT_FILENO) } != 1 {
            return Err(Error::NotATty);
        }
        let saved = termios::tcgetattr(stdout.as_fd())?;

        let mut raw = saved.clone();
        raw.input_flags &= !(InputFlags::IXON
            | InputFlags::IXOFF
            | InputFlags::IGNBRK
            | InputFlags::BRKINT
            | InputFlags::PARMRK
            | InputFlags::ISTRIP
            | InputFlags::INLCR
            | InputFlags::IGNCR
            | InputFlags::ICRNL);
        raw.local_flags &= !(LocalFlags::ISIG | LocalFlags::ICANON | LocalFlags::ECHO);
        raw.output_flags &= !OutputFlags::OPOST;
        raw.control_flags &= !(ControlFlags::CSIZE | ControlFlags::PARENB);
        raw.control_flags |= ControlFlags::CS8;
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        termios::tcsetattr(stdout.as_fd(), SetArg::TCSADRAIN, &raw)?;

        match Self::setup(saved.clone()) {
            Ok(term) => Ok(term),
            Err(e) => {
                // Leave the tty the way we found it on a failed handshake.
                let _ = termios::tcsetattr(stdout.as_fd(), SetArg::TCSADRAIN, &saved);
                Err(e)
            }
        }
    }

    fn setup(saved: Termios) -> Result<Self, Error> {
        let db = Database::from_env().map_err(|_| Error::TerminfoDbNotFound)?;
        let strings = TermStrings::from_database(&db)?;
        let (lines, columns) = probe_size(&strings)?;

        let screen = Screen::new(lines, columns, strings.acs_tables());
        let mut emitter = Emitter::new(strings);
        let engine = UpdateEngine::new(lines as usize);

        emitter.enter_ca_mode();
        emitter.show_cursor_seq();
        emitter.enable_acs();
        emitter.set_attrs(Attrs::NONE);

        let mut term = Terminal {
            screen,
            emitter,
            engine,
            keys: KeyReader::default(),
            lines,
            columns,
            cursor_y: 0,
            cursor_x: 0,
            cursor_visible: true,
            saved,
            active: true,
        };
        term.flush()?;
        tracing::debug!(target: "term.init", lines, columns, "terminal initialized");
        Ok(term)
    }

    /// The window layer: create windows, paint, composite.
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn get_size(&self) -> (i32, i32) {
        (self.lines, self.columns)
    }

    /// Push every change since the previous update to the terminal.
    ///
    /// Updates are explicit so applications can batch painting; rows are
    /// recomposited and diffed one at a time, top to bottom.
    pub fn update(&mut self) -> Result<(), Error> {
        if self.cursor_visible {
            self.emitter.save_cursor();
            self.emitter.hide_cursor_seq();
        }
        let mut rows_emitted = 0u32;
        for row in 0..self.lines {
            if self.engine.update_row(&mut self.screen, &mut self.emitter, row) {
                rows_emitted += 1;
            }
        }
        self.emitter.set_attrs(Attrs::NONE);
        if self.cursor_visible {
            if !self.emitter.restore_cursor() {
                self.emitter.cup(self.cursor_y, self.cursor_x);
            }
            self.emitter.show_cursor_seq();
        }
        tracing::trace!(target: "term.update", rows_emitted, "frame update");
        self.flush()
    }

    /// Clear the terminal and forget the previous frame; the next update
    /// repaints everything.
    pub fn redraw(&mut self) {
        self.emitter.set_attrs(Attrs::NONE);
        self.emitter.clear_screen();
        self.screen.clear_term();
        self.engine.invalidate();
    }

    /// Re-read the terminal size after a `SIGWINCH`. Must be called from
    /// the main flow, not from the signal handler.
    pub fn resize(&mut self) -> Result<(), Error> {
        let Some((lines, columns)) = ioctl_winsize() else {
            return Ok(());
        };
        self.lines = lines;
        self.columns = columns;
        // Shrinking tends to corrupt what is on screen; growing leaves
        // stale cells behind. Both force a clean repaint.
        if columns > self.screen.columns() || lines != self.screen.lines() {
            self.screen.clear_term();
            self.emitter.clear_screen();
            self.engine.invalidate();
        }
        self.screen
            .resize_term(lines, columns)
            .map_err(|_| Error::BadArg)?;
        self.engine.set_rows(lines as usize);
        tracing::debug!(target: "term.resize", lines, columns, "terminal resized");
        Ok(())
    }

    /// Move the cursor. While hidden, the position is only recorded.
    pub fn set_cursor(&mut self, y: i32, x: i32) -> Result<(), Error> {
        self.cursor_y = y;
        self.cursor_x = x;
        if self.cursor_visible {
            self.emitter.cup(y, x);
            self.flush()?;
        }
        Ok(())
    }

    /// Move the cursor relative to a window, if that window is visible.
    pub fn set_window_cursor(&mut self, win: WindowId, y: i32, x: i32) -> Result<(), Error> {
        if self.screen.effectively_visible(win) {
            let ay = self.screen.abs_y(win).map_err(|_| Error::BadArg)?;
            let ax = self.screen.abs_x(win).map_err(|_| Error::BadArg)?;
            self.set_cursor(ay + y, ax + x)?;
        }
        Ok(())
    }

    /// Hide the cursor; terminals without `civis` get it parked in the
    /// bottom-right corner instead.
    pub fn hide_cursor(&mut self) -> Result<(), Error> {
        if self.cursor_visible {
            if self.emitter.strings().civis.is_some() {
                self.cursor_visible = false;
                self.emitter.hide_cursor_seq();
                self.flush()?;
            } else {
                self.emitter.cup(self.lines - 1, self.columns - 1);
            }
        }
        Ok(())
    }

    pub fn show_cursor(&mut self) -> Result<(), Error> {
        if !self.cursor_visible {
            self.cursor_visible = true;
            self.emitter.cup(self.cursor_y, self.cursor_x);
            self.emitter.show_cursor_seq();
            self.flush()?;
        }
        Ok(())
    }

    /// Set the terminal drawing attributes directly. Useful together with
    /// `putp` when an application bypasses the window layer.
    pub fn set_attrs(&mut self, attrs: Attrs) {
        self.emitter.set_attrs(attrs);
    }

    /// Send a terminal control string.
    pub fn putp(&mut self, s: &[u8]) -> Result<(), Error> {
        self.emitter.putp(s);
        self.flush()
    }

    /// Column width of a string on the terminal.
    pub fn strwidth(&self, s: &str) -> i32 {
        str_width(s)
    }

    /// Whether the terminal can draw an alternate-character-set glyph.
    pub fn acs_available(&self, c: char) -> bool {
        c.is_ascii() && self.screen.acs().is_available(c as u8)
    }

    /// Attributes the terminal cannot combine with color.
    pub fn get_ncv(&self) -> AttrFlags {
        self.emitter.strings().ncv
    }

    /// Install a draw callback for cells painted with the user attribute
    /// flag.
    pub fn set_user_callback(&mut self, callback: Option<UserCallback>) {
        self.engine.set_user_callback(callback);
    }

    /// Wait up to `msec` milliseconds (<= 0 indefinitely) for one byte
    /// from the keyboard.
    pub fn get_keychar(&mut self, msec: i32) -> Result<u8, Error> {
        self.keys.get(msec)
    }

    /// Push the most recently read byte back.
    pub fn unget_keychar(&mut self, key: u8) -> Result<(), Error> {
        self.keys.unget(key)
    }

    /// Leave the alternate screen, reset attributes, restore termios.
    /// Idempotent; also runs on drop.
    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.screen.clear_term();
        self.engine.invalidate();
        self.emitter.exit_ca_mode(self.lines);
        if !self.cursor_visible {
            self.emitter.show_cursor_seq();
            self.cursor_visible = true;
        }
        self.emitter.set_attrs(Attrs::NONE);
        let _ = self.flush();
        let _ = termios::tcsetattr(io::stdout().as_fd(), SetArg::TCSADRAIN, &self.saved);
    }

    fn flush(&mut self) -> Result<(), Error> {
        let buf = self.emitter.take();
        let mut out = io::stdout().lock();
        if !buf.is_empty() {
            out.write_all(&buf)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Register a `SIGWINCH` flag. The handler only sets the flag; poll it on
/// the main flow and call [`Terminal::resize`] when it trips.
pub fn sigwinch_flag() -> Result<Arc<AtomicBool>, Error> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGWINCH, Arc::clone(&flag))?;
    Ok(flag)
}
