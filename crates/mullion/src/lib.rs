//! mullion: a low-level terminal windowing library.
//!
//! Applications compose rectangular, depth-ordered windows of styled
//! Unicode cells; the library flattens the visible windows and pushes the
//! result to the terminal with terminfo-driven control sequences, emitting
//! only what changed since the previous update.
//!
//! The usual shape of a program:
//!
//! ```no_run
//! use mullion::{Attrs, Terminal};
//!
//! fn main() -> Result<(), mullion::Error> {
//!     let mut term = Terminal::new()?;
//!     let win = term.screen_mut().new_window(None, 5, 20, 2, 2, 0).unwrap();
//!     term.screen_mut().show(win).unwrap();
//!     term.screen_mut().box_(win, 0, 0, 5, 20, Attrs::NONE).unwrap();
//!     term.screen_mut().set_paint(win, 2, 4).unwrap();
//!     term.screen_mut().addstr(win, "hello", Attrs::NONE).unwrap();
//!     term.update()?;
//!     let _key = term.get_keychar(-1)?;
//!     Ok(())
//! }
//! ```
//!
//! Dropping the [`Terminal`] restores the terminal state. The library is
//! single-threaded: all drawing happens on the caller's thread and becomes
//! visible only at [`Terminal::update`].

pub use core_cell::{AcsTables, AttrFlags, Attrs, Cell, Color, acs, char_width, str_width};
pub use core_term::{
    Emitter, Error, TermStrings, Terminal, UpdateEngine, UserCallback, sigwinch_flag,
};
pub use core_window::{Corner, Line, PaintError, Relation, Screen, Window, WindowId};
