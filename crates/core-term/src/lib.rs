//! Terminal layer: terminfo capability snapshot, attribute emission, the
//! row diff & update engine, lifecycle, and the keyboard read primitive.
//!
//! The layer splits into three pieces so the interesting logic can run
//! without a TTY:
//! - [`caps::TermStrings`]: plain data probed once from terminfo,
//! - [`emit::Emitter`]: turns attribute/cursor transitions into bytes in
//!   an in-memory buffer,
//! - [`update::UpdateEngine`]: diffs freshly composited rows against the
//!   previous frame and drives the emitter.
//!
//! [`terminal::Terminal`] owns all three plus the `Screen`, performs the
//! raw-mode/terminfo initialization handshake, and restores the terminal
//! when dropped.

use thiserror::Error;

pub mod caps;
pub mod emit;
pub mod input;
pub mod terminal;
pub mod update;

pub use caps::TermStrings;
pub use emit::Emitter;
pub use terminal::{Terminal, sigwinch_flag};
pub use update::{UpdateEngine, UserCallback};

/// Errors reported by terminal-layer operations.
///
/// Environmental errors (`NotATty`, `HardcopyTerminal`,
/// `TerminfoDbNotFound`, `TerminalTooLimited`, `NoSizeInfo`) come out of
/// initialization and are fatal for the session; the rest are per-call.
#[derive(Debug, Error)]
pub enum Error {
    #[error("in/output device is not a terminal")]
    NotATty,
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("operating system error: {0}")]
    Os(#[from] nix::Error),
    #[error("end of file reached on input")]
    Eof,
    #[error("timeout while waiting for input")]
    Timeout,
    #[error("size information for terminal could not be found")]
    NoSizeInfo,
    #[error("hardcopy terminals are not supported")]
    HardcopyTerminal,
    #[error("no terminfo database entry found for this terminal")]
    TerminfoDbNotFound,
    #[error("terminal is missing required capabilities")]
    TerminalTooLimited,
    #[error("invalid argument")]
    BadArg,
}
