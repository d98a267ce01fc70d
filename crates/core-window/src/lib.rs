//! Window-layer primitives: the sparse per-row line store, the painter, the
//! depth-ordered window tree with anchors and clipping, and the compositor
//! that flattens all visible windows into one terminal row.
//!
//! Nothing in this crate touches the terminal; it is pure data manipulation
//! over [`core_cell::Cell`] rows. The terminal crate drives `Screen` to
//! composite rows and diffs them against the previously emitted frame.

use thiserror::Error;

pub mod compose;
pub mod line;
pub mod screen;
pub mod tree;
pub mod window;

pub use line::Line;
pub use screen::Screen;
pub use tree::{Corner, Relation, WindowId};
pub use window::Window;

/// Errors reported by painting and window-management operations.
///
/// Painting never aborts on `Nonprint`: the offending scalars are skipped,
/// the rest of the input is drawn, and the error is reported afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaintError {
    #[error("non-printable character passed for display")]
    Nonprint,
    #[error("window has no backing store")]
    Unbacked,
    #[error("stale or invalid window handle")]
    BadHandle,
    #[error("invalid argument")]
    BadArg,
    #[error("rectangle does not fit inside the window")]
    OutOfBounds,
}
