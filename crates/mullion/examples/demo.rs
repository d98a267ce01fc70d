//! Two overlapping windows, a status line, and a resize-aware event loop.
//!
//! Run inside a real terminal: `cargo run --example demo`. Press `q` to
//! quit, `h` to toggle the popup.

use std::sync::atomic::Ordering;

use anyhow::Result;
use mullion::{AttrFlags, Attrs, Color, Corner, Error, Relation, Terminal, sigwinch_flag};

fn main() -> Result<()> {
    // Redirect stderr to a file to capture the trace without corrupting
    // the screen: MULLION_LOG=term=trace cargo run --example demo 2>log
    if std::env::var_os("MULLION_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_env("MULLION_LOG"))
            .with_writer(std::io::stderr)
            .init();
    }

    let winch = sigwinch_flag()?;
    let mut term = Terminal::new()?;
    let (lines, columns) = term.get_size();

    let back = term
        .screen_mut()
        .new_window(None, lines, columns, 0, 0, 10)
        .map_err(|e| anyhow::anyhow!("backdrop: {e}"))?;
    term.screen_mut()
        .set_default_attrs(back, Attrs::new(Color::Unset, Color::Ansi(4), AttrFlags::empty()))
        .ok();
    term.screen_mut().show(back).ok();

    let popup = term
        .screen_mut()
        .new_window(None, 5, 26, -1, -2, 0)
        .map_err(|e| anyhow::anyhow!("popup: {e}"))?;
    // Pin the popup just inside the backdrop's bottom-right corner.
    term.screen_mut()
        .set_anchor(popup, Some(back), Relation::new(Corner::BottomRight, Corner::BottomRight))
        .ok();
    {
        let screen = term.screen_mut();
        screen.box_(popup, 0, 0, 5, 26, Attrs::NONE).ok();
        screen.set_paint(popup, 2, 3).ok();
        screen
            .addstr(popup, "q quits, h hides me", Attrs::with_flags(AttrFlags::BOLD))
            .ok();
        screen.show(popup).ok();
    }

    let mut popup_shown = true;
    loop {
        term.update()?;
        match term.get_keychar(200) {
            Ok(b'q') => break,
            Ok(b'h') => {
                popup_shown = !popup_shown;
                let screen = term.screen_mut();
                if popup_shown {
                    screen.show(popup).ok();
                } else {
                    screen.hide(popup).ok();
                }
            }
            Ok(_) => {}
            Err(Error::Timeout) => {
                if winch.swap(false, Ordering::Relaxed) {
                    term.resize()?;
                }
            }
            Err(Error::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    term.restore();
    Ok(())
}
