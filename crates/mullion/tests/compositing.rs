//! End-to-end compositing and diffing scenarios, driven through the public
//! API against an in-memory emitter (no TTY required).

use mullion::{
    AttrFlags, Attrs, Color, Emitter, Screen, TermStrings, UpdateEngine, WindowId,
};

fn fixture(lines: i32, columns: i32) -> (Screen, Emitter, UpdateEngine) {
    let caps = TermStrings::ansi_fallback();
    let screen = Screen::new(lines, columns, caps.acs_tables());
    let emitter = Emitter::new(caps);
    let engine = UpdateEngine::new(lines as usize);
    (screen, emitter, engine)
}

fn shown_window(screen: &mut Screen, height: i32, width: i32, y: i32, x: i32, depth: i32) -> WindowId {
    let win = screen.new_window(None, height, width, y, x, depth).unwrap();
    screen.show(win).unwrap();
    win
}

fn row_text(screen: &Screen, row: i32) -> String {
    screen
        .term_line(row)
        .map(|l| l.cells().iter().map(|c| c.cluster.as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn plain_ascii_line_store_shape() {
    let (mut screen, _, _) = fixture(1, 10);
    let win = shown_window(&mut screen, 1, 10, 0, 0, 0);
    screen.set_paint(win, 0, 0).unwrap();
    screen.addstr(win, "hello", Attrs::NONE).unwrap();
    let w = screen.window(win).unwrap();
    let line = w.line(0).unwrap();
    assert_eq!(line.start(), 0);
    assert_eq!(line.len(), 5);
    assert_eq!(line.width(), 5);
    for (cell, expect) in line.cells().iter().zip("hello".chars()) {
        assert_eq!(cell.cluster, expect.to_string());
        assert_eq!(cell.width(), 1);
    }
}

#[test]
fn narrow_over_wide_leaves_attributed_space() {
    let (mut screen, _, _) = fixture(1, 10);
    let win = shown_window(&mut screen, 1, 10, 0, 0, 0);
    let red = Attrs::new(Color::Ansi(1), Color::Unset, AttrFlags::empty());
    screen.addstr(win, "世", red).unwrap();
    screen.set_paint(win, 0, 1).unwrap();
    screen.addch(win, 'X', Attrs::NONE).unwrap();
    let w = screen.window(win).unwrap();
    let line = w.line(0).unwrap();
    assert_eq!(line.len(), 2);
    assert_eq!(line.width(), 2);
    assert_eq!(line.cells()[0].cluster, " ");
    assert_eq!(line.cells()[0].attrs, red);
    assert_eq!(line.cells()[0].width(), 1);
    assert_eq!(line.cells()[1].cluster, "X");
}

#[test]
fn combining_mark_rides_its_base_character() {
    let (mut screen, _, _) = fixture(1, 10);
    let win = shown_window(&mut screen, 1, 10, 0, 0, 0);
    screen.addstr(win, "e\u{0301}", Attrs::NONE).unwrap();
    let w = screen.window(win).unwrap();
    let line = w.line(0).unwrap();
    assert_eq!(line.len(), 1);
    assert_eq!(line.width(), 1);
    assert_eq!(line.cells()[0].cluster, "e\u{0301}");
}

#[test]
fn combining_mark_on_empty_line_is_dropped() {
    let (mut screen, _, _) = fixture(1, 10);
    let win = shown_window(&mut screen, 1, 10, 0, 0, 0);
    screen.addstr(win, "\u{0301}", Attrs::NONE).unwrap();
    let w = screen.window(win).unwrap();
    assert!(w.line(0).unwrap().is_empty());
}

#[test]
fn depth_ordering_composites_top_window_over_deep() {
    let (mut screen, _, _) = fixture(1, 5);
    let deep = shown_window(&mut screen, 1, 5, 0, 0, 10);
    screen.addstr(deep, "AAAAA", Attrs::NONE).unwrap();
    let top = shown_window(&mut screen, 1, 5, 0, 0, 0);
    screen.set_paint(top, 0, 1).unwrap();
    screen.addstr(top, "bb", Attrs::NONE).unwrap();

    screen.compose_row(0);
    assert_eq!(row_text(&screen, 0), "AbbAA");
}

#[test]
fn parent_clips_child_drawing() {
    let (mut screen, mut emitter, mut engine) = fixture(1, 10);
    let parent = shown_window(&mut screen, 1, 5, 0, 0, 0);
    let child = screen.new_window(Some(parent), 1, 4, 0, 3, 0).unwrap();
    screen.show(child).unwrap();
    screen.addstr(child, "WXYZ", Attrs::NONE).unwrap();

    engine.update_row(&mut screen, &mut emitter, 0);
    // Only W and X make it out; the row is re-anchored at column zero.
    assert_eq!(row_text(&screen, 0), "   WX");
    assert_eq!(emitter.take(), b"\x1b[1;1H   WX");
}

#[test]
fn wide_character_trimmed_at_right_edge() {
    let (mut screen, _, _) = fixture(1, 5);
    let win = shown_window(&mut screen, 1, 5, 0, 0, 0);
    screen.set_paint(win, 0, 3).unwrap();
    // The wide character would occupy columns 4-5, outside the window; it
    // degrades to one blank column and the rest is dropped silently.
    assert_eq!(screen.addstr(win, "A世B", Attrs::NONE), Ok(()));
    let w = screen.window(win).unwrap();
    let line = w.line(0).unwrap();
    assert_eq!(line.start(), 3);
    assert_eq!(line.width(), 2);
    assert_eq!(line.cells()[0].cluster, "A");
    assert_eq!(line.cells()[1].cluster, " ");
}

#[test]
fn update_is_idempotent_on_the_wire() {
    let (mut screen, mut emitter, mut engine) = fixture(2, 10);
    let win = shown_window(&mut screen, 2, 10, 0, 0, 0);
    screen.set_paint(win, 0, 2).unwrap();
    screen.addstr(win, "abc", Attrs::NONE).unwrap();

    for row in 0..2 {
        engine.update_row(&mut screen, &mut emitter, row);
    }
    let first = emitter.take();
    assert!(!first.is_empty());

    for row in 0..2 {
        engine.update_row(&mut screen, &mut emitter, row);
    }
    assert!(emitter.take().is_empty());
}

#[test]
fn anchored_window_tracks_its_anchor() {
    use mullion::{Corner, Relation};
    let (mut screen, _, _) = fixture(3, 20);
    let base = shown_window(&mut screen, 2, 8, 1, 2, 0);
    let tip = shown_window(&mut screen, 1, 3, 0, 0, 0);
    screen
        .set_anchor(tip, Some(base), Relation::new(Corner::TopRight, Corner::TopLeft))
        .unwrap();
    assert_eq!(screen.abs_x(tip).unwrap(), 2 + 8);
    assert_eq!(screen.abs_y(tip).unwrap(), 1);

    screen.move_window(base, 1, 5).unwrap();
    assert_eq!(screen.abs_x(tip).unwrap(), 5 + 8);
}

#[test]
fn default_attrs_background_survives_diffing() {
    let (mut screen, mut emitter, mut engine) = fixture(1, 8);
    let win = shown_window(&mut screen, 1, 4, 0, 2, 0);
    let blue_bg = Attrs::new(Color::Unset, Color::Ansi(4), AttrFlags::empty());
    screen.set_default_attrs(win, blue_bg).unwrap();
    screen.addstr(win, "hi", Attrs::NONE).unwrap();

    engine.update_row(&mut screen, &mut emitter, 0);
    let bytes = emitter.take();
    // Leading plain alignment space, then the blue-background window:
    // "hi" plus two fill columns.
    assert_eq!(bytes, b"\x1b[1;1H  \x1b[44mhi  ");
}

#[test]
fn hiding_a_window_repaints_what_was_below() {
    let (mut screen, mut emitter, mut engine) = fixture(1, 5);
    let deep = shown_window(&mut screen, 1, 5, 0, 0, 10);
    screen.addstr(deep, "AAAAA", Attrs::NONE).unwrap();
    let top = shown_window(&mut screen, 1, 5, 0, 0, 0);
    screen.addstr(top, "bbbbb", Attrs::NONE).unwrap();

    engine.update_row(&mut screen, &mut emitter, 0);
    let _ = emitter.take();

    screen.hide(top).unwrap();
    engine.update_row(&mut screen, &mut emitter, 0);
    assert_eq!(emitter.take(), b"\x1b[1;1HAAAAA");
}
