use core_cell::{AcsTables, Attrs};
use core_window::Screen;
use criterion::{Criterion, criterion_group, criterion_main};

fn overlap_paint(c: &mut Criterion) {
    c.bench_function("overlap_repaint_row", |b| {
        let mut screen = Screen::new(1, 120, AcsTables::empty());
        let win = screen.new_window(None, 1, 120, 0, 0, 0).unwrap();
        screen.show(win).unwrap();
        b.iter(|| {
            screen.set_paint(win, 0, 0).unwrap();
            screen.addstrrep(win, "世", Attrs::NONE, 60).unwrap();
            screen.set_paint(win, 0, 1).unwrap();
            screen.addstrrep(win, "x", Attrs::NONE, 100).unwrap();
        });
    });
}

fn compose_full_row(c: &mut Criterion) {
    c.bench_function("compose_row_three_layers", |b| {
        let mut screen = Screen::new(1, 120, AcsTables::empty());
        for depth in 0..3 {
            let win = screen.new_window(None, 1, 120, 0, depth, depth).unwrap();
            screen.show(win).unwrap();
            screen.addstrrep(win, "ab", Attrs::NONE, 55).unwrap();
        }
        b.iter(|| screen.compose_row(0));
    });
}

criterion_group!(benches, overlap_paint, compose_full_row);
criterion_main!(benches);
