// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Wide-cell pairing: every continuation is preceded by its wide half, and
//! no operation leaves a dangling continuation.

use super::test_fixtures::{create_test_terminal_sized, process};
use crate::core::grid::Grid;
use pretty_assertions::assert_eq;

/// The §8 invariant, checked over the whole grid.
fn assert_no_dangling_continuation(grid: &Grid) {
    for y in 0..grid.rows() {
        for x in 0..grid.cols() {
            let cell = grid.cell(x, y).unwrap();
            if cell.is_wide_continuation() {
                assert!(x > 0, "continuation in column 0 at row {y}");
                assert!(
                    grid.cell(x - 1, y).unwrap().is_wide(),
                    "dangling continuation at ({x},{y})"
                );
            }
        }
    }
}

#[test]
fn wide_glyph_occupies_two_cells() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "漢字");
    let session = t.session(0).unwrap();
    assert!(session.grid().cell(0, 0).unwrap().is_wide());
    assert!(session.grid().cell(1, 0).unwrap().is_wide_continuation());
    assert!(session.grid().cell(2, 0).unwrap().is_wide());
    assert_eq!(session.cursor.x, 4);
    assert_no_dangling_continuation(session.grid());
}

#[test]
fn overwriting_either_half_heals_the_pair() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "漢\x1b[1;1Hx");
    {
        let session = t.session(0).unwrap();
        assert_no_dangling_continuation(session.grid());
        assert_eq!(session.grid().cell(0, 0).unwrap().ch, 'x');
    }
    process(&mut t, "\x1b[2;1H漢\x1b[2;2Hy");
    let session = t.session(0).unwrap();
    assert_no_dangling_continuation(session.grid());
    assert_eq!(session.grid().cell(0, 1).unwrap().ch, ' ');
    assert_eq!(session.grid().cell(1, 1).unwrap().ch, 'y');
}

#[test]
fn erase_and_fill_never_leave_half_glyphs() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "漢字漢\x1b[1;2H\x1b[2X");
    assert_no_dangling_continuation(t.session(0).unwrap().grid());
    process(&mut t, "\x1b[2J\x1b[H漢\x1b[1;1H\x1b[K");
    assert_no_dangling_continuation(t.session(0).unwrap().grid());
}

#[test]
fn narrow_row_wraps_wide_glyph_whole() {
    let mut t = create_test_terminal_sized(5, 3);
    process(&mut t, "abcd漢");
    let session = t.session(0).unwrap();
    // No half glyph in the last column of row 0.
    assert!(!session.grid().cell(4, 0).unwrap().is_wide());
    assert!(session.grid().cell(0, 1).unwrap().is_wide());
    assert_no_dangling_continuation(session.grid());
}
