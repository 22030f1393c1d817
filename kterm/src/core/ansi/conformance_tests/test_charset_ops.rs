// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Character set designation, SI/SO locking shifts, SS2/SS3, and the DEC
//! Special Graphics translation applied at print time.

use super::test_fixtures::{cell_char, create_test_terminal, process};
use pretty_assertions::assert_eq;

#[test]
fn dec_special_graphics_via_g0() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b(0lqk\x1b(B");
    assert_eq!(cell_char(&t, 0, 0), '┌');
    assert_eq!(cell_char(&t, 1, 0), '─');
    assert_eq!(cell_char(&t, 2, 0), '┐');
    // Back to ASCII.
    process(&mut t, "q");
    assert_eq!(cell_char(&t, 3, 0), 'q');
}

#[test]
fn shift_out_selects_g1() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b)0q\x0eq\x0fq");
    assert_eq!(cell_char(&t, 0, 0), 'q');
    assert_eq!(cell_char(&t, 1, 0), '─');
    assert_eq!(cell_char(&t, 2, 0), 'q');
}

#[test]
fn single_shift_applies_to_one_glyph() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b*0\x1bNqq");
    assert_eq!(cell_char(&t, 0, 0), '─');
    assert_eq!(cell_char(&t, 1, 0), 'q');
}

#[test]
fn uk_national_set_swaps_hash() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b(A#a\x1b(B#");
    assert_eq!(cell_char(&t, 0, 0), '£');
    assert_eq!(cell_char(&t, 1, 0), 'a');
    assert_eq!(cell_char(&t, 2, 0), '#');
}

#[test]
fn utf8_and_charsets_coexist() {
    let mut t = create_test_terminal();
    process(&mut t, "é\x1b(0q\x1b(Bé");
    assert_eq!(cell_char(&t, 0, 0), 'é');
    assert_eq!(cell_char(&t, 1, 0), '─');
    assert_eq!(cell_char(&t, 2, 0), 'é');
}

#[test]
fn malformed_utf8_yields_replacement_and_resyncs() {
    let mut t = create_test_terminal();
    t.write_bytes(0, &[0xE2, 0x28, 0xA1, b'Z']);
    t.update();
    assert_eq!(cell_char(&t, 0, 0), '\u{FFFD}');
    // The stream resynchronized; the trailing ASCII printed.
    let session = t.session(0).unwrap();
    let row: String = (0..6).map(|x| session.grid().cell(x, 0).unwrap().ch).collect();
    assert!(row.contains('Z'), "row was {row:?}");
}
