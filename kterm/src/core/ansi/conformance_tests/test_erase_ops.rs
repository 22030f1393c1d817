// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! ED/EL/ECH/ICH/DCH plus DECSCA-protected selective erase and the DEC
//! rectangle operations.

use super::test_fixtures::{cell_char, create_test_terminal, create_test_terminal_sized, process, row_prefix};
use pretty_assertions::assert_eq;

#[test]
fn erase_in_line_variants() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "0123456789\x1b[1;5H\x1b[K");
    assert_eq!(row_prefix(&t, 0), "0123");
    process(&mut t, "\x1b[1;1H0123456789\x1b[1;5H\x1b[1K");
    assert_eq!(super::test_fixtures::row_text(&t, 0), "     56789");
    assert_eq!(cell_char(&t, 5, 0), '5');
    process(&mut t, "\x1b[2K");
    assert_eq!(row_prefix(&t, 0), "");
}

#[test]
fn erase_in_display_variants() {
    let mut t = create_test_terminal_sized(4, 3);
    process(&mut t, "aaaa\r\nbbbb\r\ncccc\x1b[2;2H\x1b[J");
    assert_eq!(row_prefix(&t, 0), "aaaa");
    assert_eq!(row_prefix(&t, 1), "b");
    assert_eq!(row_prefix(&t, 2), "");
    process(&mut t, "\x1b[2J");
    assert_eq!(row_prefix(&t, 0), "");
    assert_eq!(row_prefix(&t, 1), "");
}

#[test]
fn ech_blanks_without_shifting() {
    let mut t = create_test_terminal_sized(8, 2);
    process(&mut t, "abcdef\x1b[1;2H\x1b[3X");
    assert_eq!(row_prefix(&t, 0), "a   ef");
}

#[test]
fn ich_dch_shift_the_tail() {
    let mut t = create_test_terminal_sized(8, 2);
    process(&mut t, "abcdef\x1b[1;2H\x1b[2@");
    assert_eq!(row_prefix(&t, 0), "a  bcdef");
    process(&mut t, "\x1b[2P");
    assert_eq!(row_prefix(&t, 0), "abcdef");
}

#[test]
fn selective_erase_respects_protection() {
    let mut t = create_test_terminal_sized(10, 2);
    // P is written protected, u is not.
    process(&mut t, "\x1b[1\"qP\x1b[0\"qu\x1b[?2K");
    assert_eq!(cell_char(&t, 0, 0), 'P');
    assert_eq!(cell_char(&t, 1, 0), ' ');
    // Plain EL erases protected cells too.
    process(&mut t, "\x1b[2K");
    assert_eq!(cell_char(&t, 0, 0), ' ');
}

#[test]
fn decfra_and_decera_rectangles() {
    let mut t = create_test_terminal_sized(10, 6);
    process(&mut t, "\x1b[42;2;2;4;5$x");
    assert_eq!(cell_char(&t, 1, 1), '*');
    assert_eq!(cell_char(&t, 4, 3), '*');
    assert_eq!(cell_char(&t, 5, 4), ' ');
    process(&mut t, "\x1b[2;2;3;3$z");
    assert_eq!(cell_char(&t, 1, 1), ' ');
    assert_eq!(cell_char(&t, 4, 3), '*');
}

#[test]
fn deccra_copies_a_rect() {
    let mut t = create_test_terminal();
    process(&mut t, "ABC\x1b[1;1;1;3;1;3;5;1$v");
    assert_eq!(cell_char(&t, 4, 2), 'A');
    assert_eq!(cell_char(&t, 6, 2), 'C');
    // Source is untouched.
    assert_eq!(cell_char(&t, 0, 0), 'A');
}

#[test]
fn decaln_fills_the_screen() {
    let mut t = create_test_terminal_sized(6, 3);
    process(&mut t, "\x1b#8");
    for y in 0..3 {
        assert_eq!(row_prefix(&t, y), "EEEEEE");
    }
    assert_eq!(super::test_fixtures::cursor(&t), (0, 0));
}
