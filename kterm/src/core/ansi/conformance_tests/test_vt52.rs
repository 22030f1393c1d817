// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! VT52 compatibility mode (DECANM reset): the two-character escape
//! repertoire, direct cursor addressing, and the identify reply.

use super::test_fixtures::{cell_char, create_test_terminal, cursor, process, responses};
use pretty_assertions::assert_eq;

fn enter_vt52(t: &mut crate::core::terminal::Terminal) {
    process(t, "\x1b[?2l");
    assert!(!t.session(0).unwrap().modes.ansi);
}

#[test]
fn vt52_motion_and_home() {
    let mut t = create_test_terminal();
    enter_vt52(&mut t);
    process(&mut t, "\x1bB\x1bB\x1bC\x1bC\x1bC");
    assert_eq!(cursor(&t), (3, 2));
    process(&mut t, "\x1bA\x1bD\x1bH");
    assert_eq!(cursor(&t), (0, 0));
}

#[test]
fn vt52_direct_addressing() {
    let mut t = create_test_terminal();
    enter_vt52(&mut t);
    // ESC Y row col, offset by 0x1F (space is 1).
    process(&mut t, "\x1bY&(X");
    // '&' = 0x26 -> row 7 (1-based), '(' = 0x28 -> col 9.
    assert_eq!(cursor(&t), (8, 6));
    assert_eq!(cell_char(&t, 8, 6), 'X');
}

#[test]
fn vt52_identify_and_exit() {
    let mut t = create_test_terminal();
    enter_vt52(&mut t);
    process(&mut t, "\x1bZ");
    assert_eq!(responses(&mut t), b"\x1b/Z");
    // ESC < returns to ANSI operation; CSI works again.
    process(&mut t, "\x1b<\x1b[5;5H");
    assert!(t.session(0).unwrap().modes.ansi);
    assert_eq!(cursor(&t), (4, 4));
}

#[test]
fn vt52_erase_ops() {
    let mut t = create_test_terminal();
    process(&mut t, "abcdef");
    enter_vt52(&mut t);
    process(&mut t, "\x1bY =\x1bK");
    // Cursor at row 1 col 30 (nothing there); erase-to-end is a no-op on
    // blanks. Move onto the text and erase.
    process(&mut t, "\x1bH\x1bC\x1bC\x1bJ");
    assert_eq!(cell_char(&t, 0, 0), 'a');
    assert_eq!(cell_char(&t, 2, 0), ' ');
    assert_eq!(cell_char(&t, 5, 0), ' ');
}

#[test]
fn vt52_graphics_charset() {
    let mut t = create_test_terminal();
    enter_vt52(&mut t);
    process(&mut t, "\x1bFq\x1bGq");
    assert_eq!(cell_char(&t, 0, 0), '─');
    assert_eq!(cell_char(&t, 1, 0), 'q');
}
