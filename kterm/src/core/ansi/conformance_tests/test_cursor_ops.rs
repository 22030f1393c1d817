// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Cursor addressing and motion through real escape sequences: CUP, the
//! arrow family, save/restore, origin mode, and tab motion.

use super::test_fixtures::{create_test_terminal, cursor, process};
use pretty_assertions::assert_eq;

#[test]
fn cup_is_one_based_and_clamped() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[5;10H");
    assert_eq!(cursor(&t), (9, 4));
    process(&mut t, "\x1b[999;999H");
    assert_eq!(cursor(&t), (79, 23));
    // Zero and omitted parameters mean "first".
    process(&mut t, "\x1b[0;0H");
    assert_eq!(cursor(&t), (0, 0));
    process(&mut t, "\x1b[H");
    assert_eq!(cursor(&t), (0, 0));
}

#[test]
fn relative_motion_with_counts() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[10;10H\x1b[3A");
    assert_eq!(cursor(&t), (9, 6));
    process(&mut t, "\x1b[2B\x1b[4C\x1b[8D");
    assert_eq!(cursor(&t), (5, 8));
    // Defaults are one.
    process(&mut t, "\x1b[A");
    assert_eq!(cursor(&t), (5, 7));
}

#[test]
fn cnl_cpl_home_the_column() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[10;10H\x1b[2E");
    assert_eq!(cursor(&t), (0, 11));
    process(&mut t, "\x1b[20G\x1b[3F");
    assert_eq!(cursor(&t), (0, 8));
}

#[test]
fn hpa_vpa_absolute_axes() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[5;5H\x1b[30`");
    assert_eq!(cursor(&t), (29, 4));
    process(&mut t, "\x1b[12d");
    assert_eq!(cursor(&t), (29, 11));
}

#[test]
fn decsc_decrc_round_trip() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[7;13H\x1b7\x1b[H\x1b8");
    assert_eq!(cursor(&t), (12, 6));
    // ANSI.SYS s/u spelling.
    process(&mut t, "\x1b[3;3H\x1b[s\x1b[H\x1b[u");
    assert_eq!(cursor(&t), (2, 2));
}

#[test]
fn origin_mode_confines_addressing_to_region() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[5;20r\x1b[?6h\x1b[1;1H");
    assert_eq!(cursor(&t), (0, 4));
    process(&mut t, "\x1b[99;1H");
    assert_eq!(cursor(&t), (0, 19));
    process(&mut t, "\x1b[?6l");
    assert_eq!(cursor(&t), (0, 0));
}

#[test]
fn tab_stops_set_clear_and_navigate() {
    let mut t = create_test_terminal();
    // Custom stop at column 5 (0-based 4).
    process(&mut t, "\x1b[1;5H\x1bH\x1b[1;1H\t");
    assert_eq!(cursor(&t), (4, 0));
    // CBT returns to it, TBC 3 clears everything.
    process(&mut t, "\x1b[1;20H\x1b[2Z");
    assert_eq!(cursor(&t), (8, 0));
    process(&mut t, "\x1b[3g\x1b[1;1H\t");
    assert_eq!(cursor(&t), (79, 0));
}
