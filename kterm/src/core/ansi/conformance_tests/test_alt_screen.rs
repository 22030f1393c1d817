// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Alternate screen switching (47 / 1047 / 1049) and its interaction with
//! scrollback.

use super::test_fixtures::{cell_char, create_test_terminal_sized, cursor, process, row_prefix};
use pretty_assertions::assert_eq;

#[test]
fn mode_1049_saves_clears_and_restores() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "primary\x1b[1;4H");
    process(&mut t, "\x1b[?1049h");
    {
        let session = t.session(0).unwrap();
        assert!(session.on_alt_screen());
    }
    // Alternate buffer starts clear; draw something.
    assert_eq!(row_prefix(&t, 0), "");
    process(&mut t, "alt");
    assert_eq!(row_prefix(&t, 0), "alt");

    process(&mut t, "\x1b[?1049l");
    let session = t.session(0).unwrap();
    assert!(!session.on_alt_screen());
    assert_eq!(row_prefix(&t, 0), "primary");
    assert_eq!(cursor(&t), (3, 0));
}

#[test]
fn plain_47_keeps_alt_contents() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "\x1b[?47hkeep\x1b[?47l\x1b[?47h");
    // 47 neither clears nor restores; content written earlier survives.
    assert_eq!(row_prefix(&t, 0), "keep");
}

#[test]
fn alt_screen_never_accumulates_scrollback() {
    let mut t = create_test_terminal_sized(6, 2);
    process(&mut t, "\x1b[?1049h");
    process(&mut t, "\x1b[2;1H\n\n\n");
    let session = t.session(0).unwrap();
    assert_eq!(session.grid().scrollback_len(), 0);
    process(&mut t, "\x1b[?1049l");
    // Primary scrollback is also untouched by alt-screen scrolling.
    assert_eq!(t.session(0).unwrap().grid().scrollback_len(), 0);
}

#[test]
fn mode_1048_saves_cursor_only() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "\x1b[2;5H\x1b[?1048h\x1b[H\x1b[?1048l");
    assert_eq!(cursor(&t), (4, 1));
    assert!(!t.session(0).unwrap().on_alt_screen());
}

#[test]
fn primary_grid_untouched_while_on_alt() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "base");
    process(&mut t, "\x1b[?1047h\x1b[HXXXX\x1b[?1047l");
    assert_eq!(cell_char(&t, 0, 0), 'b');
    assert_eq!(row_prefix(&t, 0), "base");
}
