// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Scroll regions: DECSTBM boundaries, IND/RI at the margins, IL/DL
//! confinement, and explicit SU/SD.

use super::test_fixtures::{create_test_terminal_sized, cursor, process, row_prefix};
use pretty_assertions::assert_eq;

fn fill_rows(t: &mut crate::core::terminal::Terminal, rows: usize) {
    for r in 0..rows {
        process(t, &format!("\x1b[{};1HL{r}", r + 1));
    }
}

#[test]
fn linefeed_scrolls_only_inside_region() {
    let mut t = create_test_terminal_sized(6, 5);
    fill_rows(&mut t, 5);
    process(&mut t, "\x1b[2;4r\x1b[4;1H\n");
    // Rows 1..=3 scrolled; rows 0 and 4 untouched.
    assert_eq!(row_prefix(&t, 0), "L0");
    assert_eq!(row_prefix(&t, 1), "L2");
    assert_eq!(row_prefix(&t, 2), "L3");
    assert_eq!(row_prefix(&t, 3), "");
    assert_eq!(row_prefix(&t, 4), "L4");
    assert_eq!(cursor(&t), (0, 3));
}

#[test]
fn reverse_index_at_top_margin_scrolls_down() {
    let mut t = create_test_terminal_sized(6, 5);
    fill_rows(&mut t, 5);
    process(&mut t, "\x1b[2;4r\x1b[2;1H\x1bM");
    assert_eq!(row_prefix(&t, 0), "L0");
    assert_eq!(row_prefix(&t, 1), "");
    assert_eq!(row_prefix(&t, 2), "L1");
    assert_eq!(row_prefix(&t, 3), "L2");
    assert_eq!(row_prefix(&t, 4), "L4");
}

#[test]
fn su_sd_move_region_content() {
    let mut t = create_test_terminal_sized(6, 4);
    fill_rows(&mut t, 4);
    process(&mut t, "\x1b[2S");
    assert_eq!(row_prefix(&t, 0), "L2");
    assert_eq!(row_prefix(&t, 1), "L3");
    assert_eq!(row_prefix(&t, 2), "");
    process(&mut t, "\x1b[1T");
    assert_eq!(row_prefix(&t, 0), "");
    assert_eq!(row_prefix(&t, 1), "L2");
}

#[test]
fn il_dl_confined_to_region() {
    let mut t = create_test_terminal_sized(6, 5);
    fill_rows(&mut t, 5);
    process(&mut t, "\x1b[2;4r\x1b[3;1H\x1b[L");
    assert_eq!(row_prefix(&t, 2), "");
    assert_eq!(row_prefix(&t, 3), "L2");
    // L3 was pushed out of the region, never past it.
    assert_eq!(row_prefix(&t, 4), "L4");
    process(&mut t, "\x1b[3;1H\x1b[M");
    assert_eq!(row_prefix(&t, 2), "L2");
}

#[test]
fn scrolled_out_full_screen_rows_reach_scrollback() {
    let mut t = create_test_terminal_sized(6, 3);
    fill_rows(&mut t, 3);
    process(&mut t, "\x1b[3;1H\n\n");
    let session = t.session(0).unwrap();
    assert_eq!(session.grid().scrollback_len(), 2);
}

#[test]
fn left_right_margins_bound_horizontal_ops() {
    let mut t = create_test_terminal_sized(10, 3);
    process(&mut t, "0123456789\x1b[?69h\x1b[3;8s");
    // With DECLRMM on, CR homes to the left margin when inside it.
    process(&mut t, "\x1b[1;5H\rX");
    assert_eq!(row_prefix(&t, 0), "01X3456789");
}
