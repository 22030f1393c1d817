// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Response-generating sequences: DA, DSR/CPR, DECRQM, DECRQSS, DECRS,
//! and the kitty keyboard flag query.

use super::test_fixtures::{create_test_terminal, process, responses};
use crate::core::session::VtLevel;
use pretty_assertions::assert_eq;

#[test]
fn primary_da_depends_on_level() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[c");
    let reply = String::from_utf8(responses(&mut t)).unwrap();
    assert!(reply.starts_with("\x1b[?65;"), "got {reply:?}");

    t.session_mut(0).unwrap().level = VtLevel::Vt100;
    process(&mut t, "\x1b[c");
    assert_eq!(responses(&mut t), b"\x1b[?1;2c");
}

#[test]
fn dsr_five_and_six() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[5n");
    assert_eq!(responses(&mut t), b"\x1b[0n");
    process(&mut t, "\x1b[3;7H\x1b[6n");
    assert_eq!(responses(&mut t), b"\x1b[3;7R");
}

#[test]
fn cpr_is_origin_relative_under_decom() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[5;20r\x1b[?6h\x1b[2;3H\x1b[6n");
    assert_eq!(responses(&mut t), b"\x1b[2;3R");
    process(&mut t, "\x1b[?6n");
    assert_eq!(responses(&mut t), b"\x1b[?2;3;1R");
}

#[test]
fn decrqm_reports_private_mode_state() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[?7$p");
    assert_eq!(responses(&mut t), b"\x1b[?7;1$y");
    process(&mut t, "\x1b[?7l\x1b[?7$p");
    assert_eq!(responses(&mut t), b"\x1b[?7;2$y");
    process(&mut t, "\x1b[?31337$p");
    assert_eq!(responses(&mut t), b"\x1b[?31337;0$y");
}

#[test]
fn decrqss_sgr_margins_and_unknown() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[1;31m\x1bP$qm\x1b\\");
    assert_eq!(responses(&mut t), b"\x1bP1$r0;1;31m\x1b\\");
    process(&mut t, "\x1bP$qr\x1b\\");
    assert_eq!(responses(&mut t), b"\x1bP1$r1;24r\x1b\\");
    process(&mut t, "\x1bP$q|\x1b\\");
    assert_eq!(responses(&mut t), b"\x1bP1$r80|\x1b\\");
    process(&mut t, "\x1bP$qz\x1b\\");
    assert_eq!(responses(&mut t), b"\x1bP0$r\x1b\\");
}

#[test]
fn decrs_session_status_at_vt525() {
    let mut t = create_test_terminal();
    // Below VT525 the report is not answered.
    t.session_mut(0).unwrap().level = VtLevel::Vt420;
    process(&mut t, "\x1b[?21n");
    assert_eq!(responses(&mut t), b"");

    t.session_mut(0).unwrap().level = VtLevel::Vt525;
    process(&mut t, "\x1b[?21n");
    let reply = String::from_utf8(responses(&mut t)).unwrap();
    assert!(reply.starts_with("\x1bP$p"), "got {reply:?}");
    assert!(reply.ends_with("\x1b\\"));
}

#[test]
fn kitty_flags_query() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[?u");
    assert_eq!(responses(&mut t), b"\x1b[?0u");
    process(&mut t, "\x1b[>5u\x1b[?u");
    assert_eq!(responses(&mut t), b"\x1b[?5u");
}

#[test]
fn window_size_report() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1b[18t");
    assert_eq!(responses(&mut t), b"\x1b[8;24;80t");
}
