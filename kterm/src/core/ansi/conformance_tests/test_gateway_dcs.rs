// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The Gateway riding its real transport: `ESC P GATE;… ESC \` byte
//! streams through the full parser, not direct dispatcher calls.

use super::test_fixtures::{cell_char, create_test_terminal, process, responses};
use pretty_assertions::assert_eq;

#[test]
fn grid_fill_through_dcs() {
    let mut t = create_test_terminal();
    process(
        &mut t,
        "\x1bPGATE;KTERM;0;EXT;grid;fill;0;0;0;5;5;1;65;0;0;0;0;0\x1b\\",
    );
    assert_eq!(cell_char(&t, 0, 0), 'A');
    assert_eq!(cell_char(&t, 4, 4), 'A');
    assert_eq!(cell_char(&t, 5, 5), ' ');
    let reply = String::from_utf8(responses(&mut t)).unwrap();
    assert!(reply.contains("GATE;KTERM;0;OK;QUEUED;1"), "got {reply:?}");
}

#[test]
fn skip_protect_enabled_through_dcs() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1bPGATE;KTERM;1;SET;CURSOR;SKIP_PROTECT=1\x1b\\");
    assert!(t.session(0).unwrap().skip_protect);

    // Protected run at columns 1..=3; CUF skips to column 4.
    process(&mut t, "\x1b[1\"q\x1b[1;2HP\x1b[1;3HP\x1b[1;4HP\x1b[0\"q");
    process(&mut t, "\x1b[1;1H\x1b[C");
    let session = t.session(0).unwrap();
    assert_eq!((session.cursor.x, session.cursor.y), (4, 0));
}

#[test]
fn rawdump_mirrors_pre_parse_bytes() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1bPGATE;KTERM;1;RAWDUMP;START;SESSION=1\x1b\\");
    {
        let session = t.session(0).unwrap();
        assert!(session.raw_dump.active);
        assert_eq!(session.raw_dump.target_session, 1);
    }

    process(&mut t, "HelloRaw\x1b[31mRed");
    // Session 0 parsed normally: "Red" printed in red after "HelloRaw".
    let parsed = t.session(0).unwrap();
    assert_eq!(parsed.grid().cell(0, 0).unwrap().ch, 'H');
    let red = parsed.grid().cell(8, 0).unwrap();
    assert_eq!(red.ch, 'R');
    assert_eq!(red.fg, crate::core::grid::Color::Indexed(1));

    // Session 1 received every byte literally, escape included.
    let mirror = t.session(1).unwrap();
    assert_eq!(mirror.grid().cell(0, 0).unwrap().ch, 'H');
    assert_eq!(mirror.grid().cell(8, 0).unwrap().ch, '\u{1b}');
    assert_eq!(mirror.grid().cell(9, 0).unwrap().ch, '[');
}

#[test]
fn malformed_gate_payload_is_dropped() {
    let mut t = create_test_terminal();
    // DCS final G but no "ATE;" prefix: not a gateway string.
    process(&mut t, "\x1bPGXRBL;junk\x1b\\after");
    assert_eq!(cell_char(&t, 0, 0), 'a');
    assert!(responses(&mut t).is_empty());
}

#[test]
fn sixel_through_dcs_populates_strips() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1bPq#1;2;100;0;0~~~\x1b\\");
    let session = t.session(0).unwrap();
    assert!(!session.sixel.active);
    assert_eq!(session.sixel.strips.len(), 3);
    assert_eq!(session.sixel.strips[0].color, crate::core::grid::Rgb::new(255, 0, 0));
}

#[test]
fn regis_through_dcs_draws() {
    let mut t = create_test_terminal();
    process(&mut t, "\x1bPpP[10,10]V[50,50]\x1b\\");
    assert_eq!(t.session(0).unwrap().regis.primitives.len(), 1);
}

#[test]
fn kitty_apc_through_parser() {
    let mut t = create_test_terminal();
    let data = crate::core::codec::base64_encode(&[0u8; 3]);
    process(&mut t, &format!("\x1b_Ga=T,f=24,i=3,s=1,v=1;{data}\x1b\\"));
    let session = t.session(0).unwrap();
    assert_eq!(session.kitty.image_count(), 1);
    assert_eq!(session.kitty.placements.len(), 1);
}
