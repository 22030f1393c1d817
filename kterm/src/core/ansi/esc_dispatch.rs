// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Plain `ESC <final>` dispatch: single-shift selects, index family,
//! charset designation, keypad modes, and RIS.

use crate::core::session::{Charset, Session};
use crate::core::terminal::{ErrorSource, SessionCtx};

pub fn dispatch(session: &mut Session, ctx: &mut SessionCtx<'_>, final_byte: u8) {
    let intermediates = std::mem::take(&mut session.parser.intermediates);

    // Charset designation: ESC ( ) * + selects G0..G3.
    if let [designator_slot] = intermediates.as_slice() {
        let slot = match designator_slot {
            b'(' => Some(0),
            b')' => Some(1),
            b'*' => Some(2),
            b'+' => Some(3),
            _ => None,
        };
        if let Some(slot) = slot {
            session.charsets.g[slot] = Charset::from_designator(final_byte);
            return;
        }
        if *designator_slot == b'#' {
            if final_byte == b'8' {
                session.screen_alignment_pattern();
            }
            return;
        }
    }

    match final_byte {
        b'7' => session.save_cursor(),
        b'8' => session.restore_cursor(),
        b'D' => session.linefeed_no_cr(),
        b'E' => session.next_line(),
        b'H' => session.set_tab_stop(),
        b'M' => session.reverse_index(),
        b'N' => session.charsets.single_shift = Some(2),
        b'O' => session.charsets.single_shift = Some(3),
        b'V' | b'W' => {
            // SPA/EPA guarded-area marks; the protection model is DECSCA.
            session.protect = final_byte == b'V';
        }
        b'Z' => {
            // DECID, ancient form of DA.
            super::csi_dispatch::dispatch_decid(session, ctx);
        }
        b'c' => {
            // RIS. The grid wipe rides the queued Reset op.
            session.full_reset();
            ctx.palette.reset_all();
        }
        b'=' => session.modes.keypad_app = true,
        b'>' => session.modes.keypad_app = false,
        b'\\' => {} // Stray ST.
        b'n' => session.charsets.gl = 2, // LS2
        b'o' => session.charsets.gl = 3, // LS3
        b'|' => session.charsets.gr = 3, // LS3R
        b'}' => session.charsets.gr = 2, // LS2R
        b'~' => session.charsets.gr = 1, // LS1R
        _ => {
            ctx.errors.warn(
                ErrorSource::Parser,
                &format!("unrecognized ESC final 0x{final_byte:02X}"),
            );
        }
    }
}
