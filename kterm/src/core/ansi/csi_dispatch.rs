// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! CSI final-byte dispatch: `(private marker, intermediates, final)` to
//! handler. Cursor-only sequences mutate session metadata inline; anything
//! grid-visible goes through the session's op queue.

use super::params::Params;
use crate::core::ops::EraseMode;
use crate::core::session::{KittyFlags, Session, VtLevel};
use crate::core::terminal::{CrossAction, ErrorSource, SessionCtx};
use crate::core::units::{TermCol, TermRow};

pub fn dispatch(session: &mut Session, ctx: &mut SessionCtx<'_>, final_byte: u8) {
    let params = std::mem::take(&mut session.parser.params);
    let private = session.parser.private_marker.take();
    let intermediates = std::mem::take(&mut session.parser.intermediates);

    match (private, intermediates.as_slice(), final_byte) {
        (None, [], b'@') => session.insert_chars(count(&params)),
        (None, [], b'A') => session.cursor_up(count(&params)),
        (None, [], b'B') => session.cursor_down(count(&params)),
        (None, [], b'C') => session.cursor_right(count(&params)),
        (None, [], b'D') => session.cursor_left(count(&params)),
        (None, [], b'E') => session.cursor_next_line(count(&params)),
        (None, [], b'F') => session.cursor_prev_line(count(&params)),
        (None, [], b'G') => session.cursor_to_column(TermCol::from_param(params.get(0, 1))),
        (None, [], b'H' | b'f') => {
            session.set_cursor(
                TermRow::from_param(params.get(0, 1)),
                TermCol::from_param(params.get(1, 1)),
            );
        }
        (None, [], b'I') => session.forward_tab(count(&params)),
        (None | Some(b'?'), [], b'i') => {
            // Media copy: 5 starts auto-print duplication, 4 stops it.
            match params.get(0, 0) {
                5 => session.auto_print = true,
                4 => session.auto_print = false,
                _ => {}
            }
        }
        (None, [], b'J') => {
            session.erase_in_display(EraseMode::from_param(params.get(0, 0)), false);
        }
        (Some(b'?'), [], b'J') => {
            session.erase_in_display(EraseMode::from_param(params.get(0, 0)), true);
        }
        (None, [], b'K') => {
            session.erase_in_line(EraseMode::from_param(params.get(0, 0)), false);
        }
        (Some(b'?'), [], b'K') => {
            session.erase_in_line(EraseMode::from_param(params.get(0, 0)), true);
        }
        (None, [], b'L') => session.insert_lines(count(&params)),
        (None, [], b'M') => session.delete_lines(count(&params)),
        (None, [], b'P') => session.delete_chars(count(&params)),
        (None, [], b'S') => session.scroll_up(count(&params)),
        (None, [], b'T') => session.scroll_down(count(&params)),
        (None, [], b'X') => session.erase_chars(count(&params)),
        (None, [], b'Z') => session.back_tab(count(&params)),
        (None, [], b'`') => session.cursor_to_column(TermCol::from_param(params.get(0, 1))),
        (None, [], b'a') => session.cursor_right(count(&params)),
        (None, [], b'b') => session.repeat_last_char(count(&params)),
        (None, [], b'c') => device_attributes_primary(session, ctx),
        (Some(b'>'), [], b'c') => {
            ctx.responses.push_str("\x1b[>65;2623;0c");
        }
        (Some(b'='), [], b'c') => {
            ctx.responses.push_str("\x1bP!|00000000\x1b\\");
        }
        (None, [], b'd') => session.cursor_to_row(TermRow::from_param(params.get(0, 1))),
        (None, [], b'e') => session.cursor_down(count(&params)),
        (None, [], b'g') => session.clear_tab_stops(params.get(0, 0)),
        (None, [], b'h') => {
            for i in 0..params.len().max(1) {
                session.set_ansi_mode(params.get(i, 0), true);
            }
        }
        (None, [], b'l') => {
            for i in 0..params.len().max(1) {
                session.set_ansi_mode(params.get(i, 0), false);
            }
        }
        (Some(b'?'), [], b'h') => {
            for i in 0..params.len().max(1) {
                session.set_dec_mode(params.get(i, 0), true);
            }
        }
        (Some(b'?'), [], b'l') => {
            for i in 0..params.len().max(1) {
                session.set_dec_mode(params.get(i, 0), false);
            }
        }
        (None, [], b'm') => session.set_sgr(&params),
        (Some(b'>'), [], b'm') => {
            // modifyOtherKeys: CSI > 4 ; level m.
            if params.get(0, 0) == 4 {
                session.modes.modify_other_keys = params.get(1, 0).clamp(0, 2) as u8;
            }
        }
        (None, [], b'n') => device_status(session, ctx, params.get(0, 0)),
        (Some(b'?'), [], b'n') => dec_device_status(session, ctx, params.get(0, 0)),
        (None, [], b'r') => {
            let top = TermRow::from_param(params.get(0, 1)).to_zero_based();
            let bottom = TermRow::from_param(params.get(1, session.rows as i32)).to_zero_based();
            if params.is_empty() {
                session.set_scroll_region(0, 0);
            } else {
                session.set_scroll_region(top, bottom);
            }
        }
        (None, [], b's') => {
            if session.modes.lr_margins {
                let left = TermCol::from_param(params.get(0, 1)).to_zero_based();
                let right = TermCol::from_param(params.get(1, session.cols as i32)).to_zero_based();
                session.set_lr_margins(left, right);
            } else {
                session.save_cursor();
            }
        }
        (None, [], b't') => window_ops(session, ctx, &params),
        (None, [], b'u') => session.restore_cursor(),
        (Some(b'>'), [], b'u') => {
            let flags = KittyFlags::from_bits_truncate(params.get(0, 0).clamp(0, 31) as u8);
            session.kitty_keyboard.push(flags);
        }
        (Some(b'<'), [], b'u') => session.kitty_keyboard.pop(count(&params)),
        (Some(b'='), [], b'u') => {
            let flags = KittyFlags::from_bits_truncate(params.get(0, 0).clamp(0, 31) as u8);
            match params.get(1, 1) {
                2 => session.kitty_keyboard.flags |= flags,
                3 => session.kitty_keyboard.flags &= !flags,
                _ => session.kitty_keyboard.flags = flags,
            }
        }
        (Some(b'?'), [], b'u') => {
            let flags = session.kitty_keyboard.flags.bits();
            ctx.responses.push_str(&format!("\x1b[?{flags}u"));
        }
        (None, [], b'x') => {
            // DECREQTPARM.
            let sol = params.get(0, 0) + 2;
            ctx.responses.push_str(&format!("\x1b[{sol};1;1;128;128;1;0x"));
        }
        (None, [b' '], b'q') => {
            session.cursor.style = crate::core::session::CursorStyle::from_param(params.get(0, 0));
        }
        (None, [b'"'], b'q') => session.protect = params.get(0, 0) == 1,
        (None, [b'!'], b'p') => session.soft_reset(),
        (None, [b'$'], b'p') => {
            // DECRQM, ANSI modes. 4 (IRM) and 20 (LNM) are the tracked ones.
            let mode = params.get(0, 0);
            let state = match mode {
                4 => {
                    if session.modes.insert { 1 } else { 2 }
                }
                20 => {
                    if session.modes.linefeed_newline { 1 } else { 2 }
                }
                _ => 0,
            };
            ctx.responses.push_str(&format!("\x1b[{mode};{state}$y"));
        }
        (Some(b'?'), [b'$'], b'p') => {
            let mode = params.get(0, 0);
            let state = session.dec_mode_state(mode);
            ctx.responses.push_str(&format!("\x1b[?{mode};{state}$y"));
        }
        (None, [b'$'], b'v') => {
            // DECCRA: Pts;Pls;Pbs;Prs;Pps ; Ptd;Pld;Ppd $v.
            let top = TermRow::from_param(params.get(0, 1)).to_zero_based();
            let left = TermCol::from_param(params.get(1, 1)).to_zero_based();
            let bottom = TermRow::from_param(params.get(2, session.rows as i32)).to_zero_based();
            let right = TermCol::from_param(params.get(3, session.cols as i32)).to_zero_based();
            let dst_top = TermRow::from_param(params.get(5, 1)).to_zero_based();
            let dst_left = TermCol::from_param(params.get(6, 1)).to_zero_based();
            session.copy_rect_area(top, left, bottom, right, dst_top, dst_left);
        }
        (None, [b'$'], b'x') => {
            // DECFRA: Pch;Pt;Pl;Pb;Pr $x.
            let ch = char::from_u32(params.get(0, 32).max(0) as u32).unwrap_or(' ');
            let top = TermRow::from_param(params.get(1, 1)).to_zero_based();
            let left = TermCol::from_param(params.get(2, 1)).to_zero_based();
            let bottom = TermRow::from_param(params.get(3, session.rows as i32)).to_zero_based();
            let right = TermCol::from_param(params.get(4, session.cols as i32)).to_zero_based();
            session.fill_rect_area(ch, top, left, bottom, right);
        }
        (None, [b'$'], b'z') => {
            // DECERA: Pt;Pl;Pb;Pr $z.
            let top = TermRow::from_param(params.get(0, 1)).to_zero_based();
            let left = TermCol::from_param(params.get(1, 1)).to_zero_based();
            let bottom = TermRow::from_param(params.get(2, session.rows as i32)).to_zero_based();
            let right = TermCol::from_param(params.get(3, session.cols as i32)).to_zero_based();
            session.erase_rect_area(top, left, bottom, right);
        }
        (None, [b'\''], b'}') => insert_columns(session, count(&params)),
        (None, [b'\''], b'~') => delete_columns(session, count(&params)),
        _ => {
            ctx.errors.warn(
                ErrorSource::Parser,
                &format!(
                    "unrecognized CSI final 0x{final_byte:02X} (private {private:?}, intermediates {intermediates:?})"
                ),
            );
        }
    }
}

fn count(params: &Params) -> usize {
    params.get(0, 1).max(1) as usize
}

/// DECID (`ESC Z`): identical reply to primary DA.
pub fn dispatch_decid(session: &Session, ctx: &mut SessionCtx<'_>) {
    device_attributes_primary(session, ctx);
}

fn device_attributes_primary(session: &Session, ctx: &mut SessionCtx<'_>) {
    let reply = match session.level {
        VtLevel::Vt52 | VtLevel::Vt100 => "\x1b[?1;2c",
        VtLevel::Vt220 => "\x1b[?62;1;2;6;9c",
        VtLevel::Vt320 => "\x1b[?63;1;2;6;9c",
        VtLevel::Vt420 => "\x1b[?64;1;2;6;9;15;18;21c",
        VtLevel::Vt525 | VtLevel::Xterm => "\x1b[?65;1;2;6;9;15;18;21;22c",
    };
    ctx.responses.push_str(reply);
}

/// DSR: 5 reports status, 6 reports the cursor (CPR), origin-relative
/// under DECOM.
fn device_status(session: &Session, ctx: &mut SessionCtx<'_>, kind: i32) {
    match kind {
        5 => ctx.responses.push_str("\x1b[0n"),
        6 => {
            let (row, col) = cursor_report_position(session);
            ctx.responses.push_str(&format!("\x1b[{row};{col}R"));
        }
        _ => {}
    }
}

fn dec_device_status(session: &Session, ctx: &mut SessionCtx<'_>, kind: i32) {
    match kind {
        6 => {
            // DECXCPR includes the page.
            let (row, col) = cursor_report_position(session);
            ctx.responses.push_str(&format!("\x1b[?{row};{col};1R"));
        }
        15 => ctx.responses.push_str("\x1b[?13n"), // No printer.
        25 => ctx.responses.push_str("\x1b[?21n"), // UDK locked? 20=unlocked, 21=locked.
        26 => ctx.responses.push_str("\x1b[?27;1;0;0n"), // Keyboard: North American.
        21 => {
            // DECRS session status: needs terminal-wide knowledge, so it is
            // deferred to the multiplexer (VT525 and up only).
            if session.level >= VtLevel::Vt525 {
                ctx.actions.push(CrossAction::SessionStatusReport);
            }
        }
        _ => {}
    }
}

fn cursor_report_position(session: &Session) -> (usize, usize) {
    let region = session.scroll_region();
    if session.modes.origin {
        (
            session.cursor.y - region.top + 1,
            session.cursor.x - region.left + 1,
        )
    } else {
        (session.cursor.y + 1, session.cursor.x + 1)
    }
}

/// DECSLPP and the xterm window ops the core can answer without a
/// windowing layer.
fn window_ops(session: &mut Session, ctx: &mut SessionCtx<'_>, params: &Params) {
    match params.get(0, 0) {
        4 | 8 => {
            // Resize request in rows;cols (XTWINOPS 8) or pixels (4, which
            // the core has no metrics for and therefore ignores).
            if params.get(0, 0) == 8 {
                let rows = params.get(1, session.rows as i32).max(1) as usize;
                let cols = params.get(2, session.cols as i32).max(1) as usize;
                session.queue_resize(cols, rows);
            }
        }
        14 => ctx.responses.push_str("\x1b[4;0;0t"),
        18 => {
            let reply = format!("\x1b[8;{};{}t", session.rows, session.cols);
            ctx.responses.push_str(&reply);
        }
        value if value >= 24 => {
            // DECSLPP: set lines per page.
            session.queue_resize(session.cols, value as usize);
        }
        _ => {}
    }
}

/// DECIC: insert blank columns at the cursor within the margins.
fn insert_columns(session: &mut Session, n: usize) {
    let region = session.scroll_region();
    if session.cursor.x < region.left || session.cursor.x > region.right {
        return;
    }
    for y in region.top..=region.bottom {
        let _ = session.op_queue.push(crate::core::ops::Op::InsertChars {
            x: session.cursor.x,
            y,
            n,
            right: region.right,
            bg: session.bg,
        });
    }
}

/// DECDC: delete columns at the cursor within the margins.
fn delete_columns(session: &mut Session, n: usize) {
    let region = session.scroll_region();
    if session.cursor.x < region.left || session.cursor.x > region.right {
        return;
    }
    for y in region.top..=region.bottom {
        let _ = session.op_queue.push(crate::core::ops::Op::DeleteChars {
            x: session.cursor.x,
            y,
            n,
            right: region.right,
            bg: session.bg,
        });
    }
}
