// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The parser automaton.
//!
//! | State | Entered by | Consumes |
//! |---|---|---|
//! | Ground | initial / terminators | printables, C0, ESC |
//! | Escape | ESC | intermediates, then a final byte |
//! | CsiEntry/Param/Intermediate | `ESC [` | params (`;` `:`, signed), privates, final `0x40..=0x7E` |
//! | OscString | `ESC ]` | bytes until BEL or ST |
//! | DcsEntry/Param/Passthrough | `ESC P` | params, then the data string routed to a sub-parser |
//! | SosPmApcString | `ESC X` / `ESC ^` / `ESC _` | bytes until ST |
//! | Vt52* | DECANM reset | the VT52 escape repertoire |
//!
//! Dispatch is a match over `(state, private marker, intermediates, final)`
//! in [`super::csi_dispatch`] / [`super::esc_dispatch`].

use smallvec::SmallVec;

use super::params::Params;
use crate::core::codec::{Utf8Decoder, Utf8Step};
use crate::core::graphics::{kitty, regis, sixel, tektronix};
use crate::core::ops::EraseMode;
use crate::core::session::{Charset, Session};
use crate::core::terminal::{CrossAction, ErrorSource, SessionCtx, TermEvent};
use crate::core::units::{term_col, term_row};

/// Cap on OSC / DCS string payloads (gateway commands, DECRQSS selectors).
pub const STRING_BUF_LIMIT: usize = 8 * 1024;
/// Cap on APC payloads (Kitty graphics chunks are ≤ 4096 of base64, leave
/// generous headroom for key-value noise).
pub const APC_BUF_LIMIT: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum ParseMode {
    #[default]
    Ground,
    Escape,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    SosPmApcString,
    Vt52Escape,
    Vt52Row,
    Vt52Col,
}

/// Which sub-parser owns the DCS data string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum DcsKind {
    Sixel,
    Regis,
    Gateway,
    Decrqss,
    DefineUdk,
    RequestUdk,
    #[default]
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringKind {
    #[default]
    Sos,
    Pm,
    Apc,
}

/// Per-session parse state and scratch buffers.
#[derive(Debug, Default)]
pub struct ParserState {
    pub mode: ParseMode,
    pub params: Params,
    pub intermediates: SmallVec<[u8; 2]>,
    pub private_marker: Option<u8>,
    pub osc_buf: String,
    pub string_kind: StringKind,
    pub string_buf: String,
    pub dcs_kind: DcsKind,
    pub utf8: Utf8Decoder,
    /// ESC seen inside a string state (possible ST).
    pending_esc: bool,
    vt52_row: u8,
}

impl ParserState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.private_marker = None;
    }
}

/// Feed one byte of host output through the automaton.
pub fn feed_byte(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match session.parser.mode {
        ParseMode::Ground => ground(session, ctx, byte),
        ParseMode::Escape => escape(session, ctx, byte),
        ParseMode::CsiEntry | ParseMode::CsiParam => csi_param(session, ctx, byte),
        ParseMode::CsiIntermediate => csi_intermediate(session, ctx, byte),
        ParseMode::CsiIgnore => csi_ignore(session, byte),
        ParseMode::OscString => osc_string(session, ctx, byte),
        ParseMode::DcsEntry | ParseMode::DcsParam => dcs_param(session, ctx, byte),
        ParseMode::DcsIntermediate => dcs_intermediate(session, ctx, byte),
        ParseMode::DcsPassthrough => dcs_passthrough(session, ctx, byte),
        ParseMode::SosPmApcString => sos_pm_apc(session, ctx, byte),
        ParseMode::Vt52Escape => vt52_escape(session, ctx, byte),
        ParseMode::Vt52Row => {
            session.parser.vt52_row = byte;
            session.parser.mode = ParseMode::Vt52Col;
        }
        ParseMode::Vt52Col => {
            let row = session.parser.vt52_row.saturating_sub(0x1F);
            let col = byte.saturating_sub(0x1F);
            session.set_cursor(term_row(u32::from(row)), term_col(u32::from(col)));
            session.parser.mode = ParseMode::Ground;
        }
    }
}

// ── Ground ──────────────────────────────────────────────────────────────

fn ground(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    // A session parked in Tektronix mode owns every byte except ESC, which
    // stays live so `CSI ? 38 l` can bring the session back.
    if session.tektronix.active && byte != 0x1B && !session.parser.utf8.in_progress() {
        tektronix::process_byte(session, byte);
        return;
    }

    if session.parser.utf8.in_progress() {
        match session.parser.utf8.feed(byte) {
            Utf8Step::Complete(ch) => session.write_char(ch),
            Utf8Step::Incomplete => {}
            Utf8Step::Invalid => {
                session.write_char(crate::core::codec::REPLACEMENT);
                // The offending byte may start something new.
                ground(session, ctx, byte);
            }
        }
        return;
    }

    match byte {
        0x1B => {
            session.parser.clear_sequence();
            session.parser.mode = if session.modes.ansi {
                ParseMode::Escape
            } else {
                ParseMode::Vt52Escape
            };
        }
        0x00..=0x1F => execute_c0(session, ctx, byte),
        0x20..=0x7E => session.write_char(byte as char),
        0x7F => {} // DEL is ignored on output.
        _ => match session.parser.utf8.feed(byte) {
            Utf8Step::Complete(ch) => session.write_char(ch),
            Utf8Step::Incomplete => {}
            Utf8Step::Invalid => session.write_char(crate::core::codec::REPLACEMENT),
        },
    }
}

fn execute_c0(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match byte {
        0x05 => {
            // ENQ: answerback. An empty answerback is the configured
            // default; hosts can interpose via the gateway.
            ctx.responses.push_bytes(ctx.config.answerback.as_bytes());
        }
        0x07 => ctx.actions.push(CrossAction::Event(TermEvent::Bell)),
        0x08 => session.backspace(),
        0x09 => session.tab(),
        0x0A | 0x0B | 0x0C => session.linefeed(),
        0x0D => session.carriage_return(),
        0x0E => session.charsets.gl = 1,
        0x0F => session.charsets.gl = 0,
        _ => {}
    }
}

// ── Escape ──────────────────────────────────────────────────────────────

fn escape(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => session.parser.clear_sequence(),
        0x00..=0x17 | 0x19 | 0x1C..=0x1F => execute_c0(session, ctx, byte),
        0x20..=0x2F => {
            if session.parser.intermediates.len() < 2 {
                session.parser.intermediates.push(byte);
            }
        }
        // String introducers only apply to a bare ESC; with intermediates
        // collected (charset designation and friends) the byte is a final.
        b'[' if session.parser.intermediates.is_empty() => {
            session.parser.clear_sequence();
            session.parser.mode = ParseMode::CsiEntry;
        }
        b']' if session.parser.intermediates.is_empty() => {
            session.parser.osc_buf.clear();
            session.parser.pending_esc = false;
            session.parser.mode = ParseMode::OscString;
        }
        b'P' if session.parser.intermediates.is_empty() => {
            session.parser.clear_sequence();
            session.parser.string_buf.clear();
            session.parser.pending_esc = false;
            session.parser.mode = ParseMode::DcsEntry;
        }
        b'X' | b'^' | b'_' if session.parser.intermediates.is_empty() => {
            session.parser.string_kind = match byte {
                b'X' => StringKind::Sos,
                b'^' => StringKind::Pm,
                _ => StringKind::Apc,
            };
            session.parser.string_buf.clear();
            session.parser.pending_esc = false;
            session.parser.mode = ParseMode::SosPmApcString;
        }
        0x30..=0x7E => {
            super::esc_dispatch::dispatch(session, ctx, byte);
            if session.parser.mode == ParseMode::Escape {
                session.parser.mode = ParseMode::Ground;
            }
        }
        _ => session.parser.mode = ParseMode::Ground,
    }
}

// ── CSI ─────────────────────────────────────────────────────────────────

fn csi_param(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => {
            session.parser.clear_sequence();
            session.parser.mode = ParseMode::Escape;
        }
        0x00..=0x1F => execute_c0(session, ctx, byte),
        b'0'..=b'9' => {
            session.parser.params.push_digit(byte - b'0');
            session.parser.mode = ParseMode::CsiParam;
        }
        b';' => {
            session.parser.params.next_param();
            session.parser.mode = ParseMode::CsiParam;
        }
        b':' => {
            session.parser.params.next_subparam();
            session.parser.mode = ParseMode::CsiParam;
        }
        // Signed parameters: `+N` / `-N` prefixes are accepted here (the
        // original repertoire needs them for relative coordinates), so
        // these two bytes are taken out of the intermediate range.
        b'+' | b'-' => {
            session.parser.params.push_sign(byte == b'-');
            session.parser.mode = ParseMode::CsiParam;
        }
        0x3C..=0x3F => {
            if session.parser.mode == ParseMode::CsiEntry {
                session.parser.private_marker = Some(byte);
                session.parser.mode = ParseMode::CsiParam;
            } else {
                session.parser.mode = ParseMode::CsiIgnore;
            }
        }
        0x20..=0x2F => {
            if session.parser.intermediates.len() < 2 {
                session.parser.intermediates.push(byte);
            }
            session.parser.mode = ParseMode::CsiIntermediate;
        }
        0x40..=0x7E => finish_csi(session, ctx, byte),
        _ => session.parser.mode = ParseMode::CsiIgnore,
    }
}

fn csi_intermediate(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => {
            session.parser.clear_sequence();
            session.parser.mode = ParseMode::Escape;
        }
        0x00..=0x1F => execute_c0(session, ctx, byte),
        0x20..=0x2F => {
            if session.parser.intermediates.len() < 2 {
                session.parser.intermediates.push(byte);
            }
        }
        0x40..=0x7E => finish_csi(session, ctx, byte),
        _ => session.parser.mode = ParseMode::CsiIgnore,
    }
}

fn csi_ignore(session: &mut Session, byte: u8) {
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => {
            session.parser.clear_sequence();
            session.parser.mode = ParseMode::Escape;
        }
        0x40..=0x7E => session.parser.mode = ParseMode::Ground,
        _ => {}
    }
}

fn finish_csi(session: &mut Session, ctx: &mut SessionCtx<'_>, final_byte: u8) {
    let strict = session.strict_mode;
    session.parser.params.finish(strict);
    session.parser.mode = ParseMode::Ground;
    super::csi_dispatch::dispatch(session, ctx, final_byte);
}

// ── OSC ─────────────────────────────────────────────────────────────────

fn osc_string(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    if session.parser.pending_esc {
        session.parser.pending_esc = false;
        if byte == b'\\' {
            finish_osc(session, ctx);
        } else {
            // Aborted string; the ESC starts a fresh sequence.
            session.parser.mode = ParseMode::Escape;
            session.parser.clear_sequence();
            feed_byte(session, ctx, byte);
        }
        return;
    }
    match byte {
        0x07 => finish_osc(session, ctx),
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => session.parser.pending_esc = true,
        _ => {
            if session.parser.osc_buf.len() < STRING_BUF_LIMIT {
                session.parser.osc_buf.push(byte as char);
            }
        }
    }
}

fn finish_osc(session: &mut Session, ctx: &mut SessionCtx<'_>) {
    session.parser.mode = ParseMode::Ground;
    let payload = std::mem::take(&mut session.parser.osc_buf);
    super::osc_dispatch::dispatch(session, ctx, &payload);
}

// ── DCS ─────────────────────────────────────────────────────────────────

fn dcs_param(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => {
            session.parser.clear_sequence();
            session.parser.mode = ParseMode::Escape;
        }
        b'0'..=b'9' => {
            session.parser.params.push_digit(byte - b'0');
            session.parser.mode = ParseMode::DcsParam;
        }
        b';' => {
            session.parser.params.next_param();
            session.parser.mode = ParseMode::DcsParam;
        }
        b':' => {
            session.parser.params.next_subparam();
            session.parser.mode = ParseMode::DcsParam;
        }
        // Unlike CSI, `+` stays an intermediate here (DECUDK is `DCS + p`);
        // the DCS sub-languages carry their signed values in the data
        // string, not the parameter list.
        0x3C..=0x3F => {
            if session.parser.mode == ParseMode::DcsEntry {
                session.parser.private_marker = Some(byte);
                session.parser.mode = ParseMode::DcsParam;
            }
        }
        0x20..=0x2F => {
            if session.parser.intermediates.len() < 2 {
                session.parser.intermediates.push(byte);
            }
            session.parser.mode = ParseMode::DcsIntermediate;
        }
        0x40..=0x7E => dcs_hook(session, ctx, byte),
        _ => {}
    }
}

fn dcs_intermediate(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => {
            session.parser.clear_sequence();
            session.parser.mode = ParseMode::Escape;
        }
        0x20..=0x2F => {
            if session.parser.intermediates.len() < 2 {
                session.parser.intermediates.push(byte);
            }
        }
        0x40..=0x7E => dcs_hook(session, ctx, byte),
        _ => {}
    }
}

/// Select the sub-parser from the DCS final byte and intermediates.
fn dcs_hook(session: &mut Session, ctx: &mut SessionCtx<'_>, final_byte: u8) {
    session.parser.params.finish(false);
    session.parser.dcs_kind = match (session.parser.intermediates.as_slice(), final_byte) {
        ([], b'q') => {
            // P2 = 1 keeps the background transparent.
            let p2 = session.parser.params.get(1, 0);
            sixel::begin(session, ctx.config, p2 != 1);
            DcsKind::Sixel
        }
        ([], b'p') => DcsKind::Regis,
        ([b'$'], b'q') => DcsKind::Decrqss,
        ([b'+'], b'p') => DcsKind::DefineUdk,
        ([b'+'], b'q') => DcsKind::RequestUdk,
        ([], b'G') => DcsKind::Gateway,
        _ => {
            ctx.errors.warn(
                ErrorSource::Parser,
                &format!("unhandled DCS final byte 0x{final_byte:02X}"),
            );
            DcsKind::Ignored
        }
    };
    session.parser.string_buf.clear();
    session.parser.pending_esc = false;
    session.parser.mode = ParseMode::DcsPassthrough;
}

fn dcs_passthrough(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    if session.parser.pending_esc {
        session.parser.pending_esc = false;
        if byte == b'\\' {
            dcs_unhook(session, ctx);
        } else {
            session.parser.mode = ParseMode::Escape;
            session.parser.clear_sequence();
            feed_byte(session, ctx, byte);
        }
        return;
    }
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => session.parser.pending_esc = true,
        _ => match session.parser.dcs_kind {
            // Sixel streams straight into the decoder; everything else
            // accumulates a bounded data string.
            DcsKind::Sixel => sixel::process_char(session, ctx.config, byte as char),
            DcsKind::Ignored => {}
            _ => {
                if session.parser.string_buf.len() < STRING_BUF_LIMIT {
                    session.parser.string_buf.push(byte as char);
                }
            }
        },
    }
}

fn dcs_unhook(session: &mut Session, ctx: &mut SessionCtx<'_>) {
    session.parser.mode = ParseMode::Ground;
    let data = std::mem::take(&mut session.parser.string_buf);
    match session.parser.dcs_kind {
        DcsKind::Sixel => sixel::finish(session),
        DcsKind::Regis => regis::interpret(session, &data),
        DcsKind::Gateway => {
            // The DCS final byte was the `G` of `GATE;...`.
            if let Some(payload) = data.strip_prefix("ATE;") {
                ctx.actions.push(CrossAction::Gateway(payload.to_string()));
            } else {
                ctx.errors.warn(ErrorSource::Parser, "malformed GATE device control string");
            }
        }
        DcsKind::Decrqss => respond_decrqss(session, ctx, &data),
        DcsKind::DefineUdk => define_udk(session, &data),
        DcsKind::RequestUdk => respond_udk(session, ctx, &data),
        DcsKind::Ignored => {}
    }
}

/// `DCS $ q <selector> ST` → `DCS 1 $ r <value> ST` (0 on failure).
fn respond_decrqss(session: &Session, ctx: &mut SessionCtx<'_>, selector: &str) {
    match session.decrqss_value(selector) {
        Some(value) => {
            ctx.responses.push_str(&format!("\x1bP1$r{value}\x1b\\"));
        }
        None => {
            ctx.responses.push_str("\x1bP0$r\x1b\\");
            ctx.errors.warn(
                ErrorSource::Parser,
                &format!("DECRQSS: unrecognized selector {selector:?}"),
            );
        }
    }
}

/// DECUDK: `DCS + p Ky1/St1;Ky2/St2 ST` with hex-encoded strings.
fn define_udk(session: &mut Session, data: &str) {
    for entry in data.split(';') {
        let Some((key, hex)) = entry.split_once('/') else { continue };
        let Ok(key) = key.parse::<u16>() else { continue };
        let bytes = crate::core::codec::hex_decode(hex.as_bytes(), 256);
        session.udk.insert(key, bytes);
    }
}

/// DECRQUDK-style readback: `DCS + q <key> ST` → `DCS 1 + r key/hex ST`.
fn respond_udk(session: &Session, ctx: &mut SessionCtx<'_>, data: &str) {
    let Ok(key) = data.trim().parse::<u16>() else {
        ctx.responses.push_str("\x1bP0+r\x1b\\");
        return;
    };
    match session.udk.get(&key) {
        Some(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            ctx.responses.push_str(&format!("\x1bP1+r{key}/{hex}\x1b\\"));
        }
        None => ctx.responses.push_str("\x1bP0+r\x1b\\"),
    }
}

// ── SOS / PM / APC ──────────────────────────────────────────────────────

fn sos_pm_apc(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    if session.parser.pending_esc {
        session.parser.pending_esc = false;
        if byte == b'\\' {
            finish_sos_pm_apc(session, ctx);
        } else {
            session.parser.mode = ParseMode::Escape;
            session.parser.clear_sequence();
            feed_byte(session, ctx, byte);
        }
        return;
    }
    match byte {
        0x18 | 0x1A => session.parser.mode = ParseMode::Ground,
        0x1B => session.parser.pending_esc = true,
        _ => {
            // Only APC payloads are kept (Kitty graphics); SOS/PM content
            // is discarded per spec.
            if session.parser.string_kind == StringKind::Apc
                && session.parser.string_buf.len() < APC_BUF_LIMIT
            {
                session.parser.string_buf.push(byte as char);
            }
        }
    }
}

fn finish_sos_pm_apc(session: &mut Session, ctx: &mut SessionCtx<'_>) {
    session.parser.mode = ParseMode::Ground;
    let data = std::mem::take(&mut session.parser.string_buf);
    if session.parser.string_kind == StringKind::Apc && data.starts_with('G') {
        kitty::process_apc(session, ctx, &data[1..]);
    }
}

// ── VT52 ────────────────────────────────────────────────────────────────

fn vt52_escape(session: &mut Session, ctx: &mut SessionCtx<'_>, byte: u8) {
    session.parser.mode = ParseMode::Ground;
    match byte {
        b'A' => session.cursor_up(1),
        b'B' => session.cursor_down(1),
        b'C' => session.cursor_right(1),
        b'D' => session.cursor_left(1),
        b'F' => session.charsets.g[0] = Charset::DecSpecial,
        b'G' => session.charsets.g[0] = Charset::Ascii,
        b'H' => session.set_cursor(term_row(1), term_col(1)),
        b'I' => session.reverse_index(),
        b'J' => session.erase_in_display(EraseMode::ToEnd, false),
        b'K' => session.erase_in_line(EraseMode::ToEnd, false),
        b'Y' => session.parser.mode = ParseMode::Vt52Row,
        b'Z' => ctx.responses.push_str("\x1b/Z"),
        b'=' => session.modes.keypad_app = true,
        b'>' => session.modes.keypad_app = false,
        b'<' => session.modes.ansi = true,
        _ => {
            ctx.errors.warn(
                ErrorSource::Parser,
                &format!("unknown VT52 escape 0x{byte:02X}"),
            );
        }
    }
}
