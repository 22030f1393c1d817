// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! OSC dispatch: window titles, palette set/query (OSC 4, multi-entry),
//! dynamic colors (10/11/12) and their resets (104/110/111/112), and the
//! OSC 52 clipboard channel.

use crate::core::codec::{base64_decode, base64_encode};
use crate::core::grid::{format_color_spec, parse_color_spec};
use crate::core::session::Session;
use crate::core::terminal::{CrossAction, ErrorSource, SessionCtx, TermEvent};

/// Cap on clipboard payloads accepted through OSC 52.
const CLIPBOARD_LIMIT: usize = 64 * 1024;

pub fn dispatch(_session: &mut Session, ctx: &mut SessionCtx<'_>, payload: &str) {
    let (selector, rest) = match payload.split_once(';') {
        Some((selector, rest)) => (selector, rest),
        None => (payload, ""),
    };
    let Ok(code) = selector.parse::<u32>() else {
        ctx.errors.warn(ErrorSource::Parser, &format!("malformed OSC selector {selector:?}"));
        return;
    };

    match code {
        0 => {
            ctx.actions.push(CrossAction::Event(TermEvent::Title(rest.to_string())));
            ctx.actions.push(CrossAction::Event(TermEvent::IconTitle(rest.to_string())));
        }
        1 => ctx.actions.push(CrossAction::Event(TermEvent::IconTitle(rest.to_string()))),
        2 => ctx.actions.push(CrossAction::Event(TermEvent::Title(rest.to_string()))),
        4 => palette_pairs(ctx, rest),
        8 => {
            // Hyperlinks are a renderer concern; swallowed without error.
        }
        10 | 11 | 12 => dynamic_color(ctx, code, rest),
        52 => clipboard(ctx, rest),
        104 => {
            if rest.is_empty() {
                ctx.palette.reset_all();
            } else {
                for part in rest.split(';') {
                    if let Ok(index) = part.trim().parse::<u32>()
                        && index < 256
                    {
                        ctx.palette.reset_entry(index as u8);
                    }
                }
            }
        }
        110 => ctx.dynamic.foreground = crate::core::grid::DynamicColors::default().foreground,
        111 => ctx.dynamic.background = crate::core::grid::DynamicColors::default().background,
        112 => ctx.dynamic.cursor = crate::core::grid::DynamicColors::default().cursor,
        _ => {
            ctx.errors.warn(ErrorSource::Parser, &format!("unhandled OSC {code}"));
        }
    }
}

/// OSC 4 carries `index;spec` pairs, any number of them, where a spec of
/// `?` queries. Replies mirror the request: `OSC 4 ; index ; rgb:… ST`.
fn palette_pairs(ctx: &mut SessionCtx<'_>, rest: &str) {
    let mut parts = rest.split(';');
    loop {
        let Some(index_text) = parts.next() else { break };
        let Some(spec) = parts.next() else { break };
        let Ok(index) = index_text.trim().parse::<u32>() else { continue };
        if index >= 256 {
            continue;
        }
        let index = index as u8;
        if spec.trim() == "?" {
            let spec = format_color_spec(ctx.palette.get(index));
            ctx.responses.push_str(&format!("\x1b]4;{index};{spec}\x1b\\"));
        } else if let Some(rgb) = parse_color_spec(spec) {
            ctx.palette.set(index, rgb);
        } else {
            ctx.errors.warn(
                ErrorSource::Parser,
                &format!("OSC 4: bad color spec {spec:?} for index {index}"),
            );
        }
    }
}

/// OSC 10/11/12: set or query the dynamic foreground/background/cursor
/// colors.
fn dynamic_color(ctx: &mut SessionCtx<'_>, code: u32, rest: &str) {
    let slot = match code {
        10 => &mut ctx.dynamic.foreground,
        11 => &mut ctx.dynamic.background,
        _ => &mut ctx.dynamic.cursor,
    };
    if rest.trim() == "?" {
        let spec = format_color_spec(*slot);
        ctx.responses.push_str(&format!("\x1b]{code};{spec}\x1b\\"));
    } else if let Some(rgb) = parse_color_spec(rest) {
        *slot = rgb;
    }
}

/// OSC 52: `Pc;Pd` where Pd is base64 data, `?` to query, or `!`/empty to
/// clear. The selection character set (`c`, `p`, `s`…) is accepted and
/// collapsed onto the single core clipboard.
fn clipboard(ctx: &mut SessionCtx<'_>, rest: &str) {
    let (_selection, data) = match rest.split_once(';') {
        Some(pair) => pair,
        None => ("", rest),
    };
    match data.trim() {
        "?" => {
            let encoded = base64_encode(ctx.clipboard);
            ctx.responses.push_str(&format!("\x1b]52;c;{encoded}\x1b\\"));
        }
        "" | "!" => ctx.clipboard.clear(),
        payload => {
            let bytes = base64_decode(payload.as_bytes(), CLIPBOARD_LIMIT);
            *ctx.clipboard = bytes.clone();
            ctx.actions.push(CrossAction::Event(TermEvent::ClipboardSet(bytes)));
        }
    }
}
