// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The Gateway `PIPE` command: inject payload bytes into the session's
//! input path.
//!
//! `PIPE;VT;<B64|HEX|RAW>;<payload>` decodes and feeds the bytes straight
//! into the inbox. `PIPE;BANNER;<options>` renders large block-glyph text
//! (8x8 built-in font, U+2588 pixels) with optional alignment and a
//! two-color 24-bit gradient, emitting the result as ordinary terminal
//! text.

use super::dispatcher::GatewayReply;
use super::lexer;
use crate::core::codec::{base64_decode, hex_decode};
use crate::core::grid::Rgb;
use crate::core::terminal::Terminal;

/// Injection payload cap (matches the owned line-buffer bound the banner
/// path uses).
const PIPE_LIMIT: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone)]
struct BannerOptions {
    text: String,
    align: Align,
    gradient: Option<(Rgb, Rgb)>,
}

pub fn handle(term: &mut Terminal, session: usize, reply: &GatewayReply, params: &str) {
    let (format, rest) = match params.split_once(';') {
        Some(pair) => pair,
        None => (params, ""),
    };
    match format.to_ascii_uppercase().as_str() {
        "VT" => {
            let (encoding, payload) = match rest.split_once(';') {
                Some(pair) => pair,
                None => {
                    reply.respond(term, "ERR;PIPE;MISSING_PAYLOAD");
                    return;
                }
            };
            let bytes = match encoding.to_ascii_uppercase().as_str() {
                "B64" => base64_decode(payload.as_bytes(), PIPE_LIMIT),
                "HEX" => hex_decode(payload.as_bytes(), PIPE_LIMIT),
                "RAW" => payload.as_bytes().iter().copied().take(PIPE_LIMIT).collect(),
                other => {
                    reply.respond(term, &format!("ERR;PIPE;BAD_ENCODING;{other}"));
                    return;
                }
            };
            let count = bytes.len();
            term.write_bytes(session, &bytes);
            reply.respond(term, &format!("OK;PIPE;{count}"));
        }
        "BANNER" => {
            let options = parse_banner_options(rest);
            if options.text.is_empty() {
                reply.respond(term, "ERR;BANNER;NO_TEXT");
                return;
            }
            let cols = term.session(session).map_or(80, |s| s.cols);
            let rendered = render_banner(&options, cols);
            term.write_bytes(session, rendered.as_bytes());
            reply.respond(term, &format!("OK;BANNER;{}", options.text.len()));
        }
        other => reply.respond(term, &format!("ERR;PIPE;BAD_FORMAT;{other}")),
    }
}

fn parse_banner_options(params: &str) -> BannerOptions {
    let mut options = BannerOptions {
        text: String::new(),
        align: Align::Left,
        gradient: None,
    };
    for part in lexer::split_fields(params) {
        match lexer::split_key_value(&part) {
            Some((key, value)) => match key.to_ascii_uppercase().as_str() {
                "TEXT" => options.text = value.to_string(),
                "ALIGN" => {
                    options.align = match value.to_ascii_uppercase().as_str() {
                        "CENTER" => Align::Center,
                        "RIGHT" => Align::Right,
                        _ => Align::Left,
                    };
                }
                "GRADIENT" => {
                    if let Some((a, b)) = value.split_once('|')
                        && let (Some(start), Some(end)) =
                            (parse_banner_color(a), parse_banner_color(b))
                    {
                        options.gradient = Some((start, end));
                    }
                }
                // FONT and MODE are accepted for compatibility; the core
                // only carries the built-in bitmap font.
                _ => {}
            },
            None => {
                if options.text.is_empty() && !part.is_empty() {
                    options.text = part;
                }
            }
        }
    }
    options
}

fn parse_banner_color(text: &str) -> Option<Rgb> {
    crate::core::grid::parse_color_spec(text).or_else(|| {
        let mut parts = text.split(',');
        let r = parts.next()?.trim().parse().ok()?;
        let g = parts.next()?.trim().parse().ok()?;
        let b = parts.next()?.trim().parse().ok()?;
        Some(Rgb::new(r, g, b))
    })
}

/// Render the banner into terminal text: 8 lines of block glyphs plus
/// CR/LF, bounded by the pipe limit.
fn render_banner(options: &BannerOptions, cols: usize) -> String {
    let text: Vec<char> = options.text.chars().collect();
    let glyph_width = 8usize;
    let total_width = text.len() * glyph_width;
    let padding = match options.align {
        Align::Left => 0,
        Align::Center => cols.saturating_sub(total_width) / 2,
        Align::Right => cols.saturating_sub(total_width),
    };

    let mut out = String::new();
    for row in 0..8 {
        let mut line = String::new();
        line.push_str(&" ".repeat(padding));
        for (i, &ch) in text.iter().enumerate() {
            if let Some((start, end)) = options.gradient {
                let t = if text.len() > 1 {
                    i as f64 / (text.len() - 1) as f64
                } else {
                    0.0
                };
                let lerp = |a: u8, b: u8| -> u8 {
                    (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as u8
                };
                line.push_str(&format!(
                    "\x1b[38;2;{};{};{}m",
                    lerp(start.r, end.r),
                    lerp(start.g, end.g),
                    lerp(start.b, end.b)
                ));
            }
            let bits = glyph(ch.to_ascii_uppercase())[row];
            for bit in (0..8).rev() {
                line.push(if bits & (1 << bit) != 0 { '█' } else { ' ' });
            }
        }
        if options.gradient.is_some() {
            line.push_str("\x1b[0m");
        }
        line.push_str("\r\n");
        if out.len() + line.len() > PIPE_LIMIT {
            break;
        }
        out.push_str(&line);
    }
    out
}

/// Built-in 8x8 bitmap font covering the banner repertoire. Bit 7 is the
/// leftmost pixel.
fn glyph(ch: char) -> [u8; 8] {
    match ch {
        'A' => [0x30, 0x78, 0xCC, 0xCC, 0xFC, 0xCC, 0xCC, 0x00],
        'B' => [0xFC, 0x66, 0x66, 0x7C, 0x66, 0x66, 0xFC, 0x00],
        'C' => [0x3C, 0x66, 0xC0, 0xC0, 0xC0, 0x66, 0x3C, 0x00],
        'D' => [0xF8, 0x6C, 0x66, 0x66, 0x66, 0x6C, 0xF8, 0x00],
        'E' => [0xFE, 0x62, 0x68, 0x78, 0x68, 0x62, 0xFE, 0x00],
        'F' => [0xFE, 0x62, 0x68, 0x78, 0x68, 0x60, 0xF0, 0x00],
        'G' => [0x3C, 0x66, 0xC0, 0xC0, 0xCE, 0x66, 0x3E, 0x00],
        'H' => [0xCC, 0xCC, 0xCC, 0xFC, 0xCC, 0xCC, 0xCC, 0x00],
        'I' => [0x78, 0x30, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00],
        'J' => [0x1E, 0x0C, 0x0C, 0x0C, 0xCC, 0xCC, 0x78, 0x00],
        'K' => [0xE6, 0x66, 0x6C, 0x78, 0x6C, 0x66, 0xE6, 0x00],
        'L' => [0xF0, 0x60, 0x60, 0x60, 0x62, 0x66, 0xFE, 0x00],
        'M' => [0xC6, 0xEE, 0xFE, 0xFE, 0xD6, 0xC6, 0xC6, 0x00],
        'N' => [0xC6, 0xE6, 0xF6, 0xDE, 0xCE, 0xC6, 0xC6, 0x00],
        'O' => [0x38, 0x6C, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00],
        'P' => [0xFC, 0x66, 0x66, 0x7C, 0x60, 0x60, 0xF0, 0x00],
        'Q' => [0x78, 0xCC, 0xCC, 0xCC, 0xDC, 0x78, 0x1C, 0x00],
        'R' => [0xFC, 0x66, 0x66, 0x7C, 0x6C, 0x66, 0xE6, 0x00],
        'S' => [0x78, 0xCC, 0xE0, 0x70, 0x1C, 0xCC, 0x78, 0x00],
        'T' => [0xFC, 0xB4, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00],
        'U' => [0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xFC, 0x00],
        'V' => [0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x00],
        'W' => [0xC6, 0xC6, 0xC6, 0xD6, 0xFE, 0xEE, 0xC6, 0x00],
        'X' => [0xC6, 0xC6, 0x6C, 0x38, 0x38, 0x6C, 0xC6, 0x00],
        'Y' => [0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x30, 0x78, 0x00],
        'Z' => [0xFE, 0xC6, 0x8C, 0x18, 0x32, 0x66, 0xFE, 0x00],
        '0' => [0x7C, 0xC6, 0xCE, 0xDE, 0xF6, 0xE6, 0x7C, 0x00],
        '1' => [0x30, 0x70, 0x30, 0x30, 0x30, 0x30, 0xFC, 0x00],
        '2' => [0x78, 0xCC, 0x0C, 0x38, 0x60, 0xCC, 0xFC, 0x00],
        '3' => [0x78, 0xCC, 0x0C, 0x38, 0x0C, 0xCC, 0x78, 0x00],
        '4' => [0x1C, 0x3C, 0x6C, 0xCC, 0xFE, 0x0C, 0x1E, 0x00],
        '5' => [0xFC, 0xC0, 0xF8, 0x0C, 0x0C, 0xCC, 0x78, 0x00],
        '6' => [0x38, 0x60, 0xC0, 0xF8, 0xCC, 0xCC, 0x78, 0x00],
        '7' => [0xFC, 0xCC, 0x0C, 0x18, 0x30, 0x30, 0x30, 0x00],
        '8' => [0x78, 0xCC, 0xCC, 0x78, 0xCC, 0xCC, 0x78, 0x00],
        '9' => [0x78, 0xCC, 0xCC, 0x7C, 0x0C, 0x18, 0x70, 0x00],
        '!' => [0x30, 0x78, 0x78, 0x30, 0x30, 0x00, 0x30, 0x00],
        '?' => [0x78, 0xCC, 0x0C, 0x18, 0x30, 0x00, 0x30, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x00],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x60],
        '-' => [0x00, 0x00, 0x00, 0xFC, 0x00, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x30, 0x30, 0x00, 0x00, 0x30, 0x30, 0x00],
        _ => [0x00; 8],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::base64_encode;
    use crate::core::gateway::dispatch;
    use crate::core::terminal::TermConfig;
    use pretty_assertions::assert_eq;

    fn term() -> Terminal {
        Terminal::new(TermConfig::default()).unwrap()
    }

    fn run(term: &mut Terminal, payload: &str) -> String {
        dispatch(term, 0, payload);
        term.update();
        String::from_utf8_lossy(&term.drain_responses()).into_owned()
    }

    #[test]
    fn vt_pipe_b64_injects_decoded_bytes() {
        let mut t = term();
        let encoded = base64_encode(b"hi\x1b[31m!");
        let reply = run(&mut t, &format!("KTERM;0;PIPE;VT;B64;{encoded}"));
        assert!(reply.contains("OK;PIPE;8"), "{reply}");
        // The injected bytes went through the parser: text printed, SGR
        // applied.
        let cell = *t.session(0).unwrap().grid().cell(2, 0).unwrap();
        assert_eq!(cell.ch, '!');
        assert_eq!(cell.fg, crate::core::grid::Color::Indexed(1));
    }

    #[test]
    fn vt_pipe_hex_and_raw() {
        let mut t = term();
        run(&mut t, "KTERM;0;PIPE;VT;HEX;4849");
        let grid_h = t.session(0).unwrap().grid().cell(0, 0).unwrap().ch;
        assert_eq!(grid_h, 'H');
        run(&mut t, "KTERM;0;PIPE;VT;RAW;!");
        assert_eq!(t.session(0).unwrap().grid().cell(2, 0).unwrap().ch, '!');
    }

    #[test]
    fn banner_renders_block_glyph_rows() {
        let mut t = term();
        let reply = run(&mut t, "KTERM;0;PIPE;BANNER;TEXT=HI");
        assert!(reply.contains("OK;BANNER;2"), "{reply}");
        // Eight rows tall, containing block pixels.
        let grid = t.session(0).unwrap().grid();
        let mut block_rows = 0;
        for y in 0..8 {
            let has_blocks = (0..16).any(|x| grid.cell(x, y).unwrap().ch == '█');
            if has_blocks {
                block_rows += 1;
            }
        }
        assert!(block_rows >= 6, "only {block_rows} rows had pixels");
    }

    #[test]
    fn banner_center_alignment_pads() {
        let mut t = term();
        run(&mut t, "KTERM;0;PIPE;BANNER;TEXT=A;ALIGN=CENTER");
        let grid = t.session(0).unwrap().grid();
        // 80 cols, 8 wide glyph: padding 36 columns of spaces.
        for x in 0..36 {
            assert_eq!(grid.cell(x, 0).unwrap().ch, ' ');
        }
    }

    #[test]
    fn banner_gradient_applies_truecolor() {
        let mut t = term();
        run(
            &mut t,
            "KTERM;0;PIPE;BANNER;TEXT=AB;GRADIENT=#ff0000|#0000ff",
        );
        let grid = t.session(0).unwrap().grid();
        let mut seen_red = false;
        let mut seen_blue = false;
        for y in 0..8 {
            for x in 0..16 {
                match grid.cell(x, y).unwrap().fg {
                    crate::core::grid::Color::Rgb(255, 0, 0) => seen_red = true,
                    crate::core::grid::Color::Rgb(0, 0, 255) => seen_blue = true,
                    _ => {}
                }
            }
        }
        assert!(seen_red && seen_blue);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let mut t = term();
        let reply = run(&mut t, "KTERM;0;PIPE;VT;ROT13;abc");
        assert!(reply.contains("ERR;PIPE;BAD_ENCODING"), "{reply}");
    }
}
