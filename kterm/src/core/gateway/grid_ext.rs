// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The `grid` Gateway extension: direct grid mutation with masked fills,
//! rect copy/move, cell streams, line spans, and filled circles.
//!
//! Coordinates accept absolute values or `+N`/`-N` cursor-relative forms;
//! negative spans mirror around the origin (`x=20,w=-5` selects columns
//! 15..=19). Every command answers `OK;QUEUED;<count>` with the number of
//! ops queued.

use super::dispatcher::{GatewayReply, parse_attr_string, parse_gateway_color};
use super::lexer;
use crate::core::grid::{Cell, CellFlags, Color, FillMask, UnderlineStyle};
use crate::core::ops::Op;
use crate::core::session::MAX_SESSIONS;
use crate::core::terminal::Terminal;
use crate::core::units::GridRect;

pub fn handle(term: &mut Terminal, session: usize, args: &str, reply: &GatewayReply) {
    let fields = lexer::split_fields(args);
    let Some(verb) = fields.first() else {
        reply.respond(term, "ERR;GRID;MISSING_VERB");
        return;
    };
    let result = match verb.to_ascii_lowercase().as_str() {
        "fill" => fill(term, session, &fields[1..]),
        "fill_line" => fill_line(term, session, &fields[1..]),
        "fill_circle" => fill_circle(term, session, &fields[1..]),
        "copy" => copy_or_move(term, session, &fields[1..], false),
        "move" => copy_or_move(term, session, &fields[1..], true),
        "stream" => stream(term, session, &fields[1..]),
        other => Err(format!("UNKNOWN_VERB;{other}")),
    };
    match result {
        Ok(count) => reply.respond(term, &format!("OK;QUEUED;{count}")),
        Err(msg) => reply.respond(term, &format!("ERR;GRID;{msg}")),
    }
}

/// Resolve the target session index (first field of every grid command).
fn target_session(term: &mut Terminal, invoking: usize, field: Option<&String>) -> Result<usize, String> {
    let index = field
        .and_then(|f| f.trim().parse::<usize>().ok())
        .unwrap_or(invoking);
    if index >= MAX_SESSIONS {
        return Err("BAD_SESSION".into());
    }
    term.open_session(index);
    Ok(index)
}

/// Build the masked template cell from the six value fields
/// `ch;fg;bg;ul;style;flags`.
fn parse_cell(fields: &[String]) -> (FillMaskValues, usize) {
    let get = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");
    let ch = get(0)
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(' ');
    let fg = parse_gateway_color(get(1)).unwrap_or(Color::Default);
    let bg = parse_gateway_color(get(2)).unwrap_or(Color::Default);
    let ul = parse_gateway_color(get(3)).unwrap_or(Color::Default);
    let style = UnderlineStyle::from_bits(get(4).trim().parse::<u32>().unwrap_or(0));
    let flags = parse_attr_string(get(5));
    (FillMaskValues { ch, fg, bg, ul, style, flags }, 6)
}

struct FillMaskValues {
    ch: char,
    fg: Color,
    bg: Color,
    ul: Color,
    style: UnderlineStyle,
    flags: CellFlags,
}

impl FillMaskValues {
    fn to_cell(&self) -> Cell {
        let mut cell = Cell {
            ch: self.ch,
            fg: self.fg,
            bg: self.bg,
            ul: self.ul,
            flags: self.flags,
            generation: 0,
        };
        cell.set_underline_style(self.style);
        cell
    }
}

/// Resolve `(x, y)` honoring cursor-relative syntax against `session`.
fn resolve_xy(term: &Terminal, session: usize, x: &str, y: &str) -> Result<(usize, usize), String> {
    let cursor = term
        .session(session)
        .map(|s| (s.cursor.x, s.cursor.y))
        .ok_or("BAD_SESSION")?;
    let x = lexer::parse_coord(x, cursor.0).ok_or("BAD_X")?;
    let y = lexer::parse_coord(y, cursor.1).ok_or("BAD_Y")?;
    Ok((x, y))
}

/// Apply negative-span mirroring: `origin=20, span=-5` becomes
/// `origin=15, span=5`.
fn mirror_span(origin: usize, span: i64) -> (usize, usize) {
    if span < 0 {
        let span = span.unsigned_abs() as usize;
        (origin.saturating_sub(span), span)
    } else {
        (origin, span as usize)
    }
}

/// `fill;sid;x;y;w;h;mask;ch;fg;bg;ul;style;flags`
fn fill(term: &mut Terminal, invoking: usize, fields: &[String]) -> Result<usize, String> {
    let sid = target_session(term, invoking, fields.first())?;
    let (x, y) = resolve_xy(term, sid, field(fields, 1)?, field(fields, 2)?)?;
    let w = lexer::parse_span(field(fields, 3)?).ok_or("BAD_W")?;
    let h = lexer::parse_span(field(fields, 4)?).ok_or("BAD_H")?;
    let mask_bits = field(fields, 5)?.trim().parse::<u8>().map_err(|_| "BAD_MASK".to_string())?;
    let mask = FillMask::from_bits_truncate(mask_bits);
    let (values, _) = parse_cell(&fields[6..]);

    let (x, w) = mirror_span(x, w);
    let (y, h) = mirror_span(y, h);
    let rect = GridRect::new(x, y, w, h);
    let session = term.session_mut(sid).ok_or("BAD_SESSION")?;
    let op = Op::FillRectMasked { rect, mask, cell: values.to_cell() };
    session.op_queue.push(op).map_err(|e| e.to_string())?;
    Ok(1)
}

/// `fill_line;sid;x;y;h|v;len;mask;cell…[;wrap]`
fn fill_line(term: &mut Terminal, invoking: usize, fields: &[String]) -> Result<usize, String> {
    let sid = target_session(term, invoking, fields.first())?;
    let (x, y) = resolve_xy(term, sid, field(fields, 1)?, field(fields, 2)?)?;
    let direction = field(fields, 3)?.trim().to_ascii_lowercase();
    let len = field(fields, 4)?.trim().parse::<usize>().map_err(|_| "BAD_LEN".to_string())?;
    let mask_bits = field(fields, 5)?.trim().parse::<u8>().map_err(|_| "BAD_MASK".to_string())?;
    let mask = FillMask::from_bits_truncate(mask_bits);
    let (values, consumed) = parse_cell(&fields[6..]);
    let wrap = fields.get(6 + consumed).is_some_and(|f| f.trim() == "1");

    let session = term.session_mut(sid).ok_or("BAD_SESSION")?;
    let cell = values.to_cell();
    let mut queued = 0usize;
    match direction.as_str() {
        "h" => {
            if wrap {
                // Wrapping span: one op per segment, row by row.
                let cols = session.cols;
                let mut x = x;
                let mut y = y;
                let mut remaining = len;
                while remaining > 0 && y < session.rows {
                    let span = remaining.min(cols - x);
                    let op = Op::FillRectMasked {
                        rect: GridRect::new(x, y, span, 1),
                        mask,
                        cell,
                    };
                    session.op_queue.push(op).map_err(|e| e.to_string())?;
                    queued += 1;
                    remaining -= span;
                    x = 0;
                    y += 1;
                }
            } else {
                let op = Op::FillRectMasked { rect: GridRect::new(x, y, len, 1), mask, cell };
                session.op_queue.push(op).map_err(|e| e.to_string())?;
                queued = 1;
            }
        }
        "v" => {
            let op = Op::FillRectMasked { rect: GridRect::new(x, y, 1, len), mask, cell };
            session.op_queue.push(op).map_err(|e| e.to_string())?;
            queued = 1;
        }
        _ => return Err("BAD_DIRECTION".into()),
    }
    Ok(queued)
}

/// `fill_circle;sid;cx;cy;radius;mask;cell…` - membership is
/// `dx^2 + dy^2 <= r^2`.
fn fill_circle(term: &mut Terminal, invoking: usize, fields: &[String]) -> Result<usize, String> {
    let sid = target_session(term, invoking, fields.first())?;
    let (cx, cy) = resolve_xy(term, sid, field(fields, 1)?, field(fields, 2)?)?;
    let radius = field(fields, 3)?.trim().parse::<i64>().map_err(|_| "BAD_RADIUS".to_string())?;
    let mask_bits = field(fields, 4)?.trim().parse::<u8>().map_err(|_| "BAD_MASK".to_string())?;
    let mask = FillMask::from_bits_truncate(mask_bits);
    let (values, _) = parse_cell(&fields[5..]);

    let session = term.session_mut(sid).ok_or("BAD_SESSION")?;
    let cell = values.to_cell();
    let radius = radius.unsigned_abs() as i64;
    let (cx, cy) = (cx as i64, cy as i64);
    let mut queued = 0usize;
    // One fill op per scanline chord.
    for dy in -radius..=radius {
        let y = cy + dy;
        if y < 0 || y as usize >= session.rows {
            continue;
        }
        let span_sq = radius * radius - dy * dy;
        let half = (span_sq as f64).sqrt().floor() as i64;
        let x1 = (cx - half).max(0);
        let x2 = cx + half;
        if x2 < 0 || x1 as usize >= session.cols {
            continue;
        }
        let rect = GridRect::new(x1 as usize, y as usize, (x2 - x1 + 1) as usize, 1);
        session
            .op_queue
            .push(Op::FillRectMasked { rect, mask, cell })
            .map_err(|e| e.to_string())?;
        queued += 1;
    }
    Ok(queued)
}

/// `copy|move;sid;sx;sy;w;h;dx;dy`
fn copy_or_move(
    term: &mut Terminal,
    invoking: usize,
    fields: &[String],
    clear_source: bool,
) -> Result<usize, String> {
    let sid = target_session(term, invoking, fields.first())?;
    let (sx, sy) = resolve_xy(term, sid, field(fields, 1)?, field(fields, 2)?)?;
    let w = lexer::parse_span(field(fields, 3)?).ok_or("BAD_W")?;
    let h = lexer::parse_span(field(fields, 4)?).ok_or("BAD_H")?;
    let (dx, dy) = resolve_xy(term, sid, field(fields, 5)?, field(fields, 6)?)?;
    let (sx, w) = mirror_span(sx, w);
    let (sy, h) = mirror_span(sy, h);

    let session = term.session_mut(sid).ok_or("BAD_SESSION")?;
    let src = GridRect::new(sx, sy, w, h);
    session
        .op_queue
        .push(Op::CopyRect { src, dst_x: dx, dst_y: dy })
        .map_err(|e| e.to_string())?;
    let mut queued = 1;
    if clear_source {
        session
            .op_queue
            .push(Op::FillRectMasked {
                rect: src,
                mask: FillMask::all(),
                cell: Cell::default(),
            })
            .map_err(|e| e.to_string())?;
        queued += 1;
    }
    Ok(queued)
}

/// `stream;sid;x;y;mask;cell…;cell…;…` - consecutive cells left to right,
/// wrapping at the right edge.
fn stream(term: &mut Terminal, invoking: usize, fields: &[String]) -> Result<usize, String> {
    let sid = target_session(term, invoking, fields.first())?;
    let (mut x, mut y) = resolve_xy(term, sid, field(fields, 1)?, field(fields, 2)?)?;
    let mask_bits = field(fields, 3)?.trim().parse::<u8>().map_err(|_| "BAD_MASK".to_string())?;
    let mask = FillMask::from_bits_truncate(mask_bits);

    let session = term.session_mut(sid).ok_or("BAD_SESSION")?;
    let mut queued = 0usize;
    let mut rest = &fields[4..];
    while !rest.is_empty() && y < session.rows {
        let (values, consumed) = parse_cell(rest);
        rest = if rest.len() > consumed { &rest[consumed..] } else { &[] };
        session
            .op_queue
            .push(Op::FillRectMasked {
                rect: GridRect::new(x, y, 1, 1),
                mask,
                cell: values.to_cell(),
            })
            .map_err(|e| e.to_string())?;
        queued += 1;
        x += 1;
        if x >= session.cols {
            x = 0;
            y += 1;
        }
    }
    Ok(queued)
}

fn field<'a>(fields: &'a [String], index: usize) -> Result<&'a String, String> {
    fields.get(index).ok_or_else(|| format!("MISSING_FIELD_{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn cell(term: &Terminal, x: usize, y: usize) -> Cell {
        *term.session(0).unwrap().grid().cell(x, y).unwrap()
    }

    #[test]
    fn fill_char_rect() {
        let mut t = term();
        let reply = run(&mut t, "KTERM;0;EXT;grid;fill;0;0;0;5;5;1;65;0;0;0;0;0");
        assert!(reply.contains("OK;QUEUED;1"), "{reply}");
        assert_eq!(cell(&t, 0, 0).ch, 'A');
        assert_eq!(cell(&t, 4, 4).ch, 'A');
        assert_eq!(cell(&t, 5, 5).ch, ' ');
    }

    #[test]
    fn masked_fill_preserves_char() {
        let mut t = term();
        run(&mut t, "KTERM;0;EXT;grid;fill;0;0;0;5;5;1;65;0;0;0;0;0");
        // Mask 2 = FG only.
        run(&mut t, "KTERM;0;EXT;grid;fill;0;1;1;3;3;2;0;pal:1;0;0;0;0");
        let inner = cell(&t, 2, 2);
        assert_eq!(inner.ch, 'A');
        assert_eq!(inner.fg, Color::Indexed(1));
        let outer = cell(&t, 0, 0);
        assert_eq!(outer.fg, Color::Default);
        // Mask 4 = BG, rgb form.
        run(&mut t, "KTERM;0;EXT;grid;fill;0;2;2;1;1;4;0;0;rgb:00ff00;0;0;0");
        let c = cell(&t, 2, 2);
        assert_eq!(c.ch, 'A');
        assert_eq!(c.fg, Color::Indexed(1));
        assert_eq!(c.bg, Color::Rgb(0, 255, 0));
    }

    #[test]
    fn relative_coordinates_resolve_against_cursor() {
        let mut t = term();
        {
            let s = t.session_mut(0).unwrap();
            s.cursor.x = 10;
            s.cursor.y = 10;
        }
        dispatch(&mut t, 0, "KTERM;2;EXT;grid;fill;0;+5;-2;2;2;1;32;0;0;0;0;0");
        let op = t.session(0).unwrap().op_queue.peek().cloned();
        match op {
            Some(Op::FillRectMasked { rect, .. }) => {
                assert_eq!((rect.x, rect.y), (15, 8));
            }
            other => panic!("expected a fill op, got {other:?}"),
        }
    }

    #[test]
    fn negative_width_mirrors() {
        let mut t = term();
        dispatch(&mut t, 0, "KTERM;3;EXT;grid;fill;0;20;5;-5;2;1;32;0;0;0;0;0");
        let op = t.session(0).unwrap().op_queue.peek().cloned();
        match op {
            Some(Op::FillRectMasked { rect, .. }) => {
                assert_eq!((rect.x, rect.w), (15, 5));
            }
            other => panic!("expected a fill op, got {other:?}"),
        }
    }

    #[test]
    fn fill_line_horizontal_vertical_and_wrap() {
        let mut t = term();
        run(&mut t, "KTERM;0;EXT;grid;fill_line;0;0;0;h;5;1;72;0;0;0;0;0");
        for i in 0..5 {
            assert_eq!(cell(&t, i, 0).ch, 'H');
        }
        assert_eq!(cell(&t, 5, 0).ch, ' ');

        run(&mut t, "KTERM;0;EXT;grid;fill_line;0;20;0;v;5;1;86;0;0;0;0;0");
        for i in 0..5 {
            assert_eq!(cell(&t, 20, i).ch, 'V');
        }
        assert_eq!(cell(&t, 20, 5).ch, ' ');

        // Wrap: start 2 cells before the right edge, span 5.
        let sx = t.session(0).unwrap().cols - 2;
        run(
            &mut t,
            &format!("KTERM;0;EXT;grid;fill_line;0;{sx};1;h;5;1;87;0;0;0;0;0;1"),
        );
        assert_eq!(cell(&t, sx, 1).ch, 'W');
        assert_eq!(cell(&t, sx + 1, 1).ch, 'W');
        assert_eq!(cell(&t, 0, 2).ch, 'W');
        assert_eq!(cell(&t, 2, 2).ch, 'W');
        assert_eq!(cell(&t, 3, 2).ch, ' ');
    }

    #[test]
    fn fill_circle_r_squared_membership() {
        let mut t = term();
        run(&mut t, "KTERM;0;EXT;grid;fill_circle;0;10;10;4;1;79;0;0;0;0;0");
        assert_eq!(cell(&t, 10, 10).ch, 'O'); // center
        assert_eq!(cell(&t, 14, 10).ch, 'O'); // boundary
        assert_eq!(cell(&t, 10, 6).ch, 'O'); // top
        assert_eq!(cell(&t, 15, 10).ch, ' '); // outside
        assert_eq!(cell(&t, 13, 13).ch, ' '); // 18 > 16
        assert_eq!(cell(&t, 12, 12).ch, 'O'); // 8 <= 16
    }

    #[test]
    fn move_clears_source() {
        let mut t = term();
        run(&mut t, "KTERM;0;EXT;grid;fill;0;0;0;2;1;1;88;0;0;0;0;0");
        run(&mut t, "KTERM;0;EXT;grid;move;0;0;0;2;1;10;5");
        assert_eq!(cell(&t, 10, 5).ch, 'X');
        assert_eq!(cell(&t, 0, 0).ch, ' ');
    }

    #[test]
    fn stream_places_consecutive_cells() {
        let mut t = term();
        let reply = run(
            &mut t,
            "KTERM;0;EXT;grid;stream;0;0;0;1;72;0;0;0;0;0;73;0;0;0;0;0",
        );
        assert!(reply.contains("OK;QUEUED;2"), "{reply}");
        assert_eq!(cell(&t, 0, 0).ch, 'H');
        assert_eq!(cell(&t, 1, 0).ch, 'I');
    }
}
