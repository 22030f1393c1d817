// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! ReGIS interpreter (`DCS p`).
//!
//! Covers the vector-graphics subset the renderer overlays: position (P),
//! vectors (V), curves/circles (C), text (T), writing attributes (W,
//! including the intensity/color selector), screen erase (S(E)), and named
//! macrographs (`@:name … @;`, invoked with `@name`). Macro bodies are
//! owned strings; a subsystem reset frees them along with everything else.

use rustc_hash::FxHashMap;

/// Drawables the renderer consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisPrimitive {
    Line { x1: i32, y1: i32, x2: i32, y2: i32, color: u8 },
    Point { x: i32, y: i32, color: u8 },
    Circle { cx: i32, cy: i32, radius: i32, color: u8 },
    Text { x: i32, y: i32, text: String, color: u8 },
}

#[derive(Debug, Clone, Default)]
pub struct RegisState {
    pub x: i32,
    pub y: i32,
    pub color: u8,
    pub primitives: Vec<RegisPrimitive>,
    macros: FxHashMap<char, String>,
    /// Recursion guard for macro invocation.
    depth: u8,
}

impl RegisState {
    /// `RESET;REGIS`: drops primitives and every stored macro body.
    pub fn reset(&mut self) { *self = Self::default(); }

    #[must_use]
    pub fn macro_count(&self) -> usize { self.macros.len() }
}

const MAX_MACRO_DEPTH: u8 = 4;
const MAX_MACRO_BODY: usize = 2048;

/// Interpret one DCS data string against the session's ReGIS state.
pub fn interpret(session: &mut crate::core::session::Session, text: &str) {
    let mut state = std::mem::take(&mut session.regis);
    run(&mut state, text);
    session.regis = state;
}

fn run(state: &mut RegisState, text: &str) {
    let bytes: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    while i < bytes.len() {
        let ch = bytes[i].to_ascii_uppercase();
        match ch {
            'P' => {
                i += 1;
                if let Some((pos, next)) = parse_coords(&bytes, i, state.x, state.y) {
                    state.x = pos.0;
                    state.y = pos.1;
                    i = next;
                }
            }
            'V' => {
                i += 1;
                // A chain of coordinate pairs draws connected vectors.
                while let Some(((nx, ny), next)) = parse_coords(&bytes, i, state.x, state.y) {
                    state.primitives.push(RegisPrimitive::Line {
                        x1: state.x,
                        y1: state.y,
                        x2: nx,
                        y2: ny,
                        color: state.color,
                    });
                    state.x = nx;
                    state.y = ny;
                    i = next;
                }
            }
            'C' => {
                i += 1;
                if let Some(((nx, ny), next)) = parse_coords(&bytes, i, state.x, state.y) {
                    let dx = nx - state.x;
                    let dy = ny - state.y;
                    let radius = ((dx * dx + dy * dy) as f64).sqrt() as i32;
                    state.primitives.push(RegisPrimitive::Circle {
                        cx: state.x,
                        cy: state.y,
                        radius,
                        color: state.color,
                    });
                    i = next;
                }
            }
            'T' => {
                i += 1;
                if let Some((text, next)) = parse_quoted(&bytes, i) {
                    state.primitives.push(RegisPrimitive::Text {
                        x: state.x,
                        y: state.y,
                        text,
                        color: state.color,
                    });
                    i = next;
                }
            }
            'W' => {
                i += 1;
                i = parse_writing_attrs(state, &bytes, i);
            }
            'S' => {
                i += 1;
                // S(E) erases the composition.
                if matches!(peek_option(&bytes, i), Some('E')) {
                    state.primitives.clear();
                    i += 3; // consume "(E)"
                }
            }
            '@' => {
                i += 1;
                i = handle_macro(state, &bytes, i);
            }
            _ => i += 1,
        }
    }
}

fn peek_option(bytes: &[char], i: usize) -> Option<char> {
    if bytes.get(i) == Some(&'(') {
        bytes.get(i + 1).map(|c| c.to_ascii_uppercase())
    } else {
        None
    }
}

/// `[x,y]` with optional signs; a bare `[,y]` or `[x]` keeps the other
/// axis. Signed values are relative per ReGIS.
fn parse_coords(bytes: &[char], mut i: usize, cur_x: i32, cur_y: i32) -> Option<((i32, i32), usize)> {
    while bytes.get(i) == Some(&' ') {
        i += 1;
    }
    if bytes.get(i) != Some(&'[') {
        return None;
    }
    i += 1;
    let (x, next) = parse_axis(bytes, i, cur_x)?;
    i = next;
    let y = if bytes.get(i) == Some(&',') {
        let (y, next) = parse_axis(bytes, i + 1, cur_y)?;
        i = next;
        y
    } else {
        cur_y
    };
    if bytes.get(i) == Some(&']') {
        Some(((x, y), i + 1))
    } else {
        None
    }
}

fn parse_axis(bytes: &[char], mut i: usize, current: i32) -> Option<(i32, usize)> {
    let mut sign = 0i32;
    if bytes.get(i) == Some(&'+') {
        sign = 1;
        i += 1;
    } else if bytes.get(i) == Some(&'-') {
        sign = -1;
        i += 1;
    }
    let start = i;
    let mut value = 0i32;
    while let Some(ch) = bytes.get(i) {
        if let Some(d) = ch.to_digit(10) {
            value = (value * 10 + d as i32).min(32767);
            i += 1;
        } else {
            break;
        }
    }
    if i == start && sign == 0 {
        // Empty axis keeps the current value.
        return Some((current, i));
    }
    let value = match sign {
        1 => current + value,
        -1 => current - value,
        _ => value,
    };
    Some((value, i))
}

fn parse_quoted(bytes: &[char], mut i: usize) -> Option<(String, usize)> {
    while bytes.get(i) == Some(&' ') {
        i += 1;
    }
    let quote = *bytes.get(i)?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    i += 1;
    let mut out = String::new();
    while let Some(&ch) = bytes.get(i) {
        if ch == quote {
            return Some((out, i + 1));
        }
        out.push(ch);
        i += 1;
    }
    None
}

/// `W(In)` selects intensity/color index n; other options are skipped.
fn parse_writing_attrs(state: &mut RegisState, bytes: &[char], mut i: usize) -> usize {
    if bytes.get(i) != Some(&'(') {
        return i;
    }
    i += 1;
    while let Some(&ch) = bytes.get(i) {
        match ch.to_ascii_uppercase() {
            ')' => return i + 1,
            'I' => {
                i += 1;
                let mut value = 0i32;
                let mut any = false;
                while let Some(d) = bytes.get(i).and_then(|c| c.to_digit(10)) {
                    value = value * 10 + d as i32;
                    any = true;
                    i += 1;
                }
                if any {
                    state.color = value.clamp(0, 255) as u8;
                }
            }
            _ => i += 1,
        }
    }
    i
}

/// `@:name body @;` defines; `@name` invokes.
fn handle_macro(state: &mut RegisState, bytes: &[char], mut i: usize) -> usize {
    match bytes.get(i) {
        Some(&':') => {
            i += 1;
            let Some(&name) = bytes.get(i) else { return i };
            i += 1;
            let mut body = String::new();
            while i < bytes.len() {
                if bytes[i] == '@' && bytes.get(i + 1) == Some(&';') {
                    i += 2;
                    break;
                }
                if body.len() < MAX_MACRO_BODY {
                    body.push(bytes[i]);
                }
                i += 1;
            }
            state.macros.insert(name.to_ascii_uppercase(), body);
            i
        }
        Some(&name) => {
            i += 1;
            if state.depth < MAX_MACRO_DEPTH
                && let Some(body) = state.macros.get(&name.to_ascii_uppercase()).cloned()
            {
                state.depth += 1;
                run(state, &body);
                state.depth -= 1;
            }
            i
        }
        None => i,
    }
}
