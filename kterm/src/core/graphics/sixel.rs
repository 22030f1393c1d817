// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Sixel decoder (`DCS q`).
//!
//! Bytes stream in one at a time from the DCS passthrough state. Output is
//! a list of vertical six-pixel strips the renderer composites at the
//! cursor position; the decoder never allocates a full bitmap. Dimensions
//! are bounded by `max_sixel_width` / `max_sixel_height`: horizontal
//! overflow clamps the raster position, vertical overflow parses but stops
//! emitting strips.

use rustc_hash::FxHashMap;

use crate::core::grid::Rgb;
use crate::core::session::Session;
use crate::core::terminal::TermConfig;

/// One emitted strip: six vertical pixels at (x, y..y+5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SixelStrip {
    pub x: usize,
    pub y: usize,
    /// Bit 0 is the top pixel.
    pub bits: u8,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SixelParse {
    #[default]
    Normal,
    /// Accumulating the `!N` repeat count.
    Repeat,
    /// Accumulating `#Pc;Pu;Px;Py;Pz` palette parameters.
    Color,
    /// Accumulating `"Pan;Pad;Ph;Pv` raster attributes.
    Raster,
}

#[derive(Debug, Clone, Default)]
pub struct SixelState {
    pub active: bool,
    parse: SixelParse,
    pub pos_x: usize,
    pub pos_y: usize,
    repeat: usize,
    params: Vec<i32>,
    current: Option<i32>,
    color_index: u16,
    palette: FxHashMap<u16, Rgb>,
    pub strips: Vec<SixelStrip>,
    /// Declared raster size (`"` attributes), advisory for the renderer.
    pub width: usize,
    pub height: usize,
    /// Transparent (0) vs opaque (1) background per DCS parameter P2.
    pub opaque_bg: bool,
}

impl SixelState {
    pub fn reset(&mut self) { *self = Self::default(); }

    fn current_color(&self) -> Rgb {
        self.palette.get(&self.color_index).copied().unwrap_or(Rgb::new(0xE5, 0xE5, 0xE5))
    }
}

/// DCS hook for final byte `q`.
pub fn begin(session: &mut Session, _config: &TermConfig, opaque_bg: bool) {
    let state = &mut session.sixel;
    state.reset();
    state.active = true;
    state.opaque_bg = opaque_bg;
}

/// ST seen; the strips stay attached to the session for the renderer.
pub fn finish(session: &mut Session) {
    session.sixel.active = false;
}

pub fn process_char(session: &mut Session, config: &TermConfig, ch: char) {
    let state = &mut session.sixel;
    match state.parse {
        SixelParse::Repeat => {
            if ch.is_ascii_digit() {
                let cur = state.current.unwrap_or(0);
                state.current = Some((cur * 10 + (ch as i32 - '0' as i32)).min(32767));
                return;
            }
            state.repeat = state.current.take().unwrap_or(1).max(1) as usize;
            state.parse = SixelParse::Normal;
            // Fall through: re-process as a normal sixel byte.
            process_char(session, config, ch);
            return;
        }
        SixelParse::Color | SixelParse::Raster => {
            match ch {
                '0'..='9' => {
                    let cur = state.current.unwrap_or(0);
                    state.current = Some((cur * 10 + (ch as i32 - '0' as i32)).min(32767));
                    return;
                }
                ';' => {
                    state.params.push(state.current.take().unwrap_or(0));
                    return;
                }
                _ => {
                    state.params.push(state.current.take().unwrap_or(0));
                    if state.parse == SixelParse::Color {
                        apply_color(state);
                    } else {
                        apply_raster(state, config);
                    }
                    state.parse = SixelParse::Normal;
                    process_char(session, config, ch);
                    return;
                }
            }
        }
        SixelParse::Normal => {}
    }

    match ch {
        '!' => {
            state.parse = SixelParse::Repeat;
            state.current = None;
        }
        '#' => {
            state.parse = SixelParse::Color;
            state.params.clear();
            state.current = None;
        }
        '"' => {
            state.parse = SixelParse::Raster;
            state.params.clear();
            state.current = None;
        }
        '$' => state.pos_x = 0,
        '-' => {
            state.pos_x = 0;
            state.pos_y += 6;
        }
        '?'..='~' => {
            let bits = (ch as u8) - 0x3F;
            let repeat = std::mem::replace(&mut state.repeat, 1).max(1);
            let color = state.current_color();
            for _ in 0..repeat {
                if state.pos_x >= config.max_sixel_width {
                    // Width cap: clamp, stop emitting on this line.
                    state.pos_x = config.max_sixel_width;
                    break;
                }
                if state.pos_y < config.max_sixel_height {
                    if bits != 0 {
                        state.strips.push(SixelStrip {
                            x: state.pos_x,
                            y: state.pos_y,
                            bits,
                            color,
                        });
                    }
                    state.pos_x += 1;
                } else {
                    // Height cap: keep parsing (the raster x still moves)
                    // but emit nothing.
                    state.pos_x += 1;
                }
            }
        }
        _ => {}
    }
}

/// `#Pc` selects, `#Pc;2;Pr;Pg;Pb` defines (RGB given as 0..=100 percent).
fn apply_color(state: &mut SixelState) {
    let index = state.params.first().copied().unwrap_or(0).clamp(0, 255) as u16;
    state.color_index = index;
    if state.params.len() >= 5 && state.params[1] == 2 {
        let scale = |v: i32| ((v.clamp(0, 100) * 255 + 50) / 100) as u8;
        state.palette.insert(
            index,
            Rgb::new(scale(state.params[2]), scale(state.params[3]), scale(state.params[4])),
        );
    }
}

/// `"Pan;Pad;Ph;Pv` declares the raster size.
fn apply_raster(state: &mut SixelState, config: &TermConfig) {
    if state.params.len() >= 4 {
        state.width = (state.params[2].max(0) as usize).min(config.max_sixel_width);
        state.height = (state.params[3].max(0) as usize).min(config.max_sixel_height);
    }
}
