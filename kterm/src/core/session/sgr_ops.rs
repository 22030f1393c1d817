// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! SGR (Select Graphic Rendition) application.
//!
//! Handles the classic attribute set, bright colors, 256-color and
//! truecolor forms in both the `;`-separated legacy spelling and the
//! `:`-separated sub-parameter spelling, underline styles via `4:n`, and
//! underline color via SGR 58/59.

use super::Session;
use crate::core::ansi::Params;
use crate::core::grid::{CellFlags, Color, UnderlineStyle};

impl Session {
    /// Apply one SGR parameter list to the current attribute state.
    pub fn set_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.reset_sgr();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let value = params.get(i, 0);
            match value {
                0 => self.reset_sgr(),
                1 => self.attrs.insert(CellFlags::BOLD),
                2 => self.attrs.insert(CellFlags::FAINT),
                3 => self.attrs.insert(CellFlags::ITALIC),
                4 => {
                    // `4:n` selects the underline style; plain `4` is single.
                    let style = params
                        .sub(i, 0)
                        .map_or(UnderlineStyle::Single, |n| UnderlineStyle::from_bits(n.max(0) as u32));
                    self.ul_style = style;
                    if style == UnderlineStyle::None {
                        self.attrs.remove(CellFlags::UNDERLINE);
                    } else {
                        self.attrs.insert(CellFlags::UNDERLINE);
                    }
                }
                5 | 6 => self.attrs.insert(CellFlags::BLINK),
                7 => self.attrs.insert(CellFlags::REVERSE),
                8 => self.attrs.insert(CellFlags::CONCEAL),
                9 => self.attrs.insert(CellFlags::STRIKE),
                21 => {
                    self.attrs.insert(CellFlags::UNDERLINE);
                    self.ul_style = UnderlineStyle::Double;
                }
                22 => self.attrs.remove(CellFlags::BOLD | CellFlags::FAINT),
                23 => self.attrs.remove(CellFlags::ITALIC),
                24 => {
                    self.attrs.remove(CellFlags::UNDERLINE);
                    self.ul_style = UnderlineStyle::None;
                }
                25 => self.attrs.remove(CellFlags::BLINK),
                27 => self.attrs.remove(CellFlags::REVERSE),
                28 => self.attrs.remove(CellFlags::CONCEAL),
                29 => self.attrs.remove(CellFlags::STRIKE),
                30..=37 => self.fg = Color::Indexed((value - 30) as u8),
                38 => {
                    let (color, consumed) = parse_extended_color(params, i);
                    if let Some(color) = color {
                        self.fg = color;
                    }
                    i += consumed;
                }
                39 => self.fg = Color::Default,
                40..=47 => self.bg = Color::Indexed((value - 40) as u8),
                48 => {
                    let (color, consumed) = parse_extended_color(params, i);
                    if let Some(color) = color {
                        self.bg = color;
                    }
                    i += consumed;
                }
                49 => self.bg = Color::Default,
                58 => {
                    let (color, consumed) = parse_extended_color(params, i);
                    if let Some(color) = color {
                        self.ul = color;
                    }
                    i += consumed;
                }
                59 => self.ul = Color::Default,
                90..=97 => self.fg = Color::Indexed((value - 90 + 8) as u8),
                100..=107 => self.bg = Color::Indexed((value - 100 + 8) as u8),
                _ => {
                    // Unknown SGR parameters are ignored; strict-mode
                    // reporting happens at the dispatch layer.
                }
            }
            i += 1;
        }
    }

    pub fn reset_sgr(&mut self) {
        self.attrs = CellFlags::empty();
        self.ul_style = UnderlineStyle::None;
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.ul = Color::Default;
    }
}

/// Parse the color argument of SGR 38/48/58 starting at `index`. Returns
/// the color and how many extra `;`-separated parameters were consumed
/// (zero for the `:` sub-parameter spelling).
fn parse_extended_color(params: &Params, index: usize) -> (Option<Color>, usize) {
    // Sub-parameter spelling: 38:5:n or 38:2[:cs]:r:g:b.
    if params.sub_len(index) > 0 {
        let mode = params.sub(index, 0).unwrap_or(0);
        return match mode {
            5 => (params.sub(index, 1).map(|n| Color::Indexed(clamp_u8(n))), 0),
            2 => {
                let sub_len = params.sub_len(index);
                // With a colorspace id there are 5 subs, without there are 4.
                let offset = if sub_len >= 5 { 2 } else { 1 };
                let r = params.sub(index, offset);
                let g = params.sub(index, offset + 1);
                let b = params.sub(index, offset + 2);
                match (r, g, b) {
                    (Some(r), Some(g), Some(b)) => {
                        (Some(Color::Rgb(clamp_u8(r), clamp_u8(g), clamp_u8(b))), 0)
                    }
                    _ => (None, 0),
                }
            }
            _ => (None, 0),
        };
    }

    // Legacy spelling: 38;5;n or 38;2;r;g;b.
    match params.get(index + 1, -1) {
        5 => (
            (params.len() > index + 2).then(|| Color::Indexed(clamp_u8(params.get(index + 2, 0)))),
            2,
        ),
        2 => {
            if params.len() > index + 4 {
                (
                    Some(Color::Rgb(
                        clamp_u8(params.get(index + 2, 0)),
                        clamp_u8(params.get(index + 3, 0)),
                        clamp_u8(params.get(index + 4, 0)),
                    )),
                    4,
                )
            } else {
                (None, params.len() - index - 1)
            }
        }
        _ => (None, 0),
    }
}

fn clamp_u8(value: i32) -> u8 { value.clamp(0, 255) as u8 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::terminal::TermConfig;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        Session::new(0, &TermConfig::default())
    }

    fn params(spec: &str) -> Params {
        Params::parse_for_test(spec)
    }

    #[test]
    fn bold_red_sets_flag_and_palette_color() {
        let mut s = session();
        s.set_sgr(&params("1;31"));
        assert!(s.attrs.contains(CellFlags::BOLD));
        assert_eq!(s.fg, Color::Indexed(1));
    }

    #[test]
    fn empty_sgr_resets() {
        let mut s = session();
        s.set_sgr(&params("1;31"));
        s.set_sgr(&params(""));
        assert_eq!(s.attrs, CellFlags::empty());
        assert_eq!(s.fg, Color::Default);
    }

    #[test]
    fn legacy_256_and_truecolor_forms() {
        let mut s = session();
        s.set_sgr(&params("38;5;123"));
        assert_eq!(s.fg, Color::Indexed(123));
        s.set_sgr(&params("48;2;10;20;30"));
        assert_eq!(s.bg, Color::Rgb(10, 20, 30));
        // Trailing parameters after the color are still applied.
        s.set_sgr(&params("38;5;9;1"));
        assert_eq!(s.fg, Color::Indexed(9));
        assert!(s.attrs.contains(CellFlags::BOLD));
    }

    #[test]
    fn subparam_truecolor_form() {
        let mut s = session();
        s.set_sgr(&params("38:2:1:2:3"));
        assert_eq!(s.fg, Color::Rgb(1, 2, 3));
        s.set_sgr(&params("58:5:42"));
        assert_eq!(s.ul, Color::Indexed(42));
    }

    #[test]
    fn curly_underline_via_subparam() {
        let mut s = session();
        s.set_sgr(&params("4:3"));
        assert!(s.attrs.contains(CellFlags::UNDERLINE));
        assert_eq!(s.ul_style, UnderlineStyle::Curly);
        s.set_sgr(&params("24"));
        assert_eq!(s.ul_style, UnderlineStyle::None);
    }

    #[test]
    fn bright_colors() {
        let mut s = session();
        s.set_sgr(&params("91;104"));
        assert_eq!(s.fg, Color::Indexed(9));
        assert_eq!(s.bg, Color::Indexed(12));
    }
}
