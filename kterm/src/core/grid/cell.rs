// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One grid position: code point, colors, attribute flags, and the
//! generation counter the renderer uses to invalidate glyph cache entries.

use bitflags::bitflags;

bitflags! {
    /// Per-cell attribute flags. The underline style lives in bits 16..=18
    /// (see [`Cell::underline_style`]); keep those bits clear here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u32 {
        const BOLD       = 1 << 0;
        const FAINT      = 1 << 1;
        const ITALIC     = 1 << 2;
        const UNDERLINE  = 1 << 3;
        const BLINK      = 1 << 4;
        const REVERSE    = 1 << 5;
        const CONCEAL    = 1 << 6;
        const STRIKE     = 1 << 7;
        const PROTECTED  = 1 << 8;
        /// First half of an east-asian wide glyph.
        const WIDE       = 1 << 9;
        /// Placeholder cell following a WIDE cell on the same row.
        const WIDE_CONT  = 1 << 10;
        const DIRTY      = 1 << 11;
        const SELECTED   = 1 << 12;
        /// Reserved bidi direction bits.
        const BIDI_RTL   = 1 << 13;
        const BIDI_MARK  = 1 << 14;

        const UL_STYLE_MASK = 0b111 << 16;
    }
}

/// Underline rendering style selected by SGR `4:n` sub-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
#[repr(u8)]
pub enum UnderlineStyle {
    #[default]
    None = 0,
    Single = 1,
    Double = 2,
    Curly = 3,
    Dotted = 4,
    Dashed = 5,
}

impl UnderlineStyle {
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::Single,
            2 => Self::Double,
            3 => Self::Curly,
            4 => Self::Dotted,
            5 => Self::Dashed,
            _ => Self::None,
        }
    }
}

/// A terminal color: unresolved until the renderer looks at the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    /// 0..=255 palette index.
    Indexed(u8),
    /// Direct 24-bit color.
    Rgb(u8, u8, u8),
}

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    /// Underline color; `Default` means "same as fg".
    pub ul: Color,
    pub flags: CellFlags,
    /// Monotonic per session; bumped on every write so the renderer's glyph
    /// cache can spot stale entries.
    pub generation: u32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Default,
            bg: Color::Default,
            ul: Color::Default,
            flags: CellFlags::empty(),
            generation: 0,
        }
    }
}

impl Cell {
    /// A blank cell carrying the given background (erase operations keep the
    /// current SGR background per BCE semantics).
    #[must_use]
    pub fn blank_with_bg(bg: Color) -> Self {
        Self { bg, ..Self::default() }
    }

    #[must_use]
    pub fn underline_style(&self) -> UnderlineStyle {
        UnderlineStyle::from_bits((self.flags.bits() >> 16) & 0b111)
    }

    pub fn set_underline_style(&mut self, style: UnderlineStyle) {
        let bits = (self.flags.bits() & !CellFlags::UL_STYLE_MASK.bits()) | ((style as u32) << 16);
        self.flags = CellFlags::from_bits_retain(bits);
    }

    #[must_use]
    pub fn is_protected(&self) -> bool { self.flags.contains(CellFlags::PROTECTED) }

    #[must_use]
    pub fn is_wide(&self) -> bool { self.flags.contains(CellFlags::WIDE) }

    #[must_use]
    pub fn is_wide_continuation(&self) -> bool { self.flags.contains(CellFlags::WIDE_CONT) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn underline_style_round_trips_through_flag_bits() {
        let mut cell = Cell::default();
        cell.flags.insert(CellFlags::BOLD);
        cell.set_underline_style(UnderlineStyle::Curly);
        assert_eq!(cell.underline_style(), UnderlineStyle::Curly);
        assert!(cell.flags.contains(CellFlags::BOLD));
        cell.set_underline_style(UnderlineStyle::None);
        assert_eq!(cell.underline_style(), UnderlineStyle::None);
        assert!(cell.flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn default_cell_is_a_space_with_default_colors() {
        let cell = Cell::default();
        assert_eq!(cell.ch, ' ');
        assert_eq!(cell.fg, Color::Default);
        assert_eq!(cell.bg, Color::Default);
    }
}
