// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The 256-entry color palette plus the xterm "dynamic colors" (default
//! foreground, background, and cursor), with the `rgb:rr/gg/bb` parse and
//! format used by OSC 4 / 10 / 11 / 12.

use crate::core::codec::hex_value;

/// Concrete sRGB triple stored in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }
}

/// OSC 10/11/12 dynamic colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicColors {
    pub foreground: Rgb,
    pub background: Rgb,
    pub cursor: Rgb,
}

impl Default for DynamicColors {
    fn default() -> Self {
        Self {
            foreground: Rgb::new(0xFF, 0xFF, 0xFF),
            background: Rgb::new(0x00, 0x00, 0x00),
            cursor: Rgb::new(0xFF, 0xFF, 0xFF),
        }
    }
}

/// The terminal-wide 256-entry palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb; 256],
}

/// The standard xterm system colors (indexes 0..=15).
const SYSTEM_COLORS: [Rgb; 16] = [
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0xCD, 0x00, 0x00),
    Rgb::new(0x00, 0xCD, 0x00),
    Rgb::new(0xCD, 0xCD, 0x00),
    Rgb::new(0x00, 0x00, 0xEE),
    Rgb::new(0xCD, 0x00, 0xCD),
    Rgb::new(0x00, 0xCD, 0xCD),
    Rgb::new(0xE5, 0xE5, 0xE5),
    Rgb::new(0x7F, 0x7F, 0x7F),
    Rgb::new(0xFF, 0x00, 0x00),
    Rgb::new(0x00, 0xFF, 0x00),
    Rgb::new(0xFF, 0xFF, 0x00),
    Rgb::new(0x5C, 0x5C, 0xFF),
    Rgb::new(0xFF, 0x00, 0xFF),
    Rgb::new(0x00, 0xFF, 0xFF),
    Rgb::new(0xFF, 0xFF, 0xFF),
];

impl Default for Palette {
    fn default() -> Self {
        let mut entries = [Rgb::default(); 256];
        entries[..16].copy_from_slice(&SYSTEM_COLORS);
        // 6x6x6 color cube, xterm ramp (0, then 95 + 40 * n).
        let ramp = |n: usize| -> u8 {
            if n == 0 { 0 } else { (55 + 40 * n) as u8 }
        };
        for i in 16..232 {
            let n = i - 16;
            entries[i] = Rgb::new(ramp(n / 36), ramp(n / 6 % 6), ramp(n % 6));
        }
        // Grayscale ramp 232..=255.
        for i in 232..256 {
            let v = (8 + (i - 232) * 10) as u8;
            entries[i] = Rgb::new(v, v, v);
        }
        Self { entries }
    }
}

impl Palette {
    #[must_use]
    pub fn get(&self, index: u8) -> Rgb { self.entries[index as usize] }

    pub fn set(&mut self, index: u8, color: Rgb) { self.entries[index as usize] = color; }

    /// Restore one entry to its default.
    pub fn reset_entry(&mut self, index: u8) {
        self.entries[index as usize] = Self::default().entries[index as usize];
    }

    pub fn reset_all(&mut self) { *self = Self::default(); }

    #[must_use]
    pub fn entries(&self) -> &[Rgb; 256] { &self.entries }
}

/// Parse an X11-style color spec: `rgb:RR/GG/BB` (1 to 4 hex digits per
/// channel, scaled to 8 bits) or `#RGB` / `#RRGGBB`.
#[must_use]
pub fn parse_color_spec(spec: &str) -> Option<Rgb> {
    let spec = spec.trim();
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut parts = rest.split('/');
        let r = scale_channel(parts.next()?)?;
        let g = scale_channel(parts.next()?)?;
        let b = scale_channel(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        return Some(Rgb::new(r, g, b));
    }
    if let Some(hex) = spec.strip_prefix('#') {
        let digits: Vec<u8> = hex.bytes().map(hex_value).collect::<Option<_>>()?;
        return match digits.len() {
            3 => Some(Rgb::new(
                digits[0] << 4 | digits[0],
                digits[1] << 4 | digits[1],
                digits[2] << 4 | digits[2],
            )),
            6 => Some(Rgb::new(
                digits[0] << 4 | digits[1],
                digits[2] << 4 | digits[3],
                digits[4] << 4 | digits[5],
            )),
            _ => None,
        };
    }
    None
}

/// Scale a 1..=4 digit hex channel to 8 bits (X11 semantics: the digits are
/// the most significant bits).
fn scale_channel(text: &str) -> Option<u8> {
    if text.is_empty() || text.len() > 4 {
        return None;
    }
    let mut value: u32 = 0;
    for b in text.bytes() {
        value = (value << 4) | u32::from(hex_value(b)?);
    }
    let max = (1u32 << (4 * text.len() as u32)) - 1;
    Some(((value * 255 + max / 2) / max) as u8)
}

/// Format a color the way OSC query replies expect: `rgb:rr/gg/bb`.
#[must_use]
pub fn format_color_spec(color: Rgb) -> String {
    format!("rgb:{:02x}/{:02x}/{:02x}", color.r, color.g, color.b)
}
