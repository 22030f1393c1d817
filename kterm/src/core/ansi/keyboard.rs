// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reverse parser: front-end key events become host bytes, honoring
//! DECCKM, the application keypad, modifyOtherKeys, bracketed paste, and
//! the Kitty keyboard protocol (`CSI <unicode> ; <mods> u`).

use crate::core::io::{KeyCode, KeyEvent, KeyModifiers};
use crate::core::session::Session;

/// Functional key codes used by the Kitty-style `u` reports.
pub mod kitty_codes {
    pub const LEFT: u32 = 57351;
    pub const RIGHT: u32 = 57352;
    pub const UP: u32 = 57353;
    pub const DOWN: u32 = 57354;
    pub const HOME: u32 = 57355;
    pub const END: u32 = 57356;
    pub const PAGE_UP: u32 = 57357;
    pub const PAGE_DOWN: u32 = 57358;
    pub const INSERT: u32 = 57359;
    pub const DELETE: u32 = 57360;
    /// F1; F2..F12 follow consecutively.
    pub const F1: u32 = 57370;
}

/// Translate one key event into the byte sequence to send to the host.
/// Returns an empty vec for events that produce nothing.
#[must_use]
pub fn translate_key(session: &Session, event: &KeyEvent) -> Vec<u8> {
    // Pre-composed text short-circuits everything except the kitty
    // report-all mode.
    if let Some(text) = &event.text
        && !session.kitty_keyboard.flags.contains(crate::core::session::KittyFlags::REPORT_ALL_KEYS)
    {
        return text.as_bytes().to_vec();
    }

    if session.kitty_keyboard.flags.is_empty() {
        legacy_encoding(session, event)
    } else {
        kitty_encoding(session, event)
    }
}

/// Wrap pasted bytes per bracketed-paste mode.
#[must_use]
pub fn translate_paste(session: &Session, data: &[u8]) -> Vec<u8> {
    if session.modes.bracketed_paste {
        let mut out = Vec::with_capacity(data.len() + 12);
        out.extend_from_slice(b"\x1b[200~");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\x1b[201~");
        out
    } else {
        data.to_vec()
    }
}

/// xterm/kitty modifier parameter: bits + 1.
fn mod_param(mods: KeyModifiers) -> u32 { u32::from(mods.bits()) + 1 }

// ── Kitty protocol ──────────────────────────────────────────────────────

fn kitty_encoding(session: &Session, event: &KeyEvent) -> Vec<u8> {
    use crate::core::session::KittyFlags;

    let report_all = session.kitty_keyboard.flags.contains(KittyFlags::REPORT_ALL_KEYS);
    let mods = mod_param(event.mods);

    let functional = |code: u32| format!("\x1b[{code};{mods}u").into_bytes();

    match event.code {
        KeyCode::Char(ch) => {
            if event.mods.is_empty() && !report_all {
                // Plain text keys stay plain text under DISAMBIGUATE.
                let mut buf = [0u8; 4];
                return ch.encode_utf8(&mut buf).as_bytes().to_vec();
            }
            let unicode = ch.to_lowercase().next().unwrap_or(ch) as u32;
            format!("\x1b[{unicode};{mods}u").into_bytes()
        }
        KeyCode::Enter => {
            if event.mods.is_empty() && !report_all {
                b"\r".to_vec()
            } else {
                functional(13)
            }
        }
        KeyCode::Tab => {
            if event.mods.is_empty() && !report_all {
                b"\t".to_vec()
            } else {
                functional(9)
            }
        }
        KeyCode::Backspace => {
            if event.mods.is_empty() && !report_all {
                b"\x7f".to_vec()
            } else {
                functional(127)
            }
        }
        KeyCode::Escape => functional(27),
        KeyCode::Left => functional(kitty_codes::LEFT),
        KeyCode::Right => functional(kitty_codes::RIGHT),
        KeyCode::Up => functional(kitty_codes::UP),
        KeyCode::Down => functional(kitty_codes::DOWN),
        KeyCode::Home => functional(kitty_codes::HOME),
        KeyCode::End => functional(kitty_codes::END),
        KeyCode::PageUp => functional(kitty_codes::PAGE_UP),
        KeyCode::PageDown => functional(kitty_codes::PAGE_DOWN),
        KeyCode::Insert => functional(kitty_codes::INSERT),
        KeyCode::Delete => functional(kitty_codes::DELETE),
        KeyCode::F(n) => {
            let n = n.clamp(1, 12);
            functional(kitty_codes::F1 + u32::from(n) - 1)
        }
    }
}

// ── Legacy xterm/VT encoding ────────────────────────────────────────────

fn legacy_encoding(session: &Session, event: &KeyEvent) -> Vec<u8> {
    let mods = event.mods;
    let mod_p = mod_param(mods);

    match event.code {
        KeyCode::Char(ch) => legacy_char(session, ch, mods),
        KeyCode::Enter => {
            if session.modes.linefeed_newline {
                b"\r\n".to_vec()
            } else {
                b"\r".to_vec()
            }
        }
        KeyCode::Tab => {
            if mods.contains(KeyModifiers::SHIFT) {
                b"\x1b[Z".to_vec()
            } else {
                b"\t".to_vec()
            }
        }
        KeyCode::Backspace => b"\x7f".to_vec(),
        KeyCode::Escape => b"\x1b".to_vec(),
        KeyCode::Up => arrow(session, b'A', mods),
        KeyCode::Down => arrow(session, b'B', mods),
        KeyCode::Right => arrow(session, b'C', mods),
        KeyCode::Left => arrow(session, b'D', mods),
        KeyCode::Home => arrow(session, b'H', mods),
        KeyCode::End => arrow(session, b'F', mods),
        KeyCode::PageUp => tilde(5, mods),
        KeyCode::PageDown => tilde(6, mods),
        KeyCode::Insert => tilde(2, mods),
        KeyCode::Delete => tilde(3, mods),
        KeyCode::F(n) => function_key(n, mods, mod_p),
    }
}

fn legacy_char(session: &Session, ch: char, mods: KeyModifiers) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    if mods.contains(KeyModifiers::ALT) {
        out.push(0x1b);
    }

    if mods.contains(KeyModifiers::CTRL) {
        // modifyOtherKeys level 2 reports the full triple instead of the
        // bare control byte.
        if session.modes.modify_other_keys >= 2 {
            let unicode = ch as u32;
            return format!("\x1b[27;{};{unicode}~", mod_param(mods)).into_bytes();
        }
        let base = ch.to_ascii_uppercase();
        match base {
            'A'..='Z' => out.push(base as u8 & 0x1F),
            '@' | ' ' => out.push(0x00),
            '[' => out.push(0x1B),
            '\\' => out.push(0x1C),
            ']' => out.push(0x1D),
            '^' => out.push(0x1E),
            '_' | '/' => out.push(0x1F),
            '?' => out.push(0x7F),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
        return out;
    }

    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    out
}

fn arrow(session: &Session, letter: u8, mods: KeyModifiers) -> Vec<u8> {
    if mods.is_empty() {
        if session.modes.cursor_keys_app {
            vec![0x1b, b'O', letter]
        } else {
            vec![0x1b, b'[', letter]
        }
    } else {
        format!("\x1b[1;{}{}", mod_param(mods), letter as char).into_bytes()
    }
}

fn tilde(code: u32, mods: KeyModifiers) -> Vec<u8> {
    if mods.is_empty() {
        format!("\x1b[{code}~").into_bytes()
    } else {
        format!("\x1b[{code};{}~", mod_param(mods)).into_bytes()
    }
}

fn function_key(n: u8, mods: KeyModifiers, mod_p: u32) -> Vec<u8> {
    match n {
        1..=4 => {
            let letter = [b'P', b'Q', b'R', b'S'][usize::from(n - 1)];
            if mods.is_empty() {
                vec![0x1b, b'O', letter]
            } else {
                format!("\x1b[1;{mod_p}{}", letter as char).into_bytes()
            }
        }
        5 => tilde(15, mods),
        6..=8 => tilde(u32::from(n) + 11, mods), // 17, 18, 19
        9..=10 => tilde(u32::from(n) + 11, mods), // 20, 21
        11 => tilde(23, mods),
        12 => tilde(24, mods),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::KittyFlags;
    use crate::core::terminal::TermConfig;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        Session::new(0, &TermConfig::default())
    }

    fn kitty_session() -> Session {
        let mut s = session();
        s.kitty_keyboard.push(KittyFlags::DISAMBIGUATE);
        s
    }

    #[test]
    fn kitty_plain_letter_stays_text() {
        let s = kitty_session();
        let bytes = translate_key(&s, &KeyEvent::plain(KeyCode::Char('a')));
        assert_eq!(bytes, b"a");
    }

    #[test]
    fn kitty_ctrl_a_reports_unicode_and_mods() {
        let s = kitty_session();
        let ev = KeyEvent::with_mods(KeyCode::Char('a'), KeyModifiers::CTRL);
        assert_eq!(translate_key(&s, &ev), b"\x1b[97;5u");
    }

    #[test]
    fn kitty_arrows_and_function_keys() {
        let s = kitty_session();
        assert_eq!(translate_key(&s, &KeyEvent::plain(KeyCode::Left)), b"\x1b[57351;1u");
        let ev = KeyEvent::with_mods(KeyCode::Left, KeyModifiers::SHIFT);
        assert_eq!(translate_key(&s, &ev), b"\x1b[57351;2u");
        assert_eq!(translate_key(&s, &KeyEvent::plain(KeyCode::F(1))), b"\x1b[57370;1u");
    }

    #[test]
    fn legacy_ctrl_letter_is_control_byte() {
        let s = session();
        let ev = KeyEvent::with_mods(KeyCode::Char('c'), KeyModifiers::CTRL);
        assert_eq!(translate_key(&s, &ev), vec![0x03]);
    }

    #[test]
    fn deckm_switches_arrow_prefix() {
        let mut s = session();
        assert_eq!(translate_key(&s, &KeyEvent::plain(KeyCode::Up)), b"\x1b[A");
        s.modes.cursor_keys_app = true;
        assert_eq!(translate_key(&s, &KeyEvent::plain(KeyCode::Up)), b"\x1bOA");
    }

    #[test]
    fn modified_arrow_uses_csi_form() {
        let s = session();
        let ev = KeyEvent::with_mods(KeyCode::Right, KeyModifiers::CTRL);
        assert_eq!(translate_key(&s, &ev), b"\x1b[1;5C");
    }

    #[test]
    fn alt_prefixes_escape() {
        let s = session();
        let ev = KeyEvent::with_mods(KeyCode::Char('x'), KeyModifiers::ALT);
        assert_eq!(translate_key(&s, &ev), b"\x1bx");
    }

    #[test]
    fn bracketed_paste_wraps_payload() {
        let mut s = session();
        assert_eq!(translate_paste(&s, b"hi"), b"hi");
        s.modes.bracketed_paste = true;
        assert_eq!(translate_paste(&s, b"hi"), b"\x1b[200~hi\x1b[201~");
    }

    #[test]
    fn modify_other_keys_level_two() {
        let mut s = session();
        s.modes.modify_other_keys = 2;
        let ev = KeyEvent::with_mods(KeyCode::Char('a'), KeyModifiers::CTRL);
        assert_eq!(translate_key(&s, &ev), b"\x1b[27;5;97~");
    }
}
