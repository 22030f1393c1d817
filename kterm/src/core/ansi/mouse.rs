// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Mouse event encoding for the tracking modes the session can enable:
//! X10 press-only, normal press/release (1000), button-event (1002), and
//! any-event (1003), in default or SGR (1006) coordinate encodings.

use crate::core::io::{KeyModifiers, MouseAction, MouseButton, MouseEvent};
use crate::core::session::{MouseEncoding, MouseTracking, Session};

/// Encode one mouse event; `None` when the active tracking mode does not
/// report it.
#[must_use]
pub fn encode_mouse(session: &Session, event: &MouseEvent) -> Option<Vec<u8>> {
    let wanted = match session.mouse_tracking {
        MouseTracking::Off => false,
        MouseTracking::X10 => event.action == MouseAction::Press,
        MouseTracking::Normal => {
            matches!(event.action, MouseAction::Press | MouseAction::Release)
                || wheel(event.action)
        }
        MouseTracking::ButtonEvent => {
            event.action != MouseAction::Motion || event.button != MouseButton::None
        }
        MouseTracking::AnyEvent => true,
    };
    if !wanted {
        return None;
    }

    let mut cb = match (event.action, event.button) {
        (MouseAction::WheelUp, _) => 64,
        (MouseAction::WheelDown, _) => 65,
        (_, MouseButton::Left) => 0,
        (_, MouseButton::Middle) => 1,
        (_, MouseButton::Right) => 2,
        (_, MouseButton::None) => 3,
    };
    if event.action == MouseAction::Motion {
        cb += 32;
    }
    if session.mouse_tracking != MouseTracking::X10 {
        if event.mods.contains(KeyModifiers::SHIFT) {
            cb += 4;
        }
        if event.mods.contains(KeyModifiers::META) {
            cb += 8;
        }
        if event.mods.contains(KeyModifiers::CTRL) {
            cb += 16;
        }
    }

    match session.mouse_encoding {
        MouseEncoding::Sgr => {
            let release = event.action == MouseAction::Release;
            let final_byte = if release { 'm' } else { 'M' };
            Some(
                format!("\x1b[<{cb};{};{}{final_byte}", event.x + 1, event.y + 1).into_bytes(),
            )
        }
        MouseEncoding::Default | MouseEncoding::Utf8 => {
            // Release collapses the button into code 3 outside SGR mode.
            let cb = if event.action == MouseAction::Release { (cb & !0x03) | 3 } else { cb };
            let clamp = |v: usize| (v + 33).min(255) as u8;
            Some(vec![0x1b, b'[', b'M', (cb + 32) as u8, clamp(event.x), clamp(event.y)])
        }
    }
}

fn wheel(action: MouseAction) -> bool {
    matches!(action, MouseAction::WheelUp | MouseAction::WheelDown)
}
