// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Front-end input events. The core is front-end agnostic: GPU shells,
//! TTYs, and test harnesses all feed these same structs.

use bitflags::bitflags;
use smallstr::SmallString;

bitflags! {
    /// Modifier bits, laid out so `bits() + 1` is the xterm/kitty modifier
    /// parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyModifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        const META  = 1 << 3;
    }
}

/// Keys the translator understands. Unicode keys carry their base
/// character; everything else is a named function key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
    /// Pre-composed text (IME and friends); when present it wins over the
    /// keycode translation for plain keys.
    pub text: Option<SmallString<[u8; 8]>>,
}

impl KeyEvent {
    #[must_use]
    pub fn plain(code: KeyCode) -> Self {
        Self { code, mods: KeyModifiers::empty(), text: None }
    }

    #[must_use]
    pub fn with_mods(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods, text: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Press,
    Release,
    Motion,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub action: MouseAction,
    /// 0-based cell coordinates.
    pub x: usize,
    pub y: usize,
    pub mods: KeyModifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    Resize { cols: usize, rows: usize },
    FocusIn,
    FocusOut,
    Paste(Vec<u8>),
}

/// Everything the front-end can enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Window(WindowEvent),
}
