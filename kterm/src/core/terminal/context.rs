// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The borrow bundle handed to parser dispatch for the duration of a byte
//! burst, plus the deferred cross-session action list.
//!
//! The parser mutates exactly one session at a time; anything that reaches
//! beyond it (Gateway commands, window title changes, clipboard writes) is
//! pushed as a [`CrossAction`] and applied by the terminal after the burst.
//! That keeps the session/terminal relationship an index plus a handle
//! instead of a pointer web.

use super::{ErrorReporter, TermConfig};
use crate::core::grid::{DynamicColors, Palette};
use crate::core::io::ResponseRing;

/// Host-observable happenings the windowing layer drains per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEvent {
    Bell,
    Title(String),
    IconTitle(String),
    /// OSC 52 wrote the clipboard (decoded bytes).
    ClipboardSet(Vec<u8>),
    /// Auto-print duplication of host bytes (media copy `CSI ? 5 i`).
    PrinterBytes(Vec<u8>),
}

/// Deferred effects produced while parsing one session's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossAction {
    /// A complete Gateway command payload (after `GATE;`).
    Gateway(String),
    /// Surface to the host.
    Event(TermEvent),
    /// DECRS (`CSI ? 21 n`) needs terminal-wide state for its reply.
    SessionStatusReport,
}

/// Everything a dispatch handler may touch besides the session itself.
pub struct SessionCtx<'a> {
    pub config: &'a TermConfig,
    pub palette: &'a mut Palette,
    pub dynamic: &'a mut DynamicColors,
    /// Terminal-held clipboard contents (OSC 52 store/query).
    pub clipboard: &'a mut Vec<u8>,
    pub responses: &'a mut ResponseRing,
    pub actions: &'a mut Vec<CrossAction>,
    pub errors: &'a mut ErrorReporter,
}

impl std::fmt::Debug for SessionCtx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCtx")
            .field("actions", &self.actions.len())
            .finish()
    }
}
