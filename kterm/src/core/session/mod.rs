// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Per-session terminal state and the terminal-abstract operations the
//! parser dispatch invokes (cursor motion, printing, editing, modes, SGR,
//! margins, alternate screen, status requests).
//!
//! A session is one logically independent terminal inside the multiplexer:
//! grid + scrollback, cursor, charsets, mode flags, op queue, byte inbox,
//! and graphics sub-states. The parser borrows a session mutably for the
//! duration of a byte burst; cross-session effects are returned to the
//! [`crate::core::terminal::Terminal`] as deferred actions instead of being
//! reached through back pointers.

pub mod char_ops;
pub mod charset;
pub mod cursor_ops;
pub mod edit_ops;
pub mod mode_ops;
pub mod session_state;
pub mod sgr_ops;

pub use charset::*;
pub use session_state::*;
