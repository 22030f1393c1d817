// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # kterm - embeddable multi-session terminal emulator core
//!
//! This crate is the protocol and state half of a terminal: it consumes
//! the byte stream a shell or remote host produces, maintains the visible
//! grid and its scrollback, and produces the byte stream of user responses
//! (keyboard, mouse, status reports) going back. A front end - GPU
//! compositor, TTY, or test harness - renders the grid and feeds raw input
//! events in; this crate owns everything in between.
//!
//! ```text
//! host bytes ──▶ [telnet/framed/security filter] ──▶ session inbox
//!                                                        │
//!                                                   escape parser
//!                                                   │          │
//!                                          cursor/mode      op queue
//!                                            metadata           │
//!                                                        budgeted flusher
//!                                                               │
//!                                                        grid + scrollback ──▶ renderer
//!
//! input events ──▶ key/mouse translators ──▶ response ring ──▶ sink / socket
//! ```
//!
//! ## What is covered
//!
//! - **Parsing**: VT52 through VT525 and xterm sequences - CSI (with `:`
//!   sub-parameters and signed values), OSC (palette, dynamic colors,
//!   clipboard), DCS (DECRQSS, DECUDK, Sixel, ReGIS, the Gateway command
//!   language), APC (Kitty graphics), and streaming UTF-8 with wcwidth
//!   wide-cell handling.
//! - **Sessions**: up to four independent sessions multiplexed on one
//!   display, each with primary + alternate grids, margins, tab stops,
//!   charsets, saved-cursor stack, protection attributes, and mode flags.
//! - **Deferred mutation**: grid effects queue as ops applied under a
//!   per-frame budget, with re-validation after queued resizes.
//! - **Transports**: telnet negotiation, a length-prefixed framed packet
//!   protocol with session attach/steering, and a pluggable security hook
//!   for TLS/SSH-style transports.
//! - **The Gateway Protocol**: `DCS GATE;…` configuration, introspection,
//!   direct grid drawing, payload injection, and a user extension
//!   registry.
//!
//! ## Quick start
//!
//! ```
//! use kterm::{Terminal, TermConfig};
//!
//! let mut term = Terminal::new(TermConfig::default()).unwrap();
//! term.write_str("\x1b[1;31mhello\x1b[0m");
//! term.update();
//! let snapshot = term.render_snapshot();
//! assert_eq!(snapshot.grid.cell(0, 0).unwrap().ch, 'h');
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

pub mod core;

// The flat public surface embedders actually use.
pub use crate::core::ansi::{Params, ParseMode, keyboard, mouse};
pub use crate::core::codec;
pub use crate::core::gateway::{ExtensionHandler, ExtensionRegistry, GatewayReply};
pub use crate::core::graphics::{KittyState, RegisState, SixelState, TekState};
pub use crate::core::grid::{Cell, CellFlags, Color, DynamicColors, FillMask, Grid, Palette, Rgb, UnderlineStyle};
pub use crate::core::io::{
    InputEvent, InputQueue, KeyCode, KeyEvent, KeyModifiers, MouseAction, MouseButton,
    MouseEvent, OutputSink, ResponseRing, WindowEvent,
};
pub use crate::core::log_support::init_tracing;
pub use crate::core::net::{
    NetCallbacks, NetConn, NetEvent, NetManager, NetProtocol, NetState, PacketType,
    ReconnectPolicy, SecResult, SecurityHook,
};
pub use crate::core::ops::{EraseMode, Op, OpQueue, Region};
pub use crate::core::serialize::{SerializeError, deserialize_session, serialize_session};
pub use crate::core::session::{
    Charset, CharsetState, Cursor, CursorStyle, KittyFlags, MAX_SESSIONS, Margins, ModeFlags,
    MouseEncoding, MouseTracking, Session, VtLevel,
};
pub use crate::core::terminal::{
    CrossAction, ErrorCallback, ErrorLevel, ErrorSource, GatewayCallback, RenderSnapshot,
    TermConfig, TermEvent, TermStatus, Terminal, TerminalBuilder, VERSION,
};
pub use crate::core::units::{GridRect, TermCol, TermRow, term_col, term_row};
