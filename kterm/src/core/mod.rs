// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The terminal emulator core, leaves first: codecs and units at the
//! bottom, then the grid and op pipeline, the parser and session state
//! they feed, and the multiplexing terminal on top with its I/O, gateway,
//! and network limbs.

pub mod ansi;
pub mod codec;
pub mod collab;
pub mod gateway;
pub mod graphics;
pub mod grid;
pub mod io;
pub mod log_support;
pub mod net;
pub mod ops;
pub mod serialize;
pub mod session;
pub mod terminal;
pub mod units;
