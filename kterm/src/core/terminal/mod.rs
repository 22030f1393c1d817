// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The multiplexer root: up to four sessions sharing one display, the
//! shared palette and response channel, and the cooperative per-frame
//! `update()` that drives the whole pipeline.

pub mod config;
pub mod context;
pub mod terminal;

pub use config::*;
pub use context::*;
pub use terminal::*;
