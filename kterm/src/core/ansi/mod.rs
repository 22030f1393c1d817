// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The escape-sequence parser: a deterministic byte-at-a-time automaton
//! covering ground/ESC/CSI/OSC/DCS/SOS/PM/APC states, VT52 mode, UTF-8
//! decode, and the routing into the Sixel/ReGIS/Kitty/Gateway sub-parsers.
//!
//! The reverse direction (input events to host bytes) lives in
//! [`keyboard`] and [`mouse`].

pub mod csi_dispatch;
pub mod esc_dispatch;
pub mod keyboard;
pub mod mouse;
pub mod osc_dispatch;
pub mod params;
pub mod parser;

#[cfg(test)]
pub mod conformance_tests;

pub use params::*;
pub use parser::*;
