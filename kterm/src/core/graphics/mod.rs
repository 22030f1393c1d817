// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Embedded graphics sub-parsers.
//!
//! These collaborate with the escape parser: the DCS/APC machinery routes
//! payload bytes here, each keeps per-session state, and the renderer
//! overlays their output (sixel strips, Kitty placements, ReGIS
//! primitives, Tektronix vectors) over the cell grid. `RESET;<subsystem>`
//! through the Gateway clears each one independently.

pub mod kitty;
pub mod regis;
pub mod sixel;
pub mod tektronix;

pub use kitty::KittyState;
pub use regis::RegisState;
pub use sixel::SixelState;
pub use tektronix::TekState;
