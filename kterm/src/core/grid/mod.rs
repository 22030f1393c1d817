// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The cell model and the ring-buffered screen grid.
//!
//! Each session owns two grids: the primary one, which is a ring of
//! `buffer_height` rows whose bottom `rows` rows are the visible screen and
//! whose remainder is scrollback, and the alternate one, which is exactly
//! screen sized. See [`Grid`] for the ring arithmetic.

pub mod cell;
pub mod grid_buffer;
pub mod palette;

pub use cell::*;
pub use grid_buffer::*;
pub use palette::*;
