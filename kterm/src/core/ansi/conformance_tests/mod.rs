// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End-to-end conformance tests: byte streams in through the public
//! terminal surface, assertions against the resulting grid, cursor, modes,
//! and response bytes. Complements the unit tests living next to each
//! module.

pub mod test_fixtures;

pub mod test_alt_screen;
pub mod test_charset_ops;
pub mod test_cursor_ops;
pub mod test_erase_ops;
pub mod test_gateway_dcs;
pub mod test_reports;
pub mod test_scroll_region;
pub mod test_vt52;
pub mod test_wide_cells;
