// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The two pipelines between the core and its host: front-end input events
//! in (lock-free SPSC ring) and response bytes out (byte ring with an
//! optional pluggable sink).

pub mod events;
pub mod input_queue;
pub mod response_ring;

pub use events::*;
pub use input_queue::*;
pub use response_ring::*;
