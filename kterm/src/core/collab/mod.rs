// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Feature-gated collaborator stubs.
//!
//! The audio voice subsystem and the LiveWire packet sniffer are external
//! collaborators reached through the Gateway; the core only carries their
//! seams. With the matching cargo feature off, the modules simply do not
//! exist and nothing else in the core changes shape - the core never
//! conditionally compiles its own logic.

#[cfg(feature = "livewire")]
pub mod livewire;
#[cfg(feature = "voice")]
pub mod voice;
