// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Network transport for attaching sessions to sockets: non-blocking
//! connection lifecycle, telnet option negotiation, the length-prefixed
//! framed packet protocol, the pluggable security hook, and the per-frame
//! diagnostic sub-operations.

pub mod conn;
pub mod diag;
pub mod framed;
pub mod security;
pub mod telnet;

pub use conn::*;
pub use diag::*;
pub use framed::*;
pub use security::*;
pub use telnet::*;
