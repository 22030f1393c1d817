// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The Gateway Protocol: a secondary command language carried inside
//! `DCS GATE ; <class> ; <id> ; <command> [ ; <params> ] ST`.
//!
//! Commands cover configuration (`SET`/`GET`/`RESET`), extension
//! invocation (`EXT`), payload injection (`PIPE`), raw-byte mirroring
//! (`RAWDUMP`), and the built-in conveniences `HELP`, `PING`, and
//! `VERSION`. Matching is case-insensitive. Responses mirror the request
//! framing and echo the class and id.

pub mod dispatcher;
pub mod grid_ext;
pub mod lexer;
pub mod net_ext;
pub mod pipe;

pub use dispatcher::*;
