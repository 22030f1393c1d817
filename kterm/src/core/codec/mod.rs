// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Byte-level codecs shared by the parser, the Gateway pipe, and the Kitty
//! graphics path: incremental UTF-8 decoding, base64, hex, and checksums.

pub mod base64;
pub mod checksum;
pub mod hex;
pub mod utf8;

pub use base64::*;
pub use checksum::*;
pub use hex::*;
pub use utf8::*;
