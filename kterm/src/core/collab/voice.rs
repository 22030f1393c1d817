// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Voice collaborator stub. The real subsystem lives outside the core;
//! this seam accepts the Gateway commands and the framed audio packets
//! and does nothing with them.

use crate::core::gateway::GatewayReply;
use crate::core::terminal::Terminal;

/// `EXT;voice;…` - acknowledged, no audio pipeline in the core.
pub fn ext_voice(term: &mut Terminal, _session: usize, args: &str, reply: &GatewayReply) {
    tracing::debug!(args, "voice extension invoked (stub)");
    reply.respond(term, "OK;VOICE;STUB");
}

/// `EXT;voip;…` - same seam, same stub.
pub fn ext_voip(term: &mut Terminal, _session: usize, args: &str, reply: &GatewayReply) {
    tracing::debug!(args, "voip extension invoked (stub)");
    reply.respond(term, "OK;VOIP;STUB");
}
