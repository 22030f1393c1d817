// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Gateway command dispatch and the extension registry.

use super::lexer;
use crate::core::grid::{CellFlags, Color, Rgb, parse_color_spec};
use crate::core::session::CursorStyle;
use crate::core::terminal::{ErrorSource, Terminal, VERSION};

/// Echoed request identity; every response carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub class: String,
    pub id: String,
}

impl GatewayReply {
    /// Emit `DCS GATE ; class ; id ; <line> ST` on the response channel.
    pub fn respond(&self, term: &mut Terminal, line: &str) {
        let framed = format!("\x1bPGATE;{};{};{line}\x1b\\", self.class, self.id);
        term.responses.push_str(&framed);
    }
}

/// A registered extension: `(terminal, invoking session, args, reply)`.
pub type ExtensionHandler = Box<dyn FnMut(&mut Terminal, usize, &str, &GatewayReply) + Send>;

/// Name → handler table. Handlers are taken out for the duration of a call
/// so they can borrow the terminal mutably.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: Vec<(String, Option<ExtensionHandler>)>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("ExtensionRegistry").field("names", &names).finish()
    }
}

impl ExtensionRegistry {
    pub fn register(&mut self, name: &str, handler: ExtensionHandler) {
        let name = name.to_ascii_lowercase();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = Some(handler);
        } else {
            self.entries.push((name, Some(handler)));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    fn take(&mut self, name: &str) -> Option<(usize, ExtensionHandler)> {
        let name = name.to_ascii_lowercase();
        for (idx, (entry_name, slot)) in self.entries.iter_mut().enumerate() {
            if *entry_name == name
                && let Some(handler) = slot.take()
            {
                return Some((idx, handler));
            }
        }
        None
    }

    fn restore(&mut self, idx: usize, handler: ExtensionHandler) {
        if let Some(slot) = self.entries.get_mut(idx) {
            slot.1 = Some(handler);
        }
    }
}

/// Wire in the built-ins (called once at terminal construction).
pub fn register_builtin_extensions(registry: &mut ExtensionRegistry) {
    registry.register("grid", Box::new(super::grid_ext::handle));
    registry.register("net", Box::new(super::net_ext::handle));
    registry.register("icat", Box::new(ext_icat));
    registry.register("broadcast", Box::new(ext_broadcast));
    registry.register("direct", Box::new(ext_direct));
    #[cfg(feature = "voice")]
    {
        registry.register("voice", Box::new(crate::core::collab::voice::ext_voice));
        registry.register("voip", Box::new(crate::core::collab::voice::ext_voip));
    }
}

/// Entry point: `payload` is everything after `GATE;`.
pub fn dispatch(term: &mut Terminal, session: usize, payload: &str) {
    let mut parts = payload.splitn(4, ';');
    let class = parts.next().unwrap_or("").to_string();
    let id = parts.next().unwrap_or("").to_string();
    let command = parts.next().unwrap_or("").to_string();
    let params = parts.next().unwrap_or("").to_string();
    let reply = GatewayReply { class, id };

    match command.to_ascii_uppercase().as_str() {
        "SET" => cmd_set(term, session, &reply, &params),
        "GET" => cmd_get(term, session, &reply, &params),
        "RESET" => cmd_reset(term, session, &reply, &params),
        "EXT" => cmd_ext(term, session, &reply, &params),
        "PIPE" => super::pipe::handle(term, session, &reply, &params),
        "RAWDUMP" => cmd_rawdump(term, session, &reply, &params),
        "HELP" => {
            reply.respond(term, "OK;COMMANDS=SET,GET,RESET,EXT,PIPE,RAWDUMP,HELP,PING");
        }
        "PING" => {
            let line = if params.is_empty() {
                "PONG".to_string()
            } else {
                format!("PONG;{params}")
            };
            reply.respond(term, &line);
        }
        other => {
            // Unknown commands fall through to the host callback.
            if let Some(mut cb) = term.gateway_fallback.take() {
                cb(&reply.class, &reply.id, &command, &params);
                term.gateway_fallback = Some(cb);
            } else {
                term.errors.warn(
                    ErrorSource::Gateway,
                    &format!("unknown gateway command {other:?}"),
                );
                reply.respond(term, &format!("ERR;UNKNOWN;{other}"));
            }
        }
    }
}

// ── SET ─────────────────────────────────────────────────────────────────

fn cmd_set(term: &mut Terminal, session: usize, reply: &GatewayReply, params: &str) {
    let fields = lexer::split_fields(params);
    let Some(group) = fields.first() else {
        reply.respond(term, "ERR;SET;MISSING_GROUP");
        return;
    };
    let group_upper = group.to_ascii_uppercase();
    let mut applied = 0usize;
    for field in &fields[1..] {
        let Some((key, value)) = lexer::split_key_value(field) else { continue };
        if apply_set(term, session, &group_upper, key, value) {
            applied += 1;
        }
    }
    reply.respond(term, &format!("OK;SET;{applied}"));
}

fn apply_set(term: &mut Terminal, session: usize, group: &str, key: &str, value: &str) -> bool {
    let key = key.to_ascii_uppercase();
    match group {
        "CURSOR" => {
            let Some(s) = term.session_mut(session) else { return false };
            match key.as_str() {
                "SKIP_PROTECT" => s.skip_protect = value != "0",
                "VISIBLE" => s.cursor.visible = value != "0",
                "STYLE" => s.cursor.style = CursorStyle::from_param(value.parse().unwrap_or(0)),
                "X" => s.cursor.x = value.parse::<usize>().unwrap_or(s.cursor.x).min(s.cols - 1),
                "Y" => s.cursor.y = value.parse::<usize>().unwrap_or(s.cursor.y).min(s.rows - 1),
                _ => return false,
            }
            true
        }
        "SGR" => {
            let Some(s) = term.session_mut(session) else { return false };
            match key.as_str() {
                "FG" => {
                    s.fg = parse_gateway_color(value).unwrap_or(Color::Default);
                }
                "BG" => {
                    s.bg = parse_gateway_color(value).unwrap_or(Color::Default);
                }
                "ATTR" => {
                    s.attrs = parse_attr_string(value);
                }
                _ => return false,
            }
            true
        }
        "MODE" => {
            let Some(s) = term.session_mut(session) else { return false };
            let enable = value != "0";
            match key.as_str() {
                "AUTOWRAP" => s.modes.autowrap = enable,
                "ORIGIN" => s.modes.origin = enable,
                "INSERT" => s.modes.insert = enable,
                "REVERSE" => s.modes.reverse_video = enable,
                "BRACKETED_PASTE" => s.modes.bracketed_paste = enable,
                "STRICT" => s.strict_mode = enable,
                _ => return false,
            }
            true
        }
        "PALETTE" => {
            let Ok(index) = key.parse::<u8>() else { return false };
            let Some(rgb) = parse_gateway_rgb(value) else { return false };
            term.palette.set(index, rgb);
            true
        }
        "SESSION" => match key.as_str() {
            "ACTIVE" => {
                if let Ok(index) = value.parse::<usize>() {
                    term.set_active_session(index);
                    true
                } else {
                    false
                }
            }
            _ => false,
        },
        "SHADER" => {
            // The shader pipeline is a renderer collaborator; the core
            // stores and reports its settings verbatim.
            term.shader_settings.insert(key, value.to_string());
            true
        }
        _ => false,
    }
}

// ── GET ─────────────────────────────────────────────────────────────────

fn cmd_get(term: &mut Terminal, session: usize, reply: &GatewayReply, params: &str) {
    let group = lexer::split_fields(params).first().cloned().unwrap_or_default();
    let missing = || "ERR;GET;NO_SESSION".to_string();
    let line = match group.to_ascii_uppercase().as_str() {
        "VERSION" => format!("OK;VERSION={VERSION}"),
        "CURSOR" => term.session(session).map_or_else(missing, |s| {
            format!(
                "OK;X={};Y={};VISIBLE={};STYLE={};SKIP_PROTECT={}",
                s.cursor.x,
                s.cursor.y,
                u8::from(s.cursor.visible),
                s.cursor.style as u8,
                u8::from(s.skip_protect),
            )
        }),
        "SGR" => term
            .session(session)
            .map_or_else(missing, |s| format!("OK;SGR={}", s.sgr_report())),
        "MODE" => term.session(session).map_or_else(missing, |s| {
            format!(
                "OK;AUTOWRAP={};ORIGIN={};INSERT={};REVERSE={};BRACKETED_PASTE={}",
                u8::from(s.modes.autowrap),
                u8::from(s.modes.origin),
                u8::from(s.modes.insert),
                u8::from(s.modes.reverse_video),
                u8::from(s.modes.bracketed_paste),
            )
        }),
        "SESSION" => format!(
            "OK;ACTIVE={};OPEN={};COLS={};ROWS={}",
            term.active_session(),
            term.open_session_count(),
            term.session(session).map_or(0, |s| s.cols),
            term.session(session).map_or(0, |s| s.rows),
        ),
        "STATUS" => {
            let status = term.status();
            format!(
                "OK;PIPELINE={};KEYS={};OVERFLOW={}",
                status.pipeline_usage,
                status.key_usage,
                u8::from(status.overflow_detected),
            )
        }
        "SHADER" => {
            let mut pairs: Vec<String> = term
                .shader_settings
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            pairs.sort();
            format!("OK;{}", pairs.join(";"))
        }
        other => {
            term.errors.warn(ErrorSource::Gateway, &format!("GET: unknown group {other:?}"));
            format!("ERR;GET;UNKNOWN_GROUP;{other}")
        }
    };
    reply.respond(term, &line);
}

// ── RESET ───────────────────────────────────────────────────────────────

fn cmd_reset(term: &mut Terminal, session: usize, reply: &GatewayReply, params: &str) {
    let subsystem = lexer::split_fields(params).first().cloned().unwrap_or_default();
    let known = match subsystem.to_ascii_uppercase().as_str() {
        "CURSOR" => {
            if let Some(s) = term.session_mut(session) {
                s.cursor = crate::core::session::Cursor::default();
                s.skip_protect = false;
            }
            true
        }
        "SGR" => {
            if let Some(s) = term.session_mut(session) {
                s.reset_sgr();
            }
            true
        }
        "PALETTE" => {
            term.palette.reset_all();
            true
        }
        "REGIS" => {
            if let Some(s) = term.session_mut(session) {
                // Frees stored macro bodies along with the primitives.
                s.regis.reset();
            }
            true
        }
        "SIXEL" => {
            if let Some(s) = term.session_mut(session) {
                s.sixel.reset();
            }
            true
        }
        "KITTY" => {
            if let Some(s) = term.session_mut(session) {
                s.kitty.reset();
            }
            true
        }
        "TEKTRONIX" => {
            if let Some(s) = term.session_mut(session) {
                s.tektronix.reset();
            }
            true
        }
        "ALL" => {
            term.palette.reset_all();
            if let Some(s) = term.session_mut(session) {
                s.full_reset();
            }
            true
        }
        _ => false,
    };
    if known {
        reply.respond(term, &format!("OK;RESET;{}", subsystem.to_ascii_uppercase()));
    } else {
        reply.respond(term, &format!("ERR;RESET;UNKNOWN;{subsystem}"));
    }
}

// ── EXT ─────────────────────────────────────────────────────────────────

fn cmd_ext(term: &mut Terminal, session: usize, reply: &GatewayReply, params: &str) {
    let (name, args) = match params.split_once(';') {
        Some((name, args)) => (name.trim(), args),
        None => (params.trim(), ""),
    };
    if name.is_empty() {
        reply.respond(term, "ERR;EXT;MISSING_NAME");
        return;
    }
    match term.gateway_extensions.take(name) {
        Some((idx, mut handler)) => {
            handler(term, session, args, reply);
            term.gateway_extensions.restore(idx, handler);
        }
        None => {
            // Unknown extensions fall through to the user callback.
            if let Some(mut cb) = term.gateway_fallback.take() {
                cb(&reply.class, &reply.id, "EXT", params);
                term.gateway_fallback = Some(cb);
            } else {
                reply.respond(term, &format!("ERR;EXT;UNKNOWN;{name}"));
            }
        }
    }
}

// ── RAWDUMP ─────────────────────────────────────────────────────────────

fn cmd_rawdump(term: &mut Terminal, session: usize, reply: &GatewayReply, params: &str) {
    let fields = lexer::split_fields(params);
    let verb = fields.first().map(|f| f.to_ascii_uppercase()).unwrap_or_default();
    match verb.as_str() {
        "START" => {
            let target = fields
                .iter()
                .skip(1)
                .find_map(|f| lexer::split_key_value(f))
                .filter(|(k, _)| k.eq_ignore_ascii_case("SESSION"))
                .and_then(|(_, v)| v.parse::<usize>().ok());
            match target {
                Some(target) if target < crate::core::session::MAX_SESSIONS => {
                    term.open_session(target);
                    if let Some(s) = term.session_mut(session) {
                        s.raw_dump.active = true;
                        s.raw_dump.target_session = target;
                        s.raw_dump_cursor = (0, 0);
                    }
                    reply.respond(term, &format!("OK;RAWDUMP;SESSION={target}"));
                }
                _ => reply.respond(term, "ERR;RAWDUMP;BAD_SESSION"),
            }
        }
        "STOP" => {
            if let Some(s) = term.session_mut(session) {
                s.raw_dump.active = false;
            }
            reply.respond(term, "OK;RAWDUMP;STOPPED");
        }
        _ => reply.respond(term, "ERR;RAWDUMP;UNKNOWN_VERB"),
    }
}

// ── Built-in simple extensions ──────────────────────────────────────────

/// `EXT;icat;<base64>`: wrap the payload into a Kitty graphics APC and
/// feed it back through the session's input path.
fn ext_icat(term: &mut Terminal, session: usize, args: &str, reply: &GatewayReply) {
    if args.is_empty() {
        reply.respond(term, "ERR;ICAT;NO_DATA");
        return;
    }
    let sequence = format!("\x1b_Gf=100,a=T;{args}\x1b\\");
    term.write_bytes(session, sequence.as_bytes());
    reply.respond(term, "OK;ICAT;QUEUED");
}

/// `EXT;broadcast;<text>`: inject the text into every open session.
fn ext_broadcast(term: &mut Terminal, _session: usize, args: &str, reply: &GatewayReply) {
    let mut count = 0usize;
    for index in 0..crate::core::session::MAX_SESSIONS {
        if term.session(index).is_some_and(|s| s.open) && term.write_bytes(index, args.as_bytes())
        {
            count += 1;
        }
    }
    reply.respond(term, &format!("OK;BROADCAST;{count}"));
}

/// `EXT;direct;0|1`: toggle direct-input mode on the invoking session.
fn ext_direct(term: &mut Terminal, session: usize, args: &str, reply: &GatewayReply) {
    let enable = args.trim() != "0";
    if let Some(s) = term.session_mut(session) {
        s.direct_input = enable;
    }
    reply.respond(term, &format!("OK;DIRECT;{}", u8::from(enable)));
}

// ── Value parsing helpers ───────────────────────────────────────────────

/// `pal:N`, `rgb:RRGGBB`, `#RRGGBB`, bare index, or `default`.
#[must_use]
pub fn parse_gateway_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("default") {
        return Some(Color::Default);
    }
    if let Some(rest) = value.strip_prefix("pal:") {
        return rest.parse::<u8>().ok().map(Color::Indexed);
    }
    if let Some(rest) = value.strip_prefix("rgb:") {
        // Compact RRGGBB form used by the grid extension.
        if rest.len() == 6 {
            let bytes = crate::core::codec::hex_decode(rest.as_bytes(), 3);
            if bytes.len() == 3 {
                return Some(Color::Rgb(bytes[0], bytes[1], bytes[2]));
            }
        }
        return parse_color_spec(value).map(|c| Color::Rgb(c.r, c.g, c.b));
    }
    if value.starts_with('#') {
        return parse_color_spec(value).map(|c| Color::Rgb(c.r, c.g, c.b));
    }
    value.parse::<u8>().ok().map(Color::Indexed)
}

#[must_use]
pub fn parse_gateway_rgb(value: &str) -> Option<Rgb> {
    match parse_gateway_color(value)? {
        Color::Rgb(r, g, b) => Some(Rgb::new(r, g, b)),
        Color::Indexed(_) | Color::Default => parse_color_spec(value),
    }
}

/// `BOLD|UNDERLINE|...` or a raw numeric flags word.
#[must_use]
pub fn parse_attr_string(value: &str) -> CellFlags {
    if let Ok(raw) = value.trim().parse::<u32>() {
        return CellFlags::from_bits_truncate(raw);
    }
    let mut flags = CellFlags::empty();
    for token in value.split('|') {
        match token.trim().to_ascii_uppercase().as_str() {
            "BOLD" => flags.insert(CellFlags::BOLD),
            "DIM" | "FAINT" => flags.insert(CellFlags::FAINT),
            "ITALIC" => flags.insert(CellFlags::ITALIC),
            "UNDERLINE" => flags.insert(CellFlags::UNDERLINE),
            "BLINK" => flags.insert(CellFlags::BLINK),
            "REVERSE" | "INVERSE" => flags.insert(CellFlags::REVERSE),
            "HIDDEN" | "CONCEAL" => flags.insert(CellFlags::CONCEAL),
            "STRIKE" => flags.insert(CellFlags::STRIKE),
            "PROTECTED" => flags.insert(CellFlags::PROTECTED),
            _ => {}
        }
    }
    flags
}
