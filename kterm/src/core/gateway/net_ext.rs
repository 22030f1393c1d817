// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The `net` Gateway extension: connection control and the diagnostic
//! sub-operations, all bridged onto the session's network attachment.

use super::dispatcher::GatewayReply;
use super::lexer;
use crate::core::net::{NetProtocol, ReconnectPolicy};
use crate::core::terminal::Terminal;

pub fn handle(term: &mut Terminal, session: usize, args: &str, reply: &GatewayReply) {
    let fields = lexer::split_fields(args);
    let Some(verb) = fields.first() else {
        reply.respond(term, "ERR;NET;MISSING_VERB");
        return;
    };
    let get = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");

    match verb.to_ascii_lowercase().as_str() {
        "connect" => {
            let host = get(1);
            if host.is_empty() {
                reply.respond(term, "ERR;NET;MISSING_HOST");
                return;
            }
            let port = get(2).parse::<u16>().unwrap_or(23);
            let user = get(3);
            let pass = get(4);
            term.net.connect(session, host, port, user, pass);
            reply.respond(term, &format!("OK;CONNECTING;{host}:{port}"));
        }
        "disconnect" => {
            let _ = term.net.disconnect(session);
            reply.respond(term, "OK;DISCONNECTED");
        }
        "listen" => match get(1).parse::<u16>() {
            Ok(port) => {
                term.net.listen(session, port);
                reply.respond(term, &format!("OK;LISTENING;{port}"));
            }
            Err(_) => reply.respond(term, "ERR;NET;BAD_PORT"),
        },
        "protocol" => {
            let protocol = match get(1).to_ascii_lowercase().as_str() {
                "framed" => NetProtocol::Framed,
                "telnet" => NetProtocol::Telnet,
                _ => NetProtocol::Raw,
            };
            term.net.set_protocol(session, protocol);
            reply.respond(term, &format!("OK;PROTOCOL;{protocol}"));
        }
        "reconnect" => {
            let policy = ReconnectPolicy {
                enable: get(1) != "0",
                max_retries: get(2).parse().unwrap_or(3),
                delay: std::time::Duration::from_millis(get(3).parse().unwrap_or(1000)),
            };
            term.net.set_auto_reconnect(session, policy);
            reply.respond(term, "OK;RECONNECT");
        }
        "target" => match get(1).parse::<usize>() {
            Ok(target) => {
                term.net.set_target_session(session, target);
                reply.respond(term, &format!("OK;TARGET;{target}"));
            }
            Err(_) => reply.respond(term, "ERR;NET;BAD_TARGET"),
        },
        "status" => {
            let line = term
                .net
                .conn(session)
                .map_or_else(|| "STATE=Disconnected".to_string(), |c| c.status_line());
            reply.respond(term, &format!("OK;{line}"));
        }
        "ping" => with_diag(term, session, reply, |d| d.start_ping(get(1), 4)),
        "ping-ext" | "ping_ext" => {
            let count = get(2).parse().unwrap_or(10);
            with_diag(term, session, reply, |d| d.start_ping(get(1), count));
        }
        "traceroute" => {
            let hops = get(2).parse().unwrap_or(30);
            let timeout = get(3).parse().unwrap_or(1000);
            with_diag(term, session, reply, |d| d.start_traceroute(get(1), hops, timeout));
        }
        "speedtest" => {
            let port = get(2).parse().unwrap_or(80);
            let secs = get(3).parse().unwrap_or(5);
            with_diag(term, session, reply, |d| d.start_speedtest(get(1), port, secs));
        }
        "port-scan" | "port_scan" => {
            let first = get(2).parse().unwrap_or(1);
            let last = get(3).parse().unwrap_or(1024);
            with_diag(term, session, reply, |d| d.start_port_scan(get(1), first, last));
        }
        "whois" => with_diag(term, session, reply, |d| d.start_whois(get(1))),
        "http-probe" | "http_probe" => {
            let port = get(2).parse().unwrap_or(80);
            with_diag(term, session, reply, |d| d.start_http_probe(get(1), port, get(3)));
        }
        "mtu-probe" | "mtu_probe" => {
            with_diag(term, session, reply, |d| d.start_mtu_probe(get(1)));
        }
        "frag-test" | "frag_test" => {
            let size = get(2).parse().unwrap_or(1500);
            with_diag(term, session, reply, |d| d.start_frag_test(get(1), size));
        }
        "cancel_diag" => {
            let cancelled = term
                .net
                .conn_mut(session)
                .map_or(0, |c| c.diagnostics.cancel_all());
            reply.respond(term, &format!("OK;CANCELLED;{cancelled}"));
        }
        other => reply.respond(term, &format!("ERR;NET;UNKNOWN_VERB;{other}")),
    }
}

/// Diagnostics live on the connection slot; materialize it if the session
/// has no socket yet (diagnostics do not require one).
fn with_diag(
    term: &mut Terminal,
    session: usize,
    reply: &GatewayReply,
    start: impl FnOnce(&mut crate::core::net::DiagSet),
) {
    if term.net.conn_mut(session).is_none() {
        // Materialize a disconnected slot to carry the diagnostics.
        term.net.set_protocol(session, NetProtocol::Raw);
    }
    let running = term.net.conn_mut(session).map(|conn| {
        start(&mut conn.diagnostics);
        conn.diagnostics.running()
    });
    match running {
        Some(running) => reply.respond(term, &format!("OK;DIAG;RUNNING={running}")),
        None => reply.respond(term, "ERR;NET;NO_SLOT"),
    }
}
