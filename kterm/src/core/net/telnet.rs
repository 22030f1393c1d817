// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Telnet (RFC 854) IAC state machine.
//!
//! Incoming bytes are filtered into plain data; negotiation commands are
//! answered (user callback first, default policy rejects with DONT/WONT,
//! NAWS is accepted and answered with a window-size subnegotiation).
//! Subnegotiations buffer until `IAC SE`; the delivered payload is capped
//! at 1024 bytes while the accumulator tolerates up to 2048 bytes of
//! malformed SB data before giving up on the exchange.

use super::conn::NetCallbacks;

pub const TELNET_SE: u8 = 240;
pub const TELNET_NOP: u8 = 241;
pub const TELNET_SB: u8 = 250;
pub const TELNET_WILL: u8 = 251;
pub const TELNET_WONT: u8 = 252;
pub const TELNET_DO: u8 = 253;
pub const TELNET_DONT: u8 = 254;
pub const TELNET_IAC: u8 = 255;

pub const OPT_ECHO: u8 = 1;
pub const OPT_SGA: u8 = 3;
pub const OPT_NAWS: u8 = 31;
pub const OPT_NEW_ENVIRON: u8 = 39;

/// Delivered SB payload cap.
pub const SB_PAYLOAD_LIMIT: usize = 1024;
/// Accumulator tolerance for malformed SB data.
pub const SB_ACCUMULATOR_LIMIT: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
enum TelnetParse {
    #[default]
    Normal,
    Iac,
    Will,
    Wont,
    Do,
    Dont,
    Sb,
    SbIac,
}

#[derive(Debug, Default)]
pub struct TelnetMachine {
    state: TelnetParse,
    sb_option: u8,
    sb_has_option: bool,
    sb_buf: Vec<u8>,
    /// Options we have agreed to WILL.
    local_enabled: Vec<u8>,
}

impl TelnetMachine {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn reset(&mut self) { *self = Self::default(); }

    /// Filter `input`. Plain bytes land in `plain`; protocol replies land
    /// in `reply` for the caller to transmit.
    pub fn process(
        &mut self,
        input: &[u8],
        plain: &mut Vec<u8>,
        reply: &mut Vec<u8>,
        callbacks: &mut NetCallbacks,
        window: (u16, u16),
        username: &str,
    ) {
        for &byte in input {
            self.step(byte, plain, reply, callbacks, window, username);
        }
    }

    fn step(
        &mut self,
        byte: u8,
        plain: &mut Vec<u8>,
        reply: &mut Vec<u8>,
        callbacks: &mut NetCallbacks,
        window: (u16, u16),
        username: &str,
    ) {
        match self.state {
            TelnetParse::Normal => match byte {
                TELNET_IAC => self.state = TelnetParse::Iac,
                _ => plain.push(byte),
            },
            TelnetParse::Iac => match byte {
                // Escaped 0xFF data byte.
                TELNET_IAC => {
                    plain.push(TELNET_IAC);
                    self.state = TelnetParse::Normal;
                }
                TELNET_WILL => self.state = TelnetParse::Will,
                TELNET_WONT => self.state = TelnetParse::Wont,
                TELNET_DO => self.state = TelnetParse::Do,
                TELNET_DONT => self.state = TelnetParse::Dont,
                TELNET_SB => {
                    self.sb_buf.clear();
                    self.sb_option = 0;
                    self.sb_has_option = false;
                    self.state = TelnetParse::Sb;
                }
                TELNET_NOP => self.state = TelnetParse::Normal,
                _ => self.state = TelnetParse::Normal,
            },
            TelnetParse::Will => {
                self.negotiate(TELNET_WILL, byte, reply, callbacks);
                self.state = TelnetParse::Normal;
            }
            TelnetParse::Wont => {
                self.negotiate(TELNET_WONT, byte, reply, callbacks);
                self.state = TelnetParse::Normal;
            }
            TelnetParse::Do => {
                self.handle_do(byte, reply, callbacks, window, username);
                self.state = TelnetParse::Normal;
            }
            TelnetParse::Dont => {
                self.local_enabled.retain(|&o| o != byte);
                self.state = TelnetParse::Normal;
            }
            TelnetParse::Sb => {
                if byte == TELNET_IAC {
                    self.state = TelnetParse::SbIac;
                } else if !self.sb_has_option {
                    // First SB byte is the option.
                    self.sb_option = byte;
                    self.sb_has_option = true;
                } else if self.sb_buf.len() < SB_ACCUMULATOR_LIMIT {
                    self.sb_buf.push(byte);
                } else {
                    // Malformed runaway subnegotiation; abandon it.
                    tracing::warn!(option = self.sb_option, "telnet SB overflow, dropping");
                    self.state = TelnetParse::Normal;
                }
            }
            TelnetParse::SbIac => match byte {
                TELNET_SE => {
                    let payload_len = self.sb_buf.len().min(SB_PAYLOAD_LIMIT);
                    let option = self.sb_option;
                    let payload = &self.sb_buf[..payload_len];
                    if let Some(cb) = &mut callbacks.on_telnet_sb {
                        cb(option, payload);
                    }
                    if option == OPT_NEW_ENVIRON {
                        send_new_environ(reply, username);
                    }
                    self.state = TelnetParse::Normal;
                }
                TELNET_IAC => {
                    // Escaped IAC inside SB data.
                    if self.sb_buf.len() < SB_ACCUMULATOR_LIMIT {
                        self.sb_buf.push(TELNET_IAC);
                    }
                    self.state = TelnetParse::Sb;
                }
                _ => self.state = TelnetParse::Normal,
            },
        }
    }

    /// Peer announced WILL/WONT. Callback first; the default policy
    /// declines everything.
    fn negotiate(&mut self, verb: u8, option: u8, reply: &mut Vec<u8>, callbacks: &mut NetCallbacks) {
        if let Some(cb) = &mut callbacks.on_telnet_command
            && cb(verb, option)
        {
            return;
        }
        if verb == TELNET_WILL {
            reply.extend_from_slice(&[TELNET_IAC, TELNET_DONT, option]);
        }
    }

    fn handle_do(
        &mut self,
        option: u8,
        reply: &mut Vec<u8>,
        callbacks: &mut NetCallbacks,
        window: (u16, u16),
        _username: &str,
    ) {
        if let Some(cb) = &mut callbacks.on_telnet_command
            && cb(TELNET_DO, option)
        {
            return;
        }
        match option {
            OPT_NAWS => {
                reply.extend_from_slice(&[TELNET_IAC, TELNET_WILL, OPT_NAWS]);
                send_naws(reply, window);
                if !self.local_enabled.contains(&OPT_NAWS) {
                    self.local_enabled.push(OPT_NAWS);
                }
            }
            OPT_SGA | OPT_ECHO => {
                reply.extend_from_slice(&[TELNET_IAC, TELNET_WILL, option]);
                if !self.local_enabled.contains(&option) {
                    self.local_enabled.push(option);
                }
            }
            _ => reply.extend_from_slice(&[TELNET_IAC, TELNET_WONT, option]),
        }
    }
}

/// `IAC SB NAWS w-hi w-lo h-hi h-lo IAC SE`, IAC-doubling the payload.
pub fn send_naws(reply: &mut Vec<u8>, window: (u16, u16)) {
    reply.extend_from_slice(&[TELNET_IAC, TELNET_SB, OPT_NAWS]);
    for value in [window.0, window.1] {
        for byte in value.to_be_bytes() {
            if byte == TELNET_IAC {
                reply.push(TELNET_IAC);
            }
            reply.push(byte);
        }
    }
    reply.extend_from_slice(&[TELNET_IAC, TELNET_SE]);
}

/// Default NEW-ENVIRON response carrying the configured user name:
/// `IAC SB NEW-ENVIRON IS VAR "USER" VALUE <name> IAC SE`.
fn send_new_environ(reply: &mut Vec<u8>, username: &str) {
    reply.extend_from_slice(&[TELNET_IAC, TELNET_SB, OPT_NEW_ENVIRON, 0, 0]);
    reply.extend_from_slice(b"USER");
    reply.push(1);
    reply.extend_from_slice(username.as_bytes());
    reply.extend_from_slice(&[TELNET_IAC, TELNET_SE]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(machine: &mut TelnetMachine, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut plain = Vec::new();
        let mut reply = Vec::new();
        let mut callbacks = NetCallbacks::default();
        machine.process(input, &mut plain, &mut reply, &mut callbacks, (80, 24), "user");
        (plain, reply)
    }

    #[test]
    fn plain_data_passes_through() {
        let mut m = TelnetMachine::new();
        let (plain, reply) = run(&mut m, b"hello");
        assert_eq!(plain, b"hello");
        assert!(reply.is_empty());
    }

    #[test]
    fn doubled_iac_is_one_data_byte() {
        let mut m = TelnetMachine::new();
        let (plain, _) = run(&mut m, &[TELNET_IAC, TELNET_IAC, b'x']);
        assert_eq!(plain, vec![255, b'x']);
    }

    #[test]
    fn do_naws_answers_will_and_window_report() {
        let mut m = TelnetMachine::new();
        let (_, reply) = run(&mut m, &[TELNET_IAC, TELNET_DO, OPT_NAWS]);
        assert_eq!(
            reply,
            vec![
                TELNET_IAC, TELNET_WILL, OPT_NAWS,
                TELNET_IAC, TELNET_SB, OPT_NAWS, 0x00, 0x50, 0x00, 0x18,
                TELNET_IAC, TELNET_SE,
            ]
        );
    }

    #[test]
    fn unknown_do_is_refused() {
        let mut m = TelnetMachine::new();
        let (_, reply) = run(&mut m, &[TELNET_IAC, TELNET_DO, 42]);
        assert_eq!(reply, vec![TELNET_IAC, TELNET_WONT, 42]);
    }

    #[test]
    fn unknown_will_gets_dont() {
        let mut m = TelnetMachine::new();
        let (_, reply) = run(&mut m, &[TELNET_IAC, TELNET_WILL, 42]);
        assert_eq!(reply, vec![TELNET_IAC, TELNET_DONT, 42]);
    }

    #[test]
    fn callback_can_accept_negotiation() {
        let mut m = TelnetMachine::new();
        let mut plain = Vec::new();
        let mut reply = Vec::new();
        let mut callbacks = NetCallbacks {
            on_telnet_command: Some(Box::new(|_verb, _opt| true)),
            ..NetCallbacks::default()
        };
        m.process(&[TELNET_IAC, TELNET_DO, 42], &mut plain, &mut reply, &mut callbacks, (80, 24), "");
        assert!(reply.is_empty());
    }

    #[test]
    fn subnegotiation_delivers_option_and_payload() {
        let seen: std::sync::Arc<std::sync::Mutex<Vec<(u8, Vec<u8>)>>> =
            std::sync::Arc::default();
        let seen_cb = seen.clone();
        let mut callbacks = NetCallbacks {
            on_telnet_sb: Some(Box::new(move |opt, data| {
                seen_cb.lock().unwrap().push((opt, data.to_vec()));
            })),
            ..NetCallbacks::default()
        };
        let mut m = TelnetMachine::new();
        let mut plain = Vec::new();
        let mut reply = Vec::new();
        let input = [
            TELNET_IAC, TELNET_SB, OPT_NEW_ENVIRON, 0, b'T', b'E', b'S', b'T',
            TELNET_IAC, TELNET_SE,
        ];
        m.process(&input, &mut plain, &mut reply, &mut callbacks, (80, 24), "alice");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, OPT_NEW_ENVIRON);
        assert_eq!(seen[0].1, [0, b'T', b'E', b'S', b'T']);
        // Default NEW-ENVIRON reply carries the configured user.
        let reply_text = String::from_utf8_lossy(&reply).into_owned();
        assert!(reply_text.contains("USER"));
        assert!(reply_text.contains("alice"));
    }

    #[test]
    fn oversize_sb_is_abandoned() {
        let mut m = TelnetMachine::new();
        let mut input = vec![TELNET_IAC, TELNET_SB, OPT_NEW_ENVIRON];
        input.extend(std::iter::repeat_n(b'a', SB_ACCUMULATOR_LIMIT + 10));
        input.extend_from_slice(&[TELNET_IAC, TELNET_SE]);
        let (plain, _) = run(&mut m, &input);
        // Once abandoned, the trailing bytes fall back to plain data; no
        // crash, no unbounded growth.
        assert!(plain.len() <= SB_ACCUMULATOR_LIMIT + 16);
    }
}
