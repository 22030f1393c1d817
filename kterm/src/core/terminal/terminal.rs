// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The multiplexer root and the cooperative frame pipeline.
//!
//! One `update()` call per frame drives everything, in a fixed order:
//! input-event drain → network process → per-session inbox parse →
//! deferred action dispatch → budgeted op flush → response drain. The core
//! is single threaded; the only other thread that ever touches it is the
//! front-end producer side of the input event ring.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{CrossAction, ErrorCallback, ErrorReporter, GatewayCallback, SessionCtx, TermConfig, TermEvent};
use crate::core::ansi::{self, keyboard, mouse};
use crate::core::grid::{DynamicColors, Grid, Palette};
use crate::core::io::{InputEvent, InputQueue, KeyCode, KeyEvent, OutputSink, ResponseRing, WindowEvent};
use crate::core::net::{NetEvent, NetManager};
use crate::core::ops::flush_ops;
use crate::core::session::{MAX_SESSIONS, Session};

/// Library version, surfaced through `GATE … GET;VERSION`.
pub const VERSION: &str = "2.6.23";

/// Introspection snapshot (`GetStatus` in the C ancestry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TermStatus {
    /// Ops waiting in the active session's queue.
    pub pipeline_usage: usize,
    /// Input events waiting in the front-end ring.
    pub key_usage: usize,
    /// Latched when any ring dropped data since the last status read.
    pub overflow_detected: bool,
}

/// What the renderer reads once per frame.
#[derive(Debug)]
pub struct RenderSnapshot<'term> {
    pub grid: &'term Grid,
    pub cursor: (usize, usize),
    pub cursor_visible: bool,
    pub palette: &'term Palette,
    pub dynamic: &'term DynamicColors,
    pub reverse_video: bool,
    pub sixel: &'term crate::core::graphics::SixelState,
    pub kitty_images: &'term FxHashMap<u32, crate::core::graphics::kitty::KittyImage>,
    pub kitty_placements: &'term [crate::core::graphics::kitty::KittyPlacement],
    pub regis: &'term [crate::core::graphics::regis::RegisPrimitive],
    pub tektronix: &'term crate::core::graphics::TekState,
}

/// Builder mirroring the config-then-build construction used across the
/// codebase.
#[derive(Debug, Default)]
pub struct TerminalBuilder {
    config: TermConfig,
}

impl TerminalBuilder {
    #[must_use]
    pub fn config(mut self, config: TermConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Fails when the configuration is unusable or the OS poller cannot be
    /// created.
    pub fn build(self) -> miette::Result<Terminal> {
        if self.config.cols == 0 || self.config.rows == 0 {
            miette::bail!("terminal dimensions must be non-zero");
        }
        Terminal::new(self.config)
    }
}

pub struct Terminal {
    pub(crate) config: TermConfig,
    sessions: Vec<Session>,
    active: usize,
    pub(crate) palette: Palette,
    pub(crate) dynamic: DynamicColors,
    pub(crate) clipboard: Vec<u8>,
    pub(crate) responses: ResponseRing,
    input_queue: Arc<InputQueue>,
    pub(crate) errors: ErrorReporter,
    pub(crate) net: NetManager,
    pub(crate) gateway_extensions: crate::core::gateway::ExtensionRegistry,
    pub(crate) gateway_fallback: Option<GatewayCallback>,
    /// Renderer-facing settings carried for the shader collaborator
    /// (opaque key-values the core stores and reports).
    pub(crate) shader_settings: FxHashMap<String, String>,
    events: Vec<TermEvent>,
    overflow: bool,
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("active", &self.active)
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Terminal {
    /// # Errors
    ///
    /// Fails when the OS poller backing the network layer cannot be
    /// created.
    pub fn new(config: TermConfig) -> miette::Result<Self> {
        let net = NetManager::new().map_err(|err| miette::miette!("net poller: {err}"))?;
        let sessions = (0..MAX_SESSIONS).map(|i| Session::new(i, &config)).collect();
        let mut term = Self {
            errors: ErrorReporter { strict: config.strict_mode, callback: None },
            config,
            sessions,
            active: 0,
            palette: Palette::default(),
            dynamic: DynamicColors::default(),
            clipboard: Vec::new(),
            responses: ResponseRing::new(),
            input_queue: Arc::new(InputQueue::new()),
            net,
            gateway_extensions: crate::core::gateway::ExtensionRegistry::default(),
            gateway_fallback: None,
            shader_settings: FxHashMap::default(),
            events: Vec::new(),
            overflow: false,
        };
        crate::core::gateway::register_builtin_extensions(&mut term.gateway_extensions);
        Ok(term)
    }

    #[must_use]
    pub fn builder() -> TerminalBuilder { TerminalBuilder::default() }

    // ── Session access ──────────────────────────────────────────────────

    #[must_use]
    pub fn active_session(&self) -> usize { self.active }

    pub fn set_active_session(&mut self, index: usize) {
        if index < self.sessions.len() && self.sessions[index].open {
            self.active = index;
            self.sessions[index].grid_mut().mark_all_dirty();
        }
    }

    #[must_use]
    pub fn session(&self, index: usize) -> Option<&Session> { self.sessions.get(index) }

    pub fn session_mut(&mut self, index: usize) -> Option<&mut Session> {
        self.sessions.get_mut(index)
    }

    /// Open (initialize) an additional session.
    pub fn open_session(&mut self, index: usize) -> bool {
        match self.sessions.get_mut(index) {
            Some(session) => {
                if !session.open {
                    *session = Session::new(index, &self.config);
                    session.open = true;
                }
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn open_session_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.open).count()
    }

    #[must_use]
    pub fn version(&self) -> &'static str { VERSION }

    // ── Host-facing wiring ──────────────────────────────────────────────

    /// Handle for the front-end input producer thread.
    #[must_use]
    pub fn input_handle(&self) -> Arc<InputQueue> { self.input_queue.clone() }

    pub fn queue_input_event(&self, event: InputEvent) -> bool {
        self.input_queue.write_event(event)
    }

    /// Install the response byte sink; pending bytes flush immediately.
    pub fn set_output_sink(&mut self, sink: OutputSink) {
        self.responses.set_sink(sink);
    }

    /// Manual drain mode for hosts without a sink.
    pub fn drain_responses(&mut self) -> Vec<u8> { self.responses.drain() }

    pub fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.errors.callback = Some(callback);
    }

    pub fn set_gateway_callback(&mut self, callback: GatewayCallback) {
        self.gateway_fallback = Some(callback);
    }

    pub fn register_gateway_extension(
        &mut self,
        name: &str,
        handler: crate::core::gateway::ExtensionHandler,
    ) {
        self.gateway_extensions.register(name, handler);
    }

    #[must_use]
    pub fn net(&self) -> &NetManager { &self.net }

    pub fn net_mut(&mut self) -> &mut NetManager { &mut self.net }

    /// Events for the windowing layer (titles, bell, clipboard writes).
    pub fn drain_events(&mut self) -> Vec<TermEvent> { std::mem::take(&mut self.events) }

    #[must_use]
    pub fn status(&self) -> TermStatus {
        TermStatus {
            pipeline_usage: self.sessions[self.active].op_queue.len(),
            key_usage: self.input_queue.pending(),
            overflow_detected: self.overflow,
        }
    }

    /// Host byte input: feed `bytes` into a session's inbox. Parsing
    /// happens during [`Self::update`].
    pub fn write_bytes(&mut self, session: usize, bytes: &[u8]) -> bool {
        match self.sessions.get_mut(session) {
            Some(s) if s.open => {
                s.inbox.extend(bytes.iter().copied());
                true
            }
            _ => false,
        }
    }

    /// Convenience for text input to the active session.
    pub fn write_str(&mut self, text: &str) -> bool {
        self.write_bytes(self.active, text.as_bytes())
    }

    /// Host-driven window resize: all sessions share the display.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        for session in &mut self.sessions {
            if session.open {
                session.queue_resize(cols, rows);
            }
        }
    }

    // ── The frame pipeline ──────────────────────────────────────────────

    /// One cooperative frame step.
    pub fn update(&mut self) {
        self.drain_input_events();
        self.process_network();
        self.parse_inboxes();
        self.flush_session_ops();
        self.drain_responses_to_socket();
    }

    /// Renderer read access for the active session.
    #[must_use]
    pub fn render_snapshot(&self) -> RenderSnapshot<'_> {
        let session = &self.sessions[self.active];
        RenderSnapshot {
            grid: session.grid(),
            cursor: (session.cursor.x, session.cursor.y),
            cursor_visible: session.cursor.visible,
            palette: &self.palette,
            dynamic: &self.dynamic,
            reverse_video: session.modes.reverse_video,
            sixel: &session.sixel,
            kitty_images: &session.kitty.images,
            kitty_placements: &session.kitty.placements,
            regis: &session.regis.primitives,
            tektronix: &session.tektronix,
        }
    }

    /// Call after the renderer has observed the frame; decays dirty rows.
    pub fn end_frame(&mut self) {
        for session in &mut self.sessions {
            if session.open {
                session.grid_mut().end_frame();
            }
        }
    }

    fn drain_input_events(&mut self) {
        if self.input_queue.take_overflow() {
            self.overflow = true;
        }
        while let Some(event) = self.input_queue.pop_event() {
            match event {
                InputEvent::Key(key) => self.handle_key_event(&key),
                InputEvent::Mouse(ev) => {
                    let session = &self.sessions[self.active];
                    if let Some(bytes) = mouse::encode_mouse(session, &ev) {
                        self.responses.push_bytes(&bytes);
                    }
                }
                InputEvent::Window(ev) => self.handle_window_event(ev),
            }
        }
    }

    fn handle_key_event(&mut self, key: &KeyEvent) {
        let session = &mut self.sessions[self.active];
        if session.direct_input {
            direct_input_key(session, key);
            return;
        }
        let bytes = keyboard::translate_key(session, key);
        self.responses.push_bytes(&bytes);
    }

    fn handle_window_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::Resize { cols, rows } => self.resize(cols, rows),
            WindowEvent::Paste(data) => {
                let session = &self.sessions[self.active];
                let bytes = keyboard::translate_paste(session, &data);
                self.responses.push_bytes(&bytes);
            }
            WindowEvent::FocusIn | WindowEvent::FocusOut => {
                // Focus reporting (mode 1004) is not tracked; focus events
                // are currently host-side only.
            }
        }
    }

    fn process_network(&mut self) {
        let windows: Vec<(u16, u16)> = self
            .sessions
            .iter()
            .map(|s| (s.cols as u16, s.rows as u16))
            .collect();
        let events = self.net.process(&windows, &self.config.username);
        for event in events {
            match event {
                NetEvent::Data { session, bytes } => {
                    self.write_bytes(session, &bytes);
                }
                NetEvent::Resize { session, cols, rows } => {
                    if let Some(s) = self.sessions.get_mut(session) {
                        s.queue_resize(cols, rows);
                    }
                }
                NetEvent::Gateway { session, command } => {
                    crate::core::gateway::dispatch(self, session, &command);
                }
                NetEvent::DiagReport { session, text } => {
                    let mut rendered = text.replace('\n', "\r\n");
                    rendered.push_str("\r\n");
                    self.write_bytes(session, rendered.as_bytes());
                }
                NetEvent::Connected { .. } | NetEvent::Disconnected { .. } => {}
                NetEvent::Error { session, message } => {
                    self.errors.error(
                        super::ErrorSource::Net,
                        &format!("session {session}: {message}"),
                    );
                }
            }
        }
    }

    fn parse_inboxes(&mut self) {
        for index in 0..self.sessions.len() {
            if !self.sessions[index].open || self.sessions[index].inbox.is_empty() {
                continue;
            }
            let budget = self.config.max_chars_per_frame.max(1);
            let mut drained = Vec::with_capacity(self.sessions[index].inbox.len().min(budget));
            while drained.len() < budget {
                match self.sessions[index].inbox.pop_front() {
                    Some(b) => drained.push(b),
                    None => break,
                }
            }

            let mut actions: Vec<CrossAction> = Vec::new();
            {
                let session = &mut self.sessions[index];
                let mut ctx = SessionCtx {
                    config: &self.config,
                    palette: &mut self.palette,
                    dynamic: &mut self.dynamic,
                    clipboard: &mut self.clipboard,
                    responses: &mut self.responses,
                    actions: &mut actions,
                    errors: &mut self.errors,
                };
                for &byte in &drained {
                    ansi::feed_byte(session, &mut ctx, byte);
                }
            }

            if self.sessions[index].auto_print && !drained.is_empty() {
                self.events.push(TermEvent::PrinterBytes(drained.clone()));
            }

            // Raw-dump mirroring: every pre-parse byte is replayed
            // literally into the target session's grid.
            let raw_dump = self.sessions[index].raw_dump;
            if raw_dump.active
                && raw_dump.target_session != index
                && raw_dump.target_session < self.sessions.len()
            {
                let target = &mut self.sessions[raw_dump.target_session];
                if target.open {
                    for &byte in &drained {
                        target.write_raw_mirror_byte(byte);
                    }
                }
            }

            self.apply_actions(index, actions);
        }
    }

    fn apply_actions(&mut self, session: usize, actions: Vec<CrossAction>) {
        for action in actions {
            match action {
                CrossAction::Gateway(payload) => {
                    crate::core::gateway::dispatch(self, session, &payload);
                }
                CrossAction::Event(event) => self.events.push(event),
                CrossAction::SessionStatusReport => {
                    let reply = format!(
                        "\x1bP$p{};{};{}\x1b\\",
                        self.active + 1,
                        self.open_session_count(),
                        u8::from(self.net.is_attached(session)),
                    );
                    self.responses.push_str(&reply);
                }
            }
        }
    }

    fn flush_session_ops(&mut self) {
        let budget = self.config.max_ops_per_flush.max(1);
        for session in &mut self.sessions {
            if !session.open {
                continue;
            }
            flush_ops(session, budget);
            if session.op_queue.take_overflow() {
                self.overflow = true;
            }
        }
        if self.responses.take_overflow() {
            self.overflow = true;
        }
    }

    /// When the active session is attached to a socket, the response ring
    /// drains to its TX side; otherwise the sink (or manual drain) owns it.
    fn drain_responses_to_socket(&mut self) {
        if self.responses.has_sink() {
            return;
        }
        if self.net.is_attached(self.active) {
            let pending = self.responses.drain();
            if !pending.is_empty() {
                self.net.send_bytes(self.active, &pending);
            }
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // Disconnect (and thereby zeroize) every attachment before the
        // sessions go away.
        for session in 0..MAX_SESSIONS {
            let _ = self.net.disconnect(session);
        }
        self.input_queue.clear();
    }
}

/// Direct-input mode: key events mutate the local grid instead of
/// producing response bytes (embedded form/UI scenarios).
fn direct_input_key(session: &mut Session, key: &KeyEvent) {
    match key.code {
        KeyCode::Char(ch) => session.write_char(ch),
        KeyCode::Enter => {
            session.carriage_return();
            session.linefeed_no_cr();
        }
        KeyCode::Backspace => {
            session.backspace();
            session.erase_chars(1);
        }
        KeyCode::Left => session.cursor_left(1),
        KeyCode::Right => session.cursor_right(1),
        KeyCode::Up => session.cursor_up(1),
        KeyCode::Down => session.cursor_down(1),
        KeyCode::Tab => session.tab(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::{KeyModifiers, MouseEvent};
    use pretty_assertions::assert_eq;

    fn term() -> Terminal {
        Terminal::new(TermConfig::default()).unwrap()
    }

    fn cell_char(term: &Terminal, x: usize, y: usize) -> char {
        term.session(0).unwrap().grid().cell(x, y).unwrap().ch
    }

    #[test]
    fn basic_sgr_and_print() {
        let mut t = term();
        t.write_str("\x1b[1;31mHello\r\n");
        t.update();
        for (i, expected) in "Hello".chars().enumerate() {
            let cell = *t.session(0).unwrap().grid().cell(i, 0).unwrap();
            assert_eq!(cell.ch, expected);
            assert_eq!(cell.fg, crate::core::grid::Color::Indexed(1));
            assert!(cell.flags.contains(crate::core::grid::CellFlags::BOLD));
        }
        let s = t.session(0).unwrap();
        assert_eq!((s.cursor.x, s.cursor.y), (0, 1));
    }

    #[test]
    fn dsr_cursor_position_report() {
        let mut t = term();
        t.write_str("\x1b[5;5H\x1b[6n");
        t.update();
        assert_eq!(t.drain_responses(), b"\x1b[5;5R");
    }

    #[test]
    fn split_stream_equals_whole_stream() {
        let stream = b"\x1b[2J\x1b[3;4HAB\x1b[1;31mC\x1b[0m\x1b[5;20r\x1b[?6h\x1b[HXY";
        let mut whole = term();
        whole.write_bytes(0, stream);
        whole.update();

        for split in 1..stream.len() {
            let mut parts = term();
            parts.write_bytes(0, &stream[..split]);
            parts.update();
            parts.write_bytes(0, &stream[split..]);
            parts.update();

            let (a, b) = (whole.session(0).unwrap(), parts.session(0).unwrap());
            assert_eq!(
                (a.cursor.x, a.cursor.y),
                (b.cursor.x, b.cursor.y),
                "cursor diverged at split {split}"
            );
            for y in 0..24 {
                for x in 0..80 {
                    assert_eq!(
                        a.grid().cell(x, y).unwrap().ch,
                        b.grid().cell(x, y).unwrap().ch,
                        "cell ({x},{y}) diverged at split {split}"
                    );
                }
            }
        }
    }

    #[test]
    fn resize_after_queue_hardening() {
        // DECSET 40, switch to 132 columns, then in one burst drop back to
        // 80 and issue a DECCRA with a 130-column extent. The flush must
        // clip the copy, not read or write out of bounds.
        let config = TermConfig { cols: 132, rows: 24, ..TermConfig::default() };
        let mut t = Terminal::new(config).unwrap();
        t.write_str("\x1b[?40h\x1b[?3h");
        t.update();
        assert_eq!(t.session(0).unwrap().cols, 132);
        t.write_str("\x1b[?3l\x1b[1;1;24;130;1$v");
        t.update();
        assert_eq!(t.session(0).unwrap().cols, 80);
    }

    #[test]
    fn osc_palette_set_and_query() {
        let mut t = term();
        t.write_str("\x1b]4;5;rgb:ff/00/00\x1b\\");
        t.update();
        t.drain_responses();
        t.write_str("\x1b]4;5;?\x1b\\");
        t.update();
        let reply = String::from_utf8(t.drain_responses()).unwrap();
        assert!(reply.contains("4;5;rgb:ff"), "got {reply:?}");
    }

    #[test]
    fn decrqss_margin_report() {
        let mut t = term();
        t.write_str("\x1b[5;20r\x1bP$qr\x1b\\");
        t.update();
        assert_eq!(t.drain_responses(), b"\x1bP1$r5;20r\x1b\\");
    }

    #[test]
    fn kitty_ctrl_a_key_event() {
        let mut t = term();
        t.write_str("\x1b[>1u");
        t.update();
        t.queue_input_event(InputEvent::Key(KeyEvent::with_mods(
            KeyCode::Char('a'),
            KeyModifiers::CTRL,
        )));
        t.update();
        assert_eq!(t.drain_responses(), b"\x1b[97;5u");
    }

    #[test]
    fn direct_input_echoes_locally() {
        let mut t = term();
        t.session_mut(0).unwrap().direct_input = true;
        t.queue_input_event(InputEvent::Key(KeyEvent::plain(KeyCode::Char('A'))));
        t.update();
        assert_eq!(cell_char(&t, 0, 0), 'A');
        assert_eq!(t.session(0).unwrap().cursor.x, 1);
        assert!(t.drain_responses().is_empty());

        t.queue_input_event(InputEvent::Key(KeyEvent::plain(KeyCode::Backspace)));
        t.update();
        assert_eq!(t.session(0).unwrap().cursor.x, 0);
        assert_eq!(cell_char(&t, 0, 0), ' ');
    }

    #[test]
    fn mouse_event_encodes_when_tracking() {
        let mut t = term();
        t.write_str("\x1b[?1000h\x1b[?1006h");
        t.update();
        t.drain_responses();
        t.queue_input_event(InputEvent::Mouse(MouseEvent {
            button: crate::core::io::MouseButton::Left,
            action: crate::core::io::MouseAction::Press,
            x: 4,
            y: 2,
            mods: KeyModifiers::empty(),
        }));
        t.update();
        assert_eq!(t.drain_responses(), b"\x1b[<0;5;3M");
    }

    #[test]
    fn window_resize_applies_to_sessions() {
        let mut t = term();
        t.queue_input_event(InputEvent::Window(WindowEvent::Resize { cols: 100, rows: 30 }));
        t.update();
        let s = t.session(0).unwrap();
        assert_eq!((s.cols, s.rows), (100, 30));
    }

    #[test]
    fn output_sink_receives_reports() {
        use std::sync::{Arc, Mutex};
        let seen: Arc<Mutex<Vec<u8>>> = Arc::default();
        let mut t = term();
        let sink_seen = seen.clone();
        t.set_output_sink(Box::new(move |bytes| {
            sink_seen.lock().unwrap().extend_from_slice(bytes);
        }));
        t.write_str("\x1b[6n");
        t.update();
        assert_eq!(*seen.lock().unwrap(), b"\x1b[1;1R");
    }

    #[test]
    fn title_change_surfaces_as_event() {
        let mut t = term();
        t.write_str("\x1b]2;hello title\x07");
        t.update();
        let events = t.drain_events();
        assert!(events.contains(&TermEvent::Title("hello title".to_string())));
    }

    #[test]
    fn flush_budget_carries_ops_across_updates() {
        let config = TermConfig { max_ops_per_flush: 2, ..TermConfig::default() };
        let mut t = Terminal::new(config).unwrap();
        // Five prints at scattered positions: more ops than one flush.
        t.write_str("\x1b[1;1HA\x1b[3;3HB\x1b[5;5HC\x1b[7;7HD\x1b[9;9HE");
        t.update();
        let mut done = false;
        for _ in 0..10 {
            if t.session(0).unwrap().op_queue.is_empty() {
                done = true;
                break;
            }
            t.update();
        }
        assert!(done);
        assert_eq!(cell_char(&t, 8, 8), 'E');
    }
}
