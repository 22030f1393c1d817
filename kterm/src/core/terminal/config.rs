// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Terminal configuration and the host-facing callback types.

/// Severity passed to the error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorLevel {
    Info,
    Warn,
    Error,
}

/// Which layer reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorSource {
    Parser,
    Session,
    Gateway,
    Graphics,
    Net,
}

/// Host error reporting hook.
pub type ErrorCallback = Box<dyn FnMut(ErrorLevel, ErrorSource, &str) + Send>;

/// Fall-through hook for Gateway commands the core does not handle:
/// `(class, id, command, params)`.
pub type GatewayCallback = Box<dyn FnMut(&str, &str, &str, &str) + Send>;

/// Terminal-wide configuration. Plain data; callback slots live on the
/// [`super::Terminal`] so the config stays `Clone`.
#[derive(Debug, Clone)]
pub struct TermConfig {
    pub cols: usize,
    pub rows: usize,
    /// Scrollback rows kept above the primary screen.
    pub scrollback_rows: usize,
    /// Strict conformance: clamp signed CSI parameters, report unknown
    /// sequences through the error callback.
    pub strict_mode: bool,
    pub max_sixel_width: usize,
    pub max_sixel_height: usize,
    pub max_kitty_image_pixels: usize,
    /// Op budget per flush (per session, per frame).
    pub max_ops_per_flush: usize,
    /// Parser byte budget per session per frame.
    pub max_chars_per_frame: usize,
    /// ENQ answerback string.
    pub answerback: String,
    /// User name reported by the default telnet NEW-ENVIRON handler.
    pub username: String,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback_rows: 1000,
            strict_mode: false,
            max_sixel_width: 800,
            max_sixel_height: 480,
            max_kitty_image_pixels: 4_194_304,
            max_ops_per_flush: 4096,
            max_chars_per_frame: 65536,
            answerback: String::new(),
            username: String::new(),
        }
    }
}

/// Wraps the optional error callback with strict-mode gating so parse
/// layers can report without owning the policy.
pub struct ErrorReporter {
    pub strict: bool,
    pub callback: Option<ErrorCallback>,
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("strict", &self.strict)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl ErrorReporter {
    /// Recoverable parse problem: logged always, surfaced to the host
    /// callback only in strict mode.
    pub fn warn(&mut self, source: ErrorSource, msg: &str) {
        tracing::warn!(source = %source, msg, "recoverable parse error");
        if self.strict
            && let Some(cb) = &mut self.callback
        {
            cb(ErrorLevel::Warn, source, msg);
        }
    }

    /// Hard errors always reach the host callback.
    pub fn error(&mut self, source: ErrorSource, msg: &str) {
        tracing::error!(source = %source, msg, "error");
        if let Some(cb) = &mut self.callback {
            cb(ErrorLevel::Error, source, msg);
        }
    }
}
