// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! SM/RM and DECSET/DECRST mode switching.

use super::{MouseEncoding, MouseTracking, Session};

impl Session {
    /// ANSI modes (`CSI Pm h` / `CSI Pm l`).
    pub fn set_ansi_mode(&mut self, mode: i32, enable: bool) {
        match mode {
            4 => self.modes.insert = enable,
            20 => self.modes.linefeed_newline = enable,
            _ => {
                tracing::debug!(mode, enable, "ignoring unknown ANSI mode");
            }
        }
    }

    /// DEC private modes (`CSI ? Pm h` / `CSI ? Pm l`).
    pub fn set_dec_mode(&mut self, mode: i32, enable: bool) {
        match mode {
            1 => self.modes.cursor_keys_app = enable,
            2 => self.modes.ansi = enable,
            3 => self.set_deccolm(enable),
            5 => {
                if self.modes.reverse_video != enable {
                    self.modes.reverse_video = enable;
                    self.grid_mut().mark_all_dirty();
                }
            }
            6 => {
                self.modes.origin = enable;
                // DECOM homes the cursor within the new addressing frame.
                self.cursor.wrap_pending = false;
                let region = self.scroll_region();
                if enable {
                    self.cursor.y = region.top;
                    self.cursor.x = region.left;
                } else {
                    self.cursor.x = 0;
                    self.cursor.y = 0;
                }
            }
            7 => self.modes.autowrap = enable,
            9 => {
                self.mouse_tracking = if enable { MouseTracking::X10 } else { MouseTracking::Off };
            }
            12 => self.modes.cursor_blink = enable,
            25 => self.cursor.visible = enable,
            38 => self.tektronix.active = enable,
            40 => self.modes.allow_deccolm = enable,
            47 => {
                if enable {
                    self.enter_alt_screen(false, false);
                } else {
                    self.leave_alt_screen(false);
                }
            }
            66 => self.modes.keypad_app = enable,
            69 => {
                self.modes.lr_margins = enable;
                if !enable {
                    self.margins.left = 0;
                    self.margins.right = self.cols - 1;
                }
            }
            1000 => {
                self.mouse_tracking =
                    if enable { MouseTracking::Normal } else { MouseTracking::Off };
            }
            1002 => {
                self.mouse_tracking =
                    if enable { MouseTracking::ButtonEvent } else { MouseTracking::Off };
            }
            1003 => {
                self.mouse_tracking =
                    if enable { MouseTracking::AnyEvent } else { MouseTracking::Off };
            }
            1005 => {
                self.mouse_encoding =
                    if enable { MouseEncoding::Utf8 } else { MouseEncoding::Default };
            }
            1006 => {
                self.mouse_encoding =
                    if enable { MouseEncoding::Sgr } else { MouseEncoding::Default };
            }
            1047 => {
                if enable {
                    self.enter_alt_screen(false, true);
                } else {
                    self.leave_alt_screen(false);
                }
            }
            1048 => {
                if enable {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if enable {
                    self.enter_alt_screen(true, true);
                } else {
                    self.leave_alt_screen(true);
                }
            }
            2004 => self.modes.bracketed_paste = enable,
            _ => {
                tracing::debug!(mode, enable, "ignoring unknown DEC private mode");
            }
        }
    }

    /// DECCOLM: switch between 80 and 132 columns. Gated on mode 40. Per
    /// DEC semantics the screen clears, the cursor homes, and margins
    /// reset. The geometry change itself is queued so it applies in op
    /// order (the parser keeps using the old width until the flush).
    fn set_deccolm(&mut self, enable: bool) {
        if !self.modes.allow_deccolm {
            return;
        }
        let cols = if enable { 132 } else { 80 };
        self.queue_resize(cols, self.rows);
        self.erase_in_display(crate::core::ops::EraseMode::All, false);
        self.cursor.x = 0;
        self.cursor.y = 0;
        self.cursor.wrap_pending = false;
    }

    /// DECRQM reply value for a private mode: 1 = set, 2 = reset,
    /// 0 = unrecognized.
    #[must_use]
    pub fn dec_mode_state(&self, mode: i32) -> u8 {
        let known = |flag: bool| if flag { 1 } else { 2 };
        match mode {
            1 => known(self.modes.cursor_keys_app),
            2 => known(self.modes.ansi),
            5 => known(self.modes.reverse_video),
            6 => known(self.modes.origin),
            7 => known(self.modes.autowrap),
            9 => known(self.mouse_tracking == MouseTracking::X10),
            12 => known(self.modes.cursor_blink),
            25 => known(self.cursor.visible),
            38 => known(self.tektronix.active),
            40 => known(self.modes.allow_deccolm),
            47 | 1047 | 1049 => known(self.on_alt_screen()),
            69 => known(self.modes.lr_margins),
            1000 => known(self.mouse_tracking == MouseTracking::Normal),
            1002 => known(self.mouse_tracking == MouseTracking::ButtonEvent),
            1003 => known(self.mouse_tracking == MouseTracking::AnyEvent),
            1005 => known(self.mouse_encoding == MouseEncoding::Utf8),
            1006 => known(self.mouse_encoding == MouseEncoding::Sgr),
            2004 => known(self.modes.bracketed_paste),
            _ => 0,
        }
    }

    /// DECSTBM. Invalid regions (top >= bottom after clamping) are ignored
    /// per DEC. The cursor homes.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = bottom.min(self.rows.saturating_sub(1));
        if top >= bottom {
            if top == 0 && bottom == 0 {
                // `CSI r` with defaults resets to the full screen.
                self.margins.top = 0;
                self.margins.bottom = self.rows - 1;
            } else {
                return;
            }
        } else {
            self.margins.top = top;
            self.margins.bottom = bottom;
        }
        let region = self.scroll_region();
        self.cursor.wrap_pending = false;
        if self.modes.origin {
            self.cursor.y = region.top;
            self.cursor.x = region.left;
        } else {
            self.cursor.x = 0;
            self.cursor.y = 0;
        }
    }

    /// DECSLRM (only while DECLRMM is set).
    pub fn set_lr_margins(&mut self, left: usize, right: usize) {
        if !self.modes.lr_margins {
            return;
        }
        let right = right.min(self.cols.saturating_sub(1));
        if left >= right {
            return;
        }
        self.margins.left = left;
        self.margins.right = right;
    }
}
