// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The session state record and its lifecycle operations (reset, resize,
//! alternate screen, saved cursors, DECRQSS values).

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::core::ansi::ParserState;
use crate::core::graphics::{KittyState, RegisState, SixelState, TekState};
use crate::core::grid::{Cell, CellFlags, Color, Grid, UnderlineStyle};
use crate::core::ops::{Op, OpQueue, Region};
use crate::core::session::charset::CharsetState;
use crate::core::terminal::TermConfig;

/// Sessions per terminal.
pub const MAX_SESSIONS: usize = 4;

/// Bound on the DECSC save stack.
pub const SAVED_CURSOR_DEPTH: usize = 10;

/// DECSCUSR cursor shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum CursorStyle {
    #[default]
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorStyle {
    #[must_use]
    pub fn from_param(value: i32) -> Self {
        match value {
            2 => Self::SteadyBlock,
            3 => Self::BlinkingUnderline,
            4 => Self::SteadyUnderline,
            5 => Self::BlinkingBar,
            6 => Self::SteadyBar,
            _ => Self::BlinkingBlock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
    pub visible: bool,
    pub style: CursorStyle,
    /// DECAWM defers the wrap: set when a glyph landed on the right margin,
    /// consumed by the next glyph.
    pub wrap_pending: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            visible: true,
            style: CursorStyle::default(),
            wrap_pending: false,
        }
    }
}

/// Scroll margins, all 0-based inclusive. Left/right only constrain
/// operations while DECLRMM (mode 69) is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// Mode flags toggled by SM/RM and DECSET/DECRST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFlags {
    /// DECCKM: cursor keys send SS3 sequences.
    pub cursor_keys_app: bool,
    /// DECKPAM / DECKPNM.
    pub keypad_app: bool,
    /// DECOM: cursor addressing relative to the scroll region.
    pub origin: bool,
    /// DECAWM.
    pub autowrap: bool,
    /// DECSCNM.
    pub reverse_video: bool,
    /// IRM.
    pub insert: bool,
    /// LNM: linefeed implies carriage return.
    pub linefeed_newline: bool,
    /// DECANM: false selects VT52 emulation.
    pub ansi: bool,
    /// Mode 40: permit DECCOLM 80/132 switching.
    pub allow_deccolm: bool,
    /// DECLRMM (mode 69).
    pub lr_margins: bool,
    /// Mode 2004.
    pub bracketed_paste: bool,
    /// Mode 12.
    pub cursor_blink: bool,
    /// xterm modifyOtherKeys level (0..=2).
    pub modify_other_keys: u8,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            cursor_keys_app: false,
            keypad_app: false,
            origin: false,
            autowrap: true,
            reverse_video: false,
            insert: false,
            linefeed_newline: false,
            ansi: true,
            allow_deccolm: false,
            lr_margins: false,
            bracketed_paste: false,
            cursor_blink: true,
            modify_other_keys: 0,
        }
    }
}

/// Mouse tracking modes (DECSET 9 / 1000 / 1002 / 1003).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum MouseTracking {
    #[default]
    Off,
    X10,
    Normal,
    ButtonEvent,
    AnyEvent,
}

/// Mouse coordinate encodings (DECSET 1005 / 1006).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum MouseEncoding {
    #[default]
    Default,
    Utf8,
    Sgr,
}

bitflags::bitflags! {
    /// Kitty keyboard protocol progressive-enhancement flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KittyFlags: u8 {
        const DISAMBIGUATE    = 1 << 0;
        const REPORT_EVENTS   = 1 << 1;
        const REPORT_ALTERNATES = 1 << 2;
        const REPORT_ALL_KEYS = 1 << 3;
        const REPORT_TEXT     = 1 << 4;
    }
}

/// Kitty keyboard flag stack (`CSI > u` push, `CSI < u` pop).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KittyKeyboard {
    pub flags: KittyFlags,
    pub stack: SmallVec<[KittyFlags; 8]>,
}

impl KittyKeyboard {
    pub fn push(&mut self, flags: KittyFlags) {
        if self.stack.len() < 16 {
            self.stack.push(self.flags);
        }
        self.flags = flags;
    }

    pub fn pop(&mut self, n: usize) {
        for _ in 0..n.max(1) {
            match self.stack.pop() {
                Some(prev) => self.flags = prev,
                None => {
                    self.flags = KittyFlags::empty();
                    break;
                }
            }
        }
    }
}

/// What DECSC captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedCursor {
    pub x: usize,
    pub y: usize,
    pub attrs: CellFlags,
    pub ul_style: UnderlineStyle,
    pub fg: Color,
    pub bg: Color,
    pub ul: Color,
    pub charsets: CharsetState,
    pub autowrap: bool,
    pub origin: bool,
}

/// VT conformance levels; some reports are gated on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, strum_macros::Display)]
pub enum VtLevel {
    Vt52,
    Vt100,
    Vt220,
    Vt320,
    Vt420,
    Vt525,
    #[default]
    Xterm,
}

/// Raw-dump mirroring state (Gateway `RAWDUMP;START;SESSION=n`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawDump {
    pub active: bool,
    pub target_session: usize,
}

/// One logically independent terminal within the multiplexer.
#[derive(Debug)]
pub struct Session {
    pub index: usize,
    pub open: bool,

    primary: Grid,
    alt: Grid,
    use_alt: bool,

    pub cols: usize,
    pub rows: usize,
    scrollback_rows: usize,

    pub cursor: Cursor,
    saved_stack: Vec<SavedCursor>,
    pub margins: Margins,
    pub tab_stops: Vec<bool>,
    pub charsets: CharsetState,
    pub modes: ModeFlags,
    pub mouse_tracking: MouseTracking,
    pub mouse_encoding: MouseEncoding,
    pub kitty_keyboard: KittyKeyboard,

    /// Current SGR state.
    pub attrs: CellFlags,
    pub ul_style: UnderlineStyle,
    pub fg: Color,
    pub bg: Color,
    pub ul: Color,

    /// DECSCA: newly written cells carry PROTECTED.
    pub protect: bool,
    /// Gateway `SET;CURSOR;SKIP_PROTECT`: motion steps over protected runs.
    pub skip_protect: bool,

    pub level: VtLevel,
    pub strict_mode: bool,

    pub parser: ParserState,
    pub op_queue: OpQueue,
    /// Host bytes waiting to be parsed.
    pub inbox: VecDeque<u8>,

    pub direct_input: bool,
    /// Media copy auto-print (`CSI ? 5 i`): incoming bytes are duplicated
    /// to the host printer channel while set.
    pub auto_print: bool,
    pub raw_dump: RawDump,
    /// Cursor used when raw bytes are mirrored into this grid.
    pub raw_dump_cursor: (usize, usize),

    pub sixel: SixelState,
    pub regis: RegisState,
    pub kitty: KittyState,
    pub tektronix: TekState,

    /// Last printed glyph, for REP.
    pub last_graphic_char: Option<char>,

    /// DECUDK user-defined key strings, keyed by key selector.
    pub udk: rustc_hash::FxHashMap<u16, Vec<u8>>,
}

impl Session {
    #[must_use]
    pub fn new(index: usize, config: &TermConfig) -> Self {
        let cols = config.cols.max(1);
        let rows = config.rows.max(1);
        let scrollback = config.scrollback_rows;
        Self {
            index,
            open: index == 0,
            primary: Grid::new(cols, rows, rows + scrollback),
            alt: Grid::new(cols, rows, rows),
            use_alt: false,
            cols,
            rows,
            scrollback_rows: scrollback,
            cursor: Cursor::default(),
            saved_stack: Vec::new(),
            margins: Margins { top: 0, bottom: rows - 1, left: 0, right: cols - 1 },
            tab_stops: default_tab_stops(cols),
            charsets: CharsetState::default(),
            modes: ModeFlags::default(),
            mouse_tracking: MouseTracking::default(),
            mouse_encoding: MouseEncoding::default(),
            kitty_keyboard: KittyKeyboard::default(),
            attrs: CellFlags::empty(),
            ul_style: UnderlineStyle::None,
            fg: Color::Default,
            bg: Color::Default,
            ul: Color::Default,
            protect: false,
            skip_protect: false,
            level: VtLevel::default(),
            strict_mode: config.strict_mode,
            parser: ParserState::default(),
            op_queue: OpQueue::new(),
            inbox: VecDeque::new(),
            direct_input: false,
            auto_print: false,
            raw_dump: RawDump::default(),
            raw_dump_cursor: (0, 0),
            sixel: SixelState::default(),
            regis: RegisState::default(),
            kitty: KittyState::default(),
            tektronix: TekState::default(),
            last_graphic_char: None,
            udk: rustc_hash::FxHashMap::default(),
        }
    }

    // ── Grid access ─────────────────────────────────────────────────────

    #[must_use]
    pub fn grid(&self) -> &Grid {
        if self.use_alt { &self.alt } else { &self.primary }
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        if self.use_alt { &mut self.alt } else { &mut self.primary }
    }

    #[must_use]
    pub fn primary_grid(&self) -> &Grid { &self.primary }

    pub fn primary_grid_mut(&mut self) -> &mut Grid { &mut self.primary }

    #[must_use]
    pub fn alt_grid(&self) -> &Grid { &self.alt }

    pub(crate) fn alt_grid_mut(&mut self) -> &mut Grid { &mut self.alt }

    #[must_use]
    pub fn on_alt_screen(&self) -> bool { self.use_alt }

    // ── Region helpers ──────────────────────────────────────────────────

    /// The active scroll region, honoring DECLRMM for the horizontal part.
    #[must_use]
    pub fn scroll_region(&self) -> Region {
        Region {
            top: self.margins.top,
            bottom: self.margins.bottom,
            left: if self.modes.lr_margins { self.margins.left } else { 0 },
            right: if self.modes.lr_margins { self.margins.right } else { self.cols - 1 },
        }
    }

    /// Left/right print bounds for the cursor row.
    #[must_use]
    pub fn line_bounds(&self) -> (usize, usize) {
        let region = self.scroll_region();
        if self.cursor.y >= region.top && self.cursor.y <= region.bottom {
            (region.left, region.right)
        } else {
            (0, self.cols - 1)
        }
    }

    /// The template cell for the current SGR state (used by prints).
    #[must_use]
    pub fn current_cell(&self, ch: char) -> Cell {
        let mut flags = self.attrs;
        if self.protect {
            flags.insert(CellFlags::PROTECTED);
        }
        let mut cell = Cell { ch, fg: self.fg, bg: self.bg, ul: self.ul, flags, generation: 0 };
        cell.set_underline_style(self.ul_style);
        cell
    }

    pub fn clamp_cursor(&mut self) {
        self.cursor.x = self.cursor.x.min(self.cols.saturating_sub(1));
        self.cursor.y = self.cursor.y.min(self.rows.saturating_sub(1));
    }

    // ── Saved cursor stack ──────────────────────────────────────────────

    /// DECSC. The stack is bounded; past the bound the oldest entry is
    /// discarded, matching hardware that only keeps a limited history.
    pub fn save_cursor(&mut self) {
        if self.saved_stack.len() == SAVED_CURSOR_DEPTH {
            self.saved_stack.remove(0);
        }
        self.saved_stack.push(SavedCursor {
            x: self.cursor.x,
            y: self.cursor.y,
            attrs: self.attrs,
            ul_style: self.ul_style,
            fg: self.fg,
            bg: self.bg,
            ul: self.ul,
            charsets: self.charsets,
            autowrap: self.modes.autowrap,
            origin: self.modes.origin,
        });
    }

    /// DECRC. An empty stack restores power-on defaults.
    pub fn restore_cursor(&mut self) {
        let saved = self.saved_stack.pop().unwrap_or(SavedCursor {
            x: 0,
            y: 0,
            attrs: CellFlags::empty(),
            ul_style: UnderlineStyle::None,
            fg: Color::Default,
            bg: Color::Default,
            ul: Color::Default,
            charsets: CharsetState::default(),
            autowrap: true,
            origin: false,
        });
        self.cursor.x = saved.x;
        self.cursor.y = saved.y;
        self.cursor.wrap_pending = false;
        self.attrs = saved.attrs;
        self.ul_style = saved.ul_style;
        self.fg = saved.fg;
        self.bg = saved.bg;
        self.ul = saved.ul;
        self.charsets = saved.charsets;
        self.modes.autowrap = saved.autowrap;
        self.modes.origin = saved.origin;
        self.clamp_cursor();
    }

    // ── Alternate screen ────────────────────────────────────────────────

    /// Modes 47 / 1047 / 1049. Entering snapshots cursor + attrs (not the
    /// grid), clears the alternate buffer, and points ops at it. Scrollback
    /// is never appended while on the alternate screen.
    pub fn enter_alt_screen(&mut self, save_cursor: bool, clear: bool) {
        if self.use_alt {
            return;
        }
        if save_cursor {
            self.save_cursor();
        }
        if clear {
            self.alt.fill_rect(
                crate::core::units::GridRect::new(0, 0, self.cols, self.rows),
                Cell::blank_with_bg(self.bg),
            );
        }
        self.use_alt = true;
        self.grid_mut().mark_all_dirty();
    }

    pub fn leave_alt_screen(&mut self, restore_cursor: bool) {
        if !self.use_alt {
            return;
        }
        self.use_alt = false;
        if restore_cursor {
            self.restore_cursor();
        }
        self.grid_mut().mark_all_dirty();
    }

    // ── Resize (flusher-applied) ────────────────────────────────────────

    /// Queue a geometry change; takes effect when the flusher reaches it.
    pub fn queue_resize(&mut self, cols: usize, rows: usize) {
        let _ = self.op_queue.push(Op::Resize { cols, rows });
    }

    /// Applied by the flusher. Reallocates both grids, clamps the cursor,
    /// and re-establishes full-screen margins and tab stops.
    pub fn apply_resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        self.primary.resize(cols, rows, rows + self.scrollback_rows, self.cursor.y);
        self.alt.resize(cols, rows, rows, self.cursor.y);
        self.cols = cols;
        self.rows = rows;
        self.margins = Margins { top: 0, bottom: rows - 1, left: 0, right: cols - 1 };
        self.tab_stops = default_tab_stops(cols);
        self.clamp_cursor();
        self.cursor.wrap_pending = false;
    }

    /// Applied by the flusher for a queued `Reset`.
    pub fn apply_grid_reset(&mut self) {
        let rect = crate::core::units::GridRect::new(0, 0, self.cols, self.rows);
        self.primary.fill_rect(rect, Cell::default());
        self.primary.clear_scrollback();
        self.alt.fill_rect(rect, Cell::default());
    }

    // ── Resets ──────────────────────────────────────────────────────────

    /// DECSTR soft reset: modes and attributes back to defaults, grid
    /// contents untouched.
    pub fn soft_reset(&mut self) {
        self.cursor.visible = true;
        self.cursor.wrap_pending = false;
        self.modes.origin = false;
        self.modes.insert = false;
        self.modes.cursor_keys_app = false;
        self.modes.keypad_app = false;
        self.margins = Margins { top: 0, bottom: self.rows - 1, left: 0, right: self.cols - 1 };
        self.attrs = CellFlags::empty();
        self.ul_style = UnderlineStyle::None;
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.ul = Color::Default;
        self.protect = false;
        self.charsets = CharsetState::default();
        self.saved_stack.clear();
    }

    /// RIS: everything a session owns goes back to power-on state; the
    /// grid wipe itself is queued so it lands in op order.
    pub fn full_reset(&mut self) {
        self.soft_reset();
        self.cursor = Cursor::default();
        self.modes = ModeFlags::default();
        self.mouse_tracking = MouseTracking::Off;
        self.mouse_encoding = MouseEncoding::Default;
        self.kitty_keyboard = KittyKeyboard::default();
        self.tab_stops = default_tab_stops(self.cols);
        self.skip_protect = false;
        self.use_alt = false;
        self.direct_input = false;
        self.raw_dump = RawDump::default();
        self.sixel = SixelState::default();
        self.regis = RegisState::default();
        self.kitty = KittyState::default();
        self.tektronix = TekState::default();
        self.parser.reset();
        let _ = self.op_queue.push(Op::Reset);
    }

    // ── Tab stops ───────────────────────────────────────────────────────

    pub fn set_tab_stop(&mut self) {
        if let Some(slot) = self.tab_stops.get_mut(self.cursor.x) {
            *slot = true;
        }
    }

    /// TBC 0 clears at the cursor, TBC 3 clears all.
    pub fn clear_tab_stops(&mut self, mode: i32) {
        match mode {
            3 => self.tab_stops.fill(false),
            _ => {
                if let Some(slot) = self.tab_stops.get_mut(self.cursor.x) {
                    *slot = false;
                }
            }
        }
    }

    #[must_use]
    pub fn next_tab_stop(&self, from: usize) -> Option<usize> {
        self.tab_stops
            .iter()
            .enumerate()
            .skip(from + 1)
            .find_map(|(i, &set)| set.then_some(i))
    }

    #[must_use]
    pub fn prev_tab_stop(&self, from: usize) -> Option<usize> {
        self.tab_stops[..from]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, &set)| set.then_some(i))
    }

    // ── DECRQSS ─────────────────────────────────────────────────────────

    /// Current value for a `DCS $ q <selector> ST` request, without the
    /// `DCS 1 $ r` framing. `None` means "unrecognized selector".
    #[must_use]
    pub fn decrqss_value(&self, selector: &str) -> Option<String> {
        match selector {
            "m" => Some(format!("{}m", self.sgr_report())),
            "r" => Some(format!("{};{}r", self.margins.top + 1, self.margins.bottom + 1)),
            "s" => Some(format!("{};{}s", self.margins.left + 1, self.margins.right + 1)),
            "t" => Some(format!("{}t", self.rows)),
            "|" => Some(format!("{}|", self.cols)),
            "\"q" => Some(format!("{}\"q", u8::from(self.protect))),
            " q" => Some(format!("{} q", self.cursor.style as u8 + 1)),
            _ => None,
        }
    }

    /// SGR state rendered as the parameter string DECRQSS reports, always
    /// anchored with the leading `0`.
    #[must_use]
    pub fn sgr_report(&self) -> String {
        let mut parts: Vec<String> = vec!["0".into()];
        let flag_codes: [(CellFlags, u8); 8] = [
            (CellFlags::BOLD, 1),
            (CellFlags::FAINT, 2),
            (CellFlags::ITALIC, 3),
            (CellFlags::UNDERLINE, 4),
            (CellFlags::BLINK, 5),
            (CellFlags::REVERSE, 7),
            (CellFlags::CONCEAL, 8),
            (CellFlags::STRIKE, 9),
        ];
        for (flag, code) in flag_codes {
            if self.attrs.contains(flag) {
                parts.push(code.to_string());
            }
        }
        match self.fg {
            Color::Default => {}
            Color::Indexed(i) if i < 8 => parts.push((30 + u16::from(i)).to_string()),
            Color::Indexed(i) if i < 16 => parts.push((90 + u16::from(i) - 8).to_string()),
            Color::Indexed(i) => parts.push(format!("38;5;{i}")),
            Color::Rgb(r, g, b) => parts.push(format!("38;2;{r};{g};{b}")),
        }
        match self.bg {
            Color::Default => {}
            Color::Indexed(i) if i < 8 => parts.push((40 + u16::from(i)).to_string()),
            Color::Indexed(i) if i < 16 => parts.push((100 + u16::from(i) - 8).to_string()),
            Color::Indexed(i) => parts.push(format!("48;5;{i}")),
            Color::Rgb(r, g, b) => parts.push(format!("48;2;{r};{g};{b}")),
        }
        parts.join(";")
    }
}

fn default_tab_stops(cols: usize) -> Vec<bool> {
    (0..cols).map(|i| i != 0 && i % 8 == 0).collect()
}
