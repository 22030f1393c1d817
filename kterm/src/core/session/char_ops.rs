// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Printing and C0 control handling: glyph writes with deferred autowrap
//! and wide-cell pairing, CR/LF/BS/HT, index and reverse index.

use unicode_width::UnicodeWidthChar;

use super::Session;
use crate::core::grid::CellFlags;
use crate::core::ops::Op;

impl Session {
    /// Print one decoded (and charset-translated) glyph at the cursor.
    ///
    /// DECAWM wrap is deferred: a glyph landing on the right margin sets
    /// `wrap_pending`; the next glyph performs the CR+LF (scrolling if at
    /// the bottom margin) before printing.
    pub fn write_char(&mut self, ch: char) {
        let ch = self.charsets.translate(ch);
        let width = UnicodeWidthChar::width(ch).unwrap_or(1).min(2);
        if width == 0 {
            // Combining marks are a renderer concern; the core keeps the
            // cursor where it is.
            return;
        }

        let (left, right) = self.line_bounds();

        if self.cursor.wrap_pending {
            if self.modes.autowrap {
                self.wrap_to_next_line(left);
            } else {
                self.cursor.wrap_pending = false;
            }
        }

        // A wide glyph with only one column left wraps early (or is
        // discarded when autowrap is off).
        if width == 2 && self.cursor.x + 1 > right {
            if !self.modes.autowrap {
                return;
            }
            self.wrap_to_next_line(left);
        }

        if self.modes.insert {
            let _ = self.op_queue.push(Op::InsertChars {
                x: self.cursor.x,
                y: self.cursor.y,
                n: width,
                right,
                bg: self.bg,
            });
        }

        let mut cell = self.current_cell(ch);
        if width == 2 {
            cell.flags.insert(CellFlags::WIDE);
        }
        let _ = self.op_queue.push(Op::PrintChar { x: self.cursor.x, y: self.cursor.y, cell });
        if width == 2 {
            let mut cont = self.current_cell(' ');
            cont.flags.insert(CellFlags::WIDE_CONT);
            let _ = self.op_queue.push(Op::PrintChar {
                x: self.cursor.x + 1,
                y: self.cursor.y,
                cell: cont,
            });
        }
        self.last_graphic_char = Some(ch);

        if self.cursor.x + width > right {
            self.cursor.x = right;
            self.cursor.wrap_pending = self.modes.autowrap;
        } else {
            self.cursor.x += width;
        }
    }

    fn wrap_to_next_line(&mut self, left: usize) {
        self.cursor.wrap_pending = false;
        self.cursor.x = left;
        self.linefeed_no_cr();
    }

    /// REP: repeat the last printed glyph.
    pub fn repeat_last_char(&mut self, n: usize) {
        if let Some(ch) = self.last_graphic_char {
            for _ in 0..n.max(1).min(self.cols * self.rows) {
                self.write_char(ch);
            }
        }
    }

    pub fn carriage_return(&mut self) {
        let (left, _) = self.line_bounds();
        self.cursor.x = if self.cursor.x < left { 0 } else { left };
        self.cursor.wrap_pending = false;
    }

    /// LF/VT/FF. Honors LNM (linefeed implies CR).
    pub fn linefeed(&mut self) {
        if self.modes.linefeed_newline {
            self.carriage_return();
        }
        self.linefeed_no_cr();
    }

    /// IND: move down one row, scrolling the region at the bottom margin.
    pub fn linefeed_no_cr(&mut self) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        if self.cursor.y == region.bottom {
            let _ = self.op_queue.push(Op::ScrollUp { region, n: 1, bg: self.bg });
        } else if self.cursor.y + 1 < self.rows {
            self.cursor.y += 1;
        }
    }

    /// RI: move up one row, scrolling the region down at the top margin.
    pub fn reverse_index(&mut self) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        if self.cursor.y == region.top {
            let _ = self.op_queue.push(Op::ScrollDown { region, n: 1, bg: self.bg });
        } else if self.cursor.y > 0 {
            self.cursor.y -= 1;
        }
    }

    /// NEL.
    pub fn next_line(&mut self) {
        self.carriage_return();
        self.linefeed_no_cr();
    }

    /// BS stops at the left margin; a cursor already left of the margin
    /// may still step back to column 0.
    pub fn backspace(&mut self) {
        self.cursor.wrap_pending = false;
        let (left, _) = self.line_bounds();
        if self.cursor.x > left || (self.cursor.x < left && self.cursor.x > 0) {
            self.cursor.x -= 1;
        }
    }

    /// HT: advance to the next tab stop (or the right margin).
    pub fn tab(&mut self) {
        let (_, right) = self.line_bounds();
        self.cursor.wrap_pending = false;
        self.cursor.x = self.next_tab_stop(self.cursor.x).unwrap_or(right).min(right);
    }

    /// CBT: back `n` tab stops, stopping at the left margin.
    pub fn back_tab(&mut self, n: usize) {
        for _ in 0..n.max(1) {
            let (left, _) = self.line_bounds();
            match self.prev_tab_stop(self.cursor.x) {
                Some(stop) if stop > left => self.cursor.x = stop,
                _ => {
                    self.cursor.x = left;
                    break;
                }
            }
        }
    }

    /// CHT: forward `n` tab stops.
    pub fn forward_tab(&mut self, n: usize) {
        for _ in 0..n.max(1) {
            self.tab();
        }
    }

    /// Raw-dump mirroring writes bytes literally (controls included) into
    /// this session's grid, advancing a private cursor with plain wrap.
    pub fn write_raw_mirror_byte(&mut self, byte: u8) {
        let (mut x, mut y) = self.raw_dump_cursor;
        if x >= self.cols {
            x = 0;
            y += 1;
        }
        if y >= self.rows {
            let region = self.scroll_region();
            let _ = self.op_queue.push(Op::ScrollUp { region, n: 1, bg: self.bg });
            y = self.rows - 1;
        }
        let cell = self.current_cell(char::from(byte));
        let _ = self.op_queue.push(Op::PrintChar { x, y, cell });
        self.raw_dump_cursor = (x + 1, y);
    }
}
