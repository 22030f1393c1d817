// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Editing sequences that queue grid mutations: erases, line and character
//! insertion/deletion, explicit scrolls, and the DEC rectangle family
//! (DECCRA / DECFRA / DECERA).

use super::Session;
use crate::core::grid::{CellFlags, FillMask};
use crate::core::ops::{EraseMode, Op};
use crate::core::units::GridRect;

impl Session {
    /// ED / DECSED.
    pub fn erase_in_display(&mut self, mode: EraseMode, selective: bool) {
        let _ = self.op_queue.push(Op::EraseInDisplay {
            mode,
            x: self.cursor.x,
            y: self.cursor.y,
            bg: self.bg,
            selective,
        });
    }

    /// EL / DECSEL.
    pub fn erase_in_line(&mut self, mode: EraseMode, selective: bool) {
        let _ = self.op_queue.push(Op::EraseInLine {
            mode,
            x: self.cursor.x,
            y: self.cursor.y,
            bg: self.bg,
            selective,
        });
    }

    /// IL. Only acts with the cursor inside the vertical margins; the
    /// cursor moves to the line start per DEC.
    pub fn insert_lines(&mut self, n: usize) {
        let region = self.scroll_region();
        if self.cursor.y < region.top || self.cursor.y > region.bottom {
            return;
        }
        let _ = self.op_queue.push(Op::InsertLines {
            y: self.cursor.y,
            n: n.max(1),
            region,
            bg: self.bg,
        });
        self.carriage_return();
    }

    /// DL.
    pub fn delete_lines(&mut self, n: usize) {
        let region = self.scroll_region();
        if self.cursor.y < region.top || self.cursor.y > region.bottom {
            return;
        }
        let _ = self.op_queue.push(Op::DeleteLines {
            y: self.cursor.y,
            n: n.max(1),
            region,
            bg: self.bg,
        });
        self.carriage_return();
    }

    /// ICH.
    pub fn insert_chars(&mut self, n: usize) {
        let (_, right) = self.line_bounds();
        let _ = self.op_queue.push(Op::InsertChars {
            x: self.cursor.x,
            y: self.cursor.y,
            n: n.max(1),
            right,
            bg: self.bg,
        });
    }

    /// DCH.
    pub fn delete_chars(&mut self, n: usize) {
        let (_, right) = self.line_bounds();
        let _ = self.op_queue.push(Op::DeleteChars {
            x: self.cursor.x,
            y: self.cursor.y,
            n: n.max(1),
            right,
            bg: self.bg,
        });
    }

    /// ECH.
    pub fn erase_chars(&mut self, n: usize) {
        let _ = self.op_queue.push(Op::EraseChars {
            x: self.cursor.x,
            y: self.cursor.y,
            n: n.max(1),
            bg: self.bg,
        });
    }

    /// SU.
    pub fn scroll_up(&mut self, n: usize) {
        let region = self.scroll_region();
        let _ = self.op_queue.push(Op::ScrollUp { region, n: n.max(1), bg: self.bg });
    }

    /// SD.
    pub fn scroll_down(&mut self, n: usize) {
        let region = self.scroll_region();
        let _ = self.op_queue.push(Op::ScrollDown { region, n: n.max(1), bg: self.bg });
    }

    /// DECCRA. Parameters are the source rect corners (1-based, inclusive)
    /// and the destination corner. Pages are accepted and ignored (only
    /// page 1 exists). Coordinates are captured as given; the flusher clips
    /// against the grid dimensions in effect when the copy applies.
    pub fn copy_rect_area(
        &mut self,
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
        dst_top: usize,
        dst_left: usize,
    ) {
        if bottom < top || right < left {
            return;
        }
        let src = GridRect::new(left, top, right - left + 1, bottom - top + 1);
        let _ = self.op_queue.push(Op::CopyRect { src, dst_x: dst_left, dst_y: dst_top });
    }

    /// DECFRA: fill a rectangle with a character in the current attributes.
    pub fn fill_rect_area(&mut self, ch: char, top: usize, left: usize, bottom: usize, right: usize) {
        if bottom < top || right < left {
            return;
        }
        let rect = GridRect::new(left, top, right - left + 1, bottom - top + 1);
        let cell = self.current_cell(ch);
        let _ = self.op_queue.push(Op::FillRectMasked { rect, mask: FillMask::all(), cell });
    }

    /// DECERA: erase a rectangle to blanks with the current background.
    pub fn erase_rect_area(&mut self, top: usize, left: usize, bottom: usize, right: usize) {
        if bottom < top || right < left {
            return;
        }
        let rect = GridRect::new(left, top, right - left + 1, bottom - top + 1);
        let cell = crate::core::grid::Cell::blank_with_bg(self.bg);
        let _ = self.op_queue.push(Op::FillRectMasked {
            rect,
            mask: FillMask::CH | FillMask::BG | FillMask::FLAGS,
            cell,
        });
    }

    /// DECALN: fill the screen with `E` and home the cursor.
    pub fn screen_alignment_pattern(&mut self) {
        let rect = GridRect::new(0, 0, self.cols, self.rows);
        let mut cell = self.current_cell('E');
        cell.flags = CellFlags::empty();
        let _ = self.op_queue.push(Op::FillRectMasked { rect, mask: FillMask::all(), cell });
        self.margins.top = 0;
        self.margins.bottom = self.rows - 1;
        self.cursor.x = 0;
        self.cursor.y = 0;
    }
}
