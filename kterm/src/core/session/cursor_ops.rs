// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Cursor motion, including DECOM origin addressing and the skip-protect
//! override that steps over runs of PROTECTED cells.

use super::Session;
use crate::core::units::{TermCol, TermRow};

/// Direction a motion primitive travels; used by the skip-protect scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Left,
    Right,
    Up,
    Down,
}

impl Session {
    /// CUP/HVP. Coordinates are 1-based; origin mode makes them relative
    /// to the scroll region. The cursor is always clamped in bounds.
    pub fn set_cursor(&mut self, row: TermRow, col: TermCol) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        if self.modes.origin {
            self.cursor.y = (region.top + row.to_zero_based()).min(region.bottom);
            self.cursor.x = (region.left + col.to_zero_based()).min(region.right);
        } else {
            self.cursor.y = row.to_zero_based().min(self.rows - 1);
            self.cursor.x = col.to_zero_based().min(self.cols - 1);
        }
    }

    /// CUU.
    pub fn cursor_up(&mut self, n: usize) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        let floor = if self.cursor.y >= region.top { region.top } else { 0 };
        self.cursor.y = self.cursor.y.saturating_sub(n.max(1)).max(floor);
        self.skip_protected(Motion::Up);
    }

    /// CUD.
    pub fn cursor_down(&mut self, n: usize) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        let ceil = if self.cursor.y <= region.bottom { region.bottom } else { self.rows - 1 };
        self.cursor.y = (self.cursor.y + n.max(1)).min(ceil);
        self.skip_protected(Motion::Down);
    }

    /// CUF.
    pub fn cursor_right(&mut self, n: usize) {
        self.cursor.wrap_pending = false;
        let (_, right) = self.line_bounds();
        self.cursor.x = (self.cursor.x + n.max(1)).min(right);
        self.skip_protected(Motion::Right);
    }

    /// CUB.
    pub fn cursor_left(&mut self, n: usize) {
        self.cursor.wrap_pending = false;
        let (left, _) = self.line_bounds();
        self.cursor.x = self.cursor.x.saturating_sub(n.max(1)).max(left);
        self.skip_protected(Motion::Left);
    }

    /// CHA / HPA.
    pub fn cursor_to_column(&mut self, col: TermCol) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        if self.modes.origin {
            self.cursor.x = (region.left + col.to_zero_based()).min(region.right);
        } else {
            self.cursor.x = col.to_zero_based().min(self.cols - 1);
        }
    }

    /// VPA.
    pub fn cursor_to_row(&mut self, row: TermRow) {
        self.cursor.wrap_pending = false;
        let region = self.scroll_region();
        if self.modes.origin {
            self.cursor.y = (region.top + row.to_zero_based()).min(region.bottom);
        } else {
            self.cursor.y = row.to_zero_based().min(self.rows - 1);
        }
    }

    /// CNL: down `n`, column to left margin.
    pub fn cursor_next_line(&mut self, n: usize) {
        self.cursor_down(n);
        self.carriage_return();
    }

    /// CPL: up `n`, column to left margin.
    pub fn cursor_prev_line(&mut self, n: usize) {
        self.cursor_up(n);
        self.carriage_return();
    }

    /// After a motion, when skip-protect is on and the landing cell bears
    /// PROTECTED, the cursor advances through the protected run. Horizontal
    /// motion continues in its own direction; vertical motion scans forward
    /// along the landing row. If every candidate is protected the cursor
    /// stays where the scan ends (the edge).
    fn skip_protected(&mut self, motion: Motion) {
        if !self.skip_protect {
            return;
        }
        let (left, right) = self.line_bounds();
        match motion {
            Motion::Right | Motion::Down | Motion::Up => {
                while self.cell_is_protected(self.cursor.x, self.cursor.y)
                    && self.cursor.x < right
                {
                    self.cursor.x += 1;
                }
            }
            Motion::Left => {
                while self.cell_is_protected(self.cursor.x, self.cursor.y)
                    && self.cursor.x > left
                {
                    self.cursor.x -= 1;
                }
            }
        }
    }

    fn cell_is_protected(&self, x: usize, y: usize) -> bool {
        self.grid().cell(x, y).is_some_and(crate::core::grid::Cell::is_protected)
    }
}
