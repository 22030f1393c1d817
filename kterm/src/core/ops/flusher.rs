// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Budgeted application of queued ops to a session's active grid.
//!
//! Ops apply in insertion order, never reordered, single-threaded per
//! session. A `Resize` applies atomically and then every op still queued is
//! clipped to the new dimensions; anything fully outside is dropped. That
//! re-validation is what keeps a queued `CopyRect` carrying pre-resize
//! coordinates from reading or writing out of bounds.

use super::{EraseMode, Op, OpQueue, Region};
use crate::core::grid::{Cell, Color, Grid};
use crate::core::session::Session;
use crate::core::units::GridRect;

/// Drain up to `budget` ops from the session queue into its active grid.
/// Returns the number of ops applied; remaining ops carry to the next
/// flush. Consecutive `PrintChar`s at contiguous positions coalesce into
/// one budget unit.
pub fn flush_ops(session: &mut Session, budget: usize) -> usize {
    let mut queue = std::mem::take(&mut session.op_queue);
    let mut applied = 0usize;

    while applied < budget {
        let Some(op) = queue.pop() else { break };
        match op {
            Op::PrintChar { x, y, cell } => {
                session.grid_mut().put(x, y, cell);
                // Coalesce the run: following prints that continue at
                // (same row, col + 1) apply under the same budget unit.
                let mut last_x = x;
                while let Some(Op::PrintChar { x: nx, y: ny, .. }) = queue.peek() {
                    if *ny != y || *nx != last_x + 1 {
                        break;
                    }
                    let Some(Op::PrintChar { x: nx, y: ny, cell }) = queue.pop() else {
                        break;
                    };
                    session.grid_mut().put(nx, ny, cell);
                    last_x = nx;
                }
            }
            Op::ScrollUp { region, n, bg } => {
                session.grid_mut().scroll_region_up(
                    region.top, region.bottom, region.left, region.right, n, bg,
                );
            }
            Op::ScrollDown { region, n, bg } => {
                session.grid_mut().scroll_region_down(
                    region.top, region.bottom, region.left, region.right, n, bg,
                );
            }
            Op::InsertLines { y, n, region, bg } => {
                if y >= region.top && y <= region.bottom {
                    session.grid_mut().scroll_region_down(
                        y, region.bottom, region.left, region.right, n, bg,
                    );
                }
            }
            Op::DeleteLines { y, n, region, bg } => {
                if y >= region.top && y <= region.bottom {
                    session.grid_mut().scroll_region_up(
                        y, region.bottom, region.left, region.right, n, bg,
                    );
                }
            }
            Op::InsertChars { x, y, n, right, bg } => {
                apply_insert_chars(session.grid_mut(), x, y, n, right, bg);
            }
            Op::DeleteChars { x, y, n, right, bg } => {
                apply_delete_chars(session.grid_mut(), x, y, n, right, bg);
            }
            Op::EraseChars { x, y, n, bg } => {
                session
                    .grid_mut()
                    .fill_rect(GridRect::new(x, y, n, 1), Cell::blank_with_bg(bg));
            }
            Op::FillRectMasked { rect, mask, cell } => {
                session.grid_mut().fill_rect_masked(rect, mask, cell);
            }
            Op::CopyRect { src, dst_x, dst_y } => {
                session.grid_mut().copy_rect(src, dst_x, dst_y);
            }
            Op::EraseInDisplay { mode, x, y, bg, selective } => {
                apply_erase_in_display(session, mode, x, y, bg, selective);
            }
            Op::EraseInLine { mode, x, y, bg, selective } => {
                apply_erase_in_line(session.grid_mut(), mode, x, y, bg, selective);
            }
            Op::Resize { cols, rows } => {
                session.apply_resize(cols, rows);
                revalidate_queue(&mut queue, cols, rows);
            }
            Op::Reset => {
                session.apply_grid_reset();
            }
        }
        applied += 1;
    }

    session.op_queue = queue;
    applied
}

fn apply_insert_chars(grid: &mut Grid, x: usize, y: usize, n: usize, right: usize, bg: Color) {
    let right = right.min(grid.cols().saturating_sub(1));
    if y >= grid.rows() || x > right {
        return;
    }
    let n = n.min(right - x + 1);
    if n == 0 {
        return;
    }
    let width = right - x + 1 - n;
    if width > 0 {
        grid.copy_rect(GridRect::new(x, y, width, 1), x + n, y);
    }
    grid.fill_rect(GridRect::new(x, y, n, 1), Cell::blank_with_bg(bg));
}

fn apply_delete_chars(grid: &mut Grid, x: usize, y: usize, n: usize, right: usize, bg: Color) {
    let right = right.min(grid.cols().saturating_sub(1));
    if y >= grid.rows() || x > right {
        return;
    }
    let n = n.min(right - x + 1);
    if n == 0 {
        return;
    }
    let width = right - x + 1 - n;
    if width > 0 {
        grid.copy_rect(GridRect::new(x + n, y, width, 1), x, y);
    }
    grid.fill_rect(GridRect::new(right + 1 - n, y, n, 1), Cell::blank_with_bg(bg));
}

fn apply_erase_in_line(grid: &mut Grid, mode: EraseMode, x: usize, y: usize, bg: Color, selective: bool) {
    if y >= grid.rows() {
        return;
    }
    let cols = grid.cols();
    let (start, end) = match mode {
        EraseMode::ToEnd => (x.min(cols), cols),
        EraseMode::ToStart => (0, (x + 1).min(cols)),
        EraseMode::All | EraseMode::AllAndScrollback => (0, cols),
    };
    erase_span(grid, start, end, y, bg, selective);
}

fn apply_erase_in_display(
    session: &mut Session,
    mode: EraseMode,
    x: usize,
    y: usize,
    bg: Color,
    selective: bool,
) {
    let rows = session.grid_mut().rows();
    match mode {
        EraseMode::ToEnd => {
            apply_erase_in_line(session.grid_mut(), EraseMode::ToEnd, x, y, bg, selective);
            for row in (y + 1)..rows {
                erase_row(session.grid_mut(), row, bg, selective);
            }
        }
        EraseMode::ToStart => {
            for row in 0..y.min(rows) {
                erase_row(session.grid_mut(), row, bg, selective);
            }
            apply_erase_in_line(session.grid_mut(), EraseMode::ToStart, x, y, bg, selective);
        }
        EraseMode::All => {
            for row in 0..rows {
                erase_row(session.grid_mut(), row, bg, selective);
            }
        }
        EraseMode::AllAndScrollback => {
            for row in 0..rows {
                erase_row(session.grid_mut(), row, bg, selective);
            }
            session.grid_mut().clear_scrollback();
        }
    }
}

fn erase_row(grid: &mut Grid, y: usize, bg: Color, selective: bool) {
    erase_span(grid, 0, grid.cols(), y, bg, selective);
}

fn erase_span(grid: &mut Grid, start: usize, end: usize, y: usize, bg: Color, selective: bool) {
    if !selective {
        if end > start {
            grid.fill_rect(GridRect::new(start, y, end - start, 1), Cell::blank_with_bg(bg));
        }
        return;
    }
    // DECSEL / DECSED: cells bearing PROTECTED survive.
    for x in start..end {
        let protected = grid.cell(x, y).is_some_and(Cell::is_protected);
        if !protected {
            grid.put(x, y, Cell::blank_with_bg(bg));
        }
    }
}

/// Clip every queued op to the post-resize dimensions; drop ops fully
/// outside the new grid.
fn revalidate_queue(queue: &mut OpQueue, cols: usize, rows: usize) {
    let clamp_region = |region: &mut Region| -> bool {
        region.bottom = region.bottom.min(rows.saturating_sub(1));
        region.right = region.right.min(cols.saturating_sub(1));
        region.top <= region.bottom && region.left <= region.right
    };
    queue.retain_mut(|op| match op {
        Op::PrintChar { x, y, .. } => *x < cols && *y < rows,
        Op::ScrollUp { region, .. } | Op::ScrollDown { region, .. } => clamp_region(region),
        Op::InsertLines { y, region, .. } | Op::DeleteLines { y, region, .. } => {
            *y < rows && clamp_region(region)
        }
        Op::InsertChars { x, y, right, .. }
        | Op::DeleteChars { x, y, right, .. } => {
            *right = (*right).min(cols.saturating_sub(1));
            *x < cols && *y < rows
        }
        Op::EraseChars { x, y, n, .. } => {
            if *x >= cols || *y >= rows {
                return false;
            }
            *n = (*n).min(cols - *x);
            true
        }
        Op::FillRectMasked { rect, .. } => match rect.clipped_to(cols, rows) {
            Some(clipped) => {
                *rect = clipped;
                true
            }
            None => false,
        },
        Op::CopyRect { src, dst_x, dst_y } => match src.clipped_to(cols, rows) {
            Some(clipped) => {
                *src = clipped;
                *dst_x < cols && *dst_y < rows
            }
            None => false,
        },
        Op::EraseInDisplay { x, y, .. } | Op::EraseInLine { x, y, .. } => {
            *x = (*x).min(cols.saturating_sub(1));
            *y = (*y).min(rows.saturating_sub(1));
            true
        }
        Op::Resize { .. } | Op::Reset => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{CellFlags, FillMask};
    use crate::core::session::Session;
    use crate::core::terminal::TermConfig;
    use pretty_assertions::assert_eq;

    fn test_session(cols: usize, rows: usize) -> Session {
        let config = TermConfig { cols, rows, scrollback_rows: rows * 2, ..TermConfig::default() };
        Session::new(0, &config)
    }

    fn print_op(x: usize, y: usize, ch: char) -> Op {
        Op::PrintChar { x, y, cell: Cell { ch, ..Cell::default() } }
    }

    #[test]
    fn budget_limits_ops_per_flush() {
        let mut session = test_session(100, 100);
        for i in 0..10 {
            // Non-contiguous prints so nothing coalesces.
            session.op_queue.push(print_op(i * 2, 0, 'A')).unwrap();
        }
        assert_eq!(flush_ops(&mut session, 5), 5);
        assert_eq!(session.op_queue.len(), 5);
        assert_eq!(flush_ops(&mut session, 5), 5);
        assert!(session.op_queue.is_empty());
    }

    #[test]
    fn contiguous_prints_coalesce_into_one_budget_unit() {
        let mut session = test_session(80, 24);
        for (i, ch) in "Hello".chars().enumerate() {
            session.op_queue.push(print_op(i, 0, ch)).unwrap();
        }
        assert_eq!(flush_ops(&mut session, 1), 1);
        assert!(session.op_queue.is_empty());
        assert_eq!(session.grid_mut().cell(4, 0).unwrap().ch, 'o');
    }

    #[test]
    fn any_budget_split_yields_same_grid() {
        let build_ops = |session: &mut Session| {
            for (i, ch) in "abcdef".chars().enumerate() {
                session.op_queue.push(print_op(10 + i * 3, 2, ch)).unwrap();
            }
            session
                .op_queue
                .push(Op::ScrollUp {
                    region: Region { top: 0, bottom: 23, left: 0, right: 79 },
                    n: 1,
                    bg: Color::Default,
                })
                .unwrap();
            session
                .op_queue
                .push(Op::FillRectMasked {
                    rect: GridRect::new(0, 0, 4, 2),
                    mask: FillMask::CH,
                    cell: Cell { ch: 'Z', ..Cell::default() },
                })
                .unwrap();
        };

        let mut all_at_once = test_session(80, 24);
        build_ops(&mut all_at_once);
        while flush_ops(&mut all_at_once, usize::MAX) > 0 {}

        let mut one_by_one = test_session(80, 24);
        build_ops(&mut one_by_one);
        while flush_ops(&mut one_by_one, 1) > 0 {}

        for y in 0..24 {
            for x in 0..80 {
                assert_eq!(
                    all_at_once.grid_mut().cell(x, y).map(|c| (c.ch, c.fg, c.bg)),
                    one_by_one.grid_mut().cell(x, y).map(|c| (c.ch, c.fg, c.bg)),
                    "cell ({x},{y}) diverged"
                );
            }
        }
    }

    #[test]
    fn resize_revalidates_pending_copy_rect() {
        // The buffer-hardening scenario: a copy queued with pre-resize
        // width must be clipped once the resize applies, never read or
        // write outside the new bounds.
        let mut session = test_session(132, 24);
        session.op_queue.push(Op::Resize { cols: 80, rows: 24 }).unwrap();
        session
            .op_queue
            .push(Op::CopyRect { src: GridRect::new(0, 0, 130, 24), dst_x: 0, dst_y: 0 })
            .unwrap();
        session
            .op_queue
            .push(Op::FillRectMasked {
                rect: GridRect::new(100, 0, 20, 4),
                mask: FillMask::CH,
                cell: Cell { ch: 'X', ..Cell::default() },
            })
            .unwrap();
        while flush_ops(&mut session, usize::MAX) > 0 {}
        assert_eq!(session.grid_mut().cols(), 80);
        // The fill that was fully outside the new width is gone; nothing
        // panicked or wrote out of bounds.
        assert_eq!(session.grid_mut().cell(79, 0).unwrap().ch, ' ');
    }

    #[test]
    fn insert_and_delete_chars_shift_within_margins() {
        let mut session = test_session(10, 2);
        for (i, ch) in "abcdef".chars().enumerate() {
            session.op_queue.push(print_op(i, 0, ch)).unwrap();
        }
        session
            .op_queue
            .push(Op::InsertChars { x: 1, y: 0, n: 2, right: 9, bg: Color::Default })
            .unwrap();
        while flush_ops(&mut session, usize::MAX) > 0 {}
        let row: String = (0..10).map(|x| session.grid_mut().cell(x, 0).unwrap().ch).collect();
        assert_eq!(row, "a  bcdef  ");

        session
            .op_queue
            .push(Op::DeleteChars { x: 1, y: 0, n: 2, right: 9, bg: Color::Default })
            .unwrap();
        while flush_ops(&mut session, usize::MAX) > 0 {}
        let row: String = (0..10).map(|x| session.grid_mut().cell(x, 0).unwrap().ch).collect();
        assert_eq!(row, "abcdef    ");
    }

    #[test]
    fn selective_erase_skips_protected_cells() {
        let mut session = test_session(6, 1);
        let protected = Cell {
            ch: 'P',
            flags: CellFlags::PROTECTED,
            ..Cell::default()
        };
        session.grid_mut().put(2, 0, protected);
        session.grid_mut().put(3, 0, Cell { ch: 'u', ..Cell::default() });
        session
            .op_queue
            .push(Op::EraseInLine {
                mode: EraseMode::All,
                x: 0,
                y: 0,
                bg: Color::Default,
                selective: true,
            })
            .unwrap();
        while flush_ops(&mut session, usize::MAX) > 0 {}
        assert_eq!(session.grid_mut().cell(2, 0).unwrap().ch, 'P');
        assert_eq!(session.grid_mut().cell(3, 0).unwrap().ch, ' ');
    }
}
