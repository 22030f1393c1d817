// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Session persistence: magic `KTERM_SES_V1`, a fixed little-endian
//! header (cols, rows, buffer height, screen head, view offset, cursor,
//! scroll margins), then the primary cell array and the alternate cell
//! array. Restore is dimension-strict: a session with different geometry
//! rejects the snapshot (resize first, then restore).

use crate::core::grid::{Cell, CellFlags, Color};
use crate::core::session::Session;

pub const MAGIC: &[u8; 12] = b"KTERM_SES_V1";

/// Header field count (i32 little-endian each) after the magic.
const HEADER_FIELDS: usize = 9;
/// Serialized cell size: ch u32 + three colors (4 bytes each) + flags u32.
const CELL_BYTES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("bad magic; not a session snapshot")]
    BadMagic,
    #[error("snapshot truncated ({have} bytes, need {need})")]
    Truncated { have: usize, need: usize },
    #[error("dimension mismatch (snapshot {snap_cols}x{snap_rows}, session {cols}x{rows}); resize first")]
    DimensionMismatch {
        snap_cols: usize,
        snap_rows: usize,
        cols: usize,
        rows: usize,
    },
    #[error("scrollback depth mismatch; resize first")]
    BufferHeightMismatch,
    #[error("corrupt header field")]
    CorruptHeader,
}

/// Serialize a session's grids and view state.
#[must_use]
pub fn serialize_session(session: &Session) -> Vec<u8> {
    let primary = session.primary_grid();
    let alt = session.alt_grid();
    let mut out = Vec::with_capacity(
        MAGIC.len()
            + HEADER_FIELDS * 4
            + (primary.raw_cells().len() + alt.raw_cells().len()) * CELL_BYTES,
    );
    out.extend_from_slice(MAGIC);
    for value in [
        primary.cols(),
        primary.rows(),
        primary.buffer_height(),
        primary.screen_head(),
        primary.view_offset(),
        session.cursor.x,
        session.cursor.y,
        session.margins.top,
        session.margins.bottom,
    ] {
        out.extend_from_slice(&(value as i32).to_le_bytes());
    }
    for cell in primary.raw_cells() {
        write_cell(&mut out, cell);
    }
    for cell in alt.raw_cells() {
        write_cell(&mut out, cell);
    }
    out
}

/// Restore a session from a snapshot produced by [`serialize_session`].
///
/// # Errors
///
/// [`SerializeError`] on bad magic, truncation, or geometry mismatch. The
/// session is untouched on failure.
pub fn deserialize_session(session: &mut Session, data: &[u8]) -> Result<(), SerializeError> {
    if data.len() < MAGIC.len() + HEADER_FIELDS * 4 {
        return Err(SerializeError::Truncated {
            have: data.len(),
            need: MAGIC.len() + HEADER_FIELDS * 4,
        });
    }
    if &data[..MAGIC.len()] != MAGIC {
        return Err(SerializeError::BadMagic);
    }

    let mut fields = [0usize; HEADER_FIELDS];
    for (i, slot) in fields.iter_mut().enumerate() {
        let offset = MAGIC.len() + i * 4;
        let raw = i32::from_le_bytes(
            data[offset..offset + 4]
                .try_into()
                .map_err(|_| SerializeError::CorruptHeader)?,
        );
        if raw < 0 {
            return Err(SerializeError::CorruptHeader);
        }
        *slot = raw as usize;
    }
    let [cols, rows, buffer_height, screen_head, view_offset, cursor_x, cursor_y, scroll_top, scroll_bottom] =
        fields;

    if cols != session.cols || rows != session.rows {
        return Err(SerializeError::DimensionMismatch {
            snap_cols: cols,
            snap_rows: rows,
            cols: session.cols,
            rows: session.rows,
        });
    }
    if buffer_height != session.primary_grid().buffer_height() {
        return Err(SerializeError::BufferHeightMismatch);
    }

    let primary_cells = buffer_height * cols;
    let alt_cells = rows * cols;
    let body = &data[MAGIC.len() + HEADER_FIELDS * 4..];
    let need = (primary_cells + alt_cells) * CELL_BYTES;
    if body.len() < need {
        return Err(SerializeError::Truncated {
            have: data.len(),
            need: MAGIC.len() + HEADER_FIELDS * 4 + need,
        });
    }

    let mut primary = Vec::with_capacity(primary_cells);
    for i in 0..primary_cells {
        primary.push(read_cell(&body[i * CELL_BYTES..]));
    }
    let mut alt = Vec::with_capacity(alt_cells);
    let alt_base = primary_cells * CELL_BYTES;
    for i in 0..alt_cells {
        alt.push(read_cell(&body[alt_base + i * CELL_BYTES..]));
    }

    if !session
        .primary_grid_mut()
        .restore_raw(primary, screen_head, view_offset)
    {
        return Err(SerializeError::CorruptHeader);
    }
    let rows_minus_1 = rows.saturating_sub(1);
    let _ = session.alt_grid_mut().restore_raw(alt, 0, 0);
    session.cursor.x = cursor_x.min(cols.saturating_sub(1));
    session.cursor.y = cursor_y.min(rows_minus_1);
    session.margins.top = scroll_top.min(rows_minus_1);
    session.margins.bottom = scroll_bottom.clamp(session.margins.top, rows_minus_1);
    Ok(())
}

fn write_cell(out: &mut Vec<u8>, cell: &Cell) {
    out.extend_from_slice(&(cell.ch as u32).to_le_bytes());
    write_color(out, cell.fg);
    write_color(out, cell.bg);
    write_color(out, cell.ul);
    out.extend_from_slice(&cell.flags.bits().to_le_bytes());
}

fn write_color(out: &mut Vec<u8>, color: Color) {
    match color {
        Color::Default => out.extend_from_slice(&[0, 0, 0, 0]),
        Color::Indexed(i) => out.extend_from_slice(&[1, i, 0, 0]),
        Color::Rgb(r, g, b) => out.extend_from_slice(&[2, r, g, b]),
    }
}

fn read_cell(bytes: &[u8]) -> Cell {
    let ch = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    Cell {
        ch: char::from_u32(ch).unwrap_or(' '),
        fg: read_color(&bytes[4..8]),
        bg: read_color(&bytes[8..12]),
        ul: read_color(&bytes[12..16]),
        flags: CellFlags::from_bits_retain(u32::from_le_bytes([
            bytes[16], bytes[17], bytes[18], bytes[19],
        ])),
        generation: 0,
    }
}

fn read_color(bytes: &[u8]) -> Color {
    match bytes[0] {
        1 => Color::Indexed(bytes[1]),
        2 => Color::Rgb(bytes[1], bytes[2], bytes[3]),
        _ => Color::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::terminal::TermConfig;
    use pretty_assertions::assert_eq;

    fn session(cols: usize, rows: usize, scrollback: usize) -> Session {
        Session::new(
            0,
            &TermConfig { cols, rows, scrollback_rows: scrollback, ..TermConfig::default() },
        )
    }

    #[test]
    fn round_trip_restores_content_and_cursor() {
        let mut s = session(20, 6, 10);
        for (i, ch) in "Hello".chars().enumerate() {
            s.grid_mut().put(i, 0, Cell { ch, ..Cell::default() });
        }
        let marked = Cell { ch: 'X', flags: CellFlags::BOLD, ..Cell::default() };
        s.grid_mut().put(5, 2, marked);
        s.cursor.x = 5;
        s.cursor.y = 2;

        let snapshot = serialize_session(&s);
        assert_eq!(&snapshot[..12], MAGIC);

        let mut restored = session(20, 6, 10);
        deserialize_session(&mut restored, &snapshot).unwrap();
        assert_eq!((restored.cursor.x, restored.cursor.y), (5, 2));
        assert_eq!(restored.grid().cell(0, 0).unwrap().ch, 'H');
        let cell = restored.grid().cell(5, 2).unwrap();
        assert_eq!(cell.ch, 'X');
        assert!(cell.flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn reserialization_is_bytewise_identical() {
        let mut s = session(10, 4, 6);
        s.grid_mut().put(3, 1, Cell {
            ch: 'q',
            fg: Color::Rgb(1, 2, 3),
            bg: Color::Indexed(4),
            ..Cell::default()
        });
        s.cursor.x = 3;
        let first = serialize_session(&s);
        let mut restored = session(10, 4, 6);
        deserialize_session(&mut restored, &first).unwrap();
        let second = serialize_session(&restored);
        assert_eq!(first, second);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let s = session(20, 6, 10);
        let snapshot = serialize_session(&s);
        let mut other = session(40, 6, 10);
        let err = deserialize_session(&mut other, &snapshot).unwrap_err();
        assert!(matches!(err, SerializeError::DimensionMismatch { .. }));
        // Untouched on failure.
        assert_eq!(other.cols, 40);
    }

    #[test]
    fn bad_magic_and_truncation_are_rejected() {
        let mut s = session(4, 2, 2);
        assert_eq!(
            deserialize_session(&mut s, b"NOT_A_SNAPSHOT_AT_ALL_______"),
            Err(SerializeError::BadMagic)
        );
        let snapshot = serialize_session(&s);
        assert!(matches!(
            deserialize_session(&mut s, &snapshot[..20]),
            Err(SerializeError::Truncated { .. })
        ));
        assert!(matches!(
            deserialize_session(&mut s, &snapshot[..snapshot.len() - 1]),
            Err(SerializeError::Truncated { .. })
        ));
    }

    #[test]
    fn scrollback_survives_round_trip() {
        let mut s = session(4, 2, 6);
        // Scroll twice so two rows land in scrollback.
        s.grid_mut().put(0, 0, Cell { ch: 'a', ..Cell::default() });
        s.grid_mut()
            .scroll_region_up(0, 1, 0, 3, 1, Color::Default);
        s.grid_mut()
            .scroll_region_up(0, 1, 0, 3, 1, Color::Default);
        let snapshot = serialize_session(&s);
        let mut restored = session(4, 2, 6);
        deserialize_session(&mut restored, &snapshot).unwrap();
        restored.grid_mut().set_view_offset(2);
        assert_eq!(restored.grid().view_row(0).unwrap()[0].ch, 'a');
    }
}
