// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared fixtures: build a terminal, feed a byte sequence, read back
//! rows, cells, cursor, and responses.

use crate::core::terminal::{TermConfig, Terminal};

/// 80x24 terminal with defaults.
pub fn create_test_terminal() -> Terminal {
    Terminal::new(TermConfig::default()).unwrap()
}

pub fn create_test_terminal_sized(cols: usize, rows: usize) -> Terminal {
    Terminal::new(TermConfig { cols, rows, ..TermConfig::default() }).unwrap()
}

/// Feed a sequence to session 0 and run one frame.
pub fn process(term: &mut Terminal, sequence: &str) {
    term.write_bytes(0, sequence.as_bytes());
    term.update();
}

/// The characters of one visible row as a string.
pub fn row_text(term: &Terminal, y: usize) -> String {
    let session = term.session(0).unwrap();
    (0..session.cols)
        .map(|x| session.grid().cell(x, y).unwrap().ch)
        .collect()
}

/// Leading non-blank slice of a row.
pub fn row_prefix(term: &Terminal, y: usize) -> String {
    row_text(term, y).trim_end().to_string()
}

pub fn cell_char(term: &Terminal, x: usize, y: usize) -> char {
    term.session(0).unwrap().grid().cell(x, y).unwrap().ch
}

pub fn cursor(term: &Terminal) -> (usize, usize) {
    let session = term.session(0).unwrap();
    (session.cursor.x, session.cursor.y)
}

/// Responses accumulated so far (drains them).
pub fn responses(term: &mut Terminal) -> Vec<u8> {
    term.drain_responses()
}
