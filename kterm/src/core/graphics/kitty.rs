// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Kitty graphics protocol (APC `G`).
//!
//! Payloads are `k=v,k=v;base64-data`. Supported actions: transmit (`t`),
//! transmit-and-display (`T`), display (`p`), delete (`d`), and query
//! (`q`). Chunked uploads (`m=1`) accumulate until the final chunk. The
//! image table is bounded by `max_kitty_image_pixels` per image; an upload
//! that declares more pixels is rejected up front.

use rustc_hash::FxHashMap;

use crate::core::codec::base64_decode_into;
use crate::core::session::Session;
use crate::core::terminal::{ErrorSource, SessionCtx};

/// One decoded (or still-uploading) image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KittyImage {
    pub id: u32,
    pub width: usize,
    pub height: usize,
    /// Raw pixel bytes in the transmitted format (f=24 RGB, f=32 RGBA).
    pub data: Vec<u8>,
    pub format: u16,
}

/// A display placement of an image at a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KittyPlacement {
    pub image_id: u32,
    pub col: usize,
    pub row: usize,
}

/// Fields of the key-value header we act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct KittyCommand {
    action: char,
    format: u16,
    id: u32,
    width: usize,
    height: usize,
    more: bool,
    quiet: u8,
}

#[derive(Debug, Clone, Default)]
pub struct KittyState {
    pub images: FxHashMap<u32, KittyImage>,
    pub placements: Vec<KittyPlacement>,
    /// Upload spanning multiple chunks (`m=1`).
    pending: Option<(KittyCommand, Vec<u8>)>,
    next_auto_id: u32,
}

impl KittyState {
    pub fn reset(&mut self) { *self = Self::default(); }

    #[must_use]
    pub fn image_count(&self) -> usize { self.images.len() }
}

/// Handle one complete APC `G` payload (after the `G`).
pub fn process_apc(session: &mut Session, ctx: &mut SessionCtx<'_>, payload: &str) {
    let (header, data) = match payload.split_once(';') {
        Some(pair) => pair,
        None => (payload, ""),
    };

    let mut cmd = match session.kitty.pending.as_ref() {
        // Continuation chunks may omit most keys; keep the original command.
        Some((pending, _)) => *pending,
        None => KittyCommand { action: 't', format: 32, ..KittyCommand::default() },
    };
    parse_header(&mut cmd, header);

    match cmd.action {
        't' | 'T' => transmit(session, ctx, cmd, data),
        'p' => display(session, cmd.id),
        'd' => {
            if cmd.id == 0 {
                session.kitty.images.clear();
                session.kitty.placements.clear();
            } else {
                session.kitty.images.remove(&cmd.id);
                session.kitty.placements.retain(|p| p.image_id != cmd.id);
            }
        }
        'q' => {
            ctx.responses.push_str(&format!("\x1b_Gi={};OK\x1b\\", cmd.id));
        }
        other => {
            ctx.errors.warn(
                ErrorSource::Graphics,
                &format!("kitty graphics: unsupported action {other:?}"),
            );
        }
    }
}

fn parse_header(cmd: &mut KittyCommand, header: &str) {
    for pair in header.split(',') {
        let Some((key, value)) = pair.split_once('=') else { continue };
        match key.trim() {
            "a" => cmd.action = value.chars().next().unwrap_or('t'),
            "f" => cmd.format = value.parse().unwrap_or(32),
            "i" => cmd.id = value.parse().unwrap_or(0),
            "s" => cmd.width = value.parse().unwrap_or(0),
            "v" => cmd.height = value.parse().unwrap_or(0),
            "m" => cmd.more = value.trim() == "1",
            "q" => cmd.quiet = value.parse().unwrap_or(0),
            _ => {}
        }
    }
}

fn transmit(session: &mut Session, ctx: &mut SessionCtx<'_>, cmd: KittyCommand, data: &str) {
    // Pixel budget check happens before any bytes accumulate.
    let declared = cmd.width.saturating_mul(cmd.height);
    if declared > ctx.config.max_kitty_image_pixels {
        session.kitty.pending = None;
        if cmd.quiet == 0 {
            ctx.responses.push_str(&format!("\x1b_Gi={};ENOSPC:too many pixels\x1b\\", cmd.id));
        }
        ctx.errors.warn(
            ErrorSource::Graphics,
            &format!("kitty image {}x{} exceeds pixel budget", cmd.width, cmd.height),
        );
        return;
    }

    let bytes_per_pixel: usize = match cmd.format {
        24 => 3,
        _ => 4,
    };
    let max_bytes = declared.saturating_mul(bytes_per_pixel).max(4096);

    let (_, mut buf) = session.kitty.pending.take().unwrap_or((cmd, Vec::new()));
    let remaining = max_bytes.saturating_sub(buf.len());
    base64_decode_into(data.as_bytes(), &mut buf, remaining);

    if cmd.more {
        session.kitty.pending = Some((cmd, buf));
        return;
    }

    let id = if cmd.id == 0 {
        session.kitty.next_auto_id += 1;
        session.kitty.next_auto_id
    } else {
        cmd.id
    };
    session.kitty.images.insert(
        id,
        KittyImage {
            id,
            width: cmd.width,
            height: cmd.height,
            data: buf,
            format: cmd.format,
        },
    );
    if cmd.quiet == 0 {
        ctx.responses.push_str(&format!("\x1b_Gi={id};OK\x1b\\"));
    }
    if cmd.action == 'T' {
        display(session, id);
    }
}

fn display(session: &mut Session, image_id: u32) {
    if session.kitty.images.contains_key(&image_id) {
        session.kitty.placements.push(KittyPlacement {
            image_id,
            col: session.cursor.x,
            row: session.cursor.y,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::base64_encode;
    use crate::core::grid::{DynamicColors, Palette};
    use crate::core::io::ResponseRing;
    use crate::core::terminal::{CrossAction, ErrorReporter, TermConfig};
    use pretty_assertions::assert_eq;

    struct Harness {
        config: TermConfig,
        palette: Palette,
        dynamic: DynamicColors,
        clipboard: Vec<u8>,
        responses: ResponseRing,
        actions: Vec<CrossAction>,
        errors: ErrorReporter,
    }

    impl Harness {
        fn new(config: TermConfig) -> Self {
            Self {
                config,
                palette: Palette::default(),
                dynamic: DynamicColors::default(),
                clipboard: Vec::new(),
                responses: ResponseRing::new(),
                actions: Vec::new(),
                errors: ErrorReporter { strict: false, callback: None },
            }
        }

        fn ctx(&mut self) -> SessionCtx<'_> {
            SessionCtx {
                config: &self.config,
                palette: &mut self.palette,
                dynamic: &mut self.dynamic,
                clipboard: &mut self.clipboard,
                responses: &mut self.responses,
                actions: &mut self.actions,
                errors: &mut self.errors,
            }
        }
    }

    #[test]
    fn transmit_and_display_places_at_cursor() {
        let mut h = Harness::new(TermConfig::default());
        let mut s = Session::new(0, &h.config);
        s.cursor.x = 3;
        s.cursor.y = 2;
        let data = base64_encode(&[0u8; 12]);
        process_apc(&mut s, &mut h.ctx(), &format!("a=T,f=24,i=7,s=2,v=2;{data}"));
        assert_eq!(s.kitty.image_count(), 1);
        assert_eq!(s.kitty.placements, vec![KittyPlacement { image_id: 7, col: 3, row: 2 }]);
        assert_eq!(s.kitty.images[&7].data.len(), 12);
    }

    #[test]
    fn oversize_image_is_rejected() {
        let config = TermConfig { max_kitty_image_pixels: 100, ..TermConfig::default() };
        let mut h = Harness::new(config);
        let mut s = Session::new(0, &h.config);
        process_apc(&mut s, &mut h.ctx(), "a=t,i=1,s=20,v=20;");
        assert_eq!(s.kitty.image_count(), 0);
        let reply = h.responses.drain();
        assert!(String::from_utf8_lossy(&reply).contains("ENOSPC"));
    }

    #[test]
    fn chunked_upload_accumulates() {
        let mut h = Harness::new(TermConfig::default());
        let mut s = Session::new(0, &h.config);
        let part1 = base64_encode(&[1u8; 6]);
        let part2 = base64_encode(&[2u8; 6]);
        process_apc(&mut s, &mut h.ctx(), &format!("a=t,f=24,i=9,s=2,v=2,m=1;{part1}"));
        assert_eq!(s.kitty.image_count(), 0);
        process_apc(&mut s, &mut h.ctx(), &format!("m=0;{part2}"));
        assert_eq!(s.kitty.image_count(), 1);
        assert_eq!(s.kitty.images[&9].data, [[1u8; 6].as_slice(), [2u8; 6].as_slice()].concat());
    }

    #[test]
    fn delete_by_id_and_all() {
        let mut h = Harness::new(TermConfig::default());
        let mut s = Session::new(0, &h.config);
        let data = base64_encode(&[0u8; 3]);
        process_apc(&mut s, &mut h.ctx(), &format!("a=T,f=24,i=1,s=1,v=1;{data}"));
        process_apc(&mut s, &mut h.ctx(), &format!("a=T,f=24,i=2,s=1,v=1;{data}"));
        process_apc(&mut s, &mut h.ctx(), "a=d,i=1;");
        assert_eq!(s.kitty.image_count(), 1);
        assert!(s.kitty.placements.iter().all(|p| p.image_id != 1));
        process_apc(&mut s, &mut h.ctx(), "a=d;");
        assert_eq!(s.kitty.image_count(), 0);
        assert!(s.kitty.placements.is_empty());
    }
}
