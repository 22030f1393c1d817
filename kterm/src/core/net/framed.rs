// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The length-prefixed framed packet protocol:
//! `[type:u8][len:u32 big-endian][payload:len]`.
//!
//! The length field is bounded by the RX ring size; an oversize frame is a
//! protocol violation that disconnects the session.

/// Packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[repr(u8)]
pub enum PacketType {
    Data = 0x01,
    /// Payload: cols, rows as two big-endian u32.
    Resize = 0x02,
    /// Payload: a Gateway command string, injected as a DCS.
    Gateway = 0x03,
    /// Payload: one byte, the target session index.
    Attach = 0x04,
    AudioVoice = 0x10,
    AudioCommand = 0x11,
    AudioStream = 0x12,
}

impl PacketType {
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Data),
            0x02 => Some(Self::Resize),
            0x03 => Some(Self::Gateway),
            0x04 => Some(Self::Attach),
            0x10 => Some(Self::AudioVoice),
            0x11 => Some(Self::AudioCommand),
            0x12 => Some(Self::AudioStream),
            _ => None,
        }
    }
}

pub const FRAME_HEADER_LEN: usize = 5;

/// One decoded frame borrowed out of the RX buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'buf> {
    pub packet_type: PacketType,
    pub payload: &'buf [u8],
}

/// Why frame extraction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame length {len} exceeds the receive buffer bound {bound}")]
    Oversize { len: usize, bound: usize },
    #[error("unknown packet type 0x{0:02X}")]
    UnknownType(u8),
}

/// Try to pop one frame off the front of `buf`. `Ok(None)` means more
/// bytes are needed. On success the frame borrows `buf`; the caller
/// consumes `FRAME_HEADER_LEN + payload.len()` bytes afterwards.
///
/// # Errors
///
/// [`FrameError`] on a bounded-length violation or unknown type; the
/// caller must treat either as a protocol violation and disconnect.
pub fn peek_frame(buf: &[u8], bound: usize) -> Result<Option<Frame<'_>>, FrameError> {
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }
    let packet_type =
        PacketType::from_byte(buf[0]).ok_or(FrameError::UnknownType(buf[0]))?;
    let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if len > bound {
        return Err(FrameError::Oversize { len, bound });
    }
    if buf.len() < FRAME_HEADER_LEN + len {
        return Ok(None);
    }
    Ok(Some(Frame { packet_type, payload: &buf[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len] }))
}

/// Serialize one frame.
#[must_use]
pub fn encode_frame(packet_type: PacketType, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.push(packet_type as u8);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Resize payload helper: cols, rows as big-endian u32 pair.
#[must_use]
pub fn encode_resize_payload(cols: u32, rows: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&cols.to_be_bytes());
    out[4..].copy_from_slice(&rows.to_be_bytes());
    out
}

#[must_use]
pub fn decode_resize_payload(payload: &[u8]) -> Option<(u32, u32)> {
    if payload.len() < 8 {
        return None;
    }
    let cols = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let rows = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Some((cols, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_data_frame() {
        let encoded = encode_frame(PacketType::Data, b"hello");
        assert_eq!(encoded[0], 0x01);
        assert_eq!(&encoded[1..5], &[0, 0, 0, 5]);
        let frame = peek_frame(&encoded, 1024).unwrap().unwrap();
        assert_eq!(frame.packet_type, PacketType::Data);
        assert_eq!(frame.payload, b"hello");
    }

    #[test]
    fn partial_frame_waits_for_more() {
        let encoded = encode_frame(PacketType::Data, b"hello");
        assert_eq!(peek_frame(&encoded[..3], 1024).unwrap(), None);
        assert_eq!(peek_frame(&encoded[..6], 1024).unwrap(), None);
    }

    #[test]
    fn oversize_length_is_a_protocol_violation() {
        let mut encoded = encode_frame(PacketType::Data, b"x");
        encoded[1..5].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_eq!(
            peek_frame(&encoded, 16384),
            Err(FrameError::Oversize { len: u32::MAX as usize, bound: 16384 })
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let encoded = [0x7Fu8, 0, 0, 0, 0];
        assert_eq!(peek_frame(&encoded, 1024), Err(FrameError::UnknownType(0x7F)));
    }

    #[test]
    fn resize_payload_round_trip() {
        let payload = encode_resize_payload(80, 24);
        assert_eq!(payload, [0, 0, 0, 0x50, 0, 0, 0, 0x18]);
        assert_eq!(decode_resize_payload(&payload), Some((80, 24)));
        assert_eq!(decode_resize_payload(&payload[..5]), None);
    }
}
