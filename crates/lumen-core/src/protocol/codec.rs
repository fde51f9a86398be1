//! Binary codec for whole packets.
//!
//! # Wire format (for beginners)
//!
//! A packet is the fixed 36-byte header followed by the payload bytes of
//! its message type:
//!
//! ```text
//! ┌───────────────────────────┬──────────────────────────────┐
//! │ header (36 bytes)         │ payload (0..=max-36 bytes)   │
//! │ Frame │ FrameAddr │ Proto │ shape depends on the code    │
//! └───────────────────────────┴──────────────────────────────┘
//! ```
//!
//! The codec deals only in the envelope: [`decode_packet`] validates the
//! sizes and hands back the parsed header plus the raw payload bytes, and
//! [`encode_packet`] writes the header with a freshly computed `size` field.
//! Interpreting the payload is the job of
//! [`crate::protocol::payloads`] once the dispatcher has classified the
//! message type — an unknown code must be droppable without ever touching
//! its payload.
//!
//! Datagrams that fail validation produce a [`WireError`]; the caller logs
//! and drops.  Nothing in here panics on attacker-controlled input.

use thiserror::Error;

use crate::protocol::header::{PacketHeader, HEADER_LEN};

/// The largest packet the device accepts by default.  Memory-constrained
/// firmware uses a fixed receive buffer of this size; we keep the same
/// ceiling so oversized datagrams are rejected, not half-read.
pub const MAX_PACKET_LEN: usize = 128;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors for malformed or oversized packets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer cannot even hold a header.
    #[error("insufficient data: needed {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The header's `size` field disagrees with the bytes actually received.
    #[error("size field mismatch: header declares {declared} bytes, buffer holds {actual}")]
    SizeFieldMismatch { declared: usize, actual: usize },

    /// The packet exceeds the configured receive ceiling.
    #[error("packet too large: {size} bytes exceeds the {limit} byte limit")]
    PacketTooLarge { size: usize, limit: usize },

    /// A payload failed its message-specific shape check.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// A decoded packet: parsed header plus unparsed payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    /// The message type code from the ProtocolHeader.
    pub fn message_type(&self) -> u16 {
        self.header.protocol_header.message_type
    }

    /// The size this packet occupies on the wire.
    pub fn wire_size(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one packet with the default [`MAX_PACKET_LEN`] ceiling.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, WireError> {
    decode_packet_bounded(bytes, MAX_PACKET_LEN)
}

/// Decodes one packet, rejecting anything longer than `max_len`.
///
/// Validation order: ceiling, minimum header length, then the declared
/// `size` against the bytes actually present.  A declared size below 36
/// can never pass (the buffer either is that short, or disagrees with the
/// declaration).
pub fn decode_packet_bounded(bytes: &[u8], max_len: usize) -> Result<Packet, WireError> {
    if bytes.len() > max_len {
        return Err(WireError::PacketTooLarge {
            size: bytes.len(),
            limit: max_len,
        });
    }
    if bytes.len() < HEADER_LEN {
        return Err(WireError::InsufficientData {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }

    let header_bytes: &[u8; HEADER_LEN] =
        bytes[..HEADER_LEN]
            .try_into()
            .map_err(|_| WireError::InsufficientData {
                needed: HEADER_LEN,
                available: bytes.len(),
            })?;
    let header = PacketHeader::unpack(header_bytes);

    let declared = usize::from(header.frame.size);
    if declared != bytes.len() {
        return Err(WireError::SizeFieldMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    Ok(Packet {
        header,
        payload: bytes[HEADER_LEN..].to_vec(),
    })
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a packet into its wire bytes.
///
/// The header's `size` field is computed from the payload length, never
/// trusted from the caller, so every encoded packet satisfies
/// `size == 36 + payload.len()` by construction.
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut header = packet.header;
    header.frame.size = (HEADER_LEN + packet.payload.len()) as u16;

    let mut buf = Vec::with_capacity(HEADER_LEN + packet.payload.len());
    buf.extend_from_slice(&header.pack());
    buf.extend_from_slice(&packet.payload);
    buf
}

// ── Shared read helpers ───────────────────────────────────────────────────────

/// Checks a payload is at least `needed` bytes, naming the message in the
/// error.  Callers index freely after this.
pub(crate) fn require_len(payload: &[u8], needed: usize, context: &str) -> Result<(), WireError> {
    if payload.len() < needed {
        return Err(WireError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            payload.len()
        )));
    }
    Ok(())
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::{Frame, FrameAddress, ProtocolHeader, PROTOCOL_NUMBER};

    fn make_header(message_type: u16, size: u16) -> PacketHeader {
        PacketHeader {
            frame: Frame {
                size,
                origin: 0,
                tagged: false,
                addressable: true,
                protocol: PROTOCOL_NUMBER,
                source: 0x1234_5678,
            },
            frame_address: FrameAddress {
                target: 0,
                reserved: [0; 6],
                reserved2: 0,
                ack_required: false,
                res_required: false,
                sequence: 1,
            },
            protocol_header: ProtocolHeader {
                reserved: 0,
                message_type,
                reserved2: 0,
            },
        }
    }

    fn make_packet(message_type: u16, payload: Vec<u8>) -> Packet {
        let size = (HEADER_LEN + payload.len()) as u16;
        Packet {
            header: make_header(message_type, size),
            payload,
        }
    }

    // ── decode_packet ─────────────────────────────────────────────────────────

    #[test]
    fn test_decode_empty_buffer_is_insufficient_data() {
        assert_eq!(
            decode_packet(&[]),
            Err(WireError::InsufficientData {
                needed: HEADER_LEN,
                available: 0,
            })
        );
    }

    #[test]
    fn test_decode_truncated_header_is_insufficient_data() {
        assert_eq!(
            decode_packet(&[0u8; 35]),
            Err(WireError::InsufficientData {
                needed: HEADER_LEN,
                available: 35,
            })
        );
    }

    #[test]
    fn test_decode_header_only_packet_has_empty_payload() {
        let bytes = encode_packet(&make_packet(20, Vec::new()));

        let packet = decode_packet(&bytes).expect("valid packet");

        assert!(packet.payload.is_empty());
        assert_eq!(packet.message_type(), 20);
        assert_eq!(packet.header.frame.size, 36);
    }

    #[test]
    fn test_decode_rejects_declared_size_larger_than_buffer() {
        let mut bytes = encode_packet(&make_packet(21, vec![0xFF, 0xFF]));
        bytes[0] = 40; // claims 40 bytes, buffer holds 38

        assert_eq!(
            decode_packet(&bytes),
            Err(WireError::SizeFieldMismatch {
                declared: 40,
                actual: 38,
            })
        );
    }

    #[test]
    fn test_decode_rejects_declared_size_smaller_than_buffer() {
        let mut bytes = encode_packet(&make_packet(21, vec![0xFF, 0xFF]));
        bytes[0] = 36;

        assert_eq!(
            decode_packet(&bytes),
            Err(WireError::SizeFieldMismatch {
                declared: 36,
                actual: 38,
            })
        );
    }

    #[test]
    fn test_decode_rejects_declared_size_below_header_length() {
        let mut bytes = encode_packet(&make_packet(21, vec![0xFF, 0xFF]));
        bytes[0] = 20;

        assert!(matches!(
            decode_packet(&bytes),
            Err(WireError::SizeFieldMismatch { declared: 20, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_packet_over_default_ceiling() {
        let bytes = vec![0u8; MAX_PACKET_LEN + 1];
        assert_eq!(
            decode_packet(&bytes),
            Err(WireError::PacketTooLarge {
                size: MAX_PACKET_LEN + 1,
                limit: MAX_PACKET_LEN,
            })
        );
    }

    #[test]
    fn test_decode_bounded_honors_custom_ceiling() {
        let bytes = encode_packet(&make_packet(58, vec![0u8; 64])); // 100 bytes

        assert!(decode_packet_bounded(&bytes, 100).is_ok());
        assert_eq!(
            decode_packet_bounded(&bytes, 64),
            Err(WireError::PacketTooLarge {
                size: 100,
                limit: 64,
            })
        );
    }

    // ── encode_packet ─────────────────────────────────────────────────────────

    #[test]
    fn test_encode_computes_size_for_every_payload_length() {
        for payload_len in 0..=(MAX_PACKET_LEN - HEADER_LEN) {
            let bytes = encode_packet(&make_packet(2, vec![0xAB; payload_len]));
            let declared = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
            assert_eq!(declared, HEADER_LEN + payload_len);
            assert_eq!(declared, bytes.len());
        }
    }

    #[test]
    fn test_encode_overwrites_a_lying_size_field() {
        let mut packet = make_packet(20, Vec::new());
        packet.header.frame.size = 9999;

        let bytes = encode_packet(&packet);

        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 36);
    }

    #[test]
    fn test_valid_packet_roundtrips_byte_identically() {
        let mut packet = make_packet(102, vec![1, 2, 3, 4, 5]);
        // Dirty every reserved field; decode must preserve, re-encode must
        // reproduce the exact bytes.
        packet.header.frame_address.reserved = [9, 8, 7, 6, 5, 4];
        packet.header.frame_address.reserved2 = 0b11_0101;
        packet.header.protocol_header.reserved = 0xDEAD_BEEF_CAFE_F00D;
        packet.header.protocol_header.reserved2 = 0x5A5A;

        let bytes = encode_packet(&packet);
        let decoded = decode_packet(&bytes).expect("valid packet");

        assert_eq!(decoded.header.frame_address.reserved, [9, 8, 7, 6, 5, 4]);
        assert_eq!(encode_packet(&decoded), bytes);
    }

    #[test]
    fn test_decode_preserves_flag_bits_exactly() {
        let mut packet = make_packet(2, Vec::new());
        packet.header.frame.tagged = true;
        packet.header.frame_address.ack_required = true;
        packet.header.frame_address.res_required = true;
        packet.header.frame_address.sequence = 250;

        let decoded = decode_packet(&encode_packet(&packet)).expect("valid packet");

        assert!(decoded.header.frame.tagged);
        assert!(decoded.header.frame_address.ack_required);
        assert!(decoded.header.frame_address.res_required);
        assert_eq!(decoded.header.frame_address.sequence, 250);
    }

    // ── require_len ───────────────────────────────────────────────────────────

    #[test]
    fn test_require_len_names_the_message_in_the_error() {
        let err = require_len(&[0u8; 3], 13, "LightSetColor").unwrap_err();
        assert_eq!(
            err,
            WireError::MalformedPayload("LightSetColor: need 13 bytes, got 3".to_string())
        );
    }

    #[test]
    fn test_require_len_accepts_exact_and_longer_buffers() {
        assert!(require_len(&[0u8; 2], 2, "Power").is_ok());
        assert!(require_len(&[0u8; 6], 2, "Power").is_ok());
    }
}
