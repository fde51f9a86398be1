//! The fixed 36-byte packet header.
//!
//! Every packet on the wire starts with the same three sections:
//!
//! ```text
//! ┌──────────────┬──────────────────┬────────────────────┬─────────────┐
//! │ Frame (8 B)  │ FrameAddress(16B)│ ProtocolHeader(12B)│ payload ... │
//! └──────────────┴──────────────────┴────────────────────┴─────────────┘
//! ```
//!
//! All multi-byte integers are little-endian.  Two of the fields are
//! bit-packed words; the layout is expressed with explicit mask/shift
//! constants on the owning struct rather than anything clever, so the
//! positions can be read straight off the code.

// ── Section sizes ─────────────────────────────────────────────────────────────

/// Size of the Frame section in bytes.
pub const FRAME_LEN: usize = 8;
/// Size of the FrameAddress section in bytes.
pub const FRAME_ADDRESS_LEN: usize = 16;
/// Size of the ProtocolHeader section in bytes.
pub const PROTOCOL_HEADER_LEN: usize = 12;
/// Total header size: every packet is at least this long.
pub const HEADER_LEN: usize = FRAME_LEN + FRAME_ADDRESS_LEN + PROTOCOL_HEADER_LEN;

/// The protocol number carried in the low 12 bits of the Frame flags word.
pub const PROTOCOL_NUMBER: u16 = 1024;

// ── Frame ─────────────────────────────────────────────────────────────────────

/// First header section: packet size, protocol flags, and the client `source`.
///
/// Bytes 2..4 are a single little-endian u16 packing four fields:
///
/// ```text
/// 15 14 │ 13     │ 12          │ 11 .. 0
/// origin│ tagged │ addressable │ protocol (= 1024)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Total packet length in bytes, header included.
    pub size: u16,
    /// Message origin indicator, 2 bits. Zero on everything we emit.
    pub origin: u8,
    /// `true` when the packet is addressed to every device on the network
    /// rather than one specific target.
    pub tagged: bool,
    /// Always `true` on conforming packets; carried through as received.
    pub addressable: bool,
    /// Protocol number, 12 bits. [`PROTOCOL_NUMBER`] on conforming packets.
    pub protocol: u16,
    /// Client-chosen identifier echoed verbatim into every response.
    pub source: u32,
}

impl Frame {
    /// Bit position of the 2-bit origin field inside the flags word.
    pub const ORIGIN_SHIFT: u16 = 14;
    /// Mask for the origin field (applied after shifting).
    pub const ORIGIN_MASK: u16 = 0b11;
    /// Flag bit: packet is tagged (broadcast).
    pub const TAGGED_BIT: u16 = 1 << 13;
    /// Flag bit: packet carries an addressable frame address.
    pub const ADDRESSABLE_BIT: u16 = 1 << 12;
    /// Mask for the 12-bit protocol number.
    pub const PROTOCOL_MASK: u16 = 0x0FFF;

    /// Packs the section into its 8-byte wire form.
    pub fn pack(&self) -> [u8; FRAME_LEN] {
        let mut flags = (u16::from(self.origin) & Self::ORIGIN_MASK) << Self::ORIGIN_SHIFT;
        if self.tagged {
            flags |= Self::TAGGED_BIT;
        }
        if self.addressable {
            flags |= Self::ADDRESSABLE_BIT;
        }
        flags |= self.protocol & Self::PROTOCOL_MASK;

        let mut out = [0u8; FRAME_LEN];
        out[0..2].copy_from_slice(&self.size.to_le_bytes());
        out[2..4].copy_from_slice(&flags.to_le_bytes());
        out[4..8].copy_from_slice(&self.source.to_le_bytes());
        out
    }

    /// Unpacks the section from its 8-byte wire form.
    pub fn unpack(bytes: &[u8; FRAME_LEN]) -> Self {
        let size = u16::from_le_bytes([bytes[0], bytes[1]]);
        let flags = u16::from_le_bytes([bytes[2], bytes[3]]);
        let source = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self {
            size,
            origin: ((flags >> Self::ORIGIN_SHIFT) & Self::ORIGIN_MASK) as u8,
            tagged: flags & Self::TAGGED_BIT != 0,
            addressable: flags & Self::ADDRESSABLE_BIT != 0,
            protocol: flags & Self::PROTOCOL_MASK,
            source,
        }
    }
}

// ── FrameAddress ──────────────────────────────────────────────────────────────

/// Second header section: target device, delivery flags, and the sequence
/// counter.
///
/// Byte 14 of the section packs three fields:
///
/// ```text
/// 7 .. 2    │ 1            │ 0
/// reserved  │ ack_required │ res_required
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAddress {
    /// Target device identifier; the 6-byte serial sits in the low bytes.
    /// All-zero addresses every device (pairs with [`Frame::tagged`]).
    pub target: u64,
    /// Reserved bytes, preserved as received.
    pub reserved: [u8; 6],
    /// Upper six bits of the flags byte, preserved as received.
    pub reserved2: u8,
    /// Client asks for an explicit acknowledgement after state changes.
    pub ack_required: bool,
    /// Client asks for a state response. Preserved but not consulted: every
    /// request is answered regardless.
    pub res_required: bool,
    /// Client-chosen wrap-around counter echoed into every response.
    pub sequence: u8,
}

impl FrameAddress {
    /// Flag bit: sender wants an Acknowledgement message.
    pub const ACK_REQUIRED_BIT: u8 = 1 << 1;
    /// Flag bit: sender wants a State message.
    pub const RES_REQUIRED_BIT: u8 = 1;
    /// Bit position of the reserved remainder of the flags byte.
    pub const RESERVED_SHIFT: u8 = 2;

    /// Packs the section into its 16-byte wire form.
    pub fn pack(&self) -> [u8; FRAME_ADDRESS_LEN] {
        let mut flags = self.reserved2 << Self::RESERVED_SHIFT;
        if self.ack_required {
            flags |= Self::ACK_REQUIRED_BIT;
        }
        if self.res_required {
            flags |= Self::RES_REQUIRED_BIT;
        }

        let mut out = [0u8; FRAME_ADDRESS_LEN];
        out[0..8].copy_from_slice(&self.target.to_le_bytes());
        out[8..14].copy_from_slice(&self.reserved);
        out[14] = flags;
        out[15] = self.sequence;
        out
    }

    /// Unpacks the section from its 16-byte wire form.
    pub fn unpack(bytes: &[u8; FRAME_ADDRESS_LEN]) -> Self {
        let mut target_bytes = [0u8; 8];
        target_bytes.copy_from_slice(&bytes[0..8]);
        let mut reserved = [0u8; 6];
        reserved.copy_from_slice(&bytes[8..14]);
        let flags = bytes[14];
        Self {
            target: u64::from_le_bytes(target_bytes),
            reserved,
            reserved2: flags >> Self::RESERVED_SHIFT,
            ack_required: flags & Self::ACK_REQUIRED_BIT != 0,
            res_required: flags & Self::RES_REQUIRED_BIT != 0,
            sequence: bytes[15],
        }
    }
}

// ── ProtocolHeader ────────────────────────────────────────────────────────────

/// Third header section: the message type code between two reserved fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolHeader {
    /// Reserved, preserved as received.
    pub reserved: u64,
    /// Message type code; see [`crate::protocol::registry`].
    pub message_type: u16,
    /// Reserved, preserved as received.
    pub reserved2: u16,
}

impl ProtocolHeader {
    /// Packs the section into its 12-byte wire form.
    pub fn pack(&self) -> [u8; PROTOCOL_HEADER_LEN] {
        let mut out = [0u8; PROTOCOL_HEADER_LEN];
        out[0..8].copy_from_slice(&self.reserved.to_le_bytes());
        out[8..10].copy_from_slice(&self.message_type.to_le_bytes());
        out[10..12].copy_from_slice(&self.reserved2.to_le_bytes());
        out
    }

    /// Unpacks the section from its 12-byte wire form.
    pub fn unpack(bytes: &[u8; PROTOCOL_HEADER_LEN]) -> Self {
        let mut reserved_bytes = [0u8; 8];
        reserved_bytes.copy_from_slice(&bytes[0..8]);
        Self {
            reserved: u64::from_le_bytes(reserved_bytes),
            message_type: u16::from_le_bytes([bytes[8], bytes[9]]),
            reserved2: u16::from_le_bytes([bytes[10], bytes[11]]),
        }
    }
}

// ── PacketHeader ──────────────────────────────────────────────────────────────

/// The full 36-byte header: all three sections together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub frame: Frame,
    pub frame_address: FrameAddress,
    pub protocol_header: ProtocolHeader,
}

impl PacketHeader {
    /// Packs all three sections into the 36-byte wire form.
    pub fn pack(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..FRAME_LEN].copy_from_slice(&self.frame.pack());
        out[FRAME_LEN..FRAME_LEN + FRAME_ADDRESS_LEN].copy_from_slice(&self.frame_address.pack());
        out[FRAME_LEN + FRAME_ADDRESS_LEN..].copy_from_slice(&self.protocol_header.pack());
        out
    }

    /// Unpacks all three sections from the 36-byte wire form.
    pub fn unpack(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(&bytes[0..FRAME_LEN]);
        let mut address = [0u8; FRAME_ADDRESS_LEN];
        address.copy_from_slice(&bytes[FRAME_LEN..FRAME_LEN + FRAME_ADDRESS_LEN]);
        let mut protocol = [0u8; PROTOCOL_HEADER_LEN];
        protocol.copy_from_slice(&bytes[FRAME_LEN + FRAME_ADDRESS_LEN..]);
        Self {
            frame: Frame::unpack(&frame),
            frame_address: FrameAddress::unpack(&address),
            protocol_header: ProtocolHeader::unpack(&protocol),
        }
    }

    /// Builds the header for a response to `request`.
    ///
    /// The response echoes the request's `source` and `sequence`, carries the
    /// responding device's own `target` (never the broadcast address), and
    /// writes zero to every reserved field.  `payload_len` is the response
    /// payload size; the `size` field becomes `HEADER_LEN + payload_len`.
    pub fn response_to(
        request: &PacketHeader,
        message_type: u16,
        target: u64,
        payload_len: usize,
    ) -> Self {
        Self {
            frame: Frame {
                size: (HEADER_LEN + payload_len) as u16,
                origin: 0,
                tagged: false,
                addressable: true,
                protocol: PROTOCOL_NUMBER,
                source: request.frame.source,
            },
            frame_address: FrameAddress {
                target,
                reserved: [0; 6],
                reserved2: 0,
                ack_required: false,
                res_required: false,
                sequence: request.frame_address.sequence,
            },
            protocol_header: ProtocolHeader {
                reserved: 0,
                message_type,
                reserved2: 0,
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame() -> Frame {
        Frame {
            size: 49,
            origin: 0,
            tagged: true,
            addressable: true,
            protocol: PROTOCOL_NUMBER,
            source: 0,
        }
    }

    fn make_request_header(message_type: u16) -> PacketHeader {
        PacketHeader {
            frame: Frame {
                size: HEADER_LEN as u16,
                origin: 0,
                tagged: false,
                addressable: true,
                protocol: PROTOCOL_NUMBER,
                source: 0xDEAD_BEEF,
            },
            frame_address: FrameAddress {
                target: 0,
                reserved: [0; 6],
                reserved2: 0,
                ack_required: false,
                res_required: true,
                sequence: 7,
            },
            protocol_header: ProtocolHeader {
                reserved: 0,
                message_type,
                reserved2: 0,
            },
        }
    }

    // ── Frame ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_frame_pack_places_size_in_first_two_bytes_le() {
        let bytes = make_frame().pack();
        assert_eq!(bytes[0], 0x31);
        assert_eq!(bytes[1], 0x00);
    }

    #[test]
    fn test_frame_pack_tagged_addressable_protocol_word() {
        // tagged (bit 13) + addressable (bit 12) + protocol 1024 = 0x3400
        let bytes = make_frame().pack();
        assert_eq!(bytes[2], 0x00);
        assert_eq!(bytes[3], 0x34);
    }

    #[test]
    fn test_frame_pack_untagged_word_drops_bit_13() {
        let frame = Frame {
            tagged: false,
            ..make_frame()
        };
        let bytes = frame.pack();
        assert_eq!(bytes[3], 0x14, "addressable + protocol 1024 = 0x1400");
    }

    #[test]
    fn test_frame_roundtrip_preserves_every_field() {
        let frame = Frame {
            size: 1234,
            origin: 2,
            tagged: true,
            addressable: false,
            protocol: 77,
            source: 0xCAFE_F00D,
        };
        assert_eq!(Frame::unpack(&frame.pack()), frame);
    }

    #[test]
    fn test_frame_origin_occupies_top_two_bits() {
        let frame = Frame {
            origin: 0b11,
            tagged: false,
            addressable: false,
            protocol: 0,
            ..make_frame()
        };
        let bytes = frame.pack();
        assert_eq!(bytes[3], 0b1100_0000);
    }

    // ── FrameAddress ──────────────────────────────────────────────────────────

    #[test]
    fn test_frame_address_flags_byte_packs_ack_and_res_bits() {
        let address = FrameAddress {
            target: 0,
            reserved: [0; 6],
            reserved2: 0,
            ack_required: true,
            res_required: true,
            sequence: 0,
        };
        assert_eq!(address.pack()[14], 0b0000_0011);
    }

    #[test]
    fn test_frame_address_roundtrip_preserves_reserved_bits() {
        let address = FrameAddress {
            target: 0x0000_3412_EFBE_ADDE,
            reserved: [1, 2, 3, 4, 5, 6],
            reserved2: 0b10_1010,
            ack_required: false,
            res_required: true,
            sequence: 200,
        };
        assert_eq!(FrameAddress::unpack(&address.pack()), address);
    }

    #[test]
    fn test_frame_address_target_serializes_little_endian() {
        let address = FrameAddress {
            target: 0x0102_0304_0506_0708,
            reserved: [0; 6],
            reserved2: 0,
            ack_required: false,
            res_required: false,
            sequence: 0,
        };
        let bytes = address.pack();
        assert_eq!(bytes[0], 0x08, "low byte of target first");
        assert_eq!(bytes[7], 0x01);
    }

    // ── ProtocolHeader ────────────────────────────────────────────────────────

    #[test]
    fn test_protocol_header_places_message_type_at_offset_8() {
        let header = ProtocolHeader {
            reserved: 0,
            message_type: 0x0066,
            reserved2: 0,
        };
        let bytes = header.pack();
        assert_eq!(bytes[8], 0x66);
        assert_eq!(bytes[9], 0x00);
    }

    #[test]
    fn test_protocol_header_roundtrip_preserves_reserved_fields() {
        let header = ProtocolHeader {
            reserved: u64::MAX,
            message_type: 102,
            reserved2: 0xBEEF,
        };
        assert_eq!(ProtocolHeader::unpack(&header.pack()), header);
    }

    // ── PacketHeader ──────────────────────────────────────────────────────────

    #[test]
    fn test_packet_header_pack_is_36_bytes_and_roundtrips() {
        let header = make_request_header(21);
        let bytes = header.pack();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(PacketHeader::unpack(&bytes), header);
    }

    #[test]
    fn test_response_to_echoes_source_and_sequence() {
        let request = make_request_header(20);
        let response = PacketHeader::response_to(&request, 22, 0xAA, 2);
        assert_eq!(response.frame.source, 0xDEAD_BEEF);
        assert_eq!(response.frame_address.sequence, 7);
    }

    #[test]
    fn test_response_to_stamps_device_target_and_clears_broadcast() {
        let mut request = make_request_header(20);
        request.frame.tagged = true;
        request.frame_address.target = 0;

        let response = PacketHeader::response_to(&request, 22, 0x0102_0304_0506, 2);

        assert!(!response.frame.tagged);
        assert!(response.frame.addressable);
        assert_eq!(response.frame_address.target, 0x0102_0304_0506);
        assert_eq!(response.frame.protocol, PROTOCOL_NUMBER);
    }

    #[test]
    fn test_response_to_zeroes_reserved_fields_from_dirty_request() {
        let mut request = make_request_header(23);
        request.frame_address.reserved = [9; 6];
        request.frame_address.reserved2 = 0b11_1111;
        request.protocol_header.reserved = 42;
        request.protocol_header.reserved2 = 42;

        let response = PacketHeader::response_to(&request, 25, 1, 32);

        assert_eq!(response.frame_address.reserved, [0; 6]);
        assert_eq!(response.frame_address.reserved2, 0);
        assert_eq!(response.protocol_header.reserved, 0);
        assert_eq!(response.protocol_header.reserved2, 0);
    }

    #[test]
    fn test_response_to_sets_size_to_header_plus_payload() {
        let request = make_request_header(20);
        let response = PacketHeader::response_to(&request, 22, 1, 2);
        assert_eq!(response.frame.size, 38);
    }
}
