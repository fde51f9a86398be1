//! Integration tests for the packet codec.
//!
//! These exercise the public API of lumen-core end-to-end: header structs +
//! payload structs + codec, including a byte-exact golden vector captured
//! from a real controller's LightSetColor broadcast.

use lumen_core::protocol::codec::{decode_packet, encode_packet, Packet};
use lumen_core::protocol::header::{
    Frame, FrameAddress, PacketHeader, ProtocolHeader, HEADER_LEN, PROTOCOL_NUMBER,
};
use lumen_core::protocol::payloads::{
    CollectionPayload, EchoPayload, LightStatePayload, SetColorPayload, StateFirmwarePayload,
    StateServicePayload, Service, PROTOCOL_PORT,
};
use lumen_core::protocol::registry::classify;
use lumen_core::{DeviceLabel, Hsbk};

/// A tagged LightSetColor broadcast: source 0, sequence 0, hue 21845,
/// saturation and brightness full, kelvin 3500, duration 1024 ms.
const GOLDEN_SET_COLOR: [u8; 49] = [
    // Frame: size 49, origin 0 | tagged | addressable | protocol 1024, source 0
    0x31, 0x00, 0x00, 0x34, 0x00, 0x00, 0x00, 0x00,
    // FrameAddress: broadcast target, reserved, flags 0, sequence 0
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // ProtocolHeader: reserved, type 102, reserved
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x66, 0x00, 0x00, 0x00,
    // Payload: reserved, HSBK, duration
    0x00, 0x55, 0x55, 0xFF, 0xFF, 0xFF, 0xFF, 0xAC, 0x0D, 0x00, 0x04, 0x00, 0x00,
];

fn broadcast_header(message_type: u16, payload_len: usize) -> PacketHeader {
    PacketHeader {
        frame: Frame {
            size: (HEADER_LEN + payload_len) as u16,
            origin: 0,
            tagged: true,
            addressable: true,
            protocol: PROTOCOL_NUMBER,
            source: 0,
        },
        frame_address: FrameAddress {
            target: 0,
            reserved: [0; 6],
            reserved2: 0,
            ack_required: false,
            res_required: false,
            sequence: 0,
        },
        protocol_header: ProtocolHeader {
            reserved: 0,
            message_type,
            reserved2: 0,
        },
    }
}

fn roundtrip(packet: &Packet) -> Packet {
    decode_packet(&encode_packet(packet)).expect("encoded packet must decode")
}

// ── Golden vector ─────────────────────────────────────────────────────────────

#[test]
fn test_golden_set_color_encodes_byte_identically() {
    let mut payload = Vec::new();
    SetColorPayload {
        reserved: 0,
        color: Hsbk {
            hue: 21845,
            saturation: u16::MAX,
            brightness: u16::MAX,
            kelvin: 3500,
        },
        duration_ms: 1024,
    }
    .write_into(&mut payload);

    let packet = Packet {
        header: broadcast_header(102, payload.len()),
        payload,
    };

    assert_eq!(encode_packet(&packet), GOLDEN_SET_COLOR);
}

#[test]
fn test_golden_set_color_decodes_to_expected_fields() {
    let packet = decode_packet(&GOLDEN_SET_COLOR).expect("golden vector is valid");

    assert_eq!(packet.header.frame.size, 49);
    assert!(packet.header.frame.tagged);
    assert!(packet.header.frame.addressable);
    assert_eq!(packet.header.frame.protocol, PROTOCOL_NUMBER);
    assert_eq!(packet.header.frame_address.target, 0);
    assert_eq!(packet.message_type(), 102);

    let color = SetColorPayload::read(&packet.payload).expect("payload is well-formed");
    assert_eq!(color.color.hue, 21845);
    assert_eq!(color.color.kelvin, 3500);
    assert_eq!(color.duration_ms, 1024);
}

#[test]
fn test_golden_set_color_survives_decode_encode_cycle() {
    let packet = decode_packet(&GOLDEN_SET_COLOR).expect("golden vector is valid");
    assert_eq!(encode_packet(&packet), GOLDEN_SET_COLOR);
}

// ── Payloads through full packets ─────────────────────────────────────────────

#[test]
fn test_state_service_advert_roundtrips_through_a_packet() {
    let mut payload = Vec::new();
    StateServicePayload {
        service: Service::Udp,
        port: u32::from(PROTOCOL_PORT),
    }
    .write_into(&mut payload);

    let packet = Packet {
        header: broadcast_header(3, payload.len()),
        payload,
    };
    let decoded = roundtrip(&packet);

    assert_eq!(decoded.header.frame.size, 41);
    let advert = StateServicePayload::read(&decoded.payload).expect("well-formed");
    assert_eq!(advert.service, Service::Udp);
    assert_eq!(advert.port, 56700);
}

#[test]
fn test_light_state_roundtrips_through_a_packet() {
    let mut payload = Vec::new();
    LightStatePayload {
        color: Hsbk {
            hue: 1000,
            saturation: 2000,
            brightness: 3000,
            kelvin: 4000,
        },
        dim: 0,
        power: u16::MAX,
        label: DeviceLabel::new("Reading Lamp"),
        tags: 0,
    }
    .write_into(&mut payload);

    let packet = Packet {
        header: broadcast_header(107, payload.len()),
        payload,
    };
    let decoded = roundtrip(&packet);

    let state = LightStatePayload::read(&decoded.payload).expect("well-formed");
    assert_eq!(state.label.to_text(), "Reading Lamp");
    assert_eq!(state.power, u16::MAX);
    assert_eq!(decoded.wire_size(), 88);
}

#[test]
fn test_collection_roundtrips_through_a_packet() {
    let mut payload = Vec::new();
    CollectionPayload {
        id: [0x42; 16],
        label: DeviceLabel::new("Loft"),
        updated_at: 1_724_000_000_000_000_000,
    }
    .write_into(&mut payload);

    let packet = Packet {
        header: broadcast_header(50, payload.len()),
        payload,
    };
    let decoded = roundtrip(&packet);

    let collection = CollectionPayload::read(&decoded.payload).expect("well-formed");
    assert_eq!(collection.id, [0x42; 16]);
    assert_eq!(collection.label.to_text(), "Loft");
}

#[test]
fn test_firmware_payload_roundtrips_through_a_packet() {
    let mut payload = Vec::new();
    StateFirmwarePayload {
        build: 0x1386_30EF_8BC3_2E00,
        install: 0x138B_8169_4576_25E0,
        version_minor: 5,
        version_major: 1,
    }
    .write_into(&mut payload);

    let packet = Packet {
        header: broadcast_header(15, payload.len()),
        payload,
    };
    let decoded = roundtrip(&packet);

    let firmware = StateFirmwarePayload::read(&decoded.payload).expect("well-formed");
    assert_eq!(firmware.version_major, 1);
    assert_eq!(firmware.version_minor, 5);
    assert_eq!(decoded.header.frame.size, 56);
}

#[test]
fn test_echo_payload_makes_a_100_byte_packet() {
    let mut payload = Vec::new();
    EchoPayload { bytes: [0xA5; 64] }.write_into(&mut payload);

    let packet = Packet {
        header: broadcast_header(58, payload.len()),
        payload,
    };
    let bytes = encode_packet(&packet);

    assert_eq!(bytes.len(), 100);
    assert!(decode_packet(&bytes).is_ok(), "100 bytes sits under the 128 ceiling");
}

// ── Classification of decoded traffic ─────────────────────────────────────────

#[test]
fn test_decoded_unknown_code_classifies_as_unknown() {
    let packet = Packet {
        header: broadcast_header(701, 0),
        payload: Vec::new(),
    };
    let decoded = roundtrip(&packet);

    let classification = classify(decoded.message_type());
    assert_eq!(classification.name, "unknown");
    assert!(!classification.is_request);
}
