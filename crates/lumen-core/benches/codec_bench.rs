//! Criterion benchmarks for the packet codec.
//!
//! Measures encode and decode latency for representative traffic.  A device
//! in a busy installation sees dozens of discovery broadcasts per second, so
//! envelope handling has to stay trivially cheap.
//!
//! Run with:
//! ```bash
//! cargo bench --package lumen-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lumen_core::protocol::codec::{decode_packet, encode_packet, Packet};
use lumen_core::protocol::header::{
    Frame, FrameAddress, PacketHeader, ProtocolHeader, HEADER_LEN, PROTOCOL_NUMBER,
};
use lumen_core::protocol::payloads::{EchoPayload, LightStatePayload, SetColorPayload};
use lumen_core::{DeviceLabel, Hsbk};

// ── Packet fixtures ───────────────────────────────────────────────────────────

fn make_header(message_type: u16, payload_len: usize) -> PacketHeader {
    PacketHeader {
        frame: Frame {
            size: (HEADER_LEN + payload_len) as u16,
            origin: 0,
            tagged: true,
            addressable: true,
            protocol: PROTOCOL_NUMBER,
            source: 42,
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

fn make_get_service() -> Packet {
    Packet {
        header: make_header(2, 0),
        payload: Vec::new(),
    }
}

fn make_set_color() -> Packet {
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
    Packet {
        header: make_header(102, payload.len()),
        payload,
    }
}

fn make_light_state() -> Packet {
    let mut payload = Vec::new();
    LightStatePayload {
        color: Hsbk {
            hue: 1000,
            saturation: 0,
            brightness: u16::MAX,
            kelvin: 2700,
        },
        dim: 0,
        power: u16::MAX,
        label: DeviceLabel::new("Benchmark Bulb"),
        tags: 0,
    }
    .write_into(&mut payload);
    Packet {
        header: make_header(107, payload.len()),
        payload,
    }
}

fn make_echo() -> Packet {
    let mut payload = Vec::new();
    EchoPayload { bytes: [0xA5; 64] }.write_into(&mut payload);
    Packet {
        header: make_header(58, payload.len()),
        payload,
    }
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `encode_packet` across the traffic mix.
fn bench_encode(c: &mut Criterion) {
    let packets: &[(&str, Packet)] = &[
        ("GetService", make_get_service()),
        ("LightSetColor", make_set_color()),
        ("LightState", make_light_state()),
        ("Echo(64)", make_echo()),
    ];

    let mut group = c.benchmark_group("encode_packet");
    for (name, packet) in packets {
        group.bench_with_input(BenchmarkId::new("msg", name), packet, |b, packet| {
            b.iter(|| encode_packet(black_box(packet)))
        });
    }
    group.finish();
}

/// Benchmarks `decode_packet` from pre-encoded bytes.
fn bench_decode(c: &mut Criterion) {
    let packets: &[(&str, Packet)] = &[
        ("GetService", make_get_service()),
        ("LightSetColor", make_set_color()),
        ("LightState", make_light_state()),
        ("Echo(64)", make_echo()),
    ];

    let mut group = c.benchmark_group("decode_packet");
    for (name, packet) in packets {
        let bytes = encode_packet(packet);
        group.bench_with_input(BenchmarkId::new("msg", name), &bytes, |b, bytes| {
            b.iter(|| decode_packet(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks the header pack/unpack hot path on its own.
fn bench_header(c: &mut Criterion) {
    let header = make_header(102, 13);

    let mut group = c.benchmark_group("header");
    group.bench_function("pack", |b| b.iter(|| black_box(&header).pack()));

    let bytes = header.pack();
    group.bench_function("unpack", |b| {
        b.iter(|| PacketHeader::unpack(black_box(&bytes)))
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_header);
criterion_main!(benches);
