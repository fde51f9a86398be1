//! Typed payload structs for every message that carries one.
//!
//! Each struct knows its fixed wire size, how to read itself from a payload
//! slice (`read`), and how to append itself to an outgoing buffer
//! (`write_into`).  All integers little-endian, matching the header.
//!
//! `read` checks length with [`require_len`] and reports short buffers as
//! [`WireError::MalformedPayload`]; extra trailing bytes are tolerated, the
//! way real firmware treats them.  `write_into` cannot fail.

use crate::domain::color::Hsbk;
use crate::domain::device::{DeviceLabel, LABEL_LEN};
use crate::protocol::codec::{read_u16, read_u32, read_u64, require_len, WireError};

/// Default port devices listen on and advertise in StateService.
pub const PROTOCOL_PORT: u16 = 56700;

/// Echo payloads are exactly this many bytes.
pub const ECHO_LEN: usize = 64;

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Transport a StateService reply advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Service {
    Udp = 1,
    Tcp = 2,
}

impl TryFrom<u8> for Service {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Service::Udp),
            2 => Ok(Service::Tcp),
            other => Err(other),
        }
    }
}

/// StateService (3): one advertised transport and the port it listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateServicePayload {
    pub service: Service,
    pub port: u32,
}

impl StateServicePayload {
    pub const WIRE_LEN: usize = 5;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "StateService")?;
        let service = Service::try_from(payload[0]).map_err(|code| {
            WireError::MalformedPayload(format!("StateService: unknown service code {code}"))
        })?;
        Ok(Self {
            service,
            port: read_u32(payload, 1),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.service as u8);
        buf.extend_from_slice(&self.port.to_le_bytes());
    }
}

// ── Firmware ──────────────────────────────────────────────────────────────────

/// StateHostFirmware (15) and StateWifiFirmware (19): build/install stamps
/// and the version pair, minor before major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFirmwarePayload {
    pub build: u64,
    pub install: u64,
    pub version_minor: u16,
    pub version_major: u16,
}

impl StateFirmwarePayload {
    pub const WIRE_LEN: usize = 20;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "StateFirmware")?;
        Ok(Self {
            build: read_u64(payload, 0),
            install: read_u64(payload, 8),
            version_minor: read_u16(payload, 16),
            version_major: read_u16(payload, 18),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.build.to_le_bytes());
        buf.extend_from_slice(&self.install.to_le_bytes());
        buf.extend_from_slice(&self.version_minor.to_le_bytes());
        buf.extend_from_slice(&self.version_major.to_le_bytes());
    }
}

// ── Power ─────────────────────────────────────────────────────────────────────

/// SetPower (21), StatePower (22), and LightStatePower (118): one level.
/// 0 is off, 65535 is on; anything between is stored as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerPayload {
    pub level: u16,
}

impl PowerPayload {
    pub const WIRE_LEN: usize = 2;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "Power")?;
        Ok(Self {
            level: read_u16(payload, 0),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.level.to_le_bytes());
    }
}

/// LightSetPower (117): level plus a fade duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSetPowerPayload {
    pub level: u16,
    pub duration_ms: u32,
}

impl LightSetPowerPayload {
    pub const WIRE_LEN: usize = 6;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "LightSetPower")?;
        Ok(Self {
            level: read_u16(payload, 0),
            duration_ms: read_u32(payload, 2),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.level.to_le_bytes());
        buf.extend_from_slice(&self.duration_ms.to_le_bytes());
    }
}

// ── Labels and collections ────────────────────────────────────────────────────

/// SetLabel (24) and StateLabel (25): the fixed 32-byte label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPayload {
    pub label: DeviceLabel,
}

impl LabelPayload {
    pub const WIRE_LEN: usize = LABEL_LEN;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "Label")?;
        let mut raw = [0u8; LABEL_LEN];
        raw.copy_from_slice(&payload[..LABEL_LEN]);
        Ok(Self {
            label: DeviceLabel::from_bytes(raw),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.label.as_bytes());
    }
}

/// SetLocation (49), StateLocation (50), SetGroup (52), StateGroup (53):
/// 16-byte collection id, label, and update timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPayload {
    pub id: [u8; 16],
    pub label: DeviceLabel,
    pub updated_at: u64,
}

impl CollectionPayload {
    pub const WIRE_LEN: usize = 16 + LABEL_LEN + 8;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "Collection")?;
        let mut id = [0u8; 16];
        id.copy_from_slice(&payload[..16]);
        let mut raw_label = [0u8; LABEL_LEN];
        raw_label.copy_from_slice(&payload[16..16 + LABEL_LEN]);
        Ok(Self {
            id,
            label: DeviceLabel::from_bytes(raw_label),
            updated_at: read_u64(payload, 16 + LABEL_LEN),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.id);
        buf.extend_from_slice(self.label.as_bytes());
        buf.extend_from_slice(&self.updated_at.to_le_bytes());
    }
}

// ── Version ───────────────────────────────────────────────────────────────────

/// StateVersion (33): the vendor/product/version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateVersionPayload {
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
}

impl StateVersionPayload {
    pub const WIRE_LEN: usize = 12;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "StateVersion")?;
        Ok(Self {
            vendor: read_u32(payload, 0),
            product: read_u32(payload, 4),
            version: read_u32(payload, 8),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.vendor.to_le_bytes());
        buf.extend_from_slice(&self.product.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
    }
}

// ── Echo ──────────────────────────────────────────────────────────────────────

/// EchoRequest (58) and EchoResponse (59): 64 opaque bytes returned verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoPayload {
    pub bytes: [u8; ECHO_LEN],
}

impl EchoPayload {
    pub const WIRE_LEN: usize = ECHO_LEN;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "Echo")?;
        let mut bytes = [0u8; ECHO_LEN];
        bytes.copy_from_slice(&payload[..ECHO_LEN]);
        Ok(Self { bytes })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.bytes);
    }
}

// ── Light ─────────────────────────────────────────────────────────────────────

/// LightSetColor (102): reserved byte, the four HSBK channels, and a fade
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetColorPayload {
    pub reserved: u8,
    pub color: Hsbk,
    pub duration_ms: u32,
}

impl SetColorPayload {
    pub const WIRE_LEN: usize = 13;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "LightSetColor")?;
        Ok(Self {
            reserved: payload[0],
            color: Hsbk {
                hue: read_u16(payload, 1),
                saturation: read_u16(payload, 3),
                brightness: read_u16(payload, 5),
                kelvin: read_u16(payload, 7),
            },
            duration_ms: read_u32(payload, 9),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.reserved);
        buf.extend_from_slice(&self.color.hue.to_le_bytes());
        buf.extend_from_slice(&self.color.saturation.to_le_bytes());
        buf.extend_from_slice(&self.color.brightness.to_le_bytes());
        buf.extend_from_slice(&self.color.kelvin.to_le_bytes());
        buf.extend_from_slice(&self.duration_ms.to_le_bytes());
    }
}

/// LightState (107): the full visible state in one reply.
///
/// `dim` and `tags` are legacy fields; we always send zero and preserve
/// whatever we read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightStatePayload {
    pub color: Hsbk,
    pub dim: i16,
    pub power: u16,
    pub label: DeviceLabel,
    pub tags: u64,
}

impl LightStatePayload {
    pub const WIRE_LEN: usize = 8 + 2 + 2 + LABEL_LEN + 8;

    pub fn read(payload: &[u8]) -> Result<Self, WireError> {
        require_len(payload, Self::WIRE_LEN, "LightState")?;
        let mut raw_label = [0u8; LABEL_LEN];
        raw_label.copy_from_slice(&payload[12..12 + LABEL_LEN]);
        Ok(Self {
            color: Hsbk {
                hue: read_u16(payload, 0),
                saturation: read_u16(payload, 2),
                brightness: read_u16(payload, 4),
                kelvin: read_u16(payload, 6),
            },
            dim: read_u16(payload, 8) as i16,
            power: read_u16(payload, 10),
            label: DeviceLabel::from_bytes(raw_label),
            tags: read_u64(payload, 12 + LABEL_LEN),
        })
    }

    pub fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.color.hue.to_le_bytes());
        buf.extend_from_slice(&self.color.saturation.to_le_bytes());
        buf.extend_from_slice(&self.color.brightness.to_le_bytes());
        buf.extend_from_slice(&self.color.kelvin.to_le_bytes());
        buf.extend_from_slice(&self.dim.to_le_bytes());
        buf.extend_from_slice(&self.power.to_le_bytes());
        buf.extend_from_slice(self.label.as_bytes());
        buf.extend_from_slice(&self.tags.to_le_bytes());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
