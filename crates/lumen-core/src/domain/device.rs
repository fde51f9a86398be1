//! The emulated device entity.
//!
//! One [`DeviceState`] value holds everything a controller can observe or
//! mutate: power, color, label, location, group, plus the read-only identity
//! and firmware descriptors.  The request dispatcher owns the single
//! instance; nothing here is globally shared or internally locked.
//!
//! Physical output is decoupled behind the [`LightDriver`] hook: the state
//! calls it exactly once per *distinct* power or color change, so drivers
//! never see redundant updates and tests can count notifications.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::color::Hsbk;

/// Label fields on the wire are exactly this many bytes, NUL-padded.
pub const LABEL_LEN: usize = 32;

/// Label a device reports before anyone renames it.
pub const DEFAULT_LABEL: &str = "Lumen Bulb";

/// Vendor id reported in StateVersion.
pub const DEFAULT_VENDOR: u32 = 1;
/// Product id reported in StateVersion.
pub const DEFAULT_PRODUCT: u32 = 1;
/// Hardware version reported in StateVersion.
pub const DEFAULT_HARDWARE_VERSION: u32 = 1;

// ── Labels ────────────────────────────────────────────────────────────────────

/// A fixed 32-byte, NUL-padded label.
///
/// Construction from text truncates to the wire size without splitting a
/// UTF-8 character; construction from wire bytes takes them as-is.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceLabel([u8; LABEL_LEN]);

impl DeviceLabel {
    /// Wire size of a label field.
    pub const LEN: usize = LABEL_LEN;

    /// Builds a label from text, truncating to 32 bytes on a character
    /// boundary.
    pub fn new(text: &str) -> Self {
        let mut end = text.len().min(LABEL_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut raw = [0u8; LABEL_LEN];
        raw[..end].copy_from_slice(&text.as_bytes()[..end]);
        Self(raw)
    }

    /// Wraps raw wire bytes unchanged.
    pub fn from_bytes(raw: [u8; LABEL_LEN]) -> Self {
        Self(raw)
    }

    /// The raw 32 wire bytes.
    pub fn as_bytes(&self) -> &[u8; LABEL_LEN] {
        &self.0
    }

    /// The label as text: everything before the first NUL, lossily decoded.
    pub fn to_text(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(LABEL_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl fmt::Debug for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceLabel({:?})", self.to_text())
    }
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// ── Identity and descriptors ──────────────────────────────────────────────────

/// Read-only identity: the wire target plus the StateVersion triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Wire target address; the 6-byte serial occupies the low bytes.
    pub target: u64,
    /// Vendor id.
    pub vendor: u32,
    /// Product id.
    pub product: u32,
    /// Hardware version.
    pub version: u32,
}

impl DeviceIdentity {
    /// Builds an identity from a 6-byte serial (usually the MAC address),
    /// with the default vendor/product/version triple.
    pub fn from_serial(serial: [u8; 6]) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..6].copy_from_slice(&serial);
        Self {
            target: u64::from_le_bytes(bytes),
            vendor: DEFAULT_VENDOR,
            product: DEFAULT_PRODUCT,
            version: DEFAULT_HARDWARE_VERSION,
        }
    }
}

/// Build/install stamps and version for one firmware image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareInfo {
    /// Build timestamp, nanoseconds since the epoch.
    pub build: u64,
    /// Install timestamp, nanoseconds since the epoch.
    pub install: u64,
    pub version_major: u16,
    pub version_minor: u16,
}

impl FirmwareInfo {
    /// Host (MCU) firmware descriptor: version 1.5 with the build/install
    /// stamps advertised by production devices on that release.
    pub fn host_default() -> Self {
        Self {
            build: 0x1386_30EF_8BC3_2E00,
            install: 0x138B_8169_4576_25E0,
            version_major: 1,
            version_minor: 5,
        }
    }

    /// Wifi module firmware descriptor, same release.
    pub fn wifi_default() -> Self {
        Self {
            build: 0x1386_5199_315E_C800,
            install: 0x43D9_4648_0007_0CC0,
            version_major: 1,
            version_minor: 5,
        }
    }
}

/// Membership in a named collection (location or group): opaque 16-byte id,
/// label, and the timestamp of the last rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectionRef {
    pub id: [u8; 16],
    pub label: DeviceLabel,
    /// Nanoseconds since the epoch at the last update, as sent by the
    /// controller that performed it.
    pub updated_at: u64,
}

// ── Light driver hook ─────────────────────────────────────────────────────────

/// Receives every distinct change to the visible output.
///
/// Implementations render the light however they like (the emulator logs a
/// simulated bulb; real hardware would drive LEDs).  Calls arrive on the
/// dispatch thread, at most once per state-changing request.
pub trait LightDriver: Send + Sync {
    /// The device's color or power just changed to these values.
    fn light_changed(&self, color: Hsbk, power: u16);
}

/// Driver that ignores every change.  Useful for wiring and tests.
pub struct NoopLight;

impl LightDriver for NoopLight {
    fn light_changed(&self, _color: Hsbk, _power: u16) {}
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// Serializable image of one collection membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub id: Uuid,
    pub label: String,
    pub updated_at: u64,
}

/// Serializable image of the fields worth persisting across restarts.
///
/// Power and color are deliberately absent: a light that reboots comes back
/// in its default state, but it must keep its name and its place in the
/// user's location/group hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub label: String,
    pub location: CollectionSnapshot,
    pub group: CollectionSnapshot,
}

// ── Device state ──────────────────────────────────────────────────────────────

/// The single mutable state of the emulated device.
///
/// Owned by the dispatcher; mutated only through the setters, which report
/// whether anything actually changed and drive the [`LightDriver`] hook and
/// the settings-dirty flag accordingly.
pub struct DeviceState {
    power: u16,
    color: Hsbk,
    label: DeviceLabel,
    location: CollectionRef,
    group: CollectionRef,
    identity: DeviceIdentity,
    host_firmware: FirmwareInfo,
    wifi_firmware: FirmwareInfo,
    driver: Arc<dyn LightDriver>,
    settings_dirty: bool,
}

impl DeviceState {
    /// Creates a device in its factory state: powered on, warm white
    /// (kelvin 2000, full brightness), default label, empty location and
    /// group, firmware 1.5.
    pub fn new(identity: DeviceIdentity, driver: Arc<dyn LightDriver>) -> Self {
        Self {
            power: u16::MAX,
            color: Hsbk {
                hue: 0,
                saturation: 0,
                brightness: u16::MAX,
                kelvin: 2000,
            },
            label: DeviceLabel::new(DEFAULT_LABEL),
            location: CollectionRef::default(),
            group: CollectionRef::default(),
            identity,
            host_firmware: FirmwareInfo::host_default(),
            wifi_firmware: FirmwareInfo::wifi_default(),
            driver,
            settings_dirty: false,
        }
    }

    pub fn power(&self) -> u16 {
        self.power
    }

    pub fn color(&self) -> Hsbk {
        self.color
    }

    pub fn label(&self) -> DeviceLabel {
        self.label
    }

    pub fn location(&self) -> CollectionRef {
        self.location
    }

    pub fn group(&self) -> CollectionRef {
        self.group
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn host_firmware(&self) -> FirmwareInfo {
        self.host_firmware
    }

    pub fn wifi_firmware(&self) -> FirmwareInfo {
        self.wifi_firmware
    }

    /// Sets the power level.  Returns `true` and notifies the driver only
    /// when the level actually changed.
    pub fn set_power(&mut self, level: u16) -> bool {
        if self.power == level {
            return false;
        }
        self.power = level;
        self.driver.light_changed(self.color, self.power);
        true
    }

    /// Sets the color.  Returns `true` and notifies the driver only when at
    /// least one channel actually changed.
    pub fn set_color(&mut self, color: Hsbk) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color;
        self.driver.light_changed(self.color, self.power);
        true
    }

    /// Renames the device.  Marks the settings-dirty flag on change; never
    /// touches the driver.
    pub fn set_label(&mut self, label: DeviceLabel) -> bool {
        if self.label == label {
            return false;
        }
        self.label = label;
        self.settings_dirty = true;
        true
    }

    /// Moves the device to a location.  Marks the settings-dirty flag on
    /// change.
    pub fn set_location(&mut self, location: CollectionRef) -> bool {
        if self.location == location {
            return false;
        }
        self.location = location;
        self.settings_dirty = true;
        true
    }

    /// Moves the device to a group.  Marks the settings-dirty flag on
    /// change.
    pub fn set_group(&mut self, group: CollectionRef) -> bool {
        if self.group == group {
            return false;
        }
        self.group = group;
        self.settings_dirty = true;
        true
    }

    /// Reads and clears the settings-dirty flag.  A persistence collaborator
    /// polls this after each handled request and writes [`Self::snapshot`]
    /// back when it returns `true`.
    pub fn take_settings_dirty(&mut self) -> bool {
        std::mem::take(&mut self.settings_dirty)
    }

    /// Captures the persistable fields.
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            label: self.label.to_text(),
            location: CollectionSnapshot {
                id: Uuid::from_bytes(self.location.id),
                label: self.location.label.to_text(),
                updated_at: self.location.updated_at,
            },
            group: CollectionSnapshot {
                id: Uuid::from_bytes(self.group.id),
                label: self.group.label.to_text(),
                updated_at: self.group.updated_at,
            },
        }
    }

    /// Applies a previously captured snapshot.
    ///
    /// This is initialization, not a controller request: the driver is not
    /// notified and the settings-dirty flag stays clear.
    pub fn restore(&mut self, snapshot: &DeviceSnapshot) {
        self.label = DeviceLabel::new(&snapshot.label);
        self.location = CollectionRef {
            id: *snapshot.location.id.as_bytes(),
            label: DeviceLabel::new(&snapshot.location.label),
            updated_at: snapshot.location.updated_at,
        };
        self.group = CollectionRef {
            id: *snapshot.group.id.as_bytes(),
            label: DeviceLabel::new(&snapshot.group.label),
            updated_at: snapshot.group.updated_at,
        };
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
