//! TOML-based settings persistence for the emulator.
//!
//! Reads and writes `EmulatorSettings` to the platform-appropriate file:
//! - Windows:  `%APPDATA%\Lumen\emulator.toml`
//! - Linux:    `~/.config/lumen/emulator.toml`
//! - macOS:    `~/Library/Application Support/Lumen/emulator.toml`
//!
//! Example file:
//!
//! ```toml
//! [device]
//! label = "Porch"
//! mac = "d0:73:d5:01:02:03"
//!
//! [network]
//! port = 56700
//! tcp_enabled = true
//!
//! [emulator]
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return
//! value of `some_fn()` when the field is absent from the TOML file.  This
//! allows the emulator to work correctly on first run (before a settings
//! file exists) and when upgrading from an older file that is missing newer
//! fields.
//!
//! The optional `[state]` table is the persisted [`DeviceSnapshot`]: the
//! label, location, and group the device must keep across restarts.  It is
//! absent until the first controller-driven rename.

use std::path::PathBuf;

use lumen_core::{DeviceSnapshot, MAX_PACKET_LEN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configured MAC address is not six colon-separated hex bytes.
    #[error("invalid MAC address {0:?}: expected six colon-separated hex bytes")]
    InvalidMac(String),
}

// ── Settings schema types ─────────────────────────────────────────────────────

/// Top-level emulator settings stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmulatorSettings {
    pub device: DeviceSettings,
    pub network: NetworkSettings,
    pub emulator: EmulatorSection,
    /// Persisted device snapshot, written back after every label/location/
    /// group change.  Absent on a factory-fresh install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DeviceSnapshot>,
}

/// The emulated device's fixed identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSettings {
    /// Label reported until a controller renames the device.
    #[serde(default = "default_label")]
    pub label: String,
    /// MAC address; its six bytes become the wire serial.
    #[serde(default = "default_mac")]
    pub mac: String,
    /// Vendor id reported in StateVersion.
    #[serde(default = "default_one")]
    pub vendor: u32,
    /// Product id reported in StateVersion.
    #[serde(default = "default_one")]
    pub product: u32,
    /// Hardware version reported in StateVersion.
    #[serde(default = "default_one")]
    pub version: u32,
}

/// Network bind settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSettings {
    /// IP address to bind both sockets to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port for both the UDP socket and the TCP listener.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether to run the TCP listener alongside UDP.
    #[serde(default = "default_true")]
    pub tcp_enabled: bool,
    /// Largest packet accepted on either transport.
    #[serde(default = "default_max_packet_len")]
    pub max_packet_len: usize,
}

/// General emulator behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmulatorSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_label() -> String {
    lumen_core::domain::device::DEFAULT_LABEL.to_string()
}
fn default_mac() -> String {
    "d0:73:d5:01:02:03".to_string()
}
fn default_one() -> u32 {
    1
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    lumen_core::protocol::payloads::PROTOCOL_PORT
}
fn default_true() -> bool {
    true
}
fn default_max_packet_len() -> usize {
    MAX_PACKET_LEN
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            network: NetworkSettings::default(),
            emulator: EmulatorSection::default(),
            state: None,
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            label: default_label(),
            mac: default_mac(),
            vendor: default_one(),
            product: default_one(),
            version: default_one(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            tcp_enabled: default_true(),
            max_packet_len: default_max_packet_len(),
        }
    }
}

impl Default for EmulatorSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn settings_dir() -> Result<PathBuf, SettingsError> {
    platform_config_dir().ok_or(SettingsError::NoPlatformConfigDir)
}

/// Resolves the full path to the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] if the base directory
/// cannot be determined.
pub fn settings_file_path() -> Result<PathBuf, SettingsError> {
    Ok(settings_dir()?.join("emulator.toml"))
}

/// Loads `EmulatorSettings` from disk, returning the defaults if the file
/// does not yet exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system errors other than "not
/// found", and [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings() -> Result<EmulatorSettings, SettingsError> {
    let path = settings_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let settings: EmulatorSettings = toml::from_str(&content)?;
            Ok(settings)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EmulatorSettings::default()),
        Err(e) => Err(SettingsError::Io { path, source: e }),
    }
}

/// Persists `settings` to disk.
///
/// Creates the settings directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system failures or
/// [`SettingsError::Serialize`] if serialization fails.
pub fn save_settings(settings: &EmulatorSettings) -> Result<(), SettingsError> {
    let path = settings_file_path()?;

    // Ensure directory exists before writing.
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(&path, content).map_err(|source| SettingsError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Parses a `aa:bb:cc:dd:ee:ff` MAC string into the six serial bytes.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidMac`] unless the string is exactly six
/// colon-separated hex bytes.
pub fn parse_mac(mac: &str) -> Result<[u8; 6], SettingsError> {
    let invalid = || SettingsError::InvalidMac(mac.to_string());

    let mut serial = [0u8; 6];
    let mut parts = mac.split(':');
    for byte in serial.iter_mut() {
        let part = parts.next().ok_or_else(invalid)?;
        if part.len() != 2 {
            return Err(invalid());
        }
        *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(serial)
}

/// Resolves the platform config base directory without the `Lumen` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Lumen"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lumen"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/Lumen
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Lumen")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
