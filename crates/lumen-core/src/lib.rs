//! # lumen-core
//!
//! Shared library for the Lumen light emulator containing the LAN wire
//! protocol, the message registry, and the mutable device state model.
//!
//! This crate is used by the emulator binary and by anything else that wants
//! to speak the protocol (test harnesses, future controller tooling).
//! It has zero dependencies on OS APIs, network sockets, or the filesystem.
//!
//! # Architecture overview (for beginners)
//!
//! Smart lights on this LAN protocol are controlled by short binary packets:
//! a controller app broadcasts a request ("what services do you offer?",
//! "set your color to blue over 1024 ms") and the bulb answers with one or
//! more response packets.  Every packet starts with the same 36-byte header
//! and carries a small fixed-shape payload after it.
//!
//! This crate (`lumen-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  The 36-byte header
//!   (three sections: Frame, FrameAddress, ProtocolHeader), the registry of
//!   message type codes, the typed payload structs, and the codec that turns
//!   raw buffers into [`protocol::codec::Packet`] values and back.
//!
//! - **`domain`** – Pure business logic with no OS dependencies.  The most
//!   important piece is [`domain::device::DeviceState`]: the single owned
//!   value holding power, color, label, location, and group, which notifies
//!   an injected [`domain::device::LightDriver`] whenever the visible output
//!   actually changes.
//!
//! Everything here is synchronous and allocation-light; the emulator crate
//! wraps it in sockets, threads, and persistence.

// Declare the two top-level modules.  Rust will look for each in a
// subdirectory with the same name (e.g., src/protocol/mod.rs).
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `lumen_core::DeviceState` instead of `lumen_core::domain::device::DeviceState`.
pub use domain::device::{
    CollectionRef, DeviceIdentity, DeviceLabel, DeviceSnapshot, DeviceState, FirmwareInfo,
    LightDriver, NoopLight,
};
pub use domain::color::{display_levels, DisplayLevels, Hsbk};
pub use protocol::codec::{
    decode_packet, decode_packet_bounded, encode_packet, Packet, WireError, MAX_PACKET_LEN,
};
pub use protocol::header::{Frame, FrameAddress, PacketHeader, ProtocolHeader, HEADER_LEN};
pub use protocol::registry::{classify, Classification, MessageKind};
