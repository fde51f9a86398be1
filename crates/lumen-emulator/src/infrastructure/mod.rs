//! Infrastructure layer for the emulator.
//!
//! Contains OS-facing adapters: UDP/TCP socket services, the simulated
//! light driver, and file-system settings storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `lumen_core`, but MUST NOT be imported by the domain layer.

pub mod light;
pub mod network;
pub mod storage;
