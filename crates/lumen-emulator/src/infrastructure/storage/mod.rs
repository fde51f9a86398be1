//! Storage infrastructure: settings file persistence.
//!
//! This module provides a thin adapter between the emulator and the file
//! system.  The `settings` sub-module handles:
//!
//! - Reading the TOML settings file from the platform-appropriate directory.
//! - Writing the device snapshot back whenever a controller renames the
//!   device or moves it between locations/groups.
//! - Providing sensible defaults when the file does not exist yet (first run).
//!
//! Keeping storage concerns here — rather than scattered throughout the
//! application — means the file format can change without touching any
//! other part of the codebase.

pub mod settings;
