//! Domain entities for the Lumen emulator.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from OS APIs, network libraries, database drivers,
//!   or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//! - Defines the data types and operations that make the system uniquely
//!   what it is: in this case, the idea of one emulated bulb whose power,
//!   color, and naming can be read and mutated by wire requests.
//!
//! Code in outer layers (infrastructure, application, the binary) depends on
//! the domain, but the domain never depends on them.  This makes the domain
//! easy to unit-test in isolation.

/// Color representation and the white-point conversion used by light drivers.
pub mod color;

/// The emulated device — the core domain concept.
///
/// See [`device::DeviceState`] for the main type.
pub mod device;
