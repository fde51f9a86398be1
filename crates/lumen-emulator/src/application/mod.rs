//! Application layer use cases for the emulator.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules) and the infrastructure (OS/network/storage).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a goal (e.g., "answer this
//!   request packet with the correct state replies").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the infrastructure can be swapped without changing this code.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – Receives decoded-from-the-wire request buffers and
//!   turns each into zero or more response buffers.  This is the whole
//!   emulator in one use case — it runs on every inbound packet.

pub mod dispatch;
