//! Persistence boundary for tracked items.
//!
//! # Responsibility
//! - Define the storage collaborator contract consumed by the engine.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - The store never validates item payloads; services do that before
//!   handing it a record.
//! - Store APIs report affected-row counts; services map zero to
//!   `NotFound`.

pub mod item_store;
