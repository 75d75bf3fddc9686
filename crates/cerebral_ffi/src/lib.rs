//! Flutter-facing bindings for the cerebral engine.
//!
//! # Responsibility
//! - Re-export the FRB API surface consumed by the Dart shell.

pub mod api;
