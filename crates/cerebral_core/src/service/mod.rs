//! Engine use-case services.
//!
//! # Responsibility
//! - Orchestrate registry, routing, schema and store calls into the
//!   engine's public operations.
//! - Keep shell and CLI layers decoupled from storage details.
//!
//! # Invariants
//! - Every service receives the taxonomy path as an explicit argument; no
//!   service keeps a "current node".

pub mod aggregation_service;
pub mod item_lifecycle;
pub mod metadata_search;
pub mod query_pipeline;
