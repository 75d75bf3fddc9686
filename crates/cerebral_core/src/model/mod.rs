//! Domain model for the life taxonomy and tracked items.
//!
//! # Responsibility
//! - Define the taxonomy node/path shapes shared by registry and routing.
//! - Define the canonical item record and its attribute values.
//! - Define the declarative field schema vocabulary.
//!
//! # Invariants
//! - Taxonomy nodes are configuration; they are never mutated after load.
//! - Items are leaves: they own no children and never cascade on delete.

pub mod collection;
pub mod item;
pub mod schema;
pub mod taxonomy;
