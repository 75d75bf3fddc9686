//! Core engine for the cerebral life-taxonomy tracker.
//! Owns the taxonomy, routing, validation and aggregation invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod service;
pub mod taxonomy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use engine::{Engine, EngineSettings};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::collection::CollectionId;
pub use model::item::{FieldValue, Item, ItemId, ItemPayload, ItemStatus};
pub use model::taxonomy::{NodeDepth, TaxonomyNode, TaxonomyPath};
pub use repo::item_store::{ItemStore, SqliteItemStore, StoreError};
pub use schema::validate::{FieldIssue, FieldProblem, ValidationError};
pub use schema::{FormSchema, FormSchemaProvider};
pub use service::aggregation_service::{NodeStats, StatusBreakdown};
pub use service::metadata_search::{
    CandidateAttributes, MetadataSearch, MetadataSearchError, NoMetadataSearch,
};
pub use service::query_pipeline::{ItemFilter, ItemPage, PageRequest, SortOrder};
pub use taxonomy::router::{CatalogError, CollectionRouter};
pub use taxonomy::{UnknownNodeError, UnroutableNodeError};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
