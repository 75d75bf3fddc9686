//! Taxonomy & aggregation engine facade.
//!
//! # Responsibility
//! - Expose the complete public surface to shells: node lookups, item
//!   queries, aggregate counts and item writes.
//! - Wire router, store and clock into short-lived services per call.
//!
//! # Invariants
//! - The engine holds no mutable state beyond what the store owns.
//! - Shells reach collections only through the router; there is no API
//!   that takes a collection id.
//! - Reads are point-in-time snapshots and may race concurrent writes;
//!   callers must not assume isolation across calls.

use crate::clock::{Clock, SystemClock};
use crate::error::EngineResult;
use crate::model::item::{Item, ItemId, ItemPayload};
use crate::model::taxonomy::{TaxonomyNode, TaxonomyPath};
use crate::repo::item_store::ItemStore;
use crate::schema::{FormSchema, FormSchemaProvider};
use crate::service::aggregation_service::{AggregationService, NodeStats, StatusBreakdown};
use crate::service::item_lifecycle::ItemLifecycleManager;
use crate::service::metadata_search::{CandidateAttributes, MetadataSearch};
use crate::service::query_pipeline::{ItemFilter, ItemPage, PageRequest, QueryPipeline, SortOrder};
use crate::taxonomy::router::CollectionRouter;
use crate::taxonomy::UnknownNodeError;

/// Tunables applied by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Trailing window used by `node_stats`, `child_stats` and `overview`.
    pub recent_window_days: u32,
    pub default_page_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            recent_window_days: 7,
            default_page_limit: 20,
        }
    }
}

/// Engine over one router, one item store and one clock.
pub struct Engine<S: ItemStore, C: Clock = SystemClock> {
    router: CollectionRouter,
    store: S,
    clock: C,
    settings: EngineSettings,
}

impl<S: ItemStore> Engine<S, SystemClock> {
    pub fn new(router: CollectionRouter, store: S) -> Self {
        Self::with_clock(router, store, SystemClock)
    }
}

impl<S: ItemStore, C: Clock> Engine<S, C> {
    pub fn with_clock(router: CollectionRouter, store: S, clock: C) -> Self {
        Self {
            router,
            store,
            clock,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn router(&self) -> &CollectionRouter {
        &self.router
    }

    pub fn get_node(&self, path: &TaxonomyPath) -> Result<&TaxonomyNode, UnknownNodeError> {
        self.router.registry().get_node(path)
    }

    pub fn list_children(&self, path: &TaxonomyPath) -> Result<&[TaxonomyNode], UnknownNodeError> {
        self.router.registry().list_children(path)
    }

    pub fn is_leaf(&self, path: &TaxonomyPath) -> Result<bool, UnknownNodeError> {
        self.router.registry().is_leaf(path)
    }

    pub fn domains(&self) -> &[TaxonomyNode] {
        self.router.registry().domains()
    }

    pub fn get_schema(&self, path: &TaxonomyPath) -> Result<FormSchema, UnknownNodeError> {
        FormSchemaProvider::new(&self.router).get_schema(path)
    }

    pub fn query(
        &self,
        path: &TaxonomyPath,
        filter: &ItemFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> EngineResult<ItemPage> {
        self.pipeline().query(path, filter, sort, page)
    }

    pub fn search_everywhere(
        &self,
        text: &str,
        sort: SortOrder,
        page: PageRequest,
    ) -> EngineResult<ItemPage> {
        self.pipeline().search_everywhere(text, sort, page)
    }

    pub fn recent_items(&self, limit: Option<u32>) -> EngineResult<Vec<Item>> {
        self.pipeline().recent_items(limit)
    }

    pub fn count_all(&self, path: &TaxonomyPath) -> EngineResult<usize> {
        self.aggregation().count_all(path)
    }

    pub fn count_recent(&self, path: &TaxonomyPath, window_days: u32) -> EngineResult<usize> {
        self.aggregation().count_recent(path, window_days)
    }

    pub fn status_breakdown(&self, path: &TaxonomyPath) -> EngineResult<StatusBreakdown> {
        self.aggregation().status_breakdown(path)
    }

    /// Node summary over the configured recent window.
    pub fn node_stats(&self, path: &TaxonomyPath) -> EngineResult<NodeStats> {
        self.aggregation()
            .node_stats(path, self.settings.recent_window_days)
    }

    pub fn child_stats(&self, path: &TaxonomyPath) -> EngineResult<Vec<NodeStats>> {
        self.aggregation()
            .child_stats(path, self.settings.recent_window_days)
    }

    pub fn overview(&self) -> EngineResult<Vec<NodeStats>> {
        self.aggregation()
            .overview(self.settings.recent_window_days)
    }

    pub fn create(&self, path: &TaxonomyPath, payload: &ItemPayload) -> EngineResult<Item> {
        self.lifecycle().create(path, payload)
    }

    pub fn update(&self, id: ItemId, path: &TaxonomyPath, patch: &ItemPayload) -> EngineResult<Item> {
        self.lifecycle().update(id, path, patch)
    }

    pub fn delete(&self, id: ItemId, path: &TaxonomyPath) -> EngineResult<()> {
        self.lifecycle().delete(id, path)
    }

    pub fn get(&self, id: ItemId, path: &TaxonomyPath) -> EngineResult<Item> {
        self.lifecycle().get(id, path)
    }

    pub fn prefill(
        &self,
        search: &dyn MetadataSearch,
        query: &str,
        path: &TaxonomyPath,
    ) -> EngineResult<Vec<CandidateAttributes>> {
        self.lifecycle().prefill(search, query, path)
    }

    fn pipeline(&self) -> QueryPipeline<'_, &S> {
        QueryPipeline::new(&self.router, &self.store)
            .with_default_limit(self.settings.default_page_limit)
    }

    fn aggregation(&self) -> AggregationService<'_, &S, &C> {
        AggregationService::new(self.pipeline(), &self.clock)
    }

    fn lifecycle(&self) -> ItemLifecycleManager<'_, &S, &C> {
        ItemLifecycleManager::new(&self.router, &self.store, &self.clock)
    }
}
