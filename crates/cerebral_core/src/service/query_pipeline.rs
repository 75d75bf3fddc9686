//! Read path over items stored under taxonomy nodes.
//!
//! # Responsibility
//! - Fan one node query out to every collection its leaves route to.
//! - Apply status/search filters, deterministic sorting and pagination.
//! - Serve every read of the browsing surface and of aggregation.
//!
//! # Invariants
//! - Never mutates data.
//! - Results are point-in-time snapshots per collection; concurrent writes
//!   may or may not be visible, no cross-collection isolation is provided.
//! - Ties always break on `id` ascending, then collection key.
//! - An out-of-range offset yields an empty page, never an error.

use crate::clock::DAY_MS;
use crate::error::{EngineError, EngineResult};
use crate::model::collection::CollectionId;
use crate::model::item::{Item, ItemStatus};
use crate::model::taxonomy::TaxonomyPath;
use crate::repo::item_store::{
    record_to_item, Condition, ItemStore, OrderTerm, Predicate, StoreWindow,
};
use crate::schema::FormSchemaProvider;
use crate::taxonomy::router::CollectionRouter;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Caller-supplied item filter. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default)]
    pub status: Option<ItemStatus>,
    /// Case-insensitive substring over title and text attributes.
    #[serde(default)]
    pub search_text: Option<String>,
}

impl ItemFilter {
    pub fn with_status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            search_text: None,
        }
    }

    pub fn with_search(text: impl Into<String>) -> Self {
        Self {
            status: None,
            search_text: Some(text.into()),
        }
    }

    /// Lowercased needle, or `None` when blank.
    fn needle(&self) -> Option<String> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `created_at` descending.
    #[default]
    Recent,
    /// `created_at` ascending.
    Oldest,
    /// Title, case-insensitive, ascending.
    Name,
    /// Rating descending; unrated items last.
    Rating,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recent" => Some(Self::Recent),
            "oldest" => Some(Self::Oldest),
            "name" => Some(Self::Name),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }

    /// Store-side order terms matching `compare`, tie-break included.
    fn order_terms(self) -> Vec<OrderTerm> {
        let primary = match self {
            Self::Recent => OrderTerm::desc("created_at"),
            Self::Oldest => OrderTerm::asc("created_at"),
            Self::Name => OrderTerm::asc("title").nocase(),
            Self::Rating => OrderTerm::desc("rating").nulls_last(),
        };
        vec![primary, OrderTerm::asc("id")]
    }

    fn compare(self, left: &(CollectionId, Item), right: &(CollectionId, Item)) -> Ordering {
        let (left_collection, left) = left;
        let (right_collection, right) = right;
        let primary = match self {
            Self::Recent => right.created_at.cmp(&left.created_at),
            Self::Oldest => left.created_at.cmp(&right.created_at),
            Self::Name => left.title.to_lowercase().cmp(&right.title.to_lowercase()),
            Self::Rating => match (left.rating, right.rating) {
                (Some(l), Some(r)) => r.cmp(&l),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary
            .then_with(|| left.id.cmp(&right.id))
            .then_with(|| left_collection.cmp(right_collection))
    }
}

/// Requested page bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub offset: u32,
    /// `None` or `0` selects the default limit; capped at `MAX_PAGE_LIMIT`.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub offset: u32,
    /// Limit actually applied after normalization.
    pub limit: u32,
    /// Number of matching items across all pages.
    pub total: usize,
}

/// Normalizes a page limit: `None`/`0` -> `default_limit`, capped at
/// `MAX_PAGE_LIMIT`.
pub fn normalize_page_limit(limit: Option<u32>, default_limit: u32) -> u32 {
    match limit {
        None | Some(0) => default_limit.clamp(1, MAX_PAGE_LIMIT),
        Some(value) => value.min(MAX_PAGE_LIMIT),
    }
}

/// Inclusive `created_at` bounds in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWindow {
    pub from_ms: i64,
    pub until_ms: i64,
}

impl CreatedWindow {
    /// Trailing window of `days` ending at `now_ms`.
    pub fn trailing_days(now_ms: i64, days: u32) -> Self {
        Self {
            from_ms: now_ms.saturating_sub(i64::from(days).saturating_mul(DAY_MS)),
            until_ms: now_ms,
        }
    }

    pub fn contains(&self, created_at: i64) -> bool {
        (self.from_ms..=self.until_ms).contains(&created_at)
    }
}

/// Filter/sort/paginate pipeline over routed collections.
pub struct QueryPipeline<'a, S: ItemStore> {
    router: &'a CollectionRouter,
    store: S,
    default_limit: u32,
}

impl<'a, S: ItemStore> QueryPipeline<'a, S> {
    pub fn new(router: &'a CollectionRouter, store: S) -> Self {
        Self {
            router,
            store,
            default_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Overrides the limit used when a page request names none.
    pub fn with_default_limit(mut self, default_limit: u32) -> Self {
        self.default_limit = normalize_page_limit(Some(default_limit), DEFAULT_PAGE_LIMIT);
        self
    }

    pub fn router(&self) -> &'a CollectionRouter {
        self.router
    }

    /// Returns one page of items stored at or below `path`.
    pub fn query(
        &self,
        path: &TaxonomyPath,
        filter: &ItemFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> EngineResult<ItemPage> {
        let started_at = Instant::now();
        let mut matches = self.fetch(path, filter, None, sort)?;
        matches.sort_by(|left, right| sort.compare(left, right));
        let page = self.paginate(matches, page);
        debug!(
            "event=items_query module=query status=ok path={path} sort={sort:?} total={} returned={} duration_ms={}",
            page.total,
            page.items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(page)
    }

    /// Returns every matching item at or below `path`, unordered.
    pub fn collect(&self, path: &TaxonomyPath, filter: &ItemFilter) -> EngineResult<Vec<Item>> {
        self.collect_created(path, filter, None)
    }

    /// Like `collect`, restricted to items created inside `window`.
    pub fn collect_created(
        &self,
        path: &TaxonomyPath,
        filter: &ItemFilter,
        window: Option<CreatedWindow>,
    ) -> EngineResult<Vec<Item>> {
        Ok(self
            .fetch(path, filter, window, SortOrder::Recent)?
            .into_iter()
            .map(|(_, item)| item)
            .collect())
    }

    /// Searches every domain; a blank query yields an empty page.
    pub fn search_everywhere(
        &self,
        text: &str,
        sort: SortOrder,
        page: PageRequest,
    ) -> EngineResult<ItemPage> {
        let filter = ItemFilter::with_search(text);
        if filter.needle().is_none() {
            return Ok(self.paginate(Vec::new(), page));
        }

        let mut matches = Vec::new();
        for domain in self.router.registry().domains() {
            matches.extend(self.fetch(&domain.path, &filter, None, sort)?);
        }
        matches.sort_by(|left, right| sort.compare(left, right));
        Ok(self.paginate(matches, page))
    }

    /// Most recently created items across the whole tree.
    pub fn recent_items(&self, limit: Option<u32>) -> EngineResult<Vec<Item>> {
        let limit = normalize_page_limit(limit, self.default_limit);
        let window = StoreWindow {
            limit: Some(limit),
            offset: 0,
        };

        let mut matches = Vec::new();
        for domain in self.router.registry().domains() {
            let predicate = Predicate::under(&domain.path);
            for collection in self.collections_under(&domain.path)? {
                let records = self
                    .store
                    .query(collection, &predicate, &SortOrder::Recent.order_terms(), window)
                    .map_err(|err| EngineError::store("recent_items", &domain.path, err))?;
                for record in &records {
                    let item = record_to_item(collection, record)
                        .map_err(|err| EngineError::store("recent_items", &domain.path, err))?;
                    matches.push((collection, item));
                }
            }
        }
        matches.sort_by(|left, right| SortOrder::Recent.compare(left, right));
        matches.truncate(limit as usize);
        Ok(matches.into_iter().map(|(_, item)| item).collect())
    }

    fn collections_under(&self, path: &TaxonomyPath) -> EngineResult<Vec<CollectionId>> {
        self.router.registry().get_node(path)?;
        self.router
            .collections_under(path)
            .map_err(EngineError::unrouted)
    }

    fn fetch(
        &self,
        path: &TaxonomyPath,
        filter: &ItemFilter,
        window: Option<CreatedWindow>,
        sort: SortOrder,
    ) -> EngineResult<Vec<(CollectionId, Item)>> {
        let collections = self.collections_under(path)?;
        let needle = filter.needle();

        let mut predicate = Predicate::under(path);
        if let Some(status) = filter.status {
            predicate = predicate.and(Condition::Eq("status", status.as_str().into()));
        }
        if let Some(window) = window {
            predicate = predicate
                .and(Condition::AtLeast("created_at", window.from_ms))
                .and(Condition::AtMost("created_at", window.until_ms));
        }
        let order = sort.order_terms();

        let mut matches = Vec::new();
        for collection in collections {
            let records = self
                .store
                .query(collection, &predicate, &order, StoreWindow::default())
                .map_err(|err| EngineError::store("query", path, err))?;
            for record in &records {
                let item = record_to_item(collection, record)
                    .map_err(|err| EngineError::store("query", path, err))?;
                if let Some(needle) = needle.as_deref() {
                    if !self.matches_text(&item, needle) {
                        continue;
                    }
                }
                matches.push((collection, item));
            }
        }
        Ok(matches)
    }

    fn matches_text(&self, item: &Item, needle: &str) -> bool {
        let Ok(schema) = FormSchemaProvider::new(self.router).get_schema(&item.path) else {
            // Rows whose node left the tree still match on title.
            return item.title.to_lowercase().contains(needle);
        };
        schema.text_field_names().into_iter().any(|name| {
            item.field(name)
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(needle))
        })
    }

    fn paginate(&self, matches: Vec<(CollectionId, Item)>, page: PageRequest) -> ItemPage {
        let limit = normalize_page_limit(page.limit, self.default_limit);
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(page.offset as usize)
            .take(limit as usize)
            .map(|(_, item)| item)
            .collect();
        ItemPage {
            items,
            offset: page.offset,
            limit,
            total,
        }
    }
}
