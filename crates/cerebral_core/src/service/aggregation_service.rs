//! Live statistics over taxonomy nodes.
//!
//! # Responsibility
//! - Count items, recent items and per-status items under any node.
//! - Summarize nodes for dashboards (per-node, per-child, per-domain).
//!
//! # Invariants
//! - Every figure is derived from a fresh `QueryPipeline` read; nothing is
//!   cached or stored.
//! - Non-leaf nodes merge every collection their leaves route to.
//! - A breakdown always sums to the total computed from the same read.

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::model::item::{Item, ItemStatus};
use crate::model::taxonomy::TaxonomyPath;
use crate::repo::item_store::ItemStore;
use crate::service::query_pipeline::{CreatedWindow, ItemFilter, QueryPipeline};
use serde::Serialize;

const MAX_RATING: u8 = 5;

/// Item counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub wishlist: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusBreakdown {
    pub fn from_items<'i>(items: impl IntoIterator<Item = &'i Item>) -> Self {
        let mut breakdown = Self::default();
        for item in items {
            match item.status {
                ItemStatus::Wishlist => breakdown.wishlist += 1,
                ItemStatus::InProgress => breakdown.in_progress += 1,
                ItemStatus::Completed => breakdown.completed += 1,
            }
        }
        breakdown
    }

    pub fn total(&self) -> usize {
        self.wishlist + self.in_progress + self.completed
    }

    pub fn get(&self, status: ItemStatus) -> usize {
        match status {
            ItemStatus::Wishlist => self.wishlist,
            ItemStatus::InProgress => self.in_progress,
            ItemStatus::Completed => self.completed,
        }
    }
}

/// Summary card of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStats {
    pub path: TaxonomyPath,
    pub label: String,
    pub icon: String,
    pub total: usize,
    /// Items created within the trailing window.
    pub recent: usize,
    pub window_days: u32,
    pub breakdown: StatusBreakdown,
    /// Mean over rated items; `None` when nothing is rated.
    pub average_rating: Option<f64>,
    /// Items rated the maximum of 5.
    pub favorites: usize,
    /// `completed / total`; `None` for an empty node.
    pub completion_ratio: Option<f64>,
}

/// Aggregate reads delegated to the query pipeline.
pub struct AggregationService<'a, S: ItemStore, C: Clock> {
    pipeline: QueryPipeline<'a, S>,
    clock: C,
}

impl<'a, S: ItemStore, C: Clock> AggregationService<'a, S, C> {
    pub fn new(pipeline: QueryPipeline<'a, S>, clock: C) -> Self {
        Self { pipeline, clock }
    }

    /// Number of items stored at or below `path`.
    pub fn count_all(&self, path: &TaxonomyPath) -> EngineResult<usize> {
        Ok(self.pipeline.collect(path, &ItemFilter::default())?.len())
    }

    /// Items created within `[now - window_days, now]`.
    pub fn count_recent(&self, path: &TaxonomyPath, window_days: u32) -> EngineResult<usize> {
        let window = CreatedWindow::trailing_days(self.clock.now_ms(), window_days);
        Ok(self
            .pipeline
            .collect_created(path, &ItemFilter::default(), Some(window))?
            .len())
    }

    pub fn status_breakdown(&self, path: &TaxonomyPath) -> EngineResult<StatusBreakdown> {
        let items = self.pipeline.collect(path, &ItemFilter::default())?;
        Ok(StatusBreakdown::from_items(&items))
    }

    /// Total, recent, breakdown and rating figures from a single read.
    pub fn node_stats(&self, path: &TaxonomyPath, window_days: u32) -> EngineResult<NodeStats> {
        let node = self.pipeline.router().registry().get_node(path)?;
        let items = self.pipeline.collect(path, &ItemFilter::default())?;
        let window = CreatedWindow::trailing_days(self.clock.now_ms(), window_days);

        let ratings = items
            .iter()
            .filter_map(|item| item.rating)
            .map(f64::from)
            .collect::<Vec<_>>();
        let average_rating =
            (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);
        let breakdown = StatusBreakdown::from_items(&items);
        let completion_ratio =
            (!items.is_empty()).then(|| breakdown.completed as f64 / items.len() as f64);

        Ok(NodeStats {
            path: path.clone(),
            label: node.label.clone(),
            icon: node.icon.clone(),
            total: items.len(),
            recent: items
                .iter()
                .filter(|item| window.contains(item.created_at))
                .count(),
            window_days,
            breakdown,
            average_rating,
            favorites: items
                .iter()
                .filter(|item| item.rating == Some(MAX_RATING))
                .count(),
            completion_ratio,
        })
    }

    /// One summary per child of `path`, in display order. Leaves yield none.
    pub fn child_stats(&self, path: &TaxonomyPath, window_days: u32) -> EngineResult<Vec<NodeStats>> {
        let children = self.pipeline.router().registry().list_children(path)?;
        children
            .iter()
            .map(|child| self.node_stats(&child.path, window_days))
            .collect()
    }

    /// One summary per domain, in display order.
    pub fn overview(&self, window_days: u32) -> EngineResult<Vec<NodeStats>> {
        self.pipeline
            .router()
            .registry()
            .domains()
            .iter()
            .map(|domain| self.node_stats(&domain.path, window_days))
            .collect()
    }
}
