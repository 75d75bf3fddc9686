//! Fixed life taxonomy: declaration, registry and collection routing.
//!
//! # Responsibility
//! - Load the classification tree once at startup.
//! - Answer node lookups without side effects.
//! - Map every node to exactly one physical collection.
//!
//! # Invariants
//! - The tree is immutable after load; no hot reload.
//! - Routing is total over configured nodes, checked at construction.

use crate::model::taxonomy::TaxonomyPath;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod config;
pub mod registry;
pub mod router;

/// Path segments do not match the configured tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeError {
    pub path: TaxonomyPath,
}

impl Display for UnknownNodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown taxonomy node: {}", self.path)
    }
}

impl Error for UnknownNodeError {}

/// Why a node could not be given a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnroutableReason {
    /// Neither the node, an ancestor, nor its domain names a collection.
    NoCollection,
    /// An override targets a node that is not in the registry.
    OverrideForUnknownNode,
}

/// Configuration defect: routing is not total over the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnroutableNodeError {
    pub path: TaxonomyPath,
    pub reason: UnroutableReason,
}

impl Display for UnroutableNodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            UnroutableReason::NoCollection => {
                write!(f, "taxonomy node has no configured collection: {}", self.path)
            }
            UnroutableReason::OverrideForUnknownNode => write!(
                f,
                "collection override targets unknown taxonomy node: {}",
                self.path
            ),
        }
    }
}

impl Error for UnroutableNodeError {}
