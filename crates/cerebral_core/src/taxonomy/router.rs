//! Collection routing for taxonomy nodes.
//!
//! # Responsibility
//! - Map every configured node to its physical collection and attribute
//!   schema.
//! - Enumerate the distinct collections beneath a node for aggregation.
//!
//! # Invariants
//! - The route table is computed once at construction and covers every node
//!   in the registry; a gap fails construction with `UnroutableNodeError`.
//! - `resolve` is a pure lookup: identical paths always yield identical
//!   routes for the lifetime of the router.
//! - A node inherits the nearest ancestor override, else its domain default.

use crate::model::collection::CollectionId;
use crate::model::schema::FieldSpec;
use crate::model::taxonomy::{TaxonomyNode, TaxonomyPath};
use crate::schema::fields::attribute_fields;
use crate::taxonomy::config::{RoutingTable, TaxonomyConfig, TaxonomyConfigError};
use crate::taxonomy::registry::TaxonomyRegistry;
use crate::taxonomy::{UnknownNodeError, UnroutableNodeError, UnroutableReason};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Resolved storage target of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub collection: CollectionId,
    /// Collection-specific attribute fields (universal fields excluded).
    pub schema: &'static [FieldSpec],
}

impl Route {
    fn for_collection(collection: CollectionId) -> Self {
        Self {
            collection,
            schema: attribute_fields(collection),
        }
    }
}

/// A leaf and the route its items are stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRoute {
    pub path: TaxonomyPath,
    pub route: Route,
}

/// Startup failure while assembling registry and routes.
#[derive(Debug)]
pub enum CatalogError {
    Config(TaxonomyConfigError),
    Unroutable(UnroutableNodeError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Unroutable(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Unroutable(err) => Some(err),
        }
    }
}

impl From<TaxonomyConfigError> for CatalogError {
    fn from(value: TaxonomyConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<UnroutableNodeError> for CatalogError {
    fn from(value: UnroutableNodeError) -> Self {
        Self::Unroutable(value)
    }
}

/// Total routing function over a taxonomy registry.
#[derive(Debug, Clone)]
pub struct CollectionRouter {
    registry: TaxonomyRegistry,
    routes: BTreeMap<TaxonomyPath, Route>,
}

impl CollectionRouter {
    /// Builds registry and routes from the built-in declaration.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_config(&TaxonomyConfig::builtin()?)
    }

    /// Builds registry and routes from one declaration.
    pub fn from_config(config: &TaxonomyConfig) -> Result<Self, CatalogError> {
        let registry = TaxonomyRegistry::from_config(config)?;
        Ok(Self::new(registry, &config.routing_table())?)
    }

    /// Computes the route of every registry node from an explicit table.
    ///
    /// # Errors
    /// - `NoCollection` when a domain lacks a default and a node beneath it
    ///   has no override on its ancestor chain.
    /// - `OverrideForUnknownNode` when the table names a node that does not
    ///   exist.
    pub fn new(registry: TaxonomyRegistry, table: &RoutingTable) -> Result<Self, UnroutableNodeError> {
        if let Some(stale) = table
            .overrides
            .keys()
            .find(|path| registry.get_node(path).is_err())
        {
            return Err(UnroutableNodeError {
                path: stale.clone(),
                reason: UnroutableReason::OverrideForUnknownNode,
            });
        }
        if let Some(stale) = table
            .defaults
            .keys()
            .find(|key| registry.get_node(&TaxonomyPath::domain(key.as_str())).is_err())
        {
            return Err(UnroutableNodeError {
                path: TaxonomyPath::domain(stale.as_str()),
                reason: UnroutableReason::OverrideForUnknownNode,
            });
        }

        let mut routes = BTreeMap::new();
        for domain in registry.domains() {
            let inherited = table.defaults.get(&domain.key).copied();
            assign_routes(domain, inherited, table, &mut routes)?;
        }

        Ok(Self { registry, routes })
    }

    /// The registry this router was built over.
    pub fn registry(&self) -> &TaxonomyRegistry {
        &self.registry
    }

    /// Resolves the collection and attribute schema of one node.
    pub fn resolve(&self, path: &TaxonomyPath) -> Result<Route, UnknownNodeError> {
        self.routes
            .get(path)
            .copied()
            .ok_or_else(|| UnknownNodeError { path: path.clone() })
    }

    /// Lists every leaf at or below `path` with its route.
    pub fn leaf_routes_under(&self, path: &TaxonomyPath) -> Result<Vec<LeafRoute>, UnknownNodeError> {
        self.registry
            .leaves_under(path)?
            .into_iter()
            .map(|leaf| {
                Ok(LeafRoute {
                    path: leaf.path.clone(),
                    route: self.resolve(&leaf.path)?,
                })
            })
            .collect()
    }

    /// Distinct collections holding items at or below `path`, sorted.
    pub fn collections_under(&self, path: &TaxonomyPath) -> Result<Vec<CollectionId>, UnknownNodeError> {
        let collections = self
            .leaf_routes_under(path)?
            .into_iter()
            .map(|leaf| leaf.route.collection)
            .collect::<BTreeSet<_>>();
        Ok(collections.into_iter().collect())
    }
}

fn assign_routes(
    node: &TaxonomyNode,
    inherited: Option<CollectionId>,
    table: &RoutingTable,
    routes: &mut BTreeMap<TaxonomyPath, Route>,
) -> Result<(), UnroutableNodeError> {
    let collection = table
        .overrides
        .get(&node.path)
        .copied()
        .or(inherited)
        .ok_or_else(|| UnroutableNodeError {
            path: node.path.clone(),
            reason: UnroutableReason::NoCollection,
        })?;

    routes.insert(node.path.clone(), Route::for_collection(collection));
    for child in &node.children {
        assign_routes(child, Some(collection), table, routes)?;
    }
    Ok(())
}
