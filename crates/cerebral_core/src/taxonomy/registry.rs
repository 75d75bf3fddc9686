//! In-process taxonomy registry.
//!
//! # Responsibility
//! - Build the immutable node tree from a validated declaration.
//! - Resolve paths to nodes and list ordered children.
//!
//! # Invariants
//! - Lookups walk path segments generically; depth is never assumed to be
//!   exactly two.
//! - Returned child slices keep declaration (display) order.

use crate::model::taxonomy::{NodeDepth, TaxonomyNode, TaxonomyPath};
use crate::taxonomy::config::{NodeConfig, TaxonomyConfig, TaxonomyConfigError};
use crate::taxonomy::UnknownNodeError;

/// Immutable classification tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyRegistry {
    domains: Vec<TaxonomyNode>,
}

impl TaxonomyRegistry {
    /// Builds the registry from the tree compiled into the binary.
    pub fn builtin() -> Result<Self, TaxonomyConfigError> {
        Self::from_config(&TaxonomyConfig::builtin()?)
    }

    /// Builds the registry from a declaration, re-running validation.
    pub fn from_config(config: &TaxonomyConfig) -> Result<Self, TaxonomyConfigError> {
        config.validate()?;
        let domains = config
            .domains
            .iter()
            .map(|domain| {
                build_node(
                    domain,
                    None,
                    NodeDepth::Domain,
                    TaxonomyPath::domain(domain.key.as_str()),
                )
            })
            .collect();
        Ok(Self { domains })
    }

    /// Top-level nodes in display order.
    pub fn domains(&self) -> &[TaxonomyNode] {
        &self.domains
    }

    /// Resolves one node by path.
    pub fn get_node(&self, path: &TaxonomyPath) -> Result<&TaxonomyNode, UnknownNodeError> {
        let unknown = || UnknownNodeError { path: path.clone() };
        let segments = path.segments();
        let (first, rest) = segments.split_first().ok_or_else(unknown)?;

        let mut node = self
            .domains
            .iter()
            .find(|domain| domain.key == *first)
            .ok_or_else(unknown)?;
        for segment in rest {
            node = node.child(segment).ok_or_else(unknown)?;
        }
        Ok(node)
    }

    /// Lists the ordered children of one node. Leaves return an empty slice.
    pub fn list_children(&self, path: &TaxonomyPath) -> Result<&[TaxonomyNode], UnknownNodeError> {
        self.get_node(path).map(|node| node.children.as_slice())
    }

    /// Returns whether the node has no children.
    pub fn is_leaf(&self, path: &TaxonomyPath) -> Result<bool, UnknownNodeError> {
        self.get_node(path).map(TaxonomyNode::is_leaf)
    }

    /// Lists every leaf at or below `path`, in display order.
    pub fn leaves_under(&self, path: &TaxonomyPath) -> Result<Vec<&TaxonomyNode>, UnknownNodeError> {
        self.get_node(path).map(TaxonomyNode::leaves)
    }

    /// Every node of the tree, depth-first in display order.
    pub fn walk(&self) -> Vec<&TaxonomyNode> {
        self.domains.iter().flat_map(TaxonomyNode::walk).collect()
    }
}

fn build_node(
    config: &NodeConfig,
    parent_key: Option<&str>,
    depth: NodeDepth,
    path: TaxonomyPath,
) -> TaxonomyNode {
    // Validation already capped the depth, so `child()` is only `None` for
    // nodes that have no children.
    let children = match depth.child() {
        Some(child_depth) => config
            .children
            .iter()
            .filter_map(|child| {
                let child_path = path.child(child.key.as_str())?;
                Some(build_node(
                    child,
                    Some(config.key.as_str()),
                    child_depth,
                    child_path,
                ))
            })
            .collect(),
        None => Vec::new(),
    };

    TaxonomyNode {
        key: config.key.clone(),
        parent_key: parent_key.map(str::to_string),
        label: config.label.trim().to_string(),
        icon: config.icon.clone(),
        description: config.description.clone(),
        depth,
        path,
        children,
    }
}
