//! Taxonomy node and path model.
//!
//! # Responsibility
//! - Describe one classification node and its display metadata.
//! - Provide the `(domain, category, subcategory)` path used as explicit
//!   context by every read and write operation.
//!
//! # Invariants
//! - `children` keeps display order and unique keys (enforced at load).
//! - A path never has a subcategory without a category.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Level of a node inside the classification tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeDepth {
    Domain,
    Category,
    Subcategory,
}

impl NodeDepth {
    /// Maps a segment count (1-based) to a depth.
    pub fn from_segment_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Self::Domain),
            2 => Some(Self::Category),
            3 => Some(Self::Subcategory),
            _ => None,
        }
    }

    /// Returns the deepest supported level.
    pub const fn deepest() -> Self {
        Self::Subcategory
    }

    /// Returns the level one below this one, if any.
    pub fn child(self) -> Option<Self> {
        match self {
            Self::Domain => Some(Self::Category),
            Self::Category => Some(Self::Subcategory),
            Self::Subcategory => None,
        }
    }
}

/// Path identifying one taxonomy node.
///
/// Serialized as `{ "domain": .., "category": .., "subcategory": .. }` and
/// displayed as slash-joined segments (`intellectual/professional/articles`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxonomyPath {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

impl TaxonomyPath {
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            category: None,
            subcategory: None,
        }
    }

    pub fn category(domain: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            category: Some(category.into()),
            subcategory: None,
        }
    }

    pub fn subcategory(
        domain: impl Into<String>,
        category: impl Into<String>,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            category: Some(category.into()),
            subcategory: Some(subcategory.into()),
        }
    }

    /// Builds a path from ordered segments.
    ///
    /// Returns `None` for an empty slice or more than three segments.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        match segments {
            [domain] => Some(Self::domain(domain.as_ref())),
            [domain, category] => Some(Self::category(domain.as_ref(), category.as_ref())),
            [domain, category, subcategory] => Some(Self::subcategory(
                domain.as_ref(),
                category.as_ref(),
                subcategory.as_ref(),
            )),
            _ => None,
        }
    }

    /// Parses `domain[/category[/subcategory]]`. Blank segments are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let segments = value
            .trim()
            .trim_matches('/')
            .split('/')
            .map(str::trim)
            .collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }
        Self::from_segments(&segments)
    }

    /// Returns the populated segments in root-to-leaf order.
    ///
    /// A subcategory without a category is reported as-is so that lookups
    /// fail instead of silently skipping a level.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = vec![self.domain.as_str()];
        match (self.category.as_deref(), self.subcategory.as_deref()) {
            (Some(category), Some(subcategory)) => {
                segments.push(category);
                segments.push(subcategory);
            }
            (Some(category), None) => segments.push(category),
            (None, Some(subcategory)) => {
                segments.push("");
                segments.push(subcategory);
            }
            (None, None) => {}
        }
        segments
    }

    /// Returns the depth addressed by this path.
    pub fn depth(&self) -> NodeDepth {
        if self.subcategory.is_some() {
            NodeDepth::Subcategory
        } else if self.category.is_some() {
            NodeDepth::Category
        } else {
            NodeDepth::Domain
        }
    }

    /// Returns a path one level deeper.
    ///
    /// Returns `None` when this path is already at the deepest level.
    pub fn child(&self, key: impl Into<String>) -> Option<Self> {
        match (&self.category, &self.subcategory) {
            (None, _) => Some(Self::category(self.domain.clone(), key)),
            (Some(category), None) => Some(Self::subcategory(
                self.domain.clone(),
                category.clone(),
                key,
            )),
            (Some(_), Some(_)) => None,
        }
    }

    /// Returns whether `other` equals this path or lies below it.
    pub fn contains(&self, other: &TaxonomyPath) -> bool {
        if self.domain != other.domain {
            return false;
        }
        match (&self.category, &other.category) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) if mine != theirs => false,
            (Some(_), Some(_)) => match (&self.subcategory, &other.subcategory) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(mine), Some(theirs)) => mine == theirs,
            },
        }
    }
}

impl Display for TaxonomyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments().join("/"))
    }
}

/// One node of the fixed classification tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyNode {
    /// Unique among siblings.
    pub key: String,
    /// Weak back-reference to the parent key. `None` for domains.
    pub parent_key: Option<String>,
    pub label: String,
    pub icon: String,
    pub description: String,
    pub depth: NodeDepth,
    /// Full path from the root to this node.
    pub path: TaxonomyPath,
    /// Ordered children; display order is significant.
    pub children: Vec<TaxonomyNode>,
}

impl TaxonomyNode {
    /// Leaf nodes are the only level items may be routed to.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, key: &str) -> Option<&TaxonomyNode> {
        self.children.iter().find(|child| child.key == key)
    }

    /// Collects this node and every descendant in depth-first display order.
    pub fn walk(&self) -> Vec<&TaxonomyNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Collects every leaf at or below this node, in display order.
    pub fn leaves(&self) -> Vec<&TaxonomyNode> {
        self.walk().into_iter().filter(|node| node.is_leaf()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeDepth, TaxonomyPath};

    #[test]
    fn parse_accepts_one_to_three_segments() {
        assert_eq!(
            TaxonomyPath::parse("intellectual"),
            Some(TaxonomyPath::domain("intellectual"))
        );
        assert_eq!(
            TaxonomyPath::parse("/intellectual/professional/articles/"),
            Some(TaxonomyPath::subcategory(
                "intellectual",
                "professional",
                "articles"
            ))
        );
        assert_eq!(TaxonomyPath::parse("a/b/c/d"), None);
        assert_eq!(TaxonomyPath::parse("a//c"), None);
        assert_eq!(TaxonomyPath::parse(""), None);
    }

    #[test]
    fn contains_respects_prefix_semantics() {
        let domain = TaxonomyPath::domain("intellectual");
        let category = TaxonomyPath::category("intellectual", "professional");
        let leaf = TaxonomyPath::subcategory("intellectual", "professional", "tools");

        assert!(domain.contains(&leaf));
        assert!(category.contains(&leaf));
        assert!(leaf.contains(&leaf));
        assert!(!leaf.contains(&category));
        assert!(!TaxonomyPath::domain("beyond").contains(&leaf));
        assert!(!TaxonomyPath::category("intellectual", "books").contains(&leaf));
    }

    #[test]
    fn child_stops_at_deepest_level() {
        let leaf = TaxonomyPath::subcategory("a", "b", "c");
        assert_eq!(leaf.depth(), NodeDepth::deepest());
        assert!(leaf.child("d").is_none());
        assert_eq!(
            TaxonomyPath::domain("a").child("b"),
            Some(TaxonomyPath::category("a", "b"))
        );
    }

    #[test]
    fn display_joins_segments() {
        let path = TaxonomyPath::category("physical", "places");
        assert_eq!(path.to_string(), "physical/places");
    }
}
