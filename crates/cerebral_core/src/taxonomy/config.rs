//! Declarative taxonomy configuration.
//!
//! # Responsibility
//! - Parse the classification tree literal (built-in or from a JSON file).
//! - Validate declaration-level invariants before a registry is built.
//! - Extract the routing table (domain defaults and per-node overrides).
//!
//! # Invariants
//! - Keys match `^[a-z][a-z0-9_]*$` and are unique among siblings.
//! - Trees are at most three levels deep.
//! - Every referenced collection name is a known `CollectionId`.
//!
//! # See also
//! - `taxonomy/builtin_taxonomy.json`

use crate::model::collection::CollectionId;
use crate::model::taxonomy::{NodeDepth, TaxonomyPath};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const BUILTIN_TAXONOMY_JSON: &str = include_str!("builtin_taxonomy.json");

static NODE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid node key regex"));

/// Errors raised while loading or validating a taxonomy declaration.
#[derive(Debug)]
pub enum TaxonomyConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    /// The document declares no domains.
    EmptyTree,
    InvalidKey {
        parent: String,
        key: String,
    },
    DuplicateKey {
        parent: String,
        key: String,
    },
    /// A node is nested below the subcategory level.
    TooDeep(String),
    UnknownCollection {
        path: String,
        name: String,
    },
    BlankLabel(String),
}

impl Display for TaxonomyConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read taxonomy file `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid taxonomy document: {err}"),
            Self::EmptyTree => write!(f, "taxonomy must declare at least one domain"),
            Self::InvalidKey { parent, key } => {
                write!(f, "invalid node key `{key}` under `{parent}`")
            }
            Self::DuplicateKey { parent, key } => {
                write!(f, "duplicate node key `{key}` under `{parent}`")
            }
            Self::TooDeep(path) => {
                write!(f, "node `{path}` is nested deeper than the subcategory level")
            }
            Self::UnknownCollection { path, name } => {
                write!(f, "node `{path}` references unknown collection `{name}`")
            }
            Self::BlankLabel(path) => write!(f, "node `{path}` has a blank label"),
        }
    }
}

impl Error for TaxonomyConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TaxonomyConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// One declared node. Domains use `collection` as their default collection;
/// deeper nodes use it as an override inherited by their subtree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfig {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeConfig>,
}

/// Whole taxonomy declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxonomyConfig {
    pub domains: Vec<NodeConfig>,
}

/// Explicit collection assignments extracted from a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    /// Domain key to default collection.
    pub defaults: BTreeMap<String, CollectionId>,
    /// Non-domain node path to override collection.
    pub overrides: BTreeMap<TaxonomyPath, CollectionId>,
}

impl TaxonomyConfig {
    /// Returns the tree compiled into the binary.
    pub fn builtin() -> Result<Self, TaxonomyConfigError> {
        Self::from_json_str(BUILTIN_TAXONOMY_JSON)
    }

    /// Parses and validates a JSON declaration.
    pub fn from_json_str(raw: &str) -> Result<Self, TaxonomyConfigError> {
        let config: TaxonomyConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON declaration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TaxonomyConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TaxonomyConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), TaxonomyConfigError> {
        if self.domains.is_empty() {
            return Err(TaxonomyConfigError::EmptyTree);
        }
        validate_siblings("<root>", &self.domains, 1)
    }

    /// Collects the explicit collection assignments of this declaration.
    ///
    /// Unknown collection names were rejected by `validate`, so parsing
    /// here only skips absent values.
    pub fn routing_table(&self) -> RoutingTable {
        let mut table = RoutingTable::default();
        for domain in &self.domains {
            if let Some(collection) = domain.collection.as_deref().and_then(CollectionId::parse) {
                table.defaults.insert(domain.key.clone(), collection);
            }
            let domain_path = TaxonomyPath::domain(domain.key.as_str());
            collect_overrides(&domain_path, &domain.children, &mut table.overrides);
        }
        table
    }
}

fn collect_overrides(
    parent: &TaxonomyPath,
    nodes: &[NodeConfig],
    overrides: &mut BTreeMap<TaxonomyPath, CollectionId>,
) {
    for node in nodes {
        let Some(path) = parent.child(node.key.as_str()) else {
            continue;
        };
        if let Some(collection) = node.collection.as_deref().and_then(CollectionId::parse) {
            overrides.insert(path.clone(), collection);
        }
        collect_overrides(&path, &node.children, overrides);
    }
}

fn validate_siblings(
    parent: &str,
    nodes: &[NodeConfig],
    level: usize,
) -> Result<(), TaxonomyConfigError> {
    let mut seen = BTreeSet::new();
    for node in nodes {
        let path = if parent == "<root>" {
            node.key.clone()
        } else {
            format!("{parent}/{}", node.key)
        };

        if NodeDepth::from_segment_count(level).is_none() {
            return Err(TaxonomyConfigError::TooDeep(path));
        }
        if !NODE_KEY_RE.is_match(&node.key) {
            return Err(TaxonomyConfigError::InvalidKey {
                parent: parent.to_string(),
                key: node.key.clone(),
            });
        }
        if !seen.insert(node.key.as_str()) {
            return Err(TaxonomyConfigError::DuplicateKey {
                parent: parent.to_string(),
                key: node.key.clone(),
            });
        }
        if node.label.trim().is_empty() {
            return Err(TaxonomyConfigError::BlankLabel(path));
        }
        if let Some(name) = node.collection.as_deref() {
            if CollectionId::parse(name).is_none() {
                return Err(TaxonomyConfigError::UnknownCollection {
                    path,
                    name: name.to_string(),
                });
            }
        }

        validate_siblings(&path, &node.children, level + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{TaxonomyConfig, TaxonomyConfigError};
    use crate::model::collection::CollectionId;
    use crate::model::taxonomy::TaxonomyPath;

    #[test]
    fn builtin_declaration_is_valid() {
        let config = TaxonomyConfig::builtin().expect("builtin taxonomy should parse");
        let keys = config
            .domains
            .iter()
            .map(|domain| domain.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, ["intellectual", "emotional", "physical", "beyond"]);
        for domain in &config.domains {
            assert!((4..=8).contains(&domain.children.len()), "{}", domain.key);
        }
    }

    #[test]
    fn routing_table_lists_defaults_and_overrides() {
        let table = TaxonomyConfig::builtin().unwrap().routing_table();
        assert_eq!(
            table.defaults.get("intellectual"),
            Some(&CollectionId::ReadingList)
        );
        assert_eq!(
            table
                .overrides
                .get(&TaxonomyPath::category("physical", "places")),
            Some(&CollectionId::Venues)
        );
        assert!(!table
            .overrides
            .contains_key(&TaxonomyPath::category("intellectual", "books")));
    }

    #[test]
    fn rejects_duplicate_sibling_keys() {
        let raw = r#"{"domains":[{"key":"a","label":"A","collection":"media","children":[
            {"key":"x","label":"X"},{"key":"x","label":"X again"}]}]}"#;
        let err = TaxonomyConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(err, TaxonomyConfigError::DuplicateKey { ref key, .. } if key == "x"));
    }

    #[test]
    fn rejects_fourth_level() {
        let raw = r#"{"domains":[{"key":"a","label":"A","children":[
            {"key":"b","label":"B","children":[
              {"key":"c","label":"C","children":[{"key":"d","label":"D"}]}]}]}]}"#;
        let err = TaxonomyConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(err, TaxonomyConfigError::TooDeep(ref path) if path == "a/b/c/d"));
    }

    #[test]
    fn rejects_unknown_collection_and_bad_keys() {
        let unknown = r#"{"domains":[{"key":"a","label":"A","collection":"books"}]}"#;
        assert!(matches!(
            TaxonomyConfig::from_json_str(unknown),
            Err(TaxonomyConfigError::UnknownCollection { .. })
        ));

        let bad_key = r#"{"domains":[{"key":"Bad Key","label":"A"}]}"#;
        assert!(matches!(
            TaxonomyConfig::from_json_str(bad_key),
            Err(TaxonomyConfigError::InvalidKey { .. })
        ));

        assert!(matches!(
            TaxonomyConfig::from_json_str(r#"{"domains":[]}"#),
            Err(TaxonomyConfigError::EmptyTree)
        ));
    }
}
