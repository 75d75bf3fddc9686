//! External metadata lookup used to pre-fill create forms.
//!
//! Providers (book/film/music catalogues) live outside the core. Their
//! failures never block `create`; callers can always submit a manual
//! payload.

use crate::model::item::ItemPayload;
use crate::model::taxonomy::TaxonomyPath;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One suggested attribute set, keyed by schema field name.
pub type CandidateAttributes = ItemPayload;

/// Provider failure; logged and swallowed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSearchError {
    pub provider: String,
    pub message: String,
}

impl MetadataSearchError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl Display for MetadataSearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "metadata provider `{}` failed: {}", self.provider, self.message)
    }
}

impl Error for MetadataSearchError {}

/// Free-text catalogue lookup scoped to one taxonomy node.
pub trait MetadataSearch {
    fn search(
        &self,
        query: &str,
        path: &TaxonomyPath,
    ) -> Result<Vec<CandidateAttributes>, MetadataSearchError>;
}

/// Provider used when no catalogue is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadataSearch;

impl MetadataSearch for NoMetadataSearch {
    fn search(
        &self,
        _query: &str,
        _path: &TaxonomyPath,
    ) -> Result<Vec<CandidateAttributes>, MetadataSearchError> {
        Ok(Vec::new())
    }
}
