//! Engine-level error taxonomy.
//!
//! # Responsibility
//! - Give callers one error type across registry, routing, validation and
//!   storage failures.
//! - Expose a stable `ErrorKind` for branching and for shell envelopes.
//!
//! # Invariants
//! - Storage failures keep their source and gain operation/node context.
//! - No variant is retried by the engine.

use crate::model::item::ItemId;
use crate::model::taxonomy::TaxonomyPath;
use crate::repo::item_store::StoreError;
use crate::schema::validate::ValidationError;
use crate::taxonomy::{UnknownNodeError, UnroutableNodeError, UnroutableReason};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse failure class callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownNode,
    Unroutable,
    Validation,
    NotFound,
    Store,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownNode => "unknown_node",
            Self::Unroutable => "unroutable",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Store => "store",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every engine operation.
#[derive(Debug)]
pub enum EngineError {
    UnknownNode(UnknownNodeError),
    /// Node exists but has no route; a configuration defect.
    Unroutable(UnroutableNodeError),
    Validation(ValidationError),
    /// No item with `id` under `path` in the routed collection.
    NotFound { id: ItemId, path: TaxonomyPath },
    Store {
        operation: &'static str,
        path: TaxonomyPath,
        source: StoreError,
    },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownNode(_) => ErrorKind::UnknownNode,
            Self::Unroutable(_) => ErrorKind::Unroutable,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    pub(crate) fn store(operation: &'static str, path: &TaxonomyPath, source: StoreError) -> Self {
        Self::Store {
            operation,
            path: path.clone(),
            source,
        }
    }

    /// Registry knows the node but the router does not.
    pub(crate) fn unrouted(err: UnknownNodeError) -> Self {
        Self::Unroutable(UnroutableNodeError {
            path: err.path,
            reason: UnroutableReason::NoCollection,
        })
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNode(err) => write!(f, "{err}"),
            Self::Unroutable(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { id, path } => write!(f, "item {id} not found under {path}"),
            Self::Store {
                operation,
                path,
                source,
            } => write!(f, "store failure during {operation} at {path}: {source}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownNode(err) => Some(err),
            Self::Unroutable(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::Store { source, .. } => Some(source),
        }
    }
}

impl From<UnknownNodeError> for EngineError {
    fn from(value: UnknownNodeError) -> Self {
        Self::UnknownNode(value)
    }
}

impl From<UnroutableNodeError> for EngineError {
    fn from(value: UnroutableNodeError) -> Self {
        Self::Unroutable(value)
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
