//! Tracked item model.
//!
//! # Responsibility
//! - Define the canonical record for one logged book/film/place/habit/etc.
//! - Define stored attribute values and the raw caller payload shape.
//!
//! # Invariants
//! - `id` is assigned by storage on insert and never changes afterwards.
//! - `rating`, when present, lies in `[0, 5]`.
//! - `updated_at >= created_at`; both are epoch milliseconds.

use crate::model::taxonomy::TaxonomyPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Storage-assigned identifier, unique within one collection.
pub type ItemId = i64;

/// Raw caller payload for create/update: field name to JSON value.
///
/// `null` clears an optional field on update.
pub type ItemPayload = serde_json::Map<String, serde_json::Value>;

/// Progress state of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not started yet. Default for new items.
    #[default]
    Wishlist,
    InProgress,
    Completed,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [Self::Wishlist, Self::InProgress, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wishlist => "wishlist",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wishlist" => Some(Self::Wishlist),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value of one stored attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Converts to the JSON shape used by payloads and shell responses.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Text(value) => serde_json::Value::from(value.as_str()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Canonical item as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    /// Leaf node this item is classified under.
    pub path: TaxonomyPath,
    pub title: String,
    pub status: ItemStatus,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    /// Collection-specific attributes; absent values are omitted.
    pub attributes: BTreeMap<String, FieldValue>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds, `>= created_at`.
    pub updated_at: i64,
}

impl Item {
    /// Reads one attribute or universal field by schema name.
    pub fn field(&self, name: &str) -> FieldValue {
        match name {
            "title" => FieldValue::Text(self.title.clone()),
            "status" => FieldValue::Text(self.status.as_str().to_string()),
            "rating" => FieldValue::from(self.rating.map(i64::from)),
            "notes" => FieldValue::from(self.notes.clone()),
            other => self
                .attributes
                .get(other)
                .cloned()
                .unwrap_or(FieldValue::Null),
        }
    }
}
