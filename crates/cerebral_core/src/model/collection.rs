//! Physical storage collections.
//!
//! # Responsibility
//! - Enumerate every storage grouping items can be routed to.
//! - Own the mapping from collection to table name.
//!
//! # Invariants
//! - Table names are compile-time constants; no collection identifier is
//!   ever derived from caller-supplied text at query time.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of one physical item collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionId {
    /// Books, courses, articles and other structured reading material.
    ReadingList,
    /// Films, shows, music, art, games, podcasts.
    Media,
    /// Reflections, ideas, dreams and other dated free text.
    Journal,
    /// Physical-world places: restaurants, shops, destinations.
    Venues,
    /// Repeated activities: workouts, recipes, meditation.
    Practices,
}

impl CollectionId {
    pub const ALL: [CollectionId; 5] = [
        Self::ReadingList,
        Self::Media,
        Self::Journal,
        Self::Venues,
        Self::Practices,
    ];

    /// Stable configuration key, also used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingList => "reading_list",
            Self::Media => "media",
            Self::Journal => "journal",
            Self::Venues => "venues",
            Self::Practices => "practices",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == value.trim())
    }

    /// SQLite table backing this collection.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::ReadingList => "reading_list",
            Self::Media => "media",
            Self::Journal => "journal_entries",
            Self::Venues => "venues",
            Self::Practices => "practices",
        }
    }
}

impl Display for CollectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
