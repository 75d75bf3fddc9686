//! Static field sets: the universal item fields and one attribute set per
//! collection.
//!
//! Attribute field names double as column names in the collection tables
//! (see `db/migrations/0001_collections.sql`); the two must stay in sync.

use crate::model::collection::CollectionId;
use crate::model::schema::FieldSpec;

/// Allowed `status` values, in workflow order.
pub const STATUS_VALUES: &[&str] = &["wishlist", "in_progress", "completed"];

const MEDIA_FORMATS: &[&str] = &[
    "film",
    "series",
    "album",
    "song",
    "artwork",
    "game",
    "podcast",
    "documentary",
    "other",
];

const MOODS: &[&str] = &[
    "joyful", "grateful", "calm", "neutral", "curious", "anxious", "sad", "angry",
];

const FREQUENCIES: &[&str] = &["daily", "weekly", "monthly", "occasional"];

/// Fields every item carries regardless of node.
pub const UNIVERSAL_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", "Title", 200).required(),
    FieldSpec::one_of("status", "Status", STATUS_VALUES).required(),
    FieldSpec::rating("rating", "Rating"),
    FieldSpec::long_text("notes", "Notes", 10_000),
];

const READING_LIST_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("author", "Author", 200),
    FieldSpec::year("year", "Year"),
    FieldSpec::text("genre", "Genre", 100),
    FieldSpec::integer("pages", "Pages", 1, 50_000),
    FieldSpec::text("isbn", "ISBN", 32),
    FieldSpec::text("publisher", "Publisher", 200),
    FieldSpec::date("read_date", "Date read"),
    FieldSpec::text("cover_image", "Cover image", 2_048),
];

const MEDIA_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("creator", "Creator", 200),
    FieldSpec::year("year", "Year"),
    FieldSpec::text("genre", "Genre", 100),
    FieldSpec::one_of("format", "Format", MEDIA_FORMATS),
    FieldSpec::text("platform", "Platform", 100),
    FieldSpec::date("consumed_date", "Date watched/heard"),
];

const JOURNAL_FIELDS: &[FieldSpec] = &[
    FieldSpec::one_of("mood", "Mood", MOODS),
    FieldSpec::date("entry_date", "Entry date"),
    FieldSpec::text("tags", "Tags", 500),
];

const VENUE_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("location", "Location", 300).required(),
    FieldSpec::text("cuisine", "Cuisine", 100),
    FieldSpec::text("website", "Website", 2_048),
    FieldSpec::text("phone", "Phone", 40),
    FieldSpec::integer("price_level", "Price level", 1, 4),
    FieldSpec::date("visited_date", "Date visited"),
];

const PRACTICE_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("intensity", "Intensity", 1, 10),
    FieldSpec::text("duration", "Duration", 100),
    FieldSpec::one_of("frequency", "Frequency", FREQUENCIES),
    FieldSpec::long_text("benefits", "Benefits", 5_000),
    FieldSpec::date("last_practiced", "Last practiced"),
];

/// Returns the collection-specific attribute fields, in form order.
pub fn attribute_fields(collection: CollectionId) -> &'static [FieldSpec] {
    match collection {
        CollectionId::ReadingList => READING_LIST_FIELDS,
        CollectionId::Media => MEDIA_FIELDS,
        CollectionId::Journal => JOURNAL_FIELDS,
        CollectionId::Venues => VENUE_FIELDS,
        CollectionId::Practices => PRACTICE_FIELDS,
    }
}

#[cfg(test)]
mod tests {
    use super::{attribute_fields, UNIVERSAL_FIELDS};
    use crate::model::collection::CollectionId;
    use std::collections::BTreeSet;

    #[test]
    fn attribute_names_never_shadow_universal_fields() {
        let universal = UNIVERSAL_FIELDS
            .iter()
            .map(|field| field.name)
            .collect::<BTreeSet<_>>();
        for collection in CollectionId::ALL {
            let mut seen = BTreeSet::new();
            for field in attribute_fields(collection) {
                assert!(!universal.contains(field.name), "{collection}: {}", field.name);
                assert!(seen.insert(field.name), "{collection}: duplicate {}", field.name);
            }
        }
    }
}
