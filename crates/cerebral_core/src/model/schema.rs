//! Declarative form schema vocabulary.
//!
//! # Responsibility
//! - Describe one entry field: name, kind, requiredness, constraint.
//! - Stay pure data; validation lives in `schema::validate`.
//!
//! # Invariants
//! - Field names are `'static` so storage column names can only originate
//!   from schema definitions.

use serde::Serialize;

/// Value kind accepted by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line free text.
    LongText,
    Integer,
    /// Calendar year as an integer.
    Year,
    /// One value out of a fixed set (see `FieldConstraint::OneOf`).
    Enumerated,
    /// Integer star rating in `[0, 5]`.
    Rating,
    /// ISO calendar date `YYYY-MM-DD`.
    Date,
}

impl FieldKind {
    /// Text-typed kinds take part in free-text search.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::LongText)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::LongText => "long_text",
            Self::Integer => "integer",
            Self::Year => "year",
            Self::Enumerated => "enumerated",
            Self::Rating => "rating",
            Self::Date => "date",
        }
    }
}

/// Additional bound applied on top of the field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldConstraint {
    None,
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    /// Allowed values for `FieldKind::Enumerated`.
    OneOf { values: &'static [&'static str] },
    /// Maximum number of characters for text kinds.
    MaxChars { max: usize },
}

/// One ordered entry of a node's form schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub constraint: FieldConstraint,
}

impl FieldSpec {
    pub const fn text(name: &'static str, label: &'static str, max: usize) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            required: false,
            constraint: FieldConstraint::MaxChars { max },
        }
    }

    pub const fn long_text(name: &'static str, label: &'static str, max: usize) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::LongText,
            required: false,
            constraint: FieldConstraint::MaxChars { max },
        }
    }

    pub const fn integer(name: &'static str, label: &'static str, min: i64, max: i64) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Integer,
            required: false,
            constraint: FieldConstraint::Range { min, max },
        }
    }

    pub const fn year(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Year,
            required: false,
            constraint: FieldConstraint::Range { min: 0, max: 9999 },
        }
    }

    pub const fn one_of(
        name: &'static str,
        label: &'static str,
        values: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Enumerated,
            required: false,
            constraint: FieldConstraint::OneOf { values },
        }
    }

    pub const fn rating(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Rating,
            required: false,
            constraint: FieldConstraint::Range { min: 0, max: 5 },
        }
    }

    pub const fn date(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Date,
            required: false,
            constraint: FieldConstraint::None,
        }
    }

    /// Marks the field as required.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
