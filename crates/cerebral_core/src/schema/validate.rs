//! Payload validation against a node's form schema.
//!
//! # Responsibility
//! - Whitelist payload keys against schema field names.
//! - Coerce JSON values into typed storage values per field kind.
//! - Report every offending field at once.
//!
//! # Invariants
//! - Unknown keys are rejected, never dropped or written.
//! - Identity and timestamp keys are read-only.
//! - Blank optional text is stored as absent; blank required text fails.

use crate::model::item::{FieldValue, ItemPayload};
use crate::model::schema::{FieldConstraint, FieldKind, FieldSpec};
use crate::schema::FormSchema;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Keys callers may see on items but never write.
const READ_ONLY_KEYS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "path",
    "domain",
    "category",
    "subcategory",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validated values keyed by schema field name.
pub type ValidatedFields = BTreeMap<&'static str, FieldValue>;

/// Reason one field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FieldProblem {
    /// Required field absent or `null`.
    Missing,
    /// Key is not part of the node schema.
    Unknown,
    /// Key is managed by the engine.
    ReadOnly,
    WrongKind { expected: FieldKind },
    OutOfRange { min: i64, max: i64 },
    NotAllowed { allowed: &'static [&'static str] },
    /// Required text is blank after trimming.
    Empty,
    TooLong { max: usize },
    /// Text is not an ISO `YYYY-MM-DD` date.
    InvalidDate,
    /// Items may only be classified under leaf nodes.
    NotLeaf,
}

impl Display for FieldProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "is required"),
            Self::Unknown => write!(f, "is not a field of this node"),
            Self::ReadOnly => write!(f, "is read-only"),
            Self::WrongKind { expected } => write!(f, "must be of kind {}", expected.as_str()),
            Self::OutOfRange { min, max } => write!(f, "must be between {min} and {max}"),
            Self::NotAllowed { allowed } => write!(f, "must be one of {}", allowed.join("|")),
            Self::Empty => write!(f, "must not be blank"),
            Self::TooLong { max } => write!(f, "must be at most {max} characters"),
            Self::InvalidDate => write!(f, "must be a YYYY-MM-DD date"),
            Self::NotLeaf => write!(f, "must name a leaf node"),
        }
    }
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    #[serde(flatten)]
    pub problem: FieldProblem,
}

/// Payload violates the node schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Sorted by field name for stable messages.
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, problem: FieldProblem) -> Self {
        Self {
            issues: vec![FieldIssue {
                field: field.into(),
                problem,
            }],
        }
    }

    /// Offending field names, sorted and deduplicated.
    pub fn fields(&self) -> Vec<&str> {
        let mut names = self
            .issues
            .iter()
            .map(|issue| issue.field.as_str())
            .collect::<Vec<_>>();
        names.dedup();
        names
    }

    /// Returns the problem recorded for `field`, if any.
    pub fn problem_for(&self, field: &str) -> Option<&FieldProblem> {
        self.issues
            .iter()
            .find(|issue| issue.field == field)
            .map(|issue| &issue.problem)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let details = self
            .issues
            .iter()
            .map(|issue| format!("`{}` {}", issue.field, issue.problem))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "validation failed: {details}")
    }
}

impl Error for ValidationError {}

#[derive(Default)]
struct IssueCollector {
    issues: Vec<FieldIssue>,
}

impl IssueCollector {
    fn push(&mut self, field: &str, problem: FieldProblem) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            problem,
        });
    }

    fn finish<T>(mut self, value: T) -> Result<T, ValidationError> {
        if self.issues.is_empty() {
            return Ok(value);
        }
        self.issues.sort_by(|a, b| a.field.cmp(&b.field));
        Err(ValidationError {
            issues: self.issues,
        })
    }
}

/// Validates a full create payload.
///
/// Absent `status` defaults to `wishlist`. The result holds every schema
/// field that carries a value.
pub fn validate_create(
    schema: &FormSchema,
    payload: &ItemPayload,
) -> Result<ValidatedFields, ValidationError> {
    let mut collector = IssueCollector::default();
    let mut fields = coerce_known_keys(schema, payload, &mut collector);

    fields
        .entry("status")
        .or_insert_with(|| FieldValue::Text("wishlist".to_string()));

    for spec in schema.fields.iter().filter(|spec| spec.required) {
        let present = fields.get(spec.name).is_some_and(|value| !value.is_null());
        let already_reported = collector.issues.iter().any(|issue| issue.field == spec.name);
        if !present && !already_reported {
            collector.push(spec.name, FieldProblem::Missing);
        }
    }

    fields.retain(|_, value| !value.is_null());
    collector.finish(fields)
}

/// Validates a partial update payload.
///
/// Returned values may be `FieldValue::Null` for optional fields the caller
/// clears; required fields can never be cleared.
pub fn validate_patch(
    schema: &FormSchema,
    patch: &ItemPayload,
) -> Result<ValidatedFields, ValidationError> {
    let mut collector = IssueCollector::default();
    let fields = coerce_known_keys(schema, patch, &mut collector);

    for (name, value) in &fields {
        let required = schema.field(name).is_some_and(|spec| spec.required);
        if required && value.is_null() {
            collector.push(name, FieldProblem::Missing);
        }
    }

    collector.finish(fields)
}

fn coerce_known_keys(
    schema: &FormSchema,
    payload: &ItemPayload,
    collector: &mut IssueCollector,
) -> ValidatedFields {
    let mut fields = ValidatedFields::new();
    for (key, raw) in payload {
        if READ_ONLY_KEYS.contains(&key.as_str()) {
            collector.push(key, FieldProblem::ReadOnly);
            continue;
        }
        let Some(spec) = schema.field(key) else {
            collector.push(key, FieldProblem::Unknown);
            continue;
        };
        match coerce_value(spec, raw) {
            Ok(value) => {
                fields.insert(spec.name, value);
            }
            Err(problem) => collector.push(spec.name, problem),
        }
    }
    fields
}

/// Coerces one JSON value into the storage value for `spec`.
///
/// Integers may arrive as JSON numbers or numeric strings (form inputs).
pub fn coerce_value(spec: &FieldSpec, raw: &Value) -> Result<FieldValue, FieldProblem> {
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }

    match spec.kind {
        FieldKind::Text | FieldKind::LongText => {
            let text = raw.as_str().ok_or(FieldProblem::WrongKind {
                expected: spec.kind,
            })?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return if spec.required {
                    Err(FieldProblem::Empty)
                } else {
                    Ok(FieldValue::Null)
                };
            }
            if let FieldConstraint::MaxChars { max } = spec.constraint {
                if trimmed.chars().count() > max {
                    return Err(FieldProblem::TooLong { max });
                }
            }
            Ok(FieldValue::Text(trimmed.to_string()))
        }
        FieldKind::Integer | FieldKind::Year | FieldKind::Rating => {
            let Some(number) = integer_from_json(raw) else {
                return Ok(FieldValue::Null);
            };
            let number = number.ok_or(FieldProblem::WrongKind {
                expected: spec.kind,
            })?;
            if let FieldConstraint::Range { min, max } = spec.constraint {
                if !(min..=max).contains(&number) {
                    return Err(FieldProblem::OutOfRange { min, max });
                }
            }
            Ok(FieldValue::Integer(number))
        }
        FieldKind::Enumerated => {
            let text = raw.as_str().ok_or(FieldProblem::WrongKind {
                expected: spec.kind,
            })?;
            let allowed = match spec.constraint {
                FieldConstraint::OneOf { values } => values,
                _ => &[],
            };
            if allowed.contains(&text) {
                Ok(FieldValue::Text(text.to_string()))
            } else {
                Err(FieldProblem::NotAllowed { allowed })
            }
        }
        FieldKind::Date => {
            let text = raw.as_str().ok_or(FieldProblem::WrongKind {
                expected: spec.kind,
            })?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(FieldValue::Null);
            }
            let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map_err(|_| FieldProblem::InvalidDate)?;
            Ok(FieldValue::Text(date.format(DATE_FORMAT).to_string()))
        }
    }
}

/// Returns `None` for a blank string (treated as absent) and `Some(None)`
/// for a value that is not an integer.
fn integer_from_json(raw: &Value) -> Option<Option<i64>> {
    match raw {
        Value::Number(number) => Some(number.as_i64()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.parse::<i64>().ok())
            }
        }
        _ => Some(None),
    }
}
