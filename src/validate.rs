//! Closed-schema validation of raw note records.
//!
//! Every record is checked against fixed field and value sets before it is
//! deserialized into a [`RawNote`]. Unknown fields are rejected rather than
//! dropped, and every violation in a record is collected so the report shows
//! all of them at once. Misspelled field names and enum values carry a
//! closest-match suggestion.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::RawNote;

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static NOTE_FIELDS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    [
        "title",
        "textContent",
        "textContentHtml",
        "createdTimestampUsec",
        "userEditedTimestampUsec",
        "isTrashed",
        "isPinned",
        "isArchived",
        "color",
        "attachments",
        "annotations",
        "listContent",
        "labels",
        "sharees",
    ]
    .into_iter()
    .collect()
});

pub static ATTACHMENT_FIELDS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["filePath", "mimetype"].into_iter().collect());

pub static ANNOTATION_FIELDS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["source", "title", "description", "url"].into_iter().collect());

pub static LIST_ITEM_FIELDS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["text", "textHtml", "isChecked"].into_iter().collect());

pub static LABEL_FIELDS: LazyLock<HashSet<&str>> = LazyLock::new(|| ["name"].into_iter().collect());

pub static SHAREE_FIELDS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["isOwner", "type", "email"].into_iter().collect());

pub static VALID_COLORS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    crate::model::NoteColor::ALL
        .iter()
        .map(crate::model::NoteColor::as_str)
        .collect()
});

pub static VALID_ANNOTATION_SOURCES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    crate::model::AnnotationSource::ALL
        .iter()
        .map(crate::model::AnnotationSource::as_str)
        .collect()
});

/// MIME prefix every attachment must carry.
pub const IMAGE_MIME_PREFIX: &str = "image/";

// ── Policy ───────────────────────────────────────────────────

/// What a schema failure does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Any invalid record aborts the run.
    #[default]
    Strict,
    /// Invalid records are reported, counted and excluded.
    Tolerant,
}

impl ValidationPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Tolerant => "tolerant",
        }
    }
}

// ── Diagnostics ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    WrongType,
    UnknownField,
    InvalidValue,
    /// A well-formed value that names content the importer cannot carry.
    UnsupportedContent,
}

/// One offending field in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON path of the field, e.g. `attachments[1].mimetype`.
    pub path: String,
    pub kind: ViolationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A record that failed structural validation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{origin}: {}", summarize(.violations))]
pub struct SchemaError {
    /// Where the record came from (file name or index).
    pub origin: String,
    pub violations: Vec<Violation>,
}

impl SchemaError {
    /// Error with a single violation.
    #[must_use]
    pub fn new(origin: &str, path: &str, kind: ViolationKind, message: String) -> Self {
        Self {
            origin: origin.to_string(),
            violations: vec![Violation {
                path: path.to_string(),
                kind,
                message,
                suggestion: None,
            }],
        }
    }

    /// True when any violation names unsupported content.
    #[must_use]
    pub fn is_unsupported_content(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.kind == ViolationKind::UnsupportedContent)
    }

    /// Messages of the unsupported-content violations, joined.
    #[must_use]
    pub fn unsupported_detail(&self) -> String {
        self.violations
            .iter()
            .filter(|v| v.kind == ViolationKind::UnsupportedContent)
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn summarize(violations: &[Violation]) -> String {
    let mut out = String::new();
    for (i, v) in violations.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{}: {}", v.path, v.message);
        if let Some(suggestion) = &v.suggestion {
            let _ = write!(out, " (did you mean '{suggestion}'?)");
        }
    }
    out
}

// ── Entry points ─────────────────────────────────────────────

/// Parse and validate one record from raw bytes.
///
/// # Errors
///
/// Returns a `SchemaError` if the bytes are not JSON or the record
/// violates the note schema.
pub fn parse_note(bytes: &[u8], origin: &str) -> Result<RawNote, SchemaError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        SchemaError::new(origin, "$", ViolationKind::InvalidValue, format!("not valid JSON: {e}"))
    })?;
    validate_note(&value, origin)
}

/// Validate one record and build the typed note from it.
///
/// # Errors
///
/// Returns a `SchemaError` listing every violation found in the record.
pub fn validate_note(value: &Value, origin: &str) -> Result<RawNote, SchemaError> {
    let mut checker = Checker::default();
    checker.note(value);

    if !checker.violations.is_empty() {
        return Err(SchemaError {
            origin: origin.to_string(),
            violations: checker.violations,
        });
    }

    RawNote::deserialize(value).map_err(|e| {
        SchemaError::new(origin, "$", ViolationKind::InvalidValue, e.to_string())
    })
}

// ── Walker ───────────────────────────────────────────────────

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn push(&mut self, path: String, kind: ViolationKind, message: impl Into<String>) {
        self.violations.push(Violation {
            path,
            kind,
            message: message.into(),
            suggestion: None,
        });
    }

    fn note(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else {
            self.push("$".into(), ViolationKind::WrongType, "expected an object");
            return;
        };

        self.closed_fields(obj, "", &NOTE_FIELDS);

        self.required_string(obj, "", "title");
        self.optional_string(obj, "", "textContent");
        self.optional_string(obj, "", "textContentHtml");
        self.timestamp(obj, "createdTimestampUsec", true);
        self.timestamp(obj, "userEditedTimestampUsec", false);
        for flag in ["isTrashed", "isPinned", "isArchived"] {
            self.optional_bool(obj, "", flag);
        }

        if let Some(color) = obj.get("color") {
            match color.as_str() {
                Some(c) if VALID_COLORS.contains(c) => {}
                Some(c) => self.violations.push(Violation {
                    path: "color".into(),
                    kind: ViolationKind::InvalidValue,
                    message: format!("unknown color '{c}'"),
                    suggestion: find_closest_match(&c.to_uppercase(), &VALID_COLORS),
                }),
                None => self.push("color".into(), ViolationKind::WrongType, "expected a string"),
            }
        }

        self.array(obj, "attachments", Self::attachment);
        self.array(obj, "annotations", Self::annotation);
        self.array(obj, "listContent", Self::list_item);
        self.array(obj, "labels", Self::label);
        self.array(obj, "sharees", Self::sharee);
    }

    fn attachment(&mut self, obj: &Map<String, Value>, path: &str) {
        self.closed_fields(obj, path, &ATTACHMENT_FIELDS);
        self.required_string(obj, path, "filePath");
        self.required_string(obj, path, "mimetype");

        if let Some(mime) = obj.get("mimetype").and_then(Value::as_str) {
            if !mime.starts_with(IMAGE_MIME_PREFIX) {
                let file = obj
                    .get("filePath")
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown file>");
                self.push(
                    format!("{path}.mimetype"),
                    ViolationKind::UnsupportedContent,
                    format!("attachment '{file}' has unsupported type '{mime}'"),
                );
            }
        }
    }

    fn annotation(&mut self, obj: &Map<String, Value>, path: &str) {
        self.closed_fields(obj, path, &ANNOTATION_FIELDS);
        self.required_string(obj, path, "source");
        self.optional_string(obj, path, "title");
        self.optional_string(obj, path, "description");
        self.optional_string(obj, path, "url");

        if let Some(source) = obj.get("source").and_then(Value::as_str) {
            if !VALID_ANNOTATION_SOURCES.contains(source) {
                self.push(
                    format!("{path}.source"),
                    ViolationKind::UnsupportedContent,
                    format!("annotation source '{source}' is not supported"),
                );
            }
        }
    }

    fn list_item(&mut self, obj: &Map<String, Value>, path: &str) {
        self.closed_fields(obj, path, &LIST_ITEM_FIELDS);
        self.optional_string(obj, path, "text");
        self.optional_string(obj, path, "textHtml");
        self.optional_bool(obj, path, "isChecked");
    }

    fn label(&mut self, obj: &Map<String, Value>, path: &str) {
        self.closed_fields(obj, path, &LABEL_FIELDS);
        self.required_string(obj, path, "name");
    }

    fn sharee(&mut self, obj: &Map<String, Value>, path: &str) {
        self.closed_fields(obj, path, &SHAREE_FIELDS);
        self.optional_bool(obj, path, "isOwner");
        self.optional_string(obj, path, "type");
        self.optional_string(obj, path, "email");
    }

    fn array(
        &mut self,
        obj: &Map<String, Value>,
        field: &str,
        check: fn(&mut Self, &Map<String, Value>, &str),
    ) {
        let Some(value) = obj.get(field) else {
            return;
        };
        let Some(items) = value.as_array() else {
            self.push(field.into(), ViolationKind::WrongType, "expected an array");
            return;
        };
        for (i, item) in items.iter().enumerate() {
            let path = format!("{field}[{i}]");
            match item.as_object() {
                Some(inner) => check(self, inner, &path),
                None => self.push(path, ViolationKind::WrongType, "expected an object"),
            }
        }
    }

    fn closed_fields(&mut self, obj: &Map<String, Value>, path: &str, known: &HashSet<&str>) {
        for key in obj.keys() {
            if !known.contains(key.as_str()) {
                self.violations.push(Violation {
                    path: join(path, key),
                    kind: ViolationKind::UnknownField,
                    message: format!("unknown field '{key}'"),
                    suggestion: find_closest_match(key, known),
                });
            }
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, path: &str, field: &str) {
        match obj.get(field) {
            None => self.push(join(path, field), ViolationKind::Missing, "required field is missing"),
            Some(v) if !v.is_string() => {
                self.push(join(path, field), ViolationKind::WrongType, "expected a string");
            }
            Some(_) => {}
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, path: &str, field: &str) {
        if obj.get(field).is_some_and(|v| !v.is_string()) {
            self.push(join(path, field), ViolationKind::WrongType, "expected a string");
        }
    }

    fn optional_bool(&mut self, obj: &Map<String, Value>, path: &str, field: &str) {
        if obj.get(field).is_some_and(|v| !v.is_boolean()) {
            self.push(join(path, field), ViolationKind::WrongType, "expected a boolean");
        }
    }

    fn timestamp(&mut self, obj: &Map<String, Value>, field: &str, required: bool) {
        let Some(value) = obj.get(field) else {
            if required {
                self.push(field.into(), ViolationKind::Missing, "required field is missing");
            }
            return;
        };
        match value.as_i64() {
            Some(usec) if DateTime::from_timestamp_micros(usec).is_some() => {}
            Some(usec) => self.push(
                field.into(),
                ViolationKind::InvalidValue,
                format!("timestamp {usec} is out of range"),
            ),
            None => self.push(
                field.into(),
                ViolationKind::WrongType,
                "expected an integer (microseconds)",
            ),
        }
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

/// Find the closest valid value within edit distance 3.
fn find_closest_match(input: &str, valid: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(b, d)| dist < d || (dist == d && v < b)) {
            best = Some((v, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Single-row optimization
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
