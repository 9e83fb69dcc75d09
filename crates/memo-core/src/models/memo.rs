//! Memo model and projection from raw store documents

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::store::RawFields;

/// Wire name of the body text field.
pub const FIELD_BODY_TEXT: &str = "bodyText";
/// Wire name of the last-updated timestamp field (Unix ms).
pub const FIELD_UPDATED_AT: &str = "updatedAt";
/// Wire name of the tag list field.
pub const FIELD_TAGS: &str = "tags";

/// A unique identifier for a memo, assigned by the document store.
///
/// Opaque and immutable once created; the core never generates these
/// itself for remote documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoId(String);

impl MemoId {
    /// Wrap a store-assigned identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MemoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A memo in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    /// Unique identifier
    pub id: MemoId,
    /// Plain text content; empty when the record carried none
    pub body_text: String,
    /// Last update timestamp (Unix ms); `None` marks a record that is not
    /// yet visible
    pub updated_at: Option<i64>,
    /// Distinct tag labels in first-seen order
    pub tags: Vec<String>,
}

impl Memo {
    /// Project a raw store document into a well-formed memo.
    ///
    /// The store imposes no schema, so every field is defaulted when absent
    /// or malformed: missing body text becomes the empty string, a missing
    /// or non-integer timestamp becomes `None`, and anything that is not an
    /// array of strings becomes an empty tag list. Projection never fails.
    #[must_use]
    pub fn project(id: impl Into<MemoId>, fields: &RawFields) -> Self {
        let body_text = fields
            .get(FIELD_BODY_TEXT)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let updated_at = fields.get(FIELD_UPDATED_AT).and_then(Value::as_i64);
        let tags = project_tags(fields.get(FIELD_TAGS));

        Self {
            id: id.into(),
            body_text,
            updated_at,
            tags,
        }
    }

    /// Whether this memo may be rendered.
    ///
    /// A record without an update timestamp is treated as not yet loaded.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.updated_at.is_some()
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.body_text
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Formatted update timestamp, or the empty string when absent
    #[must_use]
    pub fn updated_at_display(&self) -> String {
        self.updated_at
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|date| date.format("%Y/%m/%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Coerce a raw tags value into a list of distinct strings.
///
/// Anything that is not an array of strings degrades to an empty list.
/// Duplicates are dropped on read, keeping the first occurrence.
fn project_tags(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(tag) = item.as_str() else {
            return Vec::new();
        };
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Build the wire field bag for a create or full overwrite.
#[must_use]
pub fn memo_fields(body_text: &str, tags: &[String], updated_at_ms: i64) -> RawFields {
    let mut fields = RawFields::new();
    fields.insert(
        FIELD_BODY_TEXT.to_string(),
        Value::String(body_text.to_string()),
    );
    fields.insert(
        FIELD_UPDATED_AT.to_string(),
        Value::Number(updated_at_ms.into()),
    );
    fields.insert(
        FIELD_TAGS.to_string(),
        Value::Array(tags.iter().cloned().map(Value::String).collect()),
    );
    fields
}
