//! State types
//!
//! The persisted document has the shape
//! `{"currently_syncing": <id|null>, "bookmarks": {<stream>: {<key>: <value>, "offset": {...}}}}`.

use crate::decode::parse_date;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key under a stream's bookmarks holding in-progress pagination
pub const OFFSET_KEY: &str = "offset";

/// Complete sync state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Stream whose sync began and has not been confirmed complete
    #[serde(default)]
    pub currently_syncing: Option<String>,

    /// Per-stream bookmark objects
    #[serde(default)]
    pub bookmarks: BTreeMap<String, JsonObject>,
}

impl SyncState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark value for a stream
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&JsonValue> {
        self.bookmarks.get(stream)?.get(key)
    }

    /// Set a bookmark value unconditionally
    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: JsonValue) {
        self.bookmarks
            .entry(stream.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Offset value for a stream
    pub fn get_offset(&self, stream: &str, key: &str) -> Option<&JsonValue> {
        self.get_bookmark(stream, OFFSET_KEY)?.get(key)
    }

    /// Set an offset value
    pub fn set_offset(&mut self, stream: &str, key: &str, value: JsonValue) {
        let bookmarks = self.bookmarks.entry(stream.to_string()).or_default();
        let offset = bookmarks
            .entry(OFFSET_KEY)
            .or_insert_with(|| JsonValue::Object(JsonObject::new()));
        if !offset.is_object() {
            *offset = JsonValue::Object(JsonObject::new());
        }
        if let JsonValue::Object(offset) = offset {
            offset.insert(key.to_string(), value);
        }
    }

    /// Remove all offsets for a stream
    pub fn clear_offsets(&mut self, stream: &str) {
        if let Some(bookmarks) = self.bookmarks.get_mut(stream) {
            bookmarks.shift_remove(OFFSET_KEY);
        }
    }
}

/// Order two bookmark values.
///
/// Timestamps compare as instants, numbers numerically, anything else as
/// strings. Mixed kinds fall back to comparing their JSON text.
pub fn compare_bookmarks(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => compare_numbers(x, y),
        (JsonValue::String(x), JsonValue::String(y)) => match (parse_date(x), parse_date(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn compare_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x.cmp(&y);
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => x.to_string().cmp(&y.to_string()),
    }
}
