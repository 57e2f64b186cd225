//! Stream catalog
//!
//! Discovery produces a catalog describing every stream. The user marks
//! streams as selected and hands the catalog back for `sync`.

use crate::engine::StreamDefinition;
use crate::error::{Error, Result};
use crate::streams::all_streams;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Ordered set of catalog entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// One entry per stream
    pub streams: Vec<CatalogEntry>,
}

/// One stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream id
    pub tap_stream_id: String,
    /// Stream name
    pub stream: String,
    /// Primary key fields
    #[serde(default)]
    pub key_properties: Vec<String>,
    /// JSON schema of the records
    #[serde(default)]
    pub schema: JsonValue,
    /// Breadcrumb-addressed metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

/// Metadata attached to the stream (empty breadcrumb) or one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path to the described node
    pub breadcrumb: Vec<String>,
    /// Metadata values
    pub metadata: JsonObject,
}

impl CatalogEntry {
    /// Root (stream-level) metadata, if present
    pub fn root_metadata(&self) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|entry| entry.breadcrumb.is_empty())
            .map(|entry| &entry.metadata)
    }

    /// Whether the user selected this stream.
    ///
    /// Root metadata `selected` wins; a legacy `selected` flag on the schema
    /// is honoured when metadata is silent.
    pub fn is_selected(&self) -> bool {
        if let Some(selected) = self
            .root_metadata()
            .and_then(|metadata| metadata.get("selected"))
            .and_then(JsonValue::as_bool)
        {
            return selected;
        }
        self.schema
            .get("selected")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Build the discovered entry for a stream definition
    pub fn discovered(stream: &StreamDefinition) -> Self {
        let mut metadata = vec![MetadataEntry {
            breadcrumb: Vec::new(),
            metadata: root_metadata(stream),
        }];

        let automatic = stream.pk_fields.iter().chain(stream.bookmark_key.iter());
        for field in automatic {
            let mut values = JsonObject::new();
            values.insert("inclusion".to_string(), json!("automatic"));
            metadata.push(MetadataEntry {
                breadcrumb: vec!["properties".to_string(), (*field).to_string()],
                metadata: values,
            });
        }

        Self {
            tap_stream_id: stream.tap_stream_id.to_string(),
            stream: stream.tap_stream_id.to_string(),
            key_properties: stream.key_properties(),
            schema: discovered_schema(stream),
            metadata,
        }
    }
}

fn root_metadata(stream: &StreamDefinition) -> JsonObject {
    let mut metadata = JsonObject::new();
    metadata.insert(
        "table-key-properties".to_string(),
        json!(stream.key_properties()),
    );
    metadata.insert(
        "forced-replication-method".to_string(),
        json!(stream.replication_method().as_str()),
    );
    if !stream.bookmark_properties().is_empty() {
        metadata.insert(
            "valid-replication-keys".to_string(),
            json!(stream.bookmark_properties()),
        );
    }
    metadata.insert("inclusion".to_string(), json!("available"));
    metadata
}

fn discovered_schema(stream: &StreamDefinition) -> JsonValue {
    let mut properties = JsonObject::new();
    for field in stream.pk_fields {
        properties.insert((*field).to_string(), json!({"type": ["string"]}));
    }
    if let Some(key) = stream.bookmark_key {
        let property = if key == "JournalNumber" {
            json!({"type": ["null", "integer"]})
        } else {
            json!({"type": ["null", "string"], "format": "date-time"})
        };
        properties.insert(key.to_string(), property);
    }

    json!({
        "type": ["null", "object"],
        "properties": properties,
        "additionalProperties": true
    })
}

impl Catalog {
    /// Catalog describing every stream, nothing selected
    pub fn discover() -> Self {
        Self {
            streams: all_streams().iter().map(CatalogEntry::discovered).collect(),
        }
    }

    /// Parse a catalog from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid catalog JSON: {e}")))
    }

    /// Load a catalog from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read catalog file: {e}")))?;
        Self::from_json(&contents)
    }

    /// Entry for a stream
    pub fn get_stream(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }

    /// Whether a stream is present and selected
    pub fn is_selected(&self, tap_stream_id: &str) -> bool {
        self.get_stream(tap_stream_id)
            .is_some_and(CatalogEntry::is_selected)
    }

    /// Ids of the selected streams, in catalog order
    pub fn selected_stream_ids(&self) -> Vec<&str> {
        self.streams
            .iter()
            .filter(|entry| entry.is_selected())
            .map(|entry| entry.tap_stream_id.as_str())
            .collect()
    }

    /// Mark streams as selected in root metadata; unknown ids are ignored
    #[must_use]
    pub fn with_selected(mut self, tap_stream_ids: &[&str]) -> Self {
        for entry in &mut self.streams {
            if !tap_stream_ids.contains(&entry.tap_stream_id.as_str()) {
                continue;
            }
            match entry.metadata.iter_mut().find(|m| m.breadcrumb.is_empty()) {
                Some(root) => {
                    root.metadata.insert("selected".to_string(), json!(true));
                }
                None => {
                    let mut metadata = JsonObject::new();
                    metadata.insert("selected".to_string(), json!(true));
                    entry.metadata.push(MetadataEntry {
                        breadcrumb: Vec::new(),
                        metadata,
                    });
                }
            }
        }
        self
    }

    /// Serialize the catalog as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::find_stream;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_discover_covers_every_stream_in_order() {
        let catalog = Catalog::discover();
        let ids: Vec<&str> = catalog.streams.iter().map(|s| s.tap_stream_id.as_str()).collect();
        assert_eq!(ids, crate::streams::all_stream_ids());
        assert!(catalog.selected_stream_ids().is_empty());
    }

    #[test]
    fn test_discovered_metadata() {
        let entry = CatalogEntry::discovered(find_stream("journals").unwrap());
        let root = entry.root_metadata().unwrap();

        assert_eq!(root["table-key-properties"], json!(["JournalID"]));
        assert_eq!(root["forced-replication-method"], json!("INCREMENTAL"));
        assert_eq!(root["valid-replication-keys"], json!(["JournalNumber"]));
        assert_eq!(
            entry.schema["properties"]["JournalNumber"],
            json!({"type": ["null", "integer"]})
        );

        let automatic: Vec<&Vec<String>> = entry
            .metadata
            .iter()
            .filter(|m| m.metadata.get("inclusion") == Some(&json!("automatic")))
            .map(|m| &m.breadcrumb)
            .collect();
        assert_eq!(automatic.len(), 2);
    }

    #[test]
    fn test_full_table_metadata() {
        let entry = CatalogEntry::discovered(find_stream("currencies").unwrap());
        let root = entry.root_metadata().unwrap();
        assert_eq!(root["forced-replication-method"], json!("FULL_TABLE"));
        assert!(root.get("valid-replication-keys").is_none());
    }

    #[test]
    fn test_selection_from_metadata_and_legacy_schema() {
        let catalog = Catalog::from_json(
            r#"{"streams": [
                {"tap_stream_id": "invoices", "stream": "invoices",
                 "metadata": [{"breadcrumb": [], "metadata": {"selected": true}}]},
                {"tap_stream_id": "contacts", "stream": "contacts",
                 "schema": {"selected": true}},
                {"tap_stream_id": "items", "stream": "items",
                 "schema": {"selected": true},
                 "metadata": [{"breadcrumb": [], "metadata": {"selected": false}}]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(catalog.selected_stream_ids(), vec!["invoices", "contacts"]);
        assert!(!catalog.is_selected("items"));
        assert!(!catalog.is_selected("missing"));
    }

    #[test]
    fn test_with_selected_round_trip() {
        let catalog = Catalog::discover().with_selected(&["accounts", "journals"]);
        let reparsed = Catalog::from_json(&catalog.to_json_pretty().unwrap()).unwrap();

        assert_eq!(reparsed.selected_stream_ids(), vec!["journals", "accounts"]);
    }

    #[test]
    fn test_invalid_catalog() {
        let err = Catalog::from_json("[]").unwrap_err();
        assert!(err.to_string().contains("Invalid catalog JSON"));
    }
}
