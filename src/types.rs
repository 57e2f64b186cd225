//! Common types used throughout the tap
//!
//! Shared type aliases and small enums used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single source entity, keyed by Xero field name
pub type Record = JsonObject;

/// Records returned by one HTTP call
pub type Page = Vec<Record>;

/// Records per full page on every paginated Xero endpoint
pub const FULL_PAGE_SIZE: usize = 100;

/// Sort clause sent with every paginated, incremental request
pub const UPDATED_ASC_ORDER: &str = "UpdatedDateUTC ASC";

// ============================================================================
// Replication Method
// ============================================================================

/// How a stream is replicated, as advertised in catalog metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Bookmark-driven, only new/updated records
    Incremental,
    /// Every record, every run
    FullTable,
}

impl ReplicationMethod {
    /// Metadata string for this method
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incremental => "INCREMENTAL",
            Self::FullTable => "FULL_TABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replication_method_serde() {
        let json = serde_json::to_string(&ReplicationMethod::FullTable).unwrap();
        assert_eq!(json, "\"FULL_TABLE\"");
        assert_eq!(ReplicationMethod::Incremental.as_str(), "INCREMENTAL");
    }
}
