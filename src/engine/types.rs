//! Stream descriptors and statistics for the sync engine.

use crate::format::Formatter;
use crate::types::ReplicationMethod;

/// Per-stream request filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    /// Send `includeArchived=true` when the config asks for archived contacts
    ArchivedContacts,
}

/// How a stream is paged and bookmarked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One request filtered by `since`; bookmark is the max value seen
    Bookmarked,
    /// Page counter with `since` and ascending order
    Paginated {
        /// Optional extra request filter
        filter: Option<StreamFilter>,
    },
    /// Offset by journal number
    Journal,
    /// Page counter without `since`; old records dropped in-process
    LinkedTransactions,
    /// One unconditional request; no bookmark
    Everything,
}

/// Static description of one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDefinition {
    /// Stream id, e.g. `bank_transactions`
    pub tap_stream_id: &'static str,
    /// Primary key fields
    pub pk_fields: &'static [&'static str],
    /// Bookmark field; `None` for full-table streams
    pub bookmark_key: Option<&'static str>,
    /// Sync strategy
    pub strategy: Strategy,
    /// Optional record formatter
    pub formatter: Option<Formatter>,
}

impl StreamDefinition {
    /// Replication method advertised in the catalog
    pub fn replication_method(&self) -> ReplicationMethod {
        match self.strategy {
            Strategy::Everything => ReplicationMethod::FullTable,
            _ => ReplicationMethod::Incremental,
        }
    }

    /// Primary key fields as owned strings
    pub fn key_properties(&self) -> Vec<String> {
        self.pk_fields.iter().map(ToString::to_string).collect()
    }

    /// Bookmark fields as owned strings
    pub fn bookmark_properties(&self) -> Vec<String> {
        self.bookmark_key.iter().map(ToString::to_string).collect()
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Total streams synced
    pub streams_synced: usize,
    /// Records dropped as older than the bookmark
    pub records_skipped: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Fold another stream's stats into these
    pub fn merge(&mut self, other: &SyncStats) {
        self.records_synced += other.records_synced;
        self.pages_fetched += other.pages_fetched;
        self.streams_synced += other.streams_synced;
        self.records_skipped += other.records_skipped;
        self.duration_ms += other.duration_ms;
    }
}
