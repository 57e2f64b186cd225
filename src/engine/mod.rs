//! Execution engine module
//!
//! Per-stream read loops.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Runs one stream's strategy against a `SyncContext`
//! - `StreamDefinition` / `Strategy` - Static stream descriptors
//! - `SyncStats` - Records and pages per run
//!
//! Every strategy checkpoints its resumption point before requesting a page
//! and advances bookmarks only after the page's records reach the sink.

mod types;

pub use types::{StreamDefinition, StreamFilter, Strategy, SyncStats};

use crate::context::SyncContext;
use crate::decode::parse_date;
use crate::error::{Error, Result};
use crate::http::FilterOptions;
use crate::state::compare_bookmarks;
use crate::types::{JsonValue, Page, FULL_PAGE_SIZE, UPDATED_ASC_ORDER};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Offset key for page-numbered streams
const PAGE_OFFSET: &str = "page";

/// Sync engine for one run over a context
pub struct SyncEngine<'a> {
    /// Shared run context
    ctx: &'a mut SyncContext,
    /// Statistics
    stats: SyncStats,
}

impl<'a> SyncEngine<'a> {
    /// Create a new sync engine
    pub fn new(ctx: &'a mut SyncContext) -> Self {
        Self {
            ctx,
            stats: SyncStats::default(),
        }
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Access the context
    pub fn context(&mut self) -> &mut SyncContext {
        &mut *self.ctx
    }

    /// Sync one stream with its strategy
    pub async fn sync_stream(&mut self, stream: &StreamDefinition) -> Result<SyncStats> {
        let start = Instant::now();
        let before = self.stats.clone();

        match stream.strategy {
            Strategy::Bookmarked => self.sync_bookmarked(stream).await?,
            Strategy::Paginated { filter } => self.sync_paginated(stream, filter).await?,
            Strategy::Journal => self.sync_journals(stream).await?,
            Strategy::LinkedTransactions => self.sync_linked_transactions(stream).await?,
            Strategy::Everything => self.sync_everything(stream).await?,
        }

        self.stats.streams_synced += 1;
        let elapsed = start.elapsed().as_millis() as u64;
        self.stats.duration_ms += elapsed;

        let stream_stats = SyncStats {
            records_synced: self.stats.records_synced - before.records_synced,
            pages_fetched: self.stats.pages_fetched - before.pages_fetched,
            streams_synced: 1,
            records_skipped: self.stats.records_skipped - before.records_skipped,
            duration_ms: elapsed,
        };
        info!(
            stream = stream.tap_stream_id,
            records = stream_stats.records_synced,
            pages = stream_stats.pages_fetched,
            "Finished syncing stream"
        );
        Ok(stream_stats)
    }

    // ========================================================================
    // Strategies
    // ========================================================================

    async fn sync_bookmarked(&mut self, stream: &StreamDefinition) -> Result<()> {
        let id = stream.tap_stream_id;
        let key = bookmark_key(stream)?;
        let start = self.ctx.update_start_date_bookmark(id, key);

        let records = self
            .request_with_reauth(id, &FilterOptions::new().since(start))
            .await?;
        if records.is_empty() {
            return Ok(());
        }

        let max_value = max_bookmark(&records, key);
        self.emit(stream, records)?;
        if let Some(value) = max_value {
            self.ctx.set_bookmark(id, key, value).await?;
        }
        Ok(())
    }

    async fn sync_paginated(
        &mut self,
        stream: &StreamDefinition,
        filter: Option<StreamFilter>,
    ) -> Result<()> {
        let id = stream.tap_stream_id;
        let key = bookmark_key(stream)?;
        let start = self.ctx.update_start_date_bookmark(id, key);
        let mut page = self.resume_page(id);

        let mut options = FilterOptions::new()
            .since(start.clone())
            .order(UPDATED_ASC_ORDER);
        if filter == Some(StreamFilter::ArchivedContacts)
            && self.ctx.config().include_archived_contacts()
        {
            options = options.param("includeArchived", "true");
        }

        let mut max_updated = JsonValue::String(start);
        loop {
            self.ctx.set_offset(id, PAGE_OFFSET, json!(page)).await?;

            let records = self
                .request_with_reauth(id, &options.clone().page(page))
                .await?;
            let count = records.len();

            if let Some(last) = records.last().and_then(|r| r.get(key)) {
                if compare_bookmarks(last, &max_updated) != Ordering::Less {
                    max_updated = last.clone();
                }
            }
            self.emit(stream, records)?;

            if count < FULL_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        self.ctx.complete_stream(id, key, max_updated).await
    }

    async fn sync_journals(&mut self, stream: &StreamDefinition) -> Result<()> {
        let id = stream.tap_stream_id;
        let key = bookmark_key(stream)?;
        let mut journal_number = self
            .ctx
            .get_bookmark(id, key)
            .and_then(as_journal_number)
            .unwrap_or(0);

        loop {
            let previous = journal_number;
            let records = self
                .request_with_reauth(id, &FilterOptions::new().offset(journal_number))
                .await?;
            let count = records.len();
            if count == 0 {
                break;
            }

            let page_max = records
                .iter()
                .filter_map(|r| r.get(key).and_then(as_journal_number))
                .max();
            self.emit(stream, records)?;

            if let Some(max) = page_max {
                journal_number = journal_number.max(max);
            }
            self.ctx.set_bookmark(id, key, json!(journal_number)).await?;

            if count < FULL_PAGE_SIZE {
                break;
            }
            // The next request would repeat the same offset.
            if journal_number == previous {
                return Err(Error::malformed(
                    id,
                    format!("full page did not advance {key} past {previous}"),
                ));
            }
        }
        Ok(())
    }

    async fn sync_linked_transactions(&mut self, stream: &StreamDefinition) -> Result<()> {
        let id = stream.tap_stream_id;
        let key = bookmark_key(stream)?;
        let start = self.ctx.update_start_date_bookmark(id, key);
        let inclusive = start == self.ctx.config().start_date;
        let floor = parse_date(&start).ok_or_else(|| {
            Error::invalid_value("start_date", format!("'{start}' is not a timestamp"))
        })?;
        let mut page = self.resume_page(id);

        let mut max_updated = JsonValue::String(start);
        loop {
            self.ctx.set_offset(id, PAGE_OFFSET, json!(page)).await?;

            let raw = self
                .request_with_reauth(id, &FilterOptions::new().page(page))
                .await?;
            let raw_count = raw.len();

            let records: Page = raw
                .into_iter()
                .filter(|record| is_new(record.get(key), &floor, inclusive))
                .collect();
            self.stats.records_skipped += raw_count - records.len();

            if let Some(last) = records.last().and_then(|r| r.get(key)) {
                if compare_bookmarks(last, &max_updated) != Ordering::Less {
                    max_updated = last.clone();
                }
            }
            self.emit(stream, records)?;

            if raw_count < FULL_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        self.ctx.complete_stream(id, key, max_updated).await
    }

    async fn sync_everything(&mut self, stream: &StreamDefinition) -> Result<()> {
        let records = self
            .request_with_reauth(stream.tap_stream_id, &FilterOptions::new())
            .await?;
        self.emit(stream, records)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Fetch a page, refreshing credentials once on a 401.
    ///
    /// A second 401 after the refresh is fatal.
    pub async fn request_with_reauth(
        &mut self,
        stream_id: &str,
        options: &FilterOptions,
    ) -> Result<Page> {
        self.stats.add_page();
        match self.ctx.client().filter(stream_id, options).await {
            Err(e) if e.is_unauthorized() => {
                warn!(stream = stream_id, "Received 401, refreshing credentials");
            }
            other => return other,
        }

        self.ctx.refresh_credentials().await?;
        self.stats.add_page();
        match self.ctx.client().filter(stream_id, options).await {
            Err(e) if e.is_unauthorized() => Err(Error::ReauthorizationRequired),
            other => other,
        }
    }

    fn resume_page(&self, stream_id: &str) -> u64 {
        let page = self
            .ctx
            .get_offset(stream_id, PAGE_OFFSET)
            .and_then(JsonValue::as_u64)
            .filter(|page| *page >= 1)
            .unwrap_or(1);
        if page > 1 {
            info!(stream = stream_id, page, "Resuming from saved page");
        }
        page
    }

    fn emit(&mut self, stream: &StreamDefinition, mut records: Page) -> Result<()> {
        if let Some(formatter) = stream.formatter {
            formatter.apply(&mut records);
        }

        let count = records.len();
        for record in records {
            self.ctx.write_record(stream.tap_stream_id, record)?;
        }
        self.stats.add_records(count);
        debug!(stream = stream.tap_stream_id, records = count, "Emitted page");
        Ok(())
    }
}

fn bookmark_key(stream: &StreamDefinition) -> Result<&'static str> {
    stream
        .bookmark_key
        .ok_or_else(|| Error::config(format!("Stream '{}' has no bookmark key", stream.tap_stream_id)))
}

fn max_bookmark(records: &Page, key: &str) -> Option<JsonValue> {
    records
        .iter()
        .filter_map(|r| r.get(key))
        .max_by(|a, b| compare_bookmarks(a, b))
        .cloned()
}

fn as_journal_number(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a linked transaction is past the floor.
///
/// The configured start date is inclusive. A floor carried over from a
/// previous run's bookmark was already emitted, so it is exclusive.
fn is_new(value: Option<&JsonValue>, floor: &DateTime<Utc>, inclusive: bool) -> bool {
    let Some(updated) = value.and_then(JsonValue::as_str).and_then(parse_date) else {
        return false;
    };
    if inclusive {
        updated >= *floor
    } else {
        updated > *floor
    }
}
