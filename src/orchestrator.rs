//! Run orchestration
//!
//! `sync` walks the fixed stream list in order, resuming at the stream that
//! was in progress when a previous run stopped. `discover` validates the
//! credentials and describes every stream.

use crate::catalog::{Catalog, CatalogEntry};
use crate::context::SyncContext;
use crate::engine::{StreamDefinition, SyncEngine, SyncStats};
use crate::error::Result;
use crate::streams::all_streams;
use crate::types::JsonValue;
use std::time::Instant;
use tracing::info;

/// Sync every selected stream, resuming from `currently_syncing`
pub async fn sync(ctx: &mut SyncContext) -> Result<SyncStats> {
    let start = Instant::now();
    ctx.refresh_credentials().await?;

    let streams = all_streams();
    let start_index = resume_index(ctx, streams);
    let mut stats = SyncStats::new();

    for stream in &streams[start_index..] {
        let id = stream.tap_stream_id;
        if !ctx.catalog().is_selected(id) {
            continue;
        }

        ctx.set_currently_syncing(Some(id)).await?;
        let schema = stream_schema(ctx.catalog(), stream);
        ctx.write_schema(
            id,
            schema,
            stream.key_properties(),
            stream.bookmark_properties(),
        )?;

        info!(stream = id, "Syncing stream");
        let stream_stats = SyncEngine::new(ctx).sync_stream(stream).await?;
        stats.merge(&stream_stats);
    }

    ctx.set_currently_syncing(None).await?;
    stats.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        streams = stats.streams_synced,
        records = stats.records_synced,
        pages = stats.pages_fetched,
        duration_ms = stats.duration_ms,
        "Sync complete"
    );
    Ok(stats)
}

/// Validate access and build the catalog of every stream
pub async fn discover(ctx: &mut SyncContext) -> Result<Catalog> {
    ctx.refresh_credentials().await?;
    ctx.client().check_platform_access().await?;

    let catalog = Catalog::discover();
    info!(streams = catalog.streams.len(), "Discovered streams");
    Ok(catalog)
}

fn resume_index(ctx: &SyncContext, streams: &[StreamDefinition]) -> usize {
    let Some(current) = ctx.state().currently_syncing.as_deref() else {
        return 0;
    };
    match streams.iter().position(|s| s.tap_stream_id == current) {
        Some(index) => {
            info!(stream = current, "Resuming interrupted sync");
            index
        }
        None => 0,
    }
}

/// Schema from the user's catalog, or the discovered one when absent
fn stream_schema(catalog: &Catalog, stream: &StreamDefinition) -> JsonValue {
    catalog
        .get_stream(stream.tap_stream_id)
        .map(|entry| entry.schema.clone())
        .filter(|schema| !schema.is_null())
        .unwrap_or_else(|| CatalogEntry::discovered(stream).schema)
}
