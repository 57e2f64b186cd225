//! Sync context
//!
//! The single mutable object threaded through a run: configuration, catalog,
//! state, the API client, the credential source and the sink. All state
//! mutation goes through the accessors here, and the persisting accessors
//! checkpoint through [`SyncContext::write_state`].

use crate::auth::TokenRefresher;
use crate::catalog::Catalog;
use crate::config::TapConfig;
use crate::error::Result;
use crate::http::XeroClient;
use crate::output::Sink;
use crate::state::{compare_bookmarks, StateManager, SyncState};
use crate::types::{JsonValue, Record};
use std::cmp::Ordering;
use tracing::debug;

/// Everything a sync run needs
pub struct SyncContext {
    config: TapConfig,
    catalog: Catalog,
    state: StateManager,
    client: XeroClient,
    refresher: Box<dyn TokenRefresher>,
    sink: Box<dyn Sink>,
}

impl SyncContext {
    /// Assemble a context
    pub fn new(
        config: TapConfig,
        catalog: Catalog,
        state: StateManager,
        client: XeroClient,
        refresher: Box<dyn TokenRefresher>,
        sink: Box<dyn Sink>,
    ) -> Self {
        Self {
            config,
            catalog,
            state,
            client,
            refresher,
            sink,
        }
    }

    /// Tap configuration
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Catalog in use
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Current state
    pub fn state(&self) -> &SyncState {
        self.state.state()
    }

    /// Consume the context, returning the final state
    pub fn into_state(self) -> SyncState {
        self.state.into_state()
    }

    /// API client
    pub fn client(&self) -> &XeroClient {
        &self.client
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Obtain a fresh access token and install it in the client
    pub async fn refresh_credentials(&mut self) -> Result<()> {
        let token = self.refresher.refresh().await?;
        self.client.set_credentials(token);
        Ok(())
    }

    // ========================================================================
    // Bookmarks & Offsets
    // ========================================================================

    /// Bookmark value for a stream
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&JsonValue> {
        self.state().get_bookmark(stream, key)
    }

    /// Advance a bookmark and checkpoint.
    ///
    /// The value is only written when it is not older than the current
    /// bookmark. Returns whether the bookmark changed.
    pub async fn set_bookmark(&mut self, stream: &str, key: &str, value: JsonValue) -> Result<bool> {
        let advanced = self.advance_bookmark(stream, key, value);
        self.write_state().await?;
        Ok(advanced)
    }

    /// Existing bookmark, or `start_date` (recorded as the bookmark) on first use
    pub fn update_start_date_bookmark(&mut self, stream: &str, key: &str) -> String {
        if let Some(existing) = self.get_bookmark(stream, key) {
            return match existing {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
        }

        let start = self.config.start_date.clone();
        self.state
            .state_mut()
            .set_bookmark(stream, key, JsonValue::String(start.clone()));
        start
    }

    /// Offset value for a stream
    pub fn get_offset(&self, stream: &str, key: &str) -> Option<&JsonValue> {
        self.state().get_offset(stream, key)
    }

    /// Record an offset and checkpoint
    pub async fn set_offset(&mut self, stream: &str, key: &str, value: JsonValue) -> Result<()> {
        self.state.state_mut().set_offset(stream, key, value);
        self.write_state().await
    }

    /// Remove a stream's offsets without checkpointing
    pub fn clear_offsets(&mut self, stream: &str) {
        self.state.state_mut().clear_offsets(stream);
    }

    /// Finish a paged stream: drop offsets, advance the bookmark, checkpoint
    pub async fn complete_stream(&mut self, stream: &str, key: &str, value: JsonValue) -> Result<()> {
        self.clear_offsets(stream);
        self.advance_bookmark(stream, key, value);
        self.write_state().await
    }

    /// Set or clear the stream in progress and checkpoint
    pub async fn set_currently_syncing(&mut self, stream: Option<&str>) -> Result<()> {
        self.state.state_mut().currently_syncing = stream.map(ToString::to_string);
        self.write_state().await
    }

    fn advance_bookmark(&mut self, stream: &str, key: &str, value: JsonValue) -> bool {
        if let Some(current) = self.get_bookmark(stream, key) {
            if compare_bookmarks(&value, current) == Ordering::Less {
                debug!(stream, key, "Ignoring bookmark older than the stored value");
                return false;
            }
        }
        self.state.state_mut().set_bookmark(stream, key, value);
        true
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Emit the current state and save it to the state file, if any
    pub async fn write_state(&mut self) -> Result<()> {
        self.sink.write_state(self.state.state())?;
        self.state.save().await
    }

    /// Emit a stream schema
    pub fn write_schema(
        &mut self,
        stream: &str,
        schema: JsonValue,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Result<()> {
        self.sink
            .write_schema(stream, schema, key_properties, bookmark_properties)
    }

    /// Emit one record
    pub fn write_record(&mut self, stream: &str, record: Record) -> Result<()> {
        self.sink.write_record(stream, record)
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("state", self.state.state())
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
