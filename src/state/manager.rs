//! State manager implementation
//!
//! Provides file-based state persistence with atomic writes.

use super::types::SyncState;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Owns the sync state and its optional backing file
#[derive(Debug, Default)]
pub struct StateManager {
    /// Path to the state file; empty for in-memory state
    path: PathBuf,
    /// Current state
    state: SyncState,
}

impl StateManager {
    /// Create a manager for `path` with empty state
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: SyncState::new(),
        }
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create an in-memory manager holding `state`
    pub fn with_state(state: SyncState) -> Self {
        Self {
            path: PathBuf::new(),
            state,
        }
    }

    /// Create a state manager from a file, loading existing state if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            if contents.trim().is_empty() {
                SyncState::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| Error::state(format!("Failed to parse state file: {e}")))?
            }
        } else {
            SyncState::new()
        };

        Ok(Self { path, state })
    }

    /// Create a state manager from inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: SyncState = serde_json::from_str(json)
            .map_err(|e| Error::state(format!("Failed to parse state JSON: {e}")))?;
        Ok(Self::with_state(state))
    }

    /// Whether state is kept in memory only
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Mutable access to the current state
    pub fn state_mut(&mut self) -> &mut SyncState {
        &mut self.state
    }

    /// Consume the manager, returning the state
    pub fn into_state(self) -> SyncState {
        self.state
    }

    /// Save current state to file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = serde_json::to_string_pretty(&self.state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        // Write to temp file first, then rename
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!(path = %self.path.display(), "Saved state");
        Ok(())
    }
}
