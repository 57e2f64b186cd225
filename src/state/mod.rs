//! State management module
//!
//! Handles bookmark tracking, pagination offsets, and resumability.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `SyncState` - Bookmarks, offsets and the stream in progress
//! - `StateManager` - File-based state persistence with atomic writes
//! - `compare_bookmarks` - Ordering used to keep bookmarks monotonic

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{compare_bookmarks, SyncState, OFFSET_KEY};
