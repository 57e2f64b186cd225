//! # Xero Tap
//!
//! Extracts accounting data from the Xero API and emits it as a stream of
//! JSON-lines SCHEMA, RECORD and STATE messages.
//!
//! ## Features
//!
//! - **OAuth2 refresh-token credentials**: rotated tokens are written back
//!   to the config file atomically
//! - **Incremental sync**: per-stream bookmarks and page offsets survive
//!   interruption and resume where the previous run stopped
//! - **Retry classes**: minute-scoped rate limits, service outages, server
//!   errors and malformed bodies are retried on their own budgets
//! - **Date normalization**: `/Date(ms+HHMM)/` values become RFC 3339
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xero_tap::cli::{Cli, Runner};
//! use clap::Parser;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> xero_tap::Result<()> {
//!     Runner::new(Cli::parse()).run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Orchestrator                          │
//! │     discover() → Catalog        sync() → SCHEMA/RECORD/STATE  │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//!                           SyncContext
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬────────────┐
//! │   Auth   │   HTTP    │    Engine     │   State   │   Output   │
//! ├──────────┼───────────┼───────────────┼───────────┼────────────┤
//! │ Refresh  │ Filter    │ Bookmarked    │ Bookmarks │ JSON lines │
//! │ Rotate   │ Retry     │ Paginated     │ Offsets   │ Memory     │
//! │ Persist  │ Rate Limit│ Journal       │ Resume    │            │
//! │          │ Decode    │ Linked / All  │           │            │
//! └──────────┴───────────┴───────────────┴───────────┴────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration and its durable store
pub mod config;

/// OAuth2 refresh-token credentials
pub mod auth;

/// Xero API client with retry and rate limiting
pub mod http;

/// Response envelope and date decoding
pub mod decode;

/// Per-entity record cleanup
pub mod format;

/// State management and checkpointing
pub mod state;

/// Protocol messages and sinks
pub mod output;

/// Stream definitions
pub mod streams;

/// Discovery catalog
pub mod catalog;

/// Run context shared by the engine and orchestrator
pub mod context;

/// Per-stream sync strategies
pub mod engine;

/// Catalog-driven run loop
pub mod orchestrator;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::TapConfig;
pub use context::SyncContext;
pub use state::SyncState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
