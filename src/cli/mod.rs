//! CLI module
//!
//! Command-line interface for the tap.
//!
//! # Commands
//!
//! - `discover` - Validate credentials and print the catalog
//! - `sync` - Emit SCHEMA, RECORD and STATE messages for selected streams

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
