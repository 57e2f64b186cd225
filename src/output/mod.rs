//! Output module
//!
//! Emits the tap record stream.
//!
//! # Overview
//!
//! This module provides:
//! - `Message` - SCHEMA, RECORD and STATE protocol messages
//! - `Sink` - the emission interface used by the sync engine
//! - `JsonLinesSink` - one JSON message per line to any writer (stdout)
//! - `MemorySink` - collects messages for tests and embedding

mod message;
mod writer;

pub use message::Message;
pub use writer::{JsonLinesSink, MemorySink, Sink};
