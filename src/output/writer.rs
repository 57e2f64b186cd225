//! Sink implementations

use super::message::Message;
use crate::error::{Error, Result};
use crate::state::SyncState;
use crate::types::{JsonValue, Record};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for schema, record and state messages
pub trait Sink: Send {
    /// Emit one message
    fn write_message(&mut self, message: Message) -> Result<()>;

    /// Emit a stream schema
    fn write_schema(
        &mut self,
        stream: &str,
        schema: JsonValue,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Result<()> {
        self.write_message(Message::schema(
            stream,
            schema,
            key_properties,
            bookmark_properties,
        ))
    }

    /// Emit a record
    fn write_record(&mut self, stream: &str, record: Record) -> Result<()> {
        self.write_message(Message::record(stream, record))
    }

    /// Emit a state checkpoint
    fn write_state(&mut self, state: &SyncState) -> Result<()> {
        self.write_message(Message::state(state.clone()))
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Writes one JSON message per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Sink writing to `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn write_message(&mut self, message: Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &message)
            .map_err(|e| Error::output(format!("Failed to serialize message: {e}")))?;
        self.writer.write_all(b"\n")?;

        // State is a checkpoint; it must reach the consumer before more work
        if matches!(message, Message::State { .. }) {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Collects messages in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages written so far
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records written for `stream`, in order
    pub fn records(&self, stream: &str) -> Vec<Record> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                Message::Record { stream: s, record } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// State checkpoints written so far, in order
    pub fn states(&self) -> Vec<SyncState> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Streams that received a schema, in order
    pub fn schema_streams(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                Message::Schema { stream, .. } => Some(stream),
                _ => None,
            })
            .collect()
    }
}

impl Sink for MemorySink {
    fn write_message(&mut self, message: Message) -> Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}
