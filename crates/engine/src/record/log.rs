//! Record log abstraction
//!
//! The durable, replicated log lives outside this crate. The engine only needs
//! to append a batch of records per processed command, and proceeds as if the
//! append was immediately and durably ordered.

use super::value::{Intent, Record};
use crate::state::Key;

/// Errors from appending to the log
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log no longer accepts writes
    #[error("log is closed")]
    Closed,

    /// The log refused the batch
    #[error("log rejected batch: {0}")]
    Rejected(String),
}

/// Sink for the records written while processing one command
pub trait RecordWriter {
    /// Append a batch atomically, returning the position of its last record
    fn append(&mut self, batch: Vec<Record>) -> Result<u64, LogError>;
}

impl<W: RecordWriter + ?Sized> RecordWriter for Box<W> {
    fn append(&mut self, batch: Vec<Record>) -> Result<u64, LogError> {
        (**self).append(batch)
    }
}

/// In-memory log
///
/// Positions start at 1 and increase by one per record.
///
/// # Example
///
/// ```
/// use flowline_engine::InMemoryRecordLog;
///
/// let log = InMemoryRecordLog::new();
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordLog {
    records: Vec<(u64, Record)>,
}

impl InMemoryRecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records with their positions
    pub fn records(&self) -> &[(u64, Record)] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of the last record (0 when empty)
    pub fn last_position(&self) -> u64 {
        self.records.last().map(|(position, _)| *position).unwrap_or(0)
    }

    /// Intents of all records about the given element instance, in log order
    ///
    /// Incident records are included through their element instance key.
    pub fn intents_for(&self, element_instance_key: Key) -> Vec<Intent> {
        self.records
            .iter()
            .filter(|(_, record)| record.element_instance_key() == element_instance_key)
            .map(|(_, record)| record.intent)
            .collect()
    }

    /// Records with the given intent, in log order
    pub fn with_intent(&self, intent: Intent) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .map(|(_, record)| record)
            .filter(move |record| record.intent == intent)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl RecordWriter for InMemoryRecordLog {
    fn append(&mut self, batch: Vec<Record>) -> Result<u64, LogError> {
        let mut position = self.last_position();
        for record in batch {
            position += 1;
            self.records.push((position, record));
        }
        Ok(position)
    }
}
