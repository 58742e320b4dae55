//! Commands in, records out
//!
//! - [`Command`]: the lifecycle commands the engine reacts to
//! - [`Record`]: the only externally observable effect of processing
//! - [`RecordWriter`]: where records go ([`InMemoryRecordLog`] for tests)

mod command;
mod log;
mod value;

pub use command::Command;
pub use log::{InMemoryRecordLog, LogError, RecordWriter};
pub use value::{ElementInstanceRecord, IncidentRecord, Intent, Record, RecordValue};
