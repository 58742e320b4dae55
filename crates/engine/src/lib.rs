//! # Flowline Execution Core
//!
//! The partition-local state machine that advances process instances by
//! applying lifecycle commands to their element instances.
//!
//! ## Features
//!
//! - **Per-type dispatch**: a fixed registry maps each element type to the
//!   processor implementing its lifecycle
//! - **Strict lifecycle**: every transition is checked and written as a record;
//!   illegal transitions are defects, never repaired silently
//! - **Incidents**: completion failures freeze the element instance until they
//!   are resolved or the instance is terminated
//! - **Propagation**: exclusive choice, parallel fork/join and sub-process
//!   scopes, all within the processing of one command
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │  (validates commands, snapshots state, appends one batch)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │             ProcessorRegistry -> ElementProcessor            │
//! │  (default, service task and container processors)           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       BpmnBehaviors                          │
//! │  (transitions, incidents, sequence flows; writes records)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use flowline_engine::prelude::*;
//!
//! let processes = Arc::new(ProcessCache::new());
//! processes.deploy(
//!     ProcessModel::new("review")
//!         .element(ElementDefinition::service_task("approve").requiring("approved"))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut engine = Engine::new(processes);
//! engine.process(Command::activate(7, "review", "approve")).unwrap();
//!
//! // completing without the required variable raises an incident
//! let result = engine.process(Command::complete(7)).unwrap();
//! assert_eq!(result.intents(), vec![Intent::IncidentCreated]);
//! assert!(engine.open_incident_for(7).is_some());
//! ```

pub mod config;
pub mod definition;
pub mod engine;
pub mod failure;
pub mod record;
pub mod state;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::definition::{
        ElementDefinition, ElementType, ProcessCache, ProcessDefinition, ProcessModel,
        SequenceFlow,
    };
    pub use crate::engine::{Engine, ProcessingError, ProcessingResult, Rejection};
    pub use crate::failure::{ErrorType, Failure};
    pub use crate::record::{Command, InMemoryRecordLog, Intent, Record, RecordWriter};
    pub use crate::state::{Key, LifecycleState, Variables};
}

// Re-export key types at crate root
pub use config::{ConfigError, EngineConfig};
pub use definition::{
    DefinitionError, ElementDefinition, ElementType, ProcessCache, ProcessDefinition,
    ProcessModel, SequenceFlow,
};
pub use engine::{
    BpmnBehaviors, CompletedContext, Completion, ContainerProcessor, DefaultProcessor,
    ElementContainerProcessor, ElementProcessor, Engine, ProcessingError, ProcessingResult,
    ProcessorEntry, ProcessorRegistry, Rejection, ServiceTaskProcessor,
};
pub use failure::{ErrorType, Failure};
pub use record::{Command, InMemoryRecordLog, Intent, LogError, Record, RecordValue, RecordWriter};
pub use state::{ElementContext, Incident, Key, LifecycleState, Variables};
