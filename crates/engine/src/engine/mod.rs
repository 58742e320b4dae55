//! Execution core
//!
//! The engine module provides the partition [`Engine`] and everything it hands
//! to processors:
//! - [`ProcessorRegistry`]: element type to [`ElementProcessor`] dispatch
//! - [`BpmnBehaviors`]: lifecycle transitions, incidents and sequence-flow
//!   propagation, shared by all processors
//! - [`ProcessingError`]: rejected commands and defects

mod behaviors;
mod error;
mod executor;
mod expression;
mod flow;
mod incident;
mod processors;
mod registry;
mod transition;

pub use behaviors::BpmnBehaviors;
pub use error::{ProcessingError, Rejection};
pub use executor::{Engine, ProcessingResult};
pub use expression::ExpressionLanguage;
pub use processors::{ContainerProcessor, DefaultProcessor, ServiceTaskProcessor};
pub use registry::{ElementContainerProcessor, ElementProcessor, ProcessorEntry, ProcessorRegistry};
pub use transition::{CompletedContext, Completion};
