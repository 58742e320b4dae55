//! Static process definitions
//!
//! This module contains the read-only side of the engine:
//! - [`ElementDefinition`] / [`SequenceFlow`]: nodes and edges of a process
//! - [`ProcessDefinition`]: an indexed, immutable process
//! - [`ProcessCache`]: deployed definitions shared by all instances

mod cache;
mod element;
mod process;

pub use cache::ProcessCache;
pub use element::{ElementDefinition, ElementType, SequenceFlow};
pub use process::{DefinitionError, ProcessDefinition, ProcessModel};
