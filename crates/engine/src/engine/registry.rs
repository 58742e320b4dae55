//! Processor registry
//!
//! Maps an element's static type tag to the processor implementing its
//! lifecycle. The table is built once when the engine is created; a lookup for
//! a type without an entry is a configuration defect.

use std::collections::HashMap;
use std::fmt;

use super::behaviors::BpmnBehaviors;
use super::error::ProcessingError;
use super::processors::{ContainerProcessor, DefaultProcessor, ServiceTaskProcessor};
use crate::definition::{ElementDefinition, ElementType};
use crate::state::ElementContext;

/// Lifecycle behavior of one element type
///
/// Processors are stateless. Every entry point must leave the instance either
/// terminal, frozen by an incident, or waiting for a further command.
pub trait ElementProcessor: Send + Sync {
    /// The instance is `ACTIVATING`
    fn on_activate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError>;

    /// The instance is `ACTIVATED` (external completion) or `COMPLETING`
    fn on_complete(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError>;

    /// The instance is `TERMINATING`
    fn on_terminate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError>;
}

/// Extra behavior of elements that own child instances
pub trait ElementContainerProcessor: Send + Sync {
    /// A child completed without taking any outgoing flow
    fn on_child_completed(
        &self,
        element: &ElementDefinition,
        flow_scope: &ElementContext,
        child: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError>;

    /// A child was terminated
    fn on_child_terminated(
        &self,
        element: &ElementDefinition,
        flow_scope: &ElementContext,
        child: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError>;
}

static DEFAULT_PROCESSOR: DefaultProcessor = DefaultProcessor;
static SERVICE_TASK_PROCESSOR: ServiceTaskProcessor = ServiceTaskProcessor;
static CONTAINER_PROCESSOR: ContainerProcessor = ContainerProcessor;

/// Registry entry: the lifecycle processor and, for containers, the child hooks
#[derive(Clone, Copy)]
pub struct ProcessorEntry {
    element: &'static dyn ElementProcessor,
    container: Option<&'static dyn ElementContainerProcessor>,
}

impl ProcessorEntry {
    pub fn element(processor: &'static dyn ElementProcessor) -> Self {
        Self {
            element: processor,
            container: None,
        }
    }

    pub fn container<P>(processor: &'static P) -> Self
    where
        P: ElementProcessor + ElementContainerProcessor,
    {
        Self {
            element: processor,
            container: Some(processor),
        }
    }
}

/// Element type to processor table
pub struct ProcessorRegistry {
    processors: HashMap<ElementType, ProcessorEntry>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ProcessorRegistry {
    /// Build a registry from an explicit table
    pub fn from_table(table: &[(ElementType, ProcessorEntry)]) -> Self {
        Self {
            processors: table.iter().copied().collect(),
        }
    }

    /// The registry covering every [`ElementType`]
    pub fn standard() -> Self {
        Self::from_table(&[
            (ElementType::Process, ProcessorEntry::container(&CONTAINER_PROCESSOR)),
            (ElementType::SubProcess, ProcessorEntry::container(&CONTAINER_PROCESSOR)),
            (ElementType::StartEvent, ProcessorEntry::element(&DEFAULT_PROCESSOR)),
            (ElementType::EndEvent, ProcessorEntry::element(&DEFAULT_PROCESSOR)),
            (ElementType::BoundaryEvent, ProcessorEntry::element(&DEFAULT_PROCESSOR)),
            (ElementType::Task, ProcessorEntry::element(&DEFAULT_PROCESSOR)),
            (ElementType::ServiceTask, ProcessorEntry::element(&SERVICE_TASK_PROCESSOR)),
            (ElementType::ExclusiveGateway, ProcessorEntry::element(&DEFAULT_PROCESSOR)),
            (ElementType::ParallelGateway, ProcessorEntry::element(&DEFAULT_PROCESSOR)),
        ])
    }

    pub fn processor(
        &self,
        element_type: ElementType,
    ) -> Result<&'static dyn ElementProcessor, ProcessingError> {
        self.processors
            .get(&element_type)
            .map(|entry| entry.element)
            .ok_or(ProcessingError::UnregisteredElementType(element_type))
    }

    pub fn container_processor(
        &self,
        element_type: ElementType,
    ) -> Result<&'static dyn ElementContainerProcessor, ProcessingError> {
        let entry = self
            .processors
            .get(&element_type)
            .ok_or(ProcessingError::UnregisteredElementType(element_type))?;
        entry
            .container
            .ok_or(ProcessingError::NotAContainer(element_type))
    }

    pub fn contains(&self, element_type: ElementType) -> bool {
        self.processors.contains_key(&element_type)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut element_types: Vec<_> = self.processors.keys().collect();
        element_types.sort();
        f.debug_struct("ProcessorRegistry")
            .field("element_types", &element_types)
            .finish()
    }
}
