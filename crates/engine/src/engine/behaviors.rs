//! Shared behaviors handed to every processor
//!
//! `BpmnBehaviors` is the working set of one inbound command: the definition of
//! the process instance being advanced, the partition state, and the batch of
//! records written so far. Processors never touch the state directly; they go
//! through the transition, incident and propagation methods implemented on this
//! type in the sibling modules.

use std::collections::VecDeque;

use tracing::debug;

use super::error::ProcessingError;
use super::expression::ExpressionLanguage;
use super::registry::{ElementContainerProcessor, ElementProcessor, ProcessorRegistry};
use crate::definition::{ElementDefinition, ElementType, ProcessDefinition, SequenceFlow};
use crate::record::Record;
use crate::state::{
    ElementContext, ElementInstance, Key, LifecycleState, ProcessingState, Variables,
};

/// A successor waiting to be activated within the current command
#[derive(Debug, Clone)]
pub(crate) struct PendingActivation {
    pub element_id: String,
    pub flow_scope_key: Option<Key>,
    pub process_instance_key: Key,

    /// Active flows of the scope consumed by this activation
    pub tokens: usize,
}

pub struct BpmnBehaviors<'a> {
    definition: &'a ProcessDefinition,
    registry: &'a ProcessorRegistry,
    pub(super) expressions: &'a ExpressionLanguage,
    pub(super) state: &'a mut ProcessingState,
    records: Vec<Record>,
    pub(super) pending: VecDeque<PendingActivation>,
    activations: usize,
    max_activations: usize,
}

impl<'a> BpmnBehaviors<'a> {
    pub(crate) fn new(
        definition: &'a ProcessDefinition,
        registry: &'a ProcessorRegistry,
        expressions: &'a ExpressionLanguage,
        state: &'a mut ProcessingState,
        max_activations: usize,
    ) -> Self {
        Self {
            definition,
            registry,
            expressions,
            state,
            records: Vec::new(),
            pending: VecDeque::new(),
            activations: 0,
            max_activations,
        }
    }

    pub fn definition(&self) -> &'a ProcessDefinition {
        self.definition
    }

    pub fn state(&self) -> &ProcessingState {
        self.state
    }

    /// Records written so far while processing the current command
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub(crate) fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn element(&self, element_id: &str) -> Result<&'a ElementDefinition, ProcessingError> {
        self.definition
            .element(element_id)
            .ok_or_else(|| ProcessingError::ElementNotFound {
                process_id: self.definition.process_id().to_string(),
                element_id: element_id.to_string(),
            })
    }

    pub fn flow(&self, flow_id: &str) -> Result<&'a SequenceFlow, ProcessingError> {
        self.definition
            .flow(flow_id)
            .ok_or_else(|| ProcessingError::FlowNotFound(flow_id.to_string()))
    }

    /// The live instance with the given key
    pub fn instance(&self, key: Key) -> Result<&ElementInstance, ProcessingError> {
        self.state
            .instances()
            .get(key)
            .ok_or(ProcessingError::InstanceNotFound(key))
    }

    pub fn processor(
        &self,
        element_type: ElementType,
    ) -> Result<&'static dyn ElementProcessor, ProcessingError> {
        self.registry.processor(element_type)
    }

    pub fn container_processor(
        &self,
        element_type: ElementType,
    ) -> Result<&'static dyn ElementContainerProcessor, ProcessingError> {
        self.registry.container_processor(element_type)
    }

    /// Append a record to the batch and apply it to the state
    pub(crate) fn write(&mut self, record: Record) {
        debug!(
            key = record.key,
            intent = %record.intent,
            element_id = record.element_id(),
            "record written"
        );
        self.state.apply(&record);
        self.records.push(record);
    }

    /// Process instance variables overlaid with the variables of the command
    pub(crate) fn variables_for(&self, context: &ElementContext) -> Variables {
        let mut variables = self
            .state
            .variables()
            .document(context.process_instance_key)
            .cloned()
            .unwrap_or_default();
        for (name, value) in &context.variables {
            variables.insert(name.clone(), value.clone());
        }
        variables
    }

    /// Dispatch activation of a new instance to its processor
    pub(crate) fn activate(
        &mut self,
        element: &ElementDefinition,
        context: &ElementContext,
    ) -> Result<(), ProcessingError> {
        self.count_activation()?;
        let processor = self.processor(element.element_type)?;
        processor.on_activate(element, context, self)
    }

    /// Schedule a child of a container, as if a flow had been taken into it
    pub fn activate_child_element(
        &mut self,
        flow_scope: &ElementContext,
        child: &ElementDefinition,
    ) {
        self.state.add_active_flows(flow_scope.element_instance_key, 1);
        self.schedule(PendingActivation {
            element_id: child.id.clone(),
            flow_scope_key: Some(flow_scope.element_instance_key),
            process_instance_key: flow_scope.process_instance_key,
            tokens: 1,
        });
    }

    pub(super) fn schedule(&mut self, activation: PendingActivation) {
        debug!(
            element_id = %activation.element_id,
            flow_scope_key = ?activation.flow_scope_key,
            "successor scheduled"
        );
        self.pending.push_back(activation);
    }

    /// Activate scheduled successors until none is left
    ///
    /// Successors activated here may schedule further successors; all of them
    /// are activated before the command is done.
    pub(crate) fn run_pending(&mut self) -> Result<(), ProcessingError> {
        while let Some(activation) = self.pending.pop_front() {
            self.activate_pending(activation)?;
        }
        Ok(())
    }

    fn activate_pending(&mut self, activation: PendingActivation) -> Result<(), ProcessingError> {
        if let Some(scope_key) = activation.flow_scope_key {
            let scope = self.instance(scope_key)?;
            if scope.state() != LifecycleState::Activated {
                return Err(ProcessingError::IllegalTransition {
                    key: scope_key,
                    from: scope.state(),
                    to: LifecycleState::Activated,
                });
            }
            self.state.consume_active_flows(scope_key, activation.tokens);
        }

        let element = self.element(&activation.element_id)?;
        let context = ElementContext {
            element_instance_key: self.state.next_key(),
            process_instance_key: activation.process_instance_key,
            flow_scope_key: activation.flow_scope_key,
            process_id: self.definition.process_id().to_string(),
            version: self.definition.version(),
            element_id: element.id.clone(),
            element_type: element.element_type,
            state: LifecycleState::Activating,
            variables: Variables::new(),
        };
        self.activate(element, &context)
    }

    fn count_activation(&mut self) -> Result<(), ProcessingError> {
        self.activations += 1;
        if self.activations > self.max_activations {
            return Err(ProcessingError::StepLimitExceeded(self.max_activations));
        }
        Ok(())
    }
}
