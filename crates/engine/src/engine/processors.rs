//! Element processors
//!
//! [`DefaultProcessor`] is the template: activate, complete right away, take
//! the outgoing flows or raise an incident, and on termination resolve the open
//! incident before writing `ELEMENT_TERMINATED`. The other processors only
//! change what differs for their element types.

use tracing::debug;

use super::behaviors::BpmnBehaviors;
use super::error::ProcessingError;
use super::registry::{ElementContainerProcessor, ElementProcessor};
use super::transition::Completion;
use crate::definition::ElementDefinition;
use crate::state::{ElementContext, LifecycleState};

/// Elements without an external step: tasks, events and gateways
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl ElementProcessor for DefaultProcessor {
    fn on_activate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        let activated = behaviors.transition_to_activated(context)?;
        behaviors.complete_element(element, &activated)
    }

    fn on_complete(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        complete_or_raise(element, context, behaviors)
    }

    fn on_terminate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        terminate_leaf(element, context, behaviors)
    }
}

/// Service tasks wait in `ACTIVATED` for an external `COMPLETE_ELEMENT`
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceTaskProcessor;

impl ElementProcessor for ServiceTaskProcessor {
    fn on_activate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        let activated = behaviors.transition_to_activated(context)?;
        debug!(
            element_instance_key = activated.element_instance_key,
            element_id = %element.id,
            "waiting for completion"
        );
        Ok(())
    }

    fn on_complete(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        complete_or_raise(element, context, behaviors)
    }

    fn on_terminate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        terminate_leaf(element, context, behaviors)
    }
}

/// Processes and sub-processes
///
/// A container activates its start events as children and completes once
/// nothing is left running inside it. Terminating a container terminates its
/// children first; the last child to go finishes the container.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerProcessor;

impl ElementProcessor for ContainerProcessor {
    fn on_activate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        let activated = behaviors.transition_to_activated(context)?;
        let definition = behaviors.definition();

        let mut start_events = definition.start_events_of(&element.id).peekable();
        if start_events.peek().is_none() {
            return behaviors.complete_element(element, &activated);
        }
        for start_event in start_events {
            behaviors.activate_child_element(&activated, start_event);
        }
        Ok(())
    }

    fn on_complete(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        complete_or_raise(element, context, behaviors)
    }

    fn on_terminate(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        let children = behaviors
            .state()
            .instances()
            .children_of(context.element_instance_key);
        if children.is_empty() {
            return terminate_leaf(element, context, behaviors);
        }

        for child_key in children {
            let child = behaviors.instance(child_key)?.context.clone();
            let child_element = behaviors.element(&child.element_id)?;
            behaviors.terminate_element(child_element, &child)?;
        }
        Ok(())
    }
}

impl ElementContainerProcessor for ContainerProcessor {
    fn on_child_completed(
        &self,
        element: &ElementDefinition,
        flow_scope: &ElementContext,
        _child: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        let scope = behaviors.instance(flow_scope.element_instance_key)?;
        if scope.state() != LifecycleState::Activated || !scope.is_idle() {
            return Ok(());
        }
        behaviors.complete_element(element, flow_scope)
    }

    fn on_child_terminated(
        &self,
        element: &ElementDefinition,
        flow_scope: &ElementContext,
        _child: &ElementContext,
        behaviors: &mut BpmnBehaviors<'_>,
    ) -> Result<(), ProcessingError> {
        let scope = behaviors.instance(flow_scope.element_instance_key)?;
        let (state, active_children, idle) =
            (scope.state(), scope.active_children, scope.is_idle());

        match state {
            LifecycleState::Terminating if active_children == 0 => {
                terminate_leaf(element, flow_scope, behaviors)
            }
            LifecycleState::Activated if idle => behaviors.complete_element(element, flow_scope),
            _ => Ok(()),
        }
    }
}

/// Complete the instance, then either take its flows or freeze it
fn complete_or_raise(
    element: &ElementDefinition,
    context: &ElementContext,
    behaviors: &mut BpmnBehaviors<'_>,
) -> Result<(), ProcessingError> {
    match behaviors.transition_to_completed(element, context)? {
        Completion::Completed(completed) => {
            behaviors.take_outgoing_sequence_flows(element, &completed)
        }
        Completion::Failed(failure) => {
            behaviors.create_incident(failure, context)?;
            Ok(())
        }
    }
}

/// Resolve any open incident, write `ELEMENT_TERMINATED` and notify the scope
fn terminate_leaf(
    element: &ElementDefinition,
    context: &ElementContext,
    behaviors: &mut BpmnBehaviors<'_>,
) -> Result<(), ProcessingError> {
    behaviors.resolve_incidents(context);
    let terminated = behaviors.transition_to_terminated(context)?;
    behaviors.on_element_terminated(element, &terminated)
}
