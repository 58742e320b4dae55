//! Sequence-flow propagation
//!
//! Flow selection happens while completing, before `ELEMENT_COMPLETED` is
//! written, so a guard that cannot be evaluated (or an exclusive gateway with
//! nowhere to go) surfaces as a completion failure on the element itself.
//! Taking the selected flows schedules one new instance per flow in the same
//! flow scope.

use tracing::debug;

use super::behaviors::{BpmnBehaviors, PendingActivation};
use super::error::ProcessingError;
use super::transition::CompletedContext;
use crate::definition::{ElementDefinition, ElementType, SequenceFlow};
use crate::failure::Failure;
use crate::state::{ElementContext, Variables};

impl BpmnBehaviors<'_> {
    /// Outgoing flows to take when the element completes
    ///
    /// Exclusive gateways take the first flow (in declaration order) whose
    /// guard holds, falling back to the default flow. Every other element takes
    /// all of its outgoing flows.
    pub(crate) fn select_outgoing_flows(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
    ) -> Result<Result<Vec<String>, Failure>, ProcessingError> {
        let outgoing = element
            .outgoing
            .iter()
            .map(|flow_id| self.flow(flow_id))
            .collect::<Result<Vec<_>, _>>()?;

        if element.element_type != ElementType::ExclusiveGateway || outgoing.is_empty() {
            return Ok(Ok(outgoing.iter().map(|flow| flow.id.clone()).collect()));
        }

        let variables = self.variables_for(context);
        Ok(self
            .select_exclusive_flow(element, &outgoing, &variables)
            .map(|flow| vec![flow.id.clone()]))
    }

    fn select_exclusive_flow<'f>(
        &self,
        element: &ElementDefinition,
        outgoing: &[&'f SequenceFlow],
        variables: &Variables,
    ) -> Result<&'f SequenceFlow, Failure> {
        let mut default_flow = None;
        for flow in outgoing {
            if element.default_flow.as_deref() == Some(flow.id.as_str()) {
                default_flow = Some(*flow);
                continue;
            }
            let taken = match &flow.condition {
                Some(condition) => self.expressions.evaluate_condition(condition, variables)?,
                None => true,
            };
            if taken {
                return Ok(*flow);
            }
        }

        default_flow.ok_or_else(|| Failure::no_matching_flow(&element.id))
    }

    /// Take the flows selected on completion
    ///
    /// An element that selected no flow ends its path; its flow scope is told so
    /// it can decide whether it is done too.
    pub fn take_outgoing_sequence_flows(
        &mut self,
        element: &ElementDefinition,
        completed: &CompletedContext,
    ) -> Result<(), ProcessingError> {
        if completed.flows.is_empty() {
            return self.on_element_completed(element, &completed.context);
        }
        for flow_id in &completed.flows {
            let flow = self.flow(flow_id)?;
            self.take_sequence_flow(flow, &completed.context)?;
        }
        Ok(())
    }

    fn take_sequence_flow(
        &mut self,
        flow: &SequenceFlow,
        source: &ElementContext,
    ) -> Result<(), ProcessingError> {
        let target = self.element(&flow.target)?;
        if let Some(scope_key) = source.flow_scope_key {
            self.state.add_active_flows(scope_key, 1);
        }

        let mut tokens = 1;
        if target.is_parallel_join() {
            let join_scope = source.flow_scope_key.unwrap_or(source.process_instance_key);
            let joined = self
                .state
                .joins_mut()
                .arrive(join_scope, &target.id, &flow.id, &target.incoming);
            if !joined {
                debug!(flow_id = %flow.id, gateway = %target.id, "waiting at parallel join");
                return Ok(());
            }
            tokens = target.incoming.len();
        }

        debug!(
            flow_id = %flow.id,
            source = %flow.source,
            target = %flow.target,
            "sequence flow taken"
        );
        self.schedule(PendingActivation {
            element_id: target.id.clone(),
            flow_scope_key: source.flow_scope_key,
            process_instance_key: source.process_instance_key,
            tokens,
        });
        Ok(())
    }
}
