//! Lifecycle transitions
//!
//! The single authority for moving an element instance through its lifecycle.
//! Each transition checks the live state of the instance, writes the record
//! describing it and returns the updated context. Calling a transition from a
//! state that does not allow it is a defect; the only recoverable outcome is a
//! [`Completion::Failed`] from [`BpmnBehaviors::transition_to_completed`].

use tracing::debug;

use super::behaviors::BpmnBehaviors;
use super::error::ProcessingError;
use crate::definition::ElementDefinition;
use crate::failure::Failure;
use crate::record::{Intent, Record};
use crate::state::{ElementContext, LifecycleState, Variables};

/// A completed instance and the outgoing flows selected for it
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedContext {
    pub context: ElementContext,

    /// Ids of the flows to take, in declaration order
    pub flows: Vec<String>,
}

/// Outcome of a completion attempt
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// `ELEMENT_COMPLETED` was written
    Completed(CompletedContext),

    /// Nothing was written; the caller has to raise an incident
    Failed(Failure),
}

impl BpmnBehaviors<'_> {
    /// Write `ELEMENT_ACTIVATED` for a new instance
    pub fn transition_to_activated(
        &mut self,
        context: &ElementContext,
    ) -> Result<ElementContext, ProcessingError> {
        let key = context.element_instance_key;
        if let Some(existing) = self.state().instances().get(key) {
            return Err(ProcessingError::IllegalTransition {
                key,
                from: existing.state(),
                to: LifecycleState::Activated,
            });
        }
        self.check_transition(context, context.state, LifecycleState::Activated)?;

        let activated = context.with_state(LifecycleState::Activated);
        self.write(Record::element(Intent::ElementActivated, &activated));
        Ok(activated.with_variables(Variables::new()))
    }

    /// Mark an activated instance as completing
    pub fn transition_to_completing(
        &mut self,
        context: &ElementContext,
    ) -> Result<ElementContext, ProcessingError> {
        let current = self.live_state(context)?;
        self.check_not_frozen(context)?;
        self.check_transition(context, current, LifecycleState::Completing)?;

        self.state
            .set_lifecycle_state(context.element_instance_key, LifecycleState::Completing);
        Ok(context.with_state(LifecycleState::Completing))
    }

    /// Try to complete an instance
    ///
    /// Checks the element's required variables and selects the outgoing flows
    /// before anything is written, so a failure leaves the instance where it
    /// was.
    pub fn transition_to_completed(
        &mut self,
        element: &ElementDefinition,
        context: &ElementContext,
    ) -> Result<Completion, ProcessingError> {
        let current = self.live_state(context)?;
        self.check_not_frozen(context)?;
        self.check_transition(context, current, LifecycleState::Completed)?;

        if let Some(failure) = self.check_required_variables(element, context) {
            return Ok(Completion::Failed(failure));
        }
        let flows = match self.select_outgoing_flows(element, context)? {
            Ok(flows) => flows,
            Err(failure) => return Ok(Completion::Failed(failure)),
        };

        let completed = context.with_state(LifecycleState::Completed);
        self.write(Record::element(Intent::ElementCompleted, &completed));
        Ok(Completion::Completed(CompletedContext {
            context: completed.with_variables(Variables::new()),
            flows,
        }))
    }

    /// Mark an instance as terminating; allowed while an incident is open
    pub fn transition_to_terminating(
        &mut self,
        context: &ElementContext,
    ) -> Result<ElementContext, ProcessingError> {
        let current = self.live_state(context)?;
        self.check_transition(context, current, LifecycleState::Terminating)?;

        self.state
            .set_lifecycle_state(context.element_instance_key, LifecycleState::Terminating);
        Ok(context.with_state(LifecycleState::Terminating))
    }

    /// Write `ELEMENT_TERMINATED`; allowed while an incident is open
    pub fn transition_to_terminated(
        &mut self,
        context: &ElementContext,
    ) -> Result<ElementContext, ProcessingError> {
        let current = self.live_state(context)?;
        self.check_transition(context, current, LifecycleState::Terminated)?;

        let terminated = context
            .with_state(LifecycleState::Terminated)
            .with_variables(Variables::new());
        self.write(Record::element(Intent::ElementTerminated, &terminated));
        Ok(terminated)
    }

    /// Drive a just-activated instance straight into completion
    pub fn complete_element(
        &mut self,
        element: &ElementDefinition,
        context: &ElementContext,
    ) -> Result<(), ProcessingError> {
        let completing = self.transition_to_completing(context)?;
        let processor = self.processor(element.element_type)?;
        processor.on_complete(element, &completing, self)
    }

    /// Start terminating an instance through its processor
    pub fn terminate_element(
        &mut self,
        element: &ElementDefinition,
        context: &ElementContext,
    ) -> Result<(), ProcessingError> {
        let terminating = self.transition_to_terminating(context)?;
        let processor = self.processor(element.element_type)?;
        processor.on_terminate(element, &terminating, self)
    }

    /// Tell the flow scope that a child completed without taking a flow
    pub fn on_element_completed(
        &mut self,
        element: &ElementDefinition,
        completed: &ElementContext,
    ) -> Result<(), ProcessingError> {
        let Some(scope_key) = completed.flow_scope_key else {
            debug!(element_id = %element.id, "element without flow scope completed");
            return Ok(());
        };
        let flow_scope = self.instance(scope_key)?.context.clone();
        let scope_element = self.element(&flow_scope.element_id)?;
        let container = self.container_processor(scope_element.element_type)?;
        container.on_child_completed(scope_element, &flow_scope, completed, self)
    }

    /// Tell the flow scope that a child was terminated
    pub fn on_element_terminated(
        &mut self,
        element: &ElementDefinition,
        terminated: &ElementContext,
    ) -> Result<(), ProcessingError> {
        let Some(scope_key) = terminated.flow_scope_key else {
            debug!(element_id = %element.id, "element without flow scope terminated");
            return Ok(());
        };
        let flow_scope = self.instance(scope_key)?.context.clone();
        let scope_element = self.element(&flow_scope.element_id)?;
        let container = self.container_processor(scope_element.element_type)?;
        container.on_child_terminated(scope_element, &flow_scope, terminated, self)
    }

    fn live_state(&self, context: &ElementContext) -> Result<LifecycleState, ProcessingError> {
        Ok(self.instance(context.element_instance_key)?.state())
    }

    fn check_not_frozen(&self, context: &ElementContext) -> Result<(), ProcessingError> {
        let key = context.element_instance_key;
        match self.state().incidents().open_for(key) {
            Some(incident) => Err(ProcessingError::InstanceFrozen {
                key,
                incident_key: incident.key,
            }),
            None => Ok(()),
        }
    }

    fn check_transition(
        &self,
        context: &ElementContext,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), ProcessingError> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(ProcessingError::IllegalTransition {
                key: context.element_instance_key,
                from,
                to,
            })
        }
    }

    fn check_required_variables(
        &self,
        element: &ElementDefinition,
        context: &ElementContext,
    ) -> Option<Failure> {
        let variables = self.state().variables();
        element
            .required_variables
            .iter()
            .find(|name| {
                !context.variables.contains_key(name.as_str())
                    && variables.get(context.process_instance_key, name).is_none()
            })
            .map(|name| Failure::missing_variable(&element.id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ElementType, ProcessDefinition, ProcessModel};
    use crate::engine::expression::ExpressionLanguage;
    use crate::engine::registry::ProcessorRegistry;
    use crate::failure::ErrorType;
    use crate::state::ProcessingState;
    use serde_json::json;

    fn definition() -> ProcessDefinition {
        ProcessModel::new("p")
            .element(ElementDefinition::service_task("review").requiring("approved"))
            .build()
            .unwrap()
    }

    fn context() -> ElementContext {
        ElementContext {
            element_instance_key: 7,
            process_instance_key: 7,
            flow_scope_key: None,
            process_id: "p".into(),
            version: 1,
            element_id: "review".into(),
            element_type: ElementType::ServiceTask,
            state: LifecycleState::Activating,
            variables: Variables::new(),
        }
    }

    #[test]
    fn test_activation_twice_is_a_defect() {
        let definition = definition();
        let registry = ProcessorRegistry::standard();
        let expressions = ExpressionLanguage::new();
        let mut state = ProcessingState::new(1);
        let mut behaviors =
            BpmnBehaviors::new(&definition, &registry, &expressions, &mut state, 10);

        let activated = behaviors.transition_to_activated(&context()).unwrap();
        assert_eq!(activated.state, LifecycleState::Activated);
        assert_eq!(behaviors.records().len(), 1);

        let err = behaviors.transition_to_activated(&context()).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::IllegalTransition {
                key: 7,
                from: LifecycleState::Activated,
                to: LifecycleState::Activated
            }
        ));
    }

    #[test]
    fn test_missing_required_variable_fails_without_writing() {
        let definition = definition();
        let element = definition.element("review").unwrap();
        let registry = ProcessorRegistry::standard();
        let expressions = ExpressionLanguage::new();
        let mut state = ProcessingState::new(1);
        let mut behaviors =
            BpmnBehaviors::new(&definition, &registry, &expressions, &mut state, 10);

        let activated = behaviors.transition_to_activated(&context()).unwrap();
        let completion = behaviors.transition_to_completed(element, &activated).unwrap();

        match completion {
            Completion::Failed(failure) => {
                assert_eq!(failure.error_type, ErrorType::MissingVariable);
                assert_eq!(failure.expression.as_deref(), Some("approved"));
            }
            Completion::Completed(_) => panic!("expected a failure"),
        }
        assert_eq!(behaviors.records().len(), 1);
        assert_eq!(
            behaviors.instance(7).unwrap().state(),
            LifecycleState::Activated
        );
    }

    #[test]
    fn test_completion_with_command_variables() {
        let definition = definition();
        let element = definition.element("review").unwrap();
        let registry = ProcessorRegistry::standard();
        let expressions = ExpressionLanguage::new();
        let mut state = ProcessingState::new(1);
        let mut behaviors =
            BpmnBehaviors::new(&definition, &registry, &expressions, &mut state, 10);

        let activated = behaviors.transition_to_activated(&context()).unwrap();
        let mut variables = Variables::new();
        variables.insert("approved".into(), json!(true));
        let completion = behaviors
            .transition_to_completed(element, &activated.with_variables(variables))
            .unwrap();

        let Completion::Completed(completed) = completion else {
            panic!("expected completion");
        };
        assert!(completed.flows.is_empty());
        assert_eq!(completed.context.state, LifecycleState::Completed);
        assert!(behaviors.state().instances().get(7).is_none());
        assert_eq!(
            behaviors.records()[1].element_instance().unwrap().variables["approved"],
            json!(true)
        );
    }

    #[test]
    fn test_terminated_instance_cannot_transition() {
        let definition = definition();
        let registry = ProcessorRegistry::standard();
        let expressions = ExpressionLanguage::new();
        let mut state = ProcessingState::new(1);
        let mut behaviors =
            BpmnBehaviors::new(&definition, &registry, &expressions, &mut state, 10);

        let activated = behaviors.transition_to_activated(&context()).unwrap();
        let terminating = behaviors.transition_to_terminating(&activated).unwrap();
        behaviors.transition_to_terminated(&terminating).unwrap();

        assert!(matches!(
            behaviors.transition_to_terminated(&terminating),
            Err(ProcessingError::InstanceNotFound(7))
        ));
        assert!(matches!(
            behaviors.transition_to_completing(&activated),
            Err(ProcessingError::InstanceNotFound(7))
        ));
    }

    #[test]
    fn test_completing_cannot_go_back() {
        let definition = definition();
        let registry = ProcessorRegistry::standard();
        let expressions = ExpressionLanguage::new();
        let mut state = ProcessingState::new(1);
        let mut behaviors =
            BpmnBehaviors::new(&definition, &registry, &expressions, &mut state, 10);

        let activated = behaviors.transition_to_activated(&context()).unwrap();
        behaviors.transition_to_completing(&activated).unwrap();

        assert!(matches!(
            behaviors.transition_to_completing(&activated),
            Err(ProcessingError::IllegalTransition {
                from: LifecycleState::Completing,
                to: LifecycleState::Completing,
                ..
            })
        ));
    }
}
