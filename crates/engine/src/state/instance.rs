//! Element instance lifecycle and tracking

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::keys::Key;
use super::variables::Variables;
use crate::definition::ElementType;

/// Lifecycle state of an element instance
///
/// Within one activation the state only moves forward:
/// `Activating -> Activated -> Completing -> Completed`, or from any
/// non-terminal state `-> Terminating -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Activating,
    Activated,
    Completing,
    Completed,
    Terminating,
    Terminated,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }

    /// Whether the lifecycle protocol allows moving from `self` to `next`
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, next) {
            (Activating, Activated) => true,
            (Activated, Completing) | (Activated, Completed) => true,
            (Completing, Completed) => true,
            (from, Terminating) | (from, Terminated) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activating => write!(f, "ACTIVATING"),
            Self::Activated => write!(f, "ACTIVATED"),
            Self::Completing => write!(f, "COMPLETING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Terminating => write!(f, "TERMINATING"),
            Self::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Identity and state of one element instance
///
/// The context references its flow scope by key only; the coordinator looks
/// the parent up when it has to notify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementContext {
    pub element_instance_key: Key,
    pub process_instance_key: Key,
    pub flow_scope_key: Option<Key>,
    pub process_id: String,
    pub version: u32,
    pub element_id: String,
    pub element_type: ElementType,
    pub state: LifecycleState,

    /// Variables carried by the command currently being processed
    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub variables: Variables,
}

impl ElementContext {
    pub fn with_state(&self, state: LifecycleState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

/// A live element instance and its flow scope bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct ElementInstance {
    pub context: ElementContext,

    /// Child instances currently alive in this scope
    pub active_children: usize,

    /// Flows taken inside this scope whose target is not activated yet
    pub active_flows: usize,
}

impl ElementInstance {
    pub fn new(context: ElementContext) -> Self {
        Self {
            context,
            active_children: 0,
            active_flows: 0,
        }
    }

    pub fn key(&self) -> Key {
        self.context.element_instance_key
    }

    pub fn state(&self) -> LifecycleState {
        self.context.state
    }

    /// Nothing is alive or on its way inside this scope
    pub fn is_idle(&self) -> bool {
        self.active_children == 0 && self.active_flows == 0
    }
}

/// All live element instances of a partition, ordered by key
#[derive(Debug, Clone, Default)]
pub struct ElementInstanceState {
    instances: BTreeMap<Key, ElementInstance>,
}

impl ElementInstanceState {
    pub fn get(&self, key: Key) -> Option<&ElementInstance> {
        self.instances.get(&key)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut ElementInstance> {
        self.instances.get_mut(&key)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.instances.contains_key(&key)
    }

    pub fn insert(&mut self, instance: ElementInstance) {
        self.instances.insert(instance.key(), instance);
    }

    pub fn remove(&mut self, key: Key) -> Option<ElementInstance> {
        self.instances.remove(&key)
    }

    /// Keys of the live children of a scope, in key order
    pub fn children_of(&self, scope_key: Key) -> Vec<Key> {
        self.instances
            .values()
            .filter(|instance| instance.context.flow_scope_key == Some(scope_key))
            .map(ElementInstance::key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn test_forward_transitions() {
        assert!(Activating.can_transition_to(Activated));
        assert!(Activated.can_transition_to(Completing));
        assert!(Activated.can_transition_to(Completed));
        assert!(Completing.can_transition_to(Completed));
        assert!(Terminating.can_transition_to(Terminated));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!Activated.can_transition_to(Activating));
        assert!(!Completing.can_transition_to(Activated));
        assert!(!Completed.can_transition_to(Activated));
        assert!(!Terminating.can_transition_to(Completed));
        assert!(!Activating.can_transition_to(Completed));
    }

    #[test]
    fn test_termination_from_any_live_state() {
        for state in [Activating, Activated, Completing, Terminating] {
            assert!(state.can_transition_to(Terminated), "{state}");
        }
        assert!(!Completed.can_transition_to(Terminating));
        assert!(!Terminated.can_transition_to(Terminated));
    }

    #[test]
    fn test_children_of() {
        let mut state = ElementInstanceState::default();
        let context = |key, scope| ElementContext {
            element_instance_key: key,
            process_instance_key: 1,
            flow_scope_key: scope,
            process_id: "p".into(),
            version: 1,
            element_id: "e".into(),
            element_type: ElementType::Task,
            state: Activated,
            variables: Variables::new(),
        };
        state.insert(ElementInstance::new(context(1, None)));
        state.insert(ElementInstance::new(context(9, Some(1))));
        state.insert(ElementInstance::new(context(4, Some(1))));
        state.insert(ElementInstance::new(context(5, Some(4))));

        assert_eq!(state.children_of(1), vec![4, 9]);
        assert_eq!(state.children_of(4), vec![5]);
        assert!(state.children_of(5).is_empty());
    }
}
