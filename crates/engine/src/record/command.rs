//! Inbound lifecycle commands

use serde::{Deserialize, Serialize};

use crate::state::{Key, Variables};

/// A command delivered to the engine, in log order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Activate an element instance with the given key
    ///
    /// Without `flow_scope_key` the instance starts a new process instance whose
    /// key is the element instance key.
    ActivateElement {
        element_instance_key: Key,
        process_id: String,
        element_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flow_scope_key: Option<Key>,
        #[serde(default, skip_serializing_if = "Variables::is_empty")]
        variables: Variables,
    },

    /// Complete an element instance waiting for an external step
    CompleteElement {
        element_instance_key: Key,
        #[serde(default, skip_serializing_if = "Variables::is_empty")]
        variables: Variables,
    },

    /// Terminate an element instance (and all of its children)
    TerminateElement { element_instance_key: Key },

    /// Resolve an open incident and retry the step that failed
    ResolveIncident { incident_key: Key },
}

impl Command {
    pub fn activate(
        element_instance_key: Key,
        process_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Self {
        Self::ActivateElement {
            element_instance_key,
            process_id: process_id.into(),
            element_id: element_id.into(),
            flow_scope_key: None,
            variables: Variables::new(),
        }
    }

    pub fn complete(element_instance_key: Key) -> Self {
        Self::CompleteElement {
            element_instance_key,
            variables: Variables::new(),
        }
    }

    pub fn terminate(element_instance_key: Key) -> Self {
        Self::TerminateElement {
            element_instance_key,
        }
    }

    pub fn resolve_incident(incident_key: Key) -> Self {
        Self::ResolveIncident { incident_key }
    }

    /// Attach variables to an activate or complete command
    ///
    /// Other commands carry no variables and are returned unchanged.
    pub fn with_variables(mut self, values: Variables) -> Self {
        match &mut self {
            Self::ActivateElement { variables, .. } | Self::CompleteElement { variables, .. } => {
                variables.extend(values);
            }
            Self::TerminateElement { .. } | Self::ResolveIncident { .. } => {}
        }
        self
    }

    /// Activate as a child of an existing flow scope instance
    pub fn in_flow_scope(mut self, scope_key: Key) -> Self {
        if let Self::ActivateElement { flow_scope_key, .. } = &mut self {
            *flow_scope_key = Some(scope_key);
        }
        self
    }

    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Self::ActivateElement { .. } => "ACTIVATE_ELEMENT",
            Self::CompleteElement { .. } => "COMPLETE_ELEMENT",
            Self::TerminateElement { .. } => "TERMINATE_ELEMENT",
            Self::ResolveIncident { .. } => "RESOLVE_INCIDENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commands_from_yaml() {
        let yaml = r#"
- { type: activate_element, element_instance_key: 5, process_id: order, element_id: order }
- type: complete_element
  element_instance_key: 7
  variables: { approved: true }
- { type: terminate_element, element_instance_key: 7 }
- { type: resolve_incident, incident_key: 11 }
"#;
        let commands: Vec<Command> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(commands[0], Command::activate(5, "order", "order"));
        let mut variables = Variables::new();
        variables.insert("approved".into(), json!(true));
        assert_eq!(commands[1], Command::complete(7).with_variables(variables));
        assert_eq!(commands[2].name(), "TERMINATE_ELEMENT");
        assert_eq!(commands[3], Command::resolve_incident(11));
    }

    #[test]
    fn test_with_variables_ignored_for_terminate() {
        let mut variables = Variables::new();
        variables.insert("x".into(), json!(1));

        assert_eq!(
            Command::terminate(3).with_variables(variables),
            Command::terminate(3)
        );
    }
}
