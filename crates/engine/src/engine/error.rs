//! Processing errors
//!
//! A [`ProcessingError`] means the command was not applied. It is either a
//! [`Rejection`] (the command does not fit the current state and is dropped
//! without records) or a defect: a broken invariant that halts processing of
//! the command so it can be investigated. Business failures are not errors;
//! they are [`Failure`](crate::Failure) values turned into incidents.

use crate::definition::ElementType;
use crate::record::LogError;
use crate::state::{Key, LifecycleState};

/// Why an inbound command was not applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("element instance {0} already exists")]
    InstanceAlreadyExists(Key),

    #[error("element instance {0} does not exist")]
    InstanceNotFound(Key),

    #[error("process '{0}' is not deployed")]
    ProcessNotDeployed(String),

    #[error("element '{element_id}' does not exist in process '{process_id}'")]
    UnknownElement {
        process_id: String,
        element_id: String,
    },

    #[error("flow scope instance {0} does not exist or is not activated")]
    FlowScopeNotActive(Key),

    #[error("element '{element_id}' cannot be activated in flow scope instance {flow_scope_key}")]
    WrongFlowScope {
        element_id: String,
        flow_scope_key: Key,
    },

    #[error("element instance {key} is frozen by open incident {incident_key}")]
    Frozen { key: Key, incident_key: Key },

    #[error("element instance {key} is {state}, expected {expected}")]
    InvalidState {
        key: Key,
        state: LifecycleState,
        expected: LifecycleState,
    },

    #[error("element instance {key} of type {element_type} cannot be completed by a command")]
    NotExternallyCompletable { key: Key, element_type: ElementType },

    #[error("incident {0} does not exist")]
    IncidentNotFound(Key),
}

/// Errors from processing a command
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// The command was rejected; nothing happened
    #[error("command rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("no processor registered for element type {0}")]
    UnregisteredElementType(ElementType),

    #[error("element type {0} has no container processor")]
    NotAContainer(ElementType),

    #[error("illegal transition of element instance {key} from {from} to {to}")]
    IllegalTransition {
        key: Key,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("element instance {0} does not exist")]
    InstanceNotFound(Key),

    #[error("element instance {key} already has open incident {incident_key}")]
    DuplicateIncident { key: Key, incident_key: Key },

    #[error("element instance {key} is frozen by open incident {incident_key}")]
    InstanceFrozen { key: Key, incident_key: Key },

    #[error("element '{element_id}' not found in process '{process_id}'")]
    ElementNotFound {
        process_id: String,
        element_id: String,
    },

    #[error("sequence flow '{0}' not found")]
    FlowNotFound(String),

    #[error("process '{process_id}' version {version} is not deployed")]
    DefinitionNotFound { process_id: String, version: u32 },

    #[error("command exceeded {0} element activations")]
    StepLimitExceeded(usize),

    #[error("log append failed: {0}")]
    Log(#[from] LogError),
}

impl ProcessingError {
    /// Whether the error is a defect rather than a rejected command
    pub fn is_defect(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_is_not_a_defect() {
        let err: ProcessingError = Rejection::InstanceNotFound(3).into();

        assert!(!err.is_defect());
        assert_eq!(err.rejection(), Some(&Rejection::InstanceNotFound(3)));
        assert_eq!(err.to_string(), "command rejected: element instance 3 does not exist");
    }

    #[test]
    fn test_defects() {
        let err = ProcessingError::IllegalTransition {
            key: 5,
            from: LifecycleState::Activated,
            to: LifecycleState::Activated,
        };

        assert!(err.is_defect());
        assert!(err.rejection().is_none());
        assert_eq!(
            err.to_string(),
            "illegal transition of element instance 5 from ACTIVATED to ACTIVATED"
        );
    }
}
