//! Outbound records

use serde::{Deserialize, Serialize};

use crate::definition::ElementType;
use crate::failure::{ErrorType, Failure};
use crate::state::{ElementContext, Incident, Key, Variables};

/// What a record says happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    ElementActivated,
    ElementCompleted,
    ElementTerminated,
    IncidentCreated,
    IncidentResolved,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElementActivated => write!(f, "ELEMENT_ACTIVATED"),
            Self::ElementCompleted => write!(f, "ELEMENT_COMPLETED"),
            Self::ElementTerminated => write!(f, "ELEMENT_TERMINATED"),
            Self::IncidentCreated => write!(f, "INCIDENT_CREATED"),
            Self::IncidentResolved => write!(f, "INCIDENT_RESOLVED"),
        }
    }
}

/// Element instance payload of a lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInstanceRecord {
    pub process_instance_key: Key,
    pub process_id: String,
    pub version: u32,
    pub element_id: String,
    pub element_type: ElementType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_scope_key: Option<Key>,

    /// Variables supplied with the command that caused this record
    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub variables: Variables,
}

impl ElementInstanceRecord {
    pub fn from_context(context: &ElementContext) -> Self {
        Self {
            process_instance_key: context.process_instance_key,
            process_id: context.process_id.clone(),
            version: context.version,
            element_id: context.element_id.clone(),
            element_type: context.element_type,
            flow_scope_key: context.flow_scope_key,
            variables: context.variables.clone(),
        }
    }
}

/// Incident payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub element_instance_key: Key,
    pub process_instance_key: Key,
    pub element_id: String,
    pub error_type: ErrorType,
    pub error_message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl IncidentRecord {
    pub fn new(failure: &Failure, context: &ElementContext) -> Self {
        Self {
            element_instance_key: context.element_instance_key,
            process_instance_key: context.process_instance_key,
            element_id: context.element_id.clone(),
            error_type: failure.error_type,
            error_message: failure.message.clone(),
            expression: failure.expression.clone(),
        }
    }

    pub fn failure(&self) -> Failure {
        Failure {
            error_type: self.error_type,
            message: self.error_message.clone(),
            expression: self.expression.clone(),
        }
    }
}

impl From<&Incident> for IncidentRecord {
    fn from(incident: &Incident) -> Self {
        Self {
            element_instance_key: incident.element_instance_key,
            process_instance_key: incident.process_instance_key,
            element_id: incident.element_id.clone(),
            error_type: incident.failure.error_type,
            error_message: incident.failure.message.clone(),
            expression: incident.failure.expression.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", rename_all = "snake_case")]
pub enum RecordValue {
    ElementInstance(ElementInstanceRecord),
    Incident(IncidentRecord),
}

/// One entry appended to the log
///
/// `key` is the element instance key for lifecycle records and the incident
/// key for incident records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: Key,
    pub intent: Intent,
    pub value: RecordValue,
}

impl Record {
    pub fn element(intent: Intent, context: &ElementContext) -> Self {
        Self {
            key: context.element_instance_key,
            intent,
            value: RecordValue::ElementInstance(ElementInstanceRecord::from_context(context)),
        }
    }

    pub fn incident(key: Key, intent: Intent, incident: IncidentRecord) -> Self {
        Self {
            key,
            intent,
            value: RecordValue::Incident(incident),
        }
    }

    pub fn element_instance(&self) -> Option<&ElementInstanceRecord> {
        match &self.value {
            RecordValue::ElementInstance(value) => Some(value),
            RecordValue::Incident(_) => None,
        }
    }

    pub fn incident_value(&self) -> Option<&IncidentRecord> {
        match &self.value {
            RecordValue::Incident(value) => Some(value),
            RecordValue::ElementInstance(_) => None,
        }
    }

    /// Element id of the record, for both value types
    pub fn element_id(&self) -> &str {
        match &self.value {
            RecordValue::ElementInstance(value) => &value.element_id,
            RecordValue::Incident(value) => &value.element_id,
        }
    }

    /// Element instance the record is about, for both value types
    pub fn element_instance_key(&self) -> Key {
        match &self.value {
            RecordValue::ElementInstance(_) => self.key,
            RecordValue::Incident(value) => value.element_instance_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LifecycleState;

    fn context() -> ElementContext {
        ElementContext {
            element_instance_key: 7,
            process_instance_key: 1,
            flow_scope_key: Some(1),
            process_id: "order".into(),
            version: 1,
            element_id: "review".into(),
            element_type: ElementType::ServiceTask,
            state: LifecycleState::Activated,
            variables: Variables::new(),
        }
    }

    #[test]
    fn test_element_record_json_shape() {
        let record = Record::element(Intent::ElementActivated, &context());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["key"], 7);
        assert_eq!(json["intent"], "ELEMENT_ACTIVATED");
        assert_eq!(json["value"]["value_type"], "element_instance");
        assert_eq!(json["value"]["element_type"], "service_task");
        assert!(json["value"].get("variables").is_none());

        let parsed: Record = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_incident_record_refers_to_element() {
        let failure = Failure::missing_variable("review", "approved");
        let record = Record::incident(
            42,
            Intent::IncidentCreated,
            IncidentRecord::new(&failure, &context()),
        );

        assert_eq!(record.element_instance_key(), 7);
        assert_eq!(record.element_id(), "review");
        assert_eq!(record.incident_value().unwrap().failure(), failure);
        assert!(record.element_instance().is_none());
    }
}
