//! Element and sequence flow definitions

use serde::{Deserialize, Serialize};

/// Static type tag of a process element
///
/// The set is closed: every variant has exactly one processor in the
/// standard [`ProcessorRegistry`](crate::engine::ProcessorRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// The implicit root element of a process definition
    Process,

    /// Embedded sub-process owning its own start events
    SubProcess,

    /// None start event
    StartEvent,

    /// None end event
    EndEvent,

    /// Event attached to an activity; starts its own path when activated
    BoundaryEvent,

    /// Task without any behavior of its own (completes right away)
    Task,

    /// Task that waits for an external `COMPLETE_ELEMENT` command
    ServiceTask,

    /// Exclusive choice between guarded outgoing flows
    ExclusiveGateway,

    /// Parallel fork and/or join
    ParallelGateway,
}

impl ElementType {
    /// All element types, in declaration order
    pub const ALL: [ElementType; 9] = [
        ElementType::Process,
        ElementType::SubProcess,
        ElementType::StartEvent,
        ElementType::EndEvent,
        ElementType::BoundaryEvent,
        ElementType::Task,
        ElementType::ServiceTask,
        ElementType::ExclusiveGateway,
        ElementType::ParallelGateway,
    ];

    /// Whether instances of this type own child element instances
    pub fn is_container(self) -> bool {
        matches!(self, Self::Process | Self::SubProcess)
    }

    /// Whether boundary events can be attached to this type
    pub fn is_activity(self) -> bool {
        matches!(self, Self::Task | Self::ServiceTask | Self::SubProcess)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Process => write!(f, "process"),
            Self::SubProcess => write!(f, "sub_process"),
            Self::StartEvent => write!(f, "start_event"),
            Self::EndEvent => write!(f, "end_event"),
            Self::BoundaryEvent => write!(f, "boundary_event"),
            Self::Task => write!(f, "task"),
            Self::ServiceTask => write!(f, "service_task"),
            Self::ExclusiveGateway => write!(f, "exclusive_gateway"),
            Self::ParallelGateway => write!(f, "parallel_gateway"),
        }
    }
}

/// Immutable description of one node in a process definition
///
/// `incoming` and `outgoing` are derived from the definition's sequence flows
/// when the [`ProcessDefinition`](super::ProcessDefinition) is built, in the
/// order the flows were declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    /// Element id, unique within the process
    pub id: String,

    /// Static type tag
    #[serde(rename = "type")]
    pub element_type: ElementType,

    /// Id of the enclosing container element (the process when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_scope: Option<String>,

    /// Activity a boundary event is attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,

    /// Outgoing flow taken when no guarded flow of an exclusive gateway matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_flow: Option<String>,

    /// Variables that must be visible for the element to complete
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_variables: Vec<String>,

    /// Ids of flows targeting this element
    #[serde(skip)]
    pub incoming: Vec<String>,

    /// Ids of flows leaving this element
    #[serde(skip)]
    pub outgoing: Vec<String>,
}

impl ElementDefinition {
    /// Create an element directly inside the process
    pub fn new(id: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            id: id.into(),
            element_type,
            flow_scope: None,
            attached_to: None,
            default_flow: None,
            required_variables: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn task(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::Task)
    }

    pub fn service_task(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::ServiceTask)
    }

    pub fn start_event(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::StartEvent)
    }

    pub fn end_event(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::EndEvent)
    }

    /// Boundary event attached to the given activity
    pub fn boundary_event(id: impl Into<String>, attached_to: impl Into<String>) -> Self {
        let mut element = Self::new(id, ElementType::BoundaryEvent);
        element.attached_to = Some(attached_to.into());
        element
    }

    pub fn exclusive_gateway(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::ExclusiveGateway)
    }

    pub fn parallel_gateway(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::ParallelGateway)
    }

    pub fn sub_process(id: impl Into<String>) -> Self {
        Self::new(id, ElementType::SubProcess)
    }

    /// Place the element inside the given container
    pub fn within(mut self, flow_scope: impl Into<String>) -> Self {
        self.flow_scope = Some(flow_scope.into());
        self
    }

    /// Declare the default flow of an exclusive gateway
    pub fn with_default_flow(mut self, flow_id: impl Into<String>) -> Self {
        self.default_flow = Some(flow_id.into());
        self
    }

    /// Require a variable to be present on completion
    pub fn requiring(mut self, variable: impl Into<String>) -> Self {
        self.required_variables.push(variable.into());
        self
    }

    /// Whether a parallel gateway has to wait for more than one incoming flow
    pub fn is_parallel_join(&self) -> bool {
        self.element_type == ElementType::ParallelGateway && self.incoming.len() > 1
    }
}

/// Directed, optionally guarded edge between two elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFlow {
    pub id: String,
    pub source: String,
    pub target: String,

    /// Guard expression, evaluated against the process instance variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl SequenceFlow {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}
