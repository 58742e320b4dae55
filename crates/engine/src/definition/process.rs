//! Process definitions
//!
//! A [`ProcessModel`] is the deserializable shape of a process: a flat list of
//! elements and flows. [`ProcessDefinition::new`] indexes it once and derives
//! every element's incoming/outgoing flows. After that the definition never
//! changes and is shared by reference between all of its instances.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::element::{ElementDefinition, ElementType, SequenceFlow};

/// Errors from building a process definition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("process id must not be empty")]
    EmptyProcessId,

    #[error("element id '{0}' is declared more than once")]
    DuplicateElement(String),

    #[error("sequence flow id '{0}' is declared more than once")]
    DuplicateFlow(String),

    #[error("element id '{0}' collides with the process id")]
    ReservedElementId(String),

    #[error("sequence flow '{flow}' references unknown element '{element}'")]
    UnknownFlowElement { flow: String, element: String },

    #[error("element '{element}' has unknown flow scope '{scope}'")]
    UnknownFlowScope { element: String, scope: String },

    #[error("element '{element}' has flow scope '{scope}' which is not a container")]
    FlowScopeNotContainer { element: String, scope: String },

    #[error("sequence flow '{0}' connects elements of different flow scopes")]
    CrossScopeFlow(String),

    #[error("default flow '{flow}' of element '{element}' is not one of its outgoing flows")]
    InvalidDefaultFlow { element: String, flow: String },

    #[error("element '{0}' of type process can only be the implicit root")]
    NestedProcess(String),

    #[error("boundary event '{0}' is not attached to an activity")]
    UnattachedBoundaryEvent(String),

    #[error("element '{element}' is attached to '{host}', not an activity in its flow scope")]
    InvalidAttachment { element: String, host: String },
}

/// Serializable process model, as written by a modeler or loaded from a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessModel {
    /// Process id (also the id of the implicit root element)
    pub id: String,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub elements: Vec<ElementDefinition>,

    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
}

fn default_version() -> u32 {
    1
}

impl ProcessModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            elements: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn element(mut self, element: ElementDefinition) -> Self {
        self.elements.push(element);
        self
    }

    pub fn flow(mut self, flow: SequenceFlow) -> Self {
        self.flows.push(flow);
        self
    }

    /// Shorthand for an unguarded flow
    pub fn connect(
        self,
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.flow(SequenceFlow::new(id, source, target))
    }

    /// Index and check the model
    pub fn build(self) -> Result<ProcessDefinition, DefinitionError> {
        ProcessDefinition::new(self)
    }
}

/// Indexed, immutable process definition
#[derive(Debug, Clone)]
pub struct ProcessDefinition {
    process_id: String,
    version: u32,
    root: ElementDefinition,
    elements: Vec<ElementDefinition>,
    element_index: HashMap<String, usize>,
    flows: Vec<SequenceFlow>,
    flow_index: HashMap<String, usize>,
}

impl ProcessDefinition {
    pub fn new(model: ProcessModel) -> Result<Self, DefinitionError> {
        let ProcessModel {
            id: process_id,
            version,
            mut elements,
            flows,
        } = model;

        if process_id.is_empty() {
            return Err(DefinitionError::EmptyProcessId);
        }

        let mut element_index = HashMap::with_capacity(elements.len());
        for (idx, element) in elements.iter_mut().enumerate() {
            if element.id == process_id {
                return Err(DefinitionError::ReservedElementId(element.id.clone()));
            }
            if element.element_type == ElementType::Process {
                return Err(DefinitionError::NestedProcess(element.id.clone()));
            }
            if element_index.insert(element.id.clone(), idx).is_some() {
                return Err(DefinitionError::DuplicateElement(element.id.clone()));
            }
            element.incoming.clear();
            element.outgoing.clear();
            if element.flow_scope.is_none() {
                element.flow_scope = Some(process_id.clone());
            }
        }

        for element in &elements {
            let scope = element.flow_scope.as_deref().unwrap_or(process_id.as_str());
            if scope == process_id {
                continue;
            }
            match element_index.get(scope) {
                None => {
                    return Err(DefinitionError::UnknownFlowScope {
                        element: element.id.clone(),
                        scope: scope.to_string(),
                    })
                }
                Some(&idx) if !elements[idx].element_type.is_container() => {
                    return Err(DefinitionError::FlowScopeNotContainer {
                        element: element.id.clone(),
                        scope: scope.to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        for element in &elements {
            check_attachment(element, &elements, &element_index)?;
        }

        let mut flow_index = HashMap::with_capacity(flows.len());
        for (idx, flow) in flows.iter().enumerate() {
            if flow_index.insert(flow.id.clone(), idx).is_some() {
                return Err(DefinitionError::DuplicateFlow(flow.id.clone()));
            }
            let source = lookup(&element_index, flow, &flow.source)?;
            let target = lookup(&element_index, flow, &flow.target)?;
            if elements[source].flow_scope != elements[target].flow_scope {
                return Err(DefinitionError::CrossScopeFlow(flow.id.clone()));
            }
            elements[source].outgoing.push(flow.id.clone());
            elements[target].incoming.push(flow.id.clone());
        }

        for element in &elements {
            if let Some(default_flow) = &element.default_flow {
                if !element.outgoing.contains(default_flow) {
                    return Err(DefinitionError::InvalidDefaultFlow {
                        element: element.id.clone(),
                        flow: default_flow.clone(),
                    });
                }
            }
        }

        let root = ElementDefinition::new(process_id.clone(), ElementType::Process);

        Ok(Self {
            process_id,
            version,
            root,
            elements,
            element_index,
            flows,
            flow_index,
        })
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Look up an element by id; the process id resolves to the root element
    pub fn element(&self, element_id: &str) -> Option<&ElementDefinition> {
        if element_id == self.process_id {
            return Some(&self.root);
        }
        self.element_index
            .get(element_id)
            .map(|&idx| &self.elements[idx])
    }

    pub fn flow(&self, flow_id: &str) -> Option<&SequenceFlow> {
        self.flow_index.get(flow_id).map(|&idx| &self.flows[idx])
    }

    /// Start events directly inside the given container, in declaration order
    pub fn start_events_of<'a>(
        &'a self,
        container_id: &'a str,
    ) -> impl Iterator<Item = &'a ElementDefinition> + 'a {
        self.elements.iter().filter(move |element| {
            element.element_type == ElementType::StartEvent
                && element.flow_scope.as_deref() == Some(container_id)
        })
    }

    /// All non-root elements, in declaration order
    pub fn elements(&self) -> &[ElementDefinition] {
        &self.elements
    }
}

/// Only boundary events are attached, and only to an activity beside them
fn check_attachment(
    element: &ElementDefinition,
    elements: &[ElementDefinition],
    index: &HashMap<String, usize>,
) -> Result<(), DefinitionError> {
    let host_id = match (&element.attached_to, element.element_type) {
        (None, ElementType::BoundaryEvent) => {
            return Err(DefinitionError::UnattachedBoundaryEvent(element.id.clone()))
        }
        (None, _) => return Ok(()),
        (Some(host_id), _) => host_id,
    };
    let host = index.get(host_id).map(|&idx| &elements[idx]);
    match host {
        Some(host)
            if element.element_type == ElementType::BoundaryEvent
                && host.element_type.is_activity()
                && host.flow_scope == element.flow_scope =>
        {
            Ok(())
        }
        _ => Err(DefinitionError::InvalidAttachment {
            element: element.id.clone(),
            host: host_id.clone(),
        }),
    }
}

fn lookup(
    index: &HashMap<String, usize>,
    flow: &SequenceFlow,
    element_id: &str,
) -> Result<usize, DefinitionError> {
    index
        .get(element_id)
        .copied()
        .ok_or_else(|| DefinitionError::UnknownFlowElement {
            flow: flow.id.clone(),
            element: element_id.to_string(),
        })
}
