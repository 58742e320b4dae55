//! Partition engine
//!
//! The `Engine` is responsible for:
//! - Validating inbound commands against the current state (rejections)
//! - Dispatching them to the processor of the element type
//! - Appending the records written while processing to the log
//! - Rolling the state back when processing hits a defect

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::behaviors::BpmnBehaviors;
use super::error::{ProcessingError, Rejection};
use super::expression::ExpressionLanguage;
use super::registry::ProcessorRegistry;
use crate::config::EngineConfig;
use crate::definition::{ElementDefinition, ProcessCache, ProcessDefinition};
use crate::record::{Command, InMemoryRecordLog, Intent, Record, RecordWriter};
use crate::state::{ElementContext, Incident, Key, LifecycleState, ProcessingState, Variables};

/// Records written for one command
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub records: Vec<Record>,

    /// Log position of the last record, if anything was written
    pub position: Option<u64>,
}

impl ProcessingResult {
    pub fn intents(&self) -> Vec<Intent> {
        self.records.iter().map(|record| record.intent).collect()
    }

    /// Records with the given intent, in write order
    pub fn with_intent(&self, intent: Intent) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |record| record.intent == intent)
    }
}

/// Execution core of one partition
///
/// Commands are processed one at a time, in the order they are given. Each
/// command either succeeds and appends all of its records in one batch, or
/// fails and leaves both the state and the log untouched.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use flowline_engine::prelude::*;
///
/// let processes = Arc::new(ProcessCache::new());
/// processes.deploy(
///     ProcessModel::new("order")
///         .element(ElementDefinition::task("taskA"))
///         .element(ElementDefinition::task("taskB"))
///         .connect("f1", "taskA", "taskB")
///         .build()
///         .unwrap(),
/// );
///
/// let mut engine = Engine::new(processes);
/// let result = engine.process(Command::activate(5, "order", "taskA")).unwrap();
/// assert_eq!(result.records.len(), 4);
/// ```
pub struct Engine<W: RecordWriter = InMemoryRecordLog> {
    config: EngineConfig,
    processes: Arc<ProcessCache>,
    registry: ProcessorRegistry,
    expressions: ExpressionLanguage,
    state: ProcessingState,
    writer: W,
}

impl Engine<InMemoryRecordLog> {
    /// Create an engine writing to an in-memory log
    pub fn new(processes: Arc<ProcessCache>) -> Self {
        Self::with_writer(processes, InMemoryRecordLog::new())
    }
}

impl<W: RecordWriter> Engine<W> {
    pub fn with_writer(processes: Arc<ProcessCache>, writer: W) -> Self {
        Self::with_config(processes, writer, EngineConfig::default())
    }

    pub fn with_config(processes: Arc<ProcessCache>, writer: W, config: EngineConfig) -> Self {
        Self {
            state: ProcessingState::new(config.partition_id),
            config,
            processes,
            registry: ProcessorRegistry::standard(),
            expressions: ExpressionLanguage::new(),
            writer,
        }
    }

    /// Replace the processor table
    pub fn with_registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn processes(&self) -> &Arc<ProcessCache> {
        &self.processes
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// The live element instance with the given key
    pub fn element_instance(&self, key: Key) -> Option<&ElementContext> {
        self.state.instances().get(key).map(|instance| &instance.context)
    }

    /// The open incident freezing an element instance
    pub fn open_incident_for(&self, element_instance_key: Key) -> Option<&Incident> {
        self.state.incidents().open_for(element_instance_key)
    }

    pub fn incident(&self, incident_key: Key) -> Option<&Incident> {
        self.state.incidents().get(incident_key)
    }

    /// Variables of a live process instance
    pub fn variables(&self, process_instance_key: Key) -> Option<&Variables> {
        self.state.variables().document(process_instance_key)
    }

    /// Process one inbound command
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub fn process(&mut self, command: Command) -> Result<ProcessingResult, ProcessingError> {
        let snapshot = self.state.clone();
        let outcome = self
            .process_command(command)
            .and_then(|records| self.append(records));

        match &outcome {
            Ok(result) => debug!(records = result.records.len(), "command processed"),
            Err(err) => {
                self.state = snapshot;
                if err.is_defect() {
                    error!(error = %err, "command processing failed");
                } else {
                    warn!(error = %err, "command rejected");
                }
            }
        }
        outcome
    }

    fn append(&mut self, records: Vec<Record>) -> Result<ProcessingResult, ProcessingError> {
        if records.is_empty() {
            return Ok(ProcessingResult {
                records,
                position: None,
            });
        }
        let position = self.writer.append(records.clone())?;
        Ok(ProcessingResult {
            records,
            position: Some(position),
        })
    }

    fn process_command(&mut self, command: Command) -> Result<Vec<Record>, ProcessingError> {
        match command {
            Command::ActivateElement {
                element_instance_key,
                process_id,
                element_id,
                flow_scope_key,
                variables,
            } => self.activate_element(
                element_instance_key,
                process_id,
                element_id,
                flow_scope_key,
                variables,
            ),
            Command::CompleteElement {
                element_instance_key,
                variables,
            } => self.complete_element(element_instance_key, variables),
            Command::TerminateElement {
                element_instance_key,
            } => self.terminate_element(element_instance_key),
            Command::ResolveIncident { incident_key } => self.resolve_incident(incident_key),
        }
    }

    fn activate_element(
        &mut self,
        key: Key,
        process_id: String,
        element_id: String,
        flow_scope_key: Option<Key>,
        variables: Variables,
    ) -> Result<Vec<Record>, ProcessingError> {
        if self.state.instances().contains(key)
            || (flow_scope_key.is_none() && self.state.is_process_instance_live(key))
        {
            return Err(Rejection::InstanceAlreadyExists(key).into());
        }

        let (definition, process_instance_key, scope_element_id) = match flow_scope_key {
            Some(scope_key) => {
                let scope = self
                    .state
                    .instances()
                    .get(scope_key)
                    .filter(|scope| scope.state() == LifecycleState::Activated)
                    .map(|scope| scope.context.clone())
                    .ok_or(Rejection::FlowScopeNotActive(scope_key))?;
                if scope.process_id != process_id {
                    return Err(Rejection::WrongFlowScope {
                        element_id,
                        flow_scope_key: scope_key,
                    }
                    .into());
                }
                let definition = self.definition(&scope.process_id, scope.version)?;
                (definition, scope.process_instance_key, Some(scope.element_id))
            }
            None => {
                let definition = self
                    .processes
                    .latest(&process_id)
                    .ok_or_else(|| Rejection::ProcessNotDeployed(process_id.clone()))?;
                (definition, key, None)
            }
        };

        let element = definition
            .element(&element_id)
            .ok_or_else(|| Rejection::UnknownElement {
                process_id: process_id.clone(),
                element_id: element_id.clone(),
            })?;
        if let (Some(scope_element_id), Some(scope_key)) = (&scope_element_id, flow_scope_key) {
            if element.flow_scope.as_deref() != Some(scope_element_id.as_str()) {
                return Err(Rejection::WrongFlowScope {
                    element_id,
                    flow_scope_key: scope_key,
                }
                .into());
            }
        }

        self.state.observe_key(key);
        info!(
            element_instance_key = key,
            process_instance_key,
            %process_id,
            %element_id,
            "activating element"
        );
        let context = ElementContext {
            element_instance_key: key,
            process_instance_key,
            flow_scope_key,
            process_id: definition.process_id().to_string(),
            version: definition.version(),
            element_id: element.id.clone(),
            element_type: element.element_type,
            state: LifecycleState::Activating,
            variables,
        };
        self.run(&definition, process_instance_key, |behaviors| {
            behaviors.activate(element, &context)
        })
    }

    fn complete_element(
        &mut self,
        key: Key,
        variables: Variables,
    ) -> Result<Vec<Record>, ProcessingError> {
        let instance = self
            .state
            .instances()
            .get(key)
            .ok_or(Rejection::InstanceNotFound(key))?;
        if let Some(incident) = self.state.incidents().open_for(key) {
            return Err(Rejection::Frozen {
                key,
                incident_key: incident.key,
            }
            .into());
        }
        if instance.state() != LifecycleState::Activated {
            return Err(Rejection::InvalidState {
                key,
                state: instance.state(),
                expected: LifecycleState::Activated,
            }
            .into());
        }
        if instance.context.element_type.is_container() {
            return Err(Rejection::NotExternallyCompletable {
                key,
                element_type: instance.context.element_type,
            }
            .into());
        }

        let context = instance.context.clone().with_variables(variables);
        info!(element_instance_key = key, element_id = %context.element_id, "completing element");

        let definition = self.definition(&context.process_id, context.version)?;
        let element = element_of(&definition, &context)?;
        self.run(&definition, context.process_instance_key, |behaviors| {
            let processor = behaviors.processor(element.element_type)?;
            processor.on_complete(element, &context, behaviors)
        })
    }

    fn terminate_element(&mut self, key: Key) -> Result<Vec<Record>, ProcessingError> {
        let context = self
            .state
            .instances()
            .get(key)
            .map(|instance| instance.context.clone())
            .ok_or(Rejection::InstanceNotFound(key))?;
        info!(element_instance_key = key, element_id = %context.element_id, "terminating element");

        let definition = self.definition(&context.process_id, context.version)?;
        let element = element_of(&definition, &context)?;
        self.run(&definition, context.process_instance_key, |behaviors| {
            behaviors.terminate_element(element, &context)
        })
    }

    fn resolve_incident(&mut self, incident_key: Key) -> Result<Vec<Record>, ProcessingError> {
        let incident = self
            .state
            .incidents()
            .get(incident_key)
            .cloned()
            .ok_or(Rejection::IncidentNotFound(incident_key))?;
        let context = self
            .state
            .instances()
            .get(incident.element_instance_key)
            .map(|instance| instance.context.clone())
            .ok_or(ProcessingError::InstanceNotFound(incident.element_instance_key))?;

        let definition = self.definition(&context.process_id, context.version)?;
        let element = element_of(&definition, &context)?;
        self.run(&definition, context.process_instance_key, |behaviors| {
            behaviors.resolve_incident(&incident);
            if context.state != LifecycleState::Completing {
                return Ok(());
            }
            debug!(element_instance_key = context.element_instance_key, "retrying completion");
            let processor = behaviors.processor(element.element_type)?;
            processor.on_complete(element, &context, behaviors)
        })
    }

    /// Run one command against the state, then activate every scheduled successor
    fn run<F>(
        &mut self,
        definition: &ProcessDefinition,
        process_instance_key: Key,
        handle: F,
    ) -> Result<Vec<Record>, ProcessingError>
    where
        F: FnOnce(&mut BpmnBehaviors<'_>) -> Result<(), ProcessingError>,
    {
        let mut behaviors = BpmnBehaviors::new(
            definition,
            &self.registry,
            &self.expressions,
            &mut self.state,
            self.config.max_steps_per_command,
        );
        handle(&mut behaviors)?;
        behaviors.run_pending()?;
        let records = behaviors.into_records();

        if self.state.release_if_finished(process_instance_key) {
            debug!(process_instance_key, "process instance finished");
        }
        Ok(records)
    }

    fn definition(
        &self,
        process_id: &str,
        version: u32,
    ) -> Result<Arc<ProcessDefinition>, ProcessingError> {
        self.processes
            .get(process_id, version)
            .ok_or_else(|| ProcessingError::DefinitionNotFound {
                process_id: process_id.to_string(),
                version,
            })
    }
}

fn element_of<'d>(
    definition: &'d ProcessDefinition,
    context: &ElementContext,
) -> Result<&'d ElementDefinition, ProcessingError> {
    definition
        .element(&context.element_id)
        .ok_or_else(|| ProcessingError::ElementNotFound {
            process_id: context.process_id.clone(),
            element_id: context.element_id.clone(),
        })
}
