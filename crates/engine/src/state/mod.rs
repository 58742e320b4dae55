//! Partition-local processing state
//!
//! The state is derived from the records the engine writes: every record is
//! passed through [`ProcessingState::apply`] as it is written, the same way an
//! event-sourced workflow is rebuilt from its events. Transient lifecycle
//! markers (`Completing`, `Terminating`) and flow scope counters are the only
//! things set directly, and only while a command is being processed.
//!
//! There is no locking: one partition processes its commands sequentially and
//! owns its state exclusively.

mod incident;
mod instance;
mod join;
mod keys;
mod variables;

use std::collections::HashMap;

use tracing::warn;

pub use incident::{Incident, IncidentState};
pub use instance::{ElementContext, ElementInstance, ElementInstanceState, LifecycleState};
pub use join::JoinState;
pub use keys::{decode_partition_id, encode_partition_id, Key, KeyGenerator};
pub use variables::{VariableState, Variables};

use crate::record::{ElementInstanceRecord, Intent, Record, RecordValue};

/// Everything the engine knows about the live instances of one partition
#[derive(Debug, Clone)]
pub struct ProcessingState {
    keys: KeyGenerator,
    instances: ElementInstanceState,
    incidents: IncidentState,
    variables: VariableState,
    joins: JoinState,
    live_per_process_instance: HashMap<Key, usize>,
}

impl ProcessingState {
    pub fn new(partition_id: u16) -> Self {
        Self {
            keys: KeyGenerator::new(partition_id),
            instances: ElementInstanceState::default(),
            incidents: IncidentState::default(),
            variables: VariableState::default(),
            joins: JoinState::default(),
            live_per_process_instance: HashMap::new(),
        }
    }

    pub fn next_key(&mut self) -> Key {
        self.keys.next_key()
    }

    /// Record a key chosen by a command so it is never generated later
    pub(crate) fn observe_key(&mut self, key: Key) {
        self.keys.observe(key);
    }

    pub fn instances(&self) -> &ElementInstanceState {
        &self.instances
    }

    pub fn incidents(&self) -> &IncidentState {
        &self.incidents
    }

    pub fn variables(&self) -> &VariableState {
        &self.variables
    }

    pub fn joins(&self) -> &JoinState {
        &self.joins
    }

    pub(crate) fn joins_mut(&mut self) -> &mut JoinState {
        &mut self.joins
    }

    /// Apply a written record to the state
    pub fn apply(&mut self, record: &Record) {
        match (&record.value, record.intent) {
            (RecordValue::ElementInstance(value), Intent::ElementActivated) => {
                self.on_activated(record.key, value);
            }
            (RecordValue::ElementInstance(value), Intent::ElementCompleted) => {
                self.variables
                    .merge(value.process_instance_key, &value.variables);
                self.remove_instance(record.key, value);
            }
            (RecordValue::ElementInstance(value), Intent::ElementTerminated) => {
                self.remove_instance(record.key, value);
            }
            (RecordValue::Incident(value), Intent::IncidentCreated) => {
                self.incidents.insert(Incident {
                    key: record.key,
                    element_instance_key: value.element_instance_key,
                    process_instance_key: value.process_instance_key,
                    element_id: value.element_id.clone(),
                    failure: value.failure(),
                });
            }
            (RecordValue::Incident(_), Intent::IncidentResolved) => {
                self.incidents.remove(record.key);
            }
            (_, intent) => {
                warn!(key = record.key, %intent, "record intent does not match its value type");
            }
        }
    }

    fn on_activated(&mut self, key: Key, value: &ElementInstanceRecord) {
        if let Some(scope_key) = value.flow_scope_key {
            if let Some(scope) = self.instances.get_mut(scope_key) {
                scope.active_children += 1;
            }
        }
        // only a new process instance is seeded by its activation variables
        if value.flow_scope_key.is_none() {
            self.variables
                .merge(value.process_instance_key, &value.variables);
        }
        *self
            .live_per_process_instance
            .entry(value.process_instance_key)
            .or_insert(0) += 1;

        self.instances.insert(ElementInstance::new(ElementContext {
            element_instance_key: key,
            process_instance_key: value.process_instance_key,
            flow_scope_key: value.flow_scope_key,
            process_id: value.process_id.clone(),
            version: value.version,
            element_id: value.element_id.clone(),
            element_type: value.element_type,
            state: LifecycleState::Activated,
            variables: Variables::new(),
        }));
    }

    fn remove_instance(&mut self, key: Key, value: &ElementInstanceRecord) {
        if self.instances.remove(key).is_none() {
            return;
        }
        if let Some(scope_key) = value.flow_scope_key {
            if let Some(scope) = self.instances.get_mut(scope_key) {
                scope.active_children = scope.active_children.saturating_sub(1);
            }
        }
        self.joins.clear_scope(key);

        if let Some(live) = self
            .live_per_process_instance
            .get_mut(&value.process_instance_key)
        {
            *live -= 1;
            if *live == 0 {
                self.live_per_process_instance
                    .remove(&value.process_instance_key);
            }
        }
    }

    /// Move a live instance to a transient lifecycle state
    pub(crate) fn set_lifecycle_state(&mut self, key: Key, state: LifecycleState) {
        if let Some(instance) = self.instances.get_mut(key) {
            instance.context.state = state;
        }
    }

    pub(crate) fn add_active_flows(&mut self, scope_key: Key, count: usize) {
        if let Some(scope) = self.instances.get_mut(scope_key) {
            scope.active_flows += count;
        }
    }

    pub(crate) fn consume_active_flows(&mut self, scope_key: Key, count: usize) {
        if let Some(scope) = self.instances.get_mut(scope_key) {
            scope.active_flows = scope.active_flows.saturating_sub(count);
        }
    }

    /// Whether any element instance of the process instance is still alive
    pub fn is_process_instance_live(&self, process_instance_key: Key) -> bool {
        self.live_per_process_instance
            .contains_key(&process_instance_key)
    }

    /// Drop variables and join tokens of a process instance with no live instance
    pub(crate) fn release_if_finished(&mut self, process_instance_key: Key) -> bool {
        if self.is_process_instance_live(process_instance_key) {
            return false;
        }
        self.variables.remove(process_instance_key);
        self.joins.clear_scope(process_instance_key);
        true
    }
}
