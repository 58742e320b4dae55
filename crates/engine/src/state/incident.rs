//! Open incidents

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::keys::Key;
use crate::failure::Failure;

/// An open incident, freezing one element instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub key: Key,
    pub element_instance_key: Key,
    pub process_instance_key: Key,
    pub element_id: String,
    pub failure: Failure,
}

/// Open incidents, indexed by incident key and by element instance
///
/// At most one incident is open per element instance.
#[derive(Debug, Clone, Default)]
pub struct IncidentState {
    incidents: BTreeMap<Key, Incident>,
    by_element_instance: HashMap<Key, Key>,
}

impl IncidentState {
    pub fn get(&self, incident_key: Key) -> Option<&Incident> {
        self.incidents.get(&incident_key)
    }

    /// The open incident of an element instance, if any
    pub fn open_for(&self, element_instance_key: Key) -> Option<&Incident> {
        self.by_element_instance
            .get(&element_instance_key)
            .and_then(|key| self.incidents.get(key))
    }

    pub fn is_frozen(&self, element_instance_key: Key) -> bool {
        self.by_element_instance.contains_key(&element_instance_key)
    }

    pub(crate) fn insert(&mut self, incident: Incident) {
        self.by_element_instance
            .insert(incident.element_instance_key, incident.key);
        self.incidents.insert(incident.key, incident);
    }

    pub(crate) fn remove(&mut self, incident_key: Key) -> Option<Incident> {
        let incident = self.incidents.remove(&incident_key)?;
        self.by_element_instance.remove(&incident.element_instance_key);
        Some(incident)
    }

    /// All open incidents, in key order
    pub fn iter(&self) -> impl Iterator<Item = &Incident> {
        self.incidents.values()
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}
