//! Incidents
//!
//! An incident freezes one element instance until it is resolved. Creating a
//! second incident for a frozen instance is a defect: the transitions refuse
//! to run on frozen instances, so there is no legal path to a second failure.

use tracing::{debug, info};

use super::behaviors::BpmnBehaviors;
use super::error::ProcessingError;
use crate::failure::Failure;
use crate::record::{IncidentRecord, Intent, Record};
use crate::state::{ElementContext, Incident, Key};

impl BpmnBehaviors<'_> {
    /// Write `INCIDENT_CREATED` for a failed instance, returning the incident key
    pub fn create_incident(
        &mut self,
        failure: Failure,
        context: &ElementContext,
    ) -> Result<Key, ProcessingError> {
        let key = context.element_instance_key;
        self.instance(key)?;
        if let Some(open) = self.state().incidents().open_for(key) {
            return Err(ProcessingError::DuplicateIncident {
                key,
                incident_key: open.key,
            });
        }

        let incident_key = self.state.next_key();
        info!(
            incident_key,
            element_instance_key = key,
            element_id = %context.element_id,
            error_type = %failure.error_type,
            "incident created"
        );
        self.write(Record::incident(
            incident_key,
            Intent::IncidentCreated,
            IncidentRecord::new(&failure, context),
        ));
        Ok(incident_key)
    }

    /// Resolve the open incident of an instance, if there is one
    pub fn resolve_incidents(&mut self, context: &ElementContext) {
        let open = self
            .state()
            .incidents()
            .open_for(context.element_instance_key)
            .cloned();
        match open {
            Some(incident) => self.resolve_incident(&incident),
            None => debug!(
                element_instance_key = context.element_instance_key,
                "no open incident to resolve"
            ),
        }
    }

    /// Write `INCIDENT_RESOLVED`, unfreezing the instance
    pub fn resolve_incident(&mut self, incident: &Incident) {
        info!(
            incident_key = incident.key,
            element_instance_key = incident.element_instance_key,
            "incident resolved"
        );
        self.write(Record::incident(
            incident.key,
            Intent::IncidentResolved,
            IncidentRecord::from(incident),
        ));
    }
}
