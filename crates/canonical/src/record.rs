use crate::condition::{ConditionRecord, PartialCondition};
use crate::encounter::{EncounterRecord, PartialEncounter};
use crate::medication_request::{MedicationRequestRecord, PartialMedicationRequest};
use crate::observation::{ObservationRecord, PartialObservation};
use crate::patient::{PartialPatient, PatientRecord};
use crate::CanonicalResult;
use serde::{Deserialize, Serialize};

/// Any clinical record with a FHIR representation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum CanonicalRecord {
    Patient(PatientRecord),
    Encounter(EncounterRecord),
    Observation(ObservationRecord),
    Condition(ConditionRecord),
    MedicationRequest(MedicationRequestRecord),
}

impl CanonicalRecord {
    pub fn resource_type(&self) -> &'static str {
        match self {
            CanonicalRecord::Patient(_) => "Patient",
            CanonicalRecord::Encounter(_) => "Encounter",
            CanonicalRecord::Observation(_) => "Observation",
            CanonicalRecord::Condition(_) => "Condition",
            CanonicalRecord::MedicationRequest(_) => "MedicationRequest",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CanonicalRecord::Patient(r) => &r.id,
            CanonicalRecord::Encounter(r) => &r.id,
            CanonicalRecord::Observation(r) => &r.id,
            CanonicalRecord::Condition(r) => &r.id,
            CanonicalRecord::MedicationRequest(r) => &r.id,
        }
    }
}

/// Inbound clinical data before completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "resourceType")]
pub enum PartialRecord {
    Patient(PartialPatient),
    Encounter(PartialEncounter),
    Observation(PartialObservation),
    Condition(PartialCondition),
    MedicationRequest(PartialMedicationRequest),
    /// A resource type the codec does not transform, kept verbatim.
    Unsupported {
        resource_type: String,
        document: String,
    },
}

impl PartialRecord {
    /// Completes the record.
    ///
    /// # Errors
    ///
    /// Returns the completion error of the underlying partial record. An unsupported resource
    /// fails with `IncompleteRecord` naming `resourceType`.
    pub fn into_record(self) -> CanonicalResult<CanonicalRecord> {
        Ok(match self {
            PartialRecord::Patient(p) => CanonicalRecord::Patient(p.into_record()?),
            PartialRecord::Encounter(p) => CanonicalRecord::Encounter(p.into_record()?),
            PartialRecord::Observation(p) => CanonicalRecord::Observation(p.into_record()?),
            PartialRecord::Condition(p) => CanonicalRecord::Condition(p.into_record()?),
            PartialRecord::MedicationRequest(p) => {
                CanonicalRecord::MedicationRequest(p.into_record()?)
            }
            PartialRecord::Unsupported { resource_type, .. } => {
                return Err(crate::CanonicalError::IncompleteRecord {
                    record: "Resource",
                    field: format!("resourceType ({resource_type} is not supported)"),
                })
            }
        })
    }
}

impl From<&CanonicalRecord> for PartialRecord {
    fn from(record: &CanonicalRecord) -> Self {
        match record {
            CanonicalRecord::Patient(r) => PartialRecord::Patient(r.into()),
            CanonicalRecord::Encounter(r) => PartialRecord::Encounter(r.into()),
            CanonicalRecord::Observation(r) => PartialRecord::Observation(r.into()),
            CanonicalRecord::Condition(r) => PartialRecord::Condition(r.into()),
            CanonicalRecord::MedicationRequest(r) => PartialRecord::MedicationRequest(r.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_files_are_tagged_by_resource_type() {
        let yaml = r#"
resourceType: Encounter
id: enc-1
subject_id: pat-1
status: in-progress
class: ambulatory
period:
  start: 2024-01-15T09:00:00Z
  end: null
practitioner_id: null
location_id: null
service_provider_id: null
"#;
        let record: CanonicalRecord = serde_yaml::from_str(yaml).expect("parse record file");
        assert_eq!(record.resource_type(), "Encounter");
        assert_eq!(record.id(), "enc-1");

        let CanonicalRecord::Encounter(encounter) = record else {
            panic!("expected encounter");
        };
        assert_eq!(encounter.length_minutes(), None);
        assert!(encounter.reason_codes.is_empty());
    }

    #[test]
    fn unsupported_resource_does_not_complete() {
        let partial = PartialRecord::Unsupported {
            resource_type: "Procedure".into(),
            document: "{}".into(),
        };
        assert!(partial.into_record().is_err());
    }
}
