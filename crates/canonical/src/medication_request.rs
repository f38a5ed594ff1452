use crate::common::ClinicalCode;
use crate::{required, required_text, resolved, CanonicalResult};
use chrono::{DateTime, Utc};
use medwire_types::Coded;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationRequestStatus {
    Active,
    OnHold,
    Cancelled,
    Completed,
    EnteredInError,
    Stopped,
    Draft,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationRequestIntent {
    Proposal,
    Plan,
    Order,
    OriginalOrder,
    InstanceOrder,
}

/// A prescription or medication order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRequestRecord {
    pub id: String,
    pub subject_id: String,
    pub encounter_id: Option<String>,
    pub requester_id: Option<String>,
    pub status: MedicationRequestStatus,
    pub intent: MedicationRequestIntent,
    pub medication: ClinicalCode,
    pub authored_on: Option<DateTime<Utc>>,
    /// Free-text dosage instruction.
    pub dosage: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartialMedicationRequest {
    pub id: Option<String>,
    pub subject_id: Option<String>,
    pub encounter_id: Option<String>,
    pub requester_id: Option<String>,
    pub status: Option<Coded<MedicationRequestStatus>>,
    pub intent: Option<Coded<MedicationRequestIntent>>,
    pub medication: Option<ClinicalCode>,
    pub authored_on: Option<DateTime<Utc>>,
    pub dosage: Option<String>,
}

impl PartialMedicationRequest {
    pub fn into_record(self) -> CanonicalResult<MedicationRequestRecord> {
        const RECORD: &str = "MedicationRequest";
        Ok(MedicationRequestRecord {
            id: required_text(self.id, RECORD, "id")?,
            subject_id: required_text(self.subject_id, RECORD, "subject")?,
            encounter_id: self.encounter_id,
            requester_id: self.requester_id,
            status: resolved(self.status, RECORD, "status")?,
            intent: resolved(self.intent, RECORD, "intent")?,
            medication: required(self.medication, RECORD, "medicationCodeableConcept")?,
            authored_on: self.authored_on,
            dosage: self.dosage,
        })
    }
}

impl From<&MedicationRequestRecord> for PartialMedicationRequest {
    fn from(record: &MedicationRequestRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            subject_id: Some(record.subject_id.clone()),
            encounter_id: record.encounter_id.clone(),
            requester_id: record.requester_id.clone(),
            status: Some(Coded::Known(record.status)),
            intent: Some(Coded::Known(record.intent)),
            medication: Some(record.medication.clone()),
            authored_on: record.authored_on,
            dosage: record.dosage.clone(),
        }
    }
}
