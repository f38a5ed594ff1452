use crate::common::ClinicalCode;
use crate::{required, required_text, resolved, resolved_opt, CanonicalResult};
use chrono::{DateTime, NaiveDate, Utc};
use medwire_types::Coded;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionClinicalStatus {
    Active,
    Recurrence,
    Relapse,
    Inactive,
    Remission,
    Resolved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCategory {
    ProblemListItem,
    EncounterDiagnosis,
}

/// A diagnosis or problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub id: String,
    pub subject_id: String,
    pub encounter_id: Option<String>,
    pub clinical_status: ConditionClinicalStatus,
    pub category: Option<ConditionCategory>,
    pub code: ClinicalCode,
    pub onset_at: Option<DateTime<Utc>>,
    pub recorded_on: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartialCondition {
    pub id: Option<String>,
    pub subject_id: Option<String>,
    pub encounter_id: Option<String>,
    pub clinical_status: Option<Coded<ConditionClinicalStatus>>,
    pub category: Option<Coded<ConditionCategory>>,
    pub code: Option<ClinicalCode>,
    pub onset_at: Option<DateTime<Utc>>,
    pub recorded_on: Option<NaiveDate>,
}

impl PartialCondition {
    pub fn into_record(self) -> CanonicalResult<ConditionRecord> {
        const RECORD: &str = "Condition";
        Ok(ConditionRecord {
            id: required_text(self.id, RECORD, "id")?,
            subject_id: required_text(self.subject_id, RECORD, "subject")?,
            encounter_id: self.encounter_id,
            clinical_status: resolved(self.clinical_status, RECORD, "clinicalStatus")?,
            category: resolved_opt(self.category, RECORD, "category")?,
            code: required(self.code, RECORD, "code")?,
            onset_at: self.onset_at,
            recorded_on: self.recorded_on,
        })
    }
}

impl From<&ConditionRecord> for PartialCondition {
    fn from(record: &ConditionRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            subject_id: Some(record.subject_id.clone()),
            encounter_id: record.encounter_id.clone(),
            clinical_status: Some(Coded::Known(record.clinical_status)),
            category: record.category.map(Coded::Known),
            code: Some(record.code.clone()),
            onset_at: record.onset_at,
            recorded_on: record.recorded_on,
        }
    }
}
