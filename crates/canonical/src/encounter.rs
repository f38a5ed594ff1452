//! Encounters and their lifecycle.

use crate::common::{ClinicalCode, Period};
use crate::{required, required_text, resolved, CanonicalError, CanonicalResult};
use chrono::{DateTime, Utc};
use medwire_types::Coded;
use serde::{Deserialize, Serialize};

/// Encounter lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    Arrived,
    Triaged,
    InProgress,
    OnLeave,
    Finished,
    Cancelled,
    EnteredInError,
}

impl EncounterStatus {
    pub const ALL: [EncounterStatus; 8] = [
        EncounterStatus::Planned,
        EncounterStatus::Arrived,
        EncounterStatus::Triaged,
        EncounterStatus::InProgress,
        EncounterStatus::OnLeave,
        EncounterStatus::Finished,
        EncounterStatus::Cancelled,
        EncounterStatus::EnteredInError,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EncounterStatus::Finished | EncounterStatus::Cancelled | EncounterStatus::EnteredInError
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Triage is optional, leave returns to in-progress, and any state may be marked
    /// entered-in-error.
    pub fn can_transition_to(self, next: EncounterStatus) -> bool {
        use EncounterStatus::*;

        if self == next {
            return false;
        }
        if next == EnteredInError {
            return self != EnteredInError;
        }
        matches!(
            (self, next),
            (Planned, Arrived)
                | (Planned, InProgress)
                | (Planned, Cancelled)
                | (Arrived, Triaged)
                | (Arrived, InProgress)
                | (Arrived, Cancelled)
                | (Triaged, InProgress)
                | (Triaged, Cancelled)
                | (InProgress, OnLeave)
                | (InProgress, Finished)
                | (OnLeave, InProgress)
                | (OnLeave, Finished)
        )
    }
}

/// Classification of the encounter setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterClass {
    Ambulatory,
    Emergency,
    Field,
    HomeHealth,
    Inpatient,
    InpatientAcute,
    InpatientNonAcute,
    Observation,
    PreAdmission,
    ShortStay,
    Virtual,
}

/// A diagnosis attached to an encounter, ordered by rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisRef {
    /// Local id of the referenced Condition.
    pub condition_id: String,
    pub rank: u32,
}

/// Encounter between a patient and providers.
///
/// The encounter length is not stored; [`EncounterRecord::length_minutes`] derives it from the
/// period every time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub id: String,
    pub subject_id: String,
    pub status: EncounterStatus,
    pub class: EncounterClass,
    pub period: Period,
    pub practitioner_id: Option<String>,
    pub location_id: Option<String>,
    pub service_provider_id: Option<String>,
    #[serde(default)]
    pub reason_codes: Vec<ClinicalCode>,
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EncounterRecord {
    pub fn length_minutes(&self) -> Option<i64> {
        self.period.length_minutes()
    }

    /// Returns a copy of the encounter in status `next`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the lifecycle does not allow the move, or if the encounter
    /// has been soft-deleted.
    pub fn transition(&self, next: EncounterStatus) -> CanonicalResult<EncounterRecord> {
        if self.is_deleted() || !self.status.can_transition_to(next) {
            return Err(CanonicalError::InvalidTransition {
                record: "Encounter",
                from: format!("{:?}", self.status),
                to: format!("{next:?}"),
            });
        }
        Ok(EncounterRecord {
            status: next,
            ..self.clone()
        })
    }

    /// Returns a copy of the encounter marked as deleted at `at`.
    ///
    /// Deleting an already deleted encounter keeps the original timestamp.
    pub fn soft_delete(&self, at: DateTime<Utc>) -> EncounterRecord {
        EncounterRecord {
            deleted_at: self.deleted_at.or(Some(at)),
            ..self.clone()
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Diagnosis reference as received, possibly without a rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PartialDiagnosis {
    pub condition_id: String,
    pub rank: Option<u32>,
}

/// Inbound encounter data before completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartialEncounter {
    pub id: Option<String>,
    pub subject_id: Option<String>,
    pub status: Option<Coded<EncounterStatus>>,
    pub class: Option<Coded<EncounterClass>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub practitioner_id: Option<String>,
    pub location_id: Option<String>,
    pub service_provider_id: Option<String>,
    pub reason_codes: Vec<ClinicalCode>,
    pub diagnoses: Vec<PartialDiagnosis>,
}

impl PartialEncounter {
    /// Length derived from whatever period data was received.
    pub fn length_minutes(&self) -> Option<i64> {
        let (start, end) = (self.start?, self.end?);
        (end >= start).then(|| (end - start).num_minutes())
    }

    /// Completes the partial record.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteRecord` naming the first absent required field, `UnresolvedCode` for
    /// an unrecognised status or class, and `InvalidPeriod` when the end precedes the start.
    pub fn into_record(self) -> CanonicalResult<EncounterRecord> {
        const RECORD: &str = "Encounter";

        let start = required(self.start, RECORD, "period.start")?;
        let period = Period::new(start, self.end)?;

        let diagnoses = self
            .diagnoses
            .into_iter()
            .enumerate()
            .map(|(i, diagnosis)| {
                Ok(DiagnosisRef {
                    rank: required(diagnosis.rank, RECORD, &format!("diagnoses[{i}].rank"))?,
                    condition_id: diagnosis.condition_id,
                })
            })
            .collect::<CanonicalResult<Vec<_>>>()?;

        Ok(EncounterRecord {
            id: required_text(self.id, RECORD, "id")?,
            subject_id: required_text(self.subject_id, RECORD, "subject")?,
            status: resolved(self.status, RECORD, "status")?,
            class: resolved(self.class, RECORD, "class")?,
            period,
            practitioner_id: self.practitioner_id,
            location_id: self.location_id,
            service_provider_id: self.service_provider_id,
            reason_codes: self.reason_codes,
            diagnoses,
            deleted_at: None,
        })
    }
}

impl From<&EncounterRecord> for PartialEncounter {
    fn from(record: &EncounterRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            subject_id: Some(record.subject_id.clone()),
            status: Some(Coded::Known(record.status)),
            class: Some(Coded::Known(record.class)),
            start: Some(record.period.start),
            end: record.period.end,
            practitioner_id: record.practitioner_id.clone(),
            location_id: record.location_id.clone(),
            service_provider_id: record.service_provider_id.clone(),
            reason_codes: record.reason_codes.clone(),
            diagnoses: record
                .diagnoses
                .iter()
                .map(|d| PartialDiagnosis {
                    condition_id: d.condition_id.clone(),
                    rank: Some(d.rank),
                })
                .collect(),
        }
    }
}
