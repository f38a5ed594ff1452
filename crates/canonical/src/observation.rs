use crate::common::ClinicalCode;
use crate::{required, required_text, resolved, resolved_opt, CanonicalResult};
use chrono::{DateTime, Utc};
use medwire_types::Coded;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationStatus {
    Registered,
    Preliminary,
    Final,
    Amended,
    Corrected,
    Cancelled,
    EnteredInError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCategory {
    Laboratory,
    VitalSigns,
    SocialHistory,
    Imaging,
    Survey,
    Exam,
}

/// Result interpretation flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Normal,
    Low,
    High,
    CriticalLow,
    CriticalHigh,
    Abnormal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationValue {
    Quantity {
        value: Decimal,
        unit: Option<String>,
    },
    Text(String),
    Coded(ClinicalCode),
}

/// A measurement or finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub id: String,
    pub subject_id: String,
    pub encounter_id: Option<String>,
    pub status: ObservationStatus,
    pub category: Option<ObservationCategory>,
    pub code: ClinicalCode,
    pub value: Option<ObservationValue>,
    pub effective_at: Option<DateTime<Utc>>,
    pub interpretation: Option<Interpretation>,
    pub reference_range: Option<String>,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartialObservation {
    pub id: Option<String>,
    pub subject_id: Option<String>,
    pub encounter_id: Option<String>,
    pub status: Option<Coded<ObservationStatus>>,
    pub category: Option<Coded<ObservationCategory>>,
    pub code: Option<ClinicalCode>,
    pub value: Option<ObservationValue>,
    pub effective_at: Option<DateTime<Utc>>,
    pub interpretation: Option<Coded<Interpretation>>,
    pub reference_range: Option<String>,
    pub note: Option<String>,
}

impl PartialObservation {
    pub fn into_record(self) -> CanonicalResult<ObservationRecord> {
        const RECORD: &str = "Observation";
        Ok(ObservationRecord {
            id: required_text(self.id, RECORD, "id")?,
            subject_id: required_text(self.subject_id, RECORD, "subject")?,
            encounter_id: self.encounter_id,
            status: resolved(self.status, RECORD, "status")?,
            category: resolved_opt(self.category, RECORD, "category")?,
            code: required(self.code, RECORD, "code")?,
            value: self.value,
            effective_at: self.effective_at,
            interpretation: resolved_opt(self.interpretation, RECORD, "interpretation")?,
            reference_range: self.reference_range,
            note: self.note,
        })
    }
}

impl From<&ObservationRecord> for PartialObservation {
    fn from(record: &ObservationRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            subject_id: Some(record.subject_id.clone()),
            encounter_id: record.encounter_id.clone(),
            status: Some(Coded::Known(record.status)),
            category: record.category.map(Coded::Known),
            code: Some(record.code.clone()),
            value: record.value.clone(),
            effective_at: record.effective_at,
            interpretation: record.interpretation.map(Coded::Known),
            reference_range: record.reference_range.clone(),
            note: record.note.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClinicalSystem;
    use medwire_types::RawCode;

    #[test]
    fn quantity_value_keeps_decimal_scale() {
        let value = ObservationValue::Quantity {
            value: Decimal::new(720, 2),
            unit: Some("%".into()),
        };
        let yaml = serde_yaml::to_string(&value).expect("serialise");
        let back: ObservationValue = serde_yaml::from_str(&yaml).expect("deserialise");
        assert_eq!(back, value);
        assert!(yaml.contains("7.20"));
    }

    #[test]
    fn unknown_interpretation_blocks_completion() {
        let partial = PartialObservation {
            id: Some("o1".into()),
            subject_id: Some("p1".into()),
            status: Some(Coded::Known(ObservationStatus::Final)),
            code: Some(ClinicalCode::new(ClinicalSystem::Loinc, "2345-7")),
            interpretation: Some(Coded::Unknown(RawCode::new("HL70078", "ZZ"))),
            ..Default::default()
        };
        assert!(partial.into_record().is_err());
    }
}
