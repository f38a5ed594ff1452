use crate::common::{Address, Gender};
use crate::{required_text, resolved_opt, CanonicalResult};
use chrono::NaiveDate;
use medwire_types::Coded;
use serde::{Deserialize, Serialize};

/// A business identifier such as a medical record number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

/// Patient demographics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    pub family_name: Option<String>,
    #[serde(default)]
    pub given_names: Vec<String>,
    #[serde(default)]
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<Address>,
}

/// Inbound patient data before completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartialPatient {
    pub id: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub family_name: Option<String>,
    pub given_names: Vec<String>,
    pub gender: Option<Coded<Gender>>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<Address>,
}

impl PartialPatient {
    /// Completes the partial record.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteRecord` when the id is absent and `UnresolvedCode` when the gender was
    /// received but not recognised.
    pub fn into_record(self) -> CanonicalResult<PatientRecord> {
        const RECORD: &str = "Patient";
        Ok(PatientRecord {
            id: required_text(self.id, RECORD, "id")?,
            identifiers: self.identifiers,
            family_name: self.family_name,
            given_names: self.given_names,
            gender: resolved_opt(self.gender, RECORD, "gender")?.unwrap_or_default(),
            birth_date: self.birth_date,
            address: self.address,
        })
    }
}

impl From<&PatientRecord> for PartialPatient {
    fn from(record: &PatientRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            identifiers: record.identifiers.clone(),
            family_name: record.family_name.clone(),
            given_names: record.given_names.clone(),
            gender: Some(Coded::Known(record.gender)),
            birth_date: record.birth_date,
            address: record.address.clone(),
        }
    }
}
