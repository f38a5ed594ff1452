//! Building blocks shared by several canonical records.

use crate::claim::ClaimFilingIndicator;
use crate::{CanonicalError, CanonicalResult};
use chrono::{DateTime, NaiveDate, Utc};
use medwire_types::Coded;
use serde::{Deserialize, Serialize};

/// Administrative gender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

/// Postal address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub lines: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// A natural person as the administrative transactions see them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Gender,
    pub address: Option<Address>,
}

/// Insured member of a health plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub member_id: Option<String>,
    pub group_number: Option<String>,
    #[serde(default)]
    pub person: Person,
}

/// Patient's relationship to the subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[default]
    #[serde(rename = "self")]
    SelfInsured,
    Spouse,
    Child,
    Other,
}

/// Billing, rendering or requesting provider.
///
/// An individual provider has a `first_name`; an organisation carries only `name`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub npi: Option<String>,
    /// Organisation name, or the last name of an individual.
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<Address>,
}

impl Provider {
    pub fn is_individual(&self) -> bool {
        self.first_name.is_some()
    }
}

/// Health plan receiving a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub filing_indicator: Option<ClaimFilingIndicator>,
}

/// Clinical terminologies the codec knows the identity of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSystem {
    Icd10Cm,
    Snomed,
    Loinc,
    Cpt,
    Hcpcs,
    RxNorm,
    Ndc,
}

/// A code from a clinical terminology.
///
/// The system is [`Coded`] because inbound resources may use terminologies outside the table;
/// the code itself is carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClinicalCode {
    pub system: Coded<ClinicalSystem>,
    pub code: String,
    pub display: Option<String>,
}

impl ClinicalCode {
    pub fn new(system: ClinicalSystem, code: impl Into<String>) -> Self {
        Self {
            system: Coded::Known(system),
            code: code.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn is_system(&self, system: ClinicalSystem) -> bool {
        self.system.known() == Some(&system)
    }
}

/// A time interval with a known start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Period {
    /// Builds a period, rejecting an end before the start.
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> CanonicalResult<Self> {
        let period = Self { start, end };
        period.check()?;
        Ok(period)
    }

    pub fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn check(&self) -> CanonicalResult<()> {
        match self.end {
            Some(end) if end < self.start => Err(CanonicalError::InvalidPeriod {
                start: self.start,
                end,
            }),
            _ => Ok(()),
        }
    }

    /// Whole minutes between start and end, or `None` while the period is open.
    pub fn length_minutes(&self) -> Option<i64> {
        let end = self.end?;
        (end >= self.start).then(|| (end - self.start).num_minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn period_length_is_derived() {
        let period = Period::new(at(9, 0), Some(at(9, 45))).expect("ordered period");
        assert_eq!(period.length_minutes(), Some(45));
        assert_eq!(Period::open(at(9, 0)).length_minutes(), None);
    }

    #[test]
    fn period_rejects_end_before_start() {
        let err = Period::new(at(10, 0), Some(at(9, 0))).expect_err("end before start");
        assert!(matches!(err, CanonicalError::InvalidPeriod { .. }));
    }

    #[test]
    fn clinical_code_serialises_known_system_as_plain_value() {
        let code = ClinicalCode::new(ClinicalSystem::Loinc, "4548-4");
        let yaml = serde_yaml::to_string(&code).expect("serialise");
        assert!(yaml.contains("system: loinc"));
        let back: ClinicalCode = serde_yaml::from_str(&yaml).expect("deserialise");
        assert_eq!(back, code);
    }

    #[test]
    fn clinical_code_keeps_unknown_system() {
        let yaml = "system:\n  system: http://example.org/local\n  code: local\ncode: X1\n";
        let code: ClinicalCode = serde_yaml::from_str(yaml).expect("deserialise");
        assert!(!code.system.is_known());
        assert_eq!(code.code, "X1");
    }
}
