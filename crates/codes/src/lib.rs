//! Code system tables.
//!
//! Every vocabulary the codec emits or reads is mapped here and nowhere else. A table is a static
//! list of `internal value → (system, code, display)` entries; the inbound direction is derived
//! from the same entries, so the two directions cannot drift apart.
//!
//! - Outbound: [`CodeTable::to_external`] fails with [`UnmappedCodeError`] rather than falling back
//!   to a default code.
//! - Inbound: [`CodeTable::to_internal`] and [`CodeTable::resolve`] return
//!   [`Coded::Unknown`] carrying the raw code when nothing matches.
//!
//! [`CodeSystems`] groups the tables. [`CodeSystems::standard`] is the process-wide registry;
//! a caller that needs a narrower vocabulary can build its own and pass it by reference.

pub mod fhir;
pub mod hl7;
pub mod x12;

use canonical::{
    AdjustmentGroup, AdjustmentReason, BenefitInformation, ClaimFilingIndicator, ClaimFrequency,
    ClaimPaymentStatus, ClaimStatusCategory, ClaimType, ClinicalSystem,
    ConditionCategory, ConditionClinicalStatus, CoverageLevel, EncounterClass, EncounterStatus,
    Gender, Interpretation, MedicationRequestIntent, MedicationRequestStatus, ObservationCategory,
    ObservationStatus, OrderPriority, PaymentMethod, PlaceOfService, Relationship, ServiceType,
    TimePeriod,
};
use medwire_types::{Coded, RawCode, Warning};
use std::fmt;

/// Vocabulary domains, one per table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    EncounterStatus,
    EncounterClass,
    AdministrativeGender,
    ConditionClinicalStatus,
    ConditionCategory,
    ObservationStatus,
    ObservationCategory,
    ObservationInterpretation,
    MedicationRequestStatus,
    MedicationRequestIntent,
    ClinicalSystemUri,
    Hl7CodingSystem,
    PlaceOfService,
    ClaimFrequency,
    FacilityCodeQualifier,
    ImplementationGuide,
    IndividualRelationship,
    ClaimFilingIndicator,
    X12Gender,
    ServiceType,
    BenefitInformation,
    CoverageLevel,
    TimePeriod,
    ClaimStatusCategory,
    ClaimPaymentStatus,
    AdjustmentGroup,
    AdjustmentReason,
    PaymentMethod,
    Hl7Gender,
    Hl7PatientClass,
    Hl7AbnormalFlag,
    Hl7ResultStatus,
    Hl7Priority,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::EncounterStatus => "encounter-status",
            Domain::EncounterClass => "encounter-class",
            Domain::AdministrativeGender => "administrative-gender",
            Domain::ConditionClinicalStatus => "condition-clinical",
            Domain::ConditionCategory => "condition-category",
            Domain::ObservationStatus => "observation-status",
            Domain::ObservationCategory => "observation-category",
            Domain::ObservationInterpretation => "observation-interpretation",
            Domain::MedicationRequestStatus => "medicationrequest-status",
            Domain::MedicationRequestIntent => "medicationrequest-intent",
            Domain::ClinicalSystemUri => "clinical-system-uri",
            Domain::Hl7CodingSystem => "hl7-coding-system",
            Domain::PlaceOfService => "place-of-service",
            Domain::ClaimFrequency => "claim-frequency",
            Domain::FacilityCodeQualifier => "facility-code-qualifier",
            Domain::ImplementationGuide => "implementation-guide",
            Domain::IndividualRelationship => "individual-relationship",
            Domain::ClaimFilingIndicator => "claim-filing-indicator",
            Domain::X12Gender => "x12-gender",
            Domain::ServiceType => "service-type",
            Domain::BenefitInformation => "benefit-information",
            Domain::CoverageLevel => "coverage-level",
            Domain::TimePeriod => "time-period",
            Domain::ClaimStatusCategory => "claim-status-category",
            Domain::ClaimPaymentStatus => "claim-payment-status",
            Domain::AdjustmentGroup => "adjustment-group",
            Domain::AdjustmentReason => "adjustment-reason",
            Domain::PaymentMethod => "payment-method",
            Domain::Hl7Gender => "hl7-administrative-sex",
            Domain::Hl7PatientClass => "hl7-patient-class",
            Domain::Hl7AbnormalFlag => "hl7-abnormal-flag",
            Domain::Hl7ResultStatus => "hl7-result-status",
            Domain::Hl7Priority => "hl7-priority",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An internal value with no entry in the table for the target format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {domain} code for internal value {value}")]
pub struct UnmappedCodeError {
    pub domain: Domain,
    pub value: String,
}

/// One table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeMapping<I: 'static> {
    pub internal: I,
    pub code: &'static str,
    pub display: &'static str,
}

/// Shorthand used by the table modules.
pub(crate) const fn map<I>(internal: I, code: &'static str, display: &'static str) -> CodeMapping<I> {
    CodeMapping {
        internal,
        code,
        display,
    }
}

/// An outbound code resolved from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalCode {
    pub system: &'static str,
    pub code: &'static str,
    pub display: &'static str,
}

/// A static, immutable mapping between an internal enum and one external code system.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable<I: 'static> {
    pub domain: Domain,
    /// FHIR system URI, X12 element reference or HL7 table id.
    pub system: &'static str,
    pub entries: &'static [CodeMapping<I>],
}

impl<I> CodeTable<I>
where
    I: Copy + PartialEq + fmt::Debug + 'static,
{
    /// Maps an internal value to its external code.
    ///
    /// # Errors
    ///
    /// Returns [`UnmappedCodeError`] if the table has no entry for `internal`.
    pub fn to_external(&self, internal: I) -> Result<ExternalCode, UnmappedCodeError> {
        self.entries
            .iter()
            .find(|entry| entry.internal == internal)
            .map(|entry| ExternalCode {
                system: self.system,
                code: entry.code,
                display: entry.display,
            })
            .ok_or_else(|| UnmappedCodeError {
                domain: self.domain,
                value: format!("{internal:?}"),
            })
    }

    /// Shorthand for the code of [`CodeTable::to_external`].
    pub fn code(&self, internal: I) -> Result<&'static str, UnmappedCodeError> {
        self.to_external(internal).map(|external| external.code)
    }

    pub fn contains(&self, internal: I) -> bool {
        self.entries.iter().any(|entry| entry.internal == internal)
    }

    /// Finds the internal value for a code of this table's own system.
    pub fn lookup(&self, code: &str) -> Option<I> {
        let code = code.trim();
        self.entries
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.internal)
    }

    /// Resolves a code received under this table's system.
    pub fn resolve(&self, code: &str) -> Coded<I> {
        match self.lookup(code) {
            Some(internal) => Coded::Known(internal),
            None => Coded::Unknown(RawCode::new(self.system, code.trim())),
        }
    }

    /// Resolves a `(system, code)` pair. A code from another system is never matched.
    pub fn to_internal(&self, system: &str, code: &str) -> Coded<I> {
        if system.trim() == self.system {
            self.resolve(code)
        } else {
            Coded::Unknown(RawCode::new(system.trim(), code.trim()))
        }
    }

    /// Like [`CodeTable::resolve`], recording an `UnmappedExternalCode` warning on a miss.
    pub fn resolve_or_warn(&self, code: &str, warnings: &mut Vec<Warning>) -> Coded<I> {
        let coded = self.resolve(code);
        self.warn_unmapped(&coded, warnings);
        coded
    }

    /// Like [`CodeTable::to_internal`], recording an `UnmappedExternalCode` warning on a miss.
    pub fn to_internal_or_warn(
        &self,
        system: &str,
        code: &str,
        warnings: &mut Vec<Warning>,
    ) -> Coded<I> {
        let coded = self.to_internal(system, code);
        self.warn_unmapped(&coded, warnings);
        coded
    }

    fn warn_unmapped(&self, coded: &Coded<I>, warnings: &mut Vec<Warning>) {
        if let Coded::Unknown(raw) = coded {
            tracing::warn!(
                domain = %self.domain,
                system = %raw.system,
                code = %raw.code,
                "unmapped external code"
            );
            warnings.push(Warning::UnmappedExternalCode {
                domain: self.domain.to_string(),
                system: raw.system.clone(),
                code: raw.code.clone(),
            });
        }
    }

    /// Display text of an internal value, if mapped.
    pub fn display(&self, internal: I) -> Option<&'static str> {
        self.to_external(internal).ok().map(|external| external.display)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Every code table the codec uses.
#[derive(Debug, Clone, Copy)]
pub struct CodeSystems {
    // FHIR
    pub encounter_status: CodeTable<EncounterStatus>,
    pub encounter_class: CodeTable<EncounterClass>,
    pub administrative_gender: CodeTable<Gender>,
    pub condition_clinical: CodeTable<ConditionClinicalStatus>,
    pub condition_category: CodeTable<ConditionCategory>,
    pub observation_status: CodeTable<ObservationStatus>,
    pub observation_category: CodeTable<ObservationCategory>,
    pub observation_interpretation: CodeTable<Interpretation>,
    pub medication_request_status: CodeTable<MedicationRequestStatus>,
    pub medication_request_intent: CodeTable<MedicationRequestIntent>,
    pub clinical_system: CodeTable<ClinicalSystem>,

    // X12
    pub place_of_service: CodeTable<PlaceOfService>,
    pub claim_frequency: CodeTable<ClaimFrequency>,
    pub facility_code_qualifier: CodeTable<ClaimType>,
    pub implementation_guide: CodeTable<ClaimType>,
    pub relationship: CodeTable<Relationship>,
    pub claim_filing_indicator: CodeTable<ClaimFilingIndicator>,
    pub x12_gender: CodeTable<Gender>,
    pub service_type: CodeTable<ServiceType>,
    pub benefit_information: CodeTable<BenefitInformation>,
    pub coverage_level: CodeTable<CoverageLevel>,
    pub time_period: CodeTable<TimePeriod>,
    pub claim_status_category: CodeTable<ClaimStatusCategory>,
    pub claim_payment_status: CodeTable<ClaimPaymentStatus>,
    pub adjustment_group: CodeTable<AdjustmentGroup>,
    pub adjustment_reason: CodeTable<AdjustmentReason>,
    pub payment_method: CodeTable<PaymentMethod>,

    // HL7 v2
    pub hl7_coding_system: CodeTable<ClinicalSystem>,
    pub hl7_gender: CodeTable<Gender>,
    pub hl7_patient_class: CodeTable<EncounterClass>,
    pub hl7_abnormal_flag: CodeTable<Interpretation>,
    pub hl7_result_status: CodeTable<ObservationStatus>,
    pub hl7_priority: CodeTable<OrderPriority>,
}

static STANDARD: CodeSystems = CodeSystems {
    encounter_status: fhir::ENCOUNTER_STATUS,
    encounter_class: fhir::ENCOUNTER_CLASS,
    administrative_gender: fhir::ADMINISTRATIVE_GENDER,
    condition_clinical: fhir::CONDITION_CLINICAL,
    condition_category: fhir::CONDITION_CATEGORY,
    observation_status: fhir::OBSERVATION_STATUS,
    observation_category: fhir::OBSERVATION_CATEGORY,
    observation_interpretation: fhir::OBSERVATION_INTERPRETATION,
    medication_request_status: fhir::MEDICATION_REQUEST_STATUS,
    medication_request_intent: fhir::MEDICATION_REQUEST_INTENT,
    clinical_system: fhir::CLINICAL_SYSTEM,

    place_of_service: x12::PLACE_OF_SERVICE,
    claim_frequency: x12::CLAIM_FREQUENCY,
    facility_code_qualifier: x12::FACILITY_CODE_QUALIFIER,
    implementation_guide: x12::IMPLEMENTATION_GUIDE,
    relationship: x12::RELATIONSHIP,
    claim_filing_indicator: x12::CLAIM_FILING_INDICATOR,
    x12_gender: x12::GENDER,
    service_type: x12::SERVICE_TYPE,
    benefit_information: x12::BENEFIT_INFORMATION,
    coverage_level: x12::COVERAGE_LEVEL,
    time_period: x12::TIME_PERIOD,
    claim_status_category: x12::CLAIM_STATUS_CATEGORY,
    claim_payment_status: x12::CLAIM_PAYMENT_STATUS,
    adjustment_group: x12::ADJUSTMENT_GROUP,
    adjustment_reason: x12::ADJUSTMENT_REASON,
    payment_method: x12::PAYMENT_METHOD,

    hl7_coding_system: hl7::CODING_SYSTEM,
    hl7_gender: hl7::ADMINISTRATIVE_SEX,
    hl7_patient_class: hl7::PATIENT_CLASS,
    hl7_abnormal_flag: hl7::ABNORMAL_FLAGS,
    hl7_result_status: hl7::RESULT_STATUS,
    hl7_priority: hl7::PRIORITY,
};

impl CodeSystems {
    /// The process-wide immutable registry.
    pub fn standard() -> &'static CodeSystems {
        &STANDARD
    }
}

impl Default for CodeSystems {
    fn default() -> Self {
        STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::hash::Hash;

    fn assert_unique<I: Copy + PartialEq + Eq + Hash + fmt::Debug>(table: &CodeTable<I>) {
        let mut codes = HashSet::new();
        let mut internals = HashSet::new();
        for entry in table.entries {
            assert!(
                codes.insert(entry.code),
                "{} repeats code {}",
                table.domain,
                entry.code
            );
            assert!(
                internals.insert(entry.internal),
                "{} repeats internal value {:?}",
                table.domain,
                entry.internal
            );
            assert!(!entry.code.is_empty(), "{} has an empty code", table.domain);
        }
    }

    #[test]
    fn every_table_is_free_of_duplicates() {
        let c = CodeSystems::standard();
        assert_unique(&c.encounter_status);
        assert_unique(&c.encounter_class);
        assert_unique(&c.administrative_gender);
        assert_unique(&c.condition_clinical);
        assert_unique(&c.condition_category);
        assert_unique(&c.observation_status);
        assert_unique(&c.observation_category);
        assert_unique(&c.observation_interpretation);
        assert_unique(&c.medication_request_status);
        assert_unique(&c.medication_request_intent);
        assert_unique(&c.clinical_system);
        assert_unique(&c.place_of_service);
        assert_unique(&c.claim_frequency);
        assert_unique(&c.facility_code_qualifier);
        assert_unique(&c.implementation_guide);
        assert_unique(&c.relationship);
        assert_unique(&c.claim_filing_indicator);
        assert_unique(&c.x12_gender);
        assert_unique(&c.service_type);
        assert_unique(&c.benefit_information);
        assert_unique(&c.coverage_level);
        assert_unique(&c.time_period);
        assert_unique(&c.claim_status_category);
        assert_unique(&c.claim_payment_status);
        assert_unique(&c.adjustment_group);
        assert_unique(&c.adjustment_reason);
        assert_unique(&c.payment_method);
        assert_unique(&c.hl7_coding_system);
        assert_unique(&c.hl7_gender);
        assert_unique(&c.hl7_patient_class);
        assert_unique(&c.hl7_abnormal_flag);
        assert_unique(&c.hl7_result_status);
        assert_unique(&c.hl7_priority);
    }

    #[test]
    fn every_encounter_status_has_a_fhir_code() {
        let table = CodeSystems::standard().encounter_status;
        for status in EncounterStatus::ALL {
            let external = table.to_external(status).expect("mapped status");
            assert_eq!(table.lookup(external.code), Some(status));
        }
        assert_eq!(
            table.code(EncounterStatus::OnLeave).expect("mapped"),
            "onleave"
        );
    }

    #[test]
    fn unmapped_internal_value_is_an_error() {
        let err = CodeSystems::standard()
            .x12_gender
            .to_external(Gender::Other)
            .expect_err("X12 has no 'other' gender");
        assert_eq!(err.domain, Domain::X12Gender);
        assert_eq!(err.value, "Other");
    }

    #[test]
    fn unknown_inbound_code_keeps_raw_value_and_warns() {
        let mut warnings = Vec::new();
        let coded = CodeSystems::standard()
            .adjustment_reason
            .resolve_or_warn(" 999 ", &mut warnings);
        assert_eq!(coded, Coded::Unknown(RawCode::new("CARC", "999")));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            Warning::UnmappedExternalCode { domain, code, .. }
                if domain == "adjustment-reason" && code == "999"
        ));
    }

    #[test]
    fn to_internal_requires_matching_system() {
        let table = CodeSystems::standard().encounter_class;
        assert_eq!(
            table.to_internal("http://terminology.hl7.org/CodeSystem/v3-ActCode", "AMB"),
            Coded::Known(EncounterClass::Ambulatory)
        );
        assert!(!table.to_internal("http://example.org/classes", "AMB").is_known());
    }
}
