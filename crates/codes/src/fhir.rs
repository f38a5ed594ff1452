//! FHIR R4 value sets and terminology URIs.

use crate::{map, CodeTable, Domain};
use canonical::{
    ClinicalSystem, ConditionCategory, ConditionClinicalStatus, EncounterClass, EncounterStatus,
    Gender, Interpretation, MedicationRequestIntent, MedicationRequestStatus, ObservationCategory,
    ObservationStatus,
};

pub const ENCOUNTER_STATUS: CodeTable<EncounterStatus> = CodeTable {
    domain: Domain::EncounterStatus,
    system: "http://hl7.org/fhir/encounter-status",
    entries: &[
        map(EncounterStatus::Planned, "planned", "Planned"),
        map(EncounterStatus::Arrived, "arrived", "Arrived"),
        map(EncounterStatus::Triaged, "triaged", "Triaged"),
        map(EncounterStatus::InProgress, "in-progress", "In Progress"),
        map(EncounterStatus::OnLeave, "onleave", "On Leave"),
        map(EncounterStatus::Finished, "finished", "Finished"),
        map(EncounterStatus::Cancelled, "cancelled", "Cancelled"),
        map(EncounterStatus::EnteredInError, "entered-in-error", "Entered in Error"),
    ],
};

pub const ENCOUNTER_CLASS: CodeTable<EncounterClass> = CodeTable {
    domain: Domain::EncounterClass,
    system: "http://terminology.hl7.org/CodeSystem/v3-ActCode",
    entries: &[
        map(EncounterClass::Ambulatory, "AMB", "ambulatory"),
        map(EncounterClass::Emergency, "EMER", "emergency"),
        map(EncounterClass::Field, "FLD", "field"),
        map(EncounterClass::HomeHealth, "HH", "home health"),
        map(EncounterClass::Inpatient, "IMP", "inpatient encounter"),
        map(EncounterClass::InpatientAcute, "ACUTE", "inpatient acute"),
        map(EncounterClass::InpatientNonAcute, "NONAC", "inpatient non-acute"),
        map(EncounterClass::Observation, "OBSENC", "observation encounter"),
        map(EncounterClass::PreAdmission, "PRENC", "pre-admission"),
        map(EncounterClass::ShortStay, "SS", "short stay"),
        map(EncounterClass::Virtual, "VR", "virtual"),
    ],
};

pub const ADMINISTRATIVE_GENDER: CodeTable<Gender> = CodeTable {
    domain: Domain::AdministrativeGender,
    system: "http://hl7.org/fhir/administrative-gender",
    entries: &[
        map(Gender::Male, "male", "Male"),
        map(Gender::Female, "female", "Female"),
        map(Gender::Other, "other", "Other"),
        map(Gender::Unknown, "unknown", "Unknown"),
    ],
};

pub const CONDITION_CLINICAL: CodeTable<ConditionClinicalStatus> = CodeTable {
    domain: Domain::ConditionClinicalStatus,
    system: "http://terminology.hl7.org/CodeSystem/condition-clinical",
    entries: &[
        map(ConditionClinicalStatus::Active, "active", "Active"),
        map(ConditionClinicalStatus::Recurrence, "recurrence", "Recurrence"),
        map(ConditionClinicalStatus::Relapse, "relapse", "Relapse"),
        map(ConditionClinicalStatus::Inactive, "inactive", "Inactive"),
        map(ConditionClinicalStatus::Remission, "remission", "Remission"),
        map(ConditionClinicalStatus::Resolved, "resolved", "Resolved"),
    ],
};

pub const CONDITION_CATEGORY: CodeTable<ConditionCategory> = CodeTable {
    domain: Domain::ConditionCategory,
    system: "http://terminology.hl7.org/CodeSystem/condition-category",
    entries: &[
        map(
            ConditionCategory::ProblemListItem,
            "problem-list-item",
            "Problem List Item",
        ),
        map(
            ConditionCategory::EncounterDiagnosis,
            "encounter-diagnosis",
            "Encounter Diagnosis",
        ),
    ],
};

pub const OBSERVATION_STATUS: CodeTable<ObservationStatus> = CodeTable {
    domain: Domain::ObservationStatus,
    system: "http://hl7.org/fhir/observation-status",
    entries: &[
        map(ObservationStatus::Registered, "registered", "Registered"),
        map(ObservationStatus::Preliminary, "preliminary", "Preliminary"),
        map(ObservationStatus::Final, "final", "Final"),
        map(ObservationStatus::Amended, "amended", "Amended"),
        map(ObservationStatus::Corrected, "corrected", "Corrected"),
        map(ObservationStatus::Cancelled, "cancelled", "Cancelled"),
        map(ObservationStatus::EnteredInError, "entered-in-error", "Entered in Error"),
    ],
};

pub const OBSERVATION_CATEGORY: CodeTable<ObservationCategory> = CodeTable {
    domain: Domain::ObservationCategory,
    system: "http://terminology.hl7.org/CodeSystem/observation-category",
    entries: &[
        map(ObservationCategory::Laboratory, "laboratory", "Laboratory"),
        map(ObservationCategory::VitalSigns, "vital-signs", "Vital Signs"),
        map(ObservationCategory::SocialHistory, "social-history", "Social History"),
        map(ObservationCategory::Imaging, "imaging", "Imaging"),
        map(ObservationCategory::Survey, "survey", "Survey"),
        map(ObservationCategory::Exam, "exam", "Exam"),
    ],
};

pub const OBSERVATION_INTERPRETATION: CodeTable<Interpretation> = CodeTable {
    domain: Domain::ObservationInterpretation,
    system: "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation",
    entries: &[
        map(Interpretation::Normal, "N", "Normal"),
        map(Interpretation::Low, "L", "Low"),
        map(Interpretation::High, "H", "High"),
        map(Interpretation::CriticalLow, "LL", "Critical low"),
        map(Interpretation::CriticalHigh, "HH", "Critical high"),
        map(Interpretation::Abnormal, "A", "Abnormal"),
    ],
};

pub const MEDICATION_REQUEST_STATUS: CodeTable<MedicationRequestStatus> = CodeTable {
    domain: Domain::MedicationRequestStatus,
    system: "http://hl7.org/fhir/CodeSystem/medicationrequest-status",
    entries: &[
        map(MedicationRequestStatus::Active, "active", "Active"),
        map(MedicationRequestStatus::OnHold, "on-hold", "On Hold"),
        map(MedicationRequestStatus::Cancelled, "cancelled", "Cancelled"),
        map(MedicationRequestStatus::Completed, "completed", "Completed"),
        map(
            MedicationRequestStatus::EnteredInError,
            "entered-in-error",
            "Entered in Error",
        ),
        map(MedicationRequestStatus::Stopped, "stopped", "Stopped"),
        map(MedicationRequestStatus::Draft, "draft", "Draft"),
    ],
};

pub const MEDICATION_REQUEST_INTENT: CodeTable<MedicationRequestIntent> = CodeTable {
    domain: Domain::MedicationRequestIntent,
    system: "http://hl7.org/fhir/CodeSystem/medicationrequest-intent",
    entries: &[
        map(MedicationRequestIntent::Proposal, "proposal", "Proposal"),
        map(MedicationRequestIntent::Plan, "plan", "Plan"),
        map(MedicationRequestIntent::Order, "order", "Order"),
        map(MedicationRequestIntent::OriginalOrder, "original-order", "Original Order"),
        map(MedicationRequestIntent::InstanceOrder, "instance-order", "Instance Order"),
    ],
};

/// Canonical URIs of the clinical terminologies, used as `Coding.system`.
pub const CLINICAL_SYSTEM: CodeTable<ClinicalSystem> = CodeTable {
    domain: Domain::ClinicalSystemUri,
    system: "urn:ietf:rfc:3986",
    entries: &[
        map(ClinicalSystem::Icd10Cm, "http://hl7.org/fhir/sid/icd-10-cm", "ICD-10-CM"),
        map(ClinicalSystem::Snomed, "http://snomed.info/sct", "SNOMED CT"),
        map(ClinicalSystem::Loinc, "http://loinc.org", "LOINC"),
        map(ClinicalSystem::Cpt, "http://www.ama-assn.org/go/cpt", "CPT"),
        map(
            ClinicalSystem::Hcpcs,
            "https://www.cms.gov/Medicare/Coding/HCPCSReleaseCodeSets",
            "HCPCS",
        ),
        map(
            ClinicalSystem::RxNorm,
            "http://www.nlm.nih.gov/research/umls/rxnorm",
            "RxNorm",
        ),
        map(ClinicalSystem::Ndc, "http://hl7.org/fhir/sid/ndc", "NDC"),
    ],
};

