//! HL7 v2 user and HL7-defined tables.

use crate::{map, CodeTable, Domain};
use canonical::{ClinicalSystem, EncounterClass, Gender, Interpretation, ObservationStatus, OrderPriority};

/// Table 0396, coding system identifiers used in CWE.3.
pub const CODING_SYSTEM: CodeTable<ClinicalSystem> = CodeTable {
    domain: Domain::Hl7CodingSystem,
    system: "HL70396",
    entries: &[
        map(ClinicalSystem::Icd10Cm, "I10C", "ICD-10-CM"),
        map(ClinicalSystem::Snomed, "SCT", "SNOMED CT"),
        map(ClinicalSystem::Loinc, "LN", "LOINC"),
        map(ClinicalSystem::Cpt, "C4", "CPT-4"),
        map(ClinicalSystem::Hcpcs, "HCPCS", "HCPCS"),
        map(ClinicalSystem::RxNorm, "RXNORM", "RxNorm"),
        map(ClinicalSystem::Ndc, "NDC", "National Drug Codes"),
    ],
};

/// Table 0001, administrative sex.
pub const ADMINISTRATIVE_SEX: CodeTable<Gender> = CodeTable {
    domain: Domain::Hl7Gender,
    system: "HL70001",
    entries: &[
        map(Gender::Male, "M", "Male"),
        map(Gender::Female, "F", "Female"),
        map(Gender::Other, "O", "Other"),
        map(Gender::Unknown, "U", "Unknown"),
    ],
};

/// Table 0004, patient class (PV1-2).
pub const PATIENT_CLASS: CodeTable<EncounterClass> = CodeTable {
    domain: Domain::Hl7PatientClass,
    system: "HL70004",
    entries: &[
        map(EncounterClass::Emergency, "E", "Emergency"),
        map(EncounterClass::Inpatient, "I", "Inpatient"),
        map(EncounterClass::Ambulatory, "O", "Outpatient"),
        map(EncounterClass::PreAdmission, "P", "Preadmit"),
    ],
};

/// Table 0078, interpretation codes (OBX-8).
pub const ABNORMAL_FLAGS: CodeTable<Interpretation> = CodeTable {
    domain: Domain::Hl7AbnormalFlag,
    system: "HL70078",
    entries: &[
        map(Interpretation::Normal, "N", "Normal"),
        map(Interpretation::Low, "L", "Below low normal"),
        map(Interpretation::High, "H", "Above high normal"),
        map(Interpretation::CriticalLow, "LL", "Below lower panic limits"),
        map(Interpretation::CriticalHigh, "HH", "Above upper panic limits"),
        map(Interpretation::Abnormal, "A", "Abnormal"),
    ],
};

/// Table 0085, observation result status (OBX-11).
pub const RESULT_STATUS: CodeTable<ObservationStatus> = CodeTable {
    domain: Domain::Hl7ResultStatus,
    system: "HL70085",
    entries: &[
        map(ObservationStatus::Final, "F", "Final results"),
        map(ObservationStatus::Preliminary, "P", "Preliminary results"),
        map(ObservationStatus::Corrected, "C", "Record coming over is a correction"),
        map(ObservationStatus::Cancelled, "X", "Results cannot be obtained for this observation"),
        map(ObservationStatus::EnteredInError, "W", "Post original as wrong"),
        map(ObservationStatus::Registered, "R", "Results entered -- not verified"),
    ],
};

/// Table 0485, extended priority codes (TQ1-9).
pub const PRIORITY: CodeTable<OrderPriority> = CodeTable {
    domain: Domain::Hl7Priority,
    system: "HL70485",
    entries: &[
        map(OrderPriority::Stat, "S", "Stat"),
        map(OrderPriority::Asap, "A", "ASAP"),
        map(OrderPriority::Routine, "R", "Routine"),
    ],
};
