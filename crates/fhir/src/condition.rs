//! FHIR Condition wire model and translation helpers.

use crate::common::{
    check_resource_type, clinical_code, coded_concept, concept, format_date, format_instant,
    from_value_at_path, meta_for, optional_reference, parse_date, parse_instant, parse_json,
    reference, reference_id, report_extra, resolve_concept, text, to_json_value,
    CodeableConceptWire, Extra, MetaWire, ReferenceWire,
};
use crate::FhirResult;
use canonical::{ConditionCategory, ConditionRecord, PartialCondition};
use codes::CodeSystems;
use medwire_types::Decoded;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Condition resource operations.
pub struct Condition;

impl Condition {
    pub const RESOURCE_TYPE: &'static str = "Condition";
    pub const PROFILE_PROBLEM: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-condition-problems-health-concerns";
    pub const PROFILE_ENCOUNTER_DIAGNOSIS: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-condition-encounter-diagnosis";

    pub fn profile_for(category: Option<ConditionCategory>) -> &'static str {
        match category {
            Some(ConditionCategory::EncounterDiagnosis) => Self::PROFILE_ENCOUNTER_DIAGNOSIS,
            _ => Self::PROFILE_PROBLEM,
        }
    }

    pub fn to_value(record: &ConditionRecord, codes: &CodeSystems) -> FhirResult<Value> {
        let wire = domain_to_wire(record, codes)?;
        to_json_value(Self::RESOURCE_TYPE, &wire)
    }

    pub fn render(record: &ConditionRecord, codes: &CodeSystems) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_value(record, codes)?)?)
    }

    pub fn from_value(value: Value, codes: &CodeSystems) -> FhirResult<Decoded<PartialCondition>> {
        let wire: ConditionWire = from_value_at_path(Self::RESOURCE_TYPE, value)?;
        check_resource_type(Self::RESOURCE_TYPE, &wire.resource_type)?;
        Ok(wire_to_domain(wire, codes))
    }

    pub fn parse(json_text: &str, codes: &CodeSystems) -> FhirResult<Decoded<PartialCondition>> {
        Self::from_value(parse_json(json_text)?, codes)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct ConditionWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaWire>,

    #[serde(rename = "clinicalStatus", skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<CodeableConceptWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConceptWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConceptWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<ReferenceWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<ReferenceWire>,

    #[serde(rename = "onsetDateTime", skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,

    #[serde(rename = "recordedDate", skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

fn domain_to_wire(record: &ConditionRecord, codes: &CodeSystems) -> FhirResult<ConditionWire> {
    let category = record
        .category
        .map(|category| coded_concept(&codes.condition_category, category))
        .transpose()?;

    Ok(ConditionWire {
        resource_type: Condition::RESOURCE_TYPE.to_string(),
        id: Some(record.id.clone()),
        meta: Some(meta_for(Condition::profile_for(record.category))),
        clinical_status: Some(coded_concept(
            &codes.condition_clinical,
            record.clinical_status,
        )?),
        category: category.into_iter().collect(),
        code: Some(concept(&record.code, codes)?),
        subject: Some(reference("Patient", &record.subject_id)),
        encounter: optional_reference("Encounter", record.encounter_id.as_deref()),
        onset_date_time: record.onset_at.as_ref().map(format_instant),
        recorded_date: record.recorded_on.as_ref().map(format_date),
        extra: Extra::new(),
    })
}

fn wire_to_domain(wire: ConditionWire, codes: &CodeSystems) -> Decoded<PartialCondition> {
    let mut warnings = Vec::new();
    let w = &mut warnings;
    report_extra("Condition", &wire.extra, w);

    let partial = PartialCondition {
        id: text(wire.id),
        subject_id: reference_id(wire.subject.as_ref(), "Patient", "Condition.subject", w),
        encounter_id: reference_id(
            wire.encounter.as_ref(),
            "Encounter",
            "Condition.encounter",
            w,
        ),
        clinical_status: resolve_concept(
            wire.clinical_status.as_ref(),
            &codes.condition_clinical,
            "Condition.clinicalStatus",
            w,
        ),
        category: resolve_concept(
            wire.category.first(),
            &codes.condition_category,
            "Condition.category",
            w,
        ),
        code: clinical_code(wire.code.as_ref(), codes, "Condition.code", w),
        onset_at: parse_instant(wire.onset_date_time.as_deref(), "Condition.onsetDateTime", w),
        recorded_on: parse_date(wire.recorded_date.as_deref(), "Condition.recordedDate", w),
    };

    Decoded::with_warnings(partial, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{ClinicalCode, ClinicalSystem, ConditionClinicalStatus};
    use chrono::NaiveDate;

    fn diabetes() -> ConditionRecord {
        ConditionRecord {
            id: "cond-1".into(),
            subject_id: "pat-1".into(),
            encounter_id: Some("enc-1".into()),
            clinical_status: ConditionClinicalStatus::Active,
            category: Some(ConditionCategory::EncounterDiagnosis),
            code: ClinicalCode::new(ClinicalSystem::Icd10Cm, "E11.9")
                .with_display("Type 2 diabetes mellitus without complications"),
            onset_at: None,
            recorded_on: NaiveDate::from_ymd_opt(2024, 1, 1),
        }
    }

    #[test]
    fn round_trips_encounter_diagnosis() {
        let codes = CodeSystems::standard();
        let json = Condition::render(&diabetes(), codes).expect("render");
        let decoded = Condition::parse(&json, codes).expect("parse");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);
        assert_eq!(decoded.value.into_record().expect("complete"), diabetes());
    }

    #[test]
    fn icd_code_uses_shared_system_uri() {
        let value = Condition::to_value(&diabetes(), CodeSystems::standard()).expect("to_value");
        assert_eq!(
            value["code"]["coding"][0]["system"],
            "http://hl7.org/fhir/sid/icd-10-cm"
        );
        assert_eq!(
            value["meta"]["profile"][0],
            Condition::PROFILE_ENCOUNTER_DIAGNOSIS
        );
    }
}
