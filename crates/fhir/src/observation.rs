//! FHIR Observation wire model and translation helpers.
//!
//! Round-trip scope: every field of [`ObservationRecord`]. The reference range is carried as
//! `referenceRange.text` only and the note as the first `note.text`.

use crate::common::{
    check_resource_type, clinical_code, coded_concept, concept, decimal_to_number, format_instant,
    from_value_at_path, meta_for, number_to_decimal, optional_reference, parse_instant,
    parse_json, reference, reference_id, report_extra, resolve_code, resolve_concept, text,
    to_json_value, AnnotationWire, CodeableConceptWire, Extra, MetaWire, QuantityWire,
    ReferenceWire, UCUM,
};
use crate::FhirResult;
use canonical::{
    ObservationCategory, ObservationRecord, ObservationValue, PartialObservation,
};
use codes::CodeSystems;
use medwire_types::Decoded;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Observation resource operations.
pub struct Observation;

impl Observation {
    pub const RESOURCE_TYPE: &'static str = "Observation";
    pub const PROFILE_LAB: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-observation-lab";
    pub const PROFILE_VITAL_SIGNS: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-vital-signs";
    pub const PROFILE_SIMPLE: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-simple-observation";

    /// Profile declared for an observation of the given category.
    pub fn profile_for(category: Option<ObservationCategory>) -> &'static str {
        match category {
            Some(ObservationCategory::Laboratory) => Self::PROFILE_LAB,
            Some(ObservationCategory::VitalSigns) => Self::PROFILE_VITAL_SIGNS,
            _ => Self::PROFILE_SIMPLE,
        }
    }

    pub fn to_value(record: &ObservationRecord, codes: &CodeSystems) -> FhirResult<Value> {
        let wire = domain_to_wire(record, codes)?;
        to_json_value(Self::RESOURCE_TYPE, &wire)
    }

    pub fn render(record: &ObservationRecord, codes: &CodeSystems) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_value(record, codes)?)?)
    }

    pub fn from_value(
        value: Value,
        codes: &CodeSystems,
    ) -> FhirResult<Decoded<PartialObservation>> {
        let wire: ObservationWire = from_value_at_path(Self::RESOURCE_TYPE, value)?;
        check_resource_type(Self::RESOURCE_TYPE, &wire.resource_type)?;
        Ok(wire_to_domain(wire, codes))
    }

    pub fn parse(json_text: &str, codes: &CodeSystems) -> FhirResult<Decoded<PartialObservation>> {
        Self::from_value(parse_json(json_text)?, codes)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct ObservationWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConceptWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConceptWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<ReferenceWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<ReferenceWire>,

    #[serde(rename = "effectiveDateTime", skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,

    #[serde(rename = "valueQuantity", skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<QuantityWire>,

    #[serde(rename = "valueString", skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(rename = "valueCodeableConcept", skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConceptWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interpretation: Vec<CodeableConceptWire>,

    #[serde(rename = "referenceRange", default, skip_serializing_if = "Vec::is_empty")]
    pub reference_range: Vec<ReferenceRangeWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<AnnotationWire>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct ReferenceRangeWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn domain_to_wire(record: &ObservationRecord, codes: &CodeSystems) -> FhirResult<ObservationWire> {
    let status = codes.observation_status.code(record.status)?;
    let category = record
        .category
        .map(|category| coded_concept(&codes.observation_category, category))
        .transpose()?;
    let interpretation = record
        .interpretation
        .map(|flag| coded_concept(&codes.observation_interpretation, flag))
        .transpose()?;

    let mut wire = ObservationWire {
        resource_type: Observation::RESOURCE_TYPE.to_string(),
        id: Some(record.id.clone()),
        meta: Some(meta_for(Observation::profile_for(record.category))),
        status: Some(status.to_string()),
        category: category.into_iter().collect(),
        code: Some(concept(&record.code, codes)?),
        subject: Some(reference("Patient", &record.subject_id)),
        encounter: optional_reference("Encounter", record.encounter_id.as_deref()),
        effective_date_time: record.effective_at.as_ref().map(format_instant),
        value_quantity: None,
        value_string: None,
        value_codeable_concept: None,
        interpretation: interpretation.into_iter().collect(),
        reference_range: record
            .reference_range
            .as_ref()
            .map(|range| ReferenceRangeWire {
                text: Some(range.clone()),
                extra: Extra::new(),
            })
            .into_iter()
            .collect(),
        note: record
            .note
            .as_ref()
            .map(|note| AnnotationWire {
                text: Some(note.clone()),
                extra: Extra::new(),
            })
            .into_iter()
            .collect(),
        extra: Extra::new(),
    };

    match &record.value {
        Some(ObservationValue::Quantity { value, unit }) => {
            wire.value_quantity = Some(QuantityWire {
                value: Some(decimal_to_number(value)?),
                unit: unit.clone(),
                system: unit.as_ref().map(|_| UCUM.to_string()),
                code: unit.clone(),
                extra: Extra::new(),
            });
        }
        Some(ObservationValue::Text(value)) => wire.value_string = Some(value.clone()),
        Some(ObservationValue::Coded(code)) => {
            wire.value_codeable_concept = Some(concept(code, codes)?);
        }
        None => {}
    }

    Ok(wire)
}

fn wire_to_domain(wire: ObservationWire, codes: &CodeSystems) -> Decoded<PartialObservation> {
    let mut warnings = Vec::new();
    let w = &mut warnings;
    report_extra("Observation", &wire.extra, w);

    let value = if let Some(quantity) = &wire.value_quantity {
        report_extra("Observation.valueQuantity", &quantity.extra, w);
        quantity
            .value
            .as_ref()
            .and_then(|number| number_to_decimal(number, "Observation.valueQuantity.value", w))
            .map(|value| ObservationValue::Quantity {
                value,
                unit: text(quantity.unit.clone()).or_else(|| text(quantity.code.clone())),
            })
    } else if let Some(value) = &wire.value_string {
        Some(ObservationValue::Text(value.clone()))
    } else {
        clinical_code(
            wire.value_codeable_concept.as_ref(),
            codes,
            "Observation.valueCodeableConcept",
            w,
        )
        .map(ObservationValue::Coded)
    };

    let partial = PartialObservation {
        id: text(wire.id),
        subject_id: reference_id(wire.subject.as_ref(), "Patient", "Observation.subject", w),
        encounter_id: reference_id(
            wire.encounter.as_ref(),
            "Encounter",
            "Observation.encounter",
            w,
        ),
        status: resolve_code(wire.status.as_deref(), &codes.observation_status, w),
        category: resolve_concept(
            wire.category.first(),
            &codes.observation_category,
            "Observation.category",
            w,
        ),
        code: clinical_code(wire.code.as_ref(), codes, "Observation.code", w),
        value,
        effective_at: parse_instant(
            wire.effective_date_time.as_deref(),
            "Observation.effectiveDateTime",
            w,
        ),
        interpretation: resolve_concept(
            wire.interpretation.first(),
            &codes.observation_interpretation,
            "Observation.interpretation",
            w,
        ),
        reference_range: wire
            .reference_range
            .into_iter()
            .find_map(|range| text(range.text)),
        note: wire.note.into_iter().find_map(|note| text(note.text)),
    };

    Decoded::with_warnings(partial, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{ClinicalCode, ClinicalSystem, Interpretation, ObservationStatus};
    use chrono::{TimeZone, Utc};
    use medwire_types::Warning;
    use rust_decimal::Decimal;

    fn hba1c() -> ObservationRecord {
        ObservationRecord {
            id: "obs-1".into(),
            subject_id: "pat-1".into(),
            encounter_id: Some("enc-1".into()),
            status: ObservationStatus::Final,
            category: Some(ObservationCategory::Laboratory),
            code: ClinicalCode::new(ClinicalSystem::Loinc, "4548-4")
                .with_display("Hemoglobin A1c/Hemoglobin.total in Blood"),
            value: Some(ObservationValue::Quantity {
                value: Decimal::new(72, 1),
                unit: Some("%".into()),
            }),
            effective_at: Utc.with_ymd_and_hms(2024, 2, 3, 8, 30, 0).single(),
            interpretation: Some(Interpretation::High),
            reference_range: Some("4.0-5.6 %".into()),
            note: Some("fasting".into()),
        }
    }

    #[test]
    fn round_trips_lab_result() {
        let codes = CodeSystems::standard();
        let record = hba1c();
        let json = Observation::render(&record, codes).expect("render");
        let decoded = Observation::parse(&json, codes).expect("parse");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);
        assert_eq!(decoded.value.into_record().expect("complete"), record);
    }

    #[test]
    fn lab_observation_declares_lab_profile() {
        let value = Observation::to_value(&hba1c(), CodeSystems::standard()).expect("to_value");
        assert_eq!(value["meta"]["profile"][0], Observation::PROFILE_LAB);
        assert_eq!(value["valueQuantity"]["value"], 7.2);
        assert_eq!(value["interpretation"][0]["coding"][0]["code"], "H");
    }

    #[test]
    fn text_and_coded_values_round_trip() {
        let codes = CodeSystems::standard();
        for value in [
            ObservationValue::Text("negative".into()),
            ObservationValue::Coded(ClinicalCode::new(ClinicalSystem::Snomed, "260385009")),
        ] {
            let record = ObservationRecord {
                value: Some(value),
                ..hba1c()
            };
            let json = Observation::render(&record, codes).expect("render");
            let back = Observation::parse(&json, codes)
                .expect("parse")
                .value
                .into_record()
                .expect("complete");
            assert_eq!(back, record);
        }
    }

    #[test]
    fn unparsable_effective_time_is_reported() {
        let json = r#"{
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]},
            "effectiveDateTime": "yesterday"
        }"#;
        let decoded = Observation::parse(json, CodeSystems::standard()).expect("parse");
        assert_eq!(decoded.value.effective_at, None);
        assert!(matches!(
            decoded.warnings.as_slice(),
            [Warning::UnparsedValue { path, .. }] if path == "Observation.effectiveDateTime"
        ));
    }
}
