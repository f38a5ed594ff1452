//! FHIR MedicationRequest wire model and translation helpers.
//!
//! The medication is carried as `medicationCodeableConcept`; a `medicationReference` is not
//! resolved and leaves the medication unset with an `UnrecognisedElement` warning.

use crate::common::{
    check_resource_type, clinical_code, concept, format_instant, from_value_at_path, meta_for,
    optional_reference, parse_instant, parse_json, reference, reference_id, report_extra,
    resolve_code, text, to_json_value, CodeableConceptWire, Extra, MetaWire, ReferenceWire,
};
use crate::FhirResult;
use canonical::{MedicationRequestRecord, PartialMedicationRequest};
use codes::CodeSystems;
use medwire_types::Decoded;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MedicationRequest resource operations.
pub struct MedicationRequest;

impl MedicationRequest {
    pub const RESOURCE_TYPE: &'static str = "MedicationRequest";
    pub const PROFILE: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-medicationrequest";

    pub fn to_value(record: &MedicationRequestRecord, codes: &CodeSystems) -> FhirResult<Value> {
        let wire = domain_to_wire(record, codes)?;
        to_json_value(Self::RESOURCE_TYPE, &wire)
    }

    pub fn render(record: &MedicationRequestRecord, codes: &CodeSystems) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_value(record, codes)?)?)
    }

    pub fn from_value(
        value: Value,
        codes: &CodeSystems,
    ) -> FhirResult<Decoded<PartialMedicationRequest>> {
        let wire: MedicationRequestWire = from_value_at_path(Self::RESOURCE_TYPE, value)?;
        check_resource_type(Self::RESOURCE_TYPE, &wire.resource_type)?;
        Ok(wire_to_domain(wire, codes))
    }

    pub fn parse(
        json_text: &str,
        codes: &CodeSystems,
    ) -> FhirResult<Decoded<PartialMedicationRequest>> {
        Self::from_value(parse_json(json_text)?, codes)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct MedicationRequestWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(
        rename = "medicationCodeableConcept",
        skip_serializing_if = "Option::is_none"
    )]
    pub medication_codeable_concept: Option<CodeableConceptWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<ReferenceWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<ReferenceWire>,

    #[serde(rename = "authoredOn", skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<ReferenceWire>,

    #[serde(
        rename = "dosageInstruction",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dosage_instruction: Vec<DosageWire>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct DosageWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

fn domain_to_wire(
    record: &MedicationRequestRecord,
    codes: &CodeSystems,
) -> FhirResult<MedicationRequestWire> {
    Ok(MedicationRequestWire {
        resource_type: MedicationRequest::RESOURCE_TYPE.to_string(),
        id: Some(record.id.clone()),
        meta: Some(meta_for(MedicationRequest::PROFILE)),
        status: Some(codes.medication_request_status.code(record.status)?.to_string()),
        intent: Some(codes.medication_request_intent.code(record.intent)?.to_string()),
        medication_codeable_concept: Some(concept(&record.medication, codes)?),
        subject: Some(reference("Patient", &record.subject_id)),
        encounter: optional_reference("Encounter", record.encounter_id.as_deref()),
        authored_on: record.authored_on.as_ref().map(format_instant),
        requester: optional_reference("Practitioner", record.requester_id.as_deref()),
        dosage_instruction: record
            .dosage
            .as_ref()
            .map(|dosage| DosageWire {
                text: Some(dosage.clone()),
                extra: Extra::new(),
            })
            .into_iter()
            .collect(),
        extra: Extra::new(),
    })
}

fn wire_to_domain(
    wire: MedicationRequestWire,
    codes: &CodeSystems,
) -> Decoded<PartialMedicationRequest> {
    let mut warnings = Vec::new();
    let w = &mut warnings;
    report_extra("MedicationRequest", &wire.extra, w);

    let dosage = wire.dosage_instruction.into_iter().find_map(|dosage| {
        report_extra("MedicationRequest.dosageInstruction", &dosage.extra, w);
        text(dosage.text)
    });

    let partial = PartialMedicationRequest {
        id: text(wire.id),
        subject_id: reference_id(
            wire.subject.as_ref(),
            "Patient",
            "MedicationRequest.subject",
            w,
        ),
        encounter_id: reference_id(
            wire.encounter.as_ref(),
            "Encounter",
            "MedicationRequest.encounter",
            w,
        ),
        requester_id: reference_id(
            wire.requester.as_ref(),
            "Practitioner",
            "MedicationRequest.requester",
            w,
        ),
        status: resolve_code(wire.status.as_deref(), &codes.medication_request_status, w),
        intent: resolve_code(wire.intent.as_deref(), &codes.medication_request_intent, w),
        medication: clinical_code(
            wire.medication_codeable_concept.as_ref(),
            codes,
            "MedicationRequest.medicationCodeableConcept",
            w,
        ),
        authored_on: parse_instant(
            wire.authored_on.as_deref(),
            "MedicationRequest.authoredOn",
            w,
        ),
        dosage,
    };

    Decoded::with_warnings(partial, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{
        ClinicalCode, ClinicalSystem, MedicationRequestIntent, MedicationRequestStatus,
    };
    use chrono::{TimeZone, Utc};
    use medwire_types::Warning;

    fn metformin() -> MedicationRequestRecord {
        MedicationRequestRecord {
            id: "mr-1".into(),
            subject_id: "pat-1".into(),
            encounter_id: None,
            requester_id: Some("prac-7".into()),
            status: MedicationRequestStatus::Active,
            intent: MedicationRequestIntent::Order,
            medication: ClinicalCode::new(ClinicalSystem::RxNorm, "860975")
                .with_display("metformin 500 MG Extended Release Oral Tablet"),
            authored_on: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single(),
            dosage: Some("1 tablet by mouth daily".into()),
        }
    }

    #[test]
    fn round_trips_prescription() {
        let codes = CodeSystems::standard();
        let json = MedicationRequest::render(&metformin(), codes).expect("render");
        let decoded = MedicationRequest::parse(&json, codes).expect("parse");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);
        assert_eq!(decoded.value.into_record().expect("complete"), metformin());
    }

    #[test]
    fn medication_reference_is_reported_not_resolved() {
        let json = r#"{
            "resourceType": "MedicationRequest",
            "id": "mr-2",
            "status": "active",
            "intent": "order",
            "medicationReference": {"reference": "Medication/9"},
            "subject": {"reference": "Patient/pat-1"}
        }"#;
        let decoded = MedicationRequest::parse(json, CodeSystems::standard()).expect("parse");
        assert_eq!(decoded.value.medication, None);
        assert!(decoded.warnings.contains(&Warning::UnrecognisedElement {
            path: "MedicationRequest.medicationReference".into()
        }));
    }
}
