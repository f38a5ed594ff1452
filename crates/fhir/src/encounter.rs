//! FHIR Encounter wire model and translation helpers.
//!
//! Round-trip scope: every field of [`EncounterRecord`] except `deleted_at`, which FHIR has no
//! slot for. `length` is written from the period and never read back: inbound length is always
//! recomputed, and a supplied value that disagrees is reported.

use crate::common::{
    check_resource_type, clinical_code, coding, concept, format_instant, from_value_at_path,
    meta_for, optional_reference, parse_instant, parse_json, reference, reference_id,
    report_extra, resolve_code, resolve_coding, text, to_json_value, CodeableConceptWire,
    CodingWire, Extra, MetaWire, PeriodWire, QuantityWire, ReferenceWire, UCUM,
};
use crate::FhirResult;
use canonical::{EncounterRecord, PartialDiagnosis, PartialEncounter};
use codes::CodeSystems;
use medwire_types::{Decoded, Warning};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Encounter resource operations.
pub struct Encounter;

impl Encounter {
    pub const RESOURCE_TYPE: &'static str = "Encounter";
    pub const PROFILE: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-encounter";

    /// Build a FHIR Encounter from a canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FhirError::Unmapped`] if the status, class or a reason code system has
    /// no FHIR code, and [`crate::FhirError::InvalidRecord`] if the period ends before it starts.
    pub fn to_value(record: &EncounterRecord, codes: &CodeSystems) -> FhirResult<Value> {
        let wire = domain_to_wire(record, codes)?;
        to_json_value(Self::RESOURCE_TYPE, &wire)
    }

    pub fn render(record: &EncounterRecord, codes: &CodeSystems) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_value(record, codes)?)?)
    }

    /// Read a FHIR Encounter into a partial canonical record.
    pub fn from_value(value: Value, codes: &CodeSystems) -> FhirResult<Decoded<PartialEncounter>> {
        let wire: EncounterWire = from_value_at_path(Self::RESOURCE_TYPE, value)?;
        check_resource_type(Self::RESOURCE_TYPE, &wire.resource_type)?;
        Ok(wire_to_domain(wire, codes))
    }

    pub fn parse(json_text: &str, codes: &CodeSystems) -> FhirResult<Decoded<PartialEncounter>> {
        Self::from_value(parse_json(json_text)?, codes)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct EncounterWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<CodingWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<ReferenceWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<ParticipantWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<QuantityWire>,

    #[serde(rename = "reasonCode", default, skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<CodeableConceptWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnosis: Vec<DiagnosisWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<LocationWire>,

    #[serde(rename = "serviceProvider", skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<ReferenceWire>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct ParticipantWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual: Option<ReferenceWire>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct DiagnosisWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ReferenceWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct LocationWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ReferenceWire>,

    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn domain_to_wire(record: &EncounterRecord, codes: &CodeSystems) -> FhirResult<EncounterWire> {
    record.period.check()?;

    let status = codes.encounter_status.code(record.status)?;
    let class = coding(&codes.encounter_class, record.class)?;
    let reason_code = record
        .reason_codes
        .iter()
        .map(|code| concept(code, codes))
        .collect::<FhirResult<Vec<_>>>()?;

    let length = record.length_minutes().map(|minutes| QuantityWire {
        value: Some(Number::from(minutes)),
        unit: Some("min".to_string()),
        system: Some(UCUM.to_string()),
        code: Some("min".to_string()),
        extra: Extra::new(),
    });

    Ok(EncounterWire {
        resource_type: Encounter::RESOURCE_TYPE.to_string(),
        id: Some(record.id.clone()),
        meta: Some(meta_for(Encounter::PROFILE)),
        status: Some(status.to_string()),
        class: Some(class),
        subject: Some(reference("Patient", &record.subject_id)),
        participant: optional_reference("Practitioner", record.practitioner_id.as_deref())
            .map(|individual| ParticipantWire {
                individual: Some(individual),
                extra: Extra::new(),
            })
            .into_iter()
            .collect(),
        period: Some(PeriodWire {
            start: Some(format_instant(&record.period.start)),
            end: record.period.end.as_ref().map(format_instant),
            extra: Extra::new(),
        }),
        length,
        reason_code,
        diagnosis: record
            .diagnoses
            .iter()
            .map(|diagnosis| DiagnosisWire {
                condition: Some(reference("Condition", &diagnosis.condition_id)),
                rank: Some(diagnosis.rank),
                extra: Extra::new(),
            })
            .collect(),
        location: optional_reference("Location", record.location_id.as_deref())
            .map(|location| LocationWire {
                location: Some(location),
                extra: Extra::new(),
            })
            .into_iter()
            .collect(),
        service_provider: optional_reference(
            "Organization",
            record.service_provider_id.as_deref(),
        ),
        extra: Extra::new(),
    })
}

/// Reads the one reference the canonical record holds from a repeating element.
///
/// Every entry is checked for unknown elements. Resolvable references after the first are
/// reported as `UnrecognisedElement`, since the record has no slot for them.
fn single_reference<'a>(
    entries: impl Iterator<Item = (&'a Extra, Option<&'a ReferenceWire>)>,
    element: &str,
    child: &str,
    expected: &str,
    w: &mut Vec<Warning>,
) -> Option<String> {
    let mut found = None;
    for (i, (extra, wire)) in entries.enumerate() {
        let path = format!("{element}[{i}]");
        report_extra(&path, extra, w);
        let Some(id) = reference_id(wire, expected, &format!("{path}.{child}"), w) else {
            continue;
        };
        if found.is_none() {
            found = Some(id);
        } else {
            tracing::warn!(path = %path, id = %id, "dropping additional {expected} reference");
            w.push(Warning::UnrecognisedElement { path });
        }
    }
    found
}

fn wire_to_domain(wire: EncounterWire, codes: &CodeSystems) -> Decoded<PartialEncounter> {
    let mut warnings = Vec::new();
    let w = &mut warnings;
    report_extra("Encounter", &wire.extra, w);

    let (start, end) = match &wire.period {
        Some(period) => {
            report_extra("Encounter.period", &period.extra, w);
            (
                parse_instant(period.start.as_deref(), "Encounter.period.start", w),
                parse_instant(period.end.as_deref(), "Encounter.period.end", w),
            )
        }
        None => (None, None),
    };

    let practitioner_id = single_reference(
        wire.participant
            .iter()
            .map(|p| (&p.extra, p.individual.as_ref())),
        "Encounter.participant",
        "individual",
        "Practitioner",
        w,
    );

    let location_id = single_reference(
        wire.location.iter().map(|l| (&l.extra, l.location.as_ref())),
        "Encounter.location",
        "location",
        "Location",
        w,
    );

    let reason_codes = wire
        .reason_code
        .iter()
        .enumerate()
        .filter_map(|(i, reason)| {
            clinical_code(Some(reason), codes, &format!("Encounter.reasonCode[{i}]"), w)
        })
        .collect();

    let mut diagnoses = Vec::new();
    for (i, diagnosis) in wire.diagnosis.iter().enumerate() {
        let path = format!("Encounter.diagnosis[{i}]");
        report_extra(&path, &diagnosis.extra, w);
        let condition = reference_id(
            diagnosis.condition.as_ref(),
            "Condition",
            &format!("{path}.condition"),
            w,
        );
        match condition {
            Some(condition_id) => diagnoses.push(PartialDiagnosis {
                condition_id,
                rank: diagnosis.rank,
            }),
            None => w.push(Warning::UnparsedValue {
                path: format!("{path}.condition"),
                value: String::new(),
            }),
        }
    }

    let partial = PartialEncounter {
        id: text(wire.id),
        subject_id: reference_id(wire.subject.as_ref(), "Patient", "Encounter.subject", w),
        status: resolve_code(wire.status.as_deref(), &codes.encounter_status, w),
        class: resolve_coding(wire.class.as_ref(), &codes.encounter_class, "Encounter.class", w),
        start,
        end,
        practitioner_id,
        location_id,
        service_provider_id: reference_id(
            wire.service_provider.as_ref(),
            "Organization",
            "Encounter.serviceProvider",
            w,
        ),
        reason_codes,
        diagnoses,
    };

    if let Some(length) = &wire.length {
        let supplied = length.value.as_ref().and_then(Number::as_i64);
        if supplied.is_none() || supplied != partial.length_minutes() {
            tracing::warn!(
                supplied = ?length.value,
                derived = ?partial.length_minutes(),
                "ignoring sender-supplied encounter length"
            );
            w.push(Warning::IgnoredDerivedValue {
                path: "Encounter.length".to_string(),
            });
        }
    }

    Decoded::with_warnings(partial, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{
        ClinicalCode, ClinicalSystem, DiagnosisRef, EncounterClass, EncounterStatus, Period,
    };
    use chrono::{TimeZone, Utc};
    use medwire_types::Coded;

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    fn open_ambulatory() -> EncounterRecord {
        EncounterRecord {
            id: "enc-1".into(),
            subject_id: "pat-1".into(),
            status: EncounterStatus::InProgress,
            class: EncounterClass::Ambulatory,
            period: Period::open(at(9, 0)),
            practitioner_id: None,
            location_id: None,
            service_provider_id: None,
            reason_codes: Vec::new(),
            diagnoses: Vec::new(),
            deleted_at: None,
        }
    }

    fn full() -> EncounterRecord {
        EncounterRecord {
            status: EncounterStatus::Finished,
            period: Period::new(at(9, 0), Some(at(9, 45))).expect("ordered"),
            practitioner_id: Some("prac-7".into()),
            location_id: Some("loc-2".into()),
            service_provider_id: Some("org-1".into()),
            reason_codes: vec![ClinicalCode::new(ClinicalSystem::Snomed, "44054006")
                .with_display("Diabetes mellitus type 2")],
            diagnoses: vec![
                DiagnosisRef {
                    condition_id: "cond-1".into(),
                    rank: 1,
                },
                DiagnosisRef {
                    condition_id: "cond-2".into(),
                    rank: 2,
                },
            ],
            ..open_ambulatory()
        }
    }

    #[test]
    fn in_progress_ambulatory_without_end() {
        let codes = CodeSystems::standard();
        let value = Encounter::to_value(&open_ambulatory(), codes).expect("to_value");

        assert_eq!(value["status"], "in-progress");
        assert_eq!(value["class"]["code"], "AMB");
        assert_eq!(value["period"]["start"], "2024-01-01T09:00:00Z");
        assert!(value["period"].get("end").is_none());
        assert!(value.get("length").is_none());

        let decoded = Encounter::from_value(value, codes).expect("from_value");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);
        let partial = decoded.value;
        assert_eq!(
            partial.status,
            Some(Coded::Known(EncounterStatus::InProgress))
        );
        assert_eq!(partial.end, None);
        assert_eq!(partial.length_minutes(), None);
    }

    #[test]
    fn round_trips_every_representable_field() {
        let codes = CodeSystems::standard();
        let record = full();
        let json = Encounter::render(&record, codes).expect("render");
        let decoded = Encounter::parse(&json, codes).expect("parse");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);
        assert_eq!(decoded.value.into_record().expect("complete"), record);
    }

    #[test]
    fn length_is_derived_and_supplied_value_is_not_trusted() {
        let codes = CodeSystems::standard();
        let mut value = Encounter::to_value(&full(), codes).expect("to_value");
        assert_eq!(value["length"]["value"], 45);

        value["length"]["value"] = serde_json::json!(600);
        let decoded = Encounter::from_value(value, codes).expect("from_value");
        assert_eq!(decoded.value.length_minutes(), Some(45));
        assert!(decoded.warnings.contains(&Warning::IgnoredDerivedValue {
            path: "Encounter.length".into()
        }));
    }

    #[test]
    fn on_leave_uses_fhir_code() {
        let record = EncounterRecord {
            status: EncounterStatus::OnLeave,
            ..open_ambulatory()
        };
        let value = Encounter::to_value(&record, CodeSystems::standard()).expect("to_value");
        assert_eq!(value["status"], "onleave");
    }

    #[test]
    fn unmapped_status_produces_no_output() {
        let mut restricted = *CodeSystems::standard();
        restricted.encounter_status.entries = &restricted.encounter_status.entries[..1];
        let err = Encounter::to_value(&open_ambulatory(), &restricted).expect_err("unmapped");
        assert!(matches!(err, crate::FhirError::Unmapped(_)));
    }

    #[test]
    fn unexpected_subject_reference_is_dropped() {
        let json = r#"{
            "resourceType": "Encounter",
            "id": "e1",
            "status": "finished",
            "class": {"system": "http://terminology.hl7.org/CodeSystem/v3-ActCode", "code": "AMB"},
            "subject": {"reference": "Group/12"},
            "period": {"start": "2024-01-01T09:00:00+01:00"}
        }"#;
        let decoded = Encounter::parse(json, CodeSystems::standard()).expect("parse");
        assert_eq!(decoded.value.subject_id, None);
        assert_eq!(decoded.value.start, Some(at(8, 0)));
        assert!(matches!(
            decoded.warnings.as_slice(),
            [Warning::UnexpectedReference { .. }]
        ));
    }

    #[test]
    fn every_participant_and_location_is_inspected() {
        let json = r#"{
            "resourceType": "Encounter",
            "id": "e1",
            "status": "finished",
            "class": {"system": "http://terminology.hl7.org/CodeSystem/v3-ActCode", "code": "AMB"},
            "subject": {"reference": "Patient/p1"},
            "participant": [
                {"individual": {"reference": "Practitioner/dr1"}},
                {"individual": {"reference": "Practitioner/dr2"}, "period": {"start": "2024-01-01"}}
            ],
            "location": [
                {"location": {"reference": "Location/room1"}},
                {"location": {"reference": "Location/room2"}}
            ]
        }"#;
        let decoded = Encounter::parse(json, CodeSystems::standard()).expect("parse");
        assert_eq!(decoded.value.practitioner_id.as_deref(), Some("dr1"));
        assert_eq!(decoded.value.location_id.as_deref(), Some("room1"));

        let paths: Vec<&str> = decoded
            .warnings
            .iter()
            .filter_map(|warning| match warning {
                Warning::UnrecognisedElement { path } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            paths,
            [
                "Encounter.participant[1].period",
                "Encounter.participant[1]",
                "Encounter.location[1]",
            ]
        );
    }
}
