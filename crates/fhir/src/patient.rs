//! FHIR Patient wire model and translation helpers.
//!
//! Round-trip scope: id, identifiers, first name (family + given), gender, birth date and first
//! address. Additional names and addresses are read but only the first is kept.

use crate::common::{
    check_resource_type, from_value_at_path, meta_for, parse_date, parse_json, report_extra, text,
    to_json_value, Extra, IdentifierWire, MetaWire,
};
use crate::{FhirError, FhirResult};
use canonical::{Address, Identifier, PartialPatient, PatientRecord};
use codes::CodeSystems;
use medwire_types::{Decoded, Warning};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// This is a zero-sized type used for namespacing patient-related operations.
/// All methods are associated functions.
pub struct Patient;

impl Patient {
    pub const RESOURCE_TYPE: &'static str = "Patient";
    pub const PROFILE: &'static str =
        "http://hl7.org/fhir/us/core/StructureDefinition/us-core-patient";

    /// Build a FHIR Patient from a canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Unmapped`] if the gender has no FHIR code.
    pub fn to_value(record: &PatientRecord, codes: &CodeSystems) -> FhirResult<Value> {
        let wire = domain_to_wire(record, codes)?;
        to_json_value(Self::RESOURCE_TYPE, &wire)
    }

    /// Render a patient resource as pretty-printed JSON text.
    pub fn render(record: &PatientRecord, codes: &CodeSystems) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_value(record, codes)?)?)
    }

    /// Read a FHIR Patient into a partial canonical record.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `name[0].family`)
    /// to the failing field when the JSON does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - any known field has an unexpected type,
    /// - resourceType is not "Patient".
    pub fn from_value(value: Value, codes: &CodeSystems) -> FhirResult<Decoded<PartialPatient>> {
        let wire: PatientWire = from_value_at_path(Self::RESOURCE_TYPE, value)?;
        check_resource_type(Self::RESOURCE_TYPE, &wire.resource_type)?;
        Ok(wire_to_domain(wire, codes))
    }

    /// Parse a patient resource from JSON text.
    pub fn parse(json_text: &str, codes: &CodeSystems) -> FhirResult<Decoded<PartialPatient>> {
        Self::from_value(parse_json(json_text)?, codes)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct PatientWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<IdentifierWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanNameWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<AddressWire>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct HumanNameWire {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct AddressWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(rename = "postalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn address_to_wire(address: &Address) -> AddressWire {
    AddressWire {
        line: address.lines.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        postal_code: address.postal_code.clone(),
        extra: Extra::new(),
    }
}

fn wire_to_address(wire: AddressWire, path: &str, warnings: &mut Vec<Warning>) -> Address {
    report_extra(path, &wire.extra, warnings);
    Address {
        lines: wire.line,
        city: text(wire.city),
        state: text(wire.state),
        postal_code: text(wire.postal_code),
    }
}

fn domain_to_wire(record: &PatientRecord, codes: &CodeSystems) -> FhirResult<PatientWire> {
    let gender = codes.administrative_gender.code(record.gender)?;

    let name = if record.family_name.is_some() || !record.given_names.is_empty() {
        vec![HumanNameWire {
            use_type: Some("official".to_string()),
            family: record.family_name.clone(),
            given: record.given_names.clone(),
            extra: Extra::new(),
        }]
    } else {
        vec![]
    };

    Ok(PatientWire {
        resource_type: Patient::RESOURCE_TYPE.to_string(),
        id: Some(record.id.clone()),
        meta: Some(meta_for(Patient::PROFILE)),
        identifier: record
            .identifiers
            .iter()
            .map(|identifier| IdentifierWire {
                system: Some(identifier.system.clone()),
                value: Some(identifier.value.clone()),
                extra: Extra::new(),
            })
            .collect(),
        name,
        gender: Some(gender.to_string()),
        birth_date: record.birth_date.as_ref().map(crate::common::format_date),
        address: record
            .address
            .as_ref()
            .map(address_to_wire)
            .into_iter()
            .collect(),
        extra: Extra::new(),
    })
}

fn wire_to_domain(wire: PatientWire, codes: &CodeSystems) -> Decoded<PartialPatient> {
    let mut warnings = Vec::new();
    report_extra("Patient", &wire.extra, &mut warnings);

    let identifiers = wire
        .identifier
        .into_iter()
        .enumerate()
        .filter_map(|(i, identifier)| {
            report_extra(
                &format!("Patient.identifier[{i}]"),
                &identifier.extra,
                &mut warnings,
            );
            Some(Identifier {
                system: identifier.system.unwrap_or_default(),
                value: text(identifier.value)?,
            })
        })
        .collect();

    // Prefer the official name; otherwise the first one listed.
    let name_index = wire
        .name
        .iter()
        .position(|n| n.use_type.as_deref() == Some("official"))
        .unwrap_or(0);
    let name = wire.name.into_iter().nth(name_index).unwrap_or_default();
    report_extra("Patient.name", &name.extra, &mut warnings);

    let gender = crate::common::resolve_code(
        wire.gender.as_deref(),
        &codes.administrative_gender,
        &mut warnings,
    );
    let birth_date = parse_date(
        wire.birth_date.as_deref(),
        "Patient.birthDate",
        &mut warnings,
    );
    let address = wire
        .address
        .into_iter()
        .next()
        .map(|address| wire_to_address(address, "Patient.address", &mut warnings));

    Decoded::with_warnings(
        PartialPatient {
            id: text(wire.id),
            identifiers,
            family_name: text(name.family),
            given_names: name.given,
            gender,
            birth_date,
            address,
        },
        warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::Gender;
    use chrono::NaiveDate;

    fn sample() -> PatientRecord {
        PatientRecord {
            id: "pat-1".into(),
            identifiers: vec![Identifier {
                system: "urn:oid:2.16.840.1.113883.3.1".into(),
                value: "MRN-0042".into(),
            }],
            family_name: Some("Williams".into()),
            given_names: vec!["Sarah".into(), "Jane".into()],
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(1992, 3, 20),
            address: Some(Address {
                lines: vec!["1 Main St".into()],
                city: Some("Springfield".into()),
                state: Some("IL".into()),
                postal_code: Some("62701".into()),
            }),
        }
    }

    #[test]
    fn round_trips_every_representable_field() {
        let codes = CodeSystems::standard();
        let record = sample();
        let json = Patient::render(&record, codes).expect("render patient");
        let decoded = Patient::parse(&json, codes).expect("parse patient");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);
        let back = decoded.value.into_record().expect("complete patient");
        assert_eq!(back, record);
    }

    #[test]
    fn declares_us_core_profile() {
        let value = Patient::to_value(&sample(), CodeSystems::standard()).expect("to_value");
        assert_eq!(value["meta"]["profile"][0], Patient::PROFILE);
        assert_eq!(value["gender"], "female");
        assert_eq!(value["birthDate"], "1992-03-20");
    }

    #[test]
    fn unknown_elements_and_codes_become_warnings() {
        let json = r#"{
            "resourceType": "Patient",
            "id": "p9",
            "gender": "nonbinary",
            "multipleBirthBoolean": false
        }"#;
        let decoded = Patient::parse(json, CodeSystems::standard()).expect("parse");
        assert_eq!(decoded.warnings.len(), 2);
        assert!(decoded
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::UnrecognisedElement { path } if path == "Patient.multipleBirthBoolean")));
        assert!(matches!(
            decoded.value.gender,
            Some(medwire_types::Coded::Unknown(_))
        ));
    }

    #[test]
    fn wrong_resource_type_is_rejected() {
        let err = Patient::parse(r#"{"resourceType":"Encounter"}"#, CodeSystems::standard())
            .expect_err("not a patient");
        assert!(matches!(err, FhirError::InvalidInput(_)));
    }

    #[test]
    fn schema_mismatch_is_a_translation_error() {
        let err = Patient::parse(
            r#"{"resourceType":"Patient","name":[{"family":7}]}"#,
            CodeSystems::standard(),
        )
        .expect_err("family must be a string");
        match err {
            FhirError::Translation(message) => {
                assert!(message.starts_with("Patient schema mismatch"), "{message}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
