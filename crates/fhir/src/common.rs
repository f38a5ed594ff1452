//! Wire building blocks and helpers shared by every resource module.
//!
//! References and CodeableConcepts are only ever built and read through the helpers in this
//! module, so every resource emits identical `system` URIs and splits references the same way.

use crate::{FhirError, FhirResult};
use canonical::{ClinicalCode, ClinicalSystem};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use codes::{CodeSystems, CodeTable};
use medwire_types::{Coded, Warning};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// Elements present in the payload that no field of the wire struct claimed.
pub(crate) type Extra = Map<String, Value>;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct MetaWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,

    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct CodingWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct CodeableConceptWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<CodingWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct ReferenceWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct PeriodWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct QuantityWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct IdentifierWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub(crate) struct AnnotationWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

pub(crate) const UCUM: &str = "http://unitsofmeasure.org";

// ============================================================================
// Document plumbing
// ============================================================================

/// Deserialises a wire struct, reporting the path of the first schema mismatch.
pub(crate) fn from_value_at_path<T: DeserializeOwned>(
    resource_type: &str,
    value: Value,
) -> FhirResult<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        FhirError::Translation(format!("{resource_type} schema mismatch at {path}: {source}"))
    })
}

/// Parses JSON text into a value.
pub(crate) fn parse_json(text: &str) -> FhirResult<Value> {
    Ok(serde_json::from_str(text)?)
}

pub(crate) fn check_resource_type(expected: &str, actual: &str) -> FhirResult<()> {
    if actual != expected {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType '{expected}', got '{actual}'"
        )));
    }
    Ok(())
}

pub(crate) fn to_json_value<T: Serialize>(resource_type: &str, wire: &T) -> FhirResult<Value> {
    serde_json::to_value(wire)
        .map_err(|e| FhirError::Translation(format!("Failed to serialise {resource_type}: {e}")))
}

pub(crate) fn meta_for(profile: &str) -> MetaWire {
    MetaWire {
        profile: vec![profile.to_string()],
        ..Default::default()
    }
}

/// Records one `UnrecognisedElement` warning per unclaimed element under `path`.
pub(crate) fn report_extra(path: &str, extra: &Extra, warnings: &mut Vec<Warning>) {
    for key in extra.keys() {
        let element = format!("{path}.{key}");
        tracing::debug!(element = %element, "unrecognised FHIR element");
        warnings.push(Warning::UnrecognisedElement { path: element });
    }
}

// ============================================================================
// References
// ============================================================================

/// Builds a literal relative reference, `ResourceType/id`.
pub(crate) fn reference(resource_type: &str, id: &str) -> ReferenceWire {
    ReferenceWire {
        reference: Some(format!("{resource_type}/{id}")),
        ..Default::default()
    }
}

pub(crate) fn optional_reference(resource_type: &str, id: Option<&str>) -> Option<ReferenceWire> {
    id.map(|id| reference(resource_type, id))
}

/// Extracts the local id from a reference to `expected`.
///
/// Relative (`Patient/1`), absolute (`https://host/fhir/Patient/1`) and versioned
/// (`Patient/1/_history/2`) forms are accepted. A reference to another resource type, or one
/// that cannot be split, yields `None` and an `UnexpectedReference` warning.
pub(crate) fn reference_id(
    wire: Option<&ReferenceWire>,
    expected: &str,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<String> {
    let wire = wire?;
    report_extra(path, &wire.extra, warnings);
    let reference = wire.reference.as_deref()?.trim();

    let parts: Vec<&str> = reference.split('/').collect();
    let id = parts
        .windows(2)
        .rev()
        .find(|pair| pair[0] == expected && !pair[1].is_empty())
        .map(|pair| pair[1].to_string());

    if id.is_none() {
        tracing::warn!(path, reference, expected, "unexpected reference");
        warnings.push(Warning::UnexpectedReference {
            path: path.to_string(),
            reference: reference.to_string(),
        });
    }
    id
}

// ============================================================================
// Codings and CodeableConcepts
// ============================================================================

/// A Coding for an internal enum value, system and display taken from the table.
pub(crate) fn coding<I>(table: &CodeTable<I>, value: I) -> FhirResult<CodingWire>
where
    I: Copy + PartialEq + fmt::Debug + 'static,
{
    let external = table.to_external(value)?;
    Ok(CodingWire {
        system: Some(external.system.to_string()),
        code: Some(external.code.to_string()),
        display: Some(external.display.to_string()),
        ..Default::default()
    })
}

/// A single-coding CodeableConcept for an internal enum value.
pub(crate) fn coded_concept<I>(table: &CodeTable<I>, value: I) -> FhirResult<CodeableConceptWire>
where
    I: Copy + PartialEq + fmt::Debug + 'static,
{
    Ok(CodeableConceptWire {
        coding: vec![coding(table, value)?],
        ..Default::default()
    })
}

/// A CodeableConcept for a clinical code.
///
/// A system that was received unresolved is written back as received.
pub(crate) fn concept(code: &ClinicalCode, codes: &CodeSystems) -> FhirResult<CodeableConceptWire> {
    let system = match &code.system {
        Coded::Known(system) => codes.clinical_system.code(*system)?.to_string(),
        Coded::Unknown(raw) => raw.code.clone(),
    };
    Ok(CodeableConceptWire {
        coding: vec![CodingWire {
            system: Some(system),
            code: Some(code.code.clone()),
            display: code.display.clone(),
            ..Default::default()
        }],
        ..Default::default()
    })
}

/// Reads a clinical code from the first coding that carries a code.
pub(crate) fn clinical_code(
    wire: Option<&CodeableConceptWire>,
    codes: &CodeSystems,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<ClinicalCode> {
    let wire = wire?;
    report_extra(path, &wire.extra, warnings);

    let coding = wire.coding.iter().find(|c| c.code.is_some())?;
    report_extra(&format!("{path}.coding"), &coding.extra, warnings);

    let system: Coded<ClinicalSystem> = match coding.system.as_deref() {
        Some(uri) => codes.clinical_system.resolve_or_warn(uri, warnings),
        None => {
            warnings.push(Warning::UnparsedValue {
                path: format!("{path}.coding.system"),
                value: String::new(),
            });
            codes.clinical_system.resolve("")
        }
    };

    Some(ClinicalCode {
        system,
        code: coding.code.clone().unwrap_or_default(),
        display: coding.display.clone().or_else(|| wire.text.clone()),
    })
}

/// Resolves a Coding against a table.
pub(crate) fn resolve_coding<I>(
    wire: Option<&CodingWire>,
    table: &CodeTable<I>,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<Coded<I>>
where
    I: Copy + PartialEq + fmt::Debug + 'static,
{
    let wire = wire?;
    report_extra(path, &wire.extra, warnings);
    let code = wire.code.as_deref()?;
    let system = wire.system.as_deref().unwrap_or(table.system);
    Some(table.to_internal_or_warn(system, code, warnings))
}

/// Resolves a CodeableConcept against a table.
///
/// The first coding from the table's system wins; otherwise the first coding is kept as unknown.
pub(crate) fn resolve_concept<I>(
    wire: Option<&CodeableConceptWire>,
    table: &CodeTable<I>,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<Coded<I>>
where
    I: Copy + PartialEq + fmt::Debug + 'static,
{
    let wire = wire?;
    report_extra(path, &wire.extra, warnings);

    let preferred = wire
        .coding
        .iter()
        .find(|c| c.system.as_deref() == Some(table.system) && c.code.is_some());
    let chosen = preferred.or_else(|| wire.coding.iter().find(|c| c.code.is_some()));
    resolve_coding(chosen, table, &format!("{path}.coding"), warnings)
}

/// Resolves a plain `code` element.
pub(crate) fn resolve_code<I>(
    code: Option<&str>,
    table: &CodeTable<I>,
    warnings: &mut Vec<Warning>,
) -> Option<Coded<I>>
where
    I: Copy + PartialEq + fmt::Debug + 'static,
{
    code.map(|code| table.resolve_or_warn(code, warnings))
}

// ============================================================================
// Dates and numbers
// ============================================================================

pub(crate) fn format_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a FHIR `dateTime`/`instant`.
///
/// A value with a time must carry an offset. A date-only value is read as midnight UTC.
pub(crate) fn parse_instant(
    value: Option<&str>,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<DateTime<Utc>> {
    let text = value?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    unparsed(path, text, warnings);
    None
}

pub(crate) fn parse_date(
    value: Option<&str>,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<NaiveDate> {
    let text = value?.trim();
    match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            unparsed(path, text, warnings);
            None
        }
    }
}

pub(crate) fn decimal_to_number(value: &Decimal) -> FhirResult<Number> {
    Number::from_str(&value.normalize().to_string())
        .map_err(|e| FhirError::Translation(format!("Cannot represent {value} as JSON: {e}")))
}

pub(crate) fn number_to_decimal(
    value: &Number,
    path: &str,
    warnings: &mut Vec<Warning>,
) -> Option<Decimal> {
    if let Some(i) = value.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = value.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = value.to_string();
    match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        Ok(decimal) => Some(decimal),
        Err(_) => {
            unparsed(path, &text, warnings);
            None
        }
    }
}

pub(crate) fn unparsed(path: &str, value: &str, warnings: &mut Vec<Warning>) {
    tracing::warn!(path, value, "could not interpret FHIR value");
    warnings.push(Warning::UnparsedValue {
        path: path.to_string(),
        value: value.to_string(),
    });
}

/// Trims and drops blank strings.
pub(crate) fn text(value: Option<String>) -> Option<String> {
    medwire_types::present(value.as_deref()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_wire(text: &str) -> ReferenceWire {
        ReferenceWire {
            reference: Some(text.into()),
            ..Default::default()
        }
    }

    #[test]
    fn reference_id_accepts_relative_absolute_and_versioned_forms() {
        let mut warnings = Vec::new();
        for (text, expected) in [
            ("Patient/123", "123"),
            ("https://ehr.example.org/fhir/Patient/abc", "abc"),
            ("Patient/123/_history/4", "123"),
        ] {
            let id = reference_id(Some(&reference_wire(text)), "Patient", "subject", &mut warnings);
            assert_eq!(id.as_deref(), Some(expected), "{text}");
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn reference_to_wrong_type_is_dropped_with_warning() {
        let mut warnings = Vec::new();
        let id = reference_id(
            Some(&reference_wire("Group/7")),
            "Patient",
            "subject",
            &mut warnings,
        );
        assert_eq!(id, None);
        assert!(matches!(
            &warnings[..],
            [Warning::UnexpectedReference { path, .. }] if path == "subject"
        ));
    }

    #[test]
    fn absent_reference_is_silently_unset() {
        let mut warnings = Vec::new();
        assert_eq!(reference_id(None, "Patient", "subject", &mut warnings), None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn concept_uses_table_uri_and_reads_back() {
        let codes = CodeSystems::standard();
        let code = ClinicalCode::new(ClinicalSystem::Loinc, "4548-4").with_display("HbA1c");
        let wire = concept(&code, codes).expect("mapped system");
        assert_eq!(wire.coding[0].system.as_deref(), Some("http://loinc.org"));

        let mut warnings = Vec::new();
        let back = clinical_code(Some(&wire), codes, "code", &mut warnings).expect("code");
        assert_eq!(back, code);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_code_system_round_trips_as_received() {
        let codes = CodeSystems::standard();
        let wire = CodeableConceptWire {
            coding: vec![CodingWire {
                system: Some("http://example.org/local-codes".into()),
                code: Some("X1".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let code = clinical_code(Some(&wire), codes, "code", &mut warnings).expect("code");
        assert!(!code.system.is_known());
        assert_eq!(warnings.len(), 1);

        let again = concept(&code, codes).expect("unknown system is written back");
        assert_eq!(
            again.coding[0].system.as_deref(),
            Some("http://example.org/local-codes")
        );
    }

    #[test]
    fn instants_require_offset_when_time_is_present() {
        let mut warnings = Vec::new();
        assert!(parse_instant(Some("2024-01-01T09:00:00Z"), "p", &mut warnings).is_some());
        assert!(parse_instant(Some("2024-01-01"), "p", &mut warnings).is_some());
        assert!(warnings.is_empty());
        assert!(parse_instant(Some("2024-01-01T09:00:00"), "p", &mut warnings).is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn decimals_survive_json_numbers() {
        let value = Decimal::new(725, 2);
        let number = decimal_to_number(&value).expect("number");
        let mut warnings = Vec::new();
        assert_eq!(number_to_decimal(&number, "v", &mut warnings), Some(value));
    }
}
