//! Resource-type dispatch.
//!
//! Callers holding an arbitrary FHIR resource go through these entry points; the per-resource
//! facades are used directly when the type is known up front.

use crate::common::parse_json;
use crate::{
    Condition, Encounter, FhirError, FhirResult, MedicationRequest, Observation, Patient,
};
use canonical::{CanonicalRecord, PartialRecord};
use codes::CodeSystems;
use medwire_types::Decoded;
use serde_json::Value;

/// Renders any canonical record as its FHIR resource.
///
/// # Errors
///
/// Returns `Unmapped` when an internal value has no external code, or `InvalidRecord` when the
/// record violates a canonical invariant.
pub fn to_fhir(record: &CanonicalRecord, codes: &CodeSystems) -> FhirResult<Value> {
    match record {
        CanonicalRecord::Patient(r) => Patient::to_value(r, codes),
        CanonicalRecord::Encounter(r) => Encounter::to_value(r, codes),
        CanonicalRecord::Observation(r) => Observation::to_value(r, codes),
        CanonicalRecord::Condition(r) => Condition::to_value(r, codes),
        CanonicalRecord::MedicationRequest(r) => MedicationRequest::to_value(r, codes),
    }
}

/// Pretty-printed form of [`to_fhir`].
pub fn render_fhir(record: &CanonicalRecord, codes: &CodeSystems) -> FhirResult<String> {
    Ok(serde_json::to_string_pretty(&to_fhir(record, codes)?)?)
}

/// Reads any FHIR resource into a partial canonical record.
///
/// A resource type with no transformer is returned as [`PartialRecord::Unsupported`] holding
/// the original document.
///
/// # Errors
///
/// Returns `InvalidInput` when the value is not an object or has no `resourceType`, and
/// `Translation` when a supported resource does not match its wire schema.
pub fn from_fhir(value: Value, codes: &CodeSystems) -> FhirResult<Decoded<PartialRecord>> {
    let resource_type = value
        .as_object()
        .ok_or_else(|| FhirError::InvalidInput("FHIR resource must be a JSON object".into()))?
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or_else(|| FhirError::InvalidInput("missing resourceType".into()))?
        .to_string();

    let decoded = match resource_type.as_str() {
        Patient::RESOURCE_TYPE => Patient::from_value(value, codes)?.map(PartialRecord::Patient),
        Encounter::RESOURCE_TYPE => {
            Encounter::from_value(value, codes)?.map(PartialRecord::Encounter)
        }
        Observation::RESOURCE_TYPE => {
            Observation::from_value(value, codes)?.map(PartialRecord::Observation)
        }
        Condition::RESOURCE_TYPE => {
            Condition::from_value(value, codes)?.map(PartialRecord::Condition)
        }
        MedicationRequest::RESOURCE_TYPE => {
            MedicationRequest::from_value(value, codes)?.map(PartialRecord::MedicationRequest)
        }
        _ => {
            tracing::info!(resource_type = %resource_type, "passing through unsupported resource");
            Decoded::new(PartialRecord::Unsupported {
                document: value.to_string(),
                resource_type,
            })
        }
    };
    Ok(decoded)
}

/// Parses JSON text and dispatches it through [`from_fhir`].
pub fn parse_fhir(json_text: &str, codes: &CodeSystems) -> FhirResult<Decoded<PartialRecord>> {
    from_fhir(parse_json(json_text)?, codes)
}
