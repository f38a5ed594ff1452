//! FHIR R4 JSON boundary for the medwire codec.
//!
//! This crate provides **wire models** and **translation helpers** between canonical records and
//! FHIR R4 resources:
//! - Patient, Encounter, Observation, Condition, MedicationRequest
//! - US Core profiles declared in `meta.profile` on every outbound resource
//!
//! Each resource has a zero-sized namespace type with four associated functions:
//! `to_value`/`render` (canonical → JSON) and `from_value`/`parse` (JSON → partial canonical).
//! Outbound is strict: an unmapped internal value is an error and nothing is produced. Inbound is
//! forgiving: unknown elements, unmapped codes and odd references become [`Warning`]s next to a
//! best-effort partial record.
//!
//! Out of scope: FHIR REST, search, versioning and Bundles.
//!
//! [`Warning`]: medwire_types::Warning

mod common;
pub mod condition;
pub mod encounter;
pub mod medication_request;
pub mod observation;
pub mod patient;
mod resource;

// Re-export facades
pub use condition::Condition;
pub use encounter::Encounter;
pub use medication_request::MedicationRequest;
pub use observation::Observation;
pub use patient::Patient;
pub use resource::{from_fhir, parse_fhir, render_fhir, to_fhir};

use canonical::CanonicalError;
use codes::UnmappedCodeError;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error(transparent)]
    Unmapped(#[from] UnmappedCodeError),

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] CanonicalError),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
