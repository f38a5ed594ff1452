//! Canonical clinical and financial model.
//!
//! Every wire transformer converts to and from the types in this crate. Records are
//! format-agnostic and are never mutated in place: state changes (`advance`, `transition`,
//! `soft_delete`) return a new value.
//!
//! Each clinical record has a `Partial*` counterpart used for inbound data. Partial records carry
//! every field as optional and keep unresolved vocabulary as [`Coded::Unknown`], so nothing
//! received from a third party is lost before a caller decides how to complete it.
//!
//! [`Coded::Unknown`]: medwire_types::Coded::Unknown

mod claim;
mod claim_status;
mod common;
mod condition;
mod eligibility;
mod encounter;
mod medication_request;
mod observation;
mod order;
mod patient;
mod record;
mod remittance;

pub use claim::{
    Claim, ClaimEvidence, ClaimFilingIndicator, ClaimFrequency, ClaimStatus, ClaimType,
    PlaceOfService, ServiceLine,
};
pub use claim_status::{ClaimStatusCategory, ClaimStatusUpdate, StatusCategoryKind, StatusDetail};
pub use common::{
    Address, ClinicalCode, ClinicalSystem, Gender, Payer, Period, Person, Provider, Relationship,
    Subscriber,
};
pub use condition::{ConditionCategory, ConditionClinicalStatus, ConditionRecord, PartialCondition};
pub use eligibility::{
    Accumulator, Amounts, BenefitInformation, CoverageDetail, CoverageLevel, CoverageStatus,
    EligibilityRequest, EligibilityResponse, RequestRejection, ServiceType, TimePeriod,
};
pub use encounter::{
    DiagnosisRef, EncounterClass, EncounterRecord, EncounterStatus, PartialDiagnosis,
    PartialEncounter,
};
pub use medication_request::{
    MedicationRequestIntent, MedicationRequestRecord, MedicationRequestStatus,
    PartialMedicationRequest,
};
pub use observation::{
    Interpretation, ObservationCategory, ObservationRecord, ObservationStatus, ObservationValue,
    PartialObservation,
};
pub use order::{LabOrder, LabResult, OrderPriority, ResultGroup};
pub use patient::{Identifier, PartialPatient, PatientRecord};
pub use record::{CanonicalRecord, PartialRecord};
pub use remittance::{
    Adjustment, AdjustmentGroup, AdjustmentReason, ClaimPayment, ClaimPaymentStatus, PaymentInfo,
    PaymentMethod, ProviderAdjustment, RemittanceAdvice, RemittanceOutcome, ServiceLinePayment,
};

use chrono::{DateTime, Utc};
use medwire_types::{Coded, RawCode};

/// Errors raised by canonical record operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalError {
    /// A field the record cannot exist without was absent.
    #[error("{record} is missing required field '{field}'")]
    IncompleteRecord { record: &'static str, field: String },

    /// A required vocabulary value was received but could not be resolved.
    #[error("{record}.{field} carries unresolved code {code}")]
    UnresolvedCode {
        record: &'static str,
        field: String,
        code: RawCode,
    },

    /// A period whose end is before its start.
    #[error("period ends ({end}) before it starts ({start})")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The requested state change is not permitted from the current state.
    #[error("{record} cannot move from {from} to {to}")]
    InvalidTransition {
        record: &'static str,
        from: String,
        to: String,
    },

    /// Evidence offered to a state machine does not belong to the record or says nothing usable.
    #[error("evidence does not apply: {0}")]
    InapplicableEvidence(String),
}

/// Type alias for Results that can fail with a [`CanonicalError`].
pub type CanonicalResult<T> = Result<T, CanonicalError>;

// ============================================================================
// Partial-record completion helpers
// ============================================================================

pub(crate) fn required<T>(
    value: Option<T>,
    record: &'static str,
    field: &str,
) -> CanonicalResult<T> {
    value.ok_or_else(|| CanonicalError::IncompleteRecord {
        record,
        field: field.to_string(),
    })
}

pub(crate) fn required_text(
    value: Option<String>,
    record: &'static str,
    field: &str,
) -> CanonicalResult<String> {
    required(
        value.filter(|text| !text.trim().is_empty()),
        record,
        field,
    )
}

pub(crate) fn resolved<T>(
    value: Option<Coded<T>>,
    record: &'static str,
    field: &str,
) -> CanonicalResult<T> {
    match required(value, record, field)? {
        Coded::Known(value) => Ok(value),
        Coded::Unknown(code) => Err(CanonicalError::UnresolvedCode {
            record,
            field: field.to_string(),
            code,
        }),
    }
}

/// Resolves an optional coded value: absent stays absent, unknown is an error.
pub(crate) fn resolved_opt<T>(
    value: Option<Coded<T>>,
    record: &'static str,
    field: &str,
) -> CanonicalResult<Option<T>> {
    value
        .map(|coded| resolved(Some(coded), record, field))
        .transpose()
}
