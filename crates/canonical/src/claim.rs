//! Claims and the claim lifecycle.
//!
//! A claim only moves forward on evidence: a built submission, a parsed 277 status, a parsed 835
//! payment or an appeal. [`Claim::advance`] is the single place those rules live.

use crate::claim_status::{ClaimStatusUpdate, StatusCategoryKind};
use crate::common::{ClinicalCode, Payer, Person, Provider, Relationship, Subscriber};
use crate::remittance::{AdjustmentReason, ClaimPayment, RemittanceOutcome};
use crate::{CanonicalError, CanonicalResult};
use chrono::{DateTime, NaiveDate, Utc};
use medwire_types::{Coded, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Vocabularies
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Professional,
    Institutional,
}

/// Whether the claim is new or replaces/voids an earlier one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimFrequency {
    #[default]
    Original,
    Replacement,
    Void,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceOfService {
    Telehealth,
    TelehealthInHome,
    Office,
    Home,
    UrgentCare,
    InpatientHospital,
    OutpatientHospital,
    EmergencyRoom,
    AmbulatorySurgicalCenter,
    SkilledNursingFacility,
    NursingFacility,
    IndependentLaboratory,
}

/// Type of health plan the claim is filed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimFilingIndicator {
    SelfPay,
    PreferredProviderOrganization,
    PointOfService,
    BlueCrossBlueShield,
    CommercialInsurance,
    Tricare,
    HealthMaintenanceOrganization,
    MedicarePartA,
    MedicarePartB,
    Medicaid,
    WorkersCompensation,
}

/// Lifecycle status of a claim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Draft,
    Submitted,
    Accepted,
    Rejected,
    Pending,
    PartiallyPaid,
    Paid,
    Denied,
    Appealed,
}

impl ClaimStatus {
    pub fn can_transition_to(self, next: ClaimStatus) -> bool {
        use ClaimStatus::*;

        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Accepted)
                | (Submitted, Rejected)
                | (Accepted, Pending)
                | (Accepted | Pending, PartiallyPaid | Paid | Denied)
                | (PartiallyPaid | Paid | Denied, Appealed)
        )
    }

    /// Whether an adjudication outcome has been recorded.
    pub fn is_adjudicated(self) -> bool {
        matches!(
            self,
            ClaimStatus::PartiallyPaid | ClaimStatus::Paid | ClaimStatus::Denied
        )
    }
}

// ============================================================================
// Claim
// ============================================================================

/// One billed service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLine {
    /// CPT or HCPCS procedure code.
    pub procedure: ClinicalCode,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub units: Decimal,
    pub charge: Money,
    pub place_of_service: Option<PlaceOfService>,
    /// 1-based indexes into [`Claim::diagnoses`].
    #[serde(default)]
    pub diagnosis_pointers: Vec<u8>,
    pub service_date: Option<NaiveDate>,
    /// Institutional revenue code.
    pub revenue_code: Option<String>,
}

/// A claim for payment.
///
/// `total_charge` is carried so that it can be reconciled against the lines before submission;
/// the outbound builder always emits the computed [`Claim::line_total`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Patient control number.
    pub id: String,
    pub claim_type: ClaimType,
    #[serde(default)]
    pub frequency: ClaimFrequency,
    /// Payer claim control number of the claim being replaced or voided.
    pub original_reference: Option<String>,
    pub patient: Person,
    pub subscriber: Subscriber,
    #[serde(default)]
    pub relationship: Relationship,
    pub billing_provider: Provider,
    pub rendering_provider: Option<Provider>,
    pub payer: Payer,
    pub place_of_service: Option<PlaceOfService>,
    /// Uniform bill facility type code, institutional claims only.
    pub facility_type: Option<String>,
    pub statement_from: Option<NaiveDate>,
    pub statement_to: Option<NaiveDate>,
    /// ICD-10-CM codes; the first is the principal diagnosis.
    #[serde(default)]
    pub diagnoses: Vec<ClinicalCode>,
    #[serde(default)]
    pub lines: Vec<ServiceLine>,
    pub total_charge: Money,
    #[serde(default)]
    pub status: ClaimStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub adjudicated_at: Option<DateTime<Utc>>,
    pub paid_amount: Option<Money>,
    pub denial_reason: Option<Coded<AdjustmentReason>>,
}

/// Evidence that moves a claim through its lifecycle.
#[derive(Clone, Copy, Debug)]
pub enum ClaimEvidence<'a> {
    /// The claim was built into an 837 and handed to the transport.
    Submission { at: DateTime<Utc> },
    /// A 277 status report for the claim.
    StatusReport(&'a ClaimStatusUpdate),
    /// An 835 payment for the claim.
    Remittance {
        payment: &'a ClaimPayment,
        received_at: DateTime<Utc>,
    },
    /// A replacement claim was built to contest the outcome.
    Appeal { at: DateTime<Utc> },
}

impl Claim {
    /// Sum of the service line charges.
    pub fn line_total(&self) -> Money {
        self.lines.iter().map(|line| line.charge).sum()
    }

    /// Returns the claim with `total_charge` set from its lines.
    pub fn with_computed_total(mut self) -> Self {
        self.total_charge = self.line_total();
        self
    }

    /// Applies lifecycle evidence and returns the updated claim.
    ///
    /// Acknowledgement evidence that restates the current state (for example a second A2 for an
    /// accepted claim) returns an unchanged copy.
    ///
    /// # Errors
    ///
    /// - `InapplicableEvidence` if the evidence belongs to another claim or carries no usable
    ///   status.
    /// - `InvalidTransition` if the evidence is valid but the claim's current status does not
    ///   allow the move.
    pub fn advance(&self, evidence: ClaimEvidence<'_>) -> CanonicalResult<Claim> {
        match evidence {
            ClaimEvidence::Submission { at } => {
                let mut next = self.moved_to(ClaimStatus::Submitted)?;
                next.submitted_at = Some(at);
                Ok(next)
            }
            ClaimEvidence::Appeal { at } => {
                let mut next = self.moved_to(ClaimStatus::Appealed)?;
                next.frequency = ClaimFrequency::Replacement;
                next.submitted_at = Some(at);
                Ok(next)
            }
            ClaimEvidence::StatusReport(update) => self.apply_status(update),
            ClaimEvidence::Remittance {
                payment,
                received_at,
            } => self.apply_payment(payment, received_at),
        }
    }

    fn apply_status(&self, update: &ClaimStatusUpdate) -> CanonicalResult<Claim> {
        self.check_evidence_id(update.claim_id.as_deref())?;

        let kind = update
            .primary_category()
            .map(|category| category.kind())
            .ok_or_else(|| {
                CanonicalError::InapplicableEvidence(format!(
                    "no recognised status category for claim {}",
                    self.id
                ))
            })?;

        match (kind, self.status) {
            (StatusCategoryKind::Acknowledgement, ClaimStatus::Submitted) => {
                self.moved_to(ClaimStatus::Accepted)
            }
            (StatusCategoryKind::Acknowledgement, ClaimStatus::Accepted | ClaimStatus::Pending) => {
                Ok(self.clone())
            }
            (StatusCategoryKind::Rejection, _) => self.moved_to(ClaimStatus::Rejected),
            // A pending or finalized report implies the payer accepted the claim.
            (
                StatusCategoryKind::Pending | StatusCategoryKind::Finalized,
                ClaimStatus::Submitted,
            ) => self
                .moved_to(ClaimStatus::Accepted)?
                .moved_to(ClaimStatus::Pending),
            (StatusCategoryKind::Pending | StatusCategoryKind::Finalized, ClaimStatus::Accepted) => {
                self.moved_to(ClaimStatus::Pending)
            }
            (StatusCategoryKind::Pending | StatusCategoryKind::Finalized, ClaimStatus::Pending) => {
                Ok(self.clone())
            }
            (StatusCategoryKind::Error, _) => Err(CanonicalError::InapplicableEvidence(format!(
                "payer could not report a status for claim {}",
                self.id
            ))),
            (_, from) => Err(CanonicalError::InvalidTransition {
                record: "Claim",
                from: format!("{from:?}"),
                to: format!("{kind:?}"),
            }),
        }
    }

    fn apply_payment(
        &self,
        payment: &ClaimPayment,
        received_at: DateTime<Utc>,
    ) -> CanonicalResult<Claim> {
        self.check_evidence_id(Some(payment.claim_id.as_str()))?;

        let outcome = payment.outcome().ok_or_else(|| {
            CanonicalError::InapplicableEvidence(format!(
                "payment for claim {} is not an adjudication",
                self.id
            ))
        })?;

        let target = match outcome {
            RemittanceOutcome::Paid => ClaimStatus::Paid,
            RemittanceOutcome::PartiallyPaid => ClaimStatus::PartiallyPaid,
            RemittanceOutcome::Denied => ClaimStatus::Denied,
        };

        let mut next = self.moved_to(target)?;
        next.adjudicated_at = Some(received_at);
        next.paid_amount = Some(payment.paid);
        next.denial_reason = match outcome {
            RemittanceOutcome::Denied => payment
                .all_adjustments()
                .next()
                .map(|adjustment| adjustment.reason.clone()),
            _ => None,
        };
        Ok(next)
    }

    fn check_evidence_id(&self, claim_id: Option<&str>) -> CanonicalResult<()> {
        match claim_id {
            Some(id) if id == self.id => Ok(()),
            other => Err(CanonicalError::InapplicableEvidence(format!(
                "evidence for claim {} applied to claim {}",
                other.unwrap_or("<none>"),
                self.id
            ))),
        }
    }

    fn moved_to(&self, next: ClaimStatus) -> CanonicalResult<Claim> {
        if !self.status.can_transition_to(next) {
            return Err(CanonicalError::InvalidTransition {
                record: "Claim",
                from: format!("{:?}", self.status),
                to: format!("{next:?}"),
            });
        }
        Ok(Claim {
            status: next,
            ..self.clone()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::claim_status::{ClaimStatusCategory, StatusDetail};
    use crate::common::ClinicalSystem;
    use crate::remittance::{Adjustment, AdjustmentGroup, ClaimPaymentStatus};
    use chrono::TimeZone;

    pub(crate) fn sample_claim() -> Claim {
        Claim {
            id: "PCN-1001".into(),
            claim_type: ClaimType::Professional,
            frequency: ClaimFrequency::Original,
            original_reference: None,
            patient: Person::default(),
            subscriber: Subscriber::default(),
            relationship: Relationship::SelfInsured,
            billing_provider: Provider::default(),
            rendering_provider: None,
            payer: Payer::default(),
            place_of_service: Some(PlaceOfService::Office),
            facility_type: None,
            statement_from: None,
            statement_to: None,
            diagnoses: vec![ClinicalCode::new(ClinicalSystem::Icd10Cm, "E11.9")],
            lines: vec![
                ServiceLine {
                    procedure: ClinicalCode::new(ClinicalSystem::Cpt, "99213"),
                    modifiers: Vec::new(),
                    units: Decimal::ONE,
                    charge: Money::from_cents(15000),
                    place_of_service: None,
                    diagnosis_pointers: vec![1],
                    service_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                    revenue_code: None,
                },
                ServiceLine {
                    procedure: ClinicalCode::new(ClinicalSystem::Cpt, "83036"),
                    modifiers: Vec::new(),
                    units: Decimal::ONE,
                    charge: Money::from_cents(5000),
                    place_of_service: None,
                    diagnosis_pointers: vec![1],
                    service_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                    revenue_code: None,
                },
            ],
            total_charge: Money::from_cents(20000),
            status: ClaimStatus::Draft,
            submitted_at: None,
            adjudicated_at: None,
            paid_amount: None,
            denial_reason: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn status_report(claim_id: &str, category: ClaimStatusCategory) -> ClaimStatusUpdate {
        ClaimStatusUpdate {
            claim_id: Some(claim_id.into()),
            statuses: vec![StatusDetail {
                category: Coded::Known(category),
                status_code: Some("20".into()),
                entity_code: None,
            }],
            ..Default::default()
        }
    }

    fn payment(status: ClaimPaymentStatus, paid: i64, adjustments: Vec<Adjustment>) -> ClaimPayment {
        ClaimPayment {
            claim_id: "PCN-1001".into(),
            status: Coded::Known(status),
            charge: Money::from_cents(20000),
            paid: Money::from_cents(paid),
            patient_responsibility: None,
            payer_claim_control_number: None,
            adjustments,
            lines: Vec::new(),
        }
    }

    fn adjustment(group: AdjustmentGroup, reason: AdjustmentReason, cents: i64) -> Adjustment {
        Adjustment {
            group: Coded::Known(group),
            reason: Coded::Known(reason),
            amount: Money::from_cents(cents),
            quantity: None,
        }
    }

    fn accepted() -> Claim {
        let submitted = sample_claim()
            .advance(ClaimEvidence::Submission { at: now() })
            .expect("submit");
        submitted
            .advance(ClaimEvidence::StatusReport(&status_report(
                "PCN-1001",
                ClaimStatusCategory::AcceptedIntoAdjudication,
            )))
            .expect("accept")
    }

    #[test]
    fn line_total_sums_charges() {
        assert_eq!(sample_claim().line_total(), Money::from_cents(20000));
    }

    #[test]
    fn submission_records_timestamp() {
        let submitted = sample_claim()
            .advance(ClaimEvidence::Submission { at: now() })
            .expect("submit");
        assert_eq!(submitted.status, ClaimStatus::Submitted);
        assert_eq!(submitted.submitted_at, Some(now()));
    }

    #[test]
    fn cannot_be_paid_without_remittance() {
        let claim = accepted();
        assert!(!ClaimStatus::Submitted.can_transition_to(ClaimStatus::Paid));
        assert!(!ClaimStatus::Draft.can_transition_to(ClaimStatus::Paid));
        assert_eq!(claim.status, ClaimStatus::Accepted);
    }

    #[test]
    fn rejection_from_submitted() {
        let submitted = sample_claim()
            .advance(ClaimEvidence::Submission { at: now() })
            .expect("submit");
        let rejected = submitted
            .advance(ClaimEvidence::StatusReport(&status_report(
                "PCN-1001",
                ClaimStatusCategory::MissingInformation,
            )))
            .expect("reject");
        assert_eq!(rejected.status, ClaimStatus::Rejected);
    }

    #[test]
    fn pending_report_on_submitted_claim_passes_through_accepted() {
        let submitted = sample_claim()
            .advance(ClaimEvidence::Submission { at: now() })
            .expect("submit");
        let pending = submitted
            .advance(ClaimEvidence::StatusReport(&status_report(
                "PCN-1001",
                ClaimStatusCategory::PendingInProcess,
            )))
            .expect("pending");
        assert_eq!(pending.status, ClaimStatus::Pending);
    }

    #[test]
    fn full_payment_marks_paid() {
        let paid = accepted()
            .advance(ClaimEvidence::Remittance {
                payment: &payment(
                    ClaimPaymentStatus::ProcessedAsPrimary,
                    16000,
                    vec![adjustment(
                        AdjustmentGroup::ContractualObligation,
                        AdjustmentReason::ChargeExceedsFeeSchedule,
                        4000,
                    )],
                ),
                received_at: now(),
            })
            .expect("paid");
        assert_eq!(paid.status, ClaimStatus::Paid);
        assert_eq!(paid.paid_amount, Some(Money::from_cents(16000)));
        assert_eq!(paid.denial_reason, None);
    }

    #[test]
    fn short_payment_marks_partially_paid() {
        let partial = accepted()
            .advance(ClaimEvidence::Remittance {
                payment: &payment(ClaimPaymentStatus::ProcessedAsPrimary, 10000, Vec::new()),
                received_at: now(),
            })
            .expect("partially paid");
        assert_eq!(partial.status, ClaimStatus::PartiallyPaid);
    }

    #[test]
    fn denial_records_reason_and_allows_appeal() {
        let denied = accepted()
            .advance(ClaimEvidence::Remittance {
                payment: &payment(
                    ClaimPaymentStatus::Denied,
                    0,
                    vec![adjustment(
                        AdjustmentGroup::ContractualObligation,
                        AdjustmentReason::NotMedicallyNecessary,
                        20000,
                    )],
                ),
                received_at: now(),
            })
            .expect("denied");
        assert_eq!(denied.status, ClaimStatus::Denied);
        assert_eq!(
            denied.denial_reason,
            Some(Coded::Known(AdjustmentReason::NotMedicallyNecessary))
        );

        let appealed = denied
            .advance(ClaimEvidence::Appeal { at: now() })
            .expect("appeal");
        assert_eq!(appealed.status, ClaimStatus::Appealed);
        assert_eq!(appealed.frequency, ClaimFrequency::Replacement);
    }

    #[test]
    fn evidence_for_another_claim_is_refused() {
        let err = accepted()
            .advance(ClaimEvidence::StatusReport(&status_report(
                "PCN-9999",
                ClaimStatusCategory::Acknowledged,
            )))
            .expect_err("wrong claim");
        assert!(matches!(err, CanonicalError::InapplicableEvidence(_)));
    }

    #[test]
    fn remittance_on_draft_is_invalid() {
        let err = sample_claim()
            .advance(ClaimEvidence::Remittance {
                payment: &payment(ClaimPaymentStatus::ProcessedAsPrimary, 20000, Vec::new()),
                received_at: now(),
            })
            .expect_err("draft cannot be paid");
        assert!(matches!(err, CanonicalError::InvalidTransition { .. }));
    }
}
