//! Remittance advice (835).

use crate::common::ClinicalCode;
use chrono::NaiveDate;
use medwire_types::{Coded, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Claim adjustment group (CAGC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentGroup {
    ContractualObligation,
    Correction,
    OtherAdjustment,
    PayerInitiated,
    PatientResponsibility,
}

/// Claim adjustment reason (CARC) values the codec recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Deductible,
    Coinsurance,
    Copayment,
    ModifierInconsistent,
    MissingInformation,
    DuplicateClaim,
    CoveredByAnotherPayer,
    CoverageTerminated,
    TimelyFilingExpired,
    PatientNotIdentified,
    ChargeExceedsFeeSchedule,
    NotMedicallyNecessary,
    NotCovered,
    Bundled,
    BenefitMaximumReached,
    PriorAuthorizationAbsent,
    NotCoveredByPlan,
    Sequestration,
}

/// Claim payment status (CLP02).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPaymentStatus {
    ProcessedAsPrimary,
    ProcessedAsSecondary,
    ProcessedAsTertiary,
    Denied,
    ProcessedAsPrimaryForwarded,
    ProcessedAsSecondaryForwarded,
    ProcessedAsTertiaryForwarded,
    Reversal,
    NotOurClaimForwarded,
    PredeterminationPricingOnly,
}

/// Payment method (BPR04).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Ach,
    FinancialInstitutionOption,
    Check,
    Wire,
    NonPayment,
}

/// One CAS adjustment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub group: Coded<AdjustmentGroup>,
    pub reason: Coded<AdjustmentReason>,
    pub amount: Money,
    pub quantity: Option<Decimal>,
}

impl Adjustment {
    fn is_group(&self, group: AdjustmentGroup) -> bool {
        self.group.known() == Some(&group)
    }
}

/// Payment detail for one service line (SVC loop).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceLinePayment {
    pub procedure: Option<ClinicalCode>,
    pub modifiers: Vec<String>,
    pub charge: Money,
    pub paid: Money,
    pub units: Option<Decimal>,
    pub service_date: Option<NaiveDate>,
    /// Line item control number (REF*6R) echoed from the claim.
    pub line_control_number: Option<String>,
    pub adjustments: Vec<Adjustment>,
}

/// How the payer disposed of a claim, as far as the lifecycle is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceOutcome {
    Paid,
    PartiallyPaid,
    Denied,
}

/// Payment for one claim (CLP loop).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimPayment {
    /// Patient control number (CLP01).
    pub claim_id: String,
    pub status: Coded<ClaimPaymentStatus>,
    pub charge: Money,
    pub paid: Money,
    pub patient_responsibility: Option<Money>,
    pub payer_claim_control_number: Option<String>,
    pub adjustments: Vec<Adjustment>,
    pub lines: Vec<ServiceLinePayment>,
}

impl ClaimPayment {
    /// Claim-level adjustments followed by every line adjustment.
    pub fn all_adjustments(&self) -> impl Iterator<Item = &Adjustment> {
        self.adjustments
            .iter()
            .chain(self.lines.iter().flat_map(|line| line.adjustments.iter()))
    }

    /// Amount the patient owes, from CLP05 or else the PR adjustments.
    pub fn patient_share(&self) -> Money {
        self.patient_responsibility.unwrap_or_else(|| {
            self.all_adjustments()
                .filter(|a| a.is_group(AdjustmentGroup::PatientResponsibility))
                .map(|a| a.amount)
                .sum()
        })
    }

    /// Classifies the payment.
    ///
    /// Returns `None` for reversals, predeterminations and claims forwarded as not ours, which
    /// are not adjudications of the submitted claim.
    pub fn outcome(&self) -> Option<RemittanceOutcome> {
        match self.status.known() {
            Some(
                ClaimPaymentStatus::Reversal
                | ClaimPaymentStatus::PredeterminationPricingOnly
                | ClaimPaymentStatus::NotOurClaimForwarded,
            ) => return None,
            Some(ClaimPaymentStatus::Denied) => return Some(RemittanceOutcome::Denied),
            _ => {}
        }

        let patient_share = self.patient_share();
        if self.paid.is_zero() && patient_share.is_zero() {
            return Some(RemittanceOutcome::Denied);
        }

        let contractual: Money = self
            .all_adjustments()
            .filter(|a| a.is_group(AdjustmentGroup::ContractualObligation))
            .map(|a| a.amount)
            .sum();

        if self.paid + patient_share + contractual >= self.charge {
            Some(RemittanceOutcome::Paid)
        } else {
            Some(RemittanceOutcome::PartiallyPaid)
        }
    }
}

/// Provider-level adjustment (PLB), not tied to a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderAdjustment {
    pub reason_code: String,
    pub reference: Option<String>,
    pub amount: Money,
}

/// Financial information (BPR) and reassociation trace (TRN).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentInfo {
    pub total: Money,
    pub method: Option<Coded<PaymentMethod>>,
    pub trace_number: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

/// A parsed 835.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemittanceAdvice {
    pub payment: PaymentInfo,
    pub payer_name: Option<String>,
    pub payer_id: Option<String>,
    pub payee_name: Option<String>,
    pub payee_npi: Option<String>,
    pub claims: Vec<ClaimPayment>,
    pub provider_adjustments: Vec<ProviderAdjustment>,
}

impl RemittanceAdvice {
    /// `(claim id, paid amount, adjustments)` for every claim in the remittance.
    pub fn payments(&self) -> Vec<(&str, Money, Vec<&Adjustment>)> {
        self.claims
            .iter()
            .map(|claim| {
                (
                    claim.claim_id.as_str(),
                    claim.paid,
                    claim.all_adjustments().collect(),
                )
            })
            .collect()
    }

    /// Payment total implied by the claims and provider adjustments.
    ///
    /// A balanced 835 has `payment.total == computed_total()`.
    pub fn computed_total(&self) -> Money {
        let paid: Money = self.claims.iter().map(|claim| claim.paid).sum();
        let provider: Money = self.provider_adjustments.iter().map(|plb| plb.amount).sum();
        paid - provider
    }

    pub fn claim(&self, claim_id: &str) -> Option<&ClaimPayment> {
        self.claims.iter().find(|claim| claim.claim_id == claim_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(cents: i64) -> Adjustment {
        Adjustment {
            group: Coded::Known(AdjustmentGroup::PatientResponsibility),
            reason: Coded::Known(AdjustmentReason::Deductible),
            amount: Money::from_cents(cents),
            quantity: None,
        }
    }

    fn payment(paid: i64, adjustments: Vec<Adjustment>) -> ClaimPayment {
        ClaimPayment {
            claim_id: "PCN-1".into(),
            status: Coded::Known(ClaimPaymentStatus::ProcessedAsPrimary),
            charge: Money::from_cents(10000),
            paid: Money::from_cents(paid),
            patient_responsibility: None,
            payer_claim_control_number: None,
            adjustments,
            lines: Vec::new(),
        }
    }

    #[test]
    fn deductible_only_claim_is_paid_not_denied() {
        let applied_to_deductible = payment(0, vec![pr(10000)]);
        assert_eq!(
            applied_to_deductible.outcome(),
            Some(RemittanceOutcome::Paid)
        );
    }

    #[test]
    fn zero_payment_without_patient_share_is_denied() {
        assert_eq!(payment(0, Vec::new()).outcome(), Some(RemittanceOutcome::Denied));
    }

    #[test]
    fn reversal_is_not_an_outcome() {
        let mut reversal = payment(-10000, Vec::new());
        reversal.status = Coded::Known(ClaimPaymentStatus::Reversal);
        assert_eq!(reversal.outcome(), None);
    }

    #[test]
    fn computed_total_subtracts_provider_adjustments() {
        let advice = RemittanceAdvice {
            payment: PaymentInfo {
                total: Money::from_cents(14000),
                method: Some(Coded::Known(PaymentMethod::Ach)),
                trace_number: Some("12345".into()),
                payment_date: None,
            },
            payer_name: None,
            payer_id: None,
            payee_name: None,
            payee_npi: None,
            claims: vec![payment(8000, Vec::new()), payment(7000, vec![pr(3000)])],
            provider_adjustments: vec![ProviderAdjustment {
                reason_code: "L6".into(),
                reference: None,
                amount: Money::from_cents(1000),
            }],
        };
        assert_eq!(advice.computed_total(), Money::from_cents(14000));
        let payments = advice.payments();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[1].1, Money::from_cents(7000));
        assert_eq!(payments[1].2.len(), 1);
    }
}
