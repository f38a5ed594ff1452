//! Claim status reports (277).

use chrono::NaiveDate;
use medwire_types::{Coded, Money};
use serde::Serialize;

/// Health care claim status category (STC01-1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatusCategory {
    Forwarded,
    Acknowledged,
    AcceptedIntoAdjudication,
    ReturnedUnprocessable,
    NotFound,
    SplitClaim,
    MissingInformation,
    InvalidInformation,
    RelationalFieldError,
    PendingAdjudication,
    PendingInProcess,
    PendingPayerReview,
    PendingProviderInformation,
    PendingPatientInformation,
    Finalized,
    FinalizedPayment,
    FinalizedDenial,
    FinalizedRevised,
    FinalizedNoPayment,
    RequestForInformation,
    ResponseNotPossible,
    SystemUnavailable,
}

/// What a status category means for the claim lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategoryKind {
    Acknowledgement,
    Rejection,
    Pending,
    Finalized,
    Error,
}

impl ClaimStatusCategory {
    pub fn kind(self) -> StatusCategoryKind {
        use ClaimStatusCategory::*;

        match self {
            Forwarded | Acknowledged | AcceptedIntoAdjudication | SplitClaim => {
                StatusCategoryKind::Acknowledgement
            }
            ReturnedUnprocessable | NotFound | MissingInformation | InvalidInformation
            | RelationalFieldError => StatusCategoryKind::Rejection,
            PendingAdjudication
            | PendingInProcess
            | PendingPayerReview
            | PendingProviderInformation
            | PendingPatientInformation
            | RequestForInformation => StatusCategoryKind::Pending,
            Finalized | FinalizedPayment | FinalizedDenial | FinalizedRevised
            | FinalizedNoPayment => StatusCategoryKind::Finalized,
            ResponseNotPossible | SystemUnavailable => StatusCategoryKind::Error,
        }
    }
}

/// One STC composite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusDetail {
    pub category: Coded<ClaimStatusCategory>,
    /// Claim status code (code list 507), carried verbatim.
    pub status_code: Option<String>,
    /// Entity identifier the status refers to.
    pub entity_code: Option<String>,
}

/// Status reported by the payer for one claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClaimStatusUpdate {
    /// Patient control number echoed back by the payer.
    pub claim_id: Option<String>,
    pub trace_number: Option<String>,
    pub payer_claim_control_number: Option<String>,
    pub statuses: Vec<StatusDetail>,
    pub effective_date: Option<NaiveDate>,
    pub total_charge: Option<Money>,
    pub paid_amount: Option<Money>,
}

impl ClaimStatusUpdate {
    /// The first recognised status category.
    pub fn primary_category(&self) -> Option<ClaimStatusCategory> {
        self.statuses
            .iter()
            .find_map(|status| status.category.known().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medwire_types::RawCode;

    #[test]
    fn primary_category_skips_unknown_codes() {
        let update = ClaimStatusUpdate {
            statuses: vec![
                StatusDetail {
                    category: Coded::Unknown(RawCode::new("STC01-1", "Z9")),
                    status_code: None,
                    entity_code: None,
                },
                StatusDetail {
                    category: Coded::Known(ClaimStatusCategory::FinalizedPayment),
                    status_code: Some("65".into()),
                    entity_code: None,
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            update.primary_category(),
            Some(ClaimStatusCategory::FinalizedPayment)
        );
        assert_eq!(
            ClaimStatusCategory::FinalizedPayment.kind(),
            StatusCategoryKind::Finalized
        );
    }
}
