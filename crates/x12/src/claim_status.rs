//! Claim status report (277).
//!
//! Each TRN opens the report for one claim. Only claim-level STC segments are kept; once an SVC
//! opens a service line, status segments up to the next claim belong to that line and are skipped.

use crate::segment::Segment;
use crate::transaction::{Handled, ParseContext, TransactionHandler};
use crate::X12Result;
use canonical::{ClaimStatusUpdate, StatusDetail};

#[derive(Default)]
pub(crate) struct ClaimStatusHandler {
    updates: Vec<ClaimStatusUpdate>,
    current: Option<ClaimStatusUpdate>,
    in_line: bool,
}

impl ClaimStatusHandler {
    fn close(&mut self) {
        if let Some(update) = self.current.take() {
            self.updates.push(update);
        }
        self.in_line = false;
    }

    fn status(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        let Some(update) = self.current.as_mut() else {
            return Ok(Handled::Unknown);
        };
        if self.in_line {
            return Ok(Handled::Ignored);
        }

        for n in [1, 10, 11] {
            let Some(category) = segment.component(n, 1) else {
                continue;
            };
            update.statuses.push(StatusDetail {
                category: ctx
                    .codes
                    .claim_status_category
                    .resolve_or_warn(category, &mut ctx.warnings),
                status_code: segment.component(n, 2).map(str::to_string),
                entity_code: segment.component(n, 3).map(str::to_string),
            });
        }

        if let Some(date) = ctx.date(segment, 2) {
            update.effective_date = Some(date);
        }
        if let Some(charge) = ctx.money(segment, 4)? {
            update.total_charge = Some(charge);
        }
        if let Some(paid) = ctx.money(segment, 5)? {
            update.paid_amount = Some(paid);
        }
        Ok(Handled::Consumed)
    }
}

impl TransactionHandler for ClaimStatusHandler {
    type Output = Vec<ClaimStatusUpdate>;

    fn handle(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        Ok(match segment.tag.as_str() {
            "TRN" => {
                self.close();
                self.current = Some(ClaimStatusUpdate {
                    claim_id: segment.element(2).map(str::to_string),
                    trace_number: segment.element(2).map(str::to_string),
                    ..ClaimStatusUpdate::default()
                });
                Handled::Consumed
            }
            "STC" => self.status(segment, ctx)?,
            "REF" => match (self.current.as_mut(), self.in_line) {
                (Some(update), false) => match segment.element(1) {
                    Some("EJ") => {
                        update.claim_id = segment.element(2).map(str::to_string);
                        Handled::Consumed
                    }
                    Some("1K") => {
                        update.payer_claim_control_number = segment.element(2).map(str::to_string);
                        Handled::Consumed
                    }
                    _ => Handled::Ignored,
                },
                _ => Handled::Ignored,
            },
            "SVC" => {
                self.in_line = true;
                Handled::Ignored
            }
            "HL" => {
                // A new hierarchical level closes the current claim's service lines.
                self.in_line = false;
                Handled::Ignored
            }
            "BHT" | "NM1" | "PER" | "DTP" | "QTY" | "AMT" | "DMG" => Handled::Ignored,
            _ => Handled::Unknown,
        })
    }

    fn finish(mut self, _ctx: &mut ParseContext<'_>) -> X12Result<Vec<ClaimStatusUpdate>> {
        self.close();
        tracing::debug!(claims = self.updates.len(), "parsed 277 claim status");
        Ok(self.updates)
    }
}

#[cfg(test)]
mod tests {
    use crate::transaction::parse_claim_status;
    use crate::transaction::tests::interchange;
    use crate::X12Error;
    use canonical::ClaimStatusCategory;
    use chrono::NaiveDate;
    use codes::CodeSystems;
    use medwire_types::{Coded, Money, RawCode, Warning};

    const REPORT: &[&str] = &[
        "BHT*0010*08*277-1*20240310*1015*DG",
        "HL*1**20*1",
        "NM1*PR*2*ACME HEALTH*****PI*60054",
        "HL*2*1*21*1",
        "NM1*41*2*RIVERSIDE CLINIC*****46*S12345",
        "HL*3*2*19*1",
        "NM1*1P*2*RIVERSIDE CLINIC*****XX*1234567893",
        "HL*4*3*PT",
        "NM1*QC*1*DOE*JOHN****MI*W123456789",
        "TRN*2*TRACE-1",
        "STC*F1:65*20240309**150.75*120",
        "REF*1K*PAYER-CCN-1",
        "REF*EJ*PCN-1001",
        "SVC*HC:99213*125*100",
        "STC*F2:96*20240309",
        "HL*5*3*PT",
        "NM1*QC*1*ROE*RICHARD****MI*W987654321",
        "TRN*2*PCN-1002",
        "STC*A7:21:QC*20240308*U*80******A3:562",
    ];

    #[test]
    fn parses_claim_level_statuses() {
        let text = interchange("277", "HN", &[REPORT]);
        let decoded = parse_claim_status(text.as_bytes(), CodeSystems::standard()).expect("parse");
        assert!(decoded.warnings.is_empty(), "{:?}", decoded.warnings);

        let updates = decoded.value;
        assert_eq!(updates.len(), 2);

        let paid = &updates[0];
        assert_eq!(paid.claim_id.as_deref(), Some("PCN-1001"));
        assert_eq!(paid.trace_number.as_deref(), Some("TRACE-1"));
        assert_eq!(paid.payer_claim_control_number.as_deref(), Some("PAYER-CCN-1"));
        assert_eq!(paid.statuses.len(), 1);
        assert_eq!(paid.primary_category(), Some(ClaimStatusCategory::FinalizedPayment));
        assert_eq!(paid.statuses[0].status_code.as_deref(), Some("65"));
        assert_eq!(paid.effective_date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(paid.total_charge, Some(Money::from_cents(15075)));
        assert_eq!(paid.paid_amount, Some(Money::from_cents(12000)));

        let rejected = &updates[1];
        assert_eq!(rejected.claim_id.as_deref(), Some("PCN-1002"));
        assert_eq!(rejected.primary_category(), Some(ClaimStatusCategory::InvalidInformation));
        assert_eq!(rejected.statuses.len(), 2);
        assert_eq!(rejected.statuses[0].entity_code.as_deref(), Some("QC"));
        assert_eq!(
            rejected.statuses[1].category,
            Coded::Known(ClaimStatusCategory::ReturnedUnprocessable)
        );
    }

    #[test]
    fn unknown_category_is_kept_raw() {
        let body: &[&str] = &["TRN*2*PCN-1", "STC*Z9:1*20240309"];
        let text = interchange("277", "HN", &[body]);
        let decoded = parse_claim_status(text.as_bytes(), CodeSystems::standard()).expect("parse");
        assert_eq!(
            decoded.value[0].statuses[0].category,
            Coded::Unknown(RawCode::new("STC01-1", "Z9"))
        );
        assert!(matches!(
            decoded.warnings.as_slice(),
            [Warning::UnmappedExternalCode { code, .. }] if code == "Z9"
        ));
    }

    #[test]
    fn updates_from_every_277_are_collected() {
        let first: &[&str] = &["TRN*2*PCN-1", "STC*A1:20*20240309"];
        let second: &[&str] = &["TRN*2*PCN-2", "STC*P1:20*20240309"];
        let text = interchange("277", "HN", &[first, second]);
        let updates = parse_claim_status(text.as_bytes(), CodeSystems::standard())
            .expect("parse")
            .value;
        let ids: Vec<_> = updates.iter().filter_map(|u| u.claim_id.as_deref()).collect();
        assert_eq!(ids, ["PCN-1", "PCN-2"]);
    }

    #[test]
    fn bad_amount_fails_the_transaction() {
        let body: &[&str] = &["TRN*2*PCN-1", "STC*F1:65*20240309**12,50"];
        let text = interchange("277", "HN", &[body]);
        assert!(matches!(
            parse_claim_status(text.as_bytes(), CodeSystems::standard()),
            Err(X12Error::InvalidAmount { element: 4, .. })
        ));
    }
}
