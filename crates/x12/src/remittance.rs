//! Health care claim payment/advice (835).

use crate::segment::Segment;
use crate::transaction::{Handled, ParseContext, TransactionHandler};
use crate::{X12Error, X12Result};
use canonical::{
    Adjustment, ClaimPayment, ClinicalCode, ClinicalSystem, PaymentInfo, ProviderAdjustment,
    RemittanceAdvice, ServiceLinePayment,
};
use chrono::NaiveDate;
use medwire_types::{Coded, Money, RawCode, Warning};

/// Where in the 835 the walk currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Position {
    #[default]
    Header,
    Payer,
    Payee,
    Claim,
    Line,
}

#[derive(Default)]
pub(crate) struct RemittanceHandler {
    position: Position,
    total: Option<Money>,
    payment: Option<PaymentInfo>,
    production_date: Option<NaiveDate>,
    payer_name: Option<String>,
    payer_id: Option<String>,
    payee_name: Option<String>,
    payee_npi: Option<String>,
    claims: Vec<ClaimPayment>,
    provider_adjustments: Vec<ProviderAdjustment>,
}

impl RemittanceHandler {
    fn current_claim(&mut self) -> Option<&mut ClaimPayment> {
        match self.position {
            Position::Claim | Position::Line => self.claims.last_mut(),
            _ => None,
        }
    }

    fn current_line(&mut self) -> Option<&mut ServiceLinePayment> {
        match self.position {
            Position::Line => self.claims.last_mut()?.lines.last_mut(),
            _ => None,
        }
    }

    fn financial_information(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext<'_>,
    ) -> X12Result<Handled> {
        let total = ctx.required_money(segment, 2)?;
        let method = segment
            .element(4)
            .map(|code| ctx.codes.payment_method.resolve_or_warn(code, &mut ctx.warnings));
        let payment_date = ctx.date(segment, 16);
        self.total = Some(total);
        self.payment = Some(PaymentInfo {
            total,
            method,
            trace_number: self.payment.as_ref().and_then(|p| p.trace_number.clone()),
            payment_date,
        });
        Ok(Handled::Consumed)
    }

    fn claim_payment(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        let claim = ClaimPayment {
            claim_id: segment.element(1).unwrap_or_default().to_string(),
            status: ctx
                .codes
                .claim_payment_status
                .resolve_or_warn(segment.element(2).unwrap_or_default(), &mut ctx.warnings),
            charge: ctx.required_money(segment, 3)?,
            paid: ctx.required_money(segment, 4)?,
            patient_responsibility: ctx.money(segment, 5)?,
            payer_claim_control_number: segment.element(7).map(str::to_string),
            adjustments: Vec::new(),
            lines: Vec::new(),
        };
        self.claims.push(claim);
        self.position = Position::Claim;
        Ok(Handled::Consumed)
    }

    /// CAS: one group code followed by up to six reason/amount/quantity triples.
    fn adjustments(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        let group = ctx
            .codes
            .adjustment_group
            .resolve_or_warn(segment.element(1).unwrap_or_default(), &mut ctx.warnings);

        let mut adjustments = Vec::new();
        for reason_at in (2..=17).step_by(3) {
            let Some(reason) = segment.element(reason_at) else {
                continue;
            };
            adjustments.push(Adjustment {
                group: group.clone(),
                reason: ctx.codes.adjustment_reason.resolve_or_warn(reason, &mut ctx.warnings),
                amount: ctx.required_money(segment, reason_at + 1)?,
                quantity: ctx.decimal(segment, reason_at + 2),
            });
        }

        if let Some(line) = self.current_line() {
            line.adjustments.extend(adjustments);
            return Ok(Handled::Consumed);
        }
        match self.current_claim() {
            Some(claim) => {
                claim.adjustments.extend(adjustments);
                Ok(Handled::Consumed)
            }
            None => Ok(Handled::Unknown),
        }
    }

    fn service_line(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        let components = segment.components(1);
        let procedure = match components.as_slice() {
            [qualifier, code, ..] if !code.is_empty() => Some(procedure_code(qualifier, code)),
            _ => None,
        };
        let modifiers = components
            .iter()
            .skip(2)
            .take(4)
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string())
            .collect();
        let line = ServiceLinePayment {
            procedure,
            modifiers,
            charge: ctx.required_money(segment, 2)?,
            paid: ctx.required_money(segment, 3)?,
            units: ctx.decimal(segment, 5),
            service_date: None,
            line_control_number: None,
            adjustments: Vec::new(),
        };

        let Some(claim) = self.current_claim() else {
            return Ok(Handled::Unknown);
        };
        claim.lines.push(line);
        self.position = Position::Line;
        Ok(Handled::Consumed)
    }

    /// PLB: provider id, fiscal period, then up to six reason:reference / amount pairs.
    fn provider_adjustment(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext<'_>,
    ) -> X12Result<Handled> {
        for reason_at in (3..=13).step_by(2) {
            let Some(reason_code) = segment.component(reason_at, 1) else {
                continue;
            };
            self.provider_adjustments.push(ProviderAdjustment {
                reason_code: reason_code.to_string(),
                reference: segment.component(reason_at, 2).map(str::to_string),
                amount: ctx.required_money(segment, reason_at + 1)?,
            });
        }
        Ok(Handled::Consumed)
    }

    fn party(&mut self, segment: &Segment) -> Handled {
        let name = segment.element(2).map(str::to_string);
        let id = segment.element(4).map(str::to_string);
        match segment.element(1) {
            Some("PR") => {
                self.position = Position::Payer;
                self.payer_name = name;
                self.payer_id = id;
                Handled::Consumed
            }
            Some("PE") => {
                self.position = Position::Payee;
                self.payee_name = name;
                self.payee_npi = id.filter(|_| segment.is(3, "XX"));
                Handled::Consumed
            }
            _ => Handled::Ignored,
        }
    }

    fn reference(&mut self, segment: &Segment) -> Handled {
        let value = segment.element(2).map(str::to_string);
        match (self.position, segment.element(1)) {
            (Position::Payer, Some("2U")) if self.payer_id.is_none() => {
                self.payer_id = value;
                Handled::Consumed
            }
            (Position::Line, Some("6R")) => match self.current_line() {
                Some(line) => {
                    line.line_control_number = value;
                    Handled::Consumed
                }
                None => Handled::Ignored,
            },
            _ => Handled::Ignored,
        }
    }

    fn date(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> Handled {
        match (self.position, segment.element(1)) {
            (Position::Header, Some("405")) => {
                self.production_date = ctx.date(segment, 2);
                Handled::Consumed
            }
            (Position::Line, Some("472" | "150")) => {
                let date = ctx.date(segment, 2);
                match self.current_line() {
                    Some(line) => {
                        if line.service_date.is_none() {
                            line.service_date = date;
                        }
                        Handled::Consumed
                    }
                    None => Handled::Ignored,
                }
            }
            _ => Handled::Ignored,
        }
    }
}

/// Procedure code of an SVC01 composite. `HC` codes of five digits are CPT, others HCPCS.
fn procedure_code(qualifier: &str, code: &str) -> ClinicalCode {
    match qualifier {
        "HC" if code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit()) => {
            ClinicalCode::new(ClinicalSystem::Cpt, code)
        }
        "HC" => ClinicalCode::new(ClinicalSystem::Hcpcs, code),
        other => ClinicalCode {
            system: Coded::Unknown(RawCode::new(format!("SVC01-1:{other}"), code)),
            code: code.to_string(),
            display: None,
        },
    }
}

impl TransactionHandler for RemittanceHandler {
    type Output = RemittanceAdvice;

    fn handle(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        Ok(match segment.tag.as_str() {
            "BPR" => self.financial_information(segment, ctx)?,
            "TRN" => {
                let trace = segment.element(2).map(str::to_string);
                match self.payment.as_mut() {
                    Some(payment) => payment.trace_number = trace,
                    None => {
                        self.payment = Some(PaymentInfo {
                            total: Money::ZERO,
                            method: None,
                            trace_number: trace,
                            payment_date: None,
                        })
                    }
                }
                Handled::Consumed
            }
            "N1" => self.party(segment),
            "REF" => self.reference(segment),
            "DTM" => self.date(segment, ctx),
            "CLP" => self.claim_payment(segment, ctx)?,
            "CAS" => self.adjustments(segment, ctx)?,
            "SVC" => self.service_line(segment, ctx)?,
            "PLB" => {
                self.position = Position::Header;
                self.provider_adjustment(segment, ctx)?
            }
            "LX" | "TS3" | "TS2" | "MIA" | "MOA" | "NM1" | "N3" | "N4" | "PER" | "AMT" | "QTY"
            | "LQ" | "RDM" | "CUR" => Handled::Ignored,
            _ => Handled::Unknown,
        })
    }

    fn finish(self, ctx: &mut ParseContext<'_>) -> X12Result<RemittanceAdvice> {
        let Some(total) = self.total else {
            return Err(X12Error::IncompleteRecord {
                record: "RemittanceAdvice",
                field: "BPR02".into(),
            });
        };
        let mut payment = self.payment.unwrap_or(PaymentInfo {
            total,
            method: None,
            trace_number: None,
            payment_date: None,
        });
        if payment.payment_date.is_none() {
            payment.payment_date = self.production_date;
        }

        let advice = RemittanceAdvice {
            payment,
            payer_name: self.payer_name,
            payer_id: self.payer_id,
            payee_name: self.payee_name,
            payee_npi: self.payee_npi,
            claims: self.claims,
            provider_adjustments: self.provider_adjustments,
        };

        let computed = advice.computed_total();
        if computed != advice.payment.total {
            tracing::warn!(
                declared = %advice.payment.total,
                computed = %computed,
                "835 payment total does not balance"
            );
            ctx.warnings.push(Warning::BalanceMismatch {
                context: "BPR02".into(),
                declared: advice.payment.total,
                computed,
            });
        }
        tracing::debug!(claims = advice.claims.len(), "parsed 835 remittance");
        Ok(advice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::parse_remittance;
    use crate::transaction::tests::interchange;
    use canonical::{
        AdjustmentGroup, AdjustmentReason, ClaimPaymentStatus, PaymentMethod, RemittanceOutcome,
    };
    use codes::CodeSystems;

    const ADVICE: &[&str] = &[
        "BPR*I*182.5*C*ACH*CCP*01*999999992*DA*123456*1512345678**01*999988880*DA*98765*20240315",
        "TRN*1*EFT-20240315-1*1512345678",
        "DTM*405*20240314",
        "N1*PR*ACME HEALTH",
        "N3*PO BOX 100",
        "N4*SPRINGFIELD*IL*62701",
        "REF*2U*60054",
        "N1*PE*RIVERSIDE CLINIC*XX*1234567893",
        "LX*1",
        "CLP*PCN-1001*1*150.75*120*20*12*PAYER-CCN-1",
        "NM1*QC*1*DOE*JOHN****MI*W123456789",
        "SVC*HC:99213:25*125*100**1",
        "DTM*472*20240220",
        "CAS*CO*45*5",
        "CAS*PR*3*20",
        "REF*6R*LINE-1",
        "SVC*HC:J3301*25.75*20",
        "CAS*CO*45*5.75",
        "CLP*PCN-1002*4*80*0*0*12*PAYER-CCN-2",
        "CAS*CO*50*80",
        "CLP*PCN-1003*1*100*62.5**12*PAYER-CCN-3",
        "CAS*PR*1*37.5",
        "PLB*1234567893*20241231*WO:OVERPAY-1*0",
    ];

    fn parse(body: &[&str]) -> medwire_types::Decoded<RemittanceAdvice> {
        let text = interchange("835", "HP", &[body]);
        parse_remittance(text.as_bytes(), CodeSystems::standard()).expect("parse")
    }

    #[test]
    fn parses_payment_claims_and_lines() {
        let decoded = parse(ADVICE);
        assert!(decoded.warnings.is_empty(), "{:?}", decoded.warnings);
        let advice = decoded.value;

        assert_eq!(advice.payment.total, Money::from_cents(18250));
        assert_eq!(advice.payment.method, Some(Coded::Known(PaymentMethod::Ach)));
        assert_eq!(advice.payment.trace_number.as_deref(), Some("EFT-20240315-1"));
        assert_eq!(advice.payment.payment_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(advice.payer_name.as_deref(), Some("ACME HEALTH"));
        assert_eq!(advice.payer_id.as_deref(), Some("60054"));
        assert_eq!(advice.payee_npi.as_deref(), Some("1234567893"));
        assert_eq!(advice.claims.len(), 3);
        assert_eq!(advice.computed_total(), advice.payment.total);

        let paid = advice.claim("PCN-1001").expect("claim");
        assert_eq!(paid.status, Coded::Known(ClaimPaymentStatus::ProcessedAsPrimary));
        assert_eq!(paid.patient_responsibility, Some(Money::from_cents(2000)));
        assert_eq!(paid.payer_claim_control_number.as_deref(), Some("PAYER-CCN-1"));
        assert!(paid.adjustments.is_empty());
        assert_eq!(paid.lines.len(), 2);

        let office = &paid.lines[0];
        assert!(office.procedure.as_ref().is_some_and(|p| p.is_system(ClinicalSystem::Cpt)));
        assert_eq!(office.modifiers, vec!["25".to_string()]);
        assert_eq!(office.units, Some(rust_decimal::Decimal::ONE));
        assert_eq!(office.service_date, NaiveDate::from_ymd_opt(2024, 2, 20));
        assert_eq!(office.line_control_number.as_deref(), Some("LINE-1"));
        assert_eq!(office.adjustments.len(), 2);
        assert_eq!(
            office.adjustments[1].group,
            Coded::Known(AdjustmentGroup::PatientResponsibility)
        );
        assert_eq!(
            office.adjustments[1].reason,
            Coded::Known(AdjustmentReason::Copayment)
        );
        assert!(paid.lines[1]
            .procedure
            .as_ref()
            .is_some_and(|p| p.is_system(ClinicalSystem::Hcpcs)));
        assert_eq!(paid.outcome(), Some(RemittanceOutcome::Paid));

        let denied = advice.claim("PCN-1002").expect("claim");
        assert_eq!(denied.outcome(), Some(RemittanceOutcome::Denied));
        assert_eq!(
            denied.adjustments[0].reason,
            Coded::Known(AdjustmentReason::NotMedicallyNecessary)
        );

        let deductible = advice.claim("PCN-1003").expect("claim");
        assert_eq!(deductible.patient_share(), Money::from_cents(3750));

        assert_eq!(
            advice.provider_adjustments,
            vec![ProviderAdjustment {
                reason_code: "WO".into(),
                reference: Some("OVERPAY-1".into()),
                amount: Money::ZERO,
            }]
        );
    }

    #[test]
    fn unbalanced_total_is_a_warning() {
        let body: &[&str] = &[
            "BPR*I*100*C*CHK",
            "CLP*PCN-1*1*100*90",
            "PLB*1234567893*20241231*L6*-5",
        ];
        let decoded = parse(body);
        assert_eq!(
            decoded.warnings,
            vec![Warning::BalanceMismatch {
                context: "BPR02".into(),
                declared: Money::from_cents(10000),
                computed: Money::from_cents(9500),
            }]
        );
    }

    #[test]
    fn unknown_reason_code_is_kept_raw() {
        let body: &[&str] = &["BPR*I*0*C*NON", "CLP*PCN-1*1*100*0", "CAS*CO*B7*100"];
        let decoded = parse(body);
        let adjustment = &decoded.value.claims[0].adjustments[0];
        assert_eq!(adjustment.reason, Coded::Unknown(RawCode::new("CARC", "B7")));
        assert!(matches!(
            decoded.warnings.as_slice(),
            [Warning::UnmappedExternalCode { code, .. }] if code == "B7"
        ));
    }

    #[test]
    fn missing_bpr_fails() {
        let body: &[&str] = &["CLP*PCN-1*1*100*0"];
        let text = interchange("835", "HP", &[body]);
        assert_eq!(
            parse_remittance(text.as_bytes(), CodeSystems::standard()).expect_err("no BPR"),
            X12Error::IncompleteRecord {
                record: "RemittanceAdvice",
                field: "BPR02".into()
            }
        );
    }
}
