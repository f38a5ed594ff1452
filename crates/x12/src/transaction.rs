//! Inbound transaction parsing.
//!
//! Each supported transaction set has a handler that walks the segments in order and accumulates
//! a canonical record. [`run`] applies the segment schema before a handler sees a segment, and
//! turns segments the handler does not recognise into `UnknownSegment` warnings.

use crate::claim_status::ClaimStatusHandler;
use crate::eligibility::EligibilityHandler;
use crate::reader::{read_interchange, RawTransaction};
use crate::remittance::RemittanceHandler;
use crate::schema::spec_for;
use crate::segment::Segment;
use crate::{X12Error, X12Result};
use canonical::{ClaimStatusUpdate, EligibilityResponse, RemittanceAdvice};
use chrono::NaiveDate;
use codes::CodeSystems;
use medwire_types::{Decoded, Money, Warning};
use rust_decimal::Decimal;
use std::str::FromStr;

// ============================================================================
// Handler framework
// ============================================================================

/// What a handler did with a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Handled {
    Consumed,
    /// A segment that belongs to the transaction but carries nothing the codec keeps.
    Ignored,
    Unknown,
}

/// Shared state for one transaction walk.
pub(crate) struct ParseContext<'a> {
    pub codes: &'a CodeSystems,
    pub warnings: Vec<Warning>,
}

impl ParseContext<'_> {
    /// Reads an amount element. A value that is present but not a plain decimal is fatal.
    pub fn money(&self, segment: &Segment, n: usize) -> X12Result<Option<Money>> {
        segment
            .element(n)
            .map(|value| {
                Money::parse(value).map_err(|_| X12Error::InvalidAmount {
                    tag: segment.tag.clone(),
                    element: n,
                    position: segment.position,
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    /// Like [`ParseContext::money`] for an element the schema marks as required.
    pub fn required_money(&self, segment: &Segment, n: usize) -> X12Result<Money> {
        self.money(segment, n)?
            .ok_or_else(|| X12Error::MalformedSegment {
                tag: segment.tag.clone(),
                position: segment.position,
                reason: format!("{}{n:02} is empty", segment.tag),
            })
    }

    /// Reads a non-monetary decimal (quantity, percentage); a bad value is kept out with a warning.
    pub fn decimal(&mut self, segment: &Segment, n: usize) -> Option<Decimal> {
        let value = segment.element(n)?;
        match Decimal::from_str(value) {
            Ok(decimal) => Some(decimal),
            Err(_) => {
                self.unparsed(segment, n, value);
                None
            }
        }
    }

    /// Reads a `CCYYMMDD` date, or the start of a `CCYYMMDD-CCYYMMDD` range.
    pub fn date(&mut self, segment: &Segment, n: usize) -> Option<NaiveDate> {
        let value = segment.element(n)?;
        let first = value.split('-').next().unwrap_or(value);
        match NaiveDate::parse_from_str(first, "%Y%m%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.unparsed(segment, n, value);
                None
            }
        }
    }

    fn unparsed(&mut self, segment: &Segment, n: usize, value: &str) {
        let path = format!("{}{n:02}", segment.tag);
        tracing::warn!(path = %path, value, "could not interpret X12 element");
        self.warnings.push(Warning::UnparsedValue {
            path,
            value: value.to_string(),
        });
    }
}

/// Per-transaction segment handler.
pub(crate) trait TransactionHandler {
    type Output;

    fn handle(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled>;

    fn finish(self, ctx: &mut ParseContext<'_>) -> X12Result<Self::Output>;
}

/// Walks the body of `tx` through `handler`.
pub(crate) fn run<H: TransactionHandler>(
    mut handler: H,
    tx: &RawTransaction,
    codes: &CodeSystems,
) -> X12Result<Decoded<H::Output>> {
    let mut ctx = ParseContext {
        codes,
        warnings: Vec::new(),
    };

    for segment in &tx.segments {
        if let Some(spec) = spec_for(&segment.tag) {
            let present = |n: usize| segment.element(n).is_some();
            if let Some(reason) = spec.violation(segment.element_count(), present) {
                return Err(X12Error::MalformedSegment {
                    tag: segment.tag.clone(),
                    position: segment.position,
                    reason,
                });
            }
        }

        match handler.handle(segment, &mut ctx)? {
            Handled::Consumed => {}
            Handled::Ignored => {
                tracing::debug!(tag = %segment.tag, position = segment.position, "ignored segment");
            }
            Handled::Unknown => {
                tracing::warn!(tag = %segment.tag, position = segment.position, "skipping unknown segment");
                ctx.warnings.push(Warning::UnknownSegment {
                    tag: segment.tag.clone(),
                    position: segment.position,
                });
            }
        }
    }

    let output = handler.finish(&mut ctx)?;
    Ok(Decoded::with_warnings(output, ctx.warnings))
}

// ============================================================================
// Dispatch
// ============================================================================

/// A parsed inbound transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedTransaction {
    Eligibility(EligibilityResponse),
    ClaimStatus(Vec<ClaimStatusUpdate>),
    Remittance(RemittanceAdvice),
}

/// The result of parsing one transaction of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionOutcome {
    pub set_id: String,
    pub control_number: String,
    pub result: X12Result<Decoded<ParsedTransaction>>,
}

/// Parses one transaction according to its ST01.
///
/// # Errors
///
/// Returns `UnsupportedTransaction` for a set other than 271, 277 or 835, and any fatal error of
/// the transaction's handler.
pub fn parse_transaction(
    tx: &RawTransaction,
    codes: &CodeSystems,
) -> X12Result<Decoded<ParsedTransaction>> {
    match tx.set_id.as_str() {
        "271" => Ok(run(EligibilityHandler::default(), tx, codes)?
            .map(ParsedTransaction::Eligibility)),
        "277" => Ok(run(ClaimStatusHandler::default(), tx, codes)?
            .map(ParsedTransaction::ClaimStatus)),
        "835" => Ok(run(RemittanceHandler::default(), tx, codes)?
            .map(ParsedTransaction::Remittance)),
        other => Err(X12Error::UnsupportedTransaction(other.to_string())),
    }
}

/// Parses every transaction of an interchange independently.
///
/// A fatal error in one transaction is recorded in its [`TransactionOutcome`] and does not stop
/// the others. Envelope warnings are returned on the outer value.
///
/// # Errors
///
/// Fails only when the interchange itself cannot be tokenized.
pub fn parse_interchange(
    input: &[u8],
    codes: &CodeSystems,
) -> X12Result<Decoded<Vec<TransactionOutcome>>> {
    let decoded = read_interchange(input)?;
    Ok(decoded.map(|interchange| {
        interchange
            .transactions
            .iter()
            .map(|tx| {
                let result = parse_transaction(tx, codes);
                if let Err(err) = &result {
                    tracing::warn!(control = %tx.control_number, error = %err, "transaction failed to parse");
                }
                TransactionOutcome {
                    set_id: tx.set_id.clone(),
                    control_number: tx.control_number.clone(),
                    result,
                }
            })
            .collect()
    }))
}

/// Reads the transactions of one set from an interchange, merging envelope warnings in.
fn transactions_of<T>(
    input: &[u8],
    set_id: &'static str,
    codes: &CodeSystems,
    parse: impl Fn(&RawTransaction, &CodeSystems) -> X12Result<Decoded<T>>,
) -> X12Result<Decoded<Vec<T>>> {
    let Decoded {
        value: interchange,
        mut warnings,
    } = read_interchange(input)?;

    let mut values = Vec::new();
    for tx in interchange.transactions.iter() {
        if tx.set_id != set_id {
            warnings.push(Warning::UnknownSegment {
                tag: format!("ST*{}", tx.set_id),
                position: tx.position,
            });
            continue;
        }
        let decoded = parse(tx, codes)?;
        warnings.extend(decoded.warnings);
        values.push(decoded.value);
    }

    if values.is_empty() {
        return Err(X12Error::MissingTransaction(set_id));
    }
    Ok(Decoded::with_warnings(values, warnings))
}

/// Reads the first transaction of one set from an interchange.
///
/// Later transactions of the same set are not parsed; each leaves a `SkippedTransaction`
/// warning so the caller can reach for the batch reader.
fn first_transaction_of<T>(
    input: &[u8],
    set_id: &'static str,
    codes: &CodeSystems,
    parse: impl Fn(&RawTransaction, &CodeSystems) -> X12Result<Decoded<T>>,
) -> X12Result<Decoded<T>> {
    let Decoded {
        value: interchange,
        mut warnings,
    } = read_interchange(input)?;

    let mut parsed = None;
    for tx in interchange.transactions.iter() {
        if tx.set_id != set_id {
            warnings.push(Warning::UnknownSegment {
                tag: format!("ST*{}", tx.set_id),
                position: tx.position,
            });
        } else if parsed.is_none() {
            let decoded = parse(tx, codes)?;
            warnings.extend(decoded.warnings);
            parsed = Some(decoded.value);
        } else {
            tracing::warn!(set_id, control = %tx.control_number, "leaving further transaction unparsed");
            warnings.push(Warning::SkippedTransaction {
                set_id: tx.set_id.clone(),
                control_number: tx.control_number.clone(),
                position: tx.position,
            });
        }
    }

    match parsed {
        Some(value) => Ok(Decoded::with_warnings(value, warnings)),
        None => Err(X12Error::MissingTransaction(set_id)),
    }
}

/// Parses the first 271 of an interchange.
///
/// # Errors
///
/// Returns `MissingTransaction` when the interchange holds no 271, or a fatal error of the
/// first 271.
pub fn parse_eligibility_response(
    input: &[u8],
    codes: &CodeSystems,
) -> X12Result<Decoded<EligibilityResponse>> {
    first_transaction_of(input, "271", codes, |tx, codes| {
        run(EligibilityHandler::default(), tx, codes)
    })
}

/// Parses every 277 of an interchange into one list of claim status updates.
///
/// # Errors
///
/// Returns `MissingTransaction` when the interchange holds no 277, or the first fatal error.
pub fn parse_claim_status(
    input: &[u8],
    codes: &CodeSystems,
) -> X12Result<Decoded<Vec<ClaimStatusUpdate>>> {
    let decoded = transactions_of(input, "277", codes, |tx, codes| {
        run(ClaimStatusHandler::default(), tx, codes)
    })?;
    Ok(decoded.map(|updates| updates.into_iter().flatten().collect()))
}

/// Parses the first 835 of an interchange.
///
/// Files carrying several 835s belong with [`parse_interchange`]; here every further 835 is
/// reported as a `SkippedTransaction` warning.
///
/// # Errors
///
/// Returns `MissingTransaction` when the interchange holds no 835, or a fatal error of the
/// first 835.
pub fn parse_remittance(
    input: &[u8],
    codes: &CodeSystems,
) -> X12Result<Decoded<RemittanceAdvice>> {
    first_transaction_of(input, "835", codes, |tx, codes| {
        run(RemittanceHandler::default(), tx, codes)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const ISA: &str = "ISA*00*          *00*          *ZZ*PAYER          *ZZ*SUBMITTER      *240305*0900*^*00501*000000007*0*T*:~";

    /// Wraps transaction bodies (without ST/SE) in a complete interchange.
    pub(crate) fn interchange(set_id: &str, functional_id: &str, bodies: &[&[&str]]) -> String {
        let mut out = format!("{ISA}GS*{functional_id}*PAYER*SUBMITTER*20240305*0900*7*X*005010~");
        for (i, body) in bodies.iter().enumerate() {
            let control = format!("{:04}", i + 1);
            out.push_str(&format!("ST*{set_id}*{control}~"));
            for segment in body.iter() {
                out.push_str(segment);
                out.push('~');
            }
            out.push_str(&format!("SE*{}*{control}~", body.len() + 2));
        }
        out.push_str(&format!("GE*{}*7~IEA*1*000000007~", bodies.len()));
        out
    }

    #[test]
    fn one_malformed_transaction_does_not_abort_the_batch() {
        let good: &[&str] = &["BPR*I*100*C*CHK", "CLP*PCN-1*1*100*100"];
        let bad: &[&str] = &["BPR*I*100*C*CHK", "CLP*PCN-2*1*ABC*100"];
        let text = interchange("835", "HP", &[good, bad, good]);
        let decoded = parse_interchange(text.as_bytes(), CodeSystems::standard()).expect("read");

        assert_eq!(decoded.value.len(), 3);
        assert!(decoded.value[0].result.is_ok());
        assert!(matches!(
            decoded.value[1].result,
            Err(X12Error::InvalidAmount { ref value, .. }) if value == "ABC"
        ));
        assert!(decoded.value[2].result.is_ok());
    }

    #[test]
    fn single_remittance_read_reports_further_835s() {
        let first: &[&str] = &["BPR*I*100*C*CHK", "CLP*PCN-1*1*100*100"];
        let second: &[&str] = &["BPR*I*200*C*CHK", "CLP*PCN-2*1*200*200"];
        let text = interchange("835", "HP", &[first, second]);
        let decoded = parse_remittance(text.as_bytes(), CodeSystems::standard()).expect("parse");

        let claims: Vec<&str> = decoded
            .value
            .claims
            .iter()
            .map(|claim| claim.claim_id.as_str())
            .collect();
        assert_eq!(claims, ["PCN-1"]);
        assert_eq!(decoded.warnings.len(), 1);
        assert!(matches!(
            &decoded.warnings[0],
            Warning::SkippedTransaction { set_id, control_number, .. }
                if set_id == "835" && control_number == "0002"
        ));
    }

    #[test]
    fn malformed_later_835_does_not_fail_the_first() {
        let good: &[&str] = &["BPR*I*100*C*CHK", "CLP*PCN-1*1*100*100"];
        let bad: &[&str] = &["BPR*I*200*C*CHK", "CLP*PCN-2*1*ABC*200"];
        let text = interchange("835", "HP", &[good, bad]);
        let decoded = parse_remittance(text.as_bytes(), CodeSystems::standard())
            .expect("first 835 parses");

        assert_eq!(decoded.value.claims.len(), 1);
        assert_eq!(decoded.value.claims[0].claim_id, "PCN-1");
        assert!(decoded.warnings.iter().any(|warning| matches!(
            warning,
            Warning::SkippedTransaction { control_number, .. } if control_number == "0002"
        )));
    }

    #[test]
    fn single_eligibility_read_reports_further_271s() {
        let body: &[&str] = &["EB*1**30"];
        let text = interchange("271", "HB", &[body, body, body]);
        let decoded = parse_eligibility_response(text.as_bytes(), CodeSystems::standard())
            .expect("parse");

        assert!(decoded.value.eligible);
        let skipped: Vec<&str> = decoded
            .warnings
            .iter()
            .filter_map(|warning| match warning {
                Warning::SkippedTransaction { control_number, .. } => {
                    Some(control_number.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(skipped, ["0002", "0003"]);
    }

    #[test]
    fn wrong_element_count_is_malformed() {
        let body: &[&str] = &["BPR*I*100*C*CHK", "CLP*PCN-1*1"];
        let text = interchange("835", "HP", &[body]);
        let err = parse_remittance(text.as_bytes(), CodeSystems::standard()).expect_err("fatal");
        assert!(matches!(err, X12Error::MalformedSegment { ref tag, .. } if tag == "CLP"));
    }

    #[test]
    fn unsupported_and_missing_sets() {
        let body: &[&str] = &["BHT*0019*00*X*20240305*0900*CH"];
        let text = interchange("837", "HC", &[body]);
        let decoded = parse_interchange(text.as_bytes(), CodeSystems::standard()).expect("read");
        assert_eq!(
            decoded.value[0].result,
            Err(X12Error::UnsupportedTransaction("837".into()))
        );
        assert_eq!(
            parse_remittance(text.as_bytes(), CodeSystems::standard()).expect_err("none"),
            X12Error::MissingTransaction("835")
        );
    }
}
