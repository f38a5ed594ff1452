//! Interchange tokenizer.
//!
//! Splits raw bytes into segments using the separators declared in the ISA header, then groups
//! them into ST/SE transactions. Envelope integrity problems (trailer counts that disagree with
//! what was received, stray segments between transactions) are reported as warnings; only an
//! unreadable envelope is fatal.

use crate::delimiters::Delimiters;
use crate::schema::spec_for;
use crate::segment::Segment;
use crate::{X12Error, X12Result};
use medwire_types::{Decoded, Warning};

/// One ST/SE transaction as received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTransaction {
    /// ST01.
    pub set_id: String,
    /// ST02.
    pub control_number: String,
    /// ST03, falling back to GS08.
    pub guide: Option<String>,
    /// Position of the ST segment within the interchange.
    pub position: usize,
    /// The segments between ST and SE.
    pub segments: Vec<Segment>,
}

/// A tokenized interchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interchange {
    pub delimiters: Delimiters,
    pub sender_id: String,
    pub receiver_id: String,
    pub control_number: String,
    pub transactions: Vec<RawTransaction>,
}

#[derive(Default)]
struct GroupState {
    guide: Option<String>,
    transactions: usize,
}

/// Tokenizes an interchange.
///
/// Whitespace (including line breaks) around segments is ignored.
///
/// # Errors
///
/// Returns `InvalidEncoding` for non-UTF-8 input and `InvalidEnvelope` when the ISA header is
/// missing or an envelope segment is malformed.
pub fn read_interchange(input: &[u8]) -> X12Result<Decoded<Interchange>> {
    let text = std::str::from_utf8(input)
        .map_err(|_| X12Error::InvalidEncoding)?
        .trim_start();
    let delimiters = Delimiters::detect(text)?;

    let mut warnings = Vec::new();
    let mut segments = text
        .split(delimiters.segment)
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .enumerate()
        .map(|(i, raw)| Segment::parse(raw, i + 1, delimiters));

    let isa = segments
        .next()
        .ok_or_else(|| X12Error::InvalidEnvelope("missing ISA segment".into()))?;
    check_envelope(&isa)?;
    let field = |n: usize| isa.raw_element(n).unwrap_or_default().trim().to_string();

    let mut interchange = Interchange {
        delimiters,
        sender_id: field(6),
        receiver_id: field(8),
        control_number: field(13),
        transactions: Vec::new(),
    };

    let mut group: Option<GroupState> = None;
    let mut groups = 0usize;
    let mut open: Option<RawTransaction> = None;
    let mut closed = false;

    for segment in segments {
        if closed {
            unknown(&segment, &mut warnings);
            continue;
        }

        match segment.tag.as_str() {
            "GS" => {
                check_envelope(&segment)?;
                groups += 1;
                group = Some(GroupState {
                    guide: segment.element(8).map(str::to_string),
                    transactions: 0,
                });
            }
            "ST" => {
                check_envelope(&segment)?;
                if let Some(unclosed) = open.take() {
                    close_missing(unclosed, &mut interchange, &mut warnings);
                }
                let group_guide = group.as_ref().and_then(|g| g.guide.clone());
                if let Some(group) = group.as_mut() {
                    group.transactions += 1;
                }
                open = Some(RawTransaction {
                    set_id: segment.element(1).unwrap_or_default().to_string(),
                    control_number: segment.element(2).unwrap_or_default().to_string(),
                    guide: segment.element(3).map(str::to_string).or(group_guide),
                    position: segment.position,
                    segments: Vec::new(),
                });
            }
            "SE" => {
                check_envelope(&segment)?;
                match open.take() {
                    Some(tx) => {
                        compare_count(&segment, "SE", tx.segments.len() + 2, &mut warnings);
                        interchange.transactions.push(tx);
                    }
                    None => unknown(&segment, &mut warnings),
                }
            }
            "GE" => {
                check_envelope(&segment)?;
                if let Some(unclosed) = open.take() {
                    close_missing(unclosed, &mut interchange, &mut warnings);
                }
                let received = group.take().map_or(0, |g| g.transactions);
                compare_count(&segment, "GE", received, &mut warnings);
            }
            "IEA" => {
                check_envelope(&segment)?;
                if let Some(unclosed) = open.take() {
                    close_missing(unclosed, &mut interchange, &mut warnings);
                }
                compare_count(&segment, "IEA", groups, &mut warnings);
                closed = true;
            }
            _ => match open.as_mut() {
                Some(tx) => tx.segments.push(segment),
                None => unknown(&segment, &mut warnings),
            },
        }
    }

    if let Some(unclosed) = open.take() {
        close_missing(unclosed, &mut interchange, &mut warnings);
    }
    if !closed {
        warnings.push(Warning::TrailerCountMismatch {
            segment: "IEA".into(),
            declared: "missing".into(),
            actual: groups,
        });
    }

    Ok(Decoded::with_warnings(interchange, warnings))
}

fn check_envelope(segment: &Segment) -> X12Result<()> {
    let Some(spec) = spec_for(&segment.tag) else {
        return Err(X12Error::InvalidEnvelope(format!(
            "expected an envelope segment, found {}",
            segment.tag
        )));
    };
    let count = if segment.tag == "ISA" {
        (1..=17).take_while(|&n| segment.raw_element(n).is_some()).count()
    } else {
        segment.element_count()
    };
    let present = |n: usize| segment.raw_element(n).is_some_and(|v| !v.trim().is_empty());
    match spec.violation(count, present) {
        Some(reason) => Err(X12Error::InvalidEnvelope(format!(
            "{} at position {}: {reason}",
            segment.tag, segment.position
        ))),
        None => Ok(()),
    }
}

fn compare_count(trailer: &Segment, name: &str, actual: usize, warnings: &mut Vec<Warning>) {
    let declared = trailer.element(1).unwrap_or_default();
    if declared.parse::<usize>().ok() != Some(actual) {
        tracing::warn!(segment = name, declared, actual, "trailer count mismatch");
        warnings.push(Warning::TrailerCountMismatch {
            segment: name.to_string(),
            declared: declared.to_string(),
            actual,
        });
    }
}

fn close_missing(tx: RawTransaction, interchange: &mut Interchange, warnings: &mut Vec<Warning>) {
    tracing::warn!(control = %tx.control_number, "transaction has no SE trailer");
    warnings.push(Warning::TrailerCountMismatch {
        segment: "SE".into(),
        declared: "missing".into(),
        actual: tx.segments.len() + 1,
    });
    interchange.transactions.push(tx);
}

fn unknown(segment: &Segment, warnings: &mut Vec<Warning>) {
    tracing::warn!(tag = %segment.tag, position = segment.position, "skipping segment outside a transaction");
    warnings.push(Warning::UnknownSegment {
        tag: segment.tag.clone(),
        position: segment.position,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const ISA: &str = "ISA*00*          *00*          *ZZ*PAYER          *ZZ*SUBMITTER      *240305*0900*^*00501*000000007*0*T*:~";

    #[test]
    fn groups_segments_into_transactions() {
        let text = format!(
            "{ISA}\nGS*HB*PAYER*SUBMITTER*20240305*0900*7*X*005010X279A1~\nST*271*0001*005010X279A1~\nBHT*0022*11*T1*20240305*0900~\nSE*3*0001~\nST*271*0002~\nBHT*0022*11*T2*20240305*0900~\nSE*3*0002~\nGE*2*7~\nIEA*1*000000007~\n"
        );
        let decoded = read_interchange(text.as_bytes()).expect("read");
        assert!(decoded.is_clean(), "{:?}", decoded.warnings);

        let interchange = decoded.value;
        assert_eq!(interchange.sender_id, "PAYER");
        assert_eq!(interchange.control_number, "000000007");
        assert_eq!(interchange.transactions.len(), 2);
        assert_eq!(interchange.transactions[1].control_number, "0002");
        assert_eq!(
            interchange.transactions[1].guide.as_deref(),
            Some("005010X279A1")
        );
        assert_eq!(interchange.transactions[0].segments[0].tag, "BHT");
    }

    #[test]
    fn reports_trailer_mismatches() {
        let text = format!(
            "{ISA}GS*HB*PAYER*SUBMITTER*20240305*0900*7*X*005010X279A1~ST*271*0001~BHT*0022*11*T1*20240305~SE*9*0001~GE*3*7~IEA*2*000000007~"
        );
        let decoded = read_interchange(text.as_bytes()).expect("read");
        let segments: Vec<&str> = decoded
            .warnings
            .iter()
            .filter_map(|w| match w {
                Warning::TrailerCountMismatch { segment, .. } => Some(segment.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(segments, vec!["SE", "GE", "IEA"]);
    }

    #[test]
    fn missing_isa_is_fatal() {
        let err = read_interchange(b"GS*HB*A*B*20240305*0900*7*X*005010X279A1~")
            .expect_err("must fail");
        assert!(matches!(err, X12Error::InvalidEnvelope(_)));
        assert_eq!(
            read_interchange(&[0xff, 0xfe]).expect_err("must fail"),
            X12Error::InvalidEncoding
        );
    }

    #[test]
    fn unterminated_transaction_is_kept_with_warning() {
        let text = format!("{ISA}GS*HB*PAYER*SUBMITTER*20240305*0900*7*X*005010X279A1~ST*271*0001~BHT*0022*11*T1*20240305~");
        let decoded = read_interchange(text.as_bytes()).expect("read");
        assert_eq!(decoded.value.transactions.len(), 1);
        assert!(decoded.warnings.contains(&Warning::TrailerCountMismatch {
            segment: "SE".into(),
            declared: "missing".into(),
            actual: 2,
        }));
    }
}
