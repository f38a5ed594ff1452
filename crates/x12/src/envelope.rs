//! ISA/GS … GE/IEA framing for outbound interchanges.

use crate::delimiters::Delimiters;
use crate::partner::TradingPartner;
use crate::writer::{Seg, SegmentWriter, TransactionSet};
use crate::{X12Error, X12Result};
use chrono::{DateTime, Utc};
use medwire_types::ControlNumberSequence;

const VERSION: &str = "00501";
const GS_RESPONSIBLE_AGENCY: &str = "X";

/// Pads a fixed-width ISA field, refusing values that are too long or contain a separator.
fn fixed(field: &str, value: &str, width: usize, delimiters: &Delimiters) -> X12Result<String> {
    if value.chars().count() > width {
        return Err(X12Error::InvalidValue {
            field: field.to_string(),
            reason: format!("{value:?} is longer than {width} characters"),
        });
    }
    if value.chars().any(|c| delimiters.contains(c)) {
        return Err(X12Error::DelimiterInData {
            tag: "ISA".into(),
            position: field[3..].parse().unwrap_or_default(),
            value: value.to_string(),
        });
    }
    Ok(format!("{value:<width$}"))
}

/// The fixed-width ISA header. ISA11 and ISA16 carry separators, so it bypasses the writer.
fn isa(partner: &TradingPartner, now: DateTime<Utc>, control: &str) -> X12Result<String> {
    let d = &partner.delimiters;
    let fields = [
        fixed("ISA01", "00", 2, d)?,
        fixed("ISA02", "", 10, d)?,
        fixed("ISA03", "00", 2, d)?,
        fixed("ISA04", "", 10, d)?,
        fixed("ISA05", &partner.sender.qualifier, 2, d)?,
        fixed("ISA06", &partner.sender.id, 15, d)?,
        fixed("ISA07", &partner.receiver.qualifier, 2, d)?,
        fixed("ISA08", &partner.receiver.id, 15, d)?,
        now.format("%y%m%d").to_string(),
        now.format("%H%M").to_string(),
        d.repetition.to_string(),
        VERSION.to_string(),
        control.to_string(),
        if partner.acknowledgement_requested { "1" } else { "0" }.to_string(),
        partner.usage.code().to_string(),
        d.component.to_string(),
    ];

    let mut out = String::from("ISA");
    for field in fields {
        out.push(d.element);
        out.push_str(&field);
    }
    Ok(out)
}

/// Renders a complete interchange around `transactions`.
///
/// Transactions are grouped by functional identifier and implementation guide in the order they
/// first appear. ISA13 and every GS06 are drawn from `sequence`; ST02 counts from `0001` within
/// each group. SE01, GE01 and IEA01 are computed from what is emitted.
pub(crate) fn write_interchange(
    partner: &TradingPartner,
    now: DateTime<Utc>,
    sequence: &dyn ControlNumberSequence,
    transactions: &[TransactionSet],
) -> X12Result<String> {
    if transactions.is_empty() {
        return Err(X12Error::InvalidValue {
            field: "transactions".into(),
            reason: "an interchange needs at least one transaction".into(),
        });
    }

    let delimiters = partner.delimiters;
    delimiters.check()?;

    let mut groups: Vec<(&'static str, &'static str, Vec<&TransactionSet>)> = Vec::new();
    for tx in transactions {
        match groups
            .iter_mut()
            .find(|(id, guide, _)| *id == tx.functional_id && *guide == tx.guide)
        {
            Some((_, _, members)) => members.push(tx),
            None => groups.push((tx.functional_id, tx.guide, vec![tx])),
        }
    }

    let interchange_number = format!("{:09}", sequence.next_control_number());
    let mut writer = SegmentWriter::new(delimiters);
    writer.push_rendered(isa(partner, now, &interchange_number)?);

    for (functional_id, guide, members) in &groups {
        let group_number = sequence.next_control_number().to_string();
        writer.push(
            Seg::new("GS")
                .el(*functional_id)
                .el(&partner.application_sender)
                .el(&partner.application_receiver)
                .el(now.format("%Y%m%d").to_string())
                .el(now.format("%H%M").to_string())
                .el(&group_number)
                .el(GS_RESPONSIBLE_AGENCY)
                .el(*guide),
        )?;

        for (index, tx) in members.iter().enumerate() {
            let control = format!("{:04}", index + 1);
            writer.push(Seg::new("ST").el(tx.set_id).el(&control).el(tx.guide))?;
            for segment in &tx.body {
                writer.push_rendered(segment.clone());
            }
            writer.push(
                Seg::new("SE")
                    .el(tx.segment_count().to_string())
                    .el(&control),
            )?;
        }

        writer.push(
            Seg::new("GE")
                .el(members.len().to_string())
                .el(&group_number),
        )?;
    }

    writer.push(
        Seg::new("IEA")
            .el(groups.len().to_string())
            .el(&interchange_number),
    )?;

    tracing::info!(
        interchange = %interchange_number,
        groups = groups.len(),
        transactions = transactions.len(),
        "built X12 interchange"
    );

    let mut text = String::new();
    for segment in writer.into_segments() {
        text.push_str(&segment);
        text.push(delimiters.segment);
    }
    Ok(text)
}
