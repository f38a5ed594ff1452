//! Outbound entry point and the segment helpers shared by the 270 and 837 builders.

use crate::envelope::write_interchange;
use crate::partner::TradingPartner;
use crate::writer::{Seg, TransactionSet};
use crate::{claim, eligibility, X12Error, X12Result};
use canonical::{Address, Claim, EligibilityRequest, Person};
use chrono::{DateTime, NaiveDate, Utc};
use codes::CodeSystems;
use medwire_types::{present, Clock, ControlNumberSequence};

/// Builds outbound X12 interchanges for one trading partner.
///
/// Timestamps and control numbers come from the injected collaborators, so the same inputs with
/// a [`FixedClock`] and a fresh sequence always produce the same bytes.
///
/// [`FixedClock`]: medwire_types::FixedClock
pub struct EdiBuilder<'a> {
    partner: &'a TradingPartner,
    codes: &'a CodeSystems,
    clock: &'a dyn Clock,
    sequence: &'a dyn ControlNumberSequence,
}

/// What a transaction builder needs besides the record.
pub(crate) struct BuildContext<'a> {
    pub partner: &'a TradingPartner,
    pub codes: &'a CodeSystems,
    pub now: DateTime<Utc>,
}

impl<'a> EdiBuilder<'a> {
    pub fn new(
        partner: &'a TradingPartner,
        codes: &'a CodeSystems,
        clock: &'a dyn Clock,
        sequence: &'a dyn ControlNumberSequence,
    ) -> Self {
        Self {
            partner,
            codes,
            clock,
            sequence,
        }
    }

    fn context(&self, now: DateTime<Utc>) -> BuildContext<'a> {
        BuildContext {
            partner: self.partner,
            codes: self.codes,
            now,
        }
    }

    /// Builds a complete 270 interchange.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteRecord` naming the first missing required field, `Unmapped` for a
    /// value with no X12 code, or `DelimiterInData` for text containing a separator.
    pub fn eligibility_inquiry(&self, request: &EligibilityRequest) -> X12Result<String> {
        let now = self.clock.now();
        let tx = eligibility::inquiry(request, &self.context(now))?;
        write_interchange(self.partner, now, self.sequence, &[tx])
    }

    /// Builds the 837 transaction body for one claim without enveloping it.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteClaim` naming the first missing required field, `InvalidValue` for
    /// values the 837 cannot carry, `Unmapped` or `DelimiterInData`.
    pub fn claim_transaction(&self, claim: &Claim) -> X12Result<TransactionSet> {
        claim::submission(claim, &self.context(self.clock.now()))
    }

    /// Builds a complete 837 interchange for one claim.
    pub fn claim_submission(&self, claim: &Claim) -> X12Result<String> {
        let now = self.clock.now();
        let tx = claim::submission(claim, &self.context(now))?;
        write_interchange(self.partner, now, self.sequence, &[tx])
    }

    /// Envelopes already-built transactions in one interchange, one GS group per guide.
    pub fn interchange(&self, transactions: &[TransactionSet]) -> X12Result<String> {
        write_interchange(self.partner, self.clock.now(), self.sequence, transactions)
    }
}

// ============================================================================
// Shared segment helpers
// ============================================================================

pub(crate) fn d8(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// NM1 for an organisation.
pub(crate) fn nm1_organisation(entity: &str, name: &str, qualifier: &str, id: &str) -> Seg {
    Seg::new("NM1")
        .el(entity)
        .el("2")
        .el(name)
        .skip(4)
        .el(qualifier)
        .el(id)
}

/// NM1 for a person. The identifier pair is omitted when `id` is `None`.
pub(crate) fn nm1_person(
    entity: &str,
    last_name: &str,
    person: &Person,
    qualifier: &str,
    id: Option<&str>,
) -> Seg {
    let seg = Seg::new("NM1")
        .el(entity)
        .el("1")
        .el(last_name)
        .opt(person.first_name.as_deref())
        .opt(person.middle_name.as_deref())
        .skip(2);
    match id {
        Some(id) => seg.el(qualifier).el(id),
        None => seg,
    }
}

/// N3/N4 for an address, nothing when there is no street line.
///
/// Once a street line is present N4 needs city, state and postal code; a missing one is
/// reported through `missing` as `<field>.city` and so on.
pub(crate) fn address_segments(
    address: Option<&Address>,
    field: &str,
    missing: impl Fn(String) -> X12Error,
) -> X12Result<Vec<Seg>> {
    let Some(address) = address else {
        return Ok(Vec::new());
    };
    let mut lines = address.lines.iter().filter(|l| !l.trim().is_empty());
    let Some(first) = lines.next() else {
        return Ok(Vec::new());
    };
    let city = present(address.city.as_deref()).ok_or_else(|| missing(format!("{field}.city")))?;
    let state =
        present(address.state.as_deref()).ok_or_else(|| missing(format!("{field}.state")))?;
    let postal_code = present(address.postal_code.as_deref())
        .ok_or_else(|| missing(format!("{field}.postal_code")))?;
    Ok(vec![
        Seg::new("N3").el(first.as_str()).opt(lines.next().map(String::as_str)),
        Seg::new("N4").el(city).el(state).el(postal_code),
    ])
}

/// DMG with birth date and gender, nothing without a birth date.
pub(crate) fn demographics(person: &Person, codes: &CodeSystems) -> X12Result<Option<Seg>> {
    let Some(birth_date) = person.birth_date else {
        return Ok(None);
    };
    Ok(Some(
        Seg::new("DMG")
            .el("D8")
            .el(d8(&birth_date))
            .el(codes.x12_gender.code(person.gender)?),
    ))
}
