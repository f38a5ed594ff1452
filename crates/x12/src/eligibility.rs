//! Eligibility inquiry (270) and response (271), 005010X279A1.

use crate::builder::{address_segments, d8, demographics, nm1_organisation, nm1_person, BuildContext};
use crate::segment::Segment;
use crate::transaction::{Handled, ParseContext, TransactionHandler};
use crate::writer::{Seg, SegmentWriter, TransactionSet};
use crate::{X12Error, X12Result};
use canonical::{
    Accumulator, Amounts, BenefitInformation, CoverageDetail, CoverageLevel, CoverageStatus,
    EligibilityRequest, EligibilityResponse, Person, RequestRejection, ServiceType, Subscriber,
    TimePeriod,
};
use medwire_types::{present, Coded, Money};

const GUIDE: &str = "005010X279A1";
const RECORD: &str = "EligibilityRequest";

/// Service type requested when the request names none.
const DEFAULT_SERVICE_TYPE: &str = "30";

fn required<'r>(value: Option<&'r str>, field: &str) -> X12Result<&'r str> {
    present(value).ok_or_else(|| missing(field.to_string()))
}

fn missing(field: String) -> X12Error {
    X12Error::IncompleteRecord {
        record: RECORD,
        field,
    }
}

// ============================================================================
// 270
// ============================================================================

pub(crate) fn inquiry(
    request: &EligibilityRequest,
    ctx: &BuildContext<'_>,
) -> X12Result<TransactionSet> {
    let id = required(Some(request.id.as_str()), "id")?;
    let payer_id = required(request.payer.id.as_deref(), "payer.id")?;
    let payer_name = required(request.payer.name.as_deref(), "payer.name")?;
    let provider_npi = required(request.provider.npi.as_deref(), "provider.npi")?;
    let provider_name = required(request.provider.name.as_deref(), "provider.name")?;
    let member_id = required(request.subscriber.member_id.as_deref(), "subscriber.member_id")?;
    let subscriber_last = required(
        request.subscriber.person.last_name.as_deref(),
        "subscriber.person.last_name",
    )?;
    let dependent_last = request
        .dependent
        .as_ref()
        .map(|dependent| required(dependent.last_name.as_deref(), "dependent.last_name"))
        .transpose()?;

    let service_types = request
        .service_types
        .iter()
        .map(|service_type| ctx.codes.service_type.code(*service_type))
        .collect::<Result<Vec<_>, _>>()?;
    let service_types = if service_types.is_empty() {
        vec![DEFAULT_SERVICE_TYPE]
    } else {
        service_types
    };

    let mut w = SegmentWriter::new(ctx.partner.delimiters);
    w.push(
        Seg::new("BHT")
            .el("0022")
            .el("13")
            .el(id)
            .el(ctx.now.format("%Y%m%d").to_string())
            .el(ctx.now.format("%H%M").to_string()),
    )?;

    // 2000A / 2100A information source
    w.push(Seg::new("HL").el("1").empty().el("20").el("1"))?;
    w.push(nm1_organisation("PR", payer_name, "PI", payer_id))?;

    // 2000B / 2100B information receiver
    w.push(Seg::new("HL").el("2").el("1").el("21").el("1"))?;
    let provider = if request.provider.is_individual() {
        let person = Person {
            first_name: request.provider.first_name.clone(),
            ..Person::default()
        };
        nm1_person("1P", provider_name, &person, "XX", Some(provider_npi))
    } else {
        nm1_organisation("1P", provider_name, "XX", provider_npi)
    };
    w.push(provider)?;

    // 2000C / 2100C subscriber
    let has_dependent = request.dependent.is_some();
    w.push(
        Seg::new("HL")
            .el("3")
            .el("2")
            .el("22")
            .el(if has_dependent { "1" } else { "0" }),
    )?;
    w.push(trace(id, ctx))?;
    w.push(nm1_person(
        "IL",
        subscriber_last,
        &request.subscriber.person,
        "MI",
        Some(member_id),
    ))?;
    if let Some(group) = present(request.subscriber.group_number.as_deref()) {
        w.push(Seg::new("REF").el("6P").el(group))?;
    }
    for seg in address_segments(
        request.subscriber.person.address.as_ref(),
        "subscriber.person.address",
        missing,
    )? {
        w.push(seg)?;
    }
    if let Some(dmg) = demographics(&request.subscriber.person, ctx.codes)? {
        w.push(dmg)?;
    }

    let benefit_segments = |w: &mut SegmentWriter| -> X12Result<()> {
        if let Some(date) = request.service_date {
            w.push(Seg::new("DTP").el("291").el("D8").el(d8(&date)))?;
        }
        for code in &service_types {
            w.push(Seg::new("EQ").el(*code))?;
        }
        Ok(())
    };

    match (&request.dependent, dependent_last) {
        (Some(dependent), Some(last_name)) => {
            // 2000D / 2100D dependent
            w.push(Seg::new("HL").el("4").el("3").el("23").el("0"))?;
            w.push(trace(id, ctx))?;
            w.push(nm1_person("03", last_name, dependent, "", None))?;
            for seg in address_segments(dependent.address.as_ref(), "dependent.address", missing)? {
                w.push(seg)?;
            }
            if let Some(dmg) = demographics(dependent, ctx.codes)? {
                w.push(dmg)?;
            }
            benefit_segments(&mut w)?;
        }
        _ => benefit_segments(&mut w)?,
    }

    tracing::info!(request = %id, "built 270 eligibility inquiry");
    Ok(TransactionSet {
        set_id: "270",
        functional_id: "HS",
        guide: GUIDE,
        reference: id.to_string(),
        body: w.into_segments(),
    })
}

fn trace(id: &str, ctx: &BuildContext<'_>) -> Seg {
    Seg::new("TRN")
        .el("1")
        .el(id)
        .el(ctx.partner.submitter.id.as_str())
}

// ============================================================================
// 271
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Entity {
    #[default]
    None,
    Payer,
    Provider,
    Subscriber,
    Dependent,
}

impl Entity {
    fn label(self) -> &'static str {
        match self {
            Entity::None => "transaction",
            Entity::Payer => "payer",
            Entity::Provider => "provider",
            Entity::Subscriber => "subscriber",
            Entity::Dependent => "dependent",
        }
    }
}

#[derive(Default)]
pub(crate) struct EligibilityHandler {
    response: EligibilityResponse,
    entity: Entity,
    /// Coverage entries the most recent EB applied to, for trailing MSG segments.
    last_benefit: Vec<usize>,
}

impl EligibilityHandler {
    fn person_mut(&mut self) -> Option<&mut Person> {
        match self.entity {
            Entity::Subscriber => Some(
                &mut self
                    .response
                    .subscriber
                    .get_or_insert_with(Subscriber::default)
                    .person,
            ),
            Entity::Dependent => Some(self.response.dependent.get_or_insert_with(Person::default)),
            _ => None,
        }
    }

    fn name(&mut self, segment: &Segment) -> Handled {
        let entity = match segment.element(1) {
            Some("PR") => Entity::Payer,
            Some("1P" | "FA" | "80") => Entity::Provider,
            Some("IL") => Entity::Subscriber,
            Some("03") => Entity::Dependent,
            _ => return Handled::Ignored,
        };
        self.entity = entity;

        let last = segment.element(3).map(str::to_string);
        let id = segment.element(9).map(str::to_string);
        match entity {
            Entity::Payer => {
                self.response.payer_name = last;
                self.response.payer_id = id;
            }
            Entity::Provider => {
                self.response.provider_name = last;
                self.response.provider_npi = id.filter(|_| segment.is(8, "XX"));
            }
            Entity::Subscriber => {
                let subscriber = self.response.subscriber.get_or_insert_with(Subscriber::default);
                if segment.is(8, "MI") {
                    subscriber.member_id = id;
                }
                fill_name(&mut subscriber.person, segment);
            }
            Entity::Dependent => {
                fill_name(self.response.dependent.get_or_insert_with(Person::default), segment);
            }
            Entity::None => {}
        }
        Handled::Consumed
    }

    fn coverage_index(&mut self, service_type: Coded<ServiceType>) -> usize {
        match self
            .response
            .coverage
            .iter()
            .position(|detail| detail.service_type == service_type)
        {
            Some(index) => index,
            None => {
                self.response.coverage.push(CoverageDetail::new(service_type));
                self.response.coverage.len() - 1
            }
        }
    }

    fn benefit(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        let info = ctx
            .codes
            .benefit_information
            .resolve_or_warn(segment.element(1).unwrap_or_default(), &mut ctx.warnings);
        let level = segment
            .element(2)
            .map(|code| ctx.codes.coverage_level.resolve_or_warn(code, &mut ctx.warnings));
        let period = segment
            .element(6)
            .map(|code| ctx.codes.time_period.resolve_or_warn(code, &mut ctx.warnings));
        let amount = ctx.money(segment, 7)?;
        let percent = ctx.decimal(segment, 8);
        let description = segment.element(5).map(str::to_string);
        let in_network = match segment.element(12) {
            Some("Y") => Some(true),
            Some("N") => Some(false),
            _ => None,
        };

        let mut service_types = segment.repetitions(3);
        if service_types.is_empty() {
            service_types.push(DEFAULT_SERVICE_TYPE);
        }

        let mut touched = Vec::with_capacity(service_types.len());
        for code in service_types {
            let service_type = ctx.codes.service_type.resolve_or_warn(code, &mut ctx.warnings);
            let index = self.coverage_index(service_type);
            touched.push(index);
            let detail = &mut self.response.coverage[index];
            if in_network.is_some() {
                detail.in_network = in_network;
            }

            match info {
                Coded::Known(BenefitInformation::ActiveCoverage) => {
                    detail.active = Some(true);
                    if self.response.plan_description.is_none() {
                        self.response.plan_description = description.clone();
                    }
                }
                Coded::Known(BenefitInformation::Inactive) => {
                    if detail.active.is_none() {
                        detail.active = Some(false);
                    }
                }
                Coded::Known(BenefitInformation::Deductible) => {
                    accumulate(&mut detail.deductible, level.as_ref(), period.as_ref(), amount);
                }
                Coded::Known(BenefitInformation::OutOfPocket) => {
                    accumulate(&mut detail.out_of_pocket, level.as_ref(), period.as_ref(), amount);
                }
                Coded::Known(BenefitInformation::CoPayment) => {
                    if amount.is_some() {
                        detail.copay = amount;
                    }
                }
                Coded::Known(BenefitInformation::Coinsurance) => {
                    if percent.is_some() {
                        detail.coinsurance = percent;
                    }
                }
                Coded::Known(
                    BenefitInformation::Limitations
                    | BenefitInformation::Exclusions
                    | BenefitInformation::NonCovered,
                ) => {
                    let text = description.clone().unwrap_or_else(|| {
                        info.known()
                            .and_then(|i| ctx.codes.benefit_information.display(*i))
                            .unwrap_or_default()
                            .to_string()
                    });
                    detail.limitations.push(text);
                }
                Coded::Known(_) => {
                    if let Some(text) = &description {
                        detail.messages.push(text.clone());
                    }
                }
                Coded::Unknown(_) => {}
            }
        }
        self.last_benefit = touched;
        Ok(Handled::Consumed)
    }
}

fn fill_name(person: &mut Person, segment: &Segment) {
    person.last_name = segment.element(3).map(str::to_string);
    person.first_name = segment.element(4).map(str::to_string);
    person.middle_name = segment.element(5).map(str::to_string);
}

/// Files an EB amount under individual/family and total/remaining.
///
/// A missing coverage level reads as individual; a missing period as a total. Periods that are
/// neither (year-to-date, per visit) are not accumulated.
fn accumulate(
    accumulator: &mut Accumulator,
    level: Option<&Coded<CoverageLevel>>,
    period: Option<&Coded<TimePeriod>>,
    amount: Option<Money>,
) {
    let Some(amount) = amount else {
        return;
    };
    let amounts: &mut Amounts = match level {
        None => &mut accumulator.individual,
        Some(Coded::Known(level)) if level.is_individual() => &mut accumulator.individual,
        Some(Coded::Known(_)) => &mut accumulator.family,
        Some(Coded::Unknown(_)) => return,
    };
    match period {
        None => amounts.total = Some(amount),
        Some(Coded::Known(period)) if period.is_remaining() => amounts.remaining = Some(amount),
        Some(Coded::Known(period)) if period.is_total() => amounts.total = Some(amount),
        Some(_) => {}
    }
}

impl TransactionHandler for EligibilityHandler {
    type Output = EligibilityResponse;

    fn handle(&mut self, segment: &Segment, ctx: &mut ParseContext<'_>) -> X12Result<Handled> {
        Ok(match segment.tag.as_str() {
            "NM1" => self.name(segment),
            "TRN" => {
                if self.response.trace_number.is_none() {
                    self.response.trace_number = segment.element(2).map(str::to_string);
                }
                Handled::Consumed
            }
            "REF" => match (segment.element(1), self.entity) {
                (Some("6P" | "18"), Entity::Subscriber) => {
                    self.response
                        .subscriber
                        .get_or_insert_with(Subscriber::default)
                        .group_number = segment.element(2).map(str::to_string);
                    Handled::Consumed
                }
                _ => Handled::Ignored,
            },
            "N3" => match self.person_mut() {
                Some(person) => {
                    let address = person.address.get_or_insert_with(Default::default);
                    address.lines = [segment.element(1), segment.element(2)]
                        .into_iter()
                        .flatten()
                        .map(str::to_string)
                        .collect();
                    Handled::Consumed
                }
                None => Handled::Ignored,
            },
            "N4" => match self.person_mut() {
                Some(person) => {
                    let address = person.address.get_or_insert_with(Default::default);
                    address.city = segment.element(1).map(str::to_string);
                    address.state = segment.element(2).map(str::to_string);
                    address.postal_code = segment.element(3).map(str::to_string);
                    Handled::Consumed
                }
                None => Handled::Ignored,
            },
            "DMG" => {
                let birth_date = ctx.date(segment, 2);
                let gender = segment.element(3).map(|code| {
                    ctx.codes
                        .x12_gender
                        .resolve_or_warn(code, &mut ctx.warnings)
                        .into_known()
                        .unwrap_or_default()
                });
                match self.person_mut() {
                    Some(person) => {
                        person.birth_date = birth_date;
                        person.gender = gender.unwrap_or_default();
                        Handled::Consumed
                    }
                    None => Handled::Ignored,
                }
            }
            "EB" => self.benefit(segment, ctx)?,
            "MSG" => {
                let text = segment.element(1).unwrap_or_default().to_string();
                for &index in &self.last_benefit {
                    self.response.coverage[index].messages.push(text.clone());
                }
                Handled::Consumed
            }
            "AAA" => {
                tracing::warn!(
                    level = self.entity.label(),
                    reason = segment.element(3).unwrap_or_default(),
                    "eligibility request rejected"
                );
                self.response.rejections.push(RequestRejection {
                    level: self.entity.label().to_string(),
                    reason_code: segment.element(3).unwrap_or_default().to_string(),
                    follow_up: segment.element(4).map(str::to_string),
                });
                Handled::Consumed
            }
            "BHT" | "HL" | "DTP" | "INS" | "LS" | "LE" | "PER" | "PRV" | "III" => Handled::Ignored,
            _ => Handled::Unknown,
        })
    }

    fn finish(mut self, _ctx: &mut ParseContext<'_>) -> X12Result<EligibilityResponse> {
        let active = self.response.coverage.iter().any(|d| d.active == Some(true));
        let inactive = self.response.coverage.iter().any(|d| d.active == Some(false));
        self.response.eligible = active;
        self.response.coverage_status = match (active, inactive) {
            (true, _) => CoverageStatus::Active,
            (false, true) => CoverageStatus::Inactive,
            (false, false) => CoverageStatus::Undetermined,
        };
        Ok(self.response)
    }
}
