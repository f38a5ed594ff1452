//! Health care claim (837P / 837I).

use crate::builder::{
    address_segments, d8, demographics, nm1_organisation, nm1_person, BuildContext,
};
use crate::writer::{Seg, SegmentWriter, TransactionSet};
use crate::{X12Error, X12Result};
use canonical::{Claim, ClaimFrequency, ClaimType, ClinicalSystem, Provider, Relationship};
use medwire_types::present;

/// Diagnoses an 837P can carry, and composites per HI segment on either form.
const MAX_DIAGNOSES_PER_HI: usize = 12;
const MAX_POINTERS: usize = 4;
const MAX_MODIFIERS: usize = 4;

struct Check<'c> {
    claim_id: &'c str,
}

impl<'c> Check<'c> {
    fn required<'v>(&self, value: Option<&'v str>, field: &str) -> X12Result<&'v str> {
        present(value).ok_or_else(|| self.missing(field))
    }

    fn missing(&self, field: &str) -> X12Error {
        X12Error::IncompleteClaim {
            claim_id: self.claim_id.to_string(),
            field: field.to_string(),
        }
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> X12Error {
    X12Error::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

pub(crate) fn submission(claim: &Claim, ctx: &BuildContext<'_>) -> X12Result<TransactionSet> {
    let check = Check {
        claim_id: claim.id.as_str(),
    };
    let id = check.required(Some(claim.id.as_str()), "id")?;
    let professional = claim.claim_type == ClaimType::Professional;

    let billing = &claim.billing_provider;
    let billing_npi = check.required(billing.npi.as_deref(), "billing_provider.npi")?;
    let billing_name = check.required(billing.name.as_deref(), "billing_provider.name")?;
    let billing_address = address_segments(
        billing.address.as_ref(),
        "billing_provider.address",
        |field| check.missing(&field),
    )?;
    if billing_address.is_empty() {
        return Err(check.missing("billing_provider.address"));
    }
    let tax_id = check.required(billing.tax_id.as_deref(), "billing_provider.tax_id")?;

    let member_id = check.required(
        claim.subscriber.member_id.as_deref(),
        "subscriber.member_id",
    )?;
    let subscriber_last = check.required(
        claim.subscriber.person.last_name.as_deref(),
        "subscriber.person.last_name",
    )?;
    let payer_id = check.required(claim.payer.id.as_deref(), "payer.id")?;
    let payer_name = check.required(claim.payer.name.as_deref(), "payer.name")?;
    let filing = claim
        .payer
        .filing_indicator
        .ok_or_else(|| check.missing("payer.filing_indicator"))?;

    let self_insured = claim.relationship == Relationship::SelfInsured;
    let patient_last = if self_insured {
        None
    } else {
        Some(check.required(claim.patient.last_name.as_deref(), "patient.last_name")?)
    };

    if claim.diagnoses.is_empty() {
        return Err(check.missing("diagnoses"));
    }
    if claim.lines.is_empty() {
        return Err(check.missing("lines"));
    }
    for (i, diagnosis) in claim.diagnoses.iter().enumerate() {
        if !diagnosis.is_system(ClinicalSystem::Icd10Cm) {
            return Err(invalid(
                format!("diagnoses[{i}]"),
                "diagnosis must be an ICD-10-CM code",
            ));
        }
    }
    if professional && claim.diagnoses.len() > MAX_DIAGNOSES_PER_HI {
        return Err(invalid(
            "diagnoses",
            format!("an 837P carries at most {MAX_DIAGNOSES_PER_HI} diagnoses"),
        ));
    }

    // CLM05-1: place of service (837P) or facility type (837I).
    let facility_code = if professional {
        let place = claim
            .place_of_service
            .ok_or_else(|| check.missing("place_of_service"))?;
        ctx.codes.place_of_service.code(place)?.to_string()
    } else {
        check
            .required(claim.facility_type.as_deref(), "facility_type")?
            .to_string()
    };
    let statement = if professional {
        None
    } else {
        let from = claim
            .statement_from
            .ok_or_else(|| check.missing("statement_from"))?;
        let to = claim
            .statement_to
            .ok_or_else(|| check.missing("statement_to"))?;
        Some((from, to))
    };

    let rendering = claim
        .rendering_provider
        .as_ref()
        .map(|provider| -> X12Result<Seg> {
            let npi = check.required(provider.npi.as_deref(), "rendering_provider.npi")?;
            let name = check.required(provider.name.as_deref(), "rendering_provider.name")?;
            Ok(provider_name("82", name, provider, npi))
        })
        .transpose()?;

    let mut w = SegmentWriter::new(ctx.partner.delimiters);
    w.push(
        Seg::new("BHT")
            .el("0019")
            .el("00")
            .el(id)
            .el(ctx.now.format("%Y%m%d").to_string())
            .el(ctx.now.format("%H%M").to_string())
            .el("CH"),
    )?;

    // 1000A submitter, 1000B receiver
    let submitter = &ctx.partner.submitter;
    w.push(nm1_organisation("41", &submitter.name, "46", &submitter.id))?;
    w.push(
        Seg::new("PER")
            .el("IC")
            .el(submitter.contact_name.as_str())
            .el("TE")
            .el(submitter.contact_phone.as_str()),
    )?;
    w.push(nm1_organisation(
        "40",
        &ctx.partner.receiver_name,
        "46",
        &ctx.partner.receiver.id,
    ))?;

    // 2000A / 2010AA billing provider
    w.push(Seg::new("HL").el("1").empty().el("20").el("1"))?;
    w.push(provider_name("85", billing_name, billing, billing_npi))?;
    for seg in billing_address {
        w.push(seg)?;
    }
    w.push(Seg::new("REF").el("EI").el(tax_id))?;

    // 2000B / 2010BA subscriber, 2010BB payer
    w.push(
        Seg::new("HL")
            .el("2")
            .el("1")
            .el("22")
            .el(if self_insured { "0" } else { "1" }),
    )?;
    let sbr_relationship = if self_insured {
        Some(ctx.codes.relationship.code(Relationship::SelfInsured)?)
    } else {
        None
    };
    w.push(
        Seg::new("SBR")
            .el("P")
            .opt(sbr_relationship)
            .opt(claim.subscriber.group_number.as_deref())
            .skip(5)
            .el(ctx.codes.claim_filing_indicator.code(filing)?),
    )?;
    w.push(nm1_person(
        "IL",
        subscriber_last,
        &claim.subscriber.person,
        "MI",
        Some(member_id),
    ))?;
    for seg in address_segments(
        claim.subscriber.person.address.as_ref(),
        "subscriber.person.address",
        |field| check.missing(&field),
    )? {
        w.push(seg)?;
    }
    if self_insured {
        if let Some(dmg) = demographics(&claim.subscriber.person, ctx.codes)? {
            w.push(dmg)?;
        }
    }
    w.push(nm1_organisation("PR", payer_name, "PI", payer_id))?;

    // 2000C / 2010CA patient
    if let Some(patient_last) = patient_last {
        w.push(Seg::new("HL").el("3").el("2").el("23").el("0"))?;
        w.push(Seg::new("PAT").el(ctx.codes.relationship.code(claim.relationship)?))?;
        w.push(nm1_person("QC", patient_last, &claim.patient, "", None))?;
        for seg in address_segments(claim.patient.address.as_ref(), "patient.address", |field| {
            check.missing(&field)
        })? {
            w.push(seg)?;
        }
        if let Some(dmg) = demographics(&claim.patient, ctx.codes)? {
            w.push(dmg)?;
        }
    }

    // 2300 claim
    let qualifier = ctx.codes.facility_code_qualifier.code(claim.claim_type)?;
    let frequency = ctx.codes.claim_frequency.code(claim.frequency)?;
    w.push(
        Seg::new("CLM")
            .el(id)
            .el(claim.line_total().to_x12())
            .skip(2)
            .comp([facility_code.as_str(), qualifier, frequency])
            .el("Y")
            .el("A")
            .el("Y")
            .el("Y"),
    )?;
    if claim.frequency != ClaimFrequency::Original {
        let original = check.required(claim.original_reference.as_deref(), "original_reference")?;
        w.push(Seg::new("REF").el("F8").el(original))?;
    }
    if let Some((from, to)) = statement {
        w.push(
            Seg::new("DTP")
                .el("434")
                .el("RD8")
                .el(format!("{}-{}", d8(&from), d8(&to))),
        )?;
    }
    for seg in diagnosis_segments(claim) {
        w.push(seg)?;
    }
    if let Some(rendering) = rendering {
        w.push(rendering)?;
    }

    // 2400 service lines
    for (i, line) in claim.lines.iter().enumerate() {
        if !line.procedure.is_system(ClinicalSystem::Cpt)
            && !line.procedure.is_system(ClinicalSystem::Hcpcs)
        {
            return Err(invalid(
                format!("lines[{i}].procedure"),
                "procedure must be a CPT or HCPCS code",
            ));
        }
        if line.modifiers.len() > MAX_MODIFIERS {
            return Err(invalid(
                format!("lines[{i}].modifiers"),
                format!("at most {MAX_MODIFIERS} modifiers per line"),
            ));
        }
        let procedure = std::iter::once("HC")
            .chain(std::iter::once(line.procedure.code.as_str()))
            .chain(line.modifiers.iter().map(String::as_str));
        let units = line.units.normalize().to_string();

        w.push(Seg::new("LX").el((i + 1).to_string()))?;
        if professional {
            let pointers = pointers(claim, i, &check)?;
            let place = line
                .place_of_service
                .filter(|place| Some(*place) != claim.place_of_service)
                .map(|place| ctx.codes.place_of_service.code(place))
                .transpose()?;
            w.push(
                Seg::new("SV1")
                    .comp(procedure)
                    .el(line.charge.to_x12())
                    .el("UN")
                    .el(units)
                    .opt(place)
                    .empty()
                    .comp(pointers),
            )?;
        } else {
            let revenue = check.required(
                line.revenue_code.as_deref(),
                &format!("lines[{i}].revenue_code"),
            )?;
            w.push(
                Seg::new("SV2")
                    .el(revenue)
                    .comp(procedure)
                    .el(line.charge.to_x12())
                    .el("UN")
                    .el(units),
            )?;
        }
        if let Some(date) = line.service_date {
            w.push(Seg::new("DTP").el("472").el("D8").el(d8(&date)))?;
        }
    }

    let set_guide = ctx.codes.implementation_guide.code(claim.claim_type)?;
    if claim.total_charge != claim.line_total() {
        tracing::debug!(
            claim = %id,
            declared = %claim.total_charge,
            computed = %claim.line_total(),
            "claim total differs from its lines, emitting the computed total"
        );
    }
    tracing::info!(claim = %id, lines = claim.lines.len(), guide = set_guide, "built 837 claim");
    Ok(TransactionSet {
        set_id: "837",
        functional_id: "HC",
        guide: set_guide,
        reference: id.to_string(),
        body: w.into_segments(),
    })
}

/// NM1 for a billing or rendering provider, by NPI.
fn provider_name(entity: &str, name: &str, provider: &Provider, npi: &str) -> Seg {
    if provider.is_individual() {
        let person = canonical::Person {
            first_name: provider.first_name.clone(),
            ..canonical::Person::default()
        };
        nm1_person(entity, name, &person, "XX", Some(npi))
    } else {
        nm1_organisation(entity, name, "XX", npi)
    }
}

/// HI segments: the principal diagnosis (ABK) followed by the others (ABF), without the dot.
fn diagnosis_segments(claim: &Claim) -> Vec<Seg> {
    let composites: Vec<[String; 2]> = claim
        .diagnoses
        .iter()
        .enumerate()
        .map(|(i, diagnosis)| {
            let qualifier = if i == 0 { "ABK" } else { "ABF" };
            [qualifier.to_string(), diagnosis.code.replace('.', "")]
        })
        .collect();

    composites
        .chunks(MAX_DIAGNOSES_PER_HI)
        .map(|chunk| {
            chunk
                .iter()
                .fold(Seg::new("HI"), |seg, composite| seg.comp(composite.iter().cloned()))
        })
        .collect()
}

/// SV107 diagnosis pointers, validated against the claim's diagnoses.
fn pointers(claim: &Claim, index: usize, check: &Check<'_>) -> X12Result<Vec<String>> {
    let line = &claim.lines[index];
    let field = format!("lines[{index}].diagnosis_pointers");
    if line.diagnosis_pointers.is_empty() {
        return Err(check.missing(&field));
    }
    if line.diagnosis_pointers.len() > MAX_POINTERS {
        return Err(invalid(
            field,
            format!("at most {MAX_POINTERS} pointers per line"),
        ));
    }
    line.diagnosis_pointers
        .iter()
        .map(|&pointer| {
            if pointer == 0 || usize::from(pointer) > claim.diagnoses.len() {
                Err(invalid(
                    field.clone(),
                    format!(
                        "pointer {pointer} is outside the {} diagnoses",
                        claim.diagnoses.len()
                    ),
                ))
            } else {
                Ok(pointer.to_string())
            }
        })
        .collect()
}
