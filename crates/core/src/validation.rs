//! The validation gate run before every outbound transform.
//!
//! Every check runs independently and all problems are reported in one pass, so a caller can fix
//! a record without resubmitting it once per error. An empty list means the record may be built.
//!
//! The gate owns identifiers, cross-field rules (date ordering, totals, pointer ranges) and
//! vocabulary coverage for the target format. Presence of the remaining content a transaction
//! needs (names, addresses, diagnoses, lines) is enforced by the builders themselves, which fail
//! with a typed `IncompleteClaim` / `IncompleteRecord` naming the field.

use canonical::{
    CanonicalRecord, Claim, ClaimType, ClinicalCode, ClinicalSystem, EligibilityRequest,
    LabOrder, Person, Provider, Relationship,
};
use chrono::NaiveDate;
use codes::{CodeSystems, CodeTable};
use medwire_types::{Money, NonEmptyText, Npi};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// One problem found by the gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Path of the offending field, e.g. `lines[2].diagnosis_pointers`.
    pub field: String,
    pub reason: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(ValidationIssue {
            field: field.into(),
            reason: reason.into(),
        });
    }

    fn identifier(&mut self, field: &str, value: Option<&str>) {
        if value.and_then(|v| NonEmptyText::new(v).ok()).is_none() {
            self.push(field, "required identifier is missing");
        }
    }

    fn npi(&mut self, field: &str, value: Option<&str>, required: bool) {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(npi) => {
                if let Err(err) = Npi::parse(npi) {
                    self.push(field, err.to_string());
                }
            }
            None if required => self.push(field, "required identifier is missing"),
            None => {}
        }
    }

    fn mapped<I>(&mut self, field: &str, table: &CodeTable<I>, value: I)
    where
        I: Copy + PartialEq + fmt::Debug + 'static,
    {
        if !table.contains(value) {
            self.push(
                field,
                format!("{value:?} has no code in the {} table", table.domain),
            );
        }
    }

    fn date_order(&mut self, field: &str, earlier: Option<NaiveDate>, later: Option<NaiveDate>) {
        if let (Some(earlier), Some(later)) = (earlier, later) {
            if later < earlier {
                self.push(field, format!("{later} is before {earlier}"));
            }
        }
    }

    fn system(&mut self, field: &str, code: &ClinicalCode, allowed: &[ClinicalSystem]) {
        if !allowed.iter().any(|system| code.is_system(*system)) {
            self.push(
                field,
                format!("code {} is not from an accepted code system", code.code),
            );
        }
    }

    fn finish(self, record: &str, id: &str) -> Vec<ValidationIssue> {
        if !self.0.is_empty() {
            tracing::debug!(record, id, issues = self.0.len(), "validation gate rejected record");
        }
        self.0
    }
}

/// Checks a claim before it is built into an 837.
pub fn validate_claim(claim: &Claim, codes: &CodeSystems) -> Vec<ValidationIssue> {
    let mut issues = Issues::default();

    issues.identifier("id", Some(&claim.id));
    issues.identifier("subscriber.member_id", claim.subscriber.member_id.as_deref());
    issues.identifier("payer.id", claim.payer.id.as_deref());
    issues.npi("billing_provider.npi", claim.billing_provider.npi.as_deref(), true);
    if let Some(rendering) = &claim.rendering_provider {
        issues.npi("rendering_provider.npi", rendering.npi.as_deref(), false);
    }

    issues.mapped("claim_type", &codes.implementation_guide, claim.claim_type);
    issues.mapped("frequency", &codes.claim_frequency, claim.frequency);
    issues.mapped("relationship", &codes.relationship, claim.relationship);
    if let Some(filing) = claim.payer.filing_indicator {
        issues.mapped("payer.filing_indicator", &codes.claim_filing_indicator, filing);
    }
    if let Some(place) = claim.place_of_service {
        issues.mapped("place_of_service", &codes.place_of_service, place);
    }
    person_gender(&mut issues, "subscriber.person", &claim.subscriber.person, codes);
    if claim.relationship != Relationship::SelfInsured {
        person_gender(&mut issues, "patient", &claim.patient, codes);
    }

    issues.date_order("statement_to", claim.statement_from, claim.statement_to);

    let line_total = claim.line_total();
    if claim.total_charge != line_total {
        issues.push(
            "total_charge",
            format!(
                "declared {} but the lines sum to {line_total}",
                claim.total_charge
            ),
        );
    }

    for (i, diagnosis) in claim.diagnoses.iter().enumerate() {
        issues.system(&format!("diagnoses[{i}]"), diagnosis, &[ClinicalSystem::Icd10Cm]);
    }

    for (i, line) in claim.lines.iter().enumerate() {
        let path = |field: &str| format!("lines[{i}].{field}");

        issues.system(
            &path("procedure"),
            &line.procedure,
            &[ClinicalSystem::Cpt, ClinicalSystem::Hcpcs],
        );
        if line.charge < Money::ZERO {
            issues.push(path("charge"), "charge must not be negative");
        }
        if line.units <= Decimal::ZERO {
            issues.push(path("units"), "units must be greater than zero");
        }
        if let Some(place) = line.place_of_service {
            issues.mapped(&path("place_of_service"), &codes.place_of_service, place);
        }
        if claim.claim_type == ClaimType::Institutional {
            issues.date_order(&path("service_date"), claim.statement_from, line.service_date);
            issues.date_order(&path("service_date"), line.service_date, claim.statement_to);
        }
        // An empty diagnosis list is reported by the builder; there is no range to check against.
        if !claim.diagnoses.is_empty() {
            for pointer in &line.diagnosis_pointers {
                if *pointer == 0 || usize::from(*pointer) > claim.diagnoses.len() {
                    issues.push(
                        path("diagnosis_pointers"),
                        format!(
                            "pointer {pointer} is outside 1..={}",
                            claim.diagnoses.len()
                        ),
                    );
                }
            }
        }
    }

    issues.finish("claim", &claim.id)
}

/// Checks an eligibility request before it is built into a 270.
pub fn validate_eligibility_request(
    request: &EligibilityRequest,
    codes: &CodeSystems,
) -> Vec<ValidationIssue> {
    let mut issues = Issues::default();

    issues.identifier("id", Some(&request.id));
    issues.identifier("subscriber.member_id", request.subscriber.member_id.as_deref());
    issues.identifier("payer.id", request.payer.id.as_deref());
    issues.npi("provider.npi", request.provider.npi.as_deref(), true);

    for (i, service_type) in request.service_types.iter().enumerate() {
        issues.mapped(&format!("service_types[{i}]"), &codes.service_type, *service_type);
    }

    person_gender(&mut issues, "subscriber.person", &request.subscriber.person, codes);
    issues.date_order(
        "service_date",
        request.subscriber.person.birth_date,
        request.service_date,
    );
    if let Some(dependent) = &request.dependent {
        person_gender(&mut issues, "dependent", dependent, codes);
        issues.date_order("service_date", dependent.birth_date, request.service_date);
    }

    issues.finish("eligibility request", &request.id)
}

/// Checks a lab order before it is built into an ORM^O01.
pub fn validate_lab_order(order: &LabOrder, codes: &CodeSystems) -> Vec<ValidationIssue> {
    let mut issues = Issues::default();

    issues.identifier("id", Some(&order.id));
    issues.identifier("patient_id", Some(&order.patient_id));
    provider_npi(&mut issues, "ordering_provider.npi", &order.ordering_provider);

    issues.mapped("patient.gender", &codes.hl7_gender, order.patient.gender);
    issues.mapped("priority", &codes.hl7_priority, order.priority);
    if let Some(class) = order.encounter_class {
        issues.mapped("encounter_class", &codes.hl7_patient_class, class);
    }
    for (i, test) in order.tests.iter().enumerate() {
        let mapped = test
            .system
            .known()
            .is_some_and(|system| codes.hl7_coding_system.contains(*system));
        if !mapped {
            issues.push(
                format!("tests[{i}].system"),
                "code system has no HL7 table 0396 identifier",
            );
        }
    }
    issues.date_order(
        "requested_at",
        order.patient.birth_date,
        order.requested_at.map(|at| at.date_naive()),
    );

    issues.finish("lab order", &order.id)
}

/// Checks a clinical record before it is rendered as FHIR.
pub fn validate_record(record: &CanonicalRecord, codes: &CodeSystems) -> Vec<ValidationIssue> {
    let mut issues = Issues::default();
    issues.identifier("id", Some(record.id()));

    match record {
        CanonicalRecord::Patient(patient) => {
            issues.mapped("gender", &codes.administrative_gender, patient.gender);
        }
        CanonicalRecord::Encounter(encounter) => {
            issues.identifier("subject_id", Some(&encounter.subject_id));
            issues.mapped("status", &codes.encounter_status, encounter.status);
            issues.mapped("class", &codes.encounter_class, encounter.class);
            if let Err(err) = encounter.period.check() {
                issues.push("period.end", err.to_string());
            }
            if let Some(deleted_at) = encounter.deleted_at {
                if deleted_at < encounter.period.start {
                    issues.push("deleted_at", "deleted before the encounter started");
                }
            }
            for (i, code) in encounter.reason_codes.iter().enumerate() {
                clinical_system(&mut issues, &format!("reason_codes[{i}]"), code, codes);
            }
        }
        CanonicalRecord::Observation(observation) => {
            issues.identifier("subject_id", Some(&observation.subject_id));
            issues.mapped("status", &codes.observation_status, observation.status);
            if let Some(category) = observation.category {
                issues.mapped("category", &codes.observation_category, category);
            }
            if let Some(interpretation) = observation.interpretation {
                issues.mapped(
                    "interpretation",
                    &codes.observation_interpretation,
                    interpretation,
                );
            }
            clinical_system(&mut issues, "code", &observation.code, codes);
        }
        CanonicalRecord::Condition(condition) => {
            issues.identifier("subject_id", Some(&condition.subject_id));
            issues.mapped("clinical_status", &codes.condition_clinical, condition.clinical_status);
            if let Some(category) = condition.category {
                issues.mapped("category", &codes.condition_category, category);
            }
            issues.date_order(
                "recorded_on",
                condition.onset_at.map(|at| at.date_naive()),
                condition.recorded_on,
            );
            clinical_system(&mut issues, "code", &condition.code, codes);
        }
        CanonicalRecord::MedicationRequest(request) => {
            issues.identifier("subject_id", Some(&request.subject_id));
            issues.mapped("status", &codes.medication_request_status, request.status);
            issues.mapped("intent", &codes.medication_request_intent, request.intent);
            clinical_system(&mut issues, "medication", &request.medication, codes);
        }
    }

    issues.finish(record.resource_type(), record.id())
}

/// DMG carries a gender only alongside a birth date.
fn person_gender(issues: &mut Issues, path: &str, person: &Person, codes: &CodeSystems) {
    if person.birth_date.is_some() {
        issues.mapped(&format!("{path}.gender"), &codes.x12_gender, person.gender);
    }
}

fn provider_npi(issues: &mut Issues, field: &str, provider: &Provider) {
    issues.npi(field, provider.npi.as_deref(), false);
}

fn clinical_system(issues: &mut Issues, path: &str, code: &ClinicalCode, codes: &CodeSystems) {
    let mapped = code
        .system
        .known()
        .is_some_and(|system| codes.clinical_system.contains(*system));
    if !mapped {
        issues.push(
            format!("{path}.system"),
            "code system has no FHIR system URI",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{claim, eligibility_request, encounter, lab_order};
    use canonical::{ConditionClinicalStatus, ConditionRecord, Gender, ServiceType};
    use chrono::{TimeZone, Utc};

    fn fields(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|issue| issue.field.as_str()).collect()
    }

    #[test]
    fn valid_records_pass() {
        let codes = CodeSystems::standard();
        assert!(validate_claim(&claim("PCN-1"), codes).is_empty());
        assert!(validate_eligibility_request(&eligibility_request(), codes).is_empty());
        assert!(validate_lab_order(&lab_order(), codes).is_empty());
        assert!(validate_record(&CanonicalRecord::Encounter(encounter()), codes).is_empty());
    }

    #[test]
    fn claim_checks_do_not_short_circuit() {
        let mut claim = claim("  ");
        claim.subscriber.member_id = None;
        claim.claim_type = ClaimType::Institutional;
        claim.statement_from = NaiveDate::from_ymd_opt(2024, 2, 21);
        claim.statement_to = NaiveDate::from_ymd_opt(2024, 2, 19);
        claim.lines[0].units = Decimal::ZERO;
        claim.lines[1].procedure = ClinicalCode::new(ClinicalSystem::Loinc, "2345-7");

        let issues = validate_claim(&claim, CodeSystems::standard());
        assert_eq!(
            fields(&issues),
            [
                "id",
                "subscriber.member_id",
                "statement_to",
                "lines[0].units",
                "lines[0].service_date",
                "lines[0].service_date",
                "lines[1].procedure",
                "lines[1].service_date",
                "lines[1].service_date",
            ]
        );
    }

    #[test]
    fn missing_diagnoses_are_left_to_the_builder() {
        let mut claim = claim("PCN-1");
        claim.diagnoses.clear();
        assert!(validate_claim(&claim, CodeSystems::standard()).is_empty());
    }

    #[test]
    fn zero_pointer_is_out_of_range() {
        let mut claim = claim("PCN-1");
        claim.lines[0].diagnosis_pointers = vec![0, 1];
        let issues = validate_claim(&claim, CodeSystems::standard());
        assert_eq!(
            issues,
            [ValidationIssue {
                field: "lines[0].diagnosis_pointers".into(),
                reason: "pointer 0 is outside 1..=2".into(),
            }]
        );
    }

    #[test]
    fn gender_without_x12_code_is_reported() {
        let mut request = eligibility_request();
        request.subscriber.person.gender = Gender::Other;
        request.service_types.push(ServiceType::HealthBenefitPlanCoverage);
        let issues = validate_eligibility_request(&request, CodeSystems::standard());
        assert_eq!(fields(&issues), ["subscriber.person.gender"]);
    }

    #[test]
    fn eligibility_dates_and_npi() {
        let mut request = eligibility_request();
        request.provider.npi = Some("12345".into());
        request.service_date = NaiveDate::from_ymd_opt(1979, 12, 31);
        let issues = validate_eligibility_request(&request, CodeSystems::standard());
        assert_eq!(fields(&issues), ["provider.npi", "service_date"]);
        assert_eq!(issues[0].reason, "invalid NPI: '12345'");
    }

    #[test]
    fn restricted_registry_reports_unmapped_values() {
        let mut restricted = *CodeSystems::standard();
        restricted.encounter_status.entries = &restricted.encounter_status.entries[..1];
        let issues = validate_record(&CanonicalRecord::Encounter(encounter()), &restricted);
        assert_eq!(fields(&issues), ["status"]);
        assert!(issues[0].reason.contains("InProgress"), "{}", issues[0].reason);
    }

    #[test]
    fn condition_recorded_before_onset() {
        let condition = ConditionRecord {
            id: "c1".into(),
            subject_id: "pat-1".into(),
            encounter_id: None,
            clinical_status: ConditionClinicalStatus::Active,
            category: None,
            code: ClinicalCode::new(ClinicalSystem::Icd10Cm, "E11.9"),
            onset_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single(),
            recorded_on: NaiveDate::from_ymd_opt(2024, 2, 1),
        };
        let issues = validate_record(
            &CanonicalRecord::Condition(condition),
            CodeSystems::standard(),
        );
        assert_eq!(fields(&issues), ["recorded_on"]);
    }

    #[test]
    fn lab_order_unmapped_class() {
        let mut order = lab_order();
        order.encounter_class = Some(canonical::EncounterClass::Virtual);
        order.ordering_provider.npi = Some("1234567890".into());
        let issues = validate_lab_order(&order, CodeSystems::standard());
        assert_eq!(fields(&issues), ["ordering_provider.npi", "encounter_class"]);
    }
}
