//! Laboratory order (ORM^O01).

use crate::header::Hl7Header;
use crate::message::SegmentBuilder;
use crate::{Hl7Error, Hl7Result};
use canonical::{ClinicalCode, LabOrder, Person, Provider};
use chrono::{DateTime, NaiveDate, Utc};
use codes::CodeSystems;
use medwire_types::{present, Clock, Coded, ControlNumberSequence};

const RECORD: &str = "LabOrder";

/// Builds outbound HL7 v2 messages for one receiving application.
pub struct Hl7Builder<'a> {
    header: &'a Hl7Header,
    codes: &'a CodeSystems,
    clock: &'a dyn Clock,
    sequence: &'a dyn ControlNumberSequence,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S%z").to_string()
}

fn date(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn required<'v>(value: Option<&'v str>, field: &str) -> Hl7Result<&'v str> {
    present(value).ok_or_else(|| Hl7Error::IncompleteRecord {
        record: RECORD,
        field: field.to_string(),
    })
}

impl<'a> Hl7Builder<'a> {
    pub fn new(
        header: &'a Hl7Header,
        codes: &'a CodeSystems,
        clock: &'a dyn Clock,
        sequence: &'a dyn ControlNumberSequence,
    ) -> Self {
        Self {
            header,
            codes,
            clock,
            sequence,
        }
    }

    /// Builds an `ORM^O01` new-order message with one OBR per ordered test.
    ///
    /// Segments are separated by carriage returns.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteRecord` naming the first missing required field, `InvalidValue` for a
    /// test coded in a system HL7 cannot identify, `Unmapped` for a value with no HL7 code, or
    /// `InvalidHeader` when the configured encoding characters are unusable.
    pub fn lab_order(&self, order: &LabOrder) -> Hl7Result<String> {
        let encoding = self.header.encoding;
        encoding.check()?;

        let id = required(Some(order.id.as_str()), "id")?;
        let patient_id = required(Some(order.patient_id.as_str()), "patient_id")?;
        let last_name = required(order.patient.last_name.as_deref(), "patient.last_name")?;
        let provider = ordering_provider(&order.ordering_provider)?;
        if order.tests.is_empty() {
            return Err(Hl7Error::IncompleteRecord {
                record: RECORD,
                field: "tests".into(),
            });
        }
        let tests = order
            .tests
            .iter()
            .enumerate()
            .map(|(i, test)| self.coded(test, &format!("tests[{i}]")))
            .collect::<Hl7Result<Vec<_>>>()?;

        let now = self.clock.now();
        let control_id = self.sequence.next_control_number().to_string();
        let segment = |name| SegmentBuilder::new(name, encoding);
        let mut segments = Vec::new();

        segments.push(
            segment("MSH")
                .raw(encoding.msh2())
                .field(&self.header.sending_application)
                .field(&self.header.sending_facility)
                .field(&self.header.receiving_application)
                .field(&self.header.receiving_facility)
                .field(timestamp(&now))
                .empty()
                .components([Some("ORM"), Some("O01"), Some("ORM_O01")])
                .field(&control_id)
                .field(self.header.processing_id.code())
                .field(&self.header.version)
                .render(),
        );

        segments.push(self.patient(patient_id, last_name, &order.patient)?);

        if let Some(class) = order.encounter_class {
            segments.push(
                segment("PV1")
                    .field("1")
                    .field(self.codes.hl7_patient_class.code(class)?)
                    .render(),
            );
        }

        let provider = || provider.iter().map(|p| Some(p.as_str()));
        segments.push(
            segment("ORC")
                .field("NW")
                .field(id)
                .skip(6)
                .field(timestamp(&now))
                .skip(2)
                .components(provider())
                .render(),
        );
        segments.push(
            segment("TQ1")
                .field("1")
                .skip(5)
                .opt(order.requested_at.as_ref().map(timestamp))
                .empty()
                .field(self.codes.hl7_priority.code(order.priority)?)
                .render(),
        );
        for (i, test) in tests.iter().enumerate() {
            segments.push(
                segment("OBR")
                    .field((i + 1).to_string())
                    .field(id)
                    .empty()
                    .components(test.iter().map(|c| c.as_deref()))
                    .skip(11)
                    .components(provider())
                    .render(),
            );
        }

        tracing::info!(order = %id, tests = tests.len(), control = %control_id, "built ORM^O01 lab order");
        let mut message = segments.join("\r");
        message.push('\r');
        Ok(message)
    }

    fn patient(&self, patient_id: &str, last_name: &str, person: &Person) -> Hl7Result<String> {
        let address = person.address.as_ref();
        let line = |n: usize| address.and_then(|a| a.lines.get(n)).map(String::as_str);
        Ok(SegmentBuilder::new("PID", self.header.encoding)
            .field("1")
            .empty()
            .components([
                Some(patient_id),
                None,
                None,
                Some(self.header.sending_facility.as_str()),
                Some("MR"),
            ])
            .empty()
            .components([
                Some(last_name),
                person.first_name.as_deref(),
                person.middle_name.as_deref(),
            ])
            .empty()
            .opt(person.birth_date.as_ref().map(date))
            .field(self.codes.hl7_gender.code(person.gender)?)
            .skip(2)
            .components([
                line(0),
                line(1),
                address.and_then(|a| a.city.as_deref()),
                address.and_then(|a| a.state.as_deref()),
                address.and_then(|a| a.postal_code.as_deref()),
            ])
            .render())
    }

    /// CWE components `code^text^system`.
    fn coded(&self, code: &ClinicalCode, field: &str) -> Hl7Result<[Option<String>; 3]> {
        let system = match &code.system {
            Coded::Known(system) => self.codes.hl7_coding_system.code(*system)?,
            Coded::Unknown(raw) => {
                return Err(Hl7Error::InvalidValue {
                    field: format!("{field}.system"),
                    reason: format!("coding system {} has no HL7 identifier", raw.system),
                })
            }
        };
        let value = required(Some(code.code.as_str()), &format!("{field}.code"))?;
        Ok([
            Some(value.to_string()),
            code.display.clone(),
            Some(system.to_string()),
        ])
    }
}

/// XCN components `npi^family^given` of the ordering provider.
fn ordering_provider(provider: &Provider) -> Hl7Result<Vec<String>> {
    let npi = required(provider.npi.as_deref(), "ordering_provider.npi")?;
    let name = required(provider.name.as_deref(), "ordering_provider.name")?;
    let mut components = vec![npi.to_string(), name.to_string()];
    if let Some(first) = present(provider.first_name.as_deref()) {
        components.push(first.to_string());
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::tests::header;
    use crate::message::Message;
    use canonical::{Address, ClinicalSystem, EncounterClass, Gender, OrderPriority};
    use chrono::TimeZone;
    use medwire_types::{AtomicSequence, FixedClock};

    fn order() -> LabOrder {
        LabOrder {
            id: "ORD-1001".into(),
            patient_id: "MRN-42".into(),
            patient: Person {
                last_name: Some("DOE".into()),
                first_name: Some("JOHN".into()),
                birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
                gender: Gender::Male,
                address: Some(Address {
                    lines: vec!["100 MAIN ST".into()],
                    city: Some("SPRINGFIELD".into()),
                    state: Some("IL".into()),
                    postal_code: Some("62701".into()),
                }),
                ..Person::default()
            },
            encounter_class: Some(EncounterClass::Ambulatory),
            ordering_provider: Provider {
                npi: Some("1245319599".into()),
                name: Some("SMITH".into()),
                first_name: Some("ANNA".into()),
                ..Provider::default()
            },
            tests: vec![
                ClinicalCode::new(ClinicalSystem::Loinc, "2345-7").with_display("Glucose"),
                ClinicalCode::new(ClinicalSystem::Loinc, "4548-4").with_display("Hemoglobin A1c"),
            ],
            priority: OrderPriority::Routine,
            requested_at: Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).single(),
        }
    }

    fn build(order: &LabOrder) -> Hl7Result<String> {
        let header = header();
        let clock = FixedClock(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        );
        let sequence = AtomicSequence::starting_at(77);
        Hl7Builder::new(&header, CodeSystems::standard(), &clock, &sequence).lab_order(order)
    }

    #[test]
    fn builds_orm_o01() {
        let message = build(&order()).expect("build");
        let lines: Vec<&str> = message.split_terminator('\r').collect();
        assert_eq!(
            lines,
            [
                "MSH|^~\\&|MEDWIRE|RIVERSIDE|LIS|CITYLAB|20240301120000+0000||ORM^O01^ORM_O01|77|P|2.5.1",
                "PID|1||MRN-42^^^RIVERSIDE^MR||DOE^JOHN||19800101|M|||100 MAIN ST^^SPRINGFIELD^IL^62701",
                "PV1|1|O",
                "ORC|NW|ORD-1001|||||||20240301120000+0000|||1245319599^SMITH^ANNA",
                "TQ1|1||||||20240302083000+0000||R",
                "OBR|1|ORD-1001||2345-7^Glucose^LN||||||||||||1245319599^SMITH^ANNA",
                "OBR|2|ORD-1001||4548-4^Hemoglobin A1c^LN||||||||||||1245319599^SMITH^ANNA",
            ]
        );
    }

    #[test]
    fn text_with_separators_is_escaped_and_reads_back() {
        let mut order = order();
        order.patient.last_name = Some("O'NEIL|SMITH".into());
        order.tests[0].display = Some("Glucose^fasting".into());
        let message = build(&order).expect("build");
        assert!(message.contains("PID|1||MRN-42^^^RIVERSIDE^MR||O'NEIL\\F\\SMITH^JOHN|"));

        let parsed = Message::parse(&message).expect("parse");
        let obr = parsed
            .segments
            .iter()
            .find(|s| s.name == "OBR")
            .expect("OBR");
        assert_eq!(obr.component(4, 2).as_deref(), Some("Glucose^fasting"));
        assert_eq!(parsed.segments[1].component(5, 1).as_deref(), Some("O'NEIL|SMITH"));
    }

    #[test]
    fn missing_fields_are_named() {
        let mut order = order();
        order.ordering_provider.npi = None;
        assert_eq!(
            build(&order).expect_err("incomplete"),
            Hl7Error::IncompleteRecord {
                record: "LabOrder",
                field: "ordering_provider.npi".into()
            }
        );

        let mut order = self::order();
        order.tests.clear();
        assert_eq!(
            build(&order).expect_err("incomplete"),
            Hl7Error::IncompleteRecord {
                record: "LabOrder",
                field: "tests".into()
            }
        );
    }

    #[test]
    fn unmapped_class_fails_without_output() {
        let mut order = order();
        order.encounter_class = Some(EncounterClass::Virtual);
        assert!(matches!(build(&order), Err(Hl7Error::Unmapped(_))));
    }

    #[test]
    fn unknown_test_system_is_invalid() {
        let mut order = order();
        order.tests[1].system = Coded::Unknown(medwire_types::RawCode::new("urn:local", "X"));
        assert!(matches!(
            build(&order),
            Err(Hl7Error::InvalidValue { field, .. }) if field == "tests[1].system"
        ));
    }
}
