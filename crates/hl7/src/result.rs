//! Laboratory result (ORU^R01).

use crate::message::{Message, Segment};
use crate::{Hl7Error, Hl7Result};
use canonical::{
    Address, ClinicalCode, LabResult, ObservationCategory, ObservationValue, PartialObservation,
    Person, ResultGroup,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use codes::CodeSystems;
use medwire_types::{Coded, Decoded, Warning};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses an `ORU^R01` message.
///
/// Each OBR opens a result group; OBX segments become observations of the current group and NTE
/// segments after an OBX are appended to its note. Segments outside the handled subset are
/// skipped with an `UnknownSegment` warning.
///
/// # Errors
///
/// Returns `InvalidEncoding` for non-UTF-8 input, `InvalidHeader` or `UnsupportedMessage` for a
/// message that is not an ORU^R01, and `MalformedSegment` for a known segment missing a required
/// field.
pub fn parse_lab_result(input: &[u8], codes: &CodeSystems) -> Hl7Result<Decoded<LabResult>> {
    let text = std::str::from_utf8(input).map_err(|_| Hl7Error::InvalidEncoding)?;
    let message = Message::parse(text)?;
    let Some((msh, body)) = message.segments.split_first() else {
        return Err(Hl7Error::InvalidHeader("message is empty".into()));
    };

    msh.require(9)?;
    let message_type = msh.component(9, 1).unwrap_or_default();
    let trigger = msh.component(9, 2).unwrap_or_default();
    if message_type != "ORU" || !(trigger.is_empty() || trigger == "R01") {
        return Err(Hl7Error::UnsupportedMessage(format!("{message_type}^{trigger}")));
    }

    let mut walk = ResultWalk {
        codes,
        warnings: Vec::new(),
        result: LabResult {
            message_control_id: msh.field(10),
            ..LabResult::default()
        },
        in_observation: false,
    };
    walk.result.sent_at = walk.timestamp(msh, 7);

    for segment in body {
        walk.segment(segment)?;
    }

    tracing::debug!(
        control = walk.result.message_control_id.as_deref().unwrap_or_default(),
        groups = walk.result.groups.len(),
        "parsed ORU^R01 lab result"
    );
    Ok(Decoded::with_warnings(walk.result, walk.warnings))
}

struct ResultWalk<'a> {
    codes: &'a CodeSystems,
    warnings: Vec<Warning>,
    result: LabResult,
    /// Whether the last OBX is still open for NTE segments.
    in_observation: bool,
}

impl ResultWalk<'_> {
    fn segment(&mut self, segment: &Segment) -> Hl7Result<()> {
        match segment.name.as_str() {
            "PID" => {
                self.patient(segment)?;
                self.in_observation = false;
            }
            "OBR" => {
                self.order(segment)?;
                self.in_observation = false;
            }
            "OBX" => {
                self.observation(segment)?;
                self.in_observation = true;
            }
            "NTE" => self.note(segment),
            "PD1" | "PV1" | "PV2" | "ORC" | "TQ1" | "TQ2" | "SPM" | "SFT" | "NK1" | "CTI" => {
                tracing::debug!(segment = %segment.name, position = segment.position, "ignored segment");
                self.in_observation = false;
            }
            _ => {
                tracing::warn!(segment = %segment.name, position = segment.position, "skipping unknown segment");
                self.warnings.push(Warning::UnknownSegment {
                    tag: segment.name.clone(),
                    position: segment.position,
                });
            }
        }
        Ok(())
    }

    fn patient(&mut self, pid: &Segment) -> Hl7Result<()> {
        pid.require(3)?;
        self.result.patient_id = pid.component(3, 1);

        let gender = pid
            .field(8)
            .map(|code| {
                self.codes
                    .hl7_gender
                    .resolve_or_warn(&code, &mut self.warnings)
                    .into_known()
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let address = pid.has(11).then(|| Address {
            lines: [pid.component(11, 1), pid.component(11, 2)]
                .into_iter()
                .flatten()
                .collect(),
            city: pid.component(11, 3),
            state: pid.component(11, 4),
            postal_code: pid.component(11, 5),
        });

        self.result.patient = Some(Person {
            last_name: pid.component(5, 1),
            first_name: pid.component(5, 2),
            middle_name: pid.component(5, 3),
            birth_date: self.date(pid, 7),
            gender,
            address,
        });
        Ok(())
    }

    fn order(&mut self, obr: &Segment) -> Hl7Result<()> {
        obr.require(4)?;
        let group = ResultGroup {
            placer_order_id: obr.component(2, 1),
            filler_order_id: obr.component(3, 1),
            service: self.coded(obr, 4),
            observed_at: self.timestamp(obr, 7),
            observations: Vec::new(),
        };
        self.result.groups.push(group);
        Ok(())
    }

    fn observation(&mut self, obx: &Segment) -> Hl7Result<()> {
        obx.require(3)?;
        obx.require(11)?;

        let code = self.coded(obx, 3);
        let value = self.value(obx);
        let interpretation = obx
            .field(8)
            .map(|code| self.codes.hl7_abnormal_flag.resolve_or_warn(&code, &mut self.warnings));
        let status = obx
            .field(11)
            .map(|code| self.codes.hl7_result_status.resolve_or_warn(&code, &mut self.warnings));
        let effective_at = self.timestamp(obx, 14);

        if self.result.groups.is_empty() {
            self.result.groups.push(ResultGroup::default());
        }
        let patient_id = self.result.patient_id.clone();
        let Some(group) = self.result.groups.last_mut() else {
            return Ok(());
        };
        let order_id = group
            .filler_order_id
            .as_ref()
            .or(group.placer_order_id.as_ref());
        let id = match (order_id, obx.field(1)) {
            (Some(order), Some(set)) => Some(format!("{order}-{set}")),
            (None, set) => set,
            (Some(_), None) => None,
        };

        group.observations.push(PartialObservation {
            id,
            subject_id: patient_id,
            encounter_id: None,
            status,
            category: Some(Coded::Known(ObservationCategory::Laboratory)),
            code,
            value,
            effective_at: effective_at.or(group.observed_at),
            interpretation,
            reference_range: obx.field(7),
            note: None,
        });
        Ok(())
    }

    fn note(&mut self, nte: &Segment) {
        let observation = if self.in_observation {
            self.result
                .groups
                .last_mut()
                .and_then(|group| group.observations.last_mut())
        } else {
            None
        };
        let (Some(observation), Some(text)) = (observation, nte.repetitions(3).first().cloned())
        else {
            tracing::debug!(position = nte.position, "ignored note outside an observation");
            return;
        };
        observation.note = Some(match observation.note.take() {
            Some(existing) => format!("{existing}\n{text}"),
            None => text,
        });
    }

    /// OBX-5 interpreted by the OBX-2 value type.
    fn value(&mut self, obx: &Segment) -> Option<ObservationValue> {
        if !obx.has(5) {
            return None;
        }
        let unit = obx.component(6, 1);
        match obx.field(2).as_deref() {
            Some("NM") => {
                let raw = obx.field(5)?;
                match Decimal::from_str(raw.trim()) {
                    Ok(value) => Some(ObservationValue::Quantity { value, unit }),
                    Err(_) => {
                        self.unparsed("OBX-5", &raw);
                        Some(ObservationValue::Text(raw))
                    }
                }
            }
            Some("SN") => {
                let comparator = obx.component(5, 1).unwrap_or_default();
                let first = obx.component(5, 2).unwrap_or_default();
                let separator = obx.component(5, 3).unwrap_or_default();
                let second = obx.component(5, 4).unwrap_or_default();
                let plain = (comparator.is_empty() || comparator == "=") && separator.is_empty();
                match Decimal::from_str(&first) {
                    Ok(value) if plain => Some(ObservationValue::Quantity { value, unit }),
                    _ => Some(ObservationValue::Text(format!(
                        "{comparator}{first}{separator}{second}"
                    ))),
                }
            }
            Some("CWE" | "CE" | "CNE" | "CF") => {
                self.coded(obx, 5).map(ObservationValue::Coded)
            }
            _ => Some(ObservationValue::Text(obx.repetitions(5).join("\n"))),
        }
    }

    /// A CWE field `code^text^system`; the system resolves through table 0396.
    fn coded(&mut self, segment: &Segment, n: usize) -> Option<ClinicalCode> {
        let code = segment.component(n, 1)?;
        let system = segment.component(n, 3).unwrap_or_default();
        Some(ClinicalCode {
            system: self
                .codes
                .hl7_coding_system
                .resolve_or_warn(&system, &mut self.warnings),
            code,
            display: segment.component(n, 2),
        })
    }

    fn date(&mut self, segment: &Segment, n: usize) -> Option<NaiveDate> {
        let raw = segment.field(n)?;
        let digits = raw.get(..8).unwrap_or(&raw);
        match NaiveDate::parse_from_str(digits, "%Y%m%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.unparsed(&format!("{}-{n}", segment.name), &raw);
                None
            }
        }
    }

    fn timestamp(&mut self, segment: &Segment, n: usize) -> Option<DateTime<Utc>> {
        let raw = segment.field(n)?;
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            self.unparsed(&format!("{}-{n}", segment.name), &raw);
        }
        parsed
    }

    fn unparsed(&mut self, path: &str, value: &str) {
        tracing::warn!(path, value, "could not interpret HL7 value");
        self.warnings.push(Warning::UnparsedValue {
            path: path.to_string(),
            value: value.to_string(),
        });
    }
}

/// Parses an HL7 `DTM`: `YYYYMMDD[HH[MM[SS[.S+]]]][+/-ZZZZ]`.
///
/// A value without an offset is read as UTC; a date alone as midnight.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let (local, offset) = match raw.get(8..).and_then(|tail| tail.find(['+', '-'])) {
        Some(at) => raw.split_at(8 + at),
        None => (raw, ""),
    };
    let local = local.split('.').next().unwrap_or(local);
    if !local.bytes().all(|b| b.is_ascii_digit()) || !matches!(local.len(), 8 | 10 | 12 | 14) {
        return None;
    }
    let padded = format!("{local:0<14}");
    let naive = NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S").ok()?;

    if offset.is_empty() {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits = &offset[1..];
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonical::{ClinicalSystem, Gender, Interpretation, ObservationStatus};

    const ORU: &str = "MSH|^~\\&|LIS|CITYLAB|MEDWIRE|RIVERSIDE|20240302101500-0500||ORU^R01^ORU_R01|LAB-9001|P|2.5.1\r\
PID|1||MRN-42^^^RIVERSIDE^MR||DOE^JOHN^Q||19800101|M|||100 MAIN ST^^SPRINGFIELD^IL^62701\r\
ORC|RE|ORD-1001|FIL-77\r\
OBR|1|ORD-1001|FIL-77|2345-7^Glucose^LN|||20240302083000\r\
OBX|1|NM|2345-7^Glucose^LN||182|mg/dL^mg/dL^UCUM|70-99|H|||F|||20240302091000+0000\r\
NTE|1||Patient reported\\F\\not fasting\r\
NTE|2||Repeat advised\r\
OBX|2|NM|4548-4^Hemoglobin A1c^LN||<7.0|%||N|||F\r\
OBX|3|CWE|883-9^ABO group^LN||A^Group A^SCT||||||C\r\
OBX|4|SN|2160-0^Creatinine^LN||>^1.5|mg/dL|||||P\r\
ZPI|custom\r";

    fn parse(text: &str) -> Decoded<LabResult> {
        parse_lab_result(text.as_bytes(), CodeSystems::standard()).expect("parse")
    }

    #[test]
    fn parses_header_patient_and_groups() {
        let decoded = parse(ORU);
        let result = &decoded.value;
        assert_eq!(result.message_control_id.as_deref(), Some("LAB-9001"));
        assert_eq!(
            result.sent_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 15, 15, 0).single()
        );
        assert_eq!(result.patient_id.as_deref(), Some("MRN-42"));

        let patient = result.patient.as_ref().expect("patient");
        assert_eq!(patient.last_name.as_deref(), Some("DOE"));
        assert_eq!(patient.middle_name.as_deref(), Some("Q"));
        assert_eq!(patient.gender, Gender::Male);
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1980, 1, 1));
        assert_eq!(
            patient.address.as_ref().and_then(|a| a.city.as_deref()),
            Some("SPRINGFIELD")
        );

        assert_eq!(result.groups.len(), 1);
        let group = &result.groups[0];
        assert_eq!(group.filler_order_id.as_deref(), Some("FIL-77"));
        assert!(group
            .service
            .as_ref()
            .is_some_and(|s| s.is_system(ClinicalSystem::Loinc)));
        assert_eq!(result.observations().count(), 4);
    }

    #[test]
    fn maps_values_statuses_and_notes() {
        let decoded = parse(ORU);
        let observations: Vec<_> = decoded.value.observations().collect();

        let glucose = observations[0];
        assert_eq!(glucose.id.as_deref(), Some("FIL-77-1"));
        assert_eq!(glucose.subject_id.as_deref(), Some("MRN-42"));
        assert_eq!(
            glucose.value,
            Some(ObservationValue::Quantity {
                value: Decimal::new(182, 0),
                unit: Some("mg/dL".into()),
            })
        );
        assert_eq!(glucose.interpretation, Some(Coded::Known(Interpretation::High)));
        assert_eq!(glucose.status, Some(Coded::Known(ObservationStatus::Final)));
        assert_eq!(glucose.reference_range.as_deref(), Some("70-99"));
        assert_eq!(
            glucose.note.as_deref(),
            Some("Patient reported|not fasting\nRepeat advised")
        );
        assert_eq!(
            glucose.effective_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 9, 10, 0).single()
        );

        let a1c = observations[1];
        assert_eq!(a1c.value, Some(ObservationValue::Text("<7.0".into())));
        assert_eq!(
            a1c.effective_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).single()
        );

        let abo = observations[2];
        assert_eq!(abo.status, Some(Coded::Known(ObservationStatus::Corrected)));
        assert!(matches!(
            &abo.value,
            Some(ObservationValue::Coded(code)) if code.code == "A" && code.is_system(ClinicalSystem::Snomed)
        ));

        let creatinine = observations[3];
        assert_eq!(creatinine.value, Some(ObservationValue::Text(">1.5".into())));
        assert_eq!(creatinine.status, Some(Coded::Known(ObservationStatus::Preliminary)));
    }

    #[test]
    fn reports_unparsed_numbers_and_unknown_segments() {
        let decoded = parse(ORU);
        assert_eq!(
            decoded.warnings,
            vec![
                Warning::UnparsedValue {
                    path: "OBX-5".into(),
                    value: "<7.0".into(),
                },
                Warning::UnknownSegment {
                    tag: "ZPI".into(),
                    position: 11,
                },
            ]
        );
    }

    #[test]
    fn missing_observation_identifier_is_fatal() {
        let text = "MSH|^~\\&|LIS|CITYLAB|||20240302||ORU^R01|1|P|2.5.1\rPID|1||MRN-1\rOBR|1|||88-1^Panel^LN\rOBX|1|NM|||5||||||F\r";
        assert!(matches!(
            parse_lab_result(text.as_bytes(), CodeSystems::standard()),
            Err(Hl7Error::MalformedSegment { segment, position: 4, .. }) if segment == "OBX"
        ));
    }

    #[test]
    fn other_message_types_are_rejected() {
        let text = "MSH|^~\\&|ADT|CITY|||20240302||ADT^A01|1|P|2.5.1\rPID|1||MRN-1\r";
        assert_eq!(
            parse_lab_result(text.as_bytes(), CodeSystems::standard()).expect_err("adt"),
            Hl7Error::UnsupportedMessage("ADT^A01".into())
        );
    }

    #[test]
    fn unknown_codes_are_kept_raw() {
        let text = "MSH|^~\\&|LIS|CITYLAB|||20240302||ORU^R01|1|P|2.5.1\rPID|1||MRN-1|||||X\rOBR|1|||88-1^Panel^LN\rOBX|1|ST|88-2^Comment^LOCAL||free text||||||Z\r";
        let decoded = parse(text);
        let observation = decoded.value.observations().next().expect("observation");
        assert_eq!(observation.value, Some(ObservationValue::Text("free text".into())));
        assert!(matches!(observation.status, Some(Coded::Unknown(_))));
        assert_eq!(decoded.value.patient.as_ref().map(|p| p.gender), Some(Gender::Unknown));
        let unmapped: Vec<_> = decoded
            .warnings
            .iter()
            .filter_map(|w| match w {
                Warning::UnmappedExternalCode { code, .. } => Some(code.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(unmapped, ["X", "LOCAL", "Z"]);
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            parse_timestamp("20240302"),
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).single()
        );
        assert_eq!(
            parse_timestamp("202403021015+0130"),
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 45, 0).single()
        );
        assert_eq!(
            parse_timestamp("20240302101530.1234"),
            Utc.with_ymd_and_hms(2024, 3, 2, 10, 15, 30).single()
        );
        assert_eq!(parse_timestamp("2024-03-02"), None);
        assert_eq!(parse_timestamp("20240302+5"), None);
    }
}
