//! Pipe-delimited message model.
//!
//! Fields are numbered the HL7 way: for MSH, field 1 is the field separator itself and field 2
//! the remaining encoding characters; for every other segment field 1 follows the segment name.
//! Accessors return unescaped text and treat empty values as absent.

use crate::encoding::EncodingCharacters;
use crate::{Hl7Error, Hl7Result};

/// One received segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    /// 1-based line number within the message.
    pub position: usize,
    fields: Vec<String>,
    encoding: EncodingCharacters,
}

impl Segment {
    fn parse(line: &str, position: usize, encoding: EncodingCharacters) -> Hl7Result<Self> {
        let mut parts = line.split(encoding.field);
        let name = parts.next().unwrap_or_default().trim().to_string();
        if name.len() != 3 || !name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(Hl7Error::MalformedSegment {
                segment: name,
                position,
                reason: "segment name must be three upper-case letters or digits".into(),
            });
        }

        let mut fields: Vec<String> = Vec::new();
        if name == "MSH" {
            fields.push(encoding.field.to_string());
        }
        fields.extend(parts.map(str::to_string));

        Ok(Self {
            name,
            position,
            fields,
            encoding,
        })
    }

    fn raw(&self, n: usize) -> Option<&str> {
        let value = self.fields.get(n.checked_sub(1)?)?.as_str();
        (!value.trim().is_empty()).then_some(value)
    }

    /// Field `n`, first repetition, unescaped.
    pub fn field(&self, n: usize) -> Option<String> {
        self.repetitions(n).into_iter().next()
    }

    /// Component `c` (1-based) of the first repetition of field `n`, unescaped.
    pub fn component(&self, n: usize, c: usize) -> Option<String> {
        let repetition = self.raw(n)?.split(self.encoding.repetition).next()?;
        let component = repetition
            .split(self.encoding.component)
            .nth(c.checked_sub(1)?)?
            // Subcomponents are not modelled; keep the first.
            .split(self.encoding.subcomponent)
            .next()?;
        let value = self.encoding.unescape(component.trim());
        (!value.is_empty()).then_some(value)
    }

    /// The non-empty repetitions of field `n`, unescaped.
    pub fn repetitions(&self, n: usize) -> Vec<String> {
        if self.name == "MSH" && n <= 2 {
            return self.raw(n).map(|v| vec![v.to_string()]).unwrap_or_default();
        }
        self.raw(n)
            .map(|value| {
                value
                    .split(self.encoding.repetition)
                    .map(|rep| self.encoding.unescape(rep.trim()))
                    .filter(|rep| !rep.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether field `n` holds a value.
    pub fn has(&self, n: usize) -> bool {
        self.raw(n).is_some()
    }

    pub(crate) fn require(&self, n: usize) -> Hl7Result<()> {
        if self.has(n) {
            Ok(())
        } else {
            Err(Hl7Error::MalformedSegment {
                segment: self.name.clone(),
                position: self.position,
                reason: format!("required field {}-{n} is empty", self.name),
            })
        }
    }
}

/// A received message: its encoding characters and segments in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub encoding: EncodingCharacters,
    pub segments: Vec<Segment>,
}

impl Message {
    /// Splits a message into segments. Segments may be separated by `\r`, `\n` or `\r\n`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHeader` when the message does not open with a valid MSH segment and
    /// `MalformedSegment` for a line that has no valid segment name.
    pub fn parse(text: &str) -> Hl7Result<Self> {
        let mut lines = text
            .split(['\r', '\n'])
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| Hl7Error::InvalidHeader("message is empty".into()))?
            .trim_start();
        let encoding = EncodingCharacters::from_msh(header)?;

        let mut segments = vec![Segment::parse(header, 1, encoding)?];
        for (i, line) in lines.enumerate() {
            segments.push(Segment::parse(line.trim_start(), i + 2, encoding)?);
        }
        Ok(Self { encoding, segments })
    }

    pub fn header(&self) -> Option<&Segment> {
        self.segments.first()
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// An outbound segment under construction. Values are escaped when added.
#[derive(Clone, Debug)]
pub(crate) struct SegmentBuilder {
    name: &'static str,
    fields: Vec<String>,
    encoding: EncodingCharacters,
}

impl SegmentBuilder {
    pub fn new(name: &'static str, encoding: EncodingCharacters) -> Self {
        Self {
            name,
            fields: Vec::new(),
            encoding,
        }
    }

    pub fn field(mut self, value: impl AsRef<str>) -> Self {
        self.fields.push(self.encoding.escape(value.as_ref()));
        self
    }

    /// Appends a value that is already in wire form, such as MSH-2.
    pub fn raw(mut self, value: impl Into<String>) -> Self {
        self.fields.push(value.into());
        self
    }

    pub fn opt(self, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(value) => self.field(value),
            None => self.empty(),
        }
    }

    pub fn empty(mut self) -> Self {
        self.fields.push(String::new());
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.fields.extend(std::iter::repeat(String::new()).take(n));
        self
    }

    /// A composite field; trailing empty components are dropped.
    pub fn components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut parts: Vec<String> = components
            .into_iter()
            .map(|c| c.map(|c| self.encoding.escape(c.as_ref())).unwrap_or_default())
            .collect();
        while parts.last().is_some_and(String::is_empty) {
            parts.pop();
        }
        let separator = self.encoding.component.to_string();
        self.fields.push(parts.join(&separator));
        self
    }

    pub fn render(mut self) -> String {
        while self.fields.last().is_some_and(String::is_empty) {
            self.fields.pop();
        }
        let mut out = String::from(self.name);
        for field in &self.fields {
            out.push(self.encoding.field);
            out.push_str(field);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msh_fields_are_numbered_from_the_separator() {
        let message = Message::parse("MSH|^~\\&|LAB|CITY|||20240301||ORU^R01|42|P|2.5.1\r")
            .expect("parse");
        let msh = message.header().expect("msh");
        assert_eq!(msh.field(1).as_deref(), Some("|"));
        assert_eq!(msh.field(2).as_deref(), Some("^~\\&"));
        assert_eq!(msh.field(3).as_deref(), Some("LAB"));
        assert_eq!(msh.component(9, 2).as_deref(), Some("R01"));
        assert_eq!(msh.field(10).as_deref(), Some("42"));
    }

    #[test]
    fn splits_on_any_line_ending() {
        let message = Message::parse("MSH|^~\\&|A\r\nPID|1\nOBX|1\rNTE|1\r").expect("parse");
        let names: Vec<_> = message.segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["MSH", "PID", "OBX", "NTE"]);
        assert_eq!(message.segments[3].position, 4);
    }

    #[test]
    fn components_and_repetitions_are_unescaped() {
        let message =
            Message::parse("MSH|^~\\&|A\rPID|1||MRN1^^^H~SSN9||O\\S\\BRIEN^ANN").expect("parse");
        let pid = &message.segments[1];
        assert_eq!(pid.repetitions(3), vec!["MRN1^^^H".to_string(), "SSN9".to_string()]);
        assert_eq!(pid.component(3, 1).as_deref(), Some("MRN1"));
        assert_eq!(pid.component(5, 1).as_deref(), Some("O^BRIEN"));
        assert_eq!(pid.component(5, 2).as_deref(), Some("ANN"));
        assert_eq!(pid.component(5, 3), None);
    }

    #[test]
    fn bad_segment_name_is_malformed() {
        let err = Message::parse("MSH|^~\\&|A\rpid|1").expect_err("malformed");
        assert!(matches!(err, Hl7Error::MalformedSegment { position: 2, .. }));
    }

    #[test]
    fn builder_escapes_and_trims() {
        let encoding = EncodingCharacters::default();
        let segment = SegmentBuilder::new("OBX", encoding)
            .field("1")
            .field("ST")
            .components([Some("1234-5"), Some("A|B"), None])
            .empty()
            .render();
        assert_eq!(segment, "OBX|1|ST|1234-5^A\\F\\B");
    }
}
