//! Outbound segment assembly.
//!
//! Every segment goes through [`SegmentWriter::push`], which trims trailing empty elements,
//! checks the segment against the schema and refuses values that contain a configured
//! delimiter. Nothing is escaped or altered.

use crate::delimiters::Delimiters;
use crate::schema::spec_for;
use crate::{X12Error, X12Result};

/// One outbound element: a list of components (a simple element has exactly one).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Element(Vec<String>);

impl Element {
    fn is_empty(&self) -> bool {
        self.0.iter().all(|c| c.is_empty())
    }
}

/// An outbound segment under construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Seg {
    tag: &'static str,
    elements: Vec<Element>,
}

impl Seg {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            elements: Vec::new(),
        }
    }

    /// Appends a simple element.
    pub fn el(mut self, value: impl Into<String>) -> Self {
        self.elements.push(Element(vec![value.into()]));
        self
    }

    /// Appends a simple element, empty when `value` is `None`.
    pub fn opt<S: Into<String>>(self, value: Option<S>) -> Self {
        match value {
            Some(value) => self.el(value),
            None => self.empty(),
        }
    }

    pub fn empty(mut self) -> Self {
        self.elements.push(Element::default());
        self
    }

    /// Appends `n` empty elements.
    pub fn skip(mut self, n: usize) -> Self {
        for _ in 0..n {
            self.elements.push(Element::default());
        }
        self
    }

    /// Appends a composite element. Trailing empty components are dropped.
    pub fn comp<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut components: Vec<String> = components.into_iter().map(Into::into).collect();
        while components.last().is_some_and(String::is_empty) {
            components.pop();
        }
        self.elements.push(Element(components));
        self
    }

    fn render(mut self, delimiters: &Delimiters) -> X12Result<String> {
        while self.elements.last().is_some_and(Element::is_empty) {
            self.elements.pop();
        }

        if let Some(spec) = spec_for(self.tag) {
            let elements = &self.elements;
            let present = |n: usize| elements.get(n - 1).is_some_and(|e| !e.is_empty());
            if let Some(reason) = spec.violation(elements.len(), present) {
                return Err(X12Error::SchemaViolation {
                    tag: self.tag.to_string(),
                    reason,
                });
            }
        }

        let mut out = String::from(self.tag);
        for (i, element) in self.elements.iter().enumerate() {
            for value in &element.0 {
                if value.chars().any(|c| delimiters.contains(c)) {
                    return Err(X12Error::DelimiterInData {
                        tag: self.tag.to_string(),
                        position: i + 1,
                        value: value.clone(),
                    });
                }
            }
            out.push(delimiters.element);
            let mut components = element.0.iter();
            if let Some(first) = components.next() {
                out.push_str(first);
            }
            for component in components {
                out.push(delimiters.component);
                out.push_str(component);
            }
        }
        Ok(out)
    }
}

/// Accumulates validated, rendered segments.
#[derive(Debug)]
pub(crate) struct SegmentWriter {
    delimiters: Delimiters,
    segments: Vec<String>,
}

impl SegmentWriter {
    pub fn new(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            segments: Vec::new(),
        }
    }

    /// Validates and appends one segment.
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` or `DelimiterInData`; the writer is left unchanged.
    pub fn push(&mut self, segment: Seg) -> X12Result<()> {
        let rendered = segment.render(&self.delimiters)?;
        self.segments.push(rendered);
        Ok(())
    }

    /// Appends a segment that was rendered and validated elsewhere.
    pub fn push_rendered(&mut self, segment: String) {
        self.segments.push(segment);
    }

    pub fn into_segments(self) -> Vec<String> {
        self.segments
    }
}

/// A built transaction body (the segments between ST and SE), ready to be enveloped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSet {
    /// ST01, e.g. `270` or `837`.
    pub set_id: &'static str,
    /// GS01 functional identifier.
    pub functional_id: &'static str,
    /// GS08 / ST03 implementation guide.
    pub guide: &'static str,
    /// The canonical id the transaction was built from.
    pub reference: String,
    pub(crate) body: Vec<String>,
}

impl TransactionSet {
    /// Segment count including ST and SE, i.e. the SE01 value.
    pub fn segment_count(&self) -> usize {
        self.body.len() + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(seg: Seg) -> X12Result<String> {
        let mut writer = SegmentWriter::new(Delimiters::default());
        writer.push(seg)?;
        Ok(writer.into_segments().remove(0))
    }

    #[test]
    fn renders_composites_and_trims_trailing_empties() {
        let sv1 = Seg::new("SV1")
            .comp(["HC", "99213", "", ""])
            .el("150")
            .el("UN")
            .el("1")
            .empty()
            .empty()
            .comp(["1", "2"])
            .empty();
        assert_eq!(render(sv1).expect("render"), "SV1*HC:99213*150*UN*1***1:2");
    }

    #[test]
    fn rejects_delimiter_in_data() {
        let err = render(Seg::new("NM1").el("IL").el("1").el("O*BRIEN")).expect_err("must fail");
        assert_eq!(
            err,
            X12Error::DelimiterInData {
                tag: "NM1".into(),
                position: 3,
                value: "O*BRIEN".into()
            }
        );
    }

    #[test]
    fn rejects_empty_required_element() {
        let err = render(Seg::new("REF").el("EI").opt(None::<String>)).expect_err("must fail");
        assert!(matches!(err, X12Error::SchemaViolation { ref tag, .. } if tag == "REF"));
    }
}
