use crate::delimiters::Delimiters;

/// One inbound segment as received.
///
/// Elements are kept as raw text; composite and repeated elements are split on demand with the
/// interchange's own separators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub tag: String,
    elements: Vec<String>,
    /// 1-based position of the segment within its interchange.
    pub position: usize,
    delimiters: Delimiters,
}

impl Segment {
    pub(crate) fn parse(raw: &str, position: usize, delimiters: Delimiters) -> Self {
        let mut parts = raw.split(delimiters.element);
        let tag = parts.next().unwrap_or_default().trim().to_string();
        Self {
            tag,
            elements: parts.map(str::to_string).collect(),
            position,
            delimiters,
        }
    }

    /// Element count with trailing empty elements ignored.
    pub fn element_count(&self) -> usize {
        self.elements
            .iter()
            .rposition(|e| !e.trim().is_empty())
            .map_or(0, |i| i + 1)
    }

    /// Element `n` (1-based), trimmed. Empty elements read as `None`.
    pub fn element(&self, n: usize) -> Option<&str> {
        let value = self.elements.get(n.checked_sub(1)?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Element `n` without trimming, as used by the fixed-width ISA fields.
    pub(crate) fn raw_element(&self, n: usize) -> Option<&str> {
        self.elements.get(n.checked_sub(1)?).map(String::as_str)
    }

    /// The components of composite element `n`.
    pub fn components(&self, n: usize) -> Vec<&str> {
        self.element(n)
            .map(|value| value.split(self.delimiters.component).map(str::trim).collect())
            .unwrap_or_default()
    }

    /// Component `c` (1-based) of composite element `n`.
    pub fn component(&self, n: usize, c: usize) -> Option<&str> {
        let value = *self.components(n).get(c.checked_sub(1)?)?;
        (!value.is_empty()).then_some(value)
    }

    /// The non-empty repetitions of element `n`.
    pub fn repetitions(&self, n: usize) -> Vec<&str> {
        self.element(n)
            .map(|value| {
                value
                    .split(self.delimiters.repetition)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether element `n` equals `expected`.
    pub fn is(&self, n: usize, expected: &str) -> bool {
        self.element(n) == Some(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(raw: &str) -> Segment {
        Segment::parse(raw, 1, Delimiters::default())
    }

    #[test]
    fn reads_elements_and_components() {
        let svc = segment("SVC*HC:99213:25*150*120**1");
        assert_eq!(svc.tag, "SVC");
        assert_eq!(svc.element(2), Some("150"));
        assert_eq!(svc.element(4), None);
        assert_eq!(svc.components(1), vec!["HC", "99213", "25"]);
        assert_eq!(svc.component(1, 2), Some("99213"));
        assert_eq!(svc.component(1, 4), None);
        assert_eq!(svc.element_count(), 5);
    }

    #[test]
    fn trailing_empty_elements_are_not_counted() {
        assert_eq!(segment("REF*EJ*123**").element_count(), 2);
        assert_eq!(segment("LS").element_count(), 0);
        assert_eq!(segment("EB*1**30^1^33").repetitions(3), vec!["30", "1", "33"]);
    }
}
