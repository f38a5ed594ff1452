//! Declarative segment schema.
//!
//! One entry per segment tag the codec writes or reads. The writer refuses to emit a segment
//! that violates its entry and the parser treats a violation as a malformed segment. Tags
//! without an entry are unknown to the codec.

/// Shape of one segment tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SegmentSpec {
    pub tag: &'static str,
    /// Minimum element count, trailing empty elements excluded.
    pub min: usize,
    pub max: usize,
    /// 1-based positions that must be non-empty.
    pub required: &'static [usize],
}

const fn spec(
    tag: &'static str,
    min: usize,
    max: usize,
    required: &'static [usize],
) -> SegmentSpec {
    SegmentSpec {
        tag,
        min,
        max,
        required,
    }
}

const SCHEMA: &[SegmentSpec] = &[
    // Envelope
    spec("ISA", 16, 16, &[1, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    spec("GS", 8, 8, &[1, 2, 3, 4, 5, 6, 7, 8]),
    spec("ST", 2, 3, &[1, 2]),
    spec("SE", 2, 2, &[1, 2]),
    spec("GE", 2, 2, &[1, 2]),
    spec("IEA", 2, 2, &[1, 2]),
    // Shared
    spec("BHT", 4, 6, &[1, 2]),
    spec("HL", 3, 4, &[1, 3]),
    spec("NM1", 2, 12, &[1, 2]),
    spec("N1", 2, 6, &[1]),
    spec("N3", 1, 2, &[1]),
    spec("N4", 1, 7, &[1]),
    spec("REF", 2, 4, &[1, 2]),
    spec("PER", 1, 9, &[1]),
    spec("PRV", 2, 6, &[1, 2]),
    spec("DMG", 2, 11, &[1, 2]),
    spec("DTP", 3, 3, &[1, 2, 3]),
    spec("DTM", 2, 6, &[1, 2]),
    spec("TRN", 2, 4, &[1, 2]),
    spec("AMT", 2, 3, &[1, 2]),
    spec("QTY", 2, 4, &[1, 2]),
    // 270 / 271
    spec("EQ", 1, 5, &[]),
    spec("EB", 1, 14, &[1]),
    spec("MSG", 1, 3, &[1]),
    spec("AAA", 3, 4, &[1, 3]),
    spec("INS", 2, 17, &[1, 2]),
    spec("LS", 1, 1, &[1]),
    spec("LE", 1, 1, &[1]),
    // 837
    spec("SBR", 1, 9, &[1]),
    spec("PAT", 1, 9, &[1]),
    spec("CLM", 5, 20, &[1, 2, 5]),
    spec("HI", 1, 12, &[1]),
    spec("LX", 1, 1, &[1]),
    spec("SV1", 2, 21, &[1, 2]),
    spec("SV2", 3, 10, &[1, 3]),
    // 277
    spec("STC", 1, 12, &[1]),
    // 835
    spec("BPR", 2, 21, &[1, 2]),
    spec("CLP", 4, 14, &[1, 2, 3, 4]),
    spec("CAS", 3, 19, &[1, 2, 3]),
    spec("SVC", 3, 7, &[1, 2]),
    spec("PLB", 4, 14, &[1, 2, 3, 4]),
];

pub(crate) fn spec_for(tag: &str) -> Option<&'static SegmentSpec> {
    SCHEMA.iter().find(|spec| spec.tag == tag)
}

impl SegmentSpec {
    /// Checks element presence against the schema.
    ///
    /// `present(i)` reports whether 1-based element `i` carries a value.
    pub fn violation(&self, count: usize, present: impl Fn(usize) -> bool) -> Option<String> {
        if count < self.min {
            return Some(format!(
                "expected at least {} elements, found {count}",
                self.min
            ));
        }
        if count > self.max {
            return Some(format!("expected at most {} elements, found {count}", self.max));
        }
        self.required
            .iter()
            .find(|&&position| !present(position))
            .map(|position| format!("required element {}{position:02} is empty", self.tag))
    }
}
