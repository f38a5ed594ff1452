//! Non-fatal inbound diagnostics.
//!
//! Fatal conditions are returned as typed errors by each codec crate. Everything else an
//! inbound parse notices is collected here and handed back next to the best-effort result.

use crate::Money;
use serde::Serialize;
use std::fmt;

/// A non-fatal condition observed while decoding inbound data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A segment outside the handled subset was skipped.
    UnknownSegment { tag: String, position: usize },

    /// An inbound code has no entry in the code tables and was kept as raw.
    UnmappedExternalCode {
        domain: String,
        system: String,
        code: String,
    },

    /// A JSON element that no transformer reads was present in the payload.
    UnrecognisedElement { path: String },

    /// A reference pointed at an unexpected resource type or could not be split.
    UnexpectedReference { path: String, reference: String },

    /// A value the codec always recomputes was supplied by the sender and ignored.
    IgnoredDerivedValue { path: String },

    /// A value could not be interpreted and was kept in its raw form or dropped.
    UnparsedValue { path: String, value: String },

    /// A trailer count (SE01, GE01, IEA01) disagrees with what was received.
    TrailerCountMismatch {
        segment: String,
        declared: String,
        actual: usize,
    },

    /// A further transaction of the requested set was left unparsed by a single-transaction read.
    SkippedTransaction {
        set_id: String,
        control_number: String,
        position: usize,
    },

    /// A declared total disagrees with the sum of its parts.
    BalanceMismatch {
        context: String,
        declared: Money,
        computed: Money,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownSegment { tag, position } => {
                write!(f, "skipped unknown segment {tag} at position {position}")
            }
            Warning::UnmappedExternalCode {
                domain,
                system,
                code,
            } => write!(f, "unmapped {domain} code '{code}' ({system})"),
            Warning::UnrecognisedElement { path } => write!(f, "unrecognised element at {path}"),
            Warning::UnexpectedReference { path, reference } => {
                write!(f, "unexpected reference '{reference}' at {path}")
            }
            Warning::IgnoredDerivedValue { path } => {
                write!(f, "ignored sender-supplied derived value at {path}")
            }
            Warning::UnparsedValue { path, value } => {
                write!(f, "could not interpret '{value}' at {path}")
            }
            Warning::TrailerCountMismatch {
                segment,
                declared,
                actual,
            } => write!(f, "{segment} declares {declared} but {actual} were received"),
            Warning::SkippedTransaction {
                set_id,
                control_number,
                position,
            } => write!(
                f,
                "left {set_id} transaction {control_number} at position {position} unparsed"
            ),
            Warning::BalanceMismatch {
                context,
                declared,
                computed,
            } => write!(f, "{context}: declared {declared}, computed {computed}"),
        }
    }
}

/// A best-effort decoded value together with the warnings raised while producing it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Decoded<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Decoded<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
