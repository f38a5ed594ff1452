use serde::{Deserialize, Serialize};
use std::fmt;

/// An external code exactly as it was received.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCode {
    /// Code system the value was received under (FHIR system URI, X12 element, HL7 table).
    pub system: String,
    pub code: String,
}

impl RawCode {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for RawCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.system, self.code)
    }
}

/// A vocabulary value resolved from inbound data.
///
/// Inbound codes that are not in the code tables are kept as [`Coded::Unknown`] with the raw
/// code, so nothing received from a third party is silently discarded.
///
/// Serialised untagged: a known value renders as itself, an unknown one as its raw code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coded<T> {
    Known(T),
    Unknown(RawCode),
}

impl<T> Coded<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Coded::Known(value) => Some(value),
            Coded::Unknown(_) => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            Coded::Known(value) => Some(value),
            Coded::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Coded::Known(_))
    }

    pub fn raw(&self) -> Option<&RawCode> {
        match self {
            Coded::Known(_) => None,
            Coded::Unknown(raw) => Some(raw),
        }
    }
}

impl<T> From<T> for Coded<T> {
    fn from(value: T) -> Self {
        Coded::Known(value)
    }
}
