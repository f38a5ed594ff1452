//! Shared primitive types for the medwire codec crates.
//!
//! Everything in here is format-agnostic: the canonical model, the code tables and every wire
//! transformer depend on these types, never the other way round.
//!
//! - [`NonEmptyText`]: trimmed, guaranteed non-empty text.
//! - [`Money`]: fixed-point currency amount (never floating point).
//! - [`Npi`]: National Provider Identifier with check-digit validation.
//! - [`Coded`]: a resolved vocabulary value, or the raw code that could not be resolved.
//! - [`Warning`] and [`Decoded`]: non-fatal inbound diagnostics carried next to a result.
//! - [`Clock`] and [`ControlNumberSequence`]: injected collaborators for envelope headers.

mod clock;
mod coded;
mod diagnostics;
mod money;
mod npi;

pub use clock::{AtomicSequence, Clock, ControlNumberSequence, FixedClock, SystemClock};
pub use coded::{Coded, RawCode};
pub use diagnostics::{Decoded, Warning};
pub use money::Money;
pub use npi::Npi;

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input was not a plain fixed-point decimal amount
    #[error("invalid amount: '{0}'")]
    InvalidAmount(String),

    /// The input was not a 10-digit NPI with a valid check digit
    #[error("invalid NPI: '{0}'")]
    InvalidNpi(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TypesError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Returns the trimmed value if `value` holds any non-whitespace text.
///
/// Canonical records carry optional identifiers as `Option<String>`; this collapses
/// `Some("")` and `Some("  ")` into `None` so callers only ever see usable values.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
