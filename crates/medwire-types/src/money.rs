//! Fixed-point currency amounts.
//!
//! Claim, eligibility and remittance amounts are parsed and summed as decimals. A value read as
//! `250.00` stays exactly `250.00` through any number of parse/aggregate cycles.

use crate::TypesError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A currency amount backed by [`Decimal`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Builds an amount from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Parses a plain decimal amount such as `250`, `250.5`, `-12.00` or `.75`.
    ///
    /// Exponents, thousands separators, currency symbols and a leading `+` are rejected.
    pub fn parse(input: &str) -> Result<Self, TypesError> {
        let trimmed = input.trim();
        let invalid = || TypesError::InvalidAmount(input.to_string());

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        if digits.is_empty() || digits == "." {
            return Err(invalid());
        }

        let mut seen_point = false;
        for c in digits.chars() {
            match c {
                '0'..='9' => {}
                '.' if !seen_point => seen_point = true,
                _ => return Err(invalid()),
            }
        }

        let mut normalised = String::with_capacity(digits.len() + 2);
        if negative {
            normalised.push('-');
        }
        if digits.starts_with('.') {
            normalised.push('0');
        }
        normalised.push_str(digits.strip_suffix('.').unwrap_or(digits));

        Decimal::from_str_exact(&normalised)
            .map(Self)
            .map_err(|_| invalid())
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Renders the amount as an X12 `R` (decimal) element: no trailing zeros, no exponent.
    ///
    /// `250.00` renders as `250`, `99.50` as `99.5`.
    pub fn to_x12(&self) -> String {
        let normalised = self.0.normalize();
        if normalised.is_zero() {
            return "0".to_string();
        }
        normalised.to_string()
    }

    /// Renders the amount with exactly two decimal places.
    pub fn to_fixed(&self) -> String {
        format!("{:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fixed())
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_amounts() {
        assert_eq!(Money::parse("250.00").expect("amount"), Money::from_cents(25000));
        assert_eq!(Money::parse("250").expect("amount"), Money::from_cents(25000));
        assert_eq!(Money::parse(".75").expect("amount"), Money::from_cents(75));
        assert_eq!(Money::parse("-12.5").expect("amount"), Money::from_cents(-1250));
        assert_eq!(Money::parse("100.").expect("amount"), Money::from_cents(10000));
    }

    #[test]
    fn rejects_non_decimal_input() {
        for bad in ["", "-", ".", "1e3", "+5", "1,000", "$10", "12.3.4", "ten"] {
            assert_eq!(
                Money::parse(bad),
                Err(TypesError::InvalidAmount(bad.to_string())),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn repeated_aggregation_does_not_drift() {
        let cent = Money::parse("0.01").expect("amount");
        let total: Money = std::iter::repeat(cent).take(10_000).sum();
        assert_eq!(total, Money::from_cents(10_000));
        assert_eq!(total.to_fixed(), "100.00");
    }

    #[test]
    fn renders_x12_without_trailing_zeros() {
        assert_eq!(Money::from_cents(25000).to_x12(), "250");
        assert_eq!(Money::from_cents(9950).to_x12(), "99.5");
        assert_eq!(Money::from_cents(1234).to_x12(), "12.34");
        assert_eq!(Money::ZERO.to_x12(), "0");
    }

    #[test]
    fn serialises_as_string() {
        let json = serde_json::to_string(&Money::from_cents(25000)).expect("serialise");
        assert_eq!(json, "\"250.00\"");
        let back: Money = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, Money::from_cents(25000));
    }
}
