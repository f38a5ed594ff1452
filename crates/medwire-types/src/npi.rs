use crate::TypesError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A National Provider Identifier.
///
/// Ten digits, the last of which is a Luhn check digit computed over the nine leading digits
/// prefixed with the `80840` issuer code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Npi(String);

impl Npi {
    /// NPI issuer prefix used in the check-digit calculation.
    const PREFIX: &'static str = "80840";

    pub fn parse(input: &str) -> Result<Self, TypesError> {
        let trimmed = input.trim();
        let invalid = || TypesError::InvalidNpi(input.to_string());

        if trimmed.len() != 10 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let (body, check) = trimmed.split_at(9);
        let expected = Self::check_digit(body);
        if check.as_bytes()[0] - b'0' != expected {
            return Err(invalid());
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn check_digit(body: &str) -> u8 {
        let digits: Vec<u8> = Self::PREFIX
            .bytes()
            .chain(body.bytes())
            .map(|b| b - b'0')
            .collect();

        // Double every second digit starting from the rightmost payload digit.
        let sum: u32 = digits
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| {
                if i % 2 == 0 {
                    let doubled = d * 2;
                    u32::from(if doubled > 9 { doubled - 9 } else { doubled })
                } else {
                    u32::from(d)
                }
            })
            .sum();

        ((10 - (sum % 10)) % 10) as u8
    }
}

impl fmt::Display for Npi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Npi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Npi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Npi::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_check_digit() {
        let npi = Npi::parse("1234567893").expect("valid NPI");
        assert_eq!(npi.as_str(), "1234567893");
        assert!(Npi::parse("1245319599").is_ok());
    }

    #[test]
    fn rejects_bad_check_digit() {
        assert_eq!(
            Npi::parse("1234567890"),
            Err(TypesError::InvalidNpi("1234567890".into()))
        );
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(Npi::parse("123456789").is_err());
        assert!(Npi::parse("12345678931").is_err());
        assert!(Npi::parse("12345A7893").is_err());
    }
}
