use crate::{X12Error, X12Result};
use serde::{Deserialize, Serialize};

/// The four separator characters of an interchange.
///
/// Outbound they come from the trading partner configuration; inbound they are read from the
/// fixed-width ISA header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Delimiters {
    pub element: char,
    pub component: char,
    pub repetition: char,
    pub segment: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            element: '*',
            component: ':',
            repetition: '^',
            segment: '~',
        }
    }
}

impl Delimiters {
    /// Length of a well-formed ISA segment including its terminator.
    pub(crate) const ISA_LENGTH: usize = 106;

    /// Checks that the separators are distinct and cannot be confused with data.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the offending separator.
    pub fn check(&self) -> X12Result<()> {
        let all = self.all();
        for (i, c) in all.iter().enumerate() {
            if c.is_ascii_alphanumeric() || *c == ' ' {
                return Err(X12Error::InvalidValue {
                    field: "delimiters".into(),
                    reason: format!("{c:?} cannot be used as a separator"),
                });
            }
            if all[..i].contains(c) {
                return Err(X12Error::InvalidValue {
                    field: "delimiters".into(),
                    reason: format!("{c:?} is used for more than one separator"),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, c: char) -> bool {
        self.all().contains(&c)
    }

    fn all(&self) -> [char; 4] {
        [self.element, self.component, self.repetition, self.segment]
    }

    /// Reads the separators from the start of an interchange.
    ///
    /// The element separator is the character after `ISA`; the component separator is ISA16 and
    /// the segment terminator the character after it. ISA11 supplies the repetition separator when
    /// it is a punctuation character (005010); otherwise the default is kept.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnvelope` if the text does not start with a complete ISA header.
    pub fn detect(text: &str) -> X12Result<Self> {
        let header: Vec<char> = text.chars().take(Self::ISA_LENGTH).collect();
        if header.len() < Self::ISA_LENGTH || !header.starts_with(&['I', 'S', 'A']) {
            return Err(X12Error::InvalidEnvelope(
                "interchange must start with a complete ISA header".into(),
            ));
        }

        let element = header[3];
        let separators: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == element)
            .map(|(i, _)| i)
            .take(16)
            .collect();
        let Some(&last) = separators.get(15) else {
            return Err(X12Error::InvalidEnvelope(
                "ISA header must have 16 elements".into(),
            ));
        };
        let (Some(&component), Some(&segment)) = (header.get(last + 1), header.get(last + 2))
        else {
            return Err(X12Error::InvalidEnvelope("ISA header is truncated".into()));
        };

        let isa11: String = header[separators[10] + 1..separators[11]].iter().collect();
        let repetition = match isa11.chars().next() {
            Some(c) if isa11.len() == 1 && !c.is_ascii_alphanumeric() => c,
            _ => Self::default().repetition,
        };

        let delimiters = Self {
            element,
            component,
            repetition,
            segment,
        };
        delimiters
            .check()
            .map_err(|e| X12Error::InvalidEnvelope(e.to_string()))?;
        Ok(delimiters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISA: &str = "ISA*00*          *00*          *ZZ*SUBMITTER      *ZZ*RECEIVER       *240301*1200*^*00501*000000001*0*T*:~";

    #[test]
    fn detects_default_separators() {
        assert_eq!(ISA.len(), Delimiters::ISA_LENGTH);
        assert_eq!(Delimiters::detect(ISA).expect("detect"), Delimiters::default());
    }

    #[test]
    fn detects_alternative_separators() {
        let isa = ISA.replace('*', "|").replace('~', "\n").replace(":\n", ">\n");
        let detected = Delimiters::detect(&isa).expect("detect");
        assert_eq!(detected.element, '|');
        assert_eq!(detected.component, '>');
        assert_eq!(detected.segment, '\n');
    }

    #[test]
    fn rejects_short_header() {
        assert!(matches!(
            Delimiters::detect("ISA*00*"),
            Err(X12Error::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn check_rejects_duplicates() {
        let delimiters = Delimiters {
            component: '*',
            ..Delimiters::default()
        };
        assert!(delimiters.check().is_err());
    }
}
