//! Encoding characters (MSH-1, MSH-2) and escape sequences.

use crate::{Hl7Error, Hl7Result};
use serde::{Deserialize, Serialize};

/// The five separators an HL7 v2 message declares in its MSH segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingCharacters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl EncodingCharacters {
    /// Reads the separators from the start of an MSH segment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHeader` if the line is not an MSH segment or the separators are not five
    /// distinct non-alphanumeric characters.
    pub fn from_msh(line: &str) -> Hl7Result<Self> {
        let mut chars = line.chars();
        let tag: String = chars.by_ref().take(3).collect();
        if tag != "MSH" {
            return Err(Hl7Error::InvalidHeader(format!(
                "message must start with MSH, found {tag:?}"
            )));
        }
        let declared: Vec<char> = chars.take(5).collect();
        let [field, component, repetition, escape, subcomponent] = declared[..] else {
            return Err(Hl7Error::InvalidHeader(
                "MSH-1/MSH-2 must declare five encoding characters".into(),
            ));
        };
        let encoding = Self {
            field,
            component,
            repetition,
            escape,
            subcomponent,
        };
        encoding.check()?;
        Ok(encoding)
    }

    /// MSH-2 as written in the header.
    pub fn msh2(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }

    fn all(&self) -> [char; 5] {
        [
            self.field,
            self.component,
            self.repetition,
            self.escape,
            self.subcomponent,
        ]
    }

    /// # Errors
    ///
    /// Returns `InvalidHeader` when two separators coincide or one is alphanumeric or whitespace.
    pub fn check(&self) -> Hl7Result<()> {
        let all = self.all();
        for (i, c) in all.iter().enumerate() {
            if c.is_alphanumeric() || c.is_whitespace() {
                return Err(Hl7Error::InvalidHeader(format!(
                    "encoding character {c:?} is not a separator"
                )));
            }
            if all[i + 1..].contains(c) {
                return Err(Hl7Error::InvalidHeader(format!(
                    "encoding character {c:?} is declared twice"
                )));
            }
        }
        Ok(())
    }

    /// Replaces every separator in `value` with its escape sequence.
    pub fn escape(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            let code = match c {
                c if c == self.escape => 'E',
                c if c == self.field => 'F',
                c if c == self.component => 'S',
                c if c == self.subcomponent => 'T',
                c if c == self.repetition => 'R',
                c => {
                    out.push(c);
                    continue;
                }
            };
            out.push(self.escape);
            out.push(code);
            out.push(self.escape);
        }
        out
    }

    /// Decodes `\F\ \S\ \T\ \R\ \E\`. Other escape sequences (formatting, hex) are kept verbatim.
    pub fn unescape(&self, value: &str) -> String {
        if !value.contains(self.escape) {
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(self.escape) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.escape.len_utf8()..];
            let Some(end) = after.find(self.escape) else {
                out.push_str(&rest[start..]);
                return out;
            };
            let sequence = &after[..end];
            match sequence {
                "F" => out.push(self.field),
                "S" => out.push(self.component),
                "T" => out.push(self.subcomponent),
                "R" => out.push(self.repetition),
                "E" => out.push(self.escape),
                other => {
                    out.push(self.escape);
                    out.push_str(other);
                    out.push(self.escape);
                }
            }
            rest = &after[end + self.escape.len_utf8()..];
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_standard_header() {
        let encoding = EncodingCharacters::from_msh("MSH|^~\\&|LAB").expect("header");
        assert_eq!(encoding, EncodingCharacters::default());
        assert_eq!(encoding.msh2(), "^~\\&");
    }

    #[test]
    fn reads_custom_separators() {
        let encoding = EncodingCharacters::from_msh("MSH#!*/%#LAB").expect("header");
        assert_eq!(encoding.field, '#');
        assert_eq!(encoding.component, '!');
        assert_eq!(encoding.subcomponent, '%');
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            EncodingCharacters::from_msh("PID|1"),
            Err(Hl7Error::InvalidHeader(_))
        ));
        assert!(matches!(
            EncodingCharacters::from_msh("MSH|^"),
            Err(Hl7Error::InvalidHeader(_))
        ));
        assert!(matches!(
            EncodingCharacters::from_msh("MSH|^^\\&|"),
            Err(Hl7Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn escapes_every_separator() {
        let encoding = EncodingCharacters::default();
        let escaped = encoding.escape("A|B^C~D\\E&F");
        assert_eq!(escaped, "A\\F\\B\\S\\C\\R\\D\\E\\E\\T\\F");
        assert_eq!(encoding.unescape(&escaped), "A|B^C~D\\E&F");
    }

    #[test]
    fn unknown_sequences_are_kept() {
        let encoding = EncodingCharacters::default();
        assert_eq!(encoding.unescape("line\\.br\\two"), "line\\.br\\two");
        assert_eq!(encoding.unescape("trailing\\"), "trailing\\");
    }
}
