use crate::encoding::EncodingCharacters;
use serde::{Deserialize, Serialize};

/// MSH-11 processing id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingId {
    Production,
    #[default]
    Training,
    Debugging,
}

impl ProcessingId {
    pub fn code(self) -> &'static str {
        match self {
            ProcessingId::Production => "P",
            ProcessingId::Training => "T",
            ProcessingId::Debugging => "D",
        }
    }
}

/// MSH settings agreed with the receiving laboratory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hl7Header {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
    #[serde(default)]
    pub processing_id: ProcessingId,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub encoding: EncodingCharacters,
}

fn default_version() -> String {
    "2.5.1".to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn header() -> Hl7Header {
        Hl7Header {
            sending_application: "MEDWIRE".into(),
            sending_facility: "RIVERSIDE".into(),
            receiving_application: "LIS".into(),
            receiving_facility: "CITYLAB".into(),
            processing_id: ProcessingId::Production,
            version: default_version(),
            encoding: EncodingCharacters::default(),
        }
    }

    #[test]
    fn yaml_defaults() {
        let yaml = "
sending_application: MEDWIRE
sending_facility: RIVERSIDE
receiving_application: LIS
receiving_facility: CITYLAB
";
        let parsed: Hl7Header = serde_yaml::from_str(yaml).expect("yaml");
        assert_eq!(parsed.version, "2.5.1");
        assert_eq!(parsed.processing_id, ProcessingId::Training);
        assert_eq!(parsed.encoding, EncodingCharacters::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "
sending_application: MEDWIRE
sending_facility: RIVERSIDE
receiving_application: LIS
receiving_facility: CITYLAB
charset: latin1
";
        assert!(serde_yaml::from_str::<Hl7Header>(yaml).is_err());
    }
}
