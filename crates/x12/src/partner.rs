use crate::delimiters::Delimiters;
use serde::{Deserialize, Serialize};

/// An interchange party: ISA05/ISA06 (sender) or ISA07/ISA08 (receiver).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartyId {
    /// Interchange ID qualifier, e.g. `ZZ` (mutually defined) or `30` (federal tax id).
    pub qualifier: String,
    pub id: String,
}

/// ISA15.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageIndicator {
    Production,
    #[default]
    Test,
}

impl UsageIndicator {
    pub fn code(self) -> &'static str {
        match self {
            UsageIndicator::Production => "P",
            UsageIndicator::Test => "T",
        }
    }
}

/// The 837 submitter (loop 1000A).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Submitter {
    pub name: String,
    pub id: String,
    pub contact_name: String,
    pub contact_phone: String,
}

/// Envelope settings agreed with one trading partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingPartner {
    pub sender: PartyId,
    pub receiver: PartyId,
    /// GS02.
    pub application_sender: String,
    /// GS03.
    pub application_receiver: String,
    /// Receiver name for loop 1000B of the 837.
    pub receiver_name: String,
    pub submitter: Submitter,
    #[serde(default)]
    pub usage: UsageIndicator,
    /// ISA14.
    #[serde(default)]
    pub acknowledgement_requested: bool,
    #[serde(default)]
    pub delimiters: Delimiters,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn partner() -> TradingPartner {
        TradingPartner {
            sender: PartyId {
                qualifier: "ZZ".into(),
                id: "SUBMITTER".into(),
            },
            receiver: PartyId {
                qualifier: "ZZ".into(),
                id: "RECEIVER".into(),
            },
            application_sender: "SUBMITTER".into(),
            application_receiver: "RECEIVER".into(),
            receiver_name: "ACME CLEARINGHOUSE".into(),
            submitter: Submitter {
                name: "RIVERSIDE CLINIC".into(),
                id: "S12345".into(),
                contact_name: "BILLING OFFICE".into(),
                contact_phone: "5555550100".into(),
            },
            usage: UsageIndicator::Test,
            acknowledgement_requested: false,
            delimiters: Delimiters::default(),
        }
    }

    #[test]
    fn loads_from_yaml_with_defaults() {
        let yaml = r#"
sender: { qualifier: ZZ, id: SUBMITTER }
receiver: { qualifier: ZZ, id: RECEIVER }
application_sender: SUBMITTER
application_receiver: RECEIVER
receiver_name: ACME CLEARINGHOUSE
submitter:
  name: RIVERSIDE CLINIC
  id: S12345
  contact_name: BILLING OFFICE
  contact_phone: "5555550100"
"#;
        let loaded: TradingPartner = serde_yaml::from_str(yaml).expect("parse partner");
        assert_eq!(loaded, partner());
    }

    #[test]
    fn delimiters_can_be_overridden_individually() {
        let yaml = "element: '|'\n";
        let delimiters: Delimiters = serde_yaml::from_str(yaml).expect("parse delimiters");
        assert_eq!(delimiters.element, '|');
        assert_eq!(delimiters.segment, '~');
    }
}
