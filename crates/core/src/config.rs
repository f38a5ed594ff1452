//! Codec configuration.
//!
//! Trading-partner envelope settings and the HL7 message header are resolved once at process
//! startup and passed into the [`Codec`](crate::Codec) by `Arc`. Library code never reads
//! environment variables; the binary decides where the configuration file lives.

use crate::{CodecError, CodecResult};
use hl7::Hl7Header;
use medwire_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::path::Path;
use x12::TradingPartner;

/// Configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecConfig {
    pub x12: TradingPartner,
    pub hl7: Hl7Header,
}

impl CodecConfig {
    /// Create a new `CodecConfig`, checking that the configured separators are usable.
    pub fn new(x12: TradingPartner, hl7: Hl7Header) -> CodecResult<Self> {
        let config = Self { x12, hl7 };
        config.check()?;
        Ok(config)
    }

    /// Strictly parse a configuration from YAML text.
    ///
    /// Unknown keys are rejected, and a schema mismatch names the failing path
    /// (e.g. `x12.submitter.contact_phone`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the YAML does not match the configuration schema or the
    /// configured separators collide.
    pub fn from_yaml_str(yaml_text: &str) -> CodecResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let config: CodecConfig = match serde_path_to_error::deserialize(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CodecError::InvalidConfig(format!(
                    "schema mismatch at {path}: {source}"
                )));
            }
        };

        config.check()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> CodecResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CodecError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), sender = %config.x12.sender.id, "loaded codec configuration");
        Ok(config)
    }

    fn check(&self) -> CodecResult<()> {
        self.x12
            .delimiters
            .check()
            .map_err(|err| CodecError::InvalidConfig(format!("x12: {err}")))?;
        self.hl7
            .encoding
            .check()
            .map_err(|err| CodecError::InvalidConfig(format!("hl7: {err}")))?;
        for (field, value) in [
            ("x12.sender.id", &self.x12.sender.id),
            ("x12.receiver.id", &self.x12.receiver.id),
            ("hl7.sending_application", &self.hl7.sending_application),
        ] {
            NonEmptyText::new(value)
                .map_err(|err| CodecError::InvalidConfig(format!("{field}: {err}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const CONFIG_YAML: &str = r#"
x12:
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
hl7:
  sending_application: MEDWIRE
  sending_facility: RIVERSIDE
  receiving_application: LIS
  receiving_facility: CITYLAB
  processing_id: production
"#;

    pub(crate) fn config() -> CodecConfig {
        CodecConfig::from_yaml_str(CONFIG_YAML).expect("test config")
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let config = config();
        assert_eq!(config.x12.delimiters, x12::Delimiters::default());
        assert_eq!(config.x12.usage, x12::UsageIndicator::Test);
        assert_eq!(config.hl7.version, "2.5.1");
        assert_eq!(config.hl7.processing_id, hl7::ProcessingId::Production);
    }

    #[test]
    fn unknown_keys_name_their_path() {
        let yaml = CONFIG_YAML.replace("receiving_facility: CITYLAB", "receiving_facilty: CITYLAB");
        match CodecConfig::from_yaml_str(&yaml).expect_err("typo must be rejected") {
            CodecError::InvalidConfig(message) => assert!(message.contains("hl7"), "{message}"),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn colliding_delimiters_are_rejected() {
        let yaml = CONFIG_YAML.replace(
            "  receiver_name: ACME CLEARINGHOUSE\n",
            "  receiver_name: ACME CLEARINGHOUSE\n  delimiters: { element: '*', component: '*' }\n",
        );
        assert!(matches!(
            CodecConfig::from_yaml_str(&yaml),
            Err(CodecError::InvalidConfig(message)) if message.starts_with("x12")
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CONFIG_YAML.as_bytes()).expect("write config");

        let loaded = CodecConfig::load(file.path()).expect("load config");
        assert_eq!(loaded, config());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.yaml");
        assert!(matches!(
            CodecConfig::load(&path),
            Err(CodecError::ConfigRead { path: p, .. }) if p == path
        ));
    }
}
