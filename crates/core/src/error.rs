use crate::validation::ValidationIssue;
use fhir::FhirError;
use hl7::Hl7Error;
use x12::X12Error;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The record failed the validation gate; nothing was built.
    #[error("record failed validation: {}", summary(.0))]
    Validation(Vec<ValidationIssue>),

    /// Inbound bytes could not be parsed. The bytes are kept for manual review.
    #[error("unparseable {format} input ({} bytes retained): {source}", .raw.len())]
    Unparseable {
        format: &'static str,
        raw: Vec<u8>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Fhir(#[from] FhirError),
    #[error(transparent)]
    X12(#[from] X12Error),
    #[error(transparent)]
    Hl7(#[from] Hl7Error),

    #[error("failed to read configuration file {path}: {source}", path = .path.display())]
    ConfigRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CodecError {
    pub(crate) fn unparseable(
        format: &'static str,
        raw: &[u8],
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        tracing::warn!(format, bytes = raw.len(), error = %source, "retaining unparseable input");
        CodecError::Unparseable {
            format,
            raw: raw.to_vec(),
            source: Box::new(source),
        }
    }

    /// The raw inbound bytes of an `Unparseable` error.
    pub fn raw_input(&self) -> Option<&[u8]> {
        match self {
            CodecError::Unparseable { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// The field-level issues of a `Validation` error.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            CodecError::Validation(issues) => issues,
            _ => &[],
        }
    }
}

fn summary(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
