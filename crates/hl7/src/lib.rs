//! HL7 v2 boundary for the medwire codec.
//!
//! Outbound, [`Hl7Builder`] renders a canonical [`LabOrder`] as an `ORM^O01` message. Inbound,
//! [`parse_lab_result`] reads an `ORU^R01` message into a [`LabResult`] with its observations.
//!
//! Text is escaped with the message's own encoding characters on the way out and unescaped on
//! the way in, so values may contain `|`, `^`, `~`, `\` and `&`.
//!
//! [`LabOrder`]: canonical::LabOrder
//! [`LabResult`]: canonical::LabResult

mod encoding;
mod header;
mod message;
mod order;
mod result;

pub use encoding::EncodingCharacters;
pub use header::{Hl7Header, ProcessingId};
pub use message::{Message, Segment};
pub use order::Hl7Builder;
pub use result::parse_lab_result;

use codes::UnmappedCodeError;

/// Errors returned by the `hl7` boundary crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Hl7Error {
    #[error("{record} is missing required field {field}")]
    IncompleteRecord { record: &'static str, field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("malformed {segment} segment at line {position}: {reason}")]
    MalformedSegment {
        segment: String,
        position: usize,
        reason: String,
    },

    #[error("invalid message header: {0}")]
    InvalidHeader(String),

    #[error("message is not valid UTF-8")]
    InvalidEncoding,

    #[error("unsupported message type {0}")]
    UnsupportedMessage(String),

    #[error(transparent)]
    Unmapped(#[from] UnmappedCodeError),
}

pub type Hl7Result<T> = std::result::Result<T, Hl7Error>;
