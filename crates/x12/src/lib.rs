//! X12 005010 EDI boundary for the medwire codec.
//!
//! Outbound, [`EdiBuilder`] renders canonical eligibility requests (270) and claims (837P/837I)
//! inside a complete ISA/GS/ST envelope. Inbound, the parsers read eligibility responses (271),
//! claim status reports (277) and remittance advice (835) into canonical records.
//!
//! Outbound is strict: a missing required field, a value that contains a delimiter or an
//! unmapped internal code fails the whole build and nothing is emitted. Inbound is forgiving
//! about what it does not know (unknown segments and codes become [`Warning`]s) and strict about
//! what it does: a known segment with the wrong shape, or an amount that is not a decimal, fails
//! the transaction it appears in.
//!
//! [`Warning`]: medwire_types::Warning

mod builder;
mod claim;
mod claim_status;
mod delimiters;
mod eligibility;
mod envelope;
mod partner;
mod reader;
mod remittance;
mod schema;
mod segment;
mod transaction;
mod writer;

pub use builder::EdiBuilder;
pub use delimiters::Delimiters;
pub use partner::{PartyId, Submitter, TradingPartner, UsageIndicator};
pub use reader::{read_interchange, Interchange, RawTransaction};
pub use segment::Segment;
pub use transaction::{
    parse_claim_status, parse_eligibility_response, parse_interchange, parse_remittance,
    parse_transaction, ParsedTransaction, TransactionOutcome,
};
pub use writer::TransactionSet;

use codes::UnmappedCodeError;

/// Errors returned by the `x12` boundary crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum X12Error {
    #[error("claim {claim_id} is missing required field {field}")]
    IncompleteClaim { claim_id: String, field: String },

    #[error("{record} is missing required field {field}")]
    IncompleteRecord { record: &'static str, field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{tag} segment violates its schema: {reason}")]
    SchemaViolation { tag: String, reason: String },

    #[error("{tag}{position:02} contains a configured delimiter: {value:?}")]
    DelimiterInData {
        tag: String,
        position: usize,
        value: String,
    },

    #[error("malformed {tag} segment at position {position}: {reason}")]
    MalformedSegment {
        tag: String,
        position: usize,
        reason: String,
    },

    #[error("invalid amount {value:?} in {tag}{element:02} at position {position}")]
    InvalidAmount {
        tag: String,
        element: usize,
        position: usize,
        value: String,
    },

    #[error("invalid interchange envelope: {0}")]
    InvalidEnvelope(String),

    #[error("interchange is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("unsupported transaction set {0}")]
    UnsupportedTransaction(String),

    #[error("interchange contains no {0} transaction")]
    MissingTransaction(&'static str),

    #[error(transparent)]
    Unmapped(#[from] UnmappedCodeError),
}

/// Type alias for Results that can fail with an [`X12Error`].
pub type X12Result<T> = Result<T, X12Error>;
