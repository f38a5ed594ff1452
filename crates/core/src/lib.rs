//! # medwire core
//!
//! The surface the rest of the application talks to. It ties the boundary crates together:
//! - [`Codec`]: one facade over FHIR, X12 and HL7 v2 transforms, with the injected clock and
//!   control number sequence
//! - [`validation`]: the gate every outbound record passes before it is built
//! - [`CodecConfig`]: trading-partner and HL7 header settings resolved once at startup
//! - [`BatchResult`]: per-item outcomes for batch builds and multi-transaction files
//!
//! **No transport concerns**: opening sockets, moving files to a clearinghouse and retrying belong
//! to the caller.

mod batch;
mod codec;
pub mod config;
mod error;
pub mod validation;

pub use batch::{BatchItem, BatchResult};
pub use codec::Codec;
pub use config::CodecConfig;
pub use error::{CodecError, CodecResult};
pub use validation::ValidationIssue;

// Re-exported so collaborators need only this crate for the common types.
pub use canonical;
pub use medwire_types::{
    AtomicSequence, Clock, ControlNumberSequence, Decoded, FixedClock, SystemClock, Warning,
};
