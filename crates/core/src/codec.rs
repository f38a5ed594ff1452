use crate::batch::{BatchItem, BatchResult};
use crate::config::CodecConfig;
use crate::validation::{
    validate_claim, validate_eligibility_request, validate_lab_order, validate_record,
    ValidationIssue,
};
use crate::{CodecError, CodecResult};
use canonical::{
    CanonicalRecord, Claim, ClaimStatusUpdate, EligibilityRequest, EligibilityResponse, LabOrder,
    LabResult, PartialRecord, RemittanceAdvice,
};
use codes::CodeSystems;
use hl7::Hl7Builder;
use medwire_types::{AtomicSequence, Clock, ControlNumberSequence, Decoded, SystemClock, Warning};
use serde_json::Value;
use std::sync::Arc;
use x12::{EdiBuilder, ParsedTransaction, X12Error};

/// Entry point for collaborators: every outbound build and inbound parse the codec layer offers.
///
/// Outbound operations run the validation gate first and build nothing when it reports a
/// problem. Inbound operations that cannot parse their input return
/// [`CodecError::Unparseable`] with the raw bytes attached.
///
/// A `Codec` holds no mutable state of its own besides the shared control number sequence, so one
/// instance can serve any number of threads.
#[derive(Clone)]
pub struct Codec {
    config: Arc<CodecConfig>,
    codes: CodeSystems,
    clock: Arc<dyn Clock>,
    sequence: Arc<dyn ControlNumberSequence>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("config", &self.config)
            .field("codes", &self.codes)
            .finish_non_exhaustive()
    }
}

impl Codec {
    /// A codec using the standard code tables, the system clock and an in-memory sequence
    /// starting at 1.
    pub fn new(config: Arc<CodecConfig>) -> Self {
        Self {
            config,
            codes: *CodeSystems::standard(),
            clock: Arc::new(SystemClock),
            sequence: Arc::new(AtomicSequence::default()),
        }
    }

    pub fn with_codes(mut self, codes: CodeSystems) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sequence(mut self, sequence: Arc<dyn ControlNumberSequence>) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn codes(&self) -> &CodeSystems {
        &self.codes
    }

    fn edi(&self) -> EdiBuilder<'_> {
        EdiBuilder::new(
            &self.config.x12,
            &self.codes,
            self.clock.as_ref(),
            self.sequence.as_ref(),
        )
    }

    fn gate(issues: Vec<ValidationIssue>) -> CodecResult<()> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CodecError::Validation(issues))
        }
    }

    // ------------------------------------------------------------------------
    // FHIR
    // ------------------------------------------------------------------------

    pub fn to_fhir(&self, record: &CanonicalRecord) -> CodecResult<Value> {
        Self::gate(validate_record(record, &self.codes))?;
        Ok(fhir::to_fhir(record, &self.codes)?)
    }

    pub fn from_fhir(&self, document: &str) -> CodecResult<Decoded<PartialRecord>> {
        fhir::parse_fhir(document, &self.codes)
            .map_err(|err| CodecError::unparseable("FHIR", document.as_bytes(), err))
    }

    // ------------------------------------------------------------------------
    // X12
    // ------------------------------------------------------------------------

    /// Builds a complete 270 interchange.
    pub fn build_eligibility_inquiry(&self, request: &EligibilityRequest) -> CodecResult<Vec<u8>> {
        Self::gate(validate_eligibility_request(request, &self.codes))?;
        Ok(self.edi().eligibility_inquiry(request)?.into_bytes())
    }

    pub fn parse_eligibility_response(
        &self,
        input: &[u8],
    ) -> CodecResult<Decoded<EligibilityResponse>> {
        x12::parse_eligibility_response(input, &self.codes)
            .map_err(|err| CodecError::unparseable("X12 271", input, err))
    }

    /// Builds a complete 837 interchange for one claim.
    pub fn build_claim_submission(&self, claim: &Claim) -> CodecResult<Vec<u8>> {
        Self::gate(validate_claim(claim, &self.codes))?;
        Ok(self.edi().claim_submission(claim)?.into_bytes())
    }

    /// Builds one 837 interchange per claim. A claim that fails never stops the others.
    pub fn build_claim_batch(&self, claims: &[Claim]) -> BatchResult<Vec<u8>> {
        let batch: BatchResult<Vec<u8>> = claims
            .iter()
            .enumerate()
            .map(|(index, claim)| {
                let result = self.build_claim_submission(claim);
                if let Err(err) = &result {
                    tracing::warn!(index, claim = %claim.id, error = %err, "claim left out of batch");
                }
                BatchItem {
                    index,
                    id: claim.id.clone(),
                    result,
                }
            })
            .collect();

        tracing::info!(
            built = batch.success_count(),
            failed = batch.failure_count(),
            "built claim batch"
        );
        batch
    }

    /// Every claim status update of every 277 in the interchange.
    pub fn parse_claim_status(&self, input: &[u8]) -> CodecResult<Decoded<Vec<ClaimStatusUpdate>>> {
        x12::parse_claim_status(input, &self.codes)
            .map_err(|err| CodecError::unparseable("X12 277", input, err))
    }

    /// The first 835 of the interchange. [`RemittanceAdvice::payments`] lists
    /// `(claim id, paid amount, adjustments)`. Further 835s come back as `SkippedTransaction`
    /// warnings; [`Codec::parse_remittance_batch`] reads them all.
    pub fn parse_remittance(&self, input: &[u8]) -> CodecResult<Decoded<RemittanceAdvice>> {
        x12::parse_remittance(input, &self.codes)
            .map_err(|err| CodecError::unparseable("X12 835", input, err))
    }

    /// Every 835 of a multi-transaction file, each parsed independently.
    ///
    /// Transactions of other sets are skipped with a warning on the outer value, which also
    /// carries the envelope warnings.
    pub fn parse_remittance_batch(
        &self,
        input: &[u8],
    ) -> CodecResult<Decoded<BatchResult<Decoded<RemittanceAdvice>>>> {
        let Decoded {
            value: interchange,
            mut warnings,
        } = x12::read_interchange(input)
            .map_err(|err| CodecError::unparseable("X12 835", input, err))?;

        let mut batch = BatchResult::default();
        for (index, tx) in interchange.transactions.iter().enumerate() {
            if tx.set_id != "835" {
                warnings.push(Warning::UnknownSegment {
                    tag: format!("ST*{}", tx.set_id),
                    position: tx.position,
                });
                continue;
            }
            let result = x12::parse_transaction(tx, &self.codes)
                .map_err(CodecError::from)
                .and_then(|decoded| match decoded.value {
                    ParsedTransaction::Remittance(advice) => {
                        Ok(Decoded::with_warnings(advice, decoded.warnings))
                    }
                    _ => Err(X12Error::UnsupportedTransaction(tx.set_id.clone()).into()),
                });
            if let Err(err) = &result {
                tracing::warn!(control = %tx.control_number, error = %err, "remittance transaction failed to parse");
            }
            batch.items.push(BatchItem {
                index,
                id: tx.control_number.clone(),
                result,
            });
        }

        Ok(Decoded::with_warnings(batch, warnings))
    }

    // ------------------------------------------------------------------------
    // HL7 v2
    // ------------------------------------------------------------------------

    /// Builds an `ORM^O01` message.
    pub fn build_lab_order(&self, order: &LabOrder) -> CodecResult<String> {
        Self::gate(validate_lab_order(order, &self.codes))?;
        let builder = Hl7Builder::new(
            &self.config.hl7,
            &self.codes,
            self.clock.as_ref(),
            self.sequence.as_ref(),
        );
        Ok(builder.lab_order(order)?)
    }

    /// Parses an `ORU^R01` message.
    pub fn parse_lab_result(&self, input: &[u8]) -> CodecResult<Decoded<LabResult>> {
        hl7::parse_lab_result(input, &self.codes)
            .map_err(|err| CodecError::unparseable("HL7 ORU^R01", input, err))
    }
}
