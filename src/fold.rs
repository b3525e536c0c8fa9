//! Incremental aggregation of batch admissions.
//!
//! A batch is folded one message at a time into a [`FoldProof`] whose public
//! output is the highest message number the batch would install.  Each step
//! consumes the proof produced by the previous step, so the chain is strictly
//! linear: step `n` cannot be computed without the output of step `n - 1`.
//! Folding can therefore happen off the critical path and only the final
//! proof is handed to the commit gate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attest::{encode_words, hex_digest, Attestor, Certificate};
use crate::error::FoldError;
use crate::message::{SequencedMessage, SpyMessage};
use crate::policy::{admit, AdmissionDecision};

const FOLD_DOMAIN: &[u8] = b"SPYMASTER_FOLD_V1";

/// Certified aggregate produced by [`SpyMasterProgram`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldProof {
    /// Message number of the step (the seed for `init`).
    pub public_input: u64,
    /// Running highest accepted message number.
    pub public_output: u64,
    /// Number of messages folded since `init`.
    pub steps: u64,
    /// Certificate over `(public_input, public_output, steps)`.
    #[serde(with = "hex_digest")]
    pub certificate: Certificate,
}

impl FoldProof {
    fn statement(public_input: u64, public_output: u64, steps: u64) -> Vec<u8> {
        encode_words(&[public_input, public_output, steps])
    }

    /// Returns true if the certificate matches the public fields.
    pub fn verify<A: Attestor>(&self, attestor: &A) -> bool {
        let statement = Self::statement(self.public_input, self.public_output, self.steps);
        attestor.verify(FOLD_DOMAIN, &statement, &self.certificate)
    }
}

/// Folding program over [`SequencedMessage`] streams.
#[derive(Debug, Clone)]
pub struct SpyMasterProgram<A> {
    attestor: A,
    seed: u64,
}

impl<A: Attestor> SpyMasterProgram<A> {
    /// Creates a program whose chains must start at zero.
    pub fn new(attestor: A) -> Self {
        Self { attestor, seed: 0 }
    }

    /// Overrides the value `init` accepts.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the attestor used to certify and verify steps.
    pub fn attestor(&self) -> &A {
        &self.attestor
    }

    fn certify(&self, public_input: u64, public_output: u64, steps: u64) -> FoldProof {
        let statement = FoldProof::statement(public_input, public_output, steps);
        FoldProof {
            public_input,
            public_output,
            steps,
            certificate: self.attestor.attest(FOLD_DOMAIN, &statement),
        }
    }

    /// Starts a chain.  `public_input` must equal the configured seed.
    pub fn init(&self, public_input: u64) -> Result<FoldProof, FoldError> {
        if public_input != self.seed {
            return Err(FoldError::SeedMismatch {
                expected: self.seed,
                actual: public_input,
            });
        }
        Ok(self.certify(public_input, public_input, 0))
    }

    /// Folds one message onto `earlier`.
    pub fn process_message(
        &self,
        message_number: u64,
        earlier: &FoldProof,
        message: &SpyMessage,
    ) -> Result<FoldProof, FoldError> {
        self.step(
            earlier,
            &SequencedMessage {
                message_number,
                message: *message,
            },
        )
        .map(|(proof, _)| proof)
    }

    /// Folds one message and also returns the admission decision.
    pub fn step(
        &self,
        earlier: &FoldProof,
        candidate: &SequencedMessage,
    ) -> Result<(FoldProof, AdmissionDecision), FoldError> {
        if !earlier.verify(&self.attestor) {
            return Err(FoldError::InvalidCertificate);
        }
        let decision = admit(candidate, earlier.public_output);
        let proof = self.certify(
            candidate.message_number,
            decision.result,
            earlier.steps.saturating_add(1),
        );
        Ok((proof, decision))
    }

    /// Runs `init(seed)` and folds every message in order.
    pub fn fold_batch<'a, I>(&self, seed: u64, messages: I) -> Result<FoldProof, FoldError>
    where
        I: IntoIterator<Item = &'a SequencedMessage>,
    {
        let mut proof = self.init(seed)?;
        for candidate in messages {
            proof = self.step(&proof, candidate)?.0;
        }
        debug!(
            steps = proof.steps,
            output = proof.public_output,
            "batch folded"
        );
        Ok(proof)
    }
}
