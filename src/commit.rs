//! Batch commit gate for folded aggregates.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{debug, info};

use crate::attest::Attestor;
use crate::error::{FoldError, StoreError};
use crate::fold::FoldProof;

/// Effect of [`SpyMasterContract::process_batch`] on stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The stored number moved forward.
    Advanced {
        /// Previous value.
        from: u64,
        /// Newly committed value.
        to: u64,
    },
    /// The aggregate did not exceed the stored number.
    Unchanged {
        /// Value still stored.
        current: u64,
    },
}

/// Durable highest processed message number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpyMasterContract {
    highest_message_number: u64,
}

impl SpyMasterContract {
    /// Creates a contract with nothing processed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing file -> fresh contract.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist to JSON.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Highest message number committed so far.
    pub fn highest_message_number(&self) -> u64 {
        self.highest_message_number
    }

    /// Verifies `proof` and commits its output if it is strictly greater.
    ///
    /// An aggregate that does not improve on the stored value leaves the
    /// contract untouched, so all-duplicate batches cannot regress it.
    pub fn process_batch<A: Attestor>(
        &mut self,
        proof: &FoldProof,
        attestor: &A,
    ) -> Result<CommitOutcome, FoldError> {
        if !proof.verify(attestor) {
            return Err(FoldError::InvalidCertificate);
        }
        let current = self.highest_message_number;
        if proof.public_output > current {
            self.highest_message_number = proof.public_output;
            info!(
                from = current,
                to = proof.public_output,
                steps = proof.steps,
                "batch committed"
            );
            Ok(CommitOutcome::Advanced {
                from: current,
                to: proof.public_output,
            })
        } else {
            debug!(current, aggregate = proof.public_output, "batch not improving");
            Ok(CommitOutcome::Unchanged { current })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attest::DigestAttestor;
    use crate::fold::SpyMasterProgram;
    use crate::message::{SequencedMessage, SpyMessage};

    fn batch(numbers: &[u64]) -> Vec<SequencedMessage> {
        numbers
            .iter()
            .map(|&n| SequencedMessage {
                message_number: n,
                message: SpyMessage::with_checksum(1, 100, 5001).unwrap(),
            })
            .collect()
    }

    #[test]
    fn advances_on_greater_aggregate() {
        let program = SpyMasterProgram::new(DigestAttestor::default());
        let proof = program.fold_batch(0, &batch(&[0, 1, 2])).unwrap();
        let mut contract = SpyMasterContract::new();
        let outcome = contract.process_batch(&proof, program.attestor()).unwrap();
        assert_eq!(outcome, CommitOutcome::Advanced { from: 0, to: 2 });
        assert_eq!(contract.highest_message_number(), 2);
    }

    #[test]
    fn non_improving_batch_leaves_state_unchanged() {
        let program = SpyMasterProgram::new(DigestAttestor::default());
        let mut contract = SpyMasterContract::new();
        let high = program.fold_batch(0, &batch(&[5, 6])).unwrap();
        contract.process_batch(&high, program.attestor()).unwrap();
        let before = contract;

        let low = program.fold_batch(0, &batch(&[1, 2, 3])).unwrap();
        let outcome = contract.process_batch(&low, program.attestor()).unwrap();
        assert_eq!(outcome, CommitOutcome::Unchanged { current: 6 });
        assert_eq!(contract, before);

        let same = program.fold_batch(0, &batch(&[6])).unwrap();
        contract.process_batch(&same, program.attestor()).unwrap();
        assert_eq!(contract, before);
    }

    #[test]
    fn forged_aggregate_is_rejected() {
        let program = SpyMasterProgram::new(DigestAttestor::default());
        let mut proof = program.fold_batch(0, &batch(&[1])).unwrap();
        proof.public_output = 99;
        let mut contract = SpyMasterContract::new();
        assert_eq!(
            contract.process_batch(&proof, program.attestor()),
            Err(FoldError::InvalidCertificate)
        );
        assert_eq!(contract.highest_message_number(), 0);
    }
}
