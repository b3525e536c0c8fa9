//! Error types surfaced by the admission layer.
//!
//! [`AdmissionError`] carries the failure reasons reported back to the
//! ledger when a transaction is aborted.  Their `Display` strings are part of
//! the external contract and must not change.

use thiserror::Error;

/// Named reasons for aborting a single message or registry transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Agent not exist, no agent with id init")]
    /// No registry entry exists for the message's agent.
    UnknownAgent,
    #[error("Security code not match")]
    /// The presented security tag differs from the stored commitment.
    SecurityCodeMismatch,
    #[error("Message too short (min 12 chars)")]
    /// Payload below the twelve-digit range.
    MessageTooShort,
    #[error("Message too long (max 12 chars)")]
    /// Payload above the twelve-digit range.
    MessageTooLong,
    #[error("Message number not greater than the last message number")]
    /// Duplicate or out-of-order message number.
    MessageNumberNotGreater,
    #[error("agent pub already set")]
    /// Re-initialization attempted under the reject-existing policy.
    AlreadyInitialized,
    #[error("Addresses Limit reached")]
    /// The eligibility list is at capacity.
    AddressLimitReached,
    #[error("Invalid message")]
    /// Flag combination rejected by the flag validator.
    InvalidMessage,
    #[error("Message too short (min 2 chars)")]
    /// Security code below the two-digit range.
    SecurityCodeTooShort,
    #[error("Message too long (max 2 chars)")]
    /// Security code above the two-digit range.
    SecurityCodeTooLong,
    #[error("Address already eligible")]
    /// The address was already stored in the eligibility list.
    AddressAlreadyEligible,
    #[error("Address not eligible")]
    /// The sender is not on the eligibility list.
    AddressNotEligible,
    #[error("Message already deposited")]
    /// The sender already deposited a message.
    MessageAlreadyDeposited,
    #[error("Invalid proof")]
    /// The attached message proof failed certificate verification.
    InvalidProof,
}

/// Failures while building or consuming a fold chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FoldError {
    #[error("seed mismatch (expected {expected}, got {actual})")]
    /// `init` was called with a value other than the configured seed.
    SeedMismatch {
        /// Seed configured on the program.
        expected: u64,
        /// Value supplied by the caller.
        actual: u64,
    },
    #[error("earlier proof failed verification")]
    /// The certificate on a prior aggregate does not match its statement.
    InvalidCertificate,
}

/// Failures while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    /// Underlying filesystem failure.
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    /// JSON encode/decode failure.
    Decode(#[from] serde_json::Error),
}
