#![deny(missing_docs)]

//! # spymaster
//!
//! **spymaster** implements the admission rules that decide which agent
//! messages a headquarters accepts.  Proving, Merkle storage and the ledger
//! itself are someone else's job; what lives here is the thin layer of
//! validation rules and state transitions that sits on top of them.
//!
//! ## Features
//!
//! * **Field validation** in [`validate`]: coordinate ranges and checksums
//!   for location reports, twelve-digit payloads, two-digit security codes
//!   and the flag rules for deposited messages.
//! * **Sequence admission** in [`policy`]: a batch regime that bypasses
//!   agent `0` and duplicates and silently discards invalid messages, and a
//!   transaction regime that aborts with a named reason.
//! * **Incremental folding** in [`fold`]: a linear chain of certified
//!   aggregates, each step consuming the previous one.
//! * **Commit gate** in [`commit`]: only a strictly greater aggregate moves
//!   the stored highest message number.
//! * **Agent registry** in [`registry`] and the transaction runtimes in
//!   [`runtime`], including a private variant fed by [`private`] outputs
//!   that never sees the raw payload or security code.
//! * **Eligibility list** in [`eligibility`] and an audit [`journal`].
//!
//! ## Usage
//!
//! ```rust
//! use spymaster::{DigestAttestor, SequencedMessage, SpyMasterContract, SpyMasterProgram, SpyMessage};
//!
//! let program = SpyMasterProgram::new(DigestAttestor::default());
//! let batch: Vec<SequencedMessage> = (0..3)
//!     .map(|n| SequencedMessage {
//!         message_number: n,
//!         message: SpyMessage::with_checksum(1 + n, 100, 5001).unwrap(),
//!     })
//!     .collect();
//! let proof = program.fold_batch(0, &batch).unwrap();
//! assert_eq!(proof.public_output, 2);
//!
//! let mut contract = SpyMasterContract::new();
//! contract.process_batch(&proof, program.attestor()).unwrap();
//! assert_eq!(contract.highest_message_number(), 2);
//! ```

pub mod attest;
pub mod commit;
pub mod config;
pub mod eligibility;
mod error;
pub mod fold;
pub mod journal;
mod message;
pub mod policy;
pub mod private;
pub mod registry;
pub mod runtime;
pub mod validate;

pub use attest::{Attestor, Blake2Oracle, Certificate, Digest, DigestAttestor, HashOracle};
pub use commit::{CommitOutcome, SpyMasterContract};
pub use config::{ConfigError, GateConfig};
pub use eligibility::EligibilityList;
pub use error::{AdmissionError, FoldError, StoreError};
pub use fold::{FoldProof, SpyMasterProgram};
pub use journal::{JournalError, Receipt};
pub use message::{AgentMessage, AgentPublicOutput, SequencedMessage, SpyMessage};
pub use policy::{admit, admit_strict, Admission, AdmissionDecision, BypassReason, StrictCandidate};
pub use private::{AttestedOutput, PrivateMessageProgram};
pub use registry::{AgentRegistry, AgentState, InitPolicy, Provenance, SecurityCommitment};
pub use runtime::{MessagesRuntime, PrivateMessagesRuntime, TxContext};
