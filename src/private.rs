//! Privacy step for raw agent messages.
//!
//! The payload is range-checked and the security code replaced by its hash
//! before anything leaves the sender, so the registry only ever sees an
//! [`AgentPublicOutput`].

use serde::{Deserialize, Serialize};

use crate::attest::{encode_words, hex_digest, Attestor, Certificate, Digest, HashOracle};
use crate::error::AdmissionError;
use crate::message::{AgentMessage, AgentPublicOutput};
use crate::validate::check_twelve_char;

const PRIVATE_DOMAIN: &[u8] = b"SPYMASTER_PRIVATE_MESSAGE_V1";

/// Public output together with the certificate produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedOutput {
    /// Committed message fields.
    pub output: AgentPublicOutput,
    /// Certificate over `output`.
    #[serde(with = "hex_digest")]
    pub certificate: Certificate,
}

impl AttestedOutput {
    fn statement(output: &AgentPublicOutput) -> Vec<u8> {
        let mut statement = encode_words(&[output.agent_id, output.message_number]);
        statement.extend_from_slice(&output.security_code_hash);
        statement
    }

    /// Returns true if the certificate matches the output.
    pub fn verify<A: Attestor>(&self, attestor: &A) -> bool {
        attestor.verify(
            PRIVATE_DOMAIN,
            &Self::statement(&self.output),
            &self.certificate,
        )
    }
}

/// Reduces raw messages to attested public outputs.
#[derive(Debug, Clone)]
pub struct PrivateMessageProgram<A, H> {
    attestor: A,
    hasher: H,
}

impl<A: Attestor, H: HashOracle> PrivateMessageProgram<A, H> {
    /// Creates a program from its attestor and hash oracle.
    pub fn new(attestor: A, hasher: H) -> Self {
        Self { attestor, hasher }
    }

    /// Hashes a security code the way [`Self::process_message`] does.
    pub fn commit_code(&self, code: u64) -> Digest {
        self.hasher.hash_code(code)
    }

    /// Checks the payload length and commits to the security code.
    pub fn process_message(&self, message: &AgentMessage) -> Result<AttestedOutput, AdmissionError> {
        check_twelve_char(message.twelve_char)?;
        let output = AgentPublicOutput {
            agent_id: message.agent_id,
            security_code_hash: self.hasher.hash_code(message.security_code),
            message_number: message.message_number,
        };
        let certificate = self
            .attestor
            .attest(PRIVATE_DOMAIN, &AttestedOutput::statement(&output));
        Ok(AttestedOutput {
            output,
            certificate,
        })
    }
}
