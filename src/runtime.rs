//! Transaction-style message runtimes.
//!
//! Each call is one atomic transaction: every check runs before the registry
//! is written, so a failing call leaves state exactly as it was and reports
//! the reason to the ledger that invoked it.

use tracing::{info, warn};

use crate::attest::{Attestor, Digest};
use crate::error::AdmissionError;
use crate::message::AgentMessage;
use crate::policy::{admit_strict, StrictCandidate};
use crate::private::AttestedOutput;
use crate::registry::{AgentRegistry, AgentState, InitPolicy, Provenance, SecurityCommitment};
use crate::validate::check_security_code;

/// Execution context supplied by the ledger for each transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxContext {
    /// Height of the block being produced.
    pub block_height: u64,
    /// Signer of the transaction.
    pub sender: String,
    /// Signer's nonce.
    pub nonce: u64,
}

fn log_rejection<T>(agent_id: u64, result: Result<T, AdmissionError>) -> Result<T, AdmissionError> {
    if let Err(err) = &result {
        warn!(agent_id, reason = %err, "transaction rejected");
    }
    result
}

/// Runtime holding raw two-digit security codes.
#[derive(Debug, Clone)]
pub struct MessagesRuntime {
    agents: AgentRegistry,
}

impl Default for MessagesRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagesRuntime {
    /// Creates a runtime whose re-initialization overwrites.
    pub fn new() -> Self {
        Self::with_registry(AgentRegistry::new(InitPolicy::Overwrite))
    }

    /// Wraps an existing registry.
    pub fn with_registry(agents: AgentRegistry) -> Self {
        Self { agents }
    }

    /// Read access to agent state.
    pub fn registry(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Releases the registry, e.g. for persistence.
    pub fn into_registry(self) -> AgentRegistry {
        self.agents
    }

    /// Registers an agent with its two-digit security code.
    pub fn init_agent(&mut self, agent_id: u64, security_code: u64) -> Result<(), AdmissionError> {
        log_rejection(agent_id, check_security_code(security_code))?;
        log_rejection(
            agent_id,
            self.agents
                .init_agent(agent_id, SecurityCommitment::Code(security_code), None),
        )
    }

    /// Admits one raw message.
    pub fn process_message(&mut self, message: &AgentMessage) -> Result<(), AdmissionError> {
        let candidate = StrictCandidate {
            agent_id: message.agent_id,
            message_number: message.message_number,
            security: SecurityCommitment::Code(message.security_code),
            payload: Some(message.twelve_char),
        };
        let state = log_rejection(message.agent_id, admit_strict(&self.agents, &candidate))?;
        let updated = AgentState {
            message_number: message.message_number,
            ..state.clone()
        };
        self.agents.set(message.agent_id, updated);
        info!(
            agent_id = message.agent_id,
            message_number = message.message_number,
            "message accepted"
        );
        Ok(())
    }
}

/// Runtime that only sees attested outputs of the privacy step.
#[derive(Debug, Clone)]
pub struct PrivateMessagesRuntime<A> {
    agents: AgentRegistry,
    attestor: A,
}

impl<A: Attestor> PrivateMessagesRuntime<A> {
    /// Creates a runtime whose re-initialization is rejected.
    pub fn new(attestor: A) -> Self {
        Self::with_registry(AgentRegistry::new(InitPolicy::RejectExisting), attestor)
    }

    /// Wraps an existing registry.
    pub fn with_registry(agents: AgentRegistry, attestor: A) -> Self {
        Self { agents, attestor }
    }

    /// Read access to agent state.
    pub fn registry(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Releases the registry, e.g. for persistence.
    pub fn into_registry(self) -> AgentRegistry {
        self.agents
    }

    /// Registers an agent by the hash of its security code.
    pub fn init_agent(
        &mut self,
        agent_id: u64,
        security_code_hash: Digest,
        ctx: &TxContext,
    ) -> Result<(), AdmissionError> {
        let provenance = Provenance {
            block_height: 0,
            sender: ctx.sender.clone(),
            nonce: 0,
        };
        log_rejection(
            agent_id,
            self.agents.init_agent(
                agent_id,
                SecurityCommitment::Digest(security_code_hash),
                Some(provenance),
            ),
        )
    }

    /// Admits one attested message and records the transaction provenance.
    pub fn process_message(
        &mut self,
        message: &AttestedOutput,
        ctx: &TxContext,
    ) -> Result<(), AdmissionError> {
        let output = &message.output;
        if !message.verify(&self.attestor) {
            return log_rejection(output.agent_id, Err(AdmissionError::InvalidProof));
        }
        let candidate = StrictCandidate {
            agent_id: output.agent_id,
            message_number: output.message_number,
            security: SecurityCommitment::Digest(output.security_code_hash),
            payload: None,
        };
        log_rejection(output.agent_id, admit_strict(&self.agents, &candidate))?;
        self.agents.set(
            output.agent_id,
            AgentState {
                message_number: output.message_number,
                security: SecurityCommitment::Digest(output.security_code_hash),
                provenance: Some(Provenance {
                    block_height: ctx.block_height,
                    sender: ctx.sender.clone(),
                    nonce: ctx.nonce,
                }),
            },
        );
        info!(
            agent_id = output.agent_id,
            message_number = output.message_number,
            block_height = ctx.block_height,
            "private message accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attest::{Blake2Oracle, DigestAttestor};
    use crate::private::PrivateMessageProgram;

    fn raw(agent_id: u64, message_number: u64, twelve_char: u64, code: u64) -> AgentMessage {
        AgentMessage {
            agent_id,
            message_number,
            twelve_char,
            security_code: code,
        }
    }

    #[test]
    fn plain_runtime_accepts_then_rejects_replay() {
        let mut runtime = MessagesRuntime::new();
        runtime.init_agent(1, 12).unwrap();
        runtime
            .process_message(&raw(1, 1, 123_456_789_012, 12))
            .unwrap();
        assert_eq!(runtime.registry().get(1).unwrap().message_number, 1);
        let err = runtime
            .process_message(&raw(1, 1, 123_456_789_012, 12))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Message number not greater than the last message number"
        );
        assert_eq!(runtime.registry().get(1).unwrap().message_number, 1);
    }

    #[test]
    fn plain_runtime_reports_each_reason() {
        let mut runtime = MessagesRuntime::new();
        runtime.init_agent(1, 45).unwrap();
        let cases = [
            (raw(2, 1, 123_456_789_012, 45), AdmissionError::UnknownAgent),
            (raw(1, 1, 123_456_789_012, 46), AdmissionError::SecurityCodeMismatch),
            (raw(1, 1, 1_234_567_890, 45), AdmissionError::MessageTooShort),
            (
                raw(1, 1, 12_345_678_901_234_567_890, 45),
                AdmissionError::MessageTooLong,
            ),
        ];
        for (message, expected) in cases {
            assert_eq!(runtime.process_message(&message).unwrap_err(), expected);
        }
        assert_eq!(runtime.registry().get(1).unwrap().message_number, 0);
    }

    #[test]
    fn plain_runtime_checks_code_length_and_overwrites() {
        let mut runtime = MessagesRuntime::new();
        assert_eq!(
            runtime.init_agent(1, 9).unwrap_err(),
            AdmissionError::SecurityCodeTooShort
        );
        assert_eq!(
            runtime.init_agent(1, 123).unwrap_err(),
            AdmissionError::SecurityCodeTooLong
        );
        runtime.init_agent(1, 12).unwrap();
        runtime.init_agent(1, 34).unwrap();
        assert_eq!(
            runtime.registry().get(1).unwrap().security,
            SecurityCommitment::Code(34)
        );
    }

    #[test]
    fn private_runtime_records_provenance() {
        let program = PrivateMessageProgram::new(DigestAttestor::default(), Blake2Oracle);
        let mut runtime = PrivateMessagesRuntime::new(DigestAttestor::default());
        let alice = TxContext {
            block_height: 0,
            sender: "alice".into(),
            nonce: 0,
        };
        runtime
            .init_agent(1, program.commit_code(12), &alice)
            .unwrap();
        assert_eq!(
            runtime
                .init_agent(1, program.commit_code(12), &alice)
                .unwrap_err(),
            AdmissionError::AlreadyInitialized
        );

        let proof = program
            .process_message(&raw(1, 1, 123_456_789_012, 12))
            .unwrap();
        let ctx = TxContext {
            block_height: 4,
            sender: "alice".into(),
            nonce: 2,
        };
        runtime.process_message(&proof, &ctx).unwrap();
        let state = runtime.registry().get(1).unwrap();
        assert_eq!(state.message_number, 1);
        assert_eq!(
            state.provenance,
            Some(Provenance {
                block_height: 4,
                sender: "alice".into(),
                nonce: 2
            })
        );
        assert_eq!(
            runtime.process_message(&proof, &ctx).unwrap_err(),
            AdmissionError::MessageNumberNotGreater
        );
    }

    #[test]
    fn private_runtime_rejects_wrong_code_and_forgery() {
        let program = PrivateMessageProgram::new(DigestAttestor::default(), Blake2Oracle);
        let mut runtime = PrivateMessagesRuntime::new(DigestAttestor::default());
        let ctx = TxContext::default();
        runtime.init_agent(1, program.commit_code(12), &ctx).unwrap();

        let wrong = program
            .process_message(&raw(1, 1, 123_456_789_012, 13))
            .unwrap();
        assert_eq!(
            runtime.process_message(&wrong, &ctx).unwrap_err(),
            AdmissionError::SecurityCodeMismatch
        );

        let mut forged = program
            .process_message(&raw(1, 1, 123_456_789_012, 12))
            .unwrap();
        forged.output.message_number = 50;
        assert_eq!(
            runtime.process_message(&forged, &ctx).unwrap_err(),
            AdmissionError::InvalidProof
        );

        let stranger = program
            .process_message(&raw(0, 1, 123_456_789_012, 12))
            .unwrap();
        assert_eq!(
            runtime.process_message(&stranger, &ctx).unwrap_err(),
            AdmissionError::UnknownAgent
        );
        assert_eq!(runtime.registry().get(1).unwrap().message_number, 0);
    }
}
