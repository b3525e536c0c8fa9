//! Message records submitted by agents.
//!
//! Three shapes exist.  [`SpyMessage`] is the checksummed location report
//! folded in batches; [`AgentMessage`] is the raw per-transaction message
//! carrying a twelve-digit payload and the agent's shared code; and
//! [`AgentPublicOutput`] is what remains of an [`AgentMessage`] once the
//! privacy step has committed to its security code.

use serde::{Deserialize, Serialize};

use crate::attest::Digest;

/// Location report folded into a batch aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyMessage {
    /// Sending agent; `0` skips detailed validation.
    pub agent_id: u64,
    /// Horizontal coordinate.
    pub x_location: u64,
    /// Vertical coordinate.
    pub y_location: u64,
    /// Must equal `agent_id + x_location + y_location`.
    pub checksum: u64,
}

impl SpyMessage {
    /// Builds a message whose checksum is computed from the other fields.
    ///
    /// Returns `None` if the sum overflows.
    pub fn with_checksum(agent_id: u64, x_location: u64, y_location: u64) -> Option<Self> {
        let checksum = agent_id.checked_add(x_location)?.checked_add(y_location)?;
        Some(Self {
            agent_id,
            x_location,
            y_location,
            checksum,
        })
    }

    /// Returns true for the reserved agent id that bypasses validation.
    pub fn is_bypass_agent(&self) -> bool {
        self.agent_id == 0
    }
}

/// A [`SpyMessage`] together with its position in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedMessage {
    /// Message number within the stream.
    pub message_number: u64,
    /// Message details.
    pub message: SpyMessage,
}

/// Raw message submitted as its own transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Sending agent.
    pub agent_id: u64,
    /// Per-agent message number.
    pub message_number: u64,
    /// Twelve-digit payload.
    pub twelve_char: u64,
    /// Shared code presented by the agent.
    pub security_code: u64,
}

/// Public output of the privacy step: the raw payload and code are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPublicOutput {
    /// Sending agent.
    pub agent_id: u64,
    /// Hash of the agent's security code.
    #[serde(with = "crate::attest::hex_digest")]
    pub security_code_hash: Digest,
    /// Per-agent message number.
    pub message_number: u64,
}
