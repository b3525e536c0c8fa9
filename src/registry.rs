//! Durable per-agent state keyed by agent id.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fs, path::Path, str::FromStr};
use tracing::{debug, info};

use crate::attest::Digest;
use crate::error::{AdmissionError, StoreError};

/// Value proving knowledge of an agent's shared secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCommitment {
    /// Raw shared code.
    Code(u64),
    /// Hash of the shared code.
    Digest(#[serde(with = "crate::attest::hex_digest")] Digest),
}

/// Descriptive metadata about the transaction that last touched an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Provenance {
    /// Block height at which the transaction executed.
    pub block_height: u64,
    /// Submitting account.
    pub sender: String,
    /// Submitter nonce.
    pub nonce: u64,
}

/// Registry record for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// Highest accepted message number.
    pub message_number: u64,
    /// Commitment fixed at initialization.
    pub security: SecurityCommitment,
    /// Provenance of the latest accepted transaction, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Behaviour of [`AgentRegistry::init_agent`] for an id that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Replace the existing entry.
    #[default]
    Overwrite,
    /// Fail and keep the first entry.
    RejectExisting,
}

impl FromStr for InitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "reject" | "reject_existing" | "reject-existing" => Ok(Self::RejectExisting),
            other => Err(format!("unknown init policy: {other}")),
        }
    }
}

impl fmt::Display for InitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::RejectExisting => write!(f, "reject_existing"),
        }
    }
}

/// Keyed agent store.  Entries are never removed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentRegistry {
    #[serde(skip)]
    policy: InitPolicy,
    agents: BTreeMap<u64, AgentState>,
}

impl AgentRegistry {
    /// Creates an empty registry with the given initialization policy.
    pub fn new(policy: InitPolicy) -> Self {
        Self {
            policy,
            agents: BTreeMap::new(),
        }
    }

    /// Load from JSON; missing file -> empty registry.
    pub fn load(path: &Path, policy: InitPolicy) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new(policy));
        }
        let bytes = fs::read(path)?;
        let mut registry: Self = serde_json::from_slice(&bytes)?;
        registry.policy = policy;
        Ok(registry)
    }

    /// Persist to JSON.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Returns the initialization policy in force.
    pub fn policy(&self) -> InitPolicy {
        self.policy
    }

    /// Registers an agent with message number zero.
    pub fn init_agent(
        &mut self,
        agent_id: u64,
        security: SecurityCommitment,
        provenance: Option<Provenance>,
    ) -> Result<(), AdmissionError> {
        if self.policy == InitPolicy::RejectExisting && self.agents.contains_key(&agent_id) {
            debug!(agent_id, "agent already initialized");
            return Err(AdmissionError::AlreadyInitialized);
        }
        self.agents.insert(
            agent_id,
            AgentState {
                message_number: 0,
                security,
                provenance,
            },
        );
        info!(agent_id, policy = %self.policy, "agent initialized");
        Ok(())
    }

    /// Get agent if present.
    pub fn get(&self, agent_id: u64) -> Option<&AgentState> {
        self.agents.get(&agent_id)
    }

    /// Overwrites the state stored for `agent_id`.
    pub fn set(&mut self, agent_id: u64, state: AgentState) {
        self.agents.insert(agent_id, state);
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true when no agent is registered.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Iterates agents in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &AgentState)> {
        self.agents.iter().map(|(id, state)| (*id, state))
    }
}
