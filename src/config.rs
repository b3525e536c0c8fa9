//! Gate configuration loaded from JSON with environment overrides.
//!
//! Recognised variables: `SPYMASTER_INIT_POLICY`, `SPYMASTER_FOLD_SEED`,
//! `SPYMASTER_ADDRESS_LIMIT`, `SPYMASTER_ATTESTATION_KEY` (hex) and
//! `SPYMASTER_JOURNAL_DIR`.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use thiserror::Error;

use crate::attest::DigestAttestor;
use crate::eligibility::{EligibilityList, DEFAULT_ADDRESS_LIMIT};
use crate::registry::{AgentRegistry, InitPolicy};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    /// Underlying filesystem failure.
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    /// The file is not valid JSON for [`GateConfig`].
    Decode(#[from] serde_json::Error),
    #[error("invalid value for {name}: {reason}")]
    /// An environment override could not be parsed.
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Parse failure.
        reason: String,
    },
    #[error("invalid attestation key: {0}")]
    /// The attestation key, from the file or `SPYMASTER_ATTESTATION_KEY`,
    /// is not valid hex.
    InvalidKey(#[from] hex::FromHexError),
}

/// Runtime settings shared by the library entry points and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Re-initialization behaviour of agent registries.
    pub init_policy: InitPolicy,
    /// Value fold chains must start from.
    pub fold_seed: u64,
    /// Capacity of eligibility lists.
    pub address_limit: usize,
    /// Hex-encoded attestation key; `None` uses the built-in local key.
    pub attestation_key: Option<String>,
    /// Directory receiving audit journals; `None` disables journaling.
    pub journal_dir: Option<PathBuf>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            init_policy: InitPolicy::Overwrite,
            fold_seed: 0,
            address_limit: DEFAULT_ADDRESS_LIMIT,
            attestation_key: None,
            journal_dir: None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl GateConfig {
    /// Load from JSON; missing file -> defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Loads `path` (if given) and applies environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overrides fields from `SPYMASTER_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_var("SPYMASTER_INIT_POLICY") {
            self.init_policy = value.parse::<InitPolicy>().map_err(|reason| ConfigError::InvalidEnv {
                name: "SPYMASTER_INIT_POLICY",
                reason,
            })?;
        }
        if let Some(value) = env_var("SPYMASTER_FOLD_SEED") {
            self.fold_seed = value.trim().parse().map_err(|err: std::num::ParseIntError| {
                ConfigError::InvalidEnv {
                    name: "SPYMASTER_FOLD_SEED",
                    reason: err.to_string(),
                }
            })?;
        }
        if let Some(value) = env_var("SPYMASTER_ADDRESS_LIMIT") {
            self.address_limit =
                value.trim().parse().map_err(|err: std::num::ParseIntError| {
                    ConfigError::InvalidEnv {
                        name: "SPYMASTER_ADDRESS_LIMIT",
                        reason: err.to_string(),
                    }
                })?;
        }
        if let Some(value) = env_var("SPYMASTER_ATTESTATION_KEY") {
            self.attestation_key = Some(value);
        }
        if let Some(value) = env_var("SPYMASTER_JOURNAL_DIR") {
            self.journal_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Empty agent registry using the configured init policy.
    pub fn registry(&self) -> AgentRegistry {
        AgentRegistry::new(self.init_policy)
    }

    /// Empty eligibility list with the configured capacity.
    pub fn eligibility_list(&self) -> EligibilityList {
        EligibilityList::with_limit(self.address_limit)
    }

    /// Builds the attestor described by this configuration.
    pub fn attestor(&self) -> Result<DigestAttestor, ConfigError> {
        match &self.attestation_key {
            None => Ok(DigestAttestor::default()),
            Some(key) => Ok(DigestAttestor::from_hex(key)?),
        }
    }
}
