//! Bounded eligibility list and one-shot message deposits.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::error::AdmissionError;
use crate::validate::check_flags;

/// Default number of addresses an eligibility list accepts.
pub const DEFAULT_ADDRESS_LIMIT: usize = 100;

/// Addresses allowed to deposit a single flagged message each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityList {
    limit: usize,
    eligible: BTreeSet<String>,
    deposits: BTreeMap<String, u64>,
}

impl Default for EligibilityList {
    fn default() -> Self {
        Self::with_limit(DEFAULT_ADDRESS_LIMIT)
    }
}

impl EligibilityList {
    /// Creates an empty list holding at most `limit` addresses.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            eligible: BTreeSet::new(),
            deposits: BTreeMap::new(),
        }
    }

    /// Number of eligible addresses.
    pub fn address_count(&self) -> usize {
        self.eligible.len()
    }

    /// Returns true if `address` may deposit.
    pub fn is_eligible(&self, address: &str) -> bool {
        self.eligible.contains(address)
    }

    /// Content deposited by `address`, if any.
    pub fn deposit(&self, address: &str) -> Option<u64> {
        self.deposits.get(address).copied()
    }

    /// Adds an address to the list.
    pub fn store_eligible_address(&mut self, address: &str) -> Result<(), AdmissionError> {
        if self.eligible.len() >= self.limit {
            return Err(AdmissionError::AddressLimitReached);
        }
        if !self.eligible.insert(address.to_string()) {
            return Err(AdmissionError::AddressAlreadyEligible);
        }
        debug!(address, count = self.eligible.len(), "address stored");
        Ok(())
    }

    /// Validates the flags on `message` and records its content for `address`.
    pub fn store_message(&mut self, address: &str, message: u64) -> Result<u64, AdmissionError> {
        let content = check_flags(message)?;
        if !self.is_eligible(address) {
            return Err(AdmissionError::AddressNotEligible);
        }
        if self.deposits.contains_key(address) {
            return Err(AdmissionError::MessageAlreadyDeposited);
        }
        self.deposits.insert(address.to_string(), content);
        info!(address, content, "message deposited");
        Ok(content)
    }
}
