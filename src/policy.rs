//! Sequence admission policy.
//!
//! Two regimes share the same inputs.  The batch regime ([`admit`]) never
//! fails: a message is accepted, bypassed or discarded and the running
//! message number is carried forward.  The transaction regime
//! ([`admit_strict`]) runs an ordered list of hard checks and returns the
//! first failing reason.

use tracing::debug;

use crate::error::AdmissionError;
use crate::message::SequencedMessage;
use crate::registry::{AgentRegistry, AgentState, SecurityCommitment};
use crate::validate::{check_twelve_char, is_valid_location};

/// Why a message skipped detailed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Sent by the reserved agent `0`.
    ReservedAgent,
    /// Message number not above the running number.
    Duplicate,
}

/// Outcome class of one batch admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Passed the field validator.
    Validated,
    /// Accepted without running the field validator.
    Bypassed(BypassReason),
    /// Failed the field validator; skipped.
    Discarded,
}

/// Result of admitting one message against a running number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// How the message was classified.
    pub admission: Admission,
    /// Running message number after this message.
    pub result: u64,
}

impl AdmissionDecision {
    /// Returns true unless the message was discarded.
    pub fn accepted(&self) -> bool {
        !matches!(self.admission, Admission::Discarded)
    }
}

/// Admits one message in the batch regime.
///
/// Messages from agent `0` and messages whose number does not exceed
/// `prior` are accepted without validation.  The running number only moves
/// when an accepted message carries a number above `prior`, so a duplicate
/// never advances or regresses it and a discarded message leaves it alone.
pub fn admit(candidate: &SequencedMessage, prior: u64) -> AdmissionDecision {
    let number = candidate.message_number;
    let admission = if candidate.message.is_bypass_agent() {
        Admission::Bypassed(BypassReason::ReservedAgent)
    } else if number <= prior {
        Admission::Bypassed(BypassReason::Duplicate)
    } else if is_valid_location(&candidate.message) {
        Admission::Validated
    } else {
        Admission::Discarded
    };
    let advances = !matches!(admission, Admission::Discarded) && number > prior;
    let result = if advances { number } else { prior };
    debug!(
        message_number = number,
        agent_id = candidate.message.agent_id,
        prior,
        result,
        ?admission,
        "batch admission"
    );
    AdmissionDecision { admission, result }
}

/// Claim presented by a message transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictCandidate {
    /// Sending agent.
    pub agent_id: u64,
    /// Per-agent message number.
    pub message_number: u64,
    /// Tag compared against the stored commitment.
    pub security: SecurityCommitment,
    /// Raw payload, when it has not already been checked upstream.
    pub payload: Option<u64>,
}

/// Runs the transaction checks in order and returns the agent's current state.
///
/// The checks are: the agent exists, the security tag matches, the payload
/// (if present) has twelve digits, and the message number is strictly above
/// the last accepted one.  The registry is not modified.
pub fn admit_strict<'r>(
    registry: &'r AgentRegistry,
    candidate: &StrictCandidate,
) -> Result<&'r AgentState, AdmissionError> {
    let state = registry
        .get(candidate.agent_id)
        .ok_or(AdmissionError::UnknownAgent)?;
    if state.security != candidate.security {
        return Err(AdmissionError::SecurityCodeMismatch);
    }
    if let Some(payload) = candidate.payload {
        check_twelve_char(payload)?;
    }
    if candidate.message_number <= state.message_number {
        return Err(AdmissionError::MessageNumberNotGreater);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SpyMessage;
    use crate::registry::InitPolicy;

    fn seq(message_number: u64, agent_id: u64, x: u64, y: u64, checksum: u64) -> SequencedMessage {
        SequencedMessage {
            message_number,
            message: SpyMessage {
                agent_id,
                x_location: x,
                y_location: y,
                checksum,
            },
        }
    }

    #[test]
    fn valid_message_advances() {
        let decision = admit(&seq(4, 1, 100, 5001, 5102), 3);
        assert_eq!(decision.admission, Admission::Validated);
        assert_eq!(decision.result, 4);
    }

    #[test]
    fn invalid_message_is_discarded() {
        let decision = admit(&seq(4, 1, 100, 5001, 0), 3);
        assert_eq!(decision.admission, Admission::Discarded);
        assert!(!decision.accepted());
        assert_eq!(decision.result, 3);
    }

    #[test]
    fn reserved_agent_skips_validation() {
        let decision = admit(&seq(1, 0, 15001, 0, 0), 0);
        assert_eq!(
            decision.admission,
            Admission::Bypassed(BypassReason::ReservedAgent)
        );
        assert_eq!(decision.result, 1);
    }

    #[test]
    fn duplicate_is_accepted_but_does_not_move() {
        let decision = admit(&seq(1, 1, 99999, 0, 0), 6);
        assert_eq!(decision.admission, Admission::Bypassed(BypassReason::Duplicate));
        assert!(decision.accepted());
        assert_eq!(decision.result, 6);

        let equal = admit(&seq(6, 1, 100, 5001, 5102), 6);
        assert_eq!(equal.admission, Admission::Bypassed(BypassReason::Duplicate));
        assert_eq!(equal.result, 6);
    }

    #[test]
    fn strict_checks_run_in_order() {
        let mut registry = AgentRegistry::new(InitPolicy::Overwrite);
        registry
            .init_agent(1, SecurityCommitment::Code(12), None)
            .unwrap();
        let mut candidate = StrictCandidate {
            agent_id: 2,
            message_number: 0,
            security: SecurityCommitment::Code(13),
            payload: Some(1),
        };
        assert_eq!(
            admit_strict(&registry, &candidate).unwrap_err(),
            AdmissionError::UnknownAgent
        );
        candidate.agent_id = 1;
        assert_eq!(
            admit_strict(&registry, &candidate).unwrap_err(),
            AdmissionError::SecurityCodeMismatch
        );
        candidate.security = SecurityCommitment::Code(12);
        assert_eq!(
            admit_strict(&registry, &candidate).unwrap_err(),
            AdmissionError::MessageTooShort
        );
        candidate.payload = Some(123_456_789_012);
        assert_eq!(
            admit_strict(&registry, &candidate).unwrap_err(),
            AdmissionError::MessageNumberNotGreater
        );
        candidate.message_number = 1;
        assert_eq!(admit_strict(&registry, &candidate).unwrap().message_number, 0);
    }
}
