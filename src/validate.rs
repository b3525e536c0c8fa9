//! Structural checks applied to a single message.
//!
//! Everything here is a pure function of its inputs.  The batch variant
//! answers with a boolean so bad messages can be skipped; the transaction
//! variants answer with the [`AdmissionError`] that aborts the transaction.

use crate::error::AdmissionError;
use crate::message::SpyMessage;

/// Highest agent id accepted by the location validator.
pub const MAX_AGENT_ID: u64 = 3000;
/// Highest accepted horizontal coordinate.
pub const MAX_X_LOCATION: u64 = 15_000;
/// Lowest accepted vertical coordinate.
pub const MIN_Y_LOCATION: u64 = 5_000;
/// Highest accepted vertical coordinate.
pub const MAX_Y_LOCATION: u64 = 20_000;
/// Smallest twelve-digit payload.
pub const MIN_TWELVE_CHAR: u64 = 100_000_000_000;
/// Largest twelve-digit payload.
pub const MAX_TWELVE_CHAR: u64 = 999_999_999_999;
/// Smallest two-digit security code.
pub const MIN_SECURITY_CODE: u64 = 10;
/// Largest two-digit security code.
pub const MAX_SECURITY_CODE: u64 = 99;

const FLAG_1: u64 = 0b100000;
const FLAG_2: u64 = 0b010000;
const FLAG_3: u64 = 0b001000;
const FLAG_4: u64 = 0b000100;
const FLAG_5: u64 = 0b000010;
const FLAG_6: u64 = 0b000001;
/// Number of low bits of a deposited message reserved for flags.
pub const FLAG_BITS: u32 = 6;

/// Returns true if the location report is in range and its checksum matches.
pub fn is_valid_location(message: &SpyMessage) -> bool {
    let in_range = message.agent_id <= MAX_AGENT_ID
        && message.x_location <= MAX_X_LOCATION
        && (MIN_Y_LOCATION..=MAX_Y_LOCATION).contains(&message.y_location);
    let sum = message
        .agent_id
        .checked_add(message.x_location)
        .and_then(|s| s.checked_add(message.y_location));
    in_range && sum == Some(message.checksum)
}

/// Checks that the payload has exactly twelve decimal digits.
pub fn check_twelve_char(twelve_char: u64) -> Result<(), AdmissionError> {
    if twelve_char < MIN_TWELVE_CHAR {
        return Err(AdmissionError::MessageTooShort);
    }
    if twelve_char > MAX_TWELVE_CHAR {
        return Err(AdmissionError::MessageTooLong);
    }
    Ok(())
}

/// Checks that a raw security code has exactly two decimal digits.
pub fn check_security_code(code: u64) -> Result<(), AdmissionError> {
    if code < MIN_SECURITY_CODE {
        return Err(AdmissionError::SecurityCodeTooShort);
    }
    if code > MAX_SECURITY_CODE {
        return Err(AdmissionError::SecurityCodeTooLong);
    }
    Ok(())
}

/// Checks the flag rules on a deposited message and returns its content.
///
/// Flag 1 excludes every other flag, flag 2 requires flag 3, and flag 4
/// excludes flags 5 and 6.  The content is the message without its flag
/// bits.
pub fn check_flags(message: u64) -> Result<u64, AdmissionError> {
    let set = |flag: u64| message & flag == flag;
    let rule1 = !set(FLAG_1) || message & (FLAG_2 | FLAG_3 | FLAG_4 | FLAG_5 | FLAG_6) == 0;
    let rule2 = !set(FLAG_2) || set(FLAG_3);
    let rule3 = !set(FLAG_4) || message & (FLAG_5 | FLAG_6) == 0;
    if rule1 && rule2 && rule3 {
        Ok(message >> FLAG_BITS)
    } else {
        Err(AdmissionError::InvalidMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(agent_id: u64, x: u64, y: u64, checksum: u64) -> SpyMessage {
        SpyMessage {
            agent_id,
            x_location: x,
            y_location: y,
            checksum,
        }
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(is_valid_location(&msg(0, 0, 5000, 5000)));
        assert!(is_valid_location(&msg(3000, 15000, 20000, 38000)));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(!is_valid_location(&msg(3001, 0, 5000, 8001)));
        assert!(!is_valid_location(&msg(1, 15001, 5000, 20002)));
        assert!(!is_valid_location(&msg(1, 0, 4999, 5000)));
        assert!(!is_valid_location(&msg(1, 0, 20001, 20002)));
    }

    #[test]
    fn rejects_bad_checksum() {
        assert!(!is_valid_location(&msg(1, 100, 5001, 0)));
        assert!(is_valid_location(&msg(1, 100, 5001, 5102)));
    }

    #[test]
    fn twelve_char_bounds() {
        assert_eq!(check_twelve_char(123_456_789_012), Ok(()));
        assert_eq!(check_twelve_char(100_000_000_000), Ok(()));
        assert_eq!(check_twelve_char(999_999_999_999), Ok(()));
        assert_eq!(
            check_twelve_char(99_999_999_999),
            Err(AdmissionError::MessageTooShort)
        );
        assert_eq!(
            check_twelve_char(1_000_000_000_000),
            Err(AdmissionError::MessageTooLong)
        );
        assert_eq!(
            check_twelve_char(1_234_567_890),
            Err(AdmissionError::MessageTooShort)
        );
        assert_eq!(
            check_twelve_char(12_345_678_901_234_567_890),
            Err(AdmissionError::MessageTooLong)
        );
    }

    #[test]
    fn flag_rules() {
        let content = 55_688u64 << FLAG_BITS;
        assert_eq!(check_flags(content | 0b100000), Ok(55_688));
        assert_eq!(
            check_flags(content | 0b100001),
            Err(AdmissionError::InvalidMessage)
        );
        assert_eq!(check_flags(content | 0b011000), Ok(55_688));
        assert_eq!(
            check_flags(content | 0b010000),
            Err(AdmissionError::InvalidMessage)
        );
        assert_eq!(check_flags(content | 0b000100), Ok(55_688));
        assert_eq!(
            check_flags(content | 0b000110),
            Err(AdmissionError::InvalidMessage)
        );
        assert_eq!(check_flags(0), Ok(0));
    }

    #[test]
    fn security_code_bounds() {
        assert_eq!(check_security_code(12), Ok(()));
        assert_eq!(check_security_code(10), Ok(()));
        assert_eq!(check_security_code(99), Ok(()));
        assert_eq!(
            check_security_code(9),
            Err(AdmissionError::SecurityCodeTooShort)
        );
        assert_eq!(
            check_security_code(100).unwrap_err().to_string(),
            "Message too long (max 2 chars)"
        );
    }
}
