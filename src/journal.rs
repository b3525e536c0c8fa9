//! Append-only audit journal of transaction outcomes.
//!
//! Every processed transaction is written as a five-line ASCII record:
//!
//! ```text
//! agent:<id>
//! number:<message number>
//! status:ok | status:fail <reason>
//! prev:<hash of the previous record, or GENESIS_HASH>
//! hash:<hex blake2b-256 over the four lines above>
//! ```
//!
//! The `prev` line chains each record to the one before it, so
//! [`verify_journal`] detects edited, deleted, inserted or reordered
//! records.  Truncating the tail is only detectable against a head hash kept
//! elsewhere; [`journal_head`] returns it.

use blake2::digest::{consts::U32, Digest};
use blake2::Blake2b;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

use crate::error::AdmissionError;

const JOURNAL_DOMAIN: &[u8] = b"SPYMASTER_JOURNAL_V2";
const RECORD_LINES: usize = 5;

/// `prev` value of the first record in a journal.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Outcome of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Agent addressed by the transaction.
    pub agent_id: u64,
    /// Message number carried by the transaction.
    pub message_number: u64,
    /// Failure reason, `None` when accepted.
    pub failure: Option<String>,
}

impl Receipt {
    /// Builds a receipt from a transaction result.
    pub fn from_result(
        agent_id: u64,
        message_number: u64,
        result: &Result<(), AdmissionError>,
    ) -> Self {
        Self {
            agent_id,
            message_number,
            failure: result.as_ref().err().map(|err| err.to_string()),
        }
    }

    fn status_line(&self) -> String {
        match &self.failure {
            None => "status:ok".to_string(),
            Some(reason) => format!("status:fail {reason}"),
        }
    }
}

/// One parsed record: the receipt plus its chain links as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Transaction outcome.
    pub receipt: Receipt,
    /// Hash of the preceding record.
    pub prev: String,
    /// Stored hash of this record.
    pub hash: String,
}

/// Errors raised while reading or checking a journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    /// Underlying filesystem failure.
    Io(#[from] io::Error),
    #[error("malformed record at line {line}: {reason}")]
    /// A record could not be parsed.
    Malformed {
        /// One-based line number where the record starts.
        line: usize,
        /// What was wrong.
        reason: String,
    },
    #[error("hash mismatch in record at line {line}")]
    /// A record's stored digest does not match its contents.
    HashMismatch {
        /// One-based line number where the record starts.
        line: usize,
    },
    #[error("chain broken at line {line}: record does not follow its predecessor")]
    /// A record's `prev` link does not name the record before it.
    ChainBroken {
        /// One-based line number where the record starts.
        line: usize,
    },
}

/// Computes the digest of a receipt chained onto `prev`.
pub fn compute_digest(prev: &str, receipt: &Receipt) -> String {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(JOURNAL_DOMAIN);
    hasher.update(receipt.agent_id.to_le_bytes());
    hasher.update(receipt.message_number.to_le_bytes());
    let status = receipt.status_line();
    hasher.update((status.len() as u64).to_le_bytes());
    hasher.update(status.as_bytes());
    hasher.update(prev.as_bytes());
    hex::encode(hasher.finalize())
}

/// Writes a receipt record chained onto `prev` and returns its hash.
pub fn write_receipt<W>(mut write_line: W, prev: &str, receipt: &Receipt) -> io::Result<String>
where
    W: FnMut(&str) -> io::Result<()>,
{
    let hash = compute_digest(prev, receipt);
    write_line(&format!("agent:{}", receipt.agent_id))?;
    write_line(&format!("number:{}", receipt.message_number))?;
    write_line(&receipt.status_line())?;
    write_line(&format!("prev:{prev}"))?;
    write_line(&format!("hash:{hash}"))?;
    Ok(hash)
}

fn parse_u64(input: &str, prefix: &str) -> Result<u64, String> {
    input
        .strip_prefix(prefix)
        .ok_or_else(|| format!("missing {prefix} prefix"))?
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid integer in {prefix}"))
}

fn parse_tagged(input: &str, prefix: &str) -> Result<String, String> {
    Ok(input
        .strip_prefix(prefix)
        .ok_or_else(|| format!("missing {prefix} prefix"))?
        .trim()
        .to_string())
}

/// Parses one record.
pub fn parse_receipt<'a, I>(lines: I) -> Result<JournalEntry, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = lines.into_iter();
    let mut next = |name: &str| iter.next().ok_or_else(|| format!("missing {name} line"));
    let agent_id = parse_u64(next("agent")?, "agent:")?;
    let message_number = parse_u64(next("number")?, "number:")?;
    let status = next("status")?;
    let failure = if status == "status:ok" {
        None
    } else {
        let reason = status
            .strip_prefix("status:fail ")
            .ok_or_else(|| "invalid status line".to_string())?;
        Some(reason.to_string())
    };
    let prev = parse_tagged(next("prev")?, "prev:")?;
    let hash = parse_tagged(next("hash")?, "hash:")?;
    Ok(JournalEntry {
        receipt: Receipt {
            agent_id,
            message_number,
            failure,
        },
        prev,
        hash,
    })
}

/// Checks every record and chain link in `contents`.
///
/// Returns the receipts in order and the hash of the last record
/// ([`GENESIS_HASH`] for an empty journal).
pub fn verify_lines(contents: &str) -> Result<(Vec<Receipt>, String), JournalError> {
    let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut receipts = Vec::with_capacity(lines.len() / RECORD_LINES);
    let mut head = GENESIS_HASH.to_string();
    for (index, chunk) in lines.chunks(RECORD_LINES).enumerate() {
        let line = index * RECORD_LINES + 1;
        let entry = parse_receipt(chunk.iter().copied())
            .map_err(|reason| JournalError::Malformed { line, reason })?;
        if compute_digest(&entry.prev, &entry.receipt) != entry.hash {
            return Err(JournalError::HashMismatch { line });
        }
        if entry.prev != head {
            return Err(JournalError::ChainBroken { line });
        }
        head = entry.hash;
        receipts.push(entry.receipt);
    }
    Ok((receipts, head))
}

/// Returns the hash new records must chain onto.
///
/// A missing file is an empty journal.  An existing journal is verified in
/// full so nothing is appended to a broken chain.
pub fn journal_head(path: &Path) -> Result<String, JournalError> {
    if !path.exists() {
        return Ok(GENESIS_HASH.to_string());
    }
    let contents = fs::read_to_string(path)?;
    Ok(verify_lines(&contents)?.1)
}

/// Appends a receipt to the journal file, creating it if necessary.
///
/// Returns the new head hash.
pub fn append_receipt(path: &Path, receipt: &Receipt) -> Result<String, JournalError> {
    let prev = journal_head(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let hash = write_receipt(
        |line| {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")
        },
        &prev,
        receipt,
    )?;
    file.sync_data()?;
    Ok(hash)
}

/// Reads a journal and verifies every record, returning the receipts.
pub fn verify_journal(path: &Path) -> Result<Vec<Receipt>, JournalError> {
    let contents = fs::read_to_string(path)?;
    Ok(verify_lines(&contents)?.0)
}
