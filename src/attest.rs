//! Trust boundary between the admission policy and the proof system.
//!
//! Aggregates and private-message outputs travel with a [`Certificate`]
//! asserting that a given public statement was produced by a valid step.  The
//! admission layer never inspects how a certificate is made; it only asks an
//! injected [`Attestor`] whether the certificate matches the statement.
//!
//! [`DigestAttestor`] is a deterministic binding over domain-separated
//! BLAKE2b-256.  It ties a statement to a key so that tampering with any
//! public field is detected; it is not a zero-knowledge proof.

use blake2::digest::{consts::U32, Digest as _};
use blake2::Blake2b;

/// 32-byte digest used for certificates and security-code commitments.
pub type Digest = [u8; 32];

/// Certificate attached to an attested statement.
pub type Certificate = Digest;

const ATTEST_DOMAIN: &[u8] = b"SPYMASTER_ATTEST";
const CODE_DOMAIN: &[u8] = b"SPYMASTER_CODE";
const DEFAULT_KEY: &[u8] = b"spymaster-local-attestation-key";

/// Produces and checks certificates over public statements.
pub trait Attestor {
    /// Returns the certificate binding `statement` under `domain`.
    fn attest(&self, domain: &[u8], statement: &[u8]) -> Certificate;

    /// Returns true if `certificate` was produced for this statement.
    fn verify(&self, domain: &[u8], statement: &[u8], certificate: &Certificate) -> bool {
        self.attest(domain, statement) == *certificate
    }
}

/// Keyed BLAKE2b binding attestor.
#[derive(Debug, Clone)]
pub struct DigestAttestor {
    key: Vec<u8>,
}

impl DigestAttestor {
    /// Creates an attestor bound to the provided key material.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Creates an attestor from hex-encoded key material.
    pub fn from_hex(key_hex: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self::new(hex::decode(key_hex)?))
    }
}

impl Default for DigestAttestor {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

impl Attestor for DigestAttestor {
    fn attest(&self, domain: &[u8], statement: &[u8]) -> Certificate {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(ATTEST_DOMAIN);
        hasher.update((self.key.len() as u64).to_le_bytes());
        hasher.update(&self.key);
        hasher.update((domain.len() as u64).to_le_bytes());
        hasher.update(domain);
        hasher.update(statement);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

impl<A: Attestor + ?Sized> Attestor for &A {
    fn attest(&self, domain: &[u8], statement: &[u8]) -> Certificate {
        (**self).attest(domain, statement)
    }
}

/// Collision-resistant hash used to commit to security codes.
pub trait HashOracle {
    /// Hashes a security code into its commitment.
    fn hash_code(&self, code: u64) -> Digest;
}

/// BLAKE2b-256 hash oracle with a fixed domain tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake2Oracle;

impl HashOracle for Blake2Oracle {
    fn hash_code(&self, code: u64) -> Digest {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(CODE_DOMAIN);
        hasher.update(code.to_le_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

/// Encodes little-endian `u64` words into a statement buffer.
pub fn encode_words(words: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 8);
    for word in words {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

/// Serde adapter storing a [`Digest`] as a lowercase hex string.
pub mod hex_digest {
    use super::Digest;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Serializes the digest as hex.
    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(digest))
    }

    /// Deserializes a 32-byte digest from hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(D::Error::custom)?;
        if bytes.len() != 32 {
            return Err(D::Error::custom("digest must be 32 bytes"));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificates_bind_statement_and_domain() {
        let attestor = DigestAttestor::default();
        let statement = encode_words(&[1, 2]);
        let cert = attestor.attest(b"fold", &statement);
        assert!(attestor.verify(b"fold", &statement, &cert));
        assert!(!attestor.verify(b"other", &statement, &cert));
        assert!(!attestor.verify(b"fold", &encode_words(&[1, 3]), &cert));
    }

    #[test]
    fn certificates_depend_on_key() {
        let statement = encode_words(&[7]);
        let a = DigestAttestor::new(b"alpha".to_vec()).attest(b"fold", &statement);
        let b = DigestAttestor::new(b"beta".to_vec()).attest(b"fold", &statement);
        assert_ne!(a, b);
    }

    #[test]
    fn hex_key_round_trips() {
        let attestor = DigestAttestor::from_hex("00ff10").unwrap();
        assert_eq!(attestor.key, vec![0x00, 0xff, 0x10]);
        assert!(DigestAttestor::from_hex("zz").is_err());
    }

    #[test]
    fn code_hashes_are_distinct() {
        let oracle = Blake2Oracle;
        assert_eq!(oracle.hash_code(12), oracle.hash_code(12));
        assert_ne!(oracle.hash_code(12), oracle.hash_code(13));
    }
}
