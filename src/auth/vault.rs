//! Password hashing.
//!
//! Iterated, salted SHA-256 with constant-time comparison. The exact KDF
//! is an implementation detail of this module; callers only see opaque hex
//! digests.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone)]
pub struct Vault {
    salt: String,
    rounds: u32,
}

impl Vault {
    pub fn new(salt: impl Into<String>, rounds: u32) -> Self {
        Self {
            salt: salt.into(),
            rounds: rounds.max(1),
        }
    }

    /// Derive the stored digest for a password.
    pub fn hash(&self, password: &str) -> String {
        let mut digest = Sha256::new()
            .chain_update(self.salt.as_bytes())
            .chain_update(password.as_bytes())
            .finalize();

        for _ in 1..self.rounds {
            digest = Sha256::new()
                .chain_update(self.salt.as_bytes())
                .chain_update(digest)
                .finalize();
        }

        hex::encode(digest)
    }

    /// Compare a candidate password against a stored digest in constant
    /// time.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let candidate = self.hash(password);
        candidate.as_bytes().ct_eq(stored.as_bytes()).into()
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::new("", 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let vault = Vault::new("pepper", 100);
        assert_eq!(vault.hash("hunter2"), vault.hash("hunter2"));
    }

    #[test]
    fn test_salt_changes_digest() {
        let a = Vault::new("salt-a", 100);
        let b = Vault::new("salt-b", 100);
        assert_ne!(a.hash("hunter2"), b.hash("hunter2"));
    }

    #[test]
    fn test_verify_round_trip() {
        let vault = Vault::new("pepper", 100);
        let stored = vault.hash("S3cure-pass");
        assert!(vault.verify("S3cure-pass", &stored));
        assert!(!vault.verify("s3cure-pass", &stored));
        assert!(!vault.verify("", &stored));
    }
}
