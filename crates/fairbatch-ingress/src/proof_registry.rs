//! Proof-of-work replay guard.
//!
//! Each (challenge, nonce) pair can be credited once, ever. Unlike a
//! bounded idempotency cache, nothing is evicted: an evicted proof could be
//! replayed, and the challenge already confines each proof to one batch.

use std::collections::HashSet;

use fairbatch_ordering::pow::proof_key;
use fairbatch_types::{FairbatchError, Result};

/// Records every consumed proof.
#[derive(Debug, Default)]
pub struct ProofRegistry {
    consumed: HashSet<[u8; 32]>,
}

impl ProofRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a proof as consumed.
    ///
    /// # Errors
    /// `ReplayedProof` if the pair was consumed before.
    pub fn consume(&mut self, challenge: &[u8; 32], nonce: &[u8; 32]) -> Result<()> {
        let key = proof_key(challenge, nonce);
        if !self.consumed.insert(key) {
            return Err(FairbatchError::ReplayedProof {
                proof_hex: hex::encode(key),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_consumed(&self, challenge: &[u8; 32], nonce: &[u8; 32]) -> bool {
        self.consumed.contains(&proof_key(challenge, nonce))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
