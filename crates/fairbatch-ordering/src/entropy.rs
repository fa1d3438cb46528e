//! Shuffle-seed entropy.
//!
//! Two ingredients go into a batch's seed:
//!
//! 1. The XOR of every revealed secret. No single revealer controls it, but
//!    the *last* revealer knows all the others and could grind their own
//!    secret to steer the result.
//! 2. External randomness sampled after the reveal window closed. This is
//!    what takes the grinding lever away from the last revealer.
//!
//! The preferred external sample is the hash of the anchor block recorded
//! when the batch entered SETTLING. If settlement runs before that block
//! exists, the seed falls back to the previous block hash, the wall clock,
//! and the randomness beacon if one is available. The fallback is weaker:
//! a settler who can time the call can predict its inputs. That window is
//! known and kept as-is.

use fairbatch_types::{BatchId, EntropyKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// External randomness available at settlement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntropySample {
    /// The anchor block has been produced.
    Anchored {
        anchor_block: u64,
        block_hash: [u8; 32],
    },
    /// The anchor block is still in the future.
    Fallback {
        previous_block_hash: [u8; 32],
        timestamp_ms: i64,
        beacon: Option<[u8; 32]>,
    },
}

impl EntropySample {
    #[must_use]
    pub fn kind(&self) -> EntropyKind {
        match self {
            Self::Anchored { .. } => EntropyKind::Anchored,
            Self::Fallback { .. } => EntropyKind::Fallback,
        }
    }
}

/// A derived seed plus the branch it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedDerivation {
    pub seed: [u8; 32],
    pub kind: EntropyKind,
}

/// Accumulates revealed secrets for the current batch.
#[derive(Debug, Clone, Default)]
pub struct EntropySource {
    accumulator: [u8; 32],
    contributions: usize,
}

impl EntropySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// XOR a revealed secret into the accumulator.
    pub fn contribute(&mut self, secret: &[u8; 32]) {
        for (acc, byte) in self.accumulator.iter_mut().zip(secret) {
            *acc ^= byte;
        }
        self.contributions += 1;
    }

    /// Current XOR of all contributed secrets.
    #[must_use]
    pub fn accumulator(&self) -> [u8; 32] {
        self.accumulator
    }

    /// Number of secrets contributed.
    #[must_use]
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Clear for the next batch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Combine the accumulated secrets with an external sample.
    ///
    /// `SHA-256(domain_sep || batch_id || xor || sample...)`
    #[must_use]
    pub fn derive_seed(&self, batch_id: BatchId, sample: &EntropySample) -> SeedDerivation {
        let mut hasher = Sha256::new();
        match sample {
            EntropySample::Anchored {
                anchor_block,
                block_hash,
            } => {
                hasher.update(b"fairbatch:seed:anchored:v1:");
                hasher.update(batch_id.0.to_le_bytes());
                hasher.update(self.accumulator);
                hasher.update(anchor_block.to_le_bytes());
                hasher.update(block_hash);
            }
            EntropySample::Fallback {
                previous_block_hash,
                timestamp_ms,
                beacon,
            } => {
                hasher.update(b"fairbatch:seed:fallback:v1:");
                hasher.update(batch_id.0.to_le_bytes());
                hasher.update(self.accumulator);
                hasher.update(previous_block_hash);
                hasher.update(timestamp_ms.to_le_bytes());
                if let Some(beacon) = beacon {
                    hasher.update(beacon);
                }
            }
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&hasher.finalize());
        tracing::debug!(
            batch = batch_id.0,
            kind = %sample.kind(),
            contributions = self.contributions,
            seed = hex::encode(seed),
            "Shuffle seed derived"
        );
        SeedDerivation {
            seed,
            kind: sample.kind(),
        }
    }
}
