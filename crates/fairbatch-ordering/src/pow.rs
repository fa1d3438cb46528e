//! Proof-of-work priority.
//!
//! A participant may buy priority with hashing instead of currency. The
//! challenge binds the proof to one participant, one batch, and one engine
//! instance, so a proof cannot be lifted into another context. Replay
//! within the same context is caught by the ingress proof registry, keyed
//! by [`proof_key`].

use fairbatch_types::{BatchId, FairbatchError, ParticipantId, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Hash function a proof was mined with. Both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowAlgorithm {
    Keccak256,
    Sha256,
}

/// A mined proof: the nonce and the hash it was found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWork {
    pub nonce: [u8; 32],
    pub algorithm: PowAlgorithm,
}

/// Challenge a proof must be mined against.
///
/// `SHA-256("fairbatch:pow_challenge:v1:" || participant || batch || domain || instance)`
#[must_use]
pub fn challenge(
    participant: ParticipantId,
    batch_id: BatchId,
    domain_id: u32,
    instance_tag: &str,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"fairbatch:pow_challenge:v1:");
    hasher.update(participant.as_bytes());
    hasher.update(batch_id.0.to_le_bytes());
    hasher.update(domain_id.to_le_bytes());
    hasher.update((instance_tag.len() as u64).to_le_bytes());
    hasher.update(instance_tag.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// `H(challenge || nonce)` under the proof's algorithm.
#[must_use]
pub fn proof_hash(algorithm: PowAlgorithm, challenge: &[u8; 32], nonce: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    match algorithm {
        PowAlgorithm::Keccak256 => {
            let mut hasher = Keccak256::new();
            hasher.update(challenge);
            hasher.update(nonce);
            out.copy_from_slice(&hasher.finalize());
        }
        PowAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(challenge);
            hasher.update(nonce);
            out.copy_from_slice(&hasher.finalize());
        }
    }
    out
}

/// Replay-registry key for a proof.
///
/// Independent of the algorithm: the same nonce cannot be spent once under
/// each hash.
#[must_use]
pub fn proof_key(challenge: &[u8; 32], nonce: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"fairbatch:pow_key:v1:");
    hasher.update(challenge);
    hasher.update(nonce);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Count of leading zero bits in a hash.
#[must_use]
pub fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut bits = 0;
    for byte in hash {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// Verify `proof` meets `claimed_difficulty` leading zero bits.
///
/// Returns the difficulty actually achieved, which may exceed the claim.
/// Only the claim is credited.
pub fn verify(challenge: &[u8; 32], proof: &ProofOfWork, claimed_difficulty: u8) -> Result<u32> {
    let hash = proof_hash(proof.algorithm, challenge, &proof.nonce);
    let achieved = leading_zero_bits(&hash);
    if achieved < u32::from(claimed_difficulty) {
        tracing::debug!(
            claimed = claimed_difficulty,
            achieved,
            algorithm = ?proof.algorithm,
            "Proof-of-work below claimed difficulty"
        );
        return Err(FairbatchError::InvalidProof {
            claimed: claimed_difficulty,
            achieved,
        });
    }
    Ok(achieved)
}

/// Brute-force a nonce meeting `difficulty`. Client-side helper.
///
/// Nonces are a little-endian counter, so the search is deterministic.
/// Gives up after `max_attempts`.
#[must_use]
pub fn mine(
    algorithm: PowAlgorithm,
    challenge: &[u8; 32],
    difficulty: u8,
    max_attempts: u64,
) -> Option<ProofOfWork> {
    let target = u32::from(difficulty);
    (0..max_attempts).find_map(|counter| {
        let mut nonce = [0u8; 32];
        nonce[..8].copy_from_slice(&counter.to_le_bytes());
        (leading_zero_bits(&proof_hash(algorithm, challenge, &nonce)) >= target)
            .then_some(ProofOfWork { nonce, algorithm })
    })
}
