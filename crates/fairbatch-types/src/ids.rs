//! Identifiers used throughout FairBatch.
//!
//! Participants use UUIDv7 for time-ordered sorting. Commitment IDs are not
//! allocated from a counter: they are derived from the commit inputs so any
//! observer can recompute them.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// Identity of a trader, depositor or any other caller of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Monotonically increasing batch identifier. Never reused.
///
/// Each batch runs: COMMIT → REVEAL → SETTLING → SETTLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    /// The first batch opened by a fresh engine.
    pub const GENESIS: Self = Self(1);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CommitmentId
// ---------------------------------------------------------------------------

/// Identifier of a commitment, derived from the commit inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CommitmentId(pub [u8; 32]);

impl CommitmentId {
    /// Deterministic commitment ID.
    ///
    /// `SHA-256("fairbatch:commitment_id:v1:" || caller || hash || batch_id || submitted_at_ms)`
    ///
    /// The same caller committing the same hash twice within one millisecond
    /// of the same batch derives the same ID; the store rejects the second.
    #[must_use]
    pub fn derive(
        caller: ParticipantId,
        commit_hash: &[u8; 32],
        batch_id: BatchId,
        submitted_at_ms: i64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"fairbatch:commitment_id:v1:");
        hasher.update(caller.as_bytes());
        hasher.update(commit_hash);
        hasher.update(batch_id.0.to_le_bytes());
        hasher.update(submitted_at_ms.to_le_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&hasher.finalize());
        Self(id)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four bytes as hex, for compact log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cm:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// DomainId
// ---------------------------------------------------------------------------

/// Origin domain of a reveal (local engine or a remote chain bridged by a relay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DomainId(pub u32);

impl DomainId {
    /// Submissions made directly against this engine.
    pub const LOCAL: Self = Self(0);

    #[must_use]
    pub fn is_local(self) -> bool {
        self == Self::LOCAL
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MarketPair
// ---------------------------------------------------------------------------

/// The trading pair a batch auction clears (e.g., ETH/USDC).
///
/// Prices are quoted as units of `quote` per unit of `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketPair {
    pub base: String,
    pub quote: String,
}

impl MarketPair {
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
