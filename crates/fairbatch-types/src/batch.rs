//! Batch lifecycle types for the FairBatch commit-reveal auction.
//!
//! Each batch cycles through four phases:
//! **COMMIT → REVEAL → SETTLING → SETTLED**
//!
//! During COMMIT, participants submit hashed orders plus stake.
//! During REVEAL, they disclose the orders behind their hashes.
//! SETTLING begins when the reveal window closes; the batch waits there
//! until someone calls `settle`. SETTLED is terminal for that batch ID and
//! the engine immediately opens the next batch in COMMIT.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, BatchId, ClearingResult, FillResult};

/// The four phases of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum BatchPhase {
    /// Accepting hashed commitments.
    Commit,
    /// Accepting reveals of committed orders.
    Reveal,
    /// Reveal window closed; waiting for settlement.
    Settling,
    /// Settled. Terminal for this batch ID.
    Settled,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "COMMIT"),
            Self::Reveal => write!(f, "REVEAL"),
            Self::Settling => write!(f, "SETTLING"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionOrder
// ---------------------------------------------------------------------------

/// Final execution sequence: indices into the batch's revealed-order list.
///
/// Priority orders come first, followed by the shuffled regular orders.
/// Computed once at settlement and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionOrder {
    /// Revealed-order indices in execution order.
    pub indices: Vec<usize>,
    /// How many leading entries came from the priority partition.
    pub priority_count: usize,
}

impl ExecutionOrder {
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The priority partition.
    #[must_use]
    pub fn priority(&self) -> &[usize] {
        &self.indices[..self.priority_count]
    }

    /// The shuffled regular partition.
    #[must_use]
    pub fn regular(&self) -> &[usize] {
        &self.indices[self.priority_count..]
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// One round of the auction.
///
/// Only the engine mutates a batch. Settled batches stay in the engine's
/// history forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    /// Start of the COMMIT phase; all phase boundaries derive from this.
    pub started_at: DateTime<Utc>,
    /// Last phase observed by `advance_phase`. A cache, never authoritative.
    pub phase: BatchPhase,
    /// Shuffle seed, set once at settlement.
    pub shuffle_seed: Option<[u8; 32]>,
    /// Sum of positive combined priority values of revealed orders.
    pub total_priority_value: Amount,
    /// Currency bids paid with reveals. Routed to the sink at settlement.
    pub priority_collected: Amount,
    /// Commitments accepted into this batch.
    pub commitment_count: usize,
    /// Commitments revealed with a matching hash.
    pub reveal_count: usize,
    /// Block whose hash anchors the shuffle seed. Recorded on entering SETTLING.
    pub entropy_anchor_block: Option<u64>,
    pub settled: bool,
    /// Present once settled.
    pub settlement: Option<SettlementReport>,
}

impl Batch {
    /// Open a fresh batch in the COMMIT phase.
    #[must_use]
    pub fn open(id: BatchId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            phase: BatchPhase::Commit,
            shuffle_seed: None,
            total_priority_value: 0,
            priority_collected: 0,
            commitment_count: 0,
            reveal_count: 0,
            entropy_anchor_block: None,
            settled: false,
            settlement: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SettlementReport
// ---------------------------------------------------------------------------

/// Where the shuffle seed's external entropy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntropyKind {
    /// Hash of the anchor block recorded on entering SETTLING.
    Anchored,
    /// Anchor not yet produced: previous block hash, timestamp and beacon.
    Fallback,
}

impl fmt::Display for EntropyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anchored => write!(f, "ANCHORED"),
            Self::Fallback => write!(f, "FALLBACK"),
        }
    }
}

/// Everything `settle` produces for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub batch_id: BatchId,
    pub execution_order: ExecutionOrder,
    /// Uniform price and fillable volume, if a venue was consulted.
    pub clearing: Option<ClearingResult>,
    pub total_priority_value: Amount,
    /// Currency bids collected by the batch.
    pub priority_collected: Amount,
    /// Whether routing the collected bids failed and they were parked.
    pub priority_held: bool,
    pub shuffle_seed: [u8; 32],
    pub entropy: EntropyKind,
    /// SHA-256 over (batch, seed, execution order) for independent checks.
    pub execution_root: [u8; 32],
    /// Venue fill results in execution order.
    pub fills: Vec<FillResult>,
    pub settled_at: DateTime<Utc>,
}
