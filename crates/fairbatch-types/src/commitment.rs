//! # Commitment: the sealed pledge to trade
//!
//! A commitment is an opaque hash plus a stake. The order behind the hash
//! stays hidden until the REVEAL phase.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐ commit ┌───────────┐  reveal ok   ┌──────────┐ withdraw ┌──────────┐
//!   │ NONE ├───────▶│ COMMITTED ├─────────────▶│ REVEALED ├─────────▶│ EXECUTED │
//!   └──────┘        └─────┬─────┘              └──────────┘          └──────────┘
//!                         │ bad reveal / unrevealed        ▲
//!                         ▼                                │
//!                   ┌──────────┐───────────────────────────┘
//!                   │ SLASHED  │
//!                   └────┬─────┘
//!                        │ refund transfer failed (rollback only)
//!                        ▼
//!                   COMMITTED
//! ```
//!
//! ## Value accounting
//!
//! At all times `stake == escrowed + refunded + slashed + held`. Escrowed
//! value is still inside the engine; the other three have left it (to the
//! depositor, to the sink, or parked in the recovery ledger).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, BatchId, CommitmentId, FairbatchError, ParticipantId, Result};

/// The lifecycle status of a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitmentStatus {
    /// No commitment recorded.
    None,
    /// Hash and stake accepted; awaiting reveal.
    Committed,
    /// Revealed with a matching hash.
    Revealed,
    /// Stake partially forfeited.
    Slashed,
    /// Final: stake returned or fully accounted for.
    Executed,
}

impl CommitmentStatus {
    /// Can a commitment move from this status to `target`?
    ///
    /// `Slashed → Committed` is only legal as the rollback of a slash whose
    /// refund leg failed; callers go through [`Commitment::rollback_slash`].
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::None, Self::Committed)
                | (Self::Committed, Self::Revealed | Self::Slashed)
                | (Self::Revealed | Self::Slashed, Self::Executed)
                | (Self::Slashed, Self::Committed)
        )
    }
}

impl std::fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Committed => write!(f, "COMMITTED"),
            Self::Revealed => write!(f, "REVEALED"),
            Self::Slashed => write!(f, "SLASHED"),
            Self::Executed => write!(f, "EXECUTED"),
        }
    }
}

/// A commitment record. Retained permanently for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitmentId,
    /// Opaque hash of (trader, order fields, secret).
    pub hash: [u8; 32],
    pub batch_id: BatchId,
    pub depositor: ParticipantId,
    /// Original stake deposited at commit.
    pub stake: Amount,
    pub status: CommitmentStatus,
    pub committed_at: DateTime<Utc>,
    /// Stake still held by the engine.
    pub escrowed: Amount,
    /// Stake returned to the depositor.
    pub refunded: Amount,
    /// Forfeited stake delivered to the sink.
    pub slashed: Amount,
    /// Forfeited stake parked in the recovery ledger after a failed routing.
    pub held: Amount,
}

impl Commitment {
    /// A freshly committed record with the full stake in escrow.
    #[must_use]
    pub fn new(
        id: CommitmentId,
        hash: [u8; 32],
        batch_id: BatchId,
        depositor: ParticipantId,
        stake: Amount,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            hash,
            batch_id,
            depositor,
            stake,
            status: CommitmentStatus::Committed,
            committed_at,
            escrowed: stake,
            refunded: 0,
            slashed: 0,
            held: 0,
        }
    }

    fn transition(&mut self, target: CommitmentStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(FairbatchError::InvalidCommitmentStatus {
                id: self.id,
                expected: expected_source(target),
                actual: self.status,
            });
        }
        self.status = target;
        Ok(())
    }

    /// COMMITTED → REVEALED.
    pub fn mark_revealed(&mut self) -> Result<()> {
        self.transition(CommitmentStatus::Revealed)
    }

    /// COMMITTED → SLASHED. Value legs are booked separately.
    pub fn mark_slashed(&mut self) -> Result<()> {
        self.transition(CommitmentStatus::Slashed)
    }

    /// SLASHED → COMMITTED, after the refund leg of a slash failed.
    ///
    /// # Errors
    /// Fails unless the commitment is SLASHED with its full stake still escrowed.
    pub fn rollback_slash(&mut self) -> Result<()> {
        if self.escrowed != self.stake {
            return Err(FairbatchError::ConservationViolation {
                reason: format!(
                    "rollback of {} with {} of {} escrowed",
                    self.id, self.escrowed, self.stake
                ),
            });
        }
        self.transition(CommitmentStatus::Committed)
    }

    /// {REVEALED, SLASHED} → EXECUTED.
    pub fn mark_executed(&mut self) -> Result<()> {
        self.transition(CommitmentStatus::Executed)
    }

    /// Move `amount` out of escrow as a refund to the depositor.
    pub fn book_refund(&mut self, amount: Amount) -> Result<()> {
        self.take_from_escrow(amount)?;
        self.refunded += amount;
        Ok(())
    }

    /// Move `amount` out of escrow as forfeit delivered to the sink.
    pub fn book_slash(&mut self, amount: Amount) -> Result<()> {
        self.take_from_escrow(amount)?;
        self.slashed += amount;
        Ok(())
    }

    /// Move `amount` out of escrow as forfeit parked for recovery.
    pub fn book_held(&mut self, amount: Amount) -> Result<()> {
        self.take_from_escrow(amount)?;
        self.held += amount;
        Ok(())
    }

    fn take_from_escrow(&mut self, amount: Amount) -> Result<()> {
        self.escrowed = self
            .escrowed
            .checked_sub(amount)
            .ok_or_else(|| FairbatchError::ConservationViolation {
                reason: format!(
                    "{} escrow {} cannot cover {amount}",
                    self.id, self.escrowed
                ),
            })?;
        Ok(())
    }

    /// `stake == escrowed + refunded + slashed + held`.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.escrowed
            .checked_add(self.refunded)
            .and_then(|v| v.checked_add(self.slashed))
            .and_then(|v| v.checked_add(self.held))
            == Some(self.stake)
    }
}

/// The status a commitment must hold to move into `target`, for error reports.
fn expected_source(target: CommitmentStatus) -> CommitmentStatus {
    match target {
        CommitmentStatus::Committed => CommitmentStatus::Slashed,
        CommitmentStatus::Revealed | CommitmentStatus::Slashed => CommitmentStatus::Committed,
        CommitmentStatus::Executed => CommitmentStatus::Revealed,
        CommitmentStatus::None => CommitmentStatus::None,
    }
}

/// Dummy commitment for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Commitment {
    pub fn dummy(batch_id: BatchId, stake: Amount) -> Self {
        let depositor = ParticipantId::new();
        let hash: [u8; 32] = rand::random();
        Self::new(
            CommitmentId::derive(depositor, &hash, batch_id, 0),
            hash,
            batch_id,
            depositor,
            stake,
            Utc::now(),
        )
    }
}
