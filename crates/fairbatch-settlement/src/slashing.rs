//! Slashing: forfeiting part of a stake after an invalid or missing reveal.
//!
//! A slash has two legs:
//! 1. Refund the non-forfeited remainder to the depositor
//! 2. Route the forfeit to the sink
//!
//! The refund is attempted first. If it fails the commitment goes back to
//! COMMITTED with nothing moved, so the depositor can retry. Once the refund
//! lands the slash is final: a failed forfeit leg only parks the value in
//! the recovery ledger.

use fairbatch_types::{
    Amount, Commitment, CommitmentId, ParticipantId, Result, fixed::bps_of,
};
use serde::{Deserialize, Serialize};

use crate::{
    collaborators::{PayoutAgent, ValueSink},
    conservation::StakeConservation,
    recovery::{RecoveryKey, RecoveryLedger},
};

/// How a stake divides on slash. `slashed + refunded == stake` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashSplit {
    pub slashed: Amount,
    pub refunded: Amount,
}

impl SlashSplit {
    /// Forfeit `floor(stake * rate_bps / 10_000)`; the rest is refunded.
    pub fn compute(stake: Amount, rate_bps: u16) -> Result<Self> {
        let slashed = bps_of(stake, rate_bps)?.min(stake);
        Ok(Self {
            slashed,
            refunded: stake - slashed,
        })
    }
}

/// Why a commitment was slashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashReason {
    /// Revealed fields did not hash to the commitment.
    InvalidReveal,
    /// Never revealed before its batch settled.
    Unrevealed,
}

impl std::fmt::Display for SlashReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidReveal => write!(f, "INVALID_REVEAL"),
            Self::Unrevealed => write!(f, "UNREVEALED"),
        }
    }
}

/// Outcome of a slash attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashReceipt {
    pub commitment_id: CommitmentId,
    pub depositor: ParticipantId,
    pub reason: SlashReason,
    pub stake: Amount,
    /// Forfeit delivered to the sink.
    pub slashed: Amount,
    /// Remainder returned to the depositor.
    pub refunded: Amount,
    /// Forfeit parked because the sink refused it.
    pub held: Amount,
    /// The refund failed and the commitment is COMMITTED again.
    pub rolled_back: bool,
}

/// Applies slashes at a fixed protocol-wide rate.
#[derive(Debug, Clone, Copy)]
pub struct SlashExecutor {
    rate_bps: u16,
}

/// Ledgers a slash writes to.
pub struct SlashLedgers<'a> {
    pub recovery: &'a mut RecoveryLedger,
    pub conservation: &'a mut StakeConservation,
}

impl SlashExecutor {
    #[must_use]
    pub fn new(rate_bps: u16) -> Self {
        Self { rate_bps }
    }

    #[must_use]
    pub fn rate_bps(&self) -> u16 {
        self.rate_bps
    }

    /// Slash a COMMITTED commitment.
    ///
    /// # Errors
    /// Only structural errors (wrong status, broken arithmetic). Transfer
    /// failures are absorbed into the receipt.
    pub fn execute(
        &self,
        commitment: &mut Commitment,
        reason: SlashReason,
        payout: &dyn PayoutAgent,
        sink: &dyn ValueSink,
        ledgers: SlashLedgers<'_>,
    ) -> Result<SlashReceipt> {
        let split = SlashSplit::compute(commitment.stake, self.rate_bps)?;
        commitment.mark_slashed()?;

        let mut receipt = SlashReceipt {
            commitment_id: commitment.id,
            depositor: commitment.depositor,
            reason,
            stake: commitment.stake,
            slashed: 0,
            refunded: 0,
            held: 0,
            rolled_back: false,
        };

        if split.refunded > 0 {
            if let Err(e) = payout.transfer(commitment.depositor, split.refunded) {
                commitment.rollback_slash()?;
                tracing::warn!(
                    commitment = %commitment.id,
                    depositor = %commitment.depositor,
                    error = %e,
                    "Slash refund failed, commitment rolled back"
                );
                receipt.rolled_back = true;
                return Ok(receipt);
            }
            commitment.book_refund(split.refunded)?;
            ledgers.conservation.record_refund(split.refunded)?;
            receipt.refunded = split.refunded;
        }

        if split.slashed > 0 {
            match sink.route_slash(commitment.depositor, split.slashed) {
                Ok(()) => {
                    commitment.book_slash(split.slashed)?;
                    ledgers.conservation.record_routed(split.slashed)?;
                    receipt.slashed = split.slashed;
                }
                Err(e) => {
                    tracing::warn!(
                        commitment = %commitment.id,
                        error = %e,
                        "Slash routing failed, holding forfeit"
                    );
                    commitment.book_held(split.slashed)?;
                    ledgers
                        .recovery
                        .hold(RecoveryKey::Depositor(commitment.depositor), split.slashed)?;
                    ledgers.conservation.record_held(split.slashed)?;
                    receipt.held = split.slashed;
                }
            }
        }

        tracing::warn!(
            commitment = %commitment.id,
            depositor = %commitment.depositor,
            reason = %reason,
            slashed = %fairbatch_types::fixed::from_wad(receipt.slashed),
            refunded = %fairbatch_types::fixed::from_wad(receipt.refunded),
            held = %fairbatch_types::fixed::from_wad(receipt.held),
            "Commitment slashed"
        );
        Ok(receipt)
    }
}
