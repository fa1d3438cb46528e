//! Audit events emitted by the engine.
//!
//! Every phase change, commitment transition and value movement is appended
//! to the engine's event buffer. Hosts drain it with `drain_events()` and
//! forward it wherever they keep an audit trail.

use fairbatch_settlement::{RecoveryKey, SlashReceipt};
use fairbatch_types::{
    Amount, BatchId, BatchPhase, CommitmentId, DomainId, EntropyKind, ParticipantId, Price,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEvent {
    PhaseChanged {
        batch: BatchId,
        from: BatchPhase,
        to: BatchPhase,
        /// Set on the transition into SETTLING.
        anchor_block: Option<u64>,
    },
    Committed {
        batch: BatchId,
        commitment: CommitmentId,
        depositor: ParticipantId,
        stake: Amount,
    },
    Revealed {
        batch: BatchId,
        commitment: CommitmentId,
        reveal_index: usize,
        priority_value: Amount,
        origin_domain: DomainId,
    },
    Slashed {
        batch: BatchId,
        receipt: SlashReceipt,
    },
    /// A best-effort overpayment refund failed. Not retried.
    RefundFailed {
        participant: ParticipantId,
        amount: Amount,
    },
    Settled {
        batch: BatchId,
        orders: usize,
        priority_orders: usize,
        total_priority_value: Amount,
        clearing_price: Option<Price>,
        entropy: EntropyKind,
        execution_root: String,
    },
    BatchOpened {
        batch: BatchId,
    },
    Withdrawn {
        commitment: CommitmentId,
        depositor: ParticipantId,
        amount: Amount,
    },
    FundsHeld {
        key: RecoveryKey,
        amount: Amount,
    },
    HeldFundsReleased {
        key: RecoveryKey,
        amount: Amount,
    },
}

impl EngineEvent {
    /// One-line JSON rendering for log shipping.
    pub fn to_json(&self) -> fairbatch_types::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
