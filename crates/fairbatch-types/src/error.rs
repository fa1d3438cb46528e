//! Error types for the FairBatch auction engine.
//!
//! All errors use the `FB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Phase errors
//! - 2xx: Commitment errors
//! - 3xx: Stake / payment errors
//! - 4xx: Proof-of-work errors
//! - 5xx: Settlement errors
//! - 6xx: Transfer errors
//! - 7xx: Relay / access-control errors
//! - 8xx: Invariant errors
//! - 9xx: General / internal errors
//!
//! An invalid reveal is deliberately absent: a hash mismatch is a
//! successful call with a slashed outcome, not an error.

use thiserror::Error;

use crate::{BatchId, BatchPhase, CommitmentId, CommitmentStatus};

/// Central error enum for all FairBatch operations.
#[derive(Debug, Error)]
pub enum FairbatchError {
    // =================================================================
    // Phase Errors (1xx)
    // =================================================================
    /// An operation was attempted in the wrong batch phase.
    #[error("FB_ERR_100: Wrong batch phase: expected {expected}, got {actual}")]
    WrongPhase {
        expected: BatchPhase,
        actual: BatchPhase,
    },

    // =================================================================
    // Commitment Errors (2xx)
    // =================================================================
    /// No commitment with this ID exists.
    #[error("FB_ERR_200: Commitment not found: {0}")]
    UnknownCommitment(CommitmentId),

    /// A commitment with this ID already exists.
    #[error("FB_ERR_201: Commitment already exists: {0}")]
    DuplicateCommitment(CommitmentId),

    /// The commitment belongs to a different batch than the one addressed.
    #[error("FB_ERR_202: Commitment {id} belongs to {owner}, not {current}")]
    WrongBatch {
        id: CommitmentId,
        owner: BatchId,
        current: BatchId,
    },

    /// The caller is not the depositor of this commitment.
    #[error("FB_ERR_203: Caller does not own commitment {0}")]
    NotCommitmentOwner(CommitmentId),

    /// The commitment is not in the status this operation requires.
    #[error("FB_ERR_204: Commitment {id} is {actual}, expected {expected}")]
    InvalidCommitmentStatus {
        id: CommitmentId,
        expected: CommitmentStatus,
        actual: CommitmentStatus,
    },

    /// The batch already holds the maximum number of commitments.
    #[error("FB_ERR_205: Batch {0} is full")]
    BatchFull(BatchId),

    /// The participant reached the per-batch commitment cap.
    #[error("FB_ERR_206: Commit limit exceeded: {count} commitments in {batch}")]
    CommitLimitExceeded { batch: BatchId, count: usize },

    /// The commitment hash is all zeroes.
    #[error("FB_ERR_207: Empty commitment hash")]
    EmptyCommitmentHash,

    // =================================================================
    // Stake / Payment Errors (3xx)
    // =================================================================
    /// Stake below the greater of the flat floor and the collateral share.
    #[error("FB_ERR_300: Insufficient stake: need {required}, got {provided}")]
    InsufficientStake { required: u128, provided: u128 },

    /// Value attached to a reveal does not cover the stated priority bid.
    #[error("FB_ERR_301: Insufficient payment: bid {bid}, paid {paid}")]
    InsufficientPayment { bid: u128, paid: u128 },

    // =================================================================
    // Proof-of-Work Errors (4xx)
    // =================================================================
    /// The (challenge, nonce) pair was already consumed.
    #[error("FB_ERR_400: Proof-of-work replayed: {proof_hex}")]
    ReplayedProof { proof_hex: String },

    /// The proof does not reach its claimed difficulty.
    #[error("FB_ERR_401: Invalid proof: claimed {claimed} bits, achieved {achieved}")]
    InvalidProof { claimed: u8, achieved: u32 },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// Settlement attempted before the reveal phase closed.
    #[error("FB_ERR_500: Batch {batch} not ready to settle (phase {phase})")]
    NotReady { batch: BatchId, phase: BatchPhase },

    /// The batch was already settled.
    #[error("FB_ERR_501: Batch already settled: {0}")]
    AlreadySettled(BatchId),

    /// The venue reported reserves the solver cannot price against.
    #[error("FB_ERR_502: Invalid venue reserves: {reason}")]
    InvalidReserves { reason: String },

    /// The liquidity venue failed to quote or execute.
    #[error("FB_ERR_503: Venue failure: {reason}")]
    VenueFailure { reason: String },

    /// The referenced batch does not exist.
    #[error("FB_ERR_504: Batch not found: {0}")]
    UnknownBatch(BatchId),

    // =================================================================
    // Transfer Errors (6xx)
    // =================================================================
    /// A value transfer to a depositor or sink failed.
    #[error("FB_ERR_600: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// Nothing is held for the requested recovery key.
    #[error("FB_ERR_601: No held funds for {key}")]
    NothingHeld { key: String },

    // =================================================================
    // Relay / Access-Control Errors (7xx)
    // =================================================================
    /// The relay key is not on the authorized list.
    #[error("FB_ERR_700: Unauthorized relay: {relay_hex}")]
    UnauthorizedRelay { relay_hex: String },

    /// The relay attestation signature did not verify.
    #[error("FB_ERR_701: Relay signature verification failed")]
    InvalidRelaySignature,

    /// The compliance provider refused the participant.
    #[error("FB_ERR_702: Compliance rejected: {reason}")]
    ComplianceRejected { reason: String },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Stake conservation invariant violated. Critical safety alert.
    #[error("FB_ERR_800: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    /// Fixed-point arithmetic overflowed.
    #[error("FB_ERR_801: Arithmetic overflow in {context}")]
    Overflow { context: &'static str },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("FB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("FB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid values, unparsable file, etc.).
    #[error("FB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, FairbatchError>;

impl From<serde_json::Error> for FairbatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
