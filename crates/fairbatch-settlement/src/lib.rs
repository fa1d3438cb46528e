//! # fairbatch-settlement
//!
//! **Finality plane**: moving stake and priority value out of the engine.
//!
//! 1. **Collaborators**: sink, payout agent, liquidity venue, compliance gate
//! 2. **SlashExecutor**: refund-first slashing with rollback on refund failure
//! 3. **RecoveryLedger**: value parked when the sink refuses it
//! 4. **StakeConservation**: deposited == escrowed + refunded + routed + held
//!
//! Transfer failures never corrupt protocol state: they either roll the
//! commitment back or park the value, and the tracker proves nothing leaked.

pub mod collaborators;
pub mod conservation;
pub mod recovery;
pub mod slashing;

pub use collaborators::{ComplianceGate, LiquidityVenue, PayoutAgent, ValueSink};
pub use conservation::StakeConservation;
pub use recovery::{RecoveryKey, RecoveryLedger};
pub use slashing::{SlashExecutor, SlashLedgers, SlashReason, SlashReceipt, SlashSplit};
