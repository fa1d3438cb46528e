//! # fairbatch-engine
//!
//! The **FairBatch** commit-reveal batch auction.
//!
//! - [`AuctionEngine`]: phase state machine, commits, reveals, slashing, settlement
//! - [`SharedEngine`]: lock-serialized handle for multi-threaded hosts
//! - [`LogicalClock`]: time, block sequence and beacon the engine observes
//! - [`EngineEvent`]: audit trail drained by the host
//! - [`telemetry`]: tracing subscriber setup
//!
//! ## Batch lifecycle
//!
//! ```text
//! COMMIT ──▶ REVEAL ──▶ SETTLING ──settle()──▶ SETTLED
//!   ▲                                             │
//!   └──────────────── next batch ─────────────────┘
//! ```
//!
//! Orders are hidden behind `SHA-256(trader || fields || secret)` while the
//! batch collects them. After reveal, priority bidders execute first in bid
//! order and everyone else in a Fisher-Yates shuffle seeded by the XOR of
//! all revealed secrets and a block hash nobody knew during REVEAL.

pub mod clock;
pub mod engine;
pub mod events;
pub mod shared;
pub mod telemetry;

pub use clock::{LogicalClock, ManualClock};
pub use engine::{AuctionEngine, Collaborators, RevealOutcome, RevealRequest};
pub use events::EngineEvent;
pub use shared::SharedEngine;
pub use telemetry::init_tracing;
