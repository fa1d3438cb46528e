//! # fairbatch-ordering
//!
//! **Pure deterministic ordering for FairBatch.**
//!
//! The compute plane of a settlement: given revealed orders and external
//! entropy, it produces the execution order and clearing price. It has
//!
//! - **Zero side effects**: no stake, no transfers, no clock
//! - **Deterministic output**: same reveals and entropy, same order on every node
//! - **Two priority currencies**: bids and proof-of-work, valued on one scale

pub mod clearing;
pub mod determinism;
pub mod entropy;
pub mod orderer;
pub mod pow;
pub mod priority;
pub mod shuffle;

pub use clearing::{aggregate_pressure, compute_clearing_price};
pub use determinism::{compute_execution_root, verify_execution_root};
pub use entropy::{EntropySample, EntropySource, SeedDerivation};
pub use orderer::compute_execution_order;
pub use pow::{PowAlgorithm, ProofOfWork};
pub use priority::PriorityValuation;
pub use shuffle::shuffle_indices;
