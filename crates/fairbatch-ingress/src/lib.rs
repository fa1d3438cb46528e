//! # fairbatch-ingress
//!
//! **Ingress plane**: everything a commit or reveal passes through before
//! it touches batch state.
//!
//! 1. **StakePolicy**: stake floor, collateral share, per-participant quota
//! 2. **CommitmentStore**: commitments and revealed orders, never deleted
//! 3. **ProofRegistry**: proof-of-work replay guard
//! 4. **RelayRegistry**: authorized cross-domain relays and their attestations
//!
//! ```text
//! commit → StakePolicy → CommitmentStore.insert()
//! reveal → [RelayRegistry.verify()] → [ProofRegistry.consume()] → CommitmentStore.record_reveal()
//! ```

pub mod commitment_store;
pub mod proof_registry;
pub mod relay;
pub mod stake_policy;

pub use commitment_store::CommitmentStore;
pub use proof_registry::ProofRegistry;
pub use relay::{RelayAttestation, RelayRegistry};
pub use stake_policy::StakePolicy;
