//! Determinism verification for settlements.
//!
//! Anyone holding the revealed orders, the seed, and the resulting order
//! can recompute the execution root and confirm the settlement was not
//! reordered after the fact.

use fairbatch_types::{BatchId, ExecutionOrder, RevealedOrder};
use sha2::{Digest, Sha256};

use crate::orderer::compute_execution_order;

/// Hash over the batch, its seed, and the commitment IDs in execution order.
///
/// Indices outside `orders` are hashed as their raw position so a corrupt
/// order still yields a (non-matching) root instead of panicking.
#[must_use]
pub fn compute_execution_root(
    batch_id: BatchId,
    seed: &[u8; 32],
    order: &ExecutionOrder,
    orders: &[RevealedOrder],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"fairbatch:execution_root:v1:");
    hasher.update(batch_id.0.to_le_bytes());
    hasher.update(seed);
    hasher.update((order.len() as u64).to_le_bytes());
    hasher.update((order.priority_count as u64).to_le_bytes());
    for &idx in &order.indices {
        match orders.get(idx) {
            Some(o) => {
                hasher.update(o.commitment_id.as_bytes());
                hasher.update(o.priority_value.to_le_bytes());
            }
            None => hasher.update((idx as u64).to_le_bytes()),
        }
    }
    let mut root = [0u8; 32];
    root.copy_from_slice(&hasher.finalize());
    root
}

/// Recompute the order from `seed` and check it hashes to `expected_root`.
#[must_use]
pub fn verify_execution_root(
    batch_id: BatchId,
    seed: &[u8; 32],
    orders: &[RevealedOrder],
    expected_root: &[u8; 32],
) -> bool {
    let order = compute_execution_order(orders, seed);
    compute_execution_root(batch_id, seed, &order, orders) == *expected_root
}
