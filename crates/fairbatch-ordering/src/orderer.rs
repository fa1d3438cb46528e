//! Execution ordering for a settled batch.
//!
//! Priority orders go first, highest value first; equal values keep reveal
//! order. Everything else follows in a seeded shuffle, so position among
//! regular orders is not something a participant can buy or race for.

use fairbatch_types::{ExecutionOrder, RevealedOrder};

use crate::shuffle::shuffle_indices;

/// Compute the execution order over `orders` (indexed by position).
#[must_use]
pub fn compute_execution_order(orders: &[RevealedOrder], seed: &[u8; 32]) -> ExecutionOrder {
    let mut priority: Vec<usize> = Vec::new();
    let mut regular: Vec<usize> = Vec::new();
    for (idx, order) in orders.iter().enumerate() {
        if order.priority_value > 0 {
            priority.push(idx);
        } else {
            regular.push(idx);
        }
    }

    priority.sort_by(|&a, &b| {
        orders[b]
            .priority_value
            .cmp(&orders[a].priority_value)
            .then_with(|| orders[a].reveal_index.cmp(&orders[b].reveal_index))
    });

    let priority_count = priority.len();
    let mut indices = priority;
    indices.extend(shuffle_indices(seed, regular.len()).into_iter().map(|k| regular[k]));

    tracing::debug!(
        total = indices.len(),
        priority = priority_count,
        "Execution order computed"
    );

    ExecutionOrder {
        indices,
        priority_count,
    }
}
