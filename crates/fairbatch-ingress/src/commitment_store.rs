//! Commitment store: every commitment ever accepted, indexed by ID and batch.
//!
//! Records are never removed. Settled batches keep their commitments for
//! audit, withdrawal, and late slashing.

use std::collections::HashMap;

use fairbatch_types::{
    BatchId, Commitment, CommitmentId, FairbatchError, ParticipantId, Result, RevealedOrder,
};

/// Holds commitments and the orders revealed from them.
pub struct CommitmentStore {
    /// All commitments indexed by ID.
    commitments: HashMap<CommitmentId, Commitment>,
    /// Commitment IDs per batch, in insertion order.
    by_batch: HashMap<BatchId, Vec<CommitmentId>>,
    /// Revealed orders per batch, in reveal order.
    revealed: HashMap<BatchId, Vec<RevealedOrder>>,
    /// Commitments per (batch, participant).
    per_participant: HashMap<(BatchId, ParticipantId), usize>,
    /// Maximum commitments in one batch.
    max_per_batch: usize,
}

impl CommitmentStore {
    /// Create a store with the given per-batch capacity.
    #[must_use]
    pub fn with_capacity(max_per_batch: usize) -> Self {
        Self {
            commitments: HashMap::new(),
            by_batch: HashMap::new(),
            revealed: HashMap::new(),
            per_participant: HashMap::new(),
            max_per_batch,
        }
    }

    /// Insert a freshly committed record.
    ///
    /// # Errors
    /// - `DuplicateCommitment` if the ID is already present
    /// - `BatchFull` if the batch has reached capacity
    pub fn insert(&mut self, commitment: Commitment) -> Result<()> {
        if self.commitments.contains_key(&commitment.id) {
            return Err(FairbatchError::DuplicateCommitment(commitment.id));
        }
        let ids = self.by_batch.entry(commitment.batch_id).or_default();
        if ids.len() >= self.max_per_batch {
            return Err(FairbatchError::BatchFull(commitment.batch_id));
        }
        ids.push(commitment.id);
        *self
            .per_participant
            .entry((commitment.batch_id, commitment.depositor))
            .or_insert(0) += 1;
        self.commitments.insert(commitment.id, commitment);
        Ok(())
    }

    /// Look up a commitment.
    ///
    /// # Errors
    /// `UnknownCommitment` if absent.
    pub fn get(&self, id: &CommitmentId) -> Result<&Commitment> {
        self.commitments
            .get(id)
            .ok_or(FairbatchError::UnknownCommitment(*id))
    }

    /// Mutable lookup.
    ///
    /// # Errors
    /// `UnknownCommitment` if absent.
    pub fn get_mut(&mut self, id: &CommitmentId) -> Result<&mut Commitment> {
        self.commitments
            .get_mut(id)
            .ok_or(FairbatchError::UnknownCommitment(*id))
    }

    /// Number of commitments `participant` holds in `batch`.
    #[must_use]
    pub fn participant_count(&self, batch: BatchId, participant: ParticipantId) -> usize {
        self.per_participant
            .get(&(batch, participant))
            .copied()
            .unwrap_or(0)
    }

    /// Number of commitments in `batch`.
    #[must_use]
    pub fn batch_len(&self, batch: BatchId) -> usize {
        self.by_batch.get(&batch).map_or(0, Vec::len)
    }

    /// Reveal index the next revealed order in `batch` will receive.
    #[must_use]
    pub fn next_reveal_index(&self, batch: BatchId) -> usize {
        self.revealed.get(&batch).map_or(0, Vec::len)
    }

    /// Append a revealed order to its batch.
    pub fn record_reveal(&mut self, batch: BatchId, order: RevealedOrder) {
        self.revealed.entry(batch).or_default().push(order);
    }

    /// Revealed orders of `batch`, in reveal order.
    #[must_use]
    pub fn revealed(&self, batch: BatchId) -> &[RevealedOrder] {
        self.revealed.get(&batch).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every commitment held.
    pub fn iter(&self) -> impl Iterator<Item = &Commitment> {
        self.commitments.values()
    }

    /// Total commitments held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use fairbatch_types::constants::WAD;

    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut store = CommitmentStore::with_capacity(10);
        let c = Commitment::dummy(BatchId(1), WAD);
        let id = c.id;
        let owner = c.depositor;
        store.insert(c).unwrap();
        assert_eq!(store.get(&id).unwrap().stake, WAD);
        assert_eq!(store.batch_len(BatchId(1)), 1);
        assert_eq!(store.participant_count(BatchId(1), owner), 1);
        assert_eq!(store.participant_count(BatchId(2), owner), 0);
    }

    #[test]
    fn duplicate_rejected() {
        let mut store = CommitmentStore::with_capacity(10);
        let c = Commitment::dummy(BatchId(1), WAD);
        store.insert(c.clone()).unwrap();
        let err = store.insert(c).unwrap_err();
        assert!(matches!(err, FairbatchError::DuplicateCommitment(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn batch_capacity_enforced() {
        let mut store = CommitmentStore::with_capacity(2);
        store.insert(Commitment::dummy(BatchId(1), WAD)).unwrap();
        store.insert(Commitment::dummy(BatchId(1), WAD)).unwrap();
        let err = store.insert(Commitment::dummy(BatchId(1), WAD)).unwrap_err();
        assert!(matches!(err, FairbatchError::BatchFull(BatchId(1))));
        // Other batches are unaffected.
        store.insert(Commitment::dummy(BatchId(2), WAD)).unwrap();
    }

    #[test]
    fn unknown_lookup_fails() {
        let store = CommitmentStore::with_capacity(1);
        let err = store.get(&CommitmentId([0; 32])).unwrap_err();
        assert!(matches!(err, FairbatchError::UnknownCommitment(_)));
    }

    #[test]
    fn reveals_are_indexed_in_order() {
        let mut store = CommitmentStore::with_capacity(10);
        assert_eq!(store.next_reveal_index(BatchId(1)), 0);
        store.record_reveal(BatchId(1), RevealedOrder::dummy(0, 0));
        store.record_reveal(BatchId(1), RevealedOrder::dummy(1, 5));
        assert_eq!(store.next_reveal_index(BatchId(1)), 2);
        assert_eq!(store.revealed(BatchId(1))[1].priority_value, 5);
        assert!(store.revealed(BatchId(2)).is_empty());
    }
}
