//! Thread-safe handle over one engine.
//!
//! Every call takes the lock for its whole duration, so operations on the
//! engine are linearizable: a commit and a settle racing on two threads see
//! each other entirely or not at all.

use std::sync::Arc;

use fairbatch_types::{Amount, BatchPhase, CommitmentId, ParticipantId, Result, SettlementReport};
use parking_lot::Mutex;

use crate::{
    clock::LogicalClock,
    engine::{AuctionEngine, RevealOutcome, RevealRequest},
    events::EngineEvent,
};

pub struct SharedEngine<C: LogicalClock> {
    inner: Arc<Mutex<AuctionEngine<C>>>,
}

impl<C: LogicalClock> Clone for SharedEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: LogicalClock> SharedEngine<C> {
    #[must_use]
    pub fn new(engine: AuctionEngine<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut AuctionEngine<C>) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }

    pub fn commit(
        &self,
        caller: ParticipantId,
        hash: [u8; 32],
        stake: Amount,
        estimated_value: Amount,
    ) -> Result<CommitmentId> {
        self.with(|e| e.commit(caller, hash, stake, estimated_value))
    }

    pub fn reveal(&self, caller: ParticipantId, request: RevealRequest) -> Result<RevealOutcome> {
        self.with(|e| e.reveal(caller, request))
    }

    pub fn settle(&self) -> Result<SettlementReport> {
        self.with(AuctionEngine::settle)
    }

    pub fn advance_phase(&self) -> BatchPhase {
        self.with(AuctionEngine::advance_phase)
    }

    #[must_use]
    pub fn current_phase(&self) -> BatchPhase {
        self.inner.lock().current_phase()
    }

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.with(AuctionEngine::drain_events)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::Utc;
    use fairbatch_settlement::collaborators::memory::{MemoryPayout, MemorySink};
    use fairbatch_types::{AuctionConfig, constants::WAD};

    use super::*;
    use crate::{clock::ManualClock, engine::Collaborators};

    #[test]
    fn concurrent_commits_all_land() {
        let clock = ManualClock::new(Utc::now(), [3; 32]);
        let engine = AuctionEngine::new(
            AuctionConfig::default(),
            clock.clone(),
            Collaborators::new(MemoryPayout::new(), MemorySink::new()),
        )
        .unwrap();
        let shared = SharedEngine::new(engine);

        let handles: Vec<_> = (0u8..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared
                        .commit(ParticipantId::new(), [i + 1; 32], WAD / 100, 0)
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.with(|e| e.current_batch().commitment_count), 8);
        assert_eq!(shared.with(|e| e.conservation().deposited()), 8 * WAD / 100);
    }

    #[test]
    fn handles_share_phase() {
        let clock = ManualClock::new(Utc::now(), [3; 32]);
        let engine = AuctionEngine::new(
            AuctionConfig::default(),
            clock.clone(),
            Collaborators::new(MemoryPayout::new(), MemorySink::new()),
        )
        .unwrap();
        let a = SharedEngine::new(engine);
        let b = a.clone();
        clock.advance_secs(10);
        assert_eq!(a.advance_phase(), BatchPhase::Settling);
        assert_eq!(b.current_phase(), BatchPhase::Settling);
        let report = b.settle().unwrap();
        assert_eq!(report.batch_id.0, 1);
        assert_eq!(a.current_phase(), BatchPhase::Commit);
    }
}
