//! The engine's view of time and external randomness.
//!
//! Phases are a pure function of wall-clock time; entropy anchoring needs a
//! block sequence whose hashes only become known once produced. Both come
//! from one [`LogicalClock`] so every operation observes a single monotonic
//! timeline.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Source of time, block sequence, and optional beacon randomness.
pub trait LogicalClock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Latest produced block.
    fn block_number(&self) -> u64;

    /// Hash of block `number`, or `None` if it has not been produced yet.
    fn block_hash(&self, number: u64) -> Option<[u8; 32]>;

    /// Latest output of a randomness beacon, if one is wired in.
    fn beacon(&self) -> Option<[u8; 32]> {
        None
    }

    /// Hash of the latest produced block.
    fn latest_block_hash(&self) -> [u8; 32] {
        self.block_hash(self.block_number()).unwrap_or([0; 32])
    }
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<Utc>,
    block: u64,
    seed: [u8; 32],
    beacon: Option<[u8; 32]>,
}

/// A clock advanced explicitly by its owner.
///
/// Block hashes are `SHA-256(seed || number)` for produced blocks. Clones
/// share state, so a test keeps one handle while the engine owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>, seed: [u8; 32]) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: start,
                block: 0,
                seed,
                beacon: None,
            })),
        }
    }

    /// Move wall-clock time forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    /// Produce `count` more blocks.
    pub fn mine_blocks(&self, count: u64) {
        let mut state = self.state.lock();
        state.block = state.block.saturating_add(count);
    }

    pub fn set_beacon(&self, beacon: Option<[u8; 32]>) {
        self.state.lock().beacon = beacon;
    }
}

impl LogicalClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().now
    }

    fn block_number(&self) -> u64 {
        self.state.lock().block
    }

    fn block_hash(&self, number: u64) -> Option<[u8; 32]> {
        let state = self.state.lock();
        if number > state.block {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(b"fairbatch:manual_block:");
        hasher.update(state.seed);
        hasher.update(number.to_le_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        Some(hash)
    }

    fn beacon(&self) -> Option<[u8; 32]> {
        self.state.lock().beacon
    }
}
