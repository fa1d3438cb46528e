//! Held-funds ledger.
//!
//! When the sink refuses a transfer, the value is parked here under the key
//! it was owed for instead of being dropped or handed back. Parked value is
//! released by retrying the sink.

use std::{collections::HashMap, fmt};

use fairbatch_types::{Amount, BatchId, FairbatchError, ParticipantId, Result};
use serde::{Deserialize, Serialize};

use crate::collaborators::ValueSink;

/// What parked value is owed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecoveryKey {
    /// Forfeited stake of this depositor.
    Depositor(ParticipantId),
    /// Priority bids collected by this batch.
    Batch(BatchId),
}

impl fmt::Display for RecoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depositor(p) => write!(f, "depositor:{p}"),
            Self::Batch(b) => write!(f, "{b}"),
        }
    }
}

/// Pending-recovery pool.
#[derive(Debug, Default)]
pub struct RecoveryLedger {
    held: HashMap<RecoveryKey, Amount>,
    total: Amount,
}

impl RecoveryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `amount` under `key`.
    pub fn hold(&mut self, key: RecoveryKey, amount: Amount) -> Result<()> {
        let entry = self.held.entry(key).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(FairbatchError::Overflow {
            context: "recovery hold",
        })?;
        self.total = self.total.checked_add(amount).ok_or(FairbatchError::Overflow {
            context: "recovery total",
        })?;
        tracing::warn!(
            key = %key,
            amount = %fairbatch_types::fixed::from_wad(amount),
            total = %fairbatch_types::fixed::from_wad(self.total),
            "Funds held for recovery"
        );
        Ok(())
    }

    /// Amount parked under `key`.
    #[must_use]
    pub fn held(&self, key: &RecoveryKey) -> Amount {
        self.held.get(key).copied().unwrap_or(0)
    }

    /// Sum across all keys.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Retry routing everything parked under `key` to the sink.
    ///
    /// On success the entry is cleared and the released amount returned. On
    /// failure the entry is untouched.
    ///
    /// # Errors
    /// - `NothingHeld` if `key` has nothing parked
    /// - the sink's error if it refuses again
    pub fn retry(&mut self, key: RecoveryKey, sink: &dyn ValueSink) -> Result<Amount> {
        let amount = self.held(&key);
        if amount == 0 {
            return Err(FairbatchError::NothingHeld {
                key: key.to_string(),
            });
        }
        match key {
            RecoveryKey::Depositor(p) => sink.route_slash(p, amount)?,
            RecoveryKey::Batch(b) => sink.route_priority(b, amount)?,
        }
        self.held.remove(&key);
        self.total -= amount;
        tracing::info!(
            key = %key,
            amount = %fairbatch_types::fixed::from_wad(amount),
            "Held funds released"
        );
        Ok(amount)
    }
}
