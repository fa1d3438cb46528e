//! Stake policy: the hard gate every commit passes through.
//!
//! - **Floor**: stake must cover the flat minimum
//! - **Collateral**: and a share of the value the participant says it trades
//! - **Quota**: at most N commitments per participant per batch

use fairbatch_types::{Amount, BatchId, FairbatchError, Result, StakeConfig, fixed::bps_of};

/// Validates stake and per-participant commitment quotas.
#[derive(Debug, Clone)]
pub struct StakePolicy {
    min_stake: Amount,
    collateral_bps: u16,
    max_commits_per_participant: usize,
}

impl StakePolicy {
    #[must_use]
    pub fn new(min_stake: Amount, collateral_bps: u16, max_commits_per_participant: usize) -> Self {
        Self {
            min_stake,
            collateral_bps,
            max_commits_per_participant,
        }
    }

    pub fn from_config(cfg: &StakeConfig) -> Result<Self> {
        Ok(Self::new(
            cfg.min_stake_wad()?,
            cfg.collateral_bps,
            cfg.max_commits_per_participant,
        ))
    }

    /// Stake required to back a trade of `estimated_value`.
    pub fn required_stake(&self, estimated_value: Amount) -> Result<Amount> {
        Ok(self.min_stake.max(bps_of(estimated_value, self.collateral_bps)?))
    }

    /// Check `stake` against the requirement for `estimated_value`.
    ///
    /// # Errors
    /// `InsufficientStake` naming the requirement.
    pub fn check_stake(&self, stake: Amount, estimated_value: Amount) -> Result<()> {
        let required = self.required_stake(estimated_value)?;
        if stake < required {
            return Err(FairbatchError::InsufficientStake {
                required,
                provided: stake,
            });
        }
        Ok(())
    }

    /// Check a participant holding `existing` commitments in `batch` may add one more.
    ///
    /// # Errors
    /// `CommitLimitExceeded` once the quota is reached.
    pub fn check_quota(&self, batch: BatchId, existing: usize) -> Result<()> {
        if existing >= self.max_commits_per_participant {
            return Err(FairbatchError::CommitLimitExceeded {
                batch,
                count: existing,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn min_stake(&self) -> Amount {
        self.min_stake
    }
}
