//! Configuration types for a FairBatch auction engine.
//!
//! Money amounts are written as decimals (`"0.001"`) so config files stay
//! human-readable; accessors convert them into 18-decimal fixed point.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Amount, FairbatchError, MarketPair, Result, constants, fixed};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Pair cleared by this engine.
    pub market: MarketPair,
    /// Length of the COMMIT phase.
    pub commit_duration: Duration,
    /// Length of the REVEAL phase.
    pub reveal_duration: Duration,
    /// Share of stake forfeited on an invalid or missing reveal.
    pub slash_rate_bps: u16,
    /// Blocks after the SETTLING transition whose hash anchors the seed.
    pub entropy_anchor_offset: u64,
    /// Maximum commitments accepted into one batch.
    pub max_commitments_per_batch: usize,
    /// Domain this engine runs in; folded into proof-of-work challenges.
    pub domain_id: u32,
    /// Distinguishes engine instances within one domain.
    pub instance_tag: String,
    pub stake: StakeConfig,
    pub pow: PowConfig,
    pub solver: SolverConfig,
}

/// Stake floor policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeConfig {
    /// Flat minimum stake.
    pub min_stake: Decimal,
    /// Required stake as a share of the caller's declared trade value.
    pub collateral_bps: u16,
    /// Commitments one participant may place in a single batch.
    pub max_commits_per_participant: usize,
}

/// Proof-of-work priority valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowConfig {
    /// Difficulty at or below which a proof earns exactly `base_value`
    /// (strictly below: nothing).
    pub min_difficulty: u8,
    /// Priority value of a proof at `min_difficulty`.
    pub base_value: Decimal,
    /// Difficulty beyond which value stops doubling.
    pub max_difficulty: u8,
}

/// Clearing-price solver limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub max_iterations: u32,
    /// Stop once the search interval is narrower than this share of spot.
    pub convergence_threshold_bps: u16,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            market: MarketPair::new("ETH", "USDC"),
            commit_duration: Duration::from_secs(constants::DEFAULT_COMMIT_SECS),
            reveal_duration: Duration::from_secs(constants::DEFAULT_REVEAL_SECS),
            slash_rate_bps: constants::DEFAULT_SLASH_RATE_BPS,
            entropy_anchor_offset: constants::DEFAULT_ENTROPY_ANCHOR_OFFSET,
            max_commitments_per_batch: constants::MAX_COMMITMENTS_PER_BATCH,
            domain_id: 0,
            instance_tag: "fairbatch".to_string(),
            stake: StakeConfig::default(),
            pow: PowConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            min_stake: Decimal::new(1, 3),
            collateral_bps: constants::DEFAULT_COLLATERAL_BPS,
            max_commits_per_participant: constants::DEFAULT_MAX_COMMITS_PER_PARTICIPANT,
        }
    }
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            min_difficulty: constants::DEFAULT_MIN_POW_DIFFICULTY,
            base_value: Decimal::new(1, 4),
            max_difficulty: constants::DEFAULT_MAX_POW_DIFFICULTY,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: constants::DEFAULT_SOLVER_MAX_ITERATIONS,
            convergence_threshold_bps: constants::DEFAULT_SOLVER_CONVERGENCE_BPS,
        }
    }
}

impl AuctionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.commit_duration.is_zero() || self.reveal_duration.is_zero() {
            return Err(FairbatchError::Configuration(
                "commit and reveal durations must be non-zero".into(),
            ));
        }
        if u128::from(self.slash_rate_bps) > constants::BPS_DENOMINATOR {
            return Err(FairbatchError::Configuration(format!(
                "slash_rate_bps {} exceeds 100%",
                self.slash_rate_bps
            )));
        }
        if self.pow.min_difficulty > self.pow.max_difficulty {
            return Err(FairbatchError::Configuration(format!(
                "pow.min_difficulty {} above max_difficulty {}",
                self.pow.min_difficulty, self.pow.max_difficulty
            )));
        }
        if self.entropy_anchor_offset == 0 {
            return Err(FairbatchError::Configuration(
                "entropy_anchor_offset must be at least 1 block past the SETTLING head".into(),
            ));
        }
        if self.solver.max_iterations == 0 {
            return Err(FairbatchError::Configuration(
                "solver.max_iterations must be non-zero".into(),
            ));
        }
        if self.max_commitments_per_batch == 0 || self.stake.max_commits_per_participant == 0 {
            return Err(FairbatchError::Configuration(
                "commitment caps must be non-zero".into(),
            ));
        }
        if self.market.base == self.market.quote {
            return Err(FairbatchError::Configuration(format!(
                "market {} trades an asset against itself",
                self.market
            )));
        }
        // Surfaces negative or oversized decimals early.
        self.stake.min_stake_wad()?;
        self.pow.base_value_wad()?;
        Ok(())
    }

    /// Commit + reveal: time from batch start until SETTLING.
    #[must_use]
    pub fn settling_after(&self) -> Duration {
        self.commit_duration + self.reveal_duration
    }
}

impl StakeConfig {
    pub fn min_stake_wad(&self) -> Result<Amount> {
        fixed::to_wad(self.min_stake)
    }
}

impl PowConfig {
    pub fn base_value_wad(&self) -> Result<Amount> {
        fixed::to_wad(self.base_value)
    }
}
