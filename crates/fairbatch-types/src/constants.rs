//! System-wide constants for the FairBatch auction engine.

/// Fixed-point scale: every amount and price carries 18 decimal places.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Number of decimal places represented by [`WAD`].
pub const WAD_DECIMALS: u32 = 18;

/// Basis-point denominator (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Default COMMIT phase duration in seconds.
pub const DEFAULT_COMMIT_SECS: u64 = 8;

/// Default REVEAL phase duration in seconds.
pub const DEFAULT_REVEAL_SECS: u64 = 2;

/// Default share of a stake forfeited on an invalid or missing reveal (50%).
pub const DEFAULT_SLASH_RATE_BPS: u16 = 5_000;

/// Default flat stake floor, as a decimal string in base units (0.001).
pub const DEFAULT_MIN_STAKE: &str = "0.001";

/// Default collateral requirement as a share of the declared trade value (5%).
pub const DEFAULT_COLLATERAL_BPS: u16 = 500;

/// Default cap on commitments per participant per batch (anti-flood).
pub const DEFAULT_MAX_COMMITS_PER_PARTICIPANT: usize = 16;

/// Maximum commitments accepted into a single batch.
pub const MAX_COMMITMENTS_PER_BATCH: usize = 100_000;

/// Proof-of-work difficulty (leading zero bits) below which a proof is worth nothing.
pub const DEFAULT_MIN_POW_DIFFICULTY: u8 = 8;

/// Difficulty at which proof-of-work valuation stops doubling.
pub const DEFAULT_MAX_POW_DIFFICULTY: u8 = 64;

/// Default priority value of a proof exactly at the difficulty floor (0.0001).
pub const DEFAULT_POW_BASE_VALUE: &str = "0.0001";

/// Blocks after the SETTLING transition whose hash anchors the shuffle seed.
pub const DEFAULT_ENTROPY_ANCHOR_OFFSET: u64 = 1;

/// Default iteration cap for the clearing-price binary search.
pub const DEFAULT_SOLVER_MAX_ITERATIONS: u32 = 100;

/// Default convergence threshold for the clearing-price search (0.01% of spot).
pub const DEFAULT_SOLVER_CONVERGENCE_BPS: u16 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "FairBatch";
