//! Priority valuation: turning currency bids and proof-of-work into one
//! comparable number.

use fairbatch_types::{Amount, PowConfig, Result};

/// Converts proof-of-work difficulty into currency-equivalent priority.
///
/// Difficulty below `min_difficulty` is worth nothing. At the floor a proof
/// is worth `base_value`, and each further bit doubles it up to
/// `max_difficulty`. Beyond that the value is flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityValuation {
    base_value: Amount,
    min_difficulty: u8,
    max_difficulty: u8,
}

impl PriorityValuation {
    #[must_use]
    pub fn new(base_value: Amount, min_difficulty: u8, max_difficulty: u8) -> Self {
        Self {
            base_value,
            min_difficulty,
            max_difficulty: max_difficulty.max(min_difficulty),
        }
    }

    pub fn from_config(cfg: &PowConfig) -> Result<Self> {
        Ok(Self::new(
            cfg.base_value_wad()?,
            cfg.min_difficulty,
            cfg.max_difficulty,
        ))
    }

    /// Currency-equivalent value of a proof of `difficulty` bits. Saturates.
    #[must_use]
    pub fn pow_value(&self, difficulty: u8) -> Amount {
        if difficulty < self.min_difficulty {
            return 0;
        }
        let doublings = u32::from(difficulty.min(self.max_difficulty) - self.min_difficulty);
        match 1u128.checked_shl(doublings) {
            Some(multiplier) => self.base_value.checked_mul(multiplier).unwrap_or(Amount::MAX),
            None => Amount::MAX,
        }
    }

    /// Total priority of a reveal.
    #[must_use]
    pub fn combine(bid: Amount, pow_value: Amount) -> Amount {
        bid.saturating_add(pow_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairbatch_types::constants::WAD;

    fn valuation() -> PriorityValuation {
        PriorityValuation::new(WAD / 10_000, 8, 64)
    }

    #[test]
    fn below_floor_is_worthless() {
        assert_eq!(valuation().pow_value(0), 0);
        assert_eq!(valuation().pow_value(7), 0);
    }

    #[test]
    fn doubles_per_bit() {
        let v = valuation();
        assert_eq!(v.pow_value(8), WAD / 10_000);
        assert_eq!(v.pow_value(9), 2 * WAD / 10_000);
        assert_eq!(v.pow_value(12), 16 * WAD / 10_000);
    }

    #[test]
    fn capped_at_max_difficulty() {
        let v = PriorityValuation::new(1, 8, 20);
        assert_eq!(v.pow_value(20), 1 << 12);
        assert_eq!(v.pow_value(200), 1 << 12);
    }

    #[test]
    fn huge_exponents_saturate() {
        let v = PriorityValuation::new(WAD, 0, 255);
        assert_eq!(v.pow_value(200), Amount::MAX);
        assert_eq!(v.pow_value(127), Amount::MAX);
    }

    #[test]
    fn combine_saturates() {
        assert_eq!(PriorityValuation::combine(3, 4), 7);
        assert_eq!(PriorityValuation::combine(Amount::MAX, 1), Amount::MAX);
    }

    #[test]
    fn from_default_config() {
        let v = PriorityValuation::from_config(&PowConfig::default()).unwrap();
        assert_eq!(v.pow_value(8), WAD / 10_000);
    }
}
