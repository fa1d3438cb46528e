//! Venue-facing market types: reserves, solver inputs and outputs, fills.

use serde::{Deserialize, Serialize};

use crate::{Amount, CommitmentId, FairbatchError, Price, Result, fixed};

/// Liquidity held by the venue for the auction's pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    /// Base-asset reserve.
    pub base: Amount,
    /// Quote-asset reserve.
    pub quote: Amount,
}

impl Reserves {
    #[must_use]
    pub fn new(base: Amount, quote: Amount) -> Self {
        Self { base, quote }
    }

    /// Spot price in quote-per-base: `quote * WAD / base`.
    pub fn spot_price(&self) -> Result<Price> {
        if self.base == 0 || self.quote == 0 {
            return Err(FairbatchError::InvalidReserves {
                reason: format!("empty reserves ({}, {})", self.base, self.quote),
            });
        }
        let spot = fixed::wad_div(self.quote, self.base)?;
        if spot == 0 {
            return Err(FairbatchError::InvalidReserves {
                reason: format!(
                    "spot price below 1e-18 ({} quote per {} base)",
                    self.quote, self.base
                ),
            });
        }
        Ok(spot)
    }
}

/// One side of aggregated order pressure fed to the clearing solver.
///
/// For buys, `limit_price` is the highest price the order pays; for sells,
/// the lowest it accepts. `amount` is in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedOrder {
    pub amount: Amount,
    pub limit_price: Price,
}

impl PricedOrder {
    #[must_use]
    pub fn new(amount: Amount, limit_price: Price) -> Self {
        Self {
            amount,
            limit_price,
        }
    }
}

/// Output of the clearing-price solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingResult {
    /// Uniform settlement price, quote-per-base scaled by WAD.
    pub price: Price,
    /// Volume (base units) both sides can fill at `price`.
    pub fillable_volume: Amount,
    /// Spot price the search started from.
    pub spot_price: Price,
    /// Binary-search steps taken.
    pub iterations: u32,
}

/// An order handed to the venue, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableOrder {
    pub commitment_id: CommitmentId,
    pub trader: crate::ParticipantId,
    pub fields: crate::OrderFields,
}

/// The venue's verdict on one executed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillResult {
    pub commitment_id: CommitmentId,
    /// Output delivered to the trader; zero if unfilled.
    pub amount_out: Amount,
    pub filled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WAD;

    #[test]
    fn spot_of_balanced_reserves_is_one() {
        let r = Reserves::new(100 * WAD, 100 * WAD);
        assert_eq!(r.spot_price().unwrap(), WAD);
    }

    #[test]
    fn spot_reflects_ratio() {
        let r = Reserves::new(10 * WAD, 25 * WAD);
        assert_eq!(r.spot_price().unwrap(), 25 * WAD / 10);
    }

    #[test]
    fn empty_reserves_rejected() {
        let err = Reserves::new(0, WAD).spot_price().unwrap_err();
        assert!(matches!(err, FairbatchError::InvalidReserves { .. }));
    }

    #[test]
    fn sub_wad_ratio_rejected() {
        let err = Reserves::new(2 * WAD, 1).spot_price().unwrap_err();
        assert!(matches!(err, FairbatchError::InvalidReserves { .. }));
        assert_eq!(Reserves::new(WAD, 1).spot_price().unwrap(), 1);
    }
}
