//! Uniform clearing price for a batch.
//!
//! Aggregates revealed orders into buy and sell pressure, then binary
//! searches for the price where the two balance. Venue liquidity limits
//! both sides: the further the price moves from spot, the less volume the
//! reserves can absorb.
//!
//! Deterministic integer arithmetic throughout: same inputs, same price.

use std::cmp::Ordering;

use fairbatch_types::{
    Amount, ClearingResult, MarketPair, OrderSide, Price, PricedOrder, Reserves, Result,
    RevealedOrder, SolverConfig,
    constants::WAD,
    fixed::{bps_of, geometric_mean, mul_div},
};

/// Split revealed orders into buy and sell pressure, in base units.
///
/// A buy's size is its output floor. A buy with no floor is sized at spot.
/// Orders that trade outside `market` are skipped.
pub fn aggregate_pressure(
    orders: &[RevealedOrder],
    market: &MarketPair,
    spot: Price,
) -> Result<(Vec<PricedOrder>, Vec<PricedOrder>)> {
    let mut buys = Vec::new();
    let mut sells = Vec::new();
    for order in orders {
        let fields = &order.fields;
        match fields.side(market) {
            Some(OrderSide::Buy) => {
                let amount = if fields.min_amount_out > 0 {
                    fields.min_amount_out
                } else {
                    mul_div(fields.amount_in, WAD, spot)?
                };
                buys.push(PricedOrder::new(amount, fields.limit_price(OrderSide::Buy)));
            }
            Some(OrderSide::Sell) => {
                sells.push(PricedOrder::new(
                    fields.amount_in,
                    fields.limit_price(OrderSide::Sell),
                ));
            }
            None => {
                tracing::debug!(
                    commitment = %order.commitment_id,
                    token_in = %fields.token_in,
                    token_out = %fields.token_out,
                    "Order outside market skipped for clearing"
                );
            }
        }
    }
    Ok((buys, sells))
}

/// Compute the clearing price.
///
/// Algorithm:
/// 1. Start from the venue spot price; search `[spot / 2, spot * 2]`,
///    widened to include every finite limit price.
/// 2. At each midpoint, buy pressure is the volume willing to pay at least
///    the midpoint, sell pressure the volume willing to accept at most it.
///    Each is capped by the reserves' absorption capacity at that price.
/// 3. Excess buy pressure raises the floor, excess sell pressure lowers the
///    ceiling, exact balance stops the search.
/// 4. Stop once the interval is within `convergence_threshold_bps` of spot
///    or after `max_iterations`.
///
/// With no orders, returns spot with zero volume.
pub fn compute_clearing_price(
    buys: &[PricedOrder],
    sells: &[PricedOrder],
    reserves: &Reserves,
    config: &SolverConfig,
) -> Result<ClearingResult> {
    let spot = reserves.spot_price()?;

    if buys.is_empty() && sells.is_empty() {
        return Ok(ClearingResult {
            price: spot,
            fillable_volume: 0,
            spot_price: spot,
            iterations: 0,
        });
    }

    let mut low = spot / 2;
    let mut high = spot.saturating_mul(2);
    for order in buys.iter().chain(sells) {
        if order.limit_price == Price::MAX {
            continue;
        }
        low = low.min(order.limit_price);
        high = high.max(order.limit_price);
    }

    let threshold = bps_of(spot, config.convergence_threshold_bps)?.max(1);
    let depth = geometric_mean(reserves.base, reserves.quote);

    let mut price = spot;
    let mut iterations = 0u32;
    while iterations < config.max_iterations && high - low > threshold {
        iterations += 1;
        price = low + (high - low) / 2;
        let (buy, sell) = capped_pressure(buys, sells, price, spot, depth)?;
        match buy.cmp(&sell) {
            Ordering::Greater => low = price,
            Ordering::Less => high = price,
            Ordering::Equal => break,
        }
    }

    let (buy, sell) = capped_pressure(buys, sells, price, spot, depth)?;
    let result = ClearingResult {
        price,
        fillable_volume: buy.min(sell),
        spot_price: spot,
        iterations,
    };

    tracing::debug!(
        price = %fairbatch_types::fixed::from_wad(result.price),
        spot = %fairbatch_types::fixed::from_wad(spot),
        volume = %fairbatch_types::fixed::from_wad(result.fillable_volume),
        iterations,
        "Clearing price computed"
    );

    Ok(result)
}

/// Volume the reserves can absorb at `price`.
///
/// `depth / (1 + |price - spot| / spot)`: full depth at spot, half at
/// double or half the spot price.
fn absorption_capacity(depth: Amount, price: Price, spot: Price) -> Result<Amount> {
    let deviation = mul_div(price.abs_diff(spot), WAD, spot)?;
    mul_div(depth, WAD, WAD.saturating_add(deviation))
}

fn capped_pressure(
    buys: &[PricedOrder],
    sells: &[PricedOrder],
    price: Price,
    spot: Price,
    depth: Amount,
) -> Result<(Amount, Amount)> {
    let capacity = absorption_capacity(depth, price, spot)?;
    let buy = buys
        .iter()
        .filter(|o| o.limit_price >= price)
        .fold(0u128, |acc, o| acc.saturating_add(o.amount));
    let sell = sells
        .iter()
        .filter(|o| o.limit_price <= price)
        .fold(0u128, |acc, o| acc.saturating_add(o.amount));
    Ok((buy.min(capacity), sell.min(capacity)))
}
