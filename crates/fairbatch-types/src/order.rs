//! Order types: the fields hidden behind a commitment and the record
//! produced once they are revealed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Amount, CommitmentId, DomainId, MarketPair, ParticipantId, Price, constants::WAD};

/// Which side of the market an order trades on, relative to the pair's base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    /// Pays quote, receives base.
    Buy,
    /// Pays base, receives quote.
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The two trade legs a participant commits to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderFields {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Amount,
    /// Slippage floor on the output leg. Zero means no floor.
    pub min_amount_out: Amount,
}

impl OrderFields {
    #[must_use]
    pub fn new(
        token_in: impl Into<String>,
        token_out: impl Into<String>,
        amount_in: Amount,
        min_amount_out: Amount,
    ) -> Self {
        Self {
            token_in: token_in.into(),
            token_out: token_out.into(),
            amount_in,
            min_amount_out,
        }
    }

    /// Side of this order within `market`, or `None` if it trades other assets.
    #[must_use]
    pub fn side(&self, market: &MarketPair) -> Option<OrderSide> {
        if self.token_in == market.quote && self.token_out == market.base {
            Some(OrderSide::Buy)
        } else if self.token_in == market.base && self.token_out == market.quote {
            Some(OrderSide::Sell)
        } else {
            None
        }
    }

    /// The order's limit price in quote-per-base, scaled by WAD.
    ///
    /// - Buy: the most it pays, `amount_in / min_amount_out`; unbounded when
    ///   there is no output floor.
    /// - Sell: the least it accepts, `min_amount_out / amount_in`.
    #[must_use]
    pub fn limit_price(&self, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => {
                if self.min_amount_out == 0 {
                    Price::MAX
                } else {
                    crate::fixed::mul_div(self.amount_in, WAD, self.min_amount_out)
                        .unwrap_or(Price::MAX)
                }
            }
            OrderSide::Sell => {
                if self.amount_in == 0 {
                    Price::MAX
                } else {
                    crate::fixed::mul_div(self.min_amount_out, WAD, self.amount_in)
                        .unwrap_or(Price::MAX)
                }
            }
        }
    }

    /// Canonical byte encoding hashed into the commitment.
    fn encode_into(&self, hasher: &mut Sha256) {
        hasher.update((self.token_in.len() as u64).to_le_bytes());
        hasher.update(self.token_in.as_bytes());
        hasher.update((self.token_out.len() as u64).to_le_bytes());
        hasher.update(self.token_out.as_bytes());
        hasher.update(self.amount_in.to_le_bytes());
        hasher.update(self.min_amount_out.to_le_bytes());
    }
}

/// The hash a participant commits to.
///
/// `SHA-256("fairbatch:commit:v1:" || trader || fields || secret)`
///
/// Binding the trader prevents copying someone else's commitment and
/// revealing it as your own.
#[must_use]
pub fn commitment_hash(trader: ParticipantId, fields: &OrderFields, secret: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"fairbatch:commit:v1:");
    hasher.update(trader.as_bytes());
    fields.encode_into(&mut hasher);
    hasher.update(secret);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// An order disclosed by a successful (hash-matching) reveal. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedOrder {
    pub commitment_id: CommitmentId,
    pub trader: ParticipantId,
    pub fields: OrderFields,
    pub secret: [u8; 32],
    /// Currency bid plus proof-of-work equivalent.
    pub priority_value: Amount,
    /// Where the reveal was submitted from.
    pub origin_domain: DomainId,
    /// Position in the batch's reveal sequence (0-based).
    pub reveal_index: usize,
}

/// Dummy orders for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl RevealedOrder {
    pub fn dummy(reveal_index: usize, priority_value: Amount) -> Self {
        let trader = ParticipantId::new();
        let secret: [u8; 32] = rand::random();
        let fields = OrderFields::new("USDC", "ETH", WAD, WAD);
        Self {
            commitment_id: CommitmentId::derive(
                trader,
                &commitment_hash(trader, &fields, &secret),
                crate::BatchId::GENESIS,
                0,
            ),
            trader,
            fields,
            secret,
            priority_value,
            origin_domain: DomainId::LOCAL,
            reveal_index,
        }
    }
}
