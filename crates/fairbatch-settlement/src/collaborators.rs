//! Interfaces to the systems the engine moves value through.
//!
//! All collaborators are synchronous and take `&self`; the engine never
//! waits on one while holding a partially applied state change. A failure is
//! reported as an error and the engine decides whether it rolls back, parks
//! the value, or only logs.

use fairbatch_types::{
    Amount, BatchId, ExecutableOrder, FillResult, ParticipantId, Price, Reserves, Result,
};

/// Treasury accepting forfeited stake and priority bids.
pub trait ValueSink: Send + Sync {
    /// Deliver stake forfeited by `depositor`.
    fn route_slash(&self, depositor: ParticipantId, amount: Amount) -> Result<()>;

    /// Deliver the priority bids collected by `batch`.
    fn route_priority(&self, batch: BatchId, amount: Amount) -> Result<()>;
}

/// Pays value back to participants: stake refunds, withdrawals, overpayment.
pub trait PayoutAgent: Send + Sync {
    fn transfer(&self, to: ParticipantId, amount: Amount) -> Result<()>;
}

/// The venue that holds reserves and executes the ordered trades.
pub trait LiquidityVenue: Send + Sync {
    /// Current reserves for the auction's pair.
    fn reserves(&self) -> Result<Reserves>;

    /// Execute `orders` in the given sequence at `clearing_price`.
    ///
    /// Returns one fill per order, in the same sequence.
    fn execute(
        &self,
        batch: BatchId,
        orders: &[ExecutableOrder],
        clearing_price: Price,
    ) -> Result<Vec<FillResult>>;
}

/// Read-only admission check consulted before a commit is accepted.
pub trait ComplianceGate: Send + Sync {
    /// `Ok` to admit, `ComplianceRejected` otherwise.
    fn check(&self, participant: ParticipantId) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory doubles
// ---------------------------------------------------------------------------

/// In-memory collaborators with switchable failure. **Never use in production.**
///
/// Each double is `Clone` over shared state, so a test can hand one copy to
/// the engine and keep another to flip failures and inspect what arrived.
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory {
    use std::{collections::HashSet, sync::Arc};

    use fairbatch_types::{
        Amount, BatchId, ExecutableOrder, FairbatchError, FillResult, MarketPair, OrderSide,
        ParticipantId, Price, Reserves, Result,
        constants::WAD,
        fixed::mul_div,
    };
    use parking_lot::Mutex;

    use super::{ComplianceGate, LiquidityVenue, PayoutAgent, ValueSink};

    #[derive(Debug, Default)]
    struct SinkState {
        slashes: Vec<(ParticipantId, Amount)>,
        priority: Vec<(BatchId, Amount)>,
        failing: bool,
    }

    /// Records everything routed to it.
    #[derive(Debug, Clone, Default)]
    pub struct MemorySink {
        state: Arc<Mutex<SinkState>>,
    }

    impl MemorySink {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.state.lock().failing = failing;
        }

        #[must_use]
        pub fn slashed_total(&self) -> Amount {
            self.state.lock().slashes.iter().map(|(_, a)| a).sum()
        }

        #[must_use]
        pub fn priority_total(&self) -> Amount {
            self.state.lock().priority.iter().map(|(_, a)| a).sum()
        }

        #[must_use]
        pub fn slashes(&self) -> Vec<(ParticipantId, Amount)> {
            self.state.lock().slashes.clone()
        }
    }

    impl ValueSink for MemorySink {
        fn route_slash(&self, depositor: ParticipantId, amount: Amount) -> Result<()> {
            let mut state = self.state.lock();
            if state.failing {
                return Err(FairbatchError::TransferFailed {
                    reason: "sink offline".into(),
                });
            }
            state.slashes.push((depositor, amount));
            Ok(())
        }

        fn route_priority(&self, batch: BatchId, amount: Amount) -> Result<()> {
            let mut state = self.state.lock();
            if state.failing {
                return Err(FairbatchError::TransferFailed {
                    reason: "sink offline".into(),
                });
            }
            state.priority.push((batch, amount));
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct PayoutState {
        transfers: Vec<(ParticipantId, Amount)>,
        failing: bool,
    }

    /// Records every payout.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryPayout {
        state: Arc<Mutex<PayoutState>>,
    }

    impl MemoryPayout {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.state.lock().failing = failing;
        }

        /// Sum paid to `participant`.
        #[must_use]
        pub fn paid_to(&self, participant: ParticipantId) -> Amount {
            self.state
                .lock()
                .transfers
                .iter()
                .filter(|(p, _)| *p == participant)
                .map(|(_, a)| a)
                .sum()
        }

        #[must_use]
        pub fn total_paid(&self) -> Amount {
            self.state.lock().transfers.iter().map(|(_, a)| a).sum()
        }
    }

    impl PayoutAgent for MemoryPayout {
        fn transfer(&self, to: ParticipantId, amount: Amount) -> Result<()> {
            let mut state = self.state.lock();
            if state.failing {
                return Err(FairbatchError::TransferFailed {
                    reason: format!("payout to {to} rejected"),
                });
            }
            state.transfers.push((to, amount));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct VenueState {
        market: MarketPair,
        reserves: Reserves,
        executed: Vec<(BatchId, Vec<ExecutableOrder>)>,
        failing: bool,
    }

    /// Fills every order at the clearing price if its output floor allows.
    #[derive(Debug, Clone)]
    pub struct MemoryVenue {
        state: Arc<Mutex<VenueState>>,
    }

    impl MemoryVenue {
        #[must_use]
        pub fn new(market: MarketPair, reserves: Reserves) -> Self {
            Self {
                state: Arc::new(Mutex::new(VenueState {
                    market,
                    reserves,
                    executed: Vec::new(),
                    failing: false,
                })),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.state.lock().failing = failing;
        }

        /// Orders executed for each batch, in the sequence received.
        #[must_use]
        pub fn executed(&self) -> Vec<(BatchId, Vec<ExecutableOrder>)> {
            self.state.lock().executed.clone()
        }
    }

    impl LiquidityVenue for MemoryVenue {
        fn reserves(&self) -> Result<Reserves> {
            Ok(self.state.lock().reserves)
        }

        fn execute(
            &self,
            batch: BatchId,
            orders: &[ExecutableOrder],
            clearing_price: Price,
        ) -> Result<Vec<FillResult>> {
            let mut state = self.state.lock();
            if state.failing {
                return Err(FairbatchError::VenueFailure {
                    reason: "venue halted".into(),
                });
            }
            let mut fills = Vec::with_capacity(orders.len());
            for order in orders {
                let out = match order.fields.side(&state.market) {
                    Some(OrderSide::Buy) => mul_div(order.fields.amount_in, WAD, clearing_price)?,
                    Some(OrderSide::Sell) => mul_div(order.fields.amount_in, clearing_price, WAD)?,
                    None => 0,
                };
                let filled = out > 0 && out >= order.fields.min_amount_out;
                fills.push(FillResult {
                    commitment_id: order.commitment_id,
                    amount_out: if filled { out } else { 0 },
                    filled,
                });
            }
            state.executed.push((batch, orders.to_vec()));
            Ok(fills)
        }
    }

    /// Rejects a fixed set of participants.
    #[derive(Debug, Clone, Default)]
    pub struct DenyList {
        denied: Arc<Mutex<HashSet<ParticipantId>>>,
    }

    impl DenyList {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn deny(&self, participant: ParticipantId) {
            self.denied.lock().insert(participant);
        }
    }

    impl ComplianceGate for DenyList {
        fn check(&self, participant: ParticipantId) -> Result<()> {
            if self.denied.lock().contains(&participant) {
                return Err(FairbatchError::ComplianceRejected {
                    reason: format!("{participant} is on the deny list"),
                });
            }
            Ok(())
        }
    }
}
