//! Stake conservation invariant checker.
//!
//! Enforced after every value-moving transition:
//! ```text
//! Σ deposited == Σ escrowed + Σ refunded + Σ routed + Σ held
//! ```
//!
//! Every leg, escrow included, is tallied here as it happens, so the
//! per-transition [`StakeConservation::check`] costs the same regardless of
//! how many commitments exist. [`StakeConservation::audit`] re-sums escrow
//! from the commitments themselves. A mismatch means value was created or lost.

use fairbatch_types::{Amount, Commitment, FairbatchError, Result};

/// Running totals of stake movements since genesis.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StakeConservation {
    deposited: Amount,
    escrowed: Amount,
    refunded: Amount,
    routed: Amount,
    held: Amount,
}

fn add(total: &mut Amount, amount: Amount, context: &'static str) -> Result<()> {
    *total = total
        .checked_add(amount)
        .ok_or(FairbatchError::Overflow { context })?;
    Ok(())
}

impl StakeConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stake taken in at commit.
    pub fn record_deposit(&mut self, amount: Amount) -> Result<()> {
        add(&mut self.deposited, amount, "conservation deposit")?;
        add(&mut self.escrowed, amount, "conservation escrow")
    }

    /// Stake returned to a depositor (slash remainder or withdrawal).
    pub fn record_refund(&mut self, amount: Amount) -> Result<()> {
        self.draw_escrow(amount)?;
        add(&mut self.refunded, amount, "conservation refund")
    }

    /// Forfeit taken from escrow and delivered to the sink.
    pub fn record_routed(&mut self, amount: Amount) -> Result<()> {
        self.draw_escrow(amount)?;
        add(&mut self.routed, amount, "conservation routed")
    }

    /// Forfeit taken from escrow and parked after the sink refused it.
    pub fn record_held(&mut self, amount: Amount) -> Result<()> {
        self.draw_escrow(amount)?;
        add(&mut self.held, amount, "conservation held")
    }

    /// Parked forfeit finally delivered: held → routed. Escrow is untouched.
    pub fn record_release(&mut self, amount: Amount) -> Result<()> {
        self.held = self
            .held
            .checked_sub(amount)
            .ok_or_else(|| FairbatchError::ConservationViolation {
                reason: format!("release of {amount} exceeds held {}", self.held),
            })?;
        add(&mut self.routed, amount, "conservation routed")
    }

    fn draw_escrow(&mut self, amount: Amount) -> Result<()> {
        self.escrowed = self
            .escrowed
            .checked_sub(amount)
            .ok_or_else(|| FairbatchError::ConservationViolation {
                reason: format!("outflow of {amount} exceeds escrow {}", self.escrowed),
            })?;
        Ok(())
    }

    /// Stake that should still be in escrow, derived from the other legs.
    pub fn expected_escrow(&self) -> Result<Amount> {
        self.refunded
            .checked_add(self.routed)
            .and_then(|out| out.checked_add(self.held))
            .and_then(|out| self.deposited.checked_sub(out))
            .ok_or_else(|| FairbatchError::ConservationViolation {
                reason: format!(
                    "outflows exceed deposits (deposited={}, refunded={}, routed={}, held={})",
                    self.deposited, self.refunded, self.routed, self.held
                ),
            })
    }

    /// Check the global identity from the running totals, plus the identity
    /// of the one commitment a transition touched (if any).
    ///
    /// # Errors
    /// `ConservationViolation` naming the mismatch.
    pub fn check(&self, touched: Option<&Commitment>) -> Result<()> {
        if let Some(c) = touched {
            check_commitment(c)?;
        }
        let expected = self.expected_escrow()?;
        if self.escrowed != expected {
            tracing::error!(
                escrowed = self.escrowed,
                expected,
                "Stake conservation violated"
            );
            return Err(FairbatchError::ConservationViolation {
                reason: format!("escrowed {} != expected {expected}", self.escrowed),
            });
        }
        Ok(())
    }

    /// Full audit: every commitment's own identity, and the escrow actually
    /// sitting in commitments against the running total.
    ///
    /// # Errors
    /// `ConservationViolation` naming the first mismatch.
    pub fn audit<'a>(&self, commitments: impl IntoIterator<Item = &'a Commitment>) -> Result<()> {
        let mut escrowed: Amount = 0;
        for c in commitments {
            check_commitment(c)?;
            add(&mut escrowed, c.escrowed, "conservation escrow sum")?;
        }
        if escrowed != self.escrowed {
            tracing::error!(
                scanned = escrowed,
                tracked = self.escrowed,
                "Escrow audit mismatch"
            );
            return Err(FairbatchError::ConservationViolation {
                reason: format!("commitments escrow {escrowed} != tracked {}", self.escrowed),
            });
        }
        self.check(None)
    }

    #[must_use]
    pub fn escrowed(&self) -> Amount {
        self.escrowed
    }

    #[must_use]
    pub fn deposited(&self) -> Amount {
        self.deposited
    }

    #[must_use]
    pub fn refunded(&self) -> Amount {
        self.refunded
    }

    #[must_use]
    pub fn routed(&self) -> Amount {
        self.routed
    }

    #[must_use]
    pub fn held(&self) -> Amount {
        self.held
    }
}

fn check_commitment(c: &Commitment) -> Result<()> {
    if c.is_conserved() {
        return Ok(());
    }
    Err(FairbatchError::ConservationViolation {
        reason: format!(
            "{}: stake {} != escrowed {} + refunded {} + slashed {} + held {}",
            c.id, c.stake, c.escrowed, c.refunded, c.slashed, c.held
        ),
    })
}
