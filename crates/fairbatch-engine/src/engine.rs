//! The auction engine.
//!
//! One batch is open at a time. Its phase is a pure function of the time
//! since it started:
//!
//! ```text
//! |---- commit_duration ----|-- reveal_duration --|---- until settle() ---->
//!          COMMIT                   REVEAL               SETTLING
//! ```
//!
//! `settle()` moves the batch to SETTLED and opens the next one in the same
//! call, so callers never observe a gap between batches. Settled batches
//! are kept as history; their commitments stay withdrawable and slashable.
//!
//! Every operation runs against `&mut self`. Concurrent hosts serialize
//! through [`crate::SharedEngine`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use fairbatch_ingress::{
    CommitmentStore, ProofRegistry, RelayAttestation, RelayRegistry, StakePolicy,
};
use fairbatch_ordering::{
    EntropySample, EntropySource, PriorityValuation, ProofOfWork, aggregate_pressure,
    compute_clearing_price, compute_execution_order, compute_execution_root, pow,
};
use fairbatch_settlement::{
    ComplianceGate, LiquidityVenue, PayoutAgent, RecoveryKey, RecoveryLedger, SlashExecutor,
    SlashLedgers, SlashReason, SlashReceipt, StakeConservation, ValueSink,
};
use fairbatch_types::{
    Amount, AuctionConfig, Batch, BatchId, BatchPhase, ClearingResult, Commitment, CommitmentId,
    CommitmentStatus, DomainId, ExecutableOrder, ExecutionOrder, FairbatchError, FillResult,
    OrderFields, ParticipantId, Result, RevealedOrder, SettlementReport, commitment_hash,
    constants::{ENGINE_NAME, VERSION},
    fixed::from_wad,
};
use serde::{Deserialize, Serialize};

use crate::{clock::LogicalClock, events::EngineEvent};

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// The external systems an engine moves value through.
pub struct Collaborators {
    pub payout: Box<dyn PayoutAgent>,
    pub sink: Box<dyn ValueSink>,
    /// Without a venue, settlement orders the batch but prices and fills nothing.
    pub venue: Option<Box<dyn LiquidityVenue>>,
    pub compliance: Option<Box<dyn ComplianceGate>>,
}

impl Collaborators {
    #[must_use]
    pub fn new(payout: impl PayoutAgent + 'static, sink: impl ValueSink + 'static) -> Self {
        Self {
            payout: Box::new(payout),
            sink: Box::new(sink),
            venue: None,
            compliance: None,
        }
    }

    #[must_use]
    pub fn with_venue(mut self, venue: impl LiquidityVenue + 'static) -> Self {
        self.venue = Some(Box::new(venue));
        self
    }

    #[must_use]
    pub fn with_compliance(mut self, gate: impl ComplianceGate + 'static) -> Self {
        self.compliance = Some(Box::new(gate));
        self
    }
}

/// A reveal submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub commitment_id: CommitmentId,
    pub fields: OrderFields,
    pub secret: [u8; 32],
    /// Currency paid for priority.
    pub priority_bid: Amount,
    /// Value attached to the call. Must cover the bid; any excess is refunded.
    pub payment: Amount,
}

impl RevealRequest {
    /// A reveal with no priority bid.
    #[must_use]
    pub fn new(commitment_id: CommitmentId, fields: OrderFields, secret: [u8; 32]) -> Self {
        Self {
            commitment_id,
            fields,
            secret,
            priority_bid: 0,
            payment: 0,
        }
    }

    #[must_use]
    pub fn with_bid(mut self, priority_bid: Amount, payment: Amount) -> Self {
        self.priority_bid = priority_bid;
        self.payment = payment;
        self
    }
}

/// What a reveal did. A hash mismatch is a successful call that slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealOutcome {
    Revealed {
        reveal_index: usize,
        priority_value: Amount,
    },
    Slashed(SlashReceipt),
}

impl RevealOutcome {
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        matches!(self, Self::Revealed { .. })
    }

    #[must_use]
    pub fn is_slashed(&self) -> bool {
        matches!(self, Self::Slashed(_))
    }
}

// ---------------------------------------------------------------------------
// AuctionEngine
// ---------------------------------------------------------------------------

/// Commit-reveal batch auction over one market.
pub struct AuctionEngine<C: LogicalClock> {
    config: AuctionConfig,
    clock: C,
    collaborators: Collaborators,
    /// The open batch.
    current: Batch,
    /// Settled batches by ID.
    history: BTreeMap<BatchId, Batch>,
    store: CommitmentStore,
    /// Secrets revealed in the open batch.
    entropy: EntropySource,
    stake_policy: StakePolicy,
    valuation: PriorityValuation,
    slasher: SlashExecutor,
    proofs: ProofRegistry,
    relays: RelayRegistry,
    recovery: RecoveryLedger,
    conservation: StakeConservation,
    events: Vec<EngineEvent>,
}

impl<C: LogicalClock> AuctionEngine<C> {
    /// Validate `config` and open the genesis batch at the clock's current time.
    pub fn new(config: AuctionConfig, clock: C, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let stake_policy = StakePolicy::from_config(&config.stake)?;
        let valuation = PriorityValuation::from_config(&config.pow)?;
        let genesis = Batch::open(BatchId::GENESIS, clock.now());

        tracing::info!(
            engine = ENGINE_NAME,
            version = VERSION,
            market = %config.market,
            commit_ms = config.commit_duration.as_millis(),
            reveal_ms = config.reveal_duration.as_millis(),
            slash_rate_bps = config.slash_rate_bps,
            venue = collaborators.venue.is_some(),
            "Auction engine started"
        );

        Ok(Self {
            store: CommitmentStore::with_capacity(config.max_commitments_per_batch),
            slasher: SlashExecutor::new(config.slash_rate_bps),
            events: vec![EngineEvent::BatchOpened { batch: genesis.id }],
            current: genesis,
            history: BTreeMap::new(),
            entropy: EntropySource::new(),
            stake_policy,
            valuation,
            proofs: ProofRegistry::new(),
            relays: RelayRegistry::new(),
            recovery: RecoveryLedger::new(),
            conservation: StakeConservation::new(),
            config,
            clock,
            collaborators,
        })
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    /// Phase of the open batch right now. Pure; does not touch the cache.
    #[must_use]
    pub fn current_phase(&self) -> BatchPhase {
        self.phase_at(self.clock.now())
    }

    fn phase_at(&self, now: DateTime<Utc>) -> BatchPhase {
        if self.current.settled {
            return BatchPhase::Settled;
        }
        let elapsed = now
            .signed_duration_since(self.current.started_at)
            .to_std()
            .unwrap_or_default();
        if elapsed < self.config.commit_duration {
            BatchPhase::Commit
        } else if elapsed < self.config.settling_after() {
            BatchPhase::Reveal
        } else {
            BatchPhase::Settling
        }
    }

    /// Bring the cached phase up to date. Idempotent.
    ///
    /// Emits a transition only when the phase changed. Entering SETTLING
    /// records the entropy anchor: a block `entropy_anchor_offset` past the
    /// current head, whose hash does not exist yet.
    pub fn advance_phase(&mut self) -> BatchPhase {
        let phase = self.current_phase();
        let from = self.current.phase;
        if phase == from {
            return phase;
        }
        self.current.phase = phase;

        let mut anchor_block = None;
        if phase == BatchPhase::Settling && self.current.entropy_anchor_block.is_none() {
            let anchor = self
                .clock
                .block_number()
                .saturating_add(self.config.entropy_anchor_offset);
            self.current.entropy_anchor_block = Some(anchor);
            anchor_block = Some(anchor);
        }

        tracing::info!(
            batch = self.current.id.0,
            from = %from,
            to = %phase,
            anchor_block = ?anchor_block,
            "Batch phase changed"
        );
        self.events.push(EngineEvent::PhaseChanged {
            batch: self.current.id,
            from,
            to: phase,
            anchor_block,
        });
        phase
    }

    fn require_phase(&mut self, expected: BatchPhase) -> Result<()> {
        let actual = self.advance_phase();
        if actual != expected {
            return Err(FairbatchError::WrongPhase { expected, actual });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Commit to a hidden order with `stake`.
    ///
    /// `estimated_value` is the caller's own estimate of the trade's value;
    /// the stake floor scales with it.
    ///
    /// # Errors
    /// `WrongPhase`, `EmptyCommitmentHash`, `ComplianceRejected`,
    /// `InsufficientStake`, `CommitLimitExceeded`, `DuplicateCommitment`,
    /// `BatchFull`.
    pub fn commit(
        &mut self,
        caller: ParticipantId,
        hash: [u8; 32],
        stake: Amount,
        estimated_value: Amount,
    ) -> Result<CommitmentId> {
        self.require_phase(BatchPhase::Commit)?;
        if hash == [0u8; 32] {
            return Err(FairbatchError::EmptyCommitmentHash);
        }
        if let Some(gate) = &self.collaborators.compliance {
            gate.check(caller)?;
        }
        self.stake_policy.check_stake(stake, estimated_value)?;

        let batch_id = self.current.id;
        self.stake_policy
            .check_quota(batch_id, self.store.participant_count(batch_id, caller))?;

        let now = self.clock.now();
        let id = CommitmentId::derive(caller, &hash, batch_id, now.timestamp_millis());
        self.store
            .insert(Commitment::new(id, hash, batch_id, caller, stake, now))?;
        self.conservation.record_deposit(stake)?;
        self.current.commitment_count += 1;

        tracing::debug!(
            batch = batch_id.0,
            commitment = %id,
            depositor = %caller,
            stake = %from_wad(stake),
            "Commitment accepted"
        );
        self.events.push(EngineEvent::Committed {
            batch: batch_id,
            commitment: id,
            depositor: caller,
            stake,
        });
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Reveal
    // -----------------------------------------------------------------------

    /// Reveal a committed order.
    ///
    /// # Errors
    /// Structural problems only: `WrongPhase`, `InsufficientPayment`,
    /// `UnknownCommitment`, `WrongBatch`, `NotCommitmentOwner`,
    /// `InvalidCommitmentStatus`. A hash mismatch returns
    /// [`RevealOutcome::Slashed`].
    pub fn reveal(
        &mut self,
        caller: ParticipantId,
        request: RevealRequest,
    ) -> Result<RevealOutcome> {
        self.check_reveal(caller, &request)?;
        self.apply_reveal(caller, DomainId::LOCAL, request, 0)
    }

    /// Reveal with proof-of-work priority on top of any currency bid.
    ///
    /// The proof must be mined against [`Self::pow_challenge`] for the
    /// caller. It is consumed before the hash is checked, so a proof spent on
    /// a reveal that slashes is gone.
    ///
    /// # Errors
    /// As [`Self::reveal`], plus `InvalidProof` and `ReplayedProof`.
    pub fn reveal_with_proof_of_work(
        &mut self,
        caller: ParticipantId,
        request: RevealRequest,
        proof: &ProofOfWork,
        claimed_difficulty: u8,
    ) -> Result<RevealOutcome> {
        self.check_reveal(caller, &request)?;
        let challenge = self.pow_challenge(caller);
        pow::verify(&challenge, proof, claimed_difficulty)?;
        self.proofs.consume(&challenge, &proof.nonce)?;
        let pow_value = self.valuation.pow_value(claimed_difficulty);
        tracing::debug!(
            commitment = %request.commitment_id,
            difficulty = claimed_difficulty,
            pow_value = %from_wad(pow_value),
            "Proof-of-work accepted"
        );
        self.apply_reveal(caller, DomainId::LOCAL, request, pow_value)
    }

    /// Reveal forwarded by an authorized relay for a remote originator.
    ///
    /// Ownership is checked against the attested originator, and refunds go
    /// to the originator.
    ///
    /// # Errors
    /// As [`Self::reveal`], plus `UnauthorizedRelay` and
    /// `InvalidRelaySignature` (also when the attestation names another
    /// commitment).
    pub fn reveal_via_relay(
        &mut self,
        attestation: &RelayAttestation,
        request: RevealRequest,
    ) -> Result<RevealOutcome> {
        self.relays.verify(attestation)?;
        if attestation.commitment_id != request.commitment_id {
            return Err(FairbatchError::InvalidRelaySignature);
        }
        self.check_reveal(attestation.originator, &request)?;
        tracing::debug!(
            commitment = %request.commitment_id,
            originator = %attestation.originator,
            origin_domain = %attestation.origin_domain,
            "Relayed reveal"
        );
        self.apply_reveal(
            attestation.originator,
            attestation.origin_domain,
            request,
            0,
        )
    }

    fn check_reveal(&mut self, caller: ParticipantId, request: &RevealRequest) -> Result<()> {
        self.require_phase(BatchPhase::Reveal)?;
        if request.payment < request.priority_bid {
            return Err(FairbatchError::InsufficientPayment {
                bid: request.priority_bid,
                paid: request.payment,
            });
        }
        let commitment = self.store.get(&request.commitment_id)?;
        if commitment.batch_id != self.current.id {
            return Err(FairbatchError::WrongBatch {
                id: commitment.id,
                owner: commitment.batch_id,
                current: self.current.id,
            });
        }
        if commitment.depositor != caller {
            return Err(FairbatchError::NotCommitmentOwner(commitment.id));
        }
        if commitment.status != CommitmentStatus::Committed {
            return Err(FairbatchError::InvalidCommitmentStatus {
                id: commitment.id,
                expected: CommitmentStatus::Committed,
                actual: commitment.status,
            });
        }
        Ok(())
    }

    fn apply_reveal(
        &mut self,
        caller: ParticipantId,
        origin_domain: DomainId,
        request: RevealRequest,
        pow_value: Amount,
    ) -> Result<RevealOutcome> {
        let RevealRequest {
            commitment_id,
            fields,
            secret,
            priority_bid,
            payment,
        } = request;
        let batch_id = self.current.id;

        let committed_hash = self.store.get(&commitment_id)?.hash;
        if commitment_hash(caller, &fields, &secret) != committed_hash {
            // The bid is not honored; the whole payment goes back.
            self.refund_best_effort(caller, payment);
            let receipt = self.slash(&commitment_id, SlashReason::InvalidReveal)?;
            return Ok(RevealOutcome::Slashed(receipt));
        }

        let priority_value = PriorityValuation::combine(priority_bid, pow_value);
        let collected = self
            .current
            .priority_collected
            .checked_add(priority_bid)
            .ok_or(FairbatchError::Overflow {
                context: "priority collected",
            })?;

        self.store.get_mut(&commitment_id)?.mark_revealed()?;
        let reveal_index = self.store.next_reveal_index(batch_id);
        self.store.record_reveal(
            batch_id,
            RevealedOrder {
                commitment_id,
                trader: caller,
                fields,
                secret,
                priority_value,
                origin_domain,
                reveal_index,
            },
        );
        self.entropy.contribute(&secret);
        self.current.reveal_count += 1;
        self.current.priority_collected = collected;
        if priority_value > 0 {
            self.current.total_priority_value =
                self.current.total_priority_value.saturating_add(priority_value);
        }

        self.refund_best_effort(caller, payment - priority_bid);

        tracing::debug!(
            batch = batch_id.0,
            commitment = %commitment_id,
            reveal_index,
            priority_value = %from_wad(priority_value),
            origin_domain = %origin_domain,
            "Order revealed"
        );
        self.events.push(EngineEvent::Revealed {
            batch: batch_id,
            commitment: commitment_id,
            reveal_index,
            priority_value,
            origin_domain,
        });
        Ok(RevealOutcome::Revealed {
            reveal_index,
            priority_value,
        })
    }

    /// Return `amount` to `to`. Failure is logged and recorded, never retried.
    fn refund_best_effort(&mut self, to: ParticipantId, amount: Amount) {
        if amount == 0 {
            return;
        }
        if let Err(e) = self.collaborators.payout.transfer(to, amount) {
            tracing::warn!(
                participant = %to,
                amount = %from_wad(amount),
                error = %e,
                "Overpayment refund failed"
            );
            self.events.push(EngineEvent::RefundFailed {
                participant: to,
                amount,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Slashing
    // -----------------------------------------------------------------------

    /// Slash a commitment left unrevealed after its batch settled.
    /// Anyone may call this.
    ///
    /// # Errors
    /// `UnknownCommitment`, `NotReady` while its batch is open,
    /// `InvalidCommitmentStatus` unless COMMITTED.
    pub fn slash_unrevealed(&mut self, id: CommitmentId) -> Result<SlashReceipt> {
        let commitment = self.store.get(&id)?;
        let (batch_id, status) = (commitment.batch_id, commitment.status);
        self.require_settled(batch_id)?;
        if status != CommitmentStatus::Committed {
            return Err(FairbatchError::InvalidCommitmentStatus {
                id,
                expected: CommitmentStatus::Committed,
                actual: status,
            });
        }
        self.slash(&id, SlashReason::Unrevealed)
    }

    fn slash(&mut self, id: &CommitmentId, reason: SlashReason) -> Result<SlashReceipt> {
        let commitment = self.store.get_mut(id)?;
        let batch = commitment.batch_id;
        let receipt = self.slasher.execute(
            commitment,
            reason,
            self.collaborators.payout.as_ref(),
            self.collaborators.sink.as_ref(),
            SlashLedgers {
                recovery: &mut self.recovery,
                conservation: &mut self.conservation,
            },
        )?;
        if receipt.held > 0 {
            self.events.push(EngineEvent::FundsHeld {
                key: RecoveryKey::Depositor(receipt.depositor),
                amount: receipt.held,
            });
        }
        self.events.push(EngineEvent::Slashed {
            batch,
            receipt: receipt.clone(),
        });
        self.conservation.check(Some(self.store.get(id)?))?;
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Settlement
    // -----------------------------------------------------------------------

    /// Settle the open batch and open the next one.
    ///
    /// Everything that can fail on a collaborator (reserves, venue
    /// execution) runs before any state changes, so a failure leaves the
    /// batch exactly as it was and `settle` can be called again.
    ///
    /// # Errors
    /// `NotReady` before SETTLING, `AlreadySettled`, `InvalidReserves`,
    /// `VenueFailure`.
    pub fn settle(&mut self) -> Result<SettlementReport> {
        let phase = self.advance_phase();
        let batch_id = self.current.id;
        if self.current.settled {
            return Err(FairbatchError::AlreadySettled(batch_id));
        }
        if phase < BatchPhase::Settling {
            return Err(FairbatchError::NotReady {
                batch: batch_id,
                phase,
            });
        }

        let now = self.clock.now();
        let revealed = self.store.revealed(batch_id).to_vec();
        let sample = self.entropy_sample(now);
        let derived = self.entropy.derive_seed(batch_id, &sample);
        let order = compute_execution_order(&revealed, &derived.seed);
        let execution_root = compute_execution_root(batch_id, &derived.seed, &order, &revealed);
        let (clearing, fills) = self.execute_on_venue(batch_id, &revealed, &order)?;

        let priority_held = self.route_priority(batch_id)?;

        let report = SettlementReport {
            batch_id,
            execution_order: order,
            clearing,
            total_priority_value: self.current.total_priority_value,
            priority_collected: self.current.priority_collected,
            priority_held,
            shuffle_seed: derived.seed,
            entropy: derived.kind,
            execution_root,
            fills,
            settled_at: now,
        };

        self.current.shuffle_seed = Some(derived.seed);
        self.current.phase = BatchPhase::Settled;
        self.current.settled = true;
        self.current.settlement = Some(report.clone());

        tracing::info!(
            batch = batch_id.0,
            orders = report.execution_order.len(),
            priority_orders = report.execution_order.priority_count,
            total_priority_value = %from_wad(report.total_priority_value),
            clearing_price = ?report.clearing.map(|c| from_wad(c.price)),
            entropy = %report.entropy,
            execution_root = %hex::encode(execution_root),
            "Batch settled"
        );
        self.events.push(EngineEvent::Settled {
            batch: batch_id,
            orders: report.execution_order.len(),
            priority_orders: report.execution_order.priority_count,
            total_priority_value: report.total_priority_value,
            clearing_price: report.clearing.map(|c| c.price),
            entropy: report.entropy,
            execution_root: hex::encode(execution_root),
        });

        self.open_next_batch(now);
        Ok(report)
    }

    /// Anchor block hash if produced, otherwise the fallback inputs.
    fn entropy_sample(&self, now: DateTime<Utc>) -> EntropySample {
        if let Some(anchor_block) = self.current.entropy_anchor_block {
            if let Some(block_hash) = self.clock.block_hash(anchor_block) {
                return EntropySample::Anchored {
                    anchor_block,
                    block_hash,
                };
            }
        }
        tracing::warn!(
            batch = self.current.id.0,
            anchor_block = ?self.current.entropy_anchor_block,
            "Entropy anchor not yet produced, using fallback seed"
        );
        EntropySample::Fallback {
            previous_block_hash: self.clock.latest_block_hash(),
            timestamp_ms: now.timestamp_millis(),
            beacon: self.clock.beacon(),
        }
    }

    fn execute_on_venue(
        &self,
        batch_id: BatchId,
        revealed: &[RevealedOrder],
        order: &ExecutionOrder,
    ) -> Result<(Option<ClearingResult>, Vec<FillResult>)> {
        let Some(venue) = &self.collaborators.venue else {
            return Ok((None, Vec::new()));
        };
        let reserves = venue.reserves()?;
        let spot = reserves.spot_price()?;
        let (buys, sells) = aggregate_pressure(revealed, &self.config.market, spot)?;
        let clearing = compute_clearing_price(&buys, &sells, &reserves, &self.config.solver)?;

        let executable: Vec<ExecutableOrder> = order
            .indices
            .iter()
            .filter_map(|&idx| revealed.get(idx))
            .map(|o| ExecutableOrder {
                commitment_id: o.commitment_id,
                trader: o.trader,
                fields: o.fields.clone(),
            })
            .collect();
        if executable.is_empty() {
            return Ok((Some(clearing), Vec::new()));
        }

        let fills = venue
            .execute(batch_id, &executable, clearing.price)
            .inspect_err(|e| {
                tracing::warn!(
                    batch = batch_id.0,
                    error = %e,
                    "Venue execution failed, settlement aborted"
                );
            })?;
        Ok((Some(clearing), fills))
    }

    /// Route collected bids to the sink. Returns whether they were parked instead.
    fn route_priority(&mut self, batch_id: BatchId) -> Result<bool> {
        let amount = self.current.priority_collected;
        if amount == 0 {
            return Ok(false);
        }
        match self.collaborators.sink.route_priority(batch_id, amount) {
            Ok(()) => Ok(false),
            Err(e) => {
                tracing::warn!(
                    batch = batch_id.0,
                    amount = %from_wad(amount),
                    error = %e,
                    "Priority routing failed, holding bids"
                );
                let key = RecoveryKey::Batch(batch_id);
                self.recovery.hold(key, amount)?;
                self.events.push(EngineEvent::FundsHeld { key, amount });
                Ok(true)
            }
        }
    }

    fn open_next_batch(&mut self, now: DateTime<Utc>) {
        let next = Batch::open(self.current.id.next(), now);
        let next_id = next.id;
        let settled = std::mem::replace(&mut self.current, next);
        self.history.insert(settled.id, settled);
        self.entropy.reset();
        tracing::info!(batch = next_id.0, "Batch opened");
        self.events.push(EngineEvent::BatchOpened { batch: next_id });
    }

    fn require_settled(&self, batch_id: BatchId) -> Result<()> {
        if self.history.contains_key(&batch_id) {
            Ok(())
        } else if batch_id == self.current.id {
            Err(FairbatchError::NotReady {
                batch: batch_id,
                phase: self.current_phase(),
            })
        } else {
            Err(FairbatchError::UnknownBatch(batch_id))
        }
    }

    // -----------------------------------------------------------------------
    // Withdrawal and recovery
    // -----------------------------------------------------------------------

    /// Return the full stake of a revealed commitment once its batch settled.
    ///
    /// If the payout fails the commitment stays REVEALED and the call can
    /// be repeated.
    ///
    /// # Errors
    /// `UnknownCommitment`, `NotCommitmentOwner`, `InvalidCommitmentStatus`
    /// unless REVEALED, `NotReady` while the batch is open, and the payout's
    /// `TransferFailed`.
    pub fn withdraw(&mut self, caller: ParticipantId, id: CommitmentId) -> Result<Amount> {
        let commitment = self.store.get(&id)?;
        if commitment.depositor != caller {
            return Err(FairbatchError::NotCommitmentOwner(id));
        }
        if commitment.status != CommitmentStatus::Revealed {
            return Err(FairbatchError::InvalidCommitmentStatus {
                id,
                expected: CommitmentStatus::Revealed,
                actual: commitment.status,
            });
        }
        let (batch_id, amount) = (commitment.batch_id, commitment.escrowed);
        self.require_settled(batch_id)?;

        if let Err(e) = self.collaborators.payout.transfer(caller, amount) {
            tracing::warn!(commitment = %id, error = %e, "Withdrawal payout failed");
            return Err(e);
        }

        let commitment = self.store.get_mut(&id)?;
        commitment.book_refund(amount)?;
        commitment.mark_executed()?;
        self.conservation.record_refund(amount)?;

        tracing::debug!(
            commitment = %id,
            depositor = %caller,
            amount = %from_wad(amount),
            "Stake withdrawn"
        );
        self.events.push(EngineEvent::Withdrawn {
            commitment: id,
            depositor: caller,
            amount,
        });
        self.conservation.check(Some(self.store.get(&id)?))?;
        Ok(amount)
    }

    /// Retry delivering value parked under `key` to the sink.
    ///
    /// # Errors
    /// `NothingHeld`, or the sink's error if it refuses again (the value
    /// stays parked).
    pub fn retry_held_funds(&mut self, key: RecoveryKey) -> Result<Amount> {
        let amount = self
            .recovery
            .retry(key, self.collaborators.sink.as_ref())?;
        if let RecoveryKey::Depositor(_) = key {
            self.conservation.record_release(amount)?;
        }
        self.events
            .push(EngineEvent::HeldFundsReleased { key, amount });
        self.conservation.check(None)?;
        Ok(amount)
    }

    /// Re-sum escrow across every stored commitment and compare it with the
    /// running totals. Linear in the number of commitments ever accepted.
    ///
    /// # Errors
    /// `ConservationViolation` naming the first mismatch.
    pub fn audit_conservation(&self) -> Result<()> {
        self.conservation.audit(self.store.iter())
    }

    // -----------------------------------------------------------------------
    // Relays
    // -----------------------------------------------------------------------

    pub fn authorize_relay(&mut self, key: VerifyingKey) {
        self.relays.authorize(key);
    }

    pub fn revoke_relay(&mut self, key: &[u8; 32]) -> bool {
        self.relays.revoke(key)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Proof-of-work challenge for `caller` in the open batch.
    #[must_use]
    pub fn pow_challenge(&self, caller: ParticipantId) -> [u8; 32] {
        pow::challenge(
            caller,
            self.current.id,
            self.config.domain_id,
            &self.config.instance_tag,
        )
    }

    #[must_use]
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn current_batch(&self) -> &Batch {
        &self.current
    }

    /// A batch by ID, open or settled.
    #[must_use]
    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        if id == self.current.id {
            Some(&self.current)
        } else {
            self.history.get(&id)
        }
    }

    /// Settled batches in ID order.
    pub fn settled_batches(&self) -> impl Iterator<Item = &Batch> {
        self.history.values()
    }

    pub fn commitment(&self, id: &CommitmentId) -> Result<&Commitment> {
        self.store.get(id)
    }

    /// Revealed orders of `batch`, in reveal order.
    #[must_use]
    pub fn revealed_orders(&self, batch: BatchId) -> &[RevealedOrder] {
        self.store.revealed(batch)
    }

    #[must_use]
    pub fn held_funds(&self, key: &RecoveryKey) -> Amount {
        self.recovery.held(key)
    }

    #[must_use]
    pub fn held_total(&self) -> Amount {
        self.recovery.total()
    }

    #[must_use]
    pub fn conservation(&self) -> &StakeConservation {
        &self.conservation
    }

    /// Take all events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}
