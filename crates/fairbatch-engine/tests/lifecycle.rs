//! Integration test: batch lifecycle
//!
//! COMMIT → REVEAL → SETTLING → SETTLED
//!
//! Drives the engine through full batches against in-memory collaborators
//! and a manual clock, covering ordering, slashing, recovery and relays.

use chrono::Utc;
use ed25519_dalek::SigningKey;
use fairbatch_engine::{
    AuctionEngine, Collaborators, EngineEvent, ManualClock, RevealOutcome, RevealRequest,
};
use fairbatch_ingress::RelayAttestation;
use fairbatch_ordering::{PowAlgorithm, pow, verify_execution_root};
use fairbatch_settlement::{
    RecoveryKey, SlashReason,
    collaborators::memory::{DenyList, MemoryPayout, MemorySink, MemoryVenue},
};
use fairbatch_types::{
    AuctionConfig, BatchId, BatchPhase, CommitmentId, CommitmentStatus, DomainId, EntropyKind,
    FairbatchError, OrderFields, ParticipantId, Reserves, commitment_hash, constants::WAD,
};

const STAKE: u128 = WAD;

struct Harness {
    engine: AuctionEngine<ManualClock>,
    clock: ManualClock,
    payout: MemoryPayout,
    sink: MemorySink,
    venue: MemoryVenue,
}

fn harness_with(config: AuctionConfig, compliance: Option<DenyList>) -> Harness {
    let clock = ManualClock::new(Utc::now(), [42; 32]);
    let payout = MemoryPayout::new();
    let sink = MemorySink::new();
    let venue = MemoryVenue::new(
        config.market.clone(),
        Reserves::new(1_000 * WAD, 2_000_000 * WAD),
    );
    let mut collaborators =
        Collaborators::new(payout.clone(), sink.clone()).with_venue(venue.clone());
    if let Some(gate) = compliance {
        collaborators = collaborators.with_compliance(gate);
    }
    let engine = AuctionEngine::new(config, clock.clone(), collaborators).unwrap();
    Harness {
        engine,
        clock,
        payout,
        sink,
        venue,
    }
}

fn harness() -> Harness {
    harness_with(AuctionConfig::default(), None)
}

fn buy() -> OrderFields {
    OrderFields::new("USDC", "ETH", 2_000 * WAD, 0)
}

fn sell() -> OrderFields {
    OrderFields::new("ETH", "USDC", WAD, 0)
}

fn secret(n: u8) -> [u8; 32] {
    [n; 32]
}

impl Harness {
    fn commit(&mut self, trader: ParticipantId, fields: &OrderFields, n: u8) -> CommitmentId {
        let hash = commitment_hash(trader, fields, &secret(n));
        self.engine.commit(trader, hash, STAKE, 0).unwrap()
    }

    fn to_reveal(&self) {
        self.clock.advance_secs(8);
    }

    fn to_settling(&self) {
        self.clock.advance_secs(2);
    }

    fn reveal(
        &mut self,
        trader: ParticipantId,
        id: CommitmentId,
        fields: OrderFields,
        n: u8,
        bid: u128,
    ) -> RevealOutcome {
        self.engine
            .reveal(
                trader,
                RevealRequest::new(id, fields, secret(n)).with_bid(bid, bid),
            )
            .unwrap()
    }
}

// ---------------------------------------------------------------------------
// Full cycle
// ---------------------------------------------------------------------------

#[test]
fn full_cycle_with_venue() {
    let mut h = harness();
    let (alice, bob, carol) = (ParticipantId::new(), ParticipantId::new(), ParticipantId::new());

    let a = h.commit(alice, &buy(), 1);
    let b = h.commit(bob, &buy(), 2);
    let c = h.commit(carol, &sell(), 3);
    assert_eq!(h.engine.current_batch().commitment_count, 3);

    h.to_reveal();
    h.reveal(alice, a, buy(), 1, 0);
    let bob_outcome = h.reveal(bob, b, buy(), 2, 50);
    h.reveal(carol, c, sell(), 3, 0);
    assert_eq!(
        bob_outcome,
        RevealOutcome::Revealed {
            reveal_index: 1,
            priority_value: 50
        }
    );

    h.to_settling();
    assert_eq!(h.engine.advance_phase(), BatchPhase::Settling);
    h.clock.mine_blocks(1);
    let report = h.engine.settle().unwrap();

    assert_eq!(report.batch_id, BatchId(1));
    assert_eq!(report.entropy, EntropyKind::Anchored);
    assert_eq!(report.execution_order.len(), 3);
    assert_eq!(report.execution_order.priority(), &[1]);
    assert_eq!(report.total_priority_value, 50);
    assert_eq!(report.priority_collected, 50);
    assert!(!report.priority_held);
    assert!(report.clearing.is_some());
    assert_eq!(report.fills.len(), 3);
    assert!(report.fills.iter().all(|f| f.filled));
    assert_eq!(h.sink.priority_total(), 50);

    let executed = h.venue.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].1[0].commitment_id, b);

    let revealed = h.engine.revealed_orders(BatchId(1));
    assert!(verify_execution_root(
        BatchId(1),
        &report.shuffle_seed,
        revealed,
        &report.execution_root
    ));

    assert_eq!(h.engine.current_batch().id, BatchId(2));
    assert_eq!(h.engine.current_phase(), BatchPhase::Commit);

    for (trader, id) in [(alice, a), (bob, b), (carol, c)] {
        assert_eq!(h.engine.withdraw(trader, id).unwrap(), STAKE);
        assert_eq!(
            h.engine.commitment(&id).unwrap().status,
            CommitmentStatus::Executed
        );
    }
    assert_eq!(h.payout.total_paid(), 3 * STAKE);
    assert_eq!(h.engine.conservation().refunded(), 3 * STAKE);
}

#[test]
fn settlement_is_recorded_in_history() {
    let mut h = harness();
    h.to_reveal();
    h.to_settling();
    let report = h.engine.settle().unwrap();

    let settled: Vec<_> = h.engine.settled_batches().collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].phase, BatchPhase::Settled);
    assert_eq!(settled[0].shuffle_seed, Some(report.shuffle_seed));
    assert!(settled[0].settlement.is_some());

    let events = h.engine.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, EngineEvent::Settled { batch, .. } if *batch == BatchId(1)))
    );
    assert!(matches!(
        events.last(),
        Some(EngineEvent::BatchOpened { batch }) if *batch == BatchId(2)
    ));
    assert!(h.engine.drain_events().is_empty());
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn priority_value_sums_to_batch_total() {
    let mut h = harness();
    let traders: Vec<_> = (0..3).map(|_| ParticipantId::new()).collect();
    let ids: Vec<_> = traders
        .iter()
        .enumerate()
        .map(|(i, t)| h.commit(*t, &buy(), i as u8 + 1))
        .collect();

    h.to_reveal();
    for (i, bid) in [3u128, 0, 5].into_iter().enumerate() {
        h.reveal(traders[i], ids[i], buy(), i as u8 + 1, bid);
    }

    let total: u128 = h
        .engine
        .revealed_orders(BatchId(1))
        .iter()
        .map(|o| o.priority_value)
        .sum();
    assert_eq!(total, 8);
    assert_eq!(h.engine.current_batch().total_priority_value, 8);
    assert_eq!(h.engine.current_batch().priority_collected, 8);
}

#[test]
fn priority_orders_sorted_by_value_then_reveal_order() {
    let mut h = harness();
    let traders: Vec<_> = (0..4).map(|_| ParticipantId::new()).collect();
    let ids: Vec<_> = traders
        .iter()
        .enumerate()
        .map(|(i, t)| h.commit(*t, &sell(), i as u8 + 1))
        .collect();

    h.to_reveal();
    for (i, bid) in [5u128, 9, 0, 5].into_iter().enumerate() {
        h.reveal(traders[i], ids[i], sell(), i as u8 + 1, bid);
    }
    h.to_settling();
    let report = h.engine.settle().unwrap();

    assert_eq!(report.execution_order.priority_count, 3);
    assert_eq!(report.execution_order.priority(), &[1, 0, 3]);
    assert_eq!(report.execution_order.regular(), &[2]);
}

#[test]
fn fallback_entropy_when_anchor_not_produced() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.reveal(t, id, buy(), 1, 0);
    h.to_settling();

    let report = h.engine.settle().unwrap();
    assert_eq!(report.entropy, EntropyKind::Fallback);
    assert_eq!(
        h.engine.batch(BatchId(1)).unwrap().entropy_anchor_block,
        Some(1)
    );
}

#[test]
fn random_secrets_reproduce_execution_root() {
    let mut h = harness();
    let orders: Vec<_> = (0..6)
        .map(|i| {
            let trader = ParticipantId::new();
            let secret: [u8; 32] = rand::random();
            let fields = if i % 2 == 0 { buy() } else { sell() };
            let hash = commitment_hash(trader, &fields, &secret);
            let id = h.engine.commit(trader, hash, STAKE, 0).unwrap();
            (trader, id, fields, secret)
        })
        .collect();

    h.to_reveal();
    for (trader, id, fields, secret) in &orders {
        let outcome = h
            .engine
            .reveal(*trader, RevealRequest::new(*id, fields.clone(), *secret))
            .unwrap();
        assert!(outcome.is_revealed());
    }
    h.to_settling();
    let report = h.engine.settle().unwrap();

    let mut sorted = report.execution_order.indices.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..6).collect::<Vec<_>>());
    assert_eq!(report.execution_order.priority_count, 0);
    assert!(verify_execution_root(
        BatchId(1),
        &report.shuffle_seed,
        h.engine.revealed_orders(BatchId(1)),
        &report.execution_root
    ));
}

// ---------------------------------------------------------------------------
// Reveal validation
// ---------------------------------------------------------------------------

#[test]
fn hash_mismatch_slashes_instead_of_erroring() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();

    let outcome = h
        .engine
        .reveal(t, RevealRequest::new(id, buy(), secret(99)).with_bid(100, 100))
        .unwrap();
    let RevealOutcome::Slashed(receipt) = outcome else {
        panic!("expected slash, got {outcome:?}");
    };
    assert_eq!(receipt.reason, SlashReason::InvalidReveal);
    assert_eq!(receipt.slashed, STAKE / 2);
    assert_eq!(receipt.refunded, STAKE / 2);
    assert!(!receipt.rolled_back);

    assert_eq!(h.sink.slashed_total(), STAKE / 2);
    assert_eq!(h.payout.paid_to(t), STAKE / 2 + 100);
    assert_eq!(
        h.engine.commitment(&id).unwrap().status,
        CommitmentStatus::Slashed
    );
    assert!(h.engine.revealed_orders(BatchId(1)).is_empty());
    assert_eq!(h.engine.current_batch().priority_collected, 0);
}

#[test]
fn reveal_structural_errors() {
    let mut h = harness();
    let (owner, other) = (ParticipantId::new(), ParticipantId::new());
    let id = h.commit(owner, &buy(), 1);

    let err = h
        .engine
        .reveal(owner, RevealRequest::new(id, buy(), secret(1)))
        .unwrap_err();
    assert!(matches!(
        err,
        FairbatchError::WrongPhase {
            expected: BatchPhase::Reveal,
            actual: BatchPhase::Commit
        }
    ));

    h.to_reveal();
    let err = h
        .engine
        .reveal(other, RevealRequest::new(id, buy(), secret(1)))
        .unwrap_err();
    assert!(matches!(err, FairbatchError::NotCommitmentOwner(_)));

    let err = h
        .engine
        .reveal(owner, RevealRequest::new(id, buy(), secret(1)).with_bid(10, 5))
        .unwrap_err();
    assert!(matches!(err, FairbatchError::InsufficientPayment { bid: 10, paid: 5 }));

    let unknown = CommitmentId([7; 32]);
    let err = h
        .engine
        .reveal(owner, RevealRequest::new(unknown, buy(), secret(1)))
        .unwrap_err();
    assert!(matches!(err, FairbatchError::UnknownCommitment(_)));

    h.reveal(owner, id, buy(), 1, 0);
    let err = h
        .engine
        .reveal(owner, RevealRequest::new(id, buy(), secret(1)))
        .unwrap_err();
    assert!(matches!(
        err,
        FairbatchError::InvalidCommitmentStatus {
            actual: CommitmentStatus::Revealed,
            ..
        }
    ));
}

#[test]
fn reveal_of_previous_batch_rejected() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.to_settling();
    h.engine.settle().unwrap();

    h.to_reveal();
    let err = h
        .engine
        .reveal(t, RevealRequest::new(id, buy(), secret(1)))
        .unwrap_err();
    assert!(matches!(
        err,
        FairbatchError::WrongBatch {
            owner: BatchId(1),
            current: BatchId(2),
            ..
        }
    ));
}

#[test]
fn failed_overpayment_refund_keeps_reveal() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.payout.set_failing(true);
    h.engine.drain_events();

    let outcome = h
        .engine
        .reveal(t, RevealRequest::new(id, buy(), secret(1)).with_bid(10, 25))
        .unwrap();
    assert!(outcome.is_revealed());
    let events = h.engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::RefundFailed { participant, amount: 15 } if *participant == t
    )));
}

// ---------------------------------------------------------------------------
// Proof of work
// ---------------------------------------------------------------------------

#[test]
fn proof_of_work_buys_priority_once() {
    let mut h = harness();
    let t = ParticipantId::new();
    let first = h.commit(t, &buy(), 1);
    let second = h.commit(t, &buy(), 2);
    h.to_reveal();

    let challenge = h.engine.pow_challenge(t);
    let proof = pow::mine(PowAlgorithm::Keccak256, &challenge, 8, 1_000_000).unwrap();

    let outcome = h
        .engine
        .reveal_with_proof_of_work(t, RevealRequest::new(first, buy(), secret(1)), &proof, 8)
        .unwrap();
    assert_eq!(
        outcome,
        RevealOutcome::Revealed {
            reveal_index: 0,
            priority_value: WAD / 10_000
        }
    );

    let err = h
        .engine
        .reveal_with_proof_of_work(t, RevealRequest::new(second, buy(), secret(2)), &proof, 8)
        .unwrap_err();
    assert!(matches!(err, FairbatchError::ReplayedProof { .. }));
    assert_eq!(
        h.engine.commitment(&second).unwrap().status,
        CommitmentStatus::Committed
    );

    // PoW value ranks but is not collected.
    assert_eq!(h.engine.current_batch().priority_collected, 0);
    assert_eq!(h.engine.current_batch().total_priority_value, WAD / 10_000);
}

#[test]
fn proof_below_floor_earns_nothing() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();

    let challenge = h.engine.pow_challenge(t);
    let proof = pow::mine(PowAlgorithm::Sha256, &challenge, 4, 100_000).unwrap();
    let outcome = h
        .engine
        .reveal_with_proof_of_work(t, RevealRequest::new(id, buy(), secret(1)), &proof, 4)
        .unwrap();
    assert_eq!(
        outcome,
        RevealOutcome::Revealed {
            reveal_index: 0,
            priority_value: 0
        }
    );
}

#[test]
fn overstated_difficulty_rejected() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();

    let proof = pow::ProofOfWork {
        nonce: [0; 32],
        algorithm: PowAlgorithm::Keccak256,
    };
    let err = h
        .engine
        .reveal_with_proof_of_work(t, RevealRequest::new(id, buy(), secret(1)), &proof, 200)
        .unwrap_err();
    assert!(matches!(err, FairbatchError::InvalidProof { claimed: 200, .. }));
    assert_eq!(
        h.engine.commitment(&id).unwrap().status,
        CommitmentStatus::Committed
    );
}

// ---------------------------------------------------------------------------
// Relays
// ---------------------------------------------------------------------------

#[test]
fn relayed_reveal_carries_origin_domain() {
    let mut h = harness();
    let relay = SigningKey::from_bytes(&[9; 32]);
    h.engine.authorize_relay(relay.verifying_key());

    let originator = ParticipantId::new();
    let id = h.commit(originator, &sell(), 1);
    h.to_reveal();

    let attestation = RelayAttestation::sign(&relay, id, originator, DomainId(7));
    let outcome = h
        .engine
        .reveal_via_relay(&attestation, RevealRequest::new(id, sell(), secret(1)))
        .unwrap();
    assert!(outcome.is_revealed());
    let revealed = h.engine.revealed_orders(BatchId(1));
    assert_eq!(revealed[0].origin_domain, DomainId(7));
    assert_eq!(revealed[0].trader, originator);
}

#[test]
fn relay_must_be_authorized_and_match() {
    let mut h = harness();
    let relay = SigningKey::from_bytes(&[9; 32]);
    let rogue = SigningKey::from_bytes(&[10; 32]);
    h.engine.authorize_relay(relay.verifying_key());

    let originator = ParticipantId::new();
    let id = h.commit(originator, &sell(), 1);
    let other = h.commit(originator, &sell(), 2);
    h.to_reveal();

    let forged = RelayAttestation::sign(&rogue, id, originator, DomainId(7));
    let err = h
        .engine
        .reveal_via_relay(&forged, RevealRequest::new(id, sell(), secret(1)))
        .unwrap_err();
    assert!(matches!(err, FairbatchError::UnauthorizedRelay { .. }));

    let mismatched = RelayAttestation::sign(&relay, other, originator, DomainId(7));
    let err = h
        .engine
        .reveal_via_relay(&mismatched, RevealRequest::new(id, sell(), secret(1)))
        .unwrap_err();
    assert!(matches!(err, FairbatchError::InvalidRelaySignature));

    assert!(h.engine.revoke_relay(&relay.verifying_key().to_bytes()));
    let honest = RelayAttestation::sign(&relay, id, originator, DomainId(7));
    let err = h
        .engine
        .reveal_via_relay(&honest, RevealRequest::new(id, sell(), secret(1)))
        .unwrap_err();
    assert!(matches!(err, FairbatchError::UnauthorizedRelay { .. }));
}

// ---------------------------------------------------------------------------
// Commit admission
// ---------------------------------------------------------------------------

#[test]
fn commit_admission_checks() {
    let mut config = AuctionConfig::default();
    config.stake.max_commits_per_participant = 2;
    let deny = DenyList::new();
    let banned = ParticipantId::new();
    deny.deny(banned);
    let mut h = harness_with(config, Some(deny));

    let err = h.engine.commit(banned, [1; 32], STAKE, 0).unwrap_err();
    assert!(matches!(err, FairbatchError::ComplianceRejected { .. }));

    let t = ParticipantId::new();
    let err = h.engine.commit(t, [1; 32], 1, 0).unwrap_err();
    assert!(matches!(err, FairbatchError::InsufficientStake { .. }));

    // Collateral floor scales with the estimate: 5% of 100.
    let err = h.engine.commit(t, [1; 32], STAKE, 100 * WAD).unwrap_err();
    assert!(matches!(
        err,
        FairbatchError::InsufficientStake {
            required,
            ..
        } if required == 5 * WAD
    ));

    h.engine.commit(t, [1; 32], STAKE, 0).unwrap();
    let err = h.engine.commit(t, [1; 32], STAKE, 0).unwrap_err();
    assert!(matches!(err, FairbatchError::DuplicateCommitment(_)));
    h.engine.commit(t, [2; 32], STAKE, 0).unwrap();
    let err = h.engine.commit(t, [3; 32], STAKE, 0).unwrap_err();
    assert!(matches!(err, FairbatchError::CommitLimitExceeded { count: 2, .. }));

    assert_eq!(h.engine.conservation().deposited(), 2 * STAKE);
}

// ---------------------------------------------------------------------------
// Withdrawal and slashing after settlement
// ---------------------------------------------------------------------------

#[test]
fn withdraw_requires_settled_batch() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.reveal(t, id, buy(), 1, 0);

    let err = h.engine.withdraw(t, id).unwrap_err();
    assert!(matches!(
        err,
        FairbatchError::NotReady {
            phase: BatchPhase::Reveal,
            ..
        }
    ));

    h.to_settling();
    h.engine.settle().unwrap();
    assert!(matches!(
        h.engine.withdraw(ParticipantId::new(), id).unwrap_err(),
        FairbatchError::NotCommitmentOwner(_)
    ));

    h.payout.set_failing(true);
    assert!(matches!(
        h.engine.withdraw(t, id).unwrap_err(),
        FairbatchError::TransferFailed { .. }
    ));
    assert_eq!(
        h.engine.commitment(&id).unwrap().status,
        CommitmentStatus::Revealed
    );

    h.payout.set_failing(false);
    assert_eq!(h.engine.withdraw(t, id).unwrap(), STAKE);
    assert!(matches!(
        h.engine.withdraw(t, id).unwrap_err(),
        FairbatchError::InvalidCommitmentStatus {
            actual: CommitmentStatus::Executed,
            ..
        }
    ));
}

#[test]
fn unrevealed_commitment_slashed_after_settlement() {
    let mut h = harness();
    let (quiet, honest) = (ParticipantId::new(), ParticipantId::new());
    let silent = h.commit(quiet, &buy(), 1);
    let revealed = h.commit(honest, &buy(), 2);

    assert!(matches!(
        h.engine.slash_unrevealed(silent).unwrap_err(),
        FairbatchError::NotReady { .. }
    ));

    h.to_reveal();
    h.reveal(honest, revealed, buy(), 2, 0);
    h.to_settling();
    h.engine.settle().unwrap();

    let receipt = h.engine.slash_unrevealed(silent).unwrap();
    assert_eq!(receipt.reason, SlashReason::Unrevealed);
    assert_eq!(receipt.slashed, STAKE / 2);
    assert_eq!(h.payout.paid_to(quiet), STAKE / 2);
    assert_eq!(h.sink.slashes(), vec![(quiet, STAKE / 2)]);

    assert!(matches!(
        h.engine.slash_unrevealed(revealed).unwrap_err(),
        FairbatchError::InvalidCommitmentStatus {
            actual: CommitmentStatus::Revealed,
            ..
        }
    ));
    assert!(matches!(
        h.engine.slash_unrevealed(silent).unwrap_err(),
        FairbatchError::InvalidCommitmentStatus {
            actual: CommitmentStatus::Slashed,
            ..
        }
    ));
}

#[test]
fn refund_failure_rolls_slash_back() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.to_settling();
    h.engine.settle().unwrap();

    h.payout.set_failing(true);
    let receipt = h.engine.slash_unrevealed(id).unwrap();
    assert!(receipt.rolled_back);
    assert_eq!(
        h.engine.commitment(&id).unwrap().status,
        CommitmentStatus::Committed
    );
    assert_eq!(h.sink.slashed_total(), 0);

    h.payout.set_failing(false);
    let receipt = h.engine.slash_unrevealed(id).unwrap();
    assert!(!receipt.rolled_back);
    assert_eq!(h.sink.slashed_total(), STAKE / 2);
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[test]
fn refused_forfeit_is_held_and_retried() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.to_settling();
    h.engine.settle().unwrap();

    h.sink.set_failing(true);
    let receipt = h.engine.slash_unrevealed(id).unwrap();
    assert_eq!(receipt.held, STAKE / 2);
    let key = RecoveryKey::Depositor(t);
    assert_eq!(h.engine.held_funds(&key), STAKE / 2);
    assert_eq!(h.engine.conservation().held(), STAKE / 2);

    assert!(h.engine.retry_held_funds(key).is_err());
    assert_eq!(h.engine.held_funds(&key), STAKE / 2);

    h.sink.set_failing(false);
    assert_eq!(h.engine.retry_held_funds(key).unwrap(), STAKE / 2);
    assert_eq!(h.engine.held_total(), 0);
    assert_eq!(h.sink.slashed_total(), STAKE / 2);
    assert_eq!(h.engine.conservation().routed(), STAKE / 2);
    assert!(matches!(
        h.engine.retry_held_funds(key).unwrap_err(),
        FairbatchError::NothingHeld { .. }
    ));
}

#[test]
fn refused_priority_bids_held_under_batch() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.reveal(t, id, buy(), 1, 40);
    h.to_settling();

    h.sink.set_failing(true);
    let report = h.engine.settle().unwrap();
    assert!(report.priority_held);
    let key = RecoveryKey::Batch(BatchId(1));
    assert_eq!(h.engine.held_funds(&key), 40);

    h.sink.set_failing(false);
    assert_eq!(h.engine.retry_held_funds(key).unwrap(), 40);
    assert_eq!(h.sink.priority_total(), 40);
}

#[test]
fn venue_failure_leaves_batch_unsettled() {
    let mut h = harness();
    let t = ParticipantId::new();
    let id = h.commit(t, &buy(), 1);
    h.to_reveal();
    h.reveal(t, id, buy(), 1, 30);
    h.to_settling();

    h.venue.set_failing(true);
    assert!(matches!(
        h.engine.settle().unwrap_err(),
        FairbatchError::VenueFailure { .. }
    ));
    assert_eq!(h.engine.current_batch().id, BatchId(1));
    assert!(!h.engine.current_batch().settled);
    assert_eq!(h.engine.current_phase(), BatchPhase::Settling);
    assert_eq!(h.sink.priority_total(), 0);

    h.venue.set_failing(false);
    let report = h.engine.settle().unwrap();
    assert_eq!(report.batch_id, BatchId(1));
    assert_eq!(h.sink.priority_total(), 30);
}

#[test]
fn settle_before_reveal_closes_is_not_ready() {
    let mut h = harness();
    h.to_reveal();
    assert!(matches!(
        h.engine.settle().unwrap_err(),
        FairbatchError::NotReady {
            batch: BatchId(1),
            phase: BatchPhase::Reveal
        }
    ));
    assert!(matches!(
        h.engine.commit(ParticipantId::new(), [1; 32], STAKE, 0).unwrap_err(),
        FairbatchError::WrongPhase { .. }
    ));
}

// ---------------------------------------------------------------------------
// Conservation
// ---------------------------------------------------------------------------

#[test]
fn every_stake_unit_accounted_for() {
    let mut h = harness();
    let traders: Vec<_> = (0..4).map(|_| ParticipantId::new()).collect();
    let ids: Vec<_> = traders
        .iter()
        .enumerate()
        .map(|(i, t)| h.commit(*t, &sell(), i as u8 + 1))
        .collect();

    h.to_reveal();
    h.reveal(traders[0], ids[0], sell(), 1, 0);
    // Wrong secret: slashed at reveal.
    h.reveal(traders[1], ids[1], sell(), 77, 0);
    h.reveal(traders[2], ids[2], sell(), 3, 0);
    h.to_settling();
    h.engine.settle().unwrap();

    h.engine.withdraw(traders[0], ids[0]).unwrap();
    h.sink.set_failing(true);
    h.engine.slash_unrevealed(ids[3]).unwrap();

    let c = h.engine.conservation();
    assert_eq!(c.deposited(), 4 * STAKE);
    assert_eq!(c.refunded(), STAKE + STAKE / 2 + STAKE / 2);
    assert_eq!(c.routed(), STAKE / 2);
    assert_eq!(c.held(), STAKE / 2);
    assert_eq!(c.expected_escrow().unwrap(), STAKE);
    assert_eq!(c.escrowed(), STAKE);
    h.engine.audit_conservation().unwrap();
    assert_eq!(
        h.engine.commitment(&ids[2]).unwrap().escrowed,
        STAKE
    );
}
