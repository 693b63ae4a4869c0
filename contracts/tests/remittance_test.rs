//! Integration tests for the remittance escrow.
//!
//! These exercise the escrow end to end: key derivation on both sides,
//! claims with tax withholding, claim-back timing, failed settlement and
//! racing claimants.

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use remit_contracts::{EscrowLedger, LedgerError, RemittanceEvent};
use remit_protocol::clock::{Clock, ManualClock};
use remit_protocol::config::EscrowConfig;
use remit_protocol::transfer::{InMemoryBank, TransferError};
use remit_protocol::{derive_key, hash_password, ClaimRequest, PartyId};

fn party(s: &str) -> PartyId {
    PartyId::new(s).unwrap()
}

struct Fixture {
    ledger: Arc<EscrowLedger>,
    clock: Arc<ManualClock>,
    bank: Arc<InMemoryBank>,
}

fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::starting_now());
    let bank = Arc::new(InMemoryBank::new());
    let ledger = Arc::new(
        EscrowLedger::new(
            party("owner"),
            EscrowConfig::default(),
            clock.clone(),
            bank.clone(),
        )
        .unwrap(),
    );
    Fixture { ledger, clock, bank }
}

/// The depositor derives the key from the commitments alone; the receiver
/// later presents the same inputs as a `ClaimRequest`.
fn depositor_key(sender_pw: &str, receiver_pw: &str) -> remit_protocol::LookupKey {
    derive_key(
        &hash_password(sender_pw),
        &hash_password(receiver_pw),
        &party("alice"),
        &party("bob"),
    )
}

fn claim_request(sender_pw: &str, receiver_pw: &str) -> ClaimRequest {
    ClaimRequest::from_passwords(sender_pw, receiver_pw, party("alice"), party("bob"))
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

#[test]
fn deposit_then_query_reports_amount() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();
    assert_eq!(f.ledger.query_funds(&key), 142);
}

#[test]
fn second_deposit_on_same_key_is_rejected() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();

    let err = f.ledger.deposit(key, 1_000, &party("carol")).unwrap_err();
    assert_eq!(err, LedgerError::DuplicateKey(key));
    assert_eq!(f.ledger.query_funds(&key), 142);
    assert_eq!(f.ledger.query_record(&key).unwrap().depositor, party("alice"));
}

#[test]
fn unknown_key_reads_as_empty() {
    let f = fixture();
    let key = depositor_key("nobody", "home");
    assert_eq!(f.ledger.query_funds(&key), 0);
    assert!(f.ledger.query_record(&key).is_none());
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

#[test]
fn receiver_claims_amount_minus_tax() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();

    let payout = f.ledger.claim(&claim_request("s3cret", "r3cret"), &party("bob")).unwrap();

    assert_eq!(payout, 42);
    assert_eq!(f.ledger.query_funds(&key), 0);
    assert_eq!(f.bank.native_received(&party("bob")), 42);
    assert_eq!(f.bank.native_received(&party("owner")), 100);
}

#[test]
fn wrong_password_finds_nothing() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();

    let err = f
        .ledger
        .claim(&claim_request("s3cret", "guess"), &party("bob"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    assert_eq!(f.ledger.query_funds(&key), 142);
}

#[test]
fn swapped_identities_find_nothing() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();

    let swapped = ClaimRequest::from_passwords("s3cret", "r3cret", party("bob"), party("alice"));
    assert!(matches!(
        f.ledger.claim(&swapped, &party("alice")),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn non_receiver_cannot_claim_even_with_passwords() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();

    let err = f
        .ledger
        .claim(&claim_request("s3cret", "r3cret"), &party("mallory"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));
    assert_eq!(f.ledger.query_funds(&key), 142);
    assert!(f.bank.journal().is_empty());
}

#[test]
fn amount_not_above_tax_cannot_be_claimed() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 99, &party("alice")).unwrap();

    assert!(matches!(
        f.ledger.claim(&claim_request("s3cret", "r3cret"), &party("bob")),
        Err(LedgerError::InsufficientFunds { available: 99, .. })
    ));
    assert_eq!(f.ledger.query_funds(&key), 99);
}

#[test]
fn claimed_escrow_cannot_be_claimed_again() {
    let f = fixture();
    let req = claim_request("s3cret", "r3cret");
    f.ledger.deposit(req.lookup_key(), 142, &party("alice")).unwrap();
    f.ledger.claim(&req, &party("bob")).unwrap();

    assert!(matches!(
        f.ledger.claim(&req, &party("bob")),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn failed_settlement_pays_nobody() {
    let f = fixture();
    let req = claim_request("s3cret", "r3cret");
    f.ledger.deposit(req.lookup_key(), 142, &party("alice")).unwrap();
    f.ledger.drain_events();

    f.bank.fail_with(TransferError::Rejected("frozen".into()));
    let err = f.ledger.claim(&req, &party("bob")).unwrap_err();

    assert_eq!(
        err,
        LedgerError::TransferFailed(TransferError::Rejected("frozen".into()))
    );
    assert_eq!(f.ledger.query_funds(&req.lookup_key()), 142);
    assert_eq!(f.bank.native_received(&party("owner")), 0);
    assert!(f.ledger.drain_events().is_empty());
}

// ---------------------------------------------------------------------------
// Claim Back
// ---------------------------------------------------------------------------

#[test]
fn claim_back_before_window_fails() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();
    let available_at = f.clock.now() + f.ledger.query_claim_back_window();

    f.clock.advance(Duration::days(3));
    let err = f.ledger.claim_back(&key, &party("alice")).unwrap_err();
    assert_eq!(err, LedgerError::NotYetExpired { available_at });
}

#[test]
fn claim_back_after_window_returns_everything() {
    let f = fixture();
    let key = depositor_key("s3cret", "r3cret");
    f.ledger.deposit(key, 142, &party("alice")).unwrap();

    f.clock.advance(Duration::days(7) + Duration::minutes(1));
    assert_eq!(f.ledger.claim_back(&key, &party("alice")).unwrap(), 142);
    assert_eq!(f.bank.native_received(&party("alice")), 142);
    assert_eq!(f.bank.native_received(&party("owner")), 0);
    assert_eq!(f.ledger.query_funds(&key), 0);

    assert!(matches!(
        f.ledger.claim_back(&key, &party("alice")),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn receiver_can_still_claim_after_window() {
    let f = fixture();
    let req = claim_request("s3cret", "r3cret");
    f.ledger.deposit(req.lookup_key(), 142, &party("alice")).unwrap();

    f.clock.advance(Duration::days(30));
    assert_eq!(f.ledger.claim(&req, &party("bob")).unwrap(), 42);
    assert!(matches!(
        f.ledger.claim_back(&req.lookup_key(), &party("alice")),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn custom_window_is_honoured() {
    let clock = Arc::new(ManualClock::starting_now());
    let bank = Arc::new(InMemoryBank::new());
    let config = EscrowConfig {
        claim_back_window_secs: 60,
        ..EscrowConfig::default()
    };
    let ledger = EscrowLedger::new(party("owner"), config, clock.clone(), bank).unwrap();
    let key = depositor_key("s3cret", "r3cret");
    ledger.deposit(key, 500, &party("alice")).unwrap();

    assert_eq!(ledger.query_claim_back_window(), Duration::seconds(60));
    clock.advance(Duration::seconds(60));
    assert_eq!(ledger.claim_back(&key, &party("alice")).unwrap(), 500);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn event_journal_records_lifecycle() {
    let f = fixture();
    let req = claim_request("s3cret", "r3cret");
    let key = req.lookup_key();
    f.ledger.deposit(key, 142, &party("alice")).unwrap();
    f.ledger.claim(&req, &party("bob")).unwrap();

    let events = f.ledger.drain_events();
    assert_eq!(
        events,
        vec![
            RemittanceEvent::DepositRecorded {
                depositor: party("alice"),
                amount: 142,
                key,
            },
            RemittanceEvent::ClaimPerformed {
                claimant: party("bob"),
                recipient: party("bob"),
                amount: 42,
                tax: 100,
                key,
            },
        ]
    );

    let json = serde_json::to_value(&events[1]).unwrap();
    assert_eq!(json["event"], "claim_performed");
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn racing_claims_pay_exactly_once() {
    let f = fixture();
    let req = claim_request("s3cret", "r3cret");
    f.ledger.deposit(req.lookup_key(), 10_000, &party("alice")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = f.ledger.clone();
            let req = req.clone();
            thread::spawn(move || ledger.claim(&req, &party("bob")))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, LedgerError::NotFound(_))));
    assert_eq!(f.bank.native_received(&party("bob")), 9_900);
    assert_eq!(f.bank.native_received(&party("owner")), 100);
}

#[test]
fn claim_racing_claim_back_pays_exactly_once() {
    let f = fixture();
    let req = claim_request("s3cret", "r3cret");
    let key = req.lookup_key();
    f.ledger.deposit(key, 1_000, &party("alice")).unwrap();
    f.clock.advance(Duration::days(8));

    let claimer = {
        let ledger = f.ledger.clone();
        let req = req.clone();
        thread::spawn(move || ledger.claim(&req, &party("bob")).is_ok())
    };
    let reclaimer = {
        let ledger = f.ledger.clone();
        thread::spawn(move || ledger.claim_back(&key, &party("alice")).is_ok())
    };

    let claimed = claimer.join().unwrap();
    let reclaimed = reclaimer.join().unwrap();
    assert!(claimed ^ reclaimed);

    let paid_out = f.bank.native_received(&party("bob"))
        + f.bank.native_received(&party("alice"))
        + f.bank.native_received(&party("owner"));
    assert_eq!(paid_out, 1_000);
}
