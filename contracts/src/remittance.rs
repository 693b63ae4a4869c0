//! # Remittance Escrow Ledger
//!
//! Holds native value under hash-locked keys until the intended receiver
//! claims it, or until the depositor takes it back after the claim-back
//! window. The lifecycle of a single record is:
//!
//! 1. **Deposit**: the depositor locks `amount` under a [`LookupKey`] it
//!    derived from both password commitments and both party ids.
//! 2. **Claim**: the receiver presents the same four inputs. The ledger
//!    re-derives the key, withholds the owner tax, and pays the rest.
//! 3. **Claim back**: once `claim_back_available_at` has passed, the
//!    depositor recovers the full amount, untaxed.
//!
//! Claim and claim-back both delete the record. There is no partial
//! release and no way back from either.
//!
//! ```text
//!            deposit
//!   (none) ----------> Active --claim--------------------> (deleted)
//!                        |
//!                        +--claim_back (after window)----> (deleted)
//! ```
//!
//! ## Settlement
//!
//! A claim produces two payments: the payout to the recipient and the tax
//! to the owner. They go to the [`ValueTransfer`] primitive as one
//! settlement. The record is only removed after the primitive reports
//! success, so a failed settlement leaves the escrow claimable.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use remit_protocol::clock::Clock;
use remit_protocol::config::EscrowConfig;
use remit_protocol::transfer::{Payment, ValueTransfer};
use remit_protocol::{ClaimRequest, LookupKey, PartyId, Value};

use crate::error::LedgerError;
use crate::events::RemittanceEvent;
use crate::ownership::Ownership;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One active escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Party that made the deposit and receives it on claim-back.
    pub depositor: PartyId,
    /// Native value still held. Always positive while the record exists.
    pub funds_remaining: Value,
    /// When the deposit was recorded.
    pub created_at: DateTime<Utc>,
    /// Earliest instant a claim-back succeeds.
    pub claim_back_available_at: DateTime<Utc>,
}

/// Serializable image of an [`EscrowLedger`].
///
/// Records are sorted by key so that equal ledgers produce byte-identical
/// snapshots. Undrained events are not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    pub owner: PartyId,
    pub config: EscrowConfig,
    pub records: Vec<(LookupKey, EscrowRecord)>,
}

#[derive(Debug)]
struct EscrowState {
    ownership: Ownership,
    records: HashMap<LookupKey, EscrowRecord>,
    events: Vec<RemittanceEvent>,
}

// ---------------------------------------------------------------------------
// EscrowLedger
// ---------------------------------------------------------------------------

/// The remittance escrow.
///
/// All mutating operations hold the write lock from validation through
/// settlement to the emitted event, so two racing claims on one key cannot
/// both pay.
pub struct EscrowLedger {
    state: RwLock<EscrowState>,
    config: EscrowConfig,
    claim_back_window: Duration,
    clock: Arc<dyn Clock>,
    bank: Arc<dyn ValueTransfer>,
}

impl std::fmt::Debug for EscrowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("EscrowLedger")
            .field("owner", state.ownership.owner())
            .field("config", &self.config)
            .field("records", &state.records.len())
            .finish()
    }
}

fn checked_window(config: &EscrowConfig) -> Result<Duration, LedgerError> {
    config
        .claim_back_window()
        .ok_or(LedgerError::InvalidClaimBackWindow {
            secs: config.claim_back_window_secs,
        })
}

impl EscrowLedger {
    /// Creates an empty escrow ledger.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidClaimBackWindow`] if the window is negative or
    /// too large to add to a timestamp.
    pub fn new(
        owner: PartyId,
        config: EscrowConfig,
        clock: Arc<dyn Clock>,
        bank: Arc<dyn ValueTransfer>,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            state: RwLock::new(EscrowState {
                ownership: Ownership::new(owner),
                records: HashMap::new(),
                events: Vec::new(),
            }),
            claim_back_window: checked_window(&config)?,
            config,
            clock,
            bank,
        })
    }

    /// Rebuilds a ledger from a snapshot taken by [`snapshot`](Self::snapshot).
    ///
    /// The stored config is validated the same way as in [`new`](Self::new).
    pub fn restore(
        snapshot: EscrowSnapshot,
        clock: Arc<dyn Clock>,
        bank: Arc<dyn ValueTransfer>,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            claim_back_window: checked_window(&snapshot.config)?,
            state: RwLock::new(EscrowState {
                ownership: Ownership::new(snapshot.owner),
                records: snapshot.records.into_iter().collect(),
                events: Vec::new(),
            }),
            config: snapshot.config,
            clock,
            bank,
        })
    }

    /// Locks `amount` of native value under `key`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero.
    /// - [`LedgerError::DuplicateKey`] if a record already exists under `key`.
    /// - [`LedgerError::AmountOverflow`] if the claim-back instant is not
    ///   representable.
    pub fn deposit(
        &self,
        key: LookupKey,
        amount: Value,
        depositor: &PartyId,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let now = self.clock.now();
        let mut state = self.state.write();
        if state.records.contains_key(&key) {
            warn!(key = %key.short(), depositor = %depositor, "deposit onto existing key rejected");
            return Err(LedgerError::DuplicateKey(key));
        }

        let claim_back_available_at = now
            .checked_add_signed(self.claim_back_window)
            .ok_or(LedgerError::AmountOverflow)?;

        state.records.insert(
            key,
            EscrowRecord {
                depositor: depositor.clone(),
                funds_remaining: amount,
                created_at: now,
                claim_back_available_at,
            },
        );
        state.events.push(RemittanceEvent::DepositRecorded {
            depositor: depositor.clone(),
            amount,
            key,
        });

        info!(
            key = %key.short(),
            depositor = %depositor,
            amount = %amount,
            claim_back_at = %claim_back_available_at,
            "escrow deposit recorded"
        );
        Ok(())
    }

    /// Claims the escrow described by `request` and pays it to `caller`.
    ///
    /// Returns the payout, which is the escrowed amount minus the owner tax.
    pub fn claim(&self, request: &ClaimRequest, caller: &PartyId) -> Result<Value, LedgerError> {
        self.claim_on_behalf(request, caller, caller, |_| Ok(()))
            .map(|(payout, ())| payout)
    }

    /// Claims with separate authorization and payout identities.
    ///
    /// `authorized` must be the request's receiver. The payout is settled to
    /// `recipient`, which for the exchange is its own account. `prepare`
    /// receives the payout amount after every check has passed and before
    /// settlement; an error from it aborts the claim untouched.
    ///
    /// The ledger trusts `authorized` as given. Whoever calls this must have
    /// authenticated it as the originator of the request; anyone able to
    /// name the receiver here can redirect the payout to any `recipient`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if no record exists under the derived key.
    /// - [`LedgerError::Unauthorized`] if `authorized` is not the receiver.
    /// - [`LedgerError::InsufficientFunds`] if the funds do not exceed the tax.
    /// - [`LedgerError::TransferFailed`] if settlement fails.
    /// - Whatever `prepare` returns.
    pub fn claim_on_behalf<T, F>(
        &self,
        request: &ClaimRequest,
        authorized: &PartyId,
        recipient: &PartyId,
        prepare: F,
    ) -> Result<(Value, T), LedgerError>
    where
        F: FnOnce(Value) -> Result<T, LedgerError>,
    {
        let key = request.lookup_key();
        let mut state = self.state.write();

        let funds = match state.records.get(&key) {
            Some(record) => record.funds_remaining,
            None => {
                debug!(key = %key.short(), "claim on unknown key");
                return Err(LedgerError::NotFound(key));
            }
        };

        if authorized != &request.receiver {
            warn!(key = %key.short(), caller = %authorized, "claim by non-receiver rejected");
            return Err(LedgerError::Unauthorized {
                party: authorized.clone(),
                action: "claim this escrow",
            });
        }

        let tax = self.config.owner_tax;
        if funds <= tax {
            return Err(LedgerError::InsufficientFunds {
                available: funds,
                required: tax.saturating_add(1),
            });
        }
        let payout = funds - tax;

        let prepared = prepare(payout)?;

        let mut payments = vec![Payment::new(recipient.clone(), payout)];
        if tax > 0 {
            payments.push(Payment::new(state.ownership.owner().clone(), tax));
        }
        if let Err(err) = self.bank.settle(&payments) {
            warn!(key = %key.short(), error = %err, "claim settlement failed");
            return Err(err.into());
        }

        state.records.remove(&key);
        state.events.push(RemittanceEvent::ClaimPerformed {
            claimant: authorized.clone(),
            recipient: recipient.clone(),
            amount: payout,
            tax,
            key,
        });

        info!(
            key = %key.short(),
            claimant = %authorized,
            recipient = %recipient,
            payout = %payout,
            tax = %tax,
            "escrow claimed"
        );
        Ok((payout, prepared))
    }

    /// Returns an expired escrow to its depositor, in full.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if no record exists under `key`.
    /// - [`LedgerError::Unauthorized`] if `caller` is not the depositor.
    /// - [`LedgerError::NotYetExpired`] before the claim-back instant.
    /// - [`LedgerError::TransferFailed`] if the payment fails.
    pub fn claim_back(&self, key: &LookupKey, caller: &PartyId) -> Result<Value, LedgerError> {
        let now = self.clock.now();
        let mut state = self.state.write();

        let record = match state.records.get(key) {
            Some(record) => record.clone(),
            None => {
                debug!(key = %key.short(), "claim-back on unknown key");
                return Err(LedgerError::NotFound(*key));
            }
        };

        if caller != &record.depositor {
            warn!(key = %key.short(), caller = %caller, "claim-back by non-depositor rejected");
            return Err(LedgerError::Unauthorized {
                party: caller.clone(),
                action: "claim back this escrow",
            });
        }

        if now < record.claim_back_available_at {
            return Err(LedgerError::NotYetExpired {
                available_at: record.claim_back_available_at,
            });
        }

        if let Err(err) = self.bank.pay(&record.depositor, record.funds_remaining) {
            warn!(key = %key.short(), error = %err, "claim-back payment failed");
            return Err(err.into());
        }

        state.records.remove(key);
        state.events.push(RemittanceEvent::ClaimBackPerformed {
            depositor: record.depositor.clone(),
            amount: record.funds_remaining,
            key: *key,
        });

        info!(
            key = %key.short(),
            depositor = %record.depositor,
            amount = %record.funds_remaining,
            "escrow claimed back"
        );
        Ok(record.funds_remaining)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Funds held under `key`, zero when there is no record.
    pub fn query_funds(&self, key: &LookupKey) -> Value {
        self.state
            .read()
            .records
            .get(key)
            .map(|record| record.funds_remaining)
            .unwrap_or(0)
    }

    pub fn query_record(&self, key: &LookupKey) -> Option<EscrowRecord> {
        self.state.read().records.get(key).cloned()
    }

    pub fn query_claim_back_window(&self) -> Duration {
        self.claim_back_window
    }

    pub fn owner_tax(&self) -> Value {
        self.config.owner_tax
    }

    pub fn config(&self) -> EscrowConfig {
        self.config
    }

    pub fn owner(&self) -> PartyId {
        self.state.read().ownership.owner().clone()
    }

    /// Number of active escrows.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Hands the ledger (and future tax income) to `new_owner`.
    pub fn transfer_ownership(
        &self,
        caller: &PartyId,
        new_owner: PartyId,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let previous = state.ownership.transfer(caller, new_owner.clone())?;
        state.events.push(RemittanceEvent::OwnershipTransferred {
            previous: previous.clone(),
            new_owner: new_owner.clone(),
        });
        info!(previous = %previous, new_owner = %new_owner, "escrow ownership transferred");
        Ok(())
    }

    /// Removes and returns every event emitted since the last drain.
    pub fn drain_events(&self) -> Vec<RemittanceEvent> {
        std::mem::take(&mut self.state.write().events)
    }

    pub fn snapshot(&self) -> EscrowSnapshot {
        let state = self.state.read();
        let mut records: Vec<_> = state
            .records
            .iter()
            .map(|(key, record)| (*key, record.clone()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        EscrowSnapshot {
            owner: state.ownership.owner().clone(),
            config: self.config,
            records,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
