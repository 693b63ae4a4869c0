//! # Transfer Boundaries
//!
//! The ledgers only do bookkeeping. Moving value out of them goes through
//! two external primitives:
//!
//! - [`ValueTransfer`] for native value (escrow payouts, tax, claim-backs).
//! - [`CurrencyTransfer`] for accounted currency units (exchange withdrawals).
//!
//! Both are all-or-nothing. A ledger updates its own books only after the
//! primitive reports success, so a failed transfer leaves nothing deducted.
//!
//! [`InMemoryBank`] implements both and records every applied payment. The
//! test suites use it to assert exact payouts; the operator CLI drains its
//! journal into persistent storage after each command.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CurrencyId, PartyId, Value};

/// Failure reported by a transfer primitive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The primitive refused the transfer.
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The primitive could not be reached.
    #[error("transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// One leg of a native-value settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Who receives the value.
    pub recipient: PartyId,
    /// How much, in the smallest native unit.
    pub amount: Value,
}

impl Payment {
    pub fn new(recipient: PartyId, amount: Value) -> Self {
        Self { recipient, amount }
    }
}

/// Native value transfer primitive.
pub trait ValueTransfer: Send + Sync {
    /// Applies every payment or none of them.
    fn settle(&self, payments: &[Payment]) -> Result<(), TransferError>;

    /// Single-payment form of [`settle`](Self::settle).
    fn pay(&self, recipient: &PartyId, amount: Value) -> Result<(), TransferError> {
        self.settle(&[Payment::new(recipient.clone(), amount)])
    }
}

/// Currency-unit transfer primitive, keyed by currency.
pub trait CurrencyTransfer: Send + Sync {
    /// Moves `amount` units of `currency` to `recipient`, all or nothing.
    fn transfer(
        &self,
        currency: &CurrencyId,
        recipient: &PartyId,
        amount: Value,
    ) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// InMemoryBank
// ---------------------------------------------------------------------------

/// An applied transfer, as recorded by [`InMemoryBank`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// `None` for native value, `Some` for accounted currency.
    pub currency: Option<CurrencyId>,
    /// Who received it.
    pub recipient: PartyId,
    /// How much.
    pub amount: Value,
}

#[derive(Debug, Default)]
struct BankState {
    journal: Vec<Payout>,
    native: HashMap<PartyId, Value>,
    currency: HashMap<(PartyId, CurrencyId), Value>,
    failure: Option<TransferError>,
}

/// In-process transfer backend with a payout journal and failure injection.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    state: Mutex<BankState>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent transfer fail with `error` until
    /// [`recover`](Self::recover) is called.
    pub fn fail_with(&self, error: TransferError) {
        self.state.lock().failure = Some(error);
    }

    /// Clears an injected failure.
    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    /// Total native value received by `party`.
    pub fn native_received(&self, party: &PartyId) -> Value {
        self.state.lock().native.get(party).copied().unwrap_or(0)
    }

    /// Total units of `currency` received by `party`.
    pub fn currency_received(&self, party: &PartyId, currency: &CurrencyId) -> Value {
        self.state
            .lock()
            .currency
            .get(&(party.clone(), currency.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Every applied payout, oldest first.
    pub fn journal(&self) -> Vec<Payout> {
        self.state.lock().journal.clone()
    }

    /// Removes and returns the journal.
    pub fn drain_journal(&self) -> Vec<Payout> {
        std::mem::take(&mut self.state.lock().journal)
    }
}

impl ValueTransfer for InMemoryBank {
    fn settle(&self, payments: &[Payment]) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }

        // Validate every leg before touching the totals.
        let mut staged: HashMap<PartyId, Value> = HashMap::new();
        for p in payments {
            let base = match staged.get(&p.recipient) {
                Some(v) => *v,
                None => state.native.get(&p.recipient).copied().unwrap_or(0),
            };
            let next = base
                .checked_add(p.amount)
                .ok_or_else(|| TransferError::Rejected("recipient total overflow".into()))?;
            staged.insert(p.recipient.clone(), next);
        }

        state.native.extend(staged);
        for p in payments {
            state.journal.push(Payout {
                currency: None,
                recipient: p.recipient.clone(),
                amount: p.amount,
            });
        }
        Ok(())
    }
}

impl CurrencyTransfer for InMemoryBank {
    fn transfer(
        &self,
        currency: &CurrencyId,
        recipient: &PartyId,
        amount: Value,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }

        let key = (recipient.clone(), currency.clone());
        let current = state.currency.get(&key).copied().unwrap_or(0);
        let next = current
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("recipient total overflow".into()))?;
        state.currency.insert(key, next);
        state.journal.push(Payout {
            currency: Some(currency.clone()),
            recipient: recipient.clone(),
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(s: &str) -> PartyId {
        PartyId::new(s).unwrap()
    }

    #[test]
    fn settle_applies_all_legs() {
        let bank = InMemoryBank::new();
        bank.settle(&[
            Payment::new(party("bob"), 42),
            Payment::new(party("owner"), 100),
            Payment::new(party("bob"), 8),
        ])
        .unwrap();
        assert_eq!(bank.native_received(&party("bob")), 50);
        assert_eq!(bank.native_received(&party("owner")), 100);
        assert_eq!(bank.journal().len(), 3);
    }

    #[test]
    fn injected_failure_applies_nothing() {
        let bank = InMemoryBank::new();
        bank.fail_with(TransferError::Unavailable("offline".into()));
        assert!(bank.pay(&party("bob"), 1).is_err());
        assert_eq!(bank.native_received(&party("bob")), 0);
        assert!(bank.journal().is_empty());

        bank.recover();
        bank.pay(&party("bob"), 1).unwrap();
        assert_eq!(bank.native_received(&party("bob")), 1);
    }

    #[test]
    fn overflowing_leg_rejects_whole_settlement() {
        let bank = InMemoryBank::new();
        bank.pay(&party("bob"), u128::MAX).unwrap();
        let result = bank.settle(&[
            Payment::new(party("owner"), 5),
            Payment::new(party("bob"), 1),
        ]);
        assert!(result.is_err());
        assert_eq!(bank.native_received(&party("owner")), 0);
        assert_eq!(bank.journal().len(), 1);
    }

    #[test]
    fn currency_transfers_are_tracked_per_currency() {
        let bank = InMemoryBank::new();
        let eur = CurrencyId::new("EUR").unwrap();
        let usd = CurrencyId::new("USD").unwrap();
        bank.transfer(&eur, &party("bob"), 20_000).unwrap();
        assert_eq!(bank.currency_received(&party("bob"), &eur), 20_000);
        assert_eq!(bank.currency_received(&party("bob"), &usd), 0);
        assert_eq!(bank.native_received(&party("bob")), 0);

        let drained = bank.drain_journal();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].currency.as_ref(), Some(&eur));
        assert!(bank.journal().is_empty());
    }
}
