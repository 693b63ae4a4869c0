//! # Exchange Ledger
//!
//! Claims escrowed native value on a claimant's behalf, converts it at an
//! owner-set rate, and books the result as a per-party, per-currency
//! balance. Balances are paid out separately with [`ExchangeLedger::withdraw_funds`].
//!
//! ## Conversion
//!
//! ```text
//! converted = floor(native * rate / RATE_SCALE)
//! ```
//!
//! `native` is the escrow payout after the owner tax. The product is
//! computed 256 bits wide, so it cannot overflow before the division.
//!
//! ## Atomicity
//!
//! A conversion touches two ledgers. The exchange holds its write lock for
//! the whole call and hands the escrow a `prepare` step that computes the
//! converted amount and the new balance before the escrow settles. If any
//! of that fails, the escrow aborts and neither ledger changes. After the
//! escrow commits, the remaining bookkeeping here cannot fail.
//!
//! Lock order is always exchange, then escrow.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use remit_protocol::transfer::CurrencyTransfer;
use remit_protocol::{ClaimRequest, CurrencyId, ExchangeRate, PartyId, Value};

use crate::error::LedgerError;
use crate::events::ExchangeEvent;
use crate::ownership::Ownership;
use crate::remittance::EscrowLedger;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serializable image of an [`ExchangeLedger`], minus its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSnapshot {
    pub owner: PartyId,
    pub account: PartyId,
    pub rates: Vec<(CurrencyId, ExchangeRate)>,
    pub balances: Vec<(PartyId, CurrencyId, Value)>,
}

#[derive(Debug)]
struct ExchangeState {
    ownership: Ownership,
    rates: HashMap<CurrencyId, ExchangeRate>,
    balances: HashMap<(PartyId, CurrencyId), Value>,
    events: Vec<ExchangeEvent>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles an [`ExchangeLedger`]. Every collaborator is required.
#[derive(Default)]
pub struct ExchangeLedgerBuilder {
    owner: Option<PartyId>,
    account: Option<PartyId>,
    escrow: Option<Arc<EscrowLedger>>,
    currency_bank: Option<Arc<dyn CurrencyTransfer>>,
}

impl ExchangeLedgerBuilder {
    /// Identity allowed to set rates.
    pub fn owner(mut self, owner: PartyId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// The exchange's own native-value account. Escrow payouts claimed
    /// through the exchange are settled here.
    pub fn account(mut self, account: PartyId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn escrow(mut self, escrow: Arc<EscrowLedger>) -> Self {
        self.escrow = Some(escrow);
        self
    }

    pub fn currency_bank(mut self, bank: Arc<dyn CurrencyTransfer>) -> Self {
        self.currency_bank = Some(bank);
        self
    }

    /// # Errors
    ///
    /// [`LedgerError::InvalidDependency`] naming the first missing piece.
    pub fn build(self) -> Result<ExchangeLedger, LedgerError> {
        let escrow = self
            .escrow
            .ok_or(LedgerError::InvalidDependency("escrow ledger"))?;
        let owner = self.owner.ok_or(LedgerError::InvalidDependency("owner"))?;
        let account = self
            .account
            .ok_or(LedgerError::InvalidDependency("exchange account"))?;
        let bank = self
            .currency_bank
            .ok_or(LedgerError::InvalidDependency("currency transfer"))?;

        Ok(ExchangeLedger {
            state: RwLock::new(ExchangeState {
                ownership: Ownership::new(owner),
                rates: HashMap::new(),
                balances: HashMap::new(),
                events: Vec::new(),
            }),
            escrow,
            account,
            bank,
        })
    }
}

// ---------------------------------------------------------------------------
// ExchangeLedger
// ---------------------------------------------------------------------------

/// Rate-converting exchange on top of an [`EscrowLedger`].
pub struct ExchangeLedger {
    state: RwLock<ExchangeState>,
    escrow: Arc<EscrowLedger>,
    account: PartyId,
    bank: Arc<dyn CurrencyTransfer>,
}

impl std::fmt::Debug for ExchangeLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ExchangeLedger")
            .field("owner", state.ownership.owner())
            .field("account", &self.account)
            .field("rates", &state.rates.len())
            .field("balances", &state.balances.len())
            .finish()
    }
}

impl ExchangeLedger {
    pub fn builder() -> ExchangeLedgerBuilder {
        ExchangeLedgerBuilder::default()
    }

    /// Rebuilds a ledger from a snapshot, bound to `escrow` and `bank`.
    pub fn restore(
        snapshot: ExchangeSnapshot,
        escrow: Arc<EscrowLedger>,
        bank: Arc<dyn CurrencyTransfer>,
    ) -> Self {
        let balances = snapshot
            .balances
            .into_iter()
            .map(|(party, currency, amount)| ((party, currency), amount))
            .collect();
        Self {
            state: RwLock::new(ExchangeState {
                ownership: Ownership::new(snapshot.owner),
                rates: snapshot.rates.into_iter().collect(),
                balances,
                events: Vec::new(),
            }),
            escrow,
            account: snapshot.account,
            bank,
        }
    }

    /// Claims the escrow described by `request` for `caller` and credits
    /// the converted amount to `caller`'s `currency` balance.
    ///
    /// Returns the credited currency units.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::RateNotSet`] if `currency` has no rate.
    /// - Any error from [`EscrowLedger::claim_on_behalf`], unchanged.
    /// - [`LedgerError::AmountOverflow`] if the conversion or the new
    ///   balance does not fit.
    pub fn convert_funds(
        &self,
        request: &ClaimRequest,
        currency: &CurrencyId,
        caller: &PartyId,
    ) -> Result<Value, LedgerError> {
        let mut state = self.state.write();

        let rate = match state.rates.get(currency) {
            Some(rate) => *rate,
            None => {
                debug!(currency = %currency, "conversion into unrated currency");
                return Err(LedgerError::RateNotSet(currency.clone()));
            }
        };

        let balance_key = (caller.clone(), currency.clone());
        let current = state.balances.get(&balance_key).copied().unwrap_or(0);

        let (native, (converted, new_balance)) =
            self.escrow
                .claim_on_behalf(request, caller, &self.account, |native| {
                    let converted = rate.convert(native)?;
                    let new_balance = current
                        .checked_add(converted)
                        .ok_or(LedgerError::AmountOverflow)?;
                    Ok((converted, new_balance))
                })?;

        if new_balance > 0 {
            state.balances.insert(balance_key, new_balance);
        }
        state.events.push(ExchangeEvent::ConversionPerformed {
            sender: request.sender.clone(),
            recipient: caller.clone(),
            currency: currency.clone(),
            amount: native,
            converted,
        });

        info!(
            sender = %request.sender,
            recipient = %caller,
            currency = %currency,
            native = %native,
            converted = %converted,
            rate = %rate,
            "funds converted"
        );
        Ok(converted)
    }

    /// Pays out `caller`'s whole `currency` balance and zeroes it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] if the balance is zero.
    /// - [`LedgerError::TransferFailed`] if the transfer fails; the balance
    ///   is kept.
    pub fn withdraw_funds(
        &self,
        currency: &CurrencyId,
        caller: &PartyId,
    ) -> Result<Value, LedgerError> {
        let mut state = self.state.write();
        let balance_key = (caller.clone(), currency.clone());
        let amount = state.balances.get(&balance_key).copied().unwrap_or(0);
        if amount == 0 {
            return Err(LedgerError::InsufficientFunds {
                available: 0,
                required: 1,
            });
        }

        if let Err(err) = self.bank.transfer(currency, caller, amount) {
            warn!(recipient = %caller, currency = %currency, error = %err, "withdrawal failed");
            return Err(err.into());
        }

        state.balances.remove(&balance_key);
        state.events.push(ExchangeEvent::WithdrawalPerformed {
            recipient: caller.clone(),
            currency: currency.clone(),
            amount,
        });

        info!(recipient = %caller, currency = %currency, amount = %amount, "funds withdrawn");
        Ok(amount)
    }

    /// Sets or overwrites the rate for `currency`. Owner only.
    pub fn set_exchange_rate(
        &self,
        currency: &CurrencyId,
        rate: ExchangeRate,
        caller: &PartyId,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if let Err(err) = state.ownership.ensure_owner(caller, "set exchange rates") {
            warn!(caller = %caller, currency = %currency, "rate change by non-owner rejected");
            return Err(err);
        }
        if rate.is_zero() {
            return Err(LedgerError::InvalidRate {
                currency: currency.clone(),
            });
        }

        state.rates.insert(currency.clone(), rate);
        state.events.push(ExchangeEvent::ExchangeRateSet {
            currency: currency.clone(),
            rate,
        });

        info!(currency = %currency, rate = %rate, "exchange rate set");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `party`'s balance in `currency`, zero when never credited.
    pub fn query_currency_balance(&self, party: &PartyId, currency: &CurrencyId) -> Value {
        self.state
            .read()
            .balances
            .get(&(party.clone(), currency.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn exchange_rate(&self, currency: &CurrencyId) -> Option<ExchangeRate> {
        self.state.read().rates.get(currency).copied()
    }

    pub fn escrow(&self) -> &Arc<EscrowLedger> {
        &self.escrow
    }

    pub fn account(&self) -> &PartyId {
        &self.account
    }

    pub fn owner(&self) -> PartyId {
        self.state.read().ownership.owner().clone()
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    pub fn transfer_ownership(
        &self,
        caller: &PartyId,
        new_owner: PartyId,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let previous = state.ownership.transfer(caller, new_owner.clone())?;
        state.events.push(ExchangeEvent::OwnershipTransferred {
            previous: previous.clone(),
            new_owner: new_owner.clone(),
        });
        info!(previous = %previous, new_owner = %new_owner, "exchange ownership transferred");
        Ok(())
    }

    /// Removes and returns every event emitted since the last drain.
    pub fn drain_events(&self) -> Vec<ExchangeEvent> {
        std::mem::take(&mut self.state.write().events)
    }

    /// Rates and balances sorted by key, so equal ledgers snapshot equally.
    pub fn snapshot(&self) -> ExchangeSnapshot {
        let state = self.state.read();
        let mut rates: Vec<_> = state
            .rates
            .iter()
            .map(|(currency, rate)| (currency.clone(), *rate))
            .collect();
        rates.sort();
        let mut balances: Vec<_> = state
            .balances
            .iter()
            .map(|((party, currency), amount)| (party.clone(), currency.clone(), *amount))
            .collect();
        balances.sort();
        ExchangeSnapshot {
            owner: state.ownership.owner().clone(),
            account: self.account.clone(),
            rates,
            balances,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
