//! Observable records emitted by successful ledger operations.
//!
//! Each ledger appends to its own in-memory journal; callers collect with
//! `drain_events()`. A failed operation emits nothing.

use serde::{Deserialize, Serialize};

use remit_protocol::{CurrencyId, ExchangeRate, LookupKey, PartyId, Value};

/// Events emitted by [`EscrowLedger`](crate::remittance::EscrowLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RemittanceEvent {
    /// A new escrow was recorded.
    DepositRecorded {
        depositor: PartyId,
        amount: Value,
        key: LookupKey,
    },
    /// An escrow was claimed. `amount` is what the recipient got, tax excluded.
    ClaimPerformed {
        claimant: PartyId,
        recipient: PartyId,
        amount: Value,
        tax: Value,
        key: LookupKey,
    },
    /// An expired escrow went back to its depositor.
    ClaimBackPerformed {
        depositor: PartyId,
        amount: Value,
        key: LookupKey,
    },
    OwnershipTransferred {
        previous: PartyId,
        new_owner: PartyId,
    },
}

/// Events emitted by [`ExchangeLedger`](crate::exchange::ExchangeLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExchangeEvent {
    /// Escrowed native value was converted and credited.
    ConversionPerformed {
        sender: PartyId,
        recipient: PartyId,
        currency: CurrencyId,
        /// Native value taken out of escrow, after tax.
        amount: Value,
        /// Currency units credited.
        converted: Value,
    },
    /// A currency balance was paid out in full.
    WithdrawalPerformed {
        recipient: PartyId,
        currency: CurrencyId,
        amount: Value,
    },
    ExchangeRateSet {
        currency: CurrencyId,
        rate: ExchangeRate,
    },
    OwnershipTransferred {
        previous: PartyId,
        new_owner: PartyId,
    },
}
