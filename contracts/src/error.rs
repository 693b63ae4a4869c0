//! Error type shared by the escrow and exchange ledgers.
//!
//! Every failing ledger operation returns a [`LedgerError`] and leaves the
//! ledger exactly as it found it: no bookkeeping change, no event. Nothing
//! is retried internally.

use chrono::{DateTime, Utc};
use thiserror::Error;

use remit_protocol::math::MathError;
use remit_protocol::transfer::TransferError;
use remit_protocol::{CurrencyId, LookupKey, PartyId, Value};

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// An escrow record already exists under this key.
    #[error("duplicate key: an escrow already exists under {0}")]
    DuplicateKey(LookupKey),

    /// No escrow record exists under this key.
    #[error("not found: no escrow under {0}")]
    NotFound(LookupKey),

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized: {party} may not {action}")]
    Unauthorized {
        /// The identity that attempted the operation.
        party: PartyId,
        /// What it tried to do.
        action: &'static str,
    },

    /// Not enough value to perform the operation.
    #[error("insufficient funds: available {available}, required at least {required}")]
    InsufficientFunds {
        /// What is currently held.
        available: Value,
        /// The minimum that would have succeeded.
        required: Value,
    },

    /// The claim-back window has not elapsed yet.
    #[error("claim-back not available until {available_at}")]
    NotYetExpired {
        /// Earliest instant a claim-back succeeds.
        available_at: DateTime<Utc>,
    },

    /// Conversion into a currency with no configured rate.
    #[error("no exchange rate set for currency {0}")]
    RateNotSet(CurrencyId),

    /// Attempted to set a non-positive exchange rate.
    #[error("invalid exchange rate for {currency}: rate must be positive")]
    InvalidRate {
        /// Currency whose rate was rejected.
        currency: CurrencyId,
    },

    /// The configured claim-back window is negative or not representable.
    #[error("invalid claim-back window of {secs} seconds")]
    InvalidClaimBackWindow {
        /// The rejected window.
        secs: i64,
    },

    /// A required collaborator was not supplied at construction.
    #[error("invalid dependency: {0} is required")]
    InvalidDependency(&'static str),

    /// The external transfer primitive failed; nothing was booked.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// The requested amount is zero.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// An arithmetic overflow would occur.
    #[error("amount overflow: operation would exceed allowed limits")]
    AmountOverflow,

    /// Any other fixed-point failure.
    #[error("arithmetic error: {0}")]
    Math(MathError),
}

impl From<MathError> for LedgerError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Overflow => LedgerError::AmountOverflow,
            other => LedgerError::Math(other),
        }
    }
}
