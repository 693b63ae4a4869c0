//! # Remit Ledgers
//!
//! The two stateful components of Remit:
//!
//! - **Remittance**: hash-locked escrow of native value. Claimable by the
//!   named receiver for the escrowed amount minus a flat owner tax, or
//!   reclaimable in full by the depositor once the claim-back window passes.
//! - **Exchange**: claims escrow on a receiver's behalf, converts the
//!   payout at an owner-set rate, and books it as a currency balance that
//!   is withdrawn separately.
//!
//! Both share the [`ownership`] guard and the [`LedgerError`] type.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Wrapping arithmetic and
//!    money do not mix.
//! 2. A failed operation changes nothing and emits nothing.
//! 3. External value movement happens through the transfer primitives in
//!    `remit_protocol::transfer`, and books are updated only after it
//!    succeeds.
//! 4. Every persisted type is serializable (serde).

pub mod error;
pub mod events;
pub mod exchange;
pub mod ownership;
pub mod remittance;

pub use error::LedgerError;
pub use events::{ExchangeEvent, RemittanceEvent};
pub use exchange::{ExchangeLedger, ExchangeLedgerBuilder, ExchangeSnapshot};
pub use ownership::Ownership;
pub use remittance::{EscrowLedger, EscrowRecord, EscrowSnapshot};
