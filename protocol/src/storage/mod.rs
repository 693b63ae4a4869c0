//! # Storage Module
//!
//! Durable state for a single-process ledger pair.
//!
//! The ledgers themselves are in-memory structures behind locks. After a
//! command completes, the caller snapshots them and commits the snapshots
//! together with the payouts that command produced:
//!
//! ```text
//! EscrowLedger::snapshot()      ─┐
//! ExchangeLedger::snapshot()     ├─> LedgerBatch ─> LedgerDb::commit (one sled Batch)
//! InMemoryBank::drain_journal() ─┘
//! ```
//!
//! Bincode on disk: compact and deterministic. JSON is for the CLI output.

pub mod db;

pub use db::{DbError, DbResult, LedgerBatch, LedgerDb, PayoutEntry};
