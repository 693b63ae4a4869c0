//! # Ledger Session
//!
//! One CLI invocation against the on-disk ledger pair:
//!
//! 1. open the sled store and restore both ledgers from their snapshots,
//! 2. run exactly one operation,
//! 3. commit both snapshots and the payouts recorded by the in-memory bank
//!    in a single batch.
//!
//! A failed operation leaves the ledgers untouched, so the session is
//! simply dropped without committing.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use remit_contracts::{
    EscrowLedger, EscrowSnapshot, ExchangeEvent, ExchangeLedger, ExchangeSnapshot,
    RemittanceEvent,
};
use remit_protocol::clock::SystemClock;
use remit_protocol::config::EscrowConfig;
use remit_protocol::storage::{LedgerBatch, LedgerDb, PayoutEntry};
use remit_protocol::transfer::InMemoryBank;
use remit_protocol::PartyId;

/// Snapshot name of the escrow ledger.
pub const ESCROW_STATE: &str = "escrow";

/// Snapshot name of the exchange ledger.
pub const EXCHANGE_STATE: &str = "exchange";

/// What a committed session produced.
#[derive(Debug, Default, Serialize)]
pub struct CommitReport {
    pub remittance_events: Vec<RemittanceEvent>,
    pub exchange_events: Vec<ExchangeEvent>,
    pub payouts: Vec<PayoutEntry>,
}

/// A loaded ledger pair bound to its store.
pub struct Session {
    db: LedgerDb,
    bank: Arc<InMemoryBank>,
    escrow: Arc<EscrowLedger>,
    exchange: ExchangeLedger,
}

fn open_db(data_dir: &Path) -> Result<LedgerDb> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    LedgerDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

impl Session {
    /// Creates a fresh ledger pair and persists it.
    ///
    /// Refuses to overwrite an existing one.
    pub fn init(
        data_dir: &Path,
        owner: PartyId,
        account: PartyId,
        config: EscrowConfig,
    ) -> Result<Self> {
        let bank = Arc::new(InMemoryBank::new());
        let escrow = Arc::new(
            EscrowLedger::new(owner.clone(), config, Arc::new(SystemClock), bank.clone())
                .context("invalid escrow configuration")?,
        );

        let db = open_db(data_dir)?;
        if db.contains(ESCROW_STATE)? || db.contains(EXCHANGE_STATE)? {
            bail!("ledger already initialized in {}", data_dir.display());
        }

        let exchange = ExchangeLedger::builder()
            .owner(owner)
            .account(account)
            .escrow(escrow.clone())
            .currency_bank(bank.clone())
            .build()?;

        Ok(Self {
            db,
            bank,
            escrow,
            exchange,
        })
    }

    /// Restores the ledger pair stored in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db = open_db(data_dir)?;
        let escrow_snapshot: EscrowSnapshot = db
            .load(ESCROW_STATE)?
            .with_context(|| format!("no ledger in {}; run `init` first", data_dir.display()))?;
        let exchange_snapshot: ExchangeSnapshot = db
            .load(EXCHANGE_STATE)?
            .context("escrow ledger present but exchange ledger missing")?;

        let bank = Arc::new(InMemoryBank::new());
        let escrow = Arc::new(
            EscrowLedger::restore(escrow_snapshot, Arc::new(SystemClock), bank.clone())
                .context("stored escrow ledger is invalid")?,
        );
        let exchange = ExchangeLedger::restore(exchange_snapshot, escrow.clone(), bank.clone());

        tracing::debug!(escrows = escrow.len(), "ledger session opened");
        Ok(Self {
            db,
            bank,
            escrow,
            exchange,
        })
    }

    pub fn escrow(&self) -> &EscrowLedger {
        &self.escrow
    }

    pub fn exchange(&self) -> &ExchangeLedger {
        &self.exchange
    }

    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    /// Persists both snapshots and the new payouts atomically.
    pub fn commit(self) -> Result<CommitReport> {
        let mut batch = LedgerBatch::new();
        batch
            .put_state(ESCROW_STATE, &self.escrow.snapshot())?
            .put_state(EXCHANGE_STATE, &self.exchange.snapshot())?;
        batch.append_payouts(self.bank.drain_journal());

        let payouts = self
            .db
            .commit(batch)
            .context("failed to commit ledger state")?;

        Ok(CommitReport {
            remittance_events: self.escrow.drain_events(),
            exchange_events: self.exchange.drain_events(),
            payouts,
        })
    }
}
