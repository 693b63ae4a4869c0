//! # LedgerDb: Persistent Storage Engine
//!
//! Durable home for the ledger snapshots and the payout journal, built on
//! sled's embedded key-value store.
//!
//! ## Key Layout
//!
//! Everything lives in a single tree named `ledger`:
//!
//! | Key                    | Value                     |
//! |------------------------|---------------------------|
//! | `state/<name>`         | `bincode(snapshot)`       |
//! | `payout/<id>` (8B BE)  | `bincode(PayoutEntry)`    |
//! | `meta/version`         | protocol version (UTF-8)  |
//!
//! Payout ids come from sled's monotonic id generator and are stored
//! big-endian so a prefix scan returns them in commit order.
//!
//! ## Atomicity
//!
//! A sled `Batch` is atomic within one tree. That is why everything shares
//! the `ledger` tree: a command's escrow snapshot, exchange snapshot and new
//! payouts land together or not at all.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sled::{Batch, Db, Tree};
use std::path::Path;

use crate::config::PROTOCOL_VERSION;
use crate::transfer::Payout;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database was written by protocol {found}, this build speaks {expected}")]
    VersionMismatch { found: String, expected: String },
}

pub type DbResult<T> = Result<T, DbError>;

const STATE_PREFIX: &[u8] = b"state/";
const PAYOUT_PREFIX: &[u8] = b"payout/";
const META_VERSION: &[u8] = b"meta/version";

fn state_key(name: &str) -> Vec<u8> {
    [STATE_PREFIX, name.as_bytes()].concat()
}

fn payout_key(id: u64) -> Vec<u8> {
    [PAYOUT_PREFIX, &id.to_be_bytes()[..]].concat()
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// PayoutEntry / LedgerBatch
// ---------------------------------------------------------------------------

/// A payout as persisted, stamped with its journal id and commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub id: u64,
    pub committed_at: DateTime<Utc>,
    pub payout: Payout,
}

/// Writes to apply atomically with [`LedgerDb::commit`].
#[derive(Debug, Default)]
pub struct LedgerBatch {
    states: Vec<(String, Vec<u8>)>,
    payouts: Vec<Payout>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a named snapshot.
    pub fn put_state<T: Serialize>(&mut self, name: &str, value: &T) -> DbResult<&mut Self> {
        self.states.push((name.to_string(), encode(value)?));
        Ok(self)
    }

    /// Stages payouts for the journal.
    pub fn append_payouts(&mut self, payouts: impl IntoIterator<Item = Payout>) -> &mut Self {
        self.payouts.extend(payouts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.payouts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent storage for ledger snapshots and the payout journal.
///
/// # Thread Safety
///
/// sled trees are safe for concurrent use; `LedgerDb` can be shared via
/// `Arc<LedgerDb>` without external synchronization. Serializing whole
/// commands is the caller's job.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    ledger: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database, removed when dropped. For tests.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let ledger = db.open_tree("ledger")?;
        let this = Self { db, ledger };
        this.check_version()?;
        Ok(this)
    }

    /// Stamps a fresh database with the protocol version, and refuses one
    /// stamped by a different version.
    fn check_version(&self) -> DbResult<()> {
        match self.ledger.get(META_VERSION)? {
            Some(bytes) => {
                let found = String::from_utf8_lossy(&bytes).into_owned();
                if found != PROTOCOL_VERSION {
                    return Err(DbError::VersionMismatch {
                        found,
                        expected: PROTOCOL_VERSION.to_string(),
                    });
                }
            }
            None => {
                self.ledger.insert(META_VERSION, PROTOCOL_VERSION.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Loads the snapshot stored under `name`, if any.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> DbResult<Option<T>> {
        match self.ledger.get(state_key(name))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether a snapshot exists under `name`.
    pub fn contains(&self, name: &str) -> DbResult<bool> {
        Ok(self.ledger.contains_key(state_key(name))?)
    }

    /// Applies every staged write in one atomic batch and flushes.
    ///
    /// Returns the persisted payout entries.
    pub fn commit(&self, batch: LedgerBatch) -> DbResult<Vec<PayoutEntry>> {
        let now = Utc::now();
        let mut sled_batch = Batch::default();

        for (name, bytes) in &batch.states {
            sled_batch.insert(state_key(name), bytes.as_slice());
        }

        let mut entries = Vec::with_capacity(batch.payouts.len());
        for payout in batch.payouts {
            let entry = PayoutEntry {
                id: self.db.generate_id()?,
                committed_at: now,
                payout,
            };
            sled_batch.insert(payout_key(entry.id), encode(&entry)?);
            entries.push(entry);
        }

        self.ledger.apply_batch(sled_batch)?;
        self.db.flush()?;

        tracing::debug!(
            states = batch.states.len(),
            payouts = entries.len(),
            "ledger batch committed"
        );
        Ok(entries)
    }

    /// Every persisted payout, in commit order.
    pub fn payouts(&self) -> DbResult<Vec<PayoutEntry>> {
        let mut out = Vec::new();
        for item in self.ledger.scan_prefix(PAYOUT_PREFIX) {
            let (_key, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
