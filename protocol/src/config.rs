//! # Ledger Configuration & Constants
//!
//! Every magic number in Remit lives here. If you're hardcoding a constant
//! somewhere else, move it.
//!
//! The key-derivation contexts are part of the wire contract between
//! depositors and claimants: changing one silently orphans every escrow
//! created under the old value.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Value;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the ledger rules.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Digest length in bytes for commitments and lookup keys.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// BLAKE3 derive-key context for password commitments.
pub const PASSWORD_CONTEXT: &str = "remit 2026-01 password commitment v1";

/// BLAKE3 derive-key context for escrow lookup keys.
pub const LOOKUP_KEY_CONTEXT: &str = "remit 2026-01 escrow lookup key v1";

// ---------------------------------------------------------------------------
// Escrow Parameters
// ---------------------------------------------------------------------------

/// Flat tax withheld on every successful claim and routed to the owner.
pub const OWNER_TAX: Value = 100;

/// Seconds after a deposit before the depositor may claim it back.
pub const CLAIM_BACK_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Exchange Parameters
// ---------------------------------------------------------------------------

/// Fixed-point scale for exchange rates. A stored rate of `RATE_SCALE`
/// means one currency unit per native unit.
pub const RATE_SCALE: Value = 1_000_000_000_000_000_000;

/// Number of decimal places implied by [`RATE_SCALE`].
pub const RATE_DECIMALS: u32 = 18;

// ---------------------------------------------------------------------------
// EscrowConfig
// ---------------------------------------------------------------------------

/// Per-instance escrow parameters.
///
/// Defaults to the protocol constants. Tests and the operator CLI override
/// individual fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Tax withheld on every claim.
    pub owner_tax: Value,
    /// Seconds between deposit and the earliest claim-back.
    pub claim_back_window_secs: i64,
}

impl EscrowConfig {
    /// Claim-back window as a `chrono::Duration`.
    ///
    /// `None` for a negative window or one chrono cannot represent. The
    /// escrow ledger refuses to start with such a config.
    pub fn claim_back_window(&self) -> Option<Duration> {
        if self.claim_back_window_secs < 0 {
            return None;
        }
        Duration::try_seconds(self.claim_back_window_secs)
    }
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            owner_tax: OWNER_TAX,
            claim_back_window_secs: CLAIM_BACK_WINDOW_SECS,
        }
    }
}
