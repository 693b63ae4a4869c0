// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Remit Protocol: Core Library
//!
//! Leaf primitives for the Remit escrow and exchange ledgers. Nothing in
//! here holds ledger state; the ledgers live in `remit-contracts`.
//!
//! ## Architecture
//!
//! - **types**: `PartyId`, `CurrencyId`, `Value`, and the two digests.
//! - **crypto**: BLAKE3 wrappers with domain separation.
//! - **codec**: password commitments and escrow lookup keys.
//! - **math**: fixed-point exchange rates, floor-rounded conversion.
//! - **clock**: injectable time source.
//! - **transfer**: the native and currency transfer boundaries.
//! - **storage**: sled-backed snapshot and payout persistence.
//! - **config**: protocol constants and per-instance escrow parameters.
//!
//! ## Design Philosophy
//!
//! 1. Money is `u128` and every operation on it is checked.
//! 2. No floating point anywhere near a balance.
//! 3. If it touches money, it has tests. Plural.

pub mod clock;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod math;
pub mod storage;
pub mod transfer;
pub mod types;

pub use codec::{derive_key, hash_password, ClaimRequest};
pub use math::ExchangeRate;
pub use types::{Commitment, CurrencyId, LookupKey, PartyId, Value};
