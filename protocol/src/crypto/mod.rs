//! # Cryptographic Primitives
//!
//! Thin wrappers around BLAKE3. The ledgers never see a raw hasher; they go
//! through [`crate::codec`], which is built on these helpers.

pub mod hash;

pub use hash::{blake3_hash, domain_separated_hash, domain_separated_hash_multi};
