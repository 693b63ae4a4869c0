//! # Key Codec
//!
//! Derives the two digests the escrow ledger runs on:
//!
//! ```text
//! password  --hash_password-->  Commitment
//!
//! (sender_commitment, receiver_commitment, sender_id, receiver_id)
//!           --derive_key-->     LookupKey
//! ```
//!
//! ## Field order
//!
//! The lookup key is computed over, in exactly this order:
//!
//! 1. sender commitment (32 bytes)
//! 2. receiver commitment (32 bytes)
//! 3. sender id, length-prefixed
//! 4. receiver id, length-prefixed
//!
//! Depositor and claimant must agree on this order out of band. Swapping
//! the two identities produces an unrelated key, and the ledger will answer
//! `NotFound`. There is no fallback that tries the other order.

use serde::{Deserialize, Serialize};

use crate::config::{LOOKUP_KEY_CONTEXT, PASSWORD_CONTEXT};
use crate::crypto::hash::{domain_separated_hash, domain_separated_hash_multi, length_prefixed};
use crate::types::{Commitment, LookupKey, PartyId};

/// Hashes a plaintext password into a [`Commitment`].
pub fn hash_password(plaintext: &str) -> Commitment {
    Commitment::from_bytes(domain_separated_hash(
        PASSWORD_CONTEXT,
        plaintext.as_bytes(),
    ))
}

/// Combines both commitments and both identities into a [`LookupKey`].
pub fn derive_key(
    sender_commitment: &Commitment,
    receiver_commitment: &Commitment,
    sender: &PartyId,
    receiver: &PartyId,
) -> LookupKey {
    let sender_field = length_prefixed(sender.as_bytes());
    let receiver_field = length_prefixed(receiver.as_bytes());
    LookupKey::from_bytes(domain_separated_hash_multi(
        LOOKUP_KEY_CONTEXT,
        &[
            sender_commitment.as_bytes(),
            receiver_commitment.as_bytes(),
            &sender_field,
            &receiver_field,
        ],
    ))
}

/// Everything a claimant presents to redeem an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Commitment to the sender's password.
    pub sender_commitment: Commitment,
    /// Commitment to the receiver's password.
    pub receiver_commitment: Commitment,
    /// Party that made the deposit.
    pub sender: PartyId,
    /// Party entitled to claim.
    pub receiver: PartyId,
}

impl ClaimRequest {
    /// Builds a request from the two plaintext passwords.
    pub fn from_passwords(
        sender_password: &str,
        receiver_password: &str,
        sender: PartyId,
        receiver: PartyId,
    ) -> Self {
        Self {
            sender_commitment: hash_password(sender_password),
            receiver_commitment: hash_password(receiver_password),
            sender,
            receiver,
        }
    }

    /// The key the depositor must have used.
    pub fn lookup_key(&self) -> LookupKey {
        derive_key(
            &self.sender_commitment,
            &self.receiver_commitment,
            &self.sender,
            &self.receiver,
        )
    }
}
