//! Core type definitions shared by every ledger.
//!
//! These types are the vocabulary of the escrow and exchange ledgers:
//! who is acting ([`PartyId`]), what is being accounted ([`CurrencyId`],
//! [`Value`]), and the two 32-byte digests that tie a deposit to its
//! claimant ([`Commitment`], [`LookupKey`]).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::HASH_OUTPUT_LENGTH;

/// Native value or currency units, always in the smallest denomination.
///
/// `u128` so that 18-decimal assets fit comfortably. All arithmetic on
/// values goes through `checked_*`.
pub type Value = u128;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing identifiers and digests from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The identifier string was empty (or only whitespace).
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    /// The hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded digest has the wrong length.
    #[error("invalid digest length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required number of bytes.
        expected: usize,
        /// Number of bytes actually decoded.
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// Identity of a party acting on a ledger.
///
/// The ledgers never authenticate a `PartyId` themselves. The surrounding
/// runtime is trusted to hand over an authenticated identity; the ledgers
/// only compare identities for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(String);

impl PartyId {
    /// Creates a party identity, rejecting empty strings.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes fed into key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartyId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartyId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PartyId> for String {
    fn from(id: PartyId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// CurrencyId
// ---------------------------------------------------------------------------

/// Identifier of an accounted currency on the exchange ledger.
///
/// Opaque to the ledger: a ticker, a token contract address, anything the
/// currency transfer primitive understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyId(String);

impl CurrencyId {
    /// Creates a currency identifier, rejecting empty strings.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CurrencyId> for String {
    fn from(id: CurrencyId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

fn decode_digest(s: &str) -> Result<[u8; HASH_OUTPUT_LENGTH], TypeError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != HASH_OUTPUT_LENGTH {
        return Err(TypeError::InvalidLength {
            expected: HASH_OUTPUT_LENGTH,
            got: bytes.len(),
        });
    }
    let mut out = [0u8; HASH_OUTPUT_LENGTH];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Hex string in human-readable formats (JSON), raw bytes otherwise
/// (bincode).
macro_rules! digest_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    s.parse().map_err(serde::de::Error::custom)
                } else {
                    <[u8; HASH_OUTPUT_LENGTH]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

/// One-way digest of a secret password.
///
/// Produced by [`crate::codec::hash_password`]. Holding a commitment proves
/// nothing by itself; presenting the pair of commitments that regenerates
/// a deposit's [`LookupKey`] is what authorizes a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment([u8; HASH_OUTPUT_LENGTH]);

impl Commitment {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Commitment {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_digest(s).map(Self)
    }
}

/// The sole handle of an escrow record.
///
/// Derived by [`crate::codec::derive_key`] from both commitments and both
/// party identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupKey([u8; HASH_OUTPUT_LENGTH]);

impl LookupKey {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for LookupKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_digest(s).map(Self)
    }
}

digest_serde!(Commitment);
digest_serde!(LookupKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_id_rejects_empty() {
        assert_eq!(PartyId::new(""), Err(TypeError::EmptyIdentifier));
        assert_eq!(PartyId::new("   "), Err(TypeError::EmptyIdentifier));
        assert_eq!(PartyId::new("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn currency_id_parses() {
        let c: CurrencyId = "EUR".parse().unwrap();
        assert_eq!(c.to_string(), "EUR");
        assert!("".parse::<CurrencyId>().is_err());
    }

    #[test]
    fn lookup_key_hex_roundtrip_accepts_prefix() {
        let key = LookupKey::from_bytes([0xab; 32]);
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex.parse::<LookupKey>().unwrap(), key);
        assert_eq!(format!("0x{}", hex).parse::<LookupKey>().unwrap(), key);
        assert_eq!(key.short(), "abababab");
    }

    #[test]
    fn identifiers_deserialize_through_validation() {
        let ok: PartyId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<PartyId>("\"\"").is_err());
        assert!(serde_json::from_str::<CurrencyId>("\"  \"").is_err());
    }

    #[test]
    fn digests_are_hex_in_json_and_bytes_in_bincode() {
        let key = LookupKey::from_bytes([0x01; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        assert_eq!(serde_json::from_str::<LookupKey>(&json).unwrap(), key);

        let bytes = bincode::serialize(&key).unwrap();
        assert_eq!(bytes, vec![0x01; 32]);
        assert_eq!(bincode::deserialize::<LookupKey>(&bytes).unwrap(), key);
    }

    #[test]
    fn digest_rejects_wrong_length() {
        let err = "abcd".parse::<Commitment>().unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                got: 2
            }
        );
        assert!(matches!(
            "zz".parse::<Commitment>(),
            Err(TypeError::InvalidHex(_))
        ));
    }
}
