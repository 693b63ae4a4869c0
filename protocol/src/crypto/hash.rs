//! # Hashing Utilities
//!
//! Remit hashes with BLAKE3 and nothing else. Every digest the ledgers
//! depend on is domain-separated through BLAKE3's `derive_key` mode, so a
//! password commitment can never be replayed as a lookup key (or the other
//! way around) even when the inputs happen to line up byte for byte.

/// Compute the plain BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated hash using BLAKE3 with a context string.
///
/// `derive_key` mode uses an IV derived from the context, so digests under
/// different contexts are independent by construction. Don't prepend a
/// tag manually.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Domain-separated hash over several parts, fed in order.
///
/// Parts are concatenated as-is. Callers hashing variable-length fields
/// must frame them (see [`length_prefixed`]) or adjacent fields can slide
/// into each other.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Frames a variable-length field as `len (u64 LE) || bytes`.
pub fn length_prefixed(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + data.len());
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_known_vector() {
        // BLAKE3 of the empty string.
        let hash = blake3_hash(b"");
        let expected =
            hex::decode("af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_domain_separation() {
        let data = b"same data";
        let hash_a = domain_separated_hash("context-a", data);
        let hash_b = domain_separated_hash("context-b", data);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn test_domain_separated_is_not_plain_blake3() {
        let data = b"test data";
        assert_ne!(blake3_hash(data), domain_separated_hash("remit-test", data));
    }

    #[test]
    fn test_multi_matches_concatenation() {
        let multi = domain_separated_hash_multi("ctx", &[b"hello", b" world"]);
        let single = domain_separated_hash("ctx", b"hello world");
        assert_eq!(multi, single);
    }

    #[test]
    fn test_length_prefix_disambiguates() {
        let a = [length_prefixed(b"ab"), length_prefixed(b"c")].concat();
        let b = [length_prefixed(b"a"), length_prefixed(b"bc")].concat();
        assert_ne!(a, b);
        assert_eq!(length_prefixed(b"xyz")[..8], 3u64.to_le_bytes());
    }
}
