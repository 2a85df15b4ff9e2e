//! Canonical serialization for deterministic hashing.
//!
//! Configuration hashes, molecule content hashes and cache keys are all
//! derived from the canonical JSON encoding of a value, hashed with xxh64.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Hash a text token (e.g. an MHFP shingle) with xxh64.
pub fn token_hash(token: &str) -> u64 {
    xxh64(token.as_bytes(), 0)
}
