//! Fingerprint representations.
//!
//! Four shapes, produced by [`encoder::encode`] from a multiset of buckets:
//!
//! | kind | storage | length |
//! |---|---|---|
//! | [`SparseCountFingerprint`] | bucket → count | 2^32 |
//! | [`SparseBitFingerprint`] | set of on-bit indices | 2^32 (× n with count simulation) |
//! | [`DenseCountFingerprint`] | `Vec<u32>` | fp_size |
//! | [`DenseBitFingerprint`] | packed `u64` words | fp_size |
//!
//! Sparse maps are `BTreeMap`/`BTreeSet`, so iteration is always
//! index-ascending and the serialized form is canonical.

pub mod encoder;
pub mod similarity;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::canonical::to_canonical_bytes;

/// Length of the unfolded bucket space.
pub const SPARSE_LENGTH: u64 = 1 << 32;

/// Requested output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Unfolded bucket counts.
    SparseCount,
    /// Unfolded on-bits.
    SparseBit,
    /// Folded counts of length fp_size.
    DenseCount,
    /// Folded bits of length fp_size.
    DenseBit,
}

impl OutputKind {
    /// All output kinds.
    pub const ALL: [OutputKind; 4] = [
        Self::SparseCount,
        Self::SparseBit,
        Self::DenseCount,
        Self::DenseBit,
    ];

    /// Parse an output kind.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sparse_count" => Some(Self::SparseCount),
            "sparse_bit" | "sparse" => Some(Self::SparseBit),
            "dense_count" | "count" => Some(Self::DenseCount),
            "dense_bit" | "bit" | "dense" => Some(Self::DenseBit),
            _ => None,
        }
    }
}

impl Default for OutputKind {
    fn default() -> Self {
        Self::DenseBit
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SparseCount => write!(f, "sparse_count"),
            Self::SparseBit => write!(f, "sparse_bit"),
            Self::DenseCount => write!(f, "dense_count"),
            Self::DenseBit => write!(f, "dense_bit"),
        }
    }
}

/// Bucket → occurrence count over the unfolded space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseCountFingerprint {
    /// Logical length.
    pub length: u64,
    /// Nonzero entries.
    pub counts: BTreeMap<u64, u32>,
}

impl SparseCountFingerprint {
    /// Empty fingerprint of the given length.
    pub fn new(length: u64) -> Self {
        Self {
            length,
            counts: BTreeMap::new(),
        }
    }

    /// Nonzero (index, count) pairs, index-ascending.
    pub fn nonzero_elements(&self) -> Vec<(u64, u32)> {
        self.counts.iter().map(|(&k, &v)| (k, v)).collect()
    }

    /// Number of nonzero entries.
    pub fn num_nonzero(&self) -> usize {
        self.counts.len()
    }

    /// Count at an index.
    pub fn get(&self, index: u64) -> u32 {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }
}

/// On-bit indices over the unfolded space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseBitFingerprint {
    /// Logical length.
    pub length: u64,
    /// Set bits.
    pub bits: BTreeSet<u64>,
}

impl SparseBitFingerprint {
    /// Empty fingerprint of the given length.
    pub fn new(length: u64) -> Self {
        Self {
            length,
            bits: BTreeSet::new(),
        }
    }

    /// Set bits, ascending.
    pub fn on_bits(&self) -> Vec<u64> {
        self.bits.iter().copied().collect()
    }

    /// Number of set bits.
    pub fn num_on_bits(&self) -> usize {
        self.bits.len()
    }

    /// Whether a bit is set.
    pub fn contains(&self, bit: u64) -> bool {
        self.bits.contains(&bit)
    }
}

/// Folded counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseCountFingerprint {
    /// One count per position.
    pub counts: Vec<u32>,
}

impl DenseCountFingerprint {
    /// All-zero fingerprint.
    pub fn new(size: usize) -> Self {
        Self { counts: vec![0; size] }
    }

    /// Length.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the fingerprint has zero length.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Nonzero (index, count) pairs, index-ascending.
    pub fn nonzero_elements(&self) -> Vec<(u64, u32)> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, &c)| (i as u64, c))
            .collect()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// Folded bits, packed into `u64` words (bit `i` is word `i / 64`, bit `i % 64`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseBitFingerprint {
    size: usize,
    words: Vec<u64>,
}

impl DenseBitFingerprint {
    /// All-zero fingerprint.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            words: vec![0; size.div_ceil(64)],
        }
    }

    /// Length in bits.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the fingerprint has zero length.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Set a bit. Out-of-range indices are ignored.
    pub fn set(&mut self, bit: usize) {
        if bit < self.size {
            self.words[bit / 64] |= 1 << (bit % 64);
        }
    }

    /// Whether a bit is set.
    pub fn get(&self, bit: usize) -> bool {
        bit < self.size && self.words[bit / 64] >> (bit % 64) & 1 == 1
    }

    /// Set bits, ascending.
    pub fn on_bits(&self) -> Vec<u64> {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(i, &word)| {
                (0..64u64)
                    .filter(move |b| word >> b & 1 == 1)
                    .map(move |b| i as u64 * 64 + b)
            })
            .collect()
    }

    /// Number of set bits.
    pub fn num_on_bits(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Packed words.
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

/// Any fingerprint shape.
///
/// Externally tagged: integer map keys do not survive the buffering that
/// internally tagged enums go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fingerprint {
    /// Unfolded counts.
    SparseCount(SparseCountFingerprint),
    /// Unfolded bits.
    SparseBit(SparseBitFingerprint),
    /// Folded counts.
    DenseCount(DenseCountFingerprint),
    /// Folded bits.
    DenseBit(DenseBitFingerprint),
}

impl Fingerprint {
    /// Representation of this fingerprint.
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::SparseCount(_) => OutputKind::SparseCount,
            Self::SparseBit(_) => OutputKind::SparseBit,
            Self::DenseCount(_) => OutputKind::DenseCount,
            Self::DenseBit(_) => OutputKind::DenseBit,
        }
    }

    /// Logical length.
    pub fn length(&self) -> u64 {
        match self {
            Self::SparseCount(fp) => fp.length,
            Self::SparseBit(fp) => fp.length,
            Self::DenseCount(fp) => fp.len() as u64,
            Self::DenseBit(fp) => fp.len() as u64,
        }
    }

    /// Nonzero (index, value) pairs, index-ascending. Bits report value 1.
    pub fn nonzero_elements(&self) -> Vec<(u64, u32)> {
        match self {
            Self::SparseCount(fp) => fp.nonzero_elements(),
            Self::DenseCount(fp) => fp.nonzero_elements(),
            Self::SparseBit(fp) => fp.bits.iter().map(|&b| (b, 1)).collect(),
            Self::DenseBit(fp) => fp.on_bits().into_iter().map(|b| (b, 1)).collect(),
        }
    }

    /// Indices with a nonzero value, ascending.
    pub fn on_bits(&self) -> Vec<u64> {
        self.nonzero_elements().into_iter().map(|(i, _)| i).collect()
    }

    /// Number of nonzero positions.
    pub fn num_nonzero(&self) -> usize {
        match self {
            Self::SparseCount(fp) => fp.num_nonzero(),
            Self::SparseBit(fp) => fp.num_on_bits(),
            Self::DenseCount(fp) => fp.counts.iter().filter(|&&c| c > 0).count(),
            Self::DenseBit(fp) => fp.num_on_bits(),
        }
    }

    /// SHA-256 (hex) of the canonical serialization.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(to_canonical_bytes(self));
        hex::encode(hasher.finalize())
    }

    /// Unwrap the sparse-count variant.
    pub fn as_sparse_count(&self) -> Option<&SparseCountFingerprint> {
        match self {
            Self::SparseCount(fp) => Some(fp),
            _ => None,
        }
    }

    /// Unwrap the sparse-bit variant.
    pub fn as_sparse_bit(&self) -> Option<&SparseBitFingerprint> {
        match self {
            Self::SparseBit(fp) => Some(fp),
            _ => None,
        }
    }

    /// Unwrap the dense-count variant.
    pub fn as_dense_count(&self) -> Option<&DenseCountFingerprint> {
        match self {
            Self::DenseCount(fp) => Some(fp),
            _ => None,
        }
    }

    /// Unwrap the dense-bit variant.
    pub fn as_dense_bit(&self) -> Option<&DenseBitFingerprint> {
        match self {
            Self::DenseBit(fp) => Some(fp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_bits_pack_and_report_sorted() {
        let mut fp = DenseBitFingerprint::new(130);
        fp.set(129);
        fp.set(3);
        fp.set(64);
        fp.set(500);
        assert_eq!(fp.on_bits(), vec![3, 64, 129]);
        assert_eq!(fp.num_on_bits(), 3);
        assert!(fp.get(64));
        assert!(!fp.get(500));
    }

    #[test]
    fn test_nonzero_elements_index_ascending() {
        let mut fp = SparseCountFingerprint::new(SPARSE_LENGTH);
        fp.counts.insert(90, 1);
        fp.counts.insert(7, 3);
        let fp = Fingerprint::SparseCount(fp);
        assert_eq!(fp.nonzero_elements(), vec![(7, 3), (90, 1)]);
        assert_eq!(fp.on_bits(), vec![7, 90]);
        assert_eq!(fp.kind(), OutputKind::SparseCount);
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        let fp = Fingerprint::DenseCount(DenseCountFingerprint::new(16));
        let h = fp.content_hash();
        assert_eq!(h.len(), 64);
        assert_eq!(h, fp.clone().content_hash());
        assert_ne!(h, Fingerprint::DenseBit(DenseBitFingerprint::new(16)).content_hash());
    }

    #[test]
    fn test_serde_roundtrip_with_integer_keys() {
        let mut counts = SparseCountFingerprint::new(SPARSE_LENGTH);
        counts.counts.insert(4_000_000_000, 2);
        let fp = Fingerprint::SparseCount(counts);
        let text = serde_json::to_string(&fp).unwrap();
        assert!(text.starts_with("{\"sparse_count\""));
        let back: Fingerprint = serde_json::from_str(&text).unwrap();
        assert_eq!(back, fp);
    }
}
