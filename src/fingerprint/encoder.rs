//! Bucket multiset → fingerprint.
//!
//! The encoder is a pure function of the buckets, the requested output kind
//! and the [`EncoderSettings`]. It never looks at the molecule.
//!
//! ## Bit schemes
//!
//! - `Single`: one bit per distinct bucket.
//! - `CountSimulation { n }`: a bucket with count `c` sets bit `j` of its
//!   `n`-bit block for every `j < n` with `c >= 2^j`, so a count survives in
//!   a boolean output as `min(n, floor(log2 c) + 1)` bits.
//! - `MultiBit { n }`: every bucket sets `n` distinct seeded positions,
//!   independent of its count.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    DenseBitFingerprint, DenseCountFingerprint, Fingerprint, OutputKind, SparseBitFingerprint,
    SparseCountFingerprint, SPARSE_LENGTH,
};
use crate::error::ConfigError;
use crate::generator::config::MAX_BITS_PER_FEATURE;
use crate::hashing::seeded_positions;

/// How buckets map to bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum BitScheme {
    /// One bit per bucket.
    Single,
    /// Threshold bits per bucket count.
    CountSimulation {
        /// Bits per block.
        n: u32,
    },
    /// Seeded positions per bucket.
    MultiBit {
        /// Positions per bucket.
        n: u32,
    },
}

impl BitScheme {
    /// Bits reserved per bucket.
    pub fn bits_per_feature(&self) -> u32 {
        match self {
            Self::Single => 1,
            Self::CountSimulation { n } | Self::MultiBit { n } => *n,
        }
    }
}

/// Encoder parameters.
///
/// Only constructed through [`EncoderSettings::new`] or a validated
/// generator config, so `fp_size` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EncoderSettings {
    pub(crate) fp_size: usize,
    pub(crate) scheme: BitScheme,
}

impl EncoderSettings {
    /// Check the dense length against the bit scheme.
    pub fn new(fp_size: usize, scheme: BitScheme) -> Result<Self, ConfigError> {
        if fp_size == 0 {
            return Err(ConfigError::FingerprintSizeZero);
        }
        let n = scheme.bits_per_feature();
        if n == 0 || n > MAX_BITS_PER_FEATURE {
            return Err(ConfigError::InvalidBitsPerFeature(n));
        }
        if matches!(scheme, BitScheme::CountSimulation { .. }) && fp_size < n as usize {
            return Err(ConfigError::FingerprintTooSmall { fp_size, num_bits: n });
        }
        Ok(Self { fp_size, scheme })
    }

    /// Dense output length.
    pub fn fp_size(&self) -> usize {
        self.fp_size
    }

    /// Bucket-to-bit mapping.
    pub fn scheme(&self) -> BitScheme {
        self.scheme
    }
}

/// Count simulation bit offsets for a count: every `j < n` with `count >= 2^j`.
pub fn count_simulation_bits(count: u32, n: u32) -> impl Iterator<Item = u64> {
    (0..n).take_while(move |&j| count as u64 >= 1u64 << j).map(u64::from)
}

/// Tally a bucket sequence.
pub fn bucket_counts<I: IntoIterator<Item = u32>>(buckets: I) -> BTreeMap<u32, u32> {
    let mut counts = BTreeMap::new();
    for bucket in buckets {
        *counts.entry(bucket).or_insert(0) += 1;
    }
    counts
}

/// Encode bucket counts in the requested representation.
pub fn encode(counts: &BTreeMap<u32, u32>, kind: OutputKind, settings: &EncoderSettings) -> Fingerprint {
    match kind {
        OutputKind::SparseCount => Fingerprint::SparseCount(sparse_count(counts)),
        OutputKind::SparseBit => Fingerprint::SparseBit(sparse_bits(counts, settings.scheme)),
        OutputKind::DenseCount => Fingerprint::DenseCount(dense_counts(counts, settings)),
        OutputKind::DenseBit => Fingerprint::DenseBit(dense_bits(counts, settings)),
    }
}

/// Unfolded counts.
pub fn sparse_count(counts: &BTreeMap<u32, u32>) -> SparseCountFingerprint {
    SparseCountFingerprint {
        length: SPARSE_LENGTH,
        counts: counts.iter().map(|(&b, &c)| (b as u64, c)).collect(),
    }
}

/// Unfolded bits.
pub fn sparse_bits(counts: &BTreeMap<u32, u32>, scheme: BitScheme) -> SparseBitFingerprint {
    let mut bits = BTreeSet::new();
    let length = match scheme {
        BitScheme::Single => {
            bits.extend(counts.keys().map(|&b| b as u64));
            SPARSE_LENGTH
        }
        BitScheme::CountSimulation { n } => {
            for (&bucket, &count) in counts {
                let base = bucket as u64 * n as u64;
                bits.extend(count_simulation_bits(count, n).map(|j| base + j));
            }
            SPARSE_LENGTH * n as u64
        }
        BitScheme::MultiBit { n } => {
            for &bucket in counts.keys() {
                bits.extend(seeded_positions(bucket, n as usize, SPARSE_LENGTH));
            }
            SPARSE_LENGTH
        }
    };
    SparseBitFingerprint { length, bits }
}

/// Folded counts; colliding buckets sum.
pub fn dense_counts(counts: &BTreeMap<u32, u32>, settings: &EncoderSettings) -> DenseCountFingerprint {
    let size = settings.fp_size as u64;
    let mut fp = DenseCountFingerprint::new(settings.fp_size);
    for (&bucket, &count) in counts {
        for pos in folded_positions(bucket, size, settings.scheme) {
            let slot = &mut fp.counts[pos as usize];
            *slot = slot.saturating_add(count);
        }
    }
    fp
}

/// Folded bits; colliding buckets OR together.
pub fn dense_bits(counts: &BTreeMap<u32, u32>, settings: &EncoderSettings) -> DenseBitFingerprint {
    let size = settings.fp_size as u64;
    let mut fp = DenseBitFingerprint::new(settings.fp_size);
    for (&bucket, &count) in counts {
        match settings.scheme {
            BitScheme::CountSimulation { n } => {
                let n = n as u64;
                let block = bucket as u64 % (size / n);
                for j in count_simulation_bits(count, n as u32) {
                    fp.set((block * n + j) as usize);
                }
            }
            scheme => {
                for pos in folded_positions(bucket, size, scheme) {
                    fp.set(pos as usize);
                }
            }
        }
    }
    fp
}

/// Positions a bucket occupies in a folded output of length `size`.
///
/// Count simulation does not apply to counts, so it folds like `Single`.
fn folded_positions(bucket: u32, size: u64, scheme: BitScheme) -> Vec<u64> {
    match scheme {
        BitScheme::Single | BitScheme::CountSimulation { .. } => vec![bucket as u64 % size],
        BitScheme::MultiBit { n } => {
            let mut positions: Vec<u64> = seeded_positions(bucket, n as usize, SPARSE_LENGTH)
                .into_iter()
                .map(|p| p % size)
                .collect();
            positions.sort_unstable();
            positions.dedup();
            positions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(fp_size: usize, scheme: BitScheme) -> EncoderSettings {
        EncoderSettings::new(fp_size, scheme).unwrap()
    }

    #[test]
    fn test_count_simulation_law() {
        for (count, expected) in [(1, 1), (2, 2), (3, 2), (4, 3), (7, 3), (8, 4), (1000, 4)] {
            assert_eq!(count_simulation_bits(count, 4).count(), expected, "count {count}");
        }
        assert_eq!(count_simulation_bits(0, 4).count(), 0);
    }

    #[test]
    fn test_sparse_bits_count_simulation_layout() {
        let counts = bucket_counts([10, 10, 11]);
        let fp = sparse_bits(&counts, BitScheme::CountSimulation { n: 4 });
        assert_eq!(fp.on_bits(), vec![40, 41, 44]);
        assert_eq!(fp.length, SPARSE_LENGTH * 4);
    }

    #[test]
    fn test_single_scheme_one_bit_per_bucket() {
        let counts = bucket_counts([5, 5, 5, 9]);
        let fp = sparse_bits(&counts, BitScheme::Single);
        assert_eq!(fp.on_bits(), vec![5, 9]);
    }

    #[test]
    fn test_dense_counts_fold_and_sum() {
        let counts = bucket_counts([1, 17, 17, 3]);
        let fp = dense_counts(&counts, &settings(16, BitScheme::Single));
        assert_eq!(fp.counts[1], 3);
        assert_eq!(fp.counts[3], 1);
        assert_eq!(fp.total(), 4);
    }

    #[test]
    fn test_dense_bits_count_simulation_blocks() {
        // size 16, n 4: 4 blocks; bucket 6 -> block 2 (bits 8..12)
        let counts = bucket_counts([6, 6, 6]);
        let fp = dense_bits(&counts, &settings(16, BitScheme::CountSimulation { n: 4 }));
        assert_eq!(fp.on_bits(), vec![8, 9]);
    }

    #[test]
    fn test_multibit_sets_distinct_positions() {
        let counts = bucket_counts([123_456]);
        let sparse = sparse_bits(&counts, BitScheme::MultiBit { n: 2 });
        assert_eq!(sparse.num_on_bits(), 2);
        let dense = dense_bits(&counts, &settings(2048, BitScheme::MultiBit { n: 2 }));
        assert!(dense.num_on_bits() >= 1 && dense.num_on_bits() <= 2);
        let dense_counts = dense_counts(&counts, &settings(2048, BitScheme::MultiBit { n: 2 }));
        assert_eq!(dense_counts.total() as usize, dense.num_on_bits());
    }

    #[test]
    fn test_encode_dispatches_on_kind() {
        let counts = bucket_counts([1, 2]);
        let s = settings(64, BitScheme::Single);
        for kind in OutputKind::ALL {
            assert_eq!(encode(&counts, kind, &s).kind(), kind);
        }
    }

    #[test]
    fn test_settings_reject_unusable_sizes() {
        assert_eq!(
            EncoderSettings::new(0, BitScheme::Single),
            Err(ConfigError::FingerprintSizeZero)
        );
        assert_eq!(
            EncoderSettings::new(64, BitScheme::MultiBit { n: 0 }),
            Err(ConfigError::InvalidBitsPerFeature(0))
        );
        assert_eq!(
            EncoderSettings::new(2, BitScheme::CountSimulation { n: 4 }),
            Err(ConfigError::FingerprintTooSmall { fp_size: 2, num_bits: 4 })
        );
        let s = EncoderSettings::new(16, BitScheme::CountSimulation { n: 4 }).unwrap();
        assert_eq!((s.fp_size(), s.scheme()), (16, BitScheme::CountSimulation { n: 4 }));
    }
}
