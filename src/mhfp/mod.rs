//! MinHash fingerprints over molecular shingles (MHFP).
//!
//! Shingles are hashed with xxh64 (truncated to 32 bits) and passed through
//! `k` permutations of the form
//!
//! ```text
//! p_i(h) = ((a_i * h + b_i) mod (2^61 - 1)) & (2^32 - 1)
//! ```
//!
//! keeping the minimum per permutation. `a_i ∈ [1, 2^32)` and
//! `b_i ∈ [0, 2^32)` are drawn from `ChaCha8Rng::seed_from_u64(seed)`, all
//! `a` values first, so a `(k, seed)` pair fixes the permutation family on
//! every platform. Signatures are only comparable within one family.

pub mod canon;
pub mod shingling;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use shingling::{shingling, shingling_from_json, ShinglingOptions};

use crate::canonical::token_hash;
use crate::error::{ConfigError, InputError};
use crate::fingerprint::DenseBitFingerprint;
use crate::mol::MolGraph;

/// Mersenne prime 2^61 - 1.
const MERSENNE_PRIME: u128 = (1 << 61) - 1;
/// Low 32 bits.
const MAX_HASH: u128 = (1 << 32) - 1;

/// Default signature length.
pub const DEFAULT_PERMUTATIONS: usize = 128;
/// Default permutation seed.
pub const DEFAULT_SEED: u64 = 42;

/// A MinHash signature and the seed of its permutation family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MhfpSignature {
    /// Permutation seed.
    pub seed: u64,
    /// Minimum per permutation; `u32::MAX` for an empty shingle set.
    pub values: Vec<u32>,
}

impl MhfpSignature {
    /// Signature length.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the signature has no components.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fraction of differing components, in `[0, 1]`.
    pub fn distance(&self, other: &MhfpSignature) -> Result<f64, ConfigError> {
        if self.len() != other.len() {
            return Err(ConfigError::SignatureLengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        if self.seed != other.seed {
            return Err(ConfigError::SignatureSeedMismatch {
                left: self.seed,
                right: other.seed,
            });
        }
        if self.is_empty() {
            return Ok(0.0);
        }
        let differing = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a != b)
            .count();
        Ok(differing as f64 / self.len() as f64)
    }
}

/// MinHash encoder for a fixed permutation family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MhfpEncoder {
    seed: u64,
    a: Vec<u64>,
    b: Vec<u64>,
}

impl MhfpEncoder {
    /// Encoder with `n_permutations` permutations derived from `seed`.
    pub fn new(n_permutations: usize, seed: u64) -> Result<Self, ConfigError> {
        if n_permutations == 0 {
            return Err(ConfigError::NonPositiveBound { name: "n_permutations" });
        }
        Ok(Self::build(n_permutations, seed))
    }

    fn build(n_permutations: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = (0..n_permutations)
            .map(|_| rng.gen_range(1..=MAX_HASH as u64))
            .collect();
        let b = (0..n_permutations)
            .map(|_| rng.gen_range(0..=MAX_HASH as u64))
            .collect();
        Self { seed, a, b }
    }

    /// Signature length.
    pub fn n_permutations(&self) -> usize {
        self.a.len()
    }

    /// Permutation seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// MinHash of a set of 32-bit hashes.
    pub fn from_hashes(&self, hashes: &[u32]) -> MhfpSignature {
        let mut values = vec![u32::MAX; self.a.len()];
        for (slot, (&a, &b)) in values.iter_mut().zip(self.a.iter().zip(&self.b)) {
            for &h in hashes {
                let permuted = ((a as u128 * h as u128 + b as u128) % MERSENNE_PRIME) & MAX_HASH;
                *slot = (*slot).min(permuted as u32);
            }
        }
        MhfpSignature {
            seed: self.seed,
            values,
        }
    }

    /// MinHash of a set of text tokens.
    pub fn from_strings<S: AsRef<str>>(&self, tokens: &[S]) -> MhfpSignature {
        self.from_hashes(&hash_shingles(tokens))
    }

    /// Signature of a molecule.
    pub fn encode(&self, mol: &MolGraph, options: &ShinglingOptions) -> MhfpSignature {
        self.from_strings(&shingling(mol, options))
    }

    /// Signature of a molecule given as its JSON document.
    pub fn encode_json(&self, text: &str, options: &ShinglingOptions) -> Result<MhfpSignature, InputError> {
        Ok(self.from_strings(&shingling_from_json(text, options)?))
    }

    /// Signatures of many molecules, in input order.
    pub fn encode_many(&self, mols: &[MolGraph], options: &ShinglingOptions) -> Vec<MhfpSignature> {
        mols.par_iter().map(|mol| self.encode(mol, options)).collect()
    }

    /// Distance between two signatures.
    pub fn distance(a: &MhfpSignature, b: &MhfpSignature) -> Result<f64, ConfigError> {
        a.distance(b)
    }

    /// SECFP: shingle hashes folded into a dense bit fingerprint of `length` bits.
    pub fn secfp(mol: &MolGraph, options: &ShinglingOptions, length: usize) -> Result<DenseBitFingerprint, ConfigError> {
        if length == 0 {
            return Err(ConfigError::FingerprintSizeZero);
        }
        let mut fp = DenseBitFingerprint::new(length);
        for h in hash_shingles(&shingling(mol, options)) {
            fp.set(h as usize % length);
        }
        Ok(fp)
    }
}

impl Default for MhfpEncoder {
    fn default() -> Self {
        Self::build(DEFAULT_PERMUTATIONS, DEFAULT_SEED)
    }
}

/// 32-bit shingle hashes: xxh64 truncated.
pub fn hash_shingles<S: AsRef<str>>(tokens: &[S]) -> Vec<u32> {
    tokens
        .iter()
        .map(|t| (token_hash(t.as_ref()) & MAX_HASH as u64) as u32)
        .collect()
}
