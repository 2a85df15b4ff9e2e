//! Atom pairs.
//!
//! Every unordered pair of connected atoms whose topological distance lies in
//! `min_distance..=max_distance` contributes `hash(min(inv), d, max(inv))`.
//! Ordering the invariants makes the bucket independent of which atom of the
//! pair comes first.

use super::{Feature, FeatureEnumerator};
use crate::environment::{distance_matrix, UNREACHABLE};
use crate::hashing::hash_words;
use crate::invariants::AtomInvariant;
use crate::mol::MolGraph;

/// Atom pair enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomPairEnumerator {
    /// Smallest distance, inclusive.
    pub min_distance: u32,
    /// Largest distance, inclusive.
    pub max_distance: u32,
}

/// Bucket of an atom pair at distance `distance`.
pub fn pair_bucket(a: AtomInvariant, b: AtomInvariant, distance: u32) -> u32 {
    hash_words(0, &[a.min(b), distance, a.max(b)])
}

impl FeatureEnumerator for AtomPairEnumerator {
    fn enumerate(&self, mol: &MolGraph, invariants: &[AtomInvariant]) -> Vec<Feature> {
        let distances = distance_matrix(mol);
        let n = mol.num_atoms();
        let mut features = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let d = distances[i][j];
                if d == UNREACHABLE || d < self.min_distance || d > self.max_distance {
                    continue;
                }
                features.push(Feature {
                    bucket: pair_bucket(invariants[i], invariants[j], d),
                    atoms: vec![i, j],
                    bonds: Vec::new(),
                });
            }
        }
        features
    }
}
