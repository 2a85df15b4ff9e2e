//! Circular (Morgan / ECFP-style) environments.
//!
//! Layer 0 hashes every atom invariant. Layer `r` hashes, for each live
//! atom, the layer index, its own layer `r-1` bucket and the sorted
//! `(bond invariant, neighbour bucket)` pairs of its bonds.
//!
//! Each atom carries the set of bonds its environment covers. Within a
//! layer, results are sorted by `(bond set, bucket, atom)`; an environment
//! whose bond set has already been emitted (earlier in this layer or in any
//! earlier layer, by any atom) is dropped and its atom stops growing.

use std::collections::BTreeSet;
use tracing::trace;

use super::{Feature, FeatureEnumerator};
use crate::environment::{bond_atoms, BondSet};
use crate::hashing::{hash_combine, hash_words};
use crate::invariants::{bond_invariant, AtomInvariant};
use crate::mol::MolGraph;

/// Circular environment enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorganEnumerator {
    /// Largest radius, inclusive.
    pub radius: u32,
    /// Keep environments whose bond set was already emitted.
    pub include_redundant_environments: bool,
    /// Fold bond types into the layer hash.
    pub use_bond_types: bool,
}

impl FeatureEnumerator for MorganEnumerator {
    fn enumerate(&self, mol: &MolGraph, invariants: &[AtomInvariant]) -> Vec<Feature> {
        let n = mol.num_atoms();
        let mut features = Vec::with_capacity(n * (self.radius as usize + 1));

        let mut current: Vec<u32> = invariants.iter().map(|&inv| hash_words(0, &[inv])).collect();
        for (atom, &bucket) in current.iter().enumerate() {
            features.push(Feature {
                bucket,
                atoms: vec![atom],
                bonds: Vec::new(),
            });
        }

        let mut neighborhoods = vec![BondSet::new(mol.num_bonds()); n];
        let mut dead: Vec<bool> = (0..n).map(|a| mol.degree(a) == 0).collect();
        let mut emitted: BTreeSet<BondSet> = BTreeSet::new();

        for layer in 1..=self.radius {
            if dead.iter().all(|&d| d) {
                break;
            }
            let mut next = current.clone();
            let mut grown = neighborhoods.clone();
            let mut round: Vec<(BondSet, u32, usize)> = Vec::new();

            for atom in (0..n).filter(|&a| !dead[a]) {
                let mut pairs: Vec<(u32, u32)> = Vec::with_capacity(mol.degree(atom));
                for &(nbr, bond) in mol.neighbors(atom) {
                    grown[atom].insert(bond);
                    grown[atom].union_with(&neighborhoods[nbr]);
                    pairs.push((bond_invariant(mol.bond(bond), self.use_bond_types), current[nbr]));
                }
                pairs.sort_unstable();

                let mut bucket = layer - 1;
                hash_combine(&mut bucket, current[atom]);
                for (bond_inv, nbr_bucket) in pairs {
                    hash_combine(&mut bucket, bond_inv);
                    hash_combine(&mut bucket, nbr_bucket);
                }
                next[atom] = bucket;
                round.push((grown[atom].clone(), bucket, atom));
            }

            round.sort();
            let before = features.len();
            for (env, bucket, atom) in round {
                if !self.include_redundant_environments && emitted.contains(&env) {
                    dead[atom] = true;
                    continue;
                }
                let bonds: Vec<usize> = env.iter().collect();
                let mut atoms = vec![atom];
                atoms.extend(bond_atoms(mol, &bonds).into_iter().filter(|&a| a != atom));
                emitted.insert(env);
                features.push(Feature { bucket, atoms, bonds });
            }
            trace!(layer, emitted = features.len() - before, "morgan layer");

            current = next;
            neighborhoods = grown;
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::encoder::bucket_counts;
    use crate::invariants::{AtomInvariantProvider, MorganInvariants};
    use crate::mol::test_mols::*;
    use crate::mol::{Atom, MolGraph};

    fn morgan(radius: u32) -> MorganEnumerator {
        MorganEnumerator {
            radius,
            include_redundant_environments: false,
            use_bond_types: true,
        }
    }

    fn distinct_buckets(e: &MorganEnumerator, mol: &MolGraph) -> usize {
        let inv = MorganInvariants::default().compute(mol);
        bucket_counts(e.enumerate(mol, &inv).iter().map(|f| f.bucket)).len()
    }

    #[test]
    fn test_pentane_radius_three() {
        assert_eq!(distinct_buckets(&morgan(3), &alkane(5)), 7);
    }

    #[test]
    fn test_pentane_by_radius() {
        assert_eq!(distinct_buckets(&morgan(1), &alkane(5)), 5);
        assert_eq!(distinct_buckets(&morgan(2), &alkane(5)), 7);
    }

    #[test]
    fn test_redundant_environments_kept_on_request() {
        let mut e = morgan(3);
        e.include_redundant_environments = true;
        assert!(distinct_buckets(&e, &alkane(5)) > 7);
    }

    #[test]
    fn test_isolated_atom_only_layer_zero() {
        let mol = MolGraph::new(vec![Atom::new(6).with_hydrogens(4)], vec![]).unwrap();
        let inv = MorganInvariants::default().compute(&mol);
        let features = morgan(3).enumerate(&mol, &inv);
        assert_eq!(features.len(), 1);
        assert!(features[0].bonds.is_empty());
    }

    #[test]
    fn test_symmetric_ring_collapses() {
        // every benzene atom is equivalent, and the ring is covered by layer 3
        let mol = benzene();
        let inv = MorganInvariants::default().compute(&mol);
        let features = morgan(4).enumerate(&mol, &inv);
        let counts = bucket_counts(features.iter().map(|f| f.bucket));
        assert!(counts.values().all(|&c| c == 6 || c == 1));
        assert!(features.iter().all(|f| f.bonds.len() <= 6));
    }

    #[test]
    fn test_centre_listed_first() {
        let mol = ethanol();
        let inv = MorganInvariants::default().compute(&mol);
        for f in morgan(2).enumerate(&mol, &inv) {
            let centre = f.atoms[0];
            assert!(f.bonds.is_empty() || f.bonds.iter().any(|&b| {
                let bond = mol.bond(b);
                bond.begin == centre || bond.end == centre
            }));
        }
    }
}
