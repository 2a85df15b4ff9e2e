//! Topological torsions: linear paths of a fixed atom count.
//!
//! A path is encoded as `(inv, bond, inv, bond, ..., inv)` in both
//! directions; the lexicographically smaller encoding is hashed so that a
//! path and its reverse share a bucket.

use super::{Feature, FeatureEnumerator};
use crate::environment::simple_paths;
use crate::hashing::hash_words;
use crate::invariants::{bond_invariant, AtomInvariant};
use crate::mol::MolGraph;

/// Topological torsion enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorsionEnumerator {
    /// Atoms per path.
    pub atom_count: usize,
}

fn encode_path(mol: &MolGraph, invariants: &[AtomInvariant], path: &[usize]) -> Vec<u32> {
    let mut words = Vec::with_capacity(path.len() * 2);
    for (k, &atom) in path.iter().enumerate() {
        if k > 0 {
            let bond = mol.bond_between(path[k - 1], atom).map_or(0, |b| bond_invariant(mol.bond(b), true));
            words.push(bond);
        }
        words.push(invariants[atom]);
    }
    words
}

impl FeatureEnumerator for TorsionEnumerator {
    fn enumerate(&self, mol: &MolGraph, invariants: &[AtomInvariant]) -> Vec<Feature> {
        simple_paths(mol, self.atom_count)
            .into_iter()
            .map(|path| {
                let forward = encode_path(mol, invariants, &path);
                let mut reversed = forward.clone();
                reversed.reverse();
                let canonical = forward.min(reversed);
                let mut bonds: Vec<usize> = path
                    .windows(2)
                    .filter_map(|w| mol.bond_between(w[0], w[1]))
                    .collect();
                bonds.sort_unstable();
                Feature {
                    bucket: hash_words(0, &canonical),
                    atoms: path,
                    bonds,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::encoder::bucket_counts;
    use crate::invariants::{AtomInvariantProvider, AtomPairInvariants};
    use crate::mol::test_mols::*;
    use crate::mol::{Atom, BondType, MolBuilder};

    fn distinct(atom_count: usize, mol: &MolGraph) -> usize {
        let inv = AtomPairInvariants::default().compute(mol);
        let features = TorsionEnumerator { atom_count }.enumerate(mol, &inv);
        bucket_counts(features.iter().map(|f| f.bucket)).len()
    }

    #[test]
    fn test_pentane_single_bucket() {
        assert_eq!(distinct(4, &alkane(5)), 1);
    }

    #[test]
    fn test_too_short_molecule_has_no_torsions() {
        assert_eq!(distinct(4, &alkane(3)), 0);
    }

    #[test]
    fn test_direction_does_not_matter() {
        // C-C-C-O read from either end
        let mut b = MolBuilder::new();
        b.add_atom(Atom::new(8).with_hydrogens(1));
        b.add_atom(Atom::new(6).with_hydrogens(2));
        b.add_atom(Atom::new(6).with_hydrogens(2));
        b.add_atom(Atom::new(6).with_hydrogens(3));
        for i in 0..3 {
            b.add_bond(i, i + 1, BondType::Single);
        }
        let forward = b.build().unwrap();
        let reversed = forward.relabeled(&[3, 2, 1, 0]).unwrap();

        let inv_f = AtomPairInvariants::default().compute(&forward);
        let inv_r = AtomPairInvariants::default().compute(&reversed);
        let e = TorsionEnumerator { atom_count: 4 };
        assert_eq!(e.enumerate(&forward, &inv_f)[0].bucket, e.enumerate(&reversed, &inv_r)[0].bucket);
    }

    #[test]
    fn test_configurable_length() {
        // pentane 3-atom paths: terminal-inner-inner (x2) and inner-inner-inner
        assert_eq!(distinct(3, &alkane(5)), 2);
    }
}
