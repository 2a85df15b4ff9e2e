//! Bond paths and subgraphs (Daylight-style path fingerprints).
//!
//! Every connected bond subgraph with `min_path..=max_path` bonds is
//! enumerated exactly once. With `branched = false` only linear subgraphs
//! (no atom of in-subgraph degree above two) are kept.
//!
//! Subgraph hash: each bond contributes
//! `hash(neighbouring bonds, bond invariant, (inv, degree) of both ends, ordered)`;
//! the bond hashes are sorted and folded into a seed that starts at the bond
//! count, so the result does not depend on bond or atom numbering.

use std::collections::BTreeMap;

use super::{Feature, FeatureEnumerator};
use crate::environment::{bond_atoms, connected_bond_subgraphs};
use crate::hashing::{hash_combine, hash_words};
use crate::invariants::{bond_invariant, AtomInvariant};
use crate::mol::MolGraph;

/// Path/subgraph enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEnumerator {
    /// Fewest bonds.
    pub min_path: usize,
    /// Most bonds.
    pub max_path: usize,
    /// Keep branched subgraphs.
    pub branched: bool,
    /// Fold bond orders into the hash.
    pub use_bond_order: bool,
}

impl PathEnumerator {
    fn subgraph_hash(&self, mol: &MolGraph, invariants: &[AtomInvariant], bonds: &[usize]) -> Option<u32> {
        let mut degree: BTreeMap<usize, u32> = BTreeMap::new();
        for &b in bonds {
            let bond = mol.bond(b);
            *degree.entry(bond.begin).or_insert(0) += 1;
            *degree.entry(bond.end).or_insert(0) += 1;
        }
        if !self.branched && degree.values().any(|&d| d > 2) {
            return None;
        }

        let mut bond_hashes: Vec<u32> = bonds
            .iter()
            .map(|&b| {
                let bond = mol.bond(b);
                let (db, de) = (degree[&bond.begin], degree[&bond.end]);
                let neighbours = db + de - 2;
                let ends = {
                    let x = (invariants[bond.begin], db);
                    let y = (invariants[bond.end], de);
                    if x <= y { (x, y) } else { (y, x) }
                };
                hash_words(
                    0,
                    &[
                        neighbours,
                        bond_invariant(bond, self.use_bond_order),
                        ends.0 .0,
                        ends.0 .1,
                        ends.1 .0,
                        ends.1 .1,
                    ],
                )
            })
            .collect();
        bond_hashes.sort_unstable();

        let mut seed = bonds.len() as u32;
        for h in bond_hashes {
            hash_combine(&mut seed, h);
        }
        Some(seed)
    }
}

impl FeatureEnumerator for PathEnumerator {
    fn enumerate(&self, mol: &MolGraph, invariants: &[AtomInvariant]) -> Vec<Feature> {
        connected_bond_subgraphs(mol, self.min_path, self.max_path)
            .into_iter()
            .filter_map(|bonds| {
                let bucket = self.subgraph_hash(mol, invariants, &bonds)?;
                Some(Feature {
                    bucket,
                    atoms: bond_atoms(mol, &bonds),
                    bonds,
                })
            })
            .collect()
    }
}
