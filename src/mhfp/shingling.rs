//! Molecular shingling: the token multiset MinHash runs over.
//!
//! Order of the sequence:
//!
//! 1. one token per SSSR ring (when `rings` is set), as unrooted fragment text
//! 2. for every atom, in index order, for radius `min_radius..=radius`:
//!    - radius 0: the atom token
//!    - radius r: the circular bond environment of radius r, rooted at the
//!      atom; once an environment cannot be grown no larger radius is tried
//!
//! Duplicates are kept.

use serde::{Deserialize, Serialize};

use super::canon::{atom_token, fragment_text, rooted_fragment_text};
use crate::environment::{bond_atoms, circular_environment};
use crate::error::InputError;
use crate::mol::rings::sssr;
use crate::mol::MolGraph;

fn default_radius() -> u32 {
    3
}

fn default_min_radius() -> u32 {
    1
}

fn default_rings() -> bool {
    true
}

/// Shingling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShinglingOptions {
    /// Largest environment radius.
    #[serde(default = "default_radius")]
    pub radius: u32,
    /// Emit one token per ring.
    #[serde(default = "default_rings")]
    pub rings: bool,
    /// Smallest environment radius; 0 adds the atom tokens.
    #[serde(default = "default_min_radius")]
    pub min_radius: u32,
}

impl Default for ShinglingOptions {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            rings: default_rings(),
            min_radius: default_min_radius(),
        }
    }
}

impl ShinglingOptions {
    /// Set the radius.
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Toggle ring tokens.
    pub fn with_rings(mut self, rings: bool) -> Self {
        self.rings = rings;
        self
    }

    /// Set the smallest radius.
    pub fn with_min_radius(mut self, min_radius: u32) -> Self {
        self.min_radius = min_radius;
        self
    }
}

/// Token sequence of a molecule.
pub fn shingling(mol: &MolGraph, options: &ShinglingOptions) -> Vec<String> {
    let mut shingles = Vec::new();

    if options.rings {
        for ring in sssr(mol) {
            shingles.push(fragment_text(mol, &ring.atoms, &ring.bonds));
        }
    }

    for atom in 0..mol.num_atoms() {
        for radius in options.min_radius..=options.radius {
            if radius == 0 {
                shingles.push(atom_token(mol.atom(atom)));
                continue;
            }
            let Some(bonds) = circular_environment(mol, atom, radius) else {
                break;
            };
            let atoms = bond_atoms(mol, &bonds);
            if let Some(text) = rooted_fragment_text(mol, &atoms, &bonds, atom) {
                shingles.push(text);
            }
        }
    }

    shingles
}

/// Token sequence of a molecule given as its JSON document.
pub fn shingling_from_json(text: &str, options: &ShinglingOptions) -> Result<Vec<String>, InputError> {
    let mol = MolGraph::from_json(text)?;
    Ok(shingling(&mol, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mol::test_mols::*;

    #[test]
    fn test_propane_shingles() {
        // radius 1 from every atom; radius 2 only from the ends
        let s = shingling(&alkane(3), &ShinglingOptions::default());
        assert_eq!(s.len(), 5);
        assert_eq!(s[0], "[CH3][CH2]");
        assert_eq!(s[1], "[CH3][CH2][CH3]");
    }

    #[test]
    fn test_min_radius_zero_adds_atom_tokens() {
        let opts = ShinglingOptions::default().with_min_radius(0);
        let s = shingling(&ethanol(), &opts);
        assert_eq!(s[0], "[CH3]");
        assert!(s.contains(&"[OH]".to_string()));
    }

    #[test]
    fn test_ring_tokens_come_first() {
        let s = shingling(&benzene(), &ShinglingOptions::default());
        assert_eq!(s[0], "[cH]1:[cH]:[cH]:[cH]:[cH]:[cH]:1");
        let without = shingling(&benzene(), &ShinglingOptions::default().with_rings(false));
        assert_eq!(s.len(), without.len() + 1);
    }

    #[test]
    fn test_json_path_matches_graph() {
        let mol = ethanol();
        let opts = ShinglingOptions::default();
        assert_eq!(shingling_from_json(&mol.to_json(), &opts).unwrap(), shingling(&mol, &opts));
    }
}
