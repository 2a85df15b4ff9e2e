//! Molecular graph input boundary.
//!
//! The engine never parses chemical line notations. A [`MolGraph`] is built
//! by a collaborator, either programmatically ([`MolBuilder`],
//! [`MolGraph::new`]) or from its canonical JSON document
//! ([`MolGraph::from_json`]). Both paths yield identical graphs and therefore
//! identical fingerprints.
//!
//! ## Invariants
//!
//! - Atom indices are dense and zero-based
//! - Every bond references two distinct existing atoms
//! - At most one bond joins any atom pair
//! - Adjacency lists are ordered by bond index

pub mod rings;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::canonical_hash_hex;
use crate::error::InputError;

/// Tetrahedral chirality tag of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chirality {
    /// No stereo information.
    Unspecified,
    /// Clockwise neighbour ordering.
    Clockwise,
    /// Counter-clockwise neighbour ordering.
    CounterClockwise,
    /// Any other stereo class.
    Other,
}

impl Chirality {
    /// Parse a chirality tag from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "" | "unspecified" | "none" => Some(Self::Unspecified),
            "cw" | "clockwise" => Some(Self::Clockwise),
            "ccw" | "counter_clockwise" | "counterclockwise" => Some(Self::CounterClockwise),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Integer code folded into invariants.
    pub fn code(&self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Clockwise => 1,
            Self::CounterClockwise => 2,
            Self::Other => 3,
        }
    }
}

impl Default for Chirality {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// Type of a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondType {
    /// Single bond.
    Single,
    /// Double bond.
    Double,
    /// Triple bond.
    Triple,
    /// Aromatic bond.
    Aromatic,
    /// Any other bond class (dative, zero-order, ...).
    Other,
}

impl BondType {
    /// Parse bond type from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" | "1" | "-" => Some(Self::Single),
            "double" | "2" | "=" => Some(Self::Double),
            "triple" | "3" | "#" => Some(Self::Triple),
            "aromatic" | ":" => Some(Self::Aromatic),
            "other" | "~" => Some(Self::Other),
            _ => None,
        }
    }

    /// Integer code used as the bond invariant.
    pub fn code(&self) -> u32 {
        match self {
            Self::Other => 0,
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Aromatic => 4,
        }
    }

    /// Number of π electrons this bond contributes to each endpoint.
    pub fn pi_electrons(&self) -> u32 {
        match self {
            Self::Double | Self::Aromatic => 1,
            Self::Triple => 2,
            Self::Single | Self::Other => 0,
        }
    }
}

impl Default for BondType {
    fn default() -> Self {
        Self::Single
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Double => write!(f, "double"),
            Self::Triple => write!(f, "triple"),
            Self::Aromatic => write!(f, "aromatic"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// An atom with the static attributes the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    /// Element number.
    pub atomic_number: u8,
    /// Formal charge.
    #[serde(default)]
    pub formal_charge: i8,
    /// Hydrogens stored explicitly on the atom (e.g. bracket hydrogens).
    #[serde(default)]
    pub explicit_hydrogens: u8,
    /// Hydrogens implied by valence.
    #[serde(default)]
    pub implicit_hydrogens: u8,
    /// Aromaticity flag, as perceived by the collaborator.
    #[serde(default)]
    pub is_aromatic: bool,
    /// Chirality tag.
    #[serde(default)]
    pub chirality: Chirality,
}

impl Atom {
    /// Create an uncharged, non-aromatic atom without hydrogens.
    pub fn new(atomic_number: u8) -> Self {
        Self {
            atomic_number,
            formal_charge: 0,
            explicit_hydrogens: 0,
            implicit_hydrogens: 0,
            is_aromatic: false,
            chirality: Chirality::Unspecified,
        }
    }

    /// Set the implicit hydrogen count.
    pub fn with_hydrogens(mut self, count: u8) -> Self {
        self.implicit_hydrogens = count;
        self
    }

    /// Set the explicit hydrogen count.
    pub fn with_explicit_hydrogens(mut self, count: u8) -> Self {
        self.explicit_hydrogens = count;
        self
    }

    /// Set the formal charge.
    pub fn with_charge(mut self, charge: i8) -> Self {
        self.formal_charge = charge;
        self
    }

    /// Mark the atom aromatic.
    pub fn aromatic(mut self) -> Self {
        self.is_aromatic = true;
        self
    }

    /// Set the chirality tag.
    pub fn with_chirality(mut self, chirality: Chirality) -> Self {
        self.chirality = chirality;
        self
    }

    /// Explicit plus implicit hydrogens.
    pub fn total_hydrogens(&self) -> u32 {
        self.explicit_hydrogens as u32 + self.implicit_hydrogens as u32
    }

    /// Element symbol, if the element is in the table.
    pub fn symbol(&self) -> Option<&'static str> {
        element_symbol(self.atomic_number)
    }
}

/// A bond between two atoms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    /// First atom index.
    pub begin: usize,
    /// Second atom index.
    pub end: usize,
    /// Bond type.
    #[serde(default)]
    pub bond_type: BondType,
    /// Aromaticity flag.
    #[serde(default)]
    pub is_aromatic: bool,
}

impl Bond {
    /// Create a bond. Aromatic bond types are flagged aromatic.
    pub fn new(begin: usize, end: usize, bond_type: BondType) -> Self {
        Self {
            begin,
            end,
            bond_type,
            is_aromatic: bond_type == BondType::Aromatic,
        }
    }

    /// The endpoint opposite to `atom`.
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }
}

/// Serialized form of a molecule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MolDocument {
    /// Atoms in index order.
    pub atoms: Vec<Atom>,
    /// Bonds in index order.
    #[serde(default)]
    pub bonds: Vec<Bond>,
}

/// Validated molecular graph.
///
/// Immutable once built; degree, adjacency and ring membership are derived
/// at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MolDocument", into = "MolDocument")]
pub struct MolGraph {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Per atom: (neighbour atom, bond index), ordered by bond index.
    adjacency: Vec<Vec<(usize, usize)>>,
    ring_bonds: Vec<bool>,
    ring_atoms: Vec<bool>,
}

impl MolGraph {
    /// Build and validate a molecular graph.
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Result<Self, InputError> {
        let atom_count = atoms.len();
        let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); atom_count];
        let mut seen: BTreeMap<(usize, usize), usize> = BTreeMap::new();

        for (idx, bond) in bonds.iter().enumerate() {
            for atom in [bond.begin, bond.end] {
                if atom >= atom_count {
                    return Err(InputError::BondAtomOutOfRange { bond: idx, atom, atom_count });
                }
            }
            if bond.begin == bond.end {
                return Err(InputError::SelfBond { bond: idx, atom: bond.begin });
            }
            let key = (bond.begin.min(bond.end), bond.begin.max(bond.end));
            if let Some(&existing) = seen.get(&key) {
                return Err(InputError::DuplicateBond {
                    bond: idx,
                    existing,
                    begin: key.0,
                    end: key.1,
                });
            }
            seen.insert(key, idx);
            adjacency[bond.begin].push((bond.end, idx));
            adjacency[bond.end].push((bond.begin, idx));
        }

        let ring_bonds = rings::ring_bonds(atom_count, &bonds, &adjacency);
        let mut ring_atoms = vec![false; atom_count];
        for (idx, bond) in bonds.iter().enumerate() {
            if ring_bonds[idx] {
                ring_atoms[bond.begin] = true;
                ring_atoms[bond.end] = true;
            }
        }

        Ok(Self {
            atoms,
            bonds,
            adjacency,
            ring_bonds,
            ring_atoms,
        })
    }

    /// Molecule with no atoms.
    pub fn empty() -> Self {
        Self {
            atoms: Vec::new(),
            bonds: Vec::new(),
            adjacency: Vec::new(),
            ring_bonds: Vec::new(),
            ring_atoms: Vec::new(),
        }
    }

    /// Decode a molecule from its JSON document.
    pub fn from_json(text: &str) -> Result<Self, InputError> {
        let doc: MolDocument = serde_json::from_str(text)
            .map_err(|e| InputError::MalformedDocument(e.to_string()))?;
        Self::try_from(doc)
    }

    /// Encode the molecule as its JSON document.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_document()).unwrap_or_default()
    }

    /// Serializable document form.
    pub fn to_document(&self) -> MolDocument {
        MolDocument {
            atoms: self.atoms.clone(),
            bonds: self.bonds.clone(),
        }
    }

    /// Content hash of the document form (xxh64 hex).
    pub fn content_hash(&self) -> String {
        canonical_hash_hex(&self.to_document())
    }

    /// Relabel atoms: new atom `k` is old atom `order[k]`.
    ///
    /// `order` must be a permutation of `0..num_atoms()`. Bonds keep their
    /// relative order with remapped endpoints.
    pub fn relabeled(&self, order: &[usize]) -> Result<Self, InputError> {
        let n = self.atoms.len();
        if order.len() != n {
            return Err(InputError::RootAtomOutOfRange { atom: order.len(), atom_count: n });
        }
        let mut new_index = vec![usize::MAX; n];
        for (k, &old) in order.iter().enumerate() {
            if old >= n {
                return Err(InputError::RootAtomOutOfRange { atom: old, atom_count: n });
            }
            new_index[old] = k;
        }
        if let Some(missing) = new_index.iter().position(|&k| k == usize::MAX) {
            return Err(InputError::RootAtomOutOfRange { atom: missing, atom_count: order.len() });
        }
        let atoms = order.iter().map(|&old| self.atoms[old].clone()).collect();
        let bonds = self
            .bonds
            .iter()
            .map(|b| Bond {
                begin: new_index[b.begin],
                end: new_index[b.end],
                bond_type: b.bond_type,
                is_aromatic: b.is_aromatic,
            })
            .collect();
        Self::new(atoms, bonds)
    }

    /// Number of atoms.
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Number of bonds.
    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    /// Check whether the molecule has no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// All atoms.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// All bonds.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Atom by index.
    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    /// Bond by index.
    pub fn bond(&self, idx: usize) -> &Bond {
        &self.bonds[idx]
    }

    /// (neighbour, bond) pairs of an atom, ordered by bond index.
    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    /// Heavy-atom degree.
    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    /// Bond joining two atoms, if any.
    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .find(|&&(nbr, _)| nbr == b)
            .map(|&(_, bond)| bond)
    }

    /// Whether a bond lies on a cycle.
    pub fn is_ring_bond(&self, bond: usize) -> bool {
        self.ring_bonds[bond]
    }

    /// Whether an atom lies on a cycle.
    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.ring_atoms[atom]
    }

    /// Number of π electrons on an atom, summed over its bonds.
    pub fn pi_electrons(&self, atom: usize) -> u32 {
        self.adjacency[atom]
            .iter()
            .map(|&(_, bond)| self.bonds[bond].bond_type.pi_electrons())
            .sum()
    }

    /// Number of connected components.
    pub fn num_components(&self) -> usize {
        let n = self.atoms.len();
        let mut seen = vec![false; n];
        let mut components = 0;
        for start in 0..n {
            if seen[start] {
                continue;
            }
            components += 1;
            let mut stack = vec![start];
            seen[start] = true;
            while let Some(a) = stack.pop() {
                for &(nbr, _) in &self.adjacency[a] {
                    if !seen[nbr] {
                        seen[nbr] = true;
                        stack.push(nbr);
                    }
                }
            }
        }
        components
    }
}

impl TryFrom<MolDocument> for MolGraph {
    type Error = InputError;

    fn try_from(doc: MolDocument) -> Result<Self, Self::Error> {
        Self::new(doc.atoms, doc.bonds)
    }
}

impl From<MolGraph> for MolDocument {
    fn from(mol: MolGraph) -> Self {
        Self {
            atoms: mol.atoms,
            bonds: mol.bonds,
        }
    }
}

/// Incremental programmatic construction of a [`MolGraph`].
#[derive(Debug, Clone, Default)]
pub struct MolBuilder {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl MolBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an atom and return its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Append a bond and return its index. Validation happens in [`MolBuilder::build`].
    pub fn add_bond(&mut self, begin: usize, end: usize, bond_type: BondType) -> usize {
        self.bonds.push(Bond::new(begin, end, bond_type));
        self.bonds.len() - 1
    }

    /// Validate and build the graph.
    pub fn build(self) -> Result<MolGraph, InputError> {
        MolGraph::new(self.atoms, self.bonds)
    }
}

const ELEMENT_SYMBOLS: [&str; 54] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe",
];

/// Element symbol for an atomic number (1..=54).
pub fn element_symbol(atomic_number: u8) -> Option<&'static str> {
    match atomic_number {
        0 => None,
        z => ELEMENT_SYMBOLS.get(z as usize - 1).copied(),
    }
}

#[cfg(test)]
pub(crate) mod test_mols {
    //! Small molecules shared by unit tests.

    use super::*;

    /// Linear alkane with `n` carbons.
    pub fn alkane(n: usize) -> MolGraph {
        let mut b = MolBuilder::new();
        for i in 0..n {
            let degree = usize::from(i > 0) + usize::from(i + 1 < n);
            b.add_atom(Atom::new(6).with_hydrogens((4 - degree) as u8));
        }
        for i in 1..n {
            b.add_bond(i - 1, i, BondType::Single);
        }
        b.build().unwrap()
    }

    /// Cyclohexane.
    pub fn cyclohexane() -> MolGraph {
        let mut b = MolBuilder::new();
        for _ in 0..6 {
            b.add_atom(Atom::new(6).with_hydrogens(2));
        }
        for i in 0..6 {
            b.add_bond(i, (i + 1) % 6, BondType::Single);
        }
        b.build().unwrap()
    }

    /// Benzene with aromatic bonds.
    pub fn benzene() -> MolGraph {
        let mut b = MolBuilder::new();
        for _ in 0..6 {
            b.add_atom(Atom::new(6).with_hydrogens(1).aromatic());
        }
        for i in 0..6 {
            b.add_bond(i, (i + 1) % 6, BondType::Aromatic);
        }
        b.build().unwrap()
    }

    /// Ethanol: C-C-O.
    pub fn ethanol() -> MolGraph {
        let mut b = MolBuilder::new();
        b.add_atom(Atom::new(6).with_hydrogens(3));
        b.add_atom(Atom::new(6).with_hydrogens(2));
        b.add_atom(Atom::new(8).with_hydrogens(1));
        b.add_bond(0, 1, BondType::Single);
        b.add_bond(1, 2, BondType::Single);
        b.build().unwrap()
    }

    /// Isobutane: central carbon with three methyls.
    pub fn isobutane() -> MolGraph {
        let mut b = MolBuilder::new();
        b.add_atom(Atom::new(6).with_hydrogens(1));
        for _ in 0..3 {
            let m = b.add_atom(Atom::new(6).with_hydrogens(3));
            b.add_bond(0, m, BondType::Single);
        }
        b.build().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_mols::*;

    #[test]
    fn test_rejects_out_of_range_bond() {
        let err = MolGraph::new(vec![Atom::new(6)], vec![Bond::new(0, 1, BondType::Single)]).unwrap_err();
        assert_eq!(err, InputError::BondAtomOutOfRange { bond: 0, atom: 1, atom_count: 1 });
    }

    #[test]
    fn test_rejects_self_and_duplicate_bonds() {
        let atoms = vec![Atom::new(6), Atom::new(6)];
        let err = MolGraph::new(atoms.clone(), vec![Bond::new(1, 1, BondType::Single)]).unwrap_err();
        assert!(matches!(err, InputError::SelfBond { bond: 0, atom: 1 }));

        let bonds = vec![Bond::new(0, 1, BondType::Single), Bond::new(1, 0, BondType::Double)];
        let err = MolGraph::new(atoms, bonds).unwrap_err();
        assert!(matches!(err, InputError::DuplicateBond { bond: 1, existing: 0, .. }));
    }

    #[test]
    fn test_empty_molecule_is_valid() {
        let mol = MolGraph::new(vec![], vec![]).unwrap();
        assert!(mol.is_empty());
        assert_eq!(mol, MolGraph::empty());
    }

    #[test]
    fn test_json_roundtrip_preserves_graph() {
        let mol = ethanol();
        let text = mol.to_json();
        let back = MolGraph::from_json(&text).unwrap();
        assert_eq!(mol, back);
        assert_eq!(mol.content_hash(), back.content_hash());
    }

    #[test]
    fn test_json_rejects_bad_document() {
        assert!(matches!(
            MolGraph::from_json("{\"atoms\": 3}"),
            Err(InputError::MalformedDocument(_))
        ));
        let text = r#"{"atoms":[{"atomic_number":6}],"bonds":[{"begin":0,"end":4}]}"#;
        assert!(matches!(
            MolGraph::from_json(text),
            Err(InputError::BondAtomOutOfRange { atom: 4, .. })
        ));
    }

    #[test]
    fn test_ring_membership() {
        let chain = alkane(4);
        assert!((0..chain.num_atoms()).all(|a| !chain.is_ring_atom(a)));

        let ring = cyclohexane();
        assert!((0..ring.num_bonds()).all(|b| ring.is_ring_bond(b)));
    }

    #[test]
    fn test_relabeled_preserves_structure() {
        let mol = ethanol();
        let relabeled = mol.relabeled(&[2, 1, 0]).unwrap();
        assert_eq!(relabeled.atom(0).atomic_number, 8);
        assert_eq!(relabeled.degree(1), 2);
        assert!(relabeled.bond_between(0, 1).is_some());
        assert!(mol.relabeled(&[0, 0, 1]).is_err());
    }

    #[test]
    fn test_pi_electrons_and_symbols() {
        let mol = benzene();
        assert_eq!(mol.pi_electrons(0), 2);
        assert_eq!(mol.atom(0).symbol(), Some("C"));
        assert_eq!(element_symbol(35), Some("Br"));
        assert_eq!(element_symbol(0), None);
        assert_eq!(BondType::from_str("="), Some(BondType::Double));
    }
}
