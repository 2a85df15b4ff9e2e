//! Canonical text for molecular fragments.
//!
//! A fragment is a set of atoms plus the bonds between them that belong to
//! it. Its text is a SMILES-like line notation:
//!
//! - atoms are always bracketed: `[` symbol, hydrogens, charge `]`; aromatic
//!   atoms use a lowercase symbol (`[CH3]`, `[nH]`, `[O-]`, `[#87]`)
//! - bonds: single is implicit, then `=`, `#`, `:` and `~`
//! - branches in parentheses, ring closures as digits (`%nn` above 9)
//!
//! Traversal order comes from canonical ranks: atoms start ranked by
//! (token, fragment degree), ranks are refined from sorted neighbour
//! `(bond, rank)` lists until stable, and remaining ties are broken one at a
//! time by promoting the lowest atom index of the first tied class.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::mol::{element_symbol, Atom, BondType, MolGraph};

/// Bracketed atom token.
pub fn atom_token(atom: &Atom) -> String {
    let mut token = String::from("[");
    match element_symbol(atom.atomic_number) {
        Some(symbol) if atom.is_aromatic => token.push_str(&symbol.to_lowercase()),
        Some(symbol) => token.push_str(symbol),
        None => {
            let _ = write!(token, "#{}", atom.atomic_number);
        }
    }
    match atom.total_hydrogens() {
        0 => {}
        1 => token.push('H'),
        h => {
            let _ = write!(token, "H{h}");
        }
    }
    match atom.formal_charge {
        0 => {}
        1 => token.push('+'),
        -1 => token.push('-'),
        c if c > 0 => {
            let _ = write!(token, "+{c}");
        }
        c => {
            let _ = write!(token, "-{}", -(c as i16));
        }
    }
    token.push(']');
    token
}

fn bond_symbol(bond_type: BondType) -> &'static str {
    match bond_type {
        BondType::Single => "",
        BondType::Double => "=",
        BondType::Triple => "#",
        BondType::Aromatic => ":",
        BondType::Other => "~",
    }
}

/// A fragment with local atom numbering.
struct Fragment<'a> {
    mol: &'a MolGraph,
    /// Local index → molecule atom index.
    atoms: Vec<usize>,
    /// Local adjacency: (local neighbour, bond index), by bond index.
    adjacency: Vec<Vec<(usize, usize)>>,
    tokens: Vec<String>,
}

impl<'a> Fragment<'a> {
    fn new(mol: &'a MolGraph, atoms: &[usize], bonds: &[usize]) -> Self {
        let atoms: Vec<usize> = atoms.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let local: BTreeMap<usize, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        let mut adjacency = vec![Vec::new(); atoms.len()];
        let mut sorted_bonds = bonds.to_vec();
        sorted_bonds.sort_unstable();
        sorted_bonds.dedup();
        for b in sorted_bonds {
            let bond = mol.bond(b);
            if let (Some(&x), Some(&y)) = (local.get(&bond.begin), local.get(&bond.end)) {
                adjacency[x].push((y, b));
                adjacency[y].push((x, b));
            }
        }
        let tokens = atoms.iter().map(|&a| atom_token(mol.atom(a))).collect();
        Self {
            mol,
            atoms,
            adjacency,
            tokens,
        }
    }

    fn local_index(&self, atom: usize) -> Option<usize> {
        self.atoms.binary_search(&atom).ok()
    }

    fn bond_code(&self, bond: usize) -> u32 {
        self.mol.bond(bond).bond_type.code()
    }

    fn ranks(&self) -> Vec<usize> {
        let m = self.atoms.len();
        let mut ranks = dense_ranks(
            &(0..m)
                .map(|i| (self.tokens[i].as_str(), self.adjacency[i].len()))
                .collect::<Vec<_>>(),
        );
        loop {
            ranks = self.refine(ranks);
            let distinct = ranks.iter().collect::<BTreeSet<_>>().len();
            if distinct == m {
                return ranks;
            }
            // first tied class, lowest local index
            let mut by_rank: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, &r) in ranks.iter().enumerate() {
                by_rank.entry(r).or_default().push(i);
            }
            let chosen = by_rank
                .values()
                .find(|members| members.len() > 1)
                .map(|members| members[0]);
            let Some(chosen) = chosen else {
                return ranks;
            };
            ranks = dense_ranks(
                &ranks
                    .iter()
                    .enumerate()
                    .map(|(i, &r)| (r, usize::from(i != chosen)))
                    .collect::<Vec<_>>(),
            );
        }
    }

    fn refine(&self, mut ranks: Vec<usize>) -> Vec<usize> {
        loop {
            let keys: Vec<(usize, Vec<(u32, usize)>)> = (0..ranks.len())
                .map(|i| {
                    let mut nbrs: Vec<(u32, usize)> = self.adjacency[i]
                        .iter()
                        .map(|&(j, b)| (self.bond_code(b), ranks[j]))
                        .collect();
                    nbrs.sort_unstable();
                    (ranks[i], nbrs)
                })
                .collect();
            let next = dense_ranks(&keys);
            let before = ranks.iter().collect::<BTreeSet<_>>().len();
            let after = next.iter().collect::<BTreeSet<_>>().len();
            ranks = next;
            if after == before {
                return ranks;
            }
        }
    }

    /// Text rooted at local atom `root`; atoms unreachable from it are omitted.
    fn render(&self, root: usize, ranks: &[usize]) -> String {
        let m = self.atoms.len();
        let mut visited = vec![false; m];
        let mut children: Vec<Vec<(usize, usize)>> = vec![Vec::new(); m];
        let mut closures: Vec<Vec<(usize, usize)>> = vec![Vec::new(); m];
        let mut closure_bonds: BTreeSet<usize> = BTreeSet::new();
        let mut order = Vec::with_capacity(m);
        self.discover(root, None, ranks, &mut visited, &mut children, &mut closures, &mut closure_bonds, &mut order);

        let position: BTreeMap<usize, usize> = order.iter().enumerate().map(|(p, &a)| (a, p)).collect();
        for list in &mut closures {
            list.sort_by_key(|&(other, _)| (position[&other], ranks[other]));
        }

        let mut out = String::new();
        let mut open: BTreeMap<usize, usize> = BTreeMap::new();
        let mut free: BTreeSet<usize> = (1..100).collect();
        self.emit(root, &children, &closures, &mut open, &mut free, &mut out);
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn discover(
        &self,
        atom: usize,
        parent_bond: Option<usize>,
        ranks: &[usize],
        visited: &mut [bool],
        children: &mut [Vec<(usize, usize)>],
        closures: &mut [Vec<(usize, usize)>],
        closure_bonds: &mut BTreeSet<usize>,
        order: &mut Vec<usize>,
    ) {
        visited[atom] = true;
        order.push(atom);
        let mut nbrs = self.adjacency[atom].clone();
        nbrs.sort_by_key(|&(j, b)| (ranks[j], self.bond_code(b)));
        for (nbr, bond) in nbrs {
            if Some(bond) == parent_bond || closure_bonds.contains(&bond) {
                continue;
            }
            if visited[nbr] {
                closure_bonds.insert(bond);
                closures[atom].push((nbr, bond));
                closures[nbr].push((atom, bond));
            } else {
                children[atom].push((nbr, bond));
                self.discover(nbr, Some(bond), ranks, visited, children, closures, closure_bonds, order);
            }
        }
    }

    fn emit(
        &self,
        atom: usize,
        children: &[Vec<(usize, usize)>],
        closures: &[Vec<(usize, usize)>],
        open: &mut BTreeMap<usize, usize>,
        free: &mut BTreeSet<usize>,
        out: &mut String,
    ) {
        out.push_str(&self.tokens[atom]);
        for &(_, bond) in &closures[atom] {
            let digit = match open.remove(&bond) {
                Some(digit) => {
                    out.push_str(bond_symbol(self.mol.bond(bond).bond_type));
                    free.insert(digit);
                    digit
                }
                None => {
                    let digit = free.pop_first().unwrap_or(100 + open.len());
                    open.insert(bond, digit);
                    digit
                }
            };
            if digit < 10 {
                let _ = write!(out, "{digit}");
            } else {
                let _ = write!(out, "%{digit}");
            }
        }
        let count = children[atom].len();
        for (k, &(child, bond)) in children[atom].iter().enumerate() {
            let branch = k + 1 < count;
            if branch {
                out.push('(');
            }
            out.push_str(bond_symbol(self.mol.bond(bond).bond_type));
            self.emit(child, children, closures, open, free, out);
            if branch {
                out.push(')');
            }
        }
    }
}

/// Dense ranks of `keys`: equal keys share a rank, ranks follow key order.
fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let sorted: Vec<&K> = keys.iter().collect::<BTreeSet<_>>().into_iter().collect();
    keys.iter()
        .map(|k| sorted.binary_search(&k).unwrap_or_default())
        .collect()
}

/// Canonical text of a fragment, rooted at `root`.
///
/// Returns `None` when `root` is not part of the fragment.
pub fn rooted_fragment_text(mol: &MolGraph, atoms: &[usize], bonds: &[usize], root: usize) -> Option<String> {
    let fragment = Fragment::new(mol, atoms, bonds);
    let local_root = fragment.local_index(root)?;
    let ranks = fragment.ranks();
    Some(fragment.render(local_root, &ranks))
}

/// Canonical text of a fragment independent of any root: the smallest
/// rooted text over every atom.
pub fn fragment_text(mol: &MolGraph, atoms: &[usize], bonds: &[usize]) -> String {
    let fragment = Fragment::new(mol, atoms, bonds);
    let ranks = fragment.ranks();
    (0..fragment.atoms.len())
        .map(|root| fragment.render(root, &ranks))
        .min()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mol::test_mols::*;
    use crate::mol::{Atom, Chirality};

    #[test]
    fn test_atom_tokens() {
        assert_eq!(atom_token(&Atom::new(6).with_hydrogens(3)), "[CH3]");
        assert_eq!(atom_token(&Atom::new(7).with_hydrogens(1).aromatic()), "[nH]");
        assert_eq!(atom_token(&Atom::new(8).with_charge(-1)), "[O-]");
        assert_eq!(atom_token(&Atom::new(26).with_charge(3)), "[Fe+3]");
        assert_eq!(atom_token(&Atom::new(87)), "[#87]");
        // stereo is not part of the token
        assert_eq!(
            atom_token(&Atom::new(6).with_chirality(Chirality::Clockwise)),
            "[C]"
        );
    }

    #[test]
    fn test_chain_text() {
        let mol = ethanol();
        assert_eq!(
            rooted_fragment_text(&mol, &[0, 1, 2], &[0, 1], 0).unwrap(),
            "[CH3][CH2][OH]"
        );
        assert_eq!(
            rooted_fragment_text(&mol, &[0, 1, 2], &[0, 1], 1).unwrap(),
            "[CH2]([CH3])[OH]"
        );
        assert!(rooted_fragment_text(&mol, &[0, 1], &[0], 2).is_none());
    }

    #[test]
    fn test_ring_text_has_closure() {
        let mol = benzene();
        let atoms: Vec<usize> = (0..6).collect();
        let bonds: Vec<usize> = (0..6).collect();
        let text = fragment_text(&mol, &atoms, &bonds);
        assert_eq!(text, "[cH]1:[cH]:[cH]:[cH]:[cH]:[cH]:1");
    }

    #[test]
    fn test_text_independent_of_numbering() {
        let mol = ethanol();
        let relabeled = mol.relabeled(&[2, 0, 1]).unwrap();
        // old atom 1 (the CH2) is new atom 2
        let a = rooted_fragment_text(&mol, &[0, 1, 2], &[0, 1], 1).unwrap();
        let b = rooted_fragment_text(&relabeled, &[0, 1, 2], &[0, 1], 2).unwrap();
        assert_eq!(a, b);
    }
}
