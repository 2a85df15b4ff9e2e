//! Environment enumeration shared by the generators and the MHFP shingler.
//!
//! - [`distance_matrix`]: all-pairs topological distances (BFS per atom)
//! - [`simple_paths`]: every simple path with a given atom count, once each
//! - [`connected_bond_subgraphs`]: every connected bond subset within a size
//!   window, once each (ESU over the line graph)
//! - [`circular_environment`]: the bond shell grown around an atom
//!
//! Enumeration order is a pure function of atom and bond indices.

use std::collections::VecDeque;

use crate::mol::MolGraph;

/// Distance value for atoms in different components.
pub const UNREACHABLE: u32 = u32::MAX;

/// Fixed-width set of bond indices.
///
/// Ordered lexicographically on its words, which gives Morgan rounds a total
/// order independent of how the set was built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BondSet(Vec<u64>);

impl BondSet {
    /// Empty set able to hold `num_bonds` bonds.
    pub fn new(num_bonds: usize) -> Self {
        Self(vec![0; num_bonds.div_ceil(64)])
    }

    /// Add a bond.
    pub fn insert(&mut self, bond: usize) {
        self.0[bond / 64] |= 1 << (bond % 64);
    }

    /// Membership test.
    pub fn contains(&self, bond: usize) -> bool {
        self.0[bond / 64] >> (bond % 64) & 1 == 1
    }

    /// In-place union.
    pub fn union_with(&mut self, other: &BondSet) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= b;
        }
    }

    /// Number of bonds in the set.
    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Bond indices, ascending.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(i, &word)| {
            (0..64).filter(move |bit| word >> bit & 1 == 1).map(move |bit| i * 64 + bit)
        })
    }
}

/// All-pairs shortest path lengths in bonds; [`UNREACHABLE`] across components.
pub fn distance_matrix(mol: &MolGraph) -> Vec<Vec<u32>> {
    let n = mol.num_atoms();
    let mut matrix = vec![vec![UNREACHABLE; n]; n];
    let mut queue = VecDeque::new();
    for (source, row) in matrix.iter_mut().enumerate() {
        row[source] = 0;
        queue.clear();
        queue.push_back(source);
        while let Some(a) = queue.pop_front() {
            let next = row[a] + 1;
            for &(nbr, _) in mol.neighbors(a) {
                if row[nbr] == UNREACHABLE {
                    row[nbr] = next;
                    queue.push_back(nbr);
                }
            }
        }
    }
    matrix
}

/// Every simple path of exactly `atom_count` atoms, reported once.
///
/// Each path is found from both ends; only the direction whose first atom has
/// the lower index is kept.
pub fn simple_paths(mol: &MolGraph, atom_count: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if atom_count < 2 {
        return out;
    }
    let mut on_path = vec![false; mol.num_atoms()];
    let mut path = Vec::with_capacity(atom_count);
    for start in 0..mol.num_atoms() {
        path.push(start);
        on_path[start] = true;
        extend_path(mol, atom_count, &mut path, &mut on_path, &mut out);
        on_path[start] = false;
        path.pop();
    }
    out
}

fn extend_path(
    mol: &MolGraph,
    atom_count: usize,
    path: &mut Vec<usize>,
    on_path: &mut [bool],
    out: &mut Vec<Vec<usize>>,
) {
    if path.len() == atom_count {
        if path[0] < path[atom_count - 1] {
            out.push(path.clone());
        }
        return;
    }
    let last = path[path.len() - 1];
    for &(nbr, _) in mol.neighbors(last) {
        if on_path[nbr] {
            continue;
        }
        on_path[nbr] = true;
        path.push(nbr);
        extend_path(mol, atom_count, path, on_path, out);
        path.pop();
        on_path[nbr] = false;
    }
}

/// Line graph adjacency: bonds sharing an atom, ascending, without duplicates.
pub fn bond_adjacency(mol: &MolGraph) -> Vec<Vec<usize>> {
    (0..mol.num_bonds())
        .map(|b| {
            let bond = mol.bond(b);
            let mut nbrs: Vec<usize> = [bond.begin, bond.end]
                .iter()
                .flat_map(|&a| mol.neighbors(a).iter().map(|&(_, other)| other))
                .filter(|&other| other != b)
                .collect();
            nbrs.sort_unstable();
            nbrs.dedup();
            nbrs
        })
        .collect()
}

/// Every connected bond subgraph with `min_bonds..=max_bonds` bonds, once each.
///
/// Subgraphs are returned as ascending bond index lists. Uses the ESU scheme
/// on the line graph: each subgraph is rooted at its lowest bond index and
/// only grown through the exclusive neighbourhood of the newest member.
pub fn connected_bond_subgraphs(mol: &MolGraph, min_bonds: usize, max_bonds: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if max_bonds == 0 || min_bonds > max_bonds {
        return out;
    }
    let line = bond_adjacency(mol);
    let mut members = Vec::with_capacity(max_bonds);
    for root in 0..mol.num_bonds() {
        members.push(root);
        let extension: Vec<usize> = line[root].iter().copied().filter(|&u| u > root).collect();
        extend_subgraph(&line, root, min_bonds, max_bonds, &mut members, extension, &mut out);
        members.pop();
    }
    out
}

fn extend_subgraph(
    line: &[Vec<usize>],
    root: usize,
    min_bonds: usize,
    max_bonds: usize,
    members: &mut Vec<usize>,
    mut extension: Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if members.len() >= min_bonds {
        let mut found = members.clone();
        found.sort_unstable();
        out.push(found);
    }
    if members.len() == max_bonds {
        return;
    }
    while let Some(w) = extension.pop() {
        let mut next = extension.clone();
        for &u in &line[w] {
            if u <= root || members.contains(&u) || next.contains(&u) {
                continue;
            }
            let touches_members = members.iter().any(|&m| line[m].binary_search(&u).is_ok());
            if !touches_members {
                next.push(u);
            }
        }
        members.push(w);
        extend_subgraph(line, root, min_bonds, max_bonds, members, next, out);
        members.pop();
    }
}

/// Bonds within `radius` shells of `center`, in discovery order.
///
/// Shell 1 is the bonds of `center`; shell k+1 the not-yet-included bonds of
/// the atoms reached in shell k. Returns `None` when the molecule runs out of
/// candidate bonds before `radius` shells were grown.
pub fn circular_environment(mol: &MolGraph, center: usize, radius: u32) -> Option<Vec<usize>> {
    if radius == 0 {
        return Some(Vec::new());
    }
    let mut included = vec![false; mol.num_bonds()];
    let mut result = Vec::new();
    let mut frontier: Vec<(usize, usize)> = mol.neighbors(center).iter().map(|&(a, b)| (b, a)).collect();

    for shell in 0..radius {
        if frontier.is_empty() {
            return None;
        }
        let mut next = Vec::new();
        for &(bond, atom) in &frontier {
            if included[bond] {
                continue;
            }
            included[bond] = true;
            result.push(bond);
            if shell + 1 < radius {
                for &(nbr, other_bond) in mol.neighbors(atom) {
                    if !included[other_bond] {
                        next.push((other_bond, nbr));
                    }
                }
            }
        }
        frontier = next;
    }
    Some(result)
}

/// Atoms touched by a set of bonds, ascending.
pub fn bond_atoms(mol: &MolGraph, bonds: &[usize]) -> Vec<usize> {
    let mut atoms: Vec<usize> = bonds
        .iter()
        .flat_map(|&b| [mol.bond(b).begin, mol.bond(b).end])
        .collect();
    atoms.sort_unstable();
    atoms.dedup();
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mol::test_mols::*;

    #[test]
    fn test_bond_set_ops() {
        let mut a = BondSet::new(70);
        a.insert(3);
        a.insert(65);
        let mut b = BondSet::new(70);
        b.insert(4);
        b.union_with(&a);
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![3, 4, 65]);
        assert!(b.contains(65));
        assert_eq!(b.len(), 3);
        assert!(BondSet::new(5).is_empty());
    }

    #[test]
    fn test_distance_matrix_chain() {
        let d = distance_matrix(&alkane(4));
        assert_eq!(d[0][3], 3);
        assert_eq!(d[3][0], 3);
        assert_eq!(d[1][1], 0);
    }

    #[test]
    fn test_distance_matrix_disconnected() {
        let mol = crate::mol::MolGraph::new(
            vec![crate::mol::Atom::new(6), crate::mol::Atom::new(8)],
            vec![],
        )
        .unwrap();
        assert_eq!(distance_matrix(&mol)[0][1], UNREACHABLE);
    }

    #[test]
    fn test_simple_paths_counted_once() {
        assert_eq!(simple_paths(&alkane(5), 4).len(), 2);
        assert_eq!(simple_paths(&alkane(3), 4).len(), 0);
        // every 4-atom walk around a 6-ring, once per direction pair
        assert_eq!(simple_paths(&cyclohexane(), 4).len(), 6);
    }

    #[test]
    fn test_connected_subgraphs_chain() {
        // pentane: 4 bonds; connected subsets are contiguous runs
        let subs = connected_bond_subgraphs(&alkane(5), 1, 7);
        assert_eq!(subs.len(), 4 + 3 + 2 + 1);
        let mut unique = subs.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), subs.len());
    }

    #[test]
    fn test_connected_subgraphs_branched() {
        // isobutane: 3 bonds all sharing the centre, every subset is connected
        let subs = connected_bond_subgraphs(&isobutane(), 1, 3);
        assert_eq!(subs.len(), 7);
    }

    #[test]
    fn test_connected_subgraphs_ring() {
        // six-ring: runs of length 1..5 (6 each) plus the full ring
        let subs = connected_bond_subgraphs(&cyclohexane(), 1, 6);
        assert_eq!(subs.len(), 6 * 5 + 1);
    }

    #[test]
    fn test_circular_environment_runs_out() {
        let mol = alkane(3);
        assert_eq!(circular_environment(&mol, 0, 1), Some(vec![0]));
        assert_eq!(circular_environment(&mol, 0, 2), Some(vec![0, 1]));
        assert_eq!(circular_environment(&mol, 0, 3), None);
        assert_eq!(circular_environment(&mol, 1, 2), None);
    }
}
