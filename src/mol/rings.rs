//! Ring perception: ring bond flags and the smallest set of smallest rings.
//!
//! Ring membership is derived from bridges: a bond lies on a cycle iff it is
//! not a bridge. The SSSR is a minimum cycle basis computed from Horton's
//! candidate set (shortest path `v -> x`, bond `x-y`, shortest path `y -> v`)
//! with greedy GF(2) independence over bond incidence vectors.

use std::collections::{BTreeMap, VecDeque};

use super::{Bond, MolGraph};

/// One ring of the SSSR.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ring {
    /// Atoms in cycle order.
    pub atoms: Vec<usize>,
    /// Bond indices, ascending.
    pub bonds: Vec<usize>,
}

impl Ring {
    /// Ring size.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Rings always have at least three atoms; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// Flag every bond that lies on a cycle (iterative bridge search).
pub(crate) fn ring_bonds(atom_count: usize, bonds: &[Bond], adjacency: &[Vec<(usize, usize)>]) -> Vec<bool> {
    const UNSEEN: usize = usize::MAX;
    let mut disc = vec![UNSEEN; atom_count];
    let mut low = vec![0usize; atom_count];
    let mut is_bridge = vec![false; bonds.len()];
    let mut timer = 0usize;

    for root in 0..atom_count {
        if disc[root] != UNSEEN {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        // (atom, bond used to reach it, next adjacency slot)
        let mut stack: Vec<(usize, usize, usize)> = vec![(root, UNSEEN, 0)];

        while let Some(frame) = stack.last_mut() {
            let (v, parent_bond) = (frame.0, frame.1);
            if frame.2 < adjacency[v].len() {
                let (w, bond) = adjacency[v][frame.2];
                frame.2 += 1;
                if bond == parent_bond {
                    continue;
                }
                if disc[w] == UNSEEN {
                    disc[w] = timer;
                    low[w] = timer;
                    timer += 1;
                    stack.push((w, bond, 0));
                } else {
                    low[v] = low[v].min(disc[w]);
                }
            } else {
                stack.pop();
                if let Some(parent) = stack.last() {
                    let u = parent.0;
                    low[u] = low[u].min(low[v]);
                    if low[v] > disc[u] {
                        is_bridge[parent_bond] = true;
                    }
                }
            }
        }
    }

    is_bridge.into_iter().map(|b| !b).collect()
}

/// Smallest set of smallest rings.
///
/// Returns `E - V + C` rings, ordered by size then by bond indices.
pub fn sssr(mol: &MolGraph) -> Vec<Ring> {
    let n = mol.num_atoms();
    let nb = mol.num_bonds();
    let cyclomatic = (nb + mol.num_components()).saturating_sub(n);
    if cyclomatic == 0 {
        return Vec::new();
    }

    let mut candidates: BTreeMap<(usize, Vec<usize>), Vec<usize>> = BTreeMap::new();

    for root in (0..n).filter(|&a| mol.is_ring_atom(a)) {
        let (dist, parent) = ring_bfs(mol, root);
        for bond_idx in (0..nb).filter(|&b| mol.is_ring_bond(b)) {
            let bond = mol.bond(bond_idx);
            let (x, y) = (bond.begin, bond.end);
            if dist[x] == usize::MAX || dist[y] == usize::MAX {
                continue;
            }
            let path_x = path_to_root(&parent, x);
            let path_y = path_to_root(&parent, y);
            let disjoint = path_x
                .iter()
                .filter(|&&(atom, _)| atom != root)
                .all(|&(atom, _)| path_y.iter().all(|&(other, _)| other != atom));
            if !disjoint {
                continue;
            }

            let mut bonds: Vec<usize> = path_x
                .iter()
                .chain(path_y.iter())
                .filter_map(|&(_, b)| b)
                .collect();
            bonds.push(bond_idx);
            bonds.sort_unstable();
            bonds.dedup();

            // root ... x, then y ... (neighbour of root)
            let mut atoms: Vec<usize> = path_x.iter().rev().map(|&(a, _)| a).collect();
            atoms.extend(path_y.iter().map(|&(a, _)| a).filter(|&a| a != root));
            if atoms.len() < 3 || atoms.len() != bonds.len() {
                continue;
            }
            candidates.entry((bonds.len(), bonds)).or_insert(atoms);
        }
    }

    let words = nb.div_ceil(64);
    let mut basis: Vec<(usize, Vec<u64>)> = Vec::new();
    let mut rings = Vec::with_capacity(cyclomatic);

    for ((_, bonds), atoms) in candidates {
        let mut vector = vec![0u64; words];
        for &b in &bonds {
            vector[b / 64] |= 1 << (b % 64);
        }
        for (pivot, row) in &basis {
            if vector[pivot / 64] >> (pivot % 64) & 1 == 1 {
                for (v, r) in vector.iter_mut().zip(row) {
                    *v ^= r;
                }
            }
        }
        if let Some(pivot) = lowest_set_bit(&vector) {
            basis.push((pivot, vector));
            rings.push(Ring { atoms, bonds });
            if rings.len() == cyclomatic {
                break;
            }
        }
    }

    rings
}

/// BFS over ring bonds only. Parent links are (parent atom, bond).
fn ring_bfs(mol: &MolGraph, root: usize) -> (Vec<usize>, Vec<Option<(usize, usize)>>) {
    let n = mol.num_atoms();
    let mut dist = vec![usize::MAX; n];
    let mut parent = vec![None; n];
    let mut queue = VecDeque::new();
    dist[root] = 0;
    queue.push_back(root);
    while let Some(a) = queue.pop_front() {
        for &(nbr, bond) in mol.neighbors(a) {
            if mol.is_ring_bond(bond) && dist[nbr] == usize::MAX {
                dist[nbr] = dist[a] + 1;
                parent[nbr] = Some((a, bond));
                queue.push_back(nbr);
            }
        }
    }
    (dist, parent)
}

/// Walk parent links from `atom` to the BFS root: (atom, bond to its parent).
fn path_to_root(parent: &[Option<(usize, usize)>], atom: usize) -> Vec<(usize, Option<usize>)> {
    let mut path = Vec::new();
    let mut current = atom;
    loop {
        match parent[current] {
            Some((up, bond)) => {
                path.push((current, Some(bond)));
                current = up;
            }
            None => {
                path.push((current, None));
                break;
            }
        }
    }
    path
}

fn lowest_set_bit(words: &[u64]) -> Option<usize> {
    words
        .iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}
