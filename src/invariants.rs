//! Atom invariant providers.
//!
//! An invariant is the atomic unit of identity every generator hashes from.
//! Generators never look at atom attributes directly; they consume whatever
//! [`AtomInvariantProvider`] they were configured with, so a custom notion of
//! atom identity can be swapped in without touching any generator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::hashing::{hash_combine, hash_words};
use crate::mol::{Bond, MolGraph};

/// Per-atom identity seed.
pub type AtomInvariant = u32;

/// Capability: compute one invariant per atom, in atom index order.
pub trait AtomInvariantProvider: Send + Sync + fmt::Debug {
    /// Compute invariants for every atom.
    fn compute(&self, mol: &MolGraph) -> Vec<AtomInvariant>;

    /// Stable name, folded into generator parameter hashes.
    fn name(&self) -> String;
}

/// Serializable selection of a built-in provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantKind {
    /// Connectivity invariants (ECFP style).
    Morgan,
    /// Atom-pair code: element, degree, π electrons, aromaticity, ring membership.
    AtomPair,
    /// Element and aromaticity only.
    Path,
}

impl InvariantKind {
    /// Instantiate the provider.
    pub fn provider(&self, include_chirality: bool) -> Arc<dyn AtomInvariantProvider> {
        match self {
            Self::Morgan => Arc::new(MorganInvariants {
                include_ring_membership: true,
                include_chirality,
            }),
            Self::AtomPair => Arc::new(AtomPairInvariants { include_chirality }),
            Self::Path => Arc::new(PathInvariants),
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morgan => write!(f, "morgan"),
            Self::AtomPair => write!(f, "atom_pair"),
            Self::Path => write!(f, "path"),
        }
    }
}

/// Connectivity invariants.
///
/// Element, heavy degree, total hydrogens, formal charge, ring membership
/// and (optionally) a chirality code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorganInvariants {
    /// Fold ring membership into the invariant.
    pub include_ring_membership: bool,
    /// Fold the chirality tag into the invariant.
    pub include_chirality: bool,
}

impl Default for MorganInvariants {
    fn default() -> Self {
        Self {
            include_ring_membership: true,
            include_chirality: false,
        }
    }
}

impl AtomInvariantProvider for MorganInvariants {
    fn compute(&self, mol: &MolGraph) -> Vec<AtomInvariant> {
        (0..mol.num_atoms())
            .map(|idx| {
                let atom = mol.atom(idx);
                let mut words = vec![
                    atom.atomic_number as u32,
                    mol.degree(idx) as u32,
                    atom.total_hydrogens(),
                    atom.formal_charge as i32 as u32,
                ];
                if self.include_ring_membership {
                    words.push(mol.is_ring_atom(idx) as u32);
                }
                if self.include_chirality {
                    words.push(atom.chirality.code());
                }
                hash_words(0, &words)
            })
            .collect()
    }

    fn name(&self) -> String {
        format!(
            "morgan(ring={},chiral={})",
            self.include_ring_membership, self.include_chirality
        )
    }
}

/// Atom-pair invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtomPairInvariants {
    /// Fold the chirality tag into the invariant.
    pub include_chirality: bool,
}

/// Bit layout of the packed atom-pair code, low to high.
const DEGREE_BITS: u32 = 3;
const PI_BITS: u32 = 2;
const MAX_DEGREE: u32 = (1 << DEGREE_BITS) - 1;
const MAX_PI: u32 = (1 << PI_BITS) - 1;

impl AtomInvariantProvider for AtomPairInvariants {
    fn compute(&self, mol: &MolGraph) -> Vec<AtomInvariant> {
        (0..mol.num_atoms())
            .map(|idx| {
                let atom = mol.atom(idx);
                let degree = (mol.degree(idx) as u32).min(MAX_DEGREE);
                let pi = mol.pi_electrons(idx).min(MAX_PI);
                let mut code = degree
                    | pi << DEGREE_BITS
                    | (atom.is_aromatic as u32) << (DEGREE_BITS + PI_BITS)
                    | (mol.is_ring_atom(idx) as u32) << (DEGREE_BITS + PI_BITS + 1)
                    | (atom.atomic_number as u32) << (DEGREE_BITS + PI_BITS + 2);
                if self.include_chirality {
                    hash_combine(&mut code, 0x5c_0000 | atom.chirality.code());
                }
                code
            })
            .collect()
    }

    fn name(&self) -> String {
        format!("atom_pair(chiral={})", self.include_chirality)
    }
}

/// Element and aromaticity only; topology is left entirely to the path hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathInvariants;

impl AtomInvariantProvider for PathInvariants {
    fn compute(&self, mol: &MolGraph) -> Vec<AtomInvariant> {
        mol.atoms()
            .iter()
            .map(|atom| (atom.atomic_number as u32 % 128) << 1 | atom.is_aromatic as u32)
            .collect()
    }

    fn name(&self) -> String {
        "path".to_string()
    }
}

/// Closure-backed provider for caller-defined invariants.
///
/// The closure itself cannot be hashed, so the name and version stand in for
/// it in generator parameter hashes and cache keys.
pub struct FnInvariants<F> {
    name: String,
    version: u32,
    f: F,
}

impl<F> FnInvariants<F>
where
    F: Fn(&MolGraph) -> Vec<AtomInvariant> + Send + Sync + 'static,
{
    /// Wrap a closure under a stable name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            version: 0,
            f,
        }
    }

    /// Tag the closure with a caller-chosen version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Wrap a closure and erase it behind the provider trait.
    pub fn shared(name: impl Into<String>, f: F) -> Arc<dyn AtomInvariantProvider> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> fmt::Debug for FnInvariants<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInvariants")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

impl<F> AtomInvariantProvider for FnInvariants<F>
where
    F: Fn(&MolGraph) -> Vec<AtomInvariant> + Send + Sync,
{
    fn compute(&self, mol: &MolGraph) -> Vec<AtomInvariant> {
        (self.f)(mol)
    }

    fn name(&self) -> String {
        if self.version == 0 {
            format!("custom:{}", self.name)
        } else {
            format!("custom:{}@v{}", self.name, self.version)
        }
    }
}

/// Bond invariant: the bond type code, or a constant when types are ignored.
pub fn bond_invariant(bond: &Bond, use_bond_types: bool) -> u32 {
    if use_bond_types {
        bond.bond_type.code()
    } else {
        1
    }
}
