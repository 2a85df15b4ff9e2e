//! Fingerprint generators.
//!
//! A [`FingerprintGenerator`] pairs a validated [`GeneratorConfig`] with an
//! atom invariant provider and one [`FeatureEnumerator`]. Generation is:
//!
//! ```text
//! MolGraph → invariants → enumerator → Vec<Feature> → bucket counts → encoder → Fingerprint
//! ```
//!
//! Generators hold no mutable state, so one instance can be shared across
//! threads and reused for any number of molecules.

pub mod atom_pair;
pub mod config;
pub mod morgan;
pub mod path;
pub mod torsion;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use config::{Algorithm, FingerprintType, GeneratorConfig};

use crate::canonical::canonical_hash_hex;
use crate::error::{ConfigError, InputError, Result};
use crate::fingerprint::encoder::{bucket_counts, encode, EncoderSettings};
use crate::fingerprint::{
    DenseBitFingerprint, DenseCountFingerprint, Fingerprint, OutputKind, SparseBitFingerprint,
    SparseCountFingerprint,
};
use crate::invariants::{AtomInvariant, AtomInvariantProvider};
use crate::mol::MolGraph;

/// One occurrence of an environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Feature {
    /// Environment hash.
    pub bucket: u32,
    /// Member atoms. Circular environments list their centre first; pairs
    /// and torsions list atoms in path order.
    pub atoms: Vec<usize>,
    /// Member bonds, ascending. Empty for atom pairs and single atoms.
    pub bonds: Vec<usize>,
}

impl Feature {
    /// Whether the feature is rooted at one of the flagged atoms.
    ///
    /// Circular environments are rooted at their centre; pairs and torsions
    /// at either end; path subgraphs at any member atom.
    pub fn rooted_in(&self, kind: FingerprintType, roots: &[bool]) -> bool {
        match kind {
            FingerprintType::Morgan => self.atoms.first().is_some_and(|&a| roots[a]),
            FingerprintType::AtomPair | FingerprintType::TopologicalTorsion => {
                let first = self.atoms.first().is_some_and(|&a| roots[a]);
                let last = self.atoms.last().is_some_and(|&a| roots[a]);
                first || last
            }
            FingerprintType::Path => self.atoms.iter().any(|&a| roots[a]),
        }
    }
}

/// Algorithm seam: enumerate features from atom invariants.
pub trait FeatureEnumerator: Send + Sync + fmt::Debug {
    /// Every feature occurrence of `mol`, in a deterministic order.
    fn enumerate(&self, mol: &MolGraph, invariants: &[AtomInvariant]) -> Vec<Feature>;
}

/// Per-atom and per-bucket provenance of a generated fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalOutput {
    /// Buckets of every feature each atom belongs to, ascending and distinct.
    pub atom_to_buckets: Vec<Vec<u32>>,
    /// Feature occurrences per bucket, in enumeration order.
    pub bucket_info: BTreeMap<u32, Vec<Feature>>,
}

impl AdditionalOutput {
    fn from_features(atom_count: usize, features: &[Feature]) -> Self {
        let mut atom_to_buckets = vec![Vec::new(); atom_count];
        let mut bucket_info: BTreeMap<u32, Vec<Feature>> = BTreeMap::new();
        for feature in features {
            for &atom in &feature.atoms {
                atom_to_buckets[atom].push(feature.bucket);
            }
            bucket_info.entry(feature.bucket).or_default().push(feature.clone());
        }
        for buckets in &mut atom_to_buckets {
            buckets.sort_unstable();
            buckets.dedup();
        }
        Self {
            atom_to_buckets,
            bucket_info,
        }
    }
}

/// A configured fingerprint generator.
#[derive(Debug, Clone)]
pub struct FingerprintGenerator {
    config: GeneratorConfig,
    invariants: Arc<dyn AtomInvariantProvider>,
    custom_invariants: bool,
    enumerator: Arc<dyn FeatureEnumerator>,
    settings: EncoderSettings,
}

impl FingerprintGenerator {
    /// Validate the configuration and build the generator.
    pub fn new(config: GeneratorConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let enumerator: Arc<dyn FeatureEnumerator> = match config.algorithm {
            Algorithm::Morgan {
                radius,
                include_redundant_environments,
                use_bond_types,
            } => Arc::new(morgan::MorganEnumerator {
                radius,
                include_redundant_environments,
                use_bond_types,
            }),
            Algorithm::AtomPair { min_distance, max_distance } => {
                Arc::new(atom_pair::AtomPairEnumerator { min_distance, max_distance })
            }
            Algorithm::TopologicalTorsion { torsion_atom_count } => {
                Arc::new(torsion::TorsionEnumerator {
                    atom_count: torsion_atom_count as usize,
                })
            }
            Algorithm::Path {
                min_path,
                max_path,
                branched_paths,
                use_bond_order,
            } => Arc::new(path::PathEnumerator {
                min_path: min_path as usize,
                max_path: max_path as usize,
                branched: branched_paths,
                use_bond_order,
            }),
        };
        let invariants = config.invariant_kind().provider(config.include_chirality);
        let settings = config.encoder_settings();
        Ok(Self {
            config,
            invariants,
            custom_invariants: false,
            enumerator,
            settings,
        })
    }

    /// Default generator for a family.
    pub fn default_for(kind: FingerprintType) -> Self {
        match Self::new(GeneratorConfig::default_for(kind)) {
            Ok(generator) => generator,
            Err(e) => unreachable!("default {kind} configuration rejected: {e}"),
        }
    }

    /// Replace the atom invariant provider.
    pub fn with_invariant_provider(mut self, provider: Arc<dyn AtomInvariantProvider>) -> Self {
        self.invariants = provider;
        self.custom_invariants = true;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Family of this generator.
    pub fn fingerprint_type(&self) -> FingerprintType {
        self.config.fingerprint_type()
    }

    /// The active invariant provider.
    pub fn invariant_provider(&self) -> &Arc<dyn AtomInvariantProvider> {
        &self.invariants
    }

    /// Encoder settings.
    pub fn encoder_settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Hash of everything that determines output: the resolved config plus,
    /// for a custom provider, its name.
    ///
    /// A custom provider is identified only by [`AtomInvariantProvider::name`].
    /// Two closures registered under the same name and version share cache
    /// entries, so bump [`FnInvariants::with_version`] whenever the closure
    /// changes.
    ///
    /// [`FnInvariants::with_version`]: crate::invariants::FnInvariants::with_version
    pub fn params_hash(&self) -> String {
        if self.custom_invariants {
            canonical_hash_hex(&(self.config.resolved(), self.invariants.name()))
        } else {
            self.config.params_hash()
        }
    }

    /// Atom invariants, checked for length.
    pub fn atom_invariants(&self, mol: &MolGraph) -> std::result::Result<Vec<AtomInvariant>, InputError> {
        let invariants = self.invariants.compute(mol);
        if invariants.len() != mol.num_atoms() {
            return Err(InputError::InvariantCountMismatch {
                provider: self.invariants.name(),
                expected: mol.num_atoms(),
                got: invariants.len(),
            });
        }
        Ok(invariants)
    }

    /// Every feature occurrence of `mol`.
    pub fn features(&self, mol: &MolGraph) -> Result<Vec<Feature>> {
        let invariants = self.atom_invariants(mol)?;
        let features = self.enumerator.enumerate(mol, &invariants);
        debug!(
            algorithm = %self.fingerprint_type(),
            atoms = mol.num_atoms(),
            features = features.len(),
            "enumerated features"
        );
        Ok(features)
    }

    /// Fingerprint in the requested representation.
    pub fn generate(&self, mol: &MolGraph, kind: OutputKind) -> Result<Fingerprint> {
        let features = self.features(mol)?;
        let counts = bucket_counts(features.iter().map(|f| f.bucket));
        Ok(encode(&counts, kind, &self.settings))
    }

    /// Fingerprint plus provenance, optionally restricted to features rooted
    /// at `from_atoms`.
    pub fn generate_detailed(
        &self,
        mol: &MolGraph,
        kind: OutputKind,
        from_atoms: Option<&[usize]>,
    ) -> Result<(Fingerprint, AdditionalOutput)> {
        let mut features = self.features(mol)?;
        if let Some(from_atoms) = from_atoms {
            let mut roots = vec![false; mol.num_atoms()];
            for &atom in from_atoms {
                if atom >= mol.num_atoms() {
                    return Err(InputError::RootAtomOutOfRange {
                        atom,
                        atom_count: mol.num_atoms(),
                    }
                    .into());
                }
                roots[atom] = true;
            }
            let kind = self.fingerprint_type();
            features.retain(|f| f.rooted_in(kind, &roots));
        }
        let counts = bucket_counts(features.iter().map(|f| f.bucket));
        let fingerprint = encode(&counts, kind, &self.settings);
        Ok((fingerprint, AdditionalOutput::from_features(mol.num_atoms(), &features)))
    }

    /// Unfolded counts.
    pub fn sparse_count_fingerprint(&self, mol: &MolGraph) -> Result<SparseCountFingerprint> {
        match self.generate(mol, OutputKind::SparseCount)? {
            Fingerprint::SparseCount(fp) => Ok(fp),
            other => unreachable!("encoder returned {} for sparse_count", other.kind()),
        }
    }

    /// Unfolded bits.
    pub fn sparse_fingerprint(&self, mol: &MolGraph) -> Result<SparseBitFingerprint> {
        match self.generate(mol, OutputKind::SparseBit)? {
            Fingerprint::SparseBit(fp) => Ok(fp),
            other => unreachable!("encoder returned {} for sparse_bit", other.kind()),
        }
    }

    /// Folded counts.
    pub fn count_fingerprint(&self, mol: &MolGraph) -> Result<DenseCountFingerprint> {
        match self.generate(mol, OutputKind::DenseCount)? {
            Fingerprint::DenseCount(fp) => Ok(fp),
            other => unreachable!("encoder returned {} for dense_count", other.kind()),
        }
    }

    /// Folded bits.
    pub fn fingerprint(&self, mol: &MolGraph) -> Result<DenseBitFingerprint> {
        match self.generate(mol, OutputKind::DenseBit)? {
            Fingerprint::DenseBit(fp) => Ok(fp),
            other => unreachable!("encoder returned {} for dense_bit", other.kind()),
        }
    }
}
