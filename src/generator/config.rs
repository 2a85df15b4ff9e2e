//! Generator configuration.
//!
//! A [`GeneratorConfig`] is the complete, serializable description of a
//! fingerprint generator: which algorithm, its bounds, the output encoding
//! and the invariant provider. It is validated once, when the generator is
//! built, and never changes afterwards.
//!
//! ## Parameter Hash
//!
//! `params_hash()` is the canonical xxh64 hash of the config. Two generators
//! with equal hashes produce identical fingerprints for identical molecules,
//! so the hash doubles as a cache key and a provenance tag.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::canonical_hash_hex;
use crate::error::ConfigError;
use crate::fingerprint::encoder::{BitScheme, EncoderSettings};
use crate::invariants::InvariantKind;

/// Default dense fingerprint length.
pub const DEFAULT_FP_SIZE: usize = 2048;
/// Default Morgan radius for bulk helpers.
pub const DEFAULT_MORGAN_RADIUS: u32 = 2;
/// Default bits per feature for count simulation.
pub const DEFAULT_COUNT_SIMULATION_BITS: u32 = 4;
/// Default bits per feature for the path multi-bit scheme.
pub const DEFAULT_PATH_BITS: u32 = 2;
/// Largest supported bits-per-feature value.
pub const MAX_BITS_PER_FEATURE: u32 = 32;
/// Largest torsion length; enumeration grows exponentially with it.
pub const MAX_TORSION_ATOM_COUNT: u32 = 8;
/// Largest path length in bonds.
pub const MAX_PATH_BONDS: u32 = 16;

/// Fingerprint family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintType {
    /// Circular environments.
    Morgan,
    /// Atom pairs.
    AtomPair,
    /// Topological torsions.
    TopologicalTorsion,
    /// Bond paths and subgraphs.
    Path,
}

impl FingerprintType {
    /// All families, in a fixed order.
    pub const ALL: [FingerprintType; 4] = [
        Self::Morgan,
        Self::AtomPair,
        Self::TopologicalTorsion,
        Self::Path,
    ];

    /// Parse a family name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "morgan" | "circular" | "ecfp" => Some(Self::Morgan),
            "atom_pair" | "atompair" | "ap" => Some(Self::AtomPair),
            "topological_torsion" | "torsion" | "tt" => Some(Self::TopologicalTorsion),
            "path" | "rdkit" | "rdkitfp" => Some(Self::Path),
            _ => None,
        }
    }
}

impl fmt::Display for FingerprintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morgan => write!(f, "morgan"),
            Self::AtomPair => write!(f, "atom_pair"),
            Self::TopologicalTorsion => write!(f, "topological_torsion"),
            Self::Path => write!(f, "path"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_radius() -> u32 {
    DEFAULT_MORGAN_RADIUS
}

fn default_min_distance() -> u32 {
    1
}

fn default_max_distance() -> u32 {
    30
}

fn default_torsion_atom_count() -> u32 {
    4
}

fn default_min_path() -> u32 {
    1
}

fn default_max_path() -> u32 {
    7
}

fn default_fp_size() -> usize {
    DEFAULT_FP_SIZE
}

/// Algorithm-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Algorithm {
    /// Circular environments up to `radius` bonds from each atom.
    Morgan {
        /// Largest environment radius.
        #[serde(default = "default_radius")]
        radius: u32,
        /// Emit environments whose bond set was already emitted.
        #[serde(default)]
        include_redundant_environments: bool,
        /// Fold bond types into environment hashes.
        #[serde(default = "default_true")]
        use_bond_types: bool,
    },
    /// Atom pairs at topological distance `min_distance..=max_distance`.
    AtomPair {
        /// Smallest pair distance.
        #[serde(default = "default_min_distance")]
        min_distance: u32,
        /// Largest pair distance.
        #[serde(default = "default_max_distance")]
        max_distance: u32,
    },
    /// Linear paths of `torsion_atom_count` atoms.
    TopologicalTorsion {
        /// Atoms per torsion.
        #[serde(default = "default_torsion_atom_count")]
        torsion_atom_count: u32,
    },
    /// Connected bond subgraphs of `min_path..=max_path` bonds.
    Path {
        /// Fewest bonds per subgraph.
        #[serde(default = "default_min_path")]
        min_path: u32,
        /// Most bonds per subgraph.
        #[serde(default = "default_max_path")]
        max_path: u32,
        /// Include branched subgraphs, not only linear paths.
        #[serde(default = "default_true")]
        branched_paths: bool,
        /// Fold bond orders into subgraph hashes.
        #[serde(default = "default_true")]
        use_bond_order: bool,
    },
}

impl Algorithm {
    /// Family of this algorithm.
    pub fn fingerprint_type(&self) -> FingerprintType {
        match self {
            Self::Morgan { .. } => FingerprintType::Morgan,
            Self::AtomPair { .. } => FingerprintType::AtomPair,
            Self::TopologicalTorsion { .. } => FingerprintType::TopologicalTorsion,
            Self::Path { .. } => FingerprintType::Path,
        }
    }

    /// Default parameters for a family.
    pub fn default_for(kind: FingerprintType) -> Self {
        match kind {
            FingerprintType::Morgan => Self::Morgan {
                radius: default_radius(),
                include_redundant_environments: false,
                use_bond_types: true,
            },
            FingerprintType::AtomPair => Self::AtomPair {
                min_distance: default_min_distance(),
                max_distance: default_max_distance(),
            },
            FingerprintType::TopologicalTorsion => Self::TopologicalTorsion {
                torsion_atom_count: default_torsion_atom_count(),
            },
            FingerprintType::Path => Self::Path {
                min_path: default_min_path(),
                max_path: default_max_path(),
                branched_paths: true,
                use_bond_order: true,
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Morgan { radius, .. } => {
                if radius == 0 {
                    return Err(ConfigError::NonPositiveBound { name: "radius" });
                }
            }
            Self::AtomPair { min_distance, max_distance } => {
                if max_distance == 0 {
                    return Err(ConfigError::NonPositiveBound { name: "maxDistance" });
                }
                if min_distance > max_distance {
                    return Err(ConfigError::MinDistanceExceedsMax {
                        min: min_distance,
                        max: max_distance,
                    });
                }
            }
            Self::TopologicalTorsion { torsion_atom_count } => {
                if torsion_atom_count < 2 {
                    return Err(ConfigError::TorsionTooShort(torsion_atom_count));
                }
                if torsion_atom_count > MAX_TORSION_ATOM_COUNT {
                    return Err(ConfigError::BoundTooLarge {
                        name: "torsionAtomCount",
                        value: torsion_atom_count,
                        max: MAX_TORSION_ATOM_COUNT,
                    });
                }
            }
            Self::Path { min_path, max_path, .. } => {
                if min_path == 0 {
                    return Err(ConfigError::NonPositiveBound { name: "minPath" });
                }
                if max_path == 0 {
                    return Err(ConfigError::NonPositiveBound { name: "maxPath" });
                }
                if max_path > MAX_PATH_BONDS {
                    return Err(ConfigError::BoundTooLarge {
                        name: "maxPath",
                        value: max_path,
                        max: MAX_PATH_BONDS,
                    });
                }
                if min_path > max_path {
                    return Err(ConfigError::MinPathExceedsMax {
                        min: min_path,
                        max: max_path,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Full generator configuration.
///
/// `num_bits_per_feature`, `use_count_simulation` and `invariants` fall back
/// to per-family defaults when unset:
///
/// | family | count simulation | bits per feature | invariants |
/// |---|---|---|---|
/// | Morgan | off | 4 | `morgan` |
/// | Atom-Pair | on | 4 | `atom_pair` |
/// | Torsion | on | 4 | `atom_pair` |
/// | Path | n/a (multi-bit) | 2 | `path` |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Algorithm and its bounds.
    pub algorithm: Algorithm,
    /// Dense fingerprint length.
    #[serde(default = "default_fp_size")]
    pub fp_size: usize,
    /// Bits per feature (count simulation block or multi-bit count).
    #[serde(default)]
    pub num_bits_per_feature: Option<u32>,
    /// Represent counts in bit outputs. Ignored by the path family.
    #[serde(default)]
    pub use_count_simulation: Option<bool>,
    /// Fold chirality into the atom invariants.
    #[serde(default)]
    pub include_chirality: bool,
    /// Built-in invariant provider.
    #[serde(default)]
    pub invariants: Option<InvariantKind>,
}

impl GeneratorConfig {
    /// Configuration with family defaults around `algorithm`.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            fp_size: DEFAULT_FP_SIZE,
            num_bits_per_feature: None,
            use_count_simulation: None,
            include_chirality: false,
            invariants: None,
        }
    }

    /// Morgan generator with the given radius.
    pub fn morgan(radius: u32) -> Self {
        Self::new(Algorithm::Morgan {
            radius,
            include_redundant_environments: false,
            use_bond_types: true,
        })
    }

    /// Atom-pair generator with default distances.
    pub fn atom_pair() -> Self {
        Self::default_for(FingerprintType::AtomPair)
    }

    /// Atom-pair generator with explicit distance bounds.
    pub fn atom_pair_with_distances(min_distance: u32, max_distance: u32) -> Self {
        Self::new(Algorithm::AtomPair { min_distance, max_distance })
    }

    /// Topological-torsion generator over 4-atom paths.
    pub fn topological_torsion() -> Self {
        Self::default_for(FingerprintType::TopologicalTorsion)
    }

    /// Path generator with default bounds.
    pub fn path() -> Self {
        Self::default_for(FingerprintType::Path)
    }

    /// Default configuration for a family.
    pub fn default_for(kind: FingerprintType) -> Self {
        Self::new(Algorithm::default_for(kind))
    }

    /// Set the dense fingerprint length.
    pub fn with_fp_size(mut self, fp_size: usize) -> Self {
        self.fp_size = fp_size;
        self
    }

    /// Set bits per feature.
    pub fn with_bits_per_feature(mut self, bits: u32) -> Self {
        self.num_bits_per_feature = Some(bits);
        self
    }

    /// Enable or disable count simulation.
    pub fn with_count_simulation(mut self, enabled: bool) -> Self {
        self.use_count_simulation = Some(enabled);
        self
    }

    /// Enable or disable chirality in the invariants.
    pub fn with_chirality(mut self, enabled: bool) -> Self {
        self.include_chirality = enabled;
        self
    }

    /// Select a built-in invariant provider.
    pub fn with_invariants(mut self, kind: InvariantKind) -> Self {
        self.invariants = Some(kind);
        self
    }

    /// Family of the configured algorithm.
    pub fn fingerprint_type(&self) -> FingerprintType {
        self.algorithm.fingerprint_type()
    }

    /// Invariant provider in effect.
    pub fn invariant_kind(&self) -> InvariantKind {
        self.invariants.unwrap_or(match self.fingerprint_type() {
            FingerprintType::Morgan => InvariantKind::Morgan,
            FingerprintType::AtomPair | FingerprintType::TopologicalTorsion => InvariantKind::AtomPair,
            FingerprintType::Path => InvariantKind::Path,
        })
    }

    /// Bits per feature in effect.
    pub fn bits_per_feature(&self) -> u32 {
        self.num_bits_per_feature.unwrap_or(match self.fingerprint_type() {
            FingerprintType::Path => DEFAULT_PATH_BITS,
            _ => DEFAULT_COUNT_SIMULATION_BITS,
        })
    }

    /// Whether count simulation is in effect.
    pub fn count_simulation(&self) -> bool {
        match self.fingerprint_type() {
            FingerprintType::Path => false,
            FingerprintType::Morgan => self.use_count_simulation.unwrap_or(false),
            FingerprintType::AtomPair | FingerprintType::TopologicalTorsion => {
                self.use_count_simulation.unwrap_or(true)
            }
        }
    }

    /// Bit scheme used by the encoder.
    pub fn bit_scheme(&self) -> BitScheme {
        let n = self.bits_per_feature();
        match self.fingerprint_type() {
            FingerprintType::Path if n > 1 => BitScheme::MultiBit { n },
            FingerprintType::Path => BitScheme::Single,
            _ if self.count_simulation() => BitScheme::CountSimulation { n },
            _ => BitScheme::Single,
        }
    }

    /// Encoder settings derived from this configuration.
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            fp_size: self.fp_size,
            scheme: self.bit_scheme(),
        }
    }

    /// Check every bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.algorithm.validate()?;
        if self.fp_size == 0 {
            return Err(ConfigError::FingerprintSizeZero);
        }
        let n = self.bits_per_feature();
        if n == 0 || n > MAX_BITS_PER_FEATURE {
            return Err(ConfigError::InvalidBitsPerFeature(n));
        }
        if self.count_simulation() && self.fp_size < n as usize {
            return Err(ConfigError::FingerprintTooSmall {
                fp_size: self.fp_size,
                num_bits: n,
            });
        }
        Ok(())
    }

    /// Copy with every per-family default written out.
    pub fn resolved(&self) -> Self {
        Self {
            num_bits_per_feature: Some(self.bits_per_feature()),
            use_count_simulation: Some(self.count_simulation()),
            invariants: Some(self.invariant_kind()),
            ..self.clone()
        }
    }

    /// Canonical hash of the resolved configuration, so an unset option and
    /// its explicit default hash alike.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.resolved())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::default_for(FingerprintType::Morgan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        for kind in FingerprintType::ALL {
            assert!(GeneratorConfig::default_for(kind).validate().is_ok(), "{kind}");
        }
    }

    #[test]
    fn test_rejects_inverted_distance_window() {
        let err = GeneratorConfig::atom_pair_with_distances(5, 2).validate().unwrap_err();
        assert_eq!(err, ConfigError::MinDistanceExceedsMax { min: 5, max: 2 });

        let err = GeneratorConfig::atom_pair_with_distances(0, 0).validate().unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveBound { name: "maxDistance" });
    }

    #[test]
    fn test_rejects_bad_encoding_settings() {
        assert_eq!(
            GeneratorConfig::morgan(2).with_fp_size(0).validate(),
            Err(ConfigError::FingerprintSizeZero)
        );
        assert_eq!(
            GeneratorConfig::atom_pair().with_bits_per_feature(0).validate(),
            Err(ConfigError::InvalidBitsPerFeature(0))
        );
        assert_eq!(
            GeneratorConfig::atom_pair().with_fp_size(2).validate(),
            Err(ConfigError::FingerprintTooSmall { fp_size: 2, num_bits: 4 })
        );
        // without count simulation a tiny fingerprint is fine
        assert!(GeneratorConfig::atom_pair()
            .with_fp_size(2)
            .with_count_simulation(false)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_zero_radius_and_short_torsion() {
        assert_eq!(
            GeneratorConfig::morgan(0).validate(),
            Err(ConfigError::NonPositiveBound { name: "radius" })
        );
        let cfg = GeneratorConfig::new(Algorithm::TopologicalTorsion { torsion_atom_count: 1 });
        assert_eq!(cfg.validate(), Err(ConfigError::TorsionTooShort(1)));
    }

    #[test]
    fn test_rejects_unbounded_enumeration() {
        let cfg = GeneratorConfig::new(Algorithm::TopologicalTorsion { torsion_atom_count: 40 });
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BoundTooLarge { name: "torsionAtomCount", value: 40, max: MAX_TORSION_ATOM_COUNT })
        );

        let cfg: GeneratorConfig =
            serde_json::from_str(r#"{"algorithm":{"type":"path","max_path":1000}}"#).unwrap();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BoundTooLarge { name: "maxPath", value: 1000, max: MAX_PATH_BONDS })
        );

        let at_limit = GeneratorConfig::new(Algorithm::TopologicalTorsion {
            torsion_atom_count: MAX_TORSION_ATOM_COUNT,
        });
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_family_defaults() {
        assert_eq!(GeneratorConfig::morgan(2).bit_scheme(), BitScheme::Single);
        assert_eq!(
            GeneratorConfig::atom_pair().bit_scheme(),
            BitScheme::CountSimulation { n: 4 }
        );
        assert_eq!(GeneratorConfig::path().bit_scheme(), BitScheme::MultiBit { n: 2 });
        assert_eq!(
            GeneratorConfig::topological_torsion().invariant_kind(),
            InvariantKind::AtomPair
        );
    }

    #[test]
    fn test_params_hash_tracks_parameters() {
        let a = GeneratorConfig::morgan(2);
        let b = GeneratorConfig::morgan(3);
        assert_eq!(a.params_hash(), GeneratorConfig::morgan(2).params_hash());
        assert_ne!(a.params_hash(), b.params_hash());
    }

    #[test]
    fn test_params_hash_ignores_explicit_defaults() {
        let implicit = GeneratorConfig::atom_pair();
        let explicit = GeneratorConfig::atom_pair()
            .with_count_simulation(true)
            .with_bits_per_feature(DEFAULT_COUNT_SIMULATION_BITS)
            .with_invariants(InvariantKind::AtomPair);
        assert_ne!(implicit, explicit);
        assert_eq!(implicit.params_hash(), explicit.params_hash());
        assert_ne!(
            implicit.params_hash(),
            GeneratorConfig::atom_pair().with_count_simulation(false).params_hash()
        );
    }

    #[test]
    fn test_serde_fills_defaults() {
        let cfg: GeneratorConfig =
            serde_json::from_str(r#"{"algorithm":{"type":"atom_pair","max_distance":5}}"#).unwrap();
        assert_eq!(
            cfg.algorithm,
            Algorithm::AtomPair { min_distance: 1, max_distance: 5 }
        );
        assert_eq!(cfg.fp_size, DEFAULT_FP_SIZE);
        assert_eq!(FingerprintType::from_str("TT"), Some(FingerprintType::TopologicalTorsion));
    }
}
