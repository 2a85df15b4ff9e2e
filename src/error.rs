//! Error types for fingerprint generation.
//!
//! Two families, both fatal and never transient:
//!
//! - [`ConfigError`]: rejected at construction (or when comparing artifacts
//!   produced under different configurations).
//! - [`InputError`]: rejected per call because the molecule or call arguments
//!   are malformed.
//!
//! Every variant names the value that was invalid.

/// Configuration rejected at construction or comparison time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Atom-pair distance window is empty.
    #[error("minDistance ({min}) exceeds maxDistance ({max})")]
    MinDistanceExceedsMax {
        /// Configured minimum distance.
        min: u32,
        /// Configured maximum distance.
        max: u32,
    },
    /// Path length window is empty.
    #[error("minPath ({min}) exceeds maxPath ({max})")]
    MinPathExceedsMax {
        /// Configured minimum path length.
        min: u32,
        /// Configured maximum path length.
        max: u32,
    },
    /// A radius, distance or path bound that must be positive was zero.
    #[error("{name} must be positive")]
    NonPositiveBound {
        /// Parameter name.
        name: &'static str,
    },
    /// An enumeration bound exceeds what the generator will enumerate.
    #[error("{name} ({value}) exceeds the supported maximum {max}")]
    BoundTooLarge {
        /// Parameter name.
        name: &'static str,
        /// Configured value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },
    /// Torsions need at least two atoms.
    #[error("torsion atom count must be at least 2, got {0}")]
    TorsionTooShort(u32),
    /// Dense fingerprints need a non-zero length.
    #[error("fingerprint size must be positive")]
    FingerprintSizeZero,
    /// Bits per feature must be in `1..=32`.
    #[error("numBitsPerFeature must be in 1..=32, got {0}")]
    InvalidBitsPerFeature(u32),
    /// Count simulation needs at least one block of `num_bits_per_feature` bits.
    #[error("fingerprint size {fp_size} is smaller than numBitsPerFeature {num_bits}")]
    FingerprintTooSmall {
        /// Configured fingerprint size.
        fp_size: usize,
        /// Configured bits per feature.
        num_bits: u32,
    },
    /// MinHash signatures of different lengths cannot be compared.
    #[error("signature length mismatch: {left} vs {right}")]
    SignatureLengthMismatch {
        /// Length of the left signature.
        left: usize,
        /// Length of the right signature.
        right: usize,
    },
    /// MinHash signatures from different permutation families cannot be compared.
    #[error("signature seed mismatch: {left} vs {right}")]
    SignatureSeedMismatch {
        /// Seed of the left signature.
        left: u64,
        /// Seed of the right signature.
        right: u64,
    },
    /// Fingerprints of different lengths cannot be compared.
    #[error("fingerprint size mismatch: {left} vs {right}")]
    SizeMismatch {
        /// Length of the left fingerprint.
        left: u64,
        /// Length of the right fingerprint.
        right: u64,
    },
    /// Fingerprints of different kinds cannot be compared.
    #[error("fingerprint kind mismatch: {left} vs {right}")]
    KindMismatch {
        /// Kind of the left fingerprint.
        left: String,
        /// Kind of the right fingerprint.
        right: String,
    },
}

/// Malformed molecule or call arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// A bond references an atom index that does not exist.
    #[error("bond {bond} references atom {atom}, but the molecule has {atom_count} atoms")]
    BondAtomOutOfRange {
        /// Bond index.
        bond: usize,
        /// Offending atom index.
        atom: usize,
        /// Number of atoms in the molecule.
        atom_count: usize,
    },
    /// A bond connects an atom to itself.
    #[error("bond {bond} connects atom {atom} to itself")]
    SelfBond {
        /// Bond index.
        bond: usize,
        /// Atom index.
        atom: usize,
    },
    /// Two bonds connect the same atom pair.
    #[error("bond {bond} duplicates bond {existing} between atoms {begin} and {end}")]
    DuplicateBond {
        /// Bond index.
        bond: usize,
        /// Index of the earlier bond with the same endpoints.
        existing: usize,
        /// First atom.
        begin: usize,
        /// Second atom.
        end: usize,
    },
    /// An invariant provider returned the wrong number of invariants.
    #[error("invariant provider '{provider}' returned {got} invariants for {expected} atoms")]
    InvariantCountMismatch {
        /// Provider name.
        provider: String,
        /// Number of atoms.
        expected: usize,
        /// Number of invariants returned.
        got: usize,
    },
    /// A root atom passed to a restricted generation does not exist.
    #[error("root atom {atom} out of range for molecule with {atom_count} atoms")]
    RootAtomOutOfRange {
        /// Offending atom index.
        atom: usize,
        /// Number of atoms in the molecule.
        atom_count: usize,
    },
    /// A text document could not be decoded into a molecule.
    #[error("malformed molecule document: {0}")]
    MalformedDocument(String),
}

/// Any error surfaced by a fingerprinting call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Input error.
    #[error("input error: {0}")]
    Input(#[from] InputError),
}

/// Convenience result alias.
pub type Result<T, E = FingerprintError> = std::result::Result<T, E>;
