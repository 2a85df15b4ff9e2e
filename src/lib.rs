//! # molfp
//!
//! Deterministic molecular fingerprints.
//!
//! The engine answers one question:
//!
//! > Given a molecular graph and a configuration, which fixed-length feature
//! > vector describes it?
//!
//! ## Core Contract
//!
//! 1. Every generator is a pure function of (graph, configuration)
//! 2. Isomorphic environments hash to the same bucket regardless of atom order
//! 3. One generator instance can be shared across threads and reused
//!
//! ## Architecture
//!
//! ```text
//! MolGraph → AtomInvariantProvider → FeatureEnumerator → buckets → encoder → Fingerprint
//!     │
//!     └──→ shingling → MhfpEncoder → MhfpSignature
//! ```
//!
//! Families: circular (Morgan), atom pair, topological torsion and path,
//! plus MinHash signatures over circular substructure shingles (MHFP).
//!
//! ## Determinism Guarantees
//!
//! - Same graph + same configuration → identical fingerprint on every platform
//! - Sparse outputs iterate in ascending index order
//! - MinHash permutations are fixed by `(n_permutations, seed)`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod cache;
pub mod canonical;
pub mod environment;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod hashing;
pub mod invariants;
pub mod mhfp;
pub mod mol;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use batch::{
    count_fps, fps, generate_many, sparse_count_fps, sparse_fps, try_generate_each, BatchError,
    BatchFingerprinter, BatchResult,
};
pub use cache::{CacheConfig, CacheStats, FingerprintCache};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use error::{ConfigError, FingerprintError, InputError, Result};
pub use fingerprint::similarity::{bulk_tanimoto, dice, tanimoto};
pub use fingerprint::{
    DenseBitFingerprint, DenseCountFingerprint, Fingerprint, OutputKind, SparseBitFingerprint,
    SparseCountFingerprint,
};
pub use generator::{
    AdditionalOutput, Algorithm, Feature, FingerprintGenerator, FingerprintType, GeneratorConfig,
};
pub use invariants::{AtomInvariant, AtomInvariantProvider, FnInvariants, InvariantKind};
pub use mhfp::{shingling, MhfpEncoder, MhfpSignature, ShinglingOptions};
pub use mol::{Atom, Bond, BondType, Chirality, MolBuilder, MolDocument, MolGraph};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, GeneratorRef, GeneratorRegistry, ServiceState};

/// Schema version of serialized fingerprints and configurations.
/// Increment on breaking changes to any serialized type.
pub const MOLFP_SCHEMA_VERSION: &str = "1.0.0";
