//! Service state management.
//!
//! Contains the GeneratorRegistry and shared service state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CacheConfig, FingerprintCache};
use crate::canonical::canonical_hash_hex;
use crate::error::ConfigError;
use crate::generator::{FingerprintGenerator, FingerprintType, GeneratorConfig};
use crate::mhfp::{MhfpEncoder, DEFAULT_PERMUTATIONS, DEFAULT_SEED};

/// Reference to a registered generator by hash.
///
/// Stable across requests and restarts: the same configuration always yields
/// the same reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorRef {
    /// Fingerprint family ("morgan", "atom_pair", ...).
    pub algorithm: String,
    /// xxHash64 of the canonical generator configuration.
    pub params_hash: String,
}

impl GeneratorRef {
    /// Reference for a built generator.
    pub fn from_generator(generator: &FingerprintGenerator) -> Self {
        Self {
            algorithm: generator.fingerprint_type().to_string(),
            params_hash: generator.params_hash(),
        }
    }

    /// Create a reference with explicit values.
    pub fn new(algorithm: impl Into<String>, params_hash: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            params_hash: params_hash.into(),
        }
    }
}

/// Registry of validated generator configurations.
///
/// The registry carries a fingerprint that changes whenever a generator is
/// added.
#[derive(Debug, Clone)]
pub struct GeneratorRegistry {
    generators: BTreeMap<GeneratorRef, FingerprintGenerator>,
    registry_fingerprint: String,
}

impl GeneratorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        let mut registry = Self {
            generators: BTreeMap::new(),
            registry_fingerprint: String::new(),
        };
        registry.update_fingerprint();
        registry
    }

    /// Registry with the default generator of every family.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in FingerprintType::ALL {
            registry.insert(FingerprintGenerator::default_for(kind));
        }
        registry
    }

    /// Validate and register a configuration.
    ///
    /// Registering an existing configuration returns the existing reference.
    pub fn register(&mut self, config: GeneratorConfig) -> Result<GeneratorRef, ConfigError> {
        let generator = FingerprintGenerator::new(config)?;
        Ok(self.insert(generator))
    }

    fn insert(&mut self, generator: FingerprintGenerator) -> GeneratorRef {
        let generator_ref = GeneratorRef::from_generator(&generator);
        if !self.generators.contains_key(&generator_ref) {
            self.generators.insert(generator_ref.clone(), generator);
            self.update_fingerprint();
        }
        generator_ref
    }

    /// Resolve a reference to its generator.
    pub fn resolve(&self, generator_ref: &GeneratorRef) -> Option<&FingerprintGenerator> {
        self.generators.get(generator_ref)
    }

    /// Registered references with their configurations.
    pub fn list(&self) -> Vec<(GeneratorRef, GeneratorConfig)> {
        self.generators
            .iter()
            .map(|(r, g)| (r.clone(), g.config().clone()))
            .collect()
    }

    /// Get the registry fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.registry_fingerprint
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    fn update_fingerprint(&mut self) {
        let refs: Vec<_> = self.generators.keys().collect();
        self.registry_fingerprint = canonical_hash_hex(&refs);
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared service state. Cloning shares everything.
#[derive(Debug, Clone)]
pub struct ServiceState {
    /// Registered generators.
    pub registry: Arc<RwLock<GeneratorRegistry>>,
    /// Fingerprint cache shared by all handlers.
    pub cache: FingerprintCache,
    /// MinHash encoder for `/api/mhfp`.
    pub mhfp: Arc<MhfpEncoder>,
}

impl ServiceState {
    /// State with an explicit registry, cache and encoder.
    pub fn new(registry: GeneratorRegistry, cache: FingerprintCache, mhfp: MhfpEncoder) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            cache,
            mhfp: Arc::new(mhfp),
        }
    }

    /// State from environment variables.
    ///
    /// Reads `FP_CACHE_ENTRIES` (0 disables the cache), `MHFP_PERMUTATIONS`
    /// and `MHFP_SEED`, falling back to defaults when unset or unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cache_entries = env_or("FP_CACHE_ENTRIES", CacheConfig::default().max_entries);
        let cache_config = if cache_entries == 0 {
            CacheConfig::disabled()
        } else {
            CacheConfig {
                max_entries: cache_entries,
                enabled: true,
            }
        };
        let permutations = env_or("MHFP_PERMUTATIONS", DEFAULT_PERMUTATIONS);
        let seed = env_or("MHFP_SEED", DEFAULT_SEED);

        Ok(Self::new(
            GeneratorRegistry::with_defaults(),
            FingerprintCache::new(&cache_config),
            MhfpEncoder::new(permutations, seed)?,
        ))
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new(
            GeneratorRegistry::with_defaults(),
            FingerprintCache::default(),
            MhfpEncoder::default(),
        )
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "unparsable value, using default");
            default
        }),
        Err(_) => default,
    }
}
