//! LRU cache of generated fingerprints.
//!
//! ## Cache Key Design
//!
//! The key is an xxh64 over everything that determines a fingerprint:
//! - generator `params_hash`
//! - molecule content hash
//! - output kind
//!
//! Any change to one of them is a miss. A cached value is exactly what the
//! generator would have produced, so the cache can skip work but never
//! change a result.

use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use xxhash_rust::xxh64::Xxh64;

use crate::error::Result;
use crate::fingerprint::{Fingerprint, OutputKind};
use crate::generator::FingerprintGenerator;
use crate::mol::MolGraph;

/// Fallback capacity when `max_entries` is zero.
const FALLBACK_CAPACITY: usize = 1000;

/// Configuration for the fingerprint cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_entries: usize,
    /// Whether to enable the cache.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// A disabled cache.
    pub fn disabled() -> Self {
        Self {
            max_entries: 0,
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey(u64);

impl CacheKey {
    fn compute(params_hash: &str, mol_hash: &str, kind: OutputKind) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.write(params_hash.as_bytes());
        hasher.write(mol_hash.as_bytes());
        hasher.write(kind.to_string().as_bytes());
        Self(hasher.finish())
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to generate.
    pub misses: u64,
}

/// Thread-safe fingerprint cache. Cloning shares the underlying store.
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    inner: Option<Arc<RwLock<LruCache<CacheKey, Fingerprint>>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl FingerprintCache {
    /// Create a cache; a disabled config yields a pass-through cache.
    pub fn new(config: &CacheConfig) -> Self {
        let inner = config.enabled.then(|| {
            let size = NonZeroUsize::new(config.max_entries)
                .or(NonZeroUsize::new(FALLBACK_CAPACITY))
                .unwrap_or(NonZeroUsize::MIN);
            Arc::new(RwLock::new(LruCache::new(size)))
        });
        Self {
            inner,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether lookups are cached at all.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Cached fingerprint, generating and storing it on a miss.
    ///
    /// Returns the fingerprint and whether it came from the cache.
    pub fn get_or_generate(
        &self,
        generator: &FingerprintGenerator,
        mol: &MolGraph,
        kind: OutputKind,
    ) -> Result<(Fingerprint, bool)> {
        let Some(cache) = &self.inner else {
            return Ok((generator.generate(mol, kind)?, false));
        };
        let key = CacheKey::compute(&generator.params_hash(), &mol.content_hash(), kind);

        if let Some(fp) = cache.write().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((fp.clone(), true));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fp = generator.generate(mol, kind)?;
        cache.write().put(key, fp.clone());
        Ok((fp, false))
    }

    /// Get cache statistics.
    ///
    /// Returns `None` if caching is disabled.
    pub fn stats(&self) -> Option<CacheStats> {
        self.inner.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
                hits: self.hits.load(Ordering::Relaxed),
                misses: self.misses.load(Ordering::Relaxed),
            }
        })
    }

    /// Drop every entry. Does nothing if caching is disabled.
    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.write().clear();
        }
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;
    use crate::mol::test_mols::*;

    fn generator() -> FingerprintGenerator {
        FingerprintGenerator::new(GeneratorConfig::morgan(2)).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = FingerprintCache::default();
        let g = generator();
        let (first, hit) = cache.get_or_generate(&g, &ethanol(), OutputKind::DenseBit).unwrap();
        assert!(!hit);
        let (second, hit) = cache.get_or_generate(&g, &ethanol(), OutputKind::DenseBit).unwrap();
        assert!(hit);
        assert_eq!(first, second);

        let stats = cache.stats().unwrap();
        assert_eq!((stats.len, stats.hits, stats.misses), (1, 1, 1));
    }

    #[test]
    fn test_key_covers_kind_and_params() {
        let cache = FingerprintCache::default();
        let mol = ethanol();
        cache.get_or_generate(&generator(), &mol, OutputKind::DenseBit).unwrap();
        let (_, hit) = cache.get_or_generate(&generator(), &mol, OutputKind::DenseCount).unwrap();
        assert!(!hit);
        let other = FingerprintGenerator::new(GeneratorConfig::morgan(3)).unwrap();
        let (_, hit) = cache.get_or_generate(&other, &mol, OutputKind::DenseBit).unwrap();
        assert!(!hit);
        assert_eq!(cache.stats().unwrap().len, 3);
    }

    #[test]
    fn test_capacity_and_clear() {
        let cache = FingerprintCache::new(&CacheConfig { max_entries: 2, enabled: true });
        let g = generator();
        for n in 2..6 {
            cache.get_or_generate(&g, &alkane(n), OutputKind::SparseCount).unwrap();
        }
        let stats = cache.stats().unwrap();
        assert_eq!((stats.len, stats.cap), (2, 2));
        cache.clear();
        assert_eq!(cache.stats().unwrap().len, 0);
    }

    #[test]
    fn test_hit_refreshes_recency() {
        let cache = FingerprintCache::new(&CacheConfig { max_entries: 2, enabled: true });
        let g = generator();
        let kind = OutputKind::SparseCount;
        cache.get_or_generate(&g, &alkane(2), kind).unwrap();
        cache.get_or_generate(&g, &alkane(3), kind).unwrap();
        // touching ethane makes propane the eviction candidate
        assert!(cache.get_or_generate(&g, &alkane(2), kind).unwrap().1);
        cache.get_or_generate(&g, &alkane(4), kind).unwrap();

        assert!(cache.get_or_generate(&g, &alkane(2), kind).unwrap().1);
        assert!(!cache.get_or_generate(&g, &alkane(3), kind).unwrap().1);
    }

    #[test]
    fn test_disabled_cache_passes_through() {
        let cache = FingerprintCache::new(&CacheConfig::disabled());
        assert!(cache.stats().is_none());
        let (_, hit) = cache.get_or_generate(&generator(), &ethanol(), OutputKind::DenseBit).unwrap();
        assert!(!hit);
    }
}
