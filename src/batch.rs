//! Batch fingerprint generation.
//!
//! Molecules are fingerprinted in parallel (rayon) and results come back in
//! input order. `generate_many` fails as a whole, reporting the lowest
//! failing index; `try_generate_each` keeps one result per molecule.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument};

use crate::cache::FingerprintCache;
use crate::canonical::canonical_hash_hex;
use crate::error::FingerprintError;
use crate::fingerprint::{
    DenseBitFingerprint, DenseCountFingerprint, Fingerprint, OutputKind, SparseBitFingerprint,
    SparseCountFingerprint,
};
use crate::generator::{FingerprintGenerator, FingerprintType};
use crate::mol::MolGraph;

/// A batch failure, tagged with the molecule that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("molecule {index}: {source}")]
pub struct BatchError {
    /// Position of the failing molecule in the input.
    pub index: usize,
    /// Underlying error.
    #[source]
    pub source: FingerprintError,
}

/// Fingerprint every molecule; fails with the lowest failing index.
#[instrument(skip_all, fields(molecules = mols.len(), kind = %kind))]
pub fn generate_many(
    generator: &FingerprintGenerator,
    mols: &[MolGraph],
    kind: OutputKind,
) -> Result<Vec<Fingerprint>, BatchError> {
    let start = Instant::now();
    let results: Vec<_> = mols.par_iter().map(|mol| generator.generate(mol, kind)).collect();
    let fingerprints = results
        .into_iter()
        .enumerate()
        .map(|(index, result)| result.map_err(|source| BatchError { index, source }))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        algorithm = %generator.fingerprint_type(),
        latency_ms = start.elapsed().as_millis() as u64,
        "batch generated"
    );
    Ok(fingerprints)
}

/// Fingerprint every molecule, keeping per-molecule errors.
pub fn try_generate_each(
    generator: &FingerprintGenerator,
    mols: &[MolGraph],
    kind: OutputKind,
) -> Vec<Result<Fingerprint, FingerprintError>> {
    mols.par_iter().map(|mol| generator.generate(mol, kind)).collect()
}

/// Result of a [`BatchFingerprinter`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Generator parameter hash.
    pub params_hash: String,
    /// Output kind.
    pub kind: OutputKind,
    /// One fingerprint per molecule, in input order.
    pub fingerprints: Vec<Fingerprint>,
    /// Hash over the parameter hash and every fingerprint.
    pub batch_hash: String,
    /// Molecules answered from the cache.
    pub cache_hits: usize,
}

/// Generator plus optional cache, for repeated batch runs.
#[derive(Debug, Clone)]
pub struct BatchFingerprinter {
    generator: FingerprintGenerator,
    cache: Option<FingerprintCache>,
}

impl BatchFingerprinter {
    /// Batch runner without a cache.
    pub fn new(generator: FingerprintGenerator) -> Self {
        Self { generator, cache: None }
    }

    /// Attach a cache.
    pub fn with_cache(mut self, cache: FingerprintCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The generator.
    pub fn generator(&self) -> &FingerprintGenerator {
        &self.generator
    }

    /// The cache, if any.
    pub fn cache(&self) -> Option<&FingerprintCache> {
        self.cache.as_ref()
    }

    /// Fingerprint every molecule.
    #[instrument(skip_all, fields(molecules = mols.len(), kind = %kind))]
    pub fn run(&self, mols: &[MolGraph], kind: OutputKind) -> Result<BatchResult, BatchError> {
        let start = Instant::now();
        let params_hash = self.generator.params_hash();

        let results: Vec<_> = mols
            .par_iter()
            .map(|mol| match &self.cache {
                Some(cache) => cache.get_or_generate(&self.generator, mol, kind),
                None => self.generator.generate(mol, kind).map(|fp| (fp, false)),
            })
            .collect();

        let mut fingerprints = Vec::with_capacity(mols.len());
        let mut cache_hits = 0;
        for (index, result) in results.into_iter().enumerate() {
            let (fp, hit) = result.map_err(|source| BatchError { index, source })?;
            cache_hits += usize::from(hit);
            fingerprints.push(fp);
        }

        let hashes: Vec<String> = fingerprints.iter().map(Fingerprint::content_hash).collect();
        let batch_hash = canonical_hash_hex(&(&params_hash, kind, hashes));

        info!(
            algorithm = %self.generator.fingerprint_type(),
            cache_hits,
            latency_ms = start.elapsed().as_millis() as u64,
            "batch run complete"
        );

        Ok(BatchResult {
            params_hash,
            kind,
            fingerprints,
            batch_hash,
            cache_hits,
        })
    }
}

fn bulk(mols: &[MolGraph], fp_type: FingerprintType, kind: OutputKind) -> Result<Vec<Fingerprint>, BatchError> {
    generate_many(&FingerprintGenerator::default_for(fp_type), mols, kind)
}

/// Unfolded counts with the default generator of `fp_type`.
pub fn sparse_count_fps(mols: &[MolGraph], fp_type: FingerprintType) -> Result<Vec<SparseCountFingerprint>, BatchError> {
    Ok(bulk(mols, fp_type, OutputKind::SparseCount)?
        .into_iter()
        .filter_map(|fp| match fp {
            Fingerprint::SparseCount(fp) => Some(fp),
            _ => None,
        })
        .collect())
}

/// Unfolded bits with the default generator of `fp_type`.
pub fn sparse_fps(mols: &[MolGraph], fp_type: FingerprintType) -> Result<Vec<SparseBitFingerprint>, BatchError> {
    Ok(bulk(mols, fp_type, OutputKind::SparseBit)?
        .into_iter()
        .filter_map(|fp| match fp {
            Fingerprint::SparseBit(fp) => Some(fp),
            _ => None,
        })
        .collect())
}

/// Folded counts with the default generator of `fp_type`.
pub fn count_fps(mols: &[MolGraph], fp_type: FingerprintType) -> Result<Vec<DenseCountFingerprint>, BatchError> {
    Ok(bulk(mols, fp_type, OutputKind::DenseCount)?
        .into_iter()
        .filter_map(|fp| match fp {
            Fingerprint::DenseCount(fp) => Some(fp),
            _ => None,
        })
        .collect())
}

/// Folded bits with the default generator of `fp_type`.
pub fn fps(mols: &[MolGraph], fp_type: FingerprintType) -> Result<Vec<DenseBitFingerprint>, BatchError> {
    Ok(bulk(mols, fp_type, OutputKind::DenseBit)?
        .into_iter()
        .filter_map(|fp| match fp {
            Fingerprint::DenseBit(fp) => Some(fp),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InputError;
    use crate::generator::GeneratorConfig;
    use crate::invariants::FnInvariants;
    use crate::mol::test_mols::*;

    fn sample() -> Vec<MolGraph> {
        vec![alkane(3), ethanol(), benzene(), alkane(5), isobutane()]
    }

    #[test]
    fn test_batch_matches_single_calls() {
        let g = FingerprintGenerator::new(GeneratorConfig::morgan(2)).unwrap();
        let mols = sample();
        let batch = generate_many(&g, &mols, OutputKind::DenseBit).unwrap();
        for (mol, fp) in mols.iter().zip(&batch) {
            assert_eq!(&g.generate(mol, OutputKind::DenseBit).unwrap(), fp);
        }
    }

    #[test]
    fn test_lowest_failing_index_reported() {
        // fails for any molecule with exactly 3 atoms
        let g = FingerprintGenerator::new(GeneratorConfig::atom_pair())
            .unwrap()
            .with_invariant_provider(FnInvariants::shared("picky", |mol: &MolGraph| {
                if mol.num_atoms() == 3 {
                    Vec::new()
                } else {
                    vec![0; mol.num_atoms()]
                }
            }));
        let err = generate_many(&g, &sample(), OutputKind::SparseCount).unwrap_err();
        assert_eq!(err.index, 0);
        assert!(matches!(
            err.source,
            FingerprintError::Input(InputError::InvariantCountMismatch { .. })
        ));

        let each = try_generate_each(&g, &sample(), OutputKind::SparseCount);
        let failed: Vec<usize> = each.iter().enumerate().filter(|(_, r)| r.is_err()).map(|(i, _)| i).collect();
        assert_eq!(failed, vec![0, 1]);
    }

    #[test]
    fn test_fingerprinter_uses_cache() {
        let g = FingerprintGenerator::new(GeneratorConfig::atom_pair()).unwrap();
        let runner = BatchFingerprinter::new(g).with_cache(FingerprintCache::default());
        let first = runner.run(&sample(), OutputKind::SparseBit).unwrap();
        let second = runner.run(&sample(), OutputKind::SparseBit).unwrap();
        assert_eq!(first.cache_hits, 0);
        assert_eq!(second.cache_hits, 5);
        assert_eq!(first.batch_hash, second.batch_hash);
        assert_eq!(first.fingerprints, second.fingerprints);
    }

    #[test]
    fn test_bulk_helpers_match_default_generators() {
        let mols = sample();
        for fp_type in FingerprintType::ALL {
            let g = FingerprintGenerator::default_for(fp_type);
            let counts = sparse_count_fps(&mols, fp_type).unwrap();
            let dense = fps(&mols, fp_type).unwrap();
            assert_eq!(counts.len(), mols.len());
            for (i, mol) in mols.iter().enumerate() {
                assert_eq!(counts[i], g.sparse_count_fingerprint(mol).unwrap());
                assert_eq!(dense[i], g.fingerprint(mol).unwrap());
            }
        }
    }
}
