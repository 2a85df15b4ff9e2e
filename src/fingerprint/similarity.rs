//! Similarity metrics over fingerprints.
//!
//! Bit fingerprints compare as sets, count fingerprints as multisets
//! (`Σ min / Σ max`). Both sides must have the same kind and length.

use rayon::prelude::*;
use std::collections::BTreeMap;

use super::Fingerprint;
use crate::error::ConfigError;

/// Overlap statistics of two fingerprints: (|a ∩ b|, |a|, |b|), weighted by count.
fn overlap(a: &Fingerprint, b: &Fingerprint) -> Result<(u64, u64, u64), ConfigError> {
    if a.kind() != b.kind() {
        return Err(ConfigError::KindMismatch {
            left: a.kind().to_string(),
            right: b.kind().to_string(),
        });
    }
    if a.length() != b.length() {
        return Err(ConfigError::SizeMismatch {
            left: a.length(),
            right: b.length(),
        });
    }

    if let (Fingerprint::DenseBit(x), Fingerprint::DenseBit(y)) = (a, b) {
        let common: u64 = x
            .words()
            .iter()
            .zip(y.words())
            .map(|(p, q)| (p & q).count_ones() as u64)
            .sum();
        return Ok((common, x.num_on_bits() as u64, y.num_on_bits() as u64));
    }

    let left: BTreeMap<u64, u32> = a.nonzero_elements().into_iter().collect();
    let right = b.nonzero_elements();
    let size_a: u64 = left.values().map(|&c| c as u64).sum();
    let size_b: u64 = right.iter().map(|&(_, c)| c as u64).sum();
    let common: u64 = right
        .iter()
        .filter_map(|(idx, c)| left.get(idx).map(|l| (*l).min(*c) as u64))
        .sum();
    Ok((common, size_a, size_b))
}

/// Tanimoto (Jaccard) similarity. Two empty fingerprints score 0.
pub fn tanimoto(a: &Fingerprint, b: &Fingerprint) -> Result<f64, ConfigError> {
    let (common, size_a, size_b) = overlap(a, b)?;
    let union = size_a + size_b - common;
    Ok(if union == 0 { 0.0 } else { common as f64 / union as f64 })
}

/// Dice similarity. Two empty fingerprints score 0.
pub fn dice(a: &Fingerprint, b: &Fingerprint) -> Result<f64, ConfigError> {
    let (common, size_a, size_b) = overlap(a, b)?;
    let total = size_a + size_b;
    Ok(if total == 0 { 0.0 } else { 2.0 * common as f64 / total as f64 })
}

/// Tanimoto of `query` against every fingerprint in `targets`, in order.
pub fn bulk_tanimoto(query: &Fingerprint, targets: &[Fingerprint]) -> Result<Vec<f64>, ConfigError> {
    targets.par_iter().map(|t| tanimoto(query, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{DenseBitFingerprint, DenseCountFingerprint};

    fn bits(size: usize, on: &[usize]) -> Fingerprint {
        let mut fp = DenseBitFingerprint::new(size);
        for &b in on {
            fp.set(b);
        }
        Fingerprint::DenseBit(fp)
    }

    #[test]
    fn test_bit_tanimoto_and_dice() {
        let a = bits(64, &[1, 2, 3]);
        let b = bits(64, &[2, 3, 4, 5]);
        assert!((tanimoto(&a, &b).unwrap() - 2.0 / 5.0).abs() < 1e-12);
        assert!((dice(&a, &b).unwrap() - 4.0 / 7.0).abs() < 1e-12);
        assert_eq!(tanimoto(&a, &a).unwrap(), 1.0);
    }

    #[test]
    fn test_count_tanimoto() {
        let a = Fingerprint::DenseCount(DenseCountFingerprint { counts: vec![2, 1, 0] });
        let b = Fingerprint::DenseCount(DenseCountFingerprint { counts: vec![1, 1, 3] });
        // min sum 2, total 3 + 5
        assert!((tanimoto(&a, &b).unwrap() - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_mismatches_are_rejected() {
        let a = bits(64, &[1]);
        assert!(matches!(tanimoto(&a, &bits(128, &[1])), Err(ConfigError::SizeMismatch { .. })));
        let c = Fingerprint::DenseCount(DenseCountFingerprint::new(64));
        assert!(matches!(tanimoto(&a, &c), Err(ConfigError::KindMismatch { .. })));
    }

    #[test]
    fn test_bulk_preserves_order() {
        let q = bits(64, &[1, 2]);
        let targets = vec![bits(64, &[1, 2]), bits(64, &[9]), bits(64, &[2])];
        assert_eq!(bulk_tanimoto(&q, &targets).unwrap(), vec![1.0, 0.0, 0.5]);
    }
}
