//! Integer hashing primitives shared by the generators.
//!
//! All feature buckets are `u32` values built by chaining [`hash_combine`],
//! a boost-style combiner. Order matters, so callers sort their inputs
//! before combining whenever the environment has no natural order.

/// Golden-ratio constant used by the combiner.
const GOLDEN_RATIO_32: u32 = 0x9e37_79b9;

/// Mix `value` into `seed` (boost `hash_combine` on 32-bit words).
#[inline]
pub fn hash_combine(seed: &mut u32, value: u32) {
    *seed ^= value
        .wrapping_add(GOLDEN_RATIO_32)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// Fold a sequence of words into one hash, starting from `seed`.
pub fn hash_words(seed: u32, words: &[u32]) -> u32 {
    let mut h = seed;
    for &w in words {
        hash_combine(&mut h, w);
    }
    h
}

/// SplitMix64 finalizer. Bijective on `u64`.
#[inline]
pub fn mix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Derive `count` distinct pseudo-independent positions in `0..modulus` from one base hash.
///
/// Position `j` is drawn from `mix64(base, seed)` with successive seeds; a draw
/// that repeats an earlier position is discarded. When `modulus` is smaller
/// than `count`, every position in `0..modulus` is returned.
pub fn seeded_positions(base: u32, count: usize, modulus: u64) -> Vec<u64> {
    let wanted = count.min(usize::try_from(modulus).unwrap_or(usize::MAX));
    let mut out: Vec<u64> = Vec::with_capacity(wanted);
    let mut seed = 0u64;
    while out.len() < wanted {
        let pos = mix64(((base as u64) << 32) | seed) % modulus;
        if !out.contains(&pos) {
            out.push(pos);
        }
        seed += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_combine_is_order_sensitive() {
        assert_ne!(hash_words(0, &[1, 2]), hash_words(0, &[2, 1]));
        assert_eq!(hash_words(7, &[1, 2, 3]), hash_words(7, &[1, 2, 3]));
    }

    #[test]
    fn test_seeded_positions_distinct() {
        let positions = seeded_positions(12345, 4, 2048);
        assert_eq!(positions.len(), 4);
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
        assert!(positions.iter().all(|&p| p < 2048));
    }

    #[test]
    fn test_seeded_positions_small_modulus() {
        let positions = seeded_positions(9, 5, 3);
        assert_eq!(positions.len(), 3);
    }
}
