//! Performance benchmarks for fingerprint generation.
//!
//! Run with: `cargo bench --bench generators`
//!
//! ## Scenarios
//!
//! | Group | What it measures |
//! |-------|------------------|
//! | generators | One molecule, each family, growing chain length |
//! | batch | Parallel batch generation over many molecules |
//! | cache | Cached vs. uncached repeated lookups |
//! | mhfp | Shingling plus MinHash encoding |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use molfp::{
    generate_many, Atom, BondType, CacheConfig, FingerprintCache, FingerprintGenerator,
    FingerprintType, MhfpEncoder, MolBuilder, MolGraph, OutputKind, ShinglingOptions,
};

/// Alkyl chain of `n` carbons with a phenyl ring on one end.
fn make_mol(n: usize) -> MolGraph {
    let mut b = MolBuilder::new();
    let ring: Vec<usize> = (0..6)
        .map(|i| b.add_atom(Atom::new(6).with_hydrogens(u8::from(i != 0)).aromatic()))
        .collect();
    for i in 0..6 {
        b.add_bond(ring[i], ring[(i + 1) % 6], BondType::Aromatic);
    }
    let mut prev = ring[0];
    for i in 0..n {
        let element = if i % 4 == 3 { 8 } else { 6 };
        let hydrogens = if i + 1 == n { 3 } else { 2 };
        let atom = b.add_atom(Atom::new(element).with_hydrogens(if element == 8 { 0 } else { hydrogens }));
        b.add_bond(prev, atom, BondType::Single);
        prev = atom;
    }
    b.build().expect("benchmark molecule is valid")
}

fn bench_generators(c: &mut Criterion) {
    let mut group = c.benchmark_group("generators");

    for fp_type in FingerprintType::ALL {
        let generator = FingerprintGenerator::default_for(fp_type);
        for chain in [4, 16, 32] {
            let mol = make_mol(chain);
            group.throughput(Throughput::Elements(1));
            group.bench_with_input(
                BenchmarkId::new(fp_type.to_string(), chain),
                &mol,
                |b, mol| b.iter(|| generator.generate(black_box(mol), OutputKind::DenseBit).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let generator = FingerprintGenerator::default_for(FingerprintType::Morgan);
    let mut group = c.benchmark_group("batch");

    for size in [10, 100, 1000] {
        let mols: Vec<_> = (0..size).map(|i| make_mol(4 + i % 24)).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("morgan", size), &mols, |b, mols| {
            b.iter(|| generate_many(&generator, black_box(mols), OutputKind::SparseCount).unwrap())
        });
    }

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let generator = FingerprintGenerator::default_for(FingerprintType::AtomPair);
    let mol = make_mol(24);
    let mut group = c.benchmark_group("cache");

    let cached = FingerprintCache::new(&CacheConfig::default());
    cached.get_or_generate(&generator, &mol, OutputKind::DenseBit).unwrap();
    group.bench_function("hit", |b| {
        b.iter(|| {
            let (fp, hit) = cached.get_or_generate(&generator, black_box(&mol), OutputKind::DenseBit).unwrap();
            assert!(hit);
            fp
        })
    });

    let uncached = FingerprintCache::new(&CacheConfig::disabled());
    group.bench_function("disabled", |b| {
        b.iter(|| uncached.get_or_generate(&generator, black_box(&mol), OutputKind::DenseBit).unwrap())
    });

    group.finish();
}

fn bench_mhfp(c: &mut Criterion) {
    let encoder = MhfpEncoder::default();
    let opts = ShinglingOptions::default();
    let mut group = c.benchmark_group("mhfp");

    for chain in [4, 16, 32] {
        let mol = make_mol(chain);
        group.bench_with_input(BenchmarkId::new("encode", chain), &mol, |b, mol| {
            b.iter(|| encoder.encode(black_box(mol), &opts))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generators, bench_batch, bench_cache, bench_mhfp);
criterion_main!(benches);
