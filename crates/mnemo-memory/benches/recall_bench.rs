use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mnemo_automata::add_noise_with_rng;
use mnemo_memory::{
    CaEngineConfig, CaMemoryEngine, EnsembleOptions, HopfieldConfig, HopfieldMemoryEngine,
    MemoryAi, MemoryAiConfig, MemoryEngine, RecallOptions, builtin, grids,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_ca_recall(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut engine = CaMemoryEngine::create(CaEngineConfig::default()).unwrap();
    let block = builtin::block(32, 32, 15, 15).unwrap();
    engine.store(std::slice::from_ref(&block)).unwrap();
    let probe = add_noise_with_rng(&block, 0.05, &mut rng);

    c.bench_function("ca_recall_32x32_80", |b| {
        b.iter(|| {
            black_box(
                engine
                    .recall_with_rng(black_box(&probe), &RecallOptions::default(), &mut rng)
                    .unwrap(),
            )
        })
    });
}

fn bench_hopfield(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let patterns = grids(&builtin::capacity_set(3, 16).unwrap());
    let mut net = HopfieldMemoryEngine::create(HopfieldConfig::with_size(16, 16)).unwrap();

    c.bench_function("hopfield_store_16x16_3", |b| {
        b.iter(|| net.store(black_box(&patterns)).unwrap())
    });

    let probe = add_noise_with_rng(&patterns[0], 0.05, &mut rng);
    c.bench_function("hopfield_recall_16x16", |b| {
        b.iter(|| {
            black_box(
                net.recall_with_rng(&probe, &RecallOptions::default(), &mut rng)
                    .unwrap(),
            )
        })
    });
}

fn bench_ensemble(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut ai = MemoryAi::new(MemoryAiConfig {
        width: 16,
        height: 16,
        steps: 40,
        ..MemoryAiConfig::default()
    })
    .unwrap();
    let patterns = grids(&builtin::capacity_set(3, 16).unwrap());
    ai.store_with_rng(&patterns, &mut rng).unwrap();
    ai.train_selector_with_rng(&mut rng).unwrap();
    let probe = add_noise_with_rng(&patterns[0], 0.05, &mut rng);

    let mut group = c.benchmark_group("ensemble_16x16");
    group.bench_function("full_scan", |b| {
        b.iter(|| {
            black_box(
                ai.recall_with_rng(&probe, &EnsembleOptions::default(), &mut rng)
                    .unwrap(),
            )
        })
    });
    group.bench_function("predicted", |b| {
        b.iter(|| {
            black_box(
                ai.recall_with_rng(&probe, &EnsembleOptions::predicted(0), &mut rng)
                    .unwrap(),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_ca_recall, bench_hopfield, bench_ensemble);
criterion_main!(benches);
