//! Associative memory on top of Life-like cellular automata.
//!
//! A [`CaMemoryEngine`] stores a set of grids and recalls a noisy probe by
//! evolving it under a rule and matching the result against the stored set.
//! [`HopfieldMemoryEngine`] offers the same [`MemoryEngine`] contract with a
//! Hebbian network. [`MemoryAi`] runs a roster of both and can learn which
//! engine to trust per pattern via an [`EngineSelector`].
//!
//! # Example
//!
//! ```
//! use mnemo_memory::{CaEngineConfig, CaMemoryEngine, MemoryEngine, RecallOptions, builtin};
//!
//! let config = CaEngineConfig::with_rule("B3/S23")?.with_size(16, 16);
//! let mut engine = CaMemoryEngine::create(config)?;
//! let block = builtin::block(16, 16, 7, 7)?;
//! engine.store(&[block.clone()])?;
//!
//! let recall = engine.recall(&block, &RecallOptions::default())?;
//! assert!(recall.success);
//! assert_eq!(recall.distance, Some(0));
//! # Ok::<(), mnemo_memory::MemoryError>(())
//! ```

mod ca;
mod engine;
mod ensemble;
mod error;
mod evaluate;
mod hopfield;
mod pattern;
mod selector;

pub use ca::{CaEngineConfig, CaMemoryEngine, IntoRule};
pub use engine::{EngineId, MemoryEngine, Recall, RecallOptions, nearest};
pub use ensemble::{EngineRecall, EnsembleOptions, EnsembleRecall, MemoryAi, MemoryAiConfig};
pub use error::{MemoryError, Result};
pub use evaluate::{
    CAPACITY_RECALL, CapacityConfig, CapacityPoint, CapacityReport, EvaluationConfig,
    LOW_NOISE_MAX, MEDIUM_NOISE_MIN, NoiseStats, RecallClass, RuleEvaluation, TrialConfig,
    TrialStats, capacity, capacity_with_rng, evaluate_rule, evaluate_rule_with_rng,
    evaluate_rules_with_rng, measure_rule, measure_rule_with_rng,
};
pub use hopfield::{HOPFIELD_MAX_SWEEPS, HopfieldConfig, HopfieldMemoryEngine};
pub use pattern::{Pattern, builtin, grids, patterns_from_json, patterns_to_json};
pub use selector::{
    BenchmarkConfig, EngineSelector, SelectorBenchmark, SelectorConfig, benchmark_selector,
};

/// Property tests over many rules and seeds.
///
/// Run with: `cargo test -p mnemo-memory --features invariant-tests`
#[cfg(all(test, feature = "invariant-tests"))]
mod invariant_tests {
    use super::*;
    use mnemo_automata::{Grid, add_noise_with_rng, presets};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn random_set(rng: &mut StdRng, count: usize, size: usize) -> Vec<Grid> {
        (0..count)
            .map(|_| Grid::random_with_rng(size, size, 0.3, rng).unwrap())
            .collect()
    }

    #[test]
    fn test_recall_never_mutates_stored_set() {
        let mut rng = StdRng::seed_from_u64(1);
        let patterns = random_set(&mut rng, 3, 12);
        let mut ai = MemoryAi::new(MemoryAiConfig {
            width: 12,
            height: 12,
            steps: 10,
            ..MemoryAiConfig::default()
        })
        .unwrap();
        ai.store(&patterns).unwrap();

        for _ in 0..5 {
            let probe = add_noise_with_rng(&patterns[0], 0.2, &mut rng);
            ai.recall_with_rng(&probe, &EnsembleOptions::default(), &mut rng)
                .unwrap();
        }
        for engine in ai.engines() {
            assert_eq!(engine.stored(), &patterns[..]);
        }
    }

    #[test]
    fn test_success_matches_distance() {
        let mut rng = StdRng::seed_from_u64(2);
        for rule in presets::MEMORY_CHAMPIONS {
            let mut engine = CaMemoryEngine::create(CaEngineConfig {
                rule,
                width: 10,
                height: 10,
                steps: 6,
            })
            .unwrap();
            let patterns = random_set(&mut rng, 2, 10);
            engine.store(&patterns).unwrap();

            let probe = add_noise_with_rng(&patterns[1], 0.1, &mut rng);
            let recall = engine.recall(&probe, &RecallOptions::default()).unwrap();
            let distance = recall.distance.unwrap();
            assert_eq!(recall.success, distance as f64 / 100.0 <= 0.1);
            assert_eq!(
                Some((recall.nearest.unwrap(), distance)),
                nearest(&recall.state, &patterns).unwrap()
            );
        }
    }

    #[test]
    fn test_hopfield_sweeps_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let patterns = random_set(&mut rng, 4, 6);
        let mut net = HopfieldMemoryEngine::create(HopfieldConfig::with_size(6, 6)).unwrap();
        net.store(&patterns).unwrap();

        for cap in [1, 2, 5] {
            let probe = Grid::random_with_rng(6, 6, 0.5, &mut rng).unwrap();
            let recall = net
                .recall_with_rng(&probe, &RecallOptions::default().with_steps(cap), &mut rng)
                .unwrap();
            assert!(recall.steps_used >= 1 && recall.steps_used <= cap);
        }
    }
}
