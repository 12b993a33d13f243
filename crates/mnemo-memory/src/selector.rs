//! Learns which engine of an ensemble recalls each stored pattern best.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mnemo_automata::{Grid, add_noise_with_rng, hash_grid};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::EngineId;
use crate::ensemble::{EnsembleOptions, MemoryAi};
use crate::error::{MemoryError, Result};

/// Training parameters for [`EngineSelector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Noise rates drawn uniformly per training sample.
    pub noise_levels: Vec<f64>,
    /// Noisy probes per stored pattern.
    pub samples_per_pattern: usize,
    /// Share of a pattern's samples one engine must win to be suggested.
    pub min_share: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            noise_levels: vec![0.05, 0.08],
            samples_per_pattern: 10,
            min_share: 0.6,
        }
    }
}

impl SelectorConfig {
    fn validate(&self) -> Result<()> {
        if self.noise_levels.is_empty() {
            return Err(MemoryError::InvalidConfig("selector needs at least one noise level"));
        }
        if !(self.min_share > 0.0 && self.min_share <= 1.0) {
            return Err(MemoryError::InvalidConfig("selector min_share must be in (0, 1]"));
        }
        Ok(())
    }
}

/// A trained lookup of "which engine wins for this pattern".
///
/// Suggestions are keyed by the pattern's index in the stored set the
/// selector was trained on. Content hashes of the trained patterns are kept
/// too, so an exact copy of a stored pattern can be looked up directly.
#[derive(Debug, Clone)]
pub struct EngineSelector {
    config: SelectorConfig,
    roster: Vec<EngineId>,
    global_wins: HashMap<EngineId, usize>,
    per_pattern: HashMap<usize, EngineId>,
    pattern_hashes: Vec<String>,
    trained: bool,
}

impl EngineSelector {
    /// Creates an untrained selector over `roster`.
    pub fn new(roster: Vec<EngineId>, config: SelectorConfig) -> Self {
        Self {
            config,
            roster,
            global_wins: HashMap::new(),
            per_pattern: HashMap::new(),
            pattern_hashes: Vec::new(),
            trained: false,
        }
    }

    /// Training parameters.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Trains against `ai`'s stored set using the thread RNG.
    pub fn train(&mut self, ai: &MemoryAi) -> Result<()> {
        self.train_with_rng(ai, &mut rand::rng())
    }

    /// Trains against `ai`'s stored set, discarding any earlier training.
    ///
    /// For every stored pattern, draws `samples_per_pattern` probes at noise
    /// rates picked from `noise_levels`, runs the full ensemble on each and
    /// credits the winning engine.
    pub fn train_with_rng<R: Rng>(&mut self, ai: &MemoryAi, rng: &mut R) -> Result<()> {
        self.config.validate()?;
        self.roster = ai.roster();
        self.global_wins.clear();
        self.per_pattern.clear();
        self.pattern_hashes.clear();
        self.trained = false;

        let options = EnsembleOptions::default();
        for (index, pattern) in ai.stored().iter().enumerate() {
            let mut wins: HashMap<EngineId, usize> = HashMap::new();

            for _ in 0..self.config.samples_per_pattern {
                let level = rng.random_range(0..self.config.noise_levels.len());
                let probe = add_noise_with_rng(pattern, self.config.noise_levels[level], rng);
                let winner = ai.scan_with_rng(&probe, &options, rng)?.best.engine;
                *wins.entry(winner).or_default() += 1;
                *self.global_wins.entry(winner).or_default() += 1;
            }

            if let Some(engine) = self.confident(&wins, self.config.samples_per_pattern) {
                self.per_pattern.insert(index, engine);
            }
            self.pattern_hashes.push(hash_grid(pattern));
        }

        self.trained = true;
        tracing::info!(
            global_wins = ?self.global_wins(),
            mapped_patterns = self.per_pattern.len(),
            total_samples = ai.stored().len() * self.config.samples_per_pattern,
            "engine selector trained"
        );
        Ok(())
    }

    /// Highest count in `wins`; ties go to the earlier roster entry.
    fn top(&self, wins: &HashMap<EngineId, usize>) -> Option<(EngineId, usize)> {
        let mut best: Option<(EngineId, usize)> = None;
        for id in &self.roster {
            let count = wins.get(id).copied().unwrap_or(0);
            if count > 0 && best.is_none_or(|(_, c)| count > c) {
                best = Some((*id, count));
            }
        }
        best
    }

    /// The top engine of one pattern's `wins`, if it took at least
    /// `min_share` of `samples`.
    fn confident(&self, wins: &HashMap<EngineId, usize>, samples: usize) -> Option<EngineId> {
        if samples == 0 {
            return None;
        }
        let (engine, count) = self.top(wins)?;
        (count as f64 / samples as f64 >= self.config.min_share).then_some(engine)
    }

    /// Whether [`train`](Self::train) has completed.
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Confident suggestion for the pattern at `index`, if any.
    pub fn suggest_for_pattern(&self, index: usize) -> Option<EngineId> {
        self.per_pattern.get(&index).copied()
    }

    /// Suggestion for a grid identical (by hash) to a trained pattern.
    pub fn suggest_for_grid(&self, grid: &Grid) -> Option<EngineId> {
        let hash = hash_grid(grid);
        let index = self.pattern_hashes.iter().position(|h| *h == hash)?;
        self.suggest_for_pattern(index)
    }

    /// Engine with the most wins overall; `None` before any sample.
    pub fn best_global(&self) -> Option<EngineId> {
        self.top(&self.global_wins).map(|(id, _)| id)
    }

    /// Win counts in roster order, zero for engines that never won.
    pub fn global_wins(&self) -> Vec<(EngineId, usize)> {
        self.roster
            .iter()
            .map(|id| (*id, self.global_wins.get(id).copied().unwrap_or(0)))
            .collect()
    }

    /// Number of patterns with a confident suggestion.
    pub fn mapped_patterns(&self) -> usize {
        self.per_pattern.len()
    }
}

/// Parameters for [`benchmark_selector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of probes.
    pub samples: usize,
    /// Lower bound of the uniform noise range.
    pub noise_min: f64,
    /// Upper bound (exclusive) of the uniform noise range.
    pub noise_max: f64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            noise_min: 0.05,
            noise_max: 0.10,
        }
    }
}

/// Prediction shortcut measured against the full ensemble scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorBenchmark {
    /// Probes run through both paths.
    pub samples: usize,
    /// Share of probes where both paths picked the same engine.
    pub agreement: f64,
    /// Total time spent in full scans.
    pub full_scan: Duration,
    /// Total time spent in predicted recalls.
    pub predicted: Duration,
}

impl SelectorBenchmark {
    /// How many times faster the predicted path ran.
    pub fn speedup(&self) -> f64 {
        self.full_scan.as_secs_f64() / self.predicted.as_secs_f64().max(f64::EPSILON)
    }
}

/// Compares predicted and full-scan recalls on random noisy probes.
///
/// Needs a trained selector on `ai` and at least one stored pattern.
pub fn benchmark_selector<R: Rng>(
    ai: &MemoryAi,
    config: &BenchmarkConfig,
    rng: &mut R,
) -> Result<SelectorBenchmark> {
    if !ai.selector().is_some_and(EngineSelector::is_trained) {
        return Err(MemoryError::SelectorUntrained);
    }
    let stored = ai.stored();
    if stored.is_empty() {
        return Err(MemoryError::InvalidConfig("benchmark needs stored patterns"));
    }
    if !(config.noise_min < config.noise_max) {
        return Err(MemoryError::InvalidConfig("benchmark noise range is empty"));
    }

    let mut agree = 0;
    let mut full_scan = Duration::ZERO;
    let mut predicted = Duration::ZERO;

    for _ in 0..config.samples {
        let index = rng.random_range(0..stored.len());
        let rate = rng.random_range(config.noise_min..config.noise_max);
        let probe = add_noise_with_rng(&stored[index], rate, rng);

        let start = Instant::now();
        let full = ai.recall_with_rng(&probe, &EnsembleOptions::default(), rng)?;
        full_scan += start.elapsed();

        let options = EnsembleOptions::predicted(index);
        let start = Instant::now();
        let guess = ai.recall_with_rng(&probe, &options, rng)?;
        predicted += start.elapsed();

        agree += (full.best.engine == guess.best.engine) as usize;
    }

    Ok(SelectorBenchmark {
        samples: config.samples,
        agreement: if config.samples == 0 {
            0.0
        } else {
            agree as f64 / config.samples as f64
        },
        full_scan,
        predicted,
    })
}
