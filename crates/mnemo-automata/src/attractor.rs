//! Attractor scanning: relax noisy copies of a grid and bucket where they land.

use std::collections::HashMap;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::noise::{add_noise_with_rng, hash_grid};
use crate::rule::Rule;
use crate::step::run;

/// Share of runs an attractor needs to count as dominant.
pub const DOMINANT_SHARE: f64 = 0.05;

/// Final state of one relaxation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relaxation {
    /// Grid after evolution.
    pub grid: Grid,
    /// [`hash_grid`] of `grid`.
    pub hash: String,
}

/// Adds `noise` to `base` (skipped when zero) and evolves it for `steps`.
pub fn relax(rule: &Rule, base: &Grid, noise: f64, steps: usize) -> Relaxation {
    relax_with_rng(rule, base, noise, steps, &mut rand::rng())
}

/// [`relax`] with a custom RNG.
pub fn relax_with_rng<R: Rng + ?Sized>(
    rule: &Rule,
    base: &Grid,
    noise: f64,
    steps: usize,
    rng: &mut R,
) -> Relaxation {
    let start = if noise > 0.0 {
        add_noise_with_rng(base, noise, rng)
    } else {
        base.clone()
    };
    let grid = run(&start, rule, steps);
    let hash = hash_grid(&grid);
    Relaxation { grid, hash }
}

/// Parameters for [`scan_attractors`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScanConfig {
    /// Number of noisy relaxations.
    pub runs: usize,
    /// Generations per relaxation.
    pub steps: usize,
    /// Per-cell flip probability applied before each run.
    pub noise: f64,
    /// Number of attractors kept in the report.
    pub max_attractors: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            runs: 40,
            steps: 80,
            noise: 0.1,
            max_attractors: 6,
        }
    }
}

impl ScanConfig {
    /// Sets the number of runs.
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Sets the generations per run.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the noise rate.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }
}

/// One distinct final state seen during a scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attractor {
    /// Hash identifying the state.
    pub hash: String,
    /// Runs that ended here.
    pub count: usize,
    /// `count / runs`.
    pub frequency: f64,
    /// The first grid that produced this hash.
    pub sample: Grid,
}

/// Outcome of [`scan_attractors`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttractorReport {
    /// Rule that was scanned.
    pub rule: Rule,
    /// Number of runs.
    pub runs: usize,
    /// Generations per run.
    pub steps: usize,
    /// Noise rate.
    pub noise: f64,
    /// Distinct final states across all runs.
    pub total_attractors: usize,
    /// Most frequent attractors, at most `max_attractors`.
    pub attractors: Vec<Attractor>,
}

/// An attractor reached by at least [`DOMINANT_SHARE`] of runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DominantAttractor {
    /// Hash identifying the state.
    pub hash: String,
    /// Runs that ended here.
    pub count: usize,
    /// Share of runs, in percent.
    pub percentage: f64,
}

/// Counts final states by hash, remembering first-seen order.
#[derive(Debug, Clone, Default)]
pub struct AttractorTally {
    slots: HashMap<String, usize>,
    entries: Vec<(String, usize, Grid)>,
    total: usize,
}

impl AttractorTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one final state.
    pub fn record(&mut self, relaxation: Relaxation) {
        self.total += 1;
        match self.slots.get(&relaxation.hash) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.slots
                    .insert(relaxation.hash.clone(), self.entries.len());
                self.entries.push((relaxation.hash, 1, relaxation.grid));
            }
        }
    }

    /// Number of distinct states recorded.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Number of states recorded.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Attractors with `count >= 5%` of `total_runs`, most frequent first.
    pub fn dominant(&self, total_runs: usize) -> Vec<DominantAttractor> {
        let threshold = total_runs as f64 * DOMINANT_SHARE;
        let mut dominants: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, count, _)| *count as f64 >= threshold)
            .map(|(hash, count, _)| DominantAttractor {
                hash: hash.clone(),
                count: *count,
                percentage: *count as f64 / total_runs as f64 * 100.0,
            })
            .collect();
        dominants.sort_by(|a, b| b.count.cmp(&a.count));
        dominants
    }

    /// All attractors with frequencies over `runs`, most frequent first.
    ///
    /// Equal counts keep first-seen order.
    pub fn into_attractors(self, runs: usize) -> Vec<Attractor> {
        let mut attractors: Vec<_> = self
            .entries
            .into_iter()
            .map(|(hash, count, sample)| Attractor {
                hash,
                count,
                frequency: count as f64 / runs as f64,
                sample,
            })
            .collect();
        attractors.sort_by(|a, b| b.count.cmp(&a.count));
        attractors
    }
}

/// Relaxes `config.runs` noisy copies of `base` and reports where they land.
pub fn scan_attractors(rule: &Rule, base: &Grid, config: &ScanConfig) -> AttractorReport {
    scan_attractors_with_rng(rule, base, config, &mut rand::rng())
}

/// [`scan_attractors`] with a custom RNG.
pub fn scan_attractors_with_rng<R: Rng + ?Sized>(
    rule: &Rule,
    base: &Grid,
    config: &ScanConfig,
    rng: &mut R,
) -> AttractorReport {
    tracing::debug!(
        rule = %rule,
        runs = config.runs,
        steps = config.steps,
        noise = config.noise,
        "scanning attractors"
    );

    let mut tally = AttractorTally::new();
    for _ in 0..config.runs {
        tally.record(relax_with_rng(rule, base, config.noise, config.steps, rng));
    }

    let total_attractors = tally.distinct();
    let mut attractors = tally.into_attractors(config.runs);
    attractors.truncate(config.max_attractors);

    tracing::debug!(rule = %rule, total_attractors, "attractor scan finished");

    AttractorReport {
        rule: *rule,
        runs: config.runs,
        steps: config.steps,
        noise: config.noise,
        total_attractors,
        attractors,
    }
}
