//! Recall-quality measurement: how well a rule (or the Hopfield baseline)
//! brings noisy patterns back across noise levels and stored-set sizes.

use std::fmt;

use mnemo_automata::{
    AttractorTally, DEFAULT_MAX_DIFF_RATIO, Grid, Rule, add_noise_with_rng, is_recall_success,
    relax_with_rng, run,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineId, MemoryEngine, RecallOptions};
use crate::error::{MemoryError, Result};
use crate::hopfield::{HopfieldConfig, HopfieldMemoryEngine};
use crate::pattern::{self, builtin};

/// Noise levels at or below this count as "low" for candidacy.
pub const LOW_NOISE_MAX: f64 = 0.05;
/// Noise levels at or above this count as "medium" for candidacy.
pub const MEDIUM_NOISE_MIN: f64 = 0.08;
/// Mean recall a rule needs at capacity.
pub const CAPACITY_RECALL: f64 = 0.9;

/// Coarse label for a recall rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecallClass {
    /// Recall rate at least 0.7.
    Ok,
    /// Recall rate at least 0.4.
    Weak,
    /// Anything lower.
    Fail,
}

impl RecallClass {
    /// Rate needed for [`RecallClass::Ok`].
    pub const OK_RATE: f64 = 0.7;
    /// Rate needed for [`RecallClass::Weak`].
    pub const WEAK_RATE: f64 = 0.4;

    /// Classifies a recall rate in `0..=1`.
    pub fn from_rate(rate: f64) -> Self {
        if rate >= Self::OK_RATE {
            RecallClass::Ok
        } else if rate >= Self::WEAK_RATE {
            RecallClass::Weak
        } else {
            RecallClass::Fail
        }
    }
}

impl fmt::Display for RecallClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecallClass::Ok => "OK",
            RecallClass::Weak => "WEAK",
            RecallClass::Fail => "FAIL",
        })
    }
}

/// Parameters for [`measure_rule`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// Per-cell flip probability of each probe.
    pub noise: f64,
    /// Generations per run.
    pub steps: usize,
    /// Number of noisy runs.
    pub runs: usize,
    /// Success threshold.
    pub max_diff_ratio: f64,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            noise: 0.05,
            steps: 80,
            runs: 50,
            max_diff_ratio: DEFAULT_MAX_DIFF_RATIO,
        }
    }
}

/// Outcome of [`measure_rule`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    /// Share of runs that landed within the threshold of the pattern.
    pub recall_rate: f64,
    /// Summed share of runs ending in a dominant attractor.
    pub coverage: f64,
    /// Number of dominant attractors.
    pub attractors: usize,
    /// Share of runs ending in the most frequent attractor.
    pub dominant_share: f64,
}

impl TrialStats {
    /// Label for the recall rate.
    pub fn class(&self) -> RecallClass {
        RecallClass::from_rate(self.recall_rate)
    }
}

/// Measures how often `rule` brings noisy copies of `pattern` back.
pub fn measure_rule(rule: &Rule, pattern: &Grid, config: &TrialConfig) -> Result<TrialStats> {
    measure_rule_with_rng(rule, pattern, config, &mut rand::rng())
}

/// [`measure_rule`] with a custom RNG.
pub fn measure_rule_with_rng<R: Rng + ?Sized>(
    rule: &Rule,
    pattern: &Grid,
    config: &TrialConfig,
    rng: &mut R,
) -> Result<TrialStats> {
    if config.runs == 0 {
        return Err(MemoryError::InvalidConfig("trial needs at least one run"));
    }

    let mut tally = AttractorTally::new();
    let mut successes = 0;
    for _ in 0..config.runs {
        let relaxed = relax_with_rng(rule, pattern, config.noise, config.steps, rng);
        if is_recall_success(pattern, &relaxed.grid, config.max_diff_ratio)? {
            successes += 1;
        }
        tally.record(relaxed);
    }

    let dominants = tally.dominant(config.runs);
    let runs = config.runs as f64;
    Ok(TrialStats {
        recall_rate: successes as f64 / runs,
        coverage: dominants.iter().map(|a| a.count as f64).sum::<f64>() / runs,
        attractors: dominants.len(),
        dominant_share: dominants.first().map_or(0.0, |a| a.count as f64 / runs),
    })
}

/// Parameters for [`evaluate_rule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Noise levels to sweep.
    pub noise_levels: Vec<f64>,
    /// Generations per run.
    pub steps: usize,
    /// Runs per pattern and noise level.
    pub runs: usize,
    /// Recall a low-noise level needs to count toward candidacy.
    pub min_recall: f64,
    /// Coverage a low-noise level needs to count toward candidacy.
    pub min_coverage: f64,
    /// Success threshold.
    pub max_diff_ratio: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            noise_levels: vec![0.01, 0.03, 0.05, 0.08],
            steps: 160,
            runs: 60,
            min_recall: 0.7,
            min_coverage: 0.4,
            max_diff_ratio: DEFAULT_MAX_DIFF_RATIO,
        }
    }
}

/// Averages over the tested patterns at one noise level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseStats {
    /// Noise level.
    pub noise: f64,
    /// Mean recall rate.
    pub recall: f64,
    /// Mean dominant-attractor coverage.
    pub coverage: f64,
    /// Mean dominant-attractor count.
    pub attractors: f64,
}

/// Outcome of [`evaluate_rule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Evaluated rule.
    pub rule: Rule,
    /// One entry per configured noise level.
    pub per_noise: Vec<NoiseStats>,
    /// Whether the rule qualifies as a memory candidate.
    pub is_candidate: bool,
    /// Mean recall over noise levels.
    pub avg_recall: f64,
    /// Lowest per-level recall.
    pub min_recall: f64,
    /// Highest per-level recall.
    pub max_recall: f64,
}

impl RuleEvaluation {
    /// Label for the mean recall.
    pub fn class(&self) -> RecallClass {
        RecallClass::from_rate(self.avg_recall)
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 { 0.0 } else { values.sum::<f64>() / n as f64 }
}

/// Sweeps `rule` over noise levels and `patterns`, deciding candidacy.
///
/// A candidate has at least two low-noise levels meeting `min_recall`,
/// `min_coverage` and a mean of half a dominant attractor, and at least
/// one medium-noise level with Weak-or-better recall.
pub fn evaluate_rule(
    rule: &Rule,
    patterns: &[Grid],
    config: &EvaluationConfig,
) -> Result<RuleEvaluation> {
    evaluate_rule_with_rng(rule, patterns, config, &mut rand::rng())
}

/// [`evaluate_rule`] with a custom RNG.
pub fn evaluate_rule_with_rng<R: Rng + ?Sized>(
    rule: &Rule,
    patterns: &[Grid],
    config: &EvaluationConfig,
    rng: &mut R,
) -> Result<RuleEvaluation> {
    if patterns.is_empty() {
        return Err(MemoryError::InvalidConfig("evaluation needs at least one pattern"));
    }
    if config.noise_levels.is_empty() {
        return Err(MemoryError::InvalidConfig("evaluation needs at least one noise level"));
    }

    let mut per_noise = Vec::with_capacity(config.noise_levels.len());
    for &noise in &config.noise_levels {
        let trial = TrialConfig {
            noise,
            steps: config.steps,
            runs: config.runs,
            max_diff_ratio: config.max_diff_ratio,
        };
        let mut stats = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            stats.push(measure_rule_with_rng(rule, pattern, &trial, &mut *rng)?);
        }

        per_noise.push(NoiseStats {
            noise,
            recall: mean(stats.iter().map(|s| s.recall_rate)),
            coverage: mean(stats.iter().map(|s| s.coverage)),
            attractors: mean(stats.iter().map(|s| s.attractors as f64)),
        });
    }

    let low_ok = per_noise
        .iter()
        .filter(|p| {
            p.noise <= LOW_NOISE_MAX
                && p.recall >= config.min_recall
                && p.coverage >= config.min_coverage
                && p.attractors >= 0.5
        })
        .count();
    let medium_ok = per_noise
        .iter()
        .any(|p| p.noise >= MEDIUM_NOISE_MIN && p.recall >= RecallClass::WEAK_RATE);
    let is_candidate = low_ok >= 2 && medium_ok;

    let recalls = per_noise.iter().map(|p| p.recall);
    let evaluation = RuleEvaluation {
        rule: *rule,
        avg_recall: mean(recalls.clone()),
        min_recall: recalls.clone().fold(f64::INFINITY, f64::min),
        max_recall: recalls.fold(f64::NEG_INFINITY, f64::max),
        per_noise,
        is_candidate,
    };

    tracing::debug!(
        rule = %rule,
        avg_recall = evaluation.avg_recall,
        candidate = is_candidate,
        "rule evaluated"
    );
    Ok(evaluation)
}

/// Evaluates each rule in turn; candidates are those with `is_candidate`.
pub fn evaluate_rules_with_rng<R: Rng + ?Sized>(
    rules: &[Rule],
    patterns: &[Grid],
    config: &EvaluationConfig,
    rng: &mut R,
) -> Result<Vec<RuleEvaluation>> {
    let mut results = Vec::with_capacity(rules.len());
    for (i, rule) in rules.iter().enumerate() {
        let evaluation = evaluate_rule_with_rng(rule, patterns, config, &mut *rng)?;
        tracing::info!(
            index = i + 1,
            total = rules.len(),
            rule = %rule,
            candidate = evaluation.is_candidate,
            "rule scan progress"
        );
        results.push(evaluation);
    }
    Ok(results)
}

/// Parameters for [`capacity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Stored-set sizes to try, smallest first.
    pub pattern_counts: Vec<usize>,
    /// Side length of the square test grids.
    pub size: usize,
    /// Noise levels averaged per set size.
    pub noise_levels: Vec<f64>,
    /// Generations per CA run.
    pub steps: usize,
    /// Runs per pattern and noise level.
    pub runs: usize,
    /// Success threshold.
    pub max_diff_ratio: f64,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            pattern_counts: vec![3, 5, 10],
            size: builtin::DEFAULT_SIZE,
            noise_levels: vec![0.01, 0.03, 0.05, 0.08],
            steps: 80,
            runs: 40,
            max_diff_ratio: DEFAULT_MAX_DIFF_RATIO,
        }
    }
}

/// Recall for one set size and noise level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityPoint {
    /// Number of stored patterns.
    pub pattern_count: usize,
    /// Noise level.
    pub noise: f64,
    /// Share of probes recalled to their own source pattern.
    pub recall: f64,
}

/// Outcome of [`capacity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    /// Tested model.
    pub model: EngineId,
    /// Last configured set size whose mean recall reached 0.9.
    pub max_capacity: Option<usize>,
    /// Mean of the per-size mean recalls.
    pub avg_recall: f64,
    /// Every measured point.
    pub details: Vec<CapacityPoint>,
}

enum CapacityModel {
    Ca(Rule),
    Hopfield(Box<HopfieldMemoryEngine>),
}

impl CapacityModel {
    fn build(id: EngineId, size: usize, patterns: &[Grid]) -> Result<Self> {
        Ok(match id {
            EngineId::Ca(rule) => CapacityModel::Ca(rule),
            EngineId::Hopfield => {
                let mut net =
                    HopfieldMemoryEngine::create(HopfieldConfig::with_size(size, size))?;
                net.store(patterns)?;
                CapacityModel::Hopfield(Box::new(net))
            }
        })
    }
}

/// Measures how many [`builtin::capacity_set`] patterns `model` holds.
///
/// CA rules evolve each noisy probe and compare it with its own source.
/// Hopfield is trained on the whole set and recalls each probe.
pub fn capacity(model: EngineId, config: &CapacityConfig) -> Result<CapacityReport> {
    capacity_with_rng(model, config, &mut rand::rng())
}

/// [`capacity`] with a custom RNG.
pub fn capacity_with_rng<R: Rng>(
    model: EngineId,
    config: &CapacityConfig,
    rng: &mut R,
) -> Result<CapacityReport> {
    if config.pattern_counts.is_empty() || config.noise_levels.is_empty() {
        return Err(MemoryError::InvalidConfig(
            "capacity needs pattern counts and noise levels",
        ));
    }
    if config.runs == 0 {
        return Err(MemoryError::InvalidConfig("capacity needs at least one run"));
    }

    let mut details = Vec::new();
    let mut per_count = Vec::with_capacity(config.pattern_counts.len());

    for &count in &config.pattern_counts {
        let patterns = pattern::grids(&builtin::capacity_set(count, config.size)?);
        let engine = CapacityModel::build(model, config.size, &patterns)?;

        let mut recalls = Vec::with_capacity(config.noise_levels.len());
        for &noise in &config.noise_levels {
            let mut successes = 0usize;
            for source in &patterns {
                for _ in 0..config.runs {
                    let probe = add_noise_with_rng(source, noise, rng);
                    let last = match &engine {
                        CapacityModel::Ca(rule) => run(&probe, rule, config.steps),
                        CapacityModel::Hopfield(net) => {
                            net.recall_with_rng(&probe, &RecallOptions::default(), rng)?
                                .state
                        }
                    };
                    if is_recall_success(source, &last, config.max_diff_ratio)? {
                        successes += 1;
                    }
                }
            }
            let total = patterns.len() * config.runs;
            let recall = if total == 0 {
                0.0
            } else {
                successes as f64 / total as f64
            };
            details.push(CapacityPoint {
                pattern_count: count,
                noise,
                recall,
            });
            recalls.push(recall);
        }
        per_count.push((count, mean(recalls.into_iter())));
    }

    let max_capacity = per_count
        .iter()
        .filter(|(_, avg)| *avg >= CAPACITY_RECALL)
        .map(|(count, _)| *count)
        .next_back();
    let avg_recall = mean(per_count.iter().map(|(_, avg)| *avg));

    tracing::info!(model = %model, ?max_capacity, avg_recall, "capacity measured");
    Ok(CapacityReport {
        model,
        max_capacity,
        avg_recall,
        details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_automata::presets;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn block32() -> Grid {
        builtin::block(32, 32, 15, 15).unwrap()
    }

    fn fill_everything() -> Rule {
        Rule::parse("B012345678/S012345678").unwrap()
    }

    #[test]
    fn test_recall_class_thresholds() {
        assert_eq!(RecallClass::from_rate(1.0), RecallClass::Ok);
        assert_eq!(RecallClass::from_rate(0.7), RecallClass::Ok);
        assert_eq!(RecallClass::from_rate(0.69), RecallClass::Weak);
        assert_eq!(RecallClass::from_rate(0.4), RecallClass::Weak);
        assert_eq!(RecallClass::from_rate(0.39), RecallClass::Fail);
        assert_eq!(RecallClass::Weak.to_string(), "WEAK");
    }

    #[test]
    fn test_measure_still_life_without_noise() {
        let config = TrialConfig {
            noise: 0.0,
            steps: 10,
            runs: 8,
            ..TrialConfig::default()
        };
        let stats = measure_rule(&presets::LIFE, &block32(), &config).unwrap();
        assert_eq!(stats.recall_rate, 1.0);
        assert_eq!(stats.coverage, 1.0);
        assert_eq!(stats.attractors, 1);
        assert_eq!(stats.dominant_share, 1.0);
        assert_eq!(stats.class(), RecallClass::Ok);
    }

    #[test]
    fn test_measure_b01_s3() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = TrialConfig {
            runs: 30,
            ..TrialConfig::default()
        };
        let stats = measure_rule_with_rng(&presets::B01_S3, &block32(), &config, &mut rng).unwrap();
        assert!(stats.recall_rate >= 0.8, "recall {}", stats.recall_rate);
        assert!(stats.attractors >= 1);
    }

    #[test]
    fn test_measure_rejects_zero_runs() {
        let config = TrialConfig {
            runs: 0,
            ..TrialConfig::default()
        };
        assert!(measure_rule(&presets::LIFE, &block32(), &config).is_err());
    }

    #[test]
    fn test_evaluate_b01_s3_is_candidate() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = EvaluationConfig {
            steps: 80,
            runs: 20,
            ..EvaluationConfig::default()
        };
        let eval =
            evaluate_rule_with_rng(&presets::B01_S3, &[block32()], &config, &mut rng).unwrap();
        assert_eq!(eval.per_noise.len(), 4);
        assert!(eval.is_candidate, "{eval:?}");
        assert!(eval.min_recall <= eval.avg_recall && eval.avg_recall <= eval.max_recall);
    }

    #[test]
    fn test_evaluate_saturating_rule_fails() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = EvaluationConfig {
            steps: 4,
            runs: 5,
            ..EvaluationConfig::default()
        };
        let eval =
            evaluate_rule_with_rng(&fill_everything(), &[block32()], &config, &mut rng).unwrap();
        assert!(!eval.is_candidate);
        assert_eq!(eval.max_recall, 0.0);
        assert_eq!(eval.class(), RecallClass::Fail);
    }

    #[test]
    fn test_evaluate_requires_inputs() {
        let config = EvaluationConfig::default();
        assert!(evaluate_rule(&presets::LIFE, &[], &config).is_err());

        let empty_levels = EvaluationConfig {
            noise_levels: vec![],
            ..EvaluationConfig::default()
        };
        assert!(evaluate_rule(&presets::LIFE, &[block32()], &empty_levels).is_err());
    }

    #[test]
    fn test_capacity_identity_run() {
        let config = CapacityConfig {
            pattern_counts: vec![1, 2],
            size: 16,
            noise_levels: vec![0.0],
            steps: 0,
            runs: 3,
            ..CapacityConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let report = capacity_with_rng(EngineId::Ca(presets::B01_S3), &config, &mut rng).unwrap();
        assert_eq!(report.max_capacity, Some(2));
        assert_eq!(report.avg_recall, 1.0);
        assert_eq!(report.details.len(), 2);
    }

    #[test]
    fn test_capacity_none_when_recall_low() {
        let config = CapacityConfig {
            pattern_counts: vec![1],
            size: 16,
            noise_levels: vec![0.0],
            steps: 1,
            runs: 2,
            max_diff_ratio: 0.01,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let report = capacity_with_rng(EngineId::Ca(presets::SEEDS), &config, &mut rng).unwrap();
        assert_eq!(report.max_capacity, None);
        assert_eq!(report.avg_recall, 0.0);
    }

    #[test]
    fn test_capacity_hopfield_single_pattern() {
        let config = CapacityConfig {
            pattern_counts: vec![1],
            size: 16,
            noise_levels: vec![0.02],
            runs: 4,
            ..CapacityConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let report = capacity_with_rng(EngineId::Hopfield, &config, &mut rng).unwrap();
        assert_eq!(report.model, EngineId::Hopfield);
        assert_eq!(report.max_capacity, Some(1));
    }
}
