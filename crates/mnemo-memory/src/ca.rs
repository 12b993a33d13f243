//! Associative memory backed by a Life-like rule.

use mnemo_automata::{Grid, Rule, presets, run};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineId, MemoryEngine, Recall, RecallOptions, check_size, copy_patterns};
use crate::error::{MemoryError, Result};

/// Anything that names a rule: a built [`Rule`] or its notation.
pub trait IntoRule {
    /// Resolves to a rule, parsing notation if needed.
    fn into_rule(self) -> Result<Rule>;
}

impl IntoRule for Rule {
    fn into_rule(self) -> Result<Rule> {
        Ok(self)
    }
}

impl IntoRule for &str {
    fn into_rule(self) -> Result<Rule> {
        Ok(Rule::parse(self)?)
    }
}

impl IntoRule for String {
    fn into_rule(self) -> Result<Rule> {
        self.as_str().into_rule()
    }
}

/// Construction parameters for [`CaMemoryEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaEngineConfig {
    /// Evolution rule.
    pub rule: Rule,
    /// Grid width.
    pub width: usize,
    /// Grid height.
    pub height: usize,
    /// Default generations per recall.
    pub steps: usize,
}

impl Default for CaEngineConfig {
    fn default() -> Self {
        Self {
            rule: presets::B01_S3,
            width: 32,
            height: 32,
            steps: 80,
        }
    }
}

impl CaEngineConfig {
    /// Default config under `rule`, which may be notation text.
    pub fn with_rule(rule: impl IntoRule) -> Result<Self> {
        Ok(Self {
            rule: rule.into_rule()?,
            ..Self::default()
        })
    }

    /// Sets the grid size.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the default generations per recall.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }
}

/// Recalls by evolving the probe under a rule and matching the result against
/// the stored set.
///
/// A recall succeeds when the evolved grid lands near *any* stored pattern,
/// not a specific target.
#[derive(Debug, Clone)]
pub struct CaMemoryEngine {
    config: CaEngineConfig,
    stored: Vec<Grid>,
}

impl CaMemoryEngine {
    /// Creates an engine with an empty stored set.
    pub fn create(config: CaEngineConfig) -> Result<Self> {
        if !config.width.checked_mul(config.height).is_some_and(|n| n > 0) {
            return Err(MemoryError::InvalidConfig(
                "grid dimensions must be non-zero and their product must not overflow",
            ));
        }
        Ok(Self {
            config,
            stored: Vec::new(),
        })
    }

    /// Creates an engine from rule notation with the default size and steps.
    pub fn from_notation(notation: &str) -> Result<Self> {
        Self::create(CaEngineConfig::with_rule(notation)?)
    }

    /// The engine's rule.
    pub fn rule(&self) -> Rule {
        self.config.rule
    }

    /// The construction parameters.
    pub fn config(&self) -> &CaEngineConfig {
        &self.config
    }

    /// Reads `probe` as a grid of the engine's shape.
    fn shaped(&self, probe: &Grid) -> Result<Grid> {
        let (w, h) = (self.config.width, self.config.height);
        check_size(w * h, probe)?;
        if probe.width() == w {
            Ok(probe.clone())
        } else {
            Ok(Grid::from_cells(w, h, probe.cells().to_vec())?)
        }
    }
}

impl MemoryEngine for CaMemoryEngine {
    fn id(&self) -> EngineId {
        EngineId::Ca(self.config.rule)
    }

    fn cell_count(&self) -> usize {
        self.config.width * self.config.height
    }

    fn store(&mut self, patterns: &[Grid]) -> Result<()> {
        self.stored = copy_patterns(self.cell_count(), patterns)?;
        Ok(())
    }

    fn stored(&self) -> &[Grid] {
        &self.stored
    }

    fn recall_with_rng(
        &self,
        probe: &Grid,
        options: &RecallOptions,
        _rng: &mut dyn RngCore,
    ) -> Result<Recall> {
        let steps = options.steps.unwrap_or(self.config.steps);
        let state = run(&self.shaped(probe)?, &self.config.rule, steps);
        let recall = Recall::score(state, &self.stored, options.max_diff_ratio, steps)?;

        tracing::trace!(
            engine = %self.id(),
            steps,
            distance = ?recall.distance,
            success = recall.success,
            "ca recall"
        );
        Ok(recall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::builtin;
    use mnemo_automata::{add_noise_with_rng, hamming_distance};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn block_engine(rule: Rule, size: usize, steps: usize) -> (CaMemoryEngine, Grid) {
        let config = CaEngineConfig {
            rule,
            width: size,
            height: size,
            steps,
        };
        let mut engine = CaMemoryEngine::create(config).unwrap();
        let block = builtin::block(size, size, size / 2 - 1, size / 2 - 1).unwrap();
        engine.store(&[block.clone()]).unwrap();
        (engine, block)
    }

    #[test]
    fn test_create_from_notation() {
        let engine = CaMemoryEngine::from_notation("B01/S3").unwrap();
        assert_eq!(engine.rule(), presets::B01_S3);
        assert_eq!(engine.cell_count(), 32 * 32);
        assert_eq!(engine.id(), EngineId::Ca(presets::B01_S3));

        assert!(matches!(
            CaMemoryEngine::from_notation("B01S3"),
            Err(MemoryError::Automata(_))
        ));
    }

    #[test]
    fn test_create_rejects_bad_dimensions() {
        let zero = CaEngineConfig::default().with_size(0, 32);
        assert!(matches!(
            CaMemoryEngine::create(zero),
            Err(MemoryError::InvalidConfig(_))
        ));
        let huge = CaEngineConfig::default().with_size(usize::MAX, 2);
        assert!(matches!(
            CaMemoryEngine::create(huge),
            Err(MemoryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_recall_before_store_fails_softly() {
        let engine = CaMemoryEngine::create(CaEngineConfig::default()).unwrap();
        let probe = Grid::new(32, 32).unwrap();
        let recall = engine.recall(&probe, &RecallOptions::default()).unwrap();
        assert!(!recall.success);
        assert_eq!(recall.distance, None);
        assert_eq!(recall.steps_used, 80);
    }

    #[test]
    fn test_store_is_a_copy() {
        let mut engine = CaMemoryEngine::create(CaEngineConfig::default()).unwrap();
        let mut patterns = vec![Grid::new(32, 32).unwrap()];
        engine.store(&patterns).unwrap();
        patterns[0].set(0, 0, true);
        assert_eq!(engine.stored()[0].population(), 0);

        engine.store(&[]).unwrap();
        assert!(engine.stored().is_empty());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut engine = CaMemoryEngine::create(CaEngineConfig::default()).unwrap();
        let small = Grid::new(8, 8).unwrap();
        assert!(matches!(
            engine.store(&[small.clone()]),
            Err(MemoryError::SizeMismatch {
                expected: 1024,
                got: 64
            })
        ));
        assert!(engine.recall(&small, &RecallOptions::default()).is_err());
    }

    #[test]
    fn test_probe_reshaped_to_engine() {
        let (engine, block) = block_engine(presets::LIFE, 16, 4);
        let flat = Grid::from_cells(256, 1, block.cells().to_vec()).unwrap();
        let recall = engine.recall(&flat, &RecallOptions::default()).unwrap();
        assert!(recall.state.same_shape(&block));
        assert_eq!(recall.distance, Some(0));
    }

    #[test]
    fn test_stable_pattern_recalls_itself() {
        let (engine, block) = block_engine(presets::LIFE, 16, 10);
        let recall = engine.recall(&block, &RecallOptions::default()).unwrap();
        assert!(recall.success);
        assert_eq!(recall.state, block);
        assert_eq!(recall.nearest, Some(0));
    }

    #[test]
    fn test_steps_override() {
        let (engine, block) = block_engine(presets::B01_S3, 16, 40);
        let recall = engine
            .recall(&block, &RecallOptions::default().with_steps(3))
            .unwrap();
        assert_eq!(recall.steps_used, 3);
    }

    #[test]
    fn test_b01_s3_recalls_noisy_block() {
        let mut rng = StdRng::seed_from_u64(42);
        let (engine, block) = block_engine(presets::B01_S3, 32, 80);
        let mut successes = 0;
        for _ in 0..20 {
            let probe = add_noise_with_rng(&block, 0.05, &mut rng);
            let recall = engine
                .recall_with_rng(&probe, &RecallOptions::default(), &mut rng)
                .unwrap();
            assert_eq!(
                recall.distance,
                Some(hamming_distance(&recall.state, &block).unwrap())
            );
            successes += recall.success as usize;
        }
        assert!(successes >= 16, "{successes}/20");
    }
}
