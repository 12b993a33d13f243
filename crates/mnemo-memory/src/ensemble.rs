//! `MemoryAi`: a roster of CA champions plus a Hopfield baseline sharing one
//! stored set.

use mnemo_automata::{DEFAULT_MAX_DIFF_RATIO, Grid, Rule, presets};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ca::{CaEngineConfig, CaMemoryEngine};
use crate::engine::{EngineId, MemoryEngine, Recall, RecallOptions};
use crate::error::{MemoryError, Result};
use crate::hopfield::{HopfieldConfig, HopfieldMemoryEngine};
use crate::pattern::{self, Pattern};
use crate::selector::{EngineSelector, SelectorConfig};

/// Construction parameters for [`MemoryAi`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryAiConfig {
    /// Grid width shared by every engine.
    pub width: usize,
    /// Grid height shared by every engine.
    pub height: usize,
    /// Generations per CA recall.
    pub steps: usize,
    /// One CA engine per rule, in roster order.
    pub champions: Vec<Rule>,
    /// Retrain the selector on every store.
    pub use_selector: bool,
    /// Selector training parameters.
    pub selector: SelectorConfig,
}

impl Default for MemoryAiConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            steps: 80,
            champions: presets::MEMORY_CHAMPIONS.to_vec(),
            use_selector: false,
            selector: SelectorConfig::default(),
        }
    }
}

/// Per-call ensemble settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleOptions {
    /// Test only the selector's suggested engine.
    pub use_prediction: bool,
    /// Stored-set index the probe is believed to come from.
    pub pattern_index: Option<usize>,
    /// Success threshold passed to every engine.
    pub max_diff_ratio: f64,
}

impl Default for EnsembleOptions {
    fn default() -> Self {
        Self {
            use_prediction: false,
            pattern_index: None,
            max_diff_ratio: DEFAULT_MAX_DIFF_RATIO,
        }
    }
}

impl EnsembleOptions {
    /// Prediction mode for a probe derived from stored pattern `index`.
    pub fn predicted(index: usize) -> Self {
        Self {
            use_prediction: true,
            pattern_index: Some(index),
            ..Self::default()
        }
    }
}

/// One engine's answer inside an ensemble recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRecall {
    /// Engine that produced the result.
    pub engine: EngineId,
    /// Its recall.
    #[serde(flatten)]
    pub recall: Recall,
}

/// Outcome of [`MemoryAi::recall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleRecall {
    /// Lowest-distance result; roster order breaks ties.
    pub best: EngineRecall,
    /// Every tested engine, best first.
    pub all: Vec<EngineRecall>,
    /// Whether only the selector's suggestion was tested.
    pub predicted: bool,
}

/// Multi-engine associative memory.
///
/// `store` fans out to every engine. `recall` runs the whole roster unless a
/// trained selector is asked for a prediction, in which case exactly one
/// engine runs and its answer is returned even when another would have won.
#[derive(Debug, Clone)]
pub struct MemoryAi {
    config: MemoryAiConfig,
    ca: Vec<CaMemoryEngine>,
    hopfield: HopfieldMemoryEngine,
    selector: Option<EngineSelector>,
}

impl MemoryAi {
    /// Builds the roster with empty stored sets.
    pub fn new(config: MemoryAiConfig) -> Result<Self> {
        let mut ca = Vec::with_capacity(config.champions.len());
        for (i, &rule) in config.champions.iter().enumerate() {
            if config.champions[..i].contains(&rule) {
                return Err(MemoryError::InvalidConfig("duplicate champion rule"));
            }
            ca.push(CaMemoryEngine::create(CaEngineConfig {
                rule,
                width: config.width,
                height: config.height,
                steps: config.steps,
            })?);
        }
        let hopfield =
            HopfieldMemoryEngine::create(HopfieldConfig::with_size(config.width, config.height))?;

        Ok(Self {
            config,
            ca,
            hopfield,
            selector: None,
        })
    }

    /// The construction parameters.
    pub fn config(&self) -> &MemoryAiConfig {
        &self.config
    }

    /// Every engine, CA champions first then Hopfield.
    pub fn engines(&self) -> impl Iterator<Item = &dyn MemoryEngine> {
        self.ca
            .iter()
            .map(|e| e as &dyn MemoryEngine)
            .chain(std::iter::once(&self.hopfield as &dyn MemoryEngine))
    }

    /// Engine identifiers in roster order.
    pub fn roster(&self) -> Vec<EngineId> {
        self.engines().map(|e| e.id()).collect()
    }

    /// Looks up an engine by identifier.
    pub fn engine(&self, id: EngineId) -> Option<&dyn MemoryEngine> {
        self.engines().find(|e| e.id() == id)
    }

    /// The shared stored set.
    pub fn stored(&self) -> &[Grid] {
        self.hopfield.stored()
    }

    /// The selector, if one has been trained since the last store.
    pub fn selector(&self) -> Option<&EngineSelector> {
        self.selector.as_ref()
    }

    /// Replaces every engine's stored set.
    pub fn store(&mut self, patterns: &[Grid]) -> Result<()> {
        self.store_with_rng(patterns, &mut rand::rng())
    }

    /// Stores the grids of `patterns`.
    pub fn store_patterns(&mut self, patterns: &[Pattern]) -> Result<()> {
        self.store(&pattern::grids(patterns))
    }

    /// [`store`](Self::store) with a custom RNG for selector training.
    ///
    /// Any trained selector is dropped since its indices refer to the old
    /// set; with `use_selector` a new one is trained.
    pub fn store_with_rng<R: Rng>(&mut self, patterns: &[Grid], rng: &mut R) -> Result<()> {
        self.selector = None;
        for engine in &mut self.ca {
            engine.store(patterns)?;
        }
        self.hopfield.store(patterns)?;
        tracing::debug!(patterns = patterns.len(), engines = self.ca.len() + 1, "ensemble stored");

        if self.config.use_selector {
            self.train_selector_with_rng(rng)?;
        }
        Ok(())
    }

    /// Trains a selector on the current stored set.
    pub fn train_selector(&mut self) -> Result<()> {
        self.train_selector_with_rng(&mut rand::rng())
    }

    /// [`train_selector`](Self::train_selector) with a custom RNG.
    pub fn train_selector_with_rng<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut selector = EngineSelector::new(self.roster(), self.config.selector.clone());
        selector.train_with_rng(self, rng)?;
        self.selector = Some(selector);
        Ok(())
    }

    /// Recalls `probe` using the thread RNG.
    pub fn recall(&self, probe: &Grid, options: &EnsembleOptions) -> Result<EnsembleRecall> {
        self.recall_with_rng(probe, options, &mut rand::rng())
    }

    /// Recalls `probe` with the full roster or, when asked and trained, with
    /// the selector's single suggestion.
    ///
    /// The suggestion is the per-pattern one for `pattern_index`, else the
    /// global favourite. An untrained selector or one without any suggestion
    /// runs the full roster.
    pub fn recall_with_rng<R: Rng>(
        &self,
        probe: &Grid,
        options: &EnsembleOptions,
        rng: &mut R,
    ) -> Result<EnsembleRecall> {
        if options.use_prediction {
            if let Some(index) = options.pattern_index {
                let len = self.stored().len();
                if index >= len {
                    return Err(MemoryError::PatternIndex { index, len });
                }
            }
            if let Some(id) = self.predict(options.pattern_index) {
                return self.recall_one(id, probe, options, rng);
            }
        }
        self.scan_with_rng(probe, options, rng)
    }

    fn predict(&self, pattern_index: Option<usize>) -> Option<EngineId> {
        let selector = self.selector.as_ref().filter(|s| s.is_trained())?;
        pattern_index
            .and_then(|i| selector.suggest_for_pattern(i))
            .or_else(|| selector.best_global())
    }

    fn recall_options(&self, options: &EnsembleOptions) -> RecallOptions {
        RecallOptions {
            steps: None,
            max_diff_ratio: options.max_diff_ratio,
        }
    }

    /// Runs only engine `id`.
    pub fn recall_one<R: Rng>(
        &self,
        id: EngineId,
        probe: &Grid,
        options: &EnsembleOptions,
        rng: &mut R,
    ) -> Result<EnsembleRecall> {
        let engine = self.engine(id).ok_or(MemoryError::UnknownEngine(id))?;
        let recall = engine.recall_with_rng(probe, &self.recall_options(options), rng)?;
        let best = EngineRecall { engine: id, recall };
        tracing::debug!(engine = %id, distance = ?best.recall.distance, "predicted recall");

        Ok(EnsembleRecall {
            all: vec![best.clone()],
            best,
            predicted: true,
        })
    }

    /// Runs every engine and ranks the results by distance.
    pub fn scan_with_rng<R: Rng>(
        &self,
        probe: &Grid,
        options: &EnsembleOptions,
        rng: &mut R,
    ) -> Result<EnsembleRecall> {
        let recall_options = self.recall_options(options);
        let mut all = Vec::with_capacity(self.ca.len() + 1);
        for engine in self.engines() {
            all.push(EngineRecall {
                engine: engine.id(),
                recall: engine.recall_with_rng(probe, &recall_options, rng)?,
            });
        }
        all.sort_by_key(|r| r.recall.rank());

        let best = all
            .first()
            .cloned()
            .ok_or(MemoryError::InvalidConfig("ensemble has no engines"))?;
        tracing::debug!(
            best = %best.engine,
            distance = ?best.recall.distance,
            engines = all.len(),
            "ensemble recall"
        );

        Ok(EnsembleRecall {
            best,
            all,
            predicted: false,
        })
    }
}
