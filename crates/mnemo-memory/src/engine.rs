//! The store/recall contract shared by every memory backend.

use std::fmt;
use std::str::FromStr;

use mnemo_automata::{AutomataError, DEFAULT_MAX_DIFF_RATIO, Grid, Rule, hamming_distance};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};

/// Identifies one engine of the ensemble.
///
/// A closed set: a CA engine named by its rule, or the Hopfield baseline.
/// Serializes as the rule notation or `"Hopfield"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EngineId {
    /// Cellular automaton under this rule.
    Ca(Rule),
    /// Hebbian-trained Hopfield network.
    Hopfield,
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineId::Ca(rule) => write!(f, "{rule}"),
            EngineId::Hopfield => f.write_str("Hopfield"),
        }
    }
}

impl FromStr for EngineId {
    type Err = AutomataError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim() == "Hopfield" {
            Ok(EngineId::Hopfield)
        } else {
            s.parse().map(EngineId::Ca)
        }
    }
}

impl TryFrom<String> for EngineId {
    type Error = AutomataError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EngineId> for String {
    fn from(id: EngineId) -> Self {
        id.to_string()
    }
}

/// Per-call recall settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallOptions {
    /// Evolution budget: generations for CA engines, sweeps for Hopfield.
    /// `None` uses the engine's own default.
    pub steps: Option<usize>,
    /// Largest differing fraction still counted as success.
    pub max_diff_ratio: f64,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            steps: None,
            max_diff_ratio: DEFAULT_MAX_DIFF_RATIO,
        }
    }
}

impl RecallOptions {
    /// Overrides the evolution budget.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Overrides the success threshold.
    pub fn with_max_diff_ratio(mut self, ratio: f64) -> Self {
        self.max_diff_ratio = ratio;
        self
    }
}

/// Outcome of one recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recall {
    /// State the probe evolved into.
    pub state: Grid,
    /// Whether `distance` is within the success threshold.
    pub success: bool,
    /// Hamming distance to the nearest stored pattern; `None` when nothing
    /// is stored (an infinite distance).
    pub distance: Option<usize>,
    /// Index of the nearest stored pattern.
    pub nearest: Option<usize>,
    /// Generations (CA) or sweeps (Hopfield) actually run.
    pub steps_used: usize,
}

impl Recall {
    pub(crate) fn score(
        state: Grid,
        stored: &[Grid],
        max_diff_ratio: f64,
        steps_used: usize,
    ) -> Result<Self> {
        let hit = nearest(&state, stored)?;
        let success = hit.is_some_and(|(_, d)| d as f64 / state.len() as f64 <= max_diff_ratio);
        Ok(Self {
            success,
            distance: hit.map(|(_, d)| d),
            nearest: hit.map(|(i, _)| i),
            steps_used,
            state,
        })
    }

    /// Distance as a sort key; an empty stored set ranks last.
    pub fn rank(&self) -> usize {
        self.distance.unwrap_or(usize::MAX)
    }
}

/// Index and distance of the closest grid in `stored`; earliest wins ties.
pub fn nearest(state: &Grid, stored: &[Grid]) -> Result<Option<(usize, usize)>> {
    let mut best: Option<(usize, usize)> = None;
    for (i, pattern) in stored.iter().enumerate() {
        let d = hamming_distance(state, pattern)?;
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    Ok(best)
}

/// An associative memory with a store/recall lifecycle.
///
/// `store` replaces the whole stored set; `recall` never mutates it. Recalling
/// before anything is stored is valid and always fails with no distance.
pub trait MemoryEngine {
    /// The engine's identifier in an ensemble.
    fn id(&self) -> EngineId;

    /// Cells per pattern (`width * height`).
    fn cell_count(&self) -> usize;

    /// Replaces the stored set with copies of `patterns`.
    fn store(&mut self, patterns: &[Grid]) -> Result<()>;

    /// The currently stored patterns.
    fn stored(&self) -> &[Grid];

    /// Evolves `probe` and scores it against the stored set.
    fn recall_with_rng(
        &self,
        probe: &Grid,
        options: &RecallOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Recall>;

    /// [`recall_with_rng`](Self::recall_with_rng) using the thread RNG.
    fn recall(&self, probe: &Grid, options: &RecallOptions) -> Result<Recall> {
        self.recall_with_rng(probe, options, &mut rand::rng())
    }
}

/// Checks `grid` against an engine's cell count.
pub(crate) fn check_size(expected: usize, grid: &Grid) -> Result<()> {
    if grid.len() != expected {
        return Err(MemoryError::SizeMismatch {
            expected,
            got: grid.len(),
        });
    }
    Ok(())
}

/// Copies `patterns` after checking each against the engine size.
pub(crate) fn copy_patterns(expected: usize, patterns: &[Grid]) -> Result<Vec<Grid>> {
    patterns
        .iter()
        .map(|p| check_size(expected, p).map(|()| p.clone()))
        .collect()
}
