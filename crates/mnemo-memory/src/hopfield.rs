//! Hebbian Hopfield network with the same store/recall contract as the CA
//! engines; the comparison baseline of the ensemble.

use mnemo_automata::Grid;
use rand::RngCore;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineId, MemoryEngine, Recall, RecallOptions, check_size, copy_patterns};
use crate::error::{MemoryError, Result};

/// Default cap on asynchronous update sweeps per recall.
pub const HOPFIELD_MAX_SWEEPS: usize = 100;

/// Construction parameters for [`HopfieldMemoryEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HopfieldConfig {
    /// Grid width.
    pub width: usize,
    /// Grid height.
    pub height: usize,
    /// Sweep cap when a recall does not set `steps`.
    pub max_sweeps: usize,
}

impl Default for HopfieldConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            max_sweeps: HOPFIELD_MAX_SWEEPS,
        }
    }
}

impl HopfieldConfig {
    /// Default config for a `width * height` network.
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

/// A fully connected network of `n = width * height` bipolar units.
///
/// Weights live in a dense `n * n` row-major matrix with a zero diagonal.
#[derive(Debug, Clone)]
pub struct HopfieldMemoryEngine {
    config: HopfieldConfig,
    weights: Vec<f32>,
    stored: Vec<Grid>,
}

#[inline]
fn bipolar(bit: u8) -> f32 {
    if bit == 1 { 1.0 } else { -1.0 }
}

impl HopfieldMemoryEngine {
    /// Creates an untrained network (all weights zero).
    pub fn create(config: HopfieldConfig) -> Result<Self> {
        let len = config
            .width
            .checked_mul(config.height)
            .filter(|&n| n > 0)
            .and_then(|n| n.checked_mul(n))
            .ok_or(MemoryError::InvalidConfig(
                "grid dimensions must be non-zero and fit a square weight matrix",
            ))?;
        Ok(Self {
            config,
            weights: vec![0.0; len],
            stored: Vec::new(),
        })
    }

    /// The construction parameters.
    pub fn config(&self) -> &HopfieldConfig {
        &self.config
    }

    /// Coupling from unit `j` into unit `i`.
    pub fn weight(&self, i: usize, j: usize) -> f32 {
        self.weights[i * self.cell_count() + j]
    }

    /// Retrains from scratch: `W[i][j] = (1/P) Σ s_i s_j` for `i != j`.
    fn train(&mut self) {
        let n = self.cell_count();
        self.weights.fill(0.0);
        if self.stored.is_empty() {
            return;
        }

        for pattern in &self.stored {
            let s: Vec<f32> = pattern.cells().iter().map(|&b| bipolar(b)).collect();
            for i in 0..n {
                let row = &mut self.weights[i * n..(i + 1) * n];
                for (j, w) in row.iter_mut().enumerate() {
                    if i != j {
                        *w += s[i] * s[j];
                    }
                }
            }
        }

        let scale = 1.0 / self.stored.len() as f32;
        for w in &mut self.weights {
            *w *= scale;
        }
    }

    /// Runs random-order sweeps until one changes nothing or `max_sweeps`
    /// is reached. Returns the number of sweeps performed.
    fn settle(&self, state: &mut [u8], max_sweeps: usize, rng: &mut dyn RngCore) -> usize {
        let n = state.len();
        let mut order: Vec<usize> = (0..n).collect();

        for sweep in 1..=max_sweeps {
            order.shuffle(rng);
            let mut changed = false;
            for &i in &order {
                let row = &self.weights[i * n..(i + 1) * n];
                let field: f32 = row
                    .iter()
                    .zip(state.iter())
                    .map(|(w, &bit)| w * bipolar(bit))
                    .sum();
                let next = (field >= 0.0) as u8;
                if next != state[i] {
                    state[i] = next;
                    changed = true;
                }
            }
            if !changed {
                return sweep;
            }
        }
        max_sweeps
    }
}

impl MemoryEngine for HopfieldMemoryEngine {
    fn id(&self) -> EngineId {
        EngineId::Hopfield
    }

    fn cell_count(&self) -> usize {
        self.config.width * self.config.height
    }

    fn store(&mut self, patterns: &[Grid]) -> Result<()> {
        self.stored = copy_patterns(self.cell_count(), patterns)?;
        self.train();
        tracing::debug!(patterns = self.stored.len(), "hopfield weights retrained");
        Ok(())
    }

    fn stored(&self) -> &[Grid] {
        &self.stored
    }

    fn recall_with_rng(
        &self,
        probe: &Grid,
        options: &RecallOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Recall> {
        check_size(self.cell_count(), probe)?;
        let max_sweeps = options.steps.unwrap_or(self.config.max_sweeps);

        let mut cells = probe.cells().to_vec();
        let sweeps = self.settle(&mut cells, max_sweeps, rng);
        let state = Grid::from_cells(self.config.width, self.config.height, cells)?;
        let recall = Recall::score(state, &self.stored, options.max_diff_ratio, sweeps)?;

        tracing::trace!(
            sweeps,
            distance = ?recall.distance,
            success = recall.success,
            "hopfield recall"
        );
        Ok(recall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn engine(size: usize) -> HopfieldMemoryEngine {
        HopfieldMemoryEngine::create(HopfieldConfig::with_size(size, size)).unwrap()
    }

    fn upper_half(size: usize) -> Grid {
        let mut grid = Grid::new(size, size).unwrap();
        for y in 0..size / 2 {
            for x in 0..size {
                grid.set(x, y, true);
            }
        }
        grid
    }

    fn even_columns(size: usize) -> Grid {
        let mut grid = Grid::new(size, size).unwrap();
        for y in 0..size {
            for x in (0..size).step_by(2) {
                grid.set(x, y, true);
            }
        }
        grid
    }

    fn flip(grid: &Grid, cells: &[(usize, usize)]) -> Grid {
        let mut out = grid.clone();
        for &(x, y) in cells {
            out.toggle(x, y);
        }
        out
    }

    #[test]
    fn test_create_rejects_bad_dimensions() {
        for (w, h) in [(0, 8), (usize::MAX, 2), (1 << (usize::BITS / 2), 1)] {
            assert!(
                matches!(
                    HopfieldMemoryEngine::create(HopfieldConfig::with_size(w, h)),
                    Err(MemoryError::InvalidConfig(_))
                ),
                "{w}x{h}"
            );
        }
    }

    #[test]
    fn test_weights_symmetric_zero_diagonal() {
        let mut net = engine(4);
        let a = Grid::from_cells(4, 4, (0..16).map(|i| (i % 3 == 0) as u8).collect()).unwrap();
        let b = Grid::from_cells(4, 4, (0..16).map(|i| (i % 2) as u8).collect()).unwrap();
        net.store(&[a, b]).unwrap();

        for i in 0..16 {
            assert_eq!(net.weight(i, i), 0.0);
            for j in 0..16 {
                assert_eq!(net.weight(i, j), net.weight(j, i));
                assert!(net.weight(i, j).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_single_pattern_weights() {
        let mut net = engine(2);
        let p = Grid::from_cells(2, 2, vec![1, 0, 1, 1]).unwrap();
        net.store(&[p]).unwrap();
        assert_eq!(net.weight(0, 1), -1.0);
        assert_eq!(net.weight(0, 2), 1.0);
        assert_eq!(net.weight(1, 3), -1.0);
    }

    #[test]
    fn test_store_retrains_from_scratch() {
        let mut net = engine(8);
        net.store(&[upper_half(8), even_columns(8)]).unwrap();
        net.store(&[upper_half(8)]).unwrap();

        let mut fresh = engine(8);
        fresh.store(&[upper_half(8)]).unwrap();
        assert_eq!(net.weights, fresh.weights);
        assert_eq!(net.stored().len(), 1);
    }

    #[test]
    fn test_recall_single_pattern() {
        let mut net = engine(8);
        let pattern = upper_half(8);
        net.store(&[pattern.clone()]).unwrap();

        let probe = flip(&pattern, &[(0, 0), (3, 2), (7, 5), (1, 6), (4, 7)]);
        let mut rng = StdRng::seed_from_u64(1);
        let recall = net
            .recall_with_rng(&probe, &RecallOptions::default(), &mut rng)
            .unwrap();

        assert_eq!(recall.state, pattern);
        assert_eq!(recall.distance, Some(0));
        assert!(recall.success);
        // One sweep repairs everything, the next confirms it.
        assert_eq!(recall.steps_used, 2);
    }

    #[test]
    fn test_recall_picks_nearest_of_orthogonal_pair() {
        let mut net = engine(8);
        let a = upper_half(8);
        let b = even_columns(8);
        net.store(&[a.clone(), b.clone()]).unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        let probe = flip(&b, &[(2, 1), (5, 3), (6, 6)]);
        let recall = net
            .recall_with_rng(&probe, &RecallOptions::default(), &mut rng)
            .unwrap();
        assert_eq!(recall.state, b);
        assert_eq!(recall.nearest, Some(1));
    }

    #[test]
    fn test_complement_is_spurious_attractor() {
        let mut net = engine(8);
        let pattern = upper_half(8);
        net.store(&[pattern.clone()]).unwrap();

        let inverse = mnemo_automata::add_noise(&pattern, 1.0);
        let recall = net.recall(&inverse, &RecallOptions::default()).unwrap();
        assert_eq!(recall.state, inverse);
        assert_eq!(recall.distance, Some(64));
        assert!(!recall.success);
        assert_eq!(recall.steps_used, 1);
    }

    #[test]
    fn test_sweep_cap() {
        let mut net = engine(8);
        let pattern = upper_half(8);
        net.store(&[pattern.clone()]).unwrap();

        let probe = flip(&pattern, &[(0, 0)]);
        let recall = net
            .recall(&probe, &RecallOptions::default().with_steps(1))
            .unwrap();
        assert_eq!(recall.steps_used, 1);
        assert_eq!(recall.state, pattern);
    }

    #[test]
    fn test_recall_before_store() {
        let net = engine(4);
        let recall = net
            .recall(&Grid::new(4, 4).unwrap(), &RecallOptions::default())
            .unwrap();
        assert!(!recall.success);
        assert_eq!(recall.distance, None);
    }
}
