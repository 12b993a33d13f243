//! Bit-flip noise, Hamming distance and the recall success criterion.

use rand::Rng;

use crate::error::{AutomataError, Result};
use crate::grid::Grid;

/// Largest fraction of differing cells still counted as a successful recall.
pub const DEFAULT_MAX_DIFF_RATIO: f64 = 0.1;

/// Returns a copy of `grid` with each cell flipped with probability `rate`.
pub fn add_noise(grid: &Grid, rate: f64) -> Grid {
    add_noise_with_rng(grid, rate, &mut rand::rng())
}

/// Noise injection with a custom RNG.
///
/// `rate <= 0` returns an identical copy and `rate >= 1` the full complement,
/// neither drawing from the RNG.
pub fn add_noise_with_rng<R: Rng + ?Sized>(grid: &Grid, rate: f64, rng: &mut R) -> Grid {
    let mut noisy = grid.clone();
    if rate <= 0.0 {
        return noisy;
    }

    let all = rate >= 1.0;
    for cell in noisy.cells_mut() {
        if all || rng.random::<f64>() < rate {
            *cell ^= 1;
        }
    }
    noisy
}

/// Counts cells that differ between `a` and `b`.
pub fn hamming_distance(a: &Grid, b: &Grid) -> Result<usize> {
    if a.len() != b.len() {
        return Err(AutomataError::LengthMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(a.cells()
        .iter()
        .zip(b.cells())
        .filter(|(x, y)| x != y)
        .count())
}

/// `true` iff at most `max_diff_ratio` of the cells differ.
pub fn is_recall_success(original: &Grid, recalled: &Grid, max_diff_ratio: f64) -> Result<bool> {
    let distance = hamming_distance(original, recalled)?;
    Ok(distance as f64 / original.len() as f64 <= max_diff_ratio)
}

/// Order-sensitive rolling hash of the cell buffer, as 8 hex digits.
///
/// Not collision-free; only used to bucket final states when counting
/// attractors.
pub fn hash_grid(grid: &Grid) -> String {
    let hash = grid.cells().iter().fold(0i32, |hash, &cell| {
        (hash << 5).wrapping_sub(hash).wrapping_add(cell as i32)
    });
    format!("{:08x}", hash as u32)
}
