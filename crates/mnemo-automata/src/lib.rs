//! Life-like cellular automata on toroidal binary grids.
//!
//! The building blocks of the memory experiments: a flat [`Grid`], a
//! birth/survival [`Rule`] parsed from `B.../S...` notation, the synchronous
//! Moore-neighborhood [`step`], bit-flip [`add_noise`], the Hamming-based
//! recall criterion and attractor scanning.
//!
//! # Example
//!
//! ```
//! use mnemo_automata::{Grid, Rule, run, hamming_distance};
//!
//! let rule: Rule = "B3/S23".parse().unwrap();
//! let mut block = Grid::new(8, 8).unwrap();
//! for (x, y) in [(3, 3), (4, 3), (3, 4), (4, 4)] {
//!     block.set(x, y, true);
//! }
//!
//! // A block is a still life under Conway's rule.
//! let later = run(&block, &rule, 10);
//! assert_eq!(hamming_distance(&block, &later).unwrap(), 0);
//! ```

mod attractor;
mod error;
mod grid;
mod noise;
mod rule;
mod step;

pub use attractor::{
    Attractor, AttractorReport, AttractorTally, DOMINANT_SHARE, DominantAttractor, Relaxation,
    ScanConfig, relax, relax_with_rng, scan_attractors, scan_attractors_with_rng,
};
pub use error::{AutomataError, Result};
pub use grid::{Grid, GridMetrics};
pub use noise::{
    DEFAULT_MAX_DIFF_RATIO, add_noise, add_noise_with_rng, hamming_distance, hash_grid,
    is_recall_success,
};
pub use rule::{MAX_NEIGHBORS, NeighborCounts, Rule, presets};
pub use step::{LifeLike, MOORE, count_neighbors, run, step};
