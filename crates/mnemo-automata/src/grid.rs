//! Flat toroidal binary grids.

use std::fmt;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AutomataError, Result};

/// A fixed-size binary lattice stored row-major (`y * width + x`).
///
/// Cells hold `0` (dead) or `1` (alive). The lattice is treated as a torus
/// by the step engine; the grid itself only stores state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "GridRepr"))]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct GridRepr {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

#[cfg(feature = "serde")]
impl TryFrom<GridRepr> for Grid {
    type Error = AutomataError;

    fn try_from(repr: GridRepr) -> Result<Self> {
        Grid::from_cells(repr.width, repr.height, repr.cells)
    }
}

impl Grid {
    /// Creates an all-dead grid.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::filled(width, height, false)
    }

    /// Creates a grid with every cell set to `alive`.
    pub fn filled(width: usize, height: usize, alive: bool) -> Result<Self> {
        let len = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![alive as u8; len],
        })
    }

    /// Wraps an existing cell buffer.
    ///
    /// Fails if the buffer is not `width * height` long or holds values other
    /// than 0 and 1.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self> {
        let len = cell_count(width, height)?;
        if cells.len() != len {
            return Err(AutomataError::LengthMismatch {
                expected: len,
                got: cells.len(),
            });
        }
        if let Some((index, &value)) = cells.iter().enumerate().find(|(_, v)| **v > 1) {
            return Err(AutomataError::InvalidCell { index, value });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Creates a grid where each cell is alive with probability `density`.
    pub fn random(width: usize, height: usize, density: f64) -> Result<Self> {
        Self::random_with_rng(width, height, density, &mut rand::rng())
    }

    /// Creates a random grid with a custom RNG.
    ///
    /// `density <= 0` yields an all-dead grid and `density >= 1` an all-alive
    /// one without drawing from the RNG.
    pub fn random_with_rng<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        density: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut grid = Self::new(width, height)?;
        grid.randomize(density, rng);
        Ok(grid)
    }

    /// Re-randomizes every cell in place.
    pub fn randomize<R: Rng + ?Sized>(&mut self, density: f64, rng: &mut R) {
        if density <= 0.0 {
            self.fill(false);
        } else if density >= 1.0 {
            self.fill(true);
        } else {
            for cell in &mut self.cells {
                *cell = (rng.random::<f64>() < density) as u8;
            }
        }
    }

    /// Returns the width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of cells (`width * height`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false for a constructed grid; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns `true` if `other` has the same width and height.
    pub fn same_shape(&self, other: &Grid) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Linear index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Gets the state of a cell. Out-of-range coordinates read as dead.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)] == 1
    }

    /// Sets the state of a cell. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.cells[i] = alive as u8;
        }
    }

    /// Flips a cell. Out-of-range coordinates are ignored.
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.cells[i] ^= 1;
        }
    }

    /// Sets every cell to `alive`.
    pub fn fill(&mut self, alive: bool) {
        self.cells.fill(alive as u8);
    }

    /// Clears all cells.
    pub fn clear(&mut self) {
        self.fill(false);
    }

    /// Returns the row-major cell buffer.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    /// Consumes the grid, returning its cell buffer.
    pub fn into_cells(self) -> Vec<u8> {
        self.cells
    }

    /// Returns the grid as rows of booleans (`rows[y][x]`).
    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|&c| c == 1).collect())
            .collect()
    }

    /// Counts alive cells.
    pub fn population(&self) -> usize {
        self.cells.iter().map(|&c| c as usize).sum()
    }

    /// Computes population, density and Shannon entropy.
    pub fn metrics(&self) -> GridMetrics {
        let population = self.population();
        let density = population as f64 / self.cells.len() as f64;
        let q = 1.0 - density;
        let entropy = if density > 0.0 && density < 1.0 {
            -(density * density.log2() + q * q.log2())
        } else {
            0.0
        };

        GridMetrics {
            population,
            density,
            entropy,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.cells.chunks(self.width).enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for &cell in row {
                f.write_str(if cell == 1 { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

impl AsRef<[u8]> for Grid {
    fn as_ref(&self) -> &[u8] {
        &self.cells
    }
}

/// Summary statistics of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridMetrics {
    /// Number of alive cells.
    pub population: usize,
    /// Fraction of alive cells (0-1).
    pub density: f64,
    /// Shannon entropy of the alive/dead distribution, in bits.
    pub entropy: f64,
}

/// `width * height`, rejecting zero sides and products that overflow.
fn cell_count(width: usize, height: usize) -> Result<usize> {
    match width.checked_mul(height) {
        Some(len) if len > 0 => Ok(len),
        _ => Err(AutomataError::InvalidDimensions { width, height }),
    }
}
