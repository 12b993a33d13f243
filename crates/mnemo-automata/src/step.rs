//! Synchronous generation updates on a toroidal grid.

use crate::grid::Grid;
use crate::rule::Rule;

/// Moore neighborhood - 8 neighbors (orthogonal + diagonal).
///
/// ```text
/// ┌───┬───┬───┐
/// │ X │ X │ X │
/// ├───┼───┼───┤
/// │ X │ · │ X │
/// ├───┼───┼───┤
/// │ X │ X │ X │
/// └───┴───┴───┘
/// ```
pub const MOORE: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Counts alive Moore neighbors of `(x, y)`, wrapping at every edge.
pub fn count_neighbors(grid: &Grid, x: usize, y: usize) -> u8 {
    let (w, h) = (grid.width() as isize, grid.height() as isize);
    let cells = grid.cells();
    let mut count = 0u8;

    for &(dx, dy) in &MOORE {
        let nx = (x as isize + dx).rem_euclid(w) as usize;
        let ny = (y as isize + dy).rem_euclid(h) as usize;
        count += cells[ny * grid.width() + nx];
    }

    count
}

/// Advances `grid` one generation under `rule`, returning a new grid.
///
/// Every cell reads the same generation; the input is never touched.
pub fn step(grid: &Grid, rule: &Rule) -> Grid {
    let mut next = grid.clone();
    step_into(grid, rule, &mut next);
    next
}

/// Applies [`step`] exactly `steps` times. `steps == 0` returns a copy.
pub fn run(grid: &Grid, rule: &Rule, steps: usize) -> Grid {
    let mut current = grid.clone();
    if steps == 0 {
        return current;
    }

    let mut next = grid.clone();
    for _ in 0..steps {
        step_into(&current, rule, &mut next);
        std::mem::swap(&mut current, &mut next);
    }
    current
}

/// Writes the successor of `src` into `dst`. Both must share a shape.
fn step_into(src: &Grid, rule: &Rule, dst: &mut Grid) {
    debug_assert!(src.same_shape(dst));
    let width = src.width();

    for y in 0..src.height() {
        for x in 0..width {
            let i = y * width + x;
            let alive = src.cells()[i] == 1;
            let neighbors = count_neighbors(src, x, y);
            dst.cells_mut()[i] = rule.next_state(alive, neighbors) as u8;
        }
    }
}

/// A grid bound to a rule, stepped in place.
///
/// Uses the same update as [`step`]; useful for drivers that want to watch a
/// run generation by generation.
#[derive(Debug, Clone)]
pub struct LifeLike {
    grid: Grid,
    scratch: Grid,
    rule: Rule,
    generation: usize,
}

impl LifeLike {
    /// Starts an automaton from `grid`.
    pub fn new(grid: Grid, rule: Rule) -> Self {
        Self {
            scratch: grid.clone(),
            grid,
            rule,
            generation: 0,
        }
    }

    /// Returns the rule.
    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// Returns the current grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of generations advanced so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Counts alive cells in the current generation.
    pub fn population(&self) -> usize {
        self.grid.population()
    }

    /// Advances one generation.
    pub fn step(&mut self) {
        step_into(&self.grid, &self.rule, &mut self.scratch);
        std::mem::swap(&mut self.grid, &mut self.scratch);
        self.generation += 1;
    }

    /// Advances multiple generations.
    pub fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Consumes the automaton, returning the current grid.
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}
