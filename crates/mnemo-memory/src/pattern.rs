//! Named grid snapshots and their JSON interchange form.

use chrono::{DateTime, Utc};
use mnemo_automata::{AutomataError, Grid};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A grid memorized as ground truth, with identity and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatternRecord", into = "PatternRecord")]
pub struct Pattern {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The pattern itself.
    pub grid: Grid,
    /// When the pattern was created.
    pub created: DateTime<Utc>,
}

impl Pattern {
    /// Creates a pattern stamped with the current time.
    pub fn new(id: impl Into<String>, name: impl Into<String>, grid: Grid) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            grid,
            created: Utc::now(),
        }
    }

    /// Overrides the creation time.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Grid width.
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    /// Grid height.
    pub fn height(&self) -> usize {
        self.grid.height()
    }
}

/// Flat wire shape: `{id, name, grid: [0|1...], width, height, created}`.
#[derive(Serialize, Deserialize)]
struct PatternRecord {
    id: String,
    name: String,
    grid: Vec<u8>,
    width: usize,
    height: usize,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    created: DateTime<Utc>,
}

impl TryFrom<PatternRecord> for Pattern {
    type Error = AutomataError;

    fn try_from(record: PatternRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            grid: Grid::from_cells(record.width, record.height, record.grid)?,
            id: record.id,
            name: record.name,
            created: record.created,
        })
    }
}

impl From<Pattern> for PatternRecord {
    fn from(pattern: Pattern) -> Self {
        Self {
            width: pattern.grid.width(),
            height: pattern.grid.height(),
            grid: pattern.grid.into_cells(),
            id: pattern.id,
            name: pattern.name,
            created: pattern.created,
        }
    }
}

/// The grids of `patterns`, in order.
pub fn grids(patterns: &[Pattern]) -> Vec<Grid> {
    patterns.iter().map(|p| p.grid.clone()).collect()
}

/// Serializes a pattern list as a pretty-printed JSON array.
pub fn patterns_to_json(patterns: &[Pattern]) -> Result<String> {
    Ok(serde_json::to_string_pretty(patterns)?)
}

/// Parses a JSON array of patterns, validating each grid.
pub fn patterns_from_json(json: &str) -> Result<Vec<Pattern>> {
    Ok(serde_json::from_str(json)?)
}

/// Small reproducible patterns used by experiments and tests.
///
/// Cells falling outside the grid are clipped.
pub mod builtin {
    use mnemo_automata::Grid;

    use super::Pattern;
    use crate::error::Result;

    /// Side length of the default experiment grid.
    pub const DEFAULT_SIZE: usize = 32;

    fn with_cells(width: usize, height: usize, cells: &[(usize, usize)]) -> Result<Grid> {
        let mut grid = Grid::new(width, height)?;
        for &(x, y) in cells {
            grid.set(x, y, true);
        }
        Ok(grid)
    }

    /// A 2×2 block with its top-left corner at `(x, y)`.
    pub fn block(width: usize, height: usize, x: usize, y: usize) -> Result<Grid> {
        with_cells(width, height, &[(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)])
    }

    /// A horizontal period-2 blinker starting at `(x, y)`.
    pub fn blinker(width: usize, height: usize, x: usize, y: usize) -> Result<Grid> {
        with_cells(width, height, &[(x, y), (x + 1, y), (x + 2, y)])
    }

    /// A glider in its 3×3 bounding box at `(x, y)`.
    pub fn glider(width: usize, height: usize, x: usize, y: usize) -> Result<Grid> {
        with_cells(
            width,
            height,
            &[(x + 1, y), (x + 2, y + 1), (x, y + 2), (x + 1, y + 2), (x + 2, y + 2)],
        )
    }

    /// Block, blinker and glider near the centre of a 32×32 grid.
    pub fn default_set() -> Result<Vec<Pattern>> {
        let n = DEFAULT_SIZE;
        Ok(vec![
            Pattern::new("default_block", "Block 2x2", block(n, n, 15, 15)?),
            Pattern::new("default_blinker", "Blinker p2", blinker(n, n, 15, 16)?),
            Pattern::new("default_glider", "Glider", glider(n, n, 15, 15)?),
        ])
    }

    /// `count` square `size` grids, each holding one 3×3 block laid out
    /// three per row from `(10, 10)` with a stride of 8.
    pub fn capacity_set(count: usize, size: usize) -> Result<Vec<Pattern>> {
        (0..count)
            .map(|i| {
                let ox = 10 + (i % 3) * 8;
                let oy = 10 + (i / 3) * 8;
                let mut grid = Grid::new(size, size)?;
                for dy in 0..3 {
                    for dx in 0..3 {
                        grid.set(ox + dx, oy + dy, true);
                    }
                }
                Ok(Pattern::new(
                    format!("capacity_{i}"),
                    format!("Pattern {}", i + 1),
                    grid,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_json_shape() {
        let grid = Grid::from_cells(2, 2, vec![1, 0, 0, 1]).unwrap();
        let created = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let pattern = Pattern::new("p1", "diag", grid).with_created(created);

        let value = serde_json::to_value(&pattern).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["grid"], serde_json::json!([1, 0, 0, 1]));
        assert_eq!(value["width"], 2);
        assert_eq!(value["height"], 2);
        assert_eq!(value["created"], 1_700_000_000_123i64);
    }

    #[test]
    fn test_json_round_trip_list() {
        let patterns = builtin::default_set().unwrap();
        let json = patterns_to_json(&patterns).unwrap();
        let back = patterns_from_json(&json).unwrap();
        assert_eq!(back.len(), 3);
        for (a, b) in patterns.iter().zip(&back) {
            assert_eq!(a.grid, b.grid);
            assert_eq!(a.id, b.id);
            assert_eq!(a.created.timestamp_millis(), b.created.timestamp_millis());
        }
    }

    #[test]
    fn test_import_rejects_bad_grid() {
        let short = r#"[{"id":"x","name":"x","grid":[1,0,1],"width":2,"height":2,"created":0}]"#;
        assert!(patterns_from_json(short).is_err());

        let non_binary = r#"[{"id":"x","name":"x","grid":[1,0,3,0],"width":2,"height":2,"created":0}]"#;
        assert!(patterns_from_json(non_binary).is_err());
    }

    #[test]
    fn test_import_rejects_overflowing_dimensions() {
        let json = r#"[{"id":"x","name":"x","grid":[],"width":9223372036854775808,"height":2}]"#;
        assert!(patterns_from_json(json).is_err());

        let json = r#"[{"id":"x","name":"x","grid":[],"width":18446744073709551615,"height":2}]"#;
        assert!(patterns_from_json(json).is_err());
    }

    #[test]
    fn test_missing_created_defaults() {
        let json = r#"[{"id":"x","name":"x","grid":[1,0],"width":2,"height":1}]"#;
        let patterns = patterns_from_json(json).unwrap();
        assert!(patterns[0].created.timestamp() > 0);
    }

    #[test]
    fn test_default_set() {
        let set = builtin::default_set().unwrap();
        let pops: Vec<_> = set.iter().map(|p| p.grid.population()).collect();
        assert_eq!(pops, vec![4, 3, 5]);
        assert!(set[0].grid.get(15, 15) && set[0].grid.get(16, 16));
        assert!(set.iter().all(|p| p.width() == 32 && p.height() == 32));
    }

    #[test]
    fn test_capacity_set_layout() {
        let set = builtin::capacity_set(5, 32).unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set[4].id, "capacity_4");
        // Fifth block: column 1, row 1.
        assert!(set[4].grid.get(18, 18));
        assert!(set[4].grid.get(20, 20));
        assert!(set.iter().all(|p| p.grid.population() == 9));

        // Clipped at the edge of a small grid.
        let clipped = builtin::capacity_set(3, 28).unwrap();
        assert_eq!(clipped[2].grid.population(), 6);
        assert_eq!(clipped[1].grid.population(), 9);
    }
}
