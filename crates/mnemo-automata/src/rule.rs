//! Life-like birth/survival rules and their `B.../S...` notation.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AutomataError, Result};

/// Largest neighbor count in the 8-cell Moore neighborhood.
pub const MAX_NEIGHBORS: u8 = 8;

/// A set of neighbor counts in `0..=8`, stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeighborCounts(u16);

impl NeighborCounts {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from a list of counts, rejecting anything above 8.
    pub fn from_counts(counts: &[u8]) -> Result<Self> {
        let mut set = Self::EMPTY;
        for &n in counts {
            if n > MAX_NEIGHBORS {
                return Err(AutomataError::InvalidNotation(format!(
                    "neighbor count {n} out of range 0-8"
                )));
            }
            set.0 |= 1 << n;
        }
        Ok(set)
    }

    /// Const constructor for static rule tables.
    ///
    /// # Panics
    ///
    /// Panics if a count is above 8. In a `const` context this is a
    /// compile-time error.
    pub const fn from_static(counts: &[u8]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < counts.len() {
            assert!(counts[i] <= MAX_NEIGHBORS, "neighbor count out of range 0-8");
            bits |= 1 << counts[i];
            i += 1;
        }
        Self(bits)
    }

    /// Returns `true` if `n` is in the set.
    #[inline]
    pub fn contains(self, n: u8) -> bool {
        n <= MAX_NEIGHBORS && self.0 & (1 << n) != 0
    }

    /// Number of counts in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if no count is in the set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the counts in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..=MAX_NEIGHBORS).filter(move |&n| self.contains(n))
    }
}

/// A Life-like rule over the Moore neighborhood.
///
/// A dead cell is born when its live-neighbor count is in `born`; a live cell
/// survives when its count is in `survive`. Rules are immutable and `Copy`,
/// so any number of grids and engines can share one.
///
/// ```
/// use mnemo_automata::Rule;
///
/// let life: Rule = "B3/S23".parse().unwrap();
/// assert!(life.born().contains(3));
/// assert_eq!(life.to_string(), "B3/S23");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Rule {
    born: NeighborCounts,
    survive: NeighborCounts,
}

impl Rule {
    /// Creates a rule from birth and survival counts.
    pub fn new(born: &[u8], survive: &[u8]) -> Result<Self> {
        Ok(Self {
            born: NeighborCounts::from_counts(born)?,
            survive: NeighborCounts::from_counts(survive)?,
        })
    }

    /// Const constructor for preset tables. See [`NeighborCounts::from_static`].
    pub const fn from_static(born: &[u8], survive: &[u8]) -> Self {
        Self {
            born: NeighborCounts::from_static(born),
            survive: NeighborCounts::from_static(survive),
        }
    }

    /// Parses `B{digits}/S{digits}` notation.
    ///
    /// The whole (trimmed) string must match; digits must be 0-8. Either digit
    /// list may be empty (`B2/S` has no survival counts). Repeated digits
    /// collapse into the set.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || AutomataError::InvalidNotation(text.to_string());

        let body = text.trim().strip_prefix('B').ok_or_else(invalid)?;
        let (born, survive) = body.split_once("/S").ok_or_else(invalid)?;

        Ok(Self {
            born: parse_digits(born).ok_or_else(invalid)?,
            survive: parse_digits(survive).ok_or_else(invalid)?,
        })
    }

    /// Birth counts.
    pub fn born(&self) -> NeighborCounts {
        self.born
    }

    /// Survival counts.
    pub fn survive(&self) -> NeighborCounts {
        self.survive
    }

    /// Next state of one cell given its current state and live-neighbor count.
    #[inline]
    pub fn next_state(&self, alive: bool, neighbors: u8) -> bool {
        if alive {
            self.survive.contains(neighbors)
        } else {
            self.born.contains(neighbors)
        }
    }

    /// Canonical notation with sorted digits, e.g. `B01/S3`.
    pub fn notation(&self) -> String {
        self.to_string()
    }

    /// Fixed 18-wide encoding: index `i` is set iff `i` is a birth count,
    /// index `9 + i` iff `i` is a survival count.
    pub fn feature_vector(&self) -> [f32; 18] {
        let mut features = [0.0; 18];
        for n in self.born.iter() {
            features[n as usize] = 1.0;
        }
        for n in self.survive.iter() {
            features[9 + n as usize] = 1.0;
        }
        features
    }
}

fn parse_digits(digits: &str) -> Option<NeighborCounts> {
    let mut set = NeighborCounts::EMPTY;
    for c in digits.chars() {
        let n = c.to_digit(10)?;
        if n > MAX_NEIGHBORS as u32 {
            return None;
        }
        set.0 |= 1 << n;
    }
    Some(set)
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("B")?;
        for n in self.born.iter() {
            write!(f, "{n}")?;
        }
        f.write_str("/S")?;
        for n in self.survive.iter() {
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

impl FromStr for Rule {
    type Err = AutomataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Rule {
    type Error = AutomataError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Rule> for String {
    fn from(rule: Rule) -> Self {
        rule.to_string()
    }
}

/// Common rule presets.
pub mod presets {
    use super::Rule;

    /// Game of Life (B3/S23).
    pub const LIFE: Rule = Rule::from_static(&[3], &[2, 3]);

    /// HighLife (B36/S23).
    pub const HIGH_LIFE: Rule = Rule::from_static(&[3, 6], &[2, 3]);

    /// Seeds (B2/S) - explosive growth.
    pub const SEEDS: Rule = Rule::from_static(&[2], &[]);

    /// Day & Night (B3678/S34678).
    pub const DAY_NIGHT: Rule = Rule::from_static(&[3, 6, 7, 8], &[3, 4, 6, 7, 8]);

    /// Maze (B3/S12345).
    pub const MAZE: Rule = Rule::from_static(&[3], &[1, 2, 3, 4, 5]);

    /// Diamoeba (B35678/S5678).
    pub const DIAMOEBA: Rule = Rule::from_static(&[3, 5, 6, 7, 8], &[5, 6, 7, 8]);

    /// Replicator (B1357/S1357).
    pub const REPLICATOR: Rule = Rule::from_static(&[1, 3, 5, 7], &[1, 3, 5, 7]);

    /// B01/S3, the strongest recall rule found so far.
    pub const B01_S3: Rule = Rule::from_static(&[0, 1], &[3]);

    /// Rules with reliable recall across low noise levels, best first.
    ///
    /// This is the default CA roster of the memory ensemble.
    pub const MEMORY_CHAMPIONS: [Rule; 7] = [
        B01_S3,
        Rule::from_static(&[0, 1], &[2, 3]),
        Rule::from_static(&[0, 1], &[3, 4]),
        Rule::from_static(&[0, 1], &[2]),
        Rule::from_static(&[0, 1], &[4]),
        Rule::from_static(&[0, 1], &[1, 3]),
        Rule::from_static(&[4, 6], &[5, 8]),
    ];

    /// Rules that scored highest in long-running memory searches.
    pub const HALL_OF_FAME: [Rule; 7] = [
        Rule::from_static(&[2, 4, 5, 6], &[0, 7, 8]),
        Rule::from_static(&[2, 4, 5, 6], &[0, 6, 8]),
        Rule::from_static(&[2, 4, 6], &[5, 8]),
        Rule::from_static(&[2, 4, 5, 6], &[0, 7]),
        Rule::from_static(&[2, 4, 6], &[5]),
        Rule::from_static(&[2, 4, 5, 6], &[5]),
        B01_S3,
    ];
}
