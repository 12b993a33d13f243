//! Error types for mnemo-automata.

use thiserror::Error;

/// Errors raised while building or comparing grids and rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomataError {
    /// Rule text did not match `B{0-8}*/S{0-8}*`.
    #[error("invalid rule notation: {0:?}")]
    InvalidNotation(String),

    /// Two grids (or a grid and a cell buffer) have different lengths.
    #[error("length mismatch: expected {expected} cells, got {got}")]
    LengthMismatch {
        /// Length required by the left-hand side.
        expected: usize,
        /// Length actually provided.
        got: usize,
    },

    /// A grid dimension was zero.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// A cell buffer contained something other than 0 or 1.
    #[error("cell {index} has value {value}, expected 0 or 1")]
    InvalidCell {
        /// Linear index of the offending cell.
        index: usize,
        /// The value found there.
        value: u8,
    },
}

/// Result type for automata operations.
pub type Result<T> = std::result::Result<T, AutomataError>;
