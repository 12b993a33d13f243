//! Error types for mnemo-memory.

use mnemo_automata::AutomataError;
use thiserror::Error;

use crate::engine::EngineId;

/// Errors raised by memory engines, the ensemble and the selector.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Grid construction, rule parsing or distance computation failed.
    #[error(transparent)]
    Automata(#[from] AutomataError),

    /// A probe or stored pattern does not match the engine's cell count.
    #[error("size mismatch: engine holds {expected} cells, got {got}")]
    SizeMismatch {
        /// `width * height` of the engine.
        expected: usize,
        /// Cells in the offending grid.
        got: usize,
    },

    /// A pattern index outside the stored set.
    #[error("pattern index {index} out of range ({len} stored)")]
    PatternIndex {
        /// Requested index.
        index: usize,
        /// Number of stored patterns.
        len: usize,
    },

    /// The ensemble has no engine with this identifier.
    #[error("no engine {0} in the roster")]
    UnknownEngine(EngineId),

    /// An operation needed a trained selector.
    #[error("engine selector has not been trained")]
    SelectorUntrained,

    /// A configuration value cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Pattern JSON could not be read or written.
    #[error("pattern json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
