//! Error types for the arena simulation.
//!
//! Nothing inside a tick returns these: the tick loop contains its own
//! failures (unreachable paths, embedded units, spawn retries). Errors only
//! surface at the data edges and on API misuse.

use thiserror::Error;

use crate::components::UnitId;

/// Result type alias using [`ArenaError`].
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Top-level error type for the arena simulation.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Failed to read level or configuration data.
    #[error("Failed to load level data: {0}")]
    LevelLoad(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A layout that cannot be decoded into an arena.
    #[error("Invalid level layout: {0}")]
    InvalidLayout(String),

    /// Invalid unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),

    /// Snapshot encode/decode failure.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
