//! Error types for Montage.

use thiserror::Error;

/// Main error type for Montage operations.
#[derive(Error, Debug)]
pub enum MontageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A time value or trim window failed validation. The offending
    /// entity is left untouched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Mutation attempted on a locked segment or track.
    #[error("Locked: {0}")]
    Locked(String),

    /// Overlap conflict on a track whose kind forbids overlap.
    #[error("Overlap conflict: {0}")]
    Overlap(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Playback error: {0}")]
    Playback(String),
}

/// Result type alias for Montage operations.
pub type Result<T> = std::result::Result<T, MontageError>;
