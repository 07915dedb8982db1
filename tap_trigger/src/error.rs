//! Configuration errors.  The engine itself never fails once built.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("alpha must be in (0, 1], got {0}")]
    AlphaOutOfRange(f32),

    #[error("threshold must be a finite value >= 0, got {0}")]
    InvalidThreshold(f32),

    #[error("expected {expected} note names (one per finger), got {got}")]
    NoteCount { expected: usize, got: usize },

    #[error("note name for slot {slot} is empty")]
    EmptyNote { slot: usize },

    #[error("note '{name}' is bound to both slot {first} and slot {second}; each finger needs its own note")]
    DuplicateNote { name: String, first: usize, second: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
