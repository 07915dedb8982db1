//! Application errors.  All of them happen before the first frame.

use std::path::PathBuf;
use thiserror::Error;

use note_bank::BankError;
use tap_trigger::ConfigError;

#[derive(Debug, Error)]
pub enum PianoError {
    #[error("cannot read config '{path}': {source}")]
    ConfigRead { path: PathBuf, #[source] source: std::io::Error },

    #[error("invalid config '{path}': {source}")]
    ConfigParse { path: PathBuf, #[source] source: toml::de::Error },

    #[error(transparent)]
    Trigger(#[from] ConfigError),

    #[error("invalid {flag}: {reason}")]
    InvalidArg { flag: &'static str, reason: String },

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("cannot open '{path}': {source}")]
    Input { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to start detector '{command}': {source}")]
    DetectorSpawn { command: String, #[source] source: std::io::Error },

    #[error("window error: {0}")]
    Window(String),
}

pub type Result<T> = std::result::Result<T, PianoError>;
