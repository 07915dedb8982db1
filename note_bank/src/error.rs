//! Sound bank errors.  Only startup can fail; playback never does.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("MIDI init error: {0}")]
    MidiInit(String),

    #[error("no MIDI output port matches '{hint}'\n  Available ports: {available}")]
    PortNotFound { hint: String, available: String },

    #[error("failed to connect to MIDI port '{port}': {reason}")]
    Connect { port: String, reason: String },

    #[error("cannot write take to '{path}': {source}")]
    WriteTake { path: PathBuf, #[source] source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, BankError>;
