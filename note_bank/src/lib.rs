//! # note_bank
//!
//! The sound side of tap_piano: note names from a [`tap_trigger::NoteTable`]
//! are bound to MIDI pitches once, at startup, and played fire-and-forget.
//!
//! * [`SoundBank`]: the playback seam the session loop talks to.
//! * [`MidiSoundBank`]: real-time output through `midir`.
//! * [`NullSoundBank`] / [`CaptureBank`]: silence, and a recorder for tests.
//! * [`TakeRecorder`]: saves a session's strikes as a Standard MIDI File.
//!
//! A note with no pitch (say `"kick"`) is simply unbound: triggering it is a
//! no-op, never an error.

pub mod bank;
pub mod error;
pub mod pitch;
pub mod take;

pub use bank::{
    bind_notes, open_sound_bank, CaptureBank, MidiSettings, MidiSoundBank, NullSoundBank,
    SoundBank,
};
pub use error::{BankError, Result};
pub use pitch::{pitch_for, program_for, GeneralMidi};
pub use take::{TakeNote, TakeRecorder};
