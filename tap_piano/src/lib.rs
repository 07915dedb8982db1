//! # tap_piano
//!
//! Ten fingertips, ten notes.  A hand landmark detector reports both hands
//! every frame; each fingertip is tracked in its own slot, and a quick
//! downward tap of a fingertip plays that slot's note over MIDI.
//!
//! ## Pipeline
//!
//! | Stage | Crate / module | Output |
//! |---|---|---|
//! | Detector, recording or keyboard | [`hands`] | [`hands::DetectionFrame`] |
//! | Slot mapping | `finger_slots` | `FingertipFrame` |
//! | Onset detection | `tap_trigger` | `TriggerEvent`s |
//! | Sound | `note_bank` | MIDI note-on |
//!
//! [`session::Session`] runs the middle three stages per frame;
//! [`app::run`] wires the source, the session and the overlay together.
//!
//! ## Sources
//!
//! * `sim` (default): two synthetic hands in the overlay window.
//! * `stdin` / `file <path>`: JSON lines, one frame per line.
//! * `detector <cmd...>`: spawn a detector and read its stdout.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Finger |
//! |---|---|
//! | `1`–`5` | Left pinky … left thumb |
//! | `6`–`0` | Right thumb … right pinky |
//! | `Escape` | Quit |

pub mod app;
pub mod config;
pub mod error;
pub mod hands;
pub mod session;
pub mod visualizer;

pub use error::{PianoError, Result};
