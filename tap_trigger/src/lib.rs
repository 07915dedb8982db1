//! # tap_trigger
//!
//! Onset detection for ten fingertips: every frame, a downward fingertip
//! motion larger than a threshold (after EMA smoothing) fires that finger's
//! note, at most once per cooldown.
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use finger_slots::{FingerSlot, FingertipFrame, FingertipSample};
//! use tap_trigger::{NoteTable, TriggerConfig, TriggerEngine};
//!
//! let mut engine = TriggerEngine::new(TriggerConfig::default(), NoteTable::default()).unwrap();
//! let pinky = FingerSlot::ALL[0];
//!
//! let mut frame = FingertipFrame::empty();
//! frame.set(pinky, FingertipSample::Present { x_px: 100, y_px: 96, y_norm: 0.20 });
//! assert!(engine.update(&frame, Duration::ZERO).is_empty());      // bootstrap
//!
//! frame.set(pinky, FingertipSample::Present { x_px: 100, y_px: 192, y_norm: 0.40 });
//! let events = engine.update(&frame, Duration::from_millis(33));
//! assert_eq!(events[0].note.as_str(), "A4");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod notes;

pub use config::TriggerConfig;
pub use engine::{update, SlotState, TriggerEngine, TriggerEvent};
pub use error::{ConfigError, Result};
pub use notes::{NoteName, NoteTable, DEFAULT_NOTES};
