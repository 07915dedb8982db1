//! # finger_slots
//!
//! Turns a hand detector's unordered output into a stable ten-slot
//! fingertip array, one per frame.
//!
//! | Slot | Hand | Finger |
//! |---|---|---|
//! | 0 | Left | pinky |
//! | 1 | Left | ring |
//! | 2 | Left | middle |
//! | 3 | Left | index |
//! | 4 | Left | thumb |
//! | 5 | Right | thumb |
//! | 6 | Right | index |
//! | 7 | Right | middle |
//! | 8 | Right | ring |
//! | 9 | Right | pinky |
//!
//! ## Quick start
//!
//! ```rust
//! use finger_slots::{map_frame, FingerSlot, HandObservation, Handedness, Landmark};
//!
//! let tips = vec![Landmark::new(0.5, 0.25); 21];
//! let frame = map_frame(&[HandObservation::new(Handedness::Left, tips)], 640, 480);
//!
//! assert!(frame.get(FingerSlot::ALL[0]).is_present());   // left pinky
//! assert!(!frame.get(FingerSlot::ALL[9]).is_present());  // right pinky
//! ```

pub mod hand;
pub mod mapper;
pub mod slot;

pub use hand::{landmarks, Finger, Handedness, HandObservation, Landmark};
pub use mapper::{map_frame, map_frame_with, DuplicateHandPolicy, SlotLayout, TipIndices};
pub use slot::{FingerSlot, FingertipFrame, FingertipSample, SLOT_COUNT};
