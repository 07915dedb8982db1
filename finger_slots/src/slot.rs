//! Slot identities and the per-frame fingertip array.

use std::fmt;

use crate::hand::{Finger, Handedness};

/// Number of finger slots (five per hand).
pub const SLOT_COUNT: usize = 10;

// ════════════════════════════════════════════════════════════════════════════
// FingerSlot
// ════════════════════════════════════════════════════════════════════════════

/// A fixed finger-and-hand position, `0..10`.
///
/// Order: left pinky, ring, middle, index, thumb, then right thumb, index,
/// middle, ring, pinky.  The left hand is laid out pinky-first so the ten
/// slots read like a keyboard from left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FingerSlot(u8);

impl FingerSlot {
    /// Every slot in canonical order.
    pub const ALL: [FingerSlot; SLOT_COUNT] = [
        FingerSlot(0), FingerSlot(1), FingerSlot(2), FingerSlot(3), FingerSlot(4),
        FingerSlot(5), FingerSlot(6), FingerSlot(7), FingerSlot(8), FingerSlot(9),
    ];

    /// `None` if `index >= SLOT_COUNT`.
    pub fn new(index: usize) -> Option<Self> {
        (index < SLOT_COUNT).then(|| FingerSlot(index as u8))
    }

    /// The slot holding `finger` of `hand`.
    pub fn of(hand: Handedness, finger: Finger) -> Self {
        let i = match hand {
            Handedness::Left  => 4 - finger.ordinal(),
            Handedness::Right => 5 + finger.ordinal(),
        };
        FingerSlot(i as u8)
    }

    pub fn index(self) -> usize { self.0 as usize }

    pub fn hand(self) -> Handedness {
        if self.0 < 5 { Handedness::Left } else { Handedness::Right }
    }

    pub fn finger(self) -> Finger {
        let ordinal = match self.hand() {
            Handedness::Left  => 4 - self.index(),
            Handedness::Right => self.index() - 5,
        };
        Finger::ALL[ordinal]
    }
}

impl fmt::Display for FingerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.hand().name(), self.finger().name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingertipSample
// ════════════════════════════════════════════════════════════════════════════

/// One slot's fingertip for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum FingertipSample {
    #[default]
    Absent,
    Present {
        /// Pixel column, truncated from `x_norm * width`.
        x_px:   i32,
        /// Pixel row, truncated from `y_norm * height`.
        y_px:   i32,
        /// Normalised y (0 = top of frame, 1 = bottom).
        y_norm: f32,
    },
}

impl FingertipSample {
    pub fn is_present(&self) -> bool {
        matches!(self, FingertipSample::Present { .. })
    }

    /// Normalised y, if present.
    pub fn y_norm(&self) -> Option<f32> {
        match *self {
            FingertipSample::Present { y_norm, .. } => Some(y_norm),
            FingertipSample::Absent                 => None,
        }
    }

    /// Pixel position, if present.
    pub fn pixel(&self) -> Option<(i32, i32)> {
        match *self {
            FingertipSample::Present { x_px, y_px, .. } => Some((x_px, y_px)),
            FingertipSample::Absent                     => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingertipFrame
// ════════════════════════════════════════════════════════════════════════════

/// Exactly [`SLOT_COUNT`] fingertip samples, indexed by [`FingerSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FingertipFrame {
    samples: [FingertipSample; SLOT_COUNT],
}

impl FingertipFrame {
    /// All slots absent.
    pub fn empty() -> Self { Self::default() }

    /// Build a frame from an arbitrary-length sample list.  Extra samples
    /// are dropped; missing ones are `Absent`.
    pub fn from_samples<I>(samples: I) -> Self
    where I: IntoIterator<Item = FingertipSample>
    {
        let mut frame = Self::empty();
        for (slot, sample) in frame.samples.iter_mut().zip(samples) {
            *slot = sample;
        }
        frame
    }

    pub fn get(&self, slot: FingerSlot) -> FingertipSample {
        self.samples[slot.index()]
    }

    pub fn set(&mut self, slot: FingerSlot, sample: FingertipSample) {
        self.samples[slot.index()] = sample;
    }

    /// `(slot, sample)` pairs in canonical slot order.
    pub fn iter(&self) -> impl Iterator<Item = (FingerSlot, FingertipSample)> + '_ {
        FingerSlot::ALL.iter().map(move |&s| (s, self.samples[s.index()]))
    }

    pub fn present_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_present()).count()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
