//! Hand observations as delivered by an external landmark detector.
//!
//! The detector hands us up to two records per frame.  Nothing about them is
//! trusted: labels may be missing or duplicated and the landmark list may be
//! short.  The mapper in [`crate::mapper`] copes with all of that.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices (21-point hand model)
// ════════════════════════════════════════════════════════════════════════════

/// Landmark indices of the 21-point hand model used by common detectors.
pub mod landmarks {
    pub const THUMB_TIP:  usize = 4;
    pub const INDEX_TIP:  usize = 8;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_TIP:   usize = 16;
    pub const PINKY_TIP:  usize = 20;

    /// Total number of landmarks per hand.
    pub const COUNT: usize = 21;
}

// ════════════════════════════════════════════════════════════════════════════
// Handedness
// ════════════════════════════════════════════════════════════════════════════

/// Which hand a detection belongs to, relative to the subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub const BOTH: [Handedness; 2] = [Handedness::Left, Handedness::Right];

    /// Position in a two-element per-hand table.
    pub fn index(self) -> usize {
        match self {
            Handedness::Left  => 0,
            Handedness::Right => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left  => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }

    /// Parse a detector label.  Case-insensitive; anything unrecognised
    /// yields `None` rather than an error.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("left") || label.eq_ignore_ascii_case("l") {
            Some(Handedness::Left)
        } else if label.eq_ignore_ascii_case("right") || label.eq_ignore_ascii_case("r") {
            Some(Handedness::Right)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Handedness::Left  => "Left",
            Handedness::Right => "Right",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// The five fingers, in the detector's designated order (thumb first).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// Designated order: thumb → pinky.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Position in the designated order (thumb = 0).
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / HandObservation
// ════════════════════════════════════════════════════════════════════════════

/// One landmark point.  `x` and `y` are normalised to the image
/// width/height (0.0–1.0, origin top-left, y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth; carried through but unused by the mapper.
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A single detected hand, as reported by the detector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandObservation {
    /// `None` when the detector gave no label or one we don't recognise.
    pub handedness: Option<Handedness>,
    /// Normally [`landmarks::COUNT`] points, but may be anything.
    pub landmarks:  Vec<Landmark>,
}

impl HandObservation {
    pub fn new(handedness: Handedness, landmarks: Vec<Landmark>) -> Self {
        HandObservation { handedness: Some(handedness), landmarks }
    }

    /// Landmark at `index`, if the detector supplied one.
    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Horizontal mirror image: x → 1 − x and the label swaps sides.
    ///
    /// Use when the detector ran on the unflipped camera image but the user
    /// watches a mirrored preview.
    pub fn mirrored(&self) -> Self {
        HandObservation {
            handedness: self.handedness.map(Handedness::opposite),
            landmarks:  self.landmarks.iter()
                .map(|lm| Landmark { x: 1.0 - lm.x, ..*lm })
                .collect(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parsing_is_forgiving() {
        assert_eq!(Handedness::from_label("Left"),   Some(Handedness::Left));
        assert_eq!(Handedness::from_label(" right"), Some(Handedness::Right));
        assert_eq!(Handedness::from_label("R"),      Some(Handedness::Right));
        assert_eq!(Handedness::from_label(""),       None);
        assert_eq!(Handedness::from_label("both"),   None);
    }

    #[test]
    fn mirror_swaps_label_and_flips_x() {
        let hand = HandObservation::new(Handedness::Left, vec![Landmark::new(0.25, 0.5)]);
        let m = hand.mirrored();
        assert_eq!(m.handedness, Some(Handedness::Right));
        assert_eq!(m.landmarks[0].x, 0.75);
        assert_eq!(m.landmarks[0].y, 0.5);
    }

    #[test]
    fn mirror_keeps_missing_label_missing() {
        let hand = HandObservation { handedness: None, landmarks: vec![] };
        assert_eq!(hand.mirrored().handedness, None);
    }

    #[test]
    fn finger_ordinals_follow_designated_order() {
        for (i, f) in Finger::ALL.iter().enumerate() {
            assert_eq!(f.ordinal(), i);
        }
    }
}
