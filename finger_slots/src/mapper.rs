//! The finger slot mapper: 0–2 unordered hand observations → one
//! [`FingertipFrame`].
//!
//! # Algorithm
//!
//! 1. Pick at most one observation per [`Handedness`] into a two-element
//!    table.  Observations without a label are ignored.  When a label
//!    repeats, [`DuplicateHandPolicy`] decides which one is kept.
//! 2. Left hand → slots 0–4, tips in reverse designated order
//!    (pinky → thumb).  Right hand → slots 5–9, forward order
//!    (thumb → pinky).  A missing hand leaves its five slots `Absent`.
//! 3. Pixel coordinates are `norm * dimension`, truncated toward zero.
//!
//! The result always has exactly ten entries.

use serde::{Deserialize, Serialize};

use crate::hand::{landmarks, Handedness, HandObservation};
use crate::slot::{FingertipFrame, FingertipSample, SLOT_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// TipIndices
// ════════════════════════════════════════════════════════════════════════════

/// Landmark index of each fingertip, in designated order
/// (thumb, index, middle, ring, pinky).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipIndices(pub [usize; 5]);

impl Default for TipIndices {
    fn default() -> Self {
        TipIndices([
            landmarks::THUMB_TIP,
            landmarks::INDEX_TIP,
            landmarks::MIDDLE_TIP,
            landmarks::RING_TIP,
            landmarks::PINKY_TIP,
        ])
    }
}

impl TipIndices {
    /// Thumb → pinky.
    pub fn forward(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Pinky → thumb.
    pub fn reverse(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().rev().copied()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DuplicateHandPolicy
// ════════════════════════════════════════════════════════════════════════════

/// Which observation wins when the detector reports the same handedness
/// twice in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateHandPolicy {
    /// The later observation in detector order replaces the earlier one.
    #[default]
    LastWins,
    /// The first observation is kept; later duplicates are ignored.
    FirstWins,
}

// ════════════════════════════════════════════════════════════════════════════
// SlotLayout: mapper configuration
// ════════════════════════════════════════════════════════════════════════════

/// Everything the mapper needs besides the observations themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotLayout {
    pub tips:       TipIndices,
    pub duplicates: DuplicateHandPolicy,
}

impl SlotLayout {
    /// Map one frame.  See [`map_frame_with`].
    pub fn map(&self, hands: &[HandObservation], width: u32, height: u32) -> FingertipFrame {
        map_frame_with(self, hands, width, height)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// map_frame
// ════════════════════════════════════════════════════════════════════════════

/// Map with the default layout (tips 4, 8, 12, 16, 20; last label wins).
pub fn map_frame(hands: &[HandObservation], width: u32, height: u32) -> FingertipFrame {
    map_frame_with(&SlotLayout::default(), hands, width, height)
}

/// Map a frame's hand observations into the ten-slot fingertip array.
pub fn map_frame_with(
    layout: &SlotLayout,
    hands:  &[HandObservation],
    width:  u32,
    height: u32,
) -> FingertipFrame {
    let by_hand = pick_hands(hands, layout.duplicates);

    let mut samples = Vec::with_capacity(SLOT_COUNT);
    for hand in Handedness::BOTH {
        let obs = by_hand[hand.index()];
        let tips: Vec<usize> = match hand {
            Handedness::Left  => layout.tips.reverse().collect(),
            Handedness::Right => layout.tips.forward().collect(),
        };
        samples.extend(tips.into_iter().map(|i| tip_sample(obs, i, width, height)));
    }

    FingertipFrame::from_samples(samples)
}

/// Two-element lookup: `[left, right]`.
fn pick_hands(
    hands:  &[HandObservation],
    policy: DuplicateHandPolicy,
) -> [Option<&HandObservation>; 2] {
    let mut table: [Option<&HandObservation>; 2] = [None, None];
    for obs in hands {
        let Some(hand) = obs.handedness else { continue };
        let entry = &mut table[hand.index()];
        match policy {
            DuplicateHandPolicy::LastWins  => *entry = Some(obs),
            DuplicateHandPolicy::FirstWins => { entry.get_or_insert(obs); }
        }
    }
    table
}

fn tip_sample(
    obs:    Option<&HandObservation>,
    index:  usize,
    width:  u32,
    height: u32,
) -> FingertipSample {
    match obs.and_then(|o| o.landmark(index)) {
        Some(lm) if lm.is_finite() => FingertipSample::Present {
            x_px:   (lm.x * width  as f32) as i32,
            y_px:   (lm.y * height as f32) as i32,
            y_norm: lm.y,
        },
        _ => FingertipSample::Absent,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{Finger, Landmark};
    use crate::slot::FingerSlot;

    /// A full 21-point hand whose tip `i` (designated order) sits at
    /// x = 0.125 * (i+1), y = `base_y` + 0.0625 * i.  Dyadic steps keep the
    /// float comparisons exact.
    fn hand(h: Handedness, base_y: f32) -> HandObservation {
        let mut lms = vec![Landmark::new(0.5, 0.5); landmarks::COUNT];
        for (i, idx) in TipIndices::default().forward().enumerate() {
            lms[idx] = Landmark::new(0.125 * (i as f32 + 1.0), base_y + 0.0625 * i as f32);
        }
        HandObservation::new(h, lms)
    }

    #[test]
    fn no_hands_all_absent() {
        let f = map_frame(&[], 640, 480);
        assert_eq!(f, FingertipFrame::empty());
    }

    #[test]
    fn left_hand_fills_slots_0_to_4_pinky_first() {
        let f = map_frame(&[hand(Handedness::Left, 0.25)], 640, 480);
        // slot 0 = left pinky = designated tip 4
        assert_eq!(f.get(FingerSlot::ALL[0]).y_norm(), Some(0.5));
        assert_eq!(f.get(FingerSlot::ALL[0]).pixel(), Some((400, 240)));
        // slot 4 = left thumb = designated tip 0
        assert_eq!(f.get(FingerSlot::ALL[4]).y_norm(), Some(0.25));
        for s in &FingerSlot::ALL[5..] {
            assert_eq!(f.get(*s), FingertipSample::Absent);
        }
    }

    #[test]
    fn right_hand_fills_slots_5_to_9_thumb_first() {
        let f = map_frame(&[hand(Handedness::Right, 0.5)], 100, 100);
        assert_eq!(f.get(FingerSlot::ALL[5]).y_norm(), Some(0.5));
        assert_eq!(f.get(FingerSlot::of(Handedness::Right, Finger::Pinky)).y_norm(),
                   Some(0.75));
        for s in &FingerSlot::ALL[..5] {
            assert!(!f.get(*s).is_present());
        }
    }

    #[test]
    fn pixels_are_truncated() {
        let lms = {
            let mut v = vec![Landmark::default(); landmarks::COUNT];
            v[landmarks::THUMB_TIP] = Landmark::new(0.999, 0.5009);
            v
        };
        let f = map_frame(&[HandObservation::new(Handedness::Right, lms)], 640, 480);
        assert_eq!(f.get(FingerSlot::ALL[5]).pixel(), Some((639, 240)));
    }

    #[test]
    fn input_order_of_hands_does_not_matter() {
        let l = hand(Handedness::Left, 0.2);
        let r = hand(Handedness::Right, 0.7);
        assert_eq!(
            map_frame(&[l.clone(), r.clone()], 640, 480),
            map_frame(&[r, l], 640, 480),
        );
    }

    #[test]
    fn duplicate_label_last_wins_by_default() {
        let first  = hand(Handedness::Left, 0.125);
        let second = hand(Handedness::Left, 0.5);
        let f = map_frame(&[first, second], 640, 480);
        assert_eq!(f.get(FingerSlot::ALL[4]).y_norm(), Some(0.5));
        assert_eq!(f.present_count(), 5);
    }

    #[test]
    fn duplicate_label_first_wins_when_configured() {
        let layout = SlotLayout { duplicates: DuplicateHandPolicy::FirstWins, ..Default::default() };
        let f = layout.map(&[hand(Handedness::Left, 0.125), hand(Handedness::Left, 0.5)], 640, 480);
        assert_eq!(f.get(FingerSlot::ALL[4]).y_norm(), Some(0.125));
    }

    #[test]
    fn unlabelled_hand_is_ignored() {
        let mut h = hand(Handedness::Right, 0.4);
        h.handedness = None;
        assert_eq!(map_frame(&[h], 640, 480), FingertipFrame::empty());
    }

    #[test]
    fn short_landmark_list_yields_absent_tips() {
        // Only thumb (4) and index (8) tips exist.
        let h = HandObservation::new(Handedness::Right, vec![Landmark::new(0.5, 0.5); 9]);
        let f = map_frame(&[h], 640, 480);
        assert!(f.get(FingerSlot::ALL[5]).is_present());
        assert!(f.get(FingerSlot::ALL[6]).is_present());
        assert!(!f.get(FingerSlot::ALL[7]).is_present());
        assert_eq!(f.present_count(), 2);
    }

    #[test]
    fn non_finite_tip_is_absent() {
        let mut h = hand(Handedness::Right, 0.4);
        h.landmarks[landmarks::INDEX_TIP] = Landmark::new(f32::NAN, 0.4);
        let f = map_frame(&[h], 640, 480);
        assert!(!f.get(FingerSlot::ALL[6]).is_present());
        assert_eq!(f.present_count(), 4);
    }

    #[test]
    fn custom_tip_indices_are_honoured() {
        let layout = SlotLayout { tips: TipIndices([3, 7, 11, 15, 19]), ..Default::default() };
        let mut lms = vec![Landmark::new(0.5, 0.9); landmarks::COUNT];
        lms[3] = Landmark::new(0.5, 0.1);
        let f = layout.map(&[HandObservation::new(Handedness::Right, lms)], 10, 10);
        assert_eq!(f.get(FingerSlot::ALL[5]).y_norm(), Some(0.1));
    }

    #[test]
    fn mapping_is_pure() {
        let hands = [hand(Handedness::Left, 0.2), hand(Handedness::Right, 0.3)];
        assert_eq!(map_frame(&hands, 1280, 720), map_frame(&hands, 1280, 720));
    }
}
