//! The motion trigger engine.
//!
//! One independent state machine per slot.  Each frame, for each slot:
//!
//! ```text
//!   Absent or non-finite y → forget smoothed y, no event
//!   Present, no history    → smoothed y = raw y, no event
//!   Present, with history  → y' = α·y + (1−α)·smoothed
//!                            Δ  = y' − smoothed           (positive = downward)
//!                            Δ > threshold ∧ cooled down → event, stamp time
//!                            smoothed = y'
//! ```
//!
//! Forgetting on absence means a hand that leaves and re-enters the frame
//! starts from scratch instead of producing one large jump.

use std::time::Duration;

use finger_slots::{FingerSlot, FingertipFrame, FingertipSample, SLOT_COUNT};

use crate::config::TriggerConfig;
use crate::error::Result;
use crate::notes::{NoteName, NoteTable};

// ════════════════════════════════════════════════════════════════════════════
// TriggerEvent
// ════════════════════════════════════════════════════════════════════════════

/// A tap was detected on `slot`; play `note`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerEvent {
    pub slot: FingerSlot,
    pub note: NoteName,
}

// ════════════════════════════════════════════════════════════════════════════
// SlotState
// ════════════════════════════════════════════════════════════════════════════

/// Per-slot memory carried from one frame to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlotState {
    smoothed_y:   Option<f32>,
    last_trigger: Option<Duration>,
}

impl SlotState {
    /// Smoothed normalised y of the last present sample, `None` after an
    /// absent frame.
    pub fn smoothed_y(&self) -> Option<f32> { self.smoothed_y }

    /// Time of the last trigger, `None` if the slot never fired.
    pub fn last_trigger(&self) -> Option<Duration> { self.last_trigger }

    /// Advance by one frame.  Returns `true` when the slot fires.
    pub fn step(&mut self, sample: FingertipSample, now: Duration, config: &TriggerConfig) -> bool {
        let Some(y) = sample.y_norm().filter(|y| y.is_finite()) else {
            self.smoothed_y = None;
            return false;
        };

        let Some(prev) = self.smoothed_y else {
            self.smoothed_y = Some(y);
            return false;
        };

        let next  = config.alpha * y + (1.0 - config.alpha) * prev;
        let delta = next - prev;
        self.smoothed_y = Some(next);

        if delta > config.threshold && self.cooled_down(now, config.cooldown) {
            self.last_trigger = Some(now);
            return true;
        }
        false
    }

    fn cooled_down(&self, now: Duration, cooldown: Duration) -> bool {
        match self.last_trigger {
            Some(t) => now.saturating_sub(t) >= cooldown,
            None    => true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// update: the per-frame operation
// ════════════════════════════════════════════════════════════════════════════

/// Advance every slot by one frame and collect the triggers, in slot order.
pub fn update(
    states: &mut [SlotState; SLOT_COUNT],
    frame:  &FingertipFrame,
    now:    Duration,
    config: &TriggerConfig,
    notes:  &NoteTable,
) -> Vec<TriggerEvent> {
    let mut events = Vec::new();
    for (slot, sample) in frame.iter() {
        if states[slot.index()].step(sample, now, config) {
            events.push(TriggerEvent { slot, note: notes.note(slot).clone() });
        }
    }
    events
}

// ════════════════════════════════════════════════════════════════════════════
// TriggerEngine
// ════════════════════════════════════════════════════════════════════════════

/// Owns the ten slot states together with their configuration and notes.
#[derive(Clone, Debug)]
pub struct TriggerEngine {
    config: TriggerConfig,
    notes:  NoteTable,
    states: [SlotState; SLOT_COUNT],
}

impl TriggerEngine {
    /// Validate `config` and start with every slot empty.
    pub fn new(config: TriggerConfig, notes: NoteTable) -> Result<Self> {
        config.validate()?;
        Ok(TriggerEngine { config, notes, states: [SlotState::default(); SLOT_COUNT] })
    }

    /// Process one frame captured at `now` (monotonic, relative to any fixed
    /// epoch).
    pub fn update(&mut self, frame: &FingertipFrame, now: Duration) -> Vec<TriggerEvent> {
        update(&mut self.states, frame, now, &self.config, &self.notes)
    }

    pub fn state(&self, slot: FingerSlot) -> &SlotState { &self.states[slot.index()] }
    pub fn notes(&self) -> &NoteTable                    { &self.notes }

    /// Forget all history, as if every slot had just been absent and had
    /// never fired.
    pub fn reset(&mut self) {
        self.states = [SlotState::default(); SLOT_COUNT];
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn secs(s: f64) -> Duration { Duration::from_secs_f64(s) }

    fn present(y: f32) -> FingertipSample {
        FingertipSample::Present { x_px: 0, y_px: (y * 480.0) as i32, y_norm: y }
    }

    /// Frame with only `slot` present at `y`.
    fn only(slot: usize, y: f32) -> FingertipFrame {
        let mut f = FingertipFrame::empty();
        f.set(FingerSlot::ALL[slot], present(y));
        f
    }

    fn engine() -> TriggerEngine {
        TriggerEngine::new(TriggerConfig::default(), NoteTable::default()).unwrap()
    }

    #[test]
    fn absent_slot_resets_and_stays_silent() {
        let mut e = engine();
        e.update(&only(3, 0.4), secs(0.0));
        assert!(e.state(FingerSlot::ALL[3]).smoothed_y().is_some());

        let ev = e.update(&FingertipFrame::empty(), secs(0.1));
        assert!(ev.is_empty());
        for s in FingerSlot::ALL {
            assert_eq!(e.state(s).smoothed_y(), None);
        }
    }

    #[test]
    fn non_finite_sample_resets_like_absence() {
        let mut e = engine();
        e.update(&only(0, 0.1), secs(0.0));
        assert_eq!(e.update(&only(0, 0.3), secs(0.02)).len(), 1);
        e.update(&only(0, 0.6), secs(0.20));

        assert!(e.update(&only(0, f32::NAN), secs(1.0)).is_empty());
        assert_eq!(e.state(FingerSlot::ALL[0]).smoothed_y(), None);

        // The next sample bootstraps; the one after can fire again.
        assert!(e.update(&only(0, 0.5), secs(2.0)).is_empty());
        assert_eq!(e.state(FingerSlot::ALL[0]).smoothed_y(), Some(0.5));
        assert_eq!(e.update(&only(0, 0.9), secs(2.1)).len(), 1);

        assert!(e.update(&only(0, f32::INFINITY), secs(3.0)).is_empty());
        assert_eq!(e.state(FingerSlot::ALL[0]).smoothed_y(), None);
    }

    #[test]
    fn first_sample_bootstraps_without_trigger() {
        let mut e = engine();
        assert!(e.update(&only(0, 0.9), secs(0.0)).is_empty());
        assert_eq!(e.state(FingerSlot::ALL[0]).smoothed_y(), Some(0.9));
    }

    #[test]
    fn reentry_after_absence_never_triggers() {
        let mut e = engine();
        e.update(&only(2, 0.1), secs(0.0));
        e.update(&FingertipFrame::empty(), secs(0.5));
        // Large jump relative to the last known position, but history is gone.
        assert!(e.update(&only(2, 0.9), secs(1.0)).is_empty());
        assert_eq!(e.state(FingerSlot::ALL[2]).smoothed_y(), Some(0.9));
    }

    #[test]
    fn ema_and_delta_worked_example() {
        let mut e = engine();
        e.update(&only(5, 0.40), secs(0.0));
        assert_eq!(e.state(FingerSlot::ALL[5]).smoothed_y(), Some(0.40));

        let ev = e.update(&only(5, 0.50), secs(0.033));
        let y = e.state(FingerSlot::ALL[5]).smoothed_y().unwrap();
        assert!((y - 0.46).abs() < EPS, "smoothed y = {}", y);
        assert_eq!(ev, vec![TriggerEvent {
            slot: FingerSlot::ALL[5],
            note: NoteTable::default().note(FingerSlot::ALL[5]).clone(),
        }]);
        assert_eq!(e.state(FingerSlot::ALL[5]).last_trigger(), Some(secs(0.033)));
    }

    #[test]
    fn cooldown_blocks_then_allows_retrigger() {
        let mut e = engine();
        e.update(&only(1, 0.10), secs(0.0));
        assert_eq!(e.update(&only(1, 0.30), secs(1.00)).len(), 1);

        // 0.05 s later, still moving down fast: blocked.
        assert!(e.update(&only(1, 0.60), secs(1.05)).is_empty());
        // 0.20 s after the trigger: fires again.
        assert_eq!(e.update(&only(1, 0.90), secs(1.20)).len(), 1);
    }

    #[test]
    fn state_advances_even_when_cooldown_blocks() {
        let mut e = engine();
        e.update(&only(1, 0.10), secs(0.0));
        e.update(&only(1, 0.30), secs(0.01));
        let before = e.state(FingerSlot::ALL[1]).smoothed_y().unwrap();
        e.update(&only(1, 0.60), secs(0.02));
        let after = e.state(FingerSlot::ALL[1]).smoothed_y().unwrap();
        assert!(after > before);
        assert_eq!(e.state(FingerSlot::ALL[1]).last_trigger(), Some(secs(0.01)));
    }

    #[test]
    fn upward_motion_never_triggers() {
        let mut e = engine();
        e.update(&only(7, 0.9), secs(0.0));
        assert!(e.update(&only(7, 0.1), secs(1.0)).is_empty());
    }

    #[test]
    fn small_motion_below_threshold_is_ignored() {
        let mut e = engine();
        e.update(&only(7, 0.50), secs(0.0));
        // Δ = 0.6 * 0.04 = 0.024 < 0.03
        assert!(e.update(&only(7, 0.54), secs(1.0)).is_empty());
    }

    #[test]
    fn exactly_cooldown_later_is_allowed() {
        let cfg = TriggerConfig::default().cooldown(Duration::from_millis(200));
        let mut e = TriggerEngine::new(cfg, NoteTable::default()).unwrap();
        e.update(&only(0, 0.1), Duration::from_millis(0));
        assert_eq!(e.update(&only(0, 0.3), Duration::from_millis(100)).len(), 1);
        assert_eq!(e.update(&only(0, 0.6), Duration::from_millis(300)).len(), 1);
    }

    #[test]
    fn slots_are_independent() {
        let mut e = engine();
        let mut a = FingertipFrame::empty();
        a.set(FingerSlot::ALL[0], present(0.2));
        a.set(FingerSlot::ALL[9], present(0.2));
        e.update(&a, secs(0.0));

        let mut b = FingertipFrame::empty();
        b.set(FingerSlot::ALL[0], present(0.5));   // taps
        b.set(FingerSlot::ALL[9], present(0.2));   // holds still
        let ev = e.update(&b, secs(0.1));
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].slot, FingerSlot::ALL[0]);
        assert_eq!(ev[0].note.as_str(), "A4");
    }

    #[test]
    fn simultaneous_taps_are_reported_in_slot_order() {
        let mut e = engine();
        let down = |y| FingertipFrame::from_samples(std::iter::repeat(present(y)).take(SLOT_COUNT));
        e.update(&down(0.2), secs(0.0));
        let ev = e.update(&down(0.6), secs(0.1));
        let slots: Vec<usize> = ev.iter().map(|t| t.slot.index()).collect();
        assert_eq!(slots, (0..SLOT_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn alpha_one_means_raw_samples() {
        let cfg = TriggerConfig::default().alpha(1.0);
        let mut e = TriggerEngine::new(cfg, NoteTable::default()).unwrap();
        e.update(&only(4, 0.25), secs(0.0));
        e.update(&only(4, 0.5), secs(0.1));
        assert_eq!(e.state(FingerSlot::ALL[4]).smoothed_y(), Some(0.5));
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let cfg = TriggerConfig::default().alpha(0.0);
        assert!(TriggerEngine::new(cfg, NoteTable::default()).is_err());
    }

    #[test]
    fn reset_forgets_cooldown() {
        let mut e = engine();
        e.update(&only(6, 0.1), secs(0.0));
        e.update(&only(6, 0.5), secs(0.01));
        e.reset();
        assert_eq!(e.state(FingerSlot::ALL[6]).last_trigger(), None);
        e.update(&only(6, 0.1), secs(0.02));
        assert_eq!(e.update(&only(6, 0.5), secs(0.03)).len(), 1);
    }

    #[test]
    fn free_function_matches_engine() {
        let cfg   = TriggerConfig::default();
        let notes = NoteTable::default();
        let mut states = [SlotState::default(); SLOT_COUNT];
        update(&mut states, &only(8, 0.2), secs(0.0), &cfg, &notes);
        let ev = update(&mut states, &only(8, 0.4), secs(0.05), &cfg, &notes);
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].note.as_str(), "F4");
    }
}
