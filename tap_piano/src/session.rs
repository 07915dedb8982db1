//! One playing session: frames in, notes out.
//!
//! Per frame: mirror (optional) → map to ten slots → trigger engine →
//! sound bank, plus the take recorder when `--record` is on.  All of it runs
//! on the caller's thread; nothing here blocks.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use finger_slots::{FingerSlot, FingertipFrame, HandObservation, SlotLayout, SLOT_COUNT};
use note_bank::{SoundBank, TakeRecorder};
use tap_trigger::{NoteTable, TriggerEngine, TriggerEvent};

use crate::config::AppConfig;
use crate::error::Result;
use crate::hands::DetectionFrame;

/// How long a slot stays lit after it fires.
pub const FLASH_TIME: Duration = Duration::from_millis(250);

/// Where session time comes from, fixed by the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimeBase {
    /// The detector's own capture time, `t` on the wire.
    Capture,
    /// When the frame reached us.
    Arrival,
}

/// What a finished session did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames:   u64,
    pub triggers: u64,
    /// Where the take was written, with its note count.
    pub take:     Option<(PathBuf, usize)>,
}

pub struct Session {
    layout:  SlotLayout,
    mirror:  bool,
    engine:  TriggerEngine,
    bank:    Box<dyn SoundBank>,
    take:    Option<(PathBuf, TakeRecorder)>,

    /// Latest session time handed to the engine.  Never decreases.
    clock:         Option<Duration>,
    time_base:     Option<TimeBase>,
    last_received: Duration,
    mixed_warned:  bool,

    // ── for the overlay ───────────────────────────────────────────────────
    fingertips: FingertipFrame,
    frame_size: (u32, u32),
    flashes:    [Option<Duration>; SLOT_COUNT],
    last_event: Option<TriggerEvent>,

    frames:   u64,
    triggers: u64,
}

impl Session {
    pub fn new(cfg: &AppConfig, bank: Box<dyn SoundBank>) -> Result<Self> {
        let engine = TriggerEngine::new(cfg.trigger, cfg.notes.clone())?;
        let take = cfg.record.as_ref()
            .map(|path| (path.clone(), TakeRecorder::new(&cfg.notes, &cfg.midi)));

        Ok(Session {
            layout: cfg.layout,
            mirror: cfg.mirror,
            engine,
            bank,
            take,
            clock:      None,
            time_base:  None,
            last_received: Duration::ZERO,
            mixed_warned:  false,
            fingertips: FingertipFrame::empty(),
            frame_size: (0, 0),
            flashes:    [None; SLOT_COUNT],
            last_event: None,
            frames:     0,
            triggers:   0,
        })
    }

    /// Feed one detector frame.  `received` is when it arrived.
    ///
    /// The first frame picks the time base: its capture time if it has one,
    /// otherwise arrival time.  Frames that don't fit the chosen base move
    /// the clock on by the arrival gap instead.
    pub fn process(&mut self, frame: &DetectionFrame, received: Duration) -> Vec<TriggerEvent> {
        let now = self.session_time(frame.timestamp, received);

        let mirrored: Vec<HandObservation>;
        let hands = if self.mirror {
            mirrored = frame.hands.iter().map(HandObservation::mirrored).collect();
            &mirrored
        } else {
            &frame.hands
        };

        self.fingertips = self.layout.map(hands, frame.width, frame.height);
        self.frame_size = (frame.width, frame.height);
        self.frames += 1;

        let events = self.engine.update(&self.fingertips, now);
        for ev in &events {
            debug!(slot = %ev.slot, note = %ev.note, t = now.as_secs_f64(), "tap");
            self.bank.play(&ev.note);
            if let Some((_, rec)) = &mut self.take {
                rec.record(now, &ev.note);
            }
            self.flashes[ev.slot.index()] = Some(now);
            self.triggers += 1;
        }
        if let Some(last) = events.last() {
            self.last_event = Some(last.clone());
        }
        events
    }

    fn session_time(&mut self, timestamp: Option<Duration>, received: Duration) -> Duration {
        let base = *self.time_base.get_or_insert(match timestamp {
            Some(_) => TimeBase::Capture,
            None    => TimeBase::Arrival,
        });
        let t = match (base, timestamp) {
            (TimeBase::Capture, Some(t)) => t,
            (TimeBase::Arrival, None)    => received,
            (TimeBase::Capture, None)    => {
                self.warn_mixed_time(base);
                self.clock.unwrap_or_default() + received.saturating_sub(self.last_received)
            }
            (TimeBase::Arrival, Some(_)) => {
                self.warn_mixed_time(base);
                received
            }
        };
        self.last_received = received;
        self.advance_clock(t)
    }

    fn warn_mixed_time(&mut self, base: TimeBase) {
        if !self.mixed_warned {
            self.mixed_warned = true;
            warn!(?base, "source mixes frames with and without timestamps; \
                          following arrival time for the odd ones");
        }
    }

    fn advance_clock(&mut self, t: Duration) -> Duration {
        let now = match self.clock {
            Some(last) if t < last => {
                debug!(t = t.as_secs_f64(), last = last.as_secs_f64(), "timestamp went backwards");
                last
            }
            _ => t,
        };
        self.clock = Some(now);
        now
    }

    /// Write the take, if recording, and release the sound bank.
    pub fn finish(self) -> Result<SessionSummary> {
        let take = match self.take {
            Some((path, rec)) => {
                rec.write_file(&path)?;
                info!(path = %path.display(), notes = rec.len(), "take written");
                Some((path, rec.len()))
            }
            None => None,
        };
        info!(frames = self.frames, taps = self.triggers, "session finished");
        Ok(SessionSummary { frames: self.frames, triggers: self.triggers, take })
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn fingertips(&self) -> &FingertipFrame    { &self.fingertips }
    pub fn frame_size(&self) -> (u32, u32)         { self.frame_size }
    pub fn notes(&self)      -> &NoteTable         { self.engine.notes() }
    pub fn now(&self)        -> Option<Duration>   { self.clock }
    pub fn frames(&self)     -> u64                { self.frames }
    pub fn triggers(&self)   -> u64                { self.triggers }
    pub fn last_event(&self) -> Option<&TriggerEvent> { self.last_event.as_ref() }

    /// 1.0 right after `slot` fired, fading to 0.0 over [`FLASH_TIME`].
    pub fn flash(&self, slot: FingerSlot) -> f32 {
        match (self.flashes[slot.index()], self.clock) {
            (Some(at), Some(now)) => {
                let age = now.saturating_sub(at);
                (1.0 - age.as_secs_f32() / FLASH_TIME.as_secs_f32()).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// One-line summary for the status bar.
    pub fn status(&self) -> String {
        let hands = self.fingertips.present_count();
        match &self.last_event {
            Some(ev) => format!(
                "{} <- {}   taps={}  frames={}  tips={}",
                ev.note, ev.slot, self.triggers, self.frames, hands
            ),
            None => format!("waiting for a tap   frames={}  tips={}", self.frames, hands),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use finger_slots::{landmarks, Handedness, Landmark};
    use note_bank::CaptureBank;

    fn left_pinky_at(y: f32) -> Vec<HandObservation> {
        let mut points = vec![Landmark::new(0.5, 0.5); landmarks::COUNT];
        points[landmarks::PINKY_TIP] = Landmark::new(0.25, y);
        vec![HandObservation::new(Handedness::Left, points)]
    }

    fn session() -> (Session, CaptureBank) {
        let bank = CaptureBank::new();
        let s = Session::new(&AppConfig::default(), Box::new(bank.clone())).unwrap();
        (s, bank)
    }

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    #[test]
    fn downward_tap_plays_the_slot_note() {
        let (mut s, bank) = session();
        assert!(s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.25)), ms(0)).is_empty());
        let events = s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.5)), ms(33));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].slot, FingerSlot::ALL[0]);
        assert_eq!(bank.snapshot().iter().map(|n| n.as_str()).collect::<Vec<_>>(), ["A4"]);
        assert_eq!(s.triggers(), 1);
        assert_eq!(s.frames(), 2);
        assert!(s.status().starts_with("A4 <- Left pinky"));
    }

    #[test]
    fn frame_timestamp_wins_over_receive_time() {
        let (mut s, _) = session();
        s.process(&DetectionFrame::new(640, 480, vec![]).at(ms(5_000)), ms(10));
        assert_eq!(s.now(), Some(ms(5_000)));
        s.process(&DetectionFrame::new(640, 480, vec![]).at(ms(5_040)), ms(20));
        assert_eq!(s.now(), Some(ms(5_040)));
    }

    #[test]
    fn missing_timestamps_advance_by_arrival_gap() {
        let (mut s, bank) = session();
        s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.25)).at(ms(5_000)), ms(0));
        assert_eq!(s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.5)).at(ms(5_033)), ms(33)).len(), 1);

        // The source stops sending `t`; the clock keeps moving with arrival.
        s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.25)), ms(100));
        assert_eq!(s.now(), Some(ms(5_100)));
        let again = s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.5)), ms(400));
        assert_eq!(s.now(), Some(ms(5_400)));
        assert_eq!(again.len(), 1, "cooldown elapsed on the arrival clock");
        assert_eq!(bank.snapshot().len(), 2);
    }

    #[test]
    fn arrival_base_ignores_later_timestamps() {
        let (mut s, _) = session();
        s.process(&DetectionFrame::new(640, 480, vec![]), ms(10));
        s.process(&DetectionFrame::new(640, 480, vec![]).at(ms(1_000_000)), ms(50));
        assert_eq!(s.now(), Some(ms(50)));
    }

    #[test]
    fn clock_never_runs_backwards() {
        let (mut s, _) = session();
        s.process(&DetectionFrame::new(640, 480, vec![]).at(ms(1_000)), ms(0));
        s.process(&DetectionFrame::new(640, 480, vec![]).at(ms(500)), ms(0));
        assert_eq!(s.now(), Some(ms(1_000)));
    }

    #[test]
    fn mirror_swaps_hands() {
        let bank = CaptureBank::new();
        let cfg = AppConfig { mirror: true, ..AppConfig::default() };
        let mut s = Session::new(&cfg, Box::new(bank.clone())).unwrap();

        // A left pinky in the raw image is the right pinky once mirrored.
        s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.25)), ms(0));
        let events = s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.5)), ms(33));
        assert_eq!(events[0].slot, FingerSlot::ALL[9]);
        assert_eq!(events[0].note.as_str(), "G4");
        assert_eq!(s.fingertips().get(FingerSlot::ALL[9]).pixel(), Some((480, 240)));
    }

    #[test]
    fn flash_fades() {
        let (mut s, _) = session();
        let pinky = FingerSlot::ALL[0];
        assert_eq!(s.flash(pinky), 0.0);

        s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.25)), ms(0));
        s.process(&DetectionFrame::new(640, 480, left_pinky_at(0.5)), ms(100));
        assert_eq!(s.flash(pinky), 1.0);

        s.process(&DetectionFrame::new(640, 480, vec![]), ms(100) + FLASH_TIME);
        assert_eq!(s.flash(pinky), 0.0);
    }

    #[test]
    fn finish_without_recording() {
        let (s, _) = session();
        let summary = s.finish().unwrap();
        assert_eq!(summary, SessionSummary { frames: 0, triggers: 0, take: None });
    }
}
