//! Hand sources: where per-frame landmark observations come from.
//!
//! The public interface is [`DetectionFrame`] delivered over an `mpsc`
//! channel, in detector order.  The session loop does not care whether the
//! frames come from a detector process, a recording, or the keyboard.
//!
//! ## Wire format
//!
//! One JSON object per line:
//!
//! ```text
//! {"width":640,"height":480,"t":1.25,
//!  "hands":[{"handedness":"Left","score":0.97,
//!            "landmarks":[{"x":0.41,"y":0.62,"z":-0.03}, ...]}]}
//! ```
//!
//! `t` (seconds) is optional.  A `null` coordinate marks a landmark the
//! detector could not place.  A line with an `"error"` field counts as a
//! frame with no hands.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Stdin};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use finger_slots::{
    landmarks, FingerSlot, Finger, HandObservation, Handedness, Landmark, TipIndices, SLOT_COUNT,
};

use crate::error::{PianoError, Result};

// ════════════════════════════════════════════════════════════════════════════
// DetectionFrame
// ════════════════════════════════════════════════════════════════════════════

/// Everything the detector reported for one camera frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionFrame {
    pub width:     u32,
    pub height:    u32,
    /// Capture time, when the detector supplies one.
    pub timestamp: Option<Duration>,
    pub hands:     Vec<HandObservation>,
}

impl DetectionFrame {
    pub fn new(width: u32, height: u32, hands: Vec<HandObservation>) -> Self {
        DetectionFrame { width, height, timestamp: None, hands }
    }

    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

// ── JSON shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireFrame {
    width:  u32,
    height: u32,
    #[serde(default)]
    t:      Option<f64>,
    #[serde(default)]
    hands:  Vec<WireHand>,
    #[serde(default)]
    error:  Option<String>,
}

#[derive(Deserialize)]
struct WireHand {
    #[serde(default)]
    handedness: Option<String>,
    #[serde(default)]
    score:      Option<f32>,
    #[serde(default)]
    landmarks:  Vec<WireLandmark>,
}

#[derive(Deserialize)]
struct WireLandmark {
    x: Option<f32>,
    y: Option<f32>,
    #[serde(default)]
    z: Option<f32>,
}

/// Parse one line of the wire format.  Hands scored below `min_score` are
/// dropped; a hand without a score is kept.
pub fn parse_frame(line: &str, min_score: f32) -> serde_json::Result<DetectionFrame> {
    let wire: WireFrame = serde_json::from_str(line)?;

    let hands = match &wire.error {
        Some(err) => {
            warn!(error = %err, "detector reported an error");
            Vec::new()
        }
        None => wire.hands.into_iter()
            .filter(|h| h.score.map_or(true, |s| s >= min_score))
            .map(|h| HandObservation {
                handedness: h.handedness.as_deref().and_then(Handedness::from_label),
                landmarks:  h.landmarks.into_iter()
                    .map(|lm| Landmark {
                        x: lm.x.unwrap_or(f32::NAN),
                        y: lm.y.unwrap_or(f32::NAN),
                        z: lm.z.unwrap_or(0.0),
                    })
                    .collect(),
            })
            .collect(),
    };

    let frame = DetectionFrame::new(wire.width, wire.height, hands);
    Ok(match wire.t.and_then(|t| Duration::try_from_secs_f64(t).ok()) {
        Some(t) => frame.at(t),
        None    => frame,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`DetectionFrame`]s over a channel.
pub trait HandSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<DetectionFrame>);
}

/// Spawn a hand source on its own thread and return the receiving end.
/// The channel disconnects when the source runs dry.
pub fn spawn_hand_source<S: HandSource>(source: S) -> Receiver<DetectionFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource: stdin or a recording
// ════════════════════════════════════════════════════════════════════════════

/// Frames read from any line-oriented reader.
pub struct JsonLinesSource<R> {
    reader:    R,
    label:     String,
    min_score: f32,
    paced:     bool,
}

impl<R: BufRead + Send + 'static> JsonLinesSource<R> {
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        JsonLinesSource { reader, label: label.into(), min_score: 0.0, paced: false }
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Replay at the speed the frames were captured (by their `t`) instead
    /// of as fast as they can be read.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        JsonLinesSource::new(BufReader::new(io::stdin()), "stdin")
    }
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|source| PianoError::Input { path: path.to_path_buf(), source })?;
        Ok(JsonLinesSource::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead + Send + 'static> HandSource for JsonLinesSource<R> {
    fn run(self: Box<Self>, tx: Sender<DetectionFrame>) {
        let JsonLinesSource { reader, label, min_score, paced } = *self;
        pump_lines(reader, &label, min_score, paced, &tx);
    }
}

/// Forward every parsable line to `tx` until EOF, a read error, or the
/// receiver hanging up.
fn pump_lines<R: BufRead>(
    reader:    R,
    label:     &str,
    min_score: f32,
    paced:     bool,
    tx:        &Sender<DetectionFrame>,
) {
    let mut sent = 0usize;
    let mut skipped = 0usize;
    let mut clock: Option<(Instant, Duration)> = None;

    for (n, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l)  => l,
            Err(e) => {
                warn!(input = label, error = %e, "read failed; stopping");
                break;
            }
        };
        if line.trim().is_empty() { continue; }

        let frame = match parse_frame(&line, min_score) {
            Ok(f)  => f,
            Err(e) => {
                skipped += 1;
                debug!(input = label, line = n + 1, error = %e, "skipping unparsable line");
                continue;
            }
        };

        if paced {
            if let Some(t) = frame.timestamp {
                let (start, t0) = *clock.get_or_insert((Instant::now(), t));
                let due = start + t.saturating_sub(t0);
                let wait = due.saturating_duration_since(Instant::now());
                if !wait.is_zero() { thread::sleep(wait); }
            }
        }

        if tx.send(frame).is_err() { return; }
        sent += 1;
    }

    info!(input = label, frames = sent, skipped, "hand source ended");
}

// ════════════════════════════════════════════════════════════════════════════
// DetectorProcess: an external landmark detector
// ════════════════════════════════════════════════════════════════════════════

/// Kills the detector when dropped.  Hold one for as long as frames are
/// wanted; every clone kills the same child.
#[derive(Clone)]
pub struct DetectorGuard {
    child: Arc<Mutex<Child>>,
}

impl Drop for DetectorGuard {
    fn drop(&mut self) {
        let Ok(mut child) = self.child.lock() else { return };
        if let Ok(None) = child.try_wait() {
            debug!(pid = child.id(), "stopping detector");
            let _ = child.kill();
        }
        let _ = child.wait();
    }
}

/// A child process speaking the wire format on its stdout.
pub struct DetectorProcess {
    stdout:    Option<ChildStdout>,
    guard:     DetectorGuard,
    command:   String,
    min_score: f32,
}

impl DetectorProcess {
    /// Start `command[0]` with the remaining elements as arguments.
    pub fn spawn(command: &[String], min_score: f32) -> Result<Self> {
        let command_line = command.join(" ");
        let Some((program, args)) = command.split_first() else {
            return Err(PianoError::InvalidArg { flag: "detector", reason: "empty command".into() });
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| PianoError::DetectorSpawn { command: command_line.clone(), source })?;

        info!(pid = child.id(), command = %command_line, "detector started");
        Ok(DetectorProcess {
            stdout:  child.stdout.take(),
            guard:   DetectorGuard { child: Arc::new(Mutex::new(child)) },
            command: command_line,
            min_score,
        })
    }

    pub fn guard(&self) -> DetectorGuard { self.guard.clone() }
}

impl HandSource for DetectorProcess {
    fn run(mut self: Box<Self>, tx: Sender<DetectionFrame>) {
        let Some(stdout) = self.stdout.take() else { return };
        pump_lines(BufReader::new(stdout), &self.command, self.min_score, false, &tx);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    FingerDown(FingerSlot),
    FingerUp(FingerSlot),
}

pub const SIM_WIDTH:  u32 = 640;
pub const SIM_HEIGHT: u32 = 480;
/// How far a held key lowers its fingertip (fraction of frame height).
pub const SIM_PRESS:  f32 = 0.15;
const SIM_PERIOD:     Duration = Duration::from_millis(16);

/// Two synthetic resting hands, driven by [`SimInput`] events from the
/// visualizer.  Emits a frame every ~16 ms until the input side hangs up.
pub struct SimHandSource {
    rx: Receiver<SimInput>,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandSource { rx }
    }
}

impl HandSource for SimHandSource {
    fn run(self: Box<Self>, tx: Sender<DetectionFrame>) {
        let mut held = [false; SLOT_COUNT];
        loop {
            loop {
                match self.rx.try_recv() {
                    Ok(SimInput::FingerDown(slot)) => held[slot.index()] = true,
                    Ok(SimInput::FingerUp(slot))   => held[slot.index()] = false,
                    Err(TryRecvError::Empty)        => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            if tx.send(sim_frame(&held)).is_err() { return; }
            thread::sleep(SIM_PERIOD);
        }
    }
}

/// Resting position of a slot's fingertip in the simulated image.
fn sim_rest(slot: FingerSlot) -> (f32, f32) {
    let i = slot.index() as f32;
    let x = if slot.index() < 5 { 0.10 + 0.08 * i } else { 0.18 + 0.08 * i };
    let y = if slot.finger() == Finger::Thumb { 0.55 } else { 0.45 };
    (x, y)
}

/// One simulated frame with `held[i]` lowering slot `i`.
pub fn sim_frame(held: &[bool; SLOT_COUNT]) -> DetectionFrame {
    let tips = TipIndices::default();
    let hands = Handedness::BOTH.iter().map(|&hand| {
        let wrist_x = if hand == Handedness::Left { 0.26 } else { 0.74 };
        let mut points = vec![Landmark::new(wrist_x, 0.85); landmarks::COUNT];
        for finger in Finger::ALL {
            let slot = FingerSlot::of(hand, finger);
            let (x, y) = sim_rest(slot);
            let press = if held[slot.index()] { SIM_PRESS } else { 0.0 };
            points[tips.0[finger.ordinal()]] = Landmark::new(x, y + press);
        }
        HandObservation::new(hand, points)
    }).collect();

    DetectionFrame::new(SIM_WIDTH, SIM_HEIGHT, hands)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
