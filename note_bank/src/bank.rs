//! Sound banks: where trigger events become sound.
//!
//! Binding happens once, at startup: each configured [`NoteName`] is resolved
//! to a MIDI pitch.  After that [`SoundBank::play`] is fire-and-forget; a
//! note with no binding is silently skipped.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tap_trigger::{NoteName, NoteTable};
use tracing::{debug, info, warn};

use crate::error::{BankError, Result};
use crate::pitch::{pitch_for, GeneralMidi};
use crate::take::NOTE_LENGTH;

// ════════════════════════════════════════════════════════════════════════════
// SoundBank
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can sound a note.  Must not block.
pub trait SoundBank {
    fn play(&mut self, note: &NoteName);

    /// Whether `play(note)` would make a sound.
    fn is_bound(&self, note: &NoteName) -> bool;
}

/// Plays nothing.  Used when no MIDI output is available.
#[derive(Debug, Default)]
pub struct NullSoundBank;

impl SoundBank for NullSoundBank {
    fn play(&mut self, _note: &NoteName) {}
    fn is_bound(&self, _note: &NoteName) -> bool { false }
}

/// Remembers every note it was asked to play.  The list is shared, so a
/// clone of [`CaptureBank::played`] can be kept after the bank is boxed.
#[derive(Debug, Default, Clone)]
pub struct CaptureBank {
    played: Arc<Mutex<Vec<NoteName>>>,
}

impl CaptureBank {
    pub fn new() -> Self { Self::default() }

    pub fn played(&self) -> Arc<Mutex<Vec<NoteName>>> { Arc::clone(&self.played) }

    /// Snapshot of everything played so far.
    pub fn snapshot(&self) -> Vec<NoteName> {
        self.played.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl SoundBank for CaptureBank {
    fn play(&mut self, note: &NoteName) {
        if let Ok(mut v) = self.played.lock() {
            v.push(note.clone());
        }
    }
    fn is_bound(&self, _note: &NoteName) -> bool { true }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiSettings
// ════════════════════════════════════════════════════════════════════════════

/// How the MIDI bank connects and sounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// Set to false to run silently.
    pub enabled:    bool,
    /// Substring of the output port name.  When set, failing to find it is
    /// an error instead of a silent fallback.
    pub port:       Option<String>,
    /// General MIDI program (0–127).
    pub instrument: u8,
    /// Fixed note-on velocity (0–127).
    pub velocity:   u8,
    /// MIDI channel (0–15).
    pub channel:    u8,
}

impl Default for MidiSettings {
    fn default() -> Self {
        MidiSettings {
            enabled:    true,
            port:       None,
            instrument: GeneralMidi::AcousticGrandPiano.program(),
            velocity:   100,
            channel:    0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut: raw message sink (midir, or a recorder in tests)
// ════════════════════════════════════════════════════════════════════════════

pub(crate) trait MidiOut: Send {
    fn send(&mut self, message: &[u8]);
}

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn send(&mut self, message: &[u8]) {
        if let Err(e) = self.conn.send(message) {
            debug!("MIDI send failed: {}", e);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiSoundBank
// ════════════════════════════════════════════════════════════════════════════

/// Pitches currently sounding, each with the instant it is due to end.
struct Voices {
    out:      Box<dyn MidiOut>,
    channel:  u8,
    sounding: BTreeMap<u8, Instant>,
}

impl Voices {
    fn note_off(&mut self, pitch: u8) {
        self.out.send(&[0x80 | self.channel, pitch, 0]);
    }

    /// Note-on for `pitch`, releasing it first if it is still sounding.
    fn strike(&mut self, pitch: u8, velocity: u8, until: Instant) {
        if self.sounding.insert(pitch, until).is_some() {
            self.note_off(pitch);
        }
        self.out.send(&[0x90 | self.channel, pitch, velocity]);
    }

    /// Release every voice due by `now`.  Returns the next deadline.
    fn release_due(&mut self, now: Instant) -> Option<Instant> {
        let due: Vec<u8> = self.sounding.iter()
            .filter(|&(_, &until)| until <= now)
            .map(|(&p, _)| p)
            .collect();
        for pitch in due {
            self.sounding.remove(&pitch);
            self.note_off(pitch);
        }
        self.sounding.values().min().copied()
    }

    fn release_all(&mut self) {
        for pitch in std::mem::take(&mut self.sounding).into_keys() {
            self.note_off(pitch);
        }
    }
}

/// Sleeps until the earliest voice is due, releases it, repeats.  A
/// message on `wake` means a new deadline; a hang-up ends the thread.
fn release_loop(voices: Arc<Mutex<Voices>>, wake: Receiver<()>) {
    loop {
        let next = match voices.lock() {
            Ok(mut v) => v.release_due(Instant::now()),
            Err(_)    => return,
        };
        let waited = match next {
            Some(due) => wake.recv_timeout(due.saturating_duration_since(Instant::now())),
            None      => wake.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        if let Err(RecvTimeoutError::Disconnected) = waited {
            return;
        }
    }
}

/// Sounds notes on a MIDI output port.
///
/// Every play is a note-on, released after [`NOTE_LENGTH`] by a background
/// thread so live output matches the recorded take.  A pitch struck again
/// while sounding gets its note-off first; everything still sounding is
/// released when the bank is dropped.
pub struct MidiSoundBank {
    voices:      Arc<Mutex<Voices>>,
    wake:        Option<Sender<()>>,
    bindings:    HashMap<NoteName, u8>,
    velocity:    u8,
    note_length: Duration,
}

impl MidiSoundBank {
    /// Resolve `notes` and connect to a port chosen per `settings.port`.
    ///
    /// Returns `Ok(None)` when no port exists and none was asked for.
    pub fn open(notes: &NoteTable, settings: &MidiSettings) -> Result<Option<Self>> {
        let Some(conn) = open_midi_output(settings.port.as_deref())? else {
            return Ok(None);
        };
        Ok(Some(Self::with_output(Box::new(MidirOut { conn }), notes, settings)))
    }

    pub(crate) fn with_output(
        mut out:  Box<dyn MidiOut>,
        notes:    &NoteTable,
        settings: &MidiSettings,
    ) -> Self {
        let channel = settings.channel & 0x0F;
        out.send(&[0xC0 | channel, settings.instrument.min(127)]);

        let voices = Arc::new(Mutex::new(Voices { out, channel, sounding: BTreeMap::new() }));
        let (wake, wake_rx) = mpsc::channel();
        let shared = Arc::clone(&voices);
        thread::spawn(move || release_loop(shared, wake_rx));

        MidiSoundBank {
            voices,
            wake: Some(wake),
            bindings: bind_notes(notes),
            velocity: settings.velocity.min(127),
            note_length: NOTE_LENGTH,
        }
    }

    /// Hold each note for `length` instead of [`NOTE_LENGTH`].
    pub fn note_length(mut self, length: Duration) -> Self {
        self.note_length = length;
        self
    }

    /// Pitch bound to `note`, if any.
    pub fn pitch(&self, note: &NoteName) -> Option<u8> {
        self.bindings.get(note).copied()
    }
}

impl SoundBank for MidiSoundBank {
    fn play(&mut self, note: &NoteName) {
        let Some(pitch) = self.pitch(note) else { return };
        if let Ok(mut v) = self.voices.lock() {
            v.strike(pitch, self.velocity, Instant::now() + self.note_length);
        }
        if let Some(wake) = &self.wake {
            let _ = wake.send(());
        }
    }

    fn is_bound(&self, note: &NoteName) -> bool {
        self.bindings.contains_key(note)
    }
}

impl Drop for MidiSoundBank {
    fn drop(&mut self) {
        self.wake = None;
        if let Ok(mut v) = self.voices.lock() {
            v.release_all();
        }
    }
}

/// Resolve every note in the table; unresolvable names stay unbound.
pub fn bind_notes(notes: &NoteTable) -> HashMap<NoteName, u8> {
    let mut bindings = HashMap::new();
    for (slot, name) in notes.iter() {
        match pitch_for(name.as_str()) {
            Some(p) => { bindings.insert(name.clone(), p); }
            None    => warn!("note '{}' ({}) has no pitch; that finger will be silent", name, slot),
        }
    }
    bindings
}

// ════════════════════════════════════════════════════════════════════════════
// Port selection
// ════════════════════════════════════════════════════════════════════════════

/// Open a MIDI output connection.
///
/// With a `hint`, the first port whose name contains it (case-insensitive)
/// is used and a miss is an error.  Without one, a softsynth-looking port is
/// preferred, then the first port; no ports at all gives `Ok(None)`.
fn open_midi_output(hint: Option<&str>) -> Result<Option<midir::MidiOutputConnection>> {
    let midi_out = midir::MidiOutput::new("tap_piano")
        .map_err(|e| BankError::MidiInit(e.to_string()))?;

    let ports = midi_out.ports();
    let names: Vec<String> = ports.iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();

    let chosen = match hint {
        Some(h) => match choose_port(&names, Some(h)) {
            Some(i) => i,
            None    => return Err(BankError::PortNotFound {
                hint:      h.to_string(),
                available: if names.is_empty() { "(none)".to_string() } else { names.join(", ") },
            }),
        },
        None => match choose_port(&names, None) {
            Some(i) => i,
            None    => {
                warn!("no MIDI output ports found; notes will be silent");
                warn!("install a synthesiser, e.g. `fluidsynth` or `timidity -iA` on Linux");
                return Ok(None);
            }
        },
    };

    info!("opening MIDI port: {}", names[chosen]);
    midi_out.connect(&ports[chosen], "tap-piano-out")
        .map(Some)
        .map_err(|e| BankError::Connect { port: names[chosen].clone(), reason: e.to_string() })
}

/// Index of the port to use, by the rules of [`open_midi_output`].
fn choose_port(names: &[String], hint: Option<&str>) -> Option<usize> {
    if let Some(h) = hint {
        let h = h.to_lowercase();
        return names.iter().position(|n| n.to_lowercase().contains(&h));
    }
    if names.is_empty() { return None; }

    names.iter()
        .position(|n| {
            let n = n.to_lowercase();
            ["fluid", "timidity", "microsoft", "gm", "synth"].iter().any(|s| n.contains(s))
        })
        .or(Some(0))
}

/// The bank the session should use: MIDI when enabled and available,
/// otherwise silence.
pub fn open_sound_bank(notes: &NoteTable, settings: &MidiSettings) -> Result<Box<dyn SoundBank>> {
    if !settings.enabled {
        info!("MIDI disabled; running silent");
        return Ok(Box::new(NullSoundBank));
    }
    Ok(match MidiSoundBank::open(notes, settings)? {
        Some(bank) => Box::new(bank),
        None       => Box::new(NullSoundBank),
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
