//! Take recording: every triggered note of a session, written out as a
//! Standard MIDI File (Type 0, single track) when the session ends.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tap_trigger::{NoteName, NoteTable};

use crate::bank::{bind_notes, MidiSettings};
use crate::error::{BankError, Result};

pub const TAKE_TEMPO_BPM: u32 = 120;
pub const TAKE_TPQ:       u16 = 480;
/// Every recorded note lasts an eighth unless re-struck sooner.
pub const TAKE_NOTE_TICKS: u32 = TAKE_TPQ as u32 / 2;
/// [`TAKE_NOTE_TICKS`] in wall time; live voices are held this long too.
pub const NOTE_LENGTH: Duration = Duration::from_millis(
    TAKE_NOTE_TICKS as u64 * 60_000 / (TAKE_TPQ as u64 * TAKE_TEMPO_BPM as u64),
);

/// One recorded strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TakeNote {
    /// Session time of the trigger.
    pub at:    Duration,
    pub pitch: u8,
}

/// Collects strikes during a session.
pub struct TakeRecorder {
    bindings:   HashMap<NoteName, u8>,
    notes:      Vec<TakeNote>,
    instrument: u8,
    velocity:   u8,
    channel:    u8,
}

impl TakeRecorder {
    pub fn new(notes: &NoteTable, settings: &MidiSettings) -> Self {
        TakeRecorder {
            bindings:   bind_notes(notes),
            notes:      Vec::new(),
            instrument: settings.instrument.min(127),
            velocity:   settings.velocity.min(127),
            channel:    settings.channel & 0x0F,
        }
    }

    /// Record a strike.  Unbound notes are skipped, as in playback.
    pub fn record(&mut self, at: Duration, note: &NoteName) {
        if let Some(&pitch) = self.bindings.get(note) {
            self.notes.push(TakeNote { at, pitch });
        }
    }

    pub fn notes(&self)    -> &[TakeNote] { &self.notes }
    pub fn len(&self)      -> usize       { self.notes.len() }
    pub fn is_empty(&self) -> bool        { self.notes.is_empty() }

    /// Serialise and write to `path`.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes();
        std::fs::File::create(path)
            .and_then(|mut f| f.write_all(&bytes))
            .map_err(|source| BankError::WriteTake { path: path.to_path_buf(), source })
    }

    /// A complete Type-0 MIDI file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let track = self.build_track_chunk();

        let mut out = Vec::new();
        // MThd  length=6  format=0  ntrks=1  division
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&TAKE_TPQ.to_be_bytes());

        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track.len() as u32).to_be_bytes());
        out.extend_from_slice(&track);
        out
    }

    fn build_track_chunk(&self) -> Vec<u8> {
        let mut t: Vec<u8> = Vec::new();
        let ch = self.channel;

        // ── Tempo ─────────────────────────────────────────────────────────
        let micros = 60_000_000u32 / TAKE_TEMPO_BPM;
        t.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03]);
        t.extend_from_slice(&micros.to_be_bytes()[1..]);

        // ── Track name ────────────────────────────────────────────────────
        let name = b"tap_piano take";
        t.extend_from_slice(&[0x00, 0xFF, 0x03]);
        write_vlq(&mut t, name.len() as u32);
        t.extend_from_slice(name);

        // ── Program Change ────────────────────────────────────────────────
        t.extend_from_slice(&[0x00, 0xC0 | ch, self.instrument]);

        // ── Notes ─────────────────────────────────────────────────────────
        let mut now = 0u32;
        for ev in self.timeline() {
            write_vlq(&mut t, ev.tick - now);
            now = ev.tick;
            if ev.on {
                t.extend_from_slice(&[0x90 | ch, ev.pitch, self.velocity]);
            } else {
                t.extend_from_slice(&[0x80 | ch, ev.pitch, 0x00]);
            }
        }

        // ── End of Track ──────────────────────────────────────────────────
        t.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        t
    }

    /// Note-on/off events sorted by tick, offs before ons at the same tick.
    /// A pitch struck again before its eighth is up is released at the
    /// re-strike, matching live playback.
    fn timeline(&self) -> Vec<TimedEvent> {
        let mut events = Vec::with_capacity(self.notes.len() * 2);
        for (i, note) in self.notes.iter().enumerate() {
            let on  = secs_to_ticks(note.at);
            let next_same = self.notes[i + 1..].iter()
                .find(|n| n.pitch == note.pitch)
                .map(|n| secs_to_ticks(n.at));
            let off = match next_same {
                Some(next) => (on + TAKE_NOTE_TICKS).min(next),
                None       => on + TAKE_NOTE_TICKS,
            };
            events.push(TimedEvent { tick: on,  on: true,  pitch: note.pitch });
            events.push(TimedEvent { tick: off, on: false, pitch: note.pitch });
        }
        events.sort_by_key(|e| (e.tick, e.on));
        events
    }
}

#[derive(Clone, Copy, Debug)]
struct TimedEvent {
    tick:  u32,
    on:    bool,
    pitch: u8,
}

/// Session time → ticks at the take's fixed tempo.
fn secs_to_ticks(at: Duration) -> u32 {
    let ticks_per_sec = TAKE_TPQ as f64 * TAKE_TEMPO_BPM as f64 / 60.0;
    (at.as_secs_f64() * ticks_per_sec).round() as u32
}

/// Write a MIDI variable-length quantity.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 5];
    let mut i = 4;
    bytes[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    buf.extend_from_slice(&bytes[i..]);
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
