//! Slot → note binding.

use std::fmt;

use finger_slots::{FingerSlot, SLOT_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default binding, slot order: left pinky … left thumb, right thumb …
/// right pinky.
pub const DEFAULT_NOTES: [&str; SLOT_COUNT] = [
    "A4", "B4", "C5", "D5", "E5",
    "C4", "D4", "E4", "F4", "G4",
];

// ════════════════════════════════════════════════════════════════════════════
// NoteName
// ════════════════════════════════════════════════════════════════════════════

/// A configured note name such as `"C4"`.  What it sounds like is up to the
/// sound bank; here it is only an identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NoteName(String);

impl NoteName {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteTable
// ════════════════════════════════════════════════════════════════════════════

/// One distinct note per slot.  Fixed once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct NoteTable {
    notes: [NoteName; SLOT_COUNT],
}

impl NoteTable {
    /// Build from exactly ten distinct, non-empty names (compared
    /// case-insensitively).
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.len() != SLOT_COUNT {
            return Err(ConfigError::NoteCount { expected: SLOT_COUNT, got: names.len() });
        }

        let mut notes: Vec<NoteName> = Vec::with_capacity(SLOT_COUNT);
        for (slot, raw) in names.iter().enumerate() {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyNote { slot });
            }
            if let Some(first) = notes.iter().position(|n| n.0.eq_ignore_ascii_case(name)) {
                return Err(ConfigError::DuplicateNote {
                    name: name.to_string(), first, second: slot,
                });
            }
            notes.push(NoteName(name.to_string()));
        }

        let notes: [NoteName; SLOT_COUNT] = notes.try_into()
            .map_err(|v: Vec<NoteName>| ConfigError::NoteCount { expected: SLOT_COUNT, got: v.len() })?;
        Ok(NoteTable { notes })
    }

    /// Parse a comma-separated list, e.g. `"A4,B4,C5,…"`.
    pub fn parse_list(list: &str) -> Result<Self> {
        let names: Vec<&str> = list.split(',').collect();
        Self::new(&names)
    }

    pub fn note(&self, slot: FingerSlot) -> &NoteName {
        &self.notes[slot.index()]
    }

    /// `(slot, note)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (FingerSlot, &NoteName)> + '_ {
        FingerSlot::ALL.iter().map(move |&s| (s, &self.notes[s.index()]))
    }
}

impl Default for NoteTable {
    fn default() -> Self {
        NoteTable { notes: DEFAULT_NOTES.map(|n| NoteName(n.to_string())) }
    }
}

impl TryFrom<Vec<String>> for NoteTable {
    type Error = ConfigError;
    fn try_from(v: Vec<String>) -> Result<Self> { NoteTable::new(&v) }
}

impl From<NoteTable> for Vec<String> {
    fn from(t: NoteTable) -> Self {
        t.notes.into_iter().map(|n| n.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binding() {
        let t = NoteTable::default();
        assert_eq!(t.note(FingerSlot::ALL[0]).as_str(), "A4");
        assert_eq!(t.note(FingerSlot::ALL[4]).as_str(), "E5");
        assert_eq!(t.note(FingerSlot::ALL[5]).as_str(), "C4");
        assert_eq!(t.note(FingerSlot::ALL[9]).as_str(), "G4");
    }

    #[test]
    fn parse_list_trims_names() {
        let t = NoteTable::parse_list("C3, D3,E3,F3,G3,A3,B3,C4,D4,E4").unwrap();
        assert_eq!(t.note(FingerSlot::ALL[1]).as_str(), "D3");
        assert_eq!(t.note(FingerSlot::ALL[9]).as_str(), "E4");
    }

    #[test]
    fn wrong_count_rejected() {
        assert_eq!(
            NoteTable::new(&["C4", "D4"]),
            Err(ConfigError::NoteCount { expected: 10, got: 2 }),
        );
    }

    #[test]
    fn duplicates_rejected() {
        let err = NoteTable::parse_list("C4,D4,E4,F4,G4,A4,B4,C5,D5,c4").unwrap_err();
        assert_eq!(err, ConfigError::DuplicateNote { name: "c4".into(), first: 0, second: 9 });
    }

    #[test]
    fn empty_name_rejected() {
        let err = NoteTable::parse_list("C4,,E4,F4,G4,A4,B4,C5,D5,E5").unwrap_err();
        assert_eq!(err, ConfigError::EmptyNote { slot: 1 });
    }
}
