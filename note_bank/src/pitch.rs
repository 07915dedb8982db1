//! Note names → MIDI pitches, and a handful of General MIDI programs that
//! suit percussive tapping.

// ════════════════════════════════════════════════════════════════════════════
// Note names (scientific pitch notation, C4 = 60)
// ════════════════════════════════════════════════════════════════════════════

/// Resolve `"A4"`, `"C#5"`, `"Bb3"`, `"C-1"` … to a MIDI note number.
///
/// Returns `None` for anything that does not parse or lands outside 0–127.
///
/// # Example
/// ```rust
/// use note_bank::pitch_for;
///
/// assert_eq!(pitch_for("C4"),  Some(60));
/// assert_eq!(pitch_for("A4"),  Some(69));
/// assert_eq!(pitch_for("F#3"), Some(54));
/// assert_eq!(pitch_for("H2"),  None);
/// ```
pub fn pitch_for(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.chars();

    let semitone: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _   => return None,
    };

    let rest = chars.as_str();
    let accidentals = rest.chars().take_while(|c| *c == '#' || *c == 'b').count();
    let shift: i32 = rest[..accidentals].chars()
        .map(|c| if c == '#' { 1 } else { -1 })
        .sum();

    let octave: i32 = rest[accidentals..].parse().ok()?;
    if !(-1..=9).contains(&octave) { return None; }

    let pitch = (octave + 1) * 12 + semitone + shift;
    u8::try_from(pitch).ok().filter(|p| *p <= 127)
}

// ════════════════════════════════════════════════════════════════════════════
// General MIDI programs
// ════════════════════════════════════════════════════════════════════════════

/// General MIDI instruments that sound good when struck.
///
/// Use [`GeneralMidi::program`] for the raw Program Change value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneralMidi {
    AcousticGrandPiano  = 0,
    BrightAcousticPiano = 1,
    ElectricPiano1      = 4,
    Harpsichord         = 6,
    Celesta             = 8,
    Glockenspiel        = 9,
    MusicBox            = 10,
    Vibraphone          = 11,
    Marimba             = 12,
    Xylophone           = 13,
    TubularBells        = 14,
    PizzicatoStrings    = 45,
    OrchestralHarp      = 46,
    Kalimba             = 108,
    SteelDrums          = 114,
}

impl GeneralMidi {
    pub const ALL: [GeneralMidi; 15] = [
        GeneralMidi::AcousticGrandPiano, GeneralMidi::BrightAcousticPiano,
        GeneralMidi::ElectricPiano1,     GeneralMidi::Harpsichord,
        GeneralMidi::Celesta,            GeneralMidi::Glockenspiel,
        GeneralMidi::MusicBox,           GeneralMidi::Vibraphone,
        GeneralMidi::Marimba,            GeneralMidi::Xylophone,
        GeneralMidi::TubularBells,       GeneralMidi::PizzicatoStrings,
        GeneralMidi::OrchestralHarp,     GeneralMidi::Kalimba,
        GeneralMidi::SteelDrums,
    ];

    /// Raw MIDI program number (0–127).
    pub fn program(self) -> u8 { self as u8 }

    pub fn name(self) -> &'static str {
        match self {
            GeneralMidi::AcousticGrandPiano  => "Acoustic Grand Piano",
            GeneralMidi::BrightAcousticPiano => "Bright Acoustic Piano",
            GeneralMidi::ElectricPiano1      => "Electric Piano 1",
            GeneralMidi::Harpsichord         => "Harpsichord",
            GeneralMidi::Celesta             => "Celesta",
            GeneralMidi::Glockenspiel        => "Glockenspiel",
            GeneralMidi::MusicBox            => "Music Box",
            GeneralMidi::Vibraphone          => "Vibraphone",
            GeneralMidi::Marimba             => "Marimba",
            GeneralMidi::Xylophone           => "Xylophone",
            GeneralMidi::TubularBells        => "Tubular Bells",
            GeneralMidi::PizzicatoStrings    => "Pizzicato Strings",
            GeneralMidi::OrchestralHarp      => "Orchestral Harp",
            GeneralMidi::Kalimba             => "Kalimba",
            GeneralMidi::SteelDrums          => "Steel Drums",
        }
    }

    /// Look up by name, ignoring case, spaces and punctuation
    /// (`"music-box"`, `"Music Box"`).
    pub fn from_name(name: &str) -> Option<Self> {
        let key = squash(name);
        Self::ALL.into_iter().find(|gm| squash(gm.name()) == key)
    }
}

/// Resolve an instrument given either as a program number or a name.
pub fn program_for(given: &str) -> Option<u8> {
    match given.trim().parse::<u8>() {
        Ok(p) if p <= 127 => Some(p),
        Ok(_)             => None,
        Err(_)            => GeneralMidi::from_name(given).map(GeneralMidi::program),
    }
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).map(|c| c.to_ascii_lowercase()).collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
