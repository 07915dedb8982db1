//! Command line, config file, and the validated [`AppConfig`] they resolve to.
//!
//! Precedence: flags override the TOML file, the file overrides defaults.
//!
//! ```toml
//! notes     = ["A4", "B4", "C5", "D5", "E5", "C4", "D4", "E4", "F4", "G4"]
//! mirror    = false
//! min_score = 0.5
//!
//! [trigger]
//! alpha         = 0.6
//! threshold     = 0.03
//! cooldown_secs = 0.18
//!
//! [layout]
//! tips       = [4, 8, 12, 16, 20]
//! duplicates = "last-wins"
//!
//! [midi]
//! port       = "FluidSynth"
//! instrument = 12
//! velocity   = 100
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use finger_slots::{landmarks, DuplicateHandPolicy, SlotLayout, TipIndices};
use note_bank::{program_for, MidiSettings};
use tap_trigger::{NoteTable, TriggerConfig};

use crate::error::{PianoError, Result};

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

/// tap_piano - play ten notes by tapping your fingertips
///
/// Each fingertip of two hands is bound to one note. A quick downward tap
/// plays it.
#[derive(Parser, Debug)]
#[command(name = "tap_piano")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Where hand landmarks come from (default: keyboard simulation)
    #[command(subcommand)]
    pub source: Option<Source>,

    /// TOML config file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// EMA weight of the newest sample, in (0, 1]
    #[arg(long, value_name = "A", global = true)]
    pub alpha: Option<f32>,

    /// Minimum downward step of the smoothed fingertip (fraction of height)
    #[arg(long, value_name = "T", global = true)]
    pub threshold: Option<f32>,

    /// Minimum seconds between two triggers of the same finger
    #[arg(long, value_name = "SECS", global = true)]
    pub cooldown: Option<f64>,

    /// Ten comma-separated note names, left pinky first
    #[arg(long, value_name = "LIST", global = true)]
    pub notes: Option<String>,

    /// Five comma-separated landmark indices, thumb first
    #[arg(long, value_name = "LIST", global = true)]
    pub tips: Option<String>,

    /// Mirror observations horizontally (x -> 1-x, Left <-> Right)
    #[arg(long, global = true)]
    pub mirror: bool,

    /// Keep the first hand per label instead of the last
    #[arg(long, global = true)]
    pub first_wins: bool,

    /// Drop hands the detector scored below this
    #[arg(long, value_name = "SCORE", global = true)]
    pub min_score: Option<f32>,

    /// Substring of the MIDI output port to use
    #[arg(long, value_name = "NAME", global = true)]
    pub midi_port: Option<String>,

    /// Run silently
    #[arg(long, global = true)]
    pub no_midi: bool,

    /// General MIDI program, by number or name ("marimba")
    #[arg(long, value_name = "PROGRAM", global = true)]
    pub instrument: Option<String>,

    /// Note-on velocity
    #[arg(long, value_name = "0-127", global = true)]
    #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
    pub velocity: Option<u8>,

    /// MIDI channel
    #[arg(long, value_name = "0-15", global = true)]
    #[arg(value_parser = clap::value_parser!(u8).range(0..=15))]
    pub channel: Option<u8>,

    /// Save every triggered note to a MIDI file on exit
    #[arg(long, value_name = "FILE.mid", global = true)]
    pub record: Option<PathBuf>,

    /// No window; run until the source ends
    #[arg(long, global = true)]
    pub headless: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Landmark sources.
#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Keyboard simulation: hold 1..0 to lower a fingertip
    Sim,
    /// JSON-lines frames on standard input
    Stdin,
    /// Replay a JSON-lines recording
    File {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Spawn a detector and read JSON lines from its stdout
    Detector {
        #[arg(value_name = "COMMAND", required = true, num_args = 1..)]
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

impl Cli {
    /// Default log filter for the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Settings: the TOML file
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub notes:     NoteTable,
    pub mirror:    bool,
    pub min_score: f32,
    pub trigger:   TriggerConfig,
    pub layout:    SlotLayout,
    pub midi:      MidiSettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| PianoError::ConfigRead { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| PianoError::ConfigParse { path: path.to_path_buf(), source })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Everything a session needs, checked once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub source:    Source,
    pub trigger:   TriggerConfig,
    pub notes:     NoteTable,
    pub layout:    SlotLayout,
    pub mirror:    bool,
    pub min_score: f32,
    pub midi:      MidiSettings,
    pub record:    Option<PathBuf>,
    pub headless:  bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let s = Settings::default();
        AppConfig {
            source:    Source::Sim,
            trigger:   s.trigger,
            notes:     s.notes,
            layout:    s.layout,
            mirror:    s.mirror,
            min_score: s.min_score,
            midi:      s.midi,
            record:    None,
            headless:  false,
        }
    }
}

impl AppConfig {
    /// Load `--config` if given, then apply the flags.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None       => Settings::default(),
        };
        Self::from_parts(cli, settings)
    }

    /// Apply the flags on top of already-loaded settings and validate.
    pub fn from_parts(cli: &Cli, settings: Settings) -> Result<Self> {
        let mut trigger = settings.trigger;
        if let Some(alpha) = cli.alpha         { trigger = trigger.alpha(alpha); }
        if let Some(threshold) = cli.threshold { trigger = trigger.threshold(threshold); }
        if let Some(secs) = cli.cooldown {
            let cooldown = Duration::try_from_secs_f64(secs)
                .map_err(|e| PianoError::InvalidArg { flag: "--cooldown", reason: e.to_string() })?;
            trigger = trigger.cooldown(cooldown);
        }
        trigger.validate()?;

        let notes = match &cli.notes {
            Some(list) => NoteTable::parse_list(list)?,
            None       => settings.notes,
        };

        let mut layout = settings.layout;
        if let Some(list) = &cli.tips { layout.tips = parse_tips(list)?; }
        if cli.first_wins { layout.duplicates = DuplicateHandPolicy::FirstWins; }
        check_tips(&layout.tips)?;

        let mut midi = settings.midi;
        if cli.no_midi { midi.enabled = false; }
        if let Some(port) = &cli.midi_port { midi.port = Some(port.clone()); }
        if let Some(given) = &cli.instrument {
            midi.instrument = program_for(given).ok_or_else(|| PianoError::InvalidArg {
                flag:   "--instrument",
                reason: format!("unknown program '{}'", given),
            })?;
        }
        if let Some(v) = cli.velocity { midi.velocity = v; }
        if let Some(c) = cli.channel  { midi.channel = c; }
        check_midi(&midi)?;

        let min_score = cli.min_score.unwrap_or(settings.min_score);
        if !(0.0..=1.0).contains(&min_score) {
            return Err(PianoError::InvalidArg {
                flag:   "--min-score",
                reason: format!("{} is outside 0..1", min_score),
            });
        }

        let source = cli.source.clone().unwrap_or(Source::Sim);
        if cli.headless && source == Source::Sim {
            return Err(PianoError::InvalidArg {
                flag:   "--headless",
                reason: "the keyboard simulation needs the window".into(),
            });
        }

        Ok(AppConfig {
            source,
            trigger,
            notes,
            layout,
            mirror: cli.mirror || settings.mirror,
            min_score,
            midi,
            record: cli.record.clone(),
            headless: cli.headless,
        })
    }
}

/// `"4,8,12,16,20"` → tip indices, thumb first.
pub fn parse_tips(list: &str) -> Result<TipIndices> {
    let invalid = |reason: String| PianoError::InvalidArg { flag: "--tips", reason };

    let parsed: Vec<usize> = list
        .split(',')
        .map(|s| s.trim().parse::<usize>().map_err(|e| invalid(format!("'{}': {}", s.trim(), e))))
        .collect::<Result<_>>()?;

    let tips: [usize; 5] = parsed
        .try_into()
        .map_err(|v: Vec<usize>| invalid(format!("expected 5 indices, got {}", v.len())))?;
    Ok(TipIndices(tips))
}

fn check_tips(tips: &TipIndices) -> Result<()> {
    match tips.0.iter().find(|&&i| i >= landmarks::COUNT) {
        Some(i) => Err(PianoError::InvalidArg {
            flag:   "tips",
            reason: format!("landmark {} does not exist (0..{})", i, landmarks::COUNT),
        }),
        None => Ok(()),
    }
}

fn check_midi(midi: &MidiSettings) -> Result<()> {
    let out_of_range = |flag, value: u8, max: u8| PianoError::InvalidArg {
        flag,
        reason: format!("{} is above {}", value, max),
    };
    if midi.instrument > 127 { return Err(out_of_range("instrument", midi.instrument, 127)); }
    if midi.velocity > 127   { return Err(out_of_range("velocity", midi.velocity, 127)); }
    if midi.channel > 15     { return Err(out_of_range("channel", midi.channel, 15)); }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["tap_piano"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn resolve(args: &[&str]) -> Result<AppConfig> {
        AppConfig::from_parts(&cli(args), Settings::default())
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_args_is_the_default_config() {
        assert_eq!(resolve(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn source_subcommands() {
        assert_eq!(cli(&["stdin"]).source, Some(Source::Stdin));
        assert_eq!(
            cli(&["file", "take.jsonl"]).source,
            Some(Source::File { path: PathBuf::from("take.jsonl") }),
        );
        assert_eq!(
            cli(&["--mirror", "detector", "python3", "hands.py", "--camera", "1"]).source,
            Some(Source::Detector {
                command: vec!["python3".into(), "hands.py".into(), "--camera".into(), "1".into()],
            }),
        );
    }

    #[test]
    fn flags_after_the_source_still_apply() {
        let cfg = resolve(&["file", "take.jsonl", "--headless", "--alpha", "1"]).unwrap();
        assert!(cfg.headless);
        assert_eq!(cfg.trigger.alpha, 1.0);
    }

    #[test]
    fn trigger_overrides() {
        let cfg = resolve(&["--alpha", "0.5", "--threshold", "0.05", "--cooldown", "0.25"]).unwrap();
        assert_eq!(cfg.trigger.alpha, 0.5);
        assert_eq!(cfg.trigger.threshold, 0.05);
        assert_eq!(cfg.trigger.cooldown, Duration::from_millis(250));
    }

    #[test]
    fn bad_trigger_constants_are_rejected() {
        assert!(matches!(resolve(&["--alpha", "0"]), Err(PianoError::Trigger(_))));
        assert!(matches!(resolve(&["--alpha", "1.5"]), Err(PianoError::Trigger(_))));
        assert!(matches!(
            resolve(&["--cooldown=-1"]),
            Err(PianoError::InvalidArg { flag: "--cooldown", .. })
        ));
    }

    #[test]
    fn notes_flag_replaces_the_table() {
        let cfg = resolve(&["--notes", "C3,D3,E3,F3,G3,A3,B3,C4,D4,E4"]).unwrap();
        assert_eq!(cfg.notes.iter().next().unwrap().1.as_str(), "C3");

        assert!(matches!(resolve(&["--notes", "C3,D3"]), Err(PianoError::Trigger(_))));
        assert!(matches!(
            resolve(&["--notes", "C3,C3,E3,F3,G3,A3,B3,C4,D4,E4"]),
            Err(PianoError::Trigger(_))
        ));
    }

    #[test]
    fn tips_parse() {
        assert_eq!(parse_tips("3, 7,11,15,19").unwrap(), TipIndices([3, 7, 11, 15, 19]));
        assert!(parse_tips("4,8,12,16").is_err());
        assert!(parse_tips("4,8,twelve,16,20").is_err());
        assert!(resolve(&["--tips", "4,8,12,16,21"]).is_err());
    }

    #[test]
    fn midi_flags() {
        let cfg = resolve(&[
            "--no-midi", "--midi-port", "Fluid", "--instrument", "marimba",
            "--velocity", "90", "--channel", "9",
        ]).unwrap();
        assert!(!cfg.midi.enabled);
        assert_eq!(cfg.midi.port.as_deref(), Some("Fluid"));
        assert_eq!(cfg.midi.instrument, 12);
        assert_eq!(cfg.midi.velocity, 90);
        assert_eq!(cfg.midi.channel, 9);

        assert!(resolve(&["--instrument", "tuba"]).is_err());
        assert!(Cli::try_parse_from(["tap_piano", "--channel", "16"]).is_err());
        assert!(Cli::try_parse_from(["tap_piano", "--velocity", "128"]).is_err());
    }

    #[test]
    fn headless_needs_a_real_source() {
        assert!(matches!(
            resolve(&["--headless"]),
            Err(PianoError::InvalidArg { flag: "--headless", .. })
        ));
        assert!(resolve(&["--headless", "stdin"]).is_ok());
    }

    #[test]
    fn file_settings_then_flags() {
        let settings: Settings = toml::from_str(r#"
            notes     = ["C3", "D3", "E3", "F3", "G3", "A3", "B3", "C4", "D4", "E4"]
            mirror    = true
            min_score = 0.5

            [trigger]
            alpha         = 0.75
            cooldown_secs = 0.5

            [layout]
            duplicates = "first-wins"

            [midi]
            instrument = 12
        "#).unwrap();

        let cfg = AppConfig::from_parts(&cli(&["--alpha", "0.5"]), settings).unwrap();
        assert_eq!(cfg.trigger.alpha, 0.5);
        assert_eq!(cfg.trigger.threshold, 0.03);
        assert_eq!(cfg.trigger.cooldown, Duration::from_millis(500));
        assert_eq!(cfg.notes.iter().next().unwrap().1.as_str(), "C3");
        assert!(cfg.mirror);
        assert_eq!(cfg.min_score, 0.5);
        assert_eq!(cfg.layout.duplicates, DuplicateHandPolicy::FirstWins);
        assert_eq!(cfg.midi.instrument, 12);
    }

    #[test]
    fn file_errors() {
        assert!(toml::from_str::<Settings>("colour = \"red\"").is_err());
        assert!(toml::from_str::<Settings>("notes = [\"A4\"]").is_err());

        let missing = Path::new("/definitely/not/here.toml");
        assert!(matches!(Settings::load(missing), Err(PianoError::ConfigRead { .. })));
    }

    #[test]
    fn out_of_range_midi_from_file() {
        let settings: Settings = toml::from_str("[midi]\ninstrument = 200").unwrap();
        assert!(AppConfig::from_parts(&cli(&[]), settings).is_err());
    }
}
