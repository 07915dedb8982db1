//! The main application loop.
//!
//! Opens the sound bank and the hand source named by [`AppConfig`], then
//! drives a [`Session`] either behind the overlay window or headless.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use tracing::info;

use note_bank::open_sound_bank;

use crate::config::{AppConfig, Source};
use crate::error::{PianoError, Result};
use crate::hands::{
    spawn_hand_source, DetectionFrame, DetectorGuard, DetectorProcess, JsonLinesSource,
    SimHandSource, SimInput,
};
use crate::session::{Session, SessionSummary};
use crate::visualizer::Visualizer;

/// A running hand source.  Dropping it stops a detector process.
pub struct OpenSource {
    pub frames: Receiver<DetectionFrame>,
    _guard:     Option<DetectorGuard>,
}

/// Start the configured source on its own thread.  The simulation reads
/// its key events from `sim_rx`.
pub fn open_source(cfg: &AppConfig, sim_rx: Option<Receiver<SimInput>>) -> Result<OpenSource> {
    let (frames, guard) = match &cfg.source {
        Source::Sim => {
            let rx = sim_rx.ok_or_else(|| PianoError::InvalidArg {
                flag:   "sim",
                reason: "the keyboard simulation needs the window".into(),
            })?;
            (spawn_hand_source(SimHandSource::new(rx)), None)
        }
        Source::Stdin => {
            let src = JsonLinesSource::stdin().min_score(cfg.min_score);
            (spawn_hand_source(src), None)
        }
        Source::File { path } => {
            let src = JsonLinesSource::open(path)?
                .min_score(cfg.min_score)
                .paced(!cfg.headless);
            (spawn_hand_source(src), None)
        }
        Source::Detector { command } => {
            let det = DetectorProcess::spawn(command, cfg.min_score)?;
            let guard = det.guard();
            (spawn_hand_source(det), Some(guard))
        }
    };
    Ok(OpenSource { frames, _guard: guard })
}

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  Windowed, it runs until
/// Escape or the window closes; headless, until the source ends.  Either
/// way the take (if any) is written on the way out.
pub fn run(cfg: AppConfig) -> Result<SessionSummary> {
    let bank = open_sound_bank(&cfg.notes, &cfg.midi)?;
    let mut session = Session::new(&cfg, bank)?;
    let epoch = Instant::now();

    if cfg.headless {
        let source = open_source(&cfg, None)?;
        info!(source = ?cfg.source, "running headless");
        for frame in source.frames.iter() {
            session.process(&frame, epoch.elapsed());
        }
    } else {
        let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
        let simulated = cfg.source == Source::Sim;
        let source = open_source(&cfg, simulated.then_some(sim_rx))?;
        let mut vis = Visualizer::new(simulated.then_some(sim_tx))?;
        info!(source = ?cfg.source, "window open");

        let mut ended = false;
        while vis.is_open() {
            if !vis.poll_input() { break; }

            while !ended {
                match source.frames.try_recv() {
                    Ok(frame) => { session.process(&frame, epoch.elapsed()); }
                    Err(TryRecvError::Empty)        => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("hand source ended");
                        ended = true;
                    }
                }
            }

            vis.render(&session, ended);
        }
    }

    session.finish()
}
