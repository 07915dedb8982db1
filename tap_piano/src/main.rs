//! tap_piano entry point.

use clap::Parser;
use std::process::ExitCode;
use tap_piano::app::run;
use tap_piano::config::{AppConfig, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let cfg = match AppConfig::from_cli(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cfg) {
        Ok(summary) => {
            println!("{} taps over {} frames", summary.triggers, summary.frames);
            if let Some((path, notes)) = summary.take {
                println!("Take: {} notes written to {}", notes, path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
