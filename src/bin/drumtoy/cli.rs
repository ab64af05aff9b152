//! Command-line argument parsing and logger setup.

use std::{fs::File, path::PathBuf, time::Duration};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use drumtoy::{
    engine::{EngineConfig, RowId},
    sequencing::StepPattern,
};
use env_logger::{Env, Target};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "drumtoy")]
#[command(about = "Multi-row FM step sequencer for the terminal", long_about = None)]
pub struct Args {
    /// Run without the terminal UI, logging to stderr
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many seconds (headless runs until Ctrl+C without it)
    #[arg(long, value_name = "SECONDS", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Tick interval for every startup row
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub rate: u64,

    /// Steps per row
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub steps: usize,

    /// Pre-enable steps, e.g. `--pattern 0:..x..x..` (repeatable)
    #[arg(long, value_name = "ROW:STEPS", value_parser = parse_row_pattern)]
    pub pattern: Vec<(RowId, StepPattern)>,

    /// Where log output goes while the terminal UI is up
    #[arg(long, value_name = "PATH", default_value = "drumtoy.log")]
    pub log_file: PathBuf,

    /// Don't open an audio device; record tone calls in memory instead
    #[arg(long)]
    pub silent: bool,

    /// Tempo used to turn note lengths into seconds
    #[arg(long, value_name = "BPM", default_value_t = 120.0)]
    pub bpm: f64,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .steps(self.steps)
            .rate(Duration::from_millis(self.rate))
    }

    /// Install the logger. `RUST_LOG` wins over the default `info` filter.
    pub fn init_logging(&self) -> EyreResult<()> {
        let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
        if !self.headless {
            // Anything on stderr would tear the terminal UI
            let file = File::create(&self.log_file)
                .wrap_err_with(|| format!("failed to create log file {}", self.log_file.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        builder.init();
        Ok(())
    }
}

fn parse_duration(arg: &str) -> Result<Duration, String> {
    let secs = arg
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("bad duration {:?}: {}", arg, err))?;
    if secs <= 0.0 {
        return Err(format!("duration must be positive, got {}", secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|err| format!("bad duration {:?}: {}", arg, err))
}

fn parse_row_pattern(arg: &str) -> Result<(RowId, StepPattern), String> {
    let (row, steps) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:STEPS, got {:?}", arg))?;
    let row = row
        .trim()
        .parse::<usize>()
        .map_err(|err| format!("bad row index {:?}: {}", row, err))?;
    let pattern = steps.trim().parse::<StepPattern>().map_err(|err| err.to_string())?;
    Ok((RowId(row), pattern))
}
