use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::Overrides;

/// Streams a format 1 Standard MIDI File through the playback scheduler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// MIDI file to load
    pub file: PathBuf,

    /// Settings file layered over the defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames per second of the playback loop
    #[arg(long)]
    pub fps: Option<f64>,

    /// Quarter notes decoded ahead of the playhead
    #[arg(long)]
    pub lookahead: Option<u32>,

    /// Worker threads per core
    #[arg(long)]
    pub threads_multiplier: Option<usize>,

    /// Print the file summary and exit
    #[arg(long)]
    pub info: bool,

    /// Pace frames against the wall clock instead of simulating them
    #[arg(long)]
    pub realtime: bool,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            frames_per_second: self.fps,
            lookahead_quarters: self.lookahead,
            pool_multiplier: self.threads_multiplier,
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}
