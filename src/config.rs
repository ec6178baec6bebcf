// config.rs

use config::{Config, ConfigError, Environment, File};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;
use crate::playback::PlaybackOptions;
use crate::smf::Tick;

pub const ENV_PREFIX: &str = "TICKSTREAM";

/// Runtime settings: built-in defaults, then an optional file, then
/// `TICKSTREAM_*` environment variables, then command line overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub frames_per_second: f64,
    pub lookahead_quarters: u32,
    pub pool_multiplier: usize,
    pub preroll_seconds: f64,
    pub preroll_bpm: f64,
}

/// Values given on the command line; `None` keeps the layered value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub frames_per_second: Option<f64>,
    pub lookahead_quarters: Option<u32>,
    pub pool_multiplier: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frames_per_second: 60.0,
            lookahead_quarters: 2,
            pool_multiplier: 2,
            preroll_seconds: 3.0,
            preroll_bpm: 120.0,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("frames_per_second", defaults.frames_per_second)?
            .set_default("lookahead_quarters", i64::from(defaults.lookahead_quarters))?
            .set_default("pool_multiplier", defaults.pool_multiplier as i64)?
            .set_default("preroll_seconds", defaults.preroll_seconds)?
            .set_default("preroll_bpm", defaults.preroll_bpm)?;

        if let Some(path) = path {
            debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let mut settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        settings.apply(overrides);
        settings.validate()?;

        info!(
            "Settings: {} fps, lookahead {} quarters, {} threads per core, pre-roll {}s at {} BPM",
            settings.frames_per_second,
            settings.lookahead_quarters,
            settings.pool_multiplier,
            settings.preroll_seconds,
            settings.preroll_bpm
        );
        Ok(settings)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(fps) = overrides.frames_per_second {
            self.frames_per_second = fps;
        }
        if let Some(quarters) = overrides.lookahead_quarters {
            self.lookahead_quarters = quarters;
        }
        if let Some(multiplier) = overrides.pool_multiplier {
            self.pool_multiplier = multiplier;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let problem = if !(self.frames_per_second > 0.0) {
            Some("frames_per_second must be positive")
        } else if self.lookahead_quarters == 0 {
            Some("lookahead_quarters must be at least 1")
        } else if self.pool_multiplier == 0 {
            Some("pool_multiplier must be at least 1")
        } else if !(self.preroll_seconds >= 0.0) {
            Some("preroll_seconds must not be negative")
        } else if !(self.preroll_bpm > 0.0) {
            Some("preroll_bpm must be positive")
        } else {
            None
        };
        match problem {
            Some(message) => Err(ConfigError::Message(message.to_string()).into()),
            None => Ok(()),
        }
    }

    /// Seconds per frame
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frames_per_second
    }

    pub fn lookahead_ticks(&self, ppq: u16) -> Tick {
        Tick::from(self.lookahead_quarters) * Tick::from(ppq)
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            lookahead_quarters: self.lookahead_quarters,
            preroll_seconds: self.preroll_seconds,
            preroll_bpm: self.preroll_bpm,
        }
    }
}
