use simplelog::*;
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// `$HOME/.local/share/tickstream/logs`
pub fn log_dir() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not set"))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("tickstream")
        .join("logs"))
}

/// Maps `-v` repetitions to a terminal log level
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs everything from debug up to the log file, and `verbosity` worth of
/// it to stderr. Only the first call installs the logger.
pub fn init_logger(verbosity: u8) -> Result<PathBuf, Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("tickstream.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    INIT.call_once(|| {
        let config = Config::default();
        let loggers: Vec<Box<dyn SharedLogger>> = vec![
            TermLogger::new(
                level_for_verbosity(verbosity),
                config.clone(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ),
            WriteLogger::new(LevelFilter::Debug, config, log_file),
        ];
        if CombinedLogger::init(loggers).is_ok() {
            LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
        }
    });

    if LOGGER_INITIALIZED.load(Ordering::SeqCst) {
        Ok(log_path)
    } else {
        Err(Error::new(ErrorKind::Other, "Logger initialization failed"))
    }
}
