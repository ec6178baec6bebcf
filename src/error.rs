use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::smf::TrackId;

/// Result type for every fallible operation in the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top level error type
#[derive(Debug, Error)]
pub enum Error {
    /// The file is not a usable format 1 SMF
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Corrupt or truncated bytes inside a chunk
    #[error("malformed stream at {location}: {kind}")]
    MalformedStream {
        location: Location,
        kind: MalformedKind,
    },

    /// The file could not be opened or mapped
    #[error("cannot read {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("track {index} does not exist, the file has {count}")]
    NoSuchTrack { index: usize, count: usize },

    #[error("settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn malformed(location: Location, kind: MalformedKind) -> Self {
        Error::MalformedStream { location, kind }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedStream { .. })
    }

    /// Track that raised the error, when it came from a track decoder
    pub fn track(&self) -> Option<TrackId> {
        match self {
            Error::MalformedStream {
                location: Location::Track { track, .. },
                ..
            } => Some(*track),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("missing MThd signature")]
    BadSignature,
    #[error("header length is {0}, expected 6")]
    HeaderLength(u32),
    #[error("format type {0} is not supported, only format 1 is")]
    UnsupportedFormat(u16),
    #[error("SMPTE time division {0:#06x} is not supported")]
    SmpteDivision(u16),
    #[error("time division of zero ticks per quarter note")]
    ZeroTimeDivision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedKind {
    #[error("variable-length quantity runs past the end of the track")]
    TruncatedVarLen,
    #[error("variable-length quantity longer than 4 bytes")]
    VarLenTooLong,
    #[error("running status used before any status byte")]
    RunningStatusWithoutStatus,
    #[error("unknown status byte {0:#04x}")]
    UnknownStatus(u8),
    #[error("payload needs {needed} bytes but only {available} remain")]
    Overrun { needed: usize, available: usize },
    #[error("truncated chunk header")]
    TruncatedChunk,
    #[error("set tempo event with a tempo of zero")]
    ZeroTempo,
}

/// Where in the file a malformed byte was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Absolute offset into the file, outside any track
    File { offset: usize },
    /// Offset relative to the start of a track's byte range
    Track { track: TrackId, offset: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File { offset } => write!(f, "file byte {}", offset),
            Location::Track { track, offset } => write!(f, "track {} byte {}", track, offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_track_and_offset() {
        let err = Error::malformed(
            Location::Track {
                track: 3,
                offset: 17,
            },
            MalformedKind::UnknownStatus(0xF4),
        );
        assert_eq!(
            err.to_string(),
            "malformed stream at track 3 byte 17: unknown status byte 0xf4"
        );
        assert_eq!(err.track(), Some(3));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_structural_conversion() {
        let err: Error = StructuralError::UnsupportedFormat(0).into();
        assert!(err.is_structural());
        assert_eq!(err.track(), None);
    }
}
