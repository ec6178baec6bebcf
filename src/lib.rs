//! Streaming Standard MIDI File decoder and playback scheduler.
//!
//! [`MidiFile`] indexes a format 1 file once and then decodes it in tick
//! windows, resuming every track where the previous window stopped.
//! [`PlaybackScheduler`] drives those windows from frame time and pairs
//! note events into [`VisualNoteSpan`]s.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod playback;
pub mod pool;
pub mod sequence;
pub mod smf;
pub mod ui;
pub mod utils;

pub use error::{Error, Result};
pub use playback::{
    ChannelSink, FrameOutcome, NoteSink, PlaybackOptions, PlaybackScheduler, PlaybackState,
    VecSink, VisualNoteSpan,
};
pub use pool::WorkerPool;
pub use sequence::AppendSequence;
pub use smf::{LoadProgress, LoadStage, MidiEvent, MidiFile, TempoMap, Tick, TrackId};
