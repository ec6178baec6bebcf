//! Turns windows of decoded events into note spans as playback advances.

pub mod notes;
pub mod scheduler;
pub mod sink;

pub use notes::{color_index, resolve_track, ActiveNote, ActiveNoteTable, VisualNoteSpan};
pub use scheduler::{FrameOutcome, PlaybackOptions, PlaybackScheduler, PlaybackState};
pub use sink::{ChannelSink, NoteSink, SinkMessage, VecSink};
