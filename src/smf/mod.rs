//! Standard MIDI File decoding.
//!
//! A file is indexed once at load time ([`MidiFile::open`]) and then decoded
//! window by window ([`MidiFile::events_between`]), each track resuming from
//! its own cursor.

pub mod cursor;
pub mod event;
pub mod file;
pub mod progress;
pub mod reader;
pub mod tempo;
pub mod track;

/// Position in a song, in PPQ units. Negative values lie in the pre-roll.
pub type Tick = i64;

/// Index of a track chunk in file order
pub type TrackId = u32;

pub use cursor::TrackCursor;
pub use event::{EventKind, MidiEvent, Payload};
pub use file::MidiFile;
pub use progress::{LoadProgress, LoadStage};
pub use reader::decode_varlen;
pub use tempo::{TempoChange, TempoMap, DEFAULT_TEMPO};
pub use track::{ByteRange, Track, TrackDecoder, TrackSummary, WindowScan};
