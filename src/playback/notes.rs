//! Note-on/note-off pairing.

use std::collections::HashMap;

use crate::smf::{MidiEvent, Tick, TrackId};

/// A resolved note ready to be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualNoteSpan {
    pub start_tick: Tick,
    pub duration_ticks: Tick,
    pub key: u8,
    pub color_index: u32,
}

/// Onset of a note that is still sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveNote {
    pub start_tick: Tick,
    pub color_index: u32,
}

impl ActiveNote {
    fn close(self, key: u8, end_tick: Tick) -> VisualNoteSpan {
        VisualNoteSpan {
            start_tick: self.start_tick,
            duration_ticks: (end_tick - self.start_tick).max(0),
            key,
            color_index: self.color_index,
        }
    }
}

/// Sixteen colors per track, one per channel
pub fn color_index(track: TrackId, channel: u8) -> u32 {
    track * 16 + u32::from(channel & 0x0F)
}

/// Open notes of one track keyed by `(channel, note)`
pub type TrackNotes = HashMap<(u8, u8), ActiveNote>;

/// What one track's events produced in a frame
#[derive(Debug, Default)]
pub struct Resolution {
    pub spans: Vec<VisualNoteSpan>,
    pub onsets: u64,
}

/// Pairs the note events of one track against its open notes.
///
/// A note-on overwrites any open note with the same key, so only the latest
/// onset is ever closed. Note-offs without an open note are ignored.
pub fn resolve_track<'a, I>(notes: &mut TrackNotes, events: I) -> Resolution
where
    I: IntoIterator<Item = &'a MidiEvent>,
{
    let mut resolution = Resolution::default();
    for event in events {
        let (Some(channel), Some((key, _))) = (event.channel(), event.note()) else {
            continue;
        };
        if event.is_note_on() {
            notes.insert(
                (channel, key),
                ActiveNote {
                    start_tick: event.tick,
                    color_index: color_index(event.track, channel),
                },
            );
            resolution.onsets += 1;
        } else if event.is_note_off() {
            if let Some(active) = notes.remove(&(channel, key)) {
                resolution.spans.push(active.close(key, event.tick));
            }
        }
    }
    resolution
}

/// Open notes carried between frames, partitioned by track
#[derive(Debug, Default)]
pub struct ActiveNoteTable {
    tracks: HashMap<TrackId, TrackNotes>,
}

impl ActiveNoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a track's open notes out, leaving nothing behind for it
    pub fn take_track(&mut self, track: TrackId) -> TrackNotes {
        self.tracks.remove(&track).unwrap_or_default()
    }

    /// Puts a track's still-open notes back after a frame
    pub fn merge_track(&mut self, track: TrackId, notes: TrackNotes) {
        if notes.is_empty() {
            return;
        }
        self.tracks.entry(track).or_default().extend(notes);
    }

    pub fn get(&self, track: TrackId, channel: u8, key: u8) -> Option<&ActiveNote> {
        self.tracks.get(&track)?.get(&(channel, key))
    }

    pub fn len(&self) -> usize {
        self.tracks.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(HashMap::is_empty)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Closes every open note at `end_tick`, ordered by start tick
    pub fn close_all(&mut self, end_tick: Tick) -> Vec<VisualNoteSpan> {
        let mut spans: Vec<VisualNoteSpan> = self
            .tracks
            .drain()
            .flat_map(|(_, notes)| notes.into_iter())
            .map(|((_, key), active)| active.close(key, end_tick))
            .collect();
        spans.sort_by_key(|span| (span.start_tick, span.color_index, span.key));
        spans
    }
}
