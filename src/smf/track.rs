//! Per-track decoding: a one-time full scan for indexing and a cursor
//! resuming windowed scan for playback.

use log::trace;

use crate::error::{MalformedKind, Result};
use crate::smf::cursor::TrackCursor;
use crate::smf::event::{
    channel_data_len, is_note_on_bytes, tempo_from_bytes, MidiEvent, Payload, META,
    META_END_OF_TRACK, META_SET_TEMPO, SYSEX, SYSEX_ESCAPE,
};
use crate::smf::reader::ByteReader;
use crate::smf::tempo::TempoChange;
use crate::smf::{Tick, TrackId};

/// A track chunk's payload, as an absolute slice of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: usize,
    pub length: usize,
}

impl ByteRange {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Indexing results for one track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSummary {
    pub length_in_ticks: Tick,
    pub note_count: u64,
    pub tempo_changes: Vec<TempoChange>,
}

/// Output of a windowed scan: the events in the window and where to resume
#[derive(Debug, Clone, PartialEq)]
pub struct WindowScan {
    pub events: Vec<MidiEvent>,
    pub cursor: TrackCursor,
}

#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    range: ByteRange,
    pub(crate) cursor: TrackCursor,
    length_in_ticks: Tick,
    note_count: u64,
}

impl Track {
    pub fn new(id: TrackId, range: ByteRange) -> Self {
        Self {
            id,
            range,
            cursor: TrackCursor::default(),
            length_in_ticks: 0,
            note_count: 0,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn cursor(&self) -> TrackCursor {
        self.cursor
    }

    pub fn length_in_ticks(&self) -> Tick {
        self.length_in_ticks
    }

    pub fn note_count(&self) -> u64 {
        self.note_count
    }

    /// Binds a decoder to this track's bytes within `file`
    pub fn decoder<'a>(&self, file: &'a [u8]) -> TrackDecoder<'a> {
        TrackDecoder::new(self.id, &file[self.range.offset..self.range.end()])
    }

    pub(crate) fn apply_summary(&mut self, summary: &TrackSummary) {
        self.length_in_ticks = summary.length_in_ticks;
        self.note_count = summary.note_count;
    }
}

/// Event body borrowed from the track bytes
enum RawEvent<'a> {
    Channel { param1: u8, param2: Option<u8> },
    Meta { kind: u8, data: &'a [u8] },
    SysEx(&'a [u8]),
}

impl RawEvent<'_> {
    fn into_event(self, tick: Tick, delta_time: u32, status: u8, track: TrackId) -> MidiEvent {
        let payload = match self {
            RawEvent::Channel { param1, param2 } => Payload::Channel { param1, param2 },
            RawEvent::Meta { kind, data } => Payload::Meta {
                kind,
                data: data.to_vec(),
            },
            RawEvent::SysEx(data) => Payload::SysEx {
                data: data.to_vec(),
            },
        };
        MidiEvent {
            tick,
            delta_time,
            status,
            track,
            payload,
        }
    }

    fn is_end_of_track(&self) -> bool {
        matches!(self, RawEvent::Meta { kind, .. } if *kind == META_END_OF_TRACK)
    }
}

/// Decoder bound to one track's disjoint byte range
#[derive(Debug, Clone, Copy)]
pub struct TrackDecoder<'a> {
    id: TrackId,
    data: &'a [u8],
}

impl<'a> TrackDecoder<'a> {
    pub fn new(id: TrackId, data: &'a [u8]) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Decodes the whole track without materializing events, collecting its
    /// length, note-on count and Set Tempo changes. Stops at End of Track.
    pub fn full_scan(&self) -> Result<TrackSummary> {
        let mut reader = ByteReader::new(self.data, self.id);
        let mut running_status = None;
        let mut summary = TrackSummary::default();
        let mut tick: Tick = 0;

        while !reader.is_at_end() {
            tick += Tick::from(reader.read_varlen()?);
            let event_offset = reader.position();
            let (status, event) = read_event(&mut reader, &mut running_status)?;
            match event {
                RawEvent::Meta { kind, .. } if kind == META_END_OF_TRACK => break,
                RawEvent::Meta { kind, data } if kind == META_SET_TEMPO => {
                    if let Some(tempo) = tempo_from_bytes(data) {
                        if tempo == 0 {
                            return Err(reader.error_at(event_offset, MalformedKind::ZeroTempo));
                        }
                        summary.tempo_changes.push(TempoChange::new(tick, tempo));
                    }
                }
                RawEvent::Channel {
                    param2: Some(velocity),
                    ..
                } if is_note_on_bytes(status, velocity) => summary.note_count += 1,
                _ => {}
            }
        }

        summary.length_in_ticks = tick;
        trace!(
            "Track {} scanned: {} ticks, {} notes, {} tempo changes",
            self.id,
            summary.length_in_ticks,
            summary.note_count,
            summary.tempo_changes.len()
        );
        Ok(summary)
    }

    /// Decodes the events with `start <= tick <= end`, resuming from `cursor`.
    ///
    /// The cursor is rewound to the start of the track first when
    /// `force_reset` is set or `start` lies before the cursor's last decoded
    /// tick. Decoding stops in front of the first event past `end`; the
    /// returned cursor points at that event so the next call picks it up.
    pub fn windowed_scan(
        &self,
        cursor: TrackCursor,
        start: Tick,
        end: Tick,
        force_reset: bool,
    ) -> Result<WindowScan> {
        let mut cursor = if force_reset || start < cursor.last_decoded_tick {
            TrackCursor::default()
        } else {
            cursor
        };
        let mut reader = ByteReader::at(self.data, cursor.stream_offset, self.id);
        let mut running_status = cursor.running_status;
        let mut events = Vec::new();

        while !reader.is_at_end() {
            let delta_time = reader.read_varlen()?;
            let tick = cursor.last_decoded_tick + Tick::from(delta_time);
            if tick > end {
                break;
            }

            let (status, event) = read_event(&mut reader, &mut running_status)?;
            if event.is_end_of_track() {
                reader.skip_to_end();
            }
            cursor = TrackCursor {
                stream_offset: reader.position(),
                running_status,
                last_decoded_tick: tick,
            };

            if event.is_end_of_track() {
                break;
            }
            if tick >= start {
                events.push(event.into_event(tick, delta_time, status, self.id));
            }
        }

        Ok(WindowScan { events, cursor })
    }
}

/// Reads one status byte (or reuses running status) and its payload
fn read_event<'a>(
    reader: &mut ByteReader<'a>,
    running_status: &mut Option<u8>,
) -> Result<(u8, RawEvent<'a>)> {
    let status_offset = reader.position();
    let status = match reader.peek_u8()? {
        byte if byte >= 0x80 => {
            reader.read_u8()?;
            *running_status = Some(byte);
            byte
        }
        _ => running_status.ok_or_else(|| {
            reader.error_at(status_offset, MalformedKind::RunningStatusWithoutStatus)
        })?,
    };

    let event = match status {
        0x80..=0xEF => {
            let param1 = reader.read_u8()?;
            let param2 = match channel_data_len(status) {
                Some(2) => Some(reader.read_u8()?),
                _ => None,
            };
            RawEvent::Channel { param1, param2 }
        }
        META => {
            let kind = reader.read_u8()?;
            let len = reader.read_varlen()? as usize;
            RawEvent::Meta {
                kind,
                data: reader.read_slice(len)?,
            }
        }
        SYSEX | SYSEX_ESCAPE => {
            let len = reader.read_varlen()? as usize;
            RawEvent::SysEx(reader.read_slice(len)?)
        }
        other => return Err(reader.error_at(status_offset, MalformedKind::UnknownStatus(other))),
    };
    Ok((status, event))
}
