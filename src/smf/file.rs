//! File indexer and event window merger.

use log::{debug, info};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Location, MalformedKind, Result, StructuralError};
use crate::pool::WorkerPool;
use crate::sequence::AppendSequence;
use crate::smf::event::MidiEvent;
use crate::smf::progress::{LoadProgress, LoadStage};
use crate::smf::tempo::TempoMap;
use crate::smf::track::{ByteRange, Track, TrackSummary, WindowScan};
use crate::smf::{Tick, TrackId};
use crate::utils::format_time;

const HEADER_MAGIC: &[u8; 4] = b"MThd";
const TRACK_MAGIC: &[u8; 4] = b"MTrk";
const HEADER_LENGTH: u32 = 6;
/// Chunk id plus length field
const CHUNK_PREFIX: usize = 8;
const HEADER_END: usize = CHUNK_PREFIX + HEADER_LENGTH as usize;
const SUPPORTED_FORMAT: u16 = 1;

/// Threads per core for pools created by the convenience constructors
pub const DEFAULT_POOL_MULTIPLIER: usize = 2;

/// Backing bytes of a loaded file
enum Source {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Source::Mapped(map) => map,
            Source::Owned(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    format_type: u16,
    track_count: u16,
    time_division: u16,
}

/// An indexed format 1 Standard MIDI File, ready for windowed decoding
pub struct MidiFile {
    path: Option<PathBuf>,
    source: Source,
    header: Header,
    tracks: Vec<Track>,
    tempo_map: TempoMap,
    last_requested_tick: Tick,
    pool: Arc<WorkerPool>,
}

impl MidiFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = Arc::new(WorkerPool::new(DEFAULT_POOL_MULTIPLIER)?);
        Self::open_with_progress(path, pool, &LoadProgress::new())
    }

    /// Maps the file read-only and indexes it on `pool`, reporting stages
    /// to `progress` as it goes.
    pub fn open_with_progress(
        path: impl AsRef<Path>,
        pool: Arc<WorkerPool>,
        progress: &LoadProgress,
    ) -> Result<Self> {
        let path = path.as_ref();
        let resource_error = |source| Error::Resource {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(resource_error)?;
        // SAFETY: the mapping is read-only and never outlives `MidiFile`
        let map = unsafe { Mmap::map(&file) }.map_err(resource_error)?;
        info!("Parsing {}", path.display());
        Self::load(Source::Mapped(map), Some(path.to_path_buf()), pool, progress)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let pool = Arc::new(WorkerPool::new(DEFAULT_POOL_MULTIPLIER)?);
        Self::from_bytes_with_progress(bytes, pool, &LoadProgress::new())
    }

    pub fn from_bytes_with_progress(
        bytes: Vec<u8>,
        pool: Arc<WorkerPool>,
        progress: &LoadProgress,
    ) -> Result<Self> {
        Self::load(Source::Owned(bytes), None, pool, progress)
    }

    fn load(
        source: Source,
        path: Option<PathBuf>,
        pool: Arc<WorkerPool>,
        progress: &LoadProgress,
    ) -> Result<Self> {
        progress.reset();
        progress.set_stage(LoadStage::CheckingHeader);
        let header = parse_header(&source)?;

        progress.set_stage(LoadStage::FindingTrackPositions);
        let ranges = find_track_chunks(&source, progress)?;
        debug!("Found {} track chunks", ranges.len());

        progress.set_stage(LoadStage::CreatingTracks);
        let mut tracks: Vec<Track> = pool.install(|| {
            ranges
                .par_iter()
                .enumerate()
                .map(|(i, range)| {
                    let track = Track::new(i as TrackId, *range);
                    progress.track_created();
                    track
                })
                .collect()
        });

        progress.set_stage(LoadStage::PreparingForStreaming);
        let data: &[u8] = &source;
        let summaries: Vec<TrackSummary> = pool.install(|| {
            tracks
                .par_iter()
                .map(|track| {
                    let summary = track.decoder(data).full_scan();
                    progress.track_scanned();
                    summary
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut tempo_changes = Vec::new();
        for (track, summary) in tracks.iter_mut().zip(summaries) {
            track.apply_summary(&summary);
            tempo_changes.extend(summary.tempo_changes);
        }
        let tempo_map = TempoMap::new(header.time_division, tempo_changes);

        let file = MidiFile {
            path,
            source,
            header,
            tracks,
            tempo_map,
            last_requested_tick: 0,
            pool,
        };
        progress.set_stage(LoadStage::Streaming);
        info!(
            "Parsed {} tracks (header: {}), {} ticks ({}), {} tempo changes, PPQ {}, {} notes",
            file.track_count(),
            file.track_count_header(),
            file.tick_count(),
            format_time(file.length()),
            file.tempo_change_count(),
            file.time_division(),
            file.note_count()
        );
        Ok(file)
    }

    /// Decodes every event with `start <= tick <= end` across all tracks.
    ///
    /// Tracks are decoded in parallel and the call returns only after all of
    /// them have finished. Events keep their per-track order and tracks are
    /// concatenated in track order; there is no global tick ordering.
    pub fn events_between(
        &mut self,
        start: Tick,
        end: Tick,
    ) -> Result<AppendSequence<MidiEvent>> {
        let mut events = AppendSequence::new();
        self.events_between_into(start, end, &mut events)?;
        Ok(events)
    }

    /// Like [`MidiFile::events_between`], refilling a caller owned sequence
    /// so its allocation is reused from frame to frame.
    pub fn events_between_into(
        &mut self,
        start: Tick,
        end: Tick,
        events: &mut AppendSequence<MidiEvent>,
    ) -> Result<()> {
        self.merge_window(start, end, false, events)
    }

    /// Same as [`MidiFile::events_between_into`] but rescans every track
    /// from its first byte.
    pub fn events_between_from_start(
        &mut self,
        start: Tick,
        end: Tick,
        events: &mut AppendSequence<MidiEvent>,
    ) -> Result<()> {
        self.merge_window(start, end, true, events)
    }

    fn merge_window(
        &mut self,
        start: Tick,
        end: Tick,
        force_reset: bool,
        events: &mut AppendSequence<MidiEvent>,
    ) -> Result<()> {
        let data: &[u8] = &self.source;
        let tracks = &self.tracks;
        // Either every track's scan succeeds or no cursor moves
        let scans: Vec<WindowScan> = self.pool.install(|| {
            tracks
                .par_iter()
                .map(|track| {
                    track
                        .decoder(data)
                        .windowed_scan(track.cursor, start, end, force_reset)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        events.clear();
        events.reserve(scans.iter().map(|scan| scan.events.len()).sum());
        for (track, scan) in self.tracks.iter_mut().zip(scans) {
            track.cursor = scan.cursor;
            events.extend(scan.events);
        }
        self.last_requested_tick = end;
        debug!("Window {}..={} yielded {} events", start, end, events.len());
        Ok(())
    }

    /// Windowed scan of a single track, threading its cursor
    pub fn scan_track(
        &mut self,
        index: usize,
        start: Tick,
        end: Tick,
        force_reset: bool,
    ) -> Result<Vec<MidiEvent>> {
        let count = self.tracks.len();
        let data: &[u8] = &self.source;
        let track = self
            .tracks
            .get_mut(index)
            .ok_or(Error::NoSuchTrack { index, count })?;
        let scan = track
            .decoder(data)
            .windowed_scan(track.cursor, start, end, force_reset)?;
        track.cursor = scan.cursor;
        Ok(scan.events)
    }

    /// Rewinds every track cursor to the start of its track
    pub fn reset_cursors(&mut self) {
        for track in &mut self.tracks {
            track.cursor.reset();
        }
        self.last_requested_tick = 0;
    }

    pub fn format_type(&self) -> u16 {
        self.header.format_type
    }

    /// Pulses per quarter note
    pub fn time_division(&self) -> u16 {
        self.header.time_division
    }

    /// Track count declared in the header
    pub fn track_count_header(&self) -> u16 {
        self.header.track_count
    }

    /// Number of track chunks actually found
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tick_count(&self) -> Tick {
        self.tracks
            .iter()
            .map(Track::length_in_ticks)
            .max()
            .unwrap_or(0)
    }

    pub fn note_count(&self) -> u64 {
        self.tracks.iter().map(Track::note_count).sum()
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    pub fn tempo_change_count(&self) -> usize {
        self.tempo_map.len()
    }

    pub fn tempo_at_tick(&self, tick: Tick) -> u32 {
        self.tempo_map.tempo_at_tick(tick)
    }

    pub fn time_in_seconds(&self, tick: Tick) -> f64 {
        self.tempo_map.time_in_seconds(tick)
    }

    /// Duration of the whole song in seconds
    pub fn length(&self) -> f64 {
        self.time_in_seconds(self.tick_count())
    }

    /// End tick of the most recent window request
    pub fn last_requested_tick(&self) -> Tick {
        self.last_requested_tick
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Unloads the file, releasing its mapping
    pub fn close(self) {
        info!(
            "Closing {}",
            self.file_name().unwrap_or("in-memory MIDI file")
        );
    }
}

impl std::fmt::Debug for MidiFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiFile")
            .field("path", &self.path)
            .field("time_division", &self.header.time_division)
            .field("tracks", &self.tracks.len())
            .field("tempo_changes", &self.tempo_map.len())
            .finish()
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn parse_header(data: &[u8]) -> Result<Header> {
    if data.get(..4) != Some(HEADER_MAGIC.as_slice()) {
        return Err(StructuralError::BadSignature.into());
    }
    let Some(length) = data.get(4..CHUNK_PREFIX).map(be_u32) else {
        return Err(truncated_at(4));
    };
    if length != HEADER_LENGTH {
        return Err(StructuralError::HeaderLength(length).into());
    }
    let Some(fields) = data.get(CHUNK_PREFIX..HEADER_END) else {
        return Err(truncated_at(CHUNK_PREFIX));
    };

    let header = Header {
        format_type: be_u16(&fields[0..2]),
        track_count: be_u16(&fields[2..4]),
        time_division: be_u16(&fields[4..6]),
    };
    if header.format_type != SUPPORTED_FORMAT {
        return Err(StructuralError::UnsupportedFormat(header.format_type).into());
    }
    if header.time_division & 0x8000 != 0 {
        return Err(StructuralError::SmpteDivision(header.time_division).into());
    }
    if header.time_division == 0 {
        return Err(StructuralError::ZeroTimeDivision.into());
    }
    Ok(header)
}

/// Walks the chunks after the header, skipping unknown ones, and returns the
/// payload ranges of the track chunks in file order.
fn find_track_chunks(data: &[u8], progress: &LoadProgress) -> Result<Vec<ByteRange>> {
    let mut ranges = Vec::new();
    let mut pos = HEADER_END;

    while pos < data.len() {
        let Some(prefix) = data.get(pos..pos + CHUNK_PREFIX) else {
            return Err(truncated_at(pos));
        };
        let body = pos + CHUNK_PREFIX;
        let length = be_u32(&prefix[4..8]) as usize;
        let available = data.len() - body;
        if length > available {
            return Err(Error::malformed(
                Location::File { offset: pos },
                MalformedKind::Overrun {
                    needed: length,
                    available,
                },
            ));
        }

        if &prefix[..4] == TRACK_MAGIC {
            ranges.push(ByteRange::new(body, length));
            progress.track_found();
        }
        pos = body + length;
    }

    ranges.sort_by_key(|range| range.offset);
    Ok(ranges)
}

fn truncated_at(offset: usize) -> Error {
    Error::malformed(Location::File { offset }, MalformedKind::TruncatedChunk)
}
