//! Frame driven playback over a loaded [`MidiFile`].

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::playback::notes::{resolve_track, ActiveNoteTable, Resolution, TrackNotes, VisualNoteSpan};
use crate::playback::sink::NoteSink;
use crate::pool::WorkerPool;
use crate::sequence::AppendSequence;
use crate::smf::tempo::ticks_for_seconds;
use crate::smf::{MidiEvent, MidiFile, Tick, TrackId};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Finished,
}

/// What a call to [`PlaybackScheduler::advance`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not playing
    Idle,
    /// The frame was too short to move a whole tick
    Skipped,
    Advanced {
        from: Tick,
        to: Tick,
        spans: usize,
    },
    /// The song ended this frame. `closed` holds every span resolved during
    /// the final frame, including notes that never got a note-off. The sink
    /// is left cleared.
    Finished { closed: Vec<VisualNoteSpan> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Window size per frame, in quarter notes
    pub lookahead_quarters: u32,
    /// Count-in before tick 0
    pub preroll_seconds: f64,
    pub preroll_bpm: f64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            lookahead_quarters: 2,
            preroll_seconds: 3.0,
            preroll_bpm: 120.0,
        }
    }
}

/// Advances a virtual tick clock from frame time and turns the decoded
/// events into note spans for a [`NoteSink`].
pub struct PlaybackScheduler<S: NoteSink> {
    file: MidiFile,
    sink: S,
    state: PlaybackState,
    current_tick: Tick,
    /// Fractional tick left over from the previous frame
    carry: f64,
    /// Exclusive end of everything requested so far
    requested_up_to: Tick,
    lookahead_ticks: Tick,
    preroll_tick: Tick,
    force_reset: bool,
    active: Mutex<ActiveNoteTable>,
    events: AppendSequence<MidiEvent>,
    passed_notes: u64,
}

impl<S: NoteSink> PlaybackScheduler<S> {
    pub fn new(file: MidiFile, sink: S, options: PlaybackOptions) -> Self {
        let ppq = file.time_division();
        let lookahead_ticks = Tick::from(options.lookahead_quarters.max(1)) * Tick::from(ppq);
        let preroll_tick = -ticks_for_seconds(options.preroll_seconds, options.preroll_bpm, ppq);
        debug!(
            "Scheduler ready: lookahead {} ticks, pre-roll from tick {}",
            lookahead_ticks, preroll_tick
        );
        Self {
            file,
            sink,
            state: PlaybackState::Stopped,
            current_tick: preroll_tick,
            carry: 0.0,
            requested_up_to: preroll_tick,
            lookahead_ticks,
            preroll_tick,
            force_reset: false,
            active: Mutex::new(ActiveNoteTable::new()),
            events: AppendSequence::new(),
            passed_notes: 0,
        }
    }

    /// Stopped -> Playing. Has no effect in any other state.
    pub fn start(&mut self) {
        if self.state == PlaybackState::Stopped {
            info!("Playback started at tick {}", self.current_tick);
            self.state = PlaybackState::Playing;
        }
    }

    /// Pauses playback, keeping the position
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Playing {
            info!("Playback stopped at tick {}", self.current_tick);
            self.state = PlaybackState::Stopped;
        }
    }

    /// Rewinds to the pre-roll and plays from there, whatever the state
    pub fn restart(&mut self) {
        self.current_tick = self.preroll_tick;
        self.carry = 0.0;
        self.requested_up_to = self.preroll_tick;
        self.force_reset = true;
        self.passed_notes = 0;
        self.table().clear();
        self.sink.clear();
        self.state = PlaybackState::Playing;
        info!("Playback restarted at tick {}", self.current_tick);
    }

    /// Runs one frame that took `frame_delta` seconds.
    ///
    /// A decode error leaves the clock and every track cursor where they
    /// were.
    pub fn advance(&mut self, frame_delta: f64) -> Result<FrameOutcome> {
        if self.state != PlaybackState::Playing {
            return Ok(FrameOutcome::Idle);
        }

        // seconds * 1e6 / microseconds per tick
        let ppq = f64::from(self.file.time_division());
        let tempo = f64::from(self.file.tempo_at_tick(self.current_tick));
        let total = frame_delta.max(0.0) * MICROS_PER_SECOND * ppq / tempo + self.carry;
        let whole = total.floor();
        let ticks_to_advance = whole as Tick;

        if ticks_to_advance <= 0 {
            self.carry = total - whole;
            if self.current_tick >= self.file.tick_count() {
                return self.finish(self.current_tick, Vec::new());
            }
            return Ok(FrameOutcome::Skipped);
        }

        let window_end = self.current_tick + self.lookahead_ticks;
        let spans = if self.requested_up_to < window_end {
            self.request(window_end)?
        } else {
            Vec::new()
        };
        let from = self.current_tick;
        let to = from + ticks_to_advance;
        if to >= self.file.tick_count() {
            let outcome = self.finish(to, spans)?;
            self.carry = total - whole;
            return Ok(outcome);
        }

        self.sink.clear();
        self.sink.publish(&spans);
        self.carry = total - whole;
        self.current_tick = to;
        Ok(FrameOutcome::Advanced {
            from,
            to,
            spans: spans.len(),
        })
    }

    /// Decodes `[requested_up_to, end)` and resolves it into spans
    fn request(&mut self, end: Tick) -> Result<Vec<VisualNoteSpan>> {
        let start = self.requested_up_to;
        if self.force_reset {
            self.file
                .events_between_from_start(start, end - 1, &mut self.events)?;
            self.force_reset = false;
        } else {
            self.file
                .events_between_into(start, end - 1, &mut self.events)?;
        }
        self.requested_up_to = end;

        let (spans, onsets) = resolve_window(self.file.pool(), &self.active, &self.events);
        self.passed_notes += onsets;
        Ok(spans)
    }

    /// Ends playback. `closed` starts with the spans the final frame already
    /// resolved; they go to the caller instead of the sink.
    fn finish(
        &mut self,
        final_tick: Tick,
        mut closed: Vec<VisualNoteSpan>,
    ) -> Result<FrameOutcome> {
        let tick_count = self.file.tick_count();
        if self.requested_up_to <= tick_count {
            closed.extend(self.request(tick_count + 1)?);
        }

        let unfinished = self.table().close_all(tick_count);
        if !unfinished.is_empty() {
            warn!(
                "{} notes still sounding at the end of the song, closed at tick {}",
                unfinished.len(),
                tick_count
            );
        }
        closed.extend(unfinished);
        closed.sort_by_key(|span| span.start_tick);

        self.sink.clear();
        self.current_tick = final_tick;
        self.state = PlaybackState::Finished;
        info!(
            "Playback finished at tick {} after {} notes",
            self.current_tick, self.passed_notes
        );
        Ok(FrameOutcome::Finished { closed })
    }

    fn table(&self) -> MutexGuard<'_, ActiveNoteTable> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Seconds from tick 0 to the current tick, negative in the pre-roll
    pub fn current_time(&self) -> f64 {
        self.file.time_in_seconds(self.current_tick)
    }

    pub fn preroll_tick(&self) -> Tick {
        self.preroll_tick
    }

    pub fn lookahead_ticks(&self) -> Tick {
        self.lookahead_ticks
    }

    /// Note-ons resolved since the last restart
    pub fn passed_notes(&self) -> u64 {
        self.passed_notes
    }

    pub fn active_notes(&self) -> usize {
        self.table().len()
    }

    pub fn file(&self) -> &MidiFile {
        &self.file
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Gives the file back, dropping any open notes
    pub fn into_file(self) -> MidiFile {
        self.file
    }
}

/// Resolves one merged window.
///
/// Events are split by track; each track's open notes are moved out of the
/// shared table and paired with its events on a worker, then the leftovers
/// are merged back. Returns spans ordered by start tick and the number of
/// note-ons seen.
fn resolve_window(
    pool: &WorkerPool,
    active: &Mutex<ActiveNoteTable>,
    events: &AppendSequence<MidiEvent>,
) -> (Vec<VisualNoteSpan>, u64) {
    let mut by_track: BTreeMap<TrackId, Vec<&MidiEvent>> = BTreeMap::new();
    for event in events.iter().filter(|event| event.note().is_some()) {
        by_track.entry(event.track).or_default().push(event);
    }
    if by_track.is_empty() {
        return (Vec::new(), 0);
    }

    let work: Vec<(TrackId, Vec<&MidiEvent>, TrackNotes)> = {
        let mut table = active.lock().unwrap_or_else(PoisonError::into_inner);
        by_track
            .into_iter()
            .map(|(track, events)| {
                let notes = table.take_track(track);
                (track, events, notes)
            })
            .collect()
    };

    let resolved: Vec<(TrackId, TrackNotes, Resolution)> = pool.install(|| {
        work.into_par_iter()
            .map(|(track, events, mut notes)| {
                let resolution = resolve_track(&mut notes, events);
                (track, notes, resolution)
            })
            .collect()
    });

    let mut spans = Vec::new();
    let mut onsets = 0;
    {
        let mut table = active.lock().unwrap_or_else(PoisonError::into_inner);
        for (track, notes, resolution) in resolved {
            table.merge_track(track, notes);
            spans.extend(resolution.spans);
            onsets += resolution.onsets;
        }
    }
    spans.sort_by_key(|span| span.start_tick);
    (spans, onsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::sink::VecSink;

    // Two tracks at PPQ 96: a 0..96 note on track 0, a 48..144 note on
    // track 1 (channel 2), ending at tick 192
    fn song() -> Vec<u8> {
        let mut bytes = b"MThd\0\0\0\x06\0\x01\0\x02\0\x60".to_vec();
        let first: &[u8] = &[
            0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0, 0x60, 0xFF, 0x2F, 0x00,
        ];
        let second: &[u8] = &[0x30, 0x92, 64, 100, 0x60, 0x82, 64, 0, 0x00, 0xFF, 0x2F, 0x00];
        for track in [first, second] {
            bytes.extend_from_slice(b"MTrk");
            bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
            bytes.extend_from_slice(track);
        }
        bytes
    }

    fn scheduler(preroll_seconds: f64) -> PlaybackScheduler<VecSink> {
        let pool = std::sync::Arc::new(WorkerPool::with_threads(2).unwrap());
        let file = MidiFile::from_bytes_with_progress(
            song(),
            pool,
            &crate::smf::LoadProgress::new(),
        )
        .unwrap();
        PlaybackScheduler::new(
            file,
            VecSink::new(),
            PlaybackOptions {
                lookahead_quarters: 1,
                preroll_seconds,
                preroll_bpm: 120.0,
            },
        )
    }

    #[test]
    fn test_stopped_scheduler_is_idle() {
        let mut scheduler = scheduler(0.0);
        assert_eq!(scheduler.advance(1.0).unwrap(), FrameOutcome::Idle);
        assert_eq!(scheduler.current_tick(), 0);
        assert!(!scheduler.playing());
    }

    #[test]
    fn test_preroll_offset() {
        let scheduler = scheduler(3.0);
        assert_eq!(scheduler.preroll_tick(), -576);
        assert_eq!(scheduler.current_tick(), -576);
        assert_eq!(scheduler.lookahead_ticks(), 96);
    }

    #[test]
    fn test_carry_accumulates_fractional_ticks() {
        let mut scheduler = scheduler(0.0);
        scheduler.start();
        // 120 BPM at PPQ 96 is 192 ticks per second; 1ms is 0.192 ticks
        for _ in 0..5 {
            assert_eq!(scheduler.advance(0.001).unwrap(), FrameOutcome::Skipped);
        }
        assert!(matches!(
            scheduler.advance(0.001).unwrap(),
            FrameOutcome::Advanced { from: 0, to: 1, .. }
        ));
    }

    #[test]
    fn test_plays_to_the_end() {
        let mut scheduler = scheduler(0.0);
        scheduler.start();

        // 0.25s = 48 ticks, window [0, 96)
        assert!(matches!(
            scheduler.advance(0.25).unwrap(),
            FrameOutcome::Advanced { from: 0, to: 48, spans: 0 }
        ));
        assert_eq!(scheduler.active_notes(), 2);

        // window [96, 144) closes the first note
        scheduler.advance(0.25).unwrap();
        assert_eq!(
            scheduler.sink().spans(),
            &[VisualNoteSpan {
                start_tick: 0,
                duration_ticks: 96,
                key: 60,
                color_index: 0
            }]
        );

        // window [144, 192) closes the second
        scheduler.advance(0.25).unwrap();
        assert_eq!(scheduler.sink().spans().len(), 1);
        assert_eq!(scheduler.sink().spans()[0].color_index, 18);
        assert_eq!(scheduler.passed_notes(), 2);

        match scheduler.advance(0.25).unwrap() {
            FrameOutcome::Finished { closed } => assert!(closed.is_empty()),
            other => panic!("expected finish, got {:?}", other),
        }
        assert_eq!(scheduler.state(), PlaybackState::Finished);
        assert!(scheduler.sink().spans().is_empty());
        assert_eq!(scheduler.advance(0.25).unwrap(), FrameOutcome::Idle);
    }

    #[test]
    fn test_final_frame_returns_its_own_spans() {
        let mut scheduler = scheduler(0.0);
        scheduler.start();
        scheduler.advance(0.25).unwrap();

        // 1s = 192 ticks: the window [96, 144) closes the first note, then
        // finishing resolves [144, 192] for the second
        match scheduler.advance(1.0).unwrap() {
            FrameOutcome::Finished { closed } => {
                assert_eq!(closed.len(), 2);
                assert_eq!(closed[0].start_tick, 0);
                assert_eq!(closed[0].duration_ticks, 96);
                assert_eq!(closed[1].start_tick, 48);
                assert_eq!(closed[1].color_index, 18);
            }
            other => panic!("expected finish, got {:?}", other),
        }
        assert_eq!(scheduler.current_tick(), 240);
        assert_eq!(scheduler.sink().published(), 0);
        assert_eq!(scheduler.passed_notes(), 2);
    }

    #[test]
    fn test_zero_length_frame_finishes_empty_song() {
        let mut bytes = b"MThd\0\0\0\x06\0\x01\0\x01\0\x60".to_vec();
        bytes.extend_from_slice(b"MTrk\0\0\0\x04\x00\xFF\x2F\x00");
        let file = MidiFile::from_bytes(bytes).unwrap();
        assert_eq!(file.tick_count(), 0);

        let options = PlaybackOptions {
            preroll_seconds: 0.0,
            ..PlaybackOptions::default()
        };
        let mut scheduler = PlaybackScheduler::new(file, VecSink::new(), options);
        scheduler.start();
        assert_eq!(
            scheduler.advance(0.0).unwrap(),
            FrameOutcome::Finished { closed: Vec::new() }
        );
        assert_eq!(scheduler.state(), PlaybackState::Finished);
        assert_eq!(scheduler.current_tick(), 0);
    }

    #[test]
    fn test_restart_replays_from_preroll() {
        let mut scheduler = scheduler(0.5);
        scheduler.start();
        while scheduler.playing() {
            scheduler.advance(0.5).unwrap();
        }
        assert_eq!(scheduler.sink().published(), 2);

        scheduler.restart();
        assert_eq!(scheduler.current_tick(), -96);
        assert_eq!(scheduler.passed_notes(), 0);
        while scheduler.playing() {
            scheduler.advance(0.5).unwrap();
        }
        assert_eq!(scheduler.sink().published(), 4);
        assert_eq!(scheduler.passed_notes(), 2);
    }
}
