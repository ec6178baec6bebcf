use crate::smf::Tick;

/// Resumable decode position inside one track.
///
/// A cursor is a plain value: each windowed scan takes the previous cursor
/// and hands back the one to use next time. It only moves forward unless the
/// caller resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackCursor {
    /// Offset of the next undecoded event, relative to the track's byte range
    pub stream_offset: usize,
    /// Last channel status byte seen, for running status
    pub running_status: Option<u8>,
    /// Tick of the last event consumed
    pub last_decoded_tick: Tick,
}

impl TrackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_at_start(&self) -> bool {
        self.stream_offset == 0
    }
}
