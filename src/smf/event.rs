use crate::smf::{Tick, TrackId};

pub const META: u8 = 0xFF;
pub const SYSEX: u8 = 0xF0;
pub const SYSEX_ESCAPE: u8 = 0xF7;

pub const META_END_OF_TRACK: u8 = 0x2F;
pub const META_SET_TEMPO: u8 = 0x51;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Meta,
    Channel,
    SysEx,
}

/// Event body, after the status byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Meta { kind: u8, data: Vec<u8> },
    /// One or two data bytes depending on the status nibble
    Channel { param1: u8, param2: Option<u8> },
    SysEx { data: Vec<u8> },
}

/// A decoded track event. Running status is already resolved, so
/// `status` is always the effective status byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiEvent {
    pub tick: Tick,
    pub delta_time: u32,
    pub status: u8,
    pub track: TrackId,
    pub payload: Payload,
}

impl MidiEvent {
    pub fn kind(&self) -> EventKind {
        match self.payload {
            Payload::Meta { .. } => EventKind::Meta,
            Payload::Channel { .. } => EventKind::Channel,
            Payload::SysEx { .. } => EventKind::SysEx,
        }
    }

    /// Channel number for channel messages
    pub fn channel(&self) -> Option<u8> {
        match self.payload {
            Payload::Channel { .. } => Some(self.status & 0x0F),
            _ => None,
        }
    }

    /// Returns `(key, velocity)` for note on/off messages
    pub fn note(&self) -> Option<(u8, u8)> {
        match self.payload {
            Payload::Channel {
                param1,
                param2: Some(velocity),
            } if matches!(self.status & 0xF0, NOTE_OFF | NOTE_ON) => Some((param1, velocity)),
            _ => None,
        }
    }

    pub fn is_note_on(&self) -> bool {
        self.status & 0xF0 == NOTE_ON && matches!(self.note(), Some((_, v)) if v > 0)
    }

    /// Note off, or note on with zero velocity
    pub fn is_note_off(&self) -> bool {
        match self.status & 0xF0 {
            NOTE_OFF => self.note().is_some(),
            NOTE_ON => matches!(self.note(), Some((_, 0))),
            _ => false,
        }
    }

    /// Microseconds per quarter note for Set Tempo meta events
    pub fn tempo(&self) -> Option<u32> {
        match &self.payload {
            Payload::Meta { kind, data } if *kind == META_SET_TEMPO => tempo_from_bytes(data),
            _ => None,
        }
    }
}

/// Number of data bytes following a channel status byte
pub fn channel_data_len(status: u8) -> Option<usize> {
    match status & 0xF0 {
        0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => Some(2),
        0xC0 | 0xD0 => Some(1),
        _ => None,
    }
}

pub fn is_note_on_bytes(status: u8, velocity: u8) -> bool {
    status & 0xF0 == NOTE_ON && velocity > 0
}

/// Set Tempo payloads carry a 24-bit big-endian value
pub fn tempo_from_bytes(data: &[u8]) -> Option<u32> {
    match data {
        [a, b, c] => Some(u32::from(*a) << 16 | u32::from(*b) << 8 | u32::from(*c)),
        _ => None,
    }
}
