//! In-memory SMF fixtures for the integration tests.
#![allow(dead_code)]

/// Encodes `value` as a MIDI variable-length quantity
pub fn varlen(value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        bytes.insert(0, (rest & 0x7F) as u8 | 0x80);
        rest >>= 7;
    }
    bytes
}

pub fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut bytes = id.to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

pub fn header(format: u16, track_count: u16, division: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&format.to_be_bytes());
    body.extend_from_slice(&track_count.to_be_bytes());
    body.extend_from_slice(&division.to_be_bytes());
    chunk(b"MThd", &body)
}

/// A complete file with one MTrk chunk per entry of `tracks`
pub fn smf(format: u16, ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = header(format, tracks.len() as u16, ppq);
    for track in tracks {
        bytes.extend(chunk(b"MTrk", track));
    }
    bytes
}

/// Builds a track body from events given at absolute ticks
#[derive(Debug, Default)]
pub struct TrackBuilder {
    bytes: Vec<u8>,
    last_tick: u32,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` (status byte included, or omitted for running status)
    pub fn event(mut self, tick: u32, event: &[u8]) -> Self {
        self.bytes.extend(varlen(tick - self.last_tick));
        self.bytes.extend_from_slice(event);
        self.last_tick = tick;
        self
    }

    pub fn note_on(self, tick: u32, channel: u8, key: u8, velocity: u8) -> Self {
        self.event(tick, &[0x90 | channel, key, velocity])
    }

    pub fn note_off(self, tick: u32, channel: u8, key: u8) -> Self {
        self.event(tick, &[0x80 | channel, key, 0])
    }

    pub fn tempo(self, tick: u32, micros_per_quarter: u32) -> Self {
        let [_, a, b, c] = micros_per_quarter.to_be_bytes();
        self.event(tick, &[0xFF, 0x51, 0x03, a, b, c])
    }

    pub fn text(self, tick: u32, text: &str) -> Self {
        let mut event = vec![0xFF, 0x01];
        event.extend(varlen(text.len() as u32));
        event.extend_from_slice(text.as_bytes());
        self.event(tick, &event)
    }

    /// Closes the track with End of Track at `tick`
    pub fn end(self, tick: u32) -> Vec<u8> {
        self.event(tick, &[0xFF, 0x2F, 0x00]).bytes
    }

    /// The bytes so far, without End of Track
    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
