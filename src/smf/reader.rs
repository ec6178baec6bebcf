//! Bounded big-endian reader over one track's byte range, including the
//! variable-length quantity codec used for delta times and payload lengths.

use crate::error::{Error, Location, MalformedKind, Result};
use crate::smf::TrackId;

/// A variable-length quantity is at most four bytes (28 bits) long
const MAX_VARLEN_BYTES: usize = 4;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    track: TrackId,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], track: TrackId) -> Self {
        Self::at(data, 0, track)
    }

    /// Starts reading at `pos`, clamped to the end of `data`
    pub fn at(data: &'a [u8], pos: usize, track: TrackId) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
            track,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Jumps to the end of the range
    pub fn skip_to_end(&mut self) {
        self.pos = self.data.len();
    }

    pub fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or_else(|| self.overrun(1))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(b)
            }
            None => Err(self.overrun(1)),
        }
    }

    /// Borrows the next `len` bytes without copying
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.overrun(len));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Decodes a variable-length quantity: 7 bits per byte, most significant
    /// group first, high bit set on every byte but the last.
    pub fn read_varlen(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        for _ in 0..MAX_VARLEN_BYTES {
            let Some(&b) = self.data.get(self.pos) else {
                return Err(self.error_at(start, MalformedKind::TruncatedVarLen));
            };
            self.pos += 1;
            value = (value << 7) | u32::from(b & 0x7F);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(self.error_at(start, MalformedKind::VarLenTooLong))
    }

    pub(crate) fn error(&self, kind: MalformedKind) -> Error {
        self.error_at(self.pos, kind)
    }

    pub(crate) fn error_at(&self, offset: usize, kind: MalformedKind) -> Error {
        Error::malformed(
            Location::Track {
                track: self.track,
                offset,
            },
            kind,
        )
    }

    fn overrun(&self, needed: usize) -> Error {
        self.error(MalformedKind::Overrun {
            needed,
            available: self.remaining(),
        })
    }
}

/// Decodes a single variable-length quantity from the front of `bytes`
pub fn decode_varlen(bytes: &[u8]) -> Result<u32> {
    ByteReader::new(bytes, 0).read_varlen()
}
