/// Per-call cursor over a single track buffer
///
/// Carries the byte offset, the running CRC and the recording mode through
/// the synthesizer and sector accessor. The offset wraps back to the end of
/// the IDAM table when it runs off the end of the track. In FM mode every
/// logical byte occupies two buffer bytes.

use crate::crc::{crc16_byte, CRC16_RESET};
use crate::format::constants::{IDAM_TABLE_SIZE, MFM_SYNC};
use crate::image::track::RecordingMode;

/// Saved cursor position, used to hand a located sector from a read-only
/// scan to a writing cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CursorState {
    pub offset: usize,
    pub crc: u16,
    pub mode: RecordingMode,
}

/// Cursor over a track slice (`&[u8]` for reading, `&mut [u8]` for writing)
pub(crate) struct TrackCursor<B> {
    track: B,
    offset: usize,
    crc: u16,
    mode: RecordingMode,
    wrapped: bool,
}

impl<B: AsRef<[u8]>> TrackCursor<B> {
    /// Create a cursor at `offset` with a freshly reset CRC
    pub fn new(track: B, offset: usize, mode: RecordingMode) -> Self {
        Self {
            track,
            offset,
            crc: CRC16_RESET,
            mode,
            wrapped: false,
        }
    }

    /// Continue from a saved position
    pub fn resume(track: B, state: CursorState) -> Self {
        Self {
            track,
            offset: state.offset,
            crc: state.crc,
            mode: state.mode,
            wrapped: false,
        }
    }

    /// Snapshot the current position
    pub fn state(&self) -> CursorState {
        CursorState {
            offset: self.offset,
            crc: self.crc,
            mode: self.mode,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    #[cfg(test)]
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// True once the offset has wrapped past the end of the track
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn reset_crc(&mut self) {
        self.crc = CRC16_RESET;
    }

    /// Reset the CRC and fold in the MFM sync bytes that precede an address
    /// mark. FM has no sync bytes, so this is a plain reset.
    pub fn preset_crc(&mut self) {
        self.reset_crc();
        if self.mode == RecordingMode::MFM {
            for _ in 0..3 {
                self.crc = crc16_byte(self.crc, MFM_SYNC);
            }
        }
    }

    fn step(&mut self) {
        self.offset += 1;
        if self.offset >= self.track.as_ref().len() {
            self.offset = IDAM_TABLE_SIZE;
            self.wrapped = true;
        }
    }

    /// Read one logical byte, folding it into the CRC
    pub fn read_byte(&mut self) -> u8 {
        let byte = self.track.as_ref()[self.offset];
        self.step();
        if self.mode == RecordingMode::FM {
            self.step();
        }
        self.crc = crc16_byte(self.crc, byte);
        byte
    }

    /// Read and discard `count` logical bytes
    pub fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.read_byte();
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TrackCursor<B> {
    fn put(&mut self, byte: u8) {
        let offset = self.offset;
        self.track.as_mut()[offset] = byte;
        self.step();
    }

    /// Write one logical byte, folding it into the CRC
    pub fn write_byte(&mut self, byte: u8) {
        self.put(byte);
        if self.mode == RecordingMode::FM {
            self.put(byte);
        }
        self.crc = crc16_byte(self.crc, byte);
    }

    /// Write `count` copies of `byte`
    pub fn write_run(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.write_byte(byte);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    /// Append the accumulated CRC, high byte first
    pub fn write_crc(&mut self) {
        let [hi, lo] = self.crc.to_be_bytes();
        self.write_byte(hi);
        self.write_byte(lo);
    }

    /// Fill from the cursor to the physical end of the track.
    ///
    /// Does nothing once the cursor has wrapped; the track is already full.
    pub fn fill_to_end(&mut self, byte: u8) {
        if self.wrapped {
            return;
        }
        let offset = self.offset;
        self.track.as_mut()[offset..].fill(byte);
        self.offset = IDAM_TABLE_SIZE;
        self.wrapped = true;
    }
}
